//! Team and team-formation models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Team for team-based competitions
///
/// `current_member_count` is updated only inside the same atomic store
/// write as the member record that changes it; `TeamMember` rows are
/// the authoritative membership list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: Uuid,
    pub name: String,
    /// Exactly one captain, owner of the team identity
    pub captain_id: Uuid,
    pub max_members: u32,
    pub current_member_count: u32,
    pub status: TeamStatus,
    /// Unique 8-character join code
    pub invite_code: String,
    pub created_at: DateTime<Utc>,
    /// Optimistic-concurrency stamp, bumped by the store on every write
    pub revision: u64,
}

impl Team {
    /// Check if the team can accept new members
    pub fn can_add_member(&self) -> Result<(), &'static str> {
        if self.status != TeamStatus::Forming {
            return Err("Team is not accepting new members");
        }
        if self.current_member_count >= self.max_members {
            return Err("Team is full");
        }
        Ok(())
    }

    /// Check the membership-count invariant
    pub fn count_invariant_holds(&self) -> bool {
        self.current_member_count >= 1 && self.current_member_count <= self.max_members
    }
}

/// Team lifecycle status. Transitions are monotonic forward:
/// `forming -> active | disbanded`, `active -> disbanded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamStatus {
    Forming,
    Active,
    Disbanded,
}

impl TeamStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Forming => "forming",
            Self::Active => "active",
            Self::Disbanded => "disbanded",
        }
    }

    /// Whether the given forward transition is legal
    pub fn can_transition_to(&self, next: TeamStatus) -> bool {
        matches!(
            (self, next),
            (Self::Forming, TeamStatus::Active) | (Self::Forming, TeamStatus::Disbanded)
                | (Self::Active, TeamStatus::Disbanded)
        )
    }
}

impl std::fmt::Display for TeamStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Membership record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamMember {
    pub id: Uuid,
    pub team_id: Uuid,
    pub user_id: Uuid,
    pub role: TeamRole,
    pub joined_at: DateTime<Utc>,
}

/// Member role within a team
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamRole {
    Captain,
    Member,
}

impl std::fmt::Display for TeamRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Captain => write!(f, "captain"),
            Self::Member => write!(f, "member"),
        }
    }
}

/// Invitation to join a team; terminal once accepted, declined, or
/// expired.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamInvitation {
    pub id: Uuid,
    pub team_id: Uuid,
    pub user_id: Uuid,
    pub invited_by: Uuid,
    pub message: String,
    pub status: InvitationStatus,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl TeamInvitation {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Invitation status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Declined,
    Expired,
}

impl InvitationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
            Self::Expired => "expired",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for InvitationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team(status: TeamStatus, count: u32, max: u32) -> Team {
        Team {
            id: Uuid::new_v4(),
            name: "AI Innovators".to_string(),
            captain_id: Uuid::new_v4(),
            max_members: max,
            current_member_count: count,
            status,
            invite_code: "AB12CD34".to_string(),
            created_at: Utc::now(),
            revision: 0,
        }
    }

    #[test]
    fn test_can_add_member() {
        assert!(team(TeamStatus::Forming, 2, 4).can_add_member().is_ok());
        assert_eq!(
            team(TeamStatus::Forming, 4, 4).can_add_member().unwrap_err(),
            "Team is full"
        );
        assert_eq!(
            team(TeamStatus::Active, 2, 4).can_add_member().unwrap_err(),
            "Team is not accepting new members"
        );
        assert_eq!(
            team(TeamStatus::Disbanded, 2, 4).can_add_member().unwrap_err(),
            "Team is not accepting new members"
        );
    }

    #[test]
    fn test_status_transitions_are_forward_only() {
        assert!(TeamStatus::Forming.can_transition_to(TeamStatus::Active));
        assert!(TeamStatus::Forming.can_transition_to(TeamStatus::Disbanded));
        assert!(TeamStatus::Active.can_transition_to(TeamStatus::Disbanded));
        assert!(!TeamStatus::Active.can_transition_to(TeamStatus::Forming));
        assert!(!TeamStatus::Disbanded.can_transition_to(TeamStatus::Forming));
        assert!(!TeamStatus::Disbanded.can_transition_to(TeamStatus::Active));
    }

    #[test]
    fn test_count_invariant() {
        assert!(team(TeamStatus::Forming, 1, 4).count_invariant_holds());
        assert!(team(TeamStatus::Forming, 4, 4).count_invariant_holds());
        assert!(!team(TeamStatus::Forming, 0, 4).count_invariant_holds());
        assert!(!team(TeamStatus::Forming, 5, 4).count_invariant_holds());
    }
}
