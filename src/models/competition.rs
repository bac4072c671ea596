//! Competition model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::registration::Participant;

/// Competition with registration and submission windows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Competition {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub competition_type: CompetitionType,
    pub status: CompetitionStatus,
    /// Window invariant, checked at creation:
    /// `registration_start < registration_end <= competition_start < competition_end`
    pub registration_start: DateTime<Utc>,
    pub registration_end: DateTime<Utc>,
    pub competition_start: DateTime<Utc>,
    pub competition_end: DateTime<Utc>,
    /// Expertise tags used to rank judges during automatic assignment
    pub required_expertise: Vec<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub revision: u64,
}

impl Competition {
    /// Check if registration is currently open
    pub fn is_registration_open(&self, now: DateTime<Utc>) -> bool {
        self.status == CompetitionStatus::Published
            && now >= self.registration_start
            && now <= self.registration_end
    }

    /// Check if submissions are currently being accepted
    pub fn is_submission_open(&self, now: DateTime<Utc>) -> bool {
        self.status == CompetitionStatus::Active
            && now >= self.competition_start
            && now <= self.competition_end
    }

    /// Validate a participant type against the competition type
    pub fn accepts_participant(&self, participant: &Participant) -> Result<(), &'static str> {
        match (participant, self.competition_type) {
            (Participant::Individual(_), CompetitionType::Team) => {
                Err("Individual registration not allowed for team competition")
            }
            (Participant::Team(_), CompetitionType::Individual) => {
                Err("Team registration not allowed for individual competition")
            }
            _ => Ok(()),
        }
    }
}

/// Competition participation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompetitionType {
    Individual,
    Team,
    Hybrid,
}

impl CompetitionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Individual => "individual",
            Self::Team => "team",
            Self::Hybrid => "hybrid",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "individual" => Some(Self::Individual),
            "team" => Some(Self::Team),
            "hybrid" => Some(Self::Hybrid),
            _ => None,
        }
    }
}

impl std::fmt::Display for CompetitionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Competition lifecycle status. The forward path is linear:
/// `draft -> published -> active -> completed`; `cancelled` is
/// reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompetitionStatus {
    Draft,
    Published,
    Active,
    Completed,
    Cancelled,
}

impl CompetitionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Whether the given forward transition is legal
    pub fn can_transition_to(&self, next: CompetitionStatus) -> bool {
        match (self, next) {
            (Self::Draft, CompetitionStatus::Published) => true,
            (Self::Published, CompetitionStatus::Active) => true,
            (Self::Active, CompetitionStatus::Completed) => true,
            (_, CompetitionStatus::Cancelled) => !self.is_terminal(),
            _ => false,
        }
    }
}

impl std::fmt::Display for CompetitionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Competition round with its submission deadline and file
/// requirements
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetitionRound {
    pub id: Uuid,
    pub competition_id: Uuid,
    pub name: String,
    pub submission_deadline: DateTime<Utc>,
    pub judging_deadline: DateTime<Utc>,
    /// File categories a submission must attach before it can be
    /// finalized
    pub required_file_categories: Vec<String>,
    pub created_at: DateTime<Utc>,
}
