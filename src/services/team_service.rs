//! Team-formation service
//!
//! Owns teams, membership, and invitations. Member-count changes ride
//! the same conditional store write as the record that causes them, so
//! two users racing for the last slot serialize on the team revision.

use chrono::Duration;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    constants::OPTIMISTIC_WRITE_MAX_RETRIES,
    error::{EngineError, EngineResult},
    models::{
        InvitationStatus, Team, TeamInvitation, TeamMember, TeamRole, TeamStatus,
    },
    state::Engine,
    store::{IdentityStore, StoreError, TeamStore},
    utils::{invite, validation},
};

/// Payload for creating a team
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewTeam {
    #[validate(length(min = 3, max = 128))]
    pub name: String,
    pub captain_id: Uuid,
    /// Defaults to the configured team size limit
    pub max_members: Option<u32>,
}

/// Team service for business logic
pub struct TeamService;

impl TeamService {
    /// Create a team in `forming` with the captain as its first member
    pub async fn create_team(engine: &Engine, payload: NewTeam) -> EngineResult<Team> {
        payload.validate()?;
        let name = validation::validate_name(&payload.name).map_err(EngineError::validation)?;
        let max_members = payload
            .max_members
            .unwrap_or(engine.config().teams.default_max_members);
        validation::validate_max_members(max_members).map_err(EngineError::validation)?;

        let captain = engine
            .store()
            .get_user(payload.captain_id)
            .await?
            .ok_or_else(|| EngineError::NotFound("User not found".to_string()))?;
        if !captain.is_active() {
            return Err(EngineError::validation("Account not active"));
        }

        let now = engine.now();
        let team = Team {
            id: Uuid::new_v4(),
            name,
            captain_id: captain.id,
            max_members,
            current_member_count: 1,
            status: TeamStatus::Forming,
            invite_code: invite::generate_invite_code(),
            created_at: now,
            revision: 0,
        };
        let member = TeamMember {
            id: Uuid::new_v4(),
            team_id: team.id,
            user_id: captain.id,
            role: TeamRole::Captain,
            joined_at: now,
        };

        let team = engine.store().insert_team(team, member).await?;
        tracing::info!(team_id = %team.id, captain_id = %team.captain_id, "team created");
        Ok(team)
    }

    /// Invite a user to a team. Membership does not change until the
    /// invitation is accepted.
    pub async fn invite_member(
        engine: &Engine,
        team_id: Uuid,
        user_id: Uuid,
        invited_by: Uuid,
        message: String,
    ) -> EngineResult<TeamInvitation> {
        let store = engine.store();
        let team = store
            .get_team(team_id)
            .await?
            .ok_or_else(|| EngineError::NotFound("Team not found".to_string()))?;
        team.can_add_member().map_err(EngineError::validation)?;

        if store.find_team_member(team_id, invited_by).await?.is_none() {
            return Err(EngineError::forbidden("Only team members can send invitations"));
        }
        store
            .get_user(user_id)
            .await?
            .ok_or_else(|| EngineError::NotFound("User not found".to_string()))?;
        if store.find_team_member(team_id, user_id).await?.is_some() {
            return Err(EngineError::validation("User is already a team member"));
        }
        if store.find_pending_invitation(team_id, user_id).await?.is_some() {
            return Err(EngineError::validation(
                "Invitation already pending for this user",
            ));
        }

        let now = engine.now();
        let invitation = TeamInvitation {
            id: Uuid::new_v4(),
            team_id,
            user_id,
            invited_by,
            message,
            status: InvitationStatus::Pending,
            expires_at: now + Duration::days(engine.config().teams.invitation_ttl_days),
            created_at: now,
        };
        Ok(store.insert_invitation(invitation).await?)
    }

    /// Accept or decline a pending invitation. Acceptance commits the
    /// member record, the bumped count, and the invitation update as
    /// one conditional write, retried on revision conflicts.
    pub async fn respond_to_invitation(
        engine: &Engine,
        invitation_id: Uuid,
        accept: bool,
    ) -> EngineResult<TeamInvitation> {
        let store = engine.store();
        let mut invitation = store
            .get_invitation(invitation_id)
            .await?
            .ok_or_else(|| EngineError::NotFound("Invitation not found".to_string()))?;
        if invitation.status.is_terminal() {
            return Err(EngineError::validation("Invitation is no longer pending"));
        }

        let now = engine.now();
        if invitation.is_expired(now) {
            invitation.status = InvitationStatus::Expired;
            store.update_invitation(invitation).await?;
            return Err(EngineError::validation("Invitation has expired"));
        }

        if !accept {
            invitation.status = InvitationStatus::Declined;
            return Ok(store.update_invitation(invitation).await?);
        }

        let mut attempts = 0;
        loop {
            let mut team = store
                .get_team(invitation.team_id)
                .await?
                .ok_or_else(|| EngineError::NotFound("Team not found".to_string()))?;
            team.can_add_member().map_err(EngineError::validation)?;

            team.current_member_count += 1;
            let member = TeamMember {
                id: Uuid::new_v4(),
                team_id: team.id,
                user_id: invitation.user_id,
                role: TeamRole::Member,
                joined_at: now,
            };
            let mut accepted = invitation.clone();
            accepted.status = InvitationStatus::Accepted;

            match store.commit_membership(team, member, accepted.clone()).await {
                Ok(team) => {
                    tracing::info!(
                        team_id = %team.id,
                        user_id = %invitation.user_id,
                        members = team.current_member_count,
                        "invitation accepted"
                    );
                    return Ok(accepted);
                }
                Err(StoreError::RevisionConflict(_)) if attempts < OPTIMISTIC_WRITE_MAX_RETRIES => {
                    attempts += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Activate a forming team once it has enough members
    pub async fn activate_team(engine: &Engine, team_id: Uuid) -> EngineResult<Team> {
        let store = engine.store();
        let mut team = store
            .get_team(team_id)
            .await?
            .ok_or_else(|| EngineError::NotFound("Team not found".to_string()))?;
        if !team.status.can_transition_to(TeamStatus::Active) {
            return Err(EngineError::Validation(format!(
                "Team cannot transition from {} to active",
                team.status
            )));
        }
        if team.current_member_count < engine.config().teams.activation_threshold {
            return Err(EngineError::validation(
                "Team needs at least 2 members to activate",
            ));
        }
        team.status = TeamStatus::Active;
        let team = store.update_team(team).await?;
        tracing::info!(team_id = %team.id, "team activated");
        Ok(team)
    }

    /// Disband a team. Captain only; terminal.
    pub async fn disband_team(
        engine: &Engine,
        team_id: Uuid,
        requested_by: Uuid,
    ) -> EngineResult<Team> {
        let store = engine.store();
        let mut team = store
            .get_team(team_id)
            .await?
            .ok_or_else(|| EngineError::NotFound("Team not found".to_string()))?;
        if team.captain_id != requested_by {
            return Err(EngineError::forbidden("Only team captain can disband the team"));
        }
        if team.status == TeamStatus::Disbanded {
            return Err(EngineError::validation("Team is already disbanded"));
        }
        team.status = TeamStatus::Disbanded;
        let team = store.update_team(team).await?;
        tracing::info!(team_id = %team.id, "team disbanded");
        Ok(team)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::test_support::{seed_user, seed_user_with, test_engine};
    use crate::models::AccountStatus;

    async fn forming_team(engine: &Engine) -> (Team, crate::models::User) {
        let captain = seed_user(engine, true).await;
        let team = TeamService::create_team(
            engine,
            NewTeam {
                name: "AI Innovators".to_string(),
                captain_id: captain.id,
                max_members: Some(3),
            },
        )
        .await
        .unwrap();
        (team, captain)
    }

    async fn invite_and_accept(engine: &Engine, team: &Team, captain_id: Uuid) -> Uuid {
        let user = seed_user(engine, true).await;
        let invitation = TeamService::invite_member(
            engine,
            team.id,
            user.id,
            captain_id,
            String::new(),
        )
        .await
        .unwrap();
        TeamService::respond_to_invitation(engine, invitation.id, true)
            .await
            .unwrap();
        user.id
    }

    #[tokio::test]
    async fn test_create_team_counts_the_captain() {
        let (engine, _clock) = test_engine(Utc::now());
        let (team, captain) = forming_team(&engine).await;

        assert_eq!(team.current_member_count, 1);
        assert_eq!(team.status, TeamStatus::Forming);
        assert_eq!(team.invite_code.len(), 8);

        let member = engine
            .store()
            .find_team_member(team.id, captain.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(member.role, TeamRole::Captain);
    }

    #[tokio::test]
    async fn test_create_team_requires_active_captain() {
        let (engine, _clock) = test_engine(Utc::now());
        let suspended = seed_user_with(&engine, AccountStatus::Suspended, true, None).await;

        let err = TeamService::create_team(
            &engine,
            NewTeam {
                name: "AI Innovators".to_string(),
                captain_id: suspended.id,
                max_members: None,
            },
        )
        .await
        .unwrap_err();
        match err {
            EngineError::Validation(reason) => assert_eq!(reason, "Account not active"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invitation_acceptance_grows_the_team() {
        let (engine, _clock) = test_engine(Utc::now());
        let (team, captain) = forming_team(&engine).await;

        invite_and_accept(&engine, &team, captain.id).await;

        let team = engine.store().get_team(team.id).await.unwrap().unwrap();
        assert_eq!(team.current_member_count, 2);
        assert!(team.count_invariant_holds());
    }

    #[tokio::test]
    async fn test_full_team_rejects_invitations() {
        let (engine, _clock) = test_engine(Utc::now());
        let (team, captain) = forming_team(&engine).await;
        invite_and_accept(&engine, &team, captain.id).await;
        invite_and_accept(&engine, &team, captain.id).await;

        // max_members is 3 and the team is full now
        let user = seed_user(&engine, true).await;
        let err = TeamService::invite_member(&engine, team.id, user.id, captain.id, String::new())
            .await
            .unwrap_err();
        match err {
            EngineError::Validation(reason) => assert_eq!(reason, "Team is full"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_race_for_the_last_slot_admits_exactly_one() {
        let (engine, _clock) = test_engine(Utc::now());
        let (team, captain) = forming_team(&engine).await;
        invite_and_accept(&engine, &team, captain.id).await;

        // One slot left, two pending invitations
        let first = seed_user(&engine, true).await;
        let second = seed_user(&engine, true).await;
        let invitation_a =
            TeamService::invite_member(&engine, team.id, first.id, captain.id, String::new())
                .await
                .unwrap();
        let invitation_b =
            TeamService::invite_member(&engine, team.id, second.id, captain.id, String::new())
                .await
                .unwrap();

        let (a, b) = tokio::join!(
            TeamService::respond_to_invitation(&engine, invitation_a.id, true),
            TeamService::respond_to_invitation(&engine, invitation_b.id, true),
        );
        let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1);

        let loser = if a.is_err() { a.unwrap_err() } else { b.unwrap_err() };
        match loser {
            EngineError::Validation(reason) => assert_eq!(reason, "Team is full"),
            other => panic!("unexpected error: {other:?}"),
        }

        let team = engine.store().get_team(team.id).await.unwrap().unwrap();
        assert_eq!(team.current_member_count, 3);
        assert!(team.count_invariant_holds());
    }

    #[tokio::test]
    async fn test_invitations_expire_lazily() {
        let (engine, clock) = test_engine(Utc::now());
        let (team, captain) = forming_team(&engine).await;
        let user = seed_user(&engine, true).await;
        let invitation =
            TeamService::invite_member(&engine, team.id, user.id, captain.id, String::new())
                .await
                .unwrap();

        clock.advance(Duration::days(8));
        let err = TeamService::respond_to_invitation(&engine, invitation.id, true)
            .await
            .unwrap_err();
        match err {
            EngineError::Validation(reason) => assert_eq!(reason, "Invitation has expired"),
            other => panic!("unexpected error: {other:?}"),
        }

        let stored = engine
            .store()
            .get_invitation(invitation.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, InvitationStatus::Expired);
        // The member count never moved
        let team = engine.store().get_team(team.id).await.unwrap().unwrap();
        assert_eq!(team.current_member_count, 1);
    }

    #[tokio::test]
    async fn test_activation_needs_two_members() {
        let (engine, _clock) = test_engine(Utc::now());
        let (team, captain) = forming_team(&engine).await;

        let err = TeamService::activate_team(&engine, team.id).await.unwrap_err();
        match err {
            EngineError::Validation(reason) => {
                assert_eq!(reason, "Team needs at least 2 members to activate")
            }
            other => panic!("unexpected error: {other:?}"),
        }

        invite_and_accept(&engine, &team, captain.id).await;
        let team = TeamService::activate_team(&engine, team.id).await.unwrap();
        assert_eq!(team.status, TeamStatus::Active);

        // Active teams never return to forming and stop taking members
        let user = seed_user(&engine, true).await;
        let err = TeamService::invite_member(&engine, team.id, user.id, captain.id, String::new())
            .await
            .unwrap_err();
        match err {
            EngineError::Validation(reason) => {
                assert_eq!(reason, "Team is not accepting new members")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_disband_is_captain_only() {
        let (engine, _clock) = test_engine(Utc::now());
        let (team, captain) = forming_team(&engine).await;
        let stranger = seed_user(&engine, true).await;

        let err = TeamService::disband_team(&engine, team.id, stranger.id)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Authorization(_)));

        let team = TeamService::disband_team(&engine, team.id, captain.id)
            .await
            .unwrap();
        assert_eq!(team.status, TeamStatus::Disbanded);
    }

    #[tokio::test]
    async fn test_duplicate_pending_invitation_is_rejected() {
        let (engine, _clock) = test_engine(Utc::now());
        let (team, captain) = forming_team(&engine).await;
        let user = seed_user(&engine, true).await;

        TeamService::invite_member(&engine, team.id, user.id, captain.id, String::new())
            .await
            .unwrap();
        let err = TeamService::invite_member(&engine, team.id, user.id, captain.id, String::new())
            .await
            .unwrap_err();
        match err {
            EngineError::Validation(reason) => {
                assert_eq!(reason, "Invitation already pending for this user")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
