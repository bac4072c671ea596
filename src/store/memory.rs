//! In-memory storage collaborator
//!
//! Reference implementation of the store traits. Every mutating call
//! runs under one writer lock, which gives each call the atomic
//! read-validate-write semantics the engine's concurrency model
//! assumes. Backs the test suite and small single-process deployments.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::voting::{AnomalyFlag, Credibility};
use crate::models::{
    Competition, CompetitionRound, Institution, Judge, JudgeAssignment, JudgeRecusal, Participant,
    Registration, Review, Submission, SubmissionFile, Team, TeamInvitation, TeamMember, User, Vote,
    VoteOption, VotingSession,
};
use crate::store::{
    CompetitionStore, IdentityStore, JudgeStore, RegistrationStore, StoreError, StoreResult,
    SubmissionStore, TeamStore, VotingStore,
};

#[derive(Default)]
struct State {
    institutions: HashMap<Uuid, Institution>,
    users: HashMap<Uuid, User>,

    teams: HashMap<Uuid, Team>,
    team_members: Vec<TeamMember>,
    invitations: HashMap<Uuid, TeamInvitation>,

    competitions: HashMap<Uuid, Competition>,
    rounds: HashMap<Uuid, CompetitionRound>,

    registrations: HashMap<Uuid, Registration>,
    registration_keys: HashMap<(Uuid, Participant), Uuid>,

    submissions: HashMap<Uuid, Submission>,
    submission_files: Vec<SubmissionFile>,

    sessions: HashMap<Uuid, VotingSession>,
    options: HashMap<Uuid, VoteOption>,
    votes: Vec<Vote>,

    judges: HashMap<Uuid, Judge>,
    assignments: HashMap<Uuid, JudgeAssignment>,
    assignment_keys: HashMap<(Uuid, Uuid), Uuid>,
    reviews: HashMap<Uuid, Review>,
    recusals: Vec<JudgeRecusal>,
}

impl State {
    fn open_review_count(&self, judge_id: Uuid) -> u32 {
        self.reviews
            .values()
            .filter(|r| r.judge_id == judge_id && r.is_open())
            .count() as u32
    }
}

/// In-memory engine store
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityStore for MemoryStore {
    async fn insert_institution(&self, institution: Institution) -> StoreResult<Institution> {
        let mut state = self.state.write().await;
        state.institutions.insert(institution.id, institution.clone());
        Ok(institution)
    }

    async fn get_institution(&self, id: Uuid) -> StoreResult<Option<Institution>> {
        Ok(self.state.read().await.institutions.get(&id).cloned())
    }

    async fn update_institution(&self, institution: Institution) -> StoreResult<Institution> {
        let mut state = self.state.write().await;
        if !state.institutions.contains_key(&institution.id) {
            return Err(StoreError::NotFound("Institution not found".to_string()));
        }
        state.institutions.insert(institution.id, institution.clone());
        Ok(institution)
    }

    async fn insert_user(&self, user: User) -> StoreResult<User> {
        let mut state = self.state.write().await;
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn update_user(&self, user: User) -> StoreResult<User> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&user.id) {
            return Err(StoreError::NotFound("User not found".to_string()));
        }
        state.users.insert(user.id, user.clone());
        Ok(user)
    }
}

#[async_trait]
impl TeamStore for MemoryStore {
    async fn insert_team(&self, team: Team, captain: TeamMember) -> StoreResult<Team> {
        let mut state = self.state.write().await;
        state.teams.insert(team.id, team.clone());
        state.team_members.push(captain);
        Ok(team)
    }

    async fn get_team(&self, id: Uuid) -> StoreResult<Option<Team>> {
        Ok(self.state.read().await.teams.get(&id).cloned())
    }

    async fn update_team(&self, mut team: Team) -> StoreResult<Team> {
        let mut state = self.state.write().await;
        let stored = state
            .teams
            .get(&team.id)
            .ok_or_else(|| StoreError::NotFound("Team not found".to_string()))?;
        if stored.revision != team.revision {
            return Err(StoreError::RevisionConflict("team".to_string()));
        }
        team.revision += 1;
        state.teams.insert(team.id, team.clone());
        Ok(team)
    }

    async fn list_team_members(&self, team_id: Uuid) -> StoreResult<Vec<TeamMember>> {
        let state = self.state.read().await;
        Ok(state
            .team_members
            .iter()
            .filter(|m| m.team_id == team_id)
            .cloned()
            .collect())
    }

    async fn find_team_member(
        &self,
        team_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<TeamMember>> {
        let state = self.state.read().await;
        Ok(state
            .team_members
            .iter()
            .find(|m| m.team_id == team_id && m.user_id == user_id)
            .cloned())
    }

    async fn insert_invitation(&self, invitation: TeamInvitation) -> StoreResult<TeamInvitation> {
        let mut state = self.state.write().await;
        state.invitations.insert(invitation.id, invitation.clone());
        Ok(invitation)
    }

    async fn get_invitation(&self, id: Uuid) -> StoreResult<Option<TeamInvitation>> {
        Ok(self.state.read().await.invitations.get(&id).cloned())
    }

    async fn find_pending_invitation(
        &self,
        team_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<TeamInvitation>> {
        let state = self.state.read().await;
        Ok(state
            .invitations
            .values()
            .find(|i| {
                i.team_id == team_id
                    && i.user_id == user_id
                    && i.status == crate::models::InvitationStatus::Pending
            })
            .cloned())
    }

    async fn update_invitation(&self, invitation: TeamInvitation) -> StoreResult<TeamInvitation> {
        let mut state = self.state.write().await;
        if !state.invitations.contains_key(&invitation.id) {
            return Err(StoreError::NotFound("Invitation not found".to_string()));
        }
        state.invitations.insert(invitation.id, invitation.clone());
        Ok(invitation)
    }

    async fn commit_membership(
        &self,
        mut team: Team,
        member: TeamMember,
        invitation: TeamInvitation,
    ) -> StoreResult<Team> {
        let mut state = self.state.write().await;
        let stored = state
            .teams
            .get(&team.id)
            .ok_or_else(|| StoreError::NotFound("Team not found".to_string()))?;
        if stored.revision != team.revision {
            return Err(StoreError::RevisionConflict("team".to_string()));
        }
        team.revision += 1;
        state.teams.insert(team.id, team.clone());
        state.team_members.push(member);
        state.invitations.insert(invitation.id, invitation);
        Ok(team)
    }
}

#[async_trait]
impl CompetitionStore for MemoryStore {
    async fn insert_competition(&self, competition: Competition) -> StoreResult<Competition> {
        let mut state = self.state.write().await;
        state.competitions.insert(competition.id, competition.clone());
        Ok(competition)
    }

    async fn get_competition(&self, id: Uuid) -> StoreResult<Option<Competition>> {
        Ok(self.state.read().await.competitions.get(&id).cloned())
    }

    async fn update_competition(&self, mut competition: Competition) -> StoreResult<Competition> {
        let mut state = self.state.write().await;
        let stored = state
            .competitions
            .get(&competition.id)
            .ok_or_else(|| StoreError::NotFound("Competition not found".to_string()))?;
        if stored.revision != competition.revision {
            return Err(StoreError::RevisionConflict("competition".to_string()));
        }
        competition.revision += 1;
        state.competitions.insert(competition.id, competition.clone());
        Ok(competition)
    }

    async fn insert_round(&self, round: CompetitionRound) -> StoreResult<CompetitionRound> {
        let mut state = self.state.write().await;
        state.rounds.insert(round.id, round.clone());
        Ok(round)
    }

    async fn get_round(&self, id: Uuid) -> StoreResult<Option<CompetitionRound>> {
        Ok(self.state.read().await.rounds.get(&id).cloned())
    }

    async fn list_rounds(&self, competition_id: Uuid) -> StoreResult<Vec<CompetitionRound>> {
        let state = self.state.read().await;
        let mut rounds: Vec<_> = state
            .rounds
            .values()
            .filter(|r| r.competition_id == competition_id)
            .cloned()
            .collect();
        rounds.sort_by_key(|r| r.submission_deadline);
        Ok(rounds)
    }
}

#[async_trait]
impl RegistrationStore for MemoryStore {
    async fn insert_registration(&self, registration: Registration) -> StoreResult<Registration> {
        let mut state = self.state.write().await;
        let key = (registration.competition_id, registration.participant);
        if state.registration_keys.contains_key(&key) {
            return Err(StoreError::Duplicate(
                "registration for (competition, participant)".to_string(),
            ));
        }
        state.registration_keys.insert(key, registration.id);
        state.registrations.insert(registration.id, registration.clone());
        Ok(registration)
    }

    async fn get_registration(&self, id: Uuid) -> StoreResult<Option<Registration>> {
        Ok(self.state.read().await.registrations.get(&id).cloned())
    }

    async fn find_registration(
        &self,
        competition_id: Uuid,
        participant: Participant,
    ) -> StoreResult<Option<Registration>> {
        let state = self.state.read().await;
        Ok(state
            .registration_keys
            .get(&(competition_id, participant))
            .and_then(|id| state.registrations.get(id))
            .cloned())
    }

    async fn list_registrations(&self, competition_id: Uuid) -> StoreResult<Vec<Registration>> {
        let state = self.state.read().await;
        let mut registrations: Vec<_> = state
            .registrations
            .values()
            .filter(|r| r.competition_id == competition_id)
            .cloned()
            .collect();
        registrations.sort_by_key(|r| r.registered_at);
        Ok(registrations)
    }
}

#[async_trait]
impl SubmissionStore for MemoryStore {
    async fn insert_submission(&self, submission: Submission) -> StoreResult<Submission> {
        let mut state = self.state.write().await;
        state.submissions.insert(submission.id, submission.clone());
        Ok(submission)
    }

    async fn get_submission(&self, id: Uuid) -> StoreResult<Option<Submission>> {
        Ok(self.state.read().await.submissions.get(&id).cloned())
    }

    async fn update_submission(&self, mut submission: Submission) -> StoreResult<Submission> {
        let mut state = self.state.write().await;
        let stored = state
            .submissions
            .get(&submission.id)
            .ok_or_else(|| StoreError::NotFound("Submission not found".to_string()))?;
        if stored.revision != submission.revision {
            return Err(StoreError::RevisionConflict("submission".to_string()));
        }
        submission.revision += 1;
        state.submissions.insert(submission.id, submission.clone());
        Ok(submission)
    }

    async fn list_submission_versions(
        &self,
        registration_id: Uuid,
        round_id: Uuid,
    ) -> StoreResult<Vec<Submission>> {
        let state = self.state.read().await;
        let mut versions: Vec<_> = state
            .submissions
            .values()
            .filter(|s| s.registration_id == registration_id && s.round_id == round_id)
            .cloned()
            .collect();
        versions.sort_by_key(|s| s.version);
        Ok(versions)
    }

    async fn list_competition_submissions(
        &self,
        competition_id: Uuid,
    ) -> StoreResult<Vec<Submission>> {
        let state = self.state.read().await;
        let mut submissions: Vec<_> = state
            .submissions
            .values()
            .filter(|s| s.competition_id == competition_id)
            .cloned()
            .collect();
        submissions.sort_by_key(|s| s.created_at);
        Ok(submissions)
    }

    async fn finalize_submission(&self, mut submission: Submission) -> StoreResult<Submission> {
        let mut state = self.state.write().await;
        let stored = state
            .submissions
            .get(&submission.id)
            .ok_or_else(|| StoreError::NotFound("Submission not found".to_string()))?;
        if stored.revision != submission.revision {
            return Err(StoreError::RevisionConflict("submission".to_string()));
        }
        submission.revision += 1;

        // One final version per (registration, round): clear siblings
        // in the same atomic unit
        let siblings: Vec<Uuid> = state
            .submissions
            .values()
            .filter(|s| {
                s.id != submission.id
                    && s.registration_id == submission.registration_id
                    && s.round_id == submission.round_id
                    && s.is_final
            })
            .map(|s| s.id)
            .collect();
        for id in siblings {
            if let Some(sibling) = state.submissions.get_mut(&id) {
                sibling.is_final = false;
                sibling.revision += 1;
            }
        }

        state.submissions.insert(submission.id, submission.clone());
        Ok(submission)
    }

    async fn upsert_submission_file(&self, file: SubmissionFile) -> StoreResult<SubmissionFile> {
        let mut state = self.state.write().await;
        if let Some(existing) = state
            .submission_files
            .iter_mut()
            .find(|f| f.submission_id == file.submission_id && f.file_id == file.file_id)
        {
            existing.category = file.category.clone();
            existing.is_primary = file.is_primary;
            Ok(existing.clone())
        } else {
            state.submission_files.push(file.clone());
            Ok(file)
        }
    }

    async fn list_submission_files(
        &self,
        submission_id: Uuid,
    ) -> StoreResult<Vec<SubmissionFile>> {
        let state = self.state.read().await;
        Ok(state
            .submission_files
            .iter()
            .filter(|f| f.submission_id == submission_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl VotingStore for MemoryStore {
    async fn insert_session(&self, session: VotingSession) -> StoreResult<VotingSession> {
        let mut state = self.state.write().await;
        state.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn get_session(&self, id: Uuid) -> StoreResult<Option<VotingSession>> {
        Ok(self.state.read().await.sessions.get(&id).cloned())
    }

    async fn update_session(&self, mut session: VotingSession) -> StoreResult<VotingSession> {
        let mut state = self.state.write().await;
        let stored = state
            .sessions
            .get(&session.id)
            .ok_or_else(|| StoreError::NotFound("Voting session not found".to_string()))?;
        if stored.revision != session.revision {
            return Err(StoreError::RevisionConflict("voting session".to_string()));
        }
        session.revision += 1;
        state.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn insert_option(&self, option: VoteOption) -> StoreResult<VoteOption> {
        let mut state = self.state.write().await;
        state.options.insert(option.id, option.clone());
        Ok(option)
    }

    async fn list_options(&self, session_id: Uuid) -> StoreResult<Vec<VoteOption>> {
        let state = self.state.read().await;
        let mut options: Vec<_> = state
            .options
            .values()
            .filter(|o| o.session_id == session_id)
            .cloned()
            .collect();
        options.sort_by_key(|o| o.display_order);
        Ok(options)
    }

    async fn append_vote(&self, vote: Vote, expected_session_revision: u64) -> StoreResult<Vote> {
        let mut state = self.state.write().await;
        let session = state
            .sessions
            .get_mut(&vote.session_id)
            .ok_or_else(|| StoreError::NotFound("Voting session not found".to_string()))?;
        if session.revision != expected_session_revision {
            return Err(StoreError::RevisionConflict("voting session".to_string()));
        }
        session.revision += 1;
        state.votes.push(vote.clone());
        Ok(vote)
    }

    async fn list_votes(&self, session_id: Uuid) -> StoreResult<Vec<Vote>> {
        let state = self.state.read().await;
        Ok(state
            .votes
            .iter()
            .filter(|v| v.session_id == session_id)
            .cloned()
            .collect())
    }

    async fn list_votes_by_voter(
        &self,
        session_id: Uuid,
        voter_id: Uuid,
    ) -> StoreResult<Vec<Vote>> {
        let state = self.state.read().await;
        Ok(state
            .votes
            .iter()
            .filter(|v| v.session_id == session_id && v.voter_id == voter_id)
            .cloned()
            .collect())
    }

    async fn update_vote_credibility(
        &self,
        vote_id: Uuid,
        credibility: Credibility,
        flags: Vec<AnomalyFlag>,
    ) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let vote = state
            .votes
            .iter_mut()
            .find(|v| v.id == vote_id)
            .ok_or_else(|| StoreError::NotFound("Vote not found".to_string()))?;
        vote.credibility = credibility;
        vote.anomaly_flags = flags;
        Ok(())
    }
}

#[async_trait]
impl JudgeStore for MemoryStore {
    async fn insert_judge(&self, judge: Judge) -> StoreResult<Judge> {
        let mut state = self.state.write().await;
        state.judges.insert(judge.id, judge.clone());
        Ok(judge)
    }

    async fn get_judge(&self, id: Uuid) -> StoreResult<Option<Judge>> {
        Ok(self.state.read().await.judges.get(&id).cloned())
    }

    async fn insert_assignment(
        &self,
        assignment: JudgeAssignment,
    ) -> StoreResult<JudgeAssignment> {
        let mut state = self.state.write().await;
        let key = (assignment.competition_id, assignment.judge_id);
        if state.assignment_keys.contains_key(&key) {
            return Err(StoreError::Duplicate(
                "judge assignment for (competition, judge)".to_string(),
            ));
        }
        state.assignment_keys.insert(key, assignment.id);
        state.assignments.insert(assignment.id, assignment.clone());
        Ok(assignment)
    }

    async fn find_assignment(
        &self,
        competition_id: Uuid,
        judge_id: Uuid,
    ) -> StoreResult<Option<JudgeAssignment>> {
        let state = self.state.read().await;
        Ok(state
            .assignment_keys
            .get(&(competition_id, judge_id))
            .and_then(|id| state.assignments.get(id))
            .cloned())
    }

    async fn list_assignments(&self, competition_id: Uuid) -> StoreResult<Vec<JudgeAssignment>> {
        let state = self.state.read().await;
        let mut assignments: Vec<_> = state
            .assignments
            .values()
            .filter(|a| a.competition_id == competition_id)
            .cloned()
            .collect();
        assignments.sort_by_key(|a| a.assigned_at);
        Ok(assignments)
    }

    async fn count_open_reviews(&self, judge_id: Uuid) -> StoreResult<u32> {
        Ok(self.state.read().await.open_review_count(judge_id))
    }

    async fn insert_review_checked(&self, review: Review, max_open: u32) -> StoreResult<Review> {
        let mut state = self.state.write().await;
        if state.open_review_count(review.judge_id) >= max_open {
            return Err(StoreError::CapacityExceeded(format!(
                "judge {}",
                review.judge_id
            )));
        }
        state.reviews.insert(review.id, review.clone());
        Ok(review)
    }

    async fn get_review(&self, id: Uuid) -> StoreResult<Option<Review>> {
        Ok(self.state.read().await.reviews.get(&id).cloned())
    }

    async fn update_review(&self, review: Review) -> StoreResult<Review> {
        let mut state = self.state.write().await;
        if !state.reviews.contains_key(&review.id) {
            return Err(StoreError::NotFound("Review not found".to_string()));
        }
        state.reviews.insert(review.id, review.clone());
        Ok(review)
    }

    async fn list_reviews_for_submission(&self, submission_id: Uuid) -> StoreResult<Vec<Review>> {
        let state = self.state.read().await;
        Ok(state
            .reviews
            .values()
            .filter(|r| r.submission_id == submission_id)
            .cloned()
            .collect())
    }

    async fn list_reviews_for_competition(
        &self,
        competition_id: Uuid,
    ) -> StoreResult<Vec<Review>> {
        let state = self.state.read().await;
        Ok(state
            .reviews
            .values()
            .filter(|r| r.competition_id == competition_id)
            .cloned()
            .collect())
    }

    async fn insert_recusal(&self, recusal: JudgeRecusal) -> StoreResult<JudgeRecusal> {
        let mut state = self.state.write().await;
        state.recusals.push(recusal.clone());
        Ok(recusal)
    }

    async fn is_recused(&self, judge_id: Uuid, competition_id: Uuid) -> StoreResult<bool> {
        let state = self.state.read().await;
        Ok(state
            .recusals
            .iter()
            .any(|r| r.judge_id == judge_id && r.competition_id == competition_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ReviewStatus, TeamRole, TeamStatus};
    use chrono::Utc;

    fn team_fixture() -> (Team, TeamMember) {
        let team_id = Uuid::new_v4();
        let captain_id = Uuid::new_v4();
        let team = Team {
            id: team_id,
            name: "AI Innovators".to_string(),
            captain_id,
            max_members: 4,
            current_member_count: 1,
            status: TeamStatus::Forming,
            invite_code: "AB12CD34".to_string(),
            created_at: Utc::now(),
            revision: 0,
        };
        let captain = TeamMember {
            id: Uuid::new_v4(),
            team_id,
            user_id: captain_id,
            role: TeamRole::Captain,
            joined_at: Utc::now(),
        };
        (team, captain)
    }

    #[tokio::test]
    async fn test_team_update_is_revision_checked() {
        let store = MemoryStore::new();
        let (team, captain) = team_fixture();
        let team = store.insert_team(team, captain).await.unwrap();

        let mut fresh = team.clone();
        fresh.current_member_count = 2;
        let updated = store.update_team(fresh).await.unwrap();
        assert_eq!(updated.revision, 1);

        // A write based on the pre-update read loses
        let mut stale = team;
        stale.current_member_count = 3;
        let err = store.update_team(stale).await.unwrap_err();
        assert!(matches!(err, StoreError::RevisionConflict(_)));
    }

    #[tokio::test]
    async fn test_registration_unique_key() {
        let store = MemoryStore::new();
        let competition_id = Uuid::new_v4();
        let participant = Participant::Individual(Uuid::new_v4());

        let registration = Registration {
            id: Uuid::new_v4(),
            competition_id,
            participant,
            registration_data: serde_json::json!({}),
            registered_at: Utc::now(),
        };
        store.insert_registration(registration.clone()).await.unwrap();

        let duplicate = Registration {
            id: Uuid::new_v4(),
            ..registration
        };
        let err = store.insert_registration(duplicate).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));

        let found = store
            .find_registration(competition_id, participant)
            .await
            .unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn test_insert_review_checked_enforces_capacity() {
        let store = MemoryStore::new();
        let judge_id = Uuid::new_v4();
        let competition_id = Uuid::new_v4();

        let review = |submission_id| Review {
            id: Uuid::new_v4(),
            competition_id,
            submission_id,
            judge_id,
            status: ReviewStatus::Assigned,
            overall_score: None,
            created_at: Utc::now(),
        };

        store
            .insert_review_checked(review(Uuid::new_v4()), 2)
            .await
            .unwrap();
        store
            .insert_review_checked(review(Uuid::new_v4()), 2)
            .await
            .unwrap();
        let err = store
            .insert_review_checked(review(Uuid::new_v4()), 2)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::CapacityExceeded(_)));
        assert_eq!(store.count_open_reviews(judge_id).await.unwrap(), 2);
    }

    #[test]
    fn test_upsert_submission_file_updates_in_place() {
        // Sync-side check through the runtime handle helper
        tokio_test::block_on(async {
            let store = MemoryStore::new();
            let submission_id = Uuid::new_v4();
            let file_id = Uuid::new_v4();

            let file = SubmissionFile {
                submission_id,
                file_id,
                category: "main_document".to_string(),
                is_primary: false,
                attached_at: Utc::now(),
            };
            store.upsert_submission_file(file.clone()).await.unwrap();

            let mut reattached = file;
            reattached.category = "presentation".to_string();
            reattached.is_primary = true;
            store.upsert_submission_file(reattached).await.unwrap();

            let files = store.list_submission_files(submission_id).await.unwrap();
            assert_eq!(files.len(), 1);
            assert_eq!(files[0].category, "presentation");
            assert!(files[0].is_primary);
        });
    }

    #[tokio::test]
    async fn test_append_vote_serializes_on_session_revision() {
        use crate::models::voting::{Ballot, VotingScheme, VotingSessionStatus};

        let store = MemoryStore::new();
        let now = Utc::now();
        let session = VotingSession {
            id: Uuid::new_v4(),
            competition_id: Uuid::new_v4(),
            name: "Finals".to_string(),
            scheme: VotingScheme::Traditional,
            status: VotingSessionStatus::Active,
            start_time: now,
            end_time: now + chrono::Duration::hours(1),
            votes_per_voter: 1,
            requires_authentication: false,
            prevent_vote_changing: true,
            show_results_during_voting: false,
            credit_budget: 100,
            created_by: Uuid::new_v4(),
            created_at: now,
            revision: 0,
        };
        let session = store.insert_session(session).await.unwrap();

        let vote = |voter_id| Vote {
            id: Uuid::new_v4(),
            session_id: session.id,
            voter_id,
            ballot: Ballot::Single { option_id: Uuid::new_v4() },
            voter_ip: None,
            cast_at: now,
            vote_weight: 1.0,
            cost: 0,
            supersedes: None,
            credibility: Credibility::Credible,
            anomaly_flags: vec![],
        };

        store.append_vote(vote(Uuid::new_v4()), 0).await.unwrap();
        // Second append against the same snapshot revision loses
        let err = store.append_vote(vote(Uuid::new_v4()), 0).await.unwrap_err();
        assert!(matches!(err, StoreError::RevisionConflict(_)));
        // After re-reading the bumped revision it goes through
        store.append_vote(vote(Uuid::new_v4()), 1).await.unwrap();
        assert_eq!(store.list_votes(session.id).await.unwrap().len(), 2);
    }
}
