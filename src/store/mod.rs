//! Storage collaborator boundary
//!
//! The engine never constructs query text. It requests abstract
//! lookups and conditional writes through these traits; the embedding
//! platform wires them to its persistence layer. [`memory::MemoryStore`]
//! is the in-process implementation backing the test suite.
//!
//! Concurrency contract: entities carrying a `revision` field are
//! written conditionally. The caller passes the entity with the
//! revision it read; the store compares against the stored revision
//! and either bumps-and-writes or fails with
//! [`StoreError::RevisionConflict`]. Multi-record writes (membership
//! commits, submission finalization, vote appends) are single calls
//! executed atomically by the implementation.

pub mod memory;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    Competition, CompetitionRound, Institution, Judge, JudgeAssignment, JudgeRecusal, Participant,
    Registration, Review, Submission, SubmissionFile, Team, TeamInvitation, TeamMember, User, Vote,
    VoteOption, VotingSession,
};
use crate::models::voting::{AnomalyFlag, Credibility};

/// Failures surfaced by a storage collaborator
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0}")]
    NotFound(String),

    #[error("Stale revision for {0}")]
    RevisionConflict(String),

    #[error("Duplicate {0}")]
    Duplicate(String),

    #[error("Capacity check failed for {0}")]
    CapacityExceeded(String),

    #[error("Storage timeout: {0}")]
    Timeout(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Users and institutions
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn insert_institution(&self, institution: Institution) -> StoreResult<Institution>;
    async fn get_institution(&self, id: Uuid) -> StoreResult<Option<Institution>>;
    async fn update_institution(&self, institution: Institution) -> StoreResult<Institution>;

    async fn insert_user(&self, user: User) -> StoreResult<User>;
    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn update_user(&self, user: User) -> StoreResult<User>;
}

/// Teams, membership, invitations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TeamStore: Send + Sync {
    /// Insert a team together with its captain membership record
    async fn insert_team(&self, team: Team, captain: TeamMember) -> StoreResult<Team>;
    async fn get_team(&self, id: Uuid) -> StoreResult<Option<Team>>;
    /// Conditional write keyed on `team.revision`
    async fn update_team(&self, team: Team) -> StoreResult<Team>;

    async fn list_team_members(&self, team_id: Uuid) -> StoreResult<Vec<TeamMember>>;
    async fn find_team_member(&self, team_id: Uuid, user_id: Uuid)
        -> StoreResult<Option<TeamMember>>;

    async fn insert_invitation(&self, invitation: TeamInvitation) -> StoreResult<TeamInvitation>;
    async fn get_invitation(&self, id: Uuid) -> StoreResult<Option<TeamInvitation>>;
    async fn find_pending_invitation(
        &self,
        team_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<TeamInvitation>>;
    async fn update_invitation(&self, invitation: TeamInvitation) -> StoreResult<TeamInvitation>;

    /// Atomically write the bumped team, the new member record, and
    /// the accepted invitation. Conditional on `team.revision`.
    async fn commit_membership(
        &self,
        team: Team,
        member: TeamMember,
        invitation: TeamInvitation,
    ) -> StoreResult<Team>;
}

/// Competitions and rounds
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompetitionStore: Send + Sync {
    async fn insert_competition(&self, competition: Competition) -> StoreResult<Competition>;
    async fn get_competition(&self, id: Uuid) -> StoreResult<Option<Competition>>;
    /// Conditional write keyed on `competition.revision`
    async fn update_competition(&self, competition: Competition) -> StoreResult<Competition>;

    async fn insert_round(&self, round: CompetitionRound) -> StoreResult<CompetitionRound>;
    async fn get_round(&self, id: Uuid) -> StoreResult<Option<CompetitionRound>>;
    async fn list_rounds(&self, competition_id: Uuid) -> StoreResult<Vec<CompetitionRound>>;
}

/// Registrations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RegistrationStore: Send + Sync {
    /// Insert enforcing the (competition, participant) unique key
    async fn insert_registration(&self, registration: Registration) -> StoreResult<Registration>;
    async fn get_registration(&self, id: Uuid) -> StoreResult<Option<Registration>>;
    async fn find_registration(
        &self,
        competition_id: Uuid,
        participant: Participant,
    ) -> StoreResult<Option<Registration>>;
    async fn list_registrations(&self, competition_id: Uuid) -> StoreResult<Vec<Registration>>;
}

/// Submissions, versions, and attached files
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    async fn insert_submission(&self, submission: Submission) -> StoreResult<Submission>;
    async fn get_submission(&self, id: Uuid) -> StoreResult<Option<Submission>>;
    /// Conditional write keyed on `submission.revision`
    async fn update_submission(&self, submission: Submission) -> StoreResult<Submission>;
    async fn list_submission_versions(
        &self,
        registration_id: Uuid,
        round_id: Uuid,
    ) -> StoreResult<Vec<Submission>>;
    async fn list_competition_submissions(
        &self,
        competition_id: Uuid,
    ) -> StoreResult<Vec<Submission>>;

    /// Conditional write that also clears `is_final` on sibling
    /// versions in the same atomic unit
    async fn finalize_submission(&self, submission: Submission) -> StoreResult<Submission>;

    /// Upsert on the (submission, file) pair
    async fn upsert_submission_file(&self, file: SubmissionFile) -> StoreResult<SubmissionFile>;
    async fn list_submission_files(&self, submission_id: Uuid)
        -> StoreResult<Vec<SubmissionFile>>;
}

/// Voting sessions, options, and the append-only vote log
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VotingStore: Send + Sync {
    async fn insert_session(&self, session: VotingSession) -> StoreResult<VotingSession>;
    async fn get_session(&self, id: Uuid) -> StoreResult<Option<VotingSession>>;
    /// Conditional write keyed on `session.revision`
    async fn update_session(&self, session: VotingSession) -> StoreResult<VotingSession>;

    async fn insert_option(&self, option: VoteOption) -> StoreResult<VoteOption>;
    async fn list_options(&self, session_id: Uuid) -> StoreResult<Vec<VoteOption>>;

    /// Append a vote, conditional on the session revision the caller
    /// validated against; bumps the session revision so contended
    /// casts serialize
    async fn append_vote(&self, vote: Vote, expected_session_revision: u64) -> StoreResult<Vote>;
    async fn list_votes(&self, session_id: Uuid) -> StoreResult<Vec<Vote>>;
    async fn list_votes_by_voter(
        &self,
        session_id: Uuid,
        voter_id: Uuid,
    ) -> StoreResult<Vec<Vote>>;

    /// Attach advisory credibility metadata to a recorded vote
    async fn update_vote_credibility(
        &self,
        vote_id: Uuid,
        credibility: Credibility,
        flags: Vec<AnomalyFlag>,
    ) -> StoreResult<()>;
}

/// Judges, assignments, reviews, recusals
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JudgeStore: Send + Sync {
    async fn insert_judge(&self, judge: Judge) -> StoreResult<Judge>;
    async fn get_judge(&self, id: Uuid) -> StoreResult<Option<Judge>>;

    /// Insert enforcing the (competition, judge) unique key
    async fn insert_assignment(&self, assignment: JudgeAssignment)
        -> StoreResult<JudgeAssignment>;
    async fn find_assignment(
        &self,
        competition_id: Uuid,
        judge_id: Uuid,
    ) -> StoreResult<Option<JudgeAssignment>>;
    async fn list_assignments(&self, competition_id: Uuid) -> StoreResult<Vec<JudgeAssignment>>;

    /// Derived open-review count for a judge
    async fn count_open_reviews(&self, judge_id: Uuid) -> StoreResult<u32>;

    /// Insert a review only while the judge's open-review count stays
    /// under `max_open`; the check and the write are one atomic unit
    async fn insert_review_checked(&self, review: Review, max_open: u32) -> StoreResult<Review>;
    async fn get_review(&self, id: Uuid) -> StoreResult<Option<Review>>;
    async fn update_review(&self, review: Review) -> StoreResult<Review>;
    async fn list_reviews_for_submission(&self, submission_id: Uuid) -> StoreResult<Vec<Review>>;
    async fn list_reviews_for_competition(&self, competition_id: Uuid)
        -> StoreResult<Vec<Review>>;

    async fn insert_recusal(&self, recusal: JudgeRecusal) -> StoreResult<JudgeRecusal>;
    async fn is_recused(&self, judge_id: Uuid, competition_id: Uuid) -> StoreResult<bool>;
}

/// The full storage surface the engine operates against
pub trait EngineStore:
    IdentityStore
    + TeamStore
    + CompetitionStore
    + RegistrationStore
    + SubmissionStore
    + VotingStore
    + JudgeStore
{
}

impl<T> EngineStore for T where
    T: IdentityStore
        + TeamStore
        + CompetitionStore
        + RegistrationStore
        + SubmissionStore
        + VotingStore
        + JudgeStore
{
}
