//! Domain models
//!
//! Plain data records shared by all engine components. The storage
//! collaborator persists them and supplies consistent reads at the
//! start of each operation.

pub mod competition;
pub mod institution;
pub mod judge;
pub mod registration;
pub mod submission;
pub mod team;
pub mod user;
pub mod voting;

pub use competition::{Competition, CompetitionRound, CompetitionStatus, CompetitionType};
pub use institution::{Institution, VerificationStatus};
pub use judge::{
    AssignmentMethod, AssignmentStatus, Judge, JudgeAssignment, JudgeRecusal, Review, ReviewStatus,
};
pub use registration::{Participant, Registration};
pub use submission::{Submission, SubmissionFile, SubmissionStatus};
pub use team::{InvitationStatus, Team, TeamInvitation, TeamMember, TeamRole, TeamStatus};
pub use user::{AccountStatus, User};
pub use voting::{
    AnomalyFlag, Ballot, Credibility, Vote, VoteOption, VotingScheme, VotingSession,
    VotingSessionStatus,
};
