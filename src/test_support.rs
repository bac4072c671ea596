//! Shared fixtures for service tests

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::models::{
    AccountStatus, Competition, CompetitionRound, CompetitionStatus, CompetitionType, Judge,
    Participant, Registration, Submission, SubmissionStatus, Team, TeamMember, TeamRole,
    TeamStatus, User,
};
use crate::state::Engine;
use crate::store::memory::MemoryStore;
use crate::store::{
    CompetitionStore, IdentityStore, JudgeStore, RegistrationStore, SubmissionStore, TeamStore,
};
use crate::utils::time::ManualClock;

/// Engine over a fresh memory store with a pinned manual clock
pub fn test_engine(now: DateTime<Utc>) -> (Engine, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(now));
    let engine = Engine::new(
        Arc::new(MemoryStore::new()),
        clock.clone(),
        EngineConfig::default(),
    );
    (engine, clock)
}

pub async fn seed_user(engine: &Engine, email_verified: bool) -> User {
    seed_user_with(engine, AccountStatus::Active, email_verified, None).await
}

pub async fn seed_user_with(
    engine: &Engine,
    account_status: AccountStatus,
    email_verified: bool,
    institution_id: Option<Uuid>,
) -> User {
    let user = User {
        id: Uuid::new_v4(),
        email: format!("student+{}@university.edu", Uuid::new_v4().simple()),
        first_name: "John".to_string(),
        last_name: "Doe".to_string(),
        username: None,
        institution_id,
        skills: vec![],
        interests: vec![],
        account_status,
        email_verified,
        created_at: engine.now(),
    };
    engine.store().insert_user(user).await.unwrap()
}

/// Published competition with an open registration window around `now`
pub async fn seed_published_competition(
    engine: &Engine,
    competition_type: CompetitionType,
) -> Competition {
    let now = engine.now();
    let competition = Competition {
        id: Uuid::new_v4(),
        name: "AI Innovation Challenge 2024".to_string(),
        slug: "ai-innovation-challenge-2024".to_string(),
        description: "Build innovative AI solutions".to_string(),
        competition_type,
        status: CompetitionStatus::Published,
        registration_start: now - Duration::days(1),
        registration_end: now + Duration::days(30),
        competition_start: now + Duration::days(35),
        competition_end: now + Duration::days(90),
        required_expertise: vec![],
        created_by: Uuid::new_v4(),
        created_at: now,
        revision: 0,
    };
    engine.store().insert_competition(competition).await.unwrap()
}

pub async fn seed_round(
    engine: &Engine,
    competition_id: Uuid,
    required_file_categories: Vec<String>,
    submission_deadline: DateTime<Utc>,
) -> CompetitionRound {
    let round = CompetitionRound {
        id: Uuid::new_v4(),
        competition_id,
        name: "Round 1".to_string(),
        submission_deadline,
        judging_deadline: submission_deadline + Duration::days(7),
        required_file_categories,
        created_at: engine.now(),
    };
    engine.store().insert_round(round).await.unwrap()
}

pub async fn seed_team(engine: &Engine, captain_id: Uuid) -> Team {
    let team = Team {
        id: Uuid::new_v4(),
        name: "AI Innovators".to_string(),
        captain_id,
        max_members: 4,
        current_member_count: 1,
        status: TeamStatus::Forming,
        invite_code: "AB12CD34".to_string(),
        created_at: engine.now(),
        revision: 0,
    };
    let captain = TeamMember {
        id: Uuid::new_v4(),
        team_id: team.id,
        user_id: captain_id,
        role: TeamRole::Captain,
        joined_at: engine.now(),
    };
    engine.store().insert_team(team, captain).await.unwrap()
}

pub async fn seed_registration(
    engine: &Engine,
    competition_id: Uuid,
    participant: Participant,
) -> Registration {
    let registration = Registration {
        id: Uuid::new_v4(),
        competition_id,
        participant,
        registration_data: serde_json::json!({}),
        registered_at: engine.now(),
    };
    engine.store().insert_registration(registration).await.unwrap()
}

pub async fn seed_draft_submission(
    engine: &Engine,
    competition_id: Uuid,
    round_id: Uuid,
    registration_id: Uuid,
) -> Submission {
    let submission = Submission {
        id: Uuid::new_v4(),
        competition_id,
        round_id,
        registration_id,
        title: "Revolutionary AI Solution".to_string(),
        description: String::new(),
        version: 1,
        status: SubmissionStatus::Draft,
        is_final: false,
        submission_data: serde_json::json!({}),
        submitted_at: None,
        created_at: engine.now(),
        revision: 0,
    };
    engine.store().insert_submission(submission).await.unwrap()
}

pub async fn seed_judge(
    engine: &Engine,
    max_concurrent_reviews: u32,
    institution_id: Option<Uuid>,
    expertise_tags: &[&str],
) -> Judge {
    let judge = Judge {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        institution_id,
        expertise_tags: expertise_tags.iter().map(|t| t.to_string()).collect(),
        max_concurrent_reviews,
        created_at: engine.now(),
    };
    engine.store().insert_judge(judge).await.unwrap()
}
