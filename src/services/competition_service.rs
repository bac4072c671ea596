//! Competition service
//!
//! Competition lifecycle, rounds, participant registration, and the
//! leaderboard query used to validate engine results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{EngineError, EngineResult},
    models::{
        Competition, CompetitionRound, CompetitionStatus, CompetitionType, Participant,
        Registration, ReviewStatus,
    },
    services::eligibility,
    state::Engine,
    store::{
        CompetitionStore, IdentityStore, JudgeStore, RegistrationStore, StoreError,
        SubmissionStore, TeamStore,
    },
    utils::validation,
};

/// Payload for creating a competition
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewCompetition {
    #[validate(length(min = 3, max = 128))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub competition_type: CompetitionType,
    pub registration_start: DateTime<Utc>,
    pub registration_end: DateTime<Utc>,
    pub competition_start: DateTime<Utc>,
    pub competition_end: DateTime<Utc>,
    #[serde(default)]
    pub required_expertise: Vec<String>,
}

/// Payload for adding a competition round
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewRound {
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    pub submission_deadline: DateTime<Utc>,
    pub judging_deadline: DateTime<Utc>,
    #[serde(default)]
    pub required_file_categories: Vec<String>,
}

/// One leaderboard line
#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
    pub registration_id: Uuid,
    pub participant: Participant,
    pub average_score: f64,
    pub total_reviews: u64,
}

/// Competition service for business logic
pub struct CompetitionService;

impl CompetitionService {
    /// Create a new competition in draft
    pub async fn create_competition(
        engine: &Engine,
        created_by: Uuid,
        payload: NewCompetition,
    ) -> EngineResult<Competition> {
        payload.validate()?;
        let name = validation::validate_name(&payload.name).map_err(EngineError::validation)?;
        validation::validate_schedule(
            payload.registration_start,
            payload.registration_end,
            payload.competition_start,
            payload.competition_end,
        )
        .map_err(EngineError::validation)?;

        let competition = Competition {
            id: Uuid::new_v4(),
            slug: validation::generate_slug(&name),
            name,
            description: payload.description,
            competition_type: payload.competition_type,
            status: CompetitionStatus::Draft,
            registration_start: payload.registration_start,
            registration_end: payload.registration_end,
            competition_start: payload.competition_start,
            competition_end: payload.competition_end,
            required_expertise: payload.required_expertise,
            created_by,
            created_at: engine.now(),
            revision: 0,
        };

        let competition = engine.store().insert_competition(competition).await?;
        tracing::info!(competition_id = %competition.id, slug = %competition.slug, "competition created");
        Ok(competition)
    }

    /// Add a round with its submission deadline and file requirements
    pub async fn add_round(
        engine: &Engine,
        competition_id: Uuid,
        payload: NewRound,
    ) -> EngineResult<CompetitionRound> {
        payload.validate()?;
        for category in &payload.required_file_categories {
            validation::validate_file_category(category).map_err(EngineError::validation)?;
        }
        if payload.submission_deadline >= payload.judging_deadline {
            return Err(EngineError::validation(
                "Judging deadline must follow the submission deadline",
            ));
        }

        let competition = load_competition(engine.store(), competition_id).await?;
        if competition.status.is_terminal() {
            return Err(EngineError::validation(
                "Cannot add rounds to a finished competition",
            ));
        }

        let round = CompetitionRound {
            id: Uuid::new_v4(),
            competition_id,
            name: payload.name,
            submission_deadline: payload.submission_deadline,
            judging_deadline: payload.judging_deadline,
            required_file_categories: payload.required_file_categories,
            created_at: engine.now(),
        };
        Ok(engine.store().insert_round(round).await?)
    }

    /// Publish a draft competition
    pub async fn publish(engine: &Engine, id: Uuid) -> EngineResult<Competition> {
        Self::transition(engine, id, CompetitionStatus::Published).await
    }

    /// Move a published competition into its active phase
    pub async fn activate(engine: &Engine, id: Uuid) -> EngineResult<Competition> {
        Self::transition(engine, id, CompetitionStatus::Active).await
    }

    /// Complete an active competition
    pub async fn complete(engine: &Engine, id: Uuid) -> EngineResult<Competition> {
        Self::transition(engine, id, CompetitionStatus::Completed).await
    }

    /// Cancel a competition from any non-terminal state
    pub async fn cancel(engine: &Engine, id: Uuid) -> EngineResult<Competition> {
        Self::transition(engine, id, CompetitionStatus::Cancelled).await
    }

    async fn transition(
        engine: &Engine,
        id: Uuid,
        next: CompetitionStatus,
    ) -> EngineResult<Competition> {
        let mut competition = load_competition(engine.store(), id).await?;
        if !competition.status.can_transition_to(next) {
            return Err(EngineError::Validation(format!(
                "Competition cannot transition from {} to {}",
                competition.status, next
            )));
        }
        let previous = competition.status;
        competition.status = next;
        let competition = engine.store().update_competition(competition).await?;
        tracing::info!(competition_id = %id, from = %previous, to = %next, "competition status changed");
        Ok(competition)
    }

    /// Register a user or a team for a competition.
    ///
    /// Team registration requires the registering user to be the
    /// team's captain.
    pub async fn register_for_competition(
        engine: &Engine,
        competition_id: Uuid,
        user_id: Uuid,
        team_id: Option<Uuid>,
        registration_data: serde_json::Value,
    ) -> EngineResult<Registration> {
        let store = engine.store();
        let competition = load_competition(store, competition_id).await?;
        let user = store
            .get_user(user_id)
            .await?
            .ok_or_else(|| EngineError::NotFound("User not found".to_string()))?;

        let participant = match team_id {
            Some(team_id) => {
                let team = store
                    .get_team(team_id)
                    .await?
                    .ok_or_else(|| EngineError::NotFound("Team not found".to_string()))?;
                if team.captain_id != user.id {
                    return Err(EngineError::forbidden("Only team captain can register team"));
                }
                Participant::Team(team_id)
            }
            None => Participant::Individual(user_id),
        };

        competition
            .accepts_participant(&participant)
            .map_err(EngineError::validation)?;

        let existing = store.find_registration(competition_id, participant).await?;
        eligibility::can_register(&user, &competition, existing.as_ref(), engine.now())
            .map_err(EngineError::validation)?;

        let registration = Registration {
            id: Uuid::new_v4(),
            competition_id,
            participant,
            registration_data,
            registered_at: engine.now(),
        };

        // The unique (competition, participant) key backstops races
        // the pre-check cannot see
        let registration = match store.insert_registration(registration).await {
            Ok(registration) => registration,
            Err(StoreError::Duplicate(_)) => {
                return Err(EngineError::validation(
                    "Already registered for this competition",
                ));
            }
            Err(err) => return Err(err.into()),
        };

        tracing::info!(
            competition_id = %competition_id,
            participant = %registration.participant,
            "participant registered"
        );
        Ok(registration)
    }

    /// Competition leaderboard: registrations ranked by average
    /// final-review score descending
    pub async fn get_leaderboard(
        engine: &Engine,
        competition_id: Uuid,
    ) -> EngineResult<Vec<LeaderboardEntry>> {
        let store = engine.store();
        load_competition(store, competition_id).await?;

        let (registrations, submissions, reviews) = futures::try_join!(
            store.list_registrations(competition_id),
            store.list_competition_submissions(competition_id),
            store.list_reviews_for_competition(competition_id),
        )?;

        let mut entries: Vec<LeaderboardEntry> = registrations
            .into_iter()
            .filter_map(|registration| {
                let scores: Vec<f64> = submissions
                    .iter()
                    .filter(|s| s.registration_id == registration.id && s.is_final)
                    .flat_map(|s| {
                        reviews
                            .iter()
                            .filter(|r| r.submission_id == s.id && r.status == ReviewStatus::Final)
                            .filter_map(|r| r.overall_score)
                    })
                    .collect();
                if scores.is_empty() {
                    return None;
                }
                Some(LeaderboardEntry {
                    registration_id: registration.id,
                    participant: registration.participant,
                    average_score: scores.iter().sum::<f64>() / scores.len() as f64,
                    total_reviews: scores.len() as u64,
                })
            })
            .collect();

        entries.sort_by(|a, b| {
            b.average_score
                .partial_cmp(&a.average_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.total_reviews.cmp(&a.total_reviews))
        });
        Ok(entries)
    }
}

/// Fetch a competition or surface the contract not-found reason
pub(crate) async fn load_competition<S>(store: &S, id: Uuid) -> EngineResult<Competition>
where
    S: CompetitionStore + ?Sized,
{
    store
        .get_competition(id)
        .await?
        .ok_or_else(|| EngineError::NotFound("Competition not found".to_string()))
}
