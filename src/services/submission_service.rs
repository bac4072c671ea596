//! Submission service
//!
//! Versioned submission lifecycle: drafting, file attachment,
//! deadline-gated finalization, review transitions, disqualification.

use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{EngineError, EngineResult},
    models::{CompetitionRound, Submission, SubmissionFile, SubmissionStatus},
    state::Engine,
    store::{CompetitionStore, RegistrationStore, StoreError, SubmissionStore},
    utils::validation,
};

/// Payload for creating a draft submission
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewSubmission {
    pub registration_id: Uuid,
    pub round_id: Uuid,
    #[validate(length(min = 1, max = 256))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_submission_data")]
    pub submission_data: serde_json::Value,
}

fn default_submission_data() -> serde_json::Value {
    serde_json::json!({})
}

/// Submission service for business logic
pub struct SubmissionService;

impl SubmissionService {
    /// Create a new draft version for a registration and round.
    /// The version number continues the existing version chain.
    pub async fn create_submission(
        engine: &Engine,
        payload: NewSubmission,
    ) -> EngineResult<Submission> {
        payload.validate()?;
        let store = engine.store();

        let registration = store
            .get_registration(payload.registration_id)
            .await?
            .ok_or_else(|| EngineError::NotFound("Registration not found".to_string()))?;
        let round = store
            .get_round(payload.round_id)
            .await?
            .ok_or_else(|| EngineError::NotFound("Round not found".to_string()))?;
        if round.competition_id != registration.competition_id {
            return Err(EngineError::validation(
                "Round does not belong to this competition",
            ));
        }

        let versions = store
            .list_submission_versions(registration.id, round.id)
            .await?;
        if versions
            .iter()
            .any(|s| s.status == SubmissionStatus::Disqualified)
        {
            return Err(EngineError::validation("Submission has been disqualified"));
        }
        let version = versions.iter().map(|s| s.version).max().unwrap_or(0) + 1;

        let submission = Submission {
            id: Uuid::new_v4(),
            competition_id: registration.competition_id,
            round_id: round.id,
            registration_id: registration.id,
            title: payload.title,
            description: payload.description,
            version,
            status: SubmissionStatus::Draft,
            is_final: false,
            submission_data: payload.submission_data,
            submitted_at: None,
            created_at: engine.now(),
            revision: 0,
        };
        let submission = store.insert_submission(submission).await?;
        tracing::info!(
            submission_id = %submission.id,
            registration_id = %submission.registration_id,
            version = submission.version,
            "draft submission created"
        );
        Ok(submission)
    }

    /// Attach a file to a draft. Re-attaching the same file updates
    /// its category and primary flag instead of duplicating.
    pub async fn attach_file(
        engine: &Engine,
        submission_id: Uuid,
        file_id: Uuid,
        category: &str,
        is_primary: bool,
    ) -> EngineResult<SubmissionFile> {
        validation::validate_file_category(category).map_err(EngineError::validation)?;
        let store = engine.store();
        let submission = load_submission(engine, submission_id).await?;
        if submission.status != SubmissionStatus::Draft {
            return Err(EngineError::validation("Submission already finalized"));
        }

        let file = SubmissionFile {
            submission_id,
            file_id,
            category: category.to_string(),
            is_primary,
            attached_at: engine.now(),
        };
        Ok(store.upsert_submission_file(file).await?)
    }

    /// Check finalization preconditions without mutating anything
    pub async fn can_submit(engine: &Engine, submission_id: Uuid) -> EngineResult<()> {
        let submission = load_submission(engine, submission_id).await?;
        let (round, attached) = Self::submit_context(engine, &submission).await?;
        submission
            .can_submit(
                &attached,
                &round.required_file_categories,
                round.submission_deadline,
                engine.now(),
            )
            .map_err(EngineError::validation)
    }

    /// Finalize a draft: `draft -> submitted`, stamped and marked
    /// final. Exactly one of two concurrent callers wins; the loser
    /// gets "Submission already finalized".
    pub async fn submit(engine: &Engine, submission_id: Uuid) -> EngineResult<Submission> {
        let store = engine.store();
        let mut submission = load_submission(engine, submission_id).await?;
        let (round, attached) = Self::submit_context(engine, &submission).await?;
        let now = engine.now();
        submission
            .can_submit(
                &attached,
                &round.required_file_categories,
                round.submission_deadline,
                now,
            )
            .map_err(EngineError::validation)?;

        submission.status = SubmissionStatus::Submitted;
        submission.submitted_at = Some(now);
        submission.is_final = true;

        match store.finalize_submission(submission).await {
            Ok(submission) => {
                tracing::info!(submission_id = %submission.id, "submission finalized");
                Ok(submission)
            }
            Err(StoreError::RevisionConflict(_)) => {
                // Lost the transition race: report the terminal state,
                // not the conflict
                let current = load_submission(engine, submission_id).await?;
                if current.status == SubmissionStatus::Draft {
                    Err(EngineError::Conflict(
                        "Concurrent update on submission".to_string(),
                    ))
                } else {
                    Err(EngineError::validation("Submission already finalized"))
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Move a submitted entry under review. Already-under-review is a
    /// no-op so the balancer can assign several judges.
    pub async fn start_review(engine: &Engine, submission_id: Uuid) -> EngineResult<Submission> {
        let mut submission = load_submission(engine, submission_id).await?;
        match submission.status {
            SubmissionStatus::UnderReview => Ok(submission),
            SubmissionStatus::Submitted => {
                submission.status = SubmissionStatus::UnderReview;
                Ok(engine.store().update_submission(submission).await?)
            }
            _ => Err(EngineError::Validation(format!(
                "Submission cannot move under review from {}",
                submission.status
            ))),
        }
    }

    /// Close the review phase for a submission
    pub async fn mark_reviewed(engine: &Engine, submission_id: Uuid) -> EngineResult<Submission> {
        let mut submission = load_submission(engine, submission_id).await?;
        if submission.status != SubmissionStatus::UnderReview {
            return Err(EngineError::validation("Submission is not under review"));
        }
        submission.status = SubmissionStatus::Reviewed;
        Ok(engine.store().update_submission(submission).await?)
    }

    /// Disqualify from any non-terminal state; terminal afterwards.
    pub async fn disqualify(engine: &Engine, submission_id: Uuid) -> EngineResult<Submission> {
        let mut submission = load_submission(engine, submission_id).await?;
        match submission.status {
            SubmissionStatus::Reviewed => Err(EngineError::validation(
                "Submission cannot be disqualified once reviewed",
            )),
            SubmissionStatus::Disqualified => {
                Err(EngineError::validation("Submission is already disqualified"))
            }
            _ => {
                submission.status = SubmissionStatus::Disqualified;
                let submission = engine.store().update_submission(submission).await?;
                tracing::warn!(submission_id = %submission.id, "submission disqualified");
                Ok(submission)
            }
        }
    }

    async fn submit_context(
        engine: &Engine,
        submission: &Submission,
    ) -> EngineResult<(CompetitionRound, Vec<String>)> {
        let store = engine.store();
        let round = store
            .get_round(submission.round_id)
            .await?
            .ok_or_else(|| EngineError::NotFound("Round not found".to_string()))?;
        let attached: Vec<String> = store
            .list_submission_files(submission.id)
            .await?
            .into_iter()
            .map(|f| f.category)
            .collect();
        Ok((round, attached))
    }
}

async fn load_submission(engine: &Engine, id: Uuid) -> EngineResult<Submission> {
    engine
        .store()
        .get_submission(id)
        .await?
        .ok_or_else(|| EngineError::NotFound("Submission not found".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    use crate::constants::file_categories;
    use crate::models::{CompetitionType, Participant};
    use crate::test_support::{
        seed_published_competition, seed_registration, seed_round, seed_user, test_engine,
    };

    async fn draft_with_requirements(
        engine: &Engine,
        required: Vec<String>,
    ) -> (Submission, CompetitionRound) {
        let user = seed_user(engine, true).await;
        let competition =
            seed_published_competition(engine, CompetitionType::Individual).await;
        let registration = seed_registration(
            engine,
            competition.id,
            Participant::Individual(user.id),
        )
        .await;
        let round = seed_round(
            engine,
            competition.id,
            required,
            engine.now() + Duration::days(10),
        )
        .await;

        let submission = SubmissionService::create_submission(
            engine,
            NewSubmission {
                registration_id: registration.id,
                round_id: round.id,
                title: "Revolutionary AI Solution".to_string(),
                description: String::new(),
                submission_data: serde_json::json!({}),
            },
        )
        .await
        .unwrap();
        (submission, round)
    }

    #[tokio::test]
    async fn test_submit_happy_path() {
        let (engine, _clock) = test_engine(Utc::now());
        let (submission, _round) = draft_with_requirements(
            &engine,
            vec![file_categories::MAIN_DOCUMENT.to_string()],
        )
        .await;

        SubmissionService::attach_file(
            &engine,
            submission.id,
            Uuid::new_v4(),
            file_categories::MAIN_DOCUMENT,
            true,
        )
        .await
        .unwrap();

        let submitted = SubmissionService::submit(&engine, submission.id).await.unwrap();
        assert_eq!(submitted.status, SubmissionStatus::Submitted);
        assert!(submitted.is_final);
        assert!(submitted.submitted_at.is_some());
    }

    #[tokio::test]
    async fn test_submit_requires_files() {
        let (engine, _clock) = test_engine(Utc::now());
        let (submission, _round) = draft_with_requirements(
            &engine,
            vec![file_categories::MAIN_DOCUMENT.to_string()],
        )
        .await;

        let err = SubmissionService::submit(&engine, submission.id).await.unwrap_err();
        match err {
            EngineError::Validation(reason) => assert_eq!(reason, "Missing required files"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_submit_after_deadline_fails() {
        let (engine, clock) = test_engine(Utc::now());
        let (submission, _round) = draft_with_requirements(&engine, vec![]).await;

        clock.advance(Duration::days(11));
        let err = SubmissionService::submit(&engine, submission.id).await.unwrap_err();
        match err {
            EngineError::Validation(reason) => {
                assert_eq!(reason, "Submission deadline has passed")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_double_submit_has_one_winner() {
        let (engine, _clock) = test_engine(Utc::now());
        let (submission, _round) = draft_with_requirements(&engine, vec![]).await;

        let (a, b) = tokio::join!(
            SubmissionService::submit(&engine, submission.id),
            SubmissionService::submit(&engine, submission.id),
        );
        let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1);

        let loser = if a.is_err() { a.unwrap_err() } else { b.unwrap_err() };
        match loser {
            EngineError::Validation(reason) => {
                assert_eq!(reason, "Submission already finalized")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_new_version_takes_over_the_final_flag() {
        let (engine, _clock) = test_engine(Utc::now());
        let (first, _round) = draft_with_requirements(&engine, vec![]).await;
        let first = SubmissionService::submit(&engine, first.id).await.unwrap();

        let second = SubmissionService::create_submission(
            &engine,
            NewSubmission {
                registration_id: first.registration_id,
                round_id: first.round_id,
                title: "Revolutionary AI Solution v2".to_string(),
                description: String::new(),
                submission_data: serde_json::json!({}),
            },
        )
        .await
        .unwrap();
        assert_eq!(second.version, 2);

        SubmissionService::submit(&engine, second.id).await.unwrap();

        let versions = engine
            .store()
            .list_submission_versions(first.registration_id, first.round_id)
            .await
            .unwrap();
        let finals: Vec<_> = versions.iter().filter(|s| s.is_final).collect();
        assert_eq!(finals.len(), 1);
        assert_eq!(finals[0].version, 2);
    }

    #[tokio::test]
    async fn test_disqualification_is_terminal() {
        let (engine, _clock) = test_engine(Utc::now());
        let (submission, _round) = draft_with_requirements(&engine, vec![]).await;

        SubmissionService::disqualify(&engine, submission.id).await.unwrap();

        // No further versioning once disqualified
        let err = SubmissionService::create_submission(
            &engine,
            NewSubmission {
                registration_id: submission.registration_id,
                round_id: submission.round_id,
                title: "Second try".to_string(),
                description: String::new(),
                submission_data: serde_json::json!({}),
            },
        )
        .await
        .unwrap_err();
        match err {
            EngineError::Validation(reason) => {
                assert_eq!(reason, "Submission has been disqualified")
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let err = SubmissionService::disqualify(&engine, submission.id).await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[tokio::test]
    async fn test_attach_file_is_an_upsert() {
        let (engine, _clock) = test_engine(Utc::now());
        let (submission, _round) = draft_with_requirements(&engine, vec![]).await;
        let file_id = Uuid::new_v4();

        SubmissionService::attach_file(
            &engine,
            submission.id,
            file_id,
            file_categories::MAIN_DOCUMENT,
            false,
        )
        .await
        .unwrap();
        SubmissionService::attach_file(
            &engine,
            submission.id,
            file_id,
            file_categories::PRESENTATION,
            true,
        )
        .await
        .unwrap();

        let files = engine
            .store()
            .list_submission_files(submission.id)
            .await
            .unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].category, file_categories::PRESENTATION);
        assert!(files[0].is_primary);
    }

    #[tokio::test]
    async fn test_review_transitions() {
        let (engine, _clock) = test_engine(Utc::now());
        let (submission, _round) = draft_with_requirements(&engine, vec![]).await;
        SubmissionService::submit(&engine, submission.id).await.unwrap();

        let under = SubmissionService::start_review(&engine, submission.id).await.unwrap();
        assert_eq!(under.status, SubmissionStatus::UnderReview);
        // Idempotent for multi-judge assignment
        SubmissionService::start_review(&engine, submission.id).await.unwrap();

        let reviewed = SubmissionService::mark_reviewed(&engine, submission.id).await.unwrap();
        assert_eq!(reviewed.status, SubmissionStatus::Reviewed);

        let err = SubmissionService::disqualify(&engine, submission.id).await.unwrap_err();
        match err {
            EngineError::Validation(reason) => {
                assert_eq!(reason, "Submission cannot be disqualified once reviewed")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
