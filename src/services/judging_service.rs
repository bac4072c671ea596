//! Judging service
//!
//! Judge registration, recusals, the assignment balancer, and review
//! completion. Automatic assignment ranks judges from one workload
//! snapshot and re-validates capacity with a conditional store write
//! at commit time.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{EngineError, EngineResult},
    models::{
        AssignmentMethod, AssignmentStatus, Judge, JudgeAssignment, JudgeRecusal, Participant,
        Review, ReviewStatus, Submission, SubmissionStatus,
    },
    services::{competition_service::load_competition, submission_service::SubmissionService},
    state::Engine,
    store::{
        IdentityStore, JudgeStore, RegistrationStore, StoreError, SubmissionStore, TeamStore,
    },
};

/// Payload for registering a judge profile
#[derive(Debug, Clone, Deserialize)]
pub struct NewJudge {
    pub user_id: Uuid,
    pub institution_id: Option<Uuid>,
    #[serde(default)]
    pub expertise_tags: Vec<String>,
    /// Defaults to the configured review cap
    pub max_concurrent_reviews: Option<u32>,
}

/// Outcome of an assignment run
#[derive(Debug, Clone, Serialize)]
pub struct AssignmentOutcome {
    pub assignments: Vec<JudgeAssignment>,
    pub reviews: Vec<Review>,
    /// Submissions no eligible judge had capacity for; reported, not
    /// silently dropped
    pub unassigned: Vec<Uuid>,
}

/// Judging service for business logic
pub struct JudgingService;

impl JudgingService {
    /// Register a judge profile
    pub async fn register_judge(engine: &Engine, payload: NewJudge) -> EngineResult<Judge> {
        engine
            .store()
            .get_user(payload.user_id)
            .await?
            .ok_or_else(|| EngineError::NotFound("User not found".to_string()))?;

        let judge = Judge {
            id: Uuid::new_v4(),
            user_id: payload.user_id,
            institution_id: payload.institution_id,
            expertise_tags: payload.expertise_tags,
            max_concurrent_reviews: payload
                .max_concurrent_reviews
                .unwrap_or(engine.config().judging.default_max_concurrent_reviews),
            created_at: engine.now(),
        };
        Ok(engine.store().insert_judge(judge).await?)
    }

    /// Record an explicit conflict-of-interest declaration
    pub async fn recuse_judge(
        engine: &Engine,
        judge_id: Uuid,
        competition_id: Uuid,
        reason: String,
    ) -> EngineResult<JudgeRecusal> {
        load_judge(engine, judge_id).await?;
        load_competition(engine.store(), competition_id).await?;

        let recusal = JudgeRecusal {
            id: Uuid::new_v4(),
            judge_id,
            competition_id,
            reason,
            created_at: engine.now(),
        };
        Ok(engine.store().insert_recusal(recusal).await?)
    }

    /// Assign judges to a competition.
    ///
    /// Manual assignment creates one record per judge and treats an
    /// already-assigned judge as a no-op. Automatic assignment also
    /// distributes the competition's unreviewed final submissions over
    /// the candidates, balanced by available capacity.
    pub async fn assign_judges(
        engine: &Engine,
        competition_id: Uuid,
        judge_ids: &[Uuid],
        method: AssignmentMethod,
    ) -> EngineResult<AssignmentOutcome> {
        load_competition(engine.store(), competition_id).await?;

        match method {
            AssignmentMethod::Manual => Self::assign_manual(engine, competition_id, judge_ids).await,
            AssignmentMethod::Automatic => {
                Self::assign_automatic(engine, competition_id, judge_ids).await
            }
        }
    }

    async fn assign_manual(
        engine: &Engine,
        competition_id: Uuid,
        judge_ids: &[Uuid],
    ) -> EngineResult<AssignmentOutcome> {
        let mut assignments = Vec::new();
        for judge_id in judge_ids {
            load_judge(engine, *judge_id).await?;
            match ensure_assignment(engine, competition_id, *judge_id, AssignmentMethod::Manual)
                .await?
            {
                Some(assignment) => assignments.push(assignment),
                // Already assigned: idempotent no-op
                None => {}
            }
        }
        Ok(AssignmentOutcome {
            assignments,
            reviews: vec![],
            unassigned: vec![],
        })
    }

    async fn assign_automatic(
        engine: &Engine,
        competition_id: Uuid,
        judge_ids: &[Uuid],
    ) -> EngineResult<AssignmentOutcome> {
        let store = engine.store();
        let competition = load_competition(store, competition_id).await?;

        let submissions = Self::reviewable_submissions(engine, competition_id).await?;
        if submissions.is_empty() {
            return Ok(AssignmentOutcome {
                assignments: vec![],
                reviews: vec![],
                unassigned: vec![],
            });
        }

        let judges: Vec<Judge> = futures::future::try_join_all(
            judge_ids.iter().map(|id| load_judge(engine, *id)),
        )
        .await?;

        // One consistent workload snapshot ranks the candidates; the
        // conditional insert below re-validates before each commit
        let mut candidates: Vec<(Judge, i64)> = Vec::new();
        for judge in judges {
            if store.is_recused(judge.id, competition_id).await? {
                continue;
            }
            let open = store.count_open_reviews(judge.id).await?;
            let capacity = judge.available_capacity(open);
            if capacity > 0 {
                candidates.push((judge, capacity));
            }
        }
        candidates.sort_by(|(a, cap_a), (b, cap_b)| {
            cap_b.cmp(cap_a)
                .then_with(|| {
                    b.expertise_overlap(&competition.required_expertise)
                        .cmp(&a.expertise_overlap(&competition.required_expertise))
                })
                .then_with(|| a.id.cmp(&b.id))
        });

        let registrant_institutions =
            Self::registrant_institutions(engine, &submissions).await?;

        let mut assignments = Vec::new();
        let mut reviews = Vec::new();
        let mut unassigned = Vec::new();
        let mut assigned_judges: HashSet<Uuid> = HashSet::new();
        let mut cursor = 0usize;

        for submission in &submissions {
            let conflict_institution = registrant_institutions.get(&submission.id).copied();
            let mut placed = false;

            for _ in 0..candidates.len() {
                let slot = cursor % candidates.len();
                cursor += 1;
                let (judge, capacity) = &mut candidates[slot];
                if *capacity <= 0 {
                    continue;
                }
                if let (Some(judge_institution), Some(registrant)) =
                    (judge.institution_id, conflict_institution.flatten())
                {
                    if judge_institution == registrant {
                        continue;
                    }
                }

                let review = Review {
                    id: Uuid::new_v4(),
                    competition_id,
                    submission_id: submission.id,
                    judge_id: judge.id,
                    status: ReviewStatus::Assigned,
                    overall_score: None,
                    created_at: engine.now(),
                };
                match store
                    .insert_review_checked(review, judge.max_concurrent_reviews)
                    .await
                {
                    Ok(review) => {
                        *capacity -= 1;
                        if assigned_judges.insert(judge.id) {
                            if let Some(assignment) = ensure_assignment(
                                engine,
                                competition_id,
                                judge.id,
                                AssignmentMethod::Automatic,
                            )
                            .await?
                            {
                                assignments.push(assignment);
                            }
                        }
                        SubmissionService::start_review(engine, submission.id).await?;
                        reviews.push(review);
                        placed = true;
                        break;
                    }
                    Err(StoreError::CapacityExceeded(_)) => {
                        // The snapshot went stale: retire this judge
                        // from the rotation and keep going
                        *capacity = 0;
                        continue;
                    }
                    Err(err) => return Err(err.into()),
                }
            }

            if !placed {
                unassigned.push(submission.id);
            }
        }

        if !unassigned.is_empty() {
            tracing::warn!(
                competition_id = %competition_id,
                unassigned = unassigned.len(),
                "submissions left without a judge"
            );
        }
        Ok(AssignmentOutcome {
            assignments,
            reviews,
            unassigned,
        })
    }

    /// Finalize a review with its score and close the submission's
    /// review phase once no open reviews remain.
    pub async fn complete_review(
        engine: &Engine,
        review_id: Uuid,
        overall_score: f64,
    ) -> EngineResult<Review> {
        if !(0.0..=100.0).contains(&overall_score) {
            return Err(EngineError::validation("Score must be between 0 and 100"));
        }
        let store = engine.store();
        let mut review = store
            .get_review(review_id)
            .await?
            .ok_or_else(|| EngineError::NotFound("Review not found".to_string()))?;
        if review.status == ReviewStatus::Final {
            return Err(EngineError::validation("Review is already final"));
        }
        review.status = ReviewStatus::Final;
        review.overall_score = Some(overall_score);
        let review = store.update_review(review).await?;

        let still_open = store
            .list_reviews_for_submission(review.submission_id)
            .await?
            .iter()
            .any(Review::is_open);
        if !still_open {
            SubmissionService::mark_reviewed(engine, review.submission_id).await?;
        }

        tracing::info!(review_id = %review.id, score = overall_score, "review finalized");
        Ok(review)
    }

    /// Final submissions still waiting for a reviewer
    async fn reviewable_submissions(
        engine: &Engine,
        competition_id: Uuid,
    ) -> EngineResult<Vec<Submission>> {
        let store = engine.store();
        let (submissions, reviews) = futures::try_join!(
            store.list_competition_submissions(competition_id),
            store.list_reviews_for_competition(competition_id),
        )?;
        let reviewed: HashSet<Uuid> = reviews.iter().map(|r| r.submission_id).collect();
        Ok(submissions
            .into_iter()
            .filter(|s| {
                s.is_final
                    && s.status == SubmissionStatus::Submitted
                    && !reviewed.contains(&s.id)
            })
            .collect())
    }

    /// Institution of each submission's registrant, for conflict
    /// checks. Team registrations answer with the captain's
    /// institution.
    async fn registrant_institutions(
        engine: &Engine,
        submissions: &[Submission],
    ) -> EngineResult<HashMap<Uuid, Option<Uuid>>> {
        let store = engine.store();
        let mut institutions = HashMap::new();
        for submission in submissions {
            let registration = store
                .get_registration(submission.registration_id)
                .await?
                .ok_or_else(|| EngineError::NotFound("Registration not found".to_string()))?;
            let user_id = match registration.participant {
                Participant::Individual(user_id) => Some(user_id),
                Participant::Team(team_id) => store
                    .get_team(team_id)
                    .await?
                    .map(|team| team.captain_id),
            };
            let institution = match user_id {
                Some(user_id) => store
                    .get_user(user_id)
                    .await?
                    .and_then(|user| user.institution_id),
                None => None,
            };
            institutions.insert(submission.id, institution);
        }
        Ok(institutions)
    }
}

async fn load_judge(engine: &Engine, id: Uuid) -> EngineResult<Judge> {
    engine
        .store()
        .get_judge(id)
        .await?
        .ok_or_else(|| EngineError::NotFound("Judge not found".to_string()))
}

/// Create the (competition, judge) assignment if absent; `None` means
/// it already existed.
async fn ensure_assignment(
    engine: &Engine,
    competition_id: Uuid,
    judge_id: Uuid,
    method: AssignmentMethod,
) -> EngineResult<Option<JudgeAssignment>> {
    let store = engine.store();
    if store.find_assignment(competition_id, judge_id).await?.is_some() {
        return Ok(None);
    }
    let assignment = JudgeAssignment {
        id: Uuid::new_v4(),
        competition_id,
        judge_id,
        assignment_method: method,
        status: AssignmentStatus::Active,
        assigned_at: engine.now(),
    };
    match store.insert_assignment(assignment).await {
        Ok(assignment) => Ok(Some(assignment)),
        // Lost a race to another assigner: same end state, no error
        Err(StoreError::Duplicate(_)) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    use crate::models::{CompetitionType, Institution, VerificationStatus};
    use crate::services::submission_service::{NewSubmission, SubmissionService};
    use crate::store::CompetitionStore;
    use crate::test_support::{
        seed_judge, seed_published_competition, seed_registration, seed_round, seed_user,
        seed_user_with, test_engine,
    };

    async fn submitted_entry(
        engine: &Engine,
        competition_id: Uuid,
        round_id: Uuid,
        institution_id: Option<Uuid>,
    ) -> Submission {
        let user = seed_user_with(
            engine,
            crate::models::AccountStatus::Active,
            true,
            institution_id,
        )
        .await;
        let registration = seed_registration(
            engine,
            competition_id,
            Participant::Individual(user.id),
        )
        .await;
        let submission = SubmissionService::create_submission(
            engine,
            NewSubmission {
                registration_id: registration.id,
                round_id,
                title: "Entry".to_string(),
                description: String::new(),
                submission_data: serde_json::json!({}),
            },
        )
        .await
        .unwrap();
        SubmissionService::submit(engine, submission.id).await.unwrap()
    }

    #[tokio::test]
    async fn test_manual_assignment_is_idempotent() {
        let (engine, _clock) = test_engine(Utc::now());
        let competition = seed_published_competition(&engine, CompetitionType::Individual).await;
        let judge = seed_judge(&engine, 5, None, &[]).await;

        let first = JudgingService::assign_judges(
            &engine,
            competition.id,
            &[judge.id],
            AssignmentMethod::Manual,
        )
        .await
        .unwrap();
        assert_eq!(first.assignments.len(), 1);

        let second = JudgingService::assign_judges(
            &engine,
            competition.id,
            &[judge.id],
            AssignmentMethod::Manual,
        )
        .await
        .unwrap();
        assert!(second.assignments.is_empty());

        let stored = engine.store().list_assignments(competition.id).await.unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn test_automatic_assignment_respects_capacity_and_reports_remainder() {
        let (engine, _clock) = test_engine(Utc::now());
        let competition = seed_published_competition(&engine, CompetitionType::Individual).await;
        let round = seed_round(
            &engine,
            competition.id,
            vec![],
            engine.now() + Duration::days(10),
        )
        .await;

        for _ in 0..3 {
            submitted_entry(&engine, competition.id, round.id, None).await;
        }

        let j1 = seed_judge(&engine, 2, None, &[]).await;
        let j2 = seed_judge(&engine, 0, None, &[]).await;

        let outcome = JudgingService::assign_judges(
            &engine,
            competition.id,
            &[j1.id, j2.id],
            AssignmentMethod::Automatic,
        )
        .await
        .unwrap();

        assert_eq!(outcome.reviews.len(), 2);
        assert!(outcome.reviews.iter().all(|r| r.judge_id == j1.id));
        assert_eq!(outcome.unassigned.len(), 1);
        assert_eq!(engine.store().count_open_reviews(j2.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_automatic_assignment_balances_round_robin() {
        let (engine, _clock) = test_engine(Utc::now());
        let competition = seed_published_competition(&engine, CompetitionType::Individual).await;
        let round = seed_round(
            &engine,
            competition.id,
            vec![],
            engine.now() + Duration::days(10),
        )
        .await;

        for _ in 0..4 {
            submitted_entry(&engine, competition.id, round.id, None).await;
        }
        let j1 = seed_judge(&engine, 3, None, &[]).await;
        let j2 = seed_judge(&engine, 3, None, &[]).await;

        let outcome = JudgingService::assign_judges(
            &engine,
            competition.id,
            &[j1.id, j2.id],
            AssignmentMethod::Automatic,
        )
        .await
        .unwrap();

        assert_eq!(outcome.reviews.len(), 4);
        assert!(outcome.unassigned.is_empty());
        assert_eq!(engine.store().count_open_reviews(j1.id).await.unwrap(), 2);
        assert_eq!(engine.store().count_open_reviews(j2.id).await.unwrap(), 2);

        // Each submission moved under review
        for review in &outcome.reviews {
            let submission = engine
                .store()
                .get_submission(review.submission_id)
                .await
                .unwrap()
                .unwrap();
            assert_eq!(submission.status, SubmissionStatus::UnderReview);
        }
    }

    #[tokio::test]
    async fn test_shared_institution_is_a_conflict() {
        let (engine, _clock) = test_engine(Utc::now());
        let institution = Institution {
            id: Uuid::new_v4(),
            name: "State University".to_string(),
            code: "SU".to_string(),
            kind: "university".to_string(),
            country: "US".to_string(),
            verification_status: VerificationStatus::Verified,
            is_active: true,
            created_at: Utc::now(),
        };
        let institution = engine.store().insert_institution(institution).await.unwrap();

        let competition = seed_published_competition(&engine, CompetitionType::Individual).await;
        let round = seed_round(
            &engine,
            competition.id,
            vec![],
            engine.now() + Duration::days(10),
        )
        .await;
        submitted_entry(&engine, competition.id, round.id, Some(institution.id)).await;

        let conflicted = seed_judge(&engine, 5, Some(institution.id), &[]).await;
        let neutral = seed_judge(&engine, 5, None, &[]).await;

        let outcome = JudgingService::assign_judges(
            &engine,
            competition.id,
            &[conflicted.id, neutral.id],
            AssignmentMethod::Automatic,
        )
        .await
        .unwrap();

        assert_eq!(outcome.reviews.len(), 1);
        assert_eq!(outcome.reviews[0].judge_id, neutral.id);
    }

    #[tokio::test]
    async fn test_recused_judge_is_excluded() {
        let (engine, _clock) = test_engine(Utc::now());
        let competition = seed_published_competition(&engine, CompetitionType::Individual).await;
        let round = seed_round(
            &engine,
            competition.id,
            vec![],
            engine.now() + Duration::days(10),
        )
        .await;
        submitted_entry(&engine, competition.id, round.id, None).await;

        let recused = seed_judge(&engine, 5, None, &[]).await;
        JudgingService::recuse_judge(
            &engine,
            recused.id,
            competition.id,
            "advised the registrant".to_string(),
        )
        .await
        .unwrap();

        let outcome = JudgingService::assign_judges(
            &engine,
            competition.id,
            &[recused.id],
            AssignmentMethod::Automatic,
        )
        .await
        .unwrap();
        assert!(outcome.reviews.is_empty());
        assert_eq!(outcome.unassigned.len(), 1);
    }

    #[tokio::test]
    async fn test_expertise_overlap_breaks_capacity_ties() {
        let (engine, _clock) = test_engine(Utc::now());
        let mut competition =
            seed_published_competition(&engine, CompetitionType::Individual).await;
        competition.required_expertise = vec!["ml".to_string(), "systems".to_string()];
        engine.store().update_competition(competition.clone()).await.unwrap();

        let round = seed_round(
            &engine,
            competition.id,
            vec![],
            engine.now() + Duration::days(10),
        )
        .await;
        submitted_entry(&engine, competition.id, round.id, None).await;

        let generalist = seed_judge(&engine, 3, None, &[]).await;
        let specialist = seed_judge(&engine, 3, None, &["ml", "systems"]).await;

        let outcome = JudgingService::assign_judges(
            &engine,
            competition.id,
            &[generalist.id, specialist.id],
            AssignmentMethod::Automatic,
        )
        .await
        .unwrap();
        assert_eq!(outcome.reviews.len(), 1);
        assert_eq!(outcome.reviews[0].judge_id, specialist.id);
    }

    #[tokio::test]
    async fn test_complete_review_feeds_the_leaderboard() {
        use crate::services::competition_service::CompetitionService;

        let (engine, _clock) = test_engine(Utc::now());
        let competition = seed_published_competition(&engine, CompetitionType::Individual).await;
        let round = seed_round(
            &engine,
            competition.id,
            vec![],
            engine.now() + Duration::days(10),
        )
        .await;
        let submission = submitted_entry(&engine, competition.id, round.id, None).await;
        let judge = seed_judge(&engine, 5, None, &[]).await;

        let outcome = JudgingService::assign_judges(
            &engine,
            competition.id,
            &[judge.id],
            AssignmentMethod::Automatic,
        )
        .await
        .unwrap();
        let review = &outcome.reviews[0];

        let err = JudgingService::complete_review(&engine, review.id, 120.0)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));

        JudgingService::complete_review(&engine, review.id, 87.5).await.unwrap();

        let submission = engine
            .store()
            .get_submission(submission.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(submission.status, SubmissionStatus::Reviewed);

        let leaderboard = CompetitionService::get_leaderboard(&engine, competition.id)
            .await
            .unwrap();
        assert_eq!(leaderboard.len(), 1);
        assert_eq!(leaderboard[0].average_score, 87.5);
        assert_eq!(leaderboard[0].total_reviews, 1);
    }
}
