//! Voting service
//!
//! Session lifecycle, eligibility-gated vote casting across the four
//! schemes, integrity scoring, and result views.

use std::collections::HashSet;
use std::net::IpAddr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    constants::OPTIMISTIC_WRITE_MAX_RETRIES,
    error::{EngineError, EngineResult},
    models::{
        voting::{Ballot, Credibility},
        User, Vote, VoteOption, VotingScheme, VotingSession, VotingSessionStatus,
    },
    services::competition_service::load_competition,
    state::Engine,
    store::{IdentityStore, StoreError, VotingStore},
    tally::{self, fraud, TallyOutcome},
};

/// Payload for creating a voting session
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewVotingSession {
    pub competition_id: Uuid,
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    pub scheme: VotingScheme,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default = "default_votes_per_voter")]
    pub votes_per_voter: u32,
    #[serde(default = "default_true")]
    pub requires_authentication: bool,
    #[serde(default)]
    pub prevent_vote_changing: bool,
    #[serde(default)]
    pub show_results_during_voting: bool,
    /// Defaults to the configured quadratic budget
    pub credit_budget: Option<u32>,
}

fn default_votes_per_voter() -> u32 {
    crate::constants::DEFAULT_VOTES_PER_VOTER
}

fn default_true() -> bool {
    true
}

/// Session results view
#[derive(Debug, Clone, Serialize)]
pub struct SessionResults {
    pub session_id: Uuid,
    pub scheme: VotingScheme,
    pub status: VotingSessionStatus,
    /// Effective (non-superseded) ballots counted
    pub total_ballots: u64,
    /// Whether flagged votes were excluded from this view
    pub credible_only: bool,
    pub outcome: TallyOutcome,
}

/// Summary of one integrity scan
#[derive(Debug, Clone, Serialize)]
pub struct IntegrityReport {
    pub session_id: Uuid,
    pub total_votes: u64,
    pub flagged_votes: u64,
}

/// Voting service for business logic
pub struct VotingService;

impl VotingService {
    /// Create a session in draft
    pub async fn create_session(
        engine: &Engine,
        created_by: Uuid,
        payload: NewVotingSession,
    ) -> EngineResult<VotingSession> {
        payload.validate()?;
        if payload.start_time >= payload.end_time {
            return Err(EngineError::validation(
                "Voting window must start before it ends",
            ));
        }
        load_competition(engine.store(), payload.competition_id).await?;

        let session = VotingSession {
            id: Uuid::new_v4(),
            competition_id: payload.competition_id,
            name: payload.name,
            scheme: payload.scheme,
            status: VotingSessionStatus::Draft,
            start_time: payload.start_time,
            end_time: payload.end_time,
            votes_per_voter: payload.votes_per_voter.max(1),
            requires_authentication: payload.requires_authentication,
            prevent_vote_changing: payload.prevent_vote_changing,
            show_results_during_voting: payload.show_results_during_voting,
            credit_budget: payload
                .credit_budget
                .unwrap_or(engine.config().voting.default_credit_budget),
            created_by,
            created_at: engine.now(),
            revision: 0,
        };
        let session = engine.store().insert_session(session).await?;
        tracing::info!(session_id = %session.id, scheme = %session.scheme, "voting session created");
        Ok(session)
    }

    /// Add an option while the session is still in draft
    pub async fn add_option(
        engine: &Engine,
        session_id: Uuid,
        label: &str,
        submission_id: Option<Uuid>,
    ) -> EngineResult<VoteOption> {
        let store = engine.store();
        let session = load_session(engine, session_id).await?;
        if session.status != VotingSessionStatus::Draft {
            return Err(EngineError::validation(
                "Vote options cannot be added once the session is active",
            ));
        }
        if label.trim().is_empty() {
            return Err(EngineError::validation("Option label cannot be empty"));
        }

        let display_order = store.list_options(session_id).await?.len() as u32;
        let option = VoteOption {
            id: Uuid::new_v4(),
            session_id,
            label: label.trim().to_string(),
            submission_id,
            display_order,
            created_at: engine.now(),
        };
        Ok(store.insert_option(option).await?)
    }

    /// Open a draft session for voting
    pub async fn open_session(engine: &Engine, session_id: Uuid) -> EngineResult<VotingSession> {
        let mut session = load_session(engine, session_id).await?;
        if session.status != VotingSessionStatus::Draft {
            return Err(EngineError::validation("Voting session is not in draft"));
        }
        if engine.store().list_options(session_id).await?.is_empty() {
            return Err(EngineError::validation(
                "Voting session needs at least one option",
            ));
        }
        session.status = VotingSessionStatus::Active;
        Ok(engine.store().update_session(session).await?)
    }

    /// Close an active session
    pub async fn close_session(engine: &Engine, session_id: Uuid) -> EngineResult<VotingSession> {
        let mut session = load_session(engine, session_id).await?;
        if session.status != VotingSessionStatus::Active {
            return Err(EngineError::validation("Voting session is not active"));
        }
        session.status = VotingSessionStatus::Closed;
        let session = engine.store().update_session(session).await?;
        tracing::info!(session_id = %session.id, "voting session closed");
        Ok(session)
    }

    /// Check voting eligibility without mutating anything
    pub async fn can_vote(engine: &Engine, session_id: Uuid, voter_id: Uuid) -> EngineResult<()> {
        let session = load_session(engine, session_id).await?;
        let voter = load_voter(engine, voter_id).await?;
        let recorded = engine
            .store()
            .list_votes_by_voter(session_id, voter_id)
            .await?;
        vote_gate(&session, &voter, &recorded, engine.now()).map_err(EngineError::validation)
    }

    /// Cast a vote. Append-only: when vote changing is allowed and the
    /// voter is at their ballot cap, the new record supersedes their
    /// most recent effective vote.
    pub async fn cast_vote(
        engine: &Engine,
        session_id: Uuid,
        voter_id: Uuid,
        ballot: Ballot,
        voter_ip: Option<IpAddr>,
    ) -> EngineResult<Vote> {
        let store = engine.store();
        let voter = load_voter(engine, voter_id).await?;

        let mut attempts = 0;
        loop {
            let session = load_session(engine, session_id).await?;
            let options = store.list_options(session_id).await?;
            let now = engine.now();

            let recorded = store.list_votes_by_voter(session_id, voter_id).await?;
            vote_gate(&session, &voter, &recorded, now).map_err(EngineError::validation)?;
            validate_ballot(&session, &options, &ballot).map_err(EngineError::validation)?;

            let effective = effective_votes(&recorded);
            let supersedes = if effective.len() as u32 >= session.votes_per_voter {
                effective.last().map(|v| v.id)
            } else {
                None
            };

            let vote = Vote {
                id: Uuid::new_v4(),
                session_id,
                voter_id,
                vote_weight: ballot.total_weight(),
                cost: ballot.quadratic_cost(),
                ballot: ballot.clone(),
                voter_ip,
                cast_at: now,
                supersedes,
                credibility: Credibility::Credible,
                anomaly_flags: vec![],
            };

            match store.append_vote(vote, session.revision).await {
                Ok(vote) => {
                    tracing::info!(
                        session_id = %session_id,
                        vote_id = %vote.id,
                        weight = vote.vote_weight,
                        "vote recorded"
                    );
                    return Ok(vote);
                }
                Err(StoreError::RevisionConflict(_)) if attempts < OPTIMISTIC_WRITE_MAX_RETRIES => {
                    attempts += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Recompute anomaly flags for a session and persist them on the
    /// vote records. Advisory: nothing is rejected here.
    pub async fn score_session_integrity(
        engine: &Engine,
        session_id: Uuid,
    ) -> EngineResult<IntegrityReport> {
        let store = engine.store();
        load_session(engine, session_id).await?;
        let (votes, options) = futures::try_join!(
            store.list_votes(session_id),
            store.list_options(session_id),
        )?;

        let score = fraud::score_votes(&votes, &options, &fraud_config(engine));
        for vote in &votes {
            let flags = score.flags_for(vote.id).to_vec();
            store
                .update_vote_credibility(vote.id, score.credibility_of(vote.id), flags)
                .await?;
        }

        let report = IntegrityReport {
            session_id,
            total_votes: votes.len() as u64,
            flagged_votes: score.flagged_count() as u64,
        };
        if report.flagged_votes > 0 {
            tracing::warn!(
                session_id = %session_id,
                flagged = report.flagged_votes,
                total = report.total_votes,
                "vote anomalies detected"
            );
        }
        Ok(report)
    }

    /// Tally the session.
    ///
    /// Before the session closes this returns "Results not available
    /// yet" unless the caller asserts real-time authorization or the
    /// session permits live results. `credible_only` excludes votes
    /// the fraud stage flags; raw tallies always count them.
    pub async fn get_results(
        engine: &Engine,
        session_id: Uuid,
        include_real_time: bool,
        credible_only: bool,
    ) -> EngineResult<SessionResults> {
        let store = engine.store();
        let session = load_session(engine, session_id).await?;
        if session.status != VotingSessionStatus::Closed
            && !include_real_time
            && !session.show_results_during_voting
        {
            return Err(EngineError::validation("Results not available yet"));
        }

        let (votes, options) = futures::try_join!(
            store.list_votes(session_id),
            store.list_options(session_id),
        )?;

        let mut counted: Vec<Vote> = effective_votes(&votes).into_iter().cloned().collect();
        if credible_only {
            let score = fraud::score_votes(&votes, &options, &fraud_config(engine));
            counted.retain(|v| score.flags_for(v.id).is_empty());
        }

        let outcome = tally::tally(session.scheme, &options, &counted);
        Ok(SessionResults {
            session_id,
            scheme: session.scheme,
            status: session.status,
            total_ballots: counted.len() as u64,
            credible_only,
            outcome,
        })
    }
}

fn fraud_config(engine: &Engine) -> fraud::FraudConfig {
    let voting = &engine.config().voting;
    fraud::FraudConfig {
        min_vote_interval: Duration::seconds(voting.min_vote_interval_seconds),
        ip_frequency_percentile: voting.ip_frequency_percentile,
    }
}

async fn load_session(engine: &Engine, id: Uuid) -> EngineResult<VotingSession> {
    engine
        .store()
        .get_session(id)
        .await?
        .ok_or_else(|| EngineError::NotFound("Voting session not found".to_string()))
}

async fn load_voter(engine: &Engine, id: Uuid) -> EngineResult<User> {
    engine
        .store()
        .get_user(id)
        .await?
        .ok_or_else(|| EngineError::NotFound("User not found".to_string()))
}

/// Shared eligibility gate for all schemes
fn vote_gate(
    session: &VotingSession,
    voter: &User,
    recorded_votes: &[Vote],
    now: DateTime<Utc>,
) -> Result<(), &'static str> {
    if !session.is_open(now) {
        return Err("Voting session is not active");
    }
    if session.requires_authentication && !voter.email_verified {
        return Err("Email verification required");
    }
    if session.prevent_vote_changing && !recorded_votes.is_empty() {
        return Err("Already voted in this session");
    }
    Ok(())
}

/// Scheme-shape validation, applied before anything is recorded
fn validate_ballot(
    session: &VotingSession,
    options: &[VoteOption],
    ballot: &Ballot,
) -> Result<(), &'static str> {
    let known: HashSet<Uuid> = options.iter().map(|o| o.id).collect();

    let matches_scheme = matches!(
        (session.scheme, ballot),
        (VotingScheme::Traditional, Ballot::Single { .. })
            | (VotingScheme::Approval, Ballot::Approval { .. })
            | (VotingScheme::RankedChoice, Ballot::Ranked { .. })
            | (VotingScheme::Quadratic, Ballot::Quadratic { .. })
    );
    if !matches_scheme {
        return Err("Ballot does not match the session's voting scheme");
    }

    let referenced = ballot.option_ids();
    if referenced.is_empty() {
        return Err("Ballot cannot be empty");
    }
    if referenced.iter().any(|id| !known.contains(id)) {
        return Err("Unknown vote option");
    }

    match ballot {
        Ballot::Ranked { ranking } => {
            let distinct: HashSet<Uuid> = ranking.iter().copied().collect();
            if distinct.len() != ranking.len() {
                return Err("Ranked ballot contains duplicate options");
            }
        }
        Ballot::Approval { option_ids } => {
            let distinct: HashSet<Uuid> = option_ids.iter().copied().collect();
            if distinct.len() != option_ids.len() {
                return Err("Approval ballot contains duplicate options");
            }
        }
        Ballot::Quadratic { weights } => {
            if weights.values().all(|w| *w == 0) {
                return Err("Ballot cannot be empty");
            }
            if ballot.quadratic_cost() > session.credit_budget {
                return Err("Vote cost exceeds credit budget");
            }
        }
        Ballot::Single { .. } => {}
    }
    Ok(())
}

/// Votes not superseded by a later record
fn effective_votes(votes: &[Vote]) -> Vec<&Vote> {
    let superseded: HashSet<Uuid> = votes.iter().filter_map(|v| v.supersedes).collect();
    votes.iter().filter(|v| !superseded.contains(&v.id)).collect()
}
