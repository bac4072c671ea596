//! Voting session, option, and vote models

use std::collections::BTreeMap;
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Live voting session attached to a competition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VotingSession {
    pub id: Uuid,
    pub competition_id: Uuid,
    pub name: String,
    pub scheme: VotingScheme,
    pub status: VotingSessionStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Cap on a voter's simultaneously effective ballots
    pub votes_per_voter: u32,
    pub requires_authentication: bool,
    /// When set, a voter with a recorded vote cannot cast again
    pub prevent_vote_changing: bool,
    /// Whether raw results may be read while voting is still open
    pub show_results_during_voting: bool,
    /// Per-voter credit budget for quadratic sessions
    pub credit_budget: u32,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub revision: u64,
}

impl VotingSession {
    /// Check if the session is currently accepting votes
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.status == VotingSessionStatus::Active
            && now >= self.start_time
            && now <= self.end_time
    }
}

/// Vote tallying scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VotingScheme {
    Traditional,
    Quadratic,
    RankedChoice,
    Approval,
}

impl VotingScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Traditional => "traditional",
            Self::Quadratic => "quadratic",
            Self::RankedChoice => "ranked_choice",
            Self::Approval => "approval",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "traditional" => Some(Self::Traditional),
            "quadratic" => Some(Self::Quadratic),
            "ranked_choice" => Some(Self::RankedChoice),
            "approval" => Some(Self::Approval),
            _ => None,
        }
    }
}

impl std::fmt::Display for VotingScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Voting session lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VotingSessionStatus {
    Draft,
    Active,
    Closed,
}

impl VotingSessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Closed => "closed",
        }
    }
}

impl std::fmt::Display for VotingSessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Choice presented in a session; immutable once the session is active
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteOption {
    pub id: Uuid,
    pub session_id: Uuid,
    pub label: String,
    /// Submission this option represents, when the vote is over
    /// submissions; anomaly gap detection groups by it
    pub submission_id: Option<Uuid>,
    /// Creation order; deterministic tie-breaks use it
    pub display_order: u32,
    pub created_at: DateTime<Utc>,
}

/// Scheme-specific ballot content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum Ballot {
    /// One option, weight fixed at 1
    Single { option_id: Uuid },
    /// A set of options, each contributing weight 1 independently
    Approval { option_ids: Vec<Uuid> },
    /// An ordered preference list, no duplicates
    Ranked { ranking: Vec<Uuid> },
    /// Option -> weight; cost per option is weight squared
    Quadratic { weights: BTreeMap<Uuid, u32> },
}

impl Ballot {
    /// Every option id the ballot references, in ballot order
    pub fn option_ids(&self) -> Vec<Uuid> {
        match self {
            Self::Single { option_id } => vec![*option_id],
            Self::Approval { option_ids } => option_ids.clone(),
            Self::Ranked { ranking } => ranking.clone(),
            Self::Quadratic { weights } => weights.keys().copied().collect(),
        }
    }

    /// Total quadratic cost; zero for the linear schemes
    pub fn quadratic_cost(&self) -> u32 {
        match self {
            Self::Quadratic { weights } => weights.values().map(|w| w * w).sum(),
            _ => 0,
        }
    }

    /// Total effective weight this ballot contributes
    pub fn total_weight(&self) -> f64 {
        match self {
            Self::Single { .. } => 1.0,
            Self::Approval { option_ids } => option_ids.len() as f64,
            // Ranked ballots contribute through elimination rounds,
            // one ballot of support at a time
            Self::Ranked { .. } => 1.0,
            Self::Quadratic { weights } => weights.values().map(|w| *w as f64).sum(),
        }
    }
}

/// Advisory credibility verdict on a vote record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Credibility {
    #[default]
    Credible,
    Flagged,
}

/// Anomaly markers attached by the fraud stage. Advisory only: flagged
/// votes still count in raw tallies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyFlag {
    IpFrequencyAnomaly,
    RapidVoteAnomaly,
}

impl AnomalyFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IpFrequencyAnomaly => "ip_frequency_anomaly",
            Self::RapidVoteAnomaly => "rapid_vote_anomaly",
        }
    }
}

impl std::fmt::Display for AnomalyFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Append-only vote record. A superseding vote is a new record
/// pointing at the one it replaces, never an in-place edit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    pub id: Uuid,
    pub session_id: Uuid,
    pub voter_id: Uuid,
    pub ballot: Ballot,
    pub voter_ip: Option<IpAddr>,
    pub cast_at: DateTime<Utc>,
    pub vote_weight: f64,
    pub cost: u32,
    /// Earlier vote of the same voter this record replaces
    pub supersedes: Option<Uuid>,
    pub credibility: Credibility,
    pub anomaly_flags: Vec<AnomalyFlag>,
}
