//! Engine configuration management
//!
//! This module handles loading and validating configuration from
//! environment variables. The embedding service loads one
//! [`EngineConfig`] at startup and hands it to [`crate::Engine`].

use std::env;

use crate::constants::{
    DEFAULT_INVITATION_TTL_DAYS, DEFAULT_IP_FREQUENCY_PERCENTILE, DEFAULT_MAX_CONCURRENT_REVIEWS,
    DEFAULT_MIN_VOTE_INTERVAL_SECONDS, DEFAULT_QUADRATIC_CREDIT_BUDGET,
    DEFAULT_TEAM_ACTIVATION_THRESHOLD, DEFAULT_TEAM_MAX_MEMBERS,
};

/// Main engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub teams: TeamConfig,
    pub voting: VotingConfig,
    pub judging: JudgingConfig,
}

/// Team-formation configuration
#[derive(Debug, Clone)]
pub struct TeamConfig {
    /// Default `max_members` for new teams
    pub default_max_members: u32,
    /// Members required before `forming -> active`
    pub activation_threshold: u32,
    /// Invitation lifetime in days
    pub invitation_ttl_days: i64,
}

/// Voting and integrity configuration
#[derive(Debug, Clone)]
pub struct VotingConfig {
    /// Default quadratic credit budget for new sessions
    pub default_credit_budget: u32,
    /// Gap under this many seconds between votes on one submission
    /// raises the rapid-vote anomaly
    pub min_vote_interval_seconds: i64,
    /// Per-IP vote frequency percentile threshold
    pub ip_frequency_percentile: f64,
}

/// Judge assignment configuration
#[derive(Debug, Clone)]
pub struct JudgingConfig {
    /// Fallback cap on concurrent open reviews per judge
    pub default_max_concurrent_reviews: u32,
}

impl EngineConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = Self {
            teams: TeamConfig::from_env()?,
            voting: VotingConfig::from_env()?,
            judging: JudgingConfig::from_env()?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.teams.activation_threshold < 2 {
            return Err(ConfigError::InvalidValue(
                "TEAM_ACTIVATION_THRESHOLD".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.voting.ip_frequency_percentile) {
            return Err(ConfigError::InvalidValue(
                "VOTING_IP_FREQUENCY_PERCENTILE".to_string(),
            ));
        }
        if self.voting.min_vote_interval_seconds < 0 {
            return Err(ConfigError::InvalidValue(
                "VOTING_MIN_VOTE_INTERVAL_SECONDS".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            teams: TeamConfig {
                default_max_members: DEFAULT_TEAM_MAX_MEMBERS,
                activation_threshold: DEFAULT_TEAM_ACTIVATION_THRESHOLD,
                invitation_ttl_days: DEFAULT_INVITATION_TTL_DAYS,
            },
            voting: VotingConfig {
                default_credit_budget: DEFAULT_QUADRATIC_CREDIT_BUDGET,
                min_vote_interval_seconds: DEFAULT_MIN_VOTE_INTERVAL_SECONDS,
                ip_frequency_percentile: DEFAULT_IP_FREQUENCY_PERCENTILE,
            },
            judging: JudgingConfig {
                default_max_concurrent_reviews: DEFAULT_MAX_CONCURRENT_REVIEWS,
            },
        }
    }
}

impl TeamConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            default_max_members: parse_env("TEAM_DEFAULT_MAX_MEMBERS", DEFAULT_TEAM_MAX_MEMBERS)?,
            activation_threshold: parse_env(
                "TEAM_ACTIVATION_THRESHOLD",
                DEFAULT_TEAM_ACTIVATION_THRESHOLD,
            )?,
            invitation_ttl_days: parse_env("TEAM_INVITATION_TTL_DAYS", DEFAULT_INVITATION_TTL_DAYS)?,
        })
    }
}

impl VotingConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            default_credit_budget: parse_env(
                "VOTING_DEFAULT_CREDIT_BUDGET",
                DEFAULT_QUADRATIC_CREDIT_BUDGET,
            )?,
            min_vote_interval_seconds: parse_env(
                "VOTING_MIN_VOTE_INTERVAL_SECONDS",
                DEFAULT_MIN_VOTE_INTERVAL_SECONDS,
            )?,
            ip_frequency_percentile: parse_env(
                "VOTING_IP_FREQUENCY_PERCENTILE",
                DEFAULT_IP_FREQUENCY_PERCENTILE,
            )?,
        })
    }
}

impl JudgingConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            default_max_concurrent_reviews: parse_env(
                "JUDGING_DEFAULT_MAX_CONCURRENT_REVIEWS",
                DEFAULT_MAX_CONCURRENT_REVIEWS,
            )?,
        })
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        Err(_) => Ok(default),
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(String),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}
