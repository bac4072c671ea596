//! Engine-wide constants
//!
//! This module contains all constant values used throughout the engine.
//! Constants are grouped by their purpose for better organization.

// =============================================================================
// TEAM DEFAULTS
// =============================================================================

/// Default maximum team size
pub const DEFAULT_TEAM_MAX_MEMBERS: u32 = 4;

/// Minimum members required before a team can activate
pub const DEFAULT_TEAM_ACTIVATION_THRESHOLD: u32 = 2;

/// Largest team size the engine accepts
pub const MAX_TEAM_MEMBERS: u32 = 16;

/// Length of generated team invite codes
pub const INVITE_CODE_LENGTH: usize = 8;

/// Default invitation lifetime in days
pub const DEFAULT_INVITATION_TTL_DAYS: i64 = 7;

// =============================================================================
// VOTING DEFAULTS
// =============================================================================

/// Default number of effective ballots a voter may hold in a session
pub const DEFAULT_VOTES_PER_VOTER: u32 = 1;

/// Default quadratic-voting credit budget per voter
pub const DEFAULT_QUADRATIC_CREDIT_BUDGET: u32 = 100;

/// Minimum seconds between votes on the same submission before the
/// rapid-vote anomaly fires
pub const DEFAULT_MIN_VOTE_INTERVAL_SECONDS: i64 = 5;

/// Percentile of per-IP vote frequency above which votes are flagged
pub const DEFAULT_IP_FREQUENCY_PERCENTILE: f64 = 0.95;

/// Bounded retries for optimistic writes on a contended entity
pub const OPTIMISTIC_WRITE_MAX_RETRIES: u32 = 3;

// =============================================================================
// NAME / INPUT LIMITS
// =============================================================================

/// Minimum competition or team name length
pub const MIN_NAME_LENGTH: u64 = 3;

/// Maximum competition or team name length
pub const MAX_NAME_LENGTH: u64 = 128;

/// Maximum submission title length
pub const MAX_TITLE_LENGTH: u64 = 256;

// =============================================================================
// PARTICIPANT TYPES
// =============================================================================

/// Participant type identifiers
pub mod participant_types {
    pub const INDIVIDUAL: &str = "individual";
    pub const TEAM: &str = "team";

    /// All valid participant type identifiers
    pub const ALL: &[&str] = &[INDIVIDUAL, TEAM];
}

// =============================================================================
// FILE CATEGORIES
// =============================================================================

/// Submission file categories
pub mod file_categories {
    pub const MAIN_DOCUMENT: &str = "main_document";
    pub const PRESENTATION: &str = "presentation";
    pub const VIDEO: &str = "video";
    pub const SOURCE_ARCHIVE: &str = "source_archive";

    /// All known file categories
    pub const ALL: &[&str] = &[MAIN_DOCUMENT, PRESENTATION, VIDEO, SOURCE_ARCHIVE];
}

// =============================================================================
// JUDGE ASSIGNMENT
// =============================================================================

/// Judge assignment method identifiers
pub mod assignment_methods {
    pub const MANUAL: &str = "manual";
    pub const AUTOMATIC: &str = "automatic";

    /// All valid assignment methods
    pub const ALL: &[&str] = &[MANUAL, AUTOMATIC];
}

/// Default cap on concurrent open reviews per judge
pub const DEFAULT_MAX_CONCURRENT_REVIEWS: u32 = 5;
