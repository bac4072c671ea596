//! Input validation utilities

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::constants::{self, MAX_NAME_LENGTH, MAX_TEAM_MEMBERS, MIN_NAME_LENGTH};

static SLUG_STRIP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s-]").expect("invalid slug strip pattern"));
static SLUG_COLLAPSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s_-]+").expect("invalid slug collapse pattern"));

/// Sanitize string input (remove control characters, trim whitespace)
pub fn sanitize_string(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect::<String>()
        .trim()
        .to_string()
}

/// Generate a URL-safe slug from a display name
pub fn generate_slug(name: &str) -> String {
    let lowered = name.to_lowercase();
    let stripped = SLUG_STRIP.replace_all(&lowered, "");
    let collapsed = SLUG_COLLAPSE.replace_all(stripped.trim(), "-");
    collapsed.trim_matches('-').to_string()
}

/// Validate and sanitize a competition or team display name
pub fn validate_name(name: &str) -> Result<String, &'static str> {
    let sanitized = sanitize_string(name);
    if (sanitized.len() as u64) < MIN_NAME_LENGTH {
        return Err("Name must be at least 3 characters");
    }
    if (sanitized.len() as u64) > MAX_NAME_LENGTH {
        return Err("Name must be at most 128 characters");
    }
    Ok(sanitized)
}

/// Validate a team size limit
pub fn validate_max_members(max_members: u32) -> Result<(), &'static str> {
    if max_members < 1 {
        return Err("Team size limit must be at least 1");
    }
    if max_members > MAX_TEAM_MEMBERS {
        return Err("Team size limit exceeds the supported maximum");
    }
    Ok(())
}

/// Validate a participant type identifier
pub fn validate_participant_type(participant_type: &str) -> Result<(), &'static str> {
    if constants::participant_types::ALL.contains(&participant_type) {
        Ok(())
    } else {
        Err("Invalid participant type")
    }
}

/// Validate a submission file category
pub fn validate_file_category(category: &str) -> Result<(), &'static str> {
    if constants::file_categories::ALL.contains(&category) {
        Ok(())
    } else {
        Err("Invalid file category")
    }
}

/// Validate the ordering invariant on a competition schedule:
/// `registration_start < registration_end <= competition_start < competition_end`
pub fn validate_schedule(
    registration_start: DateTime<Utc>,
    registration_end: DateTime<Utc>,
    competition_start: DateTime<Utc>,
    competition_end: DateTime<Utc>,
) -> Result<(), &'static str> {
    if registration_start >= registration_end {
        return Err("Registration window must start before it ends");
    }
    if registration_end > competition_start {
        return Err("Registration must close before the competition starts");
    }
    if competition_start >= competition_end {
        return Err("Competition must start before it ends");
    }
    Ok(())
}
