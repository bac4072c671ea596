//! Submission model with version control

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One version of a participant's work for a competition round.
/// Versions share `(registration_id, round_id)`; across them at most
/// one carries `is_final = true`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: Uuid,
    pub competition_id: Uuid,
    pub round_id: Uuid,
    pub registration_id: Uuid,
    pub title: String,
    pub description: String,
    /// Monotonically increasing within the (registration, round) group
    pub version: u32,
    pub status: SubmissionStatus,
    pub is_final: bool,
    /// Freeform payload describing the work
    pub submission_data: serde_json::Value,
    pub submitted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub revision: u64,
}

impl Submission {
    /// Check finalization preconditions. The caller supplies the
    /// attached file categories and the round deadline from fresh
    /// store reads.
    pub fn can_submit(
        &self,
        attached_categories: &[String],
        required_categories: &[String],
        submission_deadline: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), &'static str> {
        if self.status != SubmissionStatus::Draft {
            return Err("Submission already finalized");
        }
        if !required_categories
            .iter()
            .all(|required| attached_categories.iter().any(|have| have == required))
        {
            return Err("Missing required files");
        }
        if now > submission_deadline {
            return Err("Submission deadline has passed");
        }
        Ok(())
    }
}

/// Submission lifecycle status.
/// `draft -> submitted -> under_review -> reviewed`, with
/// `disqualified` reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Draft,
    Submitted,
    UnderReview,
    Reviewed,
    Disqualified,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::UnderReview => "under_review",
            Self::Reviewed => "reviewed",
            Self::Disqualified => "disqualified",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(Self::Draft),
            "submitted" => Some(Self::Submitted),
            "under_review" => Some(Self::UnderReview),
            "reviewed" => Some(Self::Reviewed),
            "disqualified" => Some(Self::Disqualified),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Reviewed | Self::Disqualified)
    }
}

impl std::fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// File attached to a submission. The (submission, file) pair is
/// unique; re-attaching updates category and primary flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionFile {
    pub submission_id: Uuid,
    pub file_id: Uuid,
    pub category: String,
    pub is_primary: bool,
    pub attached_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::time::parse_datetime;
    use chrono::Duration;

    fn submission(status: SubmissionStatus) -> Submission {
        Submission {
            id: Uuid::new_v4(),
            competition_id: Uuid::new_v4(),
            round_id: Uuid::new_v4(),
            registration_id: Uuid::new_v4(),
            title: "Revolutionary AI Solution".to_string(),
            description: String::new(),
            version: 1,
            status,
            is_final: false,
            submission_data: serde_json::json!({}),
            submitted_at: None,
            created_at: Utc::now(),
            revision: 0,
        }
    }

    #[test]
    fn test_can_submit_happy_path() {
        let deadline = parse_datetime("2024-04-01T00:00:00Z").unwrap();
        let now = deadline - Duration::hours(1);
        let required = vec!["main_document".to_string()];
        let attached = vec!["main_document".to_string(), "video".to_string()];

        let s = submission(SubmissionStatus::Draft);
        assert!(s.can_submit(&attached, &required, deadline, now).is_ok());
    }

    #[test]
    fn test_can_submit_rejects_non_draft() {
        let deadline = parse_datetime("2024-04-01T00:00:00Z").unwrap();
        let now = deadline - Duration::hours(1);

        for status in [
            SubmissionStatus::Submitted,
            SubmissionStatus::UnderReview,
            SubmissionStatus::Reviewed,
            SubmissionStatus::Disqualified,
        ] {
            let s = submission(status);
            assert_eq!(
                s.can_submit(&[], &[], deadline, now).unwrap_err(),
                "Submission already finalized"
            );
        }
    }

    #[test]
    fn test_can_submit_requires_files() {
        let deadline = parse_datetime("2024-04-01T00:00:00Z").unwrap();
        let now = deadline - Duration::hours(1);
        let required = vec!["main_document".to_string(), "presentation".to_string()];
        let attached = vec!["main_document".to_string()];

        let s = submission(SubmissionStatus::Draft);
        assert_eq!(
            s.can_submit(&attached, &required, deadline, now).unwrap_err(),
            "Missing required files"
        );
    }

    #[test]
    fn test_can_submit_enforces_deadline() {
        let deadline = parse_datetime("2024-04-01T00:00:00Z").unwrap();
        let s = submission(SubmissionStatus::Draft);

        assert_eq!(
            s.can_submit(&[], &[], deadline, deadline + Duration::seconds(1))
                .unwrap_err(),
            "Submission deadline has passed"
        );
        // Exactly at the deadline still counts
        assert!(s.can_submit(&[], &[], deadline, deadline).is_ok());
    }
}
