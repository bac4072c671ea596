//! Judge, assignment, and review models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Judge profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Judge {
    pub id: Uuid,
    pub user_id: Uuid,
    pub institution_id: Option<Uuid>,
    pub expertise_tags: Vec<String>,
    /// Open reviews for this judge never exceed this cap
    pub max_concurrent_reviews: u32,
    pub created_at: DateTime<Utc>,
}

impl Judge {
    /// Remaining review slots given the current open-review count
    pub fn available_capacity(&self, open_reviews: u32) -> i64 {
        i64::from(self.max_concurrent_reviews) - i64::from(open_reviews)
    }

    /// Overlap between this judge's expertise and a tag set
    pub fn expertise_overlap(&self, tags: &[String]) -> usize {
        self.expertise_tags
            .iter()
            .filter(|tag| tags.contains(tag))
            .count()
    }
}

/// Judge assignment to a competition; unique per (competition, judge)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeAssignment {
    pub id: Uuid,
    pub competition_id: Uuid,
    pub judge_id: Uuid,
    pub assignment_method: AssignmentMethod,
    pub status: AssignmentStatus,
    pub assigned_at: DateTime<Utc>,
}

/// How a judge assignment was created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentMethod {
    Manual,
    Automatic,
}

impl AssignmentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Automatic => "automatic",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "manual" => Some(Self::Manual),
            "automatic" => Some(Self::Automatic),
            _ => None,
        }
    }
}

impl std::fmt::Display for AssignmentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Judge assignment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentStatus {
    Active,
    Withdrawn,
}

/// Review work item pairing a judge with one submission. A review
/// counts against the judge's capacity until it is final.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub competition_id: Uuid,
    pub submission_id: Uuid,
    pub judge_id: Uuid,
    pub status: ReviewStatus,
    pub overall_score: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl Review {
    pub fn is_open(&self) -> bool {
        self.status != ReviewStatus::Final
    }
}

/// Review lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Assigned,
    InProgress,
    Final,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Assigned => "assigned",
            Self::InProgress => "in_progress",
            Self::Final => "final",
        }
    }
}

impl std::fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Explicit conflict-of-interest declaration excluding a judge from a
/// competition's submissions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeRecusal {
    pub id: Uuid,
    pub judge_id: Uuid,
    pub competition_id: Uuid,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn judge(max: u32, tags: &[&str]) -> Judge {
        Judge {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            institution_id: None,
            expertise_tags: tags.iter().map(|t| t.to_string()).collect(),
            max_concurrent_reviews: max,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_available_capacity() {
        let j = judge(5, &[]);
        assert_eq!(j.available_capacity(0), 5);
        assert_eq!(j.available_capacity(5), 0);
        // Derived counts can exceed the cap if it was lowered later
        assert_eq!(j.available_capacity(7), -2);
    }

    #[test]
    fn test_expertise_overlap() {
        let j = judge(5, &["ml", "systems", "design"]);
        let tags = vec!["ml".to_string(), "design".to_string(), "biotech".to_string()];
        assert_eq!(j.expertise_overlap(&tags), 2);
        assert_eq!(j.expertise_overlap(&[]), 0);
    }

    #[test]
    fn test_review_open_states() {
        let mut review = Review {
            id: Uuid::new_v4(),
            competition_id: Uuid::new_v4(),
            submission_id: Uuid::new_v4(),
            judge_id: Uuid::new_v4(),
            status: ReviewStatus::Assigned,
            overall_score: None,
            created_at: Utc::now(),
        };
        assert!(review.is_open());
        review.status = ReviewStatus::InProgress;
        assert!(review.is_open());
        review.status = ReviewStatus::Final;
        assert!(!review.is_open());
    }
}
