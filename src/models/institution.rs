//! Institution model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// University or educational institution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Institution {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub kind: String,
    pub country: String,
    pub verification_status: VerificationStatus,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Institution {
    /// Mark the institution as verified. Verification is monotonic:
    /// once verified, never reverts within this engine.
    pub fn verify(&mut self) {
        self.verification_status = VerificationStatus::Verified;
    }

    pub fn is_verified(&self) -> bool {
        self.verification_status == VerificationStatus::Verified
    }
}

/// Institution verification status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Pending,
    Verified,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Verified => "verified",
        }
    }
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verification_is_monotonic() {
        let mut institution = Institution {
            id: Uuid::new_v4(),
            name: "State University".to_string(),
            code: "SU".to_string(),
            kind: "university".to_string(),
            country: "US".to_string(),
            verification_status: VerificationStatus::Pending,
            is_active: true,
            created_at: Utc::now(),
        };

        assert!(!institution.is_verified());
        institution.verify();
        assert!(institution.is_verified());
        institution.verify();
        assert!(institution.is_verified());
    }
}
