//! Registration model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Competition participant reference: a user or a team, never a shared
/// foreign key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum Participant {
    Individual(Uuid),
    Team(Uuid),
}

impl Participant {
    pub fn id(&self) -> Uuid {
        match self {
            Self::Individual(id) | Self::Team(id) => *id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Individual(_) => "individual",
            Self::Team(_) => "team",
        }
    }
}

impl std::fmt::Display for Participant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind(), self.id())
    }
}

/// Registration of a participant for a competition.
/// At most one registration exists per (competition, participant) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub id: Uuid,
    pub competition_id: Uuid,
    pub participant: Participant,
    /// Freeform payload supplied at registration time
    pub registration_data: serde_json::Value,
    pub registered_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_participant_serialization_keeps_the_tag() {
        let participant = Participant::Team(Uuid::new_v4());
        let json = serde_json::to_value(&participant).unwrap();
        assert_eq!(json["kind"], "team");

        let back: Participant = serde_json::from_value(json).unwrap();
        assert_eq!(back, participant);
    }

    #[test]
    fn test_participant_kind_and_id() {
        let id = Uuid::new_v4();
        assert_eq!(Participant::Individual(id).kind(), "individual");
        assert_eq!(Participant::Team(id).id(), id);
    }
}
