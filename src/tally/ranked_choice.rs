//! Instant-runoff tallying for ranked-choice sessions
//!
//! Each round counts every ballot's highest-ranked option still in the
//! running. An option holding a strict majority of the non-exhausted
//! ballots wins. Otherwise the weakest option is eliminated and its
//! ballots transfer to their next remaining preference. Elimination
//! ties break by fewest total mentions across all ranks, then by
//! earliest option creation order.

use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use crate::models::voting::VoteOption;

/// One elimination round
#[derive(Debug, Clone, Serialize)]
pub struct RankedChoiceRound {
    pub number: u32,
    /// Ballots still expressing a preference among remaining options
    pub active_ballots: u64,
    /// First-preference support per remaining option
    pub counts: HashMap<Uuid, u64>,
    /// Option eliminated at the end of this round, if any
    pub eliminated: Option<Uuid>,
}

/// Full instant-runoff outcome
#[derive(Debug, Clone, Serialize)]
pub struct RankedChoiceOutcome {
    pub winner: Option<Uuid>,
    pub rounds: Vec<RankedChoiceRound>,
}

impl RankedChoiceOutcome {
    /// Support an option held when it left the race: its count in the
    /// round it was eliminated, or its final-round count if it
    /// survived to the end.
    pub fn support_at_exit(&self, option_id: Uuid) -> u64 {
        for round in &self.rounds {
            if round.eliminated == Some(option_id) {
                return round.counts.get(&option_id).copied().unwrap_or(0);
            }
        }
        self.rounds
            .last()
            .and_then(|r| r.counts.get(&option_id))
            .copied()
            .unwrap_or(0)
    }
}

/// Run instant-runoff elimination over the given ballots
pub fn run(options: &[VoteOption], ballots: &[Vec<Uuid>]) -> RankedChoiceOutcome {
    let creation_order: HashMap<Uuid, u32> =
        options.iter().map(|o| (o.id, o.display_order)).collect();

    // Total mentions across all ranks, the first elimination tie-break
    let mut mentions: HashMap<Uuid, u64> = options.iter().map(|o| (o.id, 0)).collect();
    for ballot in ballots {
        for option_id in ballot {
            if let Some(m) = mentions.get_mut(option_id) {
                *m += 1;
            }
        }
    }

    let mut remaining: Vec<Uuid> = {
        let mut sorted = options.to_vec();
        sorted.sort_by_key(|o| o.display_order);
        sorted.into_iter().map(|o| o.id).collect()
    };

    let mut rounds = Vec::new();
    let mut number = 1u32;

    let winner = loop {
        let mut counts: HashMap<Uuid, u64> = remaining.iter().map(|id| (*id, 0)).collect();
        let mut active_ballots = 0u64;
        for ballot in ballots {
            if let Some(top) = ballot.iter().find(|id| remaining.contains(id)) {
                *counts.entry(*top).or_default() += 1;
                active_ballots += 1;
            }
        }

        if active_ballots == 0 {
            rounds.push(RankedChoiceRound {
                number,
                active_ballots,
                counts,
                eliminated: None,
            });
            break None;
        }

        // Strict majority of non-exhausted ballots wins immediately
        if let Some(winner_id) = remaining
            .iter()
            .find(|id| 2 * counts.get(id).copied().unwrap_or(0) > active_ballots)
            .copied()
        {
            rounds.push(RankedChoiceRound {
                number,
                active_ballots,
                counts,
                eliminated: None,
            });
            break Some(winner_id);
        }

        if remaining.len() == 1 {
            let last = remaining[0];
            rounds.push(RankedChoiceRound {
                number,
                active_ballots,
                counts,
                eliminated: None,
            });
            break Some(last);
        }

        let eliminated = remaining
            .iter()
            .min_by(|a, b| {
                counts
                    .get(*a)
                    .cmp(&counts.get(*b))
                    .then_with(|| mentions.get(*a).cmp(&mentions.get(*b)))
                    .then_with(|| creation_order.get(*a).cmp(&creation_order.get(*b)))
            })
            .copied()
            .expect("remaining options cannot be empty here");

        rounds.push(RankedChoiceRound {
            number,
            active_ballots,
            counts,
            eliminated: Some(eliminated),
        });
        remaining.retain(|id| *id != eliminated);
        number += 1;
    };

    RankedChoiceOutcome { winner, rounds }
}
