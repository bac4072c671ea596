//! Vote tallying
//!
//! Pure functions over plain vote records. The voting service feeds
//! them the effective (non-superseded) votes of a session; nothing in
//! here touches the store or the clock.

pub mod fraud;
pub mod ranked_choice;

use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use crate::models::voting::{Ballot, Vote, VoteOption, VotingScheme};
use ranked_choice::RankedChoiceOutcome;

/// Per-option tally line
#[derive(Debug, Clone, Serialize)]
pub struct OptionTally {
    pub option_id: Uuid,
    pub label: String,
    pub vote_count: u64,
    pub total_weight: f64,
}

/// Tally result for one session
#[derive(Debug, Clone, Serialize)]
pub struct TallyOutcome {
    /// Ordered by effective weight descending, ties by option
    /// creation order
    pub options: Vec<OptionTally>,
    /// Elimination detail, present for ranked-choice sessions
    pub ranked_choice: Option<RankedChoiceOutcome>,
}

/// Tally votes under the given scheme
pub fn tally(scheme: VotingScheme, options: &[VoteOption], votes: &[Vote]) -> TallyOutcome {
    match scheme {
        VotingScheme::Traditional | VotingScheme::Approval | VotingScheme::Quadratic => {
            TallyOutcome {
                options: tally_linear(options, votes),
                ranked_choice: None,
            }
        }
        VotingScheme::RankedChoice => {
            let ballots: Vec<Vec<Uuid>> = votes
                .iter()
                .filter_map(|v| match &v.ballot {
                    Ballot::Ranked { ranking } => Some(ranking.clone()),
                    _ => None,
                })
                .collect();
            let outcome = ranked_choice::run(options, &ballots);

            let mut lines: Vec<OptionTally> = options
                .iter()
                .map(|o| {
                    let count = outcome.support_at_exit(o.id);
                    OptionTally {
                        option_id: o.id,
                        label: o.label.clone(),
                        vote_count: count,
                        total_weight: count as f64,
                    }
                })
                .collect();
            sort_tallies(&mut lines, options);

            TallyOutcome {
                options: lines,
                ranked_choice: Some(outcome),
            }
        }
    }
}

/// Weight-accumulating tally shared by the non-eliminating schemes
fn tally_linear(options: &[VoteOption], votes: &[Vote]) -> Vec<OptionTally> {
    let mut weights: HashMap<Uuid, f64> = HashMap::new();
    let mut counts: HashMap<Uuid, u64> = HashMap::new();

    for vote in votes {
        match &vote.ballot {
            Ballot::Single { option_id } => {
                *weights.entry(*option_id).or_default() += 1.0;
                *counts.entry(*option_id).or_default() += 1;
            }
            Ballot::Approval { option_ids } => {
                for option_id in option_ids {
                    *weights.entry(*option_id).or_default() += 1.0;
                    *counts.entry(*option_id).or_default() += 1;
                }
            }
            Ballot::Quadratic { weights: ballot_weights } => {
                for (option_id, w) in ballot_weights {
                    if *w > 0 {
                        *weights.entry(*option_id).or_default() += f64::from(*w);
                        *counts.entry(*option_id).or_default() += 1;
                    }
                }
            }
            // Ranked ballots never reach the linear tally
            Ballot::Ranked { .. } => {}
        }
    }

    let mut lines: Vec<OptionTally> = options
        .iter()
        .map(|o| OptionTally {
            option_id: o.id,
            label: o.label.clone(),
            vote_count: counts.get(&o.id).copied().unwrap_or(0),
            total_weight: weights.get(&o.id).copied().unwrap_or(0.0),
        })
        .collect();
    sort_tallies(&mut lines, options);
    lines
}

fn sort_tallies(lines: &mut [OptionTally], options: &[VoteOption]) {
    let order: HashMap<Uuid, u32> = options.iter().map(|o| (o.id, o.display_order)).collect();
    lines.sort_by(|a, b| {
        b.total_weight
            .partial_cmp(&a.total_weight)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| order.get(&a.option_id).cmp(&order.get(&b.option_id)))
    });
}
