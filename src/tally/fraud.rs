//! Vote anomaly scoring
//!
//! Advisory fraud heuristics over a session's vote records. Flags
//! never block a vote: they attach credibility metadata consumed by
//! the credible-only result view and by downstream review.

use std::collections::HashMap;
use std::net::IpAddr;

use chrono::Duration;
use uuid::Uuid;

use crate::models::voting::{AnomalyFlag, Credibility, Vote, VoteOption};

/// Thresholds for the anomaly heuristics
#[derive(Debug, Clone)]
pub struct FraudConfig {
    /// Gaps under this interval between votes on one submission raise
    /// the rapid-vote anomaly
    pub min_vote_interval: Duration,
    /// Per-IP frequency percentile above which votes are flagged
    pub ip_frequency_percentile: f64,
}

/// Flags computed for one scoring pass, keyed by vote id
#[derive(Debug, Default)]
pub struct IntegrityScore {
    flags: HashMap<Uuid, Vec<AnomalyFlag>>,
}

impl IntegrityScore {
    pub fn flags_for(&self, vote_id: Uuid) -> &[AnomalyFlag] {
        self.flags.get(&vote_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn credibility_of(&self, vote_id: Uuid) -> Credibility {
        if self.flags_for(vote_id).is_empty() {
            Credibility::Credible
        } else {
            Credibility::Flagged
        }
    }

    pub fn flagged_count(&self) -> usize {
        self.flags.values().filter(|f| !f.is_empty()).count()
    }

    fn add(&mut self, vote_id: Uuid, flag: AnomalyFlag) {
        let flags = self.flags.entry(vote_id).or_default();
        if !flags.contains(&flag) {
            flags.push(flag);
        }
    }
}

/// Score a session's votes against the configured heuristics
pub fn score_votes(votes: &[Vote], options: &[VoteOption], config: &FraudConfig) -> IntegrityScore {
    let mut score = IntegrityScore::default();
    flag_ip_frequency(votes, config, &mut score);
    flag_rapid_votes(votes, options, config, &mut score);
    score
}

/// Flag votes from IPs whose vote frequency sits above the session's
/// configured percentile.
fn flag_ip_frequency(votes: &[Vote], config: &FraudConfig, score: &mut IntegrityScore) {
    let mut per_ip: HashMap<IpAddr, u64> = HashMap::new();
    for vote in votes {
        if let Some(ip) = vote.voter_ip {
            *per_ip.entry(ip).or_default() += 1;
        }
    }
    if per_ip.is_empty() {
        return;
    }

    // Distribution over vote records, not distinct IPs: a heavy IP
    // weighs in once per vote it cast
    let frequencies: Vec<f64> = votes
        .iter()
        .filter_map(|v| v.voter_ip.map(|ip| per_ip[&ip] as f64))
        .collect();
    let threshold = percentile(&frequencies, config.ip_frequency_percentile);

    for vote in votes {
        if let Some(ip) = vote.voter_ip {
            if per_ip[&ip] as f64 > threshold {
                score.add(vote.id, AnomalyFlag::IpFrequencyAnomaly);
            }
        }
    }
}

/// Flag both sides of any vote pair landing on the same submission
/// within the minimum interval.
fn flag_rapid_votes(
    votes: &[Vote],
    options: &[VoteOption],
    config: &FraudConfig,
    score: &mut IntegrityScore,
) {
    // Options without a submission link group by the option itself
    let group_of: HashMap<Uuid, Uuid> = options
        .iter()
        .map(|o| (o.id, o.submission_id.unwrap_or(o.id)))
        .collect();

    let mut groups: HashMap<Uuid, Vec<&Vote>> = HashMap::new();
    for vote in votes {
        let mut seen: Vec<Uuid> = Vec::new();
        for option_id in vote.ballot.option_ids() {
            if let Some(group) = group_of.get(&option_id) {
                if !seen.contains(group) {
                    seen.push(*group);
                    groups.entry(*group).or_default().push(vote);
                }
            }
        }
    }

    for group in groups.values_mut() {
        group.sort_by_key(|v| v.cast_at);
        for pair in group.windows(2) {
            let gap = pair[1].cast_at - pair[0].cast_at;
            if gap < config.min_vote_interval {
                score.add(pair[0].id, AnomalyFlag::RapidVoteAnomaly);
                score.add(pair[1].id, AnomalyFlag::RapidVoteAnomaly);
            }
        }
    }
}

/// Linear-interpolation percentile over an unsorted sample
fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let rank = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let fraction = rank - lower as f64;
        sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
    }
}
