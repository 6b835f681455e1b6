//! Ranking Engine
//!
//! Derives leaderboard entries from the roster. Two current-race orderings
//! coexist:
//! - `current_race_ranking`: gas price ascending, used after the local user's
//!   own submission confirms
//! - `ranking_by_submitted_order`: stored position ascending, used by the
//!   periodic refresh whenever the roster changes
//!
//! The two can disagree. Callers pick one; nothing here reconciles them.
//! All sorts are stable, so equal keys keep roster order.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::participant::{Participant, RewardTier};

/// Gas price below which the top reward applies (Gwei)
pub const HIGH_REWARD_BELOW: f64 = 30.0;

/// Gas price below which the middle reward applies (Gwei)
pub const MID_REWARD_BELOW: f64 = 50.0;

/// Exclusive upper bound of the all-time score perturbation
pub const ALL_TIME_JITTER: i64 = 10;

/// Ranked projection of a participant
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub position: u32,
    pub address: String,
    pub gas_price: f64,
    pub score: i64,
    pub reward: Option<RewardTier>,
}

impl From<&Participant> for LeaderboardEntry {
    fn from(participant: &Participant) -> Self {
        Self {
            position: participant.position,
            address: participant.address.clone(),
            gas_price: participant.gas_price,
            score: participant.score,
            reward: participant.reward,
        }
    }
}

fn submitted_entries(participants: &[Participant]) -> Vec<LeaderboardEntry> {
    participants
        .iter()
        .filter(|p| p.transaction_submitted)
        .map(LeaderboardEntry::from)
        .collect()
}

fn assign_positions(entries: &mut [LeaderboardEntry]) {
    for (index, entry) in entries.iter_mut().enumerate() {
        entry.position = index as u32 + 1;
    }
}

/// Roster indices of submitted participants, lowest gas price first
pub fn gas_price_order(participants: &[Participant]) -> Vec<usize> {
    let mut order: Vec<usize> = participants
        .iter()
        .enumerate()
        .filter(|(_, p)| p.transaction_submitted)
        .map(|(index, _)| index)
        .collect();
    order.sort_by(|&a, &b| participants[a].gas_price.total_cmp(&participants[b].gas_price));
    order
}

/// Submitted participants ordered by gas price, lowest first
pub fn current_race_ranking(participants: &[Participant]) -> Vec<LeaderboardEntry> {
    let mut entries: Vec<LeaderboardEntry> = gas_price_order(participants)
        .into_iter()
        .map(|index| LeaderboardEntry::from(&participants[index]))
        .collect();
    assign_positions(&mut entries);
    entries
}

/// Submitted participants ordered by their stored position
pub fn ranking_by_submitted_order(participants: &[Participant]) -> Vec<LeaderboardEntry> {
    let mut entries = submitted_entries(participants);
    entries.sort_by_key(|e| e.position);
    assign_positions(&mut entries);
    entries
}

/// All-time standings: each score gains `randomInt[0, 10)`, then highest first
pub fn all_time_ranking<R: Rng>(
    entries: &[LeaderboardEntry],
    rng: &mut R,
) -> Vec<LeaderboardEntry> {
    let mut ranked: Vec<LeaderboardEntry> = entries
        .iter()
        .map(|entry| LeaderboardEntry {
            score: entry.score + rng.gen_range(0..ALL_TIME_JITTER),
            ..entry.clone()
        })
        .collect();
    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    assign_positions(&mut ranked);
    ranked
}

/// Reward for a submission at `gas_price`
pub fn reward_tier(gas_price: f64) -> RewardTier {
    if gas_price < HIGH_REWARD_BELOW {
        RewardTier::High
    } else if gas_price < MID_REWARD_BELOW {
        RewardTier::Mid
    } else {
        RewardTier::Low
    }
}

/// Score for a submission at `gas_price`; negative above 100 Gwei
pub fn score_for(gas_price: f64) -> i64 {
    (100.0 - gas_price).round() as i64
}

/// Position of `address` in `entries`
pub fn user_position(entries: &[LeaderboardEntry], address: &str) -> Option<u32> {
    entries
        .iter()
        .find(|entry| entry.address == address)
        .map(|entry| entry.position)
}

/// Current race and all-time leaderboards
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Leaderboards {
    pub current: Vec<LeaderboardEntry>,
    pub all_time: Vec<LeaderboardEntry>,
}

impl Leaderboards {
    /// Recompute after a roster change, by stored position
    pub fn refresh_periodic<R: Rng>(&mut self, roster: &[Participant], rng: &mut R) {
        self.current = ranking_by_submitted_order(roster);
        self.update_all_time(rng);
    }

    /// Recompute after the local user's submission confirms, by gas price
    pub fn refresh_after_submission<R: Rng>(
        &mut self,
        roster: &[Participant],
        rng: &mut R,
    ) {
        self.current = current_race_ranking(roster);
        self.update_all_time(rng);
    }

    // An empty race leaves the all-time board untouched.
    fn update_all_time<R: Rng>(&mut self, rng: &mut R) {
        if !self.current.is_empty() {
            self.all_time = all_time_ranking(&self.current, rng);
        }
    }
}
