//! Race participants and the seed roster

use serde::{Deserialize, Serialize};
use std::fmt;

/// Seed entry that stands for the local user
pub const SELF_PARTICIPANT_ID: &str = "user1";

/// Outcome of a participant's submitted transaction
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    #[default]
    Pending,
    Confirmed,
    Failed,
}

/// Reward tier, picked by submitted gas price
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RewardTier {
    #[serde(rename = "0.05 ETH")]
    High,
    #[serde(rename = "0.03 ETH")]
    Mid,
    #[serde(rename = "0.01 ETH")]
    Low,
}

impl RewardTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "0.05 ETH",
            Self::Mid => "0.03 ETH",
            Self::Low => "0.01 ETH",
        }
    }
}

impl fmt::Display for RewardTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A race participant
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: String,
    pub address: String,
    /// Display balance, e.g. `"1.25 ETH"`
    pub balance: String,
    pub is_current_user: bool,
    /// Last computed rank (output, not ground truth; 0 = not yet ranked)
    pub position: u32,
    /// Gas price in Gwei
    pub gas_price: f64,
    pub score: i64,
    pub reward: Option<RewardTier>,
    pub transaction_submitted: bool,
    /// Only meaningful when `transaction_submitted` is set
    pub transaction_status: TransactionStatus,
}

impl Participant {
    pub fn new(id: &str, address: &str) -> Self {
        Self {
            id: id.to_string(),
            address: address.to_string(),
            balance: "0 ETH".to_string(),
            is_current_user: false,
            position: 0,
            gas_price: 0.0,
            score: 0,
            reward: None,
            transaction_submitted: false,
            transaction_status: TransactionStatus::Pending,
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn seed(
    id: &str,
    address: &str,
    balance: &str,
    is_current_user: bool,
    position: u32,
    gas_price: f64,
    score: i64,
    reward: RewardTier,
    transaction_submitted: bool,
    transaction_status: TransactionStatus,
) -> Participant {
    Participant {
        id: id.to_string(),
        address: address.to_string(),
        balance: balance.to_string(),
        is_current_user,
        position,
        gas_price,
        score,
        reward: Some(reward),
        transaction_submitted,
        transaction_status,
    }
}

/// Default roster used when nothing is cached
pub fn seed_roster() -> Vec<Participant> {
    vec![
        seed(
            SELF_PARTICIPANT_ID,
            "0x71C7656EC7ab88b098defB751B7401B5f6d8976F",
            "1.25 ETH",
            true,
            2,
            14.2,
            87,
            RewardTier::Mid,
            false,
            TransactionStatus::Pending,
        ),
        seed(
            "user2",
            "0x3210fedcba9876543210fedcba9876543210fedc",
            "0.75 ETH",
            false,
            3,
            15.8,
            82,
            RewardTier::Low,
            true,
            TransactionStatus::Confirmed,
        ),
        seed(
            "user3",
            "0x9876543210fedcba9876543210fedcba98765432",
            "2.5 ETH",
            false,
            1,
            12.3,
            92,
            RewardTier::High,
            true,
            TransactionStatus::Confirmed,
        ),
    ]
}

/// Seed roster with nobody marked as the local user (after disconnect)
pub fn reset_roster() -> Vec<Participant> {
    seed_roster()
        .into_iter()
        .map(|p| Participant {
            is_current_user: false,
            ..p
        })
        .collect()
}

/// The participant marked as the local user
pub fn current_user(roster: &[Participant]) -> Option<&Participant> {
    roster.iter().find(|p| p.is_current_user)
}

pub fn current_user_mut(roster: &mut [Participant]) -> Option<&mut Participant> {
    roster.iter_mut().find(|p| p.is_current_user)
}

/// Mark participant `id` as the local user at `address`
///
/// Clears the flag everywhere else. Returns false if `id` is not in the roster.
pub fn claim_participant(roster: &mut [Participant], id: &str, address: &str) -> bool {
    if !roster.iter().any(|p| p.id == id) {
        return false;
    }
    for participant in roster.iter_mut() {
        participant.is_current_user = participant.id == id;
        if participant.is_current_user {
            participant.address = address.to_string();
        }
    }
    true
}
