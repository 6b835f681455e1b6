//! Transaction Submission Flow
//!
//! `Idle -> Pending -> Confirmed | Failed`, one attempt per user action.
//! There is no retry and no timeout: `Pending` lasts until the wallet
//! answers. A fresh action may start over from `Confirmed` or `Failed`.

use serde::{Deserialize, Serialize};

/// Message shown when a submission fails
pub const TRANSACTION_FAILED_MESSAGE: &str = "Transaction reverted: gas limit exceeded";

/// Where the local user's submission stands
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum SubmissionState {
    #[default]
    Idle,
    Pending {
        gas_price: f64,
    },
    Confirmed {
        gas_price: f64,
        tx_hash: String,
    },
    Failed {
        gas_price: f64,
        message: String,
    },
}

impl SubmissionState {
    /// Gas price captured when the attempt started
    pub fn gas_price(&self) -> Option<f64> {
        match self {
            Self::Idle => None,
            Self::Pending { gas_price }
            | Self::Confirmed { gas_price, .. }
            | Self::Failed { gas_price, .. } => Some(*gas_price),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Pending { .. } => "pending",
            Self::Confirmed { .. } => "confirmed",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Submission state machine for the local user
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmissionFlow {
    state: SubmissionState,
}

impl SubmissionFlow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SubmissionState {
        &self.state
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, SubmissionState::Pending { .. })
    }

    /// Whether the user has submitted anything this session
    pub fn has_submitted(&self) -> bool {
        !matches!(self.state, SubmissionState::Idle)
    }

    /// Start an attempt at `gas_price`
    ///
    /// Returns false, changing nothing, unless a wallet is connected, the
    /// race is active and no attempt is already pending.
    pub fn begin(&mut self, wallet_connected: bool, race_active: bool, gas_price: f64) -> bool {
        if !wallet_connected || !race_active || self.is_pending() {
            return false;
        }
        self.state = SubmissionState::Pending { gas_price };
        true
    }

    /// Resolve the pending attempt with a transaction hash
    pub fn confirm(&mut self, tx_hash: &str) -> bool {
        match self.state {
            SubmissionState::Pending { gas_price } => {
                self.state = SubmissionState::Confirmed {
                    gas_price,
                    tx_hash: tx_hash.to_string(),
                };
                true
            }
            _ => false,
        }
    }

    /// Resolve the pending attempt as failed
    pub fn fail(&mut self) -> bool {
        match self.state {
            SubmissionState::Pending { gas_price } => {
                self.state = SubmissionState::Failed {
                    gas_price,
                    message: TRANSACTION_FAILED_MESSAGE.to_string(),
                };
                true
            }
            _ => false,
        }
    }

    pub fn reset(&mut self) {
        self.state = SubmissionState::Idle;
    }
}
