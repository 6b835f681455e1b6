//! Wallet provider contract
//!
//! Mirrors the handful of JSON-RPC calls the race needs from an injected
//! provider. The wire protocol itself stays behind the implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::{units::gwei_to_wei_hex, WalletError};

/// Account and chain notifications pushed by the provider
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WalletEvent {
    /// The set of exposed accounts changed (empty = user disconnected)
    AccountsChanged(Vec<String>),
    /// The active chain changed
    ChainChanged(String),
}

/// Parameters for a transaction submission
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub from: String,
    pub to: String,
    /// Value in hex wei
    pub value: String,
    /// Gas price in hex wei
    pub gas_price: String,
    /// Gas limit in hex
    pub gas: String,
    pub data: String,
}

impl TransactionRequest {
    /// Zero-value transfer from `account` to itself at the given gas price
    pub fn self_transfer(account: &str, gas_price_gwei: f64) -> Self {
        Self {
            from: account.to_string(),
            to: account.to_string(),
            value: "0x0".to_string(),
            gas_price: gwei_to_wei_hex(gas_price_gwei),
            gas: format!("{:#x}", crate::DEFAULT_GAS_LIMIT),
            data: "0x".to_string(),
        }
    }

    /// Set the gas limit
    pub fn with_gas_limit(mut self, gas: u64) -> Self {
        self.gas = format!("{:#x}", gas);
        self
    }
}

/// An injected wallet provider
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Accounts already exposed to the app, without prompting
    async fn accounts(&self) -> Result<Vec<String>, WalletError>;

    /// Ask the user to expose accounts
    async fn request_accounts(&self) -> Result<Vec<String>, WalletError>;

    /// Balance of `address` in wei
    async fn get_balance(&self, address: &str) -> Result<u128, WalletError>;

    /// Current network gas price in wei
    async fn gas_price_wei(&self) -> Result<u128, WalletError>;

    /// Gas limit estimate for `request`
    async fn estimate_gas(&self, request: &TransactionRequest) -> Result<u64, WalletError>;

    /// Submit `request`, returning the transaction hash
    async fn send_transaction(&self, request: TransactionRequest) -> Result<String, WalletError>;

    /// Subscribe to account and chain notifications
    fn subscribe(&self) -> broadcast::Receiver<WalletEvent>;
}
