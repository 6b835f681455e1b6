//! Wallet Client - connection state over a provider
//!
//! Every provider failure is caught here, logged, and collapsed into a single
//! user-visible error string. Callers get `Option`s back and never see a
//! `WalletError`.

use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::{
    units::{format_address, format_balance, wei_to_gwei},
    TransactionRequest, WalletEvent, WalletProvider, DEFAULT_GAS_LIMIT,
};

pub const CONNECT_FAILED: &str = "Failed to connect wallet";
pub const CHECK_FAILED: &str = "Failed to check wallet connection";
pub const BALANCE_FAILED: &str = "Failed to fetch wallet balance";
pub const GAS_PRICE_FAILED: &str = "Failed to get gas price";
pub const SEND_FAILED: &str = "Failed to send transaction";

/// Snapshot of the wallet connection
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WalletStatus {
    /// Connected account (empty when disconnected)
    pub account: String,
    /// Balance in wei
    pub balance_wei: u128,
    pub is_connected: bool,
    /// Last user-visible error
    pub error: Option<String>,
}

impl WalletStatus {
    /// Balance rendered as `"x.xxxx ETH"`
    pub fn display_balance(&self) -> String {
        format_balance(self.balance_wei)
    }

    /// Account rendered as `0x1234...abcd`
    pub fn display_address(&self) -> String {
        format_address(&self.account)
    }
}

/// Wallet connection state backed by a provider
#[derive(Clone)]
pub struct WalletClient {
    provider: Arc<dyn WalletProvider>,
    status: Arc<RwLock<WalletStatus>>,
}

impl WalletClient {
    pub fn new(provider: Arc<dyn WalletProvider>) -> Self {
        Self {
            provider,
            status: Arc::new(RwLock::new(WalletStatus::default())),
        }
    }

    /// Current connection snapshot
    pub fn status(&self) -> WalletStatus {
        self.status.read().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.status.read().is_connected
    }

    pub fn account(&self) -> Option<String> {
        let status = self.status.read();
        status.is_connected.then(|| status.account.clone())
    }

    /// Subscribe to provider notifications
    pub fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.provider.subscribe()
    }

    fn set_error(&self, message: &str) {
        self.status.write().error = Some(message.to_string());
    }

    fn set_account(&self, account: &str) {
        let mut status = self.status.write();
        status.account = account.to_string();
        status.is_connected = true;
    }

    /// Adopt an account the provider already exposes, without prompting
    pub async fn restore(&self) -> Option<String> {
        match self.provider.accounts().await {
            Ok(accounts) => {
                let account = accounts.into_iter().next()?;
                self.set_account(&account);
                self.refresh_balance().await;
                Some(account)
            }
            Err(e) => {
                tracing::error!("Error checking connection: {}", e);
                self.set_error(CHECK_FAILED);
                None
            }
        }
    }

    /// Prompt for accounts and connect the first one
    pub async fn connect(&self) -> Option<String> {
        let account = match self.provider.request_accounts().await {
            Ok(accounts) => accounts.into_iter().next(),
            Err(e) => {
                tracing::error!("Error connecting wallet: {}", e);
                None
            }
        };

        match account {
            Some(account) => {
                self.set_account(&account);
                self.refresh_balance().await;
                tracing::info!("Wallet connected: {}", format_address(&account));
                Some(account)
            }
            None => {
                self.set_error(CONNECT_FAILED);
                None
            }
        }
    }

    /// Forget the connected account
    pub fn disconnect(&self) {
        let mut status = self.status.write();
        status.account.clear();
        status.balance_wei = 0;
        status.is_connected = false;
    }

    /// Apply an `accountsChanged` notification
    pub async fn handle_accounts_changed(&self, accounts: &[String]) -> Option<String> {
        match accounts.first() {
            Some(account) => {
                self.set_account(account);
                self.refresh_balance().await;
                Some(account.clone())
            }
            None => {
                self.disconnect();
                None
            }
        }
    }

    /// Re-read the balance of the connected account
    pub async fn refresh_balance(&self) -> Option<u128> {
        let account = self.account()?;
        match self.provider.get_balance(&account).await {
            Ok(balance) => {
                self.status.write().balance_wei = balance;
                Some(balance)
            }
            Err(e) => {
                tracing::error!("Error fetching balance: {}", e);
                self.set_error(BALANCE_FAILED);
                None
            }
        }
    }

    /// Network gas price in Gwei
    pub async fn gas_price_gwei(&self) -> Option<f64> {
        match self.provider.gas_price_wei().await {
            Ok(wei) => Some(wei_to_gwei(wei)),
            Err(e) => {
                tracing::error!("Error getting gas price: {}", e);
                self.set_error(GAS_PRICE_FAILED);
                None
            }
        }
    }

    /// Network gas price in Gwei, for background polling
    ///
    /// Failures are logged but leave the user-visible error alone; the
    /// caller has its own fallback.
    pub async fn poll_gas_price_gwei(&self) -> Option<f64> {
        match self.provider.gas_price_wei().await {
            Ok(wei) => Some(wei_to_gwei(wei)),
            Err(e) => {
                tracing::debug!("Gas price poll failed: {}", e);
                None
            }
        }
    }

    /// Send a zero-value self-transfer at `gas_price_gwei`
    ///
    /// Gas estimation failure falls back to `DEFAULT_GAS_LIMIT`.
    pub async fn send_transaction(&self, gas_price_gwei: f64) -> Option<String> {
        let Some(account) = self.account() else {
            tracing::error!("Error sending transaction: no account connected");
            self.set_error(SEND_FAILED);
            return None;
        };

        let request = TransactionRequest::self_transfer(&account, gas_price_gwei);
        let gas = match self.provider.estimate_gas(&request).await {
            Ok(gas) => gas,
            Err(e) => {
                tracing::warn!("Gas estimation failed, using {}: {}", DEFAULT_GAS_LIMIT, e);
                DEFAULT_GAS_LIMIT
            }
        };
        let request = request.with_gas_limit(gas);

        tracing::info!(
            "Sending transaction from {} at {} Gwei (gas {})",
            format_address(&account),
            gas_price_gwei,
            request.gas
        );

        match self.provider.send_transaction(request).await {
            Ok(hash) => Some(hash),
            Err(e) => {
                tracing::error!("Error sending transaction: {}", e);
                self.set_error(SEND_FAILED);
                None
            }
        }
    }
}
