//! Simulated Wallet - in-process provider
//!
//! Stands in for an injected browser wallet. Accounts, balance and gas price
//! are plain settings; failure switches let callers exercise every degraded
//! path of the race runtime.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;

use crate::{TransactionRequest, WalletError, WalletEvent, WalletProvider};

#[derive(Debug, Clone)]
struct SimulatedState {
    accounts: Vec<String>,
    exposed: bool,
    balance_wei: u128,
    gas_price_wei: u128,
    chain_id: String,
    fail_connect: bool,
    fail_balance: bool,
    fail_gas_price: bool,
    fail_estimate: bool,
    fail_send: bool,
}

/// In-process wallet provider
pub struct SimulatedWallet {
    state: RwLock<SimulatedState>,
    sent: RwLock<Vec<TransactionRequest>>,
    nonce: AtomicU64,
    events: broadcast::Sender<WalletEvent>,
}

impl SimulatedWallet {
    /// Create a wallet holding a single account
    pub fn new(account: &str) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            state: RwLock::new(SimulatedState {
                accounts: vec![account.to_string()],
                exposed: false,
                balance_wei: 1_250_000_000_000_000_000,
                gas_price_wei: 45_000_000_000,
                chain_id: "0x1".to_string(),
                fail_connect: false,
                fail_balance: false,
                fail_gas_price: false,
                fail_estimate: false,
                fail_send: false,
            }),
            sent: RwLock::new(Vec::new()),
            nonce: AtomicU64::new(0),
            events,
        }
    }

    /// Set the account balance
    pub fn with_balance_wei(self, balance_wei: u128) -> Self {
        self.set_balance_wei(balance_wei);
        self
    }

    /// Set the network gas price in Gwei
    pub fn with_gas_price_gwei(self, gwei: f64) -> Self {
        self.set_gas_price_gwei(gwei);
        self
    }

    /// Start with accounts already exposed (a returning user)
    pub fn already_connected(self) -> Self {
        self.state.write().exposed = true;
        self
    }

    pub fn set_balance_wei(&self, balance_wei: u128) {
        self.state.write().balance_wei = balance_wei;
    }

    pub fn set_gas_price_gwei(&self, gwei: f64) {
        self.state.write().gas_price_wei = (gwei.max(0.0) * 1e9) as u128;
    }

    pub fn set_fail_connect(&self, fail: bool) {
        self.state.write().fail_connect = fail;
    }

    pub fn set_fail_balance(&self, fail: bool) {
        self.state.write().fail_balance = fail;
    }

    pub fn set_fail_gas_price(&self, fail: bool) {
        self.state.write().fail_gas_price = fail;
    }

    pub fn set_fail_estimate(&self, fail: bool) {
        self.state.write().fail_estimate = fail;
    }

    pub fn set_fail_send(&self, fail: bool) {
        self.state.write().fail_send = fail;
    }

    /// Switch to a different account, notifying subscribers
    pub fn switch_account(&self, account: &str) {
        let accounts = {
            let mut state = self.state.write();
            state.accounts = vec![account.to_string()];
            state.exposed = true;
            state.accounts.clone()
        };
        let _ = self.events.send(WalletEvent::AccountsChanged(accounts));
    }

    /// Revoke account access, notifying subscribers
    pub fn revoke_accounts(&self) {
        self.state.write().exposed = false;
        let _ = self.events.send(WalletEvent::AccountsChanged(Vec::new()));
    }

    /// Switch chains, notifying subscribers
    pub fn switch_chain(&self, chain_id: &str) {
        self.state.write().chain_id = chain_id.to_string();
        let _ = self.events.send(WalletEvent::ChainChanged(chain_id.to_string()));
    }

    /// Active chain id
    pub fn chain_id(&self) -> String {
        self.state.read().chain_id.clone()
    }

    /// Transactions submitted so far
    pub fn sent_transactions(&self) -> Vec<TransactionRequest> {
        self.sent.read().clone()
    }

    /// Number of live event subscribers
    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }
}

#[async_trait]
impl WalletProvider for SimulatedWallet {
    async fn accounts(&self) -> Result<Vec<String>, WalletError> {
        let state = self.state.read();
        if state.exposed {
            Ok(state.accounts.clone())
        } else {
            Ok(Vec::new())
        }
    }

    async fn request_accounts(&self) -> Result<Vec<String>, WalletError> {
        let mut state = self.state.write();
        if state.fail_connect {
            return Err(WalletError::UserRejected);
        }
        if state.accounts.is_empty() {
            return Err(WalletError::NoAccounts);
        }
        state.exposed = true;
        Ok(state.accounts.clone())
    }

    async fn get_balance(&self, address: &str) -> Result<u128, WalletError> {
        let state = self.state.read();
        if state.fail_balance {
            return Err(WalletError::Request("eth_getBalance failed".to_string()));
        }
        if !state.accounts.iter().any(|a| a.eq_ignore_ascii_case(address)) {
            return Ok(0);
        }
        Ok(state.balance_wei)
    }

    async fn gas_price_wei(&self) -> Result<u128, WalletError> {
        let state = self.state.read();
        if state.fail_gas_price {
            return Err(WalletError::Request("eth_gasPrice failed".to_string()));
        }
        Ok(state.gas_price_wei)
    }

    async fn estimate_gas(&self, _request: &TransactionRequest) -> Result<u64, WalletError> {
        if self.state.read().fail_estimate {
            return Err(WalletError::EstimationFailed("execution reverted".to_string()));
        }
        Ok(crate::DEFAULT_GAS_LIMIT)
    }

    async fn send_transaction(&self, request: TransactionRequest) -> Result<String, WalletError> {
        {
            let state = self.state.read();
            if !state.exposed {
                return Err(WalletError::NotConnected);
            }
            if state.fail_send {
                return Err(WalletError::TransactionRejected("gas limit exceeded".to_string()));
            }
        }

        let nonce = self.nonce.fetch_add(1, Ordering::SeqCst);
        let hash = format!("0x{:064x}", nonce + 1);
        tracing::debug!("Simulated transaction {} from {}", hash, request.from);
        self.sent.write().push(request);
        Ok(hash)
    }

    fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCOUNT: &str = "0x71C7656EC7ab88b098defB751B7401B5f6d8976F";

    #[tokio::test]
    async fn test_accounts_hidden_until_requested() {
        let wallet = SimulatedWallet::new(ACCOUNT);
        assert!(wallet.accounts().await.unwrap().is_empty());

        let accounts = wallet.request_accounts().await.unwrap();
        assert_eq!(accounts, vec![ACCOUNT.to_string()]);
        assert_eq!(wallet.accounts().await.unwrap(), accounts);
    }

    #[tokio::test]
    async fn test_send_requires_connection() {
        let wallet = SimulatedWallet::new(ACCOUNT);
        let request = TransactionRequest::self_transfer(ACCOUNT, 20.0);
        assert_eq!(
            wallet.send_transaction(request.clone()).await,
            Err(WalletError::NotConnected)
        );

        wallet.request_accounts().await.unwrap();
        let hash = wallet.send_transaction(request).await.unwrap();
        assert!(hash.starts_with("0x"));
        assert_eq!(hash.len(), 66);
        assert_eq!(wallet.sent_transactions().len(), 1);
    }

    #[tokio::test]
    async fn test_events_reach_subscribers() {
        let wallet = SimulatedWallet::new(ACCOUNT);
        let mut events = wallet.subscribe();

        wallet.switch_account("0xdef");
        wallet.revoke_accounts();

        assert_eq!(
            events.recv().await.unwrap(),
            WalletEvent::AccountsChanged(vec!["0xdef".to_string()])
        );
        assert_eq!(events.recv().await.unwrap(), WalletEvent::AccountsChanged(Vec::new()));
    }
}
