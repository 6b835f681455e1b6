//! Wallet Provider Errors

use thiserror::Error;

/// Failures reported by a wallet provider
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("No account connected")]
    NotConnected,

    #[error("No accounts returned from provider")]
    NoAccounts,

    #[error("User rejected the request")]
    UserRejected,

    #[error("Gas estimation failed: {0}")]
    EstimationFailed(String),

    #[error("Transaction rejected: {0}")]
    TransactionRejected(String),

    #[error("Provider request failed: {0}")]
    Request(String),
}
