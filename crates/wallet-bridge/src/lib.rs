//! Wallet Bridge - Wallet provider integration
//!
//! Everything the race runtime needs from an injected wallet:
//! - The `WalletProvider` contract (accounts, balance, gas price, send)
//! - `WalletClient`, which owns connection state and the user-facing error
//! - Unit conversion and display formatting
//! - `SimulatedWallet`, an in-process provider for demos and tests

pub mod client;
pub mod error;
pub mod provider;
pub mod simulated;
pub mod units;

pub use client::{WalletClient, WalletStatus};
pub use error::WalletError;
pub use provider::{TransactionRequest, WalletEvent, WalletProvider};
pub use simulated::SimulatedWallet;
pub use units::{format_address, format_balance, gwei_to_wei_hex, wei_to_eth, wei_to_gwei};

/// Gas limit used when estimation fails (plain transfer)
pub const DEFAULT_GAS_LIMIT: u64 = 21_000;
