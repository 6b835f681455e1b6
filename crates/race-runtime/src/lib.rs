//! Race Runtime - GasSprint core
//!
//! Turns wallet and gas-price events into race standings:
//! - Participant roster and the seed defaults
//! - Ranking engine (current race by gas price or stored position, all-time)
//! - Race animator and gas price feed
//! - Transaction submission state machine
//! - Single-tick scheduler driving the periodic tasks
//! - Session context with a best-effort snapshot cache

pub mod animator;
pub mod config;
pub mod countdown;
pub mod gas_feed;
pub mod participant;
pub mod persistence;
pub mod ranking;
pub mod scheduler;
pub mod session;
pub mod state;
pub mod submission;

pub use animator::{RaceCar, RaceTrack};
pub use config::RaceConfig;
pub use countdown::RaceClock;
pub use gas_feed::{GasPriceFeed, GasZone, PriceTrend};
pub use participant::{seed_roster, Participant, RewardTier, TransactionStatus};
pub use persistence::{SnapshotCache, SnapshotMetadata};
pub use ranking::{LeaderboardEntry, Leaderboards};
pub use scheduler::{Scheduler, TaskKind};
pub use session::RaceSession;
pub use state::{RaceSnapshot, RaceState};
pub use submission::{SubmissionFlow, SubmissionState};

/// Base scheduler tick in milliseconds (animation rate)
pub const TICK_MS: u64 = 100;

/// Gas price refresh period in milliseconds
pub const GAS_REFRESH_MS: u64 = 3_000;

/// Opponent simulation period in milliseconds
pub const OPPONENT_SIM_MS: u64 = 5_000;

/// Race clock period in milliseconds
pub const COUNTDOWN_MS: u64 = 1_000;

/// Default race length in seconds
pub const DEFAULT_RACE_DURATION_SECS: u64 = 300;

/// Gas price shown before the first refresh (Gwei)
pub const INITIAL_GAS_PRICE: f64 = 45.0;

/// Prices strictly below this are optimal for submission (Gwei)
pub const OPTIMAL_GAS_THRESHOLD: f64 = 40.0;
