//! Race Configuration

use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// Race session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceConfig {
    /// Base scheduler tick (animation rate) in milliseconds
    pub tick_ms: u64,
    /// Gas price refresh period in milliseconds
    pub gas_refresh_ms: u64,
    /// Opponent simulation period in milliseconds
    pub opponent_sim_ms: u64,
    /// Race clock period in milliseconds
    pub countdown_ms: u64,
    /// Race length in seconds
    pub race_duration_secs: u64,
    /// Gas price before the first refresh (Gwei)
    pub initial_gas_price: f64,
    /// Full-scale value of the speedometer (Gwei)
    pub max_gas_price: f64,
    /// Fixed RNG seed for reproducible runs
    pub seed: Option<u64>,
    /// Snapshot cache directory (None = no cache)
    pub cache_dir: Option<PathBuf>,
}

/// Periods shorter than this are raised to it
const MIN_PERIOD_MS: u64 = 1;

fn period(ms: u64) -> Duration {
    Duration::from_millis(ms.max(MIN_PERIOD_MS))
}

impl RaceConfig {
    /// Base tick; never zero
    pub fn tick(&self) -> Duration {
        period(self.tick_ms)
    }

    pub fn gas_refresh(&self) -> Duration {
        period(self.gas_refresh_ms)
    }

    pub fn opponent_sim(&self) -> Duration {
        period(self.opponent_sim_ms)
    }

    /// Race clock period; the clock drops by this much per firing
    pub fn countdown(&self) -> Duration {
        period(self.countdown_ms)
    }
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            tick_ms: crate::TICK_MS,
            gas_refresh_ms: crate::GAS_REFRESH_MS,
            opponent_sim_ms: crate::OPPONENT_SIM_MS,
            countdown_ms: crate::COUNTDOWN_MS,
            race_duration_secs: crate::DEFAULT_RACE_DURATION_SECS,
            initial_gas_price: crate::INITIAL_GAS_PRICE,
            max_gas_price: crate::gas_feed::DEFAULT_GAUGE_MAX,
            seed: None,
            cache_dir: None,
        }
    }
}
