//! Node Configuration

use clap::Parser;
use race_runtime::RaceConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// GasSprint - race to submit at the lowest gas price
#[derive(Parser, Debug)]
#[command(name = "gas-sprint")]
#[command(about = "Gas-price race against simulated opponents", long_about = None)]
pub struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Base scheduler tick in milliseconds
    #[arg(long, default_value_t = race_runtime::TICK_MS)]
    pub tick_ms: u64,

    /// Race length in seconds
    #[arg(long, env = "RACE_DURATION", default_value_t = race_runtime::DEFAULT_RACE_DURATION_SECS)]
    pub race_duration: u64,

    /// Full-scale speedometer value in Gwei
    #[arg(long, env = "MAX_GAS_PRICE", default_value_t = race_runtime::gas_feed::DEFAULT_GAUGE_MAX)]
    pub max_gas_price: f64,

    /// Fixed RNG seed for reproducible races
    #[arg(long)]
    pub seed: Option<u64>,

    /// Snapshot cache directory
    #[arg(long, default_value = "./data")]
    pub data_dir: PathBuf,

    /// Run without the snapshot cache
    #[arg(long)]
    pub no_cache: bool,

    /// Account exposed by the simulated wallet
    #[arg(long, default_value = "0x71C7656EC7ab88b098defB751B7401B5f6d8976F")]
    pub account: String,

    /// Submit once the gas price drops below this (Gwei)
    #[arg(long, default_value_t = race_runtime::OPTIMAL_GAS_THRESHOLD)]
    pub submit_below: f64,

    /// Leaderboard report interval in seconds
    #[arg(long, default_value = "5")]
    pub report_secs: u64,

    /// Print the final snapshot as JSON
    #[arg(long)]
    pub json: bool,
}

/// Demo node configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub race: RaceConfig,
    /// Simulated wallet account
    pub account: String,
    /// Gas price that triggers the scripted submission
    pub submit_below: f64,
    pub report_secs: u64,
    pub json: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            race: RaceConfig::default(),
            account: "0x71C7656EC7ab88b098defB751B7401B5f6d8976F".to_string(),
            submit_below: race_runtime::OPTIMAL_GAS_THRESHOLD,
            report_secs: 5,
            json: false,
        }
    }
}

impl From<&Args> for NodeConfig {
    fn from(args: &Args) -> Self {
        let race = RaceConfig {
            tick_ms: args.tick_ms.max(1),
            race_duration_secs: args.race_duration,
            max_gas_price: args.max_gas_price,
            seed: args.seed,
            cache_dir: (!args.no_cache).then(|| args.data_dir.clone()),
            ..Default::default()
        };

        Self {
            race,
            account: args.account.clone(),
            submit_below: args.submit_below,
            report_secs: args.report_secs.max(1),
            json: args.json,
        }
    }
}
