//! GasSprint Node
//!
//! Runs one race session against the simulated wallet: connects, starts the
//! race, submits once the gas price looks good, and reports the standings
//! until the race clock runs out or Ctrl+C arrives. Snapshots persist in the
//! data directory between runs.

use anyhow::Result;
use clap::Parser;
use rand::{rngs::StdRng, Rng, SeedableRng};
use race_runtime::{RaceSession, RaceSnapshot, SubmissionState};
use std::{sync::Arc, time::Duration};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use wallet_bridge::{format_address, SimulatedWallet};

mod config;

use config::{Args, NodeConfig};

/// Largest per-refresh move of the simulated network price (Gwei)
const NETWORK_DRIFT: f64 = 6.0;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = NodeConfig::from(&args);
    run(config).await
}

async fn run(config: NodeConfig) -> Result<()> {
    tracing::info!("Starting GasSprint");
    tracing::info!("  Account: {}", format_address(&config.account));
    tracing::info!("  Race duration: {}s", config.race.race_duration_secs);
    tracing::info!("  Tick: {}ms", config.race.tick_ms);
    tracing::info!("  Submit below: {} Gwei", config.submit_below);
    match &config.race.cache_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            tracing::info!("  Data directory: {:?}", dir);
        }
        None => tracing::info!("  Snapshot cache disabled"),
    }

    let wallet = Arc::new(SimulatedWallet::new(&config.account));
    let session = RaceSession::open(config.race.clone(), wallet.clone()).await;

    if session.connect_wallet().await.is_none() {
        anyhow::bail!("wallet connection refused");
    }
    let status = session.wallet_status();
    tracing::info!(
        "Wallet {} holds {}",
        status.display_address(),
        status.display_balance()
    );

    if !session.start_race().await {
        anyhow::bail!("race could not start");
    }

    // Simulated network price drifting between refreshes
    let network_wallet = wallet.clone();
    let refresh = config.race.gas_refresh();
    let network = tokio::spawn(async move {
        let mut rng = StdRng::from_entropy();
        let mut gwei = race_runtime::INITIAL_GAS_PRICE;
        let mut interval = tokio::time::interval(refresh);
        loop {
            interval.tick().await;
            gwei = (gwei + rng.gen_range(-NETWORK_DRIFT..NETWORK_DRIFT)).clamp(10.0, 100.0);
            network_wallet.set_gas_price_gwei(gwei);
        }
    });

    tracing::info!("Race running. Press Ctrl+C to stop.");

    let mut report = tokio::time::interval(Duration::from_secs(config.report_secs));
    let mut poll = tokio::time::interval(config.race.tick());
    let mut submitted = false;
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("Shutting down...");
                break;
            }
            _ = report.tick() => {
                log_standings(&session.snapshot());
            }
            _ = poll.tick() => {
                if session.with_state(|s| s.clock().is_expired()) {
                    tracing::info!("Race clock expired");
                    break;
                }

                let snapshot = session.snapshot();
                if !submitted && snapshot.current_gas_price < config.submit_below {
                    submitted = submit(&session).await;
                }
            }
        }
    }

    network.abort();
    session.shutdown().await;

    let snapshot = session.snapshot();
    log_standings(&snapshot);
    if config.json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    }

    tracing::info!("GasSprint stopped");
    Ok(())
}

/// Submit at the current price; true once the attempt confirmed
async fn submit(session: &RaceSession) -> bool {
    match session.submit_transaction().await {
        SubmissionState::Confirmed { gas_price, tx_hash } => {
            tracing::info!("Confirmed {} at {} Gwei", tx_hash, gas_price);
            true
        }
        SubmissionState::Failed { gas_price, message } => {
            tracing::warn!("Submission at {} Gwei failed: {}", gas_price, message);
            false
        }
        _ => false,
    }
}

fn log_standings(snapshot: &RaceSnapshot) {
    tracing::info!(
        "{} left | gas {} Gwei ({:?}, {:?}) | submission {} | position {:?}",
        snapshot.time_remaining,
        snapshot.current_gas_price,
        snapshot.gas_zone,
        snapshot.gas_trend,
        snapshot.submission.label(),
        snapshot.current_user_position
    );
    for entry in &snapshot.current_race {
        let reward = entry
            .reward
            .map(|tier| tier.to_string())
            .unwrap_or_else(|| "-".to_string());
        tracing::info!(
            "  #{} {} {} Gwei score {} reward {}",
            entry.position,
            format_address(&entry.address),
            entry.gas_price,
            entry.score,
            reward
        );
    }
}
