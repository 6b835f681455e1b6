//! Race Session - async orchestration
//!
//! Wires `RaceState` to the wallet and the snapshot cache:
//! - User intents (connect, disconnect, start/stop race, submit, refresh)
//! - A driver task running the scheduler on a fixed interval
//! - A listener task following wallet account/chain notifications
//!
//! The state lock is never held across an await, so every task reads the
//! current state when it runs rather than a copy captured earlier.

use parking_lot::{Mutex, RwLock};
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::broadcast::error::RecvError,
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use wallet_bridge::{WalletClient, WalletEvent, WalletProvider, WalletStatus};

use crate::{
    config::RaceConfig,
    participant::seed_roster,
    persistence::SnapshotCache,
    ranking::Leaderboards,
    scheduler::TaskKind,
    state::{RaceSnapshot, RaceState},
    submission::SubmissionState,
};

/// One race session: state, wallet, cache and background tasks
#[derive(Clone)]
pub struct RaceSession {
    state: Arc<RwLock<RaceState>>,
    wallet: WalletClient,
    cache: Option<Arc<SnapshotCache>>,
    driver: Arc<Mutex<Option<JoinHandle<()>>>>,
    listener: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl RaceSession {
    /// Open a session: load cached snapshots, restore an existing wallet
    /// connection and start following wallet notifications
    pub async fn open(config: RaceConfig, provider: Arc<dyn WalletProvider>) -> Self {
        let cache = config.cache_dir.as_ref().and_then(|dir| match SnapshotCache::open(dir) {
            Ok(cache) => Some(Arc::new(cache)),
            Err(e) => {
                tracing::warn!("Snapshot cache unavailable, running without it: {}", e);
                None
            }
        });

        let state = match cache.as_deref() {
            Some(cache) => restore_from_cache(config, cache),
            None => RaceState::new(config),
        };

        let session = Self {
            state: Arc::new(RwLock::new(state)),
            wallet: WalletClient::new(provider),
            cache,
            driver: Arc::new(Mutex::new(None)),
            listener: Arc::new(Mutex::new(None)),
        };

        if let Some(account) = session.wallet.restore().await {
            session.state.write().connect(&account);
            session.persist();
        }

        session.spawn_listener();
        tracing::info!("Race session opened");
        session
    }

    /// End the session: stop the race, stop following the wallet, flush
    pub async fn shutdown(&self) {
        self.stop_race().await;

        let listener = self.listener.lock().take();
        if let Some(handle) = listener {
            handle.abort();
            let _ = handle.await;
        }

        self.persist();
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.flush() {
                tracing::warn!("Failed to flush snapshot cache: {}", e);
            }
        }
        tracing::info!("Race session closed");
    }

    /// Presentation projection of the current state
    pub fn snapshot(&self) -> RaceSnapshot {
        self.state.read().snapshot()
    }

    /// Run `f` against the current state
    pub fn with_state<R>(&self, f: impl FnOnce(&RaceState) -> R) -> R {
        f(&self.state.read())
    }

    pub fn wallet_status(&self) -> WalletStatus {
        self.wallet.status()
    }

    /// Whether the race driver task is alive
    pub fn is_driving(&self) -> bool {
        self.driver
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Whether wallet notifications are being followed
    pub fn is_listening(&self) -> bool {
        self.listener
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Connect the wallet and claim the local participant
    pub async fn connect_wallet(&self) -> Option<String> {
        let account = self.wallet.connect().await?;
        self.state.write().connect(&account);
        self.persist();
        Some(account)
    }

    /// Disconnect the wallet, ending any race
    pub async fn disconnect_wallet(&self) {
        self.wallet.disconnect();
        self.reset_after_disconnect().await;
    }

    /// Start the race and its driver; needs a connected wallet
    pub async fn start_race(&self) -> bool {
        if !self.state.write().start_race() {
            return false;
        }

        if self.wallet.is_connected() {
            let live = self.wallet.poll_gas_price_gwei().await;
            let mut state = self.state.write();
            if let (Some(gwei), true) = (live, state.is_race_active()) {
                state.apply_gas_price(Some(gwei));
            }
        }

        self.spawn_driver();
        true
    }

    /// Stop the race; returns once the driver has exited
    pub async fn stop_race(&self) {
        self.state.write().stop_race();

        let driver = self.driver.lock().take();
        if let Some(handle) = driver {
            handle.abort();
            let _ = handle.await;
        }
    }

    /// Submit a transaction at the current gas price
    ///
    /// A no-op returning `Idle` unless the wallet is connected and the race
    /// is active. Waits for the wallet with no timeout.
    pub async fn submit_transaction(&self) -> SubmissionState {
        let begun = self.state.write().begin_submission();
        let Some(gas_price) = begun else {
            return self.state.read().submission().state().clone();
        };
        self.persist();

        match self.wallet.send_transaction(gas_price).await {
            Some(tx_hash) => {
                self.state.write().confirm_submission(&tx_hash);
            }
            None => {
                self.state.write().fail_submission();
            }
        }
        self.persist();

        self.state.read().submission().state().clone()
    }

    /// User-requested gas price refresh
    pub fn refresh_gas_price(&self) -> f64 {
        self.state.write().refresh_gas_price()
    }

    async fn reset_after_disconnect(&self) {
        self.stop_race().await;
        self.state.write().disconnect();

        if let Some(cache) = &self.cache {
            let (roster, all_time) = {
                let state = self.state.read();
                (state.roster().to_vec(), state.all_time().to_vec())
            };
            let result = cache
                .save_roster(&roster)
                .and_then(|_| cache.clear_current_race())
                .and_then(|_| cache.save_all_time(&all_time));
            if let Err(e) = result {
                tracing::warn!("Failed to cache disconnect reset: {}", e);
            }
        }
    }

    /// Best-effort write of roster and leaderboards
    fn persist(&self) {
        let Some(cache) = &self.cache else {
            return;
        };

        let (roster, boards) = {
            let state = self.state.read();
            (state.roster().to_vec(), state.leaderboards().clone())
        };
        let result = cache
            .save_roster(&roster)
            .and_then(|_| cache.save_current_race(&boards.current))
            .and_then(|_| cache.save_all_time(&boards.all_time));
        if let Err(e) = result {
            tracing::warn!("Failed to cache race snapshot: {}", e);
        }
    }

    fn spawn_driver(&self) {
        let session = self.clone();
        let handle = tokio::spawn(async move { session.drive().await });
        if let Some(previous) = self.driver.lock().replace(handle) {
            previous.abort();
        }
    }

    /// Scheduler loop; exits as soon as the race is no longer active
    async fn drive(self) {
        let tick = self
            .state
            .read()
            .scheduler()
            .base_tick()
            .max(Duration::from_millis(1));
        let mut interval = interval_at(Instant::now() + tick, tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!("Race driver started ({}ms ticks)", tick.as_millis());

        loop {
            interval.tick().await;

            let due = {
                let mut state = self.state.write();
                if !state.is_race_active() {
                    break;
                }
                state.tick()
            };

            for kind in due {
                self.run_task(kind).await;
            }
        }

        tracing::info!("Race driver stopped");
    }

    async fn run_task(&self, kind: TaskKind) {
        match kind {
            TaskKind::Animation => self.state.write().animate(),
            TaskKind::GasRefresh => {
                // Fetch failures fall back to the random walk without
                // surfacing an error.
                let live = if self.wallet.is_connected() {
                    self.wallet.poll_gas_price_gwei().await
                } else {
                    None
                };
                let mut state = self.state.write();
                if state.is_race_active() {
                    state.apply_gas_price(live);
                }
            }
            TaskKind::OpponentSimulation => {
                self.state.write().simulate_opponents();
                self.persist();
            }
            TaskKind::Countdown => self.state.write().countdown(),
        }
    }

    fn spawn_listener(&self) {
        let session = self.clone();
        let mut events = self.wallet.subscribe();
        let handle = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => session.handle_wallet_event(event).await,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("Missed {} wallet notifications", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
        *self.listener.lock() = Some(handle);
    }

    async fn handle_wallet_event(&self, event: WalletEvent) {
        match event {
            WalletEvent::AccountsChanged(accounts) => {
                match self.wallet.handle_accounts_changed(&accounts).await {
                    Some(account) => {
                        self.state.write().connect(&account);
                        self.persist();
                    }
                    None => {
                        tracing::info!("Wallet revoked access");
                        self.reset_after_disconnect().await;
                    }
                }
            }
            WalletEvent::ChainChanged(chain_id) => {
                tracing::info!("Wallet switched to chain {}", chain_id);
                self.wallet.refresh_balance().await;
            }
        }
    }
}

fn restore_from_cache(config: RaceConfig, cache: &SnapshotCache) -> RaceState {
    let roster = match cache.load_roster() {
        Ok(Some(roster)) if !roster.is_empty() => {
            tracing::info!("Restored {} participants from cache", roster.len());
            roster
        }
        Ok(_) => seed_roster(),
        Err(e) => {
            tracing::warn!("Cached roster unreadable, using seed roster: {}", e);
            seed_roster()
        }
    };

    let all_time = cache.load_all_time().unwrap_or_else(|e| {
        tracing::warn!("Cached all-time board unreadable: {}", e);
        None
    });

    let leaderboards = Leaderboards {
        current: Vec::new(),
        all_time: all_time.unwrap_or_default(),
    };
    RaceState::restore(config, roster, leaderboards)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::participant::{current_user, TransactionStatus};
    use tempfile::tempdir;
    use wallet_bridge::{client::SEND_FAILED, SimulatedWallet};

    const ME: &str = "0x71C7656EC7ab88b098defB751B7401B5f6d8976F";

    fn fast_config() -> RaceConfig {
        RaceConfig {
            tick_ms: 5,
            gas_refresh_ms: 15,
            opponent_sim_ms: 25,
            countdown_ms: 10,
            seed: Some(99),
            ..Default::default()
        }
    }

    async fn open(config: RaceConfig) -> (Arc<SimulatedWallet>, RaceSession) {
        let wallet = Arc::new(SimulatedWallet::new(ME).with_gas_price_gwei(22.0));
        let session = RaceSession::open(config, wallet.clone()).await;
        (wallet, session)
    }

    async fn wait_for(session: &RaceSession, check: impl Fn(&RaceState) -> bool) -> bool {
        for _ in 0..200 {
            if session.with_state(&check) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_full_race_flow() {
        let (_, session) = open(fast_config()).await;
        assert_eq!(session.connect_wallet().await.as_deref(), Some(ME));
        assert!(session.start_race().await);
        assert!(session.is_driving());
        // initial live quote
        assert_eq!(session.snapshot().current_gas_price, 22.0);

        let state = session.submit_transaction().await;
        assert_eq!(state.label(), "confirmed");
        assert!(session.snapshot().current_user_position.is_some());

        let user_status = session.with_state(|s| current_user(s.roster()).unwrap().transaction_status);
        assert_eq!(user_status, TransactionStatus::Confirmed);

        session.shutdown().await;
    }

    #[tokio::test]
    async fn test_submit_noop_without_race() {
        let (wallet, session) = open(fast_config()).await;
        assert_eq!(session.submit_transaction().await, SubmissionState::Idle);

        session.connect_wallet().await;
        assert_eq!(session.submit_transaction().await, SubmissionState::Idle);
        assert!(wallet.sent_transactions().is_empty());
        session.shutdown().await;
    }

    #[tokio::test]
    async fn test_send_failure_marks_failed() {
        let (wallet, session) = open(fast_config()).await;
        session.connect_wallet().await;
        session.start_race().await;
        wallet.set_fail_send(true);

        let state = session.submit_transaction().await;
        assert_eq!(state.label(), "failed");
        assert_eq!(session.wallet_status().error.as_deref(), Some(SEND_FAILED));
        session.shutdown().await;
    }

    #[tokio::test]
    async fn test_gas_failure_falls_back_silently() {
        let (wallet, session) = open(fast_config()).await;
        session.connect_wallet().await;
        wallet.set_fail_gas_price(true);
        session.start_race().await;

        assert!(wait_for(&session, |s| s.gas().current() != 45.0).await);
        let price = session.snapshot().current_gas_price;
        assert!((10.0..=100.0).contains(&price));
        assert_eq!(session.wallet_status().error, None);
        session.shutdown().await;
    }

    #[tokio::test]
    async fn test_stop_race_cancels_timers() {
        let (_, session) = open(fast_config()).await;
        session.connect_wallet().await;
        session.start_race().await;
        assert!(wait_for(&session, |s| s.scheduler().ticks() > 3).await);

        session.stop_race().await;
        assert!(!session.is_driving());
        assert!(session.with_state(|s| s.scheduler().active_tasks().is_empty()));

        let frozen = session.snapshot().cars;
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(session.snapshot().cars, frozen);
        session.shutdown().await;
    }

    #[tokio::test]
    async fn test_revoked_accounts_end_the_race() {
        let (wallet, session) = open(fast_config()).await;
        session.connect_wallet().await;
        session.start_race().await;

        wallet.revoke_accounts();
        assert!(wait_for(&session, |s| !s.is_connected()).await);
        assert!(wait_for(&session, |s| !s.is_race_active()).await);
        assert!(session.with_state(|s| current_user(s.roster()).is_none()));
        session.shutdown().await;
    }

    #[tokio::test]
    async fn test_account_switch_rebinds_participant() {
        let (wallet, session) = open(fast_config()).await;
        session.connect_wallet().await;

        wallet.switch_account("0x2222222222222222222222222222222222222222");
        assert!(
            wait_for(&session, |s| s.account() == Some("0x2222222222222222222222222222222222222222"))
                .await
        );
        let address = session.with_state(|s| current_user(s.roster()).unwrap().address.clone());
        assert_eq!(address, "0x2222222222222222222222222222222222222222");
        session.shutdown().await;
    }

    #[tokio::test]
    async fn test_zero_tick_still_drives() {
        let (_, session) = open(RaceConfig {
            tick_ms: 0,
            ..fast_config()
        })
        .await;
        session.connect_wallet().await;
        assert!(session.start_race().await);

        assert!(wait_for(&session, |s| s.scheduler().ticks() > 3).await);
        assert!(session.is_driving());
        session.shutdown().await;
    }

    #[tokio::test]
    async fn test_chain_change_refreshes_balance() {
        let (wallet, session) = open(fast_config()).await;
        session.connect_wallet().await;
        assert_eq!(session.wallet_status().balance_wei, 1_250_000_000_000_000_000);

        wallet.set_balance_wei(500_000_000_000_000_000);
        wallet.switch_chain("0x5");
        assert_eq!(wallet.chain_id(), "0x5");

        let mut refreshed = false;
        for _ in 0..200 {
            if session.wallet_status().balance_wei == 500_000_000_000_000_000 {
                refreshed = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(refreshed);
        assert_eq!(session.wallet_status().display_balance(), "0.5000 ETH");
        assert!(session.with_state(|s| s.is_connected()));
        session.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_unsubscribes() {
        let (wallet, session) = open(fast_config()).await;
        assert!(session.is_listening());
        assert_eq!(wallet.subscriber_count(), 1);

        session.shutdown().await;
        assert!(!session.is_listening());
        assert_eq!(wallet.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_restores_existing_connection() {
        let wallet = Arc::new(SimulatedWallet::new(ME).already_connected());
        let session = RaceSession::open(fast_config(), wallet).await;
        assert!(session.with_state(|s| s.is_connected()));
        assert!(session.wallet_status().is_connected);
        session.shutdown().await;
    }

    #[tokio::test]
    async fn test_cache_survives_sessions() {
        let dir = tempdir().unwrap();
        let config = RaceConfig {
            cache_dir: Some(dir.path().to_path_buf()),
            ..fast_config()
        };

        {
            let (_, session) = open(config.clone()).await;
            session.connect_wallet().await;
            session.start_race().await;
            session.submit_transaction().await;
            session.shutdown().await;
        }

        let (_, session) = open(config).await;
        let submitted = session.with_state(|s| {
            s.roster()
                .iter()
                .find(|p| p.address == ME)
                .map(|p| p.transaction_submitted)
        });
        assert_eq!(submitted, Some(true));
        session.shutdown().await;
    }

    #[tokio::test]
    async fn test_disconnect_clears_cached_race_only() {
        let dir = tempdir().unwrap();
        let config = RaceConfig {
            cache_dir: Some(dir.path().to_path_buf()),
            ..fast_config()
        };
        let (_, session) = open(config).await;
        session.connect_wallet().await;
        session.start_race().await;
        session.submit_transaction().await;

        session.disconnect_wallet().await;
        assert!(!session.is_driving());

        let cache = session.cache.clone().unwrap();
        assert!(cache.load_current_race().unwrap().is_none());
        assert!(!cache.load_all_time().unwrap().unwrap().is_empty());
        session.shutdown().await;
    }
}
