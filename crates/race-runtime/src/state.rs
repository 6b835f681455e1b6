//! Race State - the session context
//!
//! Owns everything a race session mutates: roster, leaderboards, gas feed,
//! track, submission flow, scheduler and clock, plus the injected RNG.
//! All operations are synchronous and run to completion; the async session
//! layer calls them under a lock and never holds it across an await.

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Serialize;

use crate::{
    animator::{RaceCar, RaceTrack},
    config::RaceConfig,
    countdown::RaceClock,
    gas_feed::{GasPriceFeed, GasZone, PriceTrend},
    participant::{
        claim_participant, current_user_mut, reset_roster, seed_roster, Participant,
        TransactionStatus, SELF_PARTICIPANT_ID,
    },
    ranking::{
        gas_price_order, reward_tier, score_for, user_position, LeaderboardEntry, Leaderboards,
    },
    scheduler::{Scheduler, TaskKind},
    submission::{SubmissionFlow, SubmissionState},
};

/// Chance an opponent acts on a simulation tick
const OPPONENT_ACTION_CHANCE: f64 = 0.3;

/// Chance an acting opponent's transaction is already confirmed
const OPPONENT_CONFIRM_CHANCE: f64 = 0.7;

/// Read-only projection handed to the presentation layer
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceSnapshot {
    pub is_race_active: bool,
    pub account: Option<String>,
    pub current_gas_price: f64,
    pub is_optimal_gas_price: bool,
    pub gas_trend: PriceTrend,
    pub gas_zone: GasZone,
    pub needle_rotation: f64,
    pub time_remaining: String,
    pub race_progress: f64,
    pub submission: SubmissionState,
    pub current_user_position: Option<u32>,
    pub current_race: Vec<LeaderboardEntry>,
    pub all_time: Vec<LeaderboardEntry>,
    pub cars: Vec<RaceCar>,
}

/// Mutable state of one race session
pub struct RaceState {
    config: RaceConfig,
    roster: Vec<Participant>,
    leaderboards: Leaderboards,
    gas: GasPriceFeed,
    track: RaceTrack,
    submission: SubmissionFlow,
    scheduler: Scheduler,
    clock: RaceClock,
    account: Option<String>,
    race_active: bool,
    rng: StdRng,
}

impl RaceState {
    /// Fresh session on the seed roster
    pub fn new(config: RaceConfig) -> Self {
        Self::restore(config, seed_roster(), Leaderboards::default())
    }

    /// Session from a cached roster and leaderboards
    ///
    /// The cache is not trusted: the current race board is recomputed from
    /// the roster straight away.
    pub fn restore(config: RaceConfig, roster: Vec<Participant>, leaderboards: Leaderboards) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut state = Self {
            gas: GasPriceFeed::new(config.initial_gas_price),
            track: RaceTrack::from_participants(&roster),
            submission: SubmissionFlow::new(),
            scheduler: Scheduler::new(config.tick()),
            clock: RaceClock::new(config.race_duration_secs),
            account: None,
            race_active: false,
            roster,
            leaderboards,
            rng,
            config,
        };
        state.refresh_leaderboards();
        state
    }

    pub fn config(&self) -> &RaceConfig {
        &self.config
    }

    pub fn roster(&self) -> &[Participant] {
        &self.roster
    }

    pub fn leaderboards(&self) -> &Leaderboards {
        &self.leaderboards
    }

    pub fn current_race(&self) -> &[LeaderboardEntry] {
        &self.leaderboards.current
    }

    pub fn all_time(&self) -> &[LeaderboardEntry] {
        &self.leaderboards.all_time
    }

    pub fn cars(&self) -> &[RaceCar] {
        &self.track.cars
    }

    pub fn gas(&self) -> &GasPriceFeed {
        &self.gas
    }

    pub fn submission(&self) -> &SubmissionFlow {
        &self.submission
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn clock(&self) -> &RaceClock {
        &self.clock
    }

    pub fn account(&self) -> Option<&str> {
        self.account.as_deref()
    }

    pub fn is_connected(&self) -> bool {
        self.account.is_some()
    }

    pub fn is_race_active(&self) -> bool {
        self.race_active
    }

    /// Current race position of the connected account
    pub fn current_user_position(&self) -> Option<u32> {
        let account = self.account.as_deref()?;
        user_position(&self.leaderboards.current, account)
    }

    /// Periodic refresh: rank by stored position
    fn refresh_leaderboards(&mut self) {
        self.leaderboards.refresh_periodic(&self.roster, &mut self.rng);
    }

    /// Connect the local user as the self seed entry
    pub fn connect(&mut self, address: &str) {
        self.account = Some(address.to_string());
        if !claim_participant(&mut self.roster, SELF_PARTICIPANT_ID, address) {
            tracing::warn!("Roster has no {} entry; {} races unranked", SELF_PARTICIPANT_ID, address);
        }
        self.refresh_leaderboards();
        tracing::info!("Participant {} connected as {}", SELF_PARTICIPANT_ID, address);
    }

    /// Drop the wallet: stop the race and reset the roster to seed defaults
    pub fn disconnect(&mut self) {
        self.stop_race();
        self.account = None;
        self.submission.reset();
        self.roster = reset_roster();
        self.track = RaceTrack::from_participants(&self.roster);
        self.refresh_leaderboards();
        tracing::info!("Wallet disconnected, roster reset");
    }

    /// Start the race and its periodic tasks; needs a connected wallet
    pub fn start_race(&mut self) -> bool {
        if self.race_active || !self.is_connected() {
            return false;
        }

        self.race_active = true;
        self.clock.reset();
        self.track = RaceTrack::from_participants(&self.roster);

        let tasks = [
            (TaskKind::Animation, self.config.tick()),
            (TaskKind::GasRefresh, self.config.gas_refresh()),
            (TaskKind::OpponentSimulation, self.config.opponent_sim()),
            (TaskKind::Countdown, self.config.countdown()),
        ];
        for (kind, period) in tasks {
            self.scheduler.schedule(kind, period);
        }

        tracing::info!(
            "Race started ({}s, gas {} Gwei)",
            self.config.race_duration_secs,
            self.gas.current()
        );
        true
    }

    /// Stop the race and cancel every periodic task
    pub fn stop_race(&mut self) {
        if self.race_active {
            tracing::info!("Race stopped");
        }
        self.race_active = false;
        self.scheduler.cancel_all();
    }

    /// Advance the scheduler one base tick; returns the tasks due now
    pub fn tick(&mut self) -> Vec<TaskKind> {
        self.scheduler.advance()
    }

    /// `idle -> pending`: capture the current gas price for the local user
    ///
    /// Returns the captured price, or None (and changes nothing) when the
    /// wallet is disconnected, the race is inactive, or an attempt is pending.
    pub fn begin_submission(&mut self) -> Option<f64> {
        let gas_price = self.gas.current();
        if !self
            .submission
            .begin(self.is_connected(), self.race_active, gas_price)
        {
            tracing::debug!(
                "Submission ignored (connected: {}, race active: {})",
                self.is_connected(),
                self.race_active
            );
            return None;
        }

        if let Some(user) = current_user_mut(&mut self.roster) {
            user.transaction_submitted = true;
            user.gas_price = gas_price;
            user.transaction_status = TransactionStatus::Pending;
        }
        self.refresh_leaderboards();

        tracing::info!("Submission pending at {} Gwei", gas_price);
        Some(gas_price)
    }

    /// `pending -> confirmed`: score the user and rank by gas price
    pub fn confirm_submission(&mut self, tx_hash: &str) -> bool {
        if !self.submission.confirm(tx_hash) {
            return false;
        }
        let Some(gas_price) = self.submission.state().gas_price() else {
            return false;
        };

        if let Some(user) = current_user_mut(&mut self.roster) {
            user.position = 0;
            user.score = score_for(gas_price);
            user.reward = Some(reward_tier(gas_price));
            user.transaction_status = TransactionStatus::Confirmed;
        }

        self.leaderboards
            .refresh_after_submission(&self.roster, &mut self.rng);

        // Store the fresh ranks so the 0 placeholder never reaches the
        // periodic (stored position) ordering.
        for (rank, index) in gas_price_order(&self.roster).into_iter().enumerate() {
            self.roster[index].position = rank as u32 + 1;
        }

        tracing::info!(
            "Submission confirmed: {} at {} Gwei, position {:?}",
            tx_hash,
            gas_price,
            self.current_user_position()
        );
        true
    }

    /// `pending -> failed`
    pub fn fail_submission(&mut self) -> bool {
        if !self.submission.fail() {
            return false;
        }
        if let Some(user) = current_user_mut(&mut self.roster) {
            user.transaction_status = TransactionStatus::Failed;
        }
        self.refresh_leaderboards();
        tracing::warn!("Submission failed");
        true
    }

    /// Scheduled refresh: live quote if there is one, else a random-walk step
    pub fn apply_gas_price(&mut self, live: Option<f64>) -> f64 {
        let price = match live {
            Some(gwei) => self.gas.apply_live(gwei),
            None => self.gas.random_walk(&mut self.rng),
        };
        tracing::debug!("Gas price {} Gwei (live: {})", price, live.is_some());
        price
    }

    /// User-requested refresh
    pub fn refresh_gas_price(&mut self) -> f64 {
        self.gas.manual_refresh(&mut self.rng)
    }

    /// Let opponents submit; returns how many acted
    ///
    /// Only runs while a wallet is connected.
    pub fn simulate_opponents(&mut self) -> usize {
        if !self.is_connected() {
            return 0;
        }

        let mut acted = 0;
        for participant in self.roster.iter_mut().filter(|p| !p.is_current_user) {
            if self.rng.gen_bool(OPPONENT_ACTION_CHANCE) {
                participant.transaction_submitted = true;
                participant.gas_price = (self.rng.gen::<f64>() * 30.0 + 10.0).round();
                participant.transaction_status = if self.rng.gen_bool(OPPONENT_CONFIRM_CHANCE) {
                    TransactionStatus::Confirmed
                } else {
                    TransactionStatus::Pending
                };
                acted += 1;
            }
        }

        self.refresh_leaderboards();
        if acted > 0 {
            tracing::debug!("{} opponents acted", acted);
        }
        acted
    }

    /// Advance every car one animation tick
    pub fn animate(&mut self) {
        let gas_price = self.gas.current();
        let submitted = self.submission.has_submitted();
        self.track.step(gas_price, submitted, &mut self.rng);
    }

    /// Tick the race clock by the countdown task's effective period
    pub fn countdown(&mut self) {
        let elapsed = self
            .scheduler
            .period(TaskKind::Countdown)
            .unwrap_or_else(|| self.config.countdown());
        if self.clock.tick(elapsed) {
            tracing::info!("Race clock expired");
        }
    }

    /// Projection for the presentation layer
    pub fn snapshot(&self) -> RaceSnapshot {
        RaceSnapshot {
            is_race_active: self.race_active,
            account: self.account.clone(),
            current_gas_price: self.gas.current(),
            is_optimal_gas_price: self.gas.is_optimal(),
            gas_trend: self.gas.trend(),
            gas_zone: self.gas.zone(),
            needle_rotation: self.gas.needle_rotation(self.config.max_gas_price),
            time_remaining: self.clock.formatted(),
            race_progress: self.clock.progress(),
            submission: self.submission.state().clone(),
            current_user_position: self.current_user_position(),
            current_race: self.leaderboards.current.clone(),
            all_time: self.leaderboards.all_time.clone(),
            cars: self.track.cars.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::participant::current_user;

    const ME: &str = "0x1111111111111111111111111111111111111111";

    fn seeded() -> RaceState {
        RaceState::new(RaceConfig {
            seed: Some(17),
            ..Default::default()
        })
    }

    fn racing() -> RaceState {
        let mut state = seeded();
        state.connect(ME);
        assert!(state.start_race());
        state
    }

    #[test]
    fn test_new_ranks_seed_roster_by_stored_position() {
        let state = seeded();
        let positions: Vec<(&str, u32)> = state
            .current_race()
            .iter()
            .map(|e| (e.address.as_str(), e.position))
            .collect();
        assert_eq!(
            positions,
            vec![
                ("0x9876543210fedcba9876543210fedcba98765432", 1),
                ("0x3210fedcba9876543210fedcba9876543210fedc", 2),
            ]
        );
        assert_eq!(state.all_time().len(), 2);
    }

    #[test]
    fn test_submit_is_noop_without_wallet_or_race() {
        let mut state = seeded();
        let before = state.roster().to_vec();
        assert_eq!(state.begin_submission(), None);
        assert_eq!(state.submission().state(), &SubmissionState::Idle);
        assert_eq!(state.roster(), &before[..]);

        state.connect(ME);
        let before = state.roster().to_vec();
        assert_eq!(state.begin_submission(), None);
        assert_eq!(state.submission().state(), &SubmissionState::Idle);
        assert_eq!(state.roster(), &before[..]);
    }

    #[test]
    fn test_start_race_needs_wallet() {
        let mut state = seeded();
        assert!(!state.start_race());
        assert!(state.scheduler().active_tasks().is_empty());

        state.connect(ME);
        assert!(state.start_race());
        assert!(!state.start_race());
        assert_eq!(state.scheduler().active_tasks().len(), 4);
    }

    #[test]
    fn test_submission_confirm_ranks_by_gas_price() {
        let mut state = racing();
        state.apply_gas_price(Some(13.0));

        assert_eq!(state.begin_submission(), Some(13.0));
        let user = current_user(state.roster()).unwrap();
        assert!(user.transaction_submitted);
        assert_eq!(user.transaction_status, TransactionStatus::Pending);
        assert_eq!(user.gas_price, 13.0);

        assert!(state.confirm_submission("0xabc"));
        let user = current_user(state.roster()).unwrap();
        assert_eq!(user.score, 87);
        assert_eq!(user.reward, Some(crate::RewardTier::High));
        assert_eq!(user.transaction_status, TransactionStatus::Confirmed);

        let gas: Vec<f64> = state.current_race().iter().map(|e| e.gas_price).collect();
        assert_eq!(gas, vec![12.3, 13.0, 15.8]);
        assert_eq!(state.current_user_position(), Some(2));
        assert_eq!(user.position, 2);
        assert_eq!(state.all_time().len(), 3);
    }

    #[test]
    fn test_confirm_ranks_participants_sharing_an_address() {
        let mut roster = seed_roster();
        roster[2].address = roster[1].address.clone();
        let mut state = RaceState::restore(
            RaceConfig {
                seed: Some(17),
                ..Default::default()
            },
            roster,
            Leaderboards::default(),
        );
        state.connect(ME);
        state.start_race();
        state.apply_gas_price(Some(14.0));
        state.begin_submission();
        state.confirm_submission("0xabc");

        let positions: Vec<(&str, u32)> = state
            .roster()
            .iter()
            .map(|p| (p.id.as_str(), p.position))
            .collect();
        assert_eq!(positions, vec![("user1", 2), ("user2", 3), ("user3", 1)]);
    }

    #[test]
    fn test_gas_price_captured_at_begin() {
        let mut state = racing();
        state.apply_gas_price(Some(20.0));
        state.begin_submission();
        state.apply_gas_price(Some(80.0));
        state.confirm_submission("0xabc");

        let user = current_user(state.roster()).unwrap();
        assert_eq!(user.gas_price, 20.0);
        assert_eq!(user.score, 80);
    }

    #[test]
    fn test_failed_submission_can_be_retried() {
        let mut state = racing();
        state.begin_submission();
        assert!(state.fail_submission());
        assert_eq!(
            current_user(state.roster()).unwrap().transaction_status,
            TransactionStatus::Failed
        );
        assert!(!state.confirm_submission("0xlate"));

        assert!(state.begin_submission().is_some());
        assert!(state.submission().is_pending());
    }

    #[test]
    fn test_disconnect_resets_everything() {
        let mut state = racing();
        state.begin_submission();
        state.disconnect();

        assert!(!state.is_race_active());
        assert!(state.scheduler().active_tasks().is_empty());
        assert_eq!(state.submission().state(), &SubmissionState::Idle);
        assert!(current_user(state.roster()).is_none());
        assert_eq!(state.roster()[0].address, seed_roster()[0].address);
        assert!(!state.roster()[0].transaction_submitted);
    }

    #[test]
    fn test_opponents_need_wallet() {
        let mut state = seeded();
        let before = state.roster().to_vec();
        assert_eq!(state.simulate_opponents(), 0);
        assert_eq!(state.roster(), &before[..]);
    }

    #[test]
    fn test_opponents_never_touch_user() {
        let mut state = racing();
        for _ in 0..100 {
            state.simulate_opponents();
            let user = current_user(state.roster()).unwrap();
            assert!(!user.transaction_submitted);
            for opponent in state.roster().iter().filter(|p| !p.is_current_user) {
                assert!(opponent.transaction_submitted);
                assert!((10.0..=40.0).contains(&opponent.gas_price));
            }
        }
    }

    #[test]
    fn test_tick_drives_animation() {
        let mut state = racing();
        let before: Vec<f64> = state.cars().iter().map(|c| c.position).collect();
        let due = state.tick();
        assert_eq!(due, vec![TaskKind::Animation]);
        state.animate();
        let after: Vec<f64> = state.cars().iter().map(|c| c.position).collect();
        assert_ne!(before, after);
    }

    #[test]
    fn test_stop_race_cancels_tasks() {
        let mut state = racing();
        state.stop_race();
        assert!((0..100).all(|_| state.tick().is_empty()));
    }

    #[test]
    fn test_countdown() {
        let mut state = racing();
        state.countdown();
        assert_eq!(state.clock().remaining_secs(), 299);
        assert_eq!(state.snapshot().time_remaining, "04:59");
    }

    #[test]
    fn test_countdown_follows_configured_period() {
        let mut state = RaceState::new(RaceConfig {
            countdown_ms: 500,
            seed: Some(17),
            ..Default::default()
        });
        state.connect(ME);
        state.start_race();
        for _ in 0..4 {
            state.countdown();
        }
        assert_eq!(state.clock().remaining_secs(), 298);
        assert_eq!(state.snapshot().time_remaining, "04:58");
    }

    #[test]
    fn test_snapshot() {
        let mut state = racing();
        state.apply_gas_price(Some(35.0));
        let snapshot = state.snapshot();
        assert!(snapshot.is_race_active);
        assert_eq!(snapshot.account.as_deref(), Some(ME));
        assert!(snapshot.is_optimal_gas_price);
        assert_eq!(snapshot.gas_trend, PriceTrend::Down);
        assert_eq!(snapshot.cars.len(), 3);
        assert_eq!(snapshot.current_user_position, None);
    }
}
