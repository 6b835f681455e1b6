//! Gas Price Feed
//!
//! Holds the price every other component reads. A live wallet quote wins;
//! otherwise the price takes a bounded random-walk step. Prices are kept in
//! whole Gwei.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::OPTIMAL_GAS_THRESHOLD;

/// Random-walk floor (Gwei)
pub const MIN_GAS_PRICE: f64 = 10.0;

/// Random-walk ceiling (Gwei)
pub const MAX_GAS_PRICE: f64 = 100.0;

/// Largest random-walk step per refresh (Gwei)
pub const WALK_STEP: f64 = 5.0;

/// Largest step for a user-requested refresh (Gwei)
pub const MANUAL_STEP: f64 = 3.0;

/// Default full-scale value of the speedometer (Gwei)
pub const DEFAULT_GAUGE_MAX: f64 = 120.0;

/// Direction of the last price change
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceTrend {
    Up,
    Down,
    Stable,
}

/// Speedometer band
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GasZone {
    /// <= 30 Gwei
    Low,
    /// <= 60 Gwei
    Medium,
    /// <= 90 Gwei
    High,
    Extreme,
}

impl GasZone {
    pub fn classify(price: f64) -> Self {
        if price <= 30.0 {
            Self::Low
        } else if price <= 60.0 {
            Self::Medium
        } else if price <= 90.0 {
            Self::High
        } else {
            Self::Extreme
        }
    }
}

/// Current and previous gas price
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GasPriceFeed {
    current: f64,
    previous: f64,
}

impl GasPriceFeed {
    pub fn new(initial: f64) -> Self {
        Self {
            current: initial,
            previous: initial,
        }
    }

    /// Current price in Gwei
    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn previous(&self) -> f64 {
        self.previous
    }

    fn set(&mut self, price: f64) -> f64 {
        self.previous = self.current;
        self.current = price;
        price
    }

    /// Adopt a live provider quote
    pub fn apply_live(&mut self, gwei: f64) -> f64 {
        self.set(gwei.round())
    }

    /// Fallback step: `clamp(prev + uniform[-5, 5], 10, 100)`
    pub fn random_walk<R: Rng>(&mut self, rng: &mut R) -> f64 {
        self.step(WALK_STEP, rng)
    }

    /// User-requested refresh: a smaller `[-3, 3]` step
    pub fn manual_refresh<R: Rng>(&mut self, rng: &mut R) -> f64 {
        self.step(MANUAL_STEP, rng)
    }

    fn step<R: Rng>(&mut self, max_step: f64, rng: &mut R) -> f64 {
        let change = rng.gen_range(-max_step..=max_step);
        let next = (self.current + change).clamp(MIN_GAS_PRICE, MAX_GAS_PRICE);
        self.set(next.round())
    }

    /// Whether now is a good time to submit
    pub fn is_optimal(&self) -> bool {
        self.current < OPTIMAL_GAS_THRESHOLD
    }

    pub fn trend(&self) -> PriceTrend {
        if self.current > self.previous {
            PriceTrend::Up
        } else if self.current < self.previous {
            PriceTrend::Down
        } else {
            PriceTrend::Stable
        }
    }

    pub fn zone(&self) -> GasZone {
        GasZone::classify(self.current)
    }

    /// Speedometer needle angle in degrees, -90 (empty) to 90 (full scale)
    pub fn needle_rotation(&self, gauge_max: f64) -> f64 {
        let percentage = self.current / gauge_max * 100.0;
        (percentage * 1.8 - 90.0).clamp(-90.0, 90.0)
    }
}

impl Default for GasPriceFeed {
    fn default() -> Self {
        Self::new(crate::INITIAL_GAS_PRICE)
    }
}
