//! Race Animator
//!
//! Cars move along a wrapping 0-100 track every animation tick. Only the
//! local user's car, once its transaction is submitted, is tied to the gas
//! price; everyone else gets cosmetic jitter. The track never finishes.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::participant::Participant;

/// Track length in percent
pub const TRACK_LENGTH: f64 = 100.0;

/// Color of the local user's car
pub const USER_CAR_COLOR: &str = "#FF5733";

/// Lane colors for everyone else
pub const LANE_COLORS: [&str; 6] = [
    "#33FF57", "#3357FF", "#F3FF33", "#FF33F3", "#33FFF3", "#F3FF33",
];

/// Cosmetic speed jitter range for cars not driven by gas price
const JITTER_MIN: f64 = 0.8;
const JITTER_MAX: f64 = 1.2;

/// Animated car for one participant
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceCar {
    pub id: String,
    /// Percent along the track, in `[0, 100)`
    pub position: f64,
    pub speed: f64,
    pub color: String,
    pub is_user: bool,
    pub wallet_address: String,
}

/// Speed multiplier for a car this tick
pub fn speed_multiplier<R: Rng>(
    is_user: bool,
    user_submitted: bool,
    gas_price: f64,
    rng: &mut R,
) -> f64 {
    if is_user && user_submitted {
        100.0 / (gas_price + 10.0)
    } else {
        rng.gen_range(JITTER_MIN..JITTER_MAX)
    }
}

/// Next position on the wrapping track
pub fn advance_position(position: f64, speed: f64, multiplier: f64) -> f64 {
    let next = (position + speed * multiplier).rem_euclid(TRACK_LENGTH);
    // rem_euclid can round up to the modulus for tiny negative inputs
    if next >= TRACK_LENGTH {
        0.0
    } else {
        next
    }
}

/// All cars on the track
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RaceTrack {
    pub cars: Vec<RaceCar>,
}

impl RaceTrack {
    /// One lane per participant, in roster order
    pub fn from_participants(participants: &[Participant]) -> Self {
        let cars = participants
            .iter()
            .enumerate()
            .map(|(lane, participant)| {
                let start = if participant.transaction_submitted {
                    participant.position as f64 * 20.0
                } else {
                    lane as f64 * 25.0 + 10.0
                };
                let color = if participant.is_current_user {
                    USER_CAR_COLOR
                } else {
                    LANE_COLORS[lane % LANE_COLORS.len()]
                };

                RaceCar {
                    id: participant.id.clone(),
                    position: start.rem_euclid(TRACK_LENGTH),
                    speed: 5.0 - lane as f64,
                    color: color.to_string(),
                    is_user: participant.is_current_user,
                    wallet_address: participant.address.clone(),
                }
            })
            .collect();

        Self { cars }
    }

    /// Advance every car by one animation tick
    pub fn step<R: Rng>(&mut self, gas_price: f64, user_submitted: bool, rng: &mut R) {
        for car in &mut self.cars {
            let multiplier = speed_multiplier(car.is_user, user_submitted, gas_price, rng);
            car.position = advance_position(car.position, car.speed, multiplier);
        }
    }

    pub fn user_car(&self) -> Option<&RaceCar> {
        self.cars.iter().find(|car| car.is_user)
    }
}
