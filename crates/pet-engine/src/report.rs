//! Per-tick outcome reporting for the presentation layer.

use pet_core::Pet;
use serde::{Deserialize, Serialize};

/// Notable things that happened during one tick.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TickEvent {
    /// Satiation or happiness bottomed out; the health penalty was applied.
    Neglected,
    /// Both care stats were above the floor; health regenerated.
    Recovered,
    /// The full-health streak broke (nonzero to zero transition).
    StreakReset,
    /// The care reward was paid out.
    RewardPaid {
        /// Coins added to the wallet.
        amount: u32,
    },
}

/// Stats worth diffing across a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatSnapshot {
    /// Health value.
    pub health: i32,
    /// Satiation value.
    pub satiation: i32,
    /// Happiness value.
    pub happiness: i32,
    /// Wallet balance.
    pub money: u32,
}

impl StatSnapshot {
    /// Capture the diffable stats of a pet.
    pub fn of(pet: &Pet) -> Self {
        Self {
            health: pet.health,
            satiation: pet.satiation,
            happiness: pet.happiness,
            money: pet.money,
        }
    }
}

/// What one `advance_time` call did, for rendering a "time passed"
/// summary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    /// Stats before the tick.
    pub before: StatSnapshot,
    /// Stats after the tick.
    pub after: StatSnapshot,
    /// Events emitted by the tick, in order.
    pub events: Vec<TickEvent>,
}

impl TickReport {
    /// Signed health change.
    pub fn health_delta(&self) -> i32 {
        self.after.health - self.before.health
    }

    /// Signed satiation change.
    pub fn satiation_delta(&self) -> i32 {
        self.after.satiation - self.before.satiation
    }

    /// Signed happiness change.
    pub fn happiness_delta(&self) -> i32 {
        self.after.happiness - self.before.happiness
    }

    /// Signed money change.
    pub fn money_delta(&self) -> i64 {
        self.after.money as i64 - self.before.money as i64
    }
}
