//! Run history and result types
//!
//! The history is an append-only sequence of [`StateRecord`]s, one opened
//! per simulated day; actions land in the currently-open record until the
//! next day boundary seals it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use crate::state::{Balance, LocationState};

/// One event applied to the run, tagged for uniform serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Background income accrued since the previous check-in.
    PassiveIncome {
        timestamp: u64,
        elapsed_secs: u64,
        amount: f64,
        gold_before: f64,
        gold_after: f64,
    },
    /// Lump income from the day's tapping sessions.
    TappingIncome {
        timestamp: u64,
        day: u64,
        taps: u64,
        energy_spent: f64,
        amount: f64,
        gold_before: f64,
        gold_after: f64,
    },
    /// A location level-up commit.
    LocationUpgrade {
        timestamp: u64,
        location_id: u32,
        new_level: u32,
        cost: u64,
        reward_xp: u64,
        reward_keys: u64,
        gold_before: f64,
        gold_after: f64,
        xp_before: u64,
        xp_after: u64,
        keys_before: u64,
        keys_after: u64,
    },
    /// A character level-up from the cascade.
    LevelUp {
        timestamp: u64,
        old_level: u32,
        new_level: u32,
        new_earn_per_sec: f64,
        reward_keys: u64,
        xp: u64,
        keys_before: u64,
        keys_after: u64,
    },
}

impl Action {
    #[must_use]
    pub fn timestamp(&self) -> u64 {
        match self {
            Self::PassiveIncome { timestamp, .. }
            | Self::TappingIncome { timestamp, .. }
            | Self::LocationUpgrade { timestamp, .. }
            | Self::LevelUp { timestamp, .. } => *timestamp,
        }
    }
}

/// Per-location view captured in a [`StateRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationSnapshot {
    pub current_level: u32,
    pub available: bool,
    pub cooldown_until: u64,
}

impl From<&LocationState> for LocationSnapshot {
    fn from(loc: &LocationState) -> Self {
        Self {
            current_level: loc.current_level,
            available: loc.available,
            cooldown_until: loc.cooldown_until,
        }
    }
}

/// Snapshot of the run at a day boundary plus the actions that followed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateRecord {
    pub timestamp: u64,
    pub balance: Balance,
    pub locations: BTreeMap<u32, LocationSnapshot>,
    pub actions: Vec<Action>,
}

/// Instant-level failure captured instead of aborting the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fault {
    pub timestamp: u64,
    pub message: String,
}

/// Why the run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum StopReason {
    /// Every location reached its final level.
    CatalogExhausted,
    /// Progress is gated behind a user level the run never reached.
    /// `current_location` is the lowest-id location still available;
    /// `gated_location` is the one whose unlock gate blocks progress
    /// (possibly the same location).
    LevelGateBlocked {
        current_location: u32,
        current_level: u32,
        gated_location: u32,
        required_level: u32,
        user_level: u32,
    },
    /// The run-away guard fired before the catalog was exhausted.
    BoundExceeded { limit: u64 },
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CatalogExhausted => {
                write!(f, "final location reached, location limit exhausted")
            }
            Self::LevelGateBlocked {
                current_location,
                current_level,
                gated_location,
                required_level,
                user_level,
            } => write!(
                f,
                "blocked on level gate: location {gated_location} requires user level \
                 {required_level} (player at level {user_level}); progress halted at \
                 location {current_location} level {current_level}"
            ),
            Self::BoundExceeded { limit } => {
                write!(f, "aborted: exceeded simulated-time bound of {limit}s")
            }
        }
    }
}

/// Immutable outcome of one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub id: Uuid,
    /// Final simulated timestamp in seconds.
    pub timestamp: u64,
    pub history: Vec<StateRecord>,
    pub stop_reason: StopReason,
    /// Instant-level faults collected during the run, oldest first.
    pub faults: Vec<Fault>,
}

impl SimulationResult {
    /// Iterate all actions across the whole history in order.
    pub fn actions(&self) -> impl Iterator<Item = &Action> {
        self.history.iter().flat_map(|state| state.actions.iter())
    }

    /// Balance captured by the last history record.
    #[must_use]
    pub fn final_balance(&self) -> Option<&Balance> {
        self.history.last().map(|state| &state.balance)
    }
}
