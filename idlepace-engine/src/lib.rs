//! Idlepace Engine
//!
//! Deterministic progression-economy simulator for idle/incremental games.
//! Given configured costs, cooldowns, rewards, and a player check-in
//! schedule, it simulates how a virtual player accumulates gold, experience,
//! and character levels while unlocking and upgrading locations, and records
//! a time-stamped action-by-action history for pacing analysis.

pub mod config;
pub mod economy;
pub mod engine;
pub mod history;
pub mod state;
pub mod tapping;
pub mod validation;

// Re-export commonly used types
pub use config::{
    EconomyConfig, LocationConfig, LocationLevel, Rarity, RarityConfig, SimulationConfig,
    StartingBalance, TappingConfig, UpgradePolicy, UserLevelConfig,
};
pub use economy::{format_duration, gold_per_sec, payback_secs};
pub use engine::{DEFAULT_MAX_TIMESTAMP, ProgressionEngine, SECONDS_PER_DAY};
pub use history::{
    Action, Fault, LocationSnapshot, SimulationResult, StateRecord, StopReason,
};
pub use state::{Balance, LocationState, SimulationState};
pub use tapping::{TapDay, TapSession, TappingEngine};
pub use validation::{ConfigError, validate};
