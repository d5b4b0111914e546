//! Mutable simulation state
//!
//! One [`SimulationState`] value is built from the configuration at the
//! start of every `simulate` call and threaded through the engine; nothing
//! here outlives the run.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::config::{LocationLevel, Rarity, SimulationConfig};
use crate::tapping::TappingEngine;

/// The player's running balances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub gold: f64,
    pub xp: u64,
    pub keys: u64,
    pub user_level: u32,
    /// Passive income rate, derived from `user_level` via the level table.
    pub earn_per_sec: f64,
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "gold={:.2} xp={} keys={} level={} earn/s={:.2}",
            self.gold, self.xp, self.keys, self.user_level, self.earn_per_sec
        )
    }
}

/// Live state of one location in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationState {
    pub rarity: Rarity,
    pub min_user_level: u32,
    pub levels: BTreeMap<u32, LocationLevel>,
    /// Keys paid out once, on the final level-up.
    pub final_keys_reward: u64,
    /// 0 until the first upgrade lands.
    pub current_level: u32,
    /// Flips to false permanently once `current_level` hits the table max.
    pub available: bool,
    /// Absolute simulated-time instant before which no upgrade may land.
    pub cooldown_until: u64,
}

impl LocationState {
    /// Highest configured level.
    #[must_use]
    pub fn max_level(&self) -> u32 {
        self.levels.keys().next_back().copied().unwrap_or(0)
    }

    #[must_use]
    pub fn is_last_upgrade(&self) -> bool {
        self.current_level + 1 == self.max_level()
    }

    fn next_level(&self) -> Option<&LocationLevel> {
        self.levels.get(&(self.current_level + 1))
    }

    /// Cost of the next upgrade; zero once the table is exhausted.
    #[must_use]
    pub fn upgrade_cost(&self) -> u64 {
        self.next_level().map_or(0, |l| l.cost)
    }

    #[must_use]
    pub fn upgrade_xp_reward(&self) -> u64 {
        self.next_level().map_or(0, |l| l.xp_reward)
    }

    /// Key payout for the next upgrade: the rarity reward on the final
    /// level, nothing otherwise.
    #[must_use]
    pub fn upgrade_keys_reward(&self) -> u64 {
        if self.is_last_upgrade() {
            self.final_keys_reward
        } else {
            0
        }
    }
}

/// Everything the progression loop mutates, owned by the simulate call.
#[derive(Debug, Clone)]
pub struct SimulationState {
    pub balance: Balance,
    pub locations: BTreeMap<u32, LocationState>,
    pub cooldowns: BTreeMap<u32, u64>,
    pub user_levels: BTreeMap<u32, crate::config::UserLevelConfig>,
    /// Second-of-day check-in offsets, deduplicated and ordered.
    pub check_schedule: BTreeSet<u32>,
    /// Tapping gauge carried across days; `None` when tapping is disabled.
    pub tapping: Option<TappingEngine>,
    /// Timestamp of the previous check-in, once one has happened.
    pub last_check_in: Option<u64>,
    /// Day index of the last tapping lump, to pay out once per day.
    pub last_tapping_day: Option<u64>,
}

impl SimulationState {
    /// Build fresh run state from a validated configuration.
    #[must_use]
    pub fn from_config(config: &SimulationConfig) -> Self {
        let locations = config
            .locations
            .iter()
            .map(|(&id, loc)| {
                let rarity_cfg = config.rarity_settings.get(&loc.rarity);
                (
                    id,
                    LocationState {
                        rarity: loc.rarity,
                        min_user_level: rarity_cfg.map_or(1, |r| r.user_level_required),
                        levels: loc.levels.clone(),
                        final_keys_reward: rarity_cfg.map_or(0, |r| r.keys_reward),
                        current_level: 0,
                        available: true,
                        cooldown_until: 0,
                    },
                )
            })
            .collect();

        let start = config.starting_balance;
        let user_level = 1;
        let earn_per_sec = config
            .user_levels
            .get(&user_level)
            .map_or(config.economy.base_gold_per_sec, |l| l.gold_per_sec);

        Self {
            balance: Balance {
                gold: start.gold,
                xp: start.xp,
                keys: start.keys,
                user_level,
                earn_per_sec,
            },
            locations,
            cooldowns: config.location_cooldowns.clone(),
            user_levels: config.user_levels.clone(),
            check_schedule: config.check_schedule.iter().copied().collect(),
            tapping: config
                .tapping
                .enabled
                .then(|| TappingEngine::new(config.tapping)),
            last_check_in: None,
            last_tapping_day: None,
        }
    }

    /// True while at least one location can still be upgraded.
    #[must_use]
    pub fn any_available(&self) -> bool {
        self.locations.values().any(|loc| loc.available)
    }

    /// Highest level in the user table.
    #[must_use]
    pub fn max_user_level(&self) -> u32 {
        self.user_levels.keys().next_back().copied().unwrap_or(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;

    #[test]
    fn from_config_seeds_balances_and_income() {
        let cfg = SimulationConfig::sample();
        let state = SimulationState::from_config(&cfg);
        assert!((state.balance.gold - 1_000.0).abs() < f64::EPSILON);
        assert_eq!(state.balance.user_level, 1);
        assert!((state.balance.earn_per_sec - cfg.user_levels[&1].gold_per_sec).abs() < 1e-12);
        assert_eq!(state.locations.len(), 30);
        assert!(state.any_available());
        assert!(state.tapping.is_none());
    }

    #[test]
    fn rarity_settings_gate_locations() {
        let cfg = SimulationConfig::sample();
        let state = SimulationState::from_config(&cfg);
        assert_eq!(state.locations[&1].min_user_level, 1);
        assert_eq!(state.locations[&17].min_user_level, 2);
        assert_eq!(state.locations[&30].min_user_level, 4);
        assert_eq!(state.locations[&30].final_keys_reward, 5);
    }

    #[test]
    fn location_reward_helpers_track_level_table() {
        let cfg = SimulationConfig::sample();
        let mut loc = SimulationState::from_config(&cfg).locations[&1].clone();
        assert_eq!(loc.max_level(), 10);
        assert_eq!(loc.upgrade_cost(), 100);
        assert_eq!(loc.upgrade_xp_reward(), 10);
        assert_eq!(loc.upgrade_keys_reward(), 0);

        loc.current_level = 9;
        assert!(loc.is_last_upgrade());
        assert_eq!(loc.upgrade_cost(), 76_800);
        assert_eq!(loc.upgrade_keys_reward(), 1);

        loc.current_level = 10;
        assert_eq!(loc.upgrade_cost(), 0);
        assert_eq!(loc.upgrade_keys_reward(), 0);
    }
}
