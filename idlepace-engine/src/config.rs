//! Simulation configuration model
//!
//! A fully-resolved `SimulationConfig` is the single input to the
//! progression engine. Validation lives in [`crate::validation`]; the
//! engine itself assumes a valid configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::economy::gold_per_sec;

/// Seconds of player activity available to the upgrade loop per check-in.
pub const DEFAULT_SESSION_DURATION_SECS: u64 = 1_800;

/// Global economy parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EconomyConfig {
    /// Passive income at user level 1, in gold per second.
    pub base_gold_per_sec: f64,
    /// Growth coefficient applied per level (see [`gold_per_sec`]).
    pub earn_coefficient: f64,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            base_gold_per_sec: 0.56,
            earn_coefficient: 1.091,
        }
    }
}

/// Balances the simulated player starts the run with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct StartingBalance {
    pub gold: f64,
    pub xp: u64,
    pub keys: u64,
}

/// Cost and reward of a single location level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationLevel {
    pub cost: u64,
    pub xp_reward: u64,
}

/// Location rarity tier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    #[default]
    Common,
    Rare,
    Epic,
    Legendary,
}

impl Rarity {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Common => "common",
            Self::Rare => "rare",
            Self::Epic => "epic",
            Self::Legendary => "legendary",
        }
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unlock gate and final-level key payout shared by all locations of a rarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RarityConfig {
    pub user_level_required: u32,
    pub keys_reward: u64,
}

/// Static definition of one location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationConfig {
    pub rarity: Rarity,
    /// Ordered level table; keys must run contiguously from 1.
    pub levels: BTreeMap<u32, LocationLevel>,
}

/// One row of the user-level table.
///
/// `xp_required` on entry *L* is the threshold to reach level *L* from
/// *L - 1*; entry 1 is therefore zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UserLevelConfig {
    pub xp_required: u64,
    pub gold_per_sec: f64,
    pub keys_reward: u64,
}

/// Rule selecting which eligible location is upgraded next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UpgradePolicy {
    /// Strict unlock order: a location may only be upgraded once every
    /// lower-id location has been fully maxed.
    #[default]
    Sequential,
    /// Upgrade the first ready location that passes the gates, one commit
    /// per pass.
    FirstAvailable,
}

impl UpgradePolicy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::FirstAvailable => "first_available",
        }
    }
}

impl fmt::Display for UpgradePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Active-tapping mini-mechanic parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TappingConfig {
    pub enabled: bool,
    /// Energy gauge capacity; one tap consumes one unit.
    pub max_energy_capacity: f64,
    /// Taps per second while actively tapping.
    pub tap_speed: f64,
    /// Gold credited per tap.
    pub gold_per_tap: f64,
}

impl Default for TappingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_energy_capacity: 700.0,
            tap_speed: 3.0,
            gold_per_tap: 1.0,
        }
    }
}

/// Fully-resolved input to [`crate::ProgressionEngine`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub economy: EconomyConfig,
    pub starting_balance: StartingBalance,
    /// Location catalog keyed by location id.
    pub locations: BTreeMap<u32, LocationConfig>,
    /// Cooldown in seconds keyed by the level an upgrade reaches, shared
    /// across all locations.
    pub location_cooldowns: BTreeMap<u32, u64>,
    pub rarity_settings: BTreeMap<Rarity, RarityConfig>,
    pub user_levels: BTreeMap<u32, UserLevelConfig>,
    /// Second-of-day offsets (0..86400) at which the player logs in.
    pub check_schedule: Vec<u32>,
    pub session_duration_secs: u64,
    pub policy: UpgradePolicy,
    pub tapping: TappingConfig,
    /// Hard cap on simulated time; `None` uses the engine default.
    pub max_timestamp: Option<u64>,
}

impl SimulationConfig {
    /// Sample configuration mirroring the reference game tuning: 30
    /// locations over a shared 10-level table, 10 user levels, and five
    /// daily check-ins.
    #[must_use]
    pub fn sample() -> Self {
        let economy = EconomyConfig::default();

        let location_levels: BTreeMap<u32, LocationLevel> = [
            (1, 100, 10),
            (2, 300, 30),
            (3, 600, 60),
            (4, 1_200, 120),
            (5, 2_400, 240),
            (6, 4_800, 480),
            (7, 9_600, 960),
            (8, 19_200, 1_920),
            (9, 38_400, 3_840),
            (10, 76_800, 7_680),
        ]
        .into_iter()
        .map(|(level, cost, xp_reward)| (level, LocationLevel { cost, xp_reward }))
        .collect();

        let rarity_settings: BTreeMap<Rarity, RarityConfig> = [
            (Rarity::Common, 1, 1),
            (Rarity::Rare, 2, 2),
            (Rarity::Epic, 3, 3),
            (Rarity::Legendary, 4, 5),
        ]
        .into_iter()
        .map(|(rarity, user_level_required, keys_reward)| {
            (
                rarity,
                RarityConfig {
                    user_level_required,
                    keys_reward,
                },
            )
        })
        .collect();

        let locations: BTreeMap<u32, LocationConfig> = (1..=30)
            .map(|id| {
                let rarity = match id {
                    1..=16 => Rarity::Common,
                    17..=25 => Rarity::Rare,
                    _ => Rarity::Legendary,
                };
                (
                    id,
                    LocationConfig {
                        rarity,
                        levels: location_levels.clone(),
                    },
                )
            })
            .collect();

        let location_cooldowns: BTreeMap<u32, u64> = [
            (1, 10),
            (2, 20),
            (3, 20),
            (4, 30),
            (5, 45),
            (6, 60),
            (7, 90),
            (8, 150),
            (9, 210),
            (10, 300),
            (11, 450),
            (12, 600),
            (13, 900),
            (14, 1_200),
            (15, 1_800),
            (16, 2_700),
            (17, 3_600),
            (18, 5_400),
            (19, 7_200),
            (20, 14_400),
        ]
        .into_iter()
        .collect();

        let user_levels = crate::economy::build_user_levels(
            economy.base_gold_per_sec,
            economy.earn_coefficient,
            &[
                (0, 0),
                (100, 5),
                (300, 10),
                (900, 15),
                (2_700, 25),
                (8_100, 35),
                (24_300, 45),
                (72_900, 55),
                (218_700, 65),
                (656_100, 75),
            ],
        );

        Self {
            economy,
            starting_balance: StartingBalance {
                gold: 1_000.0,
                xp: 1,
                keys: 1,
            },
            locations,
            location_cooldowns,
            rarity_settings,
            user_levels,
            check_schedule: vec![8 * 3_600, 12 * 3_600, 16 * 3_600, 20 * 3_600, 22 * 3_600],
            session_duration_secs: DEFAULT_SESSION_DURATION_SECS,
            policy: UpgradePolicy::Sequential,
            tapping: TappingConfig::default(),
            max_timestamp: None,
        }
    }

    /// Scale every cooldown by `multiplier`, rounding to whole seconds.
    pub fn scale_cooldowns(&mut self, multiplier: f64) {
        for cooldown in self.location_cooldowns.values_mut() {
            #[allow(clippy::cast_precision_loss, clippy::cast_sign_loss)]
            #[allow(clippy::cast_possible_truncation)]
            {
                *cooldown = (*cooldown as f64 * multiplier).round().max(0.0) as u64;
            }
        }
    }

    /// Replace the check schedule with `per_day` logins spread evenly
    /// across the active hours 08:00–22:00. A single login lands mid-day.
    pub fn spread_checks(&mut self, per_day: usize) {
        const START: u32 = 8 * 3_600;
        const ACTIVE: u32 = 14 * 3_600;

        if per_day == 0 {
            return;
        }
        if per_day == 1 {
            self.check_schedule = vec![START + ACTIVE / 2];
            return;
        }
        #[allow(clippy::cast_possible_truncation)]
        let interval = ACTIVE / (per_day as u32 - 1);
        self.check_schedule = (0..per_day as u32).map(|i| START + i * interval).collect();
    }

    /// Rebuild `gold_per_sec` for every user level from the economy
    /// parameters, keeping xp thresholds and key rewards.
    pub fn rederive_user_income(&mut self) {
        for (level, cfg) in &mut self.user_levels {
            cfg.gold_per_sec = gold_per_sec(
                self.economy.base_gold_per_sec,
                self.economy.earn_coefficient,
                *level,
            );
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::sample()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_config_shape() {
        let cfg = SimulationConfig::sample();
        assert_eq!(cfg.locations.len(), 30);
        assert_eq!(cfg.locations[&1].rarity, Rarity::Common);
        assert_eq!(cfg.locations[&17].rarity, Rarity::Rare);
        assert_eq!(cfg.locations[&30].rarity, Rarity::Legendary);
        assert_eq!(cfg.location_cooldowns.len(), 20);
        assert_eq!(cfg.user_levels.len(), 10);
        assert_eq!(cfg.check_schedule.len(), 5);
        assert_eq!(cfg.user_levels[&1].xp_required, 0);
        assert_eq!(cfg.user_levels[&2].xp_required, 100);
    }

    #[test]
    fn scale_cooldowns_rounds_whole_seconds() {
        let mut cfg = SimulationConfig::sample();
        cfg.scale_cooldowns(1.5);
        assert_eq!(cfg.location_cooldowns[&1], 15);
        assert_eq!(cfg.location_cooldowns[&2], 30);
        assert_eq!(cfg.location_cooldowns[&20], 21_600);
    }

    #[test]
    fn spread_checks_single_login_is_midday() {
        let mut cfg = SimulationConfig::sample();
        cfg.spread_checks(1);
        assert_eq!(cfg.check_schedule, vec![15 * 3_600]);
    }

    #[test]
    fn spread_checks_covers_active_window() {
        let mut cfg = SimulationConfig::sample();
        cfg.spread_checks(3);
        assert_eq!(cfg.check_schedule, vec![8 * 3_600, 15 * 3_600, 22 * 3_600]);
    }

    #[test]
    fn config_roundtrips_through_json() {
        let cfg = SimulationConfig::sample();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: SimulationConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg, back);
    }

    #[test]
    fn policy_serializes_snake_case() {
        let json = serde_json::to_string(&UpgradePolicy::FirstAvailable).unwrap();
        assert_eq!(json, "\"first_available\"");
        assert_eq!(UpgradePolicy::Sequential.to_string(), "sequential");
    }
}
