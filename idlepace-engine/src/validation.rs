//! Configuration validation
//!
//! The engine trusts its input; `validate` is the gate that earns that
//! trust. It collects every problem instead of stopping at the first so a
//! bad config file can be fixed in one pass.

use thiserror::Error;

use crate::config::SimulationConfig;
use crate::engine::SECONDS_PER_DAY;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("base gold per second must be positive, got {0}")]
    NonPositiveBaseRate(f64),
    #[error("earn coefficient must be positive, got {0}")]
    NonPositiveCoefficient(f64),
    #[error("session duration must be positive")]
    ZeroSessionDuration,
    #[error("location catalog is empty")]
    EmptyCatalog,
    #[error("location {id} has no levels")]
    EmptyLocationLevels { id: u32 },
    #[error("location {id} levels must run contiguously from 1, found gap at {missing}")]
    NonContiguousLocationLevels { id: u32, missing: u32 },
    #[error("location {id} level {level} has zero cost")]
    ZeroUpgradeCost { id: u32, level: u32 },
    #[error("location {id} uses rarity {rarity} with no rarity settings entry")]
    MissingRaritySettings { id: u32, rarity: String },
    #[error("user level table has no entry for level 1")]
    MissingFirstUserLevel,
    #[error("user level table must run contiguously from 1, found gap at {missing}")]
    NonContiguousUserLevels { missing: u32 },
    #[error("user level 1 must require zero xp, got {xp_required}")]
    NonZeroFirstThreshold { xp_required: u64 },
    #[error("user level {level} threshold {xp_required} is below level {prev_level}'s {prev}")]
    DecreasingXpThreshold {
        level: u32,
        xp_required: u64,
        prev_level: u32,
        prev: u64,
    },
    #[error("check schedule is empty")]
    EmptyCheckSchedule,
    #[error("check schedule offset {offset} is outside a day (0..{SECONDS_PER_DAY})")]
    ScheduleOffsetOutOfRange { offset: u32 },
    #[error("no cooldown configured for location level {level}")]
    MissingCooldown { level: u32 },
    #[error("rarity {rarity} requires user level {required}, beyond the table max {max}")]
    UnreachableRarityGate {
        rarity: String,
        required: u32,
        max: u32,
    },
    #[error("tapping enabled with non-positive energy capacity {0}")]
    NonPositiveEnergyCapacity(f64),
    #[error("tapping enabled with non-positive tap speed {0}")]
    NonPositiveTapSpeed(f64),
}

/// Check a configuration against the engine's assumptions. Returns every
/// violation found; an empty error list means the config is safe to run.
pub fn validate(config: &SimulationConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.economy.base_gold_per_sec <= 0.0 {
        errors.push(ConfigError::NonPositiveBaseRate(
            config.economy.base_gold_per_sec,
        ));
    }
    if config.economy.earn_coefficient <= 0.0 {
        errors.push(ConfigError::NonPositiveCoefficient(
            config.economy.earn_coefficient,
        ));
    }
    if config.session_duration_secs == 0 {
        errors.push(ConfigError::ZeroSessionDuration);
    }

    validate_locations(config, &mut errors);
    validate_user_levels(config, &mut errors);
    validate_schedule(config, &mut errors);
    validate_tapping(config, &mut errors);

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

fn validate_locations(config: &SimulationConfig, errors: &mut Vec<ConfigError>) {
    if config.locations.is_empty() {
        errors.push(ConfigError::EmptyCatalog);
    }

    for (&id, loc) in &config.locations {
        if loc.levels.is_empty() {
            errors.push(ConfigError::EmptyLocationLevels { id });
            continue;
        }
        for (expected, (&level, entry)) in (1..).zip(&loc.levels) {
            if level != expected {
                errors.push(ConfigError::NonContiguousLocationLevels {
                    id,
                    missing: expected,
                });
                break;
            }
            if entry.cost == 0 {
                errors.push(ConfigError::ZeroUpgradeCost { id, level });
            }
            // The level table is shared across locations; report each
            // missing cooldown once.
            let missing = ConfigError::MissingCooldown { level };
            if !config.location_cooldowns.contains_key(&level) && !errors.contains(&missing) {
                errors.push(missing);
            }
        }
        if !config.rarity_settings.contains_key(&loc.rarity) {
            errors.push(ConfigError::MissingRaritySettings {
                id,
                rarity: loc.rarity.to_string(),
            });
        }
    }
}

fn validate_user_levels(config: &SimulationConfig, errors: &mut Vec<ConfigError>) {
    let Some(first) = config.user_levels.get(&1) else {
        errors.push(ConfigError::MissingFirstUserLevel);
        return;
    };
    if first.xp_required != 0 {
        errors.push(ConfigError::NonZeroFirstThreshold {
            xp_required: first.xp_required,
        });
    }

    let mut prev: Option<(u32, u64)> = None;
    for (expected, (&level, entry)) in (1..).zip(&config.user_levels) {
        if level != expected {
            errors.push(ConfigError::NonContiguousUserLevels { missing: expected });
            break;
        }
        if let Some((prev_level, prev_xp)) = prev
            && entry.xp_required < prev_xp
        {
            errors.push(ConfigError::DecreasingXpThreshold {
                level,
                xp_required: entry.xp_required,
                prev_level,
                prev: prev_xp,
            });
        }
        prev = Some((level, entry.xp_required));
    }

    let max = config.user_levels.keys().next_back().copied().unwrap_or(1);
    for (&rarity, settings) in &config.rarity_settings {
        if settings.user_level_required > max {
            errors.push(ConfigError::UnreachableRarityGate {
                rarity: rarity.to_string(),
                required: settings.user_level_required,
                max,
            });
        }
    }
}

fn validate_schedule(config: &SimulationConfig, errors: &mut Vec<ConfigError>) {
    if config.check_schedule.is_empty() {
        errors.push(ConfigError::EmptyCheckSchedule);
    }
    #[allow(clippy::cast_possible_truncation)]
    for &offset in &config.check_schedule {
        if u64::from(offset) >= SECONDS_PER_DAY {
            errors.push(ConfigError::ScheduleOffsetOutOfRange { offset });
        }
    }
}

fn validate_tapping(config: &SimulationConfig, errors: &mut Vec<ConfigError>) {
    if !config.tapping.enabled {
        return;
    }
    if config.tapping.max_energy_capacity <= 0.0 {
        errors.push(ConfigError::NonPositiveEnergyCapacity(
            config.tapping.max_energy_capacity,
        ));
    }
    if config.tapping.tap_speed <= 0.0 {
        errors.push(ConfigError::NonPositiveTapSpeed(config.tapping.tap_speed));
    }
}
