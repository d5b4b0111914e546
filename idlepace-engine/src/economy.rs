//! Economy math helpers
//!
//! Pure functions shared by the sample configuration, the engine, and the
//! CLI's analysis layer.

use std::collections::BTreeMap;

use crate::config::UserLevelConfig;

/// Passive income rate for `level`.
///
/// Level 1 earns `base`; every following level multiplies the previous
/// rate by `coefficient^(level - 1)`, i.e. the rate for level *L* is
/// `base * coefficient^(L * (L - 1) / 2)`.
#[must_use]
pub fn gold_per_sec(base: f64, coefficient: f64, level: u32) -> f64 {
    let mut rate = base;
    for step in 1..level {
        rate *= coefficient.powi(step as i32);
    }
    rate
}

/// Build a user-level table from `(xp_required, keys_reward)` rows,
/// deriving each level's income from the economy parameters. Rows are
/// assigned to levels 1..=N in order.
#[must_use]
pub fn build_user_levels(
    base: f64,
    coefficient: f64,
    rows: &[(u64, u64)],
) -> BTreeMap<u32, UserLevelConfig> {
    rows.iter()
        .enumerate()
        .map(|(idx, &(xp_required, keys_reward))| {
            #[allow(clippy::cast_possible_truncation)]
            let level = idx as u32 + 1;
            (
                level,
                UserLevelConfig {
                    xp_required,
                    gold_per_sec: gold_per_sec(base, coefficient, level),
                    keys_reward,
                },
            )
        })
        .collect()
}

/// Human-readable duration for logs and CLI summaries, e.g. `3d 4h 25m`.
#[must_use]
pub fn format_duration(secs: u64) -> String {
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3_600;
    let minutes = (secs % 3_600) / 60;
    let seconds = secs % 60;

    if days > 0 {
        format!("{days}d {hours}h {minutes}m")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

/// Seconds until an upgrade pays for itself, or `None` when the income
/// delta never recoups the cost.
#[must_use]
pub fn payback_secs(cost: f64, income_increase: f64) -> Option<u64> {
    if cost <= 0.0 || income_increase <= 0.0 {
        return None;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Some((cost / income_increase).ceil() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_one_earns_base() {
        let rate = gold_per_sec(0.56, 1.091, 1);
        assert!((rate - 0.56).abs() < f64::EPSILON);
    }

    #[test]
    fn growth_compounds_by_level() {
        let base = 0.56;
        let coef = 1.091;
        let l2 = gold_per_sec(base, coef, 2);
        let l3 = gold_per_sec(base, coef, 3);
        assert!((l2 - base * coef).abs() < 1e-12);
        assert!((l3 - base * coef * coef.powi(2)).abs() < 1e-12);
    }

    #[test]
    fn build_user_levels_assigns_sequential_levels() {
        let table = build_user_levels(0.56, 1.091, &[(0, 0), (100, 5), (300, 10)]);
        assert_eq!(table.len(), 3);
        assert_eq!(table[&2].xp_required, 100);
        assert_eq!(table[&3].keys_reward, 10);
        assert!(table[&3].gold_per_sec > table[&2].gold_per_sec);
    }

    #[test]
    fn format_duration_picks_leading_unit() {
        assert_eq!(format_duration(42), "42s");
        assert_eq!(format_duration(125), "2m 5s");
        assert_eq!(format_duration(3_700), "1h 1m");
        assert_eq!(format_duration(90_000), "1d 1h 0m");
    }

    #[test]
    fn payback_handles_degenerate_inputs() {
        assert_eq!(payback_secs(100.0, 0.0), None);
        assert_eq!(payback_secs(0.0, 1.0), None);
        assert_eq!(payback_secs(100.0, 3.0), Some(34));
    }
}
