//! Pacing analysis over a finished run
//!
//! Turns the raw action history into per-day statistics, stagnation
//! periods, and a one-screen summary. Everything here is derived; the
//! engine result stays the source of truth.

use serde::Serialize;

use idlepace_engine::{Action, SECONDS_PER_DAY, SimulationResult, format_duration};

/// Rolled-up activity of one simulated day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyStats {
    pub day: u64,
    pub gold_start: f64,
    pub gold_end: f64,
    pub passive_income: f64,
    pub tapping_income: f64,
    pub gold_spent: u64,
    pub upgrades: usize,
    pub level_ups: usize,
    pub xp_end: u64,
    pub keys_end: u64,
    pub user_level_end: u32,
}

/// A run of consecutive days without a single upgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StagnationPeriod {
    pub start_day: u64,
    pub end_day: u64,
}

impl StagnationPeriod {
    #[must_use]
    pub const fn days(self) -> u64 {
        self.end_day - self.start_day + 1
    }
}

/// Headline numbers for the whole run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub duration_secs: u64,
    pub duration_human: String,
    pub days: u64,
    pub stop_reason: String,
    pub final_gold: f64,
    pub final_xp: u64,
    pub final_keys: u64,
    pub final_user_level: u32,
    pub total_upgrades: usize,
    pub total_level_ups: usize,
    pub total_passive_income: f64,
    pub total_tapping_income: f64,
    pub fault_count: usize,
}

/// Full analysis payload handed to the report writers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub summary: RunSummary,
    pub daily: Vec<DailyStats>,
    pub stagnation: Vec<StagnationPeriod>,
}

impl RunReport {
    #[must_use]
    pub fn build(result: &SimulationResult) -> Self {
        let daily = daily_stats(result);
        let stagnation = stagnation_periods(&daily, 2);
        Self {
            summary: summarize(result),
            daily,
            stagnation,
        }
    }
}

/// Fold the day records into per-day statistics. The trailing sealing
/// record only contributes the closing balance of the last day.
#[must_use]
pub fn daily_stats(result: &SimulationResult) -> Vec<DailyStats> {
    let mut stats = Vec::new();

    for pair in result.history.windows(2) {
        let (record, next) = (&pair[0], &pair[1]);
        let mut day = DailyStats {
            day: record.timestamp / SECONDS_PER_DAY,
            gold_start: record.balance.gold,
            gold_end: next.balance.gold,
            passive_income: 0.0,
            tapping_income: 0.0,
            gold_spent: 0,
            upgrades: 0,
            level_ups: 0,
            xp_end: next.balance.xp,
            keys_end: next.balance.keys,
            user_level_end: next.balance.user_level,
        };
        for action in &record.actions {
            match action {
                Action::PassiveIncome { amount, .. } => day.passive_income += amount,
                Action::TappingIncome { amount, .. } => day.tapping_income += amount,
                Action::LocationUpgrade { cost, .. } => {
                    day.gold_spent += cost;
                    day.upgrades += 1;
                }
                Action::LevelUp { .. } => day.level_ups += 1,
            }
        }
        stats.push(day);
    }

    stats
}

/// Find stretches of at least `min_days` consecutive days without an
/// upgrade. These are the pacing dead spots a designer tunes away.
#[must_use]
pub fn stagnation_periods(daily: &[DailyStats], min_days: u64) -> Vec<StagnationPeriod> {
    let mut periods = Vec::new();
    let mut open: Option<u64> = None;

    for day in daily {
        if day.upgrades == 0 {
            open.get_or_insert(day.day);
        } else if let Some(start_day) = open.take() {
            let period = StagnationPeriod {
                start_day,
                end_day: day.day - 1,
            };
            if period.days() >= min_days {
                periods.push(period);
            }
        }
    }
    if let Some(start_day) = open
        && let Some(last) = daily.last()
    {
        let period = StagnationPeriod {
            start_day,
            end_day: last.day,
        };
        if period.days() >= min_days {
            periods.push(period);
        }
    }

    periods
}

#[must_use]
pub fn summarize(result: &SimulationResult) -> RunSummary {
    let mut total_upgrades = 0;
    let mut total_level_ups = 0;
    let mut total_passive_income = 0.0;
    let mut total_tapping_income = 0.0;
    for action in result.actions() {
        match action {
            Action::PassiveIncome { amount, .. } => total_passive_income += amount,
            Action::TappingIncome { amount, .. } => total_tapping_income += amount,
            Action::LocationUpgrade { .. } => total_upgrades += 1,
            Action::LevelUp { .. } => total_level_ups += 1,
        }
    }

    let balance = result.final_balance();
    RunSummary {
        run_id: result.id.to_string(),
        duration_secs: result.timestamp,
        duration_human: format_duration(result.timestamp),
        days: result.timestamp / SECONDS_PER_DAY,
        stop_reason: result.stop_reason.to_string(),
        final_gold: balance.map_or(0.0, |b| b.gold),
        final_xp: balance.map_or(0, |b| b.xp),
        final_keys: balance.map_or(0, |b| b.keys),
        final_user_level: balance.map_or(1, |b| b.user_level),
        total_upgrades,
        total_level_ups,
        total_passive_income,
        total_tapping_income,
        fault_count: result.faults.len(),
    }
}
