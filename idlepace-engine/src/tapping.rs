//! Active-tapping sub-simulator
//!
//! Models the tap-to-earn mini-mechanic: a single energy gauge drains
//! one unit per tap while the player is actively tapping and regenerates
//! slowly between and after sessions. The progression engine draws one
//! lump contribution per day from it; it can also be run standalone over a
//! whole schedule for its own analysis.

use serde::{Deserialize, Serialize};

use crate::config::TappingConfig;

/// Energy regenerated per second; full recovery takes a few hours.
const ENERGY_RECOVERY_RATE: f64 = 0.1;
/// Active-tapping window for low-capacity (beginner) gauges.
const ACTIVE_WINDOW_LOW_SECS: u64 = 300;
/// Active-tapping window for upgraded gauges.
const ACTIVE_WINDOW_HIGH_SECS: u64 = 420;
/// Capacity at or below which the beginner limits apply.
const LOW_CAPACITY_THRESHOLD: f64 = 700.0;

const SECONDS_PER_DAY: u64 = 86_400;

/// One simulated tapping session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TapSession {
    pub start_time: u64,
    pub duration_secs: u64,
    pub energy_used: f64,
    pub taps: f64,
    pub gold_earned: f64,
    /// Per-second gauge readings `(timestamp, energy)` for plotting.
    pub energy_history: Vec<(u64, f64)>,
}

/// Sessions of one calendar day rolled up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TapDay {
    pub day: u64,
    pub sessions: Vec<TapSession>,
    pub total_taps: f64,
    pub total_energy: f64,
    pub total_gold: f64,
}

impl TapDay {
    fn new(day: u64) -> Self {
        Self {
            day,
            sessions: Vec::new(),
            total_taps: 0.0,
            total_energy: 0.0,
            total_gold: 0.0,
        }
    }

    fn absorb(&mut self, session: TapSession) {
        self.total_taps += session.taps;
        self.total_energy += session.energy_used;
        self.total_gold += session.gold_earned;
        self.sessions.push(session);
    }
}

/// Stateful tap simulator carrying the energy gauge across sessions.
#[derive(Debug, Clone)]
pub struct TappingEngine {
    config: TappingConfig,
    current_energy: f64,
    last_session_end: Option<u64>,
}

impl TappingEngine {
    #[must_use]
    pub fn new(config: TappingConfig) -> Self {
        Self {
            config,
            current_energy: config.max_energy_capacity,
            last_session_end: None,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &TappingConfig {
        &self.config
    }

    #[must_use]
    pub const fn current_energy(&self) -> f64 {
        self.current_energy
    }

    /// Simulate a whole schedule of sessions, aggregated per calendar day.
    ///
    /// `session_start_times` are absolute seconds; `session_duration_mins`
    /// is the length of each session in minutes. A disabled configuration
    /// returns an empty list immediately. The gauge is reset to full before
    /// the first session.
    pub fn simulate_sessions(
        &mut self,
        session_start_times: &[u64],
        session_duration_mins: u64,
    ) -> Vec<TapDay> {
        if !self.config.enabled {
            return Vec::new();
        }

        self.current_energy = self.config.max_energy_capacity;
        self.last_session_end = None;

        let mut starts = session_start_times.to_vec();
        starts.sort_unstable();

        let mut days: Vec<TapDay> = Vec::new();
        for start in starts {
            let session = self.run_session(start, session_duration_mins * 60);
            let day = start / SECONDS_PER_DAY;
            // Repeat days append to the existing bucket.
            match days.iter_mut().find(|d| d.day == day) {
                Some(bucket) => bucket.absorb(session),
                None => {
                    let mut bucket = TapDay::new(day);
                    bucket.absorb(session);
                    days.push(bucket);
                }
            }
        }
        days
    }

    /// Simulate one day's sessions without resetting the gauge, for the
    /// progression engine's per-day lump. `session_starts` are absolute
    /// seconds within the same day; duration is in seconds here.
    pub fn simulate_day(
        &mut self,
        day: u64,
        session_starts: &[u64],
        session_duration_secs: u64,
    ) -> TapDay {
        let mut bucket = TapDay::new(day);
        if !self.config.enabled {
            return bucket;
        }
        for &start in session_starts {
            bucket.absorb(self.run_session(start, session_duration_secs));
        }
        bucket
    }

    fn run_session(&mut self, start_time: u64, duration_secs: u64) -> TapSession {
        // Linear regeneration across the gap since the previous session.
        if let Some(last_end) = self.last_session_end {
            let gap = start_time.saturating_sub(last_end);
            #[allow(clippy::cast_precision_loss)]
            self.regenerate(gap as f64 * ENERGY_RECOVERY_RATE);
        }
        self.last_session_end = Some(start_time + duration_secs);

        let mut session = TapSession {
            start_time,
            duration_secs,
            energy_used: 0.0,
            taps: 0.0,
            gold_earned: 0.0,
            energy_history: vec![(start_time, self.current_energy)],
        };

        let low_capacity = self.config.max_energy_capacity <= LOW_CAPACITY_THRESHOLD;
        let active_window = if low_capacity {
            ACTIVE_WINDOW_LOW_SECS
        } else {
            ACTIVE_WINDOW_HIGH_SECS
        };
        // Beginner gauges also cap total taps per session, scaled by
        // capacity into the 500..=700 band.
        let tap_cap = if low_capacity {
            self.config
                .max_energy_capacity
                .min(500.0 + 200.0 * self.config.max_energy_capacity / LOW_CAPACITY_THRESHOLD)
        } else {
            f64::INFINITY
        };

        let mut active = true;
        let mut now = start_time;
        for _ in 0..duration_secs.min(active_window) {
            if active && self.current_energy > 0.0 {
                let remaining_allowed = tap_cap - session.taps;
                let taps = self
                    .config
                    .tap_speed
                    .min(self.current_energy)
                    .min(remaining_allowed);
                if taps <= 0.0 {
                    active = false;
                } else {
                    self.current_energy -= taps;
                    session.energy_used += taps;
                    session.taps += taps;
                    session.gold_earned += taps * self.config.gold_per_tap;
                    if self.current_energy <= 0.0 || session.taps >= tap_cap {
                        active = false;
                    }
                }
            }
            self.regenerate(ENERGY_RECOVERY_RATE);
            now += 1;
            session.energy_history.push((now, self.current_energy));
        }

        // The player stays in the app past the active window; only the
        // gauge recovery is recorded for the rest of the session.
        for _ in active_window..duration_secs {
            self.regenerate(ENERGY_RECOVERY_RATE);
            now += 1;
            session.energy_history.push((now, self.current_energy));
        }

        log::debug!(
            "tap session at {start_time}: taps={:.0} energy={:.0} gold={:.0}",
            session.taps,
            session.energy_used,
            session.gold_earned
        );
        session
    }

    fn regenerate(&mut self, amount: f64) {
        self.current_energy =
            (self.current_energy + amount).min(self.config.max_energy_capacity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled_config(capacity: f64, tap_speed: f64) -> TappingConfig {
        TappingConfig {
            enabled: true,
            max_energy_capacity: capacity,
            tap_speed,
            gold_per_tap: 2.0,
        }
    }

    #[test]
    fn disabled_config_returns_empty() {
        let mut engine = TappingEngine::new(TappingConfig::default());
        let days = engine.simulate_sessions(&[0, 3_600, 90_000], 30);
        assert!(days.is_empty());
    }

    #[test]
    fn single_session_drains_energy_into_gold() {
        let mut engine = TappingEngine::new(enabled_config(600.0, 3.0));
        let days = engine.simulate_sessions(&[0], 30);
        assert_eq!(days.len(), 1);
        let day = &days[0];
        assert_eq!(day.sessions.len(), 1);
        assert!(day.total_taps > 0.0);
        assert!((day.total_gold - day.total_taps * 2.0).abs() < 1e-9);
        // One tap spends one energy unit.
        assert!((day.total_energy - day.total_taps).abs() < 1e-9);
    }

    #[test]
    fn low_capacity_caps_taps_per_session() {
        let mut engine = TappingEngine::new(enabled_config(700.0, 700.0));
        let days = engine.simulate_sessions(&[0], 30);
        // Cap is min(700, 500 + 200 * 700/700) = 700.
        assert!(days[0].total_taps <= 700.0 + 1e-9);

        let mut engine = TappingEngine::new(enabled_config(350.0, 350.0));
        let days = engine.simulate_sessions(&[0], 30);
        // Energy runs out before the 600-tap cap.
        assert!(days[0].total_taps <= 350.0 + 1e-9);
    }

    #[test]
    fn energy_regenerates_between_sessions() {
        let mut engine = TappingEngine::new(enabled_config(600.0, 600.0));
        // First session empties the gauge almost instantly; the second
        // starts an hour later with a partially-recovered gauge.
        let days = engine.simulate_sessions(&[0, 3_600], 5);
        let sessions = &days[0].sessions;
        assert_eq!(sessions.len(), 2);
        assert!(sessions[1].taps > 0.0);
        assert!(sessions[1].taps < sessions[0].taps);
    }

    #[test]
    fn sessions_bucket_by_calendar_day() {
        let mut engine = TappingEngine::new(enabled_config(600.0, 3.0));
        let days = engine.simulate_sessions(&[8 * 3_600, 20 * 3_600, 86_400 + 8 * 3_600], 10);
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].day, 0);
        assert_eq!(days[0].sessions.len(), 2);
        assert_eq!(days[1].day, 1);
    }

    #[test]
    fn zero_duration_session_has_no_taps() {
        let mut engine = TappingEngine::new(enabled_config(600.0, 3.0));
        let days = engine.simulate_sessions(&[0], 0);
        assert_eq!(days.len(), 1);
        assert!((days[0].total_taps).abs() < f64::EPSILON);
    }

    #[test]
    fn energy_history_covers_whole_session() {
        let mut engine = TappingEngine::new(enabled_config(600.0, 3.0));
        let days = engine.simulate_sessions(&[100], 10);
        let session = &days[0].sessions[0];
        // Initial reading plus one per second.
        assert_eq!(session.energy_history.len(), 601);
        assert_eq!(session.energy_history[0].0, 100);
        assert_eq!(session.energy_history.last().unwrap().0, 700);
    }

    #[test]
    fn simulate_day_keeps_gauge_across_calls() {
        let mut engine = TappingEngine::new(enabled_config(600.0, 600.0));
        let first = engine.simulate_day(0, &[8 * 3_600], 300);
        assert!(first.total_taps > 0.0);
        let second = engine.simulate_day(1, &[86_400 + 8 * 3_600], 300);
        // Overnight regeneration refills the gauge, but it starts from the
        // drained state rather than resetting to full.
        assert!(second.total_taps > 0.0);
        assert_eq!(second.day, 1);
    }
}
