//! The progression engine
//!
//! A time-driven state machine over a second-resolution clock. Logic fires
//! only at configured check-in instants; each check-in runs a
//! session-bounded burst of upgrade attempts with passive-income accrual,
//! an optional tapping lump, level-up cascades, and idle time-skipping
//! while the session waits on cooldowns.

use smallvec::SmallVec;
use thiserror::Error;
use uuid::Uuid;

use crate::config::{SimulationConfig, UpgradePolicy};
use crate::economy::format_duration;
use crate::history::{Action, Fault, SimulationResult, StateRecord, StopReason};
use crate::state::SimulationState;

pub const SECONDS_PER_DAY: u64 = 86_400;

/// Run-away guard when the configuration does not set `max_timestamp`:
/// ten simulated years.
pub const DEFAULT_MAX_TIMESTAMP: u64 = 10 * 365 * SECONDS_PER_DAY;

/// Inline capacity covers the ready set of a typical check-in.
type ReadySet = SmallVec<[u32; 8]>;

/// Instant-level failures. These degrade the history instead of aborting
/// the run: `simulate` records them as [`Fault`]s and moves to the next
/// timestamp.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("no cooldown configured for location level {level}")]
    MissingCooldown { level: u32 },
    #[error("no user level table entry for level {level}")]
    MissingUserLevel { level: u32 },
    #[error("location {id} disappeared from the catalog")]
    UnknownLocation { id: u32 },
}

/// Deterministic progression simulator. Owns a validated configuration;
/// each `simulate` call builds fresh state, so one engine value can only
/// run once.
#[derive(Debug, Clone)]
pub struct ProgressionEngine {
    config: SimulationConfig,
}

impl ProgressionEngine {
    #[must_use]
    pub fn new(config: SimulationConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Run the simulation under a freshly generated run id.
    #[must_use]
    pub fn simulate(self) -> SimulationResult {
        self.simulate_with_id(Uuid::new_v4())
    }

    /// Run the simulation under a caller-chosen run id. Identical
    /// configuration and id always produce an identical result.
    #[must_use]
    pub fn simulate_with_id(self, id: Uuid) -> SimulationResult {
        let limit = self.config.max_timestamp.unwrap_or(DEFAULT_MAX_TIMESTAMP);
        let mut state = SimulationState::from_config(&self.config);
        let mut history: Vec<StateRecord> = Vec::new();
        let mut faults: Vec<Fault> = Vec::new();
        let mut t: u64 = 0;
        let mut bound_hit = false;

        log::info!("starting simulation {id} ({} policy)", self.config.policy);

        while state.any_available() {
            if t > limit {
                bound_hit = true;
                break;
            }

            if t % SECONDS_PER_DAY == 0 {
                history.push(snapshot(t, &state));
            }

            if let Err(err) = self.process_instant(&mut t, &mut state, &mut history) {
                log::warn!("fault at t={t}: {err}");
                faults.push(Fault {
                    timestamp: t,
                    message: err.to_string(),
                });
            }

            t += 1;
        }

        // Seal the history with the terminal state.
        if history.last().is_none_or(|record| record.timestamp != t) {
            history.push(snapshot(t, &state));
        }

        let stop_reason = diagnose_stop(&state, bound_hit, limit);
        log::info!(
            "finished simulation {id} after {} ({}); {}",
            format_duration(t),
            stop_reason,
            state.balance
        );

        SimulationResult {
            id,
            timestamp: t,
            history,
            stop_reason,
            faults,
        }
    }

    /// Advance one timestamp. Runs a session burst when `t` lands on a
    /// check-in instant; idle seconds pass untouched. The burst may move
    /// `t` forward via the cooldown fast-forward.
    fn process_instant(
        &self,
        t: &mut u64,
        state: &mut SimulationState,
        history: &mut Vec<StateRecord>,
    ) -> Result<(), EngineError> {
        #[allow(clippy::cast_possible_truncation)]
        let offset = (*t % SECONDS_PER_DAY) as u32;
        if !state.check_schedule.contains(&offset) {
            return Ok(());
        }
        self.run_session(t, state, history)
    }

    fn run_session(
        &self,
        t: &mut u64,
        state: &mut SimulationState,
        history: &mut Vec<StateRecord>,
    ) -> Result<(), EngineError> {
        let burst_start = *t;

        self.accrue_passive_income(burst_start, state, history);
        self.apply_tapping_lump(burst_start, state, history);

        let session_end = burst_start + self.config.session_duration_secs;
        while *t < session_end {
            let ready = ready_set(state, *t);
            if ready.is_empty() {
                if !fast_forward(state, t, session_end, history) {
                    break;
                }
                continue;
            }

            let committed = match self.config.policy {
                UpgradePolicy::Sequential => self.sequential_pass(*t, state, history, &ready)?,
                UpgradePolicy::FirstAvailable => {
                    self.first_available_pass(*t, state, history, &ready)?
                }
            };

            // A full pass without a commit means nothing is affordable or
            // unlocked right now; waiting within the session is the only
            // remaining option.
            if committed == 0 && !fast_forward(state, t, session_end, history) {
                break;
            }
        }

        if *t < session_end {
            log::debug!(
                "session at {burst_start} closed early with {}s slack",
                session_end - *t
            );
        }
        Ok(())
    }

    /// Step 1 of a session burst: background income for the time since the
    /// previous check-in. The very first check-in of the run starts the
    /// clock instead of paying out a backlog.
    fn accrue_passive_income(
        &self,
        now: u64,
        state: &mut SimulationState,
        history: &mut Vec<StateRecord>,
    ) {
        let previous = state.last_check_in.replace(now);
        let Some(previous) = previous else {
            return;
        };
        let elapsed = now - previous;
        if elapsed == 0 {
            return;
        }

        #[allow(clippy::cast_precision_loss)]
        let amount = state.balance.earn_per_sec * elapsed as f64;
        let gold_before = state.balance.gold;
        state.balance.gold += amount;

        push_action(
            history,
            Action::PassiveIncome {
                timestamp: now,
                elapsed_secs: elapsed,
                amount,
                gold_before,
                gold_after: state.balance.gold,
            },
        );
    }

    /// Step 2: one tapping lump on the first check-in of each day.
    fn apply_tapping_lump(
        &self,
        now: u64,
        state: &mut SimulationState,
        history: &mut Vec<StateRecord>,
    ) {
        let day = now / SECONDS_PER_DAY;
        if state.tapping.is_none() || state.last_tapping_day == Some(day) {
            return;
        }
        state.last_tapping_day = Some(day);

        let starts: Vec<u64> = state
            .check_schedule
            .iter()
            .map(|&offset| day * SECONDS_PER_DAY + u64::from(offset))
            .collect();
        let Some(tapper) = state.tapping.as_mut() else {
            return;
        };
        let tap_day = tapper.simulate_day(day, &starts, self.config.session_duration_secs);
        if tap_day.total_gold <= 0.0 {
            return;
        }

        let gold_before = state.balance.gold;
        state.balance.gold += tap_day.total_gold;

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        push_action(
            history,
            Action::TappingIncome {
                timestamp: now,
                day,
                taps: tap_day.total_taps.round() as u64,
                energy_spent: tap_day.total_energy,
                amount: tap_day.total_gold,
                gold_before,
                gold_after: state.balance.gold,
            },
        );
    }

    /// Sequential policy: ascending by id, and only while no lower-id
    /// location is still available. Several commits may land in one pass
    /// when maxing a location unblocks the next.
    fn sequential_pass(
        &self,
        t: u64,
        state: &mut SimulationState,
        history: &mut Vec<StateRecord>,
        ready: &[u32],
    ) -> Result<usize, EngineError> {
        let mut commits = 0;
        for &id in ready {
            let earlier_open = state
                .locations
                .range(..id)
                .any(|(_, loc)| loc.available);
            if earlier_open {
                continue;
            }
            if self.commit_upgrade(t, state, history, id)? {
                commits += 1;
            }
        }
        Ok(commits)
    }

    /// First-available policy: the first ready location that passes the
    /// gates commits, one commit per pass.
    fn first_available_pass(
        &self,
        t: u64,
        state: &mut SimulationState,
        history: &mut Vec<StateRecord>,
        ready: &[u32],
    ) -> Result<usize, EngineError> {
        for &id in ready {
            if self.commit_upgrade(t, state, history, id)? {
                return Ok(1);
            }
        }
        Ok(0)
    }

    /// Attempt one upgrade. Returns `Ok(false)` when the level gate or the
    /// gold balance rejects it; mutates state and records the action (plus
    /// any level-up cascade) on success.
    fn commit_upgrade(
        &self,
        t: u64,
        state: &mut SimulationState,
        history: &mut Vec<StateRecord>,
        id: u32,
    ) -> Result<bool, EngineError> {
        let loc = state
            .locations
            .get(&id)
            .ok_or(EngineError::UnknownLocation { id })?;

        if state.balance.user_level < loc.min_user_level {
            return Ok(false);
        }
        let cost = loc.upgrade_cost();
        #[allow(clippy::cast_precision_loss)]
        if state.balance.gold < cost as f64 {
            return Ok(false);
        }

        let new_level = loc.current_level + 1;
        let reward_xp = loc.upgrade_xp_reward();
        let reward_keys = loc.upgrade_keys_reward();
        let max_level = loc.max_level();
        let cooldown = *state
            .cooldowns
            .get(&new_level)
            .ok_or(EngineError::MissingCooldown { level: new_level })?;

        let gold_before = state.balance.gold;
        let xp_before = state.balance.xp;
        let keys_before = state.balance.keys;

        #[allow(clippy::cast_precision_loss)]
        {
            state.balance.gold -= cost as f64;
        }
        state.balance.xp += reward_xp;
        state.balance.keys += reward_keys;

        let loc = state
            .locations
            .get_mut(&id)
            .ok_or(EngineError::UnknownLocation { id })?;
        loc.current_level = new_level;
        loc.cooldown_until = t + cooldown;
        if new_level >= max_level {
            loc.available = false;
        }

        log::debug!(
            "t={t}: location {id} -> level {new_level} (cost {cost}, cooldown {cooldown}s)"
        );

        push_action(
            history,
            Action::LocationUpgrade {
                timestamp: t,
                location_id: id,
                new_level,
                cost,
                reward_xp,
                reward_keys,
                gold_before,
                gold_after: state.balance.gold,
                xp_before,
                xp_after: state.balance.xp,
                keys_before,
                keys_after: state.balance.keys,
            },
        );

        self.cascade_level_ups(t, state, history)?;
        Ok(true)
    }

    /// Level the character up for as long as the xp balance crosses the
    /// next threshold. One large xp reward can cross several at once.
    fn cascade_level_ups(
        &self,
        t: u64,
        state: &mut SimulationState,
        history: &mut Vec<StateRecord>,
    ) -> Result<(), EngineError> {
        let max_level = state.max_user_level();
        loop {
            let current = state.balance.user_level;
            if current >= max_level {
                return Ok(());
            }
            let next = *state
                .user_levels
                .get(&(current + 1))
                .ok_or(EngineError::MissingUserLevel { level: current + 1 })?;
            if state.balance.xp < next.xp_required {
                return Ok(());
            }

            let keys_before = state.balance.keys;
            state.balance.user_level = current + 1;
            state.balance.earn_per_sec = next.gold_per_sec;
            state.balance.keys += next.keys_reward;

            log::debug!(
                "t={t}: level up {current} -> {} (earn/s {:.2})",
                current + 1,
                next.gold_per_sec
            );

            push_action(
                history,
                Action::LevelUp {
                    timestamp: t,
                    old_level: current,
                    new_level: current + 1,
                    new_earn_per_sec: next.gold_per_sec,
                    reward_keys: next.keys_reward,
                    xp: state.balance.xp,
                    keys_before,
                    keys_after: state.balance.keys,
                },
            );
        }
    }
}

/// Locations that can act right now: available with an elapsed cooldown.
fn ready_set(state: &SimulationState, t: u64) -> ReadySet {
    state
        .locations
        .iter()
        .filter(|(_, loc)| loc.available && loc.cooldown_until <= t)
        .map(|(&id, _)| id)
        .collect()
}

/// Skip ahead to the earliest cooldown expiring inside the session, if
/// any. Returns false when nothing is pending and the burst should close.
/// No income accrues across the skip; the next check-in's elapsed-time
/// accrual already covers it. Day boundaries inside the skipped range
/// still open their history records, since the outer loop never sees the
/// skipped instants.
fn fast_forward(
    state: &SimulationState,
    t: &mut u64,
    session_end: u64,
    history: &mut Vec<StateRecord>,
) -> bool {
    let target = state
        .locations
        .values()
        .filter(|loc| loc.available && loc.cooldown_until > *t && loc.cooldown_until < session_end)
        .map(|loc| loc.cooldown_until)
        .min();
    let Some(target) = target else {
        return false;
    };

    let mut boundary = (*t / SECONDS_PER_DAY + 1) * SECONDS_PER_DAY;
    while boundary <= target {
        history.push(snapshot(boundary, state));
        boundary += SECONDS_PER_DAY;
    }

    log::trace!("fast-forward {} -> {target}", *t);
    *t = target;
    true
}

fn snapshot(timestamp: u64, state: &SimulationState) -> StateRecord {
    StateRecord {
        timestamp,
        balance: state.balance.clone(),
        locations: state
            .locations
            .iter()
            .map(|(&id, loc)| (id, loc.into()))
            .collect(),
        actions: Vec::new(),
    }
}

fn push_action(history: &mut Vec<StateRecord>, action: Action) {
    if let Some(open) = history.last_mut() {
        open.actions.push(action);
    }
}

/// Explain why the run stopped, distinguishing a finished catalog from a
/// level-gate deadlock and from the run-away bound.
fn diagnose_stop(state: &SimulationState, bound_hit: bool, limit: u64) -> StopReason {
    let Some((&current_id, current)) = state
        .locations
        .iter()
        .find(|(_, loc)| loc.available)
    else {
        return StopReason::CatalogExhausted;
    };

    let user_level = state.balance.user_level;
    if current.min_user_level > user_level {
        return StopReason::LevelGateBlocked {
            current_location: current_id,
            current_level: current.current_level,
            gated_location: current_id,
            required_level: current.min_user_level,
            user_level,
        };
    }
    if let Some((&next_id, next)) = state.locations.range(current_id + 1..).next()
        && next.min_user_level > user_level
    {
        return StopReason::LevelGateBlocked {
            current_location: current_id,
            current_level: current.current_level,
            gated_location: next_id,
            required_level: next.min_user_level,
            user_level,
        };
    }

    debug_assert!(bound_hit, "loop exited with available locations");
    StopReason::BoundExceeded { limit }
}
