//! Dense, id-keyed side tables for per-instance function-block state.
//!
//! Timers, counters, and latches keep their persistent state out of the
//! `Element` they're attached to so that two elements sharing an `id`
//! (the same timer drawn twice on the diagram, say) transparently share
//! one instance — see the design note on persistent identifiers.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TimerState {
    pub accumulated: f64,
    /// Time elapsed since `q` last transitioned to true; resets whenever
    /// `q` is false. Exposed for display/diagnostics, not read by any
    /// other block.
    pub elapsed_since_done: f64,
    /// The `in` input observed on the previous scan, used to detect TP's
    /// non-retriggerable seeding edge.
    pub previous_in: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CounterState {
    pub count: i32,
    /// The `cu` input observed on the previous scan (Ctu, Ctud).
    pub previous_cu: bool,
    /// The `cd` input observed on the previous scan (Ctd, Ctud).
    pub previous_cd: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LatchState {
    pub previous_q: bool,
}

/// The side table a `Program` owns alongside its static rungs. Entries
/// are created lazily on first evaluation and default to zeroed state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlockStateTable {
    timers: HashMap<String, TimerState>,
    counters: HashMap<String, CounterState>,
    latches: HashMap<String, LatchState>,
}

impl BlockStateTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timer(&mut self, id: &str) -> &mut TimerState {
        self.timers.entry(id.to_string()).or_default()
    }

    pub fn counter(&mut self, id: &str) -> &mut CounterState {
        self.counters.entry(id.to_string()).or_default()
    }

    pub fn latch(&mut self, id: &str) -> &mut LatchState {
        self.latches.entry(id.to_string()).or_default()
    }

    pub fn timer_state(&self, id: &str) -> TimerState {
        self.timers.get(id).copied().unwrap_or_default()
    }

    pub fn counter_state(&self, id: &str) -> CounterState {
        self.counters.get(id).copied().unwrap_or_default()
    }

    pub fn latch_state(&self, id: &str) -> LatchState {
        self.latches.get(id).copied().unwrap_or_default()
    }

    /// Clear all instance state back to defaults (the scheduler's `Reset`
    /// control message).
    pub fn clear(&mut self) {
        self.timers.clear();
        self.counters.clear();
        self.latches.clear();
    }
}
