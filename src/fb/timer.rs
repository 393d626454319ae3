//! TON/TOF/TP timer blocks.
//!
//! `step` is the pure `(previous_state, in, dt) -> (outputs, next_state)`
//! function the spec describes; `fb::mod::step_timer` wraps it against
//! the side table so callers only ever see ids.

use crate::element::TimerMode;
use crate::fb::state::TimerState;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimerOutputs {
    pub q: bool,
    /// Elapsed time, in the same unit as `dt` (seconds).
    pub et: f64,
}

/// Advance one timer instance by `dt` seconds. `dt` must be non-negative
/// (enforced by the scheduler before a scan starts, per the data model
/// invariant on `delta_time`).
pub fn step(mode: TimerMode, state: TimerState, input: bool, preset: f64, dt: f64) -> (TimerOutputs, TimerState) {
    let (accum_next, q) = match mode {
        TimerMode::Ton => {
            let accum_next = if input { state.accumulated + dt } else { 0.0 };
            let q = accum_next >= preset;
            (accum_next, q)
        }
        TimerMode::Tof => {
            let accum_next = if input {
                preset
            } else if state.accumulated > 0.0 {
                (state.accumulated - dt).max(0.0)
            } else {
                0.0
            };
            let q = accum_next > 0.0;
            (accum_next, q)
        }
        TimerMode::Tp => {
            let rising_edge = input && !state.previous_in;
            let accum_next = if rising_edge && state.accumulated == 0.0 {
                dt
            } else if state.accumulated > 0.0 && state.accumulated < preset {
                state.accumulated + dt
            } else {
                0.0
            };
            let q = accum_next > 0.0;
            (accum_next, q)
        }
    };

    let elapsed_since_done = if q {
        state.elapsed_since_done + dt
    } else {
        0.0
    };

    let next_state = TimerState {
        accumulated: accum_next,
        elapsed_since_done,
        previous_in: input,
    };

    (TimerOutputs { q, et: accum_next }, next_state)
}
