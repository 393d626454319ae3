//! CTU/CTD/CTUD counter blocks.
//!
//! Counts are saturating `i32`: a counter that overflows should clamp
//! rather than wrap, since a silently wrapped count would invert the
//! `q = count >= preset` comparison in a way no ladder program expects.

use crate::element::CounterMode;
use crate::fb::state::CounterState;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CounterInputs {
    pub cu: bool,
    pub cd: bool,
    pub reset: bool,
    pub load: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CounterOutputs {
    /// `q` for Ctu/Ctd; `qu` for Ctud.
    pub q: bool,
    /// `qd` for Ctud; mirrors `q` for Ctu/Ctd so callers needn't branch.
    pub qd: bool,
    pub count: i32,
}

fn rising(previous: bool, current: bool) -> bool {
    current && !previous
}

/// Advance one counter instance by one scan.
pub fn step(mode: CounterMode, state: CounterState, inputs: CounterInputs, preset: i32) -> (CounterOutputs, CounterState) {
    let mut count = state.count;

    match mode {
        CounterMode::Ctu => {
            if inputs.reset {
                count = 0;
            } else if rising(state.previous_cu, inputs.cu) {
                count = count.saturating_add(1);
            }
        }
        CounterMode::Ctd => {
            if inputs.load {
                count = preset;
            } else if rising(state.previous_cd, inputs.cd) {
                count = count.saturating_sub(1);
            }
        }
        CounterMode::Ctud => {
            // Reset dominates load; both dominate the up/down edges.
            if inputs.reset {
                count = 0;
            } else if inputs.load {
                count = preset;
            } else {
                if rising(state.previous_cu, inputs.cu) {
                    count = count.saturating_add(1);
                }
                if rising(state.previous_cd, inputs.cd) {
                    count = count.saturating_sub(1);
                }
            }
        }
    }

    let q = count >= preset;
    let qd = count <= 0;

    let next_state = CounterState {
        count,
        previous_cu: inputs.cu,
        previous_cd: inputs.cd,
    };

    (CounterOutputs { q, qd, count }, next_state)
}
