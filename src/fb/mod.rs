//! The IEC 61131-3 standard function-block library: RS/SR latches,
//! TON/TOF/TP timers, CTU/CTD/CTUD counters.
//!
//! Each block's math lives in its own pure `step` function (see
//! `latch`, `timer`, `counter`); the wrappers here thread that math
//! through the id-keyed side table so the rung evaluator only ever
//! deals in ids and booleans.

pub mod counter;
pub mod latch;
pub mod state;
pub mod timer;

pub use counter::{CounterInputs, CounterOutputs};
pub use latch::LatchOutputs;
pub use state::BlockStateTable;
pub use timer::TimerOutputs;

use crate::element::{CounterMode, LatchMode, TimerMode};

pub fn step_timer(table: &mut BlockStateTable, id: &str, mode: TimerMode, input: bool, preset: f64, dt: f64) -> TimerOutputs {
    let prev = table.timer_state(id);
    let (outputs, next) = timer::step(mode, prev, input, preset, dt);
    *table.timer(id) = next;
    outputs
}

pub fn step_counter(table: &mut BlockStateTable, id: &str, mode: CounterMode, inputs: CounterInputs, preset: i32) -> CounterOutputs {
    let prev = table.counter_state(id);
    let (outputs, next) = counter::step(mode, prev, inputs, preset);
    *table.counter(id) = next;
    outputs
}

pub fn step_latch(table: &mut BlockStateTable, id: &str, mode: LatchMode, set: bool, reset: bool) -> LatchOutputs {
    let prev = table.latch_state(id);
    let outputs = latch::step(mode, prev.previous_q, set, reset);
    table.latch(id).previous_q = outputs.q;
    outputs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_timer_persists_state_between_calls() {
        let mut table = BlockStateTable::new();
        let out1 = step_timer(&mut table, "t1", TimerMode::Ton, true, 0.3, 0.1);
        assert!(!out1.q);
        let out2 = step_timer(&mut table, "t1", TimerMode::Ton, true, 0.3, 0.1);
        assert!(!out2.q);
        let out3 = step_timer(&mut table, "t1", TimerMode::Ton, true, 0.3, 0.1);
        assert!(out3.q);
    }

    #[test]
    fn step_latch_persists_q_between_calls() {
        let mut table = BlockStateTable::new();
        let out1 = step_latch(&mut table, "l1", LatchMode::Rs, true, false);
        assert!(out1.q);
        let out2 = step_latch(&mut table, "l1", LatchMode::Rs, false, false);
        assert!(out2.q, "latch must hold q across scans without input");
    }
}
