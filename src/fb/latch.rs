//! RS/SR latch blocks. Both are one-line functions of `(previous_q, set,
//! reset)`; the thin wrapper in `fb::mod` wires them to the side table.

use crate::element::LatchMode;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatchOutputs {
    pub q: bool,
    pub not_q: bool,
}

impl LatchOutputs {
    fn from_q(q: bool) -> Self {
        Self { q, not_q: !q }
    }
}

/// Reset-dominant: reset wins when both set and reset are asserted.
pub fn rs_latch(previous_q: bool, set: bool, reset: bool) -> LatchOutputs {
    let q = if reset { false } else { previous_q || set };
    LatchOutputs::from_q(q)
}

/// Set-dominant: set wins when both set and reset are asserted.
pub fn sr_latch(previous_q: bool, set: bool, reset: bool) -> LatchOutputs {
    let q = if set { true } else { previous_q && !reset };
    LatchOutputs::from_q(q)
}

/// Dispatch on `LatchMode`.
pub fn step(mode: LatchMode, previous_q: bool, set: bool, reset: bool) -> LatchOutputs {
    match mode {
        LatchMode::Rs => rs_latch(previous_q, set, reset),
        LatchMode::Sr => sr_latch(previous_q, set, reset),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rs_latch_is_reset_dominant() {
        assert_eq!(rs_latch(false, true, true).q, false);
        assert_eq!(rs_latch(true, true, true).q, false);
    }

    #[test]
    fn rs_latch_holds_until_reset() {
        assert_eq!(rs_latch(false, true, false).q, true);
        assert_eq!(rs_latch(true, false, false).q, true);
        assert_eq!(rs_latch(true, false, true).q, false);
    }

    #[test]
    fn sr_latch_is_set_dominant() {
        assert_eq!(sr_latch(false, true, true).q, true);
        assert_eq!(sr_latch(true, true, true).q, true);
    }

    #[test]
    fn sr_latch_holds_until_reset_without_set() {
        assert_eq!(sr_latch(false, true, false).q, true);
        assert_eq!(sr_latch(true, false, false).q, true);
        assert_eq!(sr_latch(true, false, true).q, false);
    }

    #[test]
    fn not_q_is_always_the_complement_of_q() {
        let out = rs_latch(false, true, false);
        assert_eq!(out.not_q, !out.q);
    }
}
