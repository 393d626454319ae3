//! The rung evaluator: left-to-right series evaluation of one rung.
//!
//! Contacts read the image committed by the *previous* scan
//! (`image_in`), never the in-progress working image of this rung —
//! that's what keeps a contact downstream of a coil on the same rung
//! from seeing a mid-rung write. Writes land in a `delta` the caller
//! merges into the working image after the whole rung has run.

use crate::element::{CounterMode, Element, ElementKind, Rung};
use crate::error::SoftErrorCounters;
use crate::fb::{self, BlockStateTable};
use crate::image::Image;

/// The outcome of evaluating one rung: the power value the rail ended
/// at, and the delta of image writes its coils/outputs produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RungResult {
    pub power: bool,
    pub delta: Image,
}

/// Evaluate `rung` against `image_in` (this scan's working image) and
/// `previous_image` (the image committed at the end of the prior
/// scan, consulted only for edge detection). `state` is the program's
/// function-block side table, mutated in place. `dt` is the scan's
/// delta time in seconds.
pub fn evaluate(
    rung: &Rung,
    image_in: &Image,
    previous_image: &Image,
    dt: f64,
    state: &mut BlockStateTable,
    counters: &SoftErrorCounters,
) -> RungResult {
    let mut power = true;
    let mut delta = Image::new();

    for element in &rung.elements {
        power = step_element(element, power, image_in, previous_image, dt, state, counters, &mut delta);
    }

    RungResult { power, delta }
}

/// Advance `power` by one element and return the new power. Coils and
/// outputs write into `delta` but never alter `power` themselves — the
/// documented semantics in which two coils on one rung each latch the
/// same value (see the open question in the design notes).
fn step_element(
    element: &Element,
    power: bool,
    image_in: &Image,
    // Edge detection for timers/counters is carried in the block state
    // table, not `previous_image` -- kept in the signature only so the
    // caller's contract matches the rung-evaluator contract in the
    // design notes (a future stateless block kind may want it).
    _previous_image: &Image,
    dt: f64,
    state: &mut BlockStateTable,
    counters: &SoftErrorCounters,
    delta: &mut Image,
) -> bool {
    match &element.kind {
        ElementKind::Input => power,

        ElementKind::Output => {
            delta.set_bit(element.id.clone(), power);
            power
        }

        ElementKind::Contact { source_id, normally_open } => {
            let bit = image_in.get_bit(source_id, counters);
            let effective = if *normally_open { bit } else { !bit };
            power && effective
        }

        ElementKind::Coil { target_id } => {
            delta.set_bit(target_id.clone(), power);
            power
        }

        ElementKind::Timer { preset, mode } => {
            let out = fb::step_timer(state, &element.id, *mode, power, *preset, dt);
            power && out.q
        }

        ElementKind::Counter { preset, mode, reset_id, load_id, secondary_trigger_id } => {
            // The rung can only deliver one trigger signal — its power at
            // this position. Ctu reads it as `cu`; Ctd reads it as `cd`;
            // Ctud reads it as `cu` and takes `cd` from `secondary_trigger_id`
            // (an id read straight out of the image, like a contact source).
            let (cu, cd) = match mode {
                CounterMode::Ctu => (power, false),
                CounterMode::Ctd => (false, power),
                CounterMode::Ctud => (
                    power,
                    secondary_trigger_id.as_deref().map(|id| image_in.get_bit(id, counters)).unwrap_or(false),
                ),
            };
            let inputs = fb::CounterInputs {
                cu,
                cd,
                reset: reset_id.as_deref().map(|id| image_in.get_bit(id, counters)).unwrap_or(false),
                load: load_id.as_deref().map(|id| image_in.get_bit(id, counters)).unwrap_or(false),
            };
            let out = fb::step_counter(state, &element.id, *mode, inputs, *preset);
            // Ctu/Ctud gate on `qu` (count >= preset); Ctd gates on `qd`
            // (count <= 0) -- the single "q" the rung's power chain sees,
            // per the generic "power = power AND q" rule in the design
            // (Ctud's `qd` is still in `out` for callers that want it,
            // just not folded into this rung's power).
            let q = match mode {
                CounterMode::Ctd => out.qd,
                CounterMode::Ctu | CounterMode::Ctud => out.q,
            };
            power && q
        }

        ElementKind::Latch { mode, set_id, reset_id } => {
            let set = image_in.get_bit(set_id, counters);
            let reset = image_in.get_bit(reset_id, counters);
            let out = fb::step_latch(state, &element.id, *mode, set, reset);
            power && out.q
        }

        ElementKind::Unknown(_) => {
            counters.record_unknown_element_kind();
            power
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::TimerMode;

    fn counters() -> SoftErrorCounters {
        SoftErrorCounters::new()
    }

    #[test]
    fn normally_open_contact_passes_through_a_true_bit() {
        let rung = Rung::new(vec![Element::contact("c1", "in1", true), Element::coil("coil1", "out1")]);
        let mut image = Image::new();
        image.set_bit("in1", true);
        let mut state = BlockStateTable::new();
        let result = evaluate(&rung, &image, &Image::new(), 0.1, &mut state, &counters());
        assert!(result.power);
        assert_eq!(result.delta.get_bit("out1", &counters()), true);
    }

    #[test]
    fn normally_closed_contact_inverts_the_bit() {
        let rung = Rung::new(vec![Element::contact("c1", "in1", false), Element::coil("coil1", "out1")]);
        let mut image = Image::new();
        image.set_bit("in1", true);
        let mut state = BlockStateTable::new();
        let result = evaluate(&rung, &image, &Image::new(), 0.1, &mut state, &counters());
        assert!(!result.power);
        assert_eq!(result.delta.get_bit("out1", &counters()), false);
    }

    #[test]
    fn dangling_contact_reference_reads_as_false() {
        let rung = Rung::new(vec![Element::contact("c1", "ghost", true), Element::coil("coil1", "out1")]);
        let mut state = BlockStateTable::new();
        let result = evaluate(&rung, &Image::new(), &Image::new(), 0.1, &mut state, &counters());
        assert!(!result.power);
    }

    #[test]
    fn contact_sees_the_prior_commit_not_a_mid_rung_write() {
        // A rung where a coil drives `motor` and a later contact reads
        // `motor` must still see image_in's value, not the coil's write.
        let rung = Rung::new(vec![
            Element::coil("coil1", "motor"),
            Element::contact("c1", "motor", true),
            Element::coil("coil2", "confirm"),
        ]);
        let mut image = Image::new();
        image.set_bit("motor", false);
        let mut state = BlockStateTable::new();
        let result = evaluate(&rung, &image, &Image::new(), 0.1, &mut state, &counters());
        // image_in has motor=false, so the downstream contact opens the
        // chain even though the coil just wrote motor=true into delta.
        assert_eq!(result.delta.get_bit("motor", &counters()), true);
        assert!(!result.power);
        assert_eq!(result.delta.get_bit("confirm", &counters()), false);
    }

    #[test]
    fn two_coils_on_one_rung_each_latch_the_same_power_value() {
        let rung = Rung::new(vec![
            Element::contact("c1", "in1", true),
            Element::coil("coil1", "out1"),
            Element::coil("coil2", "out2"),
        ]);
        let mut image = Image::new();
        image.set_bit("in1", true);
        let mut state = BlockStateTable::new();
        let result = evaluate(&rung, &image, &Image::new(), 0.1, &mut state, &counters());
        assert_eq!(result.delta.get_bit("out1", &counters()), true);
        assert_eq!(result.delta.get_bit("out2", &counters()), true);
    }

    #[test]
    fn timer_gates_power_through_its_q_output() {
        let rung = Rung::new(vec![Element::timer("t1", 0.3, TimerMode::Ton), Element::coil("coil1", "out1")]);
        let mut state = BlockStateTable::new();
        let image = Image::new();

        let r1 = evaluate(&rung, &image, &Image::new(), 0.1, &mut state, &counters());
        assert!(!r1.power, "not done after one 0.1s scan of a 0.3s preset");

        let r2 = evaluate(&rung, &image, &Image::new(), 0.1, &mut state, &counters());
        assert!(!r2.power);

        let r3 = evaluate(&rung, &image, &Image::new(), 0.1, &mut state, &counters());
        assert!(r3.power, "done on the third scan");
        assert_eq!(r3.delta.get_bit("out1", &counters()), true);
    }

    #[test]
    fn unknown_element_kind_passes_through_and_is_counted() {
        let rung = Rung::new(vec![Element::new("x1", ElementKind::Unknown("future-block".into())), Element::coil("coil1", "out1")]);
        let mut state = BlockStateTable::new();
        let c = counters();
        let result = evaluate(&rung, &Image::new(), &Image::new(), 0.1, &mut state, &c);
        assert!(result.power);
        assert_eq!(c.unknown_element_kind_count(), 1);
    }
}
