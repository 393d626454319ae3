//! The static data model: elements, rungs, and programs.
//!
//! Everything here is immutable once a program has loaded — attribute
//! values such as `preset`, `normally_open`, and `geometry` never change
//! during execution. Mutable per-instance state (timer accumulation,
//! counter count, latch `q`) is kept out of this model entirely; it lives
//! in the side-table described in `crate::fb::state`.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Position/size metadata the core never reads; preserved only so the
/// editor that produced a program gets it back unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub x: f64,
    pub y: f64,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerMode {
    /// On-delay: output follows input after `preset` has elapsed.
    Ton,
    /// Off-delay: output stays true for `preset` after input drops.
    Tof,
    /// Pulse: one `preset`-wide non-retriggerable pulse per rising edge.
    Tp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CounterMode {
    /// Up counter: increments on `cu` rising edge, `r` resets to zero.
    Ctu,
    /// Down counter: decrements on `cd` rising edge, `ld` loads preset.
    Ctd,
    /// Up/down counter: combines Ctu and Ctd; reset dominates load.
    Ctud,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LatchMode {
    /// Reset-dominant: `reset` wins when both `set` and `reset` are true.
    Rs,
    /// Set-dominant: `set` wins when both `set` and `reset` are true.
    Sr,
}

/// The kind-specific shape of an element. Attribute values only —
/// runtime state for Timer/Counter/Latch lives in the block state table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ElementKind {
    /// Pass-through: reads as the value of `Element::id` in the image but
    /// never alters rung power on its own.
    Input,
    /// Pass-through at evaluation; its value is written to the image
    /// under `Element::id` at its position on the rung.
    Output,
    Contact {
        source_id: String,
        normally_open: bool,
    },
    Coil {
        target_id: String,
    },
    Timer {
        preset: f64,
        mode: TimerMode,
    },
    Counter {
        preset: i32,
        mode: CounterMode,
        /// id of the bit that forces the count to zero (Ctu, Ctud).
        reset_id: Option<String>,
        /// id of the bit that forces the count to `preset` (Ctd, Ctud).
        load_id: Option<String>,
        /// id of the `cd` bit when `mode` is `Ctud` (rung power drives
        /// `cu`; a single rung can't carry two independent trigger
        /// signals, so the down-count edge is read from the image like
        /// a contact's `source_id`). Unused for Ctu/Ctd.
        secondary_trigger_id: Option<String>,
    },
    Latch {
        mode: LatchMode,
        /// id of the `set` bit this instance observes.
        set_id: String,
        /// id of the `reset` bit this instance observes.
        reset_id: String,
    },
    /// An element kind this version of the core does not recognize.
    /// Evaluated as a pass-through and counted as a soft error, per the
    /// forward-compatibility rule in the rung evaluator.
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: String,
    pub kind: ElementKind,
    pub geometry: Geometry,
}

impl Element {
    pub fn new(id: impl Into<String>, kind: ElementKind) -> Self {
        Self {
            id: id.into(),
            kind,
            geometry: Geometry::default(),
        }
    }

    pub fn with_geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = geometry;
        self
    }

    pub fn contact(id: impl Into<String>, source_id: impl Into<String>, normally_open: bool) -> Self {
        Self::new(
            id,
            ElementKind::Contact {
                source_id: source_id.into(),
                normally_open,
            },
        )
    }

    pub fn coil(id: impl Into<String>, target_id: impl Into<String>) -> Self {
        Self::new(id, ElementKind::Coil { target_id: target_id.into() })
    }

    pub fn timer(id: impl Into<String>, preset: f64, mode: TimerMode) -> Self {
        Self::new(id, ElementKind::Timer { preset, mode })
    }

    pub fn counter(id: impl Into<String>, preset: i32, mode: CounterMode) -> Self {
        Self::new(
            id,
            ElementKind::Counter {
                preset,
                mode,
                reset_id: None,
                load_id: None,
                secondary_trigger_id: None,
            },
        )
    }

    /// Attach the id of the bit that forces this counter's count to zero
    /// (Ctu, Ctud). A construction-time builder, not a runtime scan path:
    /// panics if called on a non-counter element, the same way chaining a
    /// `Vec` builder method on the wrong type would be a compile error in
    /// a less dynamic shape — a mistake in the program being assembled,
    /// never a condition a loaded, validated program can hit mid-scan.
    pub fn with_reset_id(mut self, id: impl Into<String>) -> Self {
        match &mut self.kind {
            ElementKind::Counter { reset_id, .. } => *reset_id = Some(id.into()),
            _ => panic!("with_reset_id is only valid on a Counter element"),
        }
        self
    }

    /// Attach the id of the bit that forces this counter's count to
    /// `preset` (Ctd, Ctud). Construction-time builder; panics on a
    /// non-counter element (see `with_reset_id`).
    pub fn with_load_id(mut self, id: impl Into<String>) -> Self {
        match &mut self.kind {
            ElementKind::Counter { load_id, .. } => *load_id = Some(id.into()),
            _ => panic!("with_load_id is only valid on a Counter element"),
        }
        self
    }

    /// Attach the id of the bit a Ctud counter reads its `cd` trigger
    /// from (the rung can only deliver one trigger signal as power, so
    /// Ctud's second trigger must be read from the image like a
    /// contact source). Construction-time builder; panics on a
    /// non-counter element (see `with_reset_id`).
    pub fn with_secondary_trigger_id(mut self, id: impl Into<String>) -> Self {
        match &mut self.kind {
            ElementKind::Counter { secondary_trigger_id, .. } => *secondary_trigger_id = Some(id.into()),
            _ => panic!("with_secondary_trigger_id is only valid on a Counter element"),
        }
        self
    }
}

/// An ordered sequence of elements, evaluated left to right as a series
/// (AND) chain. The first element is implicitly wired to the left power
/// rail.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rung {
    pub elements: Vec<Element>,
}

impl Rung {
    pub fn new(elements: Vec<Element>) -> Self {
        Self { elements }
    }

    /// All ids this rung's coils drive.
    pub fn coil_targets(&self) -> impl Iterator<Item = &str> {
        self.elements.iter().filter_map(|e| match &e.kind {
            ElementKind::Coil { target_id } => Some(target_id.as_str()),
            _ => None,
        })
    }

    /// All ids this rung's contacts observe.
    pub fn contact_sources(&self) -> impl Iterator<Item = &str> {
        self.elements.iter().filter_map(|e| match &e.kind {
            ElementKind::Contact { source_id, .. } => Some(source_id.as_str()),
            _ => None,
        })
    }
}

/// An ordered sequence of rungs. `name`/`description` are opaque to
/// evaluation, carried only so a loader gets them back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub name: String,
    pub description: Option<String>,
    pub rungs: Vec<Rung>,
}

impl Program {
    pub fn new(name: impl Into<String>, rungs: Vec<Rung>) -> Self {
        Self {
            name: name.into(),
            description: None,
            rungs,
        }
    }

    /// Re-validate the single-driver invariant: a given id must be
    /// driven by at most one coil across the entire program. The
    /// loader is responsible for schema validation; this is the one
    /// invariant the core itself re-checks before accepting a program,
    /// per the error policy in the design notes.
    pub fn validate(&self) -> Result<(), CoreError> {
        let mut seen: HashSet<&str> = HashSet::new();
        for rung in &self.rungs {
            for target in rung.coil_targets() {
                if !seen.insert(target) {
                    return Err(CoreError::MultipleDrivers(target.to_string()));
                }
            }
        }
        Ok(())
    }
}
