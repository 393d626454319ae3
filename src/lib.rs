//! ladderscan: the core of a soft-PLC engine that evaluates
//! ladder-logic programs on a fixed scan cycle.
//!
//! The crate exposes four tightly coupled subsystems:
//!
//! - [`element`] — the static program model (elements, rungs, programs).
//! - [`fb`] — the IEC 61131-3 standard function-block library.
//! - [`rung`] and [`evaluator`] — one-rung and one-scan evaluation.
//! - [`resolver`] — the coil → contact execution-order resolver.
//! - [`scheduler`] — the fixed-period scan loop and its control interface.
//! - [`image`] — the thread-safe I/O table shared with external
//!   collaborators (a Modbus server, an operator UI).
//!
//! Program persistence, the graphical editor, and the Modbus server
//! itself are out of scope for this crate — see the purpose statement
//! in the design documentation.

pub mod config;
pub mod element;
pub mod error;
pub mod evaluator;
pub mod fb;
pub mod image;
pub mod resolver;
pub mod rung;
pub mod scheduler;

pub use config::EngineConfig;
pub use element::{CounterMode, Element, ElementKind, Geometry, LatchMode, Program, Rung, TimerMode};
pub use error::CoreError;
pub use image::{IOImage, Image, Value};
pub use scheduler::{ControlMsg, RunMode, Scheduler, Telemetry};
