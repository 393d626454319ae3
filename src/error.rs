//! Typed errors for program load, plus counters for runtime anomalies that
//! are never fatal (see the error policy table in the design notes).

use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;

/// Errors that can reject a program at load time. Nothing at runtime
/// returns this type — scan-time anomalies are counted, not raised.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Two or more coils in the program drive the same id.
    #[error("id {0:?} is driven by more than one coil")]
    MultipleDrivers(String),
}

/// Counters for non-fatal runtime anomalies, safe to share across the
/// scheduler worker and any reader thread.
///
/// Each counter corresponds to one row of the error policy table: the
/// condition is logged and counted, the scan proceeds regardless.
#[derive(Debug, Default)]
pub struct SoftErrorCounters {
    unknown_element_kind: AtomicU64,
    image_type_mismatch: AtomicU64,
    scan_overrun: AtomicU64,
}

impl SoftErrorCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_unknown_element_kind(&self) {
        self.unknown_element_kind.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_image_type_mismatch(&self) {
        self.image_type_mismatch.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_scan_overrun(&self) {
        self.scan_overrun.fetch_add(1, Ordering::Relaxed);
    }

    pub fn unknown_element_kind_count(&self) -> u64 {
        self.unknown_element_kind.load(Ordering::Relaxed)
    }

    pub fn image_type_mismatch_count(&self) -> u64 {
        self.image_type_mismatch.load(Ordering::Relaxed)
    }

    pub fn scan_overrun_count(&self) -> u64 {
        self.scan_overrun.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.unknown_element_kind.store(0, Ordering::Relaxed);
        self.image_type_mismatch.store(0, Ordering::Relaxed);
        self.scan_overrun.store(0, Ordering::Relaxed);
    }
}
