//! Fault decision for an incoming request.

use faultline_io::IoType;

use crate::vector::{ErrorVectorTable, FaultKind};

/// Decides the treatment of a request from its type, the submitting
/// channel's in-flight count and the device's error vectors.
///
/// Returns [`FaultKind::None`] for pass-through. Any other result means the
/// caller applies that fault and, where the fault is consumed on
/// submission, decrements the vector's remaining count.
///
/// # Panics
///
/// Panics if asked about a reset; resets bypass fault injection entirely.
pub fn decide(io_type: IoType, io_inflight: u64, table: &ErrorVectorTable) -> FaultKind {
    assert!(
        io_type != IoType::Reset,
        "reset requests are never subject to fault injection"
    );

    let Some(vector) = table.get(io_type) else {
        return FaultKind::None;
    };
    if !vector.is_active() {
        return FaultKind::None;
    }
    if io_inflight < vector.queue_depth_threshold {
        return FaultKind::None;
    }
    vector.fault_kind
}
