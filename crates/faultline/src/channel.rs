//! Per-consumer I/O channel.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Execution context of one consumer thread.
///
/// Tracks how many requests this channel has forwarded to the backend that
/// have not completed yet. Clones share the same counter, so the completion
/// path can hold a handle while the consumer keeps submitting.
#[derive(Debug, Clone, Default)]
pub struct FaultChannel {
    io_inflight: Arc<AtomicU64>,
}

impl FaultChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests forwarded on this channel and not yet completed.
    pub fn io_inflight(&self) -> u64 {
        self.io_inflight.load(Ordering::Acquire)
    }

    pub(crate) fn begin_io(&self) {
        self.io_inflight.fetch_add(1, Ordering::AcqRel);
    }

    /// # Panics
    ///
    /// Panics if nothing is in flight; every decrement pairs with one prior increment.
    pub(crate) fn end_io(&self) {
        let previous = self
            .io_inflight
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
        assert!(previous.is_ok(), "io_inflight underflow on completion");
    }
}
