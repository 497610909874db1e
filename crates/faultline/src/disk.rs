//! Fault-injected block device and the request lifecycle it drives.
//!
//! An [`ErrorDisk`] sits in front of a [`BlockBackend`]. Each submitted
//! request is matched against the disk's error vectors and then either
//! failed locally, held until reset, corrupted and forwarded, or forwarded
//! untouched. Forwarded requests re-enter the disk on completion, where
//! the channel's in-flight count is released and reads may be corrupted
//! before the submitter sees them.
//!
//! # Locking
//!
//! The error vectors and the pending queue share one mutex. Deciding and
//! consuming a fault happen under a single acquisition, so two concurrent
//! submissions never both consume the last unit of a vector. The lock is
//! never held across a backend call or a completion callback.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use faultline_io::{BlockBackend, BlockIo, IoCompletion, IoStatus, IoType};
use serde_json::json;
use uuid::Uuid;

use crate::channel::FaultChannel;
use crate::corrupt::corrupt_payload;
use crate::decision::decide;
use crate::pending::PendingQueue;
use crate::vector::{ErrorVector, ErrorVectorTable, FaultKind, InjectOptions};
use crate::FaultError;

/// Prefix of every fault-injected device name.
pub const NAME_PREFIX: &str = "EE_";

/// Returns the fault-injected device name for a backend name.
pub fn disk_name(base_name: &str) -> String {
    format!("{NAME_PREFIX}{base_name}")
}

#[derive(Debug, Default)]
struct DiskState {
    vectors: ErrorVectorTable,
    pending: PendingQueue,
}

impl DiskState {
    /// Consumes one unit of the vector for `io_type` and returns its state afterwards.
    fn consume(&mut self, io_type: IoType) -> ErrorVector {
        let vector = self
            .vectors
            .get_mut(io_type)
            .expect("decision selected a fault for an unmonitored type");
        vector.consume();
        *vector
    }
}

/// A virtual block device layered over a backend, applying injected faults.
pub struct ErrorDisk {
    name: String,
    uuid: Uuid,
    backend: Arc<dyn BlockBackend>,
    state: Mutex<DiskState>,
}

impl ErrorDisk {
    /// Layers a new fault-injected device over `backend`.
    ///
    /// Uses `uuid` as the device identity if given, otherwise a random one.
    pub fn new(backend: Arc<dyn BlockBackend>, uuid: Option<Uuid>) -> Self {
        Self {
            name: disk_name(backend.name()),
            uuid: uuid.unwrap_or_else(Uuid::new_v4),
            backend,
            state: Mutex::new(DiskState::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_name(&self) -> &str {
        self.backend.name()
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn block_size(&self) -> u32 {
        self.backend.block_size()
    }

    pub fn num_blocks(&self) -> u64 {
        self.backend.num_blocks()
    }

    /// Current error vector for a request type, or `None` if it is not monitored.
    pub fn error_vector(&self, io_type: IoType) -> Option<ErrorVector> {
        self.lock_state().vectors.get(io_type).copied()
    }

    /// Snapshot of all error vectors.
    pub fn error_vectors(&self) -> ErrorVectorTable {
        self.lock_state().vectors
    }

    /// Number of requests held until the next reset.
    pub fn pending_count(&self) -> usize {
        self.lock_state().pending.len()
    }

    /// Applies a fault injection to this device.
    pub fn inject(&self, opts: &InjectOptions) -> Result<(), FaultError> {
        self.lock_state().vectors.set(opts)?;
        tracing::info!(
            device = %self.name,
            target = ?opts.target,
            fault_kind = %opts.fault_kind,
            count = opts.count,
            queue_depth = opts.queue_depth,
            "fault injection configured"
        );
        Ok(())
    }

    /// Diagnostic description of the device.
    pub fn info_json(&self) -> serde_json::Value {
        json!({
            "error_disk": {
                "base_bdev": self.base_name(),
            }
        })
    }

    /// Submits a request on `channel`. `completion` is invoked exactly once,
    /// unless the request is held and the device is never reset or destroyed.
    pub fn submit(
        self: &Arc<Self>,
        channel: &FaultChannel,
        mut io: BlockIo,
        completion: IoCompletion,
    ) {
        if io.io_type == IoType::Reset {
            self.reset(io, completion);
            return;
        }

        let mut state = self.lock_state();
        let decision = decide(io.io_type, channel.io_inflight(), &state.vectors);
        match decision {
            FaultKind::None => {
                drop(state);
                self.forward(channel, io, completion);
            }
            FaultKind::Failure | FaultKind::ResourceExhaustion => {
                let vector = state.consume(io.io_type);
                drop(state);
                let status = if decision == FaultKind::Failure {
                    IoStatus::Failed
                } else {
                    IoStatus::NoMemory
                };
                tracing::debug!(
                    device = %self.name,
                    io_type = %io.io_type,
                    fault_kind = %decision,
                    remaining = vector.remaining,
                    "completing request with injected status"
                );
                completion(io, status);
            }
            FaultKind::IndefiniteQueue => {
                let vector = state.consume(io.io_type);
                tracing::debug!(
                    device = %self.name,
                    io_type = %io.io_type,
                    remaining = vector.remaining,
                    "holding request until reset"
                );
                state.pending.push(io, completion);
            }
            FaultKind::CorruptData => {
                let corruption = if io.io_type == IoType::Write {
                    let vector = state.consume(io.io_type);
                    Some(vector)
                } else {
                    None
                };
                drop(state);

                if let Some(vector) = corruption {
                    let flipped = corrupt_payload(
                        io.iovs.segments_mut(),
                        vector.corrupt_offset,
                        vector.corrupt_value,
                    );
                    tracing::debug!(
                        device = %self.name,
                        offset = vector.corrupt_offset,
                        flipped,
                        remaining = vector.remaining,
                        "corrupted write payload"
                    );
                }
                self.forward(channel, io, completion);
            }
        }
    }

    /// Forwards a request to the backend, tracking it on the channel.
    fn forward(self: &Arc<Self>, channel: &FaultChannel, io: BlockIo, completion: IoCompletion) {
        channel.begin_io();

        let disk = Arc::clone(self);
        let completion_channel = channel.clone();
        let on_complete: IoCompletion = Box::new(move |io, status| {
            disk.complete(&completion_channel, io, status, completion);
        });

        if let Err(rejected) = self.backend.submit(io, on_complete) {
            tracing::warn!(
                device = %self.name,
                io_type = %rejected.io.io_type,
                error = %rejected.error,
                "backend submission failed"
            );
            // Runs the normal completion path so the in-flight increment is released.
            (rejected.completion)(rejected.io, IoStatus::Failed);
        }
    }

    /// Completion path for forwarded requests.
    fn complete(
        &self,
        channel: &FaultChannel,
        mut io: BlockIo,
        status: IoStatus,
        completion: IoCompletion,
    ) {
        channel.end_io();

        if status.is_success() && io.io_type == IoType::Read {
            let corruption = {
                let mut state = self.lock_state();
                match state.vectors.get_mut(IoType::Read) {
                    Some(vector)
                        if vector.fault_kind == FaultKind::CorruptData && vector.is_active() =>
                    {
                        vector.consume();
                        Some(*vector)
                    }
                    _ => None,
                }
            };
            if let Some(vector) = corruption {
                let flipped = corrupt_payload(
                    io.iovs.segments_mut(),
                    vector.corrupt_offset,
                    vector.corrupt_value,
                );
                tracing::debug!(
                    device = %self.name,
                    offset = vector.corrupt_offset,
                    flipped,
                    remaining = vector.remaining,
                    "corrupted read payload"
                );
            }
        }

        completion(io, status);
    }

    /// Fails every held request in FIFO order, then completes the reset.
    fn reset(&self, io: BlockIo, completion: IoCompletion) {
        let aborted = self.abort_pending();
        tracing::info!(device = %self.name, aborted, "device reset");
        completion(io, IoStatus::Success);
    }

    /// Fails every held request in FIFO order. Returns how many were failed.
    pub(crate) fn abort_pending(&self) -> usize {
        let pending = self.lock_state().pending.drain();
        let count = pending.len();
        for held in pending {
            held.complete(IoStatus::Failed);
        }
        count
    }

    fn lock_state(&self) -> MutexGuard<'_, DiskState> {
        self.state.lock().expect("error disk state poisoned")
    }
}

impl fmt::Debug for ErrorDisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorDisk")
            .field("name", &self.name)
            .field("uuid", &self.uuid)
            .field("base_name", &self.base_name())
            .finish_non_exhaustive()
    }
}
