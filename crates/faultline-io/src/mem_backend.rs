//! In-memory block backend.
//!
//! Stores device contents in a flat byte vector. Completions are either
//! delivered inline from `submit` or held until the owner polls them, which
//! lets tests keep requests in flight for as long as they need.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

use crate::backend::{BlockBackend, BlockIo, IoCompletion, IoStatus, IoType, Rejected};
use crate::payload::round_up_to_block;
use crate::IoError;

/// When the backend invokes completions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompletionMode {
    /// Complete inside `submit`.
    #[default]
    Immediate,
    /// Hold completions until [`MemBackend::poll`] is called.
    Deferred,
}

/// A request accepted but not yet executed.
struct Queued {
    io: BlockIo,
    completion: IoCompletion,
}

/// In-memory block device.
pub struct MemBackend {
    name: String,
    uuid: Uuid,
    block_size: u32,
    num_blocks: u64,
    mode: CompletionMode,
    data: Mutex<Vec<u8>>,
    queued: Mutex<VecDeque<Queued>>,
    /// Number of upcoming submissions to refuse.
    reject_next: AtomicU64,
    /// Number of upcoming completions to report as failed.
    fail_next: AtomicU64,
}

impl MemBackend {
    /// Creates a zero-filled device.
    ///
    /// # Panics
    ///
    /// Panics if the geometry is rejected by [`try_new`](Self::try_new).
    pub fn new(name: impl Into<String>, block_size: u32, num_blocks: u64) -> Self {
        Self::try_new(name, block_size, num_blocks).expect("invalid in-memory device geometry")
    }

    /// Creates a zero-filled device, failing with [`IoError::InvalidGeometry`]
    /// if the block size is zero or the contents cannot be allocated.
    pub fn try_new(
        name: impl Into<String>,
        block_size: u32,
        num_blocks: u64,
    ) -> Result<Self, IoError> {
        let invalid = || IoError::InvalidGeometry {
            block_size,
            num_blocks,
        };
        if block_size == 0 {
            return Err(invalid());
        }
        let bytes = u64::from(block_size)
            .checked_mul(num_blocks)
            .and_then(|bytes| usize::try_from(bytes).ok())
            .ok_or_else(invalid)?;
        let mut data = Vec::new();
        data.try_reserve_exact(bytes).map_err(|_| invalid())?;
        data.resize(bytes, 0);

        Ok(Self {
            name: name.into(),
            uuid: Uuid::new_v4(),
            block_size,
            num_blocks,
            mode: CompletionMode::Immediate,
            data: Mutex::new(data),
            queued: Mutex::new(VecDeque::new()),
            reject_next: AtomicU64::new(0),
            fail_next: AtomicU64::new(0),
        })
    }

    /// Creates a device large enough to hold `capacity` bytes.
    pub fn with_capacity(name: impl Into<String>, block_size: u32, capacity: usize) -> Self {
        let bytes = round_up_to_block(capacity, block_size as usize);
        Self::new(name, block_size, (bytes / block_size as usize) as u64)
    }

    /// Sets the completion mode.
    pub fn with_mode(mut self, mode: CompletionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets a fixed identity.
    pub fn with_uuid(mut self, uuid: Uuid) -> Self {
        self.uuid = uuid;
        self
    }

    /// Refuses the next `count` submissions with [`IoError::QueueFull`].
    pub fn reject_next_submissions(&self, count: u64) {
        self.reject_next.store(count, Ordering::SeqCst);
    }

    /// Reports the next `count` completions as failed without touching data.
    pub fn fail_next_completions(&self, count: u64) {
        self.fail_next.store(count, Ordering::SeqCst);
    }

    /// Number of accepted requests whose completion is still held.
    pub fn queued(&self) -> usize {
        self.queued.lock().expect("mem backend queue poisoned").len()
    }

    /// Executes and completes up to `max` held requests in submission order.
    ///
    /// Returns the number completed. Completions run without any backend
    /// lock held, so they may submit new requests.
    pub fn poll(&self, max: usize) -> usize {
        let mut completed = 0;
        while completed < max {
            let next = self
                .queued
                .lock()
                .expect("mem backend queue poisoned")
                .pop_front();
            let Some(Queued { mut io, completion }) = next else {
                break;
            };
            let status = self.execute(&mut io);
            completion(io, status);
            completed += 1;
        }
        completed
    }

    /// Completes every held request, including ones submitted by completions.
    pub fn drain(&self) -> usize {
        self.poll(usize::MAX)
    }

    /// Copies device contents starting at `offset` bytes into a new buffer.
    ///
    /// Returns `None` if the range extends past the end of the device.
    pub fn read_bytes(&self, offset: usize, len: usize) -> Option<Vec<u8>> {
        let end = offset.checked_add(len)?;
        let data = self.data.lock().expect("mem backend data poisoned");
        data.get(offset..end).map(<[u8]>::to_vec)
    }

    /// Validates a request against the device geometry.
    fn validate(&self, io: &BlockIo) -> Result<(), IoError> {
        let end = io.offset_blocks.checked_add(io.num_blocks);
        if io.io_type != IoType::Reset && end.is_none_or(|end| end > self.num_blocks) {
            return Err(IoError::OutOfRange {
                offset_blocks: io.offset_blocks,
                num_blocks: io.num_blocks,
                device_blocks: self.num_blocks,
            });
        }
        if io.io_type.carries_payload() {
            let expected = io.num_blocks as usize * self.block_size as usize;
            if io.iovs.len() != expected {
                return Err(IoError::PayloadMismatch {
                    len: io.iovs.len(),
                    expected,
                });
            }
        }
        Ok(())
    }

    fn execute(&self, io: &mut BlockIo) -> IoStatus {
        if self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return IoStatus::Failed;
        }

        let start = io.offset_blocks as usize * self.block_size as usize;
        let len = io.num_blocks as usize * self.block_size as usize;
        let mut data = self.data.lock().expect("mem backend data poisoned");
        match io.io_type {
            IoType::Read => {
                io.iovs.scatter_from(&data[start..start + len]);
            }
            IoType::Write => {
                data[start..start + len].copy_from_slice(&io.iovs.to_vec());
            }
            IoType::Unmap | IoType::WriteZeroes => data[start..start + len].fill(0),
            IoType::Flush | IoType::Reset => {}
        }
        IoStatus::Success
    }
}

impl fmt::Debug for MemBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemBackend")
            .field("name", &self.name)
            .field("uuid", &self.uuid)
            .field("block_size", &self.block_size)
            .field("num_blocks", &self.num_blocks)
            .field("mode", &self.mode)
            .field("queued", &self.queued())
            .finish_non_exhaustive()
    }
}

impl BlockBackend for MemBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn uuid(&self) -> Uuid {
        self.uuid
    }

    fn block_size(&self) -> u32 {
        self.block_size
    }

    fn num_blocks(&self) -> u64 {
        self.num_blocks
    }

    fn submit(&self, mut io: BlockIo, completion: IoCompletion) -> Result<(), Rejected> {
        if self
            .reject_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(Rejected {
                io,
                completion,
                error: IoError::QueueFull {
                    name: self.name.clone(),
                },
            });
        }

        if let Err(error) = self.validate(&io) {
            tracing::debug!(backend = %self.name, %error, "rejecting invalid request");
            return Err(Rejected {
                io,
                completion,
                error,
            });
        }

        match self.mode {
            CompletionMode::Immediate => {
                let status = self.execute(&mut io);
                completion(io, status);
            }
            CompletionMode::Deferred => {
                self.queued
                    .lock()
                    .expect("mem backend queue poisoned")
                    .push_back(Queued { io, completion });
            }
        }
        Ok(())
    }
}
