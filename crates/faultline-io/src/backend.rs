//! Block backend trait.
//!
//! The [`BlockBackend`] trait is the capability a fault-injected device is
//! layered on: it accepts [`BlockIo`] requests and later resolves each one
//! through the completion supplied at submission. Submission may refuse a
//! request outright, in which case ownership of the request and its
//! completion is handed back in a [`Rejected`].

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{IoError, IoVecs};

/// The category of a block request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IoType {
    Read,
    Write,
    Unmap,
    Flush,
    Reset,
    WriteZeroes,
}

impl IoType {
    /// Every request type, in declaration order.
    pub const ALL: [IoType; 6] = [
        IoType::Read,
        IoType::Write,
        IoType::Unmap,
        IoType::Flush,
        IoType::Reset,
        IoType::WriteZeroes,
    ];

    /// Returns true for request types that carry a data payload.
    pub fn carries_payload(self) -> bool {
        matches!(self, IoType::Read | IoType::Write)
    }
}

impl fmt::Display for IoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IoType::Read => "read",
            IoType::Write => "write",
            IoType::Unmap => "unmap",
            IoType::Flush => "flush",
            IoType::Reset => "reset",
            IoType::WriteZeroes => "write_zeroes",
        };
        f.write_str(s)
    }
}

/// Final status of a block request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IoStatus {
    Success,
    Failed,
    /// The device could not allocate resources for the request; callers
    /// are expected to retry later.
    NoMemory,
}

impl IoStatus {
    pub fn is_success(self) -> bool {
        self == IoStatus::Success
    }
}

/// A single block request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockIo {
    /// Request category.
    pub io_type: IoType,
    /// First block addressed by the request.
    pub offset_blocks: u64,
    /// Number of blocks addressed by the request.
    pub num_blocks: u64,
    /// Data buffers. Filled by the backend for reads, consumed for writes.
    pub iovs: IoVecs,
}

impl BlockIo {
    /// A read of `num_blocks` blocks into the supplied buffers.
    pub fn read(offset_blocks: u64, num_blocks: u64, iovs: IoVecs) -> Self {
        Self {
            io_type: IoType::Read,
            offset_blocks,
            num_blocks,
            iovs,
        }
    }

    /// A write of `num_blocks` blocks from the supplied buffers.
    pub fn write(offset_blocks: u64, num_blocks: u64, iovs: IoVecs) -> Self {
        Self {
            io_type: IoType::Write,
            offset_blocks,
            num_blocks,
            iovs,
        }
    }

    /// A request without a data payload (unmap, flush, reset, write-zeroes).
    pub fn without_payload(io_type: IoType, offset_blocks: u64, num_blocks: u64) -> Self {
        Self {
            io_type,
            offset_blocks,
            num_blocks,
            iovs: IoVecs::new(),
        }
    }

    /// A device reset request.
    pub fn reset() -> Self {
        Self::without_payload(IoType::Reset, 0, 0)
    }
}

/// Callback resolving a request. Receives the request back with its buffers.
pub type IoCompletion = Box<dyn FnOnce(BlockIo, IoStatus) + Send>;

/// A submission the backend refused to accept.
///
/// The completion was not invoked; the submitter owns both again.
pub struct Rejected {
    pub io: BlockIo,
    pub completion: IoCompletion,
    pub error: IoError,
}

impl fmt::Debug for Rejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rejected")
            .field("io", &self.io)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

/// Abstraction over a block device that requests can be forwarded to.
///
/// Completion may be invoked from any thread, including synchronously
/// from inside [`submit`](Self::submit).
pub trait BlockBackend: Send + Sync {
    /// Stable name used to correlate configuration with the device.
    fn name(&self) -> &str;

    /// Stable unique identity of the device.
    fn uuid(&self) -> Uuid;

    /// Logical block size in bytes.
    fn block_size(&self) -> u32;

    /// Device size in blocks.
    fn num_blocks(&self) -> u64;

    /// Forwards a request. On success the completion will be invoked exactly once.
    fn submit(&self, io: BlockIo, completion: IoCompletion) -> Result<(), Rejected>;
}
