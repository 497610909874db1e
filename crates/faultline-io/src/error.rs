//! Block backend error types.

use crate::IoType;

/// Errors from a block backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IoError {
    /// No backend device is registered under this name.
    #[error("no such block device: {name}")]
    NoSuchDevice { name: String },

    /// The backend cannot accept more requests right now.
    #[error("block device {name} cannot accept more requests")]
    QueueFull { name: String },

    /// The request addresses blocks past the end of the device.
    #[error(
        "request for {num_blocks} blocks at {offset_blocks} exceeds device size of {device_blocks} blocks"
    )]
    OutOfRange {
        offset_blocks: u64,
        num_blocks: u64,
        device_blocks: u64,
    },

    /// The payload length does not match the block range.
    #[error("payload of {len} bytes does not cover the block range ({expected} bytes expected)")]
    PayloadMismatch { len: usize, expected: usize },

    /// The device geometry cannot be backed by memory.
    #[error("cannot allocate {num_blocks} blocks of {block_size} bytes")]
    InvalidGeometry { block_size: u32, num_blocks: u64 },

    /// The backend does not implement this request type.
    #[error("unsupported I/O type: {io_type}")]
    Unsupported { io_type: IoType },
}
