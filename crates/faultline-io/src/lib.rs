//! # faultline-io: Block Backend Abstraction for Faultline
//!
//! This crate defines the block device capability that fault-injected
//! devices are layered on:
//!
//! - **[`BlockBackend`]**: submit a [`BlockIo`] and receive its completion
//!   later, possibly from another thread
//! - **[`IoVecs`]**: scatter-gather payload carried by each request
//! - **[`BackendCatalog`]**: the set of backend devices currently present
//! - **[`MemBackend`]**: an in-memory device with inline or deferred
//!   completion, used for tests and dry runs
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────┐
//! │        faultline         │
//! │ (uses BlockBackend trait)│
//! └────────────┬─────────────┘
//!              │
//! ┌────────────┴─────────────┐
//! │       faultline-io       │
//! │  ┌─────────┐  ┌────────┐ │
//! │  │   Mem   │  │ Other  │ │
//! │  │ Backend │  │ impls  │ │
//! │  └─────────┘  └────────┘ │
//! └──────────────────────────┘
//! ```

mod backend;
mod catalog;
mod error;
mod mem_backend;
mod payload;

pub use backend::{BlockBackend, BlockIo, IoCompletion, IoStatus, IoType, Rejected};
pub use catalog::BackendCatalog;
pub use error::IoError;
pub use mem_backend::{CompletionMode, MemBackend};
pub use payload::{IoVecs, round_up_to_block};
