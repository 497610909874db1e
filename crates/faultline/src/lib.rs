//! # faultline: Fault-injecting block devices
//!
//! A fault-injected device interposes on every request sent to a backend
//! block device and, per request type, can fail it, report it as out of
//! memory, hold it until the device is reset, or corrupt one byte of its
//! payload before passing it through. Higher layers (filesystems, volume
//! managers, replication) can then be tested against misbehaving devices
//! without faulty hardware.
//!
//! # Components
//!
//! - [`ErrorVector`]: per-request-type fault configuration
//! - [`corrupt_payload`]: single-byte XOR over a scatter-gather payload
//! - [`decide`]: maps request type, queue depth and vectors to a [`FaultKind`]
//! - [`ErrorDisk`]: drives requests through decision, treatment and completion
//! - [`ConfigStore`]: recorded device intent, replayed when backends appear
//! - [`FaultInjector`]: the control surface tying the above together
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use faultline::{ConfigStore, FaultChannel, FaultInjector, FaultKind, InjectOptions, InjectTarget};
//! use faultline_io::{BackendCatalog, BlockIo, IoStatus, IoType, IoVecs, MemBackend};
//!
//! let injector = FaultInjector::new(Arc::new(BackendCatalog::new()), Arc::new(ConfigStore::new()));
//! injector.add_backend(Arc::new(MemBackend::new("nvme0", 512, 8)));
//! injector.create("nvme0", None).unwrap();
//!
//! let opts = InjectOptions::new(InjectTarget::Io(IoType::Write), FaultKind::Failure, 1);
//! injector.inject_fault("EE_nvme0", &opts).unwrap();
//!
//! let disk = injector.disk("EE_nvme0").unwrap();
//! let channel = FaultChannel::new();
//! disk.submit(
//!     &channel,
//!     BlockIo::write(0, 1, IoVecs::from(vec![1; 512])),
//!     Box::new(|_, status| assert_eq!(status, IoStatus::Failed)),
//! );
//! ```

mod channel;
mod config_store;
mod corrupt;
mod decision;
mod disk;
mod error;
mod injector;
mod pending;
mod vector;

pub use channel::FaultChannel;
pub use config_store::{ConfigEntry, ConfigStore};
pub use corrupt::corrupt_payload;
pub use decision::decide;
pub use disk::{ErrorDisk, NAME_PREFIX, disk_name};
pub use error::FaultError;
pub use injector::{CreateOutcome, FaultInjector};
pub use pending::{PendingIo, PendingQueue};
pub use vector::{ErrorVector, ErrorVectorTable, FaultKind, InjectOptions, InjectTarget, MONITORED};
