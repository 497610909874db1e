//! Fault injection error types.

use faultline_io::IoError;

/// Errors reported by the fault injection control surface.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FaultError {
    /// The requested configuration is not valid.
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// A configuration entry for this base device already exists.
    #[error("fault-injected device for {name} already exists")]
    AlreadyExists { name: String },

    /// No device or configuration entry with this name exists.
    #[error("{name} not found")]
    NotFound { name: String },

    /// The named backend device does not exist (yet).
    ///
    /// Creation treats this as deferred success.
    #[error("no such backend device: {name}")]
    NoSuchBackendDevice { name: String },

    /// Resources for the device could not be allocated.
    #[error("allocation failure: {reason}")]
    AllocationFailure { reason: String },

    /// The backend refused an operation.
    #[error("backend error: {source}")]
    Backend {
        #[from]
        source: IoError,
    },
}

impl FaultError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    pub(crate) fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }
}
