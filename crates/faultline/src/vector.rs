//! Per-operation-type fault configuration.
//!
//! Every fault-injected device carries one [`ErrorVector`] for each
//! monitored request type. A vector describes which fault to apply, how
//! many more requests it applies to, and the queue depth at which it starts
//! applying. A vector with `remaining == 0` has no effect, whatever its
//! other fields say.

use faultline_io::IoType;
use serde::{Deserialize, Serialize};

use crate::FaultError;

/// Request types that can carry an injected fault.
///
/// Reset is handled structurally and never appears here.
pub const MONITORED: [IoType; 4] = [IoType::Read, IoType::Write, IoType::Unmap, IoType::Flush];

/// The treatment applied to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    /// Pass the request through untouched.
    #[default]
    None,
    /// Complete the request as failed without forwarding it.
    Failure,
    /// Complete the request as out-of-memory without forwarding it.
    ResourceExhaustion,
    /// Hold the request until the device is reset.
    IndefiniteQueue,
    /// XOR one payload byte (writes before submission, reads after completion).
    CorruptData,
}

impl std::fmt::Display for FaultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FaultKind::None => "none",
            FaultKind::Failure => "failure",
            FaultKind::ResourceExhaustion => "resource_exhaustion",
            FaultKind::IndefiniteQueue => "indefinite_queue",
            FaultKind::CorruptData => "corrupt_data",
        };
        f.write_str(s)
    }
}

/// Fault configuration for one request type on one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ErrorVector {
    pub fault_kind: FaultKind,
    /// Requests still subject to the fault. Zero means inactive.
    pub remaining: u32,
    /// Minimum in-flight count on the submitting channel for the fault to apply.
    pub queue_depth_threshold: u64,
    /// Logical payload offset of the corrupted byte.
    pub corrupt_offset: u64,
    /// XOR mask applied to the corrupted byte.
    pub corrupt_value: u8,
}

impl ErrorVector {
    /// Returns true if the fault still applies to future requests.
    pub fn is_active(&self) -> bool {
        self.remaining > 0
    }

    /// Consumes one unit of the remaining count.
    ///
    /// # Panics
    ///
    /// Panics if the vector is already exhausted.
    pub(crate) fn consume(&mut self) {
        assert!(self.remaining > 0, "consumed an exhausted error vector");
        self.remaining -= 1;
    }
}

/// Which vectors an injection applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InjectTarget {
    /// Every monitored request type.
    All,
    /// Zero the remaining count of every monitored type, keeping the other fields.
    Clear,
    /// A single monitored request type.
    #[serde(untagged)]
    Io(IoType),
}

/// Parameters of a fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjectOptions {
    pub target: InjectTarget,
    pub fault_kind: FaultKind,
    pub count: u32,
    #[serde(default)]
    pub queue_depth: u64,
    #[serde(default)]
    pub corrupt_offset: u64,
    #[serde(default)]
    pub corrupt_value: u8,
}

impl InjectOptions {
    /// An injection of `fault_kind` for the next `count` requests of `target`.
    pub fn new(target: InjectTarget, fault_kind: FaultKind, count: u32) -> Self {
        Self {
            target,
            fault_kind,
            count,
            queue_depth: 0,
            corrupt_offset: 0,
            corrupt_value: 0,
        }
    }

    /// Cancels every outstanding fault on the device.
    pub fn clear() -> Self {
        Self::new(InjectTarget::Clear, FaultKind::None, 0)
    }

    /// Sets the queue-depth threshold.
    pub fn with_queue_depth(mut self, queue_depth: u64) -> Self {
        self.queue_depth = queue_depth;
        self
    }

    /// Sets the corruption offset and mask.
    pub fn with_corruption(mut self, offset: u64, value: u8) -> Self {
        self.corrupt_offset = offset;
        self.corrupt_value = value;
        self
    }

    /// Checks the options without touching any device.
    pub fn validate(&self) -> Result<(), FaultError> {
        if self.fault_kind == FaultKind::CorruptData && self.corrupt_value == 0 {
            return Err(FaultError::invalid("corrupt_value must be non-zero"));
        }
        if let InjectTarget::Io(io_type) = self.target {
            if !MONITORED.contains(&io_type) {
                return Err(FaultError::invalid(format!(
                    "faults cannot be injected into {io_type} requests"
                )));
            }
        }
        Ok(())
    }

    fn to_vector(self) -> ErrorVector {
        ErrorVector {
            fault_kind: self.fault_kind,
            remaining: self.count,
            queue_depth_threshold: self.queue_depth,
            corrupt_offset: self.corrupt_offset,
            corrupt_value: self.corrupt_value,
        }
    }
}

/// The error vectors of one device, one per monitored request type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ErrorVectorTable {
    vectors: [ErrorVector; MONITORED.len()],
}

impl ErrorVectorTable {
    fn slot(io_type: IoType) -> Option<usize> {
        MONITORED.iter().position(|&t| t == io_type)
    }

    /// Returns the vector for a request type, or `None` if the type is not monitored.
    pub fn get(&self, io_type: IoType) -> Option<&ErrorVector> {
        Self::slot(io_type).map(|i| &self.vectors[i])
    }

    pub(crate) fn get_mut(&mut self, io_type: IoType) -> Option<&mut ErrorVector> {
        Self::slot(io_type).map(|i| &mut self.vectors[i])
    }

    /// Applies an injection. Validation happens before any vector changes.
    pub fn set(&mut self, opts: &InjectOptions) -> Result<(), FaultError> {
        opts.validate()?;
        match opts.target {
            InjectTarget::All => self.vectors.fill(opts.to_vector()),
            InjectTarget::Clear => {
                for vector in &mut self.vectors {
                    vector.remaining = 0;
                }
            }
            InjectTarget::Io(io_type) => {
                let vector = self
                    .get_mut(io_type)
                    .expect("validated target is monitored");
                *vector = opts.to_vector();
            }
        }
        Ok(())
    }

    /// Iterates over `(io_type, vector)` pairs in monitored order.
    pub fn iter(&self) -> impl Iterator<Item = (IoType, &ErrorVector)> {
        MONITORED.iter().copied().zip(self.vectors.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_sets_every_monitored_type() {
        let mut table = ErrorVectorTable::default();
        let opts = InjectOptions::new(InjectTarget::All, FaultKind::Failure, 3).with_queue_depth(2);
        table.set(&opts).unwrap();

        for (_, vector) in table.iter() {
            assert_eq!(vector.fault_kind, FaultKind::Failure);
            assert_eq!(vector.remaining, 3);
            assert_eq!(vector.queue_depth_threshold, 2);
        }
    }

    #[test]
    fn clear_only_zeroes_remaining() {
        let mut table = ErrorVectorTable::default();
        table
            .set(
                &InjectOptions::new(InjectTarget::Io(IoType::Read), FaultKind::CorruptData, 5)
                    .with_queue_depth(4)
                    .with_corruption(10, 0x5A),
            )
            .unwrap();
        table.set(&InjectOptions::clear()).unwrap();

        let read = table.get(IoType::Read).unwrap();
        assert_eq!(read.remaining, 0);
        assert_eq!(read.fault_kind, FaultKind::CorruptData);
        assert_eq!(read.queue_depth_threshold, 4);
        assert_eq!(read.corrupt_offset, 10);
        assert_eq!(read.corrupt_value, 0x5A);
    }

    #[test]
    fn zero_corrupt_value_is_rejected_without_mutation() {
        let mut table = ErrorVectorTable::default();
        table
            .set(&InjectOptions::new(InjectTarget::Io(IoType::Write), FaultKind::Failure, 1))
            .unwrap();
        let before = table;

        let result = table.set(&InjectOptions::new(
            InjectTarget::All,
            FaultKind::CorruptData,
            1,
        ));
        assert!(matches!(result, Err(FaultError::InvalidArgument { .. })));
        assert_eq!(table, before);
    }

    #[test]
    fn unmonitored_types_are_rejected() {
        let mut table = ErrorVectorTable::default();
        for io_type in [IoType::Reset, IoType::WriteZeroes] {
            let result = table.set(&InjectOptions::new(
                InjectTarget::Io(io_type),
                FaultKind::Failure,
                1,
            ));
            assert!(matches!(result, Err(FaultError::InvalidArgument { .. })));
            assert!(table.get(io_type).is_none());
        }
    }

    #[test]
    fn target_deserializes_from_plain_names() {
        let all: InjectTarget = serde_json::from_str("\"all\"").unwrap();
        let clear: InjectTarget = serde_json::from_str("\"clear\"").unwrap();
        let unmap: InjectTarget = serde_json::from_str("\"unmap\"").unwrap();
        assert_eq!(all, InjectTarget::All);
        assert_eq!(clear, InjectTarget::Clear);
        assert_eq!(unmap, InjectTarget::Io(IoType::Unmap));
    }
}
