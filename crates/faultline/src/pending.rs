//! Requests held indefinitely until a device reset.

use std::collections::VecDeque;
use std::fmt;

use faultline_io::{BlockIo, IoCompletion, IoStatus};

/// A held request together with the completion owed to its submitter.
pub struct PendingIo {
    pub io: BlockIo,
    pub completion: IoCompletion,
}

impl PendingIo {
    /// Resolves the held request.
    pub fn complete(self, status: IoStatus) {
        (self.completion)(self.io, status);
    }
}

impl fmt::Debug for PendingIo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingIo")
            .field("io_type", &self.io.io_type)
            .field("offset_blocks", &self.io.offset_blocks)
            .field("num_blocks", &self.io.num_blocks)
            .finish_non_exhaustive()
    }
}

/// FIFO of held requests owned by one device.
#[derive(Debug, Default)]
pub struct PendingQueue {
    ios: VecDeque<PendingIo>,
}

impl PendingQueue {
    pub fn push(&mut self, io: BlockIo, completion: IoCompletion) {
        self.ios.push_back(PendingIo { io, completion });
    }

    /// Removes every held request, oldest first.
    ///
    /// The caller completes them after releasing any lock guarding the queue.
    pub fn drain(&mut self) -> Vec<PendingIo> {
        self.ios.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.ios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ios.is_empty()
    }
}
