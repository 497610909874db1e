//! Scatter-gather payloads.
//!
//! A block request carries its data as an ordered list of buffer segments
//! rather than one contiguous buffer. Callers may split a logical payload
//! at arbitrary byte boundaries; consumers address it by logical offset.

use bytes::BytesMut;

/// An ordered list of buffer segments describing one request payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IoVecs {
    segments: Vec<BytesMut>,
}

impl IoVecs {
    /// Creates an empty payload (used by flush, unmap and reset requests).
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps existing segments.
    pub fn from_segments(segments: Vec<BytesMut>) -> Self {
        Self { segments }
    }

    /// Creates a zeroed payload split into segments of the given lengths.
    pub fn zeroed(lengths: &[usize]) -> Self {
        Self {
            segments: lengths.iter().map(|&len| BytesMut::zeroed(len)).collect(),
        }
    }

    /// Creates a single-segment payload holding a copy of `data`.
    pub fn from_slice(data: &[u8]) -> Self {
        Self {
            segments: vec![BytesMut::from(data)],
        }
    }

    /// Splits `data` into segments of the given lengths.
    ///
    /// The final segment absorbs any bytes left over after the listed lengths.
    pub fn split(data: &[u8], lengths: &[usize]) -> Self {
        let mut segments = Vec::with_capacity(lengths.len() + 1);
        let mut rest = data;
        for &len in lengths {
            let take = len.min(rest.len());
            segments.push(BytesMut::from(&rest[..take]));
            rest = &rest[take..];
        }
        if !rest.is_empty() {
            segments.push(BytesMut::from(rest));
        }
        Self { segments }
    }

    /// Returns the segments in order.
    pub fn segments(&self) -> &[BytesMut] {
        &self.segments
    }

    /// Returns the segments mutably, in order.
    pub fn segments_mut(&mut self) -> &mut [BytesMut] {
        &mut self.segments
    }

    /// Number of segments.
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Total payload length in bytes across all segments.
    pub fn len(&self) -> usize {
        self.segments.iter().map(BytesMut::len).sum()
    }

    /// Returns true if there are no addressable bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Gathers all segments into one contiguous buffer.
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len());
        for segment in &self.segments {
            out.extend_from_slice(segment);
        }
        out
    }

    /// Scatters `data` across the segments in order.
    ///
    /// Copies `min(data.len(), self.len())` bytes and returns that count.
    pub fn scatter_from(&mut self, data: &[u8]) -> usize {
        let mut copied = 0;
        for segment in &mut self.segments {
            if copied == data.len() {
                break;
            }
            let take = segment.len().min(data.len() - copied);
            segment[..take].copy_from_slice(&data[copied..copied + take]);
            copied += take;
        }
        copied
    }
}

impl From<Vec<u8>> for IoVecs {
    fn from(data: Vec<u8>) -> Self {
        Self {
            segments: vec![BytesMut::from(&data[..])],
        }
    }
}

/// Rounds `value` up to the nearest multiple of `block_size`.
pub fn round_up_to_block(value: usize, block_size: usize) -> usize {
    debug_assert!(block_size > 0, "block size must be positive");
    value.div_ceil(block_size) * block_size
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_keeps_remainder_in_last_segment() {
        let data: Vec<u8> = (0..10).collect();
        let iovs = IoVecs::split(&data, &[3, 4]);
        assert_eq!(iovs.segment_count(), 3);
        assert_eq!(&iovs.segments()[0][..], &[0, 1, 2]);
        assert_eq!(&iovs.segments()[1][..], &[3, 4, 5, 6]);
        assert_eq!(&iovs.segments()[2][..], &[7, 8, 9]);
        assert_eq!(iovs.to_vec(), data);
    }

    #[test]
    fn scatter_fills_segments_in_order() {
        let mut iovs = IoVecs::zeroed(&[2, 0, 3]);
        let copied = iovs.scatter_from(b"abcdefg");
        assert_eq!(copied, 5);
        assert_eq!(iovs.to_vec(), b"abcde");
    }

    #[test]
    fn empty_payload_has_no_bytes() {
        assert!(IoVecs::new().is_empty());
        assert!(IoVecs::zeroed(&[0, 0]).is_empty());
    }

    #[test]
    fn round_up_basic() {
        assert_eq!(round_up_to_block(0, 512), 0);
        assert_eq!(round_up_to_block(1, 512), 512);
        assert_eq!(round_up_to_block(512, 512), 512);
        assert_eq!(round_up_to_block(513, 4096), 4096);
    }
}
