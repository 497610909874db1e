//! Single-byte payload corruption.

/// XORs the byte at logical `offset` of a segmented payload with `value`.
///
/// Segments are walked in order, subtracting each segment's length from the
/// offset until the segment containing it is found. At most one byte is
/// changed. An empty payload or an offset past the end is a no-op.
///
/// Returns true if a byte was changed.
pub fn corrupt_payload<S: AsMut<[u8]>>(segments: &mut [S], offset: u64, value: u8) -> bool {
    let mut remaining = offset;
    for segment in segments.iter_mut() {
        let buf = segment.as_mut();
        let len = buf.len() as u64;
        if len > remaining {
            buf[remaining as usize] ^= value;
            return true;
        }
        remaining -= len;
    }
    false
}
