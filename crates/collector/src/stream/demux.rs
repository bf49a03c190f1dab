//! Multiplexed-stream header stripping.
//!
//! Containers attached without a TTY interleave stdout/stderr on one
//! channel using an 8-byte frame header: one stream-type tag byte (0, 1 or
//! 2), three reserved zero bytes, and a 4-byte big-endian payload length.
//! Headers are recognized structurally, never by position — reads split
//! frames at arbitrary offsets, so the scan is byte-by-byte and a partial
//! header candidate at the end of a read is carried into the next one.
//!
//! A candidate whose length field is implausible is passed through as
//! ordinary content: a false-positive match must never truncate real log
//! data.

pub const FRAME_HEADER_LEN: usize = 8;

/// Upper bound on a believable frame payload. Lengths beyond this mark the
/// candidate as ordinary bytes.
const MAX_FRAME_PAYLOAD: u32 = 8 * 1024 * 1024;

/// Stateful header stripper; one per stream.
#[derive(Debug, Default)]
pub struct FrameStripper {
    carry: Vec<u8>,
}

impl FrameStripper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Strip every recognized frame header from `chunk` (plus any carried
    /// bytes from the previous read) and return the cleaned content bytes.
    pub fn strip(&mut self, chunk: &[u8]) -> Vec<u8> {
        let mut buf = std::mem::take(&mut self.carry);
        buf.extend_from_slice(chunk);

        let mut out = Vec::with_capacity(buf.len());
        let mut i = 0;
        while i < buf.len() {
            if is_header_prefix(&buf[i..]) {
                if buf.len() - i >= FRAME_HEADER_LEN {
                    if is_header(&buf[i..i + FRAME_HEADER_LEN]) {
                        i += FRAME_HEADER_LEN;
                    } else {
                        out.push(buf[i]);
                        i += 1;
                    }
                } else {
                    // Could be a header split across reads — hold it back.
                    break;
                }
            } else {
                out.push(buf[i]);
                i += 1;
            }
        }
        self.carry = buf.split_off(i);
        out
    }

    /// Flush any held-back bytes at stream end. A dangling partial
    /// candidate was not a header after all and passes through as content.
    pub fn finish(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.carry)
    }
}

/// True when the available bytes are consistent with the start of a frame
/// header (tag byte then zero bytes, as far as the data reaches).
fn is_header_prefix(bytes: &[u8]) -> bool {
    match bytes.first() {
        Some(0) | Some(1) | Some(2) => {}
        _ => return false,
    }
    bytes
        .iter()
        .take(4)
        .skip(1)
        .all(|&b| b == 0)
}

fn is_header(header: &[u8]) -> bool {
    debug_assert_eq!(header.len(), FRAME_HEADER_LEN);
    if !matches!(header[0], 0 | 1 | 2) || header[1..4] != [0, 0, 0] {
        return false;
    }
    let len = u32::from_be_bytes([header[4], header[5], header[6], header[7]]);
    len > 0 && len <= MAX_FRAME_PAYLOAD
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Re-multiplex a payload the way the container runtime does.
    fn frame(tag: u8, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(FRAME_HEADER_LEN + payload.len());
        out.push(tag);
        out.extend_from_slice(&[0, 0, 0]);
        out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn test_plain_bytes_untouched() {
        let mut stripper = FrameStripper::new();
        let out = stripper.strip(b"no frames here\n");
        assert_eq!(out, b"no frames here\n");
        assert!(stripper.finish().is_empty());
    }

    #[test]
    fn test_single_frame_stripped() {
        let mut stripper = FrameStripper::new();
        let out = stripper.strip(&frame(1, b"hello world\n"));
        assert_eq!(out, b"hello world\n");
    }

    #[test]
    fn test_round_trip_multi_frame() {
        let lines = ["first line\n", "second line\n", "third line\n"];
        let mut wire = Vec::new();
        for (i, line) in lines.iter().enumerate() {
            wire.extend_from_slice(&frame((i % 2 + 1) as u8, line.as_bytes()));
        }

        let mut stripper = FrameStripper::new();
        let out = stripper.strip(&wire);
        assert_eq!(out, lines.concat().as_bytes());
        assert!(stripper.finish().is_empty());
    }

    #[test]
    fn test_read_split_exactly_at_header_boundary() {
        let first = frame(1, b"alpha\n");
        let second = frame(2, b"beta\n");
        let mut wire = first.clone();
        wire.extend_from_slice(&second);

        // First read ends right after the second frame's 8-byte header.
        let cut = first.len() + FRAME_HEADER_LEN;
        let mut stripper = FrameStripper::new();
        let mut out = stripper.strip(&wire[..cut]);
        out.extend(stripper.strip(&wire[cut..]));
        out.extend(stripper.finish());

        assert_eq!(out, b"alpha\nbeta\n");
    }

    #[test]
    fn test_header_split_mid_header() {
        let wire = frame(1, b"payload\n");
        for cut in 1..FRAME_HEADER_LEN {
            let mut stripper = FrameStripper::new();
            let mut out = stripper.strip(&wire[..cut]);
            out.extend(stripper.strip(&wire[cut..]));
            out.extend(stripper.finish());
            assert_eq!(out, b"payload\n", "cut at {cut}");
        }
    }

    #[test]
    fn test_implausible_length_passes_through() {
        // Looks like a header but claims a 4GB payload — content, not frame.
        let mut bytes = vec![1u8, 0, 0, 0, 0xff, 0xff, 0xff, 0xff];
        bytes.extend_from_slice(b"rest");
        let mut stripper = FrameStripper::new();
        let out = stripper.strip(&bytes);
        assert_eq!(out, bytes);
    }

    #[test]
    fn test_zero_length_header_passes_through() {
        let bytes = [2u8, 0, 0, 0, 0, 0, 0, 0];
        let mut stripper = FrameStripper::new();
        // The trailing zeros stay carried as a potential header prefix
        // until EOF proves them plain content.
        let mut out = stripper.strip(&bytes);
        out.extend(stripper.finish());
        assert_eq!(out, bytes);
    }

    #[test]
    fn test_dangling_partial_candidate_flushed_at_eof() {
        let mut stripper = FrameStripper::new();
        let out = stripper.strip(&[1, 0, 0]);
        assert!(out.is_empty());
        assert_eq!(stripper.finish(), vec![1, 0, 0]);
    }

    #[test]
    fn test_header_inside_payload_text_is_not_matched() {
        // UTF-8 log text never contains NUL runs, so structural detection
        // leaves ordinary content alone.
        let text = b"tag 1 and length 42 mentioned in prose\n";
        let mut stripper = FrameStripper::new();
        assert_eq!(stripper.strip(text), text);
    }

    #[test]
    fn test_interleaved_stdout_stderr() {
        let mut wire = frame(1, b"out: ok\n");
        wire.extend_from_slice(&frame(2, b"err: boom\n"));
        wire.extend_from_slice(&frame(1, b"out: done\n"));

        let mut stripper = FrameStripper::new();
        assert_eq!(stripper.strip(&wire), b"out: ok\nerr: boom\nout: done\n");
    }
}
