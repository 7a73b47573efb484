use memchr::memchr;

/// One trimmed, non-empty line taken from a response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame(Vec<u8>);

impl Frame {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_text(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.0)
    }

    /// Lossy text for diagnostics.
    pub fn display_text(&self) -> String {
        String::from_utf8_lossy(&self.0).into_owned()
    }
}

impl From<&str> for Frame {
    fn from(value: &str) -> Self {
        Self::new(value.as_bytes())
    }
}

/// Splits arbitrarily chunked bytes into frames.
///
/// Bytes after the last newline of a chunk stay in `tail` until the next
/// `push` (or `finish`) completes the line. `tail` never contains a newline,
/// so each push only scans the bytes it appended.
#[derive(Debug, Default)]
pub struct FrameSplitter {
    tail: Vec<u8>,
}

impl FrameSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<Frame> {
        let mut frames = Vec::new();
        let Some(first) = memchr(b'\n', chunk) else {
            self.tail.extend_from_slice(chunk);
            return frames;
        };

        self.tail.extend_from_slice(&chunk[..first]);
        if let Some(frame) = trimmed_frame(&self.tail) {
            frames.push(frame);
        }
        self.tail.clear();

        let mut start = first + 1;
        while let Some(relative) = memchr(b'\n', &chunk[start..]) {
            let newline = start + relative;
            if let Some(frame) = trimmed_frame(&chunk[start..newline]) {
                frames.push(frame);
            }
            start = newline + 1;
        }

        self.tail.extend_from_slice(&chunk[start..]);
        frames
    }

    /// Flushes an unterminated final line at end of input.
    pub fn finish(&mut self) -> Option<Frame> {
        let tail = std::mem::take(&mut self.tail);
        trimmed_frame(&tail)
    }

    pub fn pending(&self) -> usize {
        self.tail.len()
    }
}

fn trimmed_frame(line: &[u8]) -> Option<Frame> {
    let trimmed = line.trim_ascii();
    if trimmed.is_empty() {
        None
    } else {
        Some(Frame::new(trimmed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn texts(frames: Vec<Frame>) -> Vec<String> {
        frames.iter().map(Frame::display_text).collect()
    }

    #[test]
    fn carries_partial_line_into_next_chunk() {
        let mut splitter = FrameSplitter::new();
        assert!(splitter.push(br#"{"done":"#).is_empty());
        assert_eq!(splitter.pending(), 8);
        assert_eq!(texts(splitter.push(b"false}\n")), vec![r#"{"done":false}"#]);
        assert_eq!(splitter.pending(), 0);
        assert!(splitter.finish().is_none());
    }

    #[test]
    fn drops_blank_lines_and_trims_crlf() {
        let mut splitter = FrameSplitter::new();
        let frames = splitter.push(b"data: one\r\n\r\n   \n  data: two  \n");
        assert_eq!(texts(frames), vec!["data: one", "data: two"]);
    }

    #[test]
    fn finish_flushes_unterminated_line() {
        let mut splitter = FrameSplitter::new();
        assert!(splitter.push(b"data: [DONE]").is_empty());
        assert_eq!(splitter.finish(), Some(Frame::from("data: [DONE]")));
        assert!(splitter.finish().is_none());
    }

    #[test]
    fn long_unterminated_line_in_small_reads() {
        let line = format!("{{\"response\":\"{}\",\"done\":true}}", "x".repeat(64 * 1024));
        let mut splitter = FrameSplitter::new();
        for piece in line.as_bytes().chunks(7) {
            assert!(splitter.push(piece).is_empty());
        }
        assert_eq!(splitter.pending(), line.len());
        assert_eq!(
            texts(splitter.push(b"\nnext")),
            vec![line.clone()]
        );
        assert_eq!(splitter.pending(), 4);
    }

    #[test]
    fn every_two_chunk_split_matches_single_chunk() {
        let input = "{\"message\":{\"content\":\"Hé\"},\"done\":false}\n\n{\"done\":true}\n";
        let bytes = input.as_bytes();

        let mut whole = FrameSplitter::new();
        let mut expected = whole.push(bytes);
        expected.extend(whole.finish());

        for offset in 0..=bytes.len() {
            let mut splitter = FrameSplitter::new();
            let mut frames = splitter.push(&bytes[..offset]);
            frames.extend(splitter.push(&bytes[offset..]));
            frames.extend(splitter.finish());
            assert_eq!(frames, expected, "split at byte {offset}");
        }
    }

    proptest! {
        #[test]
        fn arbitrary_chunking_preserves_frames(
            lines in proptest::collection::vec("[a-z{}:\" ]{0,12}", 0..8),
            cuts in proptest::collection::vec(any::<prop::sample::Index>(), 0..6),
        ) {
            let input = lines.join("\n") + "\n";
            let bytes = input.as_bytes();

            let mut whole = FrameSplitter::new();
            let mut expected = whole.push(bytes);
            expected.extend(whole.finish());

            let mut offsets: Vec<usize> = cuts.iter().map(|cut| cut.index(bytes.len() + 1)).collect();
            offsets.sort_unstable();

            let mut splitter = FrameSplitter::new();
            let mut frames = Vec::new();
            let mut last = 0;
            for offset in offsets {
                frames.extend(splitter.push(&bytes[last..offset]));
                last = offset;
            }
            frames.extend(splitter.push(&bytes[last..]));
            frames.extend(splitter.finish());

            prop_assert_eq!(frames, expected);
        }
    }
}
