use logai_core::StreamEvent;
use logai_logging::logai_debug;

/// Prefix that marks an event line in the analysis stream.
pub const DATA_PREFIX: &str = "data: ";

/// Incremental decoder for newline-delimited `data: {json}` frames.
///
/// Bytes are buffered until a `\n` arrives, so frames (and multi-byte UTF-8
/// sequences) split across transport chunks are reassembled before decoding.
/// Lines without the prefix are ignored; frames whose payload does not decode
/// are dropped without affecting later frames.
#[derive(Debug, Default)]
pub struct FrameParser {
    buf: Vec<u8>,
    dropped_frames: usize,
}

impl FrameParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one transport chunk and returns every event it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.buf.extend_from_slice(chunk);
        let Some(last_newline) = self.buf.iter().rposition(|byte| *byte == b'\n') else {
            return Vec::new();
        };
        let complete: Vec<u8> = self.buf.drain(..=last_newline).collect();
        complete
            .split(|byte| *byte == b'\n')
            .filter_map(|line| self.decode_line(line))
            .collect()
    }

    pub fn push_str(&mut self, text: &str) -> Vec<StreamEvent> {
        self.push(text.as_bytes())
    }

    /// Number of `data: ` frames dropped because their payload was malformed.
    pub fn dropped_frames(&self) -> usize {
        self.dropped_frames
    }

    /// Bytes held back waiting for a terminating newline.
    pub fn buffered_len(&self) -> usize {
        self.buf.len()
    }

    /// Ends the stream. An unterminated trailing line is not a frame and is
    /// discarded; returns how many bytes were dropped.
    pub fn finish(self) -> usize {
        if !self.buf.is_empty() {
            logai_debug!(
                "discarding {} unterminated bytes at end of stream",
                self.buf.len()
            );
        }
        self.buf.len()
    }

    fn decode_line(&mut self, line: &[u8]) -> Option<StreamEvent> {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        let payload = line.strip_prefix(DATA_PREFIX.as_bytes())?;
        match serde_json::from_slice::<StreamEvent>(payload) {
            Ok(event) => Some(event),
            Err(err) => {
                self.dropped_frames += 1;
                logai_debug!(
                    "dropping malformed frame ({} bytes): {}",
                    payload.len(),
                    err
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::FrameParser;

    #[test]
    fn partial_line_waits_for_newline() {
        let mut parser = FrameParser::new();
        assert!(parser.push_str("data: {\"stage\":\"prep").is_empty());
        assert_eq!(parser.buffered_len(), "data: {\"stage\":\"prep".len());

        let events = parser.push_str("rocessing\"}\n");
        assert_eq!(events.len(), 1);
        assert_eq!(parser.buffered_len(), 0);
    }

    #[test]
    fn crlf_line_endings_are_accepted() {
        let mut parser = FrameParser::new();
        let events = parser.push_str("data: {\"stage\":\"chunking\"}\r\n\r\n");
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn finish_reports_discarded_tail() {
        let mut parser = FrameParser::new();
        parser.push_str("data: {\"stage\":\"complete\"}");
        assert_eq!(parser.finish(), "data: {\"stage\":\"complete\"}".len());
    }
}
