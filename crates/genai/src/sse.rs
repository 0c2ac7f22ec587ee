/// Incremental reader for a `text/event-stream` body, reduced to the `data:`
/// payloads chat endpoints emit. Bytes are buffered until a complete line is
/// available, so a UTF-8 sequence split across network chunks never reaches
/// string conversion.
#[derive(Debug, Default)]
pub struct SseReader {
    buffer: Vec<u8>,
    data: String,
    has_data: bool,
}

impl SseReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one network chunk, returning the data payload of every event the
    /// chunk completed. Multi-line data fields are joined with newlines.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);
            if line.is_empty() {
                if self.has_data {
                    events.push(self.take_event());
                }
            } else {
                self.accept_line(line);
            }
        }

        events
    }

    /// Dispatch whatever is still pending once the stream ends.
    pub fn flush(&mut self) -> Option<String> {
        if !self.buffer.is_empty() {
            let tail = std::mem::take(&mut self.buffer);
            let line = String::from_utf8_lossy(&tail);
            let line = line.trim_end_matches('\r');
            if !line.is_empty() {
                let owned = line.to_string();
                self.accept_line(&owned);
            }
        }
        if self.has_data {
            Some(self.take_event())
        } else {
            None
        }
    }

    fn accept_line(&mut self, line: &str) {
        if line.starts_with(':') {
            // keep-alive comment
            return;
        }
        let Some((field, value)) = line.split_once(':') else {
            return;
        };
        if field != "data" {
            // event/id/retry fields carry nothing for chat completions
            return;
        }
        let value = value.strip_prefix(' ').unwrap_or(value);
        if self.has_data {
            self.data.push('\n');
        }
        self.data.push_str(value);
        self.has_data = true;
    }

    fn take_event(&mut self) -> String {
        self.has_data = false;
        std::mem::take(&mut self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_event() {
        let mut reader = SseReader::new();
        let events = reader.feed(b"data: hello\n\n");
        assert_eq!(events, vec!["hello".to_string()]);
    }

    #[test]
    fn multiline_data_joined() {
        let mut reader = SseReader::new();
        let events = reader.feed(b"data: line1\ndata: line2\n\n");
        assert_eq!(events, vec!["line1\nline2".to_string()]);
    }

    #[test]
    fn event_split_across_chunks() {
        let mut reader = SseReader::new();
        assert!(reader.feed(b"data: hel").is_empty());
        assert!(reader.feed(b"lo\n").is_empty());
        assert_eq!(reader.feed(b"\n"), vec!["hello".to_string()]);
    }

    #[test]
    fn utf8_split_across_chunks() {
        // Snowman is three bytes: E2 98 83.
        let mut reader = SseReader::new();
        assert!(reader.feed(b"data: \xE2").is_empty());
        assert_eq!(reader.feed(b"\x98\x83\n\n"), vec!["☃".to_string()]);
    }

    #[test]
    fn crlf_lines() {
        let mut reader = SseReader::new();
        let events = reader.feed(b"data: hello\r\n\r\n");
        assert_eq!(events, vec!["hello".to_string()]);
    }

    #[test]
    fn comments_and_foreign_fields_ignored() {
        let mut reader = SseReader::new();
        let events = reader.feed(b": keepalive\nevent: delta\ndata: payload\n\n");
        assert_eq!(events, vec!["payload".to_string()]);
    }

    #[test]
    fn flush_emits_trailing_event() {
        let mut reader = SseReader::new();
        assert!(reader.feed(b"data: last").is_empty());
        assert_eq!(reader.flush(), Some("last".to_string()));
        assert_eq!(reader.flush(), None);
    }

    #[test]
    fn multiple_events_in_one_chunk() {
        let mut reader = SseReader::new();
        let events = reader.feed(b"data: first\n\ndata: [DONE]\n\n");
        assert_eq!(events, vec!["first".to_string(), "[DONE]".to_string()]);
    }
}
