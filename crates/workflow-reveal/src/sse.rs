//! Event-stream framing: splitting a byte stream into frames and reading the
//! `event:`/`data:`/`id:` fields of each frame.

/// Event name used when a frame carries no `event:` line.
pub const DEFAULT_EVENT: &str = "message";

/// One parsed event frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedEvent {
    /// Event name (`message` when absent).
    pub event: String,
    /// All `data:` lines, trimmed and joined with `\n`.
    pub data: String,
    /// Last `id:` value. Tolerated but unused by the pipeline.
    pub id: Option<String>,
}

/// Incremental splitter for blank-line delimited frames.
///
/// Bytes are buffered until a delimiter is seen; the trailing fragment stays
/// in the buffer for the next read. Delimiters are ASCII, so a complete
/// frame never ends inside a multi-byte UTF-8 sequence.
#[derive(Debug, Default)]
pub struct FrameSplitter {
    buf: Vec<u8>,
}

impl FrameSplitter {
    /// Appends a chunk and returns every frame it completed, in order.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<String> {
        // Bytes already buffered held no complete delimiter; only the last
        // three can start one that this chunk finishes.
        let mut from = self.buf.len().saturating_sub(MAX_DELIMITER_LEN - 1);
        self.buf.extend_from_slice(chunk);
        let mut frames = Vec::new();
        while let Some((idx, delim_len)) = find_frame_delimiter(&self.buf, from) {
            let frame = String::from_utf8_lossy(&self.buf[..idx]).into_owned();
            self.buf.drain(..idx + delim_len);
            frames.push(frame);
            from = 0;
        }
        frames
    }

    /// Consumes the splitter at end of stream, returning the trailing
    /// fragment as a last frame when it is non-empty.
    pub fn finish(self) -> Option<String> {
        if self.buf.is_empty() {
            None
        } else {
            Some(String::from_utf8_lossy(&self.buf).into_owned())
        }
    }

    /// Number of bytes waiting for a delimiter.
    pub fn buffered_len(&self) -> usize {
        self.buf.len()
    }
}

/// Longest delimiter, `\r\n\r\n`.
const MAX_DELIMITER_LEN: usize = 4;

/// Finds the first blank line at or after `from`: a line feed, an optional
/// carriage return and a second line feed. Returns its start index and length.
fn find_frame_delimiter(buf: &[u8], from: usize) -> Option<(usize, usize)> {
    let mut i = from;
    while i < buf.len() {
        let start = i;
        let mut j = i;
        if buf[j] == b'\r' {
            j += 1;
        }
        if j < buf.len() && buf[j] == b'\n' {
            j += 1;
            if j < buf.len() && buf[j] == b'\r' {
                j += 1;
            }
            if j < buf.len() && buf[j] == b'\n' {
                return Some((start, j + 1 - start));
            }
        }
        i += 1;
    }
    None
}

/// Parses one frame into an event.
///
/// Returns `None` for frames whose trimmed content is empty; such frames are
/// skipped rather than dispatched as empty `message` events.
pub fn parse_frame(frame: &str) -> Option<ParsedEvent> {
    if frame.trim().is_empty() {
        return None;
    }
    let mut event: Option<String> = None;
    let mut id: Option<String> = None;
    let mut data_lines: Vec<&str> = Vec::new();
    for raw_line in frame.split('\n') {
        let line = raw_line.strip_suffix('\r').unwrap_or(raw_line);
        if let Some(rest) = line.strip_prefix("event:") {
            event = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("id:") {
            id = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("data:") {
            data_lines.push(rest.trim());
        }
    }
    Some(ParsedEvent {
        event: event.unwrap_or_else(|| DEFAULT_EVENT.to_string()),
        data: data_lines.join("\n"),
        id,
    })
}
