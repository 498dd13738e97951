//! Line-level SSE handling shared by both hops of the relay: the upstream
//! reader and the client-side stream consumer feed raw transport chunks
//! through [`SseLineBuffer`] so that a frame split across chunk boundaries
//! (including mid-UTF-8) still comes out as one complete line.

/// Prefix marking a significant SSE line. Everything else (blank keep-alive
/// lines, comments) is ignored.
pub const DATA_PREFIX: &str = "data: ";

/// Terminal marker some upstreams append after the last event.
pub const DONE_MARKER: &str = "[DONE]";

/// Accumulates raw bytes and yields complete, newline-terminated lines.
/// Partial trailing data is carried over until the next chunk closes it.
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    buf: Vec<u8>,
}

impl SseLineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one transport chunk and returns the lines it completed, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            // Decoding only complete lines keeps multi-byte characters that
            // straddle a chunk boundary intact.
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        lines
    }
}

/// Returns the payload of a `data: ` line, or `None` for any other line.
pub fn data_payload(line: &str) -> Option<&str> {
    line.strip_prefix(DATA_PREFIX)
}

/// Formats one outbound relay frame: `data: {"delta": <text>}\n\n`.
pub fn delta_frame(delta: &str) -> String {
    format!("data: {}\n\n", serde_json::json!({ "delta": delta }))
}
