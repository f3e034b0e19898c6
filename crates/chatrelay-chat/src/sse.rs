//! Incremental server-sent-events reader.
//!
//! Network reads can split a line (or a UTF-8 sequence) anywhere, so bytes
//! are buffered until a full line is available.

/// Buffers raw body bytes and yields the payload of each complete `data:` line.
#[derive(Debug, Default)]
pub struct SseBuffer {
    buffer: Vec<u8>,
}

impl SseBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a network read and return every data payload it completed.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut payloads = Vec::new();
        while let Some(line_end) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=line_end).collect();
            if let Some(data) = data_payload(&line) {
                payloads.push(data);
            }
        }
        payloads
    }

    /// Flush a final line that arrived without a trailing newline.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buffer);
        data_payload(&rest)
    }
}

fn data_payload(line: &[u8]) -> Option<String> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim();

    // Blank lines separate events; `:` starts a comment.
    if line.is_empty() || line.starts_with(':') {
        return None;
    }

    line.strip_prefix("data:")
        .map(|data| data.trim_start().to_string())
}
