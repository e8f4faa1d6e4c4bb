//! Newline-delimited reassembly of the relay's byte stream
//!
//! The server forwards raw chunks, so one read can hold half a message or
//! several messages at once. Bytes are buffered here until a newline closes
//! the line.

/// Buffers received bytes and yields complete lines
#[derive(Debug, Default)]
pub struct LineAssembler {
    pending: Vec<u8>,
}

impl LineAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a received chunk and returns every line it completed, without
    /// line terminators. Invalid UTF-8 is replaced rather than rejected.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(newline) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=newline).collect();
            lines.push(Self::decode(&line[..newline]));
        }
        lines
    }

    /// Takes whatever is left after the stream ended
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        Some(Self::decode(&rest))
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    fn decode(bytes: &[u8]) -> String {
        let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
        String::from_utf8_lossy(bytes).into_owned()
    }
}
