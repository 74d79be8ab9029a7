//! Helpers for newline-delimited JSON streaming responses.
//!
//! Network chunks do not respect line boundaries (or UTF-8 boundaries), so
//! bytes are buffered until a full line is available.

// ─────────────────────────────────────────────────────────────────────────────
// Line Buffering
// ─────────────────────────────────────────────────────────────────────────────

/// Accumulates raw bytes and hands out complete, non-empty lines.
#[derive(Debug, Default)]
pub struct NdjsonLineBuffer {
    pending: Vec<u8>,
}

impl NdjsonLineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every line it completed.
    ///
    /// Splitting happens on the `\n` byte, which never occurs inside a
    /// multi-byte UTF-8 sequence, so partial characters stay buffered.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&line);
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                lines.push(trimmed.to_string());
            }
        }
        lines
    }

    /// Return whatever is left once the stream has closed.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = String::from_utf8_lossy(&self.pending).trim().to_string();
        self.pending.clear();
        if rest.is_empty() {
            None
        } else {
            Some(rest)
        }
    }
}
