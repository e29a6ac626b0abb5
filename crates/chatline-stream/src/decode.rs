//! Incremental text decoding for chunked response bodies

/// Stateful UTF-8 decoder.
///
/// Chunks from the network are not aligned to character boundaries, so an
/// incomplete multi-byte sequence at the end of a chunk is held back until
/// the next chunk completes it. Invalid bytes decode to U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode as much of `chunk` (plus held-back bytes) as possible
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);

        let mut out = String::with_capacity(self.pending.len());
        let mut consumed = 0;

        loop {
            match std::str::from_utf8(&self.pending[consumed..]) {
                Ok(valid) => {
                    out.push_str(valid);
                    consumed = self.pending.len();
                    break;
                }
                Err(e) => {
                    let valid_end = consumed + e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[consumed..valid_end]));
                    consumed = valid_end;
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            consumed += len;
                        }
                        // Truncated sequence at the end: wait for more bytes
                        None => break,
                    }
                }
            }
        }

        self.pending.drain(..consumed);
        out
    }

    /// Flush whatever is still held back at end of stream
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            return String::new();
        }
        let rest = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        rest
    }

    /// Number of bytes waiting for the rest of a character
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

/// Splits decoded text into lines, carrying a partial trailing line over to
/// the next push.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buffer: String,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append text and return every line it completed, without terminators.
    pub fn push(&mut self, text: &str) -> Vec<String> {
        self.buffer.push_str(text);

        let Some(last_newline) = self.buffer.rfind('\n') else {
            return Vec::new();
        };

        let rest = self.buffer.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.buffer, rest);

        complete[..last_newline]
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
            .collect()
    }

    /// Take the unterminated trailing line, if any
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let line = std::mem::take(&mut self.buffer);
        Some(match line.strip_suffix('\r') {
            Some(stripped) => stripped.to_string(),
            None => line,
        })
    }

    /// The partial line currently held
    pub fn partial(&self) -> &str {
        &self.buffer
    }
}
