use serde::Deserialize;

/// One line of an Ollama `/api/generate` response stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GenerateChunk {
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub done: bool,
}

/// Incremental newline-delimited JSON decoder.
///
/// Bytes may arrive split anywhere, including inside a line or a UTF-8
/// sequence; incomplete lines stay buffered until their newline arrives.
/// Lines that do not parse are skipped.
#[derive(Debug, Default)]
pub struct NdjsonDecoder {
    buffer: Vec<u8>,
}

impl NdjsonDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) -> Vec<GenerateChunk> {
        self.buffer.extend_from_slice(bytes);
        let mut chunks = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|byte| *byte == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            if let Some(chunk) = parse_line(&line) {
                chunks.push(chunk);
            }
        }
        chunks
    }

    /// Parses whatever is left once the body ends without a trailing newline.
    pub fn finish(&mut self) -> Option<GenerateChunk> {
        let line = std::mem::take(&mut self.buffer);
        parse_line(&line)
    }
}

fn parse_line(line: &[u8]) -> Option<GenerateChunk> {
    if line.iter().all(u8::is_ascii_whitespace) {
        return None;
    }
    match serde_json::from_slice(line) {
        Ok(chunk) => Some(chunk),
        Err(err) => {
            tracing::debug!(error = %err, "skipping malformed stream line");
            None
        }
    }
}
