use crate::IngestError;

pub struct TextSplitter;

impl TextSplitter {
    pub fn split(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
        if chunk_size == 0 {
            return Vec::new();
        }

        let mut chunks = Vec::new();
        let mut start = 0usize;
        let chars: Vec<char> = text.chars().collect();
        let max_overlap = chunk_size.saturating_sub(1);
        let clamped_overlap = overlap.min(max_overlap);
        let step = (chunk_size - clamped_overlap).max(1);

        while start < chars.len() {
            let end = usize::min(start + chunk_size, chars.len());
            let chunk: String = chars[start..end].iter().collect();
            chunks.push(chunk);

            if end == chars.len() {
                break;
            }

            start = start.saturating_add(step);
        }

        chunks
    }
}

/// Partitions text into paragraph elements, windowing oversized paragraphs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParagraphSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Default for ParagraphSplitter {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

impl ParagraphSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, IngestError> {
        if chunk_size == 0 {
            return Err(IngestError::InvalidChunking(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if chunk_overlap >= chunk_size {
            return Err(IngestError::InvalidChunking(format!(
                "chunk_overlap ({chunk_overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut paragraph = String::new();
        for line in text.lines().chain(std::iter::once("")) {
            if line.trim().is_empty() {
                self.flush(&mut paragraph, &mut chunks);
            } else {
                if !paragraph.is_empty() {
                    paragraph.push('\n');
                }
                paragraph.push_str(line.trim_end());
            }
        }
        chunks
    }

    fn flush(&self, paragraph: &mut String, chunks: &mut Vec<String>) {
        let text = std::mem::take(paragraph);
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        if text.chars().count() <= self.chunk_size {
            chunks.push(text.to_string());
        } else {
            chunks.extend(TextSplitter::split(text, self.chunk_size, self.chunk_overlap));
        }
    }
}
