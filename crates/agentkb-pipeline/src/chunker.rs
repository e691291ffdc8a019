//! Content chunking for retrieval.
//!
//! Each text unit is split on its own, so a chunk never spans two pages,
//! slides or sheets. Chunks are exact slices of their unit and consecutive
//! chunks share exactly `overlap` characters, so dropping the overlap prefix
//! of every chunk after the first and concatenating gives back the unit.

use crate::error::{PipelineError, PipelineResult};
use agentkb_config::ChunkingConfig;

/// A piece of a text unit, ready for embedding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Index of the unit this segment was cut from.
    pub unit: usize,
    pub text: String,
}

/// Content chunker for splitting text units.
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
}

impl Chunker {
    /// Create a chunker. Sizes are in characters.
    pub fn new(chunk_size: usize, overlap: usize) -> PipelineResult<Self> {
        if chunk_size == 0 {
            return Err(PipelineError::InvalidConfig(
                "chunk_size must be greater than 0".to_string(),
            ));
        }
        if overlap >= chunk_size {
            return Err(PipelineError::InvalidConfig(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn from_config(config: &ChunkingConfig) -> PipelineResult<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split every unit, in order.
    pub fn split(&self, units: &[String]) -> Vec<Segment> {
        units
            .iter()
            .enumerate()
            .flat_map(|(unit, text)| {
                self.split_text(text)
                    .into_iter()
                    .map(move |text| Segment { unit, text })
            })
            .collect()
    }

    /// Split one unit of text into overlapping chunks.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        if chars.is_empty() {
            return Vec::new();
        }
        if chars.len() <= self.chunk_size {
            return vec![text.to_string()];
        }

        let mut chunks: Vec<String> = Vec::new();
        let mut start = 0;

        loop {
            let limit = start + self.chunk_size;
            if limit >= chars.len() {
                chunks.push(chars[start..].iter().collect());
                break;
            }

            let end = self.break_point(&chars, start, limit);
            chunks.push(chars[start..end].iter().collect());
            start = end - self.overlap;
        }

        chunks
    }

    /// Choose where the chunk starting at `start` ends.
    ///
    /// The result is in `(start + overlap, limit]` so the next chunk always
    /// starts past `start`. Natural breaks are only taken from the back half
    /// of the window to avoid tiny chunks.
    fn break_point(&self, chars: &[char], start: usize, limit: usize) -> usize {
        let lowest = (start + self.overlap + 1).max(start + self.chunk_size / 2);

        let rules: [fn(&[char], usize) -> bool; 4] = [
            |c, end| end >= 2 && c[end - 2] == '\n' && c[end - 1] == '\n',
            |c, end| c[end - 1] == '\n',
            |c, end| end >= 2 && matches!(c[end - 2], '.' | '!' | '?') && c[end - 1].is_whitespace(),
            |c, end| c[end - 1].is_whitespace(),
        ];

        for rule in rules {
            if let Some(end) = (lowest..=limit).rev().find(|&end| rule(chars, end)) {
                return end;
            }
        }

        limit
    }
}

impl Default for Chunker {
    fn default() -> Self {
        let config = ChunkingConfig::default();
        Self {
            chunk_size: config.chunk_size,
            overlap: config.chunk_overlap,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reconstruct(chunks: &[String], overlap: usize) -> String {
        let mut out = String::new();
        for (i, chunk) in chunks.iter().enumerate() {
            if i == 0 {
                out.push_str(chunk);
            } else {
                out.extend(chunk.chars().skip(overlap));
            }
        }
        out
    }

    fn sample_text() -> String {
        let mut text = String::new();
        for i in 0..40 {
            text.push_str(&format!(
                "Sentence number {} talks about refunds and returns. ",
                i
            ));
            if i % 7 == 6 {
                text.push_str("\n\n");
            }
        }
        text.trim().to_string()
    }

    #[test]
    fn test_small_text_single_chunk() {
        let chunker = Chunker::default();
        let chunks = chunker.split_text("This is a small piece of text.");
        assert_eq!(chunks, vec!["This is a small piece of text.".to_string()]);
    }

    #[test]
    fn test_empty_text() {
        let chunker = Chunker::default();
        assert!(chunker.split_text("").is_empty());
        assert!(chunker.split(&[]).is_empty());
    }

    #[test]
    fn test_invalid_sizes() {
        assert!(matches!(Chunker::new(0, 0), Err(PipelineError::InvalidConfig(_))));
        assert!(matches!(Chunker::new(100, 100), Err(PipelineError::InvalidConfig(_))));
        assert!(Chunker::new(100, 99).is_ok());
    }

    #[test]
    fn test_chunks_reconstruct_unit() {
        let text = sample_text();
        for (size, overlap) in [(100, 20), (250, 0), (64, 63), (1000, 150)] {
            let chunker = Chunker::new(size, overlap).unwrap();
            let chunks = chunker.split_text(&text);

            assert!(chunks.len() > 1 || text.chars().count() <= size);
            for chunk in &chunks {
                assert!(!chunk.is_empty());
                assert!(chunk.chars().count() <= size);
            }
            assert_eq!(reconstruct(&chunks, overlap), text, "size {} overlap {}", size, overlap);
        }
    }

    #[test]
    fn test_consecutive_chunks_share_overlap() {
        let chunker = Chunker::new(120, 30).unwrap();
        let chunks = chunker.split_text(&sample_text());

        for pair in chunks.windows(2) {
            let tail: String = {
                let chars: Vec<char> = pair[0].chars().collect();
                chars[chars.len() - 30..].iter().collect()
            };
            let head: String = pair[1].chars().take(30).collect();
            assert_eq!(tail, head);
        }
    }

    #[test]
    fn test_prefers_paragraph_break() {
        let chunker = Chunker::new(60, 0).unwrap();
        let text = "First paragraph is here. It has words.\n\nSecond paragraph follows with more words.";
        let chunks = chunker.split_text(text);

        assert!(chunks[0].ends_with("\n\n"));
        assert!(chunks[1].starts_with("Second"));
    }

    #[test]
    fn test_hard_cut_without_whitespace() {
        let chunker = Chunker::new(10, 2).unwrap();
        let text = "x".repeat(25);
        let chunks = chunker.split_text(&text);

        assert_eq!(chunks[0].len(), 10);
        assert_eq!(reconstruct(&chunks, 2), text);
    }

    #[test]
    fn test_utf8_text() {
        let chunker = Chunker::new(20, 5).unwrap();
        let text = "Hello ─── World! This has unicode: 日本語 and more ─ content here.";
        let chunks = chunker.split_text(text);

        for chunk in &chunks {
            assert!(chunk.chars().count() <= 20);
        }
        assert_eq!(reconstruct(&chunks, 5), text);
    }

    #[test]
    fn test_units_are_not_merged() {
        let chunker = Chunker::new(50, 10).unwrap();
        let units = vec!["Page one text.".to_string(), "Page two text.".to_string()];
        let segments = chunker.split(&units);

        assert_eq!(
            segments,
            vec![
                Segment { unit: 0, text: "Page one text.".to_string() },
                Segment { unit: 1, text: "Page two text.".to_string() },
            ]
        );
    }

    #[test]
    fn test_deterministic() {
        let chunker = Chunker::new(90, 15).unwrap();
        let text = sample_text();
        assert_eq!(chunker.split_text(&text), chunker.split_text(&text));
    }
}
