use crate::error::IngestError;
use crate::models::Chunk;
use regex::Regex;
use std::collections::VecDeque;
use std::ops::Range;

pub const DEFAULT_CHUNK_SIZE: usize = 1_000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Break points, coarsest first. A piece ends where a match ends, so the
/// separator stays with the text before it.
const BOUNDARY_PATTERNS: [&str; 4] = [
    r"\n[ \t]*\n\s*",
    r"\n",
    r#"[.!?]["')\]]*\s+"#,
    r"\s+",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    pub max_chars: usize,
    pub overlap_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_CHUNK_SIZE,
            overlap_chars: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl ChunkingConfig {
    pub fn new(max_chars: usize, overlap_chars: usize) -> Self {
        Self {
            max_chars,
            overlap_chars,
        }
    }

    pub fn validate(&self) -> Result<(), IngestError> {
        if self.max_chars == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "chunk size must be greater than zero".to_string(),
            ));
        }
        if self.overlap_chars >= self.max_chars {
            return Err(IngestError::InvalidChunkConfig(format!(
                "overlap {} must be smaller than chunk size {}",
                self.overlap_chars, self.max_chars
            )));
        }
        Ok(())
    }
}

/// Splits text into overlapping windows, breaking at paragraphs, then lines,
/// then sentence ends, then whitespace, and only cutting inside a word when a
/// single word is longer than the window.
#[derive(Debug, Clone)]
pub struct RecursiveSplitter {
    config: ChunkingConfig,
    boundaries: Vec<Regex>,
}

impl RecursiveSplitter {
    pub fn new(config: ChunkingConfig) -> Result<Self, IngestError> {
        config.validate()?;
        let boundaries = BOUNDARY_PATTERNS
            .iter()
            .map(|pattern| Regex::new(pattern))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { config, boundaries })
    }

    pub fn config(&self) -> ChunkingConfig {
        self.config
    }

    /// Byte ranges of each chunk in `text`. Ranges are ordered, never leave a
    /// gap, and consecutive ranges share at most `overlap_chars` characters.
    pub fn split_spans(&self, text: &str) -> Vec<Range<usize>> {
        if text.is_empty() {
            return Vec::new();
        }

        let mut pieces = Vec::new();
        self.collect_pieces(text, 0..text.len(), 0, &mut pieces);
        self.merge_pieces(text, &pieces)
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        self.split_spans(text)
            .into_iter()
            .map(|span| text[span].to_string())
            .collect()
    }

    /// Chunks ready for indexing. Windows holding nothing but whitespace are
    /// skipped; ids stay sequential over the chunks that remain.
    pub fn build_chunks(&self, text: &str, source: &str) -> Vec<Chunk> {
        self.split(text)
            .into_iter()
            .filter(|chunk| !chunk.trim().is_empty())
            .enumerate()
            .map(|(index, text)| Chunk {
                text,
                source: source.to_string(),
                chunk_id: index as u64,
            })
            .collect()
    }

    fn collect_pieces(
        &self,
        text: &str,
        range: Range<usize>,
        level: usize,
        out: &mut Vec<Range<usize>>,
    ) {
        let segment = &text[range.clone()];
        if char_len(segment) <= self.config.max_chars {
            out.push(range);
            return;
        }

        let Some(boundary) = self.boundaries.get(level) else {
            hard_cut(text, range, self.config.max_chars, out);
            return;
        };

        let mut start = range.start;
        for found in boundary.find_iter(segment) {
            let end = range.start + found.end();
            if end > start {
                self.collect_pieces(text, start..end, level + 1, out);
                start = end;
            }
        }
        if start < range.end {
            self.collect_pieces(text, start..range.end, level + 1, out);
        }
    }

    fn merge_pieces(&self, text: &str, pieces: &[Range<usize>]) -> Vec<Range<usize>> {
        let max = self.config.max_chars;
        let overlap = self.config.overlap_chars;

        let mut spans = Vec::new();
        let mut window: VecDeque<(Range<usize>, usize)> = VecDeque::new();
        let mut window_chars = 0usize;

        for piece in pieces {
            let piece_chars = char_len(&text[piece.clone()]);

            if window_chars + piece_chars > max && !window.is_empty() {
                if let Some(span) = window_span(&window) {
                    spans.push(span);
                }
                while window_chars > overlap || (window_chars + piece_chars > max && window_chars > 0)
                {
                    match window.pop_front() {
                        Some((_, dropped)) => window_chars -= dropped,
                        None => break,
                    }
                }
            }

            window.push_back((piece.clone(), piece_chars));
            window_chars += piece_chars;
        }

        if let Some(span) = window_span(&window) {
            spans.push(span);
        }

        spans
    }
}

fn window_span(window: &VecDeque<(Range<usize>, usize)>) -> Option<Range<usize>> {
    let first = window.front()?;
    let last = window.back()?;
    Some(first.0.start..last.0.end)
}

fn hard_cut(text: &str, range: Range<usize>, max_chars: usize, out: &mut Vec<Range<usize>>) {
    let segment = &text[range.clone()];
    let mut start = range.start;
    let mut count = 0usize;

    for (offset, _) in segment.char_indices() {
        if count == max_chars {
            out.push(start..range.start + offset);
            start = range.start + offset;
            count = 0;
        }
        count += 1;
    }

    if start < range.end {
        out.push(start..range.end);
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}
