//! Splitting extracted documents into retrieval-sized chunks.

use crate::document::{Chunk, Document};

/// A strategy for splitting documents into chunks.
///
/// Implementations produce [`Chunk`]s with text and metadata only;
/// embeddings and identity are attached later by the ingestion pipeline.
pub trait Chunker: Send + Sync {
    /// Split a document into ordered chunks.
    ///
    /// Returns an empty `Vec` if the document text is empty.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;
}

/// Splits text hierarchically: paragraphs, then sentences, then words.
///
/// Segments are merged greedily up to `chunk_size` characters; a segment
/// that still exceeds the target after the last separator level is cut into
/// overlapping character windows. Each chunk inherits the parent document's
/// metadata plus a `chunk_index` entry.
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

const SEPARATORS: [&str; 5] = ["\n\n", ". ", "! ", "? ", " "];

impl RecursiveChunker {
    /// Create a chunker with the given target size and overlap, in characters.
    ///
    /// `chunk_overlap` must be smaller than `chunk_size`; configuration
    /// validation enforces this before a chunker is built.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size, chunk_overlap }
    }

    fn split(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let Some((separator, rest)) = separators.split_first() else {
            return self.split_window(text);
        };
        if text.len() <= self.chunk_size {
            return vec![text.to_string()];
        }

        let segments: Vec<&str> = if *separator == " " {
            text.split_inclusive(' ').collect()
        } else {
            split_after(text, separator)
        };

        let mut chunks = Vec::new();
        let mut current = String::new();
        for segment in segments {
            if !current.is_empty() && current.len() + segment.len() > self.chunk_size {
                self.flush(&mut chunks, std::mem::take(&mut current), rest);
            }
            current.push_str(segment);
        }
        self.flush(&mut chunks, current, rest);
        chunks
    }

    fn flush(&self, chunks: &mut Vec<String>, segment: String, rest: &[&str]) {
        if segment.is_empty() {
            return;
        }
        if segment.len() > self.chunk_size {
            chunks.extend(self.split(&segment, rest));
        } else {
            chunks.push(segment);
        }
    }

    /// Last-resort splitting into overlapping character windows.
    ///
    /// Window edges are snapped to char boundaries so multibyte text never
    /// panics; lengths are therefore approximate in bytes, exact in chars.
    fn split_window(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }

        let step = self.chunk_size.saturating_sub(self.chunk_overlap).max(1);
        let mut chunks = Vec::new();
        let mut start = 0;
        while start < text.len() {
            let end = floor_boundary(text, (start + self.chunk_size).min(text.len()));
            let end = if end <= start { ceil_boundary(text, start + 1) } else { end };
            chunks.push(text[start..end].to_string());
            if end == text.len() {
                break;
            }
            start = ceil_boundary(text, start + step);
        }
        chunks
    }
}

/// Split at each occurrence of `separator`, keeping it attached to the
/// preceding segment.
fn split_after<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let mut segments = Vec::new();
    let mut start = 0;
    while let Some(position) = text[start..].find(separator) {
        let end = start + position + separator.len();
        segments.push(&text[start..end]);
        start = end;
    }
    if start < text.len() {
        segments.push(&text[start..]);
    }
    segments
}

fn floor_boundary(text: &str, mut index: usize) -> usize {
    while index > 0 && !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn ceil_boundary(text: &str, mut index: usize) -> usize {
    while index < text.len() && !text.is_char_boundary(index) {
        index += 1;
    }
    index.min(text.len())
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        if document.text.is_empty() {
            return Vec::new();
        }

        self.split(&document.text, &SEPARATORS)
            .into_iter()
            .filter(|text| !text.trim().is_empty())
            .enumerate()
            .map(|(index, text)| {
                let mut metadata = document.metadata.clone();
                metadata.insert("chunk_index".to_string(), index.to_string());
                Chunk { text, metadata }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> Document {
        Document::new(text, "test.txt")
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunker = RecursiveChunker::new(100, 20);
        let chunks = chunker.chunk(&doc("just a short note"));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "just a short note");
        assert_eq!(chunks[0].metadata["chunk_index"], "0");
        assert_eq!(chunks[0].metadata["source"], "test.txt");
    }

    #[test]
    fn empty_document_yields_no_chunks() {
        let chunker = RecursiveChunker::new(100, 20);
        assert!(chunker.chunk(&doc("")).is_empty());
    }

    #[test]
    fn paragraphs_are_preferred_split_points() {
        let text = format!("{}\n\n{}", "a".repeat(60), "b".repeat(60));
        let chunker = RecursiveChunker::new(80, 10);
        let chunks = chunker.chunk(&doc(&text));
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].text.starts_with('a'));
        assert!(chunks[1].text.starts_with('b'));
    }

    #[test]
    fn chunk_indices_are_sequential() {
        let text = "word ".repeat(200);
        let chunker = RecursiveChunker::new(50, 10);
        let chunks = chunker.chunk(&doc(&text));
        assert!(chunks.len() > 1);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.metadata["chunk_index"], i.to_string());
        }
    }

    #[test]
    fn windowed_split_covers_all_text_with_overlap() {
        // A single unbroken token forces character windowing.
        let text = "x".repeat(250);
        let chunker = RecursiveChunker::new(100, 20);
        let chunks = chunker.chunk(&doc(&text));
        // step = 100 - 20 = 80: windows [0,100), [80,180), [160,250)
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].text.len(), 100);
        assert_eq!(chunks[1].text.len(), 100);
        assert_eq!(chunks[2].text.len(), 90);
    }

    #[test]
    fn multibyte_text_never_splits_inside_a_char() {
        let text = "é".repeat(300);
        let chunker = RecursiveChunker::new(100, 20);
        let chunks = chunker.chunk(&doc(&text));
        assert!(!chunks.is_empty());
        for chunk in chunks {
            assert!(chunk.text.chars().all(|c| c == 'é'));
        }
    }
}
