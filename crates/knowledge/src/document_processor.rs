use mapbot_common::{MapbotError, Result};
use std::path::Path;
use tracing::debug;

pub const DEFAULT_CHUNK_SIZE: usize = 400;
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;

/// A contiguous window of whitespace-delimited words taken from a source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub source: String,
    pub index: usize,
    pub text: String,
}

/// Splits documents into overlapping word windows.
#[derive(Debug, Clone, Copy)]
pub struct DocumentProcessor {
    chunk_size: usize,
    overlap: usize,
}

impl Default for DocumentProcessor {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl DocumentProcessor {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        check_window(chunk_size, overlap)?;
        Ok(Self { chunk_size, overlap })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    pub fn chunk_document(&self, source: &str, text: &str) -> Result<Vec<Chunk>> {
        let chunks = chunk_text(text, self.chunk_size, self.overlap)?
            .into_iter()
            .enumerate()
            .map(|(index, text)| Chunk {
                source: source.to_string(),
                index,
                text,
            })
            .collect::<Vec<_>>();

        debug!("Split '{}' into {} chunks", source, chunks.len());
        Ok(chunks)
    }

    pub fn read_document(path: &Path) -> Result<String> {
        std::fs::read_to_string(path).map_err(|e| MapbotError::io(path, e))
    }
}

fn check_window(window: usize, overlap: usize) -> Result<()> {
    if window == 0 || overlap >= window {
        return Err(MapbotError::InvalidChunking { window, overlap });
    }
    Ok(())
}

/// Slides a `window`-word window over `text` with stride `window - overlap`.
///
/// Starts at word 0 and stops after the first window that reaches the last
/// word, so the last chunk may be shorter than `window` and a document of at
/// most `window` words is a single chunk. A document with no words yields no
/// chunks.
pub fn chunk_text(text: &str, window: usize, overlap: usize) -> Result<Vec<String>> {
    check_window(window, overlap)?;

    let words: Vec<&str> = text.split_whitespace().collect();
    let stride = window - overlap;

    let mut chunks = Vec::with_capacity(words.len().div_ceil(stride));
    let mut start = 0;
    while start < words.len() {
        let end = usize::min(start + window, words.len());
        chunks.push(words[start..end].join(" "));
        if end == words.len() {
            break;
        }
        start += stride;
    }

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_short_document_is_single_chunk() {
        let chunks = chunk_text("alpha beta gamma", 400, 50).unwrap();
        assert_eq!(chunks, vec!["alpha beta gamma".to_string()]);
    }

    #[test]
    fn test_document_shorter_than_window_is_single_chunk() {
        let text = words(380);
        let chunks = chunk_text(&text, 400, 50).unwrap();
        assert_eq!(chunks, vec![text]);

        let exact = words(400);
        assert_eq!(chunk_text(&exact, 400, 50).unwrap().len(), 1);
    }

    #[test]
    fn test_no_trailing_chunk_inside_previous_window() {
        // [0,4) then [3,7) reaches the end; start 6 would only repeat "g"
        let chunks = chunk_text("a b c d e f g", 4, 1).unwrap();
        assert_eq!(chunks, vec!["a b c d".to_string(), "d e f g".to_string()]);
    }

    #[test]
    fn test_empty_document_has_no_chunks() {
        assert!(chunk_text("", 400, 50).unwrap().is_empty());
        assert!(chunk_text("  \n\t ", 400, 50).unwrap().is_empty());
    }

    #[test]
    fn test_450_words_make_two_chunks() {
        let text = words(450);
        let chunks = chunk_text(&text, 400, 50).unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].split_whitespace().count(), 400);

        // Second window starts at 350 and runs to the end
        let second: Vec<&str> = chunks[1].split_whitespace().collect();
        assert_eq!(second.len(), 100);
        assert_eq!(second[0], "w350");
        assert_eq!(*second.last().unwrap(), "w449");
    }

    #[test]
    fn test_stride_is_window_minus_overlap() {
        // start 0 -> [0,4), start 3 -> [3,6), start 6 stops
        let chunks = chunk_text("a b c d e f", 4, 1).unwrap();
        assert_eq!(chunks, vec!["a b c d".to_string(), "d e f".to_string()]);
    }

    #[test]
    fn test_whitespace_is_normalized() {
        let chunks = chunk_text("one\n\ntwo\t three", 10, 2).unwrap();
        assert_eq!(chunks, vec!["one two three".to_string()]);
    }

    #[test]
    fn test_invalid_window_is_rejected() {
        assert!(matches!(
            chunk_text("a b c", 5, 5),
            Err(MapbotError::InvalidChunking { window: 5, overlap: 5 })
        ));
        assert!(chunk_text("a b c", 0, 0).is_err());
        assert!(DocumentProcessor::new(10, 12).is_err());
    }

    #[test]
    fn test_chunk_document_records_source_and_index() {
        let processor = DocumentProcessor::new(2, 0).unwrap();
        let chunks = processor.chunk_document("notes.txt", "a b c d e").unwrap();

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].source, "notes.txt");
        assert_eq!(chunks[2].index, 2);
        assert_eq!(chunks[2].text, "e");
    }

    #[test]
    fn test_read_missing_document() {
        let err = DocumentProcessor::read_document(Path::new("/nonexistent/doc.txt")).unwrap_err();
        assert!(matches!(err, MapbotError::Io { .. }));
    }

    proptest! {
        #[test]
        fn prop_chunks_reconstruct_tokens(
            tokens in prop::collection::vec("[a-z]{1,6}", 1..200),
            window in 1usize..40,
            overlap_seed in 0usize..40,
        ) {
            let overlap = overlap_seed % window;
            let text = tokens.join(" ");
            let chunks = chunk_text(&text, window, overlap).unwrap();
            prop_assert!(!chunks.is_empty());

            // Drop the overlapping prefix of every chunk after the first
            let mut rebuilt: Vec<String> = Vec::new();
            for (i, chunk) in chunks.iter().enumerate() {
                let skip = if i == 0 { 0 } else { overlap };
                let chunk_tokens: Vec<&str> = chunk.split_whitespace().collect();
                prop_assert!(chunk_tokens.len() <= window);
                rebuilt.extend(chunk_tokens.into_iter().skip(skip).map(str::to_string));
            }

            prop_assert_eq!(rebuilt, tokens);
        }
    }
}
