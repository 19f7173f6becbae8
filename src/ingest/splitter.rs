//! Recursive character text splitter.
//!
//! Splits text into bounded-size chunks with overlap between consecutive
//! chunks, searching separators from coarse to fine: paragraph, line, word,
//! character. Chunk boundaries follow separator positions and are not
//! required to align with semantic boundaries.

const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

#[derive(Debug, Clone)]
pub struct RecursiveSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            // Overlap must leave room for new content in every chunk.
            chunk_overlap: chunk_overlap.min(chunk_size / 2),
        }
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        self.split_with(text, &SEPARATORS)
            .into_iter()
            .map(|chunk| chunk.trim().to_string())
            .filter(|chunk| !chunk.is_empty())
            .collect()
    }

    fn split_with(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let (sep_idx, sep) = separators
            .iter()
            .enumerate()
            .find(|(_, s)| s.is_empty() || text.contains(*s))
            .map(|(idx, s)| (idx, *s))
            .unwrap_or((separators.len() - 1, ""));
        let remaining = &separators[(sep_idx + 1).min(separators.len())..];

        let pieces: Vec<String> = if sep.is_empty() {
            text.chars().map(|c| c.to_string()).collect()
        } else {
            text.split(sep).map(|s| s.to_string()).collect()
        };

        let sep_len = sep.chars().count();
        let mut chunks: Vec<String> = Vec::new();
        let mut buffer: Vec<String> = Vec::new();

        for piece in pieces {
            let piece_len = piece.chars().count();

            // Oversize piece: flush what we have and recurse with finer
            // separators.
            if piece_len > self.chunk_size && !remaining.is_empty() {
                if !buffer.is_empty() {
                    chunks.push(buffer.join(sep));
                    buffer.clear();
                }
                chunks.extend(self.split_with(&piece, remaining));
                continue;
            }

            let projected = joined_len(&buffer, sep_len)
                + piece_len
                + if buffer.is_empty() { 0 } else { sep_len };
            if projected > self.chunk_size && !buffer.is_empty() {
                chunks.push(buffer.join(sep));
                // Retain a tail of pieces as overlap into the next chunk.
                while !buffer.is_empty() && joined_len(&buffer, sep_len) > self.chunk_overlap {
                    buffer.remove(0);
                }
            }

            buffer.push(piece);
        }

        if !buffer.is_empty() {
            chunks.push(buffer.join(sep));
        }

        chunks
    }
}

fn joined_len(pieces: &[String], sep_len: usize) -> usize {
    if pieces.is_empty() {
        return 0;
    }
    pieces.iter().map(|p| p.chars().count()).sum::<usize>() + sep_len * (pieces.len() - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_yields_a_single_chunk() {
        let splitter = RecursiveSplitter::new(500, 200);
        let chunks = splitter.split("Hello world");
        assert_eq!(chunks, vec!["Hello world".to_string()]);
    }

    #[test]
    fn long_text_is_split_into_bounded_chunks() {
        let splitter = RecursiveSplitter::new(100, 20);
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(20);
        let chunks = splitter.split(&text);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            // A chunk may slightly exceed the target when the overlap tail
            // plus the next word does; it stays within size + overlap.
            assert!(chunk.chars().count() <= 120, "chunk too long: {}", chunk.len());
        }
    }

    #[test]
    fn consecutive_chunks_overlap() {
        let splitter = RecursiveSplitter::new(50, 20);
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa lambda mu nu";
        let chunks = splitter.split(text);
        assert!(chunks.len() > 1);

        let first_tail: Vec<&str> = chunks[0].split(' ').rev().take(2).collect();
        for word in first_tail {
            assert!(
                chunks[1].contains(word),
                "expected overlap word '{}' in '{}'",
                word,
                chunks[1]
            );
        }
    }

    #[test]
    fn paragraph_boundaries_are_preferred() {
        let splitter = RecursiveSplitter::new(40, 0);
        let text = "first paragraph here\n\nsecond paragraph here\n\nthird paragraph here";
        let chunks = splitter.split(text);

        assert!(chunks.iter().any(|c| c.contains("first paragraph")));
        assert!(chunks.iter().any(|c| c.contains("third paragraph")));
        // Order is preserved.
        let first_pos = chunks.iter().position(|c| c.contains("first")).unwrap();
        let third_pos = chunks.iter().position(|c| c.contains("third")).unwrap();
        assert!(first_pos < third_pos);
    }

    #[test]
    fn unbroken_text_falls_back_to_character_split() {
        let splitter = RecursiveSplitter::new(10, 0);
        let text = "a".repeat(35);
        let chunks = splitter.split(&text);
        assert!(chunks.len() >= 4);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 10);
        }
    }
}
