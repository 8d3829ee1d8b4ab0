// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Semantic chunking: split text into sentences, embed them, and start a new
//! chunk wherever adjacent sentences drift apart in meaning.
//!
//! A breakpoint is placed after sentence `i` when the cosine distance between
//! sentences `i` and `i + 1` is above the configured percentile of all
//! adjacent distances. Chunks are also capped at `max_chunk_chars`.

use std::sync::Arc;

use leadline_core::types::EmbeddingInput;
use leadline_core::{EmbeddingAdapter, LeadlineError};
use tracing::debug;

use crate::types::cosine_similarity;

pub struct SemanticChunker {
    embedder: Arc<dyn EmbeddingAdapter>,
    breakpoint_percentile: f64,
    max_chunk_chars: usize,
}

impl SemanticChunker {
    pub fn new(
        embedder: Arc<dyn EmbeddingAdapter>,
        breakpoint_percentile: f64,
        max_chunk_chars: usize,
    ) -> Self {
        Self {
            embedder,
            breakpoint_percentile,
            max_chunk_chars,
        }
    }

    /// Splits `text` into semantically coherent chunks. Blank text gives none.
    pub async fn chunk(&self, text: &str) -> Result<Vec<String>, LeadlineError> {
        let sentences = split_sentences(text);
        if sentences.len() <= 1 {
            return Ok(cap_chunks(sentences, self.max_chunk_chars));
        }

        let output = self
            .embedder
            .embed(EmbeddingInput {
                texts: sentences.clone(),
            })
            .await?;
        if output.embeddings.len() != sentences.len() {
            return Err(LeadlineError::embedding(format!(
                "expected {} sentence embeddings, got {}",
                sentences.len(),
                output.embeddings.len()
            )));
        }

        let distances: Vec<f64> = output
            .embeddings
            .windows(2)
            .map(|pair| 1.0 - f64::from(cosine_similarity(&pair[0], &pair[1])))
            .collect();
        let threshold = percentile(&distances, self.breakpoint_percentile);

        let mut groups = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        for (i, sentence) in sentences.iter().enumerate() {
            current.push(sentence);
            if distances.get(i).is_some_and(|&d| d > threshold) {
                groups.push(current.join(" "));
                current.clear();
            }
        }
        if !current.is_empty() {
            groups.push(current.join(" "));
        }
        debug!(
            sentences = sentences.len(),
            groups = groups.len(),
            threshold,
            "semantic breakpoints computed"
        );

        Ok(cap_chunks(groups, self.max_chunk_chars))
    }
}

/// Splits on `.`, `!` or `?` followed by whitespace, and on blank lines.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    for paragraph in text.split("\n\n") {
        let mut start = 0;
        let mut chars = paragraph.char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            if matches!(c, '.' | '!' | '?')
                && chars.peek().is_some_and(|(_, next)| next.is_whitespace())
            {
                let end = i + c.len_utf8();
                push_trimmed(&mut sentences, &paragraph[start..end]);
                start = end;
            }
        }
        push_trimmed(&mut sentences, &paragraph[start..]);
    }
    sentences
}

fn push_trimmed(out: &mut Vec<String>, piece: &str) {
    let piece = piece.split_whitespace().collect::<Vec<_>>().join(" ");
    if !piece.is_empty() {
        out.push(piece);
    }
}

/// Linear-interpolated percentile (`p` in 0..=100) of `values`.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let weight = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * weight
}

/// Packs pieces into chunks of at most `max_chars` characters, splitting a
/// single oversized piece on character boundaries.
fn cap_chunks(pieces: Vec<String>, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    for piece in pieces {
        if piece.chars().count() <= max_chars {
            chunks.push(piece);
            continue;
        }
        let mut current = String::new();
        for word in piece.split(' ') {
            let needed = if current.is_empty() {
                word.chars().count()
            } else {
                current.chars().count() + 1 + word.chars().count()
            };
            if needed > max_chars && !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            if word.chars().count() > max_chars {
                let chars: Vec<char> = word.chars().collect();
                for part in chars.chunks(max_chars) {
                    chunks.push(part.iter().collect());
                }
                continue;
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
        if !current.is_empty() {
            chunks.push(current);
        }
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadline_test_utils::MockEmbedder;

    #[test]
    fn sentences_split_on_terminators_and_paragraphs() {
        let text = "We open at 9. We close at 5!\n\nParking is free? Yes\nit is.";
        assert_eq!(
            split_sentences(text),
            vec!["We open at 9.", "We close at 5!", "Parking is free?", "Yes it is."]
        );
    }

    #[test]
    fn decimals_do_not_split() {
        assert_eq!(split_sentences("Price is 9.99 today."), vec!["Price is 9.99 today."]);
    }

    #[test]
    fn percentile_interpolates() {
        let values = [0.0, 10.0, 20.0, 30.0, 40.0];
        assert_eq!(percentile(&values, 50.0), 20.0);
        assert_eq!(percentile(&values, 100.0), 40.0);
        assert!((percentile(&values, 90.0) - 36.0).abs() < 1e-9);
    }

    #[test]
    fn oversized_piece_is_split() {
        let piece = "aaaa bbbb cccc".to_string();
        assert_eq!(cap_chunks(vec![piece], 9), vec!["aaaa bbbb", "cccc"]);
        assert_eq!(cap_chunks(vec!["abcdefgh".into()], 3), vec!["abc", "def", "gh"]);
    }

    #[tokio::test]
    async fn breaks_where_topic_changes() {
        // Two topics: sentences about hours embed along x, sentences about
        // parking along y.
        let embedder = MockEmbedder::with_fixed(vec![
            ("We open at 9.", vec![1.0, 0.0]),
            ("We close at 5.", vec![0.95, 0.05]),
            ("Parking is free.", vec![0.0, 1.0]),
            ("The lot has 40 spaces.", vec![0.05, 0.95]),
        ]);
        let chunker = SemanticChunker::new(Arc::new(embedder), 50.0, 1_000);
        let chunks = chunker
            .chunk("We open at 9. We close at 5. Parking is free. The lot has 40 spaces.")
            .await
            .unwrap();
        assert_eq!(
            chunks,
            vec![
                "We open at 9. We close at 5.",
                "Parking is free. The lot has 40 spaces."
            ]
        );
    }

    #[tokio::test]
    async fn blank_text_has_no_chunks() {
        let chunker = SemanticChunker::new(Arc::new(MockEmbedder::new(4)), 90.0, 1_000);
        assert!(chunker.chunk("  \n\n ").await.unwrap().is_empty());
    }
}
