use crate::pgn_loader::GameDocument;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// text-embedding-3-large accepts 8k tokens; leave headroom
pub const MAX_TOKENS_PER_CHUNK: usize = 6000;
/// Approximate tokens-per-word ratio for English text
pub const WORDS_PER_TOKEN: f64 = 0.75;
pub const CHUNK_SIZE_WORDS: usize = 3000;
pub const CHUNK_OVERLAP_WORDS: usize = 100;

/// A piece of text ready to be embedded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkedDocument {
    pub description: String,
    pub source: String,
}

/// Split text into overlapping word windows when its estimated token count
/// exceeds the embedding limit. Short texts come back as one chunk, unchanged.
pub fn chunk_text(text: &str) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let estimated_tokens = words.len() as f64 / WORDS_PER_TOKEN;
    if estimated_tokens <= MAX_TOKENS_PER_CHUNK as f64 {
        return vec![text.to_string()];
    }

    let step = CHUNK_SIZE_WORDS - CHUNK_OVERLAP_WORDS;
    (0..words.len())
        .step_by(step)
        .map(|start| {
            let end = (start + CHUNK_SIZE_WORDS).min(words.len());
            words[start..end].join(" ")
        })
        .collect()
}

/// Chunk every document and drop chunks whose whitespace-normalized text
/// was already seen. Order of first appearance is kept.
pub fn chunk_documents(documents: &[GameDocument]) -> Vec<ChunkedDocument> {
    let mut seen_chunks: HashSet<String> = HashSet::new();
    let mut chunked = Vec::new();

    for doc in documents {
        for chunk in chunk_text(&doc.description) {
            let normalized = chunk.split_whitespace().collect::<Vec<_>>().join(" ");
            if seen_chunks.insert(normalized) {
                chunked.push(ChunkedDocument {
                    description: chunk,
                    source: doc.source.clone(),
                });
            }
        }
    }

    log::info!(
        "Reduced to {} unique chunks from {} documents",
        chunked.len(),
        documents.len()
    );
    chunked
}
