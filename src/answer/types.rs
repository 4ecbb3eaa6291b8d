use serde::{Deserialize, Serialize};

use crate::collaborators::ContextChunk;

/// A source reference surfaced with an answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRef {
    pub title: String,
    pub score: f32,
}

/// The result of one `answer` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub content: String,
    pub sources: Vec<SourceRef>,
    pub emergency: bool,
}

/// Derive source references from retrieved chunks, de-duplicated by title.
/// The chunk list is pre-ranked, so the first occurrence of a title carries
/// its best score.
pub(crate) fn sources_from_chunks(chunks: &[ContextChunk]) -> Vec<SourceRef> {
    let mut sources: Vec<SourceRef> = Vec::new();
    for chunk in chunks {
        if !sources.iter().any(|s| s.title == chunk.source_title) {
            sources.push(SourceRef {
                title: chunk.source_title.clone(),
                score: chunk.score,
            });
        }
    }
    sources
}
