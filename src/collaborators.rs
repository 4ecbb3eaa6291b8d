//! External collaborator contracts.
//!
//! The engine never talks to a vector index, an LLM runtime, or the network
//! directly. It consumes two narrow traits and treats everything behind them
//! as best-effort: calls are bounded by a deadline and failures degrade to
//! canned text, never to a crashed dialogue.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A retrieved context chunk, already relevance-ordered by the backend.
/// The engine performs no re-ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextChunk {
    pub content: String,
    pub source_title: String,
    pub score: f32,
}

/// Failure of a retrieval or generation backend.
#[derive(Error, Debug)]
pub enum CollaboratorError {
    #[error("Retrieval backend failed: {0}")]
    Retrieval(String),

    #[error("Generation backend failed: {0}")]
    Generation(String),

    #[error("Collaborator call exceeded the {0:?} deadline")]
    Timeout(Duration),
}

/// Context retrieval over an external, pre-ranked index.
#[async_trait]
pub trait Retrieval: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<ContextChunk>, CollaboratorError>;
}

/// Free-text generation. Also used for structured extraction sub-tasks,
/// where the engine expects a JSON array of short strings and treats any
/// other shape as an empty result.
#[async_trait]
pub trait Generation: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, CollaboratorError>;
}

/// Run a collaborator call under the configured deadline.
pub async fn with_deadline<T, F>(limit: Duration, call: F) -> Result<T, CollaboratorError>
where
    F: Future<Output = Result<T, CollaboratorError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(CollaboratorError::Timeout(limit)),
    }
}
