//! Single-turn, safety-checked question answering.
//!
//! One call in, one gated answer out: screen the query, pull pre-ranked
//! context from the retrieval collaborator, draft with the generation
//! collaborator, rewrite the draft through the output policy, and attach
//! de-duplicated source references. Collaborator failures degrade to a fixed
//! fallback answer; nothing here persists state between calls.

pub mod orchestrator;
pub mod types;

pub use orchestrator::AnswerOrchestrator;
pub use types::{Answer, SourceRef};
