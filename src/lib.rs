//! Salus — a safety-gated, stateful health-dialogue engine.
//!
//! Two entry points, one gate:
//!
//! - [`triage::TriageStateMachine`] drives a bounded, multi-turn symptom
//!   intake to a department recommendation or an emergency escalation, over
//!   sessions managed by [`session::SessionStore`].
//! - [`answer::AnswerOrchestrator`] answers a single question through
//!   retrieval and generation collaborators.
//!
//! Every inbound message and every generated draft passes through
//! [`policy::PolicyEngine`], a pure pattern matcher over an immutable,
//! injected rule set: dangerous intent is refused before any collaborator
//! runs, emergency language flags urgency without suppressing the answer,
//! and assertive diagnostic phrasing is rewritten into advisory phrasing
//! with a guaranteed disclaimer.
//!
//! The engine classifies, gates, and routes. It never asserts a diagnosis,
//! and it owns no I/O: retrieval, generation, persistence, and transport
//! live behind the narrow contracts in [`collaborators`].

pub mod answer;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod policy;
pub mod session;
pub mod triage;

pub use answer::{Answer, AnswerOrchestrator, SourceRef};
pub use collaborators::{CollaboratorError, ContextChunk, Generation, Retrieval};
pub use config::EngineConfig;
pub use error::EngineError;
pub use policy::{PolicyAction, PolicyEngine, PolicyVerdict, RuleSet, RuleSetBuilder};
pub use session::{SessionStore, SharedSession};
pub use triage::{
    ChatMessage, DialogueSession, DialogueState, MessageRole, TriageReply, TriageStateMachine,
    Urgency,
};
