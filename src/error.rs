use thiserror::Error;
use uuid::Uuid;

use crate::collaborators::CollaboratorError;

/// Engine errors surfaced to the embedding layer.
///
/// Most failure modes are recovered internally and never appear here:
/// a policy block is ordinary control flow carried in a `PolicyVerdict`,
/// extraction misses fall back to a re-prompt, and collaborator outages
/// degrade to canned fallback text. What remains is what the caller can
/// actually act on.
#[derive(Error, Debug)]
pub enum EngineError {
    /// No session with this id. The caller should start a new dialogue.
    #[error("Session not found: {0}")]
    SessionNotFound(Uuid),

    /// The session existed but aged out of the inactivity window.
    /// Surfaced distinctly so the caller can offer a restart.
    #[error("Session expired: {0}")]
    SessionExpired(Uuid),

    /// A retrieval or generation backend failed or timed out.
    #[error("Collaborator unavailable: {0}")]
    Collaborator(#[from] CollaboratorError),

    /// The dialogue reached a state the transition table does not define.
    /// The machine recovers by forcing a terminal state; this variant exists
    /// for callers that want to observe the recovery.
    #[error("Dialogue invariant violated: {0}")]
    InvariantViolation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_and_expired_are_distinct() {
        let id = Uuid::new_v4();
        let not_found = EngineError::SessionNotFound(id);
        let expired = EngineError::SessionExpired(id);
        assert!(not_found.to_string().contains("not found"));
        assert!(expired.to_string().contains("expired"));
        assert_ne!(not_found.to_string(), expired.to_string());
    }

    #[test]
    fn collaborator_error_converts() {
        let err: EngineError =
            CollaboratorError::Generation("backend down".into()).into();
        assert!(err.to_string().contains("backend down"));
    }
}
