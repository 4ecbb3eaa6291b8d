use std::time::Duration;

/// Engine-level constants
pub const ENGINE_NAME: &str = "Salus";
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Tunables for the dialogue engine.
///
/// One value is built at startup and shared by reference; nothing in here
/// changes at runtime.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Hard bound on triage turns before the machine forces a terminal state.
    pub max_turns: u32,
    /// How many times a state may re-prompt before force-advancing with a
    /// placeholder value.
    pub max_reprompts: u32,
    /// Deadline for a single retrieval or generation call.
    pub collaborator_timeout: Duration,
    /// Inactivity window after which a session expires.
    pub session_ttl: Duration,
    /// Input length cap applied during sanitization.
    pub max_input_chars: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_turns: 20,
            max_reprompts: 2,
            collaborator_timeout: Duration::from_secs(30),
            session_ttl: Duration::from_secs(30 * 60),
            max_input_chars: 2_000,
        }
    }
}

impl EngineConfig {
    /// A short-deadline configuration for tests and local smoke runs.
    pub fn for_testing() -> Self {
        Self {
            collaborator_timeout: Duration::from_millis(200),
            session_ttl: Duration::from_millis(100),
            ..Self::default()
        }
    }
}
