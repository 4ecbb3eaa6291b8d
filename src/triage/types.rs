use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where the intake conversation currently stands.
///
/// The sequence is fixed and forward-only; the only jump allowed is the
/// emergency guard, which may move any non-terminal state straight to
/// `EmergencyExit`. `EmergencyExit` and `Done` are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogueState {
    Greeting,
    CollectingSymptoms,
    AskingDuration,
    AskingSeverity,
    Recommending,
    EmergencyExit,
    Done,
}

impl DialogueState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::EmergencyExit | Self::Done)
    }
}

/// How urgently the user should seek real-world care.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Normal,
    Urgent,
    Emergency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
}

/// One transcript entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// One intake conversation. Created on the first message, mutated only by
/// `TriageStateMachine::step`, destroyed by the `SessionStore` on expiry or
/// explicit end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueSession {
    pub id: Uuid,
    pub state: DialogueState,
    pub messages: Vec<ChatMessage>,
    /// Deduplicated, in reported order. Department mapping re-orders by
    /// lookup-table priority instead.
    pub symptoms: Vec<String>,
    pub duration: Option<String>,
    pub severity: Option<String>,
    pub urgency: Urgency,
    pub recommended_departments: Vec<String>,
    pub turn_count: u32,
    /// Re-asks in the current state; reset on every transition.
    pub reprompts: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DialogueSession {
    pub fn new(id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id,
            state: DialogueState::Greeting,
            messages: Vec::new(),
            symptoms: Vec::new(),
            duration: None,
            severity: None,
            urgency: Urgency::Normal,
            recommended_departments: Vec::new(),
            turn_count: 0,
            reprompts: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub(crate) fn push_message(&mut self, role: MessageRole, content: &str) {
        let now = Utc::now();
        self.messages.push(ChatMessage {
            role,
            content: content.to_string(),
            timestamp: now,
        });
        self.updated_at = now;
    }

    /// Merge newly extracted symptoms, case-insensitively deduplicated.
    pub(crate) fn note_symptoms(&mut self, found: Vec<String>) {
        for symptom in found {
            let symptom = symptom.trim().to_lowercase();
            if symptom.is_empty() {
                continue;
            }
            if !self.symptoms.iter().any(|known| *known == symptom) {
                self.symptoms.push(symptom);
            }
        }
    }

    /// Advance to `next`, resetting the per-state re-prompt counter.
    pub(crate) fn advance(&mut self, next: DialogueState) {
        self.state = next;
        self.reprompts = 0;
        self.updated_at = Utc::now();
    }
}

/// The per-turn result handed back to the transport layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageReply {
    pub session_state: DialogueState,
    pub message: String,
    pub urgency: Urgency,
    pub done: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub departments: Option<Vec<String>>,
}
