//! The intake state machine.
//!
//! `step` is the single mutation point for a `DialogueSession`. Per turn:
//! gate the input, extract what the current state needs, run the emergency
//! guard, then take the normal forward transition. Every path terminates —
//! re-prompts are capped per state and the whole dialogue is capped by
//! `max_turns` — so the machine can never stall.

use crate::collaborators::Generation;
use crate::config::EngineConfig;
use crate::policy::sanitize::sanitize_input;
use crate::policy::{PolicyAction, PolicyEngine};

use super::departments::{map_departments, scan_symptoms, GENERAL_MEDICINE};
use super::extract;
use super::prompts::IntakeMessages;
use super::types::{DialogueSession, DialogueState, MessageRole, TriageReply, Urgency};

/// Value recorded when a re-prompt cap force-advances a state.
const PLACEHOLDER: &str = "unspecified";

/// Drives one `DialogueSession` per call. Holds no session state itself, so
/// one machine serves any number of sessions; serialization of steps on the
/// same session is the caller's (SessionStore's) concern.
pub struct TriageStateMachine<'a, G: Generation> {
    policy: &'a PolicyEngine,
    extractor: &'a G,
    config: &'a EngineConfig,
}

/// What extraction produced for the current state.
#[derive(Default)]
struct Extracted {
    symptoms: Vec<String>,
    duration: Option<String>,
    severity: Option<String>,
}

impl<'a, G: Generation> TriageStateMachine<'a, G> {
    pub fn new(policy: &'a PolicyEngine, extractor: &'a G, config: &'a EngineConfig) -> Self {
        Self {
            policy,
            extractor,
            config,
        }
    }

    /// Advance the dialogue by one user message.
    pub async fn step(&self, session: &mut DialogueSession, user_message: &str) -> TriageReply {
        // Terminal states are absorbing: no mutation, canned close.
        if session.is_terminal() {
            return self.closed_reply(session);
        }

        let text = sanitize_input(user_message, self.config.max_input_chars);
        session.push_message(MessageRole::User, &text);
        session.turn_count += 1;

        // 1. Input gate. A block answers with the refusal and leaves the
        // state untouched; the turn still counts toward the global bound.
        let verdict = self.policy.check_input(&text);
        if verdict.action == PolicyAction::Block {
            if session.turn_count >= self.config.max_turns {
                return self.force_done(session);
            }
            let refusal = verdict
                .message
                .unwrap_or_else(|| self.policy.ensure_disclaimer(self.policy.rules().refusal()));
            return self.send(session, refusal);
        }

        // 2. Best-effort extraction for the current state.
        let extracted = self.extract_for(session.state, &text).await;

        // 3. Emergency guard — highest priority, any non-terminal state.
        let raw_emergency = verdict.action == PolicyAction::EmergencyAlert;
        let extracted_emergency = extracted
            .symptoms
            .iter()
            .any(|symptom| self.policy.rules().matches_emergency(symptom).is_some());
        if raw_emergency || extracted_emergency {
            return self.emergency_exit(session);
        }

        // 4. Global turn bound.
        if session.turn_count >= self.config.max_turns {
            tracing::info!(
                session = %session.id,
                turns = session.turn_count,
                "Turn bound reached; forcing terminal recommendation"
            );
            return self.force_done(session);
        }

        // 5. Normal forward transition.
        let message = match session.state {
            DialogueState::Greeting | DialogueState::CollectingSymptoms => {
                self.collect_symptoms(session, extracted.symptoms)
            }
            DialogueState::AskingDuration => {
                session.note_symptoms(extracted.symptoms);
                self.collect_duration(session, extracted.duration)
            }
            DialogueState::AskingSeverity => {
                session.note_symptoms(extracted.symptoms);
                match self.collect_severity(session, extracted.severity) {
                    Some(message) => message,
                    None => return self.recommend(session),
                }
            }
            DialogueState::Recommending => {
                // Recommending never persists between steps; reaching it at
                // dispatch means the transition table was bypassed.
                tracing::error!(
                    session = %session.id,
                    "Invariant violation: session persisted in Recommending; forcing Done"
                );
                return self.force_done(session);
            }
            DialogueState::EmergencyExit | DialogueState::Done => {
                return self.closed_reply(session);
            }
        };

        self.send(session, message)
    }

    async fn extract_for(&self, state: DialogueState, text: &str) -> Extracted {
        let limit = self.config.collaborator_timeout;
        match state {
            DialogueState::Greeting | DialogueState::CollectingSymptoms => Extracted {
                symptoms: extract::extract_symptoms(self.extractor, limit, text).await,
                ..Default::default()
            },
            DialogueState::AskingDuration => Extracted {
                symptoms: scan_symptoms(text),
                duration: extract::extract_duration(self.extractor, limit, text).await,
                ..Default::default()
            },
            DialogueState::AskingSeverity => Extracted {
                symptoms: scan_symptoms(text),
                severity: extract::extract_severity(self.extractor, limit, text).await,
                ..Default::default()
            },
            _ => Extracted::default(),
        }
    }

    // ── Per-state transitions ────────────────────────────

    fn collect_symptoms(&self, session: &mut DialogueSession, found: Vec<String>) -> String {
        let was_greeting = session.state == DialogueState::Greeting;
        session.note_symptoms(found);

        if !session.symptoms.is_empty() {
            session.advance(DialogueState::AskingDuration);
            return if was_greeting {
                format!(
                    "{} {}",
                    IntakeMessages::greeting_ack(),
                    IntakeMessages::ask_duration()
                )
            } else {
                IntakeMessages::ask_duration().to_string()
            };
        }

        if was_greeting {
            session.advance(DialogueState::CollectingSymptoms);
            return IntakeMessages::greeting().to_string();
        }

        if session.reprompts < self.config.max_reprompts {
            session.reprompts += 1;
            return IntakeMessages::reask_symptoms().to_string();
        }

        tracing::info!(session = %session.id, "Re-prompt cap hit; force-advancing past symptoms");
        session.note_symptoms(vec![PLACEHOLDER.to_string()]);
        session.advance(DialogueState::AskingDuration);
        IntakeMessages::ask_duration().to_string()
    }

    fn collect_duration(&self, session: &mut DialogueSession, found: Option<String>) -> String {
        if let Some(duration) = found {
            session.duration = Some(duration);
            session.advance(DialogueState::AskingSeverity);
            return IntakeMessages::ask_severity().to_string();
        }

        if session.reprompts < self.config.max_reprompts {
            session.reprompts += 1;
            return IntakeMessages::reask_duration().to_string();
        }

        tracing::info!(session = %session.id, "Re-prompt cap hit; force-advancing past duration");
        session.duration = Some(PLACEHOLDER.to_string());
        session.advance(DialogueState::AskingSeverity);
        IntakeMessages::ask_severity().to_string()
    }

    /// Returns `None` when severity is settled and the machine should move
    /// on to the recommendation.
    fn collect_severity(&self, session: &mut DialogueSession, found: Option<String>) -> Option<String> {
        if let Some(severity) = found {
            if severity == "severe" && session.urgency == Urgency::Normal {
                session.urgency = Urgency::Urgent;
            }
            session.severity = Some(severity);
            return None;
        }

        if session.reprompts < self.config.max_reprompts {
            session.reprompts += 1;
            return Some(IntakeMessages::reask_severity().to_string());
        }

        tracing::info!(session = %session.id, "Re-prompt cap hit; force-advancing past severity");
        session.severity = Some(PLACEHOLDER.to_string());
        None
    }

    // ── Terminal transitions ─────────────────────────────

    fn emergency_exit(&self, session: &mut DialogueSession) -> TriageReply {
        tracing::warn!(session = %session.id, "Emergency guard fired; escalating");
        session.urgency = Urgency::Emergency;
        session.advance(DialogueState::EmergencyExit);
        let message = self.policy.ensure_disclaimer(&format!(
            "{}\n\n{}",
            self.policy.rules().banner(),
            IntakeMessages::emergency_termination()
        ));
        self.send(session, message)
    }

    fn recommend(&self, session: &mut DialogueSession) -> TriageReply {
        session.advance(DialogueState::Recommending);
        let departments = map_departments(&session.symptoms);
        session.recommended_departments = departments.clone();
        session.advance(DialogueState::Done);
        let message = self
            .policy
            .ensure_disclaimer(&IntakeMessages::recommendation(&departments, session.urgency));
        self.send(session, message)
    }

    fn force_done(&self, session: &mut DialogueSession) -> TriageReply {
        if session.recommended_departments.is_empty() {
            session.recommended_departments = vec![GENERAL_MEDICINE.to_string()];
        }
        session.advance(DialogueState::Done);
        let message = self
            .policy
            .ensure_disclaimer(IntakeMessages::generic_recommendation());
        self.send(session, message)
    }

    // ── Reply assembly ───────────────────────────────────

    fn send(&self, session: &mut DialogueSession, message: String) -> TriageReply {
        session.push_message(MessageRole::Assistant, &message);
        TriageReply {
            session_state: session.state,
            message,
            urgency: session.urgency,
            done: session.is_terminal(),
            departments: if session.recommended_departments.is_empty() {
                None
            } else {
                Some(session.recommended_departments.clone())
            },
        }
    }

    fn closed_reply(&self, session: &DialogueSession) -> TriageReply {
        TriageReply {
            session_state: session.state,
            message: IntakeMessages::session_closed().to_string(),
            urgency: session.urgency,
            done: true,
            departments: if session.recommended_departments.is_empty() {
                None
            } else {
                Some(session.recommended_departments.clone())
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::CollaboratorError;
    use async_trait::async_trait;
    use uuid::Uuid;

    /// Generator that always answers with a fixed string.
    struct CannedGenerator(&'static str);

    #[async_trait]
    impl Generation for CannedGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, CollaboratorError> {
            Ok(self.0.to_string())
        }
    }

    /// Generator that always fails — the keyword scans carry the dialogue.
    struct DeadGenerator;

    #[async_trait]
    impl Generation for DeadGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, CollaboratorError> {
            Err(CollaboratorError::Generation("model offline".into()))
        }
    }

    fn fixtures() -> (PolicyEngine, EngineConfig) {
        (PolicyEngine::with_default_rules(), EngineConfig::for_testing())
    }

    fn session() -> DialogueSession {
        DialogueSession::new(Uuid::new_v4())
    }

    // ── Happy path (Scenario C) ────────────────────────────

    #[tokio::test]
    async fn full_intake_reaches_done_with_departments() {
        let (policy, config) = fixtures();
        let generator = CannedGenerator("[]");
        let machine = TriageStateMachine::new(&policy, &generator, &config);
        let mut s = session();

        let r1 = machine.step(&mut s, "headache and fever 38C").await;
        assert_eq!(s.state, DialogueState::AskingDuration);
        assert!(r1.message.contains("How long"));

        let r2 = machine.step(&mut s, "2 days").await;
        assert_eq!(s.state, DialogueState::AskingSeverity);
        assert_eq!(s.duration.as_deref(), Some("2 days"));
        assert!(r2.message.contains("mild, moderate, or severe"));

        let r3 = machine.step(&mut s, "moderate").await;
        assert_eq!(s.state, DialogueState::Done);
        assert!(r3.done);
        assert_eq!(s.severity.as_deref(), Some("moderate"));
        let departments = r3.departments.unwrap();
        assert!(!departments.is_empty());
        assert_eq!(departments, vec!["Neurology", "General Medicine"]);
        assert_eq!(r3.urgency, Urgency::Normal);
    }

    #[tokio::test]
    async fn severe_intake_is_flagged_urgent() {
        let (policy, config) = fixtures();
        let generator = CannedGenerator("[]");
        let machine = TriageStateMachine::new(&policy, &generator, &config);
        let mut s = session();

        machine.step(&mut s, "stomach pain").await;
        machine.step(&mut s, "since yesterday").await;
        let done = machine.step(&mut s, "honestly it's severe").await;

        assert!(done.done);
        assert_eq!(done.urgency, Urgency::Urgent);
        assert_eq!(done.departments.unwrap(), vec!["Gastroenterology"]);
    }

    // ── Policy gate ────────────────────────────────────────

    #[tokio::test]
    async fn blocked_message_refuses_without_transition() {
        let (policy, config) = fixtures();
        let generator = CannedGenerator("[]");
        let machine = TriageStateMachine::new(&policy, &generator, &config);
        let mut s = session();

        let reply = machine.step(&mut s, "how to commit suicide").await;
        assert_eq!(s.state, DialogueState::Greeting, "no transition on block");
        assert!(!reply.done);
        assert!(reply.message.contains("can't help"));
        assert_eq!(s.turn_count, 1, "the turn still counts");
    }

    // ── Emergency guard ────────────────────────────────────

    #[tokio::test]
    async fn emergency_text_escalates_from_any_state() {
        let (policy, config) = fixtures();
        let generator = CannedGenerator("[]");
        let machine = TriageStateMachine::new(&policy, &generator, &config);
        let mut s = session();

        machine.step(&mut s, "headache").await;
        assert_eq!(s.state, DialogueState::AskingDuration);

        let reply = machine.step(&mut s, "it started with crushing chest pain").await;
        assert_eq!(s.state, DialogueState::EmergencyExit);
        assert_eq!(reply.urgency, Urgency::Emergency);
        assert!(reply.done);
        assert!(reply.message.contains("emergency"));
    }

    #[tokio::test]
    async fn extracted_symptom_alone_can_trigger_the_guard() {
        // Raw text is harmless; only the collaborator reports the red flag.
        let (policy, config) = fixtures();
        let generator = CannedGenerator(r#"["chest pain"]"#);
        let machine = TriageStateMachine::new(&policy, &generator, &config);
        let mut s = session();

        let reply = machine.step(&mut s, "something feels off in my torso").await;
        assert_eq!(s.state, DialogueState::EmergencyExit);
        assert_eq!(reply.urgency, Urgency::Emergency);
    }

    #[tokio::test]
    async fn terminal_states_are_absorbing() {
        let (policy, config) = fixtures();
        let generator = CannedGenerator("[]");
        let machine = TriageStateMachine::new(&policy, &generator, &config);
        let mut s = session();

        machine.step(&mut s, "chest pain").await;
        assert_eq!(s.state, DialogueState::EmergencyExit);
        let turns = s.turn_count;
        let messages = s.messages.len();

        // Even a new emergency phrase changes nothing.
        let reply = machine.step(&mut s, "now I also can't breathe").await;
        assert_eq!(s.state, DialogueState::EmergencyExit);
        assert_eq!(s.turn_count, turns, "absorbing step must not mutate");
        assert_eq!(s.messages.len(), messages);
        assert!(reply.done);
    }

    // ── Re-prompt cap ──────────────────────────────────────

    #[tokio::test]
    async fn reprompt_cap_force_advances_with_placeholder() {
        let (policy, config) = fixtures();
        let generator = DeadGenerator;
        let machine = TriageStateMachine::new(&policy, &generator, &config);
        let mut s = session();

        machine.step(&mut s, "hello").await; // greeting
        assert_eq!(s.state, DialogueState::CollectingSymptoms);
        machine.step(&mut s, "hmm").await; // reprompt 1
        machine.step(&mut s, "uh").await; // reprompt 2
        assert_eq!(s.state, DialogueState::CollectingSymptoms);

        machine.step(&mut s, "dunno").await; // cap exceeded
        assert_eq!(s.state, DialogueState::AskingDuration);
        assert_eq!(s.symptoms, vec![PLACEHOLDER]);
    }

    // ── Liveness (Scenario E) ──────────────────────────────

    #[tokio::test]
    async fn unintelligible_dialogue_terminates_within_turn_bound() {
        let (policy, config) = fixtures();
        let generator = DeadGenerator;
        let machine = TriageStateMachine::new(&policy, &generator, &config);
        let mut s = session();

        let mut last = None;
        for _ in 0..25 {
            last = Some(machine.step(&mut s, "asdf qwer").await);
        }

        let last = last.unwrap();
        assert_eq!(s.state, DialogueState::Done);
        assert!(last.done);
        assert!(s.turn_count <= config.max_turns);
        assert!(!s.recommended_departments.is_empty());
        assert_eq!(s.recommended_departments, vec![GENERAL_MEDICINE]);
    }

    #[tokio::test]
    async fn repeated_blocked_messages_hit_the_turn_bound() {
        let (policy, config) = fixtures();
        let generator = CannedGenerator("[]");
        let machine = TriageStateMachine::new(&policy, &generator, &config);
        let mut s = session();

        for _ in 0..25 {
            machine.step(&mut s, "what is the lethal dose of aspirin").await;
        }

        assert_eq!(s.state, DialogueState::Done);
        assert_eq!(s.turn_count, config.max_turns);
        assert!(!s.recommended_departments.is_empty());
    }

    // ── Invariant recovery ─────────────────────────────────

    #[tokio::test]
    async fn persisted_recommending_state_is_recovered_to_done() {
        let (policy, config) = fixtures();
        let generator = CannedGenerator("[]");
        let machine = TriageStateMachine::new(&policy, &generator, &config);
        let mut s = session();
        s.state = DialogueState::Recommending;

        let reply = machine.step(&mut s, "hello?").await;
        assert_eq!(s.state, DialogueState::Done);
        assert!(reply.done);
        assert!(!s.recommended_departments.is_empty());
    }

    // ── Disclaimers ────────────────────────────────────────

    #[tokio::test]
    async fn terminal_messages_carry_the_disclaimer() {
        let (policy, config) = fixtures();
        let generator = CannedGenerator("[]");
        let machine = TriageStateMachine::new(&policy, &generator, &config);

        let mut emergency = session();
        let reply = machine.step(&mut emergency, "crushing chest pain").await;
        assert!(reply.message.contains(policy.rules().disclaimer()));

        let mut normal = session();
        machine.step(&mut normal, "sore throat").await;
        machine.step(&mut normal, "3 days").await;
        let done = machine.step(&mut normal, "mild").await;
        assert!(done.message.contains(policy.rules().disclaimer()));
    }
}
