use crate::collaborators::{with_deadline, ContextChunk, Generation, Retrieval};
use crate::config::EngineConfig;
use crate::policy::sanitize::sanitize_input;
use crate::policy::{PolicyAction, PolicyEngine};

use super::types::{sources_from_chunks, Answer};

/// Fixed reply when retrieval or generation is unavailable. The disclaimer
/// is appended by the output check.
const FALLBACK_ANSWER: &str =
    "I wasn't able to put together an answer just now. Please try again in a \
     moment — and if your concern feels pressing, a healthcare professional \
     is the right person to ask.";

/// Single-turn Q&A pipeline: gate → retrieve → generate → rewrite → cite.
///
/// Holds only borrowed collaborators and configuration; every call is
/// independent and no state survives between calls.
pub struct AnswerOrchestrator<'a, R: Retrieval, G: Generation> {
    policy: &'a PolicyEngine,
    retriever: &'a R,
    generator: &'a G,
    config: &'a EngineConfig,
}

impl<'a, R: Retrieval, G: Generation> AnswerOrchestrator<'a, R, G> {
    pub fn new(
        policy: &'a PolicyEngine,
        retriever: &'a R,
        generator: &'a G,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            policy,
            retriever,
            generator,
            config,
        }
    }

    /// Answer one query.
    pub async fn answer(&self, query: &str) -> Answer {
        let query = sanitize_input(query, self.config.max_input_chars);

        // Step 1: input gate. A block returns before any collaborator call.
        let verdict = self.policy.check_input(&query);
        if verdict.action == PolicyAction::Block {
            let refusal = verdict
                .message
                .unwrap_or_else(|| self.policy.ensure_disclaimer(self.policy.rules().refusal()));
            return Answer {
                content: refusal,
                sources: Vec::new(),
                emergency: false,
            };
        }

        // Step 2: emergency flags urgency but the user still gets an answer.
        let emergency = verdict.action == PolicyAction::EmergencyAlert;
        let banner = verdict.message;

        // Step 3: retrieval (pre-ranked; no re-ranking here).
        let limit = self.config.collaborator_timeout;
        let chunks = match with_deadline(limit, self.retriever.search(&query)).await {
            Ok(chunks) => chunks,
            Err(error) => {
                tracing::warn!(%error, "Retrieval unavailable; returning fallback answer");
                return self.fallback(emergency, banner.as_deref());
            }
        };

        // Step 4: draft generation.
        let prompt = build_answer_prompt(&query, &chunks);
        let draft = match with_deadline(limit, self.generator.generate(&prompt)).await {
            Ok(draft) => draft,
            Err(error) => {
                tracing::warn!(%error, "Generation unavailable; returning fallback answer");
                return self.fallback(emergency, banner.as_deref());
            }
        };

        // Step 5: output rewrite + source derivation.
        let checked = self.policy.check_output(&draft);
        let mut content = checked.content.unwrap_or(draft);
        if let Some(banner) = banner.as_deref() {
            content = format!("{banner}\n\n{content}");
        }

        Answer {
            content,
            sources: sources_from_chunks(&chunks),
            emergency,
        }
    }

    /// Canned answer for collaborator outages. Emergency state from the
    /// input check is still honored.
    fn fallback(&self, emergency: bool, banner: Option<&str>) -> Answer {
        let checked = self.policy.check_output(FALLBACK_ANSWER);
        let mut content = checked
            .content
            .unwrap_or_else(|| FALLBACK_ANSWER.to_string());
        if let Some(banner) = banner {
            content = format!("{banner}\n\n{content}");
        }
        Answer {
            content,
            sources: Vec::new(),
            emergency,
        }
    }
}

/// Assemble the generation prompt from the query and retrieved context.
fn build_answer_prompt(query: &str, chunks: &[ContextChunk]) -> String {
    let mut prompt = String::from(
        "You are a careful health-information assistant. Using only the \
         context below, answer the question in plain language. Describe \
         possibilities and self-care guidance; do not state a diagnosis or \
         prescribe treatment.\n\n",
    );

    if chunks.is_empty() {
        prompt.push_str("Context: (none available)\n");
    } else {
        prompt.push_str("Context:\n");
        for (idx, chunk) in chunks.iter().enumerate() {
            prompt.push_str(&format!(
                "[{}] ({}) {}\n",
                idx + 1,
                chunk.source_title,
                chunk.content
            ));
        }
    }

    prompt.push_str(&format!("\nQuestion: {query}\n"));
    prompt
}
