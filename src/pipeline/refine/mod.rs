//! Stage 7: optional external decision refinement.
//!
//! A refiner looks at the whole event list and proposes which events are the
//! real decision junctures, with a title, a question and options for each. A
//! non-empty proposal replaces the lexical decision set. Any failure leaves the
//! events untouched.

pub mod ollama;
pub mod parser;
pub mod prompt;

pub use ollama::*;
pub use parser::*;
pub use prompt::*;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{DecisionOption, Event, EventKind};

use super::decisions::{ensure_decision_tags, placeholder_options};

/// Refined options beyond this count are dropped.
pub const MAX_REFINED_OPTIONS: usize = 6;

/// Malformed replies are re-requested this many times before giving up.
const MAX_LLM_RETRIES: usize = 1;

#[derive(Error, Debug)]
pub enum RefinementError {
    #[error("LLM server is not running at {0}")]
    LlmConnection(String),

    #[error("LLM server returned error (status {status}): {body}")]
    LlmError { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Malformed refinement response: {0}")]
    MalformedResponse(String),

    #[error("JSON parsing error: {0}")]
    JsonParsing(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),
}

/// One proposed decision juncture, addressed by index into the event list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRefinement {
    pub event_index: usize,
    pub title: String,
    pub question: String,
    #[serde(default)]
    pub options: Vec<DecisionOption>,
}

/// External decision identification (LLM or otherwise).
pub trait DecisionRefiner {
    fn refine(&self, events: &[Event]) -> Result<Vec<DecisionRefinement>, RefinementError>;
}

/// Refiner that never proposes anything. Leaves the lexical decisions in place.
pub struct NoopRefiner;

impl DecisionRefiner for NoopRefiner {
    fn refine(&self, _events: &[Event]) -> Result<Vec<DecisionRefinement>, RefinementError> {
        Ok(Vec::new())
    }
}

/// LLM-backed refiner.
pub struct LlmDecisionRefiner {
    llm: Box<dyn LlmClient + Send + Sync>,
    model_name: String,
}

impl LlmDecisionRefiner {
    pub fn new(llm: Box<dyn LlmClient + Send + Sync>, model_name: &str) -> Self {
        Self {
            llm,
            model_name: model_name.to_string(),
        }
    }
}

impl DecisionRefiner for LlmDecisionRefiner {
    fn refine(&self, events: &[Event]) -> Result<Vec<DecisionRefinement>, RefinementError> {
        if events.is_empty() {
            return Ok(Vec::new());
        }
        let prompt = build_refinement_prompt(events);
        let mut last_error = None;

        for attempt in 0..=MAX_LLM_RETRIES {
            let response = self
                .llm
                .generate(&self.model_name, &prompt, REFINEMENT_SYSTEM_PROMPT)?;

            match parse_refinement_response(&response) {
                Ok(refinements) => return Ok(refinements),
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        error = %e,
                        "refinement response parse failed"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| RefinementError::MalformedResponse("no response".into())))
    }
}

/// Replace the decision set with refined junctures.
///
/// An empty proposal is a no-op. Otherwise every current decision is reset to
/// Action first, then each proposed index is promoted. Proposals that point
/// past the end or at a multi-sentence event are skipped. A proposal without
/// options gets the placeholder set.
pub fn apply_refinements(mut events: Vec<Event>, refinements: Vec<DecisionRefinement>) -> Vec<Event> {
    if refinements.is_empty() {
        return events;
    }

    for event in events.iter_mut().filter(|e| e.is_decision()) {
        event.kind = EventKind::Action;
        event.clear_decision_payload();
    }

    let mut applied = 0usize;
    for refinement in refinements {
        let Some(event) = events.get_mut(refinement.event_index) else {
            tracing::warn!(
                index = refinement.event_index,
                "refinement references missing event, skipping"
            );
            continue;
        };
        if event.sentence_ids.len() != 1 {
            tracing::warn!(
                event_id = %event.id,
                sentences = event.sentence_ids.len(),
                "refinement targets multi-sentence event, skipping"
            );
            continue;
        }

        let mut options = refinement.options;
        if options.is_empty() {
            options = placeholder_options();
        }
        options.truncate(MAX_REFINED_OPTIONS);

        event.kind = EventKind::Decision;
        event.title = Some(refinement.title);
        event.question = Some(refinement.question);
        event.options = Some(options);
        event.refined = Some(true);
        ensure_decision_tags(event);
        applied += 1;
    }

    tracing::debug!(applied, "refinements applied");
    events
}
