//! Stage 6: decision enrichment and pruning.
//!
//! Lexical classification over-detects decisions (every "should" in a
//! discussion is a candidate). When there are more than the configured cap,
//! the weakest candidates are demoted to Context. Survivors get placeholder
//! options and the decision ontology pair.

use crate::models::{DecisionOption, Event, EventKind, OntologyTag, Section};

/// Default cap on decisions kept after pruning.
pub const DEFAULT_MAX_INITIAL_DECISIONS: usize = 20;

/// Decision text shorter than this (in chars) scores as concise.
const CONCISE_CHARS: usize = 120;

/// Heuristic strength of a decision candidate.
///
/// `3·(section is Question) + 2·(contains '?') + 1·(shorter than 120 chars)`
pub fn decision_score(event: &Event) -> u32 {
    let mut score = 0;
    if event.section == Section::Question {
        score += 3;
    }
    if event.text.contains('?') {
        score += 2;
    }
    if event.text.chars().count() < CONCISE_CHARS {
        score += 1;
    }
    score
}

/// The three generic options given to a decision no one has refined yet.
pub fn placeholder_options() -> Vec<DecisionOption> {
    vec![
        DecisionOption {
            label: "Act on professional obligations".into(),
            description: "Follow the applicable code of ethics, even at personal or business cost."
                .into(),
        },
        DecisionOption {
            label: "Prioritize client or employer interests".into(),
            description: "Defer to the wishes of the client or employer within legal limits."
                .into(),
        },
        DecisionOption {
            label: "Seek guidance or escalate".into(),
            description: "Consult peers, a licensing board or the appropriate authority first."
                .into(),
        },
    ]
}

/// Prune excess decisions and fill in decision payloads. Idempotent.
pub fn enrich_decisions(mut events: Vec<Event>, max_initial: usize) -> Vec<Event> {
    let mut candidates: Vec<(usize, u32)> = events
        .iter()
        .enumerate()
        .filter(|(_, e)| e.is_decision())
        .map(|(i, e)| (i, decision_score(e)))
        .collect();

    let total = candidates.len();
    if total > max_initial {
        // stable: ties keep document order
        candidates.sort_by(|a, b| b.1.cmp(&a.1));
        for &(index, score) in &candidates[max_initial..] {
            let event = &mut events[index];
            tracing::debug!(event_id = %event.id, score, "demoting low-scoring decision");
            event.kind = EventKind::Context;
            event.clear_decision_payload();
        }
    }

    for event in events.iter_mut().filter(|e| e.is_decision()) {
        if !event.has_options() {
            event.options = Some(placeholder_options());
        }
        ensure_decision_tags(event);
    }

    tracing::debug!(
        candidates = total,
        kept = total.min(max_initial),
        "decision pruning complete"
    );
    events
}

pub(crate) fn ensure_decision_tags(event: &mut Event) {
    for tag in OntologyTag::DECISION_TAGS {
        if !event.ontology.rdf_types.contains(&tag) {
            event.ontology.rdf_types.push(tag);
        }
    }
}
