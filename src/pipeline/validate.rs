//! Structural checks over a finished event list.
//!
//! These should never fire. The orchestrator logs any violation and keeps
//! going so a bad stage shows up in logs instead of losing the run.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::models::{Event, Section};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StructuralViolation {
    MultiSentenceDecision { event_id: String, sentences: usize },
    CrossSectionEvent { event_id: String },
    OrderingNotPermutation { expected: usize, actual: usize },
}

impl std::fmt::Display for StructuralViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MultiSentenceDecision { event_id, sentences } => {
                write!(f, "decision {event_id} spans {sentences} sentences")
            }
            Self::CrossSectionEvent { event_id } => {
                write!(f, "event {event_id} spans more than one section")
            }
            Self::OrderingNotPermutation { expected, actual } => {
                write!(f, "ordering has {actual} ids, expected a permutation of {expected}")
            }
        }
    }
}

/// Check decision isolation, section purity and ordering completeness.
///
/// `sentence_sections` maps sentence id to its section.
pub fn check_structure(
    events: &[Event],
    ordering: &[String],
    sentence_sections: &HashMap<String, Section>,
) -> Vec<StructuralViolation> {
    let mut violations = Vec::new();

    for event in events {
        if event.is_decision() && event.sentence_ids.len() != 1 {
            violations.push(StructuralViolation::MultiSentenceDecision {
                event_id: event.id.clone(),
                sentences: event.sentence_ids.len(),
            });
        }
        let foreign = event
            .sentence_ids
            .iter()
            .any(|sid| sentence_sections.get(sid).is_some_and(|s| *s != event.section));
        if foreign {
            violations.push(StructuralViolation::CrossSectionEvent {
                event_id: event.id.clone(),
            });
        }
    }

    let event_ids: HashSet<&str> = events.iter().map(|e| e.id.as_str()).collect();
    let ordered: HashSet<&str> = ordering.iter().map(String::as_str).collect();
    if ordering.len() != events.len() || ordered != event_ids {
        violations.push(StructuralViolation::OrderingNotPermutation {
            expected: events.len(),
            actual: ordering.len(),
        });
    }

    violations
}
