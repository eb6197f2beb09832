use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::enums::{EventKind, Granularity, OntologyTag, Section, TemporalKind};

/// Temporal evidence extracted from a sentence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalInfo {
    pub raw: Option<String>,
    pub kind: TemporalKind,
    /// `None` when `kind` is `Unknown`.
    pub normalized: Option<NormalizedSpan>,
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedSpan {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub granularity: Granularity,
}

impl TemporalInfo {
    pub fn unknown() -> Self {
        Self {
            raw: None,
            kind: TemporalKind::Unknown,
            normalized: None,
            confidence: 0.0,
        }
    }

    pub fn is_known(&self) -> bool {
        self.kind != TemporalKind::Unknown
    }
}

impl Default for TemporalInfo {
    fn default() -> Self {
        Self::unknown()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionOption {
    pub label: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OntologyInfo {
    pub rdf_types: Vec<OntologyTag>,
}

/// A timeline event. Created by the assembler, enriched in place by later stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub kind: EventKind,
    /// Non-empty, contiguous, single section. Exactly one id when `kind` is Decision.
    pub sentence_ids: Vec<String>,
    pub section: Section,
    pub text: String,
    pub ontology: OntologyInfo,
    pub temporal: TemporalInfo,
    pub participants: BTreeSet<String>,
    pub order: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<DecisionOption>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refined: Option<bool>,
}

impl Event {
    /// A bare event with no temporal, participant, ontology or decision data yet.
    pub fn new(
        id: impl Into<String>,
        kind: EventKind,
        section: Section,
        sentence_ids: Vec<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            sentence_ids,
            section,
            text: text.into(),
            ontology: OntologyInfo::default(),
            temporal: TemporalInfo::unknown(),
            participants: BTreeSet::new(),
            order: 0,
            options: None,
            title: None,
            question: None,
            refined: None,
        }
    }

    pub fn is_decision(&self) -> bool {
        self.kind.is_decision()
    }

    pub fn has_options(&self) -> bool {
        self.options.as_ref().is_some_and(|opts| !opts.is_empty())
    }

    /// Drop everything that only makes sense on a decision juncture.
    pub fn clear_decision_payload(&mut self) {
        self.options = None;
        self.title = None;
        self.question = None;
        self.refined = None;
        self.ontology.rdf_types.retain(|tag| !tag.is_decision_tag());
    }
}
