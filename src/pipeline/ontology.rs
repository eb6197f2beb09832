//! Stage 8: ontology tagging and the keyword summary.
//!
//! Tagging is structural (decision or not). The summary is a bag-of-terms view
//! for reviewers and is not authoritative.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::{Event, OntologySummary, OntologyTag, SummaryCategory, TermHit};

const VALUE_TERMS: &[&str] = &[
    "safety",
    "honesty",
    "integrity",
    "public welfare",
    "health",
    "fairness",
    "confidentiality",
    "loyalty",
    "competence",
    "trust",
];

const OBLIGATION_TERMS: &[&str] = &[
    "obligation",
    "duty",
    "responsibility",
    "disclose",
    "report",
    "notify",
    "comply",
    "must",
    "should",
];

const CONSTRAINT_TERMS: &[&str] = &[
    "law",
    "regulation",
    "code",
    "contract",
    "license",
    "deadline",
    "budget",
    "standard",
    "permit",
];

const STATE_TERMS: &[&str] = &[
    "conflict of interest",
    "risk",
    "defect",
    "hazard",
    "error",
    "violation",
    "danger",
    "unsafe",
    "failure",
];

const RESOURCE_TERMS: &[&str] = &[
    "report",
    "drawings",
    "plans",
    "design",
    "data",
    "documents",
    "specifications",
    "calculations",
    "budget",
];

fn category_terms(category: SummaryCategory) -> &'static [&'static str] {
    match category {
        SummaryCategory::Values => VALUE_TERMS,
        SummaryCategory::Obligations => OBLIGATION_TERMS,
        SummaryCategory::Constraints => CONSTRAINT_TERMS,
        SummaryCategory::States => STATE_TERMS,
        SummaryCategory::Resources => RESOURCE_TERMS,
    }
}

fn category_hits(summary: &mut OntologySummary, category: SummaryCategory) -> &mut Vec<TermHit> {
    match category {
        SummaryCategory::Values => &mut summary.values,
        SummaryCategory::Obligations => &mut summary.obligations,
        SummaryCategory::Constraints => &mut summary.constraints,
        SummaryCategory::States => &mut summary.states,
        SummaryCategory::Resources => &mut summary.resources,
    }
}

struct Category {
    name: SummaryCategory,
    terms: Vec<(&'static str, Regex)>,
}

static CATEGORY_TABLE: LazyLock<Vec<Category>> = LazyLock::new(|| {
    SummaryCategory::ALL
        .into_iter()
        .map(|name| Category {
            name,
            terms: category_terms(name)
                .iter()
                .map(|t| {
                    let pattern = format!(r"(?i)\b{}\b", regex::escape(t).replace(' ', r"\s+"));
                    (*t, Regex::new(&pattern).expect("valid term regex"))
                })
                .collect(),
        })
        .collect()
});

/// Tag every untagged event. Decisions get the decision pair, others `Process`.
pub fn map_ontology(mut events: Vec<Event>) -> Vec<Event> {
    let mut tagged = 0usize;
    for event in events.iter_mut().filter(|e| e.ontology.rdf_types.is_empty()) {
        event.ontology.rdf_types = if event.is_decision() {
            OntologyTag::DECISION_TAGS.to_vec()
        } else {
            vec![OntologyTag::Process]
        };
        tagged += 1;
    }
    tracing::debug!(tagged, "ontology mapping complete");
    events
}

/// Keyword summary over event text. Each term is recorded at most once per event.
pub fn summarize_ontology(events: &[Event], participants: &BTreeSet<String>) -> OntologySummary {
    let mut summary = OntologySummary {
        roles: participants.iter().cloned().collect(),
        ..OntologySummary::default()
    };

    for category in CATEGORY_TABLE.iter() {
        let hits: Vec<TermHit> = events
            .iter()
            .flat_map(|event| {
                category
                    .terms
                    .iter()
                    .filter(move |(_, re)| re.is_match(&event.text))
                    .map(move |(term, _)| TermHit {
                        event_id: event.id.clone(),
                        term: term.to_string(),
                    })
            })
            .collect();

        *category_hits(&mut summary, category.name) = hits;
    }

    summary
}

/// An entity known to an ontology source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OntologyEntity {
    pub category: SummaryCategory,
    pub label: String,
}

/// External ontology source for collaborators that want real entity mapping.
/// The pipeline's own stages do not consult it.
pub trait OntologyLookup {
    fn entities(&self, category: &str) -> Vec<OntologyEntity>;

    /// Candidate entities for a free-text concept, best match first, with a
    /// similarity score in `[0, 1]`.
    fn map_concept(&self, concept: &str) -> Vec<(OntologyEntity, f32)>;
}

/// Lookup backed by the built-in summary vocabulary.
pub struct KeywordOntology;

impl OntologyLookup for KeywordOntology {
    fn entities(&self, category: &str) -> Vec<OntologyEntity> {
        let Ok(category) = category.parse::<SummaryCategory>() else {
            return Vec::new();
        };
        CATEGORY_TABLE
            .iter()
            .filter(|c| c.name == category)
            .flat_map(|c| {
                c.terms.iter().map(move |(term, _)| OntologyEntity {
                    category: c.name,
                    label: term.to_string(),
                })
            })
            .collect()
    }

    fn map_concept(&self, concept: &str) -> Vec<(OntologyEntity, f32)> {
        let needle = concept.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        let mut matches: Vec<(OntologyEntity, f32)> = CATEGORY_TABLE
            .iter()
            .flat_map(|c| c.terms.iter().map(move |(term, _)| (c.name, *term)))
            .filter_map(|(category, term)| {
                let score = if term == needle {
                    1.0
                } else if term.contains(needle.as_str()) || needle.contains(term) {
                    0.5
                } else {
                    return None;
                };
                Some((
                    OntologyEntity {
                        category,
                        label: term.to_string(),
                    },
                    score,
                ))
            })
            .collect();

        matches.sort_by(|a, b| b.1.total_cmp(&a.1));
        matches
    }
}
