use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::event::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioStats {
    pub event_count: usize,
    pub decision_count: usize,
    pub sentence_count: usize,
}

/// One `(event_id, matched_term)` hit in the ontology summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermHit {
    pub event_id: String,
    pub term: String,
}

/// Keyword-based categorical summary for human review. Not authoritative.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OntologySummary {
    pub values: Vec<TermHit>,
    pub obligations: Vec<TermHit>,
    pub constraints: Vec<TermHit>,
    pub states: Vec<TermHit>,
    pub resources: Vec<TermHit>,
    pub roles: Vec<String>,
}

/// Immutable output of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioVersion {
    pub pipeline_version: String,
    pub generated_at: DateTime<Utc>,
    pub case_id: Uuid,
    pub events: Vec<Event>,
    pub ordering: Vec<String>,
    pub stats: ScenarioStats,
    pub participants: BTreeSet<String>,
    pub ontology_summary: OntologySummary,
    pub hash: String,
    /// Assigned at commit time. 0 until then.
    pub version_number: u32,
}

/// The case metadata blob. Keys the pipeline does not own are carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaseMetadata {
    #[serde(default)]
    pub scenario_versions: Vec<ScenarioVersion>,
    #[serde(default)]
    pub latest_scenario: Option<ScenarioVersion>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl CaseMetadata {
    pub fn last_version(&self) -> Option<&ScenarioVersion> {
        self.scenario_versions.last()
    }
}
