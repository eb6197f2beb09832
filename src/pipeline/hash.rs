//! Scenario content hash used to deduplicate versions.
//!
//! The hash covers only `(event_count, decision_count, sentence_count)`. Two
//! timelines that differ in text, labels or options but agree on all three
//! counts hash the same, and a rerun after such a change will reuse the
//! previous version instead of appending. Pass `overwrite` to force an append.

use base64::Engine;
use sha2::{Digest, Sha256};

use crate::models::ScenarioStats;

/// SHA-256 over the canonical stats string, base64 encoded.
pub fn compute_scenario_hash(stats: &ScenarioStats) -> String {
    let canonical = format!(
        "event_count={};decision_count={};sentence_count={}",
        stats.event_count, stats.decision_count, stats.sentence_count
    );
    let hash = Sha256::digest(canonical.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(hash)
}
