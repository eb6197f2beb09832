//! Stage 5: group classified sentences into timeline events.

use std::collections::HashMap;

use crate::models::{Event, EventKind, Section, SegmentedNarrative, Sentence};

use super::classify::ClassificationResult;
use super::temporal::extract_temporal;

/// Spacing between consecutive `order` values, leaving room for later inserts.
pub const ORDER_STEP: u32 = 10;

/// Group sentences into events.
///
/// Consecutive sentences sharing a primary label and a section form one event.
/// Decision sentences are always emitted alone. Sentences without a
/// classification count as Context.
pub fn assemble_events(
    narrative: &SegmentedNarrative,
    classifications: &HashMap<String, ClassificationResult>,
) -> Vec<Event> {
    let mut events = Vec::new();
    let mut run: Vec<&Sentence> = Vec::new();
    let mut run_key: Option<(EventKind, Section)> = None;

    for sentence in &narrative.sentences {
        let kind = classifications
            .get(&sentence.id)
            .map(|c| c.primary)
            .unwrap_or(EventKind::Context);
        let key = (kind, sentence.section);

        if run_key != Some(key) || kind.is_decision() {
            flush(&mut run, run_key, &mut events);
        }
        run.push(sentence);
        run_key = Some(key);
    }
    flush(&mut run, run_key, &mut events);

    tracing::debug!(
        events = events.len(),
        decisions = events.iter().filter(|e| e.is_decision()).count(),
        "event assembly complete"
    );
    events
}

fn flush(run: &mut Vec<&Sentence>, key: Option<(EventKind, Section)>, events: &mut Vec<Event>) {
    let Some((kind, section)) = key else {
        return;
    };
    if run.is_empty() {
        return;
    }

    let members: Vec<&Sentence> = std::mem::take(run);
    let groups: Vec<Vec<&Sentence>> = if kind.is_decision() {
        members.into_iter().map(|s| vec![s]).collect()
    } else {
        vec![members]
    };

    for group in groups {
        let n = events.len() as u32 + 1;
        let text = group
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let sentence_ids = group.iter().map(|s| s.id.clone()).collect();

        let mut event = Event::new(format!("e{n}"), kind, section, sentence_ids, text);
        event.temporal = extract_temporal(&group[0].text);
        event.order = n * ORDER_STEP;
        events.push(event);
    }
}
