//! Stage 2: lexical role classification of sentences.
//!
//! Three indicator sets (decision, action, outcome) plus section boosts. When
//! several labels match, the highest `EventKind::precedence` wins. Confidence is
//! a small set of fixed constants, not a probability.

use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::{EventKind, Section, Sentence};

/// Confidence constants for each way a label can be reached.
pub mod confidence {
    /// Decision reinforced by the Question section.
    pub const SECTION_DECISION: f32 = 0.8;
    /// Outcome with both a lexical hit and the Conclusion boost.
    pub const REINFORCED_OUTCOME: f32 = 0.7;
    /// Any single lexical hit or section default.
    pub const LEXICAL: f32 = 0.6;
    /// No indicator matched.
    pub const UNCLASSIFIED: f32 = 0.4;
}

/// Question-section sentences shorter than this default toward Decision.
const SHORT_QUESTION_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub labels: BTreeSet<EventKind>,
    pub primary: EventKind,
    pub confidence: f32,
}

static DECISION_INDICATORS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?i)\b(?:should|must|ought\s+to|shall)\b",
        r"(?i)\b(?:obligat(?:ed|ion|ions)|duty\s+to|duties\s+to|required\s+to|responsib(?:le|ility)\s+(?:to|for))\b",
        r"(?i)\b(?:whether\s+to|whether\s+or\s+not|decide[sd]?|decision\s+to|chose\s+to|choose\s+to)\b",
        r"(?i)\b(?:ethical(?:ly)?\s+(?:obligat\w*|duty|responsib\w*|permissible|required))\b",
        r"(?i)\b(?:I|we)\s+(?:must|should|have\s+to|need\s+to|am\s+obligated|are\s+obligated|owe)\b",
    ])
});

static ACTION_INDICATORS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?i)\b(?:designed|reviewed|approved|signed|sealed|submitted|reported|disclosed|informed|notified)\b",
        r"(?i)\b(?:hired|retained|contracted|prepared|issued|completed|inspected|certified|accepted|refused)\b",
        r"(?i)\b(?:recommended|requested|agreed|declined|resigned|terminated|modified|discovered|performed|provided)\b",
        r"(?i)\b(?:met|wrote|sent|told|asked|began|started|stopped|changed|delivered|filed|proposed|rejected)\b",
    ])
});

static OUTCOME_INDICATORS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?i)\b(?:therefore|thus|hence|consequently|accordingly)\b",
        r"(?i)\b(?:as\s+a\s+result|as\s+a\s+consequence|resulted\s+in|results\s+in|led\s+to|leading\s+to)\b",
        r"(?i)\b(?:because\s+of\s+this|due\s+to\s+this|in\s+conclusion|it\s+follows\s+that)\b",
    ])
});

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("valid classifier regex"))
        .collect()
}

fn any_match(indicators: &[Regex], text: &str) -> bool {
    indicators.iter().any(|re| re.is_match(text))
}

/// Classify a single sentence. Total: always yields exactly one primary label.
pub fn classify_sentence(sentence: &Sentence) -> ClassificationResult {
    let text = sentence.text.as_str();
    let mut labels = BTreeSet::new();

    let lexical_decision = any_match(&DECISION_INDICATORS, text);
    let lexical_action = any_match(&ACTION_INDICATORS, text);
    let lexical_outcome = any_match(&OUTCOME_INDICATORS, text);

    if lexical_decision {
        labels.insert(EventKind::Decision);
    }
    if lexical_action {
        labels.insert(EventKind::Action);
    }
    if lexical_outcome {
        labels.insert(EventKind::Outcome);
    }

    let question_boost = sentence.section == Section::Question
        && (text.contains('?') || text.chars().count() < SHORT_QUESTION_CHARS);
    let conclusion_boost = sentence.section == Section::Conclusion;

    if question_boost {
        labels.insert(EventKind::Decision);
    }
    if conclusion_boost {
        labels.insert(EventKind::Outcome);
    }

    let primary = labels
        .iter()
        .copied()
        .max_by_key(EventKind::precedence)
        .unwrap_or(EventKind::Context);

    let confidence = match primary {
        EventKind::Decision if question_boost => confidence::SECTION_DECISION,
        EventKind::Outcome if conclusion_boost && lexical_outcome => {
            confidence::REINFORCED_OUTCOME
        }
        EventKind::Decision | EventKind::Action | EventKind::Outcome => confidence::LEXICAL,
        EventKind::Context => confidence::UNCLASSIFIED,
    };

    if labels.is_empty() {
        labels.insert(EventKind::Context);
    }

    ClassificationResult {
        labels,
        primary,
        confidence,
    }
}

/// Classify every sentence, keyed by sentence id.
pub fn classify_sentences(sentences: &[Sentence]) -> HashMap<String, ClassificationResult> {
    let results: HashMap<String, ClassificationResult> = sentences
        .iter()
        .map(|s| (s.id.clone(), classify_sentence(s)))
        .collect();

    tracing::debug!(
        sentences = results.len(),
        decisions = results.values().filter(|r| r.primary.is_decision()).count(),
        "classification complete"
    );
    results
}
