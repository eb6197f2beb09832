//! Stage 4: participant mentions.
//!
//! Case narratives anonymize actors as `<Role> <Identifier>` ("Engineer A",
//! "Client W", "Firm XYZ"). Those are the primary signal. Bare role words are
//! only used in Question/Conclusion events that carry no full mention.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::{Event, Section};

const ROLE_WORDS: &[&str] = &[
    "Engineer",
    "Client",
    "Owner",
    "Contractor",
    "Subcontractor",
    "Employer",
    "Employee",
    "Firm",
    "Company",
    "Architect",
    "Developer",
    "Board",
    "Official",
    "Supervisor",
    "Manager",
    "Consultant",
    "Agency",
    "Inspector",
    "Surveyor",
    "Attorney",
    "Officer",
    "Member",
    "Doctor",
    "Physician",
    "Nurse",
    "Professor",
    "Student",
];

/// Capitalized words that follow a role word without naming anyone.
/// Single letters are identifiers ("Engineer A"), never stop words.
const STOP_WORDS: &[&str] = &[
    "The", "An", "And", "Or", "But", "If", "In", "On", "Of", "At", "To", "For", "By",
    "With", "Should", "Would", "Could", "Must", "May", "Was", "Is", "Has", "Had", "Did", "Does",
    "Will", "This", "That", "It", "He", "She", "They", "We",
];

static ROLE_MENTION: LazyLock<Regex> = LazyLock::new(|| {
    let roles = ROLE_WORDS.join("|");
    Regex::new(&format!(r"\b({roles})\s+([A-Z][A-Za-z0-9]*)\b")).expect("valid role regex")
});

static BARE_ROLE: LazyLock<Regex> = LazyLock::new(|| {
    let roles = ROLE_WORDS.join("|");
    Regex::new(&format!(r"(?i)\b({roles})s?\b")).expect("valid bare role regex")
});

/// Participant mentions in one piece of text.
pub fn extract_participants(text: &str, section: Section) -> BTreeSet<String> {
    let mut found: BTreeSet<String> = ROLE_MENTION
        .captures_iter(text)
        .filter_map(|caps| {
            let role = caps.get(1)?.as_str();
            let ident = caps.get(2)?.as_str();
            if STOP_WORDS.contains(&ident) {
                return None;
            }
            Some(format!("{role} {ident}"))
        })
        .collect();

    if found.is_empty() && matches!(section, Section::Question | Section::Conclusion) {
        found.extend(
            BARE_ROLE
                .captures_iter(text)
                .filter_map(|caps| caps.get(1))
                .map(|m| capitalize(m.as_str())),
        );
    }

    found
}

/// Fill each event's participant set and return the case-wide union.
///
/// Only adds; participants already on an event are kept.
pub fn annotate_participants(events: &mut [Event]) -> BTreeSet<String> {
    let mut all = BTreeSet::new();
    for event in events.iter_mut() {
        let found = extract_participants(&event.text, event.section);
        event.participants.extend(found);
        all.extend(event.participants.iter().cloned());
    }
    tracing::debug!(participants = all.len(), "participant extraction complete");
    all
}

fn capitalize(word: &str) -> String {
    let lower = word.to_ascii_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
