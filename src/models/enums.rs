use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

// Declaration order is the canonical processing order.
str_enum!(Section {
    Facts => "facts",
    Discussion => "discussion",
    Question => "question",
    Conclusion => "conclusion",
});

str_enum!(EventKind {
    Context => "context",
    Action => "action",
    Decision => "decision",
    Outcome => "outcome",
});

str_enum!(TemporalKind {
    Interval => "interval",
    Unknown => "unknown",
});

str_enum!(Granularity {
    Day => "day",
    Month => "month",
    Year => "year",
});

str_enum!(OntologyTag {
    Process => "bfo:Process",
    ProcessBoundary => "bfo:ProcessBoundary",
    DecisionPoint => "proeth:DecisionPoint",
});

str_enum!(SummaryCategory {
    Values => "values",
    Obligations => "obligations",
    Constraints => "constraints",
    States => "states",
    Resources => "resources",
});

impl SummaryCategory {
    pub const ALL: [SummaryCategory; 5] = [
        SummaryCategory::Values,
        SummaryCategory::Obligations,
        SummaryCategory::Constraints,
        SummaryCategory::States,
        SummaryCategory::Resources,
    ];
}

impl Section {
    pub const CANONICAL_ORDER: [Section; 4] = [
        Section::Facts,
        Section::Discussion,
        Section::Question,
        Section::Conclusion,
    ];

    /// Source key spellings accepted for this section, tried in order.
    pub fn key_variants(&self) -> &'static [&'static str] {
        match self {
            Self::Facts => &["facts", "fact"],
            Self::Discussion => &["discussion", "discussions"],
            Self::Question => &["question", "questions"],
            Self::Conclusion => &["conclusion", "conclusions"],
        }
    }

    /// Resolve a raw section key (any case, singular or plural) to its canonical section.
    pub fn from_key(raw: &str) -> Option<Section> {
        let key = raw.trim().to_ascii_lowercase();
        Self::CANONICAL_ORDER
            .into_iter()
            .find(|section| section.key_variants().contains(&key.as_str()))
    }
}

impl EventKind {
    /// Rank used when several labels match one sentence. Higher wins.
    pub fn precedence(&self) -> u8 {
        match self {
            Self::Decision => 3,
            Self::Action => 2,
            Self::Outcome => 1,
            Self::Context => 0,
        }
    }

    pub fn is_decision(&self) -> bool {
        matches!(self, Self::Decision)
    }
}

impl OntologyTag {
    /// Tag pair carried by every decision juncture.
    pub const DECISION_TAGS: [OntologyTag; 2] =
        [OntologyTag::ProcessBoundary, OntologyTag::DecisionPoint];

    pub fn is_decision_tag(&self) -> bool {
        matches!(self, Self::ProcessBoundary | Self::DecisionPoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn section_round_trip() {
        for (variant, s) in [
            (Section::Facts, "facts"),
            (Section::Discussion, "discussion"),
            (Section::Question, "question"),
            (Section::Conclusion, "conclusion"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(Section::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn event_kind_round_trip() {
        for (variant, s) in [
            (EventKind::Context, "context"),
            (EventKind::Action, "action"),
            (EventKind::Decision, "decision"),
            (EventKind::Outcome, "outcome"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(EventKind::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn section_keys_tolerate_plural_and_case() {
        assert_eq!(Section::from_key("questions"), Some(Section::Question));
        assert_eq!(Section::from_key("Question"), Some(Section::Question));
        assert_eq!(Section::from_key("CONCLUSIONS"), Some(Section::Conclusion));
        assert_eq!(Section::from_key(" facts "), Some(Section::Facts));
        assert_eq!(Section::from_key("references"), None);
    }

    #[test]
    fn canonical_order_matches_ord() {
        let mut sorted = Section::CANONICAL_ORDER;
        sorted.sort();
        assert_eq!(sorted, Section::CANONICAL_ORDER);
    }

    #[test]
    fn precedence_decision_over_action_over_outcome() {
        assert!(EventKind::Decision.precedence() > EventKind::Action.precedence());
        assert!(EventKind::Action.precedence() > EventKind::Outcome.precedence());
        assert!(EventKind::Outcome.precedence() > EventKind::Context.precedence());
    }

    #[test]
    fn ontology_tag_serializes_as_curie() {
        let json = serde_json::to_string(&OntologyTag::DecisionPoint).unwrap();
        assert_eq!(json, "\"proeth:DecisionPoint\"");
        assert!(OntologyTag::ProcessBoundary.is_decision_tag());
        assert!(!OntologyTag::Process.is_decision_tag());
    }

    #[test]
    fn invalid_enum_returns_error() {
        assert!(Section::from_str("appendix").is_err());
        assert!(EventKind::from_str("").is_err());
        assert!(Granularity::from_str("week").is_err());
    }
}
