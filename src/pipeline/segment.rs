//! Stage 1: split raw section text into paragraphs and sentences.
//!
//! Sections are visited in canonical order (facts, discussion, question,
//! conclusion). Each canonical section is read from the first key variant that
//! carries non-blank text, so a case holding both `question` and `questions`
//! contributes its question sentences once.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::{Paragraph, Section, SectionMap, SegmentedNarrative, Sentence};

/// Fragments this short (in chars) are noise, not sentences.
const MIN_SENTENCE_CHARS: usize = 3;

/// Words whose trailing period does not end a sentence.
const ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "prof", "st", "inc", "co", "corp", "ltd", "jr", "sr", "vs",
    "etc", "e.g", "i.e", "approx",
];

static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t\r]*\n").expect("valid paragraph regex"));

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Segment every non-empty canonical section into paragraphs and sentences.
pub fn segment_sections(sections: &SectionMap) -> SegmentedNarrative {
    let lookup: HashMap<String, (&str, &str)> = sections
        .iter()
        .map(|(key, text)| (key.trim().to_ascii_lowercase(), (key.as_str(), text.as_str())))
        .collect();

    let mut out = SegmentedNarrative::default();

    for section in Section::CANONICAL_ORDER {
        let source = section
            .key_variants()
            .iter()
            .filter_map(|variant| lookup.get(*variant))
            .find(|(_, text)| !text.trim().is_empty());

        let Some((raw_key, text)) = source else {
            continue;
        };

        segment_section(section, raw_key, text, &mut out);
    }

    tracing::debug!(
        paragraphs = out.paragraphs.len(),
        sentences = out.sentences.len(),
        "segmentation complete"
    );
    out
}

fn segment_section(section: Section, raw_key: &str, text: &str, out: &mut SegmentedNarrative) {
    let mut paragraph_index = 0;

    for block in PARAGRAPH_BREAK.split(text) {
        let normalized = WHITESPACE_RUN.replace_all(block.trim(), " ");
        if normalized.is_empty() {
            continue;
        }

        let sentences = split_sentences(&normalized);
        if sentences.is_empty() {
            continue;
        }

        let mut sentence_ids = Vec::with_capacity(sentences.len());
        for (sentence_index, sentence_text) in sentences.into_iter().enumerate() {
            let id = format!("s{}", out.sentences.len() + 1);
            sentence_ids.push(id.clone());
            out.sentences.push(Sentence {
                id,
                text: sentence_text,
                section,
                raw_section_key: raw_key.to_string(),
                paragraph_index,
                sentence_index,
            });
        }

        out.paragraphs.push(Paragraph {
            id: format!("p{}", out.paragraphs.len() + 1),
            text: normalized.into_owned(),
            section,
            raw_section_key: raw_key.to_string(),
            sentence_ids,
        });
        paragraph_index += 1;
    }
}

/// Split a whitespace-normalized paragraph into sentences.
///
/// A boundary is terminal punctuation (plus any closing quotes/brackets),
/// whitespace, then an uppercase letter, digit or opening quote.
pub fn split_sentences(paragraph: &str) -> Vec<String> {
    let chars: Vec<(usize, char)> = paragraph.char_indices().collect();
    let mut pieces = Vec::new();
    let mut start = 0usize;
    let mut i = 0usize;

    while i < chars.len() {
        let (byte_pos, c) = chars[i];
        if !matches!(c, '.' | '!' | '?') {
            i += 1;
            continue;
        }

        let mut after_closers = i + 1;
        while after_closers < chars.len() && is_closer(chars[after_closers].1) {
            after_closers += 1;
        }
        let mut next_start = after_closers;
        while next_start < chars.len() && chars[next_start].1.is_whitespace() {
            next_start += 1;
        }

        let is_boundary = next_start > after_closers
            && next_start < chars.len()
            && opens_sentence(chars[next_start].1)
            && !(c == '.' && ends_with_abbreviation(&paragraph[start..byte_pos], chars[next_start].1));

        if is_boundary {
            let end = chars[after_closers].0;
            pieces.push(&paragraph[start..end]);
            start = chars[next_start].0;
            i = next_start;
        } else {
            i = after_closers;
        }
    }
    pieces.push(&paragraph[start..]);

    pieces
        .into_iter()
        .map(str::trim)
        .filter(|s| s.chars().count() >= MIN_SENTENCE_CHARS)
        .map(str::to_string)
        .collect()
}

fn is_closer(c: char) -> bool {
    matches!(c, '"' | '\'' | ')' | ']' | '\u{201D}' | '\u{2019}')
}

fn opens_sentence(c: char) -> bool {
    c.is_uppercase() || c.is_ascii_digit() || matches!(c, '"' | '\'' | '(' | '\u{201C}' | '\u{2018}')
}

/// "No." only abbreviates "number" when a digit follows ("No. 7").
fn ends_with_abbreviation(preceding: &str, next: char) -> bool {
    let last_word = preceding
        .rsplit(|c: char| c.is_whitespace() || c == '(')
        .next()
        .unwrap_or("")
        .to_ascii_lowercase();
    if last_word == "no" {
        return next.is_ascii_digit();
    }
    ABBREVIATIONS.contains(&last_word.as_str())
}
