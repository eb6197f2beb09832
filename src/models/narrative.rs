use serde::{Deserialize, Serialize};

use super::enums::Section;

/// One sentence of the case narrative. Ids run `s1..sN` across all sections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sentence {
    pub id: String,
    pub text: String,
    pub section: Section,
    pub raw_section_key: String,
    /// 0-based within the section.
    pub paragraph_index: usize,
    /// 0-based within the paragraph.
    pub sentence_index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paragraph {
    pub id: String,
    pub text: String,
    pub section: Section,
    pub raw_section_key: String,
    pub sentence_ids: Vec<String>,
}

/// Flat output of segmentation, in document order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SegmentedNarrative {
    pub paragraphs: Vec<Paragraph>,
    pub sentences: Vec<Sentence>,
}

impl SegmentedNarrative {
    pub fn sentence_count(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }
}
