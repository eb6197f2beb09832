//! Stage 3: temporal evidence from sentence text.
//!
//! Only two shapes are recognized: `Month YYYY` and a bare four-digit year.
//! Everything else is `Unknown`.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::models::{Granularity, NormalizedSpan, TemporalInfo, TemporalKind};

const MONTH_YEAR_CONFIDENCE: f32 = 0.8;
const YEAR_CONFIDENCE: f32 = 0.5;

static MONTH_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\.?,?\s+((?:18|19|20)\d{2})\b",
    )
    .expect("valid month-year regex")
});

static BARE_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b((?:18|19|20)\d{2})\b").expect("valid year regex"));

/// Extract the first recognizable date expression. Never fails.
pub fn extract_temporal(text: &str) -> TemporalInfo {
    if let Some(info) = month_year(text) {
        return info;
    }
    if let Some(info) = bare_year(text) {
        return info;
    }
    TemporalInfo::unknown()
}

fn month_year(text: &str) -> Option<TemporalInfo> {
    let caps = MONTH_YEAR.captures(text)?;
    let month = month_number(caps.get(1)?.as_str())?;
    let year: i32 = caps.get(2)?.as_str().parse().ok()?;
    let start = NaiveDate::from_ymd_opt(year, month, 1)?;

    Some(TemporalInfo {
        raw: Some(caps.get(0)?.as_str().to_string()),
        kind: TemporalKind::Interval,
        normalized: Some(NormalizedSpan {
            start: Some(start),
            end: None,
            granularity: Granularity::Month,
        }),
        confidence: MONTH_YEAR_CONFIDENCE,
    })
}

fn bare_year(text: &str) -> Option<TemporalInfo> {
    let m = BARE_YEAR.find(text)?;
    let year: i32 = m.as_str().parse().ok()?;

    Some(TemporalInfo {
        raw: Some(m.as_str().to_string()),
        kind: TemporalKind::Interval,
        normalized: Some(NormalizedSpan {
            start: NaiveDate::from_ymd_opt(year, 1, 1),
            end: NaiveDate::from_ymd_opt(year, 12, 31),
            granularity: Granularity::Year,
        }),
        confidence: YEAR_CONFIDENCE,
    })
}

fn month_number(name: &str) -> Option<u32> {
    let prefix: String = name.chars().take(3).collect::<String>().to_ascii_lowercase();
    let n = match prefix.as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(n)
}
