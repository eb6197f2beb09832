use serde::Deserialize;

use super::{DecisionRefinement, RefinementError};

/// Parse the LLM reply into refinement proposals.
///
/// Reads the first ```json fenced block, or the whole reply when there is no
/// fence. Accepts either `{"decisions": [...]}` or a bare array. Items that do
/// not deserialize are dropped.
pub fn parse_refinement_response(
    response: &str,
) -> Result<Vec<DecisionRefinement>, RefinementError> {
    let json_str = extract_json_block(response)?;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawResponse {
        Wrapped { decisions: Vec<serde_json::Value> },
        Bare(Vec<serde_json::Value>),
    }

    let raw: RawResponse = serde_json::from_str(&json_str)
        .map_err(|e| RefinementError::JsonParsing(e.to_string()))?;

    let items = match raw {
        RawResponse::Wrapped { decisions } => decisions,
        RawResponse::Bare(items) => items,
    };

    Ok(parse_array_lenient(&items))
}

fn extract_json_block(response: &str) -> Result<String, RefinementError> {
    let Some(fence_start) = response.find("```json") else {
        return Ok(response.trim().to_string());
    };
    let content_start = fence_start + "```json".len();

    let content_end = response[content_start..]
        .find("```")
        .ok_or_else(|| RefinementError::MalformedResponse("Unclosed JSON block".into()))?;

    Ok(response[content_start..content_start + content_end]
        .trim()
        .to_string())
}

/// Parse an array leniently, skipping items that fail to deserialize.
fn parse_array_lenient<T: for<'de> Deserialize<'de>>(items: &[serde_json::Value]) -> Vec<T> {
    items
        .iter()
        .filter_map(|v| serde_json::from_value(v.clone()).ok())
        .collect()
}
