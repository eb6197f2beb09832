use crate::models::Event;

pub const REFINEMENT_SYSTEM_PROMPT: &str = r#"
You are an assistant for professional ethics case review. You read a numbered
list of timeline events from an ethics case and identify the decision points:
moments where a professional had to choose between courses of action with
ethical weight.

RULES:
1. Only select events whose text states or implies a choice.
2. Refer to events ONLY by their index number from the list.
3. Give each decision a short title, a one-sentence question, and between two
   and six concrete options.
4. Do not invent facts that are not in the events.
5. Output MUST be a single JSON block wrapped in ```json``` fences.
"#;

/// Build the refinement prompt over indexed events.
pub fn build_refinement_prompt(events: &[Event]) -> String {
    let listing: String = events
        .iter()
        .enumerate()
        .map(|(i, e)| format!("[{i}] ({}, {}) {}\n", e.section, e.kind, e.text))
        .collect();

    format!(
        r#"<events>
{listing}</events>

Identify the decision points among the events above. Respond with this JSON structure:

```json
{{
  "decisions": [
    {{
      "event_index": 0,
      "title": "Short title",
      "question": "Should the professional ...?",
      "options": [
        {{"label": "Option label", "description": "What choosing it means"}}
      ]
    }}
  ]
}}
```"#
    )
}
