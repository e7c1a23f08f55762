//! Prompt text sent to every provider

use crate::provider::ExtractionRequest;

pub const SYSTEM_PROMPT: &str = "You extract structured data from clinical study documents. \
Answer with a single JSON object and nothing else. Only report values that are \
stated in the document. For every field, copy the exact text the value was read \
from, character for character, so it can be found in the document again.";

/// User message: field list, answer format, then the document itself
pub fn build_user_prompt(request: &ExtractionRequest) -> String {
    let mut prompt = String::from("Extract the following fields:\n");

    for field in &request.fields {
        prompt.push_str(&format!("- {}", field.name));
        if let Some(kind) = &field.field_type {
            prompt.push_str(&format!(" ({})", kind));
        }
        if let Some(description) = &field.description {
            prompt.push_str(&format!(": {}", description));
        }
        prompt.push('\n');
    }

    prompt.push_str(
        r#"
Return JSON of this shape, one key per field:
{
  "<fieldName>": {
    "value": <string, number or boolean>,
    "confidence": "high" | "medium" | "low",
    "sourceLocation": {
      "page": <page number>,
      "section": "<section heading>",
      "specificLocation": "<e.g. table 2, paragraph 3>",
      "exactTextReference": "<verbatim quote containing the value>"
    },
    "notes": "<optional>"
  }
}
Use null as the value when a field is not reported in the document.
"#,
    );

    if let Some(instructions) = request.instructions.as_deref().filter(|s| !s.trim().is_empty()) {
        prompt.push_str("\nAdditional instructions:\n");
        prompt.push_str(instructions.trim());
        prompt.push('\n');
    }

    prompt.push_str("\nDocument:\n");
    prompt.push_str(&request.document_text);
    prompt
}
