//! Boundary normalization of provider answers
//!
//! Models answer in more than one shape: the current nested one, an older flat
//! one, bare `field: value` maps, or arrays of field objects. Everything is
//! mapped to `ExtractedFieldResult` here so nothing past the orchestrator has
//! to guess.
//!
//! ```text
//! {"totalN": {"value": 120, "sourceLocation": {"page": 4, "exactTextReference": "N = 120"}}}
//! {"totalN": {"value": 120, "page": 4, "quote": "N = 120"}}
//! {"totalN": 120}
//! [{"fieldName": "totalN", "value": 120}]
//! ```

use serde_json::{Map, Value};
use shared_types::{Confidence, ExtractedFieldResult, FieldValue, SourceLocation};

use crate::error::NormalizeError;

const WRAPPER_KEYS: &[&str] = &["fields", "extractions", "results", "data"];
const NAME_KEYS: &[&str] = &["fieldName", "field_name", "field", "name"];
const QUOTE_KEYS: &[&str] = &[
    "exactTextReference",
    "exact_text_reference",
    "exactText",
    "exact_text",
    "quote",
    "sourceText",
    "source_text",
];

/// Map any accepted provider answer to canonical field results
///
/// Fields whose value is null are dropped.
pub fn normalize_extraction(raw: &Value) -> Result<Vec<ExtractedFieldResult>, NormalizeError> {
    match raw {
        Value::Object(map) => {
            if let Some(inner) = unwrap_wrapper(map) {
                return normalize_extraction(inner);
            }
            Ok(map
                .iter()
                .filter_map(|(name, entry)| normalize_entry(name, entry))
                .collect())
        }
        Value::Array(items) => {
            let mut fields = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                let entry = item
                    .as_object()
                    .ok_or(NormalizeError::MissingFieldName(index))?;
                let name = first_str(entry, NAME_KEYS)
                    .filter(|n| !n.trim().is_empty())
                    .ok_or(NormalizeError::MissingFieldName(index))?;
                if let Some(field) = normalize_entry(name, item) {
                    fields.push(field);
                }
            }
            Ok(fields)
        }
        other => Err(NormalizeError::UnsupportedShape(kind_of(other))),
    }
}

/// `{"fields": {...}}` and friends, unless the wrapper key is itself a field
fn unwrap_wrapper(map: &Map<String, Value>) -> Option<&Value> {
    WRAPPER_KEYS.iter().find_map(|key| match map.get(*key) {
        Some(inner @ Value::Array(_)) => Some(inner),
        Some(inner @ Value::Object(o)) if !o.contains_key("value") => Some(inner),
        _ => None,
    })
}

fn normalize_entry(name: &str, entry: &Value) -> Option<ExtractedFieldResult> {
    let Value::Object(obj) = entry else {
        return field_value(entry).map(|value| ExtractedFieldResult {
            field_name: name.to_string(),
            value,
            confidence: Confidence::Medium,
            source_location: None,
            notes: None,
        });
    };

    let Some(raw_value) = obj.get("value") else {
        // an object without a value key is itself the value
        return field_value(entry).map(|value| ExtractedFieldResult::new(name, value));
    };
    let value = field_value(raw_value)?;

    let confidence = obj
        .get("confidence")
        .and_then(Value::as_str)
        .and_then(Confidence::parse)
        .unwrap_or_default();

    let source_location = match obj
        .get("sourceLocation")
        .or_else(|| obj.get("source_location"))
    {
        Some(Value::Object(loc)) => Some(location_from(
            loc,
            &["specificLocation", "specific_location"],
        )),
        _ => legacy_location(obj),
    };

    Some(ExtractedFieldResult {
        field_name: name.to_string(),
        value,
        confidence,
        source_location,
        notes: first_str(obj, &["notes"]).map(str::to_string),
    })
}

/// Flat layout where location keys sit next to `value`
fn legacy_location(obj: &Map<String, Value>) -> Option<SourceLocation> {
    let has_any = ["page", "section", "location"]
        .iter()
        .chain(QUOTE_KEYS)
        .any(|k| obj.get(*k).is_some_and(|v| !v.is_null()));
    has_any.then(|| {
        location_from(obj, &["location", "specificLocation", "specific_location"])
    })
}

fn location_from(obj: &Map<String, Value>, specific_keys: &[&str]) -> SourceLocation {
    SourceLocation {
        page: obj.get("page").and_then(page_number).unwrap_or(0),
        section: first_str(obj, &["section"]).map(str::to_string),
        specific_location: first_str(obj, specific_keys).map(str::to_string),
        exact_text_reference: first_str(obj, QUOTE_KEYS).map(str::to_string),
    }
}

/// Page numbers arrive as numbers, numeric strings, or "p. 4"
fn page_number(v: &Value) -> Option<u32> {
    match v {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => {
            let digits: String = s
                .chars()
                .skip_while(|c| !c.is_ascii_digit())
                .take_while(char::is_ascii_digit)
                .collect();
            digits.parse().ok()
        }
        _ => None,
    }
}

fn field_value(v: &Value) -> Option<FieldValue> {
    match v {
        Value::Null => None,
        Value::Bool(b) => Some(FieldValue::Bool(*b)),
        Value::Number(n) => Some(FieldValue::Number(n.clone())),
        Value::String(s) => Some(FieldValue::Text(s.clone())),
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .filter_map(field_value)
                .map(|v| v.to_string())
                .collect();
            Some(FieldValue::Text(parts.join(", ")))
        }
        Value::Object(_) => Some(FieldValue::Text(v.to_string())),
    }
}

fn first_str<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|k| obj.get(*k).and_then(Value::as_str))
}

fn kind_of(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
