//! Extracted and grounded field results

use serde::{Deserialize, Serialize};
use std::fmt;

/// Value reported by an extraction agent
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    /// Kept as a JSON number so `120` stringifies as `"120"`, not `"120.0"`
    Number(serde_json::Number),
    Text(String),
}

impl FieldValue {
    /// True for text that is blank after trimming
    pub fn is_empty(&self) -> bool {
        matches!(self, FieldValue::Text(s) if s.trim().is_empty())
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Number(n.into())
    }
}

impl From<i32> for FieldValue {
    fn from(n: i32) -> Self {
        FieldValue::Number(n.into())
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

/// Agent-reported confidence
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    #[default]
    Medium,
    Low,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }

    /// Lenient parse used at the provider boundary
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "high" | "h" => Some(Confidence::High),
            "medium" | "med" | "m" | "moderate" => Some(Confidence::Medium),
            "low" | "l" => Some(Confidence::Low),
            _ => None,
        }
    }
}

/// Provenance claimed by the model itself. A hint, never ground truth.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceLocation {
    pub page: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specific_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exact_text_reference: Option<String>,
}

/// One field as returned by one AI invocation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedFieldResult {
    pub field_name: String,
    pub value: FieldValue,
    #[serde(default)]
    pub confidence: Confidence,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_location: Option<SourceLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl ExtractedFieldResult {
    pub fn new(field_name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self {
            field_name: field_name.into(),
            value: value.into(),
            confidence: Confidence::default(),
            source_location: None,
            notes: None,
        }
    }

    pub fn with_confidence(mut self, confidence: Confidence) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_source_location(mut self, location: SourceLocation) -> Self {
        self.source_location = Some(location);
        self
    }

    /// The model's verbatim quote, if it gave a non-blank one
    pub fn exact_text_reference(&self) -> Option<&str> {
        self.source_location
            .as_ref()
            .and_then(|l| l.exact_text_reference.as_deref())
            .filter(|q| !q.trim().is_empty())
    }
}

/// A position verified by finding the text in the page content
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedLocation {
    pub page: u32,
    /// `[min_x, min_y, max_x, max_y]` in page units
    pub rect: [f64; 4],
    pub matched_text: String,
}

/// Why a field carries no resolved location
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UngroundedReason {
    /// Text not found within the page limit
    NoMatch,
    /// A page needed for this field had unusable content
    MalformedPageContent { page: u32, detail: String },
    /// Grounding this field failed unexpectedly
    InternalError { detail: String },
}

/// An extracted field plus its verified location, if one was found
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundedFieldResult {
    #[serde(flatten)]
    pub field: ExtractedFieldResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_location: Option<ResolvedLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ungrounded_reason: Option<UngroundedReason>,
}

impl GroundedFieldResult {
    pub fn grounded(
        field: ExtractedFieldResult,
        search_text: String,
        location: ResolvedLocation,
    ) -> Self {
        Self {
            field,
            resolved_location: Some(location),
            search_text: Some(search_text),
            ungrounded_reason: None,
        }
    }

    pub fn ungrounded(
        field: ExtractedFieldResult,
        search_text: Option<String>,
        reason: UngroundedReason,
    ) -> Self {
        Self {
            field,
            resolved_location: None,
            search_text,
            ungrounded_reason: Some(reason),
        }
    }

    pub fn field_name(&self) -> &str {
        &self.field.field_name
    }

    pub fn value(&self) -> &FieldValue {
        &self.field.value
    }

    pub fn is_grounded(&self) -> bool {
        self.resolved_location.is_some()
    }
}
