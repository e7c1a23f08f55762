//! The AI invocation seam
//!
//! Each provider turns one `ExtractionRequest` into raw JSON. Shape checking
//! happens afterwards, in [`crate::normalize`], so providers stay thin.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared_types::ProviderId;

use crate::error::ProviderError;

/// One field the caller wants extracted
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Expected kind of value, e.g. "number" or "text"
    #[serde(
        default,
        rename = "type",
        alias = "fieldType",
        skip_serializing_if = "Option::is_none"
    )]
    pub field_type: Option<String>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            field_type: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Identical input sent to every provider in one orchestration
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionRequest {
    pub document_text: String,
    pub fields: Vec<FieldSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

#[async_trait]
pub trait ExtractionProvider: Send + Sync {
    fn id(&self) -> &ProviderId;

    /// Run the extraction and return the model's JSON answer as-is
    ///
    /// Implementations enforce their own timeout and report it as an error.
    async fn extract(&self, request: &ExtractionRequest)
        -> Result<serde_json::Value, ProviderError>;
}
