use thiserror::Error;

/// Failure of one provider call. Contained to that provider's run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("API key not configured: set {0}")]
    MissingApiKey(String),

    #[error("Request failed: {0}")]
    Http(String),

    #[error("API error ({status}): {body}")]
    Status { status: u16, body: String },

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NormalizeError {
    #[error("Unsupported extraction shape: expected an object or array, got {0}")]
    UnsupportedShape(&'static str),

    #[error("Extraction entry {0} has no field name")]
    MissingFieldName(usize),
}
