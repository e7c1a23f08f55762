use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LocateError {
    /// Expected outcome when the quote is imprecise. Not a failure.
    #[error("Text not found in document")]
    NoMatch,

    #[error("Malformed content on page {page}: {detail}")]
    MalformedPageContent { page: u32, detail: String },
}

impl LocateError {
    pub fn is_no_match(&self) -> bool {
        matches!(self, LocateError::NoMatch)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PageSourceError {
    #[error("Page {page} out of range (document has {count} pages)")]
    OutOfRange { page: u32, count: usize },

    #[error("Failed to read page {page}: {reason}")]
    Unreadable { page: u32, reason: String },
}

/// Text of a caught panic payload
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
