use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PdfSourceError {
    #[error("Failed to parse PDF: {0}")]
    ParseError(String),

    #[error("PDF has no pages")]
    NoPages,
}
