//! Source grounding for AI-extracted fields
//!
//! Verifies that a value a model claims to have read from a document is
//! literally present in it, and where:
//! - `PageTextIndex`: one page's runs flattened into searchable text
//! - `TextLocator`: first page + bounding rectangle of a phrase
//! - `GroundingPipeline`: picks the search text per field and attaches the location
//!
//! Pages are read through the `PageSource` trait, so the same code serves
//! in-memory page content and parsed PDFs.

pub mod error;
pub mod locator;
pub mod page_index;
pub mod pipeline;
pub mod source;

pub use error::{LocateError, PageSourceError};
pub use locator::{locate, normalize_query, TextLocator, DEFAULT_MAX_PAGES, MIN_QUERY_CHARS};
pub use page_index::{fold, normalize_whitespace, PageTextIndex, RunSpan};
pub use pipeline::{ground, select_search_text, GroundingPipeline};
pub use source::{document_text, PageSource};
