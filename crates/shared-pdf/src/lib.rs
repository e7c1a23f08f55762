//! PDF page source for the grounding engine
//!
//! Parses PDF bytes with lopdf and exposes each page as positioned text runs,
//! so uploaded PDFs can be grounded the same way as page content sent by a
//! browser renderer.

pub mod error;
pub mod source;
pub mod text;

pub use error::PdfSourceError;
pub use source::{DecodedPdf, PdfPageSource};
pub use text::extract_runs;

use sha2::{Digest, Sha256};

/// SHA-256 of the document bytes, hex encoded
///
/// Ties a resolved location to the exact document version it was found in.
pub fn fingerprint(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
