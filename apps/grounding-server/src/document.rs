//! Documents sent with a request
//!
//! A request carries either the page content a browser renderer already
//! extracted, or the PDF itself as base64. Both become a [`PageSource`].

use std::borrow::Cow;

use base64::{engine::general_purpose::STANDARD, Engine};
use grounding_core::{PageSource, PageSourceError};
use serde::Deserialize;
use shared_pdf::{DecodedPdf, PdfPageSource};
use shared_types::PageContent;
use tracing::debug;

use crate::error::ServerError;

/// Document fields shared by every request that needs page content
#[derive(Debug, Default, Deserialize)]
pub struct DocumentInput {
    #[serde(default)]
    pub pages: Option<Vec<PageContent>>,
    #[serde(default, alias = "pdfBase64")]
    pub pdf_base64: Option<String>,
}

#[derive(Debug)]
pub enum LoadedDocument {
    Pages(Vec<PageContent>),
    Pdf(DecodedPdf),
}

impl LoadedDocument {
    /// Resolve the request's document, decoding at most `max_pages` PDF pages
    pub async fn load(input: DocumentInput, max_pages: usize) -> Result<Self, ServerError> {
        match (input.pages, input.pdf_base64) {
            (Some(_), Some(_)) => Err(ServerError::InvalidRequest(
                "Provide either 'pages' or 'pdf_base64', not both".into(),
            )),
            (None, None) => Err(ServerError::InvalidRequest(
                "Missing document: provide 'pages' or 'pdf_base64'".into(),
            )),
            (Some(pages), None) => {
                debug!("Document from {} client-side pages", pages.len());
                Ok(LoadedDocument::Pages(pages))
            }
            (None, Some(encoded)) => {
                let bytes = STANDARD
                    .decode(encoded.trim())
                    .map_err(|e| ServerError::InvalidRequest(format!("Invalid base64: {}", e)))?;

                // lopdf parsing is CPU bound
                let decoded = tokio::task::spawn_blocking(move || {
                    PdfPageSource::from_bytes(&bytes).map(|pdf| pdf.decode(max_pages))
                })
                .await
                .map_err(|e| ServerError::Internal(format!("PDF decoding task failed: {}", e)))??;

                debug!(
                    "Document from PDF: {} pages, fingerprint {}",
                    decoded.total_pages(),
                    decoded.fingerprint()
                );
                Ok(LoadedDocument::Pdf(decoded))
            }
        }
    }

    /// SHA-256 of the PDF bytes; `None` for client-side page content
    pub fn fingerprint(&self) -> Option<String> {
        match self {
            LoadedDocument::Pages(_) => None,
            LoadedDocument::Pdf(pdf) => Some(pdf.fingerprint().to_string()),
        }
    }
}

impl PageSource for LoadedDocument {
    fn page_count(&self) -> usize {
        match self {
            LoadedDocument::Pages(pages) => pages.page_count(),
            LoadedDocument::Pdf(pdf) => pdf.page_count(),
        }
    }

    fn page_content(&self, page_number: u32) -> Result<Cow<'_, PageContent>, PageSourceError> {
        match self {
            LoadedDocument::Pages(pages) => pages.page_content(page_number),
            LoadedDocument::Pdf(pdf) => pdf.page_content(page_number),
        }
    }
}
