//! Page content collaborator
//!
//! The locator never touches a PDF engine directly; it reads pages through
//! this trait so tests can hand it plain `PageContent` values.

use std::borrow::Cow;

use shared_types::PageContent;
use tracing::warn;

use crate::error::PageSourceError;

/// Supplies page content and page count for one document
pub trait PageSource {
    fn page_count(&self) -> usize;

    /// Content of a 1-based page
    fn page_content(&self, page_number: u32) -> Result<Cow<'_, PageContent>, PageSourceError>;
}

impl PageSource for [PageContent] {
    fn page_count(&self) -> usize {
        self.len()
    }

    fn page_content(&self, page_number: u32) -> Result<Cow<'_, PageContent>, PageSourceError> {
        page_number
            .checked_sub(1)
            .and_then(|i| self.get(i as usize))
            .map(Cow::Borrowed)
            .ok_or(PageSourceError::OutOfRange {
                page: page_number,
                count: self.len(),
            })
    }
}

impl PageSource for Vec<PageContent> {
    fn page_count(&self) -> usize {
        self.as_slice().page_count()
    }

    fn page_content(&self, page_number: u32) -> Result<Cow<'_, PageContent>, PageSourceError> {
        self.as_slice().page_content(page_number)
    }
}

impl<S: PageSource + ?Sized> PageSource for &S {
    fn page_count(&self) -> usize {
        (**self).page_count()
    }

    fn page_content(&self, page_number: u32) -> Result<Cow<'_, PageContent>, PageSourceError> {
        (**self).page_content(page_number)
    }
}

/// Plain document text with page markers, for prompts when the caller has none
pub fn document_text<S: PageSource + ?Sized>(source: &S, max_pages: usize) -> String {
    let limit = source.page_count().min(max_pages);
    let mut text = String::new();

    for page_number in 1..=limit as u32 {
        match source.page_content(page_number) {
            Ok(page) => {
                text.push_str(&format!("--- Page {} ---\n", page_number));
                text.push_str(&page.plain_text());
                text.push_str("\n\n");
            }
            Err(e) => warn!("Skipping page {} in document text: {}", page_number, e),
        }
    }

    text.trim_end().to_string()
}
