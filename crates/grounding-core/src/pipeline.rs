//! Grounding pass over a set of extracted fields
//!
//! ```text
//! ExtractedFieldResult ──► search text ──► TextLocator ──► GroundedFieldResult
//!   (quote or value)                     (first page hit)   (location or reason)
//! ```
//!
//! The pass is total: every input field yields exactly one output, in input
//! order, whatever happens to the fields around it.

use std::panic::{catch_unwind, AssertUnwindSafe};

use shared_types::{ExtractedFieldResult, GroundedFieldResult, UngroundedReason};
use tracing::{debug, warn};

use crate::error::{panic_message, LocateError};
use crate::locator::{TextLocator, DEFAULT_MAX_PAGES};
use crate::source::PageSource;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GroundingPipeline {
    pub max_pages: usize,
}

impl Default for GroundingPipeline {
    fn default() -> Self {
        Self {
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

/// The model's verbatim quote when it gave one, else the stringified value
pub fn select_search_text(field: &ExtractedFieldResult) -> String {
    match field.exact_text_reference() {
        Some(quote) => quote.to_string(),
        None => field.value.to_string(),
    }
}

impl GroundingPipeline {
    pub fn new(max_pages: usize) -> Self {
        Self { max_pages }
    }

    /// Ground every field against one document
    pub fn ground<S: PageSource + ?Sized>(
        &self,
        fields: &[ExtractedFieldResult],
        source: &S,
    ) -> Vec<GroundedFieldResult> {
        let locator = TextLocator::new(source);
        self.ground_with(fields, &locator)
    }

    /// Same as [`ground`](Self::ground), reusing an existing page index cache
    pub fn ground_with<S: PageSource + ?Sized>(
        &self,
        fields: &[ExtractedFieldResult],
        locator: &TextLocator<'_, S>,
    ) -> Vec<GroundedFieldResult> {
        let results: Vec<_> = fields
            .iter()
            .map(|field| self.ground_field(field, locator))
            .collect();

        let grounded = results.iter().filter(|r| r.is_grounded()).count();
        debug!("Grounded {} of {} fields", grounded, results.len());
        results
    }

    /// Ground a single field. Never panics and never fails.
    pub fn ground_field<S: PageSource + ?Sized>(
        &self,
        field: &ExtractedFieldResult,
        locator: &TextLocator<'_, S>,
    ) -> GroundedFieldResult {
        let search_text = select_search_text(field);

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            locator.locate(&search_text, self.max_pages)
        }));

        match outcome {
            Ok(Ok(location)) => {
                debug!(
                    "Field '{}' grounded on page {}",
                    field.field_name, location.page
                );
                GroundedFieldResult::grounded(field.clone(), search_text, location)
            }
            Ok(Err(LocateError::NoMatch)) => {
                debug!("Field '{}' not found in document", field.field_name);
                GroundedFieldResult::ungrounded(
                    field.clone(),
                    Some(search_text),
                    UngroundedReason::NoMatch,
                )
            }
            Ok(Err(LocateError::MalformedPageContent { page, detail })) => {
                warn!(
                    "Field '{}' ungrounded, page {} malformed: {}",
                    field.field_name, page, detail
                );
                GroundedFieldResult::ungrounded(
                    field.clone(),
                    Some(search_text),
                    UngroundedReason::MalformedPageContent { page, detail },
                )
            }
            Err(panic) => {
                let detail = panic_message(panic.as_ref());
                warn!("Grounding field '{}' panicked: {}", field.field_name, detail);
                GroundedFieldResult::ungrounded(
                    field.clone(),
                    Some(search_text),
                    UngroundedReason::InternalError { detail },
                )
            }
        }
    }
}

/// Ground with default settings
pub fn ground<S: PageSource + ?Sized>(
    fields: &[ExtractedFieldResult],
    source: &S,
) -> Vec<GroundedFieldResult> {
    GroundingPipeline::default().ground(fields, source)
}
