//! Literal, normalized substring search over page text
//!
//! Matching is case- and whitespace-insensitive and nothing else: no stemming,
//! no fuzzy scoring, no OCR. A hit is always text that is really on the page.

use std::borrow::Cow;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::OnceLock;

use shared_types::{PageContent, ResolvedLocation};
use tracing::{debug, warn};

use crate::error::{panic_message, LocateError};
use crate::page_index::{fold, PageTextIndex};
use crate::source::PageSource;

/// Page scan cap used when the caller does not pick one
pub const DEFAULT_MAX_PAGES: usize = 30;

/// Shorter non-numeric queries match too much to be useful
pub const MIN_QUERY_CHARS: usize = 3;

/// Padding added on every side of a match rectangle
pub const RECT_PADDING: f64 = 2.0;

/// Normalize a search phrase, or `None` if it is too short to search for
pub fn normalize_query(search_text: &str) -> Option<String> {
    let normalized = fold(search_text);
    if normalized.is_empty() {
        return None;
    }
    let numeric = normalized.chars().all(|c| c.is_ascii_digit());
    if normalized.chars().count() < MIN_QUERY_CHARS && !numeric {
        return None;
    }
    Some(normalized)
}

struct IndexedPage<'a> {
    content: Cow<'a, PageContent>,
    index: PageTextIndex,
}

/// Locates text in one document, indexing each page at most once
///
/// Safe to share between threads when the source is `Sync`; the per-page
/// index cache is filled lazily.
pub struct TextLocator<'a, S: PageSource + ?Sized> {
    source: &'a S,
    pages: Vec<OnceLock<Result<IndexedPage<'a>, LocateError>>>,
}

impl<'a, S: PageSource + ?Sized> TextLocator<'a, S> {
    pub fn new(source: &'a S) -> Self {
        let pages = (0..source.page_count()).map(|_| OnceLock::new()).collect();
        Self { source, pages }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Find the first page, up to `max_pages`, containing `search_text`
    ///
    /// Pages that cannot be read, and occurrences whose runs lack geometry,
    /// are skipped; if nothing else matches, the first such problem is
    /// reported instead of `NoMatch`.
    pub fn locate(
        &self,
        search_text: &str,
        max_pages: usize,
    ) -> Result<ResolvedLocation, LocateError> {
        let needle = normalize_query(search_text).ok_or(LocateError::NoMatch)?;
        let limit = self.pages.len().min(max_pages);
        let mut first_problem: Option<LocateError> = None;

        for page_number in 1..=limit as u32 {
            let page = match self.indexed_page(page_number) {
                Ok(page) => page,
                Err(e) => {
                    first_problem.get_or_insert(e);
                    continue;
                }
            };

            for (match_start, _) in page.index.text().match_indices(needle.as_str()) {
                let match_end = match_start + needle.len();

                match bounding_rect(page, page_number, match_start, match_end) {
                    Ok(Some(rect)) => {
                        debug!(
                            "Located '{}' on page {} at {:?}",
                            needle, page_number, rect
                        );
                        return Ok(ResolvedLocation {
                            page: page_number,
                            rect,
                            matched_text: search_text.to_string(),
                        });
                    }
                    Ok(None) => continue,
                    Err(e) => {
                        warn!("{}", e);
                        first_problem.get_or_insert(e);
                    }
                }
            }
        }

        Err(first_problem.unwrap_or(LocateError::NoMatch))
    }

    /// Load and index a page once; a failing or panicking source is cached as
    /// a malformed page so later fields skip it too
    fn indexed_page(&self, page_number: u32) -> Result<&IndexedPage<'a>, LocateError> {
        let slot = &self.pages[(page_number - 1) as usize];
        slot.get_or_init(|| {
            let source = self.source;
            let loaded = catch_unwind(AssertUnwindSafe(|| {
                source.page_content(page_number).map(|content| {
                    let index = PageTextIndex::build_folded(&content.runs);
                    IndexedPage { content, index }
                })
            }));

            match loaded {
                Ok(Ok(page)) => Ok(page),
                Ok(Err(e)) => Err(LocateError::MalformedPageContent {
                    page: page_number,
                    detail: e.to_string(),
                }),
                Err(panic) => {
                    let detail = panic_message(panic.as_ref());
                    warn!("Loading page {} panicked: {}", page_number, detail);
                    Err(LocateError::MalformedPageContent {
                        page: page_number,
                        detail: format!("page source panicked: {}", detail),
                    })
                }
            }
        })
        .as_ref()
        .map_err(|e| e.clone())
    }
}

/// Union of the geometry of every run in the match, padded
///
/// `Ok(None)` when no run overlaps the match.
fn bounding_rect(
    page: &IndexedPage<'_>,
    page_number: u32,
    match_start: usize,
    match_end: usize,
) -> Result<Option<[f64; 4]>, LocateError> {
    let mut rect: Option<[f64; 4]> = None;

    for span in page.index.involved_spans(match_start, match_end) {
        let run = page.content.runs.get(span.run_index).ok_or_else(|| {
            LocateError::MalformedPageContent {
                page: page_number,
                detail: format!("run {} missing", span.run_index),
            }
        })?;
        if !run.has_geometry() {
            return Err(LocateError::MalformedPageContent {
                page: page_number,
                detail: format!("run '{}' has no usable geometry", run.text.trim()),
            });
        }

        let run_rect = [run.x, run.y, run.x + run.width, run.y + run.effective_height()];
        rect = Some(match rect {
            None => run_rect,
            Some([min_x, min_y, max_x, max_y]) => [
                min_x.min(run_rect[0]),
                min_y.min(run_rect[1]),
                max_x.max(run_rect[2]),
                max_y.max(run_rect[3]),
            ],
        });
    }

    Ok(rect.map(|[min_x, min_y, max_x, max_y]| {
        [
            min_x - RECT_PADDING,
            min_y - RECT_PADDING,
            max_x + RECT_PADDING,
            max_y + RECT_PADDING,
        ]
    }))
}

/// One-shot search without keeping the page index cache around
pub fn locate<S: PageSource + ?Sized>(
    source: &S,
    search_text: &str,
    max_pages: usize,
) -> Result<ResolvedLocation, LocateError> {
    TextLocator::new(source).locate(search_text, max_pages)
}
