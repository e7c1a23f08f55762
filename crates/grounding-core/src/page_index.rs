//! Flattened, searchable text for one page
//!
//! A phrase that reads as one line on screen is often split over many text
//! runs (kerning, font switches). The index joins the runs into one string
//! and remembers which byte range each run occupies, so a substring hit can be
//! mapped back to the runs that draw it.

use shared_types::TextRun;

/// Byte range of one run inside the flattened text
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunSpan {
    pub start: usize,
    /// Exclusive, and excludes the separator that follows the run
    pub end: usize,
    /// Index into the page's run list
    pub run_index: usize,
}

impl RunSpan {
    /// True if this run draws any part of `[match_start, match_end)`
    pub fn overlaps(&self, match_start: usize, match_end: usize) -> bool {
        self.end >= match_start && self.start < match_end
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PageTextIndex {
    text: String,
    spans: Vec<RunSpan>,
}

impl PageTextIndex {
    /// Join non-blank runs in source order with a single space
    pub fn build(runs: &[TextRun]) -> Self {
        Self::build_with(runs, |s| s.to_string())
    }

    /// Like [`build`](Self::build), but each run is lowercased and has its
    /// whitespace collapsed first. Offsets stay exact for the folded text.
    pub fn build_folded(runs: &[TextRun]) -> Self {
        Self::build_with(runs, fold)
    }

    fn build_with(runs: &[TextRun], transform: impl Fn(&str) -> String) -> Self {
        let mut text = String::new();
        let mut spans = Vec::with_capacity(runs.len());

        for (run_index, run) in runs.iter().enumerate() {
            if run.text.trim().is_empty() {
                continue;
            }
            if !spans.is_empty() {
                text.push(' ');
            }
            let start = text.len();
            text.push_str(&transform(&run.text));
            spans.push(RunSpan {
                start,
                end: text.len(),
                run_index,
            });
        }

        Self { text, spans }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn spans(&self) -> &[RunSpan] {
        &self.spans
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Spans of every run that takes part in a match
    pub fn involved_spans(
        &self,
        match_start: usize,
        match_end: usize,
    ) -> impl Iterator<Item = &RunSpan> + '_ {
        self.spans
            .iter()
            .filter(move |s| s.overlaps(match_start, match_end))
    }
}

/// Collapse whitespace runs to one space and trim
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Search normal form: collapsed whitespace, trimmed, lowercase
pub fn fold(s: &str) -> String {
    normalize_whitespace(s).to_lowercase()
}
