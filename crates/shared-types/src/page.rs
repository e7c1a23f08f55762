//! Page content as delivered by a PDF text-extraction layer

use serde::{Deserialize, Serialize};

/// Height assumed for runs that carry no usable height
pub const FALLBACK_RUN_HEIGHT: f64 = 10.0;

/// A single text fragment with fixed position on the page
///
/// Geometry that is missing from external input deserializes as NaN so the
/// locator can flag the page as malformed instead of rejecting the request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    #[serde(alias = "str", alias = "content")]
    pub text: String,
    #[serde(default = "missing_coordinate")]
    pub x: f64,
    #[serde(default = "missing_coordinate")]
    pub y: f64,
    #[serde(default = "missing_coordinate")]
    pub width: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

fn missing_coordinate() -> f64 {
    f64::NAN
}

impl TextRun {
    pub fn new(text: impl Into<String>, x: f64, y: f64, width: f64, height: Option<f64>) -> Self {
        Self {
            text: text.into(),
            x,
            y,
            width,
            height,
        }
    }

    /// Height used for bounding boxes, falling back when absent or non-positive
    pub fn effective_height(&self) -> f64 {
        match self.height {
            Some(h) if h > 0.0 => h,
            _ => FALLBACK_RUN_HEIGHT,
        }
    }

    /// True when every coordinate needed for a bounding box is finite
    pub fn has_geometry(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.width.is_finite()
            && self.height.map_or(true, f64::is_finite)
    }
}

/// Text runs of one page, in content-stream order
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PageContent {
    /// 1-based page number
    pub page_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, alias = "items", alias = "text_items")]
    pub runs: Vec<TextRun>,
}

impl PageContent {
    pub fn new(page_number: u32, runs: Vec<TextRun>) -> Self {
        Self {
            page_number,
            width: None,
            height: None,
            runs,
        }
    }

    /// Plain text of the page, one space between runs
    pub fn plain_text(&self) -> String {
        self.runs
            .iter()
            .map(|r| r.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
