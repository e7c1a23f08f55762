use std::borrow::Cow;
use std::sync::OnceLock;

use grounding_core::{PageSource, PageSourceError};
use lopdf::{Document, ObjectId};
use shared_types::PageContent;
use tracing::{debug, warn};

use crate::error::PdfSourceError;
use crate::fingerprint;
use crate::text::{extract_runs, page_dimensions};

/// A parsed PDF whose pages are decoded into text runs on first access
pub struct PdfPageSource {
    doc: Document,
    page_ids: Vec<ObjectId>,
    pages: Vec<OnceLock<Result<PageContent, PageSourceError>>>,
    fingerprint: String,
}

impl std::fmt::Debug for PdfPageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfPageSource")
            .field("pages", &self.page_ids.len())
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}

impl PdfPageSource {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PdfSourceError> {
        let doc = Document::load_mem(bytes).map_err(|e| PdfSourceError::ParseError(e.to_string()))?;

        // get_pages is keyed by page number, so values come out in page order
        let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
        if page_ids.is_empty() {
            return Err(PdfSourceError::NoPages);
        }

        debug!("Loaded PDF with {} pages", page_ids.len());
        let pages = page_ids.iter().map(|_| OnceLock::new()).collect();

        Ok(Self {
            doc,
            page_ids,
            pages,
            fingerprint: fingerprint(bytes),
        })
    }

    /// SHA-256 of the bytes this source was loaded from
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Decode the first `max_pages` pages up front and drop the parsed document
    ///
    /// The result owns plain data only, so it can be held across `.await`
    /// points and shared between tasks.
    pub fn decode(self, max_pages: usize) -> DecodedPdf {
        let limit = self.page_ids.len().min(max_pages);
        let pages = (0..limit)
            .map(|index| self.page_content(index as u32 + 1).map(Cow::into_owned))
            .collect();

        DecodedPdf {
            pages,
            page_count: self.page_ids.len(),
            fingerprint: self.fingerprint,
        }
    }

    fn decode_page(&self, index: usize) -> Result<PageContent, PageSourceError> {
        let page_number = index as u32 + 1;
        let page_id = self.page_ids[index];

        let runs = extract_runs(&self.doc, page_id).map_err(|reason| {
            warn!("Could not decode page {}: {}", page_number, reason);
            PageSourceError::Unreadable {
                page: page_number,
                reason,
            }
        })?;
        let (width, height) = page_dimensions(&self.doc, page_id);

        Ok(PageContent {
            page_number,
            width: Some(width),
            height: Some(height),
            runs,
        })
    }
}

impl PageSource for PdfPageSource {
    fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    fn page_content(&self, page_number: u32) -> Result<Cow<'_, PageContent>, PageSourceError> {
        let index = page_number
            .checked_sub(1)
            .map(|i| i as usize)
            .filter(|&i| i < self.page_ids.len())
            .ok_or(PageSourceError::OutOfRange {
                page: page_number,
                count: self.page_ids.len(),
            })?;

        self.pages[index]
            .get_or_init(|| self.decode_page(index))
            .as_ref()
            .map(Cow::Borrowed)
            .map_err(|e| e.clone())
    }
}

/// Pages of a PDF decoded ahead of time, unreadable pages kept as errors
#[derive(Clone, Debug)]
pub struct DecodedPdf {
    pages: Vec<Result<PageContent, PageSourceError>>,
    page_count: usize,
    fingerprint: String,
}

impl DecodedPdf {
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Pages in the original document, including ones not decoded
    pub fn total_pages(&self) -> usize {
        self.page_count
    }
}

impl PageSource for DecodedPdf {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_content(&self, page_number: u32) -> Result<Cow<'_, PageContent>, PageSourceError> {
        page_number
            .checked_sub(1)
            .and_then(|i| self.pages.get(i as usize))
            .ok_or(PageSourceError::OutOfRange {
                page: page_number,
                count: self.pages.len(),
            })?
            .as_ref()
            .map(Cow::Borrowed)
            .map_err(|e| e.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grounding_core::{document_text, locate, GroundingPipeline};
    use lopdf::content::{Content, Operation};
    use lopdf::{Dictionary, Object, Stream};
    use shared_types::ExtractedFieldResult;

    /// One content stream per page, each a list of (x, y, text) lines in 12pt
    fn create_test_pdf(pages: &[Vec<(i64, i64, &str)>]) -> Vec<u8> {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();

        let mut page_ids = Vec::new();

        for lines in pages {
            let mut operations = vec![
                Operation::new("BT", vec![]),
                Operation::new(
                    "Tf",
                    vec![Object::Name(b"F1".to_vec()), Object::Integer(12)],
                ),
            ];
            for &(x, y, text) in lines {
                operations.push(Operation::new(
                    "Tm",
                    vec![
                        Object::Integer(1),
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Integer(1),
                        Object::Integer(x),
                        Object::Integer(y),
                    ],
                ));
                operations.push(Operation::new(
                    "Tj",
                    vec![Object::String(
                        text.as_bytes().to_vec(),
                        lopdf::StringFormat::Literal,
                    )],
                ));
            }
            operations.push(Operation::new("ET", vec![]));

            let content = Content { operations };
            let content_id =
                doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));

            let page = Dictionary::from_iter(vec![
                ("Type", Object::Name(b"Page".to_vec())),
                ("Parent", Object::Reference(pages_id)),
                (
                    "MediaBox",
                    Object::Array(vec![
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Integer(612),
                        Object::Integer(792),
                    ]),
                ),
                ("Contents", Object::Reference(content_id)),
            ]);
            page_ids.push(doc.add_object(page));
        }

        let pages = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Count", Object::Integer(page_ids.len() as i64)),
            (
                "Kids",
                Object::Array(page_ids.iter().map(|id| Object::Reference(*id)).collect()),
            ),
        ]);
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]);
        let catalog_id = doc.add_object(catalog);
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }

    fn trial_pdf() -> Vec<u8> {
        let mut pages: Vec<Vec<(i64, i64, &str)>> = (1..=10)
            .map(|_| vec![(72, 720, "Protocol synopsis")])
            .collect();
        pages[3] = vec![
            (72, 500, "Registry:"),
            (140, 500, "NCT01234567"),
        ];
        create_test_pdf(&pages)
    }

    #[test]
    fn test_runs_and_dimensions() {
        let source = PdfPageSource::from_bytes(&trial_pdf()).unwrap();
        assert_eq!(source.page_count(), 10);

        let page = source.page_content(4).unwrap();
        assert_eq!(page.page_number, 4);
        assert_eq!((page.width, page.height), (Some(612.0), Some(792.0)));
        assert_eq!(page.runs.len(), 2);
        assert_eq!(page.runs[1].text, "NCT01234567");
        assert_eq!((page.runs[1].x, page.runs[1].y), (140.0, 500.0));
        assert_eq!(page.runs[1].width, 66.0);
        assert_eq!(page.runs[1].height, Some(12.0));
    }

    #[test]
    fn test_locates_text_in_real_pdf() {
        let source = PdfPageSource::from_bytes(&trial_pdf()).unwrap();
        let loc = locate(&source, "registry: nct01234567", 30).unwrap();
        assert_eq!(loc.page, 4);
        assert_eq!(loc.rect, [70.0, 498.0, 208.0, 514.0]);
    }

    #[test]
    fn test_pipeline_over_pdf_source() {
        let source = PdfPageSource::from_bytes(&trial_pdf()).unwrap();
        let results = GroundingPipeline::default().ground(
            &[
                ExtractedFieldResult::new("registryId", "NCT01234567"),
                ExtractedFieldResult::new("sponsor", "Acme"),
            ],
            &source,
        );
        assert_eq!(results[0].resolved_location.as_ref().unwrap().page, 4);
        assert!(!results[1].is_grounded());
    }

    #[test]
    fn test_out_of_range_page() {
        let source = PdfPageSource::from_bytes(&trial_pdf()).unwrap();
        assert!(matches!(
            source.page_content(11),
            Err(PageSourceError::OutOfRange { page: 11, count: 10 })
        ));
        assert!(source.page_content(0).is_err());
    }

    #[test]
    fn test_document_text_from_pdf() {
        let source = PdfPageSource::from_bytes(&trial_pdf()).unwrap();
        let text = document_text(&source, 4);
        assert!(text.starts_with("--- Page 1 ---\nProtocol synopsis"));
        assert!(text.ends_with("--- Page 4 ---\nRegistry: NCT01234567"));
    }

    #[test]
    fn test_fingerprint_matches_bytes() {
        let bytes = trial_pdf();
        let source = PdfPageSource::from_bytes(&bytes).unwrap();
        assert_eq!(source.fingerprint(), fingerprint(&bytes));
    }

    #[test]
    fn test_decoded_pdf_keeps_page_limit() {
        let bytes = trial_pdf();
        let decoded = PdfPageSource::from_bytes(&bytes).unwrap().decode(5);
        assert_eq!(decoded.page_count(), 5);
        assert_eq!(decoded.total_pages(), 10);
        assert_eq!(decoded.fingerprint(), fingerprint(&bytes));
        assert_eq!(locate(&decoded, "NCT01234567", 30).unwrap().page, 4);
        assert!(decoded.page_content(6).is_err());
    }

    #[test]
    fn test_invalid_pdf_is_rejected() {
        assert!(matches!(
            PdfPageSource::from_bytes(b"%PDF-garbage"),
            Err(PdfSourceError::ParseError(_))
        ));
    }
}
