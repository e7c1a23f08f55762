//! Tests for the grounding server
//!
//! Endpoint tests run the full router in-process with `axum_test`, with fake
//! providers standing in for the AI services.

#[cfg(test)]
mod property_tests {
    use proptest::prelude::*;

    use crate::config::Config;

    proptest! {
        /// Property: any positive max_pages survives a TOML round trip
        #[test]
        fn max_pages_parses(max_pages in 1usize..10_000) {
            let config = Config::from_str(&format!("[grounding]\nmax_pages = {}\n", max_pages)).unwrap();
            prop_assert_eq!(config.grounding.max_pages, max_pages);
            prop_assert!(config.validate().is_ok());
        }

        /// Property: arbitrary text never breaks the config parser
        #[test]
        fn arbitrary_config_never_panics(text in ".*") {
            let _ = Config::from_str(&text);
        }
    }
}

#[cfg(test)]
mod api_tests {
    use std::sync::Arc;

    use agent_orchestrator::{ExtractionProvider, ExtractionRequest, ProviderError};
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use base64::{engine::general_purpose::STANDARD, Engine};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use shared_types::ProviderId;

    use crate::{routes, AppState};

    struct FakeProvider {
        id: ProviderId,
        answer: Result<Value, ProviderError>,
    }

    #[async_trait]
    impl ExtractionProvider for FakeProvider {
        fn id(&self) -> &ProviderId {
            &self.id
        }

        async fn extract(&self, request: &ExtractionRequest) -> Result<Value, ProviderError> {
            assert!(!request.document_text.is_empty());
            self.answer.clone()
        }
    }

    fn fake(id: &str, answer: Result<Value, ProviderError>) -> Arc<dyn ExtractionProvider> {
        Arc::new(FakeProvider {
            id: id.into(),
            answer,
        })
    }

    /// Create a test server with the full router
    fn create_test_server(providers: Vec<Arc<dyn ExtractionProvider>>) -> TestServer {
        let state = AppState {
            providers: Arc::new(providers),
            provider_configs: Arc::new(Vec::new()),
            max_pages: 30,
        };

        TestServer::new(routes().with_state(state)).unwrap()
    }

    /// Ten pages; the registry number sits on page 4
    fn trial_pages() -> Value {
        let pages: Vec<Value> = (1..=10)
            .map(|n| {
                let items = if n == 4 {
                    json!([
                        {"text": "Registration:", "x": 100.0, "y": 500.0, "width": 80.0, "height": 12.0},
                        {"text": "NCT01234567", "x": 186.0, "y": 500.0, "width": 70.0, "height": 12.0}
                    ])
                } else {
                    json!([{"text": format!("Page {} body text", n), "x": 72.0, "y": 700.0, "width": 120.0}])
                };
                json!({"page_number": n, "runs": items})
            })
            .collect();
        Value::Array(pages)
    }

    fn single_page(lines: &[&str]) -> Value {
        let runs: Vec<Value> = lines
            .iter()
            .enumerate()
            .map(|(i, text)| {
                json!({"text": text, "x": 72.0, "y": 700.0 - 20.0 * i as f64, "width": 150.0, "height": 10.0})
            })
            .collect();
        json!([{"page_number": 1, "runs": runs}])
    }

    /// One-page PDF with a single 12pt line at (72, 500)
    fn create_test_pdf(text: &str) -> Vec<u8> {
        use lopdf::content::{Content, Operation};
        use lopdf::{Dictionary, Document, Object, Stream, StringFormat};

        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();

        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(12)]),
                Operation::new("Td", vec![Object::Integer(72), Object::Integer(500)]),
                Operation::new(
                    "Tj",
                    vec![Object::String(text.as_bytes().to_vec(), StringFormat::Literal)],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));

        let page_id = doc.add_object(Dictionary::from_iter(vec![
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
        ]));

        doc.objects.insert(
            pages_id,
            Object::Dictionary(Dictionary::from_iter(vec![
                ("Type", Object::Name(b"Pages".to_vec())),
                ("Count", Object::Integer(1)),
                ("Kids", Object::Array(vec![Object::Reference(page_id)])),
            ])),
        );
        let catalog_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]));
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[tokio::test]
    async fn test_health_returns_200() {
        let server = create_test_server(vec![]);
        let response = server.get("/health").await;
        response.assert_status_ok();

        let json = response.json::<Value>();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["service"], "grounding-server");
    }

    #[tokio::test]
    async fn test_providers_listed_in_order() {
        let server = create_test_server(vec![
            fake("gpt", Ok(json!({}))),
            fake("claude", Ok(json!({}))),
        ]);
        let response = server.get("/api/providers").await;
        response.assert_status_ok();

        let json = response.json::<Value>();
        assert_eq!(json["count"], 2);
        assert_eq!(json["providers"][0]["id"], "gpt");
        assert_eq!(json["providers"][1]["id"], "claude");
    }

    #[tokio::test]
    async fn test_locate_registry_number_on_page_four() {
        let server = create_test_server(vec![]);
        let response = server
            .post("/api/locate")
            .json(&json!({"pages": trial_pages(), "text": "nct01234567"}))
            .await;
        response.assert_status_ok();

        let json = response.json::<Value>();
        assert_eq!(json["location"]["page"], 4);
        assert_eq!(json["location"]["rect"], json!([184.0, 498.0, 258.0, 514.0]));
        assert_eq!(json["reason"], Value::Null);
    }

    #[tokio::test]
    async fn test_locate_not_found_returns_null() {
        let server = create_test_server(vec![]);
        let response = server
            .post("/api/locate")
            .json(&json!({"pages": trial_pages(), "text": "NCT99999999"}))
            .await;
        response.assert_status_ok();

        let json = response.json::<Value>();
        assert_eq!(json["location"], Value::Null);
        assert_eq!(json["reason"]["kind"], "no_match");
    }

    #[tokio::test]
    async fn test_locate_respects_max_pages() {
        let server = create_test_server(vec![]);
        let response = server
            .post("/api/locate")
            .json(&json!({"pages": trial_pages(), "text": "NCT01234567", "max_pages": 3}))
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["location"], Value::Null);
    }

    #[tokio::test]
    async fn test_locate_in_uploaded_pdf() {
        let server = create_test_server(vec![]);
        let pdf = STANDARD.encode(create_test_pdf("Sponsor: Acme Pharma"));
        let response = server
            .post("/api/locate")
            .json(&json!({"pdf_base64": pdf, "text": "acme pharma"}))
            .await;
        response.assert_status_ok();

        let json = response.json::<Value>();
        assert_eq!(json["location"]["page"], 1);
        assert_eq!(json["fingerprint"].as_str().unwrap().len(), 64);
    }

    #[tokio::test]
    async fn test_locate_without_document_is_bad_request() {
        let server = create_test_server(vec![]);
        let response = server
            .post("/api/locate")
            .json(&json!({"text": "anything"}))
            .await;
        response.assert_status_bad_request();

        let json = response.json::<Value>();
        assert_eq!(json["success"], false);
        assert_eq!(json["code"], "INVALID_REQUEST");
    }

    #[tokio::test]
    async fn test_invalid_pdf_is_unprocessable() {
        let server = create_test_server(vec![]);
        let response = server
            .post("/api/locate")
            .json(&json!({"pdf_base64": STANDARD.encode(b"not a pdf"), "text": "x"}))
            .await;
        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(response.json::<Value>()["code"], "INVALID_PDF");
    }

    #[tokio::test]
    async fn test_ground_accepts_keyed_object_shape() {
        let server = create_test_server(vec![]);
        let response = server
            .post("/api/ground")
            .json(&json!({
                "pages": single_page(&["Sponsor: Acme Pharma", "Total enrolled 120"]),
                "fields": {
                    "sponsor": {"value": "Acme Pharma", "confidence": "high"},
                    "totalN": {"value": 120, "sourceLocation": {"page": 7, "exactTextReference": "Total enrolled 120"}},
                    "phase": {"value": "III"}
                }
            }))
            .await;
        response.assert_status_ok();

        let json = response.json::<Value>();
        assert_eq!(json["grounded"], 2);
        let results = json["results"].as_array().unwrap();
        assert_eq!(results.len(), 3);

        let total = results.iter().find(|r| r["fieldName"] == "totalN").unwrap();
        assert_eq!(total["resolvedLocation"]["page"], 1);
        assert_eq!(total["searchText"], "Total enrolled 120");

        let phase = results.iter().find(|r| r["fieldName"] == "phase").unwrap();
        assert_eq!(phase["ungroundedReason"]["kind"], "no_match");
    }

    #[tokio::test]
    async fn test_ground_large_page_set() {
        let pages: Vec<Value> = (1..=200)
            .map(|n| {
                let text = if n == 150 {
                    "Primary endpoint: overall survival".to_string()
                } else {
                    format!("Page {} body text", n)
                };
                json!({"page_number": n, "runs": [{"text": text, "x": 72.0, "y": 700.0, "width": 180.0}]})
            })
            .collect();

        let server = create_test_server(vec![]);
        let response = server
            .post("/api/ground")
            .json(&json!({
                "pages": pages,
                "max_pages": 200,
                "fields": [
                    {"fieldName": "endpoint", "value": "overall survival"},
                    {"fieldName": "phase", "value": "Phase III"}
                ]
            }))
            .await;
        response.assert_status_ok();

        let json = response.json::<Value>();
        assert_eq!(json["grounded"], 1);
        assert_eq!(json["results"][0]["resolvedLocation"]["page"], 150);
        assert_eq!(json["results"][1]["ungroundedReason"]["kind"], "no_match");
    }

    #[tokio::test]
    async fn test_ground_rejects_unsupported_shape() {
        let server = create_test_server(vec![]);
        let response = server
            .post("/api/ground")
            .json(&json!({"pages": single_page(&["x"]), "fields": "just a string"}))
            .await;
        response.assert_status_bad_request();
    }

    #[tokio::test]
    async fn test_extract_runs_all_providers_and_builds_consensus() {
        let server = create_test_server(vec![
            fake("a", Ok(json!({"totalN": {"value": 120}, "sponsor": "Acme Pharma"}))),
            fake("b", Ok(json!({"totalN": {"value": 118}, "sponsor": "acme pharma "}))),
            fake("c", Err(ProviderError::Timeout(120))),
        ]);
        let response = server
            .post("/api/extract")
            .json(&json!({
                "pages": single_page(&["Sponsor: Acme Pharma", "N = 120"]),
                "fields": [{"name": "totalN"}, {"name": "sponsor", "description": "Trial sponsor"}]
            }))
            .await;
        response.assert_status_ok();

        let json = response.json::<Value>();
        let statuses: Vec<&str> = json["runs"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["status"].as_str().unwrap())
            .collect();
        assert_eq!(statuses, vec!["completed", "completed", "failed"]);
        assert_eq!(json["runs"][2]["error"], "Request timed out after 120s");

        assert_eq!(json["stats"]["full"], 1);
        assert_eq!(json["stats"]["none"], 1);
        assert_eq!(json["stats"]["overallPercent"], 50);
        assert_eq!(json["consensus"]["fields"]["sponsor"]["resolvedLocation"]["page"], 1);
        assert_eq!(json["unresolved"], json!(["totalN"]));
    }

    #[tokio::test]
    async fn test_extract_provider_subset() {
        let server = create_test_server(vec![
            fake("a", Ok(json!({"totalN": 120}))),
            fake("b", Ok(json!({"totalN": 118}))),
        ]);
        let response = server
            .post("/api/extract")
            .json(&json!({
                "pages": single_page(&["N = 120"]),
                "fields": [{"name": "totalN"}],
                "providers": ["b"]
            }))
            .await;
        response.assert_status_ok();

        let json = response.json::<Value>();
        assert_eq!(json["runs"].as_array().unwrap().len(), 1);
        assert_eq!(json["runs"][0]["provider"], "b");
        assert_eq!(json["stats"]["overallPercent"], 100);
    }

    #[tokio::test]
    async fn test_extract_unknown_provider_is_not_found() {
        let server = create_test_server(vec![fake("a", Ok(json!({})))]);
        let response = server
            .post("/api/extract")
            .json(&json!({
                "pages": single_page(&["N = 120"]),
                "fields": [{"name": "totalN"}],
                "providers": ["zzz"]
            }))
            .await;
        response.assert_status_not_found();
        assert_eq!(response.json::<Value>()["code"], "PROVIDER_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_extract_without_providers_is_unavailable() {
        let server = create_test_server(vec![]);
        let response = server
            .post("/api/extract")
            .json(&json!({"pages": single_page(&["N = 120"]), "fields": [{"name": "totalN"}]}))
            .await;
        response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_consensus_then_override() {
        let server = create_test_server(vec![
            fake("a", Ok(json!({"totalN": 120}))),
            fake("b", Ok(json!({"totalN": 118}))),
        ]);
        let extracted = server
            .post("/api/extract")
            .json(&json!({"pages": single_page(&["N = 120"]), "fields": [{"name": "totalN"}]}))
            .await
            .json::<Value>();

        let review = server
            .post("/api/consensus")
            .json(&json!({"runs": extracted["runs"]}))
            .await;
        review.assert_status_ok();
        let review = review.json::<Value>();
        assert_eq!(review["unresolved"], json!(["totalN"]));
        let options = review["candidates"]["totalN"].as_array().unwrap();
        assert_eq!(options.len(), 2);
        assert_eq!(options[1]["provider"], "b");

        let response = server
            .post("/api/consensus/override")
            .json(&json!({
                "consensus": review["consensus"],
                "field_name": "totalN",
                "result": options[1]["result"]
            }))
            .await;
        response.assert_status_ok();

        let json = response.json::<Value>();
        assert_eq!(json["consensus"]["fields"]["totalN"]["value"], 118);
        assert_eq!(json["consensus"]["overridden"], json!(["totalN"]));
    }

    #[tokio::test]
    async fn test_override_requires_field_name() {
        let server = create_test_server(vec![]);
        let response = server
            .post("/api/consensus/override")
            .json(&json!({
                "consensus": {},
                "field_name": " ",
                "result": {"fieldName": "x", "value": 1}
            }))
            .await;
        response.assert_status_bad_request();
    }
}
