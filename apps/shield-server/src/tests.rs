//! HTTP endpoint tests for the Privacy Shield server
//!
//! The pipeline runs for real; only OCR and page rendering are replaced by
//! in-process fakes so no tesseract or pdfium install is needed.

#[cfg(test)]
mod property_tests {
    use axum::http::{HeaderMap, HeaderValue};
    use proptest::prelude::*;

    use crate::api::{authorize_credit, user_id, CREDIT_SECRET_HEADER, USER_HEADER};

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_HEADER, HeaderValue::from_str(value).unwrap());
        headers
    }

    proptest! {
        /// Property: a non-blank header is the user id, trimmed
        #[test]
        fn user_header_is_trimmed(id in "[a-zA-Z0-9_-]{1,32}", pad in " {0,3}") {
            let headers = headers_with(&format!("{}{}{}", pad, id, pad));
            prop_assert_eq!(user_id(&headers).unwrap(), id);
        }

        /// Property: blank headers never identify a user
        #[test]
        fn blank_user_header_rejected(pad in " {0,8}") {
            prop_assert!(user_id(&headers_with(&pad)).is_err());
        }
    }

    fn secret_headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CREDIT_SECRET_HEADER, HeaderValue::from_str(value).unwrap());
        headers
    }

    proptest! {
        /// Property: only the exact configured secret authorizes a credit
        #[test]
        fn credit_needs_exact_secret(secret in "[a-z0-9]{8,24}", given in "[a-z0-9]{0,24}") {
            let result = authorize_credit(&secret_headers(&given), Some(&secret));
            prop_assert_eq!(result.is_ok(), given == secret);
        }
    }

    #[test]
    fn test_missing_header_rejected() {
        assert!(user_id(&HeaderMap::new()).is_err());
    }

    #[test]
    fn test_credit_refused_without_secret() {
        assert!(authorize_credit(&HeaderMap::new(), Some("s3cret")).is_err());
        assert!(authorize_credit(&secret_headers("s3cret"), None).is_err());
        assert!(authorize_credit(&secret_headers("s3cret"), Some("s3cret")).is_ok());
    }
}

#[cfg(test)]
mod http_endpoint_tests {
    use std::io::Cursor;
    use std::sync::Arc;

    use axum::http::{HeaderName, HeaderValue, StatusCode};
    use axum_test::TestServer;
    use base64::{engine::general_purpose::STANDARD, Engine};
    use extraction_engine::{
        BackendError, ExtractionConfig, ExtractionService, OcrEngine, OcrProvider,
        PageRasterizer,
    };
    use image::DynamicImage;
    use pipeline_core::{DocumentPipeline, MemoryHistoryStore, PipelineConfig};
    use pretty_assertions::assert_eq;
    use redaction_engine::Redactor;
    use risk_engine::RiskEngine;
    use serde_json::{json, Value};
    use token_ledger::TokenLedger;

    use crate::{build_router, AppState};

    const CONTRACT: &str =
        "Die Kündigungsfrist beträgt 3 Monate. Kontakt: max@firm.de, Betrag 500€.";

    struct NoRasterizer;

    impl PageRasterizer for NoRasterizer {
        fn render(&self, _: &[u8], page: usize, _: f32) -> Result<DynamicImage, BackendError> {
            Err(BackendError::Render {
                page,
                message: "not used".to_string(),
            })
        }
    }

    /// Recognizes the same text in every image
    struct FixedOcr(&'static str);

    struct FixedEngine(&'static str);

    impl OcrProvider for FixedOcr {
        fn acquire(&self) -> Result<Box<dyn OcrEngine>, BackendError> {
            Ok(Box::new(FixedEngine(self.0)))
        }
    }

    impl OcrEngine for FixedEngine {
        fn recognize(&mut self, _image: &DynamicImage) -> Result<String, BackendError> {
            Ok(self.0.to_string())
        }
    }

    const CREDIT_SECRET: &str = "checkout-secret";

    /// Create a test server with the full router
    fn create_test_server(ocr_text: &'static str) -> TestServer {
        create_server_with_secret(ocr_text, Some(CREDIT_SECRET))
    }

    fn create_server_with_secret(ocr_text: &'static str, secret: Option<&str>) -> TestServer {
        let extraction = ExtractionService::new(
            ExtractionConfig::default(),
            Arc::new(NoRasterizer),
            Arc::new(FixedOcr(ocr_text)),
        );
        let pipeline = DocumentPipeline::new(
            extraction,
            Redactor::new(),
            RiskEngine::new(),
            Arc::new(TokenLedger::in_memory()),
            Arc::new(MemoryHistoryStore::default()),
            PipelineConfig::default(),
        );
        let state = AppState {
            pipeline: Arc::new(pipeline),
            max_body_bytes: 1024 * 1024,
            credit_secret: secret.map(Arc::from),
        };

        TestServer::new(build_router(state)).unwrap()
    }

    fn user(name: &'static str) -> (HeaderName, HeaderValue) {
        (
            HeaderName::from_static("x-user-id"),
            HeaderValue::from_static(name),
        )
    }

    fn scan_body(mime_type: &str) -> Value {
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::new_rgb8(8, 8)
            .write_to(&mut buffer, image::ImageFormat::Png)
            .unwrap();
        json!({
            "file_name": "vertrag.png",
            "mime_type": mime_type,
            "data_base64": STANDARD.encode(buffer.into_inner()),
        })
    }

    async fn analyze(server: &TestServer, name: &'static str, body: &Value) -> axum_test::TestResponse {
        let (header, value) = user(name);
        server
            .post("/api/analyze")
            .add_header(header, value)
            .json(body)
            .await
    }

    async fn balance_of(server: &TestServer, name: &'static str) -> u64 {
        let (header, value) = user(name);
        let response = server.get("/api/tokens").add_header(header, value).await;
        response.assert_status_ok();
        response.json::<Value>()["balance"].as_u64().unwrap()
    }

    async fn credit(
        server: &TestServer,
        name: &'static str,
        pack: &str,
        secret: Option<&'static str>,
    ) -> axum_test::TestResponse {
        let (header, value) = user(name);
        let mut request = server
            .post("/api/tokens/credit")
            .add_header(header, value)
            .json(&json!({ "pack": pack }));
        if let Some(secret) = secret {
            request = request.add_header(
                HeaderName::from_static("x-credit-secret"),
                HeaderValue::from_static(secret),
            );
        }
        request.await
    }

    async fn history_of(server: &TestServer, name: &'static str) -> Value {
        let (header, value) = user(name);
        let response = server.get("/api/history").add_header(header, value).await;
        response.assert_status_ok();
        response.json::<Value>()
    }

    #[tokio::test]
    async fn test_health_returns_200() {
        let server = create_test_server(CONTRACT);
        let response = server.get("/health").await;
        response.assert_status_ok();

        let json = response.json::<Value>();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["service"], "shield-server");
    }

    #[tokio::test]
    async fn test_analyze_scan() {
        let server = create_test_server(CONTRACT);
        let response = analyze(&server, "alice", &scan_body("image/png")).await;
        response.assert_status_ok();

        let json = response.json::<Value>();
        assert!(json["success"].as_bool().unwrap());
        assert_eq!(json["analysis"]["score"], 90);
        assert_eq!(json["analysis"]["band"], "unproblematic");
        assert_eq!(
            json["redaction"]["redacted_text"],
            "Die Kündigungsfrist beträgt 3 Monate. Kontakt: [EMAIL_REDACTED], Betrag [BETRAG_REDACTED]."
        );
        assert_eq!(json["extraction"]["pages"][0]["method"], "ocr");
        assert_eq!(
            json["states"],
            json!(["scanning", "anonymizing", "analyzing", "complete"])
        );
        assert_eq!(json["balance"], 1);

        let history = history_of(&server, "alice").await;
        assert_eq!(history["count"], 1);
        assert_eq!(history["records"][0]["id"], json["record_id"]);
        assert_eq!(history["records"][0]["status"], "complete");
        assert_eq!(history["records"][0]["tokens_used"], 4);
    }

    #[tokio::test]
    async fn test_analyze_requires_user() {
        let server = create_test_server(CONTRACT);
        let response = server
            .post("/api/analyze")
            .json(&scan_body("image/png"))
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        let json = response.json::<Value>();
        assert_eq!(json["success"], false);
        assert_eq!(json["code"], "MISSING_USER");
    }

    #[tokio::test]
    async fn test_analyze_rejects_bad_base64() {
        let server = create_test_server(CONTRACT);
        let body = json!({
            "file_name": "x.pdf",
            "mime_type": "application/pdf",
            "data_base64": "not base64 !!!",
        });
        let response = analyze(&server, "alice", &body).await;

        response.assert_status_bad_request();
        assert_eq!(response.json::<Value>()["code"], "INVALID_REQUEST");
        assert_eq!(balance_of(&server, "alice").await, 5);
    }

    #[tokio::test]
    async fn test_unsupported_format_is_415_and_recorded() {
        let server = create_test_server(CONTRACT);
        let response = analyze(&server, "alice", &scan_body("text/plain")).await;

        response.assert_status(StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(response.json::<Value>()["code"], "UNSUPPORTED_FORMAT");

        assert_eq!(balance_of(&server, "alice").await, 4);
        let history = history_of(&server, "alice").await;
        assert_eq!(history["records"][0]["status"], "failed");
        assert_eq!(history["records"][0]["failure"]["kind"], "UNSUPPORTED_FORMAT");
        assert_eq!(history["records"][0]["tokens_used"], 1);
    }

    #[tokio::test]
    async fn test_blank_scan_is_422() {
        let server = create_test_server("   \n ");
        let response = analyze(&server, "alice", &scan_body("image/png")).await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(response.json::<Value>()["code"], "EMPTY_EXTRACTION");
    }

    #[tokio::test]
    async fn test_insufficient_tokens_is_402() {
        let server = create_test_server(CONTRACT);
        analyze(&server, "alice", &scan_body("image/png"))
            .await
            .assert_status_ok();

        // One token left: scanning is paid, analysis is refused
        let response = analyze(&server, "alice", &scan_body("image/png")).await;
        response.assert_status(StatusCode::PAYMENT_REQUIRED);
        assert_eq!(response.json::<Value>()["code"], "INSUFFICIENT_TOKENS");
        assert_eq!(balance_of(&server, "alice").await, 0);

        // Empty account: refused before anything runs, nothing recorded
        let response = analyze(&server, "alice", &scan_body("image/png")).await;
        response.assert_status(StatusCode::PAYMENT_REQUIRED);
        assert_eq!(history_of(&server, "alice").await["count"], 2);
    }

    #[tokio::test]
    async fn test_token_packs_and_credit() {
        let server = create_test_server(CONTRACT);

        let response = server.get("/api/token-packs").await;
        response.assert_status_ok();
        let json = response.json::<Value>();
        assert_eq!(json["packs"].as_array().unwrap().len(), 3);
        assert_eq!(json["packs"][1]["id"], "pro");

        let response = credit(&server, "alice", "pro", Some(CREDIT_SECRET)).await;
        response.assert_status_ok();
        let json = response.json::<Value>();
        assert_eq!(json["balance"], 30);
        assert_eq!(json["cap"], 30);

        let response = credit(&server, "alice", "platinum", Some(CREDIT_SECRET)).await;
        response.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(response.json::<Value>()["code"], "UNKNOWN_PACK");
    }

    #[tokio::test]
    async fn test_user_cannot_credit_own_account() {
        let server = create_test_server(CONTRACT);

        let response = credit(&server, "mallory", "pro", None).await;
        response.assert_status(StatusCode::FORBIDDEN);
        assert_eq!(response.json::<Value>()["code"], "CREDIT_FORBIDDEN");

        let response = credit(&server, "mallory", "pro", Some("guessed-secret")).await;
        response.assert_status(StatusCode::FORBIDDEN);

        assert_eq!(balance_of(&server, "mallory").await, 5);
    }

    #[tokio::test]
    async fn test_credit_closed_without_configured_secret() {
        let server = create_server_with_secret(CONTRACT, None);

        let response = credit(&server, "alice", "pro", Some(CREDIT_SECRET)).await;
        response.assert_status(StatusCode::FORBIDDEN);
        assert_eq!(balance_of(&server, "alice").await, 5);
    }

    #[tokio::test]
    async fn test_history_record_lookup_is_per_user() {
        let server = create_test_server(CONTRACT);
        let response = analyze(&server, "alice", &scan_body("image/png")).await;
        let record_id = response.json::<Value>()["record_id"]
            .as_str()
            .unwrap()
            .to_string();
        let path = format!("/api/history/{}", record_id);

        let (header, value) = user("alice");
        let response = server.get(&path).add_header(header, value).await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["file_name"], "vertrag.png");

        let (header, value) = user("bob");
        let response = server.get(&path).add_header(header, value).await;
        response.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(response.json::<Value>()["code"], "RECORD_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_clear_history() {
        let server = create_test_server(CONTRACT);
        analyze(&server, "alice", &scan_body("image/png"))
            .await
            .assert_status_ok();
        analyze(&server, "bob", &scan_body("image/png"))
            .await
            .assert_status_ok();

        let (header, value) = user("alice");
        let response = server.delete("/api/history").add_header(header, value).await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["removed"], 1);

        assert_eq!(history_of(&server, "alice").await["count"], 0);
        assert_eq!(history_of(&server, "bob").await["count"], 1);
    }
}
