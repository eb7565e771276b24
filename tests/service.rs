//! HTTP service tests: the router is driven in-process with stubbed
//! rendering and extraction.

#![cfg(feature = "server")]

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use common::{minimal_pdf, sample_record, StubExtractor, StubRenderer, Workspace};
use cv2doc::service::{router, DOCX_MEDIA_TYPE, QUOTA_MESSAGE};
use cv2doc::Cv2DocError;
use serde_json::{json, Value};
use tower::ServiceExt;

const BOUNDARY: &str = "cv2doc-test-boundary";

fn multipart(field: &str, filename: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
         Content-Type: {content_type}\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload(uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn pdf_upload(uri: &str, filename: &str) -> Request<Body> {
    upload(
        uri,
        multipart("cv", filename, "application/pdf", &minimal_pdf(&[595])),
    )
}

async fn send(
    app: Router,
    request: Request<Body>,
) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, headers, body.to_vec())
}

fn as_json(body: &[u8]) -> Value {
    serde_json::from_slice(body).unwrap()
}

#[tokio::test]
async fn root_says_hello() {
    let ws = Workspace::new();
    let app = router(ws.pipeline(StubRenderer::new(1), StubExtractor::returning(sample_record())));

    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let (status, _, body) = send(app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(as_json(&body), json!({ "Hello": "World" }));
}

#[tokio::test]
async fn process_cv_returns_docx_attachment() {
    let ws = Workspace::new();
    let renderer = StubRenderer::new(1);
    let app = router(ws.pipeline(renderer.clone(), StubExtractor::returning(sample_record())));

    let (status, headers, body) = send(app, pdf_upload("/process_cv/", "jean.dupont.pdf")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], DOCX_MEDIA_TYPE);
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"jean.docx\""
    );
    assert!(body.starts_with(b"PK"));
    assert!(ws.settings.json_output_dir.join("jean.json").exists());

    // The staged upload existed while rendering and is gone afterwards.
    let seen = renderer.seen();
    assert_eq!(seen.len(), 1);
    let (staged, existed) = &seen[0];
    assert!(*existed);
    assert_eq!(staged.file_name().unwrap(), "jean.dupont.pdf");
    assert!(!staged.exists());
    assert!(!staged.parent().unwrap().exists());
}

#[tokio::test]
async fn extract_json_returns_internal_field_names() {
    let ws = Workspace::new();
    let app = router(ws.pipeline(StubRenderer::new(2), StubExtractor::returning(sample_record())));

    let (status, _, body) = send(app, pdf_upload("/extract_json/", "cv.pdf")).await;

    assert_eq!(status, StatusCode::OK);
    let value = as_json(&body);
    assert_eq!(value["full_name"], "Jean Dupont");
    assert_eq!(value["experiences"][1]["company"], "Globex & Co");
    assert_eq!(value["savoir_etre"][0]["text"], "• Esprit d'équipe\n");
    assert!(value.get("soft_skills").is_none());
    assert!(value.get("nom").is_none());
    assert!(!ws.settings.json_output_dir.exists());
}

#[tokio::test]
async fn non_pdf_upload_is_415_even_when_provider_is_out_of_quota() {
    let ws = Workspace::new();
    let renderer = StubRenderer::new(1);
    let app = router(ws.pipeline(
        renderer.clone(),
        StubExtractor::provider_error("RESOURCE_EXHAUSTED"),
    ));

    let body = multipart("cv", "notes.txt", "text/plain", b"hello");
    let (status, _, body) = send(app, upload("/process_cv/", body)).await;

    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(as_json(&body), json!({ "detail": "Only PDF files are supported" }));
    assert!(renderer.seen().is_empty());
}

#[tokio::test]
async fn x_pdf_content_type_is_accepted() {
    let ws = Workspace::new();
    let app = router(ws.pipeline(StubRenderer::new(1), StubExtractor::returning(sample_record())));

    let body = multipart("cv", "cv.pdf", "application/x-pdf", &minimal_pdf(&[595]));
    let (status, _, _) = send(app, upload("/extract_json/", body)).await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn quota_exhaustion_is_503_with_fixed_message() {
    let ws = Workspace::new();
    let renderer = StubRenderer::new(1);
    let extractor = StubExtractor::failing(|| Cv2DocError::QuotaExhausted {
        message: "429 RESOURCE_EXHAUSTED".into(),
    });
    let app = router(ws.pipeline(renderer.clone(), extractor));

    let (status, _, body) = send(app, pdf_upload("/process_cv/", "cv.pdf")).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        as_json(&body),
        json!({ "error": "quota_exhausted", "message": QUOTA_MESSAGE })
    );
    // Cleanup happens on the failure path too.
    let (staged, _) = &renderer.seen()[0];
    assert!(!staged.exists());
}

#[tokio::test]
async fn quota_text_in_provider_message_is_recognised_in_any_case() {
    let ws = Workspace::new();
    let app = router(ws.pipeline(
        StubRenderer::new(1),
        StubExtractor::provider_error("upstream said: resource_exhausted"),
    ));

    let (status, _, body) = send(app, pdf_upload("/process_cv/", "cv.pdf")).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(as_json(&body)["error"], "quota_exhausted");
}

#[tokio::test]
async fn other_provider_failures_are_503_with_raw_message() {
    let ws = Workspace::new();
    let app = router(ws.pipeline(
        StubRenderer::new(1),
        StubExtractor::provider_error("internal server error"),
    ));

    let (status, _, body) = send(app, pdf_upload("/extract_json/", "cv.pdf")).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(as_json(&body), json!({ "error": "internal server error" }));
}

#[tokio::test]
async fn schema_violation_is_500() {
    let ws = Workspace::new();
    let app = router(ws.pipeline(
        StubRenderer::new(1),
        StubExtractor::failing(|| Cv2DocError::SchemaViolation {
            detail: "missing field `nom`".into(),
        }),
    ));

    let (status, _, body) = send(app, pdf_upload("/process_cv/", "cv.pdf")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(as_json(&body)["error"].as_str().unwrap().contains("nom"));
}

#[tokio::test]
async fn missing_cv_field_is_400() {
    let ws = Workspace::new();
    let app = router(ws.pipeline(StubRenderer::new(1), StubExtractor::returning(sample_record())));

    let body = multipart("resume", "cv.pdf", "application/pdf", b"%PDF-1.4");
    let (status, _, body) = send(app, upload("/process_cv/", body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(as_json(&body)["error"].as_str().unwrap().contains("cv"));
}

#[tokio::test]
async fn non_multipart_request_is_400() {
    let ws = Workspace::new();
    let app = router(ws.pipeline(StubRenderer::new(1), StubExtractor::returning(sample_record())));

    let request = Request::builder()
        .method("POST")
        .uri("/extract_json/")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();
    let (status, _, _) = send(app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn hostile_upload_names_stay_inside_the_staging_dir() {
    let ws = Workspace::new();
    let renderer = StubRenderer::new(1);
    let app = router(ws.pipeline(renderer.clone(), StubExtractor::returning(sample_record())));

    let (status, _, _) = send(app, pdf_upload("/extract_json/", "../../etc/evil name.pdf")).await;

    assert_eq!(status, StatusCode::OK);
    let (staged, _) = &renderer.seen()[0];
    assert_eq!(staged.file_name().unwrap(), "evil name.pdf");
    assert!(staged.starts_with(std::env::temp_dir()));
}

#[tokio::test]
async fn accented_upload_name_names_the_outputs() {
    let ws = Workspace::new();
    let app = router(ws.pipeline(StubRenderer::new(1), StubExtractor::returning(sample_record())));

    let (status, headers, _) = send(app, pdf_upload("/process_cv/", "Jérôme Dupont.pdf")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"J_r_me Dupont.docx\"; \
         filename*=UTF-8''J%C3%A9r%C3%B4me%20Dupont.docx"
    );
    assert!(ws.settings.json_output_dir.join("Jérôme Dupont.json").exists());
    assert!(ws.settings.results_dir.join("Jérôme Dupont.docx").exists());
}

#[tokio::test]
async fn truncated_extra_field_is_400() {
    let ws = Workspace::new();
    let renderer = StubRenderer::new(1);
    let app = router(ws.pipeline(renderer.clone(), StubExtractor::returning(sample_record())));

    // A leading non-`cv` field whose body is cut off before any boundary.
    let body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"note\"\r\n\r\n\
         unterminated"
    )
    .into_bytes();
    let (status, _, body) = send(app, upload("/process_cv/", body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(as_json(&body)["error"]
        .as_str()
        .unwrap()
        .starts_with("Failed to read form field"));
    assert!(renderer.seen().is_empty());
}
