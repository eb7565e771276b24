//! HTTP service over the conversion pipeline.
//!
//! | Route | Result |
//! |-------|--------|
//! | `GET /` | `{"Hello": "World"}` |
//! | `POST /process_cv/` | the filled `.docx` as an attachment |
//! | `POST /extract_json/` | the extracted record, internal field names |
//!
//! Both POST routes take a multipart upload in the field `cv`, which must be
//! declared `application/pdf` or `application/x-pdf`. The upload is staged in
//! a [`tempfile::TempDir`] owned by the handler, so it is removed on every
//! exit path.
//!
//! Error mapping:
//!
//! * non-PDF upload → 415 `{"detail": …}`
//! * provider quota exhaustion → 503 `{"error": "quota_exhausted", "message": …}`
//! * any other provider failure → 503 `{"error": <provider message>}`
//! * malformed upload → 400, anything else → 500 `{"error": …}`

use crate::convert::Pipeline;
use crate::error::Cv2DocError;
use crate::pipeline::input::{is_pdf_content_type, sanitize_upload_name};
use crate::schema::ResumeRecord;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

pub const DOCX_MEDIA_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Largest accepted request body.
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Multipart field carrying the resume.
pub const UPLOAD_FIELD: &str = "cv";

pub const QUOTA_MESSAGE: &str =
    "The language model quota is exhausted. Please try again later.";

const UNSUPPORTED_MEDIA_DETAIL: &str = "Only PDF files are supported";

pub struct AppState {
    pub pipeline: Pipeline,
}

/// Build the application router.
pub fn router(pipeline: Pipeline) -> Router {
    let state = Arc::new(AppState { pipeline });

    Router::new()
        .route("/", get(root))
        .route("/process_cv/", post(process_cv))
        .route("/extract_json/", post(extract_json))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root() -> Json<Value> {
    Json(json!({ "Hello": "World" }))
}

async fn process_cv(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let upload = stage_upload(multipart).await?;
    info!("Starting processing for {}", upload.path.display());

    let docx = state.pipeline.run_processing(&upload.path).await?;
    let bytes = tokio::fs::read(&docx).await.map_err(|e| {
        Cv2DocError::Internal(format!("Cannot read '{}': {}", docx.display(), e))
    })?;

    let filename = docx
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "cv.docx".to_string());

    Ok((
        [
            (header::CONTENT_TYPE, DOCX_MEDIA_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, content_disposition(&filename)),
        ],
        bytes,
    )
        .into_response())
}

async fn extract_json(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ResumeRecord>, ApiError> {
    let upload = stage_upload(multipart).await?;
    info!("Starting extraction for {}", upload.path.display());

    let record = state.pipeline.extract_record(&upload.path).await?;
    Ok(Json(record))
}

/// `attachment` disposition for `filename`.
///
/// Non-ASCII names get an RFC 6266 `filename*` parameter beside an ASCII
/// fallback, since header values must stay ASCII.
fn content_disposition(filename: &str) -> String {
    if filename.is_ascii() {
        return format!("attachment; filename=\"{}\"", filename.replace(['"', '\\'], "_"));
    }
    let fallback: String = filename
        .chars()
        .map(|c| if c.is_ascii() && c != '"' && c != '\\' { c } else { '_' })
        .collect();
    let encoded = utf8_percent_encode(filename, RFC5987_ATTR);
    format!("attachment; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
}

/// Everything but unreserved characters is percent-encoded in `filename*`.
const RFC5987_ATTR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

// ── Upload staging ───────────────────────────────────────────────────────

/// An uploaded resume on disk. The directory is deleted on drop.
struct StagedUpload {
    path: PathBuf,
    _dir: TempDir,
}

async fn stage_upload(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<StagedUpload, ApiError> {
    let mut multipart = multipart.map_err(|e| ApiError::bad_request(e.body_text()))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Failed to read form field: {}", e)))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            field.bytes().await.map_err(|e| {
                ApiError::bad_request(format!("Failed to read form field: {}", e))
            })?;
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        if !is_pdf_content_type(&content_type) {
            return Err(Cv2DocError::UnsupportedMediaType { content_type }.into());
        }

        let filename = sanitize_upload_name(field.file_name().unwrap_or("cv.pdf"));
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read file data: {}", e)))?;

        let dir = tempfile::tempdir()
            .map_err(|e| Cv2DocError::Internal(format!("Cannot create upload dir: {}", e)))?;
        let path = dir.path().join(filename);
        tokio::fs::write(&path, &data)
            .await
            .map_err(|source| Cv2DocError::OutputWriteFailed {
                path: path.clone(),
                source,
            })?;

        return Ok(StagedUpload { path, _dir: dir });
    }

    Err(ApiError::bad_request(format!(
        "Missing multipart field '{UPLOAD_FIELD}'"
    )))
}

// ── Errors ───────────────────────────────────────────────────────────────

/// JSON error response.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: Value,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        let message = message.into();
        warn!("Rejected upload: {}", message);
        Self {
            status: StatusCode::BAD_REQUEST,
            body: json!({ "error": message }),
        }
    }
}

impl From<Cv2DocError> for ApiError {
    fn from(err: Cv2DocError) -> Self {
        let (status, body) = match &err {
            Cv2DocError::UnsupportedMediaType { content_type } => {
                warn!("Rejected upload with content type '{}'", content_type);
                (
                    StatusCode::UNSUPPORTED_MEDIA_TYPE,
                    json!({ "detail": UNSUPPORTED_MEDIA_DETAIL }),
                )
            }
            e if e.is_quota_exhausted() => {
                warn!("Provider quota exhausted: {}", e);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    json!({ "error": "quota_exhausted", "message": QUOTA_MESSAGE }),
                )
            }
            Cv2DocError::Provider { message } => {
                error!("Provider failure: {}", message);
                (StatusCode::SERVICE_UNAVAILABLE, json!({ "error": message }))
            }
            e => {
                error!("Processing failed: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": e.to_string() }),
                )
            }
        };
        Self { status, body }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
