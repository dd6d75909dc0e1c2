//! HTTP surface: upload a PDF, download a DOCX.
//!
//! | Method | Path       | Body                                    |
//! |--------|------------|-----------------------------------------|
//! | POST   | `/convert` | `multipart/form-data`, one field `file` |
//! | GET    | `/health`  | none                                    |
//!
//! A successful conversion answers with the DOCX bytes as an attachment.
//! Every failure answers with `{"error": "...", "kind": "..."}` and a status
//! derived from the error kind. The handler never keeps anything after the
//! response is produced: the converter owns the only temporary file and
//! releases it before returning.

use crate::config::ServerConfig;
use crate::convert::Converter;
use crate::error::{ConvertError, ErrorKind};
use crate::output::DOCX_MIME;
use crate::pipeline::input;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

/// Slack on top of `max_upload_bytes` for multipart boundaries and headers.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Shared state of the HTTP handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub converter: Converter,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(converter: Converter, config: ServerConfig) -> Self {
        Self {
            converter,
            config: Arc::new(config),
        }
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD;
    Router::new()
        .route("/convert", post(convert_upload))
        .route("/health", get(health_check))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `config.bind` and serve until Ctrl-C.
pub async fn serve(config: ServerConfig, converter: Converter) -> std::io::Result<()> {
    let listener = TcpListener::bind(config.bind).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    let app = router(AppState::new(converter, config));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received, draining connections"),
        Err(e) => {
            warn!("Could not install Ctrl-C handler: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────

/// `POST /convert`: multipart upload in, DOCX attachment out.
async fn convert_upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let mut multipart = multipart.map_err(|rejection| ApiError::Multipart {
        status: rejection.status(),
        message: rejection.body_text(),
    })?;

    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(ApiError::from)? {
        if field.name() != Some("file") {
            debug!("Ignoring multipart field {:?}", field.name());
            continue;
        }
        if upload.is_some() {
            return Err(ApiError::MultipleFiles);
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let data = field.bytes().await.map_err(ApiError::from)?;
        upload = Some((filename, data));
    }

    let (filename, data) = upload.ok_or(ApiError::MissingFile)?;
    if filename.is_empty() {
        return Err(ApiError::MissingFile);
    }
    if state.config.require_pdf_extension {
        input::check_pdf_extension(&filename)?;
    }
    if data.len() > state.config.max_upload_bytes {
        return Err(ConvertError::InputTooLarge {
            size: data.len(),
            limit: state.config.max_upload_bytes,
        }
        .into());
    }

    let output = state
        .converter
        .convert_async(data.to_vec(), filename)
        .await?;

    let disposition = format!("attachment; filename=\"{}\"", output.filename);
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, DOCX_MIME.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        output.docx,
    )
        .into_response())
}

/// `GET /health`.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "pdf2docx",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// ── Errors ───────────────────────────────────────────────────────────────

/// Everything a handler can fail with.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Convert(#[from] ConvertError),

    #[error("No file provided: expected a multipart field named 'file'")]
    MissingFile,

    #[error("Only one file per request is supported")]
    MultipleFiles,

    #[error("Malformed multipart request: {message}")]
    Multipart { status: StatusCode, message: String },
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        ApiError::Multipart {
            status: e.status(),
            message: e.body_text(),
        }
    }
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Convert(e) => e.kind(),
            ApiError::MissingFile => ErrorKind::InvalidInput,
            ApiError::MultipleFiles => ErrorKind::UnsupportedInput,
            ApiError::Multipart { status, .. } if *status == StatusCode::PAYLOAD_TOO_LARGE => {
                ErrorKind::UnsupportedInput
            }
            ApiError::Multipart { .. } => ErrorKind::InvalidInput,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Convert(ConvertError::InputTooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Multipart { status, .. } => *status,
            _ => match self.kind() {
                ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
                ErrorKind::UnsupportedInput => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                ErrorKind::ExtractionFailure => StatusCode::UNPROCESSABLE_ENTITY,
                ErrorKind::ResourceFailure => StatusCode::SERVICE_UNAVAILABLE,
                ErrorKind::GenerationFailure | ErrorKind::InvalidConfig | ErrorKind::Internal => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }
}

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: ErrorKind,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("{} [{}]: {}", status, self.kind(), self);
        } else {
            debug!("{} [{}]: {}", status, self.kind(), self);
        }
        let body = ErrorResponse {
            error: self.to_string(),
            kind: self.kind(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_follows_error_kind() {
        let cases = [
            (ApiError::from(ConvertError::EmptyInput), StatusCode::BAD_REQUEST),
            (
                ApiError::from(ConvertError::PasswordRequired),
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ),
            (
                ApiError::from(ConvertError::InputTooLarge { size: 9, limit: 1 }),
                StatusCode::PAYLOAD_TOO_LARGE,
            ),
            (
                ApiError::from(ConvertError::NoTextFound { pages: 2 }),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                ApiError::from(ConvertError::GenerationFailed("zip".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ApiError::from(ConvertError::Internal("join".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (ApiError::MissingFile, StatusCode::BAD_REQUEST),
            (ApiError::MultipleFiles, StatusCode::UNSUPPORTED_MEDIA_TYPE),
        ];
        for (err, expected) in cases {
            assert_eq!(err.status(), expected, "{err}");
        }
    }

    #[test]
    fn scratch_failure_is_service_unavailable() {
        let err = ApiError::from(ConvertError::ScratchAllocation {
            dir: "/nope".into(),
            source: std::io::Error::new(std::io::ErrorKind::Other, "read-only fs"),
        });
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.kind(), ErrorKind::ResourceFailure);
    }

    #[test]
    fn oversized_multipart_is_unsupported() {
        let err = ApiError::Multipart {
            status: StatusCode::PAYLOAD_TOO_LARGE,
            message: "length limit exceeded".into(),
        };
        assert_eq!(err.kind(), ErrorKind::UnsupportedInput);
        assert_eq!(err.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn error_body_carries_kind() {
        let body = ErrorResponse {
            error: ConvertError::EmptyInput.to_string(),
            kind: ConvertError::EmptyInput.kind(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["kind"], "invalid_input");
        assert!(json["error"].as_str().unwrap().contains("empty"));
    }
}
