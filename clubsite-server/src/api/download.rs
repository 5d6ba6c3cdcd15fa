//! Raw legacy CSV download

use axum::{
    body::Body,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio_util::io::ReaderStream;
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::reader::LegacyKind;
use crate::AppState;

/// GET /api/download/:kind
///
/// Streams the file as stored; nothing is parsed or sanitized.
pub async fn download_csv(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> ApiResult<Response> {
    let legacy = LegacyKind::from_name(&kind)
        .ok_or_else(|| ApiError::NotFound(format!("unknown legacy data '{}'", kind)))?;
    let path = state.reader.legacy().path(legacy);

    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::NotFound(format!("{} is not available", legacy.file_name())));
        }
        Err(e) => return Err(ApiError::Internal(format!("failed to open {}: {}", legacy.file_name(), e))),
    };

    debug!(path = %path.display(), "Streaming legacy CSV");

    let disposition = format!("attachment; filename=\"{}\"", legacy.file_name());
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response())
}

/// Build download routes
pub fn download_routes() -> Router<AppState> {
    Router::new().route("/api/download/:kind", get(download_csv))
}
