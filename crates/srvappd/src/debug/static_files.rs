//! Static file serving confined to a root directory.

use std::path::{Path, PathBuf};

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use percent_encoding::percent_decode_str;

use crate::log::LogRouter;

use super::routes::error_response;

const INDEX_FILE: &str = "index.html";

/// Serves `request_path` from `root`.
///
/// The path is percent-decoded and `index.html` is appended to directory
/// paths. Anything that escapes the root after canonicalisation, is missing,
/// or is a directory yields 404.
pub(crate) async fn serve(root: Option<&Path>, request_path: &str, log: &LogRouter) -> Response {
    let Some(root) = root else {
        return error_response(StatusCode::NOT_FOUND, "Not Found");
    };
    let not_found = || error_response(StatusCode::NOT_FOUND, &format!("File not found ({request_path})"));

    let Some(resolved) = resolve(root, request_path).await else {
        log.debug_local(format_args!("Can't retrieve file {request_path}"));
        return not_found();
    };
    match tokio::fs::metadata(&resolved).await {
        Ok(metadata) if metadata.is_file() => {}
        _ => return not_found(),
    }
    let bytes = match tokio::fs::read(&resolved).await {
        Ok(bytes) => bytes,
        Err(error) => {
            log.debug_local(format_args!("Can't read file {}: {error}", resolved.display()));
            return not_found();
        }
    };
    let content_type = mime_guess::from_path(&resolved)
        .first_or_octet_stream()
        .to_string();
    ([(header::CONTENT_TYPE, content_type)], bytes).into_response()
}

async fn resolve(root: &Path, request_path: &str) -> Option<PathBuf> {
    let decoded = percent_decode_str(request_path).decode_utf8().ok()?;
    let mut relative = decoded.trim_start_matches('/').to_owned();
    if relative.is_empty() || relative.ends_with('/') {
        relative.push_str(INDEX_FILE);
    }
    let root = tokio::fs::canonicalize(root).await.ok()?;
    let resolved = tokio::fs::canonicalize(root.join(relative)).await.ok()?;
    resolved.starts_with(&root).then_some(resolved)
}
