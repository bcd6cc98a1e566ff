pub mod ask;
pub mod config;
pub mod fuse;

use axum::http::StatusCode;

use crate::error::FusionError;

/// Longest query, in bytes, handed to the engine.
pub(crate) const MAX_QUERY_LEN: usize = 2000;

/// Trim a request query and cap it at [`MAX_QUERY_LEN`]. Blank queries are a 400.
pub(crate) fn normalize_query(raw: &str) -> Result<String, (StatusCode, String)> {
    let query = raw.trim();
    if query.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Query is required".to_string()));
    }
    Ok(truncate_to_char_boundary(query, MAX_QUERY_LEN))
}

/// Longest prefix of `s` that fits in `max_len` bytes without splitting a char.
fn truncate_to_char_boundary(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    s.char_indices()
        .take_while(|(i, c)| i + c.len_utf8() <= max_len)
        .map(|(_, c)| c)
        .collect()
}

/// Map an engine failure onto an HTTP status and message.
pub(crate) fn error_status(err: FusionError) -> (StatusCode, String) {
    let status = match &err {
        FusionError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        FusionError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        FusionError::UpstreamUnavailable { .. } | FusionError::MalformedUpstreamOutput(_) => {
            StatusCode::BAD_GATEWAY
        }
    };
    if status.is_server_error() {
        tracing::warn!("Request failed: {err}");
    }
    (status, err.to_string())
}
