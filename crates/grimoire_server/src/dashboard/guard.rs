//! Request check for deletes issued by the dashboard page.
//!
//! The page embeds a per-process token and sends it back in
//! `x-grimoire-ui-token`. A cross-site form cannot set that header, and a
//! browser that does send an `Origin` must name this server's own host.

use crate::http::error::ApiError;
use axum::http::header::{HOST, ORIGIN};
use axum::http::HeaderMap;
use log::warn;

pub const UI_TOKEN_HEADER: &str = "x-grimoire-ui-token";

/// Rejects UI requests from another origin or without the page token.
///
/// Must run before any storage access.
pub fn verify_ui_request(headers: &HeaderMap, expected_token: &str) -> Result<(), ApiError> {
    if let Some(origin) = headers.get(ORIGIN) {
        let origin_host = origin
            .to_str()
            .ok()
            .and_then(|value| value.split_once("://"))
            .map(|(_, authority)| authority.trim_end_matches('/'));
        let host = headers.get(HOST).and_then(|value| value.to_str().ok());
        if origin_host.is_none() || origin_host != host {
            warn!("event=ui_auth module=dashboard status=error reason=cross_origin");
            return Err(ApiError::UiRequestRejected);
        }
    }

    match headers.get(UI_TOKEN_HEADER) {
        Some(token) if token.as_bytes() == expected_token.as_bytes() => Ok(()),
        Some(_) => {
            warn!("event=ui_auth module=dashboard status=error reason=invalid_token");
            Err(ApiError::UiRequestRejected)
        }
        None => {
            warn!("event=ui_auth module=dashboard status=error reason=missing_token");
            Err(ApiError::UiRequestRejected)
        }
    }
}
