//! Shared-secret check for write and management endpoints.

use crate::http::error::ApiError;
use axum::http::HeaderMap;
use log::warn;

pub const SECRET_HEADER: &str = "grimoire-secret";

/// Checks the `grimoire-secret` header against `expected`.
///
/// Must run before any storage access.
pub fn verify_secret(headers: &HeaderMap, expected: &str) -> Result<(), ApiError> {
    let Some(value) = headers.get(SECRET_HEADER) else {
        warn!("event=auth module=http status=error reason=missing_header");
        return Err(ApiError::MissingSecret);
    };
    if value.as_bytes() != expected.as_bytes() {
        warn!("event=auth module=http status=error reason=invalid_secret");
        return Err(ApiError::InvalidSecret);
    }
    Ok(())
}
