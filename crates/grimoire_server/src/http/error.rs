//! API error taxonomy and its JSON rendering.
//!
//! Every error body is `{"detail": "<message>"}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use grimoire_core::PlotServiceError;
use log::error;
use serde_json::json;
use std::error::Error;
use std::fmt::{Display, Formatter};
use tokio::task::JoinError;

#[derive(Debug)]
pub enum ApiError {
    /// `grimoire-secret` header absent.
    MissingSecret,
    /// `grimoire-secret` header present but wrong.
    InvalidSecret,
    /// Dashboard delete without the page token, or from another origin.
    UiRequestRejected,
    /// Target entity does not exist; carries its kind (`Plot`, `Chapter`, `Grimoire`).
    NotFound(&'static str),
    /// Body or names failed validation.
    Unprocessable(String),
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingSecret => StatusCode::UNAUTHORIZED,
            Self::InvalidSecret | Self::UiRequestRejected => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingSecret => write!(f, "grimoire-secret not found"),
            Self::InvalidSecret => write!(f, "invalid grimoire-secret"),
            Self::UiRequestRejected => write!(f, "dashboard request rejected"),
            Self::NotFound(kind) => write!(f, "{kind} not found"),
            Self::Unprocessable(message) => write!(f, "{message}"),
            Self::Internal(_) => write!(f, "Internal server error"),
        }
    }
}

impl Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(cause) = &self {
            error!("event=api_error module=http status=error cause={cause}");
        }
        let body = Json(json!({ "detail": self.to_string() }));
        (self.status(), body).into_response()
    }
}

impl From<PlotServiceError> for ApiError {
    fn from(value: PlotServiceError) -> Self {
        match value {
            PlotServiceError::InvalidName(err) => Self::Unprocessable(err.to_string()),
            PlotServiceError::Repo(err) => Self::Internal(err.to_string()),
        }
    }
}

impl From<JoinError> for ApiError {
    fn from(value: JoinError) -> Self {
        Self::Internal(format!("storage task failed: {value}"))
    }
}
