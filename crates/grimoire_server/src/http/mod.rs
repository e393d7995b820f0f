//! JSON API: plot ingestion and authenticated management endpoints.

pub mod auth;
pub mod error;
pub mod plots;

use crate::state::AppState;
use axum::routing::{delete, post};
use axum::Router;

pub(crate) fn routes() -> Router<AppState> {
    Router::new()
        .route("/add_plot", post(plots::add_plot))
        .route(
            "/grimoire/:grimoire/chapter/:chapter/plot/:plot",
            delete(plots::delete_plot),
        )
        .route(
            "/grimoire/:grimoire/chapter/:chapter",
            delete(plots::delete_chapter),
        )
        .route("/grimoire/:grimoire", delete(plots::delete_grimoire))
}
