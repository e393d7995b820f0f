//! Live dashboard: page, region fragments, refresh stream and UI deletes.

pub mod guard;
pub mod handlers;
pub mod page;
pub mod registry;
pub mod render;
mod ws;

use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;

pub(crate) fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::index))
        .route("/fragments/dashboard", get(handlers::dashboard_fragment))
        .route(
            "/fragments/grimoire/:grimoire",
            get(handlers::grimoire_fragment),
        )
        .route(
            "/fragments/grimoire/:grimoire/chapter/:chapter",
            get(handlers::chapter_fragment),
        )
        .route("/ws", get(ws::ws_handler))
        .route(
            "/ui/grimoire/:grimoire/delete",
            post(handlers::ui_delete_grimoire),
        )
        .route(
            "/ui/grimoire/:grimoire/chapter/:chapter/delete",
            post(handlers::ui_delete_chapter),
        )
}
