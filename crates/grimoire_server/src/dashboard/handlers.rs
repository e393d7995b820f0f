//! Dashboard page, fragment and UI delete handlers.

use crate::dashboard::guard::verify_ui_request;
use crate::dashboard::{page, render};
use crate::http::error::ApiError;
use crate::http::plots::{remove_chapter, remove_grimoire};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::Html;
use axum::Json;
use grimoire_core::{ChapterKey, DeleteResponse};
use log::info;

/// `GET /`: the full dashboard page.
pub async fn index(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    let dashboard = dashboard_html(&state).await?;
    Ok(Html(page::render_page(&dashboard, &state.ui_token)))
}

/// `GET /fragments/dashboard`.
pub async fn dashboard_fragment(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    Ok(Html(dashboard_html(&state).await?))
}

/// `GET /fragments/grimoire/{g}`.
pub async fn grimoire_fragment(
    State(state): State<AppState>,
    Path(grimoire): Path<String>,
) -> Result<Html<String>, ApiError> {
    let grimoire = state
        .storage("render_grimoire", move |service| {
            service.get_grimoire(&grimoire)
        })
        .await?
        .ok_or(ApiError::NotFound("Grimoire"))?;

    state.refresh.track_grimoire(&grimoire);
    Ok(Html(render::render_grimoire(&grimoire)))
}

/// `GET /fragments/grimoire/{g}/chapter/{c}`.
pub async fn chapter_fragment(
    State(state): State<AppState>,
    Path((grimoire, chapter)): Path<(String, String)>,
) -> Result<Html<String>, ApiError> {
    let key = ChapterKey::new(grimoire, chapter);
    let lookup = key.clone();
    let chapter = state
        .storage("render_chapter", move |service| service.get_chapter(&lookup))
        .await?
        .ok_or(ApiError::NotFound("Chapter"))?;

    state.refresh.track_chapter(&key);
    Ok(Html(render::render_chapter(&chapter)))
}

/// `POST /ui/grimoire/{g}/delete`: dashboard delete badge on a grimoire tab.
pub async fn ui_delete_grimoire(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(grimoire): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    verify_ui_request(&headers, &state.ui_token)?;
    remove_grimoire(&state, grimoire.clone()).await?;

    info!("event=ui_delete module=dashboard status=ok scope=grimoire");
    state.refresh.refresh_dashboard();
    Ok(Json(DeleteResponse::success(grimoire)))
}

/// `POST /ui/grimoire/{g}/chapter/{c}/delete`: delete badge on a chapter tab.
pub async fn ui_delete_chapter(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((grimoire, chapter)): Path<(String, String)>,
) -> Result<Json<DeleteResponse>, ApiError> {
    verify_ui_request(&headers, &state.ui_token)?;
    let key = ChapterKey::new(grimoire, chapter);
    remove_chapter(&state, key.clone()).await?;

    info!("event=ui_delete module=dashboard status=ok scope=chapter");
    if !state.refresh.refresh_grimoire(&key.grimoire) {
        state.refresh.refresh_dashboard();
    }
    Ok(Json(DeleteResponse::success(key.chapter)))
}

async fn dashboard_html(state: &AppState) -> Result<String, ApiError> {
    let grimoires = state
        .storage("render_dashboard", |service| service.list_grimoires())
        .await?;
    state.refresh.track_dashboard(&grimoires);
    Ok(render::render_dashboard(&grimoires))
}
