//! Ingestion and management handlers.

use crate::http::auth::verify_secret;
use crate::http::error::ApiError;
use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use grimoire_core::{AddPlotRequest, AddPlotResponse, ChapterKey, DeleteResponse, PlotKey};
use log::info;

/// `POST /add_plot`: upserts one plot and refreshes the affected chapter.
pub async fn add_plot(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<AddPlotRequest>, JsonRejection>,
) -> Result<Json<AddPlotResponse>, ApiError> {
    verify_secret(&headers, &state.config.secret)?;
    let Json(request) =
        payload.map_err(|rejection| ApiError::Unprocessable(rejection.body_text()))?;

    let key = request.key();
    key.validate()
        .map_err(|err| ApiError::Unprocessable(err.to_string()))?;

    let json_data = request.json_data;
    let upsert_key = key.clone();
    let plot = state
        .storage_retrying("add_plot", move |service| {
            service.upsert_plot(&upsert_key, &json_data)
        })
        .await?;

    if !state.refresh.refresh_chapter(&key.chapter_key()) {
        state.refresh.refresh_dashboard();
    }
    Ok(Json(AddPlotResponse::success(plot.name)))
}

/// `DELETE /grimoire/{g}/chapter/{c}/plot/{p}`.
pub async fn delete_plot(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((grimoire, chapter, plot)): Path<(String, String, String)>,
) -> Result<Json<DeleteResponse>, ApiError> {
    verify_secret(&headers, &state.config.secret)?;

    let key = PlotKey::new(grimoire, chapter, plot);
    let target = key.clone();
    let deleted = state
        .storage("delete_plot", move |service| service.delete_plot(&target))
        .await?;
    if !deleted {
        return Err(ApiError::NotFound("Plot"));
    }

    info!("event=api_delete module=http status=ok scope=plot");
    state.refresh.refresh_dashboard();
    Ok(Json(DeleteResponse::success(key.plot)))
}

/// `DELETE /grimoire/{g}/chapter/{c}`: removes the chapter and its plots.
pub async fn delete_chapter(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((grimoire, chapter)): Path<(String, String)>,
) -> Result<Json<DeleteResponse>, ApiError> {
    verify_secret(&headers, &state.config.secret)?;

    let key = ChapterKey::new(grimoire, chapter);
    remove_chapter(&state, key.clone()).await?;

    info!("event=api_delete module=http status=ok scope=chapter");
    state.refresh.refresh_dashboard();
    Ok(Json(DeleteResponse::success(key.chapter)))
}

/// `DELETE /grimoire/{g}`: removes the grimoire and everything beneath it.
pub async fn delete_grimoire(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(grimoire): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    verify_secret(&headers, &state.config.secret)?;

    remove_grimoire(&state, grimoire.clone()).await?;

    info!("event=api_delete module=http status=ok scope=grimoire");
    state.refresh.refresh_dashboard();
    Ok(Json(DeleteResponse::success(grimoire)))
}

/// Deletes one chapter and forgets its dashboard region.
pub(crate) async fn remove_chapter(state: &AppState, key: ChapterKey) -> Result<(), ApiError> {
    let target = key.clone();
    let deleted = state
        .storage("delete_chapter", move |service| {
            service.delete_chapter(&target)
        })
        .await?;
    if !deleted {
        return Err(ApiError::NotFound("Chapter"));
    }
    state.refresh.forget_chapter(&key);
    Ok(())
}

/// Deletes one grimoire and forgets its dashboard regions.
pub(crate) async fn remove_grimoire(state: &AppState, name: String) -> Result<(), ApiError> {
    let target = name.clone();
    let deleted = state
        .storage("delete_grimoire", move |service| {
            service.delete_grimoire(&target)
        })
        .await?;
    if !deleted {
        return Err(ApiError::NotFound("Grimoire"));
    }
    state.refresh.forget_grimoire(&name);
    Ok(())
}
