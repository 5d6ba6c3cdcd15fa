//! Public read endpoints used by the site frontend

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use clubsite_common::models::{SiteContent, SiteSettings};

use crate::error::{ApiError, ApiResult};
use crate::reader::{Audience, Entity, LegacyKind, LegacyRow, ResourceKind};
use crate::AppState;

async fn list_kind(state: &AppState, kind: ResourceKind) -> ApiResult<Json<Vec<Entity>>> {
    Ok(Json(state.reader.list(kind, Audience::Public).await?))
}

async fn get_kind(state: &AppState, kind: ResourceKind, slug: &str) -> ApiResult<Json<Entity>> {
    state
        .reader
        .get_by_slug(kind, slug)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("no entry with slug '{}'", slug)))
}

/// GET /api/news
pub async fn list_news(State(state): State<AppState>) -> ApiResult<Json<Vec<Entity>>> {
    list_kind(&state, ResourceKind::News).await
}

/// GET /api/news/:slug
pub async fn get_news(State(state): State<AppState>, Path(slug): Path<String>) -> ApiResult<Json<Entity>> {
    get_kind(&state, ResourceKind::News, &slug).await
}

/// GET /api/board
pub async fn list_board(State(state): State<AppState>) -> ApiResult<Json<Vec<Entity>>> {
    list_kind(&state, ResourceKind::Board).await
}

/// GET /api/board/:slug
pub async fn get_board_member(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<Entity>> {
    get_kind(&state, ResourceKind::Board, &slug).await
}

/// GET /api/pilots
pub async fn list_pilots(State(state): State<AppState>) -> ApiResult<Json<Vec<Entity>>> {
    list_kind(&state, ResourceKind::Pilots).await
}

/// GET /api/pilots/:slug
pub async fn get_pilot(State(state): State<AppState>, Path(slug): Path<String>) -> ApiResult<Json<Entity>> {
    get_kind(&state, ResourceKind::Pilots, &slug).await
}

/// GET /api/sponsors (active sponsors only)
pub async fn list_sponsors(State(state): State<AppState>) -> ApiResult<Json<Vec<Entity>>> {
    list_kind(&state, ResourceKind::Sponsors).await
}

/// GET /api/settings
pub async fn get_site_settings(State(state): State<AppState>) -> ApiResult<Json<SiteSettings>> {
    Ok(Json(state.reader.site_settings().await?))
}

/// GET /api/content/:page
pub async fn get_page_content(
    State(state): State<AppState>,
    Path(page): Path<String>,
) -> ApiResult<Json<SiteContent>> {
    state
        .reader
        .site_content(&page)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("no content for page '{}'", page)))
}

/// GET /api/legacy/:kind
pub async fn get_legacy_rows(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> ApiResult<Json<Vec<LegacyRow>>> {
    let legacy = LegacyKind::from_name(&kind)
        .ok_or_else(|| ApiError::NotFound(format!("unknown legacy data '{}'", kind)))?;
    state
        .reader
        .legacy_rows(legacy)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("{} is not available", legacy.file_name())))
}

/// Build public read routes
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/api/news", get(list_news))
        .route("/api/news/:slug", get(get_news))
        .route("/api/board", get(list_board))
        .route("/api/board/:slug", get(get_board_member))
        .route("/api/pilots", get(list_pilots))
        .route("/api/pilots/:slug", get(get_pilot))
        .route("/api/sponsors", get(list_sponsors))
        .route("/api/settings", get(get_site_settings))
        .route("/api/content/:page", get(get_page_content))
        .route("/api/legacy/:kind", get(get_legacy_rows))
}
