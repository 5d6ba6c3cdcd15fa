//! Admin endpoints
//!
//! Reads are open; writes take an `AdminIdentity`, which is extracted (and
//! therefore authorized) before the multipart body is read.

use axum::{
    extract::{Multipart, Path, State},
    routing::get,
    Json, Router,
};
use clubsite_common::api::SubmitResponse;
use serde_json::Value;
use tracing::info;

use crate::auth::AdminIdentity;
use crate::error::{ApiError, ApiResult};
use crate::orchestrator::form::FormData;
use crate::orchestrator::resources::{resource_schema, settings_schema, GENERAL_SETTINGS};
use crate::orchestrator::schema::ResourceSchema;
use crate::orchestrator::SubmitOutcome;
use crate::reader::{Audience, Entity, ResourceKind};
use crate::AppState;

/// GET /api/admin/:resource
///
/// Every document of the resource, including inactive sponsors.
pub async fn list_resource(
    State(state): State<AppState>,
    Path(resource): Path<String>,
) -> ApiResult<Json<Vec<Entity>>> {
    let kind = ResourceKind::from_name(&resource)
        .ok_or_else(|| ApiError::NotFound(format!("unknown resource '{}'", resource)))?;
    Ok(Json(state.reader.list(kind, Audience::Admin).await?))
}

/// POST /api/admin/:resource
pub async fn submit_resource(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    identity: AdminIdentity,
    multipart: Multipart,
) -> ApiResult<Json<SubmitResponse>> {
    let schema = resource_schema(&resource)
        .ok_or_else(|| ApiError::NotFound(format!("unknown resource '{}'", resource)))?;
    submit(&state, &schema, &identity, multipart).await
}

/// GET /api/admin/settings/:name
pub async fn get_settings(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<Value>> {
    let value = if name == GENERAL_SETTINGS {
        serde_json::to_value(state.reader.site_settings().await?)
    } else {
        let content = state
            .reader
            .site_content(&name)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("no content for page '{}'", name)))?;
        serde_json::to_value(content)
    };
    value
        .map(Json)
        .map_err(|e| ApiError::Internal(format!("failed to encode settings: {}", e)))
}

/// POST /api/admin/settings/:name
pub async fn submit_settings(
    State(state): State<AppState>,
    Path(name): Path<String>,
    identity: AdminIdentity,
    multipart: Multipart,
) -> ApiResult<Json<SubmitResponse>> {
    let schema = settings_schema(&name)
        .ok_or_else(|| ApiError::NotFound(format!("unknown settings '{}'", name)))?;
    submit(&state, &schema, &identity, multipart).await
}

async fn submit(
    state: &AppState,
    schema: &ResourceSchema,
    identity: &AdminIdentity,
    multipart: Multipart,
) -> ApiResult<Json<SubmitResponse>> {
    let form = FormData::from_multipart(multipart).await?;

    info!(resource = %schema.name, subject = %identity.subject, "Admin submission received");

    let SubmitOutcome { id, urls } = state.orchestrator.submit(schema, &form).await?;

    let mut response = SubmitResponse::new(schema.message, id);
    // A single `url` would be ambiguous for multi-file submissions
    if urls.len() == 1 {
        response.url = urls.values().next().cloned();
    }
    response.urls = urls;
    Ok(Json(response))
}

/// Build admin routes
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/admin/settings/:name",
            get(get_settings).post(submit_settings),
        )
        .route(
            "/api/admin/:resource",
            get(list_resource).post(submit_resource),
        )
}
