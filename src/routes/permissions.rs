//! GET /api/resources/{id}/permissions

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde_json::Value;

use crate::AppState;
use crate::error::AppError;
use crate::scope::middleware::ScopeHandle;
use crate::upstream::{RequestInit, Upstream, normalize};
use crate::validation::ValidPath;

/// The caller's permissions on a resource, cached per resource and user.
pub async fn get_permissions(
    State(state): State<Arc<AppState>>,
    scope: ScopeHandle,
    ValidPath(resource_id): ValidPath<String>,
) -> Result<Json<Value>, AppError> {
    let user_id = scope.subject()?;

    if let Some(cached) = state.caches.permissions(&resource_id, user_id).await {
        tracing::debug!(%resource_id, "permission cache hit");
        return Ok(Json(cached));
    }

    let permissions: Value = normalize::json(
        scope
            .api()
            .get(
                &format!("resources/{resource_id}/permissions"),
                RequestInit::new(),
            )
            .await,
    )
    .await?;

    state
        .caches
        .remember_permissions(&resource_id, user_id, permissions.clone())
        .await;
    Ok(Json(permissions))
}
