//! Page-data loaders.
//!
//! Served behind the page adapter: any failure of an authentication nature,
//! including an upstream 401 while loading, redirects to the login page.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};

use crate::AppState;
use crate::error::AppError;
use crate::routes::workspaces::{load_workspace, resolve_workspace_id};
use crate::scope::middleware::ScopeHandle;
use crate::upstream::{RequestInit, Upstream, normalize};
use crate::validation::ValidPath;

/// GET /workspaces/{path}
pub async fn workspace_page(
    State(state): State<Arc<AppState>>,
    scope: ScopeHandle,
    ValidPath(path): ValidPath<String>,
) -> Response {
    match load_workspace(scope.api(), &state.caches, &path).await {
        Ok(workspace) => Json(json!({ "workspace": workspace })).into_response(),
        Err(e) => scope.fail(e),
    }
}

/// GET /workspaces/{path}/issues/{id}
pub async fn issue_page(
    State(state): State<Arc<AppState>>,
    scope: ScopeHandle,
    ValidPath((path, id)): ValidPath<(String, String)>,
) -> Response {
    match load_issue_page(&state, &scope, &path, &id).await {
        Ok(data) => Json(data).into_response(),
        Err(e) => scope.fail(e),
    }
}

async fn load_issue_page(
    state: &AppState,
    scope: &ScopeHandle,
    path: &str,
    id: &str,
) -> Result<Value, AppError> {
    let workspace_id = resolve_workspace_id(scope.api(), &state.caches, path).await?;
    let issue: Value =
        normalize::json(scope.api().get(&format!("issues/{id}"), RequestInit::new()).await)
            .await?;
    Ok(json!({ "workspaceId": workspace_id, "issue": issue }))
}
