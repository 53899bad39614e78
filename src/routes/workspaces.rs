//! /api/workspaces/{path}
//!
//! Workspaces are addressed by their URL path and teams by their short
//! identifier; both resolve to upstream ids through the id caches so only
//! the first request pays for the lookup.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde_json::Value;

use crate::AppState;
use crate::cache::CacheService;
use crate::error::AppError;
use crate::scope::middleware::ScopeHandle;
use crate::types::{Identified, IssueFilter};
use crate::upstream::{AuthedClient, Query, RequestInit, Upstream, normalize};
use crate::validation::{ValidPath, ValidQuery};

/// GET /api/workspaces/{path}
pub async fn get_workspace(
    State(state): State<Arc<AppState>>,
    scope: ScopeHandle,
    ValidPath(path): ValidPath<String>,
) -> Result<Json<Value>, AppError> {
    let workspace = load_workspace(scope.api(), &state.caches, &path).await?;
    Ok(Json(workspace))
}

/// GET /api/workspaces/{path}/teams/{identifier}
pub async fn get_team(
    State(state): State<Arc<AppState>>,
    scope: ScopeHandle,
    ValidPath((path, identifier)): ValidPath<(String, String)>,
) -> Result<Json<Value>, AppError> {
    let workspace_id = resolve_workspace_id(scope.api(), &state.caches, &path).await?;
    let team = load_team(scope.api(), &state.caches, &workspace_id, &identifier).await?;
    Ok(Json(team))
}

/// GET /api/workspaces/{path}/issues?team&status&page
pub async fn list_issues(
    State(state): State<Arc<AppState>>,
    scope: ScopeHandle,
    ValidPath(path): ValidPath<String>,
    ValidQuery(filter): ValidQuery<IssueFilter>,
) -> Result<Json<Value>, AppError> {
    let workspace_id = resolve_workspace_id(scope.api(), &state.caches, &path).await?;
    let query = Query::new()
        .param("team", filter.team)
        .param("status", filter.status)
        .param("page", filter.page);

    let issues = normalize::json(
        scope
            .api()
            .get(
                &format!("workspaces/{workspace_id}/issues"),
                RequestInit::new().query(query),
            )
            .await,
    )
    .await?;
    Ok(Json(issues))
}

/// Fetch a workspace by path, going by id once the path has been resolved before.
pub async fn load_workspace(
    api: &AuthedClient,
    caches: &CacheService,
    path: &str,
) -> Result<Value, AppError> {
    if let Some(id) = caches.workspace_id(path).await {
        return normalize::json(api.get(&format!("workspaces/{id}"), RequestInit::new()).await)
            .await;
    }

    let workspace: Value = normalize::json(
        api.get(
            "workspaces",
            RequestInit::new().query(Query::new().param("path", path)),
        )
        .await,
    )
    .await?;

    let Identified { id } = serde_json::from_value(workspace.clone())?;
    caches.remember_workspace_id(path, &id).await;
    Ok(workspace)
}

/// Workspace id for `path`, from cache or via a lookup.
pub async fn resolve_workspace_id(
    api: &AuthedClient,
    caches: &CacheService,
    path: &str,
) -> Result<String, AppError> {
    if let Some(id) = caches.workspace_id(path).await {
        return Ok(id);
    }
    let workspace = load_workspace(api, caches, path).await?;
    let Identified { id } = serde_json::from_value(workspace)?;
    Ok(id)
}

async fn load_team(
    api: &AuthedClient,
    caches: &CacheService,
    workspace_id: &str,
    identifier: &str,
) -> Result<Value, AppError> {
    if let Some(id) = caches.team_id(workspace_id, identifier).await {
        return normalize::json(api.get(&format!("teams/{id}"), RequestInit::new()).await).await;
    }

    let team: Value = normalize::json(
        api.get(
            &format!("workspaces/{workspace_id}/teams"),
            RequestInit::new().query(Query::new().param("identifier", identifier)),
        )
        .await,
    )
    .await?;

    let Identified { id } = serde_json::from_value(team.clone())?;
    caches.remember_team_id(workspace_id, identifier, &id).await;
    Ok(team)
}
