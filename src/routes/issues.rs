//! /api/issues/{id}

use axum::Json;
use axum::http::StatusCode;
use serde_json::Value;

use crate::error::AppError;
use crate::scope::middleware::ScopeHandle;
use crate::types::IssuePatchRequest;
use crate::upstream::{RequestInit, Upstream, normalize};
use crate::validation::{ValidJson, ValidPath};

pub async fn get_issue(
    scope: ScopeHandle,
    ValidPath(id): ValidPath<String>,
) -> Result<Json<Value>, AppError> {
    let issue = normalize::json(scope.api().get(&issue_path(&id), RequestInit::new()).await).await?;
    Ok(Json(issue))
}

/// Apply a partial update. The body is checked locally before anything goes upstream.
pub async fn patch_issue(
    scope: ScopeHandle,
    ValidPath(id): ValidPath<String>,
    ValidJson(req): ValidJson<IssuePatchRequest>,
) -> Result<StatusCode, AppError> {
    let body = serde_json::to_value(&req.patch)?;
    normalize::empty(
        scope
            .api()
            .patch(&issue_path(&id), RequestInit::new().body(body))
            .await,
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_issue(
    scope: ScopeHandle,
    ValidPath(id): ValidPath<String>,
) -> Result<StatusCode, AppError> {
    normalize::empty(scope.api().delete(&issue_path(&id), RequestInit::new()).await).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn issue_path(id: &str) -> String {
    format!("issues/{id}")
}
