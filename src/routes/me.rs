//! GET /api/me

use axum::Json;
use serde_json::Value;

use crate::error::AppError;
use crate::scope::middleware::ScopeHandle;
use crate::upstream::{RequestInit, Upstream, normalize};
use crate::validation::segment;

/// The signed-in user's profile, looked up by the verified token subject.
pub async fn me(scope: ScopeHandle) -> Result<Json<Value>, AppError> {
    let sub = segment("sub", scope.subject()?)?;
    let user = normalize::json(
        scope
            .api()
            .get(&format!("users/{sub}"), RequestInit::new())
            .await,
    )
    .await?;
    Ok(Json(user))
}
