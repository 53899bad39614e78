//! Response normalization protocol.
//!
//! Routes never inspect upstream status codes themselves; they pass the raw
//! call result through [`json`], [`empty`] or [`checked`] and get either the
//! typed payload or an [`AppError`] that renders the uniform error body.

use axum::http::StatusCode;
use serde::de::DeserializeOwned;

use super::FetchError;
use crate::error::{AppError, ProblemDetails};

/// Fail on fetch errors and non-2xx statuses; pass the response through otherwise.
pub async fn checked(
    result: Result<reqwest::Response, FetchError>,
) -> Result<reqwest::Response, AppError> {
    let response = result?;
    if response.status().is_success() {
        return Ok(response);
    }
    Err(from_status(response).await)
}

/// Decode a successful upstream JSON payload.
pub async fn json<T: DeserializeOwned>(
    result: Result<reqwest::Response, FetchError>,
) -> Result<T, AppError> {
    let response = checked(result).await?;
    let bytes = response.bytes().await.map_err(FetchError::from)?;
    serde_json::from_slice(&bytes).map_err(|e| {
        tracing::warn!(error = %e, "upstream payload did not decode");
        AppError::Json(e)
    })
}

/// Require success and discard the body.
pub async fn empty(result: Result<reqwest::Response, FetchError>) -> Result<(), AppError> {
    checked(result).await.map(|_| ())
}

/// Map a non-2xx upstream response to its error category.
///
/// A `400` carrying Problem Details keeps its per-field errors; anything
/// else collapses to the status code.
pub async fn from_status(response: reqwest::Response) -> AppError {
    let status = response.status();
    tracing::debug!(%status, url = %response.url(), "upstream returned error status");

    if status == StatusCode::BAD_REQUEST {
        match response.json::<ProblemDetails>().await {
            Ok(problem) => return AppError::Problem(problem),
            Err(e) => tracing::debug!(error = %e, "400 without problem details"),
        }
    }

    AppError::UpstreamStatus(status)
}
