//! Application error types with Axum response mapping.
//!
//! Every failure a route can produce is rendered through [`AppError`] into
//! the uniform `{"errors": {<field>: [<code>, ...]}}` body. Field `root`
//! carries request-global errors.

use std::any::Any;
use std::collections::BTreeMap;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::auth::AuthError;
use crate::upstream::FetchError;

/// Field path for request-global errors.
pub const ROOT: &str = "root";

/// Field path → error codes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// A single request-global error.
    pub fn root(code: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(ROOT, code);
        errors
    }

    pub fn add(&mut self, path: impl Into<String>, code: impl Into<String>) {
        self.0.entry(path.into()).or_default().push(code.into());
    }

    pub fn get(&self, path: &str) -> Option<&[String]> {
        self.0.get(path).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Uniform error response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub errors: FieldErrors,
}

/// Upstream validation failure payload (RFC 7807 style).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemDetails {
    #[serde(rename = "type")]
    pub problem_type: String,
    pub title: String,
    pub status: u16,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub instance: Option<String>,
    #[serde(default)]
    pub trace_id: Option<String>,
    #[serde(default)]
    pub errors: Vec<ProblemError>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProblemError {
    pub name: String,
    pub reason: String,
    #[serde(default)]
    pub code: Option<String>,
}

impl ProblemDetails {
    /// Group `errors[]` by name; each entry contributes `code`, or `reason` when absent.
    pub fn field_errors(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        for entry in &self.errors {
            let code = entry.code.as_deref().unwrap_or(&entry.reason);
            errors.add(entry.name.as_str(), code);
        }
        errors
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Not authorized")]
    Unauthorized,

    #[error("Validation failed")]
    Validation(FieldErrors),

    #[error("Upstream request failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Upstream responded with {0}")]
    UpstreamStatus(StatusCode),

    #[error("Upstream rejected the request: {}", .0.title)]
    Problem(ProblemDetails),

    #[error("JSON decode failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Unknown(String),
}

impl AppError {
    /// Whether the error means the caller has no usable credential.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            AppError::Unauthenticated
                | AppError::Unauthorized
                | AppError::UpstreamStatus(StatusCode::UNAUTHORIZED)
        )
    }

    /// The status and body this error renders as.
    pub fn parts(&self) -> (StatusCode, FieldErrors) {
        match self {
            AppError::Unauthenticated => {
                (StatusCode::UNAUTHORIZED, FieldErrors::root("unauthenticated"))
            }
            AppError::Unauthorized => (StatusCode::FORBIDDEN, FieldErrors::root("unauthorized")),
            AppError::Validation(errors) => (StatusCode::BAD_REQUEST, errors.clone()),
            AppError::Fetch(e) => (StatusCode::INTERNAL_SERVER_ERROR, FieldErrors::root(e.code())),
            AppError::UpstreamStatus(status) => {
                (*status, FieldErrors::root(status.as_u16().to_string()))
            }
            AppError::Problem(problem) => {
                let errors = problem.field_errors();
                if errors.is_empty() {
                    (StatusCode::BAD_REQUEST, FieldErrors::root("400"))
                } else {
                    (StatusCode::BAD_REQUEST, errors)
                }
            }
            AppError::Json(e) if e.is_data() => {
                (StatusCode::INTERNAL_SERVER_ERROR, FieldErrors::root("json"))
            }
            AppError::Json(_) => (StatusCode::BAD_REQUEST, FieldErrors::root("json")),
            AppError::Unknown(_) => (StatusCode::INTERNAL_SERVER_ERROR, FieldErrors::root("unknown")),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Unauthenticated => AppError::Unauthenticated,
            AuthError::Unauthorized(_) => AppError::Unauthorized,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Fetch(_) | AppError::Unknown(_) => tracing::error!(error = %self, "request failed"),
            AppError::Json(_) => tracing::warn!(error = %self, "request failed"),
            _ => tracing::debug!(error = %self, "request failed"),
        }

        let (status, errors) = self.parts();
        (status, Json(ErrorBody { errors })).into_response()
    }
}

/// Render a handler panic as the `unknown` category instead of dropping the connection.
pub fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "handler panicked".to_string()
    };
    AppError::Unknown(detail).into_response()
}
