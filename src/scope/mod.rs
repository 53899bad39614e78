//! Per-request scoped runtime.
//!
//! A [`Scope`] is assembled once per inbound request from plain request
//! primitives (cookies in, pending Set-Cookies out) and holds everything a
//! handler needs: the verified principal, an upstream client carrying the
//! request's credential, and the error surface of the router it serves.
//! Router adapters live in [`middleware`].

pub mod middleware;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::response::{IntoResponse, Redirect, Response};

use crate::AppState;
use crate::audit;
use crate::auth::cookies::{CookieWriter, RequestCookies, SESSION};
use crate::auth::{AuthError, Principal, refresh};
use crate::error::AppError;
use crate::upstream::{AuthedClient, Credential};

/// How a scope renders failures for its router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorSurface {
    /// JSON API: uniform error body.
    Json,
    /// Page loaders: auth failures redirect to `login`, the rest is the uniform error body.
    Page { login: String },
}

impl ErrorSurface {
    pub fn render(&self, err: AppError) -> Response {
        match self {
            ErrorSurface::Page { login } if err.is_auth_failure() => {
                tracing::debug!(error = %err, %login, "redirecting to login");
                Redirect::temporary(login).into_response()
            }
            _ => err.into_response(),
        }
    }
}

/// Open/closed counters for scopes.
#[derive(Debug, Clone, Default)]
pub struct ScopeStats {
    opened: Arc<AtomicU64>,
    closed: Arc<AtomicU64>,
}

impl ScopeStats {
    fn lease(&self) -> ScopeLease {
        self.opened.fetch_add(1, Ordering::SeqCst);
        ScopeLease {
            closed: self.closed.clone(),
        }
    }

    pub fn opened(&self) -> u64 {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> u64 {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn active(&self) -> u64 {
        self.opened().saturating_sub(self.closed())
    }
}

/// Counts its scope closed when dropped.
#[derive(Debug)]
struct ScopeLease {
    closed: Arc<AtomicU64>,
}

impl Drop for ScopeLease {
    fn drop(&mut self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug)]
pub struct Scope {
    principal: Option<Principal>,
    api: AuthedClient,
    surface: ErrorSurface,
    _lease: ScopeLease,
}

impl Scope {
    fn new(
        principal: Option<Principal>,
        api: AuthedClient,
        surface: ErrorSurface,
        stats: &ScopeStats,
    ) -> Self {
        Self {
            principal,
            api,
            surface,
            _lease: stats.lease(),
        }
    }

    pub fn api(&self) -> &AuthedClient {
        &self.api
    }

    /// Subject of the verified access token.
    pub fn subject(&self) -> Result<&str, AppError> {
        self.principal
            .as_ref()
            .map(|p| p.sub.as_str())
            .ok_or(AppError::Unauthenticated)
    }

    /// Render `err` the way this scope's router reports failures.
    pub fn fail(&self, err: AppError) -> Response {
        self.surface.render(err)
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        tracing::trace!(sub = ?self.principal.as_ref().map(|p| &p.sub), "scope released");
    }
}

/// Open an authenticated scope: refresh if needed, verify, then bind the
/// access token to the upstream client.
pub async fn open(
    state: &AppState,
    cookies: &RequestCookies,
    writer: CookieWriter,
    surface: ErrorSurface,
) -> Result<Scope, AuthError> {
    let token = refresh::authenticate(cookies, &state.api, &writer).await?;

    let principal = state.verifier.verify(&token).await.inspect_err(|e| {
        audit::token_rejected(&e.to_string());
    })?;

    let api = AuthedClient::new(
        state.api.clone(),
        Some(Credential::Bearer(token)),
        writer,
    );
    Ok(Scope::new(Some(principal), api, surface, &state.scopes))
}

/// Open a scope for routes that do not require sign-in.
///
/// A `session` cookie is presented with `scheme`; without one the client is anonymous.
pub fn open_with_session(
    state: &AppState,
    cookies: &RequestCookies,
    writer: CookieWriter,
    scheme: SessionScheme,
) -> Scope {
    let credential = cookies.get(SESSION).map(|value| match scheme {
        SessionScheme::Session => Credential::Session(value.to_string()),
        SessionScheme::Basic => Credential::Basic(value.to_string()),
    });
    let api = AuthedClient::new(state.api.clone(), credential, writer);
    Scope::new(None, api, ErrorSurface::Json, &state.scopes)
}

/// Authorization scheme used to present the `session` cookie upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionScheme {
    Session,
    Basic,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::verify::test_keys::{OTHER, PRIMARY, sign};
    use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
    use serde_json::json;

    #[test]
    fn test_lease_counts_close_once() {
        let stats = ScopeStats::default();
        let lease = stats.lease();
        assert_eq!(stats.active(), 1);
        drop(lease);
        assert_eq!(stats.opened(), 1);
        assert_eq!(stats.closed(), 1);
        assert_eq!(stats.active(), 0);
    }

    #[test]
    fn test_page_surface_redirects_auth_failures() {
        let surface = ErrorSurface::Page {
            login: "/login?next=%2Fworkspaces%2Facme".into(),
        };
        let response = surface.render(AppError::UpstreamStatus(StatusCode::UNAUTHORIZED));
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(
            response.headers()["location"],
            "/login?next=%2Fworkspaces%2Facme"
        );

        let response = surface.render(AppError::UpstreamStatus(StatusCode::NOT_FOUND));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_json_surface_never_redirects() {
        let response = ErrorSurface::Json.render(AppError::Unauthenticated);
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    fn state() -> AppState {
        let config = crate::config::Config {
            jwt_public_key: PRIMARY.public_pem.clone(),
            ..crate::config::Config::test_default()
        };
        AppState::from_config(config).unwrap()
    }

    fn cookies(value: &str) -> RequestCookies {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(value).unwrap());
        RequestCookies::from_headers(&headers)
    }

    #[tokio::test]
    async fn test_open_binds_verified_subject() {
        let state = state();
        let token = sign(&PRIMARY, &json!({"sub": "user-1"}));
        let scope = open(
            &state,
            &cookies(&format!("access_token={token}")),
            CookieWriter::default(),
            ErrorSurface::Json,
        )
        .await
        .unwrap();

        assert_eq!(scope.subject().unwrap(), "user-1");
        assert_eq!(state.scopes.active(), 1);
        drop(scope);
        assert_eq!(state.scopes.active(), 0);
    }

    #[tokio::test]
    async fn test_open_rejects_foreign_signature_without_lease() {
        let state = state();
        let token = sign(&OTHER, &json!({"sub": "user-1"}));
        let result = open(
            &state,
            &cookies(&format!("access_token={token}")),
            CookieWriter::default(),
            ErrorSurface::Json,
        )
        .await;

        assert!(matches!(result, Err(AuthError::Unauthorized(_))));
        assert_eq!(state.scopes.opened(), 0);
    }

    #[test]
    fn test_session_scope_has_no_subject() {
        let state = state();
        let scope = open_with_session(
            &state,
            &cookies("session=s-1"),
            CookieWriter::default(),
            SessionScheme::Basic,
        );
        assert!(matches!(scope.subject(), Err(AppError::Unauthenticated)));
    }
}
