//! Axum adapters that open a [`Scope`] per request.
//!
//! Each adapter reads the request cookies, opens the scope, exposes it to
//! handlers through request extensions and, after the handler returns,
//! writes every queued cookie change onto the response (error responses
//! and handler panics included).

use std::sync::Arc;

use axum::Router;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::middleware::{Next, from_fn_with_state};
use axum::response::Response;
use tower_http::catch_panic::CatchPanicLayer;

use super::{ErrorSurface, Scope, SessionScheme};
use crate::AppState;
use crate::auth::cookies::{CookieWriter, RequestCookies};
use crate::error::{AppError, handle_panic};

type AppRouter = Router<Arc<AppState>>;

/// Put `router`'s routes behind the JSON API adapter.
///
/// Handler panics are rendered below the adapter so pending cookies still
/// reach the response.
pub fn api_scoped(router: AppRouter, state: &Arc<AppState>) -> AppRouter {
    router
        .route_layer(CatchPanicLayer::custom(handle_panic))
        .route_layer(from_fn_with_state(state.clone(), require_api_scope))
}

/// Put `router`'s routes behind the page adapter.
pub fn page_scoped(router: AppRouter, state: &Arc<AppState>) -> AppRouter {
    router
        .route_layer(CatchPanicLayer::custom(handle_panic))
        .route_layer(from_fn_with_state(state.clone(), require_page_scope))
}

/// Put `router`'s routes behind the `session` cookie adapter for `scheme`.
pub fn session_scoped(
    router: AppRouter,
    state: &Arc<AppState>,
    scheme: SessionScheme,
) -> AppRouter {
    let router = router.route_layer(CatchPanicLayer::custom(handle_panic));
    match scheme {
        SessionScheme::Session => {
            router.route_layer(from_fn_with_state(state.clone(), attach_session_scope))
        }
        SessionScheme::Basic => {
            router.route_layer(from_fn_with_state(state.clone(), attach_basic_scope))
        }
    }
}

/// Shared handle to the request's scope, inserted into request extensions.
#[derive(Debug, Clone)]
pub struct ScopeHandle(pub Arc<Scope>);

impl std::ops::Deref for ScopeHandle {
    type Target = Scope;

    fn deref(&self) -> &Scope {
        &self.0
    }
}

impl<S> FromRequestParts<S> for ScopeHandle
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<ScopeHandle>()
            .cloned()
            .ok_or(AppError::Unknown("scope middleware not configured".into()))
    }
}

/// JSON API adapter: authentication failures render as the uniform error body.
pub async fn require_api_scope(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    authenticated(&state, ErrorSurface::Json, req, next).await
}

/// Page adapter: authentication failures redirect to the login page with
/// the original path and query as `next`.
pub async fn require_page_scope(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let surface = ErrorSurface::Page {
        login: login_redirect(&state.config.login_path, &req),
    };
    authenticated(&state, surface, req, next).await
}

/// Routes usable without sign-in; a `session` cookie is sent with the `Session` scheme.
pub async fn attach_session_scope(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    unauthenticated(&state, SessionScheme::Session, req, next).await
}

/// As [`attach_session_scope`], presenting the `session` cookie with the `Basic` scheme.
pub async fn attach_basic_scope(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    unauthenticated(&state, SessionScheme::Basic, req, next).await
}

async fn authenticated(
    state: &AppState,
    surface: ErrorSurface,
    mut req: Request,
    next: Next,
) -> Response {
    let cookies = RequestCookies::from_headers(req.headers());
    let writer = CookieWriter::default();

    let mut response = match super::open(state, &cookies, writer.clone(), surface.clone()).await {
        Ok(scope) => {
            req.extensions_mut().insert(ScopeHandle(Arc::new(scope)));
            next.run(req).await
        }
        Err(e) => surface.render(e.into()),
    };

    writer.apply(&mut response).await;
    response
}

async fn unauthenticated(
    state: &AppState,
    scheme: SessionScheme,
    mut req: Request,
    next: Next,
) -> Response {
    let cookies = RequestCookies::from_headers(req.headers());
    let writer = CookieWriter::default();

    let scope = super::open_with_session(state, &cookies, writer.clone(), scheme);
    req.extensions_mut().insert(ScopeHandle(Arc::new(scope)));
    let mut response = next.run(req).await;

    writer.apply(&mut response).await;
    response
}

/// `{login_path}?next=<encoded path and query>`
fn login_redirect(login_path: &str, req: &Request) -> String {
    let target = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    format!("{login_path}?next={}", urlencoding::encode(target))
}
