//! Tracker BFF: back-for-frontend mediating between the browser and the
//! tracker API.
//!
//! Credentials live in HttpOnly cookies. Every authenticated request opens a
//! scope (refresh if needed, verify the access token, bind it to the upstream
//! client) and every route reports failures through one uniform error body.

pub mod audit;
pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod routes;
pub mod scope;
pub mod types;
pub mod upstream;
pub mod validation;

use axum::Router;
use axum::http::{HeaderValue, Method, header};
use axum::routing::{get, post};
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::{TokenVerifier, VerifyError};
use crate::cache::CacheService;
use crate::config::Config;
use crate::scope::middleware::{api_scoped, page_scoped, session_scoped};
use crate::scope::{ScopeStats, SessionScheme};
use crate::upstream::ApiClient;

/// Shared application state available to all route handlers.
#[derive(Debug)]
pub struct AppState {
    pub config: Config,
    pub api: ApiClient,
    pub verifier: TokenVerifier,
    pub caches: CacheService,
    pub scopes: ScopeStats,
}

impl AppState {
    pub fn from_config(config: Config) -> Result<Self, VerifyError> {
        let verifier = TokenVerifier::from_pem(&config.jwt_public_key)?;
        let api = ApiClient::new(
            reqwest::Client::new(),
            &config.api_base_url,
            config.api_version.as_deref(),
        );
        let caches = CacheService::from_config(&config);
        Ok(Self {
            config,
            api,
            verifier,
            caches,
            scopes: ScopeStats::default(),
        })
    }
}

/// Build the Axum router with all middleware and routes.
pub fn create_app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(frontend_origin(&state.config.frontend_url))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true);

    // Sign-in required
    let api_routes = Router::new()
        .route("/me", get(routes::me::me))
        .route(
            "/issues/{id}",
            get(routes::issues::get_issue)
                .patch(routes::issues::patch_issue)
                .delete(routes::issues::delete_issue),
        )
        .route("/workspaces/{path}", get(routes::workspaces::get_workspace))
        .route(
            "/workspaces/{path}/teams/{identifier}",
            get(routes::workspaces::get_team),
        )
        .route(
            "/workspaces/{path}/issues",
            get(routes::workspaces::list_issues),
        )
        .route(
            "/resources/{id}/permissions",
            get(routes::permissions::get_permissions),
        );
    let api_routes = api_scoped(api_routes, &state);

    // Account routes acting on the `session` cookie
    let verification_routes = session_scoped(
        Router::new().route(
            "/auth/verification",
            post(routes::auth::request_verification),
        ),
        &state,
        SessionScheme::Session,
    );
    let password_routes = session_scoped(
        Router::new().route("/auth/password", post(routes::auth::reset_password)),
        &state,
        SessionScheme::Basic,
    );

    let public_auth_routes = Router::new()
        .route("/auth/sign-in", post(routes::auth::sign_in))
        .route("/auth/sign-up", post(routes::auth::sign_up))
        .route("/auth/sign-out", post(routes::auth::sign_out));

    let page_routes = Router::new()
        .route("/workspaces/{path}", get(routes::pages::workspace_page))
        .route(
            "/workspaces/{path}/issues/{id}",
            get(routes::pages::issue_page),
        );
    let page_routes = page_scoped(page_routes, &state);

    let api = Router::new()
        .merge(api_routes)
        .merge(verification_routes)
        .merge(password_routes)
        .merge(public_auth_routes);

    Router::new()
        .route("/health", get(routes::health::health))
        .nest("/api", api)
        .merge(page_routes)
        .layer(CatchPanicLayer::custom(error::handle_panic))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn frontend_origin(frontend_url: &str) -> AllowOrigin {
    match frontend_url.parse::<HeaderValue>() {
        Ok(origin) => AllowOrigin::exact(origin),
        Err(e) => {
            tracing::warn!(%frontend_url, error = %e, "invalid FRONTEND_URL, CORS disabled");
            AllowOrigin::list(Vec::<HeaderValue>::new())
        }
    }
}
