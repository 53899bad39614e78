//! Credential endpoints under /api/auth.
//!
//! Sign-in and sign-up exchange user input for a Credential Pair and store it
//! as the `access_token`/`refresh_token` cookies. Verification and password
//! reset act on the `session` cookie through the request scope.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum_extra::extract::cookie::CookieJar;
use serde_json::json;

use crate::AppState;
use crate::audit;
use crate::auth::cookies::{ACCESS_TOKEN, REFRESH_TOKEN, credential_cookie, removal_cookie};
use crate::error::AppError;
use crate::scope::middleware::ScopeHandle;
use crate::types::{CredentialPair, PasswordResetRequest, SignInRequest, SignUpRequest};
use crate::upstream::{RequestInit, Upstream, normalize};
use crate::validation::ValidJson;

/// POST /api/auth/sign-in
pub async fn sign_in(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    ValidJson(req): ValidJson<SignInRequest>,
) -> Result<(CookieJar, StatusCode), AppError> {
    let result = state
        .api
        .post(
            "tokens",
            RequestInit::new().body(json!({ "email": req.email, "password": req.password })),
        )
        .await;

    let pair: CredentialPair = normalize::json(result).await.inspect_err(|e| {
        audit::sign_in_failed(&req.email, &e.to_string());
    })?;

    audit::signed_in(&req.email);
    Ok((store_pair(jar, pair), StatusCode::NO_CONTENT))
}

/// POST /api/auth/sign-up
pub async fn sign_up(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    ValidJson(req): ValidJson<SignUpRequest>,
) -> Result<(CookieJar, StatusCode), AppError> {
    let body = json!({
        "email": req.email,
        "password": req.password,
        "name": req.name,
        "verificationUrl": state.config.verification_url,
    });
    let pair: CredentialPair =
        normalize::json(state.api.post("users", RequestInit::new().body(body)).await).await?;

    audit::signed_up(&req.email);
    Ok((store_pair(jar, pair), StatusCode::NO_CONTENT))
}

/// POST /api/auth/sign-out
pub async fn sign_out(jar: CookieJar) -> (CookieJar, StatusCode) {
    audit::signed_out();
    let jar = jar
        .add(removal_cookie(ACCESS_TOKEN))
        .add(removal_cookie(REFRESH_TOKEN));
    (jar, StatusCode::NO_CONTENT)
}

/// POST /api/auth/verification
///
/// Asks upstream to (re)send the verification email for the session's account.
pub async fn request_verification(
    State(state): State<Arc<AppState>>,
    scope: ScopeHandle,
) -> Result<StatusCode, AppError> {
    let body = json!({ "verificationUrl": state.config.verification_url });
    normalize::empty(
        scope
            .api()
            .post("verifications", RequestInit::new().body(body))
            .await,
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/auth/password
pub async fn reset_password(
    scope: ScopeHandle,
    ValidJson(req): ValidJson<PasswordResetRequest>,
) -> Result<StatusCode, AppError> {
    let body = json!({ "password": req.password });
    normalize::empty(
        scope
            .api()
            .put("users/password", RequestInit::new().body(body))
            .await,
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

fn store_pair(jar: CookieJar, pair: CredentialPair) -> CookieJar {
    jar.add(credential_cookie(
        ACCESS_TOKEN,
        pair.access_token,
        pair.access_token_max_age,
    ))
    .add(credential_cookie(
        REFRESH_TOKEN,
        pair.refresh_token,
        pair.refresh_token_max_age,
    ))
}
