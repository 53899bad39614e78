//! Token authentication with transparent refresh.
//!
//! The access token cookie is used as-is when present; verification happens
//! afterwards. Otherwise a single `POST tokens/refresh` exchange is attempted.

use serde_json::json;

use super::AuthError;
use super::cookies::{ACCESS_TOKEN, CookieWriter, REFRESH_TOKEN, RequestCookies, credential_cookie};
use crate::audit;
use crate::types::RefreshResponse;
use crate::upstream::{ApiClient, RequestInit, Upstream};

/// Produce an access token from the request cookies.
///
/// Writes the new `access_token` cookie (and a rotated `refresh_token`, if
/// upstream returned one) when a refresh happened.
pub async fn authenticate(
    cookies: &RequestCookies,
    api: &ApiClient,
    writer: &CookieWriter,
) -> Result<String, AuthError> {
    if let Some(access_token) = cookies.get(ACCESS_TOKEN) {
        return Ok(access_token.to_string());
    }

    let refresh_token = cookies.get(REFRESH_TOKEN).ok_or(AuthError::Unauthenticated)?;

    let response = api
        .post(
            "tokens/refresh",
            RequestInit::new().body(json!({ "refreshToken": refresh_token })),
        )
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "token refresh could not reach upstream");
            audit::refresh_failed(&e.to_string());
            AuthError::Unauthenticated
        })?;

    if !response.status().is_success() {
        let status = response.status();
        audit::refresh_failed(&format!("upstream responded {status}"));
        return Err(AuthError::Unauthenticated);
    }

    let refreshed: RefreshResponse = response.json().await.map_err(|e| {
        audit::refresh_failed(&format!("unreadable refresh payload: {e}"));
        AuthError::Unauthenticated
    })?;

    writer
        .set(credential_cookie(
            ACCESS_TOKEN,
            refreshed.access_token.clone(),
            refreshed.access_token_max_age,
        ))
        .await;

    if let (Some(rotated), Some(max_age)) =
        (refreshed.refresh_token, refreshed.refresh_token_max_age)
    {
        writer.set(credential_cookie(REFRESH_TOKEN, rotated, max_age)).await;
    }

    audit::refresh_succeeded();
    Ok(refreshed.access_token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, HeaderValue, header};
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn cookies(value: &str) -> RequestCookies {
        let mut headers = HeaderMap::new();
        if !value.is_empty() {
            headers.insert(header::COOKIE, HeaderValue::from_str(value).unwrap());
        }
        RequestCookies::from_headers(&headers)
    }

    fn api(server: &MockServer) -> ApiClient {
        ApiClient::new(reqwest::Client::new(), &server.uri(), None)
    }

    async fn refresh_mock(server: &MockServer, template: ResponseTemplate, calls: u64) {
        Mock::given(method("POST"))
            .and(path("/tokens/refresh"))
            .respond_with(template)
            .expect(calls)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_no_cookies_is_unauthenticated_without_upstream_call() {
        let server = MockServer::start().await;
        refresh_mock(&server, ResponseTemplate::new(200), 0).await;

        let writer = CookieWriter::default();
        let result = authenticate(&cookies(""), &api(&server), &writer).await;
        assert!(matches!(result, Err(AuthError::Unauthenticated)));
        assert!(writer.pending().await.is_empty());
    }

    #[tokio::test]
    async fn test_access_token_used_directly() {
        let server = MockServer::start().await;
        refresh_mock(&server, ResponseTemplate::new(200), 0).await;

        let writer = CookieWriter::default();
        let token = authenticate(
            &cookies("access_token=at-1; refresh_token=rt-1"),
            &api(&server),
            &writer,
        )
        .await
        .unwrap();
        assert_eq!(token, "at-1");
        assert!(writer.pending().await.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_sets_access_cookie_with_upstream_max_age() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tokens/refresh"))
            .and(body_json(json!({"refreshToken": "rt-1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "accessToken": "abc",
                "accessTokenMaxAge": 900
            })))
            .expect(1)
            .mount(&server)
            .await;

        let writer = CookieWriter::default();
        let token = authenticate(&cookies("refresh_token=rt-1"), &api(&server), &writer)
            .await
            .unwrap();
        assert_eq!(token, "abc");

        let pending = writer.pending().await;
        assert_eq!(pending.len(), 1);
        let cookie = pending[0].to_string();
        assert!(cookie.starts_with("access_token=abc"));
        assert!(cookie.contains("Max-Age=900"));
    }

    #[tokio::test]
    async fn test_rotated_refresh_token_written() {
        let server = MockServer::start().await;
        refresh_mock(
            &server,
            ResponseTemplate::new(200).set_body_json(json!({
                "accessToken": "abc",
                "accessTokenMaxAge": 900,
                "refreshToken": "rt-2",
                "refreshTokenMaxAge": 2592000
            })),
            1,
        )
        .await;

        let writer = CookieWriter::default();
        authenticate(&cookies("refresh_token=rt-1"), &api(&server), &writer)
            .await
            .unwrap();

        let pending = writer.pending().await;
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[1].name(), REFRESH_TOKEN);
        assert_eq!(pending[1].value(), "rt-2");
    }

    #[tokio::test]
    async fn test_refresh_rejected_sets_no_cookie() {
        let server = MockServer::start().await;
        refresh_mock(&server, ResponseTemplate::new(401), 1).await;

        let writer = CookieWriter::default();
        let result = authenticate(&cookies("refresh_token=revoked"), &api(&server), &writer).await;
        assert!(matches!(result, Err(AuthError::Unauthenticated)));
        assert!(writer.pending().await.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_garbage_payload_is_unauthenticated() {
        let server = MockServer::start().await;
        refresh_mock(&server, ResponseTemplate::new(200).set_body_string("ok"), 1).await;

        let writer = CookieWriter::default();
        let result = authenticate(&cookies("refresh_token=rt-1"), &api(&server), &writer).await;
        assert!(matches!(result, Err(AuthError::Unauthenticated)));
        assert!(writer.pending().await.is_empty());
    }
}
