//! Credential cookies: reading them off the request and queueing changes
//! for the response.

use std::sync::Arc;

use axum::http::{HeaderMap, HeaderValue, header};
use axum::response::Response;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tokio::sync::Mutex;

pub const ACCESS_TOKEN: &str = "access_token";
pub const REFRESH_TOKEN: &str = "refresh_token";
pub const SESSION: &str = "session";

/// Cookies sent with the inbound request.
#[derive(Debug, Clone, Default)]
pub struct RequestCookies(CookieJar);

impl RequestCookies {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self(CookieJar::from_headers(headers))
    }

    /// Cookie value; empty values count as absent.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(Cookie::value).filter(|v| !v.is_empty())
    }
}

/// Set-Cookie changes collected while handling one request.
///
/// Cloned into everything that may touch cookies (refresh, the credential
/// decorator); the adapter writes them onto the final response.
#[derive(Debug, Clone, Default)]
pub struct CookieWriter(Arc<Mutex<Vec<Cookie<'static>>>>);

impl CookieWriter {
    pub async fn set(&self, cookie: Cookie<'static>) {
        self.0.lock().await.push(cookie);
    }

    pub async fn clear(&self, name: &'static str) {
        self.set(removal_cookie(name)).await;
    }

    /// Snapshot of queued changes.
    pub async fn pending(&self) -> Vec<Cookie<'static>> {
        self.0.lock().await.clone()
    }

    /// Drain queued changes onto `response` as `Set-Cookie` headers.
    pub async fn apply(&self, response: &mut Response) {
        let cookies = std::mem::take(&mut *self.0.lock().await);
        for cookie in cookies {
            match HeaderValue::from_str(&cookie.to_string()) {
                Ok(value) => {
                    response.headers_mut().append(header::SET_COOKIE, value);
                }
                Err(e) => tracing::error!(cookie = cookie.name(), error = %e, "unencodable cookie"),
            }
        }
    }
}

/// Credential cookie: `HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age=<secs>`.
pub fn credential_cookie(
    name: &'static str,
    value: impl Into<String>,
    max_age_secs: i64,
) -> Cookie<'static> {
    Cookie::build((name, value.into()))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(max_age_secs))
        .build()
}

/// Cookie that clears `name`, carrying the same attributes it was set with.
pub fn removal_cookie(name: &'static str) -> Cookie<'static> {
    let mut cookie = Cookie::build((name, ""))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .build();
    cookie.make_removal();
    cookie
}
