//! Credential decorator over [`ApiClient`].
//!
//! Injects the `Authorization` header on every call. A `401` from upstream
//! clears the cookie the credential came from; the response is still handed
//! back unchanged.

use axum::http::{HeaderValue, Method, StatusCode, header};

use super::{ApiClient, FetchError, RequestInit, Upstream};
use crate::auth::cookies::{ACCESS_TOKEN, CookieWriter, SESSION};

/// Credential attached to upstream calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// End-user access token.
    Bearer(String),
    /// Opaque session token, e.g. from an email verification link.
    Session(String),
    /// Session token presented with the `Basic` scheme.
    Basic(String),
}

impl Credential {
    pub fn scheme(&self) -> &'static str {
        match self {
            Credential::Bearer(_) => "Bearer",
            Credential::Session(_) => "Session",
            Credential::Basic(_) => "Basic",
        }
    }

    pub fn authorization(&self) -> String {
        let token = match self {
            Credential::Bearer(t) | Credential::Session(t) | Credential::Basic(t) => t,
        };
        format!("{} {}", self.scheme(), token)
    }

    /// Cookie the credential was read from.
    pub fn cookie_name(&self) -> &'static str {
        match self {
            Credential::Bearer(_) => ACCESS_TOKEN,
            Credential::Session(_) | Credential::Basic(_) => SESSION,
        }
    }
}

/// An [`ApiClient`] bound to one request's credential and cookie writer.
#[derive(Debug, Clone)]
pub struct AuthedClient {
    inner: ApiClient,
    credential: Option<Credential>,
    cookies: CookieWriter,
}

impl AuthedClient {
    pub fn new(inner: ApiClient, credential: Option<Credential>, cookies: CookieWriter) -> Self {
        Self {
            inner,
            credential,
            cookies,
        }
    }
}

impl Upstream for AuthedClient {
    async fn fetch(
        &self,
        method: Method,
        path: &str,
        mut init: RequestInit,
    ) -> Result<reqwest::Response, FetchError> {
        if let Some(credential) = &self.credential {
            let value = HeaderValue::from_str(&credential.authorization())
                .map_err(|_| FetchError::InvalidCredential)?;
            init.headers.insert(header::AUTHORIZATION, value);
        }

        let response = self.inner.fetch(method, path, init).await?;

        if response.status() == StatusCode::UNAUTHORIZED
            && let Some(credential) = &self.credential
        {
            tracing::info!(
                scheme = credential.scheme(),
                cookie = credential.cookie_name(),
                "upstream rejected credential, clearing cookie"
            );
            self.cookies.clear(credential.cookie_name()).await;
        }

        Ok(response)
    }
}
