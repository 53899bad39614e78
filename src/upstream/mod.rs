//! Upstream API access: the base client, the credential decorator and the
//! response normalization protocol every route goes through.

pub mod bearer;
pub mod client;
pub mod normalize;

use std::future::Future;

use axum::http::Method;

pub use bearer::{AuthedClient, Credential};
pub use client::{ApiClient, Query, RequestInit};

/// Anything that can issue a request against the upstream API.
///
/// Implemented by [`ApiClient`] and by the [`AuthedClient`] decorator that wraps it.
pub trait Upstream: Send + Sync {
    fn fetch(
        &self,
        method: Method,
        path: &str,
        init: RequestInit,
    ) -> impl Future<Output = Result<reqwest::Response, FetchError>> + Send;

    fn get(
        &self,
        path: &str,
        init: RequestInit,
    ) -> impl Future<Output = Result<reqwest::Response, FetchError>> + Send {
        self.fetch(Method::GET, path, init)
    }

    fn post(
        &self,
        path: &str,
        init: RequestInit,
    ) -> impl Future<Output = Result<reqwest::Response, FetchError>> + Send {
        self.fetch(Method::POST, path, init)
    }

    fn put(
        &self,
        path: &str,
        init: RequestInit,
    ) -> impl Future<Output = Result<reqwest::Response, FetchError>> + Send {
        self.fetch(Method::PUT, path, init)
    }

    fn patch(
        &self,
        path: &str,
        init: RequestInit,
    ) -> impl Future<Output = Result<reqwest::Response, FetchError>> + Send {
        self.fetch(Method::PATCH, path, init)
    }

    fn delete(
        &self,
        path: &str,
        init: RequestInit,
    ) -> impl Future<Output = Result<reqwest::Response, FetchError>> + Send {
        self.fetch(Method::DELETE, path, init)
    }

    fn head(
        &self,
        path: &str,
        init: RequestInit,
    ) -> impl Future<Output = Result<reqwest::Response, FetchError>> + Send {
        self.fetch(Method::HEAD, path, init)
    }
}

/// The upstream call itself could not complete.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("upstream request timed out")]
    Timeout,

    #[error("could not connect to upstream: {0}")]
    Connect(String),

    #[error("invalid upstream url: {0}")]
    InvalidUrl(String),

    #[error("credential is not a valid header value")]
    InvalidCredential,

    #[error("upstream request failed: {0}")]
    Request(String),
}

impl FetchError {
    /// Stable code surfaced in the `root` error list.
    pub fn code(&self) -> &'static str {
        match self {
            FetchError::Timeout => "timeout",
            FetchError::Connect(_) => "connection",
            FetchError::InvalidUrl(_) => "url",
            FetchError::InvalidCredential => "credential",
            FetchError::Request(_) => "fetch",
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else if e.is_connect() {
            FetchError::Connect(e.to_string())
        } else if e.is_builder() {
            FetchError::InvalidUrl(e.to_string())
        } else {
            FetchError::Request(e.to_string())
        }
    }
}
