//! Base upstream API client: URL building, query strings and JSON bodies.

use axum::http::{HeaderMap, HeaderValue, Method, header};
use serde_json::Value;

use super::{FetchError, Upstream};

/// Query parameters, serialized verbatim as `key=value` pairs joined by `&`.
///
/// Falsy values (`null`, `false`, `0`, `""`) are dropped. Values are not
/// percent-encoded here; existing clients depend on that.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query(Vec<(String, Value)>);

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.push((key.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.to_query_string().is_empty()
    }

    pub fn to_query_string(&self) -> String {
        self.0
            .iter()
            .filter(|(_, value)| !is_falsy(value))
            .map(|(key, value)| format!("{key}={}", render(value)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(render).collect::<Vec<_>>().join(","),
        other => other.to_string(),
    }
}

/// Per-call request options.
#[derive(Debug, Clone, Default)]
pub struct RequestInit {
    pub query: Query,
    pub body: Option<Value>,
    pub headers: HeaderMap,
}

impl RequestInit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a body. Objects and arrays are sent as JSON.
    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn query(mut self, query: Query) -> Self {
        self.query = query;
        self
    }
}

/// Upstream API client bound to a base URL and optional version segment.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    version: Option<String>,
}

impl ApiClient {
    pub fn new(http: reqwest::Client, base_url: &str, version: Option<&str>) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            version: version.map(String::from).filter(|v| !v.is_empty()),
        }
    }

    /// `{base}/{path}{/version}` followed by the query string, if any.
    pub fn url(&self, path: &str, query: &Query) -> String {
        let mut url = format!("{}/{}", self.base_url, path.trim_matches('/'));
        if let Some(version) = &self.version {
            url.push('/');
            url.push_str(version);
        }
        let query = query.to_query_string();
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query);
        }
        url
    }
}

impl Upstream for ApiClient {
    async fn fetch(
        &self,
        method: Method,
        path: &str,
        init: RequestInit,
    ) -> Result<reqwest::Response, FetchError> {
        let url = self.url(path, &init.query);
        tracing::debug!(%method, %url, "upstream request");

        let mut headers = init.headers;
        let mut request = self.http.request(method, url);

        match init.body {
            None | Some(Value::Null) => {}
            Some(body @ (Value::Object(_) | Value::Array(_))) => {
                headers.insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("application/json"),
                );
                request = request.body(body.to_string());
            }
            Some(Value::String(text)) => request = request.body(text),
            Some(other) => request = request.body(other.to_string()),
        }

        let response = request.headers(headers).send().await?;
        tracing::debug!(status = %response.status(), "upstream response");
        Ok(response)
    }
}
