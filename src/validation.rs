//! Local input validation.
//!
//! Request bodies are parsed as raw JSON, then checked field by field so
//! every failure is reported under its dotted path (`patch.priority`).
//! Query strings and path parameters go through the same error body.

use axum::body::Bytes;
use axum::extract::rejection::RawPathParamsRejection;
use axum::extract::{FromRequest, FromRequestParts, Path, Query, RawPathParams, Request};
use axum::http::request::Parts;
use serde::de::DeserializeOwned;
use serde_json::{Map, Number, Value};

use crate::error::{AppError, FieldErrors, ROOT};

/// A body type that can be checked against raw JSON.
pub trait Validate: Sized {
    fn validate(value: &Value) -> Result<Self, FieldErrors>;
}

/// Join a parent path and a key with `.`.
pub fn field(parent: &str, key: &str) -> String {
    if parent.is_empty() || parent == ROOT {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

/// Collects field errors while walking a JSON value.
#[derive(Debug, Default)]
pub struct Validator {
    errors: FieldErrors,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&mut self, path: &str, code: &str) {
        self.errors.add(path, code);
    }

    fn present<'v>(
        &mut self,
        path: &str,
        value: Option<&'v Value>,
        required: bool,
    ) -> Option<&'v Value> {
        match value {
            None | Some(Value::Null) => {
                if required {
                    self.fail(path, "required");
                }
                None
            }
            Some(v) => Some(v),
        }
    }

    pub fn object<'v>(
        &mut self,
        path: &str,
        value: Option<&'v Value>,
        required: bool,
    ) -> Option<&'v Map<String, Value>> {
        match self.present(path, value, required)? {
            Value::Object(map) => Some(map),
            _ => {
                self.fail(path, "object");
                None
            }
        }
    }

    pub fn string(&mut self, path: &str, value: Option<&Value>, required: bool) -> Option<String> {
        match self.present(path, value, required)? {
            Value::String(s) => Some(s.clone()),
            _ => {
                self.fail(path, "string");
                None
            }
        }
    }

    pub fn number(&mut self, path: &str, value: Option<&Value>, required: bool) -> Option<Number> {
        match self.present(path, value, required)? {
            Value::Number(n) => Some(n.clone()),
            _ => {
                self.fail(path, "number");
                None
            }
        }
    }

    /// A non-negative integer, given as a JSON number or as decimal text.
    ///
    /// Empty text counts as absent.
    pub fn unsigned(&mut self, path: &str, value: Option<&Value>, required: bool) -> Option<u32> {
        let parsed = match self.present(path, value, required)? {
            Value::String(s) if s.is_empty() => {
                if required {
                    self.fail(path, "required");
                }
                return None;
            }
            Value::String(s) => s.trim().parse::<u32>().ok(),
            Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
            _ => None,
        };
        if parsed.is_none() {
            self.fail(path, "number");
        }
        parsed
    }

    /// A string containing `@` with text on both sides.
    pub fn email(&mut self, path: &str, value: Option<&Value>) -> Option<String> {
        let email = self.string(path, value, true)?;
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Some(email),
            _ => {
                self.fail(path, "email");
                None
            }
        }
    }

    pub fn min_length(&mut self, path: &str, value: Option<&str>, min: usize) {
        if let Some(v) = value
            && v.chars().count() < min
        {
            self.fail(path, "minLength");
        }
    }

    /// `Ok(value)` if no field failed.
    pub fn finish<T>(self, value: impl FnOnce() -> Option<T>) -> Result<T, FieldErrors> {
        if !self.errors.is_empty() {
            return Err(self.errors);
        }
        value().ok_or_else(|| FieldErrors::root("invalid"))
    }
}

/// JSON body extractor that runs [`Validate`] and rejects with the uniform error body.
#[derive(Debug)]
pub struct ValidJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state).await.map_err(|e| {
            tracing::debug!(error = %e, "request body unreadable");
            AppError::Validation(FieldErrors::root("body"))
        })?;
        let value: Value = serde_json::from_slice(&bytes)?;
        T::validate(&value).map(ValidJson).map_err(AppError::Validation)
    }
}

/// Query string extractor: pairs become a JSON object of strings checked with [`Validate`].
#[derive(Debug)]
pub struct ValidQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ValidQuery<T>
where
    T: Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(pairs) = Query::<Vec<(String, String)>>::from_request_parts(parts, state)
            .await
            .map_err(|e| {
                tracing::debug!(error = %e, "query string unreadable");
                AppError::Validation(FieldErrors::root("query"))
            })?;

        let value = Value::Object(
            pairs
                .into_iter()
                .map(|(key, value)| (key, Value::String(value)))
                .collect(),
        );
        T::validate(&value).map(ValidQuery).map_err(AppError::Validation)
    }
}

/// Path parameter extractor.
///
/// Every parameter must be a single upstream path segment (see [`is_segment`]);
/// offenders are reported as `{<param>: ["segment"]}`.
#[derive(Debug)]
pub struct ValidPath<T>(pub T);

impl<T, S> FromRequestParts<S> for ValidPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let raw = RawPathParams::from_request_parts(parts, state)
            .await
            .map_err(|e| match e {
                RawPathParamsRejection::MissingPathParams(_) => AppError::Unknown(e.body_text()),
                _ => {
                    tracing::debug!(error = %e, "path parameters unreadable");
                    AppError::Validation(FieldErrors::root("path"))
                }
            })?;

        let mut errors = FieldErrors::new();
        for (key, value) in raw.iter() {
            if !is_segment(value) {
                errors.add(key, "segment");
            }
        }
        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }

        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| {
                tracing::debug!(error = %e, "path parameters did not deserialize");
                AppError::Validation(FieldErrors::root("path"))
            })?;
        Ok(ValidPath(value))
    }
}

/// Whether `value` stays one segment when spliced into an upstream path or query.
pub fn is_segment(value: &str) -> bool {
    !value.is_empty()
        && value != "."
        && value != ".."
        && !value.contains(['/', '\\', '?', '#', '&'])
}

/// `value` if it is a single path segment, else a `segment` error under `path`.
pub fn segment<'a>(path: &str, value: &'a str) -> Result<&'a str, AppError> {
    if is_segment(value) {
        Ok(value)
    } else {
        let mut errors = FieldErrors::new();
        errors.add(path, "segment");
        Err(AppError::Validation(errors))
    }
}
