//! Shared request/response DTOs.
//!
//! Upstream payloads use camelCase; domain records (issues, workspaces, ...)
//! stay opaque `serde_json::Value`s.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::error::{FieldErrors, ROOT};
use crate::validation::{Validate, Validator, field};

const MIN_PASSWORD_LENGTH: usize = 8;

/// Credential pair issued by upstream on sign-in and sign-up.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialPair {
    pub access_token: String,
    pub refresh_token: String,
    pub access_token_max_age: i64,
    pub refresh_token_max_age: i64,
}

/// `POST tokens/refresh` response. The refresh token is only present when rotated.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    pub access_token_max_age: i64,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub refresh_token_max_age: Option<i64>,
}

/// Upstream resource reference; only the id is read, the rest is passed through.
#[derive(Debug, Clone, Deserialize)]
pub struct Identified {
    pub id: String,
}

/// GET /health response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub active_scopes: u64,
}

/// POST /api/auth/sign-in request body.
#[derive(Debug, Clone, Serialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

impl Validate for SignInRequest {
    fn validate(value: &Value) -> Result<Self, FieldErrors> {
        let mut v = Validator::new();
        let body = v.object(ROOT, Some(value), true);
        let email = body.and_then(|b| v.email("email", b.get("email")));
        let password = body.and_then(|b| v.string("password", b.get("password"), true));
        v.finish(|| Some(Self { email: email?, password: password? }))
    }
}

/// POST /api/auth/sign-up request body.
#[derive(Debug, Clone, Serialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

impl Validate for SignUpRequest {
    fn validate(value: &Value) -> Result<Self, FieldErrors> {
        let mut v = Validator::new();
        let body = v.object(ROOT, Some(value), true);
        let email = body.and_then(|b| v.email("email", b.get("email")));
        let password = body.and_then(|b| v.string("password", b.get("password"), true));
        v.min_length("password", password.as_deref(), MIN_PASSWORD_LENGTH);
        let name = body.and_then(|b| v.string("name", b.get("name"), true));
        v.finish(|| {
            Some(Self {
                email: email?,
                password: password?,
                name: name?,
            })
        })
    }
}

/// POST /api/auth/password request body.
#[derive(Debug, Clone, Serialize)]
pub struct PasswordResetRequest {
    pub password: String,
}

impl Validate for PasswordResetRequest {
    fn validate(value: &Value) -> Result<Self, FieldErrors> {
        let mut v = Validator::new();
        let body = v.object(ROOT, Some(value), true);
        let password = body.and_then(|b| v.string("password", b.get("password"), true));
        v.min_length("password", password.as_deref(), MIN_PASSWORD_LENGTH);
        v.finish(|| Some(Self { password: password? }))
    }
}

/// PATCH /api/issues/{id} request body.
#[derive(Debug, Clone, Serialize)]
pub struct IssuePatchRequest {
    pub patch: IssuePatch,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub milestone_id: Option<String>,
}

impl Validate for IssuePatchRequest {
    fn validate(value: &Value) -> Result<Self, FieldErrors> {
        let mut v = Validator::new();
        let body = v.object(ROOT, Some(value), true);
        let patch = body.and_then(|b| v.object("patch", b.get("patch"), true));

        let mut out = IssuePatch::default();
        if let Some(p) = patch {
            let at = |key: &str| field("patch", key);
            out.title = v.string(&at("title"), p.get("title"), false);
            out.description = v.string(&at("description"), p.get("description"), false);
            out.priority = v.number(&at("priority"), p.get("priority"), false);
            out.status = v.string(&at("status"), p.get("status"), false);
            out.assignee_id = v.string(&at("assigneeId"), p.get("assigneeId"), false);
            out.milestone_id = v.string(&at("milestoneId"), p.get("milestoneId"), false);
        }

        v.finish(|| patch.map(|_| Self { patch: out }))
    }
}

/// GET /api/workspaces/{path}/issues query string.
#[derive(Debug, Clone, Default)]
pub struct IssueFilter {
    pub team: Option<String>,
    pub status: Option<String>,
    pub page: Option<u32>,
}

impl Validate for IssueFilter {
    fn validate(value: &Value) -> Result<Self, FieldErrors> {
        let mut v = Validator::new();
        let query = v.object(ROOT, Some(value), true);
        let team = query.and_then(|q| v.string("team", q.get("team"), false));
        let status = query.and_then(|q| v.string("status", q.get("status"), false));
        let page = query.and_then(|q| v.unsigned("page", q.get("page"), false));
        v.finish(|| Some(Self { team, status, page }))
    }
}
