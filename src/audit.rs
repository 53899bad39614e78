//! OCSF (Open Cybersecurity Schema Framework) authentication events.
//!
//! Emitted through `tracing` on the `audit` target as a single JSON string
//! field, so they survive any subscriber format. Never panics.

use serde_json::json;
use std::time::{SystemTime, UNIX_EPOCH};

pub const CLASS_AUTHENTICATION: u32 = 3001;

pub const ACTIVITY_LOGON: u32 = 1;
pub const ACTIVITY_LOGOFF: u32 = 2;
pub const ACTIVITY_SERVICE_TICKET: u32 = 4; // token refresh
pub const ACTIVITY_OTHER: u32 = 99;

pub const STATUS_SUCCESS: u32 = 1;
pub const STATUS_FAILURE: u32 = 2;

pub const SEVERITY_INFORMATIONAL: u32 = 1;
pub const SEVERITY_MEDIUM: u32 = 3;
pub const SEVERITY_HIGH: u32 = 4;

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn activity_name(id: u32) -> &'static str {
    match id {
        ACTIVITY_LOGON => "Logon",
        ACTIVITY_LOGOFF => "Logoff",
        ACTIVITY_SERVICE_TICKET => "Service Ticket",
        _ => "Other",
    }
}

fn severity_name(id: u32) -> &'static str {
    match id {
        SEVERITY_INFORMATIONAL => "Informational",
        SEVERITY_MEDIUM => "Medium",
        SEVERITY_HIGH => "High",
        _ => "Unknown",
    }
}

/// Build an Authentication (3001) event.
pub fn authentication_event(
    activity_id: u32,
    status_id: u32,
    severity_id: u32,
    user: Option<&str>,
    message: &str,
) -> serde_json::Value {
    let mut event = json!({
        "class_uid": CLASS_AUTHENTICATION,
        "class_name": "Authentication",
        "activity_id": activity_id,
        "activity_name": activity_name(activity_id),
        "severity_id": severity_id,
        "severity": severity_name(severity_id),
        "status_id": status_id,
        "status": if status_id == STATUS_SUCCESS { "Success" } else { "Failure" },
        "time": now_millis(),
        "metadata": {
            "product": {
                "name": "tracker-bff",
                "version": env!("CARGO_PKG_VERSION"),
            }
        },
        "message": message,
    });

    if let Some(user) = user {
        event["actor"] = json!({ "user": { "name": user, "type_id": 1, "type": "User" } });
    }

    event
}

fn emit(event: &serde_json::Value) {
    if let Ok(json) = serde_json::to_string(event) {
        tracing::info!(target: "audit", event = %json);
    }
}

pub fn signed_in(email: &str) {
    emit(&authentication_event(
        ACTIVITY_LOGON,
        STATUS_SUCCESS,
        SEVERITY_INFORMATIONAL,
        Some(email),
        "Signed in",
    ));
}

pub fn sign_in_failed(email: &str, reason: &str) {
    emit(&authentication_event(
        ACTIVITY_LOGON,
        STATUS_FAILURE,
        SEVERITY_MEDIUM,
        Some(email),
        &format!("Sign-in failed: {reason}"),
    ));
}

pub fn signed_up(email: &str) {
    emit(&authentication_event(
        ACTIVITY_LOGON,
        STATUS_SUCCESS,
        SEVERITY_INFORMATIONAL,
        Some(email),
        "Account created",
    ));
}

pub fn signed_out() {
    emit(&authentication_event(
        ACTIVITY_LOGOFF,
        STATUS_SUCCESS,
        SEVERITY_INFORMATIONAL,
        None,
        "Signed out",
    ));
}

pub fn refresh_succeeded() {
    emit(&authentication_event(
        ACTIVITY_SERVICE_TICKET,
        STATUS_SUCCESS,
        SEVERITY_INFORMATIONAL,
        None,
        "Access token refreshed",
    ));
}

pub fn refresh_failed(reason: &str) {
    emit(&authentication_event(
        ACTIVITY_SERVICE_TICKET,
        STATUS_FAILURE,
        SEVERITY_MEDIUM,
        None,
        &format!("Token refresh failed: {reason}"),
    ));
}

pub fn token_rejected(reason: &str) {
    emit(&authentication_event(
        ACTIVITY_OTHER,
        STATUS_FAILURE,
        SEVERITY_HIGH,
        None,
        &format!("Access token rejected: {reason}"),
    ));
}
