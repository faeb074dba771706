use crate::sync::{SyncError, ValidationError};
use serde_json::json;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

/// The message is always the user-facing text; details carry what a caller
/// needs to react (missing fields, HTTP status, retryability).
pub fn sync_err(id: &str, e: &SyncError) -> serde_json::Value {
    let retryable = e.is_retryable();
    match e {
        SyncError::Invalid(ValidationError::MissingFields { missing }) => err(
            id,
            "validation_failed",
            e.to_string(),
            Some(json!({ "missing": missing })),
        ),
        SyncError::Invalid(_) => err(id, "validation_failed", e.to_string(), None),
        SyncError::Rejected { status, .. } => err(
            id,
            "remote_rejected",
            e.to_string(),
            Some(json!({ "status": status, "retryable": retryable })),
        ),
        SyncError::Transport { detail, .. } => err(
            id,
            "transport_failed",
            e.to_string(),
            Some(json!({ "detail": detail, "retryable": retryable })),
        ),
        SyncError::NotFound { kind, id: record } => err(
            id,
            "not_found",
            e.to_string(),
            Some(json!({ "kind": kind, "id": record })),
        ),
    }
}
