use crate::dashboard::Dashboard;
use crate::ipc::error::{err, ok, sync_err};
use crate::ipc::types::{AppState, Request};
use crate::model::{EntityId, EntityKind};
use crate::remote::Remote;
use crate::sync::{DeleteIntent, Mutation, SyncError};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

pub fn dashboard<'a>(
    state: &'a AppState,
    req: &Request,
) -> Result<&'a Dashboard, serde_json::Value> {
    state.dashboard.as_ref().ok_or_else(|| {
        err(
            &req.id,
            "no_session",
            "connect to a backend or select a workspace first",
            None,
        )
    })
}

pub fn query_param(req: &Request) -> &str {
    req.params.get("query").and_then(|v| v.as_str()).unwrap_or("")
}

pub fn id_param(req: &Request) -> Result<EntityId, serde_json::Value> {
    match req.params.get("id") {
        Some(v) => serde_json::from_value::<EntityId>(v.clone())
            .map_err(|e| err(&req.id, "bad_params", format!("invalid id: {e}"), None)),
        None => Err(err(&req.id, "bad_params", "missing id", None)),
    }
}

/// Form fields from `params`; unknown keys (such as `id`) are ignored.
pub fn draft_param<T: DeserializeOwned>(req: &Request) -> Result<T, serde_json::Value> {
    serde_json::from_value::<T>(req.params.clone())
        .map_err(|e| err(&req.id, "bad_params", e.to_string(), None))
}

/// Swaps in a new session over `remote`. Pending delete confirmations belong
/// to the old session and are dropped.
pub fn attach(
    state: &mut AppState,
    remote: Arc<dyn Remote>,
) -> Result<&Dashboard, SyncError> {
    let backend = remote.describe();
    let dashboard = Dashboard::connect(remote, &state.config)?;
    info!(%backend, "session attached");
    state.pending_deletes.clear();
    state.backend = Some(backend);
    Ok(&*state.dashboard.insert(dashboard))
}

pub fn session_summary(backend: &str, dashboard: &Dashboard) -> serde_json::Value {
    json!({
        "backend": backend,
        "stats": dashboard.stats(),
    })
}

/// Issues a confirmation token. A token already pending for the same record
/// is replaced.
pub fn issue_delete(
    state: &mut AppState,
    req: &Request,
    intent: DeleteIntent,
) -> serde_json::Value {
    state
        .pending_deletes
        .retain(|_, pending| !(pending.kind() == intent.kind() && pending.id() == intent.id()));
    let token = Uuid::new_v4().to_string();
    let result = json!({
        "token": token,
        "prompt": intent.prompt(),
        "kind": intent.kind(),
        "id": intent.id(),
    });
    state.pending_deletes.insert(token, intent);
    ok(&req.id, result)
}

/// Resolves a `*.deleteConfirm` request. The token is consumed whether the
/// user confirmed or cancelled, except when the remote call fails, in which
/// case it stays valid for a retry.
pub fn confirm_delete(
    state: &mut AppState,
    req: &Request,
    kind: EntityKind,
) -> serde_json::Value {
    let Some(token) = req.params.get("token").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing token", None);
    };
    let Some(confirmed) = req.params.get("confirmed").and_then(|v| v.as_bool()) else {
        return err(&req.id, "bad_params", "missing confirmed", None);
    };
    let token = token.to_string();
    let intent = match state.pending_deletes.get(&token) {
        Some(intent) if intent.kind() == kind => intent.clone(),
        _ => return err(&req.id, "unknown_token", "unknown or expired token", None),
    };

    if !confirmed {
        state.pending_deletes.remove(&token);
        return ok(&req.id, json!({ "cancelled": true, "id": intent.id() }));
    }

    let dash = match dashboard(state, req) {
        Ok(d) => d,
        Err(resp) => return resp,
    };
    let mutation = Mutation::Delete(intent);
    let result = dash.coordinator().submit(&mutation);
    match result {
        Ok(applied) => {
            state.pending_deletes.remove(&token);
            ok(
                &req.id,
                json!({
                    "applied": applied,
                    "message": mutation.success_message(),
                }),
            )
        }
        Err(e) => sync_err(&req.id, &e),
    }
}

/// Runs a create/update and shapes the response.
pub fn submit(state: &AppState, req: &Request, mutation: Mutation) -> serde_json::Value {
    let dash = match dashboard(state, req) {
        Ok(d) => d,
        Err(resp) => return resp,
    };
    match dash.coordinator().submit(&mutation) {
        Ok(applied) => ok(
            &req.id,
            json!({
                "applied": applied,
                "message": mutation.success_message(),
            }),
        ),
        Err(e) => sync_err(&req.id, &e),
    }
}
