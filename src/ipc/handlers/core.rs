use crate::ipc::error::{err, ok, sync_err};
use crate::ipc::helpers::{attach, session_summary};
use crate::ipc::types::{AppState, Request};
use crate::remote::{HttpRemote, WorkspaceRemote};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "backend": state.backend,
            "connected": state.dashboard.is_some(),
        }),
    )
}

fn handle_session_connect(state: &mut AppState, req: &Request) -> serde_json::Value {
    let base_url = req
        .params
        .get("baseUrl")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .or_else(|| state.config.remote.base_url.clone());
    let Some(base_url) = base_url else {
        return err(&req.id, "bad_params", "missing params.baseUrl", None);
    };

    let remote = match HttpRemote::new(&base_url, &state.config.remote) {
        Ok(r) => r,
        Err(e) => return err(&req.id, "connect_failed", e.to_string(), None),
    };
    match attach(state, Arc::new(remote)) {
        Ok(dashboard) => ok(&req.id, session_summary(&base_url, dashboard)),
        Err(e) => sync_err(&req.id, &e),
    }
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    let remote = match WorkspaceRemote::open(&path, state.config.ids.generator()) {
        Ok(r) => r,
        Err(e) => return err(&req.id, "connect_failed", format!("{e:?}"), None),
    };
    match attach(state, Arc::new(remote)) {
        Ok(dashboard) => ok(
            &req.id,
            session_summary(&path.to_string_lossy(), dashboard),
        ),
        Err(e) => sync_err(&req.id, &e),
    }
}

fn handle_roster_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let roster = &state.config.roster;
    ok(
        &req.id,
        json!({
            "grades": roster.grades,
            "years": roster.years,
            "teachers": roster.teachers,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "session.connect" => Some(handle_session_connect(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        "roster.get" => Some(handle_roster_get(state, req)),
        _ => None,
    }
}
