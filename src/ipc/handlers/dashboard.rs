use crate::ipc::error::{ok, sync_err};
use crate::ipc::helpers::dashboard;
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_refresh(state: &mut AppState, req: &Request) -> serde_json::Value {
    let dash = match dashboard(state, req) {
        Ok(d) => d,
        Err(resp) => return resp,
    };
    match dash.refresh() {
        Ok(stats) => ok(
            &req.id,
            json!({ "stats": stats, "revision": dash.revision() }),
        ),
        Err(e) => sync_err(&req.id, &e),
    }
}

fn handle_stats(state: &mut AppState, req: &Request) -> serde_json::Value {
    match dashboard(state, req) {
        Ok(dash) => ok(&req.id, json!(dash.stats())),
        Err(resp) => resp,
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "dashboard.refresh" => Some(handle_refresh(state, req)),
        "dashboard.stats" => Some(handle_stats(state, req)),
        _ => None,
    }
}
