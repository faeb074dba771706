use crate::ipc::error::{ok, sync_err};
use crate::ipc::helpers::{
    confirm_delete, dashboard, draft_param, id_param, issue_delete, query_param, submit,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{ClassDraft, EntityKind};
use crate::sync::Mutation;
use serde_json::json;

fn handle_classes_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    match dashboard(state, req) {
        Ok(dash) => ok(
            &req.id,
            json!({ "classes": dash.class_rows(query_param(req)) }),
        ),
        Err(resp) => resp,
    }
}

fn handle_classes_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let draft: ClassDraft = match draft_param(req) {
        Ok(d) => d,
        Err(resp) => return resp,
    };
    submit(state, req, Mutation::CreateClass(draft))
}

fn handle_classes_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let id = match id_param(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let draft: ClassDraft = match draft_param(req) {
        Ok(d) => d,
        Err(resp) => return resp,
    };
    submit(state, req, Mutation::UpdateClass { id, draft })
}

fn handle_classes_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let id = match id_param(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let intent = match dashboard(state, req) {
        Ok(dash) => dash.coordinator().request_delete_class(id),
        Err(resp) => return resp,
    };
    match intent {
        Ok(intent) => issue_delete(state, req, intent),
        Err(e) => sync_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "classes.list" => Some(handle_classes_list(state, req)),
        "classes.create" => Some(handle_classes_create(state, req)),
        "classes.update" => Some(handle_classes_update(state, req)),
        "classes.delete" => Some(handle_classes_delete(state, req)),
        "classes.deleteConfirm" => Some(confirm_delete(state, req, EntityKind::Class)),
        _ => None,
    }
}
