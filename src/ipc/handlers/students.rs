use crate::ipc::error::{ok, sync_err};
use crate::ipc::helpers::{
    confirm_delete, dashboard, draft_param, id_param, issue_delete, query_param, submit,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{EntityKind, StudentDraft};
use crate::sync::Mutation;
use serde_json::json;

fn handle_students_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    match dashboard(state, req) {
        Ok(dash) => ok(
            &req.id,
            json!({ "students": dash.student_rows(query_param(req)) }),
        ),
        Err(resp) => resp,
    }
}

fn handle_next_display_id(state: &mut AppState, req: &Request) -> serde_json::Value {
    match dashboard(state, req) {
        Ok(dash) => ok(
            &req.id,
            json!({ "studentId": dash.coordinator().next_display_id() }),
        ),
        Err(resp) => resp,
    }
}

fn handle_students_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let draft: StudentDraft = match draft_param(req) {
        Ok(d) => d,
        Err(resp) => return resp,
    };
    submit(state, req, Mutation::CreateStudent(draft))
}

fn handle_students_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let id = match id_param(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let draft: StudentDraft = match draft_param(req) {
        Ok(d) => d,
        Err(resp) => return resp,
    };
    submit(state, req, Mutation::UpdateStudent { id, draft })
}

fn handle_students_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let id = match id_param(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let intent = match dashboard(state, req) {
        Ok(dash) => dash.coordinator().request_delete_student(id),
        Err(resp) => return resp,
    };
    match intent {
        Ok(intent) => issue_delete(state, req, intent),
        Err(e) => sync_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(handle_students_list(state, req)),
        "students.nextDisplayId" => Some(handle_next_display_id(state, req)),
        "students.create" => Some(handle_students_create(state, req)),
        "students.update" => Some(handle_students_update(state, req)),
        "students.delete" => Some(handle_students_delete(state, req)),
        "students.deleteConfirm" => Some(confirm_delete(state, req, EntityKind::Student)),
        _ => None,
    }
}
