use crate::db;
use crate::ipc::handlers::setup::load_grading;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{optional_str, required_str};
use crate::ipc::types::{AppState, Request};
use crate::qualitative::GradingMode;
use serde_json::json;

fn handle_grades_upsert(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let name = match required_str(req, "name") {
        Ok(v) => v.trim(),
        Err(resp) => return resp,
    };
    if name.is_empty() {
        return err(&req.id, "bad_params", "name must not be empty", None);
    }
    let id = match optional_str(req, "id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match db::grade_upsert(conn, id, name) {
        Ok(grade_id) => ok(&req.id, json!({ "gradeId": grade_id })),
        Err(e) => err(&req.id, "db_insert_failed", e.to_string(), None),
    }
}

fn handle_grades_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let policy = match load_grading(conn) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let grades = match db::grades_list(conn) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let grades: Vec<serde_json::Value> = grades
        .into_iter()
        .map(|g| {
            let mode = GradingMode::for_grade_name(&g.name, &policy.qualitative_grades);
            json!({ "id": g.id, "name": g.name, "mode": mode })
        })
        .collect();
    ok(&req.id, json!({ "grades": grades }))
}

fn handle_students_upsert(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let grade_id = match required_str(req, "gradeId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let display_name = match required_str(req, "displayName") {
        Ok(v) => v.trim(),
        Err(resp) => return resp,
    };
    if display_name.is_empty() {
        return err(&req.id, "bad_params", "displayName must not be empty", None);
    }
    let id = match optional_str(req, "id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let active = req
        .params
        .get("active")
        .and_then(|v| v.as_bool())
        .unwrap_or(true);

    match db::grade_exists(conn, grade_id) {
        Ok(true) => {}
        Ok(false) => {
            return err(
                &req.id,
                "not_found",
                "grade not found",
                Some(json!({ "gradeId": grade_id })),
            )
        }
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    }

    match db::student_upsert(conn, id, grade_id, display_name, active) {
        Ok(student_id) => ok(&req.id, json!({ "studentId": student_id })),
        Err(e) => err(&req.id, "db_insert_failed", e.to_string(), None),
    }
}

fn handle_students_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let grade_id = match required_str(req, "gradeId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match db::students_list(conn, grade_id) {
        Ok(rows) => ok(&req.id, json!({ "students": rows })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "grades.upsert" => Some(handle_grades_upsert(state, req)),
        "grades.list" => Some(handle_grades_list(state, req)),
        "students.upsert" => Some(handle_students_upsert(state, req)),
        "students.list" => Some(handle_students_list(state, req)),
        _ => None,
    }
}
