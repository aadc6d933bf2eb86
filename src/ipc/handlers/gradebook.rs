use crate::db::SqliteGradeStore;
use crate::ipc::error::{err, gradebook_err, ok};
use crate::ipc::handlers::setup::load_grading;
use crate::ipc::helpers::{required_bool, required_i64, required_str};
use crate::ipc::types::{AppState, Request};
use crate::ledger::ScoreInput;
use crate::qualitative::{GradingMode, QualitativeCategory};
use crate::store::Selection;
use serde_json::{json, Value};

/// Full gradebook view plus pending events and any per-call extras.
fn view_response(state: &mut AppState, req: &Request, extra: Value) -> Value {
    let events = state.gradebook.take_events();
    let view = match state.gradebook.view() {
        Ok(v) => v,
        Err(e) => return gradebook_err(&req.id, &e),
    };
    let mut result = match serde_json::to_value(&view) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "internal", e.to_string(), None),
    };
    if let (Some(obj), Some(extra)) = (result.as_object_mut(), extra.as_object()) {
        for (k, v) in extra {
            obj.insert(k.clone(), v.clone());
        }
    }
    result["events"] = json!(events);
    ok(&req.id, result)
}

fn handle_open(state: &mut AppState, req: &Request) -> Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let grade_id = match required_str(req, "gradeId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let area_id = match required_str(req, "areaId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let period = match required_i64(req, "period") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if period < 1 {
        return err(
            &req.id,
            "bad_params",
            "period must be >= 1",
            Some(json!({ "period": period })),
        );
    }

    let policy = match load_grading(conn) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let selection = Selection {
        grade_id: grade_id.to_string(),
        area_id: area_id.to_string(),
        period,
    };

    // The previous period is dropped even if this one fails to load.
    state.gradebook.set_policy(policy);
    let opened = state.gradebook.open(&SqliteGradeStore::new(conn), selection);
    match opened {
        Ok(()) => view_response(state, req, json!({})),
        Err(e) => gradebook_err(&req.id, &e),
    }
}

fn handle_get(state: &mut AppState, req: &Request) -> Value {
    view_response(state, req, json!({}))
}

fn handle_validate(state: &mut AppState, req: &Request) -> Value {
    match state.gradebook.validate() {
        Ok(v) => ok(&req.id, json!(v)),
        Err(e) => gradebook_err(&req.id, &e),
    }
}

fn handle_summary(state: &mut AppState, req: &Request) -> Value {
    match state.gradebook.summary() {
        Ok(s) => ok(&req.id, json!(s)),
        Err(e) => gradebook_err(&req.id, &e),
    }
}

fn handle_save(state: &mut AppState, req: &Request) -> Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let store = SqliteGradeStore::new(conn);
    match state.gradebook.save(&store) {
        Ok(outcome) => {
            let events = state.gradebook.take_events();
            ok(
                &req.id,
                json!({
                    "success": outcome.success,
                    "message": outcome.message,
                    "events": events
                }),
            )
        }
        Err(e) => gradebook_err(&req.id, &e),
    }
}

fn handle_components_add(state: &mut AppState, req: &Request) -> Value {
    let name = match required_str(req, "name") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match state.gradebook.add_component(name) {
        Ok(id) => view_response(state, req, json!({ "componentId": id })),
        Err(e) => gradebook_err(&req.id, &e),
    }
}

fn handle_components_remove(state: &mut AppState, req: &Request) -> Value {
    let id = match required_str(req, "componentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match state.gradebook.remove_component(id) {
        Ok(()) => view_response(state, req, json!({})),
        Err(e) => gradebook_err(&req.id, &e),
    }
}

fn handle_components_rename(state: &mut AppState, req: &Request) -> Value {
    let id = match required_str(req, "componentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let name = match required_str(req, "name") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match state.gradebook.rename_component(id, name) {
        Ok(()) => view_response(state, req, json!({})),
        Err(e) => gradebook_err(&req.id, &e),
    }
}

fn handle_components_set_final(state: &mut AppState, req: &Request) -> Value {
    let include = match required_bool(req, "include") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match state.gradebook.set_final_evaluation_enabled(include) {
        Ok(()) => view_response(state, req, json!({})),
        Err(e) => gradebook_err(&req.id, &e),
    }
}

fn handle_components_redistribute(state: &mut AppState, req: &Request) -> Value {
    match state.gradebook.redistribute() {
        Ok(_) => view_response(state, req, json!({})),
        Err(e) => gradebook_err(&req.id, &e),
    }
}

fn parse_score_input(req: &Request) -> Result<ScoreInput, Value> {
    if let Some(raw) = req.params.get("category").filter(|v| !v.is_null()) {
        let Some(code) = raw.as_str() else {
            return Err(err(&req.id, "bad_params", "category must be a string", None));
        };
        return QualitativeCategory::parse(code)
            .map(ScoreInput::Category)
            .ok_or_else(|| {
                err(
                    &req.id,
                    "bad_params",
                    "category must be one of: DS, DA, DB, SP",
                    Some(json!({ "category": code })),
                )
            });
    }
    match req.params.get("value") {
        None | Some(Value::Null) => Ok(ScoreInput::Raw(String::new())),
        Some(Value::String(s)) => Ok(ScoreInput::Raw(s.clone())),
        Some(Value::Number(n)) => Ok(ScoreInput::Raw(n.to_string())),
        Some(other) => Err(err(
            &req.id,
            "bad_params",
            "value must be a string, number or null",
            Some(json!({ "value": other })),
        )),
    }
}

fn handle_scores_set(state: &mut AppState, req: &Request) -> Value {
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let component_id = match required_str(req, "componentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let input = match parse_score_input(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let value = match state.gradebook.set_score(student_id, component_id, &input) {
        Ok(v) => v,
        Err(e) => return gradebook_err(&req.id, &e),
    };
    let final_score = match state.gradebook.final_score(student_id) {
        Ok(v) => v,
        Err(e) => return gradebook_err(&req.id, &e),
    };
    let category = match state.gradebook.mode() {
        Ok(GradingMode::Qualitative) => {
            value.map(|_| QualitativeCategory::from_score(final_score))
        }
        _ => None,
    };
    ok(
        &req.id,
        json!({
            "studentId": student_id,
            "componentId": component_id,
            "value": value,
            "finalScore": final_score,
            "finalDisplay": crate::calc::format_score(final_score),
            "category": category
        }),
    )
}

fn handle_scores_get(state: &mut AppState, req: &Request) -> Value {
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let component_id = match required_str(req, "componentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match state.gradebook.get_score(student_id, component_id) {
        Ok(v) => ok(&req.id, json!({ "value": v })),
        Err(e) => gradebook_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "gradebook.open" => Some(handle_open(state, req)),
        "gradebook.get" => Some(handle_get(state, req)),
        "gradebook.validate" => Some(handle_validate(state, req)),
        "gradebook.summary" => Some(handle_summary(state, req)),
        "gradebook.save" => Some(handle_save(state, req)),
        "components.add" => Some(handle_components_add(state, req)),
        "components.remove" => Some(handle_components_remove(state, req)),
        "components.rename" => Some(handle_components_rename(state, req)),
        "components.setFinalEnabled" => Some(handle_components_set_final(state, req)),
        "components.redistribute" => Some(handle_components_redistribute(state, req)),
        "scores.set" => Some(handle_scores_set(state, req)),
        "scores.get" => Some(handle_scores_get(state, req)),
        _ => None,
    }
}
