use crate::ipc::error::{gradebook_err, ok};
use crate::ipc::helpers::required_str;
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_add(state: &mut AppState, req: &Request) -> serde_json::Value {
    match state.gradebook.add_indicator() {
        Ok(id) => ok(&req.id, json!({ "indicatorId": id })),
        Err(e) => gradebook_err(&req.id, &e),
    }
}

fn handle_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let id = match required_str(req, "indicatorId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let text = match required_str(req, "text") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match state.gradebook.update_indicator(id, text) {
        Ok(()) => ok(&req.id, json!({ "ok": true })),
        Err(e) => gradebook_err(&req.id, &e),
    }
}

fn handle_remove(state: &mut AppState, req: &Request) -> serde_json::Value {
    let id = match required_str(req, "indicatorId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match state.gradebook.remove_indicator(id) {
        Ok(()) => ok(&req.id, json!({ "ok": true })),
        Err(e) => gradebook_err(&req.id, &e),
    }
}

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    match state.gradebook.indicators() {
        Ok(items) => ok(&req.id, json!({ "indicators": items })),
        Err(e) => gradebook_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "indicators.add" => Some(handle_add(state, req)),
        "indicators.update" => Some(handle_update(state, req)),
        "indicators.remove" => Some(handle_remove(state, req)),
        "indicators.list" => Some(handle_list(state, req)),
        _ => None,
    }
}
