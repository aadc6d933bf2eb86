mod test_support;

use serde_json::json;
use test_support::{
    component_ids, error_code, request, request_ok, seed_workspace, spawn_sidecar, weights,
};

fn cell(view: &serde_json::Value, student: &str, component: &str) -> serde_json::Value {
    view["students"]
        .as_array()
        .expect("students")
        .iter()
        .find(|s| s["studentId"].as_str() == Some(student))
        .and_then(|s| {
            s["cells"]
                .as_array()
                .expect("cells")
                .iter()
                .find(|c| c["componentId"].as_str() == Some(component))
                .cloned()
        })
        .expect("cell")
}

#[test]
fn save_then_reopen_restores_schema_scores_and_indicators() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let grade_id = seed_workspace(&mut stdin, &mut reader, "gradebookd-save", "Cuarto");
    let selection = json!({ "gradeId": grade_id, "areaId": "lang", "period": 1 });

    let view = request_ok(&mut stdin, &mut reader, "open", "gradebook.open", selection.clone());
    let events = view["events"].as_array().expect("events");
    assert!(events
        .iter()
        .any(|e| e["code"].as_str() == Some("default_schema")));
    let a = component_ids(&view)[0].clone();
    let added = request_ok(
        &mut stdin,
        &mut reader,
        "add",
        "components.add",
        json!({ "name": "Reading log" }),
    );
    let b = added["componentId"].as_str().expect("componentId").to_string();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "score",
        "scores.set",
        json!({ "studentId": "s1", "componentId": a, "value": "4.5" }),
    );
    let ind = request_ok(&mut stdin, &mut reader, "ind", "indicators.add", json!({}));
    let ind_id = ind["indicatorId"].as_str().expect("indicatorId").to_string();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "ind-text",
        "indicators.update",
        json!({ "indicatorId": ind_id, "text": "Reads aloud with fluency" }),
    );

    let saved = request_ok(&mut stdin, &mut reader, "save", "gradebook.save", json!({}));
    assert_eq!(saved["success"].as_bool(), Some(true));
    assert!(saved["events"]
        .as_array()
        .expect("events")
        .iter()
        .any(|e| e["code"].as_str() == Some("saved")));

    // Leave for another period, then come back.
    let other = request_ok(
        &mut stdin,
        &mut reader,
        "open-p2",
        "gradebook.open",
        json!({ "gradeId": grade_id, "areaId": "lang", "period": 2 }),
    );
    assert_eq!(weights(&other), vec![100.0]);
    assert!(other["indicators"].as_array().expect("indicators").is_empty());

    let view = request_ok(&mut stdin, &mut reader, "reopen", "gradebook.open", selection);
    assert_eq!(component_ids(&view), vec![a.clone(), b.clone()]);
    assert_eq!(weights(&view), vec![50.0, 50.0]);
    assert_eq!(view["components"][1]["name"].as_str(), Some("Reading log"));
    assert_eq!(cell(&view, "s1", &a)["value"].as_f64(), Some(4.5));
    // Blank cells were stored as 0 and come back graded.
    assert_eq!(cell(&view, "s1", &b)["value"].as_f64(), Some(0.0));
    assert_eq!(cell(&view, "s2", &a)["value"].as_f64(), Some(0.0));

    let list = request_ok(&mut stdin, &mut reader, "list", "indicators.list", json!({}));
    let items = list["indicators"].as_array().expect("indicators");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"].as_str(), Some(ind_id.as_str()));
    assert_eq!(items[0]["text"].as_str(), Some("Reads aloud with fluency"));
    assert_eq!(items[0]["period"].as_i64(), Some(1));
}

#[test]
fn open_rejects_unknown_grade_and_bad_period() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let grade_id = seed_workspace(&mut stdin, &mut reader, "gradebookd-open-errors", "Cuarto");

    let resp = request(
        &mut stdin,
        &mut reader,
        "p0",
        "gradebook.open",
        json!({ "gradeId": grade_id, "areaId": "lang", "period": 0 }),
    );
    assert_eq!(error_code(&resp), Some("bad_params"));

    let resp = request(
        &mut stdin,
        &mut reader,
        "ghost",
        "gradebook.open",
        json!({ "gradeId": "ghost", "areaId": "lang", "period": 1 }),
    );
    assert_eq!(error_code(&resp), Some("not_found"));

    // A failed open leaves nothing editable.
    let resp = request(&mut stdin, &mut reader, "get", "gradebook.get", json!({}));
    assert_eq!(error_code(&resp), Some("not_ready"));

    let health = request_ok(&mut stdin, &mut reader, "health", "health", json!({}));
    assert_eq!(health["gradebookOpen"].as_bool(), Some(false));
}

#[test]
fn indicator_ops_reject_unknown_ids() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let grade_id = seed_workspace(&mut stdin, &mut reader, "gradebookd-indicators", "Cuarto");
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "open",
        "gradebook.open",
        json!({ "gradeId": grade_id, "areaId": "art", "period": 3 }),
    );

    let first = request_ok(&mut stdin, &mut reader, "a1", "indicators.add", json!({}));
    let second = request_ok(&mut stdin, &mut reader, "a2", "indicators.add", json!({}));
    assert_ne!(first["indicatorId"], second["indicatorId"]);

    let resp = request(
        &mut stdin,
        &mut reader,
        "upd",
        "indicators.update",
        json!({ "indicatorId": "nope", "text": "x" }),
    );
    assert_eq!(error_code(&resp), Some("not_found"));
    let resp = request(
        &mut stdin,
        &mut reader,
        "rm",
        "indicators.remove",
        json!({ "indicatorId": "nope" }),
    );
    assert_eq!(error_code(&resp), Some("not_found"));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "rm-first",
        "indicators.remove",
        json!({ "indicatorId": first["indicatorId"] }),
    );
    let list = request_ok(&mut stdin, &mut reader, "list", "indicators.list", json!({}));
    let items = list["indicators"].as_array().expect("indicators");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], second["indicatorId"]);
    assert_eq!(items[0]["text"].as_str(), Some(""));
}
