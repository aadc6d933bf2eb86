mod test_support;

use serde_json::json;
use test_support::{error_code, request, request_ok, seed_workspace, spawn_sidecar};

/// Opens a 35/35/30 gradebook and returns the two regular component ids.
fn open_with_final(
    stdin: &mut std::process::ChildStdin,
    reader: &mut std::io::BufReader<std::process::ChildStdout>,
    prefix: &str,
) -> (String, String) {
    let grade_id = seed_workspace(stdin, reader, prefix, "Quinto");
    let view = request_ok(
        stdin,
        reader,
        "open",
        "gradebook.open",
        json!({ "gradeId": grade_id, "areaId": "science", "period": 1 }),
    );
    let a = view["components"][0]["id"].as_str().expect("id").to_string();
    let added = request_ok(stdin, reader, "add", "components.add", json!({ "name": "Quiz 2" }));
    let b = added["componentId"].as_str().expect("componentId").to_string();
    let _ = request_ok(
        stdin,
        reader,
        "final",
        "components.setFinalEnabled",
        json!({ "include": true }),
    );
    (a, b)
}

#[test]
fn ungraded_components_leave_the_denominator() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let (a, b) = open_with_final(&mut stdin, &mut reader, "gradebookd-partial");

    let r = request_ok(
        &mut stdin,
        &mut reader,
        "s-a",
        "scores.set",
        json!({ "studentId": "s1", "componentId": a, "value": "4.0" }),
    );
    assert_eq!(r["value"].as_f64(), Some(4.0));
    assert_eq!(r["finalScore"].as_f64(), Some(4.0));

    let r = request_ok(
        &mut stdin,
        &mut reader,
        "s-b",
        "scores.set",
        json!({ "studentId": "s1", "componentId": b, "value": 4.5 }),
    );
    assert_eq!(r["finalScore"].as_f64(), Some(4.25));
    assert!(r["category"].is_null());

    // An explicit zero is a grade, not a blank.
    let r = request_ok(
        &mut stdin,
        &mut reader,
        "s-final",
        "scores.set",
        json!({ "studentId": "s1", "componentId": "final", "value": "0" }),
    );
    let with_zero = r["finalScore"].as_f64().expect("finalScore");
    assert!((with_zero - 2.98).abs() < 0.011, "got {}", with_zero);

    let r = request_ok(
        &mut stdin,
        &mut reader,
        "clear-final",
        "scores.set",
        json!({ "studentId": "s1", "componentId": "final", "value": null }),
    );
    assert!(r["value"].is_null());
    assert_eq!(r["finalScore"].as_f64(), Some(4.25));

    let summary = request_ok(&mut stdin, &mut reader, "sum", "gradebook.summary", json!({}));
    let per_student = summary["perStudent"].as_array().expect("perStudent");
    let s1 = per_student
        .iter()
        .find(|s| s["studentId"].as_str() == Some("s1"))
        .expect("s1");
    assert_eq!(s1["gradedCount"].as_u64(), Some(2));
    assert_eq!(s1["ungradedCount"].as_u64(), Some(1));
    let s2 = per_student
        .iter()
        .find(|s| s["studentId"].as_str() == Some("s2"))
        .expect("s2");
    assert_eq!(s2["finalScore"].as_f64(), Some(0.0));
}

#[test]
fn out_of_range_and_garbage_input_leave_the_cell_unchanged() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let (a, _b) = open_with_final(&mut stdin, &mut reader, "gradebookd-reject");

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "seed",
        "scores.set",
        json!({ "studentId": "s2", "componentId": a, "value": "3.5" }),
    );

    for (i, bad) in ["7", "-1", "abc", "NaN"].iter().enumerate() {
        let resp = request(
            &mut stdin,
            &mut reader,
            &format!("bad{}", i),
            "scores.set",
            json!({ "studentId": "s2", "componentId": a, "value": bad }),
        );
        assert_eq!(error_code(&resp), Some("validation_error"), "{}", bad);
    }

    let r = request_ok(
        &mut stdin,
        &mut reader,
        "get",
        "scores.get",
        json!({ "studentId": "s2", "componentId": a }),
    );
    assert_eq!(r["value"].as_f64(), Some(3.5));

    let resp = request(
        &mut stdin,
        &mut reader,
        "ghost",
        "scores.set",
        json!({ "studentId": "ghost", "componentId": a, "value": "3" }),
    );
    assert_eq!(error_code(&resp), Some("not_found"));

    let resp = request(
        &mut stdin,
        &mut reader,
        "cat",
        "scores.set",
        json!({ "studentId": "s2", "componentId": a, "category": "DS" }),
    );
    assert_eq!(error_code(&resp), Some("validation_error"));
}

#[test]
fn removing_an_activity_drops_its_scores() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let (a, b) = open_with_final(&mut stdin, &mut reader, "gradebookd-drop");

    for (id, comp, v) in [("x1", &a, "2.0"), ("x2", &b, "5.0")] {
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            id,
            "scores.set",
            json!({ "studentId": "s1", "componentId": comp, "value": v }),
        );
    }
    let view = request_ok(
        &mut stdin,
        &mut reader,
        "rm",
        "components.remove",
        json!({ "componentId": b }),
    );
    let s1 = view["students"]
        .as_array()
        .expect("students")
        .iter()
        .find(|s| s["studentId"].as_str() == Some("s1"))
        .expect("s1")
        .clone();
    assert_eq!(s1["finalScore"].as_f64(), Some(2.0));
    assert_eq!(s1["cells"].as_array().map(|c| c.len()), Some(2));

    let resp = request(
        &mut stdin,
        &mut reader,
        "get-removed",
        "scores.get",
        json!({ "studentId": "s1", "componentId": b }),
    );
    assert_eq!(error_code(&resp), Some("not_found"));
}
