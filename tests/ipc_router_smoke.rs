mod test_support;

use serde_json::json;
use std::io::{BufRead, Write};
use test_support::{error_code, request, spawn_sidecar, temp_dir};

#[test]
fn every_method_is_routed() {
    let workspace = temp_dir("gradebookd-router-smoke");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let methods = [
        "health",
        "workspace.select",
        "grades.upsert",
        "grades.list",
        "students.upsert",
        "students.list",
        "gradebook.open",
        "gradebook.get",
        "gradebook.validate",
        "gradebook.summary",
        "gradebook.save",
        "components.add",
        "components.remove",
        "components.rename",
        "components.setFinalEnabled",
        "components.redistribute",
        "scores.set",
        "scores.get",
        "indicators.add",
        "indicators.update",
        "indicators.remove",
        "indicators.list",
        "setup.get",
        "setup.update",
    ];
    for (i, method) in methods.iter().enumerate() {
        let params = if *method == "workspace.select" {
            json!({ "path": workspace.to_string_lossy() })
        } else {
            json!({})
        };
        let value = request(&mut stdin, &mut reader, &format!("m{}", i), method, params);
        assert_ne!(
            error_code(&value),
            Some("not_implemented"),
            "{} not routed",
            method
        );
    }

    let value = request(&mut stdin, &mut reader, "x", "grades.nope", json!({}));
    assert_eq!(error_code(&value), Some("not_implemented"));
}

#[test]
fn gradebook_calls_before_open_are_not_ready() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    for (i, method) in ["gradebook.get", "components.add", "indicators.add", "scores.get"]
        .iter()
        .enumerate()
    {
        let value = request(
            &mut stdin,
            &mut reader,
            &format!("n{}", i),
            method,
            json!({ "name": "Quiz", "studentId": "s1", "componentId": "c" }),
        );
        assert_eq!(error_code(&value), Some("not_ready"), "{}: {}", method, value);
    }
}

#[test]
fn malformed_line_gets_bad_json_reply() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    writeln!(stdin, "{{not json").expect("write");
    stdin.flush().expect("flush");
    let mut line = String::new();
    reader.read_line(&mut line).expect("read");
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("json");
    assert_eq!(error_code(&value), Some("bad_json"));

    // The loop keeps serving after a bad line.
    let value = request(&mut stdin, &mut reader, "h", "health", json!({}));
    assert_eq!(value.get("ok").and_then(|v| v.as_bool()), Some(true));
}
