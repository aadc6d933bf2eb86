#![allow(dead_code)]

use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

pub fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

pub fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_gradebookd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn gradebookd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

pub fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

pub fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

pub fn error_code(value: &serde_json::Value) -> Option<&str> {
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
}

/// Selects a fresh workspace and seeds one grade with two students.
/// Returns the grade id; students are `s1` and `s2`.
pub fn seed_workspace(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    prefix: &str,
    grade_name: &str,
) -> String {
    let workspace = temp_dir(prefix);
    let _ = request_ok(
        stdin,
        reader,
        "seed-ws",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let grade = request_ok(
        stdin,
        reader,
        "seed-grade",
        "grades.upsert",
        json!({ "name": grade_name }),
    );
    let grade_id = grade
        .get("gradeId")
        .and_then(|v| v.as_str())
        .expect("gradeId")
        .to_string();
    for (sid, name) in [("s1", "Ana Gómez"), ("s2", "Luis Pérez")] {
        let _ = request_ok(
            stdin,
            reader,
            &format!("seed-{}", sid),
            "students.upsert",
            json!({ "id": sid, "gradeId": grade_id.clone(), "displayName": name }),
        );
    }
    grade_id
}

pub fn weights(view: &serde_json::Value) -> Vec<f64> {
    view.get("components")
        .and_then(|v| v.as_array())
        .expect("components")
        .iter()
        .map(|c| {
            c.get("weightPercent")
                .and_then(|v| v.as_f64())
                .expect("weightPercent")
        })
        .collect()
}

pub fn component_ids(view: &serde_json::Value) -> Vec<String> {
    view.get("components")
        .and_then(|v| v.as_array())
        .expect("components")
        .iter()
        .map(|c| c.get("id").and_then(|v| v.as_str()).expect("id").to_string())
        .collect()
}
