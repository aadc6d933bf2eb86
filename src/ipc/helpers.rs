use crate::ipc::error::err;
use crate::ipc::types::Request;

/// Parameter lookups return a ready-made `bad_params` response on failure.
pub fn required_str<'a>(req: &'a Request, key: &str) -> Result<&'a str, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

pub fn optional_str<'a>(req: &'a Request, key: &str) -> Result<Option<&'a str>, serde_json::Value> {
    match req.params.get(key) {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => v.as_str().map(Some).ok_or_else(|| {
            err(
                &req.id,
                "bad_params",
                format!("{} must be a string", key),
                None,
            )
        }),
    }
}

pub fn required_i64(req: &Request, key: &str) -> Result<i64, serde_json::Value> {
    req.params.get(key).and_then(|v| v.as_i64()).ok_or_else(|| {
        err(
            &req.id,
            "bad_params",
            format!("missing/invalid {}", key),
            None,
        )
    })
}

pub fn required_bool(req: &Request, key: &str) -> Result<bool, serde_json::Value> {
    req.params.get(key).and_then(|v| v.as_bool()).ok_or_else(|| {
        err(
            &req.id,
            "bad_params",
            format!("missing/invalid {}", key),
            None,
        )
    })
}
