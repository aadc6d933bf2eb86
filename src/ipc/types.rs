use std::path::PathBuf;

use crate::config::GradingPolicy;
use crate::gradebook::Gradebook;
use rusqlite::Connection;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    pub gradebook: Gradebook,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            workspace: None,
            db: None,
            gradebook: Gradebook::new(GradingPolicy::default()),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
