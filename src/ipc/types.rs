use std::collections::HashMap;

use serde::Deserialize;

use crate::config::Config;
use crate::dashboard::Dashboard;
use crate::sync::DeleteIntent;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub config: Config,
    /// Where the current session's records live, as reported by `health`.
    pub backend: Option<String>,
    pub dashboard: Option<Dashboard>,
    /// Delete confirmations handed out by `*.delete`, keyed by token.
    pub pending_deletes: HashMap<String, DeleteIntent>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            backend: None,
            dashboard: None,
            pending_deletes: HashMap::new(),
        }
    }
}
