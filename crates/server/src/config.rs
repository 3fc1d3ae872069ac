use std::{collections::HashMap, fs, time::Duration};

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server_bind: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub fetch_timeout_secs: u64,
    pub user_agent: String,
    pub max_sessions: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:8000".into(),
            chunk_size: 5000,
            chunk_overlap: 200,
            top_k: 8,
            fetch_timeout_secs: 30,
            user_agent: concat!("page-chat-server/", env!("CARGO_PKG_VERSION")).into(),
            max_sessions: 256,
        }
    }
}

impl Settings {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("server.toml") {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, toml::Value>>(&raw) {
            apply_file(&mut settings, &file_cfg);
        }
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    sanitize(&mut settings);
    settings
}

fn apply_file(settings: &mut Settings, file_cfg: &HashMap<String, toml::Value>) {
    if let Some(v) = file_cfg.get("server_bind").and_then(toml::Value::as_str) {
        settings.server_bind = v.to_string();
    }
    if let Some(v) = file_cfg.get("user_agent").and_then(toml::Value::as_str) {
        settings.user_agent = v.to_string();
    }
    if let Some(v) = file_usize(file_cfg, "chunk_size") {
        settings.chunk_size = v;
    }
    if let Some(v) = file_usize(file_cfg, "chunk_overlap") {
        settings.chunk_overlap = v;
    }
    if let Some(v) = file_usize(file_cfg, "top_k") {
        settings.top_k = v;
    }
    if let Some(v) = file_usize(file_cfg, "max_sessions") {
        settings.max_sessions = v;
    }
    if let Some(v) = file_usize(file_cfg, "fetch_timeout_secs") {
        settings.fetch_timeout_secs = v as u64;
    }
}

fn file_usize(file_cfg: &HashMap<String, toml::Value>, key: &str) -> Option<usize> {
    file_cfg
        .get(key)
        .and_then(toml::Value::as_integer)
        .and_then(|v| usize::try_from(v).ok())
}

fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("SERVER_BIND") {
        settings.server_bind = v;
    }
    if let Some(v) = var("APP__BIND_ADDR") {
        settings.server_bind = v;
    }

    if let Some(v) = var("APP__CHUNK_SIZE").and_then(|v| v.parse().ok()) {
        settings.chunk_size = v;
    }
    if let Some(v) = var("APP__CHUNK_OVERLAP").and_then(|v| v.parse().ok()) {
        settings.chunk_overlap = v;
    }
    if let Some(v) = var("APP__TOP_K").and_then(|v| v.parse().ok()) {
        settings.top_k = v;
    }
    if let Some(v) = var("APP__FETCH_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
        settings.fetch_timeout_secs = v;
    }
    if let Some(v) = var("APP__MAX_SESSIONS").and_then(|v| v.parse().ok()) {
        settings.max_sessions = v;
    }
    if let Some(v) = var("APP__USER_AGENT") {
        settings.user_agent = v;
    }
}

/// Overlap must stay below the chunk size or chunking would never advance.
fn sanitize(settings: &mut Settings) {
    let defaults = Settings::default();
    if settings.chunk_size == 0 {
        settings.chunk_size = defaults.chunk_size;
    }
    if settings.chunk_overlap >= settings.chunk_size {
        settings.chunk_overlap = settings.chunk_size / 2;
    }
    if settings.top_k == 0 {
        settings.top_k = defaults.top_k;
    }
    if settings.max_sessions == 0 {
        settings.max_sessions = defaults.max_sessions;
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
