use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use client_core::{
    config::{parse_continuation, parse_endpoint, DEFAULT_ENDPOINT, DEFAULT_REQUEST_TIMEOUT},
    ClientConfig, ConfigError, StartupMode,
};
use shared::protocol::ContinuationStyle;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub endpoint: String,
    pub output_dir: PathBuf,
    pub timeout_ms: u64,
    pub startup: StartupMode,
    pub continuation: ContinuationStyle,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.into(),
            output_dir: PathBuf::from("./tiles"),
            timeout_ms: DEFAULT_REQUEST_TIMEOUT.as_millis() as u64,
            startup: StartupMode::Reset,
            continuation: ContinuationStyle::Bare,
        }
    }
}

impl Settings {
    pub fn client_config(&self) -> Result<ClientConfig, ConfigError> {
        Ok(ClientConfig {
            endpoint: parse_endpoint(&self.endpoint)?,
            request_timeout: Duration::from_millis(self.timeout_ms),
            startup: self.startup,
            continuation: self.continuation,
        })
    }
}

/// Defaults, then `path` if it exists, then the process environment.
pub fn load_settings(path: &Path) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        apply_file(&mut settings, &raw);
    }
    apply_env(&mut settings, |key| std::env::var(key).ok());

    settings
}

pub fn apply_file(settings: &mut Settings, raw: &str) {
    let file_cfg = match toml::from_str::<HashMap<String, toml::Value>>(raw) {
        Ok(file_cfg) => file_cfg,
        Err(error) => {
            warn!(%error, "ignoring unreadable viewer config");
            return;
        }
    };

    let text = |key: &str| {
        file_cfg.get(key).map(|value| match value {
            toml::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    };

    if let Some(v) = text("endpoint") {
        settings.endpoint = v;
    }
    if let Some(v) = text("output_dir") {
        settings.output_dir = PathBuf::from(v);
    }
    if let Some(v) = text("timeout_ms") {
        set_timeout(settings, &v);
    }
    if let Some(v) = text("startup") {
        set_startup(settings, &v);
    }
    if let Some(v) = text("continuation") {
        set_continuation(settings, &v);
    }
}

pub fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("VIEWER_ENDPOINT") {
        settings.endpoint = v;
    }
    if let Some(v) = lookup("APP__ENDPOINT") {
        settings.endpoint = v;
    }

    if let Some(v) = lookup("APP__OUTPUT_DIR") {
        settings.output_dir = PathBuf::from(v);
    }

    if let Some(v) = lookup("APP__TIMEOUT_MS") {
        set_timeout(settings, &v);
    }
    if let Some(v) = lookup("APP__STARTUP") {
        set_startup(settings, &v);
    }
    if let Some(v) = lookup("APP__CONTINUATION") {
        set_continuation(settings, &v);
    }
}

fn set_timeout(settings: &mut Settings, raw: &str) {
    match raw.trim().parse::<u64>() {
        Ok(parsed) if parsed > 0 => settings.timeout_ms = parsed,
        _ => warn!(value = raw, "ignoring invalid timeout_ms"),
    }
}

fn set_startup(settings: &mut Settings, raw: &str) {
    match raw.parse::<StartupMode>() {
        Ok(startup) => settings.startup = startup,
        Err(error) => warn!(%error, "ignoring startup setting"),
    }
}

fn set_continuation(settings: &mut Settings, raw: &str) {
    match parse_continuation(raw) {
        Ok(continuation) => settings.continuation = continuation,
        Err(error) => warn!(%error, "ignoring continuation setting"),
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
