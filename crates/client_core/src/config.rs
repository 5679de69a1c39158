use std::{str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};
use shared::protocol::{ContinuationStyle, NavigationIntent};
use thiserror::Error;
use url::Url;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000/image/";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid endpoint '{raw}': {source}")]
    InvalidEndpoint {
        raw: String,
        #[source]
        source: url::ParseError,
    },
    #[error("endpoint '{0}' must use http or https")]
    UnsupportedScheme(String),
    #[error("invalid value '{value}' for {key}")]
    InvalidValue { key: &'static str, value: String },
}

/// What the first episode of a session asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartupMode {
    #[default]
    Reset,
    /// For servers whose parameterless request already yields the default view.
    Bare,
}

impl StartupMode {
    pub fn intent(self) -> NavigationIntent {
        match self {
            StartupMode::Reset => NavigationIntent::Reset,
            StartupMode::Bare => NavigationIntent::Continue,
        }
    }
}

impl FromStr for StartupMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reset" => Ok(StartupMode::Reset),
            "bare" | "none" => Ok(StartupMode::Bare),
            _ => Err(ConfigError::InvalidValue {
                key: "startup",
                value: s.to_string(),
            }),
        }
    }
}

pub fn parse_continuation(raw: &str) -> Result<ContinuationStyle, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "bare" | "none" => Ok(ContinuationStyle::Bare),
        "marker" | "ctd" => Ok(ContinuationStyle::Marker),
        _ => Err(ConfigError::InvalidValue {
            key: "continuation",
            value: raw.to_string(),
        }),
    }
}

pub fn parse_endpoint(raw: &str) -> Result<Url, ConfigError> {
    let raw = raw.trim();
    let url = Url::parse(raw).map_err(|source| ConfigError::InvalidEndpoint {
        raw: raw.to_string(),
        source,
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(ConfigError::UnsupportedScheme(raw.to_string())),
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoint: Url,
    pub request_timeout: Duration,
    pub startup: StartupMode,
    pub continuation: ContinuationStyle,
}

impl ClientConfig {
    pub fn with_endpoint(raw: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            endpoint: parse_endpoint(raw)?,
            ..Self::default()
        })
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: Url::parse(DEFAULT_ENDPOINT).expect("default endpoint is a valid url"),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            startup: StartupMode::default(),
            continuation: ContinuationStyle::default(),
        }
    }
}
