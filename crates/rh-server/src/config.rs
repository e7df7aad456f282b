use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use rh_fabric::DEFAULT_CHANNEL_CAPACITY;
use rh_types::{BuildInfo, ServerInfo};

use crate::error::{ServerError, ServerResult};

/// Which capture source a run listens with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    Ws,
}

impl Protocol {
    pub fn scheme(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Ws => "ws",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scheme())
    }
}

/// Everything one run needs. Every field has a default, so a TOML file may
/// set any subset of them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub address: String,
    pub port: u16,
    /// Status the HTTP capture answers every request with.
    pub response_code: u16,
    pub details: bool,
    /// Depth of each sink's event channel.
    pub channel_capacity: usize,
    pub web: WebConfig,
    pub log: LogConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            address: "localhost".into(),
            port: 8080,
            response_code: 200,
            details: false,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            web: WebConfig::default(),
            log: LogConfig::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Use the web store instead of the terminal printer.
    pub enabled: bool,
    pub address: String,
    pub port: u16,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            address: "localhost".into(),
            port: 8081,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Append every event to this file.
    pub file: Option<PathBuf>,
}

impl RunConfig {
    pub fn from_file(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|err| {
            ServerError::Config(format!("cannot read {}: {err}", path.display()))
        })?;
        Self::from_toml_str(&text)
            .map_err(|err| ServerError::Config(format!("{}: {err}", path.display())))
    }

    pub fn from_toml_str(text: &str) -> ServerResult<Self> {
        toml::from_str(text).map_err(|err| ServerError::Config(err.to_string()))
    }

    /// Reject values no run can start with.
    pub fn validate(&self) -> ServerResult<()> {
        if !(100..=999).contains(&self.response_code) {
            return Err(ServerError::Config(format!(
                "response code {} is outside 100..=999",
                self.response_code
            )));
        }
        if self.channel_capacity == 0 {
            return Err(ServerError::Config("channel capacity must be at least 1".into()));
        }
        if self.address.trim().is_empty() {
            return Err(ServerError::Config("address must not be empty".into()));
        }
        if self.web.enabled && self.web.address.trim().is_empty() {
            return Err(ServerError::Config("web address must not be empty".into()));
        }
        Ok(())
    }

    /// The configuration echo served to the web UI.
    pub fn server_info(&self, protocol: Protocol) -> ServerInfo {
        ServerInfo {
            address: self.address.clone(),
            port: self.port,
            protocol: protocol.scheme().into(),
            response_code: self.response_code,
            details: self.details,
            log_file: self.log.file.as_ref().map(|p| p.display().to_string()),
            web_address: self.web.address.clone(),
            web_port: self.web.port,
            build_info: BuildInfo::current(),
        }
    }
}
