use serde::{Deserialize, Serialize};

/// Build metadata of the running binary.
///
/// Values come from optional compile-time environment variables
/// (`RH_COMMIT`, `RH_BUILD_DATE`, `RH_BUILT_BY`); unset ones keep defaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    pub version: String,
    pub commit: String,
    pub date: String,
    pub repo: String,
    pub built_by: String,
}

impl BuildInfo {
    pub fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").into(),
            commit: option_env!("RH_COMMIT").unwrap_or("none").into(),
            date: option_env!("RH_BUILD_DATE").unwrap_or("unknown").into(),
            repo: env!("CARGO_PKG_REPOSITORY").into(),
            built_by: option_env!("RH_BUILT_BY").unwrap_or("dev").into(),
        }
    }
}

impl Default for BuildInfo {
    fn default() -> Self {
        Self::current()
    }
}

/// Echo of the configuration a run was started with.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    pub address: String,
    pub port: u16,
    /// `http` or `ws`.
    pub protocol: String,
    pub response_code: u16,
    pub details: bool,
    pub log_file: Option<String>,
    pub web_address: String,
    pub web_port: u16,
    pub build_info: BuildInfo,
}

impl ServerInfo {
    /// URL of the capture endpoint, e.g. `http://localhost:8080`.
    pub fn listen_url(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.address, self.port)
    }

    pub fn web_url(&self) -> String {
        format!("http://{}:{}", self.web_address, self.web_port)
    }
}
