//! Settings file management

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::CloudError;
use crate::filesys::file::File;
use crate::http::HttpOptions;
use crate::logs::LogLevel;
use crate::session::CloudOptions;
use crate::workers::poller;

/// Console settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit JSON log lines
    #[serde(default)]
    pub log_json: bool,

    #[serde(default)]
    pub api: ApiSettings,

    #[serde(default)]
    pub poller: PollerSettings,

    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub cache: CacheSettings,
}

impl Settings {
    /// Read the settings file, falling back to defaults when it does not exist
    pub async fn load(file: &File) -> Result<Self, CloudError> {
        if !file.exists().await {
            info!("No settings at {}, using defaults", file.path().display());
            return Ok(Self::default());
        }
        file.read_json().await
    }

    pub fn cloud_options(&self) -> CloudOptions {
        CloudOptions {
            base_url: self.api.base_url.clone(),
            version: self.api.version.clone(),
            passive_refresh: self.poller.passive_refresh,
            console_sdk_port: self.api.console_sdk_port,
        }
    }

    pub fn http_options(&self) -> HttpOptions {
        HttpOptions {
            timeout: Duration::from_secs(self.api.request_timeout_secs),
            accept_invalid_certs: self.api.accept_invalid_certs,
        }
    }

    pub fn poller_options(&self) -> poller::Options {
        poller::Options {
            check_interval: Duration::from_secs(self.poller.check_interval_secs),
            passive_interval: Duration::from_secs(self.poller.passive_interval_secs),
            passive_refresh: self.poller.passive_refresh,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Cloud API settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Lab installations often run with self-signed certificates
    #[serde(default)]
    pub accept_invalid_certs: bool,

    #[serde(default = "default_console_sdk_port")]
    pub console_sdk_port: u16,
}

fn default_base_url() -> String {
    "https://localhost/api/".to_string()
}

fn default_version() -> String {
    "5.1".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_console_sdk_port() -> u16 {
    9443
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            version: default_version(),
            request_timeout_secs: default_request_timeout(),
            accept_invalid_certs: false,
            console_sdk_port: default_console_sdk_port(),
        }
    }
}

/// Task poller settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollerSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,

    #[serde(default = "default_passive_interval")]
    pub passive_interval_secs: u64,

    #[serde(default = "default_true")]
    pub passive_refresh: bool,
}

fn default_check_interval() -> u64 {
    5
}

fn default_passive_interval() -> u64 {
    10
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            check_interval_secs: default_check_interval(),
            passive_interval_secs: default_passive_interval(),
            passive_refresh: true,
        }
    }
}

/// Local API settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8480
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Cache blob persistence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_true")]
    pub persist: bool,

    /// Blob file; defaults to `cache.json` under the storage directory
    #[serde(default)]
    pub file: Option<String>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            persist: true,
            file: None,
        }
    }
}
