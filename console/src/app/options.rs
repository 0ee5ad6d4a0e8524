//! Application configuration options

use std::time::Duration;

use secrecy::SecretString;

use crate::http::HttpOptions;
use crate::session::CloudOptions;
use crate::storage::layout::StorageLayout;
use crate::storage::settings::Settings;
use crate::workers::poller;

/// Who to log in as
#[derive(Debug)]
pub struct Credentials {
    pub user: String,
    pub org: String,
    pub password: SecretString,
}

/// Main application options
#[derive(Debug)]
pub struct AppOptions {
    pub lifecycle: LifecycleOptions,

    pub cloud: CloudOptions,

    pub http: HttpOptions,

    /// Log in on start-up; without credentials the console only serves the restored cache
    pub credentials: Option<Credentials>,

    pub storage: StorageOptions,

    /// Enable local HTTP server
    pub enable_socket_server: bool,

    /// Enable task poller
    pub enable_poller: bool,

    pub server: ServerOptions,

    pub poller: poller::Options,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            lifecycle: LifecycleOptions::default(),
            cloud: CloudOptions::default(),
            http: HttpOptions::default(),
            credentials: None,
            storage: StorageOptions::default(),
            enable_socket_server: true,
            enable_poller: true,
            server: ServerOptions::default(),
            poller: poller::Options::default(),
        }
    }
}

impl AppOptions {
    pub fn from_settings(settings: &Settings, layout: StorageLayout) -> Self {
        let cache_file = settings
            .cache
            .file
            .as_ref()
            .map(crate::filesys::file::File::new)
            .unwrap_or_else(|| layout.cache_blob_file());
        Self {
            cloud: settings.cloud_options(),
            http: settings.http_options(),
            storage: StorageOptions {
                persist_cache: settings.cache.persist,
                cache_file,
                layout,
            },
            enable_socket_server: settings.server.enabled,
            enable_poller: settings.poller.enabled,
            server: ServerOptions {
                host: settings.server.host.clone(),
                port: settings.server.port,
            },
            poller: settings.poller_options(),
            ..Default::default()
        }
    }
}

/// Lifecycle options
#[derive(Debug, Clone)]
pub struct LifecycleOptions {
    /// Maximum delay for graceful shutdown
    pub max_shutdown_delay: Duration,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            max_shutdown_delay: Duration::from_secs(30),
        }
    }
}

/// Storage configuration options
#[derive(Debug, Clone)]
pub struct StorageOptions {
    pub layout: StorageLayout,

    /// Restore the cache blob on start and save it on shutdown
    pub persist_cache: bool,

    pub cache_file: crate::filesys::file::File,
}

impl Default for StorageOptions {
    fn default() -> Self {
        let layout = StorageLayout::default();
        Self {
            cache_file: layout.cache_blob_file(),
            persist_cache: true,
            layout,
        }
    }
}

/// Local HTTP server options
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8480,
        }
    }
}
