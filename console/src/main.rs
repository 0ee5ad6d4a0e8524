//! Cloud console entry point
//!
//! Logs into a Cloud Director organization, keeps a local model of its vApps, VMs,
//! catalog and tasks, and serves it over a local HTTP API.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use cloud_console::app::options::{AppOptions, Credentials};
use cloud_console::app::run::run;
use cloud_console::filesys::file::File;
use cloud_console::logs::{init_logging, LogOptions};
use cloud_console::storage::layout::StorageLayout;
use cloud_console::storage::settings::Settings;
use cloud_console::utils::version_info;

use secrecy::SecretString;
use tracing::{error, info, warn};

const PASSWORD_ENV: &str = "VCD_PASSWORD";

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    let version = version_info();
    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Failed to render version: {e}"),
        }
        return;
    }

    let layout = match cli_args.get("dir") {
        Some(dir) => StorageLayout::new(PathBuf::from(dir)),
        None => StorageLayout::default(),
    };

    // Retrieve the settings file
    let settings_file = match cli_args.get("config") {
        Some(path) => File::new(path),
        None => layout.settings_file(),
    };
    let settings = match Settings::load(&settings_file).await {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Unable to read settings file {}: {e}", settings_file.path().display());
            return;
        }
    };

    // Initialize logging
    let log_options = LogOptions {
        log_level: settings.log_level.clone(),
        json_format: settings.log_json,
        log_dir: cli_args
            .contains_key("log-file")
            .then(|| layout.logs_dir().path().to_path_buf()),
        ..Default::default()
    };
    let _log_guard = match init_logging(log_options) {
        Ok(guard) => guard,
        Err(e) => {
            println!("Failed to initialize logging: {e}");
            None
        }
    };

    let mut options = AppOptions::from_settings(&settings, layout);
    options.credentials = credentials(&cli_args);

    info!("Running cloud console {} against {}", version.version, options.cloud.base_url);
    if let Err(e) = run(options, await_shutdown_signal()).await {
        error!("Failed to run the console: {e}");
    }
}

fn credentials(cli_args: &HashMap<String, String>) -> Option<Credentials> {
    let (user, org) = match (cli_args.get("user"), cli_args.get("org")) {
        (Some(user), Some(org)) => (user.clone(), org.clone()),
        (None, None) => return None,
        _ => {
            warn!("Both --user and --org are needed to log in");
            return None;
        }
    };
    match env::var(PASSWORD_ENV) {
        Ok(password) => Some(Credentials {
            user,
            org,
            password: SecretString::from(password),
        }),
        Err(_) => {
            warn!("{} is not set, not logging in", PASSWORD_ENV);
            None
        }
    }
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut sigterm, mut sigint) = match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
            _ => {
                error!("Failed to install signal handlers, waiting for Ctrl+C only");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down...");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
        }
        info!("Ctrl+C received, shutting down...");
    }
}
