use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use thiserror::Error;
use tracing::{error, info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

mod api;
mod models;
mod services;
mod settings;
mod utils;
mod web;

use api::monzo::MonzoClient;
use services::export_service::OUTPUT_DIR;
use settings::SettingsError;
use utils::StateToken;
use web::AppState;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    #[value(alias = "fatal", alias = "panic")]
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

/// Export Monzo transactions to an OFX file
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Log verbosity; RUST_LOG overrides it when set
    #[arg(long = "log-level", alias = "logLevel", value_enum, default_value_t = LogLevel::Warn)]
    log_level: LogLevel,
}

/// Failures that stop the process before the server is up
#[derive(Debug, Error)]
enum StartupError {
    #[error("Failed to load settings: {0}")]
    Settings(#[from] SettingsError),
    #[error("Cannot determine working directory: {0}")]
    WorkingDir(#[source] std::io::Error),
    #[error("{0}")]
    AuthUrl(String),
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::from(args.log_level).into())
                .from_env_lossy(),
        )
        .with_target(true)
        .init();

    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), StartupError> {
    let cwd = std::env::current_dir().map_err(StartupError::WorkingDir)?;

    info!("Getting settings");
    let settings = {
        let stdin = std::io::stdin();
        settings::load_settings(&cwd, &mut stdin.lock(), &mut std::io::stdout())?
    };

    let client = match env_var("MONZO_API_URL") {
        Some(api_url) => MonzoClient::with_base_url(settings, api_url),
        None => MonzoClient::new(settings),
    };
    let auth_url = env_var("MONZO_AUTH_URL").unwrap_or_else(|| web::DEFAULT_AUTH_URL.to_string());
    let output_dir: PathBuf = cwd.join(OUTPUT_DIR);

    let state = AppState::new(client, StateToken::generate(), output_dir, &auth_url)
        .map_err(StartupError::AuthUrl)?;
    let app = web::router(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(web::LISTEN_ADDR)
        .await
        .map_err(|source| StartupError::Bind {
            addr: web::LISTEN_ADDR,
            source,
        })?;

    info!("Running webserver on {}", web::LISTEN_ADDR);
    println!("Open {} in your browser to export your transactions", web::INDEX_URL);
    open_browser(web::INDEX_URL, |url| open::that_detached(url));

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(StartupError::Serve)?;

    info!("Webserver stopped");
    Ok(())
}

/// Point the default browser at `url`. The URL is already on stdout, so a
/// failure only warns.
fn open_browser<F>(url: &str, opener: F) -> bool
where
    F: FnOnce(&str) -> std::io::Result<()>,
{
    match opener(url) {
        Ok(()) => {
            info!("Opened {} in the default browser", url);
            true
        }
        Err(e) => {
            warn!("Could not open a browser, visit {} manually: {}", url, e);
            false
        }
    }
}

fn env_var(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.is_empty())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
