//! `parapet-server`: the brokerage API with CSRF protection.
//!
//! Configuration comes from an optional TOML/JSON file, `.env`, and
//! `PARAPET_*` environment variables, in that order of precedence (lowest
//! first). Command line flags override all of them.

use clap::Parser;
use parapet::config::Settings;
use parapet::core::logging::LogConfig;
use parapet::session::{MemorySessionStore, SessionSweeper};
use parapet::{AppSettings, ServerError, build_app};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "parapet-server")]
#[command(version)]
#[command(about = "Brokerage API server with stateless CSRF protection")]
struct Cli {
    /// Configuration file (.toml or .json)
    #[arg(short, long, env = "PARAPET_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on, overriding PARAPET_PORT
    #[arg(short, long)]
    port: Option<u16>,

    /// Address to bind, overriding PARAPET_HOST
    #[arg(long)]
    host: Option<String>,
}

async fn run(cli: Cli) -> Result<(), ServerError> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        settings.set("port", port.to_string());
    }
    if let Some(host) = cli.host {
        settings.set("host", host);
    }

    let config = AppSettings::from_settings(&settings)?;
    let store = Arc::new(MemorySessionStore::new(config.session.default_ttl));
    let app = build_app(config.csrf.clone(), config.session.clone(), store.clone())?;

    let listener = TcpListener::bind(config.server.addr())
        .await
        .map_err(parapet::core::Error::from)?;
    info!(
        environment = %config.server.environment,
        csrf_max_age_secs = config.csrf.max_age.as_secs(),
        csrf_rotation = config.csrf.rotate_after_verify,
        exempt_paths = ?config.csrf.exempt_paths,
        session_cleanup_secs = config.session.cleanup_interval.as_secs(),
        "Starting parapet-server"
    );

    let sweeper = SessionSweeper::spawn(store, config.session.cleanup_interval);
    let served = app
        .serve(listener, async {
            if tokio::signal::ctrl_c().await.is_err() {
                error!("Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await;
    sweeper.stop().await;
    served?;

    info!("Server stopped");
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = LogConfig::from_env().init() {
        eprintln!("{}", err);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "Server failed");
            ExitCode::FAILURE
        }
    }
}
