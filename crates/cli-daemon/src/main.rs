//! CLI entry point for the AV1 watch-folder transcoder
//!
//! Parses command line arguments, installs logging and runs the daemon until
//! Ctrl-C or SIGTERM.

use av1_watch_transcoder::config::LogFormat;
use av1_watch_transcoder::{Config, Daemon};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// AV1 watch-folder transcoder - encodes every new video in a folder once
#[derive(Parser, Debug)]
#[command(name = "av1-watch-transcoder")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (built-in defaults when absent)
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Skip the encoder availability check. For testing only.
    #[arg(long, default_value = "false")]
    skip_checks: bool,

    /// Log format, overriding the configuration file
    #[arg(long)]
    log_format: Option<LogFormat>,
}

fn init_logging(format: LogFormat, level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

/// Resolves on Ctrl-C, or SIGTERM on Unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match Config::load_or_default(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_logging(
        args.log_format.unwrap_or(config.logging.format),
        &config.logging.level,
    );
    info!(config_file = %args.config.display(), "AV1 watch-folder transcoder starting");

    let daemon_result = if args.skip_checks {
        warn!("skipping startup checks (--skip-checks enabled)");
        Daemon::new_without_checks(config)
    } else {
        Daemon::with_config(config)
    };

    let daemon = match daemon_result {
        Ok(daemon) => daemon,
        Err(e) => {
            error!(error = %e, "failed to initialize daemon");
            return ExitCode::FAILURE;
        }
    };

    info!(
        workers = daemon.ctx.workers,
        encoder = %daemon.ctx.config.av1an.encoder,
        target_quality = daemon.ctx.config.av1an.target_quality,
        "daemon initialized"
    );

    match daemon.run(shutdown_signal()).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "daemon error");
            ExitCode::FAILURE
        }
    }
}
