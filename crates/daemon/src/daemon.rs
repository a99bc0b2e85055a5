//! Daemon startup and main loop
//!
//! Creates the input/output roots, loads history, starts the directory
//! watcher and feeds its events to the orchestrator until shutdown.

use crate::config::{Config, ConfigError};
use crate::context::Context;
use crate::history::HistoryStore;
use crate::orchestrator::{Orchestrator, RunStats};
use crate::scan::scan_for_videos;
use crate::startup::{ensure_dir, run_startup_checks, StartupError};
use crate::watcher::{DirectoryWatcher, WatchError};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::info;

/// Error type for daemon operations
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Startup check failed
    #[error("Startup check failed: {0}")]
    Startup(#[from] StartupError),

    /// Current directory could not be determined
    #[error("Failed to resolve folders: {0}")]
    Resolve(#[source] std::io::Error),

    /// Watcher could not be started
    #[error("Watcher error: {0}")]
    Watch(#[from] WatchError),
}

/// Daemon state containing all runtime components
pub struct Daemon {
    /// Configuration and derived roots
    pub ctx: Arc<Context>,
    orchestrator: Orchestrator,
}

impl Daemon {
    /// Initialize the daemon with configuration from file
    ///
    /// This performs the full startup sequence:
    /// 1. Load config from file (defaults if absent) and apply env overrides
    /// 2. Run startup checks (encoder available)
    /// 3. Create input and output roots
    /// 4. Load history
    pub fn new<P: AsRef<Path>>(config_path: P) -> Result<Self, DaemonError> {
        let config = Config::load_or_default(config_path)?;
        Self::with_config(config)
    }

    /// Initialize the daemon with an existing configuration
    pub fn with_config(config: Config) -> Result<Self, DaemonError> {
        run_startup_checks(&config)?;
        Self::new_without_checks(config)
    }

    /// Initialize the daemon without running startup checks
    ///
    /// Useful for testing when the encoder is not installed.
    pub fn new_without_checks(config: Config) -> Result<Self, DaemonError> {
        let ctx = Context::from_config(config).map_err(DaemonError::Resolve)?;
        ensure_dir(&ctx.input_root)?;
        ensure_dir(&ctx.output_root)?;

        let history = HistoryStore::load(&ctx.config.paths.history_file);
        info!(
            history_file = %history.path().display(),
            records = history.len(),
            "history loaded"
        );

        let ctx = Arc::new(ctx);
        let orchestrator = Orchestrator::new(ctx.clone(), history);

        Ok(Self { ctx, orchestrator })
    }

    /// Watch the input root and process files until `shutdown` resolves
    ///
    /// On shutdown the in-flight job (if any) finishes, the watcher is
    /// stopped and the final counters are returned.
    pub async fn run<F>(mut self, shutdown: F) -> Result<RunStats, DaemonError>
    where
        F: Future<Output = ()>,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let watcher = DirectoryWatcher::start(
            &self.ctx.input_root,
            self.ctx.extensions().to_vec(),
            self.ctx.check_interval(),
            tx.clone(),
        )?;
        info!(
            input = %watcher.root().display(),
            output = %self.ctx.output_root.display(),
            "started watching for new videos"
        );

        if self.ctx.config.watch.scan_on_startup {
            let existing = scan_for_videos(&self.ctx.input_root, self.ctx.extensions());
            info!(count = existing.len(), "queueing existing videos");
            for path in existing {
                if tx.send(path).is_err() {
                    break;
                }
            }
        }
        drop(tx);

        self.orchestrator.run(rx, shutdown).await;
        drop(watcher);

        let stats = self.orchestrator.stats();
        info!(
            succeeded = stats.succeeded,
            failed = stats.failed,
            errored = stats.errored,
            interrupted = stats.interrupted,
            skipped = stats.already_done,
            filtered_out = stats.filtered_out,
            "stopping video transcoder"
        );
        Ok(stats)
    }
}
