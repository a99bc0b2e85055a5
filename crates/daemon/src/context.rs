//! Runtime context shared by the watcher and orchestrator.

use crate::config::Config;
use crate::paths::normalize;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration plus the values derived from it once at startup.
#[derive(Debug, Clone)]
pub struct Context {
    pub config: Config,
    /// Absolute, normalized input root
    pub input_root: PathBuf,
    /// Absolute, normalized output root
    pub output_root: PathBuf,
    /// Av1an worker count after resolving the default
    pub workers: u32,
}

fn absolute(path: &Path) -> io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(normalize(path))
    } else {
        Ok(normalize(&std::env::current_dir()?.join(path)))
    }
}

/// Configured worker count, or the number of logical CPUs.
pub fn resolve_workers(configured: Option<u32>) -> u32 {
    configured.unwrap_or_else(|| num_cpus::get() as u32)
}

impl Context {
    /// Build the context, making both roots absolute against the current
    /// directory.
    pub fn from_config(config: Config) -> io::Result<Self> {
        let input_root = absolute(&config.paths.input_folder)?;
        let output_root = absolute(&config.paths.output_folder)?;
        let workers = resolve_workers(config.av1an.workers);

        Ok(Self {
            config,
            input_root,
            output_root,
            workers,
        })
    }

    pub fn extensions(&self) -> &[String] {
        &self.config.watch.video_extensions
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.config.watch.check_interval_secs)
    }

    pub fn stability_window(&self) -> Option<Duration> {
        match self.config.watch.stability_wait_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.config.retry.delay_secs)
    }
}
