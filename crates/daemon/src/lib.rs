//! AV1 watch-folder transcoder
//!
//! Watches an input tree for new videos, runs Av1an on each one exactly once
//! and records completed work in a JSON history so restarts do not redo it.

pub mod context;
pub mod daemon;
pub mod encode;
pub mod history;
pub mod jobs;
pub mod orchestrator;
pub mod paths;
pub mod scan;
pub mod stability;
pub mod startup;
pub mod watcher;

#[cfg(test)]
mod testing;

pub use av1_watch_transcoder_config as config;
pub use av1_watch_transcoder_config::Config;
pub use context::Context;
pub use daemon::{Daemon, DaemonError};
pub use encode::{build_av1an_command, run_av1an, Av1anEncodeParams, EncodeError, EncodeOutcome};
pub use history::{HistoryError, HistoryRecord, HistoryStore};
pub use jobs::{JobStatus, TranscodeJob};
pub use orchestrator::{Disposition, JobError, Orchestrator, RunStats};
pub use paths::{history_key, map_output_path, PathError};
pub use scan::{is_qualifying, scan_for_videos};
pub use startup::{check_encoder_available, run_startup_checks, StartupError};
pub use watcher::{DirectoryWatcher, WatchError};
