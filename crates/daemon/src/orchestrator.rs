//! Orchestrator: the single consumer of watcher events.
//!
//! Each created path goes through
//! `Seen → FilteredOut | AlreadyDone | Dispatched → Succeeded | Failed | Interrupted`.
//! Jobs run one at a time; the next event is not taken from the channel
//! until the current job has finished. Every per-file problem ends in a
//! [`Disposition`] and is logged; nothing escapes to the watch loop.
//!
//! Shutdown interrupts a job only while it is waiting: on the stability
//! window or between retries. A running encoder is always allowed to finish.

use crate::context::Context;
use crate::encode::{run_av1an_blocking, Av1anEncodeParams, EncodeError, EncodeOutcome};
use crate::history::{HistoryError, HistoryStore};
use crate::jobs::{JobStatus, TranscodeJob};
use crate::paths::{history_key, map_output_path, PathError};
use crate::scan::is_qualifying;
use crate::stability::wait_until_stable;
use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Anything that aborts one file's job before an encoder outcome is known
#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error("History write failed: {0}")]
    History(#[from] HistoryError),

    #[error("Stability check failed: {0}")]
    Stability(std::io::Error),
}

/// Terminal state of one processed path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Directory, or a file without a watched extension
    FilteredOut,
    /// Already recorded in history
    AlreadyDone,
    /// Encoded and recorded
    Succeeded {
        output_path: PathBuf,
        original_removed: bool,
    },
    /// Encoder exited non-zero on every attempt; history untouched
    Failed { diagnostic: String },
    /// Job aborted by an I/O or path error; history untouched
    Errored { message: String },
    /// Shutdown arrived while the job was waiting; history untouched
    Interrupted,
}

/// Disposition counters for the lifetime of an orchestrator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub filtered_out: u64,
    pub already_done: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub errored: u64,
    pub interrupted: u64,
}

impl RunStats {
    fn count(&mut self, disposition: &Disposition) {
        match disposition {
            Disposition::FilteredOut => self.filtered_out += 1,
            Disposition::AlreadyDone => self.already_done += 1,
            Disposition::Succeeded { .. } => self.succeeded += 1,
            Disposition::Failed { .. } => self.failed += 1,
            Disposition::Errored { .. } => self.errored += 1,
            Disposition::Interrupted => self.interrupted += 1,
        }
    }
}

pub struct Orchestrator {
    ctx: Arc<Context>,
    history: HistoryStore,
    stats: RunStats,
    stop_tx: Arc<watch::Sender<bool>>,
    stop_rx: watch::Receiver<bool>,
}

impl Orchestrator {
    pub fn new(ctx: Arc<Context>, history: HistoryStore) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        Self {
            ctx,
            history,
            stats: RunStats::default(),
            stop_tx: Arc::new(stop_tx),
            stop_rx,
        }
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn stats(&self) -> RunStats {
        self.stats
    }

    /// Consume created paths until the channel closes or `shutdown` resolves.
    ///
    /// A shutdown during a job cuts short any stability or retry wait; an
    /// encode already running completes and commits before this returns.
    pub async fn run<F>(&mut self, mut events: UnboundedReceiver<PathBuf>, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let stop = self.stop_tx.clone();
        stop.send_replace(false);
        let mut stopping = false;

        while !stopping {
            let path = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("shutdown requested");
                    stop.send_replace(true);
                    break;
                }
                event = events.recv() => match event {
                    Some(path) => path,
                    None => break,
                },
            };

            let current = self.handle(&path);
            tokio::pin!(current);
            loop {
                tokio::select! {
                    biased;
                    _ = &mut current => break,
                    _ = &mut shutdown, if !stopping => {
                        info!(file = %path.display(), "shutdown requested, finishing current job");
                        stopping = true;
                        stop.send_replace(true);
                    }
                }
            }
        }
    }

    /// Process one created path to a terminal disposition.
    pub async fn handle(&mut self, path: &Path) -> Disposition {
        let disposition = self.process(path).await;
        self.stats.count(&disposition);
        disposition
    }

    async fn process(&mut self, path: &Path) -> Disposition {
        if path.is_dir() || !is_qualifying(path, self.ctx.extensions()) {
            debug!(file = %path.display(), "ignoring non-video path");
            return Disposition::FilteredOut;
        }

        let key = history_key(path);
        if self.history.contains(&key) {
            info!(file = %key, "file already transcoded, skipping");
            return Disposition::AlreadyDone;
        }

        match self.transcode(path, &key).await {
            Ok(disposition) => disposition,
            Err(e) => {
                error!(file = %key, error = %e, "error processing file");
                Disposition::Errored {
                    message: e.to_string(),
                }
            }
        }
    }

    fn encode_params(&self, job: &TranscodeJob) -> Av1anEncodeParams {
        let av1an = &self.ctx.config.av1an;
        Av1anEncodeParams {
            binary: av1an.binary.clone(),
            input_path: job.source_path.clone(),
            output_path: job.output_path.clone(),
            encoder: av1an.encoder.clone(),
            workers: self.ctx.workers,
            target_quality: av1an.target_quality,
        }
    }

    async fn transcode(&mut self, source: &Path, key: &str) -> Result<Disposition, JobError> {
        let output_path = map_output_path(
            source,
            &self.ctx.input_root,
            &self.ctx.output_root,
            &self.ctx.config.transcode.suffix,
        )?;
        let mut job = TranscodeJob::new(source.to_path_buf(), output_path);
        let mut stop = self.stop_rx.clone();

        if let Some(window) = self.ctx.stability_window() {
            match until_stopped(&mut stop, wait_until_stable(source, window)).await {
                Some(result) => {
                    result.map_err(JobError::Stability)?;
                }
                None => {
                    info!(file = %key, "shutdown while waiting for file to settle");
                    return Ok(Disposition::Interrupted);
                }
            }
        }

        let max_attempts = self.ctx.config.retry.attempts.saturating_add(1);
        loop {
            job.start_attempt();
            info!(
                job_id = %job.id,
                file = %key,
                output = %job.output_path.display(),
                attempt = job.attempts,
                "starting transcoding"
            );

            match run_av1an_blocking(self.encode_params(&job)).await? {
                EncodeOutcome::Success => return self.commit(job, key),
                EncodeOutcome::Failure {
                    exit_code,
                    diagnostic,
                } => {
                    error!(
                        job_id = %job.id,
                        file = %key,
                        exit_code = ?exit_code,
                        attempt = job.attempts,
                        diagnostic = %diagnostic,
                        "failed to transcode"
                    );

                    if job.attempts < max_attempts {
                        let delay = self.ctx.retry_delay();
                        warn!(
                            job_id = %job.id,
                            file = %key,
                            delay_secs = delay.as_secs(),
                            remaining = max_attempts - job.attempts,
                            "retrying transcode"
                        );
                        let slept = until_stopped(&mut stop, tokio::time::sleep(delay)).await;
                        if slept.is_none() {
                            info!(
                                job_id = %job.id,
                                file = %key,
                                attempt = job.attempts,
                                "shutdown during retry delay, giving up"
                            );
                            return Ok(Disposition::Interrupted);
                        }
                        continue;
                    }

                    job.status = JobStatus::Failed;
                    return Ok(Disposition::Failed { diagnostic });
                }
            }
        }
    }

    /// Record a successful job, then apply the delete-original policy.
    ///
    /// The source is only removed after the history write has returned.
    fn commit(&mut self, mut job: TranscodeJob, key: &str) -> Result<Disposition, JobError> {
        self.history
            .record(key, &job.output_path, SystemTime::now())?;
        job.status = JobStatus::Succeeded;
        info!(
            job_id = %job.id,
            file = %key,
            output = %job.output_path.display(),
            "successfully transcoded"
        );

        let original_removed =
            self.ctx.config.transcode.delete_original && remove_original(&job, key);

        Ok(Disposition::Succeeded {
            output_path: job.output_path,
            original_removed,
        })
    }
}

/// Drive `fut` unless shutdown is or becomes requested, in which case `None`.
async fn until_stopped<T>(
    stop: &mut watch::Receiver<bool>,
    fut: impl Future<Output = T>,
) -> Option<T> {
    if *stop.borrow() {
        return None;
    }
    tokio::select! {
        out = fut => Some(out),
        _ = stop.wait_for(|stopped| *stopped) => None,
    }
}

fn remove_original(job: &TranscodeJob, key: &str) -> bool {
    match fs::remove_file(&job.source_path) {
        Ok(()) => {
            info!(job_id = %job.id, file = %key, "deleted original file");
            true
        }
        Err(e) => {
            error!(
                job_id = %job.id,
                file = %key,
                error = %e,
                "failed to delete original file"
            );
            false
        }
    }
}
