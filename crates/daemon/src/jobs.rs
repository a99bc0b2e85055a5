//! Transcode jobs.
//!
//! A job lives only while the orchestrator works on one file; nothing here is
//! persisted. The durable record of a finished job is the history entry.

use std::path::PathBuf;
use uuid::Uuid;

/// Status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobStatus {
    /// Job is created but the encoder has not started.
    #[default]
    Pending,
    /// Encoder is running.
    Running,
    /// Encoder succeeded and the history was written.
    Succeeded,
    /// Encoder failed on every attempt.
    Failed,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Succeeded => write!(f, "succeeded"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

/// One file being transcoded.
#[derive(Debug, Clone)]
pub struct TranscodeJob {
    /// Identifier used to correlate log lines.
    pub id: Uuid,
    pub source_path: PathBuf,
    pub output_path: PathBuf,
    pub status: JobStatus,
    /// Encoder runs so far, including the current one.
    pub attempts: u32,
}

impl TranscodeJob {
    pub fn new(source_path: PathBuf, output_path: PathBuf) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_path,
            output_path,
            status: JobStatus::Pending,
            attempts: 0,
        }
    }

    /// Mark the start of an encoder attempt.
    pub fn start_attempt(&mut self) {
        self.attempts += 1;
        self.status = JobStatus::Running;
    }
}
