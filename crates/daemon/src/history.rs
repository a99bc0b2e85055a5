//! Transcode history store.
//!
//! A single JSON document maps source-path keys to completion records. The
//! presence of a key is the only idempotency signal: outputs are never
//! re-verified. The document is rewritten in full after every successful
//! job, through a sibling temp file renamed over the target.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::warn;

/// Errors raised while persisting the history document.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Serializing the history to JSON failed.
    #[error("Failed to serialize history: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Writing, syncing or renaming the history file failed.
    #[error("Failed to write history file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Completion record for one transcoded input.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryRecord {
    /// Where the transcoded file was written.
    #[serde(default)]
    pub output_path: String,
    /// Completion time, fractional seconds since the Unix epoch.
    #[serde(rename = "timestamp", default)]
    pub completed_at: f64,
}

/// In-memory history, keyed by normalized source path.
pub type History = HashMap<String, HistoryRecord>;

/// Durable history of completed transcodes.
#[derive(Debug)]
pub struct HistoryStore {
    path: PathBuf,
    history: History,
}

/// Seconds since the Unix epoch as a float, clamped to zero for pre-epoch times.
pub fn unix_seconds(time: SystemTime) -> f64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Path of the temp file a history write goes through before the rename.
fn temp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

impl HistoryStore {
    /// Load the history document at `path`.
    ///
    /// A missing file or a document that does not parse yields an empty
    /// history; this never fails.
    pub fn load<P: Into<PathBuf>>(path: P) -> Self {
        let path = path.into();
        let history = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<History>(&content) {
                Ok(history) => history,
                Err(e) => {
                    warn!(
                        history_file = %path.display(),
                        error = %e,
                        "history file is malformed, starting with empty history"
                    );
                    History::new()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => History::new(),
            Err(e) => {
                warn!(
                    history_file = %path.display(),
                    error = %e,
                    "history file is unreadable, starting with empty history"
                );
                History::new()
            }
        };

        Self { path, history }
    }

    /// Location of the persisted document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether `key` has a completion record.
    pub fn contains(&self, key: &str) -> bool {
        self.history.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&HistoryRecord> {
        self.history.get(key)
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Read-only view of every record.
    pub fn entries(&self) -> &History {
        &self.history
    }

    /// Insert or overwrite the record for `key` and persist the whole history.
    ///
    /// This is the commit point of a job. If persisting fails, the in-memory
    /// state is restored to what it was before the call.
    pub fn record(
        &mut self,
        key: &str,
        output_path: &Path,
        now: SystemTime,
    ) -> Result<(), HistoryError> {
        let record = HistoryRecord {
            output_path: output_path.to_string_lossy().into_owned(),
            completed_at: unix_seconds(now),
        };
        let previous = self.history.insert(key.to_string(), record);

        if let Err(e) = self.persist() {
            match previous {
                Some(previous) => {
                    self.history.insert(key.to_string(), previous);
                }
                None => {
                    self.history.remove(key);
                }
            }
            return Err(e);
        }

        Ok(())
    }

    /// Write the full history to disk.
    ///
    /// The document is written to `<path>.tmp`, synced, then renamed over
    /// `path`, so readers see either the old or the new document.
    pub fn persist(&self) -> Result<(), HistoryError> {
        let json = serde_json::to_string_pretty(&self.history)?;
        let tmp = temp_path(&self.path);
        let write_err = |source| HistoryError::Write {
            path: self.path.clone(),
            source,
        };

        let parent = parent_dir(&self.path);
        fs::create_dir_all(parent).map_err(write_err)?;

        let result = File::create(&tmp)
            .and_then(|mut file| {
                file.write_all(json.as_bytes())?;
                file.sync_all()
            })
            .and_then(|()| fs::rename(&tmp, &self.path));

        if let Err(e) = result {
            let _ = fs::remove_file(&tmp);
            return Err(write_err(e));
        }

        sync_dir(parent).map_err(write_err)
    }
}

/// Directory holding `path`; `.` for a bare file name.
fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Flush a directory entry change (the rename) to disk.
#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}
