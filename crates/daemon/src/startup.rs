//! Startup checks module
//!
//! Preflight checks run before the watcher starts:
//! - Encoder availability (`<binary> --version` must succeed)
//! - Input and output roots exist (created when absent)

use crate::config::Config;
use std::fs;
use std::path::Path;
use std::process::Command;
use thiserror::Error;
use tracing::info;

/// Error types for startup checks
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Encoder not available: {0}")]
    EncoderUnavailable(String),

    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Check that the encoder binary runs, via `<binary> --version`
pub fn check_encoder_available(binary: &str) -> Result<(), StartupError> {
    let output = Command::new(binary).arg("--version").output().map_err(|e| {
        StartupError::EncoderUnavailable(format!(
            "{} --version failed; is it installed and in PATH? Error: {}",
            binary, e
        ))
    })?;

    if !output.status.success() {
        return Err(StartupError::EncoderUnavailable(format!(
            "{} --version exited with {}",
            binary, output.status
        )));
    }

    let version = String::from_utf8_lossy(&output.stdout);
    info!(
        encoder = binary,
        version = version.lines().next().unwrap_or("").trim(),
        "encoder available"
    );
    Ok(())
}

/// Create `dir` and its parents if absent
pub fn ensure_dir(dir: &Path) -> Result<(), StartupError> {
    fs::create_dir_all(dir).map_err(|source| StartupError::CreateDir {
        path: dir.display().to_string(),
        source,
    })
}

/// Run all startup checks in order
pub fn run_startup_checks(cfg: &Config) -> Result<(), StartupError> {
    check_encoder_available(&cfg.av1an.binary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_encoder_is_unavailable() {
        let result = check_encoder_available("no-such-encoder-binary-4b7e");
        assert!(matches!(result, Err(StartupError::EncoderUnavailable(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_version_is_unavailable() {
        let result = check_encoder_available("false");
        assert!(matches!(result, Err(StartupError::EncoderUnavailable(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_working_encoder_passes() {
        assert!(check_encoder_available("true").is_ok());
    }

    #[test]
    fn test_ensure_dir_creates_nested() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("a/b/c");
        ensure_dir(&target).unwrap();
        assert!(target.is_dir());
        // Idempotent
        ensure_dir(&target).unwrap();
    }

    #[test]
    fn test_ensure_dir_over_file_fails() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("file");
        fs::write(&target, "x").unwrap();
        assert!(matches!(
            ensure_dir(&target),
            Err(StartupError::CreateDir { .. })
        ));
    }
}
