//! Av1an encoder module
//!
//! Builds and executes the Av1an command line for a single file and classifies
//! the result by exit status alone.

use std::fs;
use std::path::PathBuf;
use std::process::Command;
use thiserror::Error;

/// Error type for encoding operations
///
/// An encoder that runs and exits non-zero is not an error; that is an
/// [`EncodeOutcome::Failure`]. These cover everything that stops the encoder
/// from being run at all.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Output directory could not be created
    #[error("Failed to create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Encoder process could not be spawned
    #[error("Failed to launch encoder '{binary}': {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    /// The blocking task running the encoder panicked or was cancelled
    #[error("Encoder task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Result of one encoder run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeOutcome {
    /// Encoder exited with status zero
    Success,
    /// Encoder exited non-zero or was killed by a signal
    Failure {
        /// Exit code, None when terminated by a signal
        exit_code: Option<i32>,
        /// Captured standard error
        diagnostic: String,
    },
}

impl EncodeOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, EncodeOutcome::Success)
    }
}

/// Parameters for an Av1an encoding job
///
/// Encoder settings are taken verbatim from configuration; nothing is
/// validated or clamped here.
#[derive(Debug, Clone)]
pub struct Av1anEncodeParams {
    /// Encoder executable
    pub binary: String,
    /// Path to the input video file
    pub input_path: PathBuf,
    /// Path for the encoded output file
    pub output_path: PathBuf,
    /// Encoder backend passed to `--encoder`
    pub encoder: String,
    /// Worker count passed to `--workers`
    pub workers: u32,
    /// Value passed to `--target-quality`
    pub target_quality: f32,
}

/// Build an Av1an command
///
/// Produces `<binary> -i <input> -o <output> --encoder <encoder>
/// --workers <n> --target-quality <q>`.
pub fn build_av1an_command(params: &Av1anEncodeParams) -> Command {
    let mut cmd = Command::new(&params.binary);

    cmd.arg("-i").arg(&params.input_path);
    cmd.arg("-o").arg(&params.output_path);
    cmd.arg("--encoder").arg(&params.encoder);
    cmd.arg("--workers").arg(params.workers.to_string());
    cmd.arg("--target-quality")
        .arg(params.target_quality.to_string());

    cmd
}

/// Execute an Av1an encoding job, blocking until the process exits
///
/// Creates the output's parent directory first, then runs the encoder with
/// stdout and stderr captured. Only the exit status decides the outcome; the
/// produced file is not inspected.
pub fn run_av1an(params: &Av1anEncodeParams) -> Result<EncodeOutcome, EncodeError> {
    if let Some(parent) = params.output_path.parent() {
        fs::create_dir_all(parent).map_err(|source| EncodeError::OutputDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let output = build_av1an_command(params)
        .output()
        .map_err(|source| EncodeError::Spawn {
            binary: params.binary.clone(),
            source,
        })?;

    if output.status.success() {
        Ok(EncodeOutcome::Success)
    } else {
        Ok(EncodeOutcome::Failure {
            exit_code: output.status.code(),
            diagnostic: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

/// Run [`run_av1an`] on tokio's blocking pool
pub async fn run_av1an_blocking(
    params: Av1anEncodeParams,
) -> Result<EncodeOutcome, EncodeError> {
    tokio::task::spawn_blocking(move || run_av1an(&params)).await?
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::ffi::OsStr;
    use tempfile::TempDir;

    /// Helper to convert Command args to a Vec of strings for easier testing
    fn get_command_args(cmd: &Command) -> Vec<String> {
        cmd.get_args()
            .filter_map(|arg| arg.to_str().map(String::from))
            .collect()
    }

    /// Helper to check if args contain a flag with a specific value
    fn has_flag_with_value(args: &[String], flag: &str, value: &str) -> bool {
        args.windows(2).any(|pair| pair[0] == flag && pair[1] == value)
    }

    fn path_strategy() -> impl Strategy<Value = String> {
        prop::string::string_regex("[a-zA-Z0-9_/.-]{1,50}")
            .unwrap()
            .prop_filter("non-empty path", |s| !s.is_empty())
    }

    fn params(dir: &TempDir, binary: &str) -> Av1anEncodeParams {
        Av1anEncodeParams {
            binary: binary.to_string(),
            input_path: dir.path().join("in.mkv"),
            output_path: dir.path().join("nested/deeper/out.mkv"),
            encoder: "aom".to_string(),
            workers: 2,
            target_quality: 30.0,
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_av1an_command_passes_settings_verbatim(
            input_path in path_strategy(),
            output_path in path_strategy(),
            encoder in prop_oneof![Just("aom"), Just("rav1e"), Just("svt-av1"), Just("x265")],
            workers in 0u32..512,
            target_quality in 0u32..100,
        ) {
            let params = Av1anEncodeParams {
                binary: "av1an".to_string(),
                input_path: PathBuf::from(&input_path),
                output_path: PathBuf::from(&output_path),
                encoder: encoder.to_string(),
                workers,
                target_quality: target_quality as f32,
            };

            let cmd = build_av1an_command(&params);
            let args = get_command_args(&cmd);

            prop_assert_eq!(cmd.get_program(), OsStr::new("av1an"));
            prop_assert!(has_flag_with_value(&args, "-i", &input_path), "args: {:?}", args);
            prop_assert!(has_flag_with_value(&args, "-o", &output_path), "args: {:?}", args);
            prop_assert!(has_flag_with_value(&args, "--encoder", encoder), "args: {:?}", args);
            prop_assert!(
                has_flag_with_value(&args, "--workers", &workers.to_string()),
                "args: {:?}", args
            );
            prop_assert!(
                has_flag_with_value(&args, "--target-quality", &target_quality.to_string()),
                "args: {:?}", args
            );
            prop_assert_eq!(args.len(), 10);
        }
    }

    #[test]
    fn test_fractional_target_quality_is_kept() {
        let params = Av1anEncodeParams {
            binary: "/opt/av1an/bin/av1an".to_string(),
            input_path: PathBuf::from("/in/a.mp4"),
            output_path: PathBuf::from("/out/a_t.mp4"),
            encoder: "svt-av1".to_string(),
            workers: 16,
            target_quality: 94.5,
        };
        let cmd = build_av1an_command(&params);
        let args = get_command_args(&cmd);

        assert_eq!(cmd.get_program(), OsStr::new("/opt/av1an/bin/av1an"));
        assert!(has_flag_with_value(&args, "--target-quality", "94.5"));
    }

    #[cfg(unix)]
    #[test]
    fn test_zero_exit_is_success_and_creates_parent() {
        let dir = TempDir::new().unwrap();
        let params = params(&dir, "true");

        let outcome = run_av1an(&params).unwrap();

        assert_eq!(outcome, EncodeOutcome::Success);
        assert!(dir.path().join("nested/deeper").is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_is_failure() {
        let dir = TempDir::new().unwrap();
        let params = params(&dir, "false");

        let outcome = run_av1an(&params).unwrap();

        match outcome {
            EncodeOutcome::Failure { exit_code, .. } => assert_eq!(exit_code, Some(1)),
            EncodeOutcome::Success => panic!("expected failure"),
        }
    }

    #[test]
    fn test_missing_binary_is_spawn_error() {
        let dir = TempDir::new().unwrap();
        let params = params(&dir, "definitely-not-an-encoder-binary-9f1c");

        let err = run_av1an(&params).unwrap_err();
        assert!(matches!(err, EncodeError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_blocking_wrapper_returns_outcome() {
        let dir = TempDir::new().unwrap();
        let outcome = run_av1an_blocking(params(&dir, "true")).await.unwrap();
        assert!(outcome.is_success());
    }
}
