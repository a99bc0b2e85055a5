//! Stability checking for freshly created files.
//!
//! A creation event fires as soon as a copy into the watch folder starts.
//! When a stability window is configured, the orchestrator waits until the
//! file's size stops changing across one window before encoding it.

use std::path::Path;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// Result of a stability check on a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StabilityResult {
    /// File size remained unchanged during the stability window.
    Stable,
    /// File size changed during the stability window.
    Unstable {
        /// Size when first checked.
        initial_size: u64,
        /// Size after waiting.
        current_size: u64,
    },
}

/// Check whether a file's size is unchanged after waiting `window`.
pub async fn check_stability(
    path: &Path,
    initial_size: u64,
    window: Duration,
) -> Result<StabilityResult, std::io::Error> {
    sleep(window).await;

    let current_size = tokio::fs::metadata(path).await?.len();
    Ok(compare_sizes(initial_size, current_size))
}

/// Wait until `path` keeps the same size for a whole `window`.
///
/// Returns the settled size. Fails if the file disappears or cannot be
/// inspected while waiting.
pub async fn wait_until_stable(path: &Path, window: Duration) -> Result<u64, std::io::Error> {
    let mut size = tokio::fs::metadata(path).await?.len();
    loop {
        match check_stability(path, size, window).await? {
            StabilityResult::Stable => return Ok(size),
            StabilityResult::Unstable { current_size, .. } => {
                debug!(
                    file = %path.display(),
                    size = current_size,
                    "file still growing, waiting"
                );
                size = current_size;
            }
        }
    }
}

/// Compare two file sizes and return the appropriate StabilityResult.
#[inline]
pub fn compare_sizes(initial_size: u64, current_size: u64) -> StabilityResult {
    if initial_size == current_size {
        StabilityResult::Stable
    } else {
        StabilityResult::Unstable {
            initial_size,
            current_size,
        }
    }
}
