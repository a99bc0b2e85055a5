//! Recursive directory watcher.
//!
//! Wraps a `notify` watcher on the input root. Creation events are reduced to
//! qualifying file paths on notify's event thread and pushed into an
//! unbounded channel; the orchestrator is the only consumer. Directory
//! creations are never forwarded themselves, but a new directory is swept for
//! qualifying files that landed before the recursive watch covered it.
//! Duplicates are possible and are left to the history check.

use crate::scan::{is_qualifying, scan_for_videos};
use notify::event::CreateKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("Failed to watch {path}: {source}")]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}

/// Qualifying files announced by one filesystem event.
pub fn created_files(event: &Event, extensions: &[String]) -> Vec<PathBuf> {
    let EventKind::Create(kind) = &event.kind else {
        return Vec::new();
    };

    let mut files = Vec::new();
    for path in &event.paths {
        let is_dir = match kind {
            CreateKind::Folder => true,
            CreateKind::File => false,
            _ => path.is_dir(),
        };

        if is_dir {
            files.extend(scan_for_videos(path, extensions));
        } else if is_qualifying(path, extensions) {
            files.push(path.clone());
        }
    }
    files
}

/// Watches a root recursively for as long as it is alive.
///
/// Dropping the watcher stops event delivery and releases its channel sender.
pub struct DirectoryWatcher {
    root: PathBuf,
    _watcher: RecommendedWatcher,
}

impl DirectoryWatcher {
    /// Start watching `root`, sending every qualifying created file to `tx`.
    ///
    /// `poll_interval` only matters when notify falls back to its polling
    /// backend.
    pub fn start(
        root: &Path,
        extensions: Vec<String>,
        poll_interval: Duration,
        tx: UnboundedSender<PathBuf>,
    ) -> Result<Self, WatchError> {
        let watch_err = |source| WatchError::Watch {
            path: root.to_path_buf(),
            source,
        };

        let handler = move |res: notify::Result<Event>| match res {
            Ok(event) => {
                for path in created_files(&event, &extensions) {
                    debug!(file = %path.display(), "file created");
                    if tx.send(path).is_err() {
                        // Receiver gone: shutting down.
                        return;
                    }
                }
            }
            Err(e) => warn!(error = %e, "watch error"),
        };

        let mut watcher = RecommendedWatcher::new(
            handler,
            notify::Config::default().with_poll_interval(poll_interval),
        )
        .map_err(watch_err)?;
        watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(watch_err)?;

        Ok(Self {
            root: root.to_path_buf(),
            _watcher: watcher,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{ModifyKind, RemoveKind};
    use std::fs::{self, File};
    use tempfile::TempDir;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    fn extensions() -> Vec<String> {
        vec![".mp4".to_string(), ".mkv".to_string()]
    }

    #[test]
    fn test_created_qualifying_file_is_forwarded() {
        let event = Event::new(EventKind::Create(CreateKind::File))
            .add_path(PathBuf::from("/in/clip.MKV"));
        assert_eq!(
            created_files(&event, &extensions()),
            vec![PathBuf::from("/in/clip.MKV")]
        );
    }

    #[test]
    fn test_non_qualifying_file_is_dropped() {
        let event = Event::new(EventKind::Create(CreateKind::File))
            .add_path(PathBuf::from("/in/notes.txt"));
        assert!(created_files(&event, &extensions()).is_empty());
    }

    #[test]
    fn test_non_create_events_are_ignored() {
        for kind in [
            EventKind::Modify(ModifyKind::Any),
            EventKind::Remove(RemoveKind::File),
            EventKind::Any,
        ] {
            let event = Event::new(kind).add_path(PathBuf::from("/in/movie.mp4"));
            assert!(created_files(&event, &extensions()).is_empty());
        }
    }

    #[test]
    fn test_empty_directory_creation_forwards_nothing() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("season1.mkv");
        fs::create_dir(&sub).unwrap();

        let event = Event::new(EventKind::Create(CreateKind::Folder)).add_path(sub);
        assert!(created_files(&event, &extensions()).is_empty());
    }

    #[test]
    fn test_directory_creation_sweeps_existing_contents() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("batch");
        fs::create_dir_all(sub.join("inner")).unwrap();
        File::create(sub.join("a.mp4")).unwrap();
        File::create(sub.join("inner/b.mkv")).unwrap();
        File::create(sub.join("inner/readme.txt")).unwrap();

        // Backends that cannot tell files from folders report CreateKind::Any.
        let event = Event::new(EventKind::Create(CreateKind::Any)).add_path(sub.clone());
        assert_eq!(
            created_files(&event, &extensions()),
            vec![sub.join("a.mp4"), sub.join("inner/b.mkv")]
        );
    }

    async fn next_name(rx: &mut mpsc::UnboundedReceiver<PathBuf>) -> Option<String> {
        timeout(Duration::from_secs(10), rx.recv())
            .await
            .ok()
            .flatten()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
    }

    #[tokio::test]
    async fn test_watcher_reports_new_files() {
        let dir = TempDir::new().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _watcher =
            DirectoryWatcher::start(dir.path(), extensions(), Duration::from_secs(1), tx)
                .unwrap();

        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        fs::write(dir.path().join("clip.mkv"), "frames").unwrap();

        assert_eq!(next_name(&mut rx).await.as_deref(), Some("clip.mkv"));
    }

    #[tokio::test]
    async fn test_watcher_reports_files_in_new_subdirectories() {
        let dir = TempDir::new().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _watcher =
            DirectoryWatcher::start(dir.path(), extensions(), Duration::from_secs(1), tx)
                .unwrap();

        let nested = dir.path().join("show/season2");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("ep01.mp4"), "frames").unwrap();

        assert_eq!(next_name(&mut rx).await.as_deref(), Some("ep01.mp4"));
    }

    #[tokio::test]
    async fn test_dropping_watcher_closes_channel() {
        let dir = TempDir::new().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let watcher =
            DirectoryWatcher::start(dir.path(), extensions(), Duration::from_secs(1), tx)
                .unwrap();

        drop(watcher);

        let closed = timeout(Duration::from_secs(10), rx.recv()).await.unwrap();
        assert!(closed.is_none());
    }

    #[test]
    fn test_missing_root_is_error() {
        let dir = TempDir::new().unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();
        let result = DirectoryWatcher::start(
            &dir.path().join("absent"),
            extensions(),
            Duration::from_secs(1),
            tx,
        );
        assert!(matches!(result, Err(WatchError::Watch { .. })));
    }
}
