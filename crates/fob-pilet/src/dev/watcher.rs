//! File system watcher over the bundler's output directory.
//!
//! Every relevant change is forwarded as a [`FileChange`]. The caller settles
//! bursts of changes (a bundler writes several files per run) before treating
//! them as one finished build.

use crate::error::{PiletError, Result};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

/// File change event type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChange {
    Modified(PathBuf),
    Created(PathBuf),
    Removed(PathBuf),
}

impl FileChange {
    /// Get the path affected by this change.
    pub fn path(&self) -> &Path {
        match self {
            FileChange::Modified(p) | FileChange::Created(p) | FileChange::Removed(p) => p,
        }
    }
}

/// Watches a directory recursively and sends change events through a channel.
pub struct OutputWatcher {
    _watcher: RecommendedWatcher,
    root: PathBuf,
    settle: Duration,
}

impl OutputWatcher {
    /// Create a new watcher.
    ///
    /// # Arguments
    ///
    /// * `root` - Output directory to watch recursively
    /// * `debounce_ms` - Quiet period that ends a burst of changes
    ///
    /// # Errors
    ///
    /// Returns error if the watcher cannot be created or the directory doesn't exist
    pub fn new(root: PathBuf, debounce_ms: u64) -> Result<(Self, mpsc::Receiver<FileChange>)> {
        if !root.exists() {
            return Err(PiletError::FileNotFound(root));
        }
        // notify reports absolute paths.
        let root = std::fs::canonicalize(&root)?;

        let (tx, rx) = mpsc::channel(100);
        let root_clone = root.clone();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!(error = %e, "watch error");
                    return;
                }
            };

            for path in &event.paths {
                if Self::should_ignore(path, &root_clone) {
                    continue;
                }

                let change = match event.kind {
                    notify::EventKind::Create(_) => FileChange::Created(path.clone()),
                    notify::EventKind::Modify(_) => FileChange::Modified(path.clone()),
                    notify::EventKind::Remove(_) => FileChange::Removed(path.clone()),
                    _ => continue,
                };

                // Full channel means a rebuild is already pending.
                let _ = tx.try_send(change);
            }
        })?;

        watcher.watch(&root, RecursiveMode::Recursive)?;

        Ok((
            Self {
                _watcher: watcher,
                root,
                settle: Duration::from_millis(debounce_ms),
            },
            rx,
        ))
    }

    /// Wait until no further change arrives for the settle period.
    ///
    /// Returns how many extra changes were folded into the burst.
    pub async fn settle(&self, rx: &mut mpsc::Receiver<FileChange>) -> usize {
        let mut folded = 0;
        while let Ok(Some(_)) = tokio::time::timeout(self.settle, rx.recv()).await {
            folded += 1;
        }
        folded
    }

    /// Paths outside the root, hidden files, and editor temp files are ignored.
    fn should_ignore(path: &Path, root: &Path) -> bool {
        let Ok(rel_path) = path.strip_prefix(root) else {
            return true;
        };

        let hidden = rel_path.components().any(|component| {
            component
                .as_os_str()
                .to_str()
                .is_some_and(|name| name.starts_with('.') && name != "." && name != "..")
        });

        let temp = rel_path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name.ends_with('~') || name.ends_with(".tmp") || name.ends_with(".swp"));

        hidden || temp
    }

    /// Get the root directory being watched.
    pub fn root(&self) -> &Path {
        &self.root
    }
}
