//! Definition directory watcher for hot reload.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("failed to watch {path}: {source}")]
    Notify {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}

/// Change to one definition file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileEvent {
    /// Created, written, or renamed into place.
    Modified(PathBuf),
    /// Removed or renamed away.
    Deleted(PathBuf),
    /// A directory removed or renamed away, with everything under it.
    DirectoryDeleted(PathBuf),
}

/// Watches a directory tree and reports changes to files with one extension.
pub struct DefinitionWatcher {
    root: PathBuf,
    extension: String,
    event_tx: mpsc::UnboundedSender<FileEvent>,
}

impl DefinitionWatcher {
    /// Create a new DefinitionWatcher.
    ///
    /// Returns the watcher and a receiver for file events.
    pub fn new(root: &Path, extension: &str) -> (Self, mpsc::UnboundedReceiver<FileEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        (
            Self {
                root: root.to_path_buf(),
                extension: extension.to_string(),
                event_tx,
            },
            event_rx,
        )
    }

    /// Start watching in a background thread. Dropping the returned watcher
    /// stops it.
    pub fn run(self) -> Result<RecommendedWatcher, WatchError> {
        let tx = self.event_tx.clone();
        let extension = self.extension.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    for file_event in classify(&event, &extension) {
                        tracing::debug!(event = ?file_event, "Definition change detected");
                        let _ = tx.send(file_event);
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )
        .map_err(|source| WatchError::Notify {
            path: self.root.clone(),
            source,
        })?;

        watcher
            .watch(&self.root, RecursiveMode::Recursive)
            .map_err(|source| WatchError::Notify {
                path: self.root.clone(),
                source,
            })?;

        tracing::info!(path = ?self.root, extension = %self.extension, "Definition watcher started");
        Ok(watcher)
    }
}

/// Map a raw notify event onto definition file events.
pub fn classify(event: &Event, extension: &str) -> Vec<FileEvent> {
    match &event.kind {
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if event.paths.len() == 2 => {
            let mut events: Vec<FileEvent> = removal(&event.paths[0], extension).into_iter().collect();
            if has_extension(&event.paths[1], extension) {
                events.push(FileEvent::Modified(event.paths[1].clone()));
            }
            events
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) | EventKind::Remove(_) => event
            .paths
            .iter()
            .filter_map(|p| removal(p, extension))
            .collect(),
        EventKind::Create(_) | EventKind::Modify(_) => event
            .paths
            .iter()
            .filter(|p| has_extension(p, extension))
            .map(|p| FileEvent::Modified(p.clone()))
            .collect(),
        _ => Vec::new(),
    }
}

/// A path that went away. Once gone it cannot be stat'ed, so a path with no
/// extension at all is taken to be a directory.
fn removal(path: &Path, extension: &str) -> Option<FileEvent> {
    if has_extension(path, extension) {
        Some(FileEvent::Deleted(path.to_path_buf()))
    } else if path.extension().is_none() {
        Some(FileEvent::DirectoryDeleted(path.to_path_buf()))
    } else {
        None
    }
}

pub fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(extension))
        .unwrap_or(false)
}
