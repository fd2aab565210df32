//! Access to definition file contents.
//!
//! # Responsibilities
//! - Enumerate definition files under a root
//! - Read a file, retrying while an editor still holds it

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

use crate::config::watcher::has_extension;

#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// Files under `root` with `extension`, recursively, in path order.
    async fn list(&self, root: &Path, extension: &str) -> io::Result<Vec<PathBuf>>;

    async fn read(&self, path: &Path) -> io::Result<String>;
}

/// Reads definitions from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsContentProvider;

#[async_trait]
impl ContentProvider for FsContentProvider {
    async fn list(&self, root: &Path, extension: &str) -> io::Result<Vec<PathBuf>> {
        let mut found = Vec::new();
        let mut pending = vec![root.to_path_buf()];

        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                } else if has_extension(&path, extension) {
                    found.push(path);
                }
            }
        }

        found.sort();
        Ok(found)
    }

    async fn read(&self, path: &Path) -> io::Result<String> {
        tokio::fs::read_to_string(path).await
    }
}

/// Fixed-delay retry for reads that race with writers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 10,
            delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// Read `path`, retrying transient failures. `NotFound` is returned
    /// immediately.
    pub async fn read(&self, content: &dyn ContentProvider, path: &Path) -> io::Result<String> {
        let mut attempt = 1;
        loop {
            match content.read(path).await {
                Ok(text) => return Ok(text),
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(e),
                Err(e) if attempt >= self.attempts => return Err(e),
                Err(e) => {
                    tracing::debug!(
                        path = %path.display(),
                        attempt,
                        error = %e,
                        "Definition read failed, retrying"
                    );
                    attempt += 1;
                    tokio::time::sleep(self.delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Flaky {
        failures: AtomicU32,
    }

    #[async_trait]
    impl ContentProvider for Flaky {
        async fn list(&self, _root: &Path, _extension: &str) -> io::Result<Vec<PathBuf>> {
            Ok(Vec::new())
        }

        async fn read(&self, _path: &Path) -> io::Result<String> {
            if self.failures.load(Ordering::SeqCst) > 0 {
                self.failures.fetch_sub(1, Ordering::SeqCst);
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "locked"));
            }
            Ok("create a".into())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_until_readable() {
        let flaky = Flaky {
            failures: AtomicU32::new(3),
        };
        let policy = RetryPolicy {
            attempts: 5,
            delay: Duration::from_millis(100),
        };
        assert_eq!(policy.read(&flaky, Path::new("a.api")).await.unwrap(), "create a");
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_gives_up() {
        let flaky = Flaky {
            failures: AtomicU32::new(3),
        };
        let policy = RetryPolicy {
            attempts: 2,
            delay: Duration::from_millis(100),
        };
        let err = policy.read(&flaky, Path::new("a.api")).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }

    #[tokio::test]
    async fn test_fs_listing_is_recursive_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("b.api"), "").unwrap();
        std::fs::write(dir.path().join("nested/a.api"), "").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();

        let files = FsContentProvider.list(dir.path(), "api").await.unwrap();
        assert_eq!(
            files,
            vec![dir.path().join("b.api"), dir.path().join("nested/a.api")]
        );
    }
}
