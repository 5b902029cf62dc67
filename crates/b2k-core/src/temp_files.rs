//! Per-request temporary file tracking.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::errors::Error;

/// Paths created while handling one request.
///
/// [`TempFiles::cleanup`] deletes every tracked path that still exists without
/// blocking the runtime. Failures are logged and never abort the rest of the
/// cleanup. Anything still tracked when the value is dropped (early return,
/// panic, cancelled task) is removed synchronously by `Drop`.
#[derive(Debug, Default)]
pub struct TempFiles {
    paths: Vec<PathBuf>,
}

impl TempFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if !self.paths.contains(&path) {
            self.paths.push(path);
        }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Delete all tracked paths; returns how many deletions failed.
    pub async fn cleanup(&mut self) -> usize {
        let mut failed = 0;
        for path in std::mem::take(&mut self.paths) {
            if let Err(e) = remove_if_exists(&path).await {
                warn!(error = %e, "temp file cleanup failed");
                failed += 1;
            }
        }
        failed
    }
}

impl Drop for TempFiles {
    fn drop(&mut self) {
        for path in self.paths.drain(..) {
            if let Err(e) = remove_if_exists_blocking(&path) {
                warn!(error = %e, "temp file cleanup failed");
            }
        }
    }
}

async fn remove_if_exists(path: &Path) -> Result<(), Error> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            debug!(path = %path.display(), "temp file removed");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(Error::CleanupFailed {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn remove_if_exists_blocking(path: &Path) -> Result<(), Error> {
    if !path.exists() {
        return Ok(());
    }
    std::fs::remove_file(path).map_err(|source| Error::CleanupFailed {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "temp file removed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::tests::tmp_dir;

    #[tokio::test]
    async fn removes_every_tracked_file() {
        let dir = tmp_dir("temp");
        let paths: Vec<PathBuf> = (0..3).map(|i| dir.join(format!("f{i}"))).collect();
        let mut tf = TempFiles::new();
        for p in &paths {
            std::fs::write(p, b"x").unwrap();
            tf.add(p);
        }

        assert_eq!(tf.cleanup().await, 0);
        assert!(paths.iter().all(|p| !p.exists()));
        assert!(tf.paths().is_empty());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn one_failure_does_not_stop_the_rest() {
        let dir = tmp_dir("temp-fail");
        let a = dir.join("a");
        let b = dir.join("b");
        // A directory can't be removed with remove_file.
        let stuck = dir.join("stuck");
        std::fs::write(&a, b"x").unwrap();
        std::fs::create_dir(&stuck).unwrap();
        std::fs::write(&b, b"x").unwrap();

        let mut tf = TempFiles::new();
        tf.add(&a);
        tf.add(&stuck);
        tf.add(&b);

        assert_eq!(tf.cleanup().await, 1);
        assert!(!a.exists());
        assert!(!b.exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn missing_and_empty_are_fine() {
        let mut empty = TempFiles::new();
        assert_eq!(empty.cleanup().await, 0);

        let mut tf = TempFiles::new();
        tf.add("/tmp/b2k-never-created-file");
        assert_eq!(tf.cleanup().await, 0);
    }

    #[test]
    fn drop_cleans_up_outside_a_runtime() {
        let dir = tmp_dir("temp-drop");
        let a = dir.join("a");
        std::fs::write(&a, b"x").unwrap();
        {
            let mut tf = TempFiles::new();
            tf.add(&a);
        }
        assert!(!a.exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn duplicate_paths_are_tracked_once() {
        let mut tf = TempFiles::new();
        tf.add("/tmp/x");
        tf.add("/tmp/x");
        assert_eq!(tf.paths().len(), 1);
        tf.paths.clear();
    }
}
