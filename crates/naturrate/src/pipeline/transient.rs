//! Scoped cleanup of per-job working files.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::sanitize::redact_path;

/// Removes every registered file when dropped, whichever way the owning
/// scope is left. Files that were never created are skipped silently.
#[derive(Debug, Default)]
pub struct TransientFiles {
    paths: Vec<PathBuf>,
}

impl TransientFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `path` for removal and returns it.
    pub fn register(&mut self, path: PathBuf) -> PathBuf {
        if !self.paths.contains(&path) {
            self.paths.push(path.clone());
        }
        path
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Removes every registered file now. Dropping afterwards is a no-op.
    pub fn cleanup(&mut self) {
        for path in self.paths.drain(..) {
            Self::remove(&path);
        }
    }

    fn remove(path: &Path) {
        match std::fs::remove_file(path) {
            Ok(()) => debug!("Removed transient file {}", redact_path(path)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Failed to remove transient file {}: {}",
                redact_path(path),
                e
            ),
        }
    }
}

impl Drop for TransientFiles {
    fn drop(&mut self) {
        self.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_files_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("job");
        let b = dir.path().join("job_final.mp4");
        std::fs::write(&a, b"a").unwrap();
        std::fs::write(&b, b"b").unwrap();

        {
            let mut files = TransientFiles::new();
            files.register(a.clone());
            files.register(b.clone());
            // Never created
            files.register(dir.path().join("job_narration.mp3"));
        }

        assert!(!a.exists());
        assert!(!b.exists());
    }

    #[test]
    fn test_cleanup_removes_files_before_drop() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("job");
        std::fs::write(&a, b"a").unwrap();

        let mut files = TransientFiles::new();
        files.register(a.clone());
        files.cleanup();

        assert!(!a.exists());
        assert!(files.paths().is_empty());
    }

    #[test]
    fn test_register_deduplicates() {
        let mut files = TransientFiles::new();
        files.register(PathBuf::from("/tmp/naturrate-x"));
        files.register(PathBuf::from("/tmp/naturrate-x"));
        assert_eq!(files.paths().len(), 1);
    }

    #[test]
    fn test_files_removed_on_panic() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("job");
        std::fs::write(&a, b"a").unwrap();

        let path = a.clone();
        let result = std::panic::catch_unwind(move || {
            let mut files = TransientFiles::new();
            files.register(path);
            panic!("stage blew up");
        });

        assert!(result.is_err());
        assert!(!a.exists());
    }
}
