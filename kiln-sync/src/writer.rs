//! Atomic file writer shared by every generating primitive.
//!
//! ## `atomic_write` protocol
//!
//! 1. Ensure the destination's parent directory exists.
//! 2. Write the bytes to `<path>.kiln.tmp`.
//! 3. Rename to the final path (atomic on POSIX).
//! 4. On rename failure, remove the `.tmp` and report the error.
//!
//! A destination is therefore either its old content or its complete new
//! content, never a torn write.

use std::path::{Path, PathBuf};

use crate::error::{io_err, SyncError};

/// Something a step did to the filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChange {
    /// File was created or overwritten.
    Written { path: PathBuf },
    /// File or directory was deleted.
    Removed { path: PathBuf },
}

impl FileChange {
    pub fn path(&self) -> &Path {
        match self {
            FileChange::Written { path } | FileChange::Removed { path } => path,
        }
    }
}

/// Sibling temp path used while writing `path`.
pub(crate) fn tmp_path(path: &Path) -> PathBuf {
    PathBuf::from(format!("{}.kiln.tmp", path.display()))
}

/// Atomically write `content` to `path`.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<FileChange, SyncError> {
    ensure_parent(path)?;
    let tmp = tmp_path(path);
    std::fs::write(&tmp, content).map_err(|e| io_err(&tmp, e))?;
    finish_tmp(&tmp, path)?;

    tracing::debug!("wrote: {}", path.display());
    Ok(FileChange::Written {
        path: path.to_path_buf(),
    })
}

/// Rename a fully written temp file into place, cleaning it up on failure.
pub(crate) fn finish_tmp(tmp: &Path, path: &Path) -> Result<(), SyncError> {
    if let Err(e) = std::fs::rename(tmp, path) {
        let _ = std::fs::remove_file(tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}

pub(crate) fn ensure_parent(path: &Path) -> Result<(), SyncError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn write_creates_file_and_parents() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("build").join("temp").join("lang-all.js");
        let change = atomic_write(&path, b"content").unwrap();
        assert_eq!(change, FileChange::Written { path: path.clone() });
        assert_eq!(fs::read(&path).unwrap(), b"content");
    }

    #[test]
    fn rewrite_replaces_content() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("file.js");
        atomic_write(&path, b"v1").unwrap();
        atomic_write(&path, b"v2").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"v2");
    }

    #[test]
    fn tmp_file_removed_after_write() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("clean.js");
        atomic_write(&path, b"data").unwrap();
        assert!(!tmp_path(&path).exists(), ".kiln.tmp must be cleaned up");
    }

    #[test]
    fn bytes_are_written_verbatim() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("crlf.txt");
        atomic_write(&path, b"line1\r\nline2\r\n\xff").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"line1\r\nline2\r\n\xff");
    }

    #[test]
    fn rename_failure_leaves_original_and_cleans_tmp() {
        // a file can never be renamed over a non-empty directory, even by root
        let root = TempDir::new().unwrap();
        let path = root.path().join("dist");
        fs::create_dir_all(&path).unwrap();
        fs::write(path.join("fullcalendar.js"), "original").unwrap();

        let err = atomic_write(&path, b"new content").unwrap_err();
        assert!(matches!(err, SyncError::Io { .. }), "{err}");
        assert_eq!(fs::read_to_string(path.join("fullcalendar.js")).unwrap(), "original");
        assert!(!tmp_path(&path).exists(), ".kiln.tmp should be cleaned up");
    }
}
