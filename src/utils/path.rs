//! Output path handling

use std::io;
use std::path::Path;
use tracing::warn;

use crate::error::{BffError, BffResult};

/// Make `path` writable for a fresh output file.
///
/// An existing file is deleted with a warning. Returns whether a file was removed.
pub fn prepare_output_path(path: &Path) -> BffResult<bool> {
    match std::fs::symlink_metadata(path) {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(source) => {
            return Err(BffError::Filesystem {
                path: path.to_path_buf(),
                source,
            })
        }
    }

    warn!("output file {} already exists and will be deleted", path.display());
    std::fs::remove_file(path).map_err(|source| BffError::Filesystem {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_output_is_left_alone() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.mp4");
        assert!(!prepare_output_path(&path).unwrap());
        assert!(!path.exists());
    }

    #[test]
    fn test_existing_output_is_removed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.mp4");
        std::fs::write(&path, b"stale").unwrap();

        assert!(prepare_output_path(&path).unwrap());
        assert!(!path.exists());
    }

    #[test]
    fn test_directory_cannot_be_removed() {
        let dir = TempDir::new().unwrap();
        let err = prepare_output_path(dir.path()).unwrap_err();
        assert!(matches!(err, BffError::Filesystem { .. }));
        assert!(err.exit_code() != 0);
    }
}
