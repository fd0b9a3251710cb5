//! Atomic file replacement.
//!
//! Content is written to `.{filename}.tmp` in the target's directory,
//! synced to disk, then renamed over the target. Source and target share a
//! directory, so the rename never crosses filesystems.

use clibars_core::{AppError, AppResult};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Atomically replace `path` with `content`.
///
/// Readers see either the old file or the new one, never a partial write.
/// A crash may leave the temporary file behind.
pub fn atomic_write(path: &Path, content: &[u8]) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let temp_path = temp_path(path)?;
    write_and_sync(&temp_path, content)?;

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        AppError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to replace {:?}: {}", path, e),
        ))
    })
}

fn temp_path(target: &Path) -> AppResult<PathBuf> {
    let filename = target
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| AppError::Other(format!("invalid file path {:?}", target)))?;
    Ok(target.with_file_name(format!(".{}.tmp", filename)))
}

fn write_and_sync(path: &Path, content: &[u8]) -> AppResult<()> {
    let mut file = File::create(path)?;
    let result = file.write_all(content).and_then(|_| file.sync_all());
    if let Err(e) = result {
        let _ = fs::remove_file(path);
        return Err(e.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_atomic_write_replaces_content() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("static.json");
        fs::write(&path, "old").unwrap();

        atomic_write(&path, b"new").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
        assert!(!temp.path().join(".static.json.tmp").exists());
    }

    #[test]
    fn test_atomic_write_creates_parent() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a").join("b").join("file");
        atomic_write(&path, b"x").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "x");
    }
}
