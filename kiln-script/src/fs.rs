//! Filesystem helpers for materializing generated artifacts

use kiln_core::{Error, Result};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

use crate::script::Script;

/// Makes sure `path` is a directory, creating missing segments
///
/// Idempotent. Fails with [`Error::NotADirectory`] if something other than a
/// directory already occupies `path`.
pub fn ensure_directory(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();

    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(Error::NotADirectory(path.to_path_buf())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("Creating directory {}", path.display());
            fs::create_dir_all(path).map_err(|e| Error::io(path, e))
        }
        Err(e) => Err(Error::io(path, e)),
    }
}

/// Removes whatever occupies `path`, file or directory tree
///
/// Missing paths, including ones under a parent that is not a directory, are
/// not an error.
pub fn remove_stale(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();

    let result = match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e)
            if matches!(
                e.kind(),
                std::io::ErrorKind::NotFound | std::io::ErrorKind::NotADirectory
            ) =>
        {
            return Ok(());
        }
        Err(e) => Err(e),
    };
    result.map_err(|e| Error::io(path, e))?;
    debug!("Removed stale {}", path.display());
    Ok(())
}

/// Writes `content` to `path`, replacing any existing file
///
/// The file handle is scoped to this call and closed on every return path.
pub fn write_text(path: impl AsRef<Path>, content: &str) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| Error::io(path, e))?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(content.as_bytes())
        .and_then(|_| writer.flush())
        .map_err(|e| Error::io(path, e))?;
    debug!("Wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

/// Writes a script and marks it executable
pub fn write_script(path: impl AsRef<Path>, script: &Script) -> Result<()> {
    let path = path.as_ref();
    write_text(path, &script.render())?;
    make_executable(path)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).map_err(|e| Error::io(path, e))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}
