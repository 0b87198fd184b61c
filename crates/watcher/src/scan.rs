//! Directory listing used by every scan

use crate::error::{Result, WatchError};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

/// List the entries of `dir` with their modification times
///
/// Non-recursive. Subdirectories are skipped; symlinks are resolved to decide
/// whether they point at a directory. An entry that disappears between the
/// listing and its stat (or a dangling link) is left out of the result
/// rather than failing the scan.
///
/// Order is whatever the filesystem returns.
pub fn list_directory(dir: &Path) -> Result<Vec<(PathBuf, SystemTime)>> {
    let mut listing = Vec::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
    {
        let entry = entry.map_err(|e| walk_error(dir, e))?;

        if entry.file_type().is_dir() {
            continue;
        }

        let path = entry.path();
        match modified_time(path) {
            Ok(Some(mtime)) => listing.push((path.to_path_buf(), mtime)),
            Ok(None) => {}
            Err(source) => {
                return Err(WatchError::ScanIo {
                    path: path.to_path_buf(),
                    source,
                })
            }
        }
    }

    Ok(listing)
}

/// Modification time of a non-directory entry, following symlinks
///
/// Returns `None` for directories and for entries that no longer exist.
fn modified_time(path: &Path) -> io::Result<Option<SystemTime>> {
    match std::fs::metadata(path) {
        Ok(metadata) if metadata.is_dir() => Ok(None),
        Ok(metadata) => metadata.modified().map(Some),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

fn walk_error(dir: &Path, err: walkdir::Error) -> WatchError {
    let path = err
        .path()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| dir.to_path_buf());
    let source = err
        .into_io_error()
        .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "filesystem loop detected"));
    WatchError::ScanIo { path, source }
}
