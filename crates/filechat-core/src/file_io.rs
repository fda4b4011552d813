//! File I/O utilities for filechat
//!
//! Thin wrappers over `std::fs` that map raw I/O failures onto errors the
//! file tools can report back to the model.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during file I/O operations
#[derive(Error, Debug)]
pub enum FileIoError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// File not found
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Invalid UTF-8 in file
    #[error("Invalid UTF-8 in file: {0}")]
    InvalidUtf8(PathBuf),

    /// Permission denied
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// Expected a file but found a directory
    #[error("Path is a directory, not a file: {0}")]
    IsDirectory(PathBuf),

    /// Expected a directory but found something else
    #[error("Path is not a directory: {0}")]
    NotADirectory(PathBuf),
}

impl FileIoError {
    fn from_io(err: io::Error, path: &Path) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => FileIoError::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => FileIoError::PermissionDenied(path.to_path_buf()),
            io::ErrorKind::InvalidData => FileIoError::InvalidUtf8(path.to_path_buf()),
            _ => FileIoError::Io(err),
        }
    }
}

/// Read a file and return its contents as a UTF-8 string
pub fn read_file<P: AsRef<Path>>(path: P) -> Result<String, FileIoError> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(FileIoError::NotFound(path.to_path_buf()));
    }

    if path.is_dir() {
        return Err(FileIoError::IsDirectory(path.to_path_buf()));
    }

    fs::read_to_string(path).map_err(|e| FileIoError::from_io(e, path))
}

/// Write content to a file, creating parent directories if needed.
/// An existing file is overwritten.
pub fn write_file<P: AsRef<Path>, C: AsRef<str>>(path: P, content: C) -> Result<(), FileIoError> {
    let path = path.as_ref();

    if path.is_dir() {
        return Err(FileIoError::IsDirectory(path.to_path_buf()));
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| FileIoError::from_io(e, parent))?;
        }
    }

    fs::write(path, content.as_ref()).map_err(|e| FileIoError::from_io(e, path))
}

/// List the entries of a directory (non-recursive).
///
/// Names are relative to `dir`. Directories, including symlinks that resolve
/// to a directory, carry a trailing `/`. The result is sorted by name.
pub fn list_dir<P: AsRef<Path>>(dir: P) -> Result<Vec<String>, FileIoError> {
    let dir = dir.as_ref();

    if !dir.exists() {
        return Err(FileIoError::NotFound(dir.to_path_buf()));
    }

    if !dir.is_dir() {
        return Err(FileIoError::NotADirectory(dir.to_path_buf()));
    }

    let mut entries = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| FileIoError::from_io(e, dir))? {
        let entry = entry?;
        let mut name = entry.file_name().to_string_lossy().into_owned();
        // Broken symlinks fall back to the link's own type
        let is_dir = match fs::metadata(entry.path()) {
            Ok(metadata) => metadata.is_dir(),
            Err(_) => entry.file_type()?.is_dir(),
        };
        if is_dir {
            name.push('/');
        }
        entries.push(name);
    }

    entries.sort();
    Ok(entries)
}
