use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::error::{FileSystemError, FileSystemResult};

pub trait FileSystemProvider {
    /// Removes the specified file or directory safely.
    ///
    /// Missing paths are not an error. Directories are removed recursively.
    ///
    /// # Errors
    ///
    /// Returns a [`FileSystemError::File`] if the removal fails for any reason other than
    /// the path not existing.
    fn safe_remove<P: AsRef<Path>>(&self, path: P) -> FileSystemResult<()>;

    /// Creates a directory structure if it doesn't exist.
    ///
    /// # Errors
    ///
    /// * [`FileSystemError::Directory`] if the directory could not be created.
    /// * [`FileSystemError::NotADirectory`] if the path exists but is not a directory.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use mirrorgen_utils::error::FileSystemResult;
    /// use mirrorgen_utils::fs::{FileSystemProvider, StandardFileSystemProvider};
    ///
    /// fn main() -> FileSystemResult<()> {
    ///     StandardFileSystemProvider.ensure_dir_exists("/tmp/mirror/pkg-0")?;
    ///     Ok(())
    /// }
    /// ```
    fn ensure_dir_exists<P: AsRef<Path>>(&self, path: P) -> FileSystemResult<()>;

    /// Writes `contents` to `path`, replacing whatever was there.
    ///
    /// Writing the same contents to the same path twice leaves the filesystem in the
    /// same state, so callers can retry freely.
    fn write_file<P: AsRef<Path>, C: AsRef<[u8]>>(
        &self,
        path: P,
        contents: C,
    ) -> FileSystemResult<()>;

    /// Returns the absolute, symlink-free form of an existing path.
    fn absolute<P: AsRef<Path>>(&self, path: P) -> FileSystemResult<PathBuf>;
}

#[derive(Default, Clone)]
pub struct StandardFileSystemProvider;

fn file_error(path: &Path, action: &'static str) -> impl FnOnce(std::io::Error) -> FileSystemError {
    let path = path.to_path_buf();
    move |source| {
        FileSystemError::File {
            path,
            action,
            source,
        }
    }
}

fn dir_error(path: &Path, action: &'static str) -> impl FnOnce(std::io::Error) -> FileSystemError {
    let path = path.to_path_buf();
    move |source| {
        FileSystemError::Directory {
            path,
            action,
            source,
        }
    }
}

impl FileSystemProvider for StandardFileSystemProvider {
    fn safe_remove<P: AsRef<Path>>(&self, path: P) -> FileSystemResult<()> {
        let path = path.as_ref();
        match fs::symlink_metadata(path) {
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(file_error(path, "inspect")(err)),
            Ok(meta) if meta.is_dir() => {
                fs::remove_dir_all(path).map_err(file_error(path, "remove"))
            }
            Ok(_) => fs::remove_file(path).map_err(file_error(path, "remove")),
        }
    }

    fn ensure_dir_exists<P: AsRef<Path>>(&self, path: P) -> FileSystemResult<()> {
        let path = path.as_ref();
        if path.is_dir() {
            return Ok(());
        }
        if path.exists() {
            return Err(FileSystemError::NotADirectory {
                path: path.to_path_buf(),
            });
        }
        fs::create_dir_all(path).map_err(dir_error(path, "create"))
    }

    fn write_file<P: AsRef<Path>, C: AsRef<[u8]>>(
        &self,
        path: P,
        contents: C,
    ) -> FileSystemResult<()> {
        let path = path.as_ref();
        fs::write(path, contents).map_err(file_error(path, "write"))
    }

    fn absolute<P: AsRef<Path>>(&self, path: P) -> FileSystemResult<PathBuf> {
        let path = path.as_ref();
        fs::canonicalize(path).map_err(dir_error(path, "resolve"))
    }
}

/// Creates a directory structure if it doesn't exist.
///
/// See [`FileSystemProvider::ensure_dir_exists`].
pub fn ensure_dir_exists<P: AsRef<Path>>(path: P) -> FileSystemResult<()> {
    StandardFileSystemProvider.ensure_dir_exists(path)
}
