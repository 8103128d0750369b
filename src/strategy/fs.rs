//! File system operations consumed by the caching strategy

#[cfg(test)]
use mockall::automock;

use std::io;
use std::path::{Path, PathBuf};

#[cfg_attr(test, automock)]
pub trait FileSystem: Send + Sync {
    fn file_exists(&self, path: &Path) -> bool;

    /// Full paths of the immediate subdirectories of `path`
    fn list_directories(&self, path: &Path) -> io::Result<Vec<PathBuf>>;

    /// Create `path` and its parents; an existing directory is not an error
    fn create_directory(&self, path: &Path) -> io::Result<()>;

    /// Copy `from` to `to`. Without `overwrite`, an existing `to` is an error.
    fn copy_file(&self, from: &Path, to: &Path, overwrite: bool) -> io::Result<()>;
}

/// [`FileSystem`] backed by the local disk
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

impl FileSystem for LocalFileSystem {
    fn file_exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn list_directories(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let mut directories = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                directories.push(entry.path());
            }
        }
        directories.sort();
        Ok(directories)
    }

    fn create_directory(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn copy_file(&self, from: &Path, to: &Path, overwrite: bool) -> io::Result<()> {
        if !overwrite && to.exists() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} already exists", to.display()),
            ));
        }
        std::fs::copy(from, to)?;
        Ok(())
    }
}
