use std::io;
use std::path::{Path, PathBuf};

/// Move `source` over `destination`.
///
/// An existing destination is removed first; a destination that does not
/// exist is not an error. A move across file systems falls back to copy and
/// delete.
pub fn replace_file(source: &Path, destination: &Path) -> io::Result<()> {
    remove_if_exists(destination)?;

    match std::fs::rename(source, destination) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            std::fs::copy(source, destination)?;
            std::fs::remove_file(source)
        }
        Err(e) => Err(e),
    }
}

/// Create an empty, uniquely named file in `dir` and return its path.
///
/// The file is not removed automatically; it is meant to be moved over its
/// final destination with [`replace_file`].
pub fn temp_file_in(dir: &Path, name: &str) -> io::Result<PathBuf> {
    tempfile::Builder::new()
        .prefix(&format!(".{name}."))
        .suffix(".tmp")
        .tempfile_in(dir)?
        .into_temp_path()
        .keep()
        .map_err(|e| e.error)
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn replace_file_overwrites_existing_destination() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("new.exe");
        let destination = temp_dir.path().join("paket.exe");
        std::fs::write(&source, "new").unwrap();
        std::fs::write(&destination, "old").unwrap();

        replace_file(&source, &destination).unwrap();

        assert_eq!(std::fs::read_to_string(&destination).unwrap(), "new");
        assert!(!source.exists());
    }

    #[test]
    fn replace_file_tolerates_missing_destination() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("new.exe");
        let destination = temp_dir.path().join("paket.exe");
        std::fs::write(&source, "new").unwrap();

        replace_file(&source, &destination).unwrap();

        assert_eq!(std::fs::read_to_string(&destination).unwrap(), "new");
    }

    #[test]
    fn replace_file_fails_for_missing_source() {
        let temp_dir = TempDir::new().unwrap();

        let result = replace_file(
            &temp_dir.path().join("missing.exe"),
            &temp_dir.path().join("paket.exe"),
        );

        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn temp_file_in_creates_distinct_files_next_to_destination() {
        let temp_dir = TempDir::new().unwrap();

        let first = temp_file_in(temp_dir.path(), "paket.exe").unwrap();
        let second = temp_file_in(temp_dir.path(), "paket.exe").unwrap();

        assert_ne!(first, second);
        assert_eq!(first.parent(), Some(temp_dir.path()));
        assert!(first.is_file());
        assert!(second.is_file());
    }
}
