//! Preparing the checkout directory.

use std::fs;
use std::io;
use std::path::Path;

use log::info;

use crate::error::{Error, Result};

/// Remove everything inside `dir` but keep `dir` itself.
///
/// The directory may be a mounted volume, so it is never unlinked. A missing
/// directory is left alone; a path that is not a directory is an error.
pub fn clean_checkout_dir(dir: &Path) -> Result<()> {
    let metadata = match fs::metadata(dir) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };
    if !metadata.is_dir() {
        return Err(Error::validation(format!(
            "checkout path exists but is not a directory: {}",
            dir.display()
        )));
    }

    info!("Cleaning existing checkout directory: {}", dir.display());

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
    }

    Ok(())
}

/// Create the checkout directory and its parents.
pub fn prepare_checkout_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_clean_removes_contents_keeps_dir() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("checkout");
        fs::create_dir_all(dir.join(".git/objects")).unwrap();
        fs::write(dir.join("file.txt"), "content").unwrap();
        fs::write(dir.join(".hidden"), "content").unwrap();
        std::os::unix::fs::symlink("/etc", dir.join("etc-link")).unwrap();

        clean_checkout_dir(&dir).unwrap();

        assert!(dir.is_dir());
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 0);
        assert!(Path::new("/etc").is_dir());
    }

    #[test]
    fn test_clean_missing_dir_is_ok() {
        let temp = TempDir::new().unwrap();
        assert!(clean_checkout_dir(&temp.path().join("missing")).is_ok());
        assert!(!temp.path().join("missing").exists());
    }

    #[test]
    fn test_clean_file_is_error() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("file");
        fs::write(&file, "content").unwrap();

        let err = clean_checkout_dir(&file).unwrap_err();
        assert!(err.to_string().contains("not a directory"));
        assert!(file.is_file());
    }

    #[test]
    fn test_prepare_creates_nested_dirs() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("output/source");
        prepare_checkout_dir(&dir).unwrap();
        assert!(dir.is_dir());
    }
}
