use crate::{Result, SteamboatError};
use std::path::{Path, PathBuf};

/// Check that a file exists and is not empty, returning its absolute path
pub fn check_file<P: AsRef<Path>>(filename: P) -> Result<PathBuf> {
    let path = filename.as_ref();
    let metadata = match std::fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SteamboatError::NotFound(format!(
                "File ('{}') not found, cannot continue",
                path.display()
            )));
        }
        Err(e) => return Err(e.into()),
    };

    if metadata.len() == 0 {
        return Err(SteamboatError::InvalidInput(format!(
            "File ('{}') is empty, cannot continue",
            path.display()
        )));
    }

    Ok(std::path::absolute(path)?)
}

/// Refuse to clobber an existing output unless `force` is set
pub fn file_exists_error<P: AsRef<Path>>(filename: P, force: bool) -> Result<()> {
    let path = filename.as_ref();
    if path.exists() && !force {
        return Err(SteamboatError::AlreadyExists(format!(
            "Results already exists! Use --force to overwrite: {}",
            path.display()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_check_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.tsv");
        std::fs::write(&path, "sample_id\n").unwrap();

        let checked = check_file(&path).unwrap();
        assert!(checked.is_absolute());
        assert!(checked.ends_with("data.tsv"));
    }

    #[test]
    fn test_check_file_missing() {
        let dir = TempDir::new().unwrap();
        let err = check_file(dir.path().join("missing.tsv")).unwrap_err();
        assert!(matches!(err, SteamboatError::NotFound(_)));
        assert!(err.to_string().contains("not found, cannot continue"));
    }

    #[test]
    fn test_check_file_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.tsv");
        std::fs::write(&path, "").unwrap();

        let err = check_file(&path).unwrap_err();
        assert!(matches!(err, SteamboatError::InvalidInput(_)));
        assert!(err.to_string().contains("is empty"));
    }

    #[test]
    fn test_file_exists_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        assert!(file_exists_error(&path, false).is_ok());

        std::fs::write(&path, "x").unwrap();
        let err = file_exists_error(&path, false).unwrap_err();
        assert!(err.to_string().contains("Use --force to overwrite"));
        assert!(file_exists_error(&path, true).is_ok());
    }
}
