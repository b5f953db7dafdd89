use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Overrides the database location.
pub const DB_PATH_ENV: &str = "CALTRACK_DB";

pub struct Config {
    pub db_path: PathBuf,
}

fn ensure_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create data directory: {}", dir.display()))
}

impl Config {
    pub fn load() -> Result<Self> {
        match std::env::var_os(DB_PATH_ENV).filter(|v| !v.is_empty()) {
            Some(path) => Self::with_db_path(PathBuf::from(path)),
            None => Self::from_project_dirs(),
        }
    }

    fn from_project_dirs() -> Result<Self> {
        let proj_dirs =
            ProjectDirs::from("", "", "caltrack").context("Could not determine home directory")?;

        let data_dir = proj_dirs.data_dir();
        ensure_dir(data_dir)?;

        Ok(Config {
            db_path: data_dir.join("caltrack.db"),
        })
    }

    /// Use `db_path` as given, creating its parent directory if needed.
    pub fn with_db_path(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            ensure_dir(parent)?;
        }
        Ok(Config { db_path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_db_path_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("track.db");
        let config = Config::with_db_path(db_path.clone()).unwrap();
        assert_eq!(config.db_path, db_path);
        assert!(dir.path().join("nested").is_dir());
    }

    #[test]
    fn test_with_bare_file_name() {
        let config = Config::with_db_path(PathBuf::from("track.db")).unwrap();
        assert_eq!(config.db_path, PathBuf::from("track.db"));
    }
}
