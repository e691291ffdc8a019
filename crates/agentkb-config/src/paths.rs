//! Application paths management.

use directories::ProjectDirs;
use std::path::PathBuf;

/// Manages all application paths following platform conventions.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
    pub config_file: PathBuf,
    pub database_file: PathBuf,
    pub blob_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl AppPaths {
    /// Create paths using platform-specific directories.
    pub fn new() -> Option<Self> {
        let proj_dirs = ProjectDirs::from("com", "agentkb", "agentkb")?;

        let config_dir = proj_dirs.config_dir().to_path_buf();
        let data_dir = proj_dirs.data_dir().to_path_buf();

        Some(Self::from_dirs(config_dir, data_dir))
    }

    fn from_dirs(config_dir: PathBuf, data_dir: PathBuf) -> Self {
        Self {
            config_file: config_dir.join("config.toml"),
            database_file: data_dir.join("agentkb.db"),
            blob_dir: data_dir.join("blobs"),
            log_dir: data_dir.join("logs"),
            config_dir,
            data_dir,
        }
    }

    /// Use an explicit config file instead of the platform default.
    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if let Some(parent) = path.parent() {
            self.config_dir = parent.to_path_buf();
        }
        self.config_file = path;
        self
    }

    /// Relocate the database, blobs and logs under `data_dir`.
    ///
    /// A leading `~` is expanded to the home directory.
    pub fn with_data_dir(self, data_dir: &str) -> Self {
        let expanded = shellexpand::tilde(data_dir).into_owned();
        let config_file = self.config_file.clone();
        let mut paths = Self::from_dirs(self.config_dir, PathBuf::from(expanded));
        paths.config_file = config_file;
        paths
    }

    /// Create all necessary directories.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        std::fs::create_dir_all(&self.data_dir)?;
        std::fs::create_dir_all(&self.blob_dir)?;
        std::fs::create_dir_all(&self.log_dir)?;
        Ok(())
    }

    /// Check if agentkb has been initialized.
    pub fn is_initialized(&self) -> bool {
        self.config_file.exists() && self.database_file.exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_paths_creation() {
        let paths = AppPaths::new();
        assert!(paths.is_some());

        let paths = paths.unwrap();
        assert!(paths.config_file.to_string_lossy().contains("config.toml"));
        assert!(paths.database_file.to_string_lossy().contains("agentkb.db"));
        assert!(paths.blob_dir.ends_with("blobs"));
    }

    #[test]
    fn test_data_dir_override_keeps_config_file() {
        let paths = AppPaths::new()
            .unwrap()
            .with_config_file("/etc/agentkb/custom.toml")
            .with_data_dir("/srv/agentkb");

        assert_eq!(paths.config_file, PathBuf::from("/etc/agentkb/custom.toml"));
        assert_eq!(paths.database_file, PathBuf::from("/srv/agentkb/agentkb.db"));
        assert_eq!(paths.blob_dir, PathBuf::from("/srv/agentkb/blobs"));
    }
}
