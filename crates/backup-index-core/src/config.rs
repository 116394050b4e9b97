use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::Deserialize;
use std::path::Path;

const DEFAULT_SETTINGS_NAME: &str = "Settings";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub backup_path: String,
    pub database_path: String,
    pub max_upload_retries: u32,
    pub chunk_size: usize,
    pub ignore_patterns: Vec<String>,
    pub remote: RemoteConfig,
}

/// Settings for the bundled directory-backed remote store.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
    pub root: String,
}

/// Load settings from `settings_path` (or `Settings.{yaml,toml,...}` in the working
/// directory), layered with `BACKUP_INDEX__*` environment variables.
///
/// Every field of [`AppConfig`] is required; a missing one fails here rather than at
/// first use.
pub fn load_configuration(settings_path: Option<&str>) -> Result<AppConfig, ConfigError> {
    let file_source = match settings_path {
        Some(path) => ConfigFile::with_name(path).required(true),
        None => ConfigFile::with_name(DEFAULT_SETTINGS_NAME).required(false),
    };

    let builder = Config::builder()
        .add_source(file_source)
        .add_source(
            Environment::with_prefix("BACKUP_INDEX")
                .prefix_separator("__")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("ignore_patterns")
                .try_parsing(true),
        )
        .build()?;

    let config = builder.try_deserialize::<AppConfig>()?;
    config.validate()?;
    Ok(config)
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::Message(
                "chunk_size must be at least 1".to_string(),
            ));
        }
        if self.max_upload_retries == 0 {
            return Err(ConfigError::Message(
                "max_upload_retries must be at least 1".to_string(),
            ));
        }
        if !Path::new(&self.backup_path).is_dir() {
            return Err(ConfigError::Message(format!(
                "backup_path '{}' is not a directory",
                self.backup_path
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_settings(dir: &Path, backup: &Path, body_extra: &str) -> String {
        let settings = dir.join("settings.yaml");
        fs::write(
            &settings,
            format!(
                "backup_path: \"{}\"\n\
                 database_path: \"index.db\"\n\
                 chunk_size: 25\n\
                 ignore_patterns: [\"*.tmp\"]\n\
                 remote:\n  root: \"/srv/backup\"\n{}",
                backup.display(),
                body_extra
            ),
        )
        .unwrap();
        settings.to_string_lossy().into_owned()
    }

    #[test]
    fn test_load_complete_settings() {
        let tmp = tempdir().unwrap();
        let settings = write_settings(tmp.path(), tmp.path(), "max_upload_retries: 3\n");

        let config = load_configuration(Some(&settings)).unwrap();
        assert_eq!(config.max_upload_retries, 3);
        assert_eq!(config.chunk_size, 25);
        assert_eq!(config.ignore_patterns, vec!["*.tmp".to_string()]);
        assert_eq!(config.remote.root, "/srv/backup");
    }

    #[test]
    fn test_missing_field_fails_at_load() {
        let tmp = tempdir().unwrap();
        // no max_upload_retries
        let settings = write_settings(tmp.path(), tmp.path(), "");

        assert!(load_configuration(Some(&settings)).is_err());
    }

    #[test]
    fn test_validate_rejects_zero_chunk_size() {
        let tmp = tempdir().unwrap();
        let config = AppConfig {
            backup_path: tmp.path().to_string_lossy().into_owned(),
            database_path: "index.db".to_string(),
            max_upload_retries: 3,
            chunk_size: 0,
            ignore_patterns: vec![],
            remote: RemoteConfig {
                root: "remote".to_string(),
            },
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_missing_backup_path() {
        let config = AppConfig {
            backup_path: "/definitely/not/here".to_string(),
            database_path: "index.db".to_string(),
            max_upload_retries: 3,
            chunk_size: 10,
            ignore_patterns: vec![],
            remote: RemoteConfig {
                root: "remote".to_string(),
            },
        };
        assert!(config.validate().is_err());
    }
}
