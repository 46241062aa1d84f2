//! Service settings.
//!
//! Values are layered: built-in defaults, then an optional TOML file
//! (`importer.toml`, or the path in `IMPORTER_CONFIG`), then environment
//! variables such as `IMPORTER__IMPORT__MAX_FILE_SIZE_BYTES=1048576`.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

const DEFAULT_CONFIG_PATH: &str = "importer";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub import: ImportConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// SQLite file holding the `targets` table.
    pub database_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImportConfig {
    /// Uploads larger than this are refused before parsing.
    pub max_file_size_bytes: u64,
    /// Single ASCII character separating columns.
    pub delimiter: String,
    /// Value stored when a row leaves `department` empty.
    pub default_department: String,
    pub job_channel_capacity: usize,
}

impl ImportConfig {
    pub fn delimiter_byte(&self) -> Result<u8, ConfigError> {
        match self.delimiter.as_bytes() {
            [b] if b.is_ascii() => Ok(*b),
            _ => Err(ConfigError::Message(format!(
                "import.delimiter must be a single ASCII character, got {:?}",
                self.delimiter
            ))),
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        let path = env::var("IMPORTER_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(&path)
    }

    /// Loads settings using `path` (extension optional) as the file layer.
    /// A missing file is not an error.
    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        let settings: Settings = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080_i64)?
            .set_default("storage.database_path", "targets.sqlite")?
            .set_default("import.max_file_size_bytes", 5_i64 * 1024 * 1024)?
            .set_default("import.delimiter", ",")?
            .set_default("import.default_department", "Unassigned")?
            .set_default("import.job_channel_capacity", 100_i64)?
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("IMPORTER").separator("__"))
            .build()?
            .try_deserialize()?;

        settings.import.delimiter_byte()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_apply_without_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let settings = Settings::load_from(missing.to_str().unwrap()).unwrap();

        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.import.max_file_size_bytes, 5 * 1024 * 1024);
        assert_eq!(settings.import.delimiter_byte().unwrap(), b',');
        assert_eq!(settings.import.default_department, "Unassigned");
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("importer.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[import]\n\
             max_file_size_bytes = 1024\n\
             delimiter = \";\"\n\
             default_department = \"General\""
        )
        .unwrap();

        let settings = Settings::load_from(path.to_str().unwrap()).unwrap();

        assert_eq!(settings.import.max_file_size_bytes, 1024);
        assert_eq!(settings.import.delimiter_byte().unwrap(), b';');
        assert_eq!(settings.import.default_department, "General");
        assert_eq!(settings.server.host, "127.0.0.1");
    }

    #[test]
    fn multi_character_delimiter_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("importer.toml");
        std::fs::write(&path, "[import]\ndelimiter = \"::\"\n").unwrap();

        assert!(Settings::load_from(path.to_str().unwrap()).is_err());
    }
}
