//! Errors raised while reading, validating or writing `.grafico/config.toml`.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    /// A config layer (global, local or `--config`) exists but cannot be read,
    /// or an explicit `--config` file is missing.
    #[error("cannot read configuration {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not valid configuration TOML: {source}")]
    ParseToml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Rendering defaults for `grafico config init`.
    #[error("cannot render configuration as TOML: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("cannot write configuration {path}: {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The `.grafico` directory could not be created.
    #[error("cannot create {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No home directory, so there is no `~/.grafico` layer to initialize.
    #[error("no home directory for the global ~/.grafico configuration")]
    NoHomeDir,

    /// A setting failed `GraficoConfig::validate`, e.g. `export.indent` or
    /// `logging.level`.
    #[error("{key}: {message}")]
    InvalidValue { key: String, message: String },
}

impl ConfigError {
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadFile {
            path: path.into(),
            source,
        }
    }

    pub fn parse_toml(path: impl Into<PathBuf>, source: toml::de::Error) -> Self {
        Self::ParseToml {
            path: path.into(),
            source,
        }
    }

    pub fn write_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::WriteFile {
            path: path.into(),
            source,
        }
    }

    pub fn create_dir(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::CreateDir {
            path: path.into(),
            source,
        }
    }

    /// Rejected value for the dotted setting `key`.
    pub fn invalid_value(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_value_names_the_setting() {
        let err = ConfigError::invalid_value("export.indent", "must be at most 16");
        assert_eq!(err.to_string(), "export.indent: must be at most 16");
    }

    #[test]
    fn test_no_home_dir_mentions_global_layer() {
        assert!(ConfigError::NoHomeDir.to_string().contains("~/.grafico"));
    }

    #[test]
    fn test_read_file_keeps_path() {
        let source = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = ConfigError::read_file("/etc/grafico.toml", source);
        assert!(err.to_string().contains("/etc/grafico.toml"));
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }
}
