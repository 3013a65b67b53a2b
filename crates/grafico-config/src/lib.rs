//! Grafico Configuration Management
//!
//! Provides configuration loading with support for:
//! - Global config: `~/.grafico/config.toml`
//! - Local config: `.grafico/config.toml` (in the working directory)
//! - CLI overrides via `ConfigOverrides`
//!
//! Configuration is merged in order: global → local → CLI overrides.

mod error;
mod loader;

pub use error::ConfigError;
pub use loader::ConfigLoader;

use serde::{Deserialize, Serialize};

/// Default indentation of exported node files.
pub const DEFAULT_INDENT: usize = 2;

/// Largest accepted indentation.
pub const MAX_INDENT: usize = 16;

/// Payload attribute that carries image paths unless configured otherwise.
pub const DEFAULT_IMAGE_ATTRIBUTE: &str = "imagePath";

/// Attribute names the file format writes itself.
const RESERVED_ATTRIBUTES: &[&str] = &[
    "id",
    "type",
    "name",
    "source",
    "target",
    "element",
    "relationship",
    "view",
];

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Root configuration for Grafico.
///
/// Represents the fully merged configuration from all sources.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct GraficoConfig {
    /// Export configuration
    pub export: ExportConfig,

    /// Import configuration
    pub import: ImportConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Export configuration.
///
/// # Example TOML
///
/// ```toml
/// [export]
/// indent = 4
/// image_attributes = ["imagePath", "icon"]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExportConfig {
    /// Spaces per indentation level in node files
    pub indent: usize,

    /// Payload attributes whose values are image paths
    pub image_attributes: Vec<String>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            indent: DEFAULT_INDENT,
            image_attributes: vec![DEFAULT_IMAGE_ATTRIBUTE.to_string()],
        }
    }
}

/// Import configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ImportConfig {
    /// Skip dot-files and dot-directories such as `.DS_Store` or `.git`
    pub skip_hidden: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self { skip_hidden: true }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON structured logging
    Json,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::invalid_value(
                "logging.format",
                format!("unknown log format '{}'. Valid values: text, json", s),
            )),
        }
    }
}

/// CLI overrides for configuration values.
///
/// Used to apply command-line arguments over file-based config.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Override log level
    pub log_level: Option<String>,

    /// Override log format
    pub log_format: Option<LogFormat>,

    /// Override export indentation
    pub indent: Option<usize>,

    /// Override hidden entry handling on import
    pub skip_hidden: Option<bool>,
}

impl GraficoConfig {
    /// Apply CLI overrides to this configuration.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(ref level) = overrides.log_level {
            self.logging.level = level.clone();
        }

        if let Some(format) = overrides.log_format {
            self.logging.format = format;
        }

        if let Some(indent) = overrides.indent {
            self.export.indent = indent;
        }

        if let Some(skip_hidden) = overrides.skip_hidden {
            self.import.skip_hidden = skip_hidden;
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.export.indent > MAX_INDENT {
            return Err(ConfigError::invalid_value(
                "export.indent",
                format!("must be at most {}, got {}", MAX_INDENT, self.export.indent),
            ));
        }

        if self.export.image_attributes.is_empty() {
            return Err(ConfigError::invalid_value(
                "export.image_attributes",
                "must list at least one attribute",
            ));
        }
        for attribute in &self.export.image_attributes {
            if !is_attribute_name(attribute) {
                return Err(ConfigError::invalid_value(
                    "export.image_attributes",
                    format!("'{}' is not a usable attribute name", attribute),
                ));
            }
        }

        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::invalid_value(
                "logging.level",
                format!(
                    "unknown level '{}'. Valid values: {}",
                    self.logging.level,
                    LOG_LEVELS.join(", ")
                ),
            ));
        }

        Ok(())
    }
}

/// Plain XML attribute name that the file format does not reserve.
fn is_attribute_name(name: &str) -> bool {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    valid_start
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        && !name.to_ascii_lowercase().starts_with("xml")
        && !RESERVED_ATTRIBUTES.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = GraficoConfig::default();
        assert_eq!(config.export.indent, 2);
        assert_eq!(config.export.image_attributes, vec!["imagePath"]);
        assert!(config.import.skip_hidden);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Text);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_apply_overrides() {
        let mut config = GraficoConfig::default();
        let overrides = ConfigOverrides {
            log_level: Some("debug".to_string()),
            indent: Some(4),
            skip_hidden: Some(false),
            ..Default::default()
        };

        config.apply_overrides(&overrides);

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.export.indent, 4);
        assert!(!config.import.skip_hidden);
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: GraficoConfig = toml::from_str(
            r#"
            [export]
            indent = 4
            "#,
        )
        .unwrap();

        assert_eq!(config.export.indent, 4);
        assert_eq!(config.export.image_attributes, vec!["imagePath"]);
        assert!(config.import.skip_hidden);
    }

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("TEXT".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert!("yaml".parse::<LogFormat>().is_err());
        assert_eq!(LogFormat::Json.to_string(), "json");
    }

    #[test]
    fn test_validate_indent() {
        let mut config = GraficoConfig::default();
        config.export.indent = 17;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("export.indent"));

        config.export.indent = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_image_attributes() {
        let mut config = GraficoConfig::default();
        config.export.image_attributes.clear();
        assert!(config.validate().is_err());

        config.export.image_attributes = vec!["icon".to_string(), "imagePath".to_string()];
        assert!(config.validate().is_ok());

        for bad in ["", "1st", "has space", "id", "xmlns"] {
            config.export.image_attributes = vec![bad.to_string()];
            assert!(config.validate().is_err(), "'{}' should be rejected", bad);
        }
    }

    #[test]
    fn test_validate_log_level() {
        let mut config = GraficoConfig::default();
        config.logging.level = "WARN".to_string();
        assert!(config.validate().is_ok());

        config.logging.level = "loud".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("logging.level"));
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = GraficoConfig::default();
        config.export.image_attributes.push("icon".to_string());
        config.logging.format = LogFormat::Json;

        let toml_str = toml::to_string(&config).unwrap();
        let parsed: GraficoConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }
}
