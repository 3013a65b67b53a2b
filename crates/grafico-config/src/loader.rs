//! Configuration loader with inheritance support.
//!
//! Loads configuration from multiple sources and merges them:
//! 1. Global config: `~/.grafico/config.toml`
//! 2. Local config: `.grafico/config.toml` (in the working directory),
//!    or an explicit file passed on the command line
//! 3. CLI overrides
//!
//! Later sources override earlier ones.

use crate::error::ConfigError;
use crate::{
    ConfigOverrides, ExportConfig, GraficoConfig, ImportConfig, LogFormat, LoggingConfig,
};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Global configuration directory name.
const GLOBAL_CONFIG_DIR: &str = ".grafico";

/// Local configuration directory name.
const LOCAL_CONFIG_DIR: &str = ".grafico";

/// Configuration loader with caching and inheritance support.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Global config directory (e.g., `~/.grafico`)
    global_config_dir: Option<PathBuf>,

    /// Cached global config
    global_config: Option<GraficoConfig>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new configuration loader.
    ///
    /// Automatically detects the global config directory (`~/.grafico`).
    pub fn new() -> Self {
        let global_config_dir = dirs::home_dir().map(|h| h.join(GLOBAL_CONFIG_DIR));

        Self {
            global_config_dir,
            global_config: None,
        }
    }

    /// Create a loader with a custom global config directory.
    ///
    /// Useful for testing.
    pub fn with_global_dir(global_dir: impl Into<PathBuf>) -> Self {
        Self {
            global_config_dir: Some(global_dir.into()),
            global_config: None,
        }
    }

    /// Get the global config file path.
    pub fn global_config_path(&self) -> Option<PathBuf> {
        self.global_config_dir
            .as_ref()
            .map(|d| d.join(CONFIG_FILE_NAME))
    }

    /// Get the local config file path for a working directory.
    pub fn local_config_path(&self, root: &Path) -> PathBuf {
        root.join(LOCAL_CONFIG_DIR).join(CONFIG_FILE_NAME)
    }

    /// Load configuration for a working directory with optional CLI overrides.
    ///
    /// Merges config in order: global → local → overrides.
    pub fn load(
        &mut self,
        root: &Path,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<GraficoConfig, ConfigError> {
        let local = self.load_local(root)?;
        self.load_layered(local, overrides)
    }

    /// Load configuration with an explicit file in place of the local one.
    ///
    /// Merges config in order: global → `path` → overrides. A missing
    /// `path` is an error, unlike a missing local config.
    pub fn load_with_file(
        &mut self,
        path: &Path,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<GraficoConfig, ConfigError> {
        debug!("Loading config from {:?}", path);
        let explicit = load_config_file(path)?;
        self.load_layered(Some(explicit), overrides)
    }

    fn load_layered(
        &mut self,
        local: Option<GraficoConfig>,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<GraficoConfig, ConfigError> {
        let mut config = GraficoConfig::default();

        if let Some(global_config) = self.load_global()? {
            config = merge_configs(config, global_config);
        }

        if let Some(local_config) = local {
            config = merge_configs(config, local_config);
        }

        if let Some(ovr) = overrides {
            config.apply_overrides(ovr);
        }

        Ok(config)
    }

    /// Load only the global configuration.
    pub fn load_global(&mut self) -> Result<Option<GraficoConfig>, ConfigError> {
        if let Some(ref config) = self.global_config {
            return Ok(Some(config.clone()));
        }

        let Some(global_path) = self.global_config_path() else {
            debug!("No home directory found, skipping global config");
            return Ok(None);
        };

        if !global_path.exists() {
            trace!("Global config not found at {:?}", global_path);
            return Ok(None);
        }

        debug!("Loading global config from {:?}", global_path);
        let config = load_config_file(&global_path)?;

        self.global_config = Some(config.clone());

        Ok(Some(config))
    }

    /// Load only the local configuration for a working directory.
    pub fn load_local(&self, root: &Path) -> Result<Option<GraficoConfig>, ConfigError> {
        let local_path = self.local_config_path(root);

        if !local_path.exists() {
            trace!("Local config not found at {:?}", local_path);
            return Ok(None);
        }

        debug!("Loading local config from {:?}", local_path);
        load_config_file(&local_path).map(Some)
    }

    /// Save configuration to the local config file for a working directory.
    pub fn save_local(&self, root: &Path, config: &GraficoConfig) -> Result<(), ConfigError> {
        let local_path = self.local_config_path(root);
        save_config_file(&local_path, config)
    }

    /// Initialize global configuration directory.
    ///
    /// Creates `~/.grafico/config.toml` with default configuration.
    pub fn init_global(&self) -> Result<PathBuf, ConfigError> {
        let Some(ref global_dir) = self.global_config_dir else {
            return Err(ConfigError::NoHomeDir);
        };
        init_config_dir(global_dir)
    }

    /// Initialize local configuration for a working directory.
    ///
    /// Creates `.grafico/config.toml` with default configuration. An
    /// existing file is left as it is.
    pub fn init_local(&self, root: &Path) -> Result<PathBuf, ConfigError> {
        init_config_dir(&root.join(LOCAL_CONFIG_DIR))
    }

    /// Clear cached global configuration.
    ///
    /// Forces reload on next `load_global()` call.
    pub fn clear_cache(&mut self) {
        self.global_config = None;
    }
}

fn init_config_dir(dir: &Path) -> Result<PathBuf, ConfigError> {
    if !dir.exists() {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::create_dir(dir, e))?;
    }

    let config_path = dir.join(CONFIG_FILE_NAME);
    if !config_path.exists() {
        save_config_file(&config_path, &GraficoConfig::default())?;
    }

    Ok(config_path)
}

/// Load a configuration file from disk.
fn load_config_file(path: &Path) -> Result<GraficoConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;

    toml::from_str(&content).map_err(|e| ConfigError::parse_toml(path, e))
}

/// Save a configuration file to disk.
fn save_config_file(path: &Path, config: &GraficoConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))
}

/// Merge two configurations, with `overlay` taking precedence.
///
/// Overlay values equal to the default keep the base value, so a partial
/// file only changes what it mentions.
fn merge_configs(base: GraficoConfig, overlay: GraficoConfig) -> GraficoConfig {
    GraficoConfig {
        export: merge_export(base.export, overlay.export),
        import: merge_import(base.import, overlay.import),
        logging: merge_logging(base.logging, overlay.logging),
    }
}

fn merge_export(base: ExportConfig, overlay: ExportConfig) -> ExportConfig {
    let defaults = ExportConfig::default();
    ExportConfig {
        indent: if overlay.indent != defaults.indent {
            overlay.indent
        } else {
            base.indent
        },
        image_attributes: if overlay.image_attributes != defaults.image_attributes {
            overlay.image_attributes
        } else {
            base.image_attributes
        },
    }
}

fn merge_import(base: ImportConfig, overlay: ImportConfig) -> ImportConfig {
    ImportConfig {
        skip_hidden: if overlay.skip_hidden != ImportConfig::default().skip_hidden {
            overlay.skip_hidden
        } else {
            base.skip_hidden
        },
    }
}

fn merge_logging(base: LoggingConfig, overlay: LoggingConfig) -> LoggingConfig {
    LoggingConfig {
        level: if overlay.level != "info" {
            overlay.level
        } else {
            base.level
        },
        format: if overlay.format != LogFormat::Text {
            overlay.format
        } else {
            base.format
        },
    }
}
