//! Renderer host configuration.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default number of unreachable GC steps before a node is deleted.
pub const DEFAULT_TERMINAL_GENERATION: u32 = 4;

/// How instruction batches are printed by a host that writes them out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One compact JSON array per batch, one batch per line.
    #[default]
    Json,
    /// Indented JSON.
    Pretty,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => f.write_str("json"),
            Self::Pretty => f.write_str("pretty"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            other => Err(ConfigError::invalid_value(
                "output",
                format!("expected 'json' or 'pretty', found '{other}'"),
            )),
        }
    }
}

/// Settings for a renderer host.
///
/// Every field has a default, so an empty TOML file is a valid configuration:
///
/// ```toml
/// terminal_generation = 4
/// gc_steps_per_render = 0
/// log_filter = "info"
/// output = "json"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RendererConfig {
    /// GC steps an unreachable node survives before deletion (at least 1).
    pub terminal_generation: u32,
    /// Garbage-collection steps a host runs after each render.
    pub gc_steps_per_render: u32,
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub log_filter: String,
    /// Batch output format.
    pub output: OutputFormat,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            terminal_generation: DEFAULT_TERMINAL_GENERATION,
            gc_steps_per_render: 0,
            log_filter: "info".to_string(),
            output: OutputFormat::Json,
        }
    }
}

impl RendererConfig {
    /// Load and validate a configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_toml(&content)
    }

    /// Parse and validate a configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Save the configuration to a TOML file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.terminal_generation == 0 {
            return Err(ConfigError::invalid_value(
                "terminal_generation",
                "must be at least 1",
            ));
        }
        if self.log_filter.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "log_filter",
                "must not be empty",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(RendererConfig::from_toml("").unwrap(), RendererConfig::default());
    }

    #[test]
    fn parses_all_fields() {
        let config = RendererConfig::from_toml(
            r#"
terminal_generation = 8
gc_steps_per_render = 1
log_filter = "signet_core=debug"
output = "pretty"
"#,
        )
        .unwrap();
        assert_eq!(config.terminal_generation, 8);
        assert_eq!(config.gc_steps_per_render, 1);
        assert_eq!(config.log_filter, "signet_core=debug");
        assert_eq!(config.output, OutputFormat::Pretty);
    }

    #[test]
    fn zero_terminal_generation_is_rejected() {
        let err = RendererConfig::from_toml("terminal_generation = 0").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { field: "terminal_generation", .. }
        ));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(matches!(
            RendererConfig::from_toml("terminal = 3"),
            Err(ConfigError::TomlParse(_))
        ));
    }

    #[test]
    fn toml_round_trip() {
        let config = RendererConfig {
            gc_steps_per_render: 2,
            output: OutputFormat::Pretty,
            ..RendererConfig::default()
        };
        let text = config.to_toml().unwrap();
        assert_eq!(RendererConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn output_format_from_str() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("pretty".parse::<OutputFormat>().unwrap(), OutputFormat::Pretty);
        assert!("yaml".parse::<OutputFormat>().is_err());
    }
}
