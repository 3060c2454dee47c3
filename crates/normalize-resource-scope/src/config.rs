//! Lowering configuration.
//!
//! Example config.toml:
//! ```toml
//! target = "lua"
//! indent_width = 4
//! temp_prefix = "_scope_"
//! allow_top_level_await = false
//! ```

use crate::binding::is_identifier;
use crate::error::ConfigError;
use crate::registry::writer_for_language;
use crate::traits::Writer;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoweringConfig {
    /// Target language name, resolved through the writer registry.
    pub target: String,
    /// Overrides the writer's default indentation width.
    pub indent_width: Option<usize>,
    /// Prefix of generated temporaries (`__mgr0`, `__failed0`, ...).
    pub temp_prefix: String,
    /// Accept async scoped statements outside any async function, for
    /// targets that run module bodies asynchronously.
    pub allow_top_level_await: bool,
}

impl Default for LoweringConfig {
    fn default() -> Self {
        Self {
            target: "typescript".to_string(),
            indent_width: None,
            temp_prefix: "__".to_string(),
            allow_top_level_await: false,
        }
    }
}

impl LoweringConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        // Temporaries are `<prefix><role><n>`, so the prefix alone must start an identifier.
        if !is_identifier(&self.temp_prefix) {
            return Err(ConfigError::InvalidTempPrefix(self.temp_prefix.clone()));
        }
        Ok(())
    }

    /// Writer for the configured target.
    pub fn writer(&self) -> Result<&'static dyn Writer, ConfigError> {
        writer_for_language(&self.target)
            .ok_or_else(|| ConfigError::UnknownTarget(self.target.clone()))
    }
}
