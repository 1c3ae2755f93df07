//! Engine configuration module.
//!
//! Handles loading, validating, and merging `imgadjust.toml`. User values
//! are merged over the stock defaults, so a config file only needs the keys
//! it wants to change.
//!
//! ## Config File Location
//!
//! The CLI reads the file given with `--config`, or `imgadjust.toml` in the
//! working directory if one exists. Without either the stock defaults apply.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! default_adjustment = "fit"      # Used when an adjustment name is unknown
//!
//! [crop]
//! search_budget = 0               # Max crop offsets to score, 0 = unlimited
//!
//! [cache]
//! enabled = true                  # Store adjusted images for reuse
//! directory = ".imgadjust-cache"  # Where stored results live
//!
//! [logging]
//! level = "info"                  # off, error, warn, info, debug, trace
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::adjustment::{AdjustmentKind, Registry, SearchOptions};
use crate::logging::parse_level;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file looked up in the working directory.
pub const CONFIG_FILENAME: &str = "imgadjust.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Engine configuration loaded from `imgadjust.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Registry fallback for unknown adjustment names.
    pub default_adjustment: String,
    pub crop: CropConfig,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_adjustment: AdjustmentKind::Fit.slug().to_string(),
            crop: CropConfig::default(),
            cache: CacheConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if AdjustmentKind::from_slug(&self.default_adjustment).is_none() {
            return Err(ConfigError::Validation(format!(
                "default_adjustment must be one of fit, crop, ratiocrop, namedcrop, fill (got {:?})",
                self.default_adjustment
            )));
        }
        if self.cache.enabled && self.cache.directory.trim().is_empty() {
            return Err(ConfigError::Validation(
                "cache.directory must not be empty when the cache is enabled".into(),
            ));
        }
        if parse_level(&self.logging.level).is_none() {
            return Err(ConfigError::Validation(format!(
                "logging.level {:?} is not a log level",
                self.logging.level
            )));
        }
        Ok(())
    }

    /// Registry with the configured default. Call after [`validate`](Self::validate).
    pub fn registry(&self) -> Registry {
        Registry::standard(
            AdjustmentKind::from_slug(&self.default_adjustment).unwrap_or(AdjustmentKind::Fit),
        )
    }

    pub fn search_options(&self) -> SearchOptions {
        SearchOptions::with_budget(self.crop.search_budget)
    }
}

/// Crop placement settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CropConfig {
    /// Maximum number of candidate offsets scored per crop. Larger searches
    /// fall back to a centred crop. `0` disables the limit.
    pub search_budget: u64,
}

/// Result cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    pub enabled: bool,
    pub directory: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: ".imgadjust-cache".to_string(),
        }
    }
}

impl CacheConfig {
    pub fn path(&self) -> PathBuf {
        PathBuf::from(&self.directory)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(EngineConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut table), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                let merged = match table.remove(&key) {
                    Some(existing) => merge_toml(existing, value),
                    None => value,
                };
                table.insert(key, merged);
            }
            toml::Value::Table(table)
        }
        (_, overlay) => overlay,
    }
}

/// Parse config text over the stock defaults and validate the result.
pub fn parse_config(content: &str) -> Result<EngineConfig, ConfigError> {
    let overlay: toml::Value = toml::from_str(content)?;
    let config: EngineConfig = merge_toml(stock_defaults_value()?, overlay).try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the engine config.
///
/// An explicit `path` must exist. Without one, `imgadjust.toml` in `dir` is
/// used when present, otherwise the stock defaults.
pub fn load_config(path: Option<&Path>, dir: &Path) -> Result<EngineConfig, ConfigError> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => {
            let candidate = dir.join(CONFIG_FILENAME);
            if !candidate.exists() {
                return Ok(EngineConfig::default());
            }
            candidate
        }
    };
    parse_config(&fs::read_to_string(path)?)
}

/// Returns a fully-commented stock `imgadjust.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# imgadjust Configuration
# =======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# Adjustment used when a requested adjustment name is not recognised.
# One of: fit, crop, ratiocrop, namedcrop, fill
default_adjustment = "fit"

# ---------------------------------------------------------------------------
# Crop placement
# ---------------------------------------------------------------------------
[crop]
# Maximum number of crop offsets scored when protecting areas. The search
# grows with (width difference + 1) * (height difference + 1); beyond the
# budget the crop is centred instead. 0 means no limit.
search_budget = 0

# ---------------------------------------------------------------------------
# Result cache
# ---------------------------------------------------------------------------
[cache]
# Store adjusted images and reuse them while the inputs are unchanged.
enabled = true
# Directory holding the stored results and their manifest.
directory = ".imgadjust-cache"

# ---------------------------------------------------------------------------
# Logging
# ---------------------------------------------------------------------------
[logging]
# One of: off, error, warn, info, debug, trace. RUST_LOG overrides this.
level = "info"
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // =========================================================================
    // Defaults and parsing
    // =========================================================================

    #[test]
    fn default_config_values() {
        let config = EngineConfig::default();
        assert_eq!(config.default_adjustment, "fit");
        assert_eq!(config.crop.search_budget, 0);
        assert!(config.cache.enabled);
        assert_eq!(config.cache.directory, ".imgadjust-cache");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn parse_partial_config() {
        let config = parse_config("[crop]\nsearch_budget = 5000\n").unwrap();
        assert_eq!(config.crop.search_budget, 5000);
        assert_eq!(config.default_adjustment, "fit");
        assert!(config.cache.enabled);
    }

    #[test]
    fn registry_uses_configured_default() {
        let config = parse_config("default_adjustment = \"fill\"\n").unwrap();
        assert_eq!(config.registry().get_or_default("bogus"), AdjustmentKind::Fill);
    }

    #[test]
    fn search_options_from_budget() {
        let config = parse_config("[crop]\nsearch_budget = 10\n").unwrap();
        assert_eq!(config.search_options().budget, Some(10));
        assert_eq!(EngineConfig::default().search_options().budget, None);
    }

    // =========================================================================
    // Unknown keys
    // =========================================================================

    #[test]
    fn unknown_key_rejected() {
        assert!(matches!(
            parse_config("quality = 90\n"),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn unknown_nested_key_rejected() {
        assert!(parse_config("[cache]\nsize = 3\n").is_err());
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[test]
    fn validate_default_config_passes() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_unknown_default_adjustment() {
        assert!(matches!(
            parse_config("default_adjustment = \"thumbnail\"\n"),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn validate_bad_log_level() {
        assert!(matches!(
            parse_config("[logging]\nlevel = \"loud\"\n"),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn validate_empty_cache_directory() {
        assert!(parse_config("[cache]\ndirectory = \"\"\n").is_err());
        assert!(parse_config("[cache]\nenabled = false\ndirectory = \"\"\n").is_ok());
    }

    // =========================================================================
    // Loading
    // =========================================================================

    #[test]
    fn load_config_defaults_when_no_file() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(load_config(None, tmp.path()).unwrap(), EngineConfig::default());
    }

    #[test]
    fn load_config_reads_working_directory_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILENAME), "[logging]\nlevel = \"debug\"\n").unwrap();
        assert_eq!(load_config(None, tmp.path()).unwrap().logging.level, "debug");
    }

    #[test]
    fn load_config_explicit_path_must_exist() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("nope.toml");
        assert!(matches!(
            load_config(Some(&missing), tmp.path()),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.toml");
        fs::write(&path, "this is not [valid toml").unwrap();
        assert!(matches!(
            load_config(Some(&path), tmp.path()),
            Err(ConfigError::Toml(_))
        ));
    }

    // =========================================================================
    // merge_toml
    // =========================================================================

    #[test]
    fn merge_toml_preserves_base_keys() {
        let base: toml::Value = toml::from_str("[cache]\nenabled = true\ndirectory = \"a\"\n").unwrap();
        let overlay: toml::Value = toml::from_str("[cache]\ndirectory = \"b\"\n").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["cache"]["enabled"].as_bool(), Some(true));
        assert_eq!(merged["cache"]["directory"].as_str(), Some("b"));
    }

    // =========================================================================
    // stock_config_toml
    // =========================================================================

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        assert_eq!(parse_config(stock_config_toml()).unwrap(), EngineConfig::default());
    }

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let value = stock_defaults_value().unwrap();
        let table = value.as_table().unwrap();
        for key in ["default_adjustment", "crop", "cache", "logging"] {
            assert!(table.contains_key(key), "missing {key}");
        }
    }
}
