//! # Configuration
//!
//! TOML configuration for the craft bot. Every section has defaults, so a
//! minimal file (or none, via `craftbot init`) is enough to get started.
//!
//! ## Sections
//!
//! - [`BotConfig`] - bot identity
//! - [`TimingConfig`] - settle delays and retry bounds for the crafting engine
//! - [`RecipesConfig`] - extra recipe file, disabled recipes, delay overrides
//! - [`LoggingConfig`] - log level and optional log file
//!
//! ## Example
//!
//! ```toml
//! [bot]
//! name = "Craftbot"
//! operator = "Arwen"
//!
//! [timing]
//! combine_delay_ms = 200
//! pull_settle_ms = 150
//! pull_attempts = 3
//!
//! [recipes]
//! file = "data/recipes/extra_recipes.json"
//! disabled = ["Trimmer"]
//!
//! [recipes.delay_overrides]
//! "Nano Crystal Repair" = 750
//! ```

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tokio::fs;

use crate::crafting::catalog::{load_recipes_from_json, CatalogOptions};
use crate::crafting::session::{Timing, MAX_PULL_SETTLE};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    pub name: String,
    /// Character the bot runs on behalf of.
    #[serde(default)]
    pub operator: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimingConfig {
    #[serde(default = "default_combine_delay_ms")]
    pub combine_delay_ms: u64,
    /// Capped at 150ms.
    #[serde(default = "default_pull_settle_ms")]
    pub pull_settle_ms: u64,
    #[serde(default = "default_pull_attempts")]
    pub pull_attempts: u32,
    #[serde(default = "default_stack_delay_ms")]
    pub stack_delay_ms: u64,
    #[serde(default = "default_between_items_ms")]
    pub between_items_ms: u64,
}

fn default_combine_delay_ms() -> u64 {
    200
}

fn default_pull_settle_ms() -> u64 {
    150
}

fn default_pull_attempts() -> u32 {
    3
}

fn default_stack_delay_ms() -> u64 {
    100
}

fn default_between_items_ms() -> u64 {
    200
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            combine_delay_ms: default_combine_delay_ms(),
            pull_settle_ms: default_pull_settle_ms(),
            pull_attempts: default_pull_attempts(),
            stack_delay_ms: default_stack_delay_ms(),
            between_items_ms: default_between_items_ms(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecipesConfig {
    /// JSON file with additional recipe descriptors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Recipe names to switch off (case-insensitive).
    #[serde(default)]
    pub disabled: Vec<String>,
    /// Per-recipe combine settle delay in milliseconds.
    #[serde(default)]
    pub delay_overrides: HashMap<String, u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub bot: BotConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub recipes: RecipesConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        config.validate()?;
        Ok(config)
    }

    /// Load `path`, or the defaults when no such file exists. A file that
    /// exists but does not read, parse or validate is an error.
    pub async fn load_or_default(path: &str) -> Result<Self> {
        match fs::try_exists(path).await {
            Ok(false) => {
                log::warn!("No config at {}, using defaults", path);
                Ok(Config::default())
            }
            _ => Config::load(path).await,
        }
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    /// Reject values that would make the engine misbehave rather than just
    /// run slowly.
    pub fn validate(&self) -> Result<()> {
        if self.bot.name.trim().is_empty() {
            return Err(anyhow!("bot.name must not be empty"));
        }
        if self.timing.pull_attempts == 0 {
            return Err(anyhow!("timing.pull_attempts must be at least 1"));
        }
        if let Some((name, ms)) = self
            .recipes
            .delay_overrides
            .iter()
            .find(|(_, ms)| **ms > crate::crafting::processor::MAX_RECIPE_DELAY_MS)
        {
            return Err(anyhow!("delay override for {} is too long: {}ms", name, ms));
        }
        Ok(())
    }

    /// Engine timing. The pull settle delay is capped at 150ms.
    pub fn timing(&self) -> Timing {
        let t = &self.timing;
        if t.pull_settle_ms > MAX_PULL_SETTLE.as_millis() as u64 {
            log::warn!(
                "timing.pull_settle_ms={} exceeds {}ms, clamping",
                t.pull_settle_ms,
                MAX_PULL_SETTLE.as_millis()
            );
        }
        Timing {
            combine_delay: Duration::from_millis(t.combine_delay_ms),
            pull_settle: Duration::from_millis(t.pull_settle_ms).min(MAX_PULL_SETTLE),
            pull_attempts: t.pull_attempts.max(1),
            stack_delay: Duration::from_millis(t.stack_delay_ms),
            between_items: Duration::from_millis(t.between_items_ms),
        }
    }

    /// Catalog options, loading the extra recipe file if one is configured.
    pub fn catalog_options(&self) -> Result<CatalogOptions> {
        let extra = match &self.recipes.file {
            Some(path) => load_recipes_from_json(path)
                .map_err(|e| anyhow!("Failed to load recipes from {}: {}", path, e))?,
            None => Vec::new(),
        };
        Ok(CatalogOptions {
            extra,
            disabled: self.recipes.disabled.clone(),
            delay_overrides: self
                .recipes
                .delay_overrides
                .iter()
                .map(|(name, ms)| (name.clone(), Duration::from_millis(*ms)))
                .collect(),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bot: BotConfig {
                name: "Craftbot".to_string(),
                operator: String::new(),
            },
            timing: TimingConfig::default(),
            recipes: RecipesConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                file: Some("craftbot.log".to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timing_matches_engine_defaults() {
        let config = Config::default();
        assert_eq!(config.timing(), Timing::default());
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: Config = toml::from_str("[bot]\nname = \"Bench\"\n").unwrap();
        assert_eq!(config.bot.name, "Bench");
        assert_eq!(config.timing, TimingConfig::default());
        assert!(config.recipes.disabled.is_empty());
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_pull_settle_is_clamped() {
        let mut config = Config::default();
        config.timing.pull_settle_ms = 1000;
        assert_eq!(config.timing().pull_settle, MAX_PULL_SETTLE);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.timing.pull_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config
            .recipes
            .delay_overrides
            .insert("Pearl".to_string(), 60_000);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.bot.name = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_catalog_options_converts_overrides() {
        let mut config = Config::default();
        config.recipes.disabled = vec!["ICE".to_string()];
        config
            .recipes
            .delay_overrides
            .insert("Pearl".to_string(), 500);
        let options = config.catalog_options().unwrap();
        assert!(options.extra.is_empty());
        assert_eq!(options.disabled, vec!["ICE".to_string()]);
        assert_eq!(
            options.delay_overrides.get("Pearl"),
            Some(&Duration::from_millis(500))
        );
    }

    #[test]
    fn test_default_config_roundtrips_through_toml() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back.bot.name, "Craftbot");
        assert_eq!(back.logging.file.as_deref(), Some("craftbot.log"));
    }
}
