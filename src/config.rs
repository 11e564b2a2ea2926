use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::session::state::SessionConfig;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_round_size_min")]
    pub round_size_min: usize,
    #[serde(default = "default_round_size_max")]
    pub round_size_max: usize,
    #[serde(default = "default_round_size")]
    pub round_size: usize,
    #[serde(default = "default_max_options")]
    pub max_options: usize,
    #[serde(default = "default_base_points")]
    pub base_points: u32,
    #[serde(default = "default_streak_bonus")]
    pub streak_bonus: f64,
    #[serde(default = "default_auto_advance_ms")]
    pub auto_advance_ms: u64,
    #[serde(default = "default_adaptive_enabled")]
    pub adaptive_enabled: bool,
    #[serde(default = "default_weight_factor")]
    pub weight_factor: f64,
    #[serde(default = "default_retry_after")]
    pub retry_after: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_review_max")]
    pub review_max: usize,
    #[serde(default = "default_hardest_count")]
    pub hardest_count: usize,
    #[serde(default = "default_catalog")]
    pub catalog: String,
}

fn default_round_size_min() -> usize {
    3
}
fn default_round_size_max() -> usize {
    20
}
fn default_round_size() -> usize {
    10
}
fn default_max_options() -> usize {
    4
}
fn default_base_points() -> u32 {
    100
}
fn default_streak_bonus() -> f64 {
    0.15
}
fn default_auto_advance_ms() -> u64 {
    1200
}
fn default_adaptive_enabled() -> bool {
    true
}
fn default_weight_factor() -> f64 {
    1.2
}
fn default_retry_after() -> usize {
    3
}
fn default_max_retries() -> u32 {
    2
}
fn default_review_max() -> usize {
    5
}
fn default_hardest_count() -> usize {
    3
}
fn default_catalog() -> String {
    "de-basics".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            round_size_min: default_round_size_min(),
            round_size_max: default_round_size_max(),
            round_size: default_round_size(),
            max_options: default_max_options(),
            base_points: default_base_points(),
            streak_bonus: default_streak_bonus(),
            auto_advance_ms: default_auto_advance_ms(),
            adaptive_enabled: default_adaptive_enabled(),
            weight_factor: default_weight_factor(),
            retry_after: default_retry_after(),
            max_retries: default_max_retries(),
            review_max: default_review_max(),
            hardest_count: default_hardest_count(),
            catalog: default_catalog(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)?;
            let mut config: Config = toml::from_str(&content)?;
            config.validate();
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vocabdrill")
            .join("config.toml")
    }

    /// Pull hand-edited values back into range. Call after deserializing and
    /// after applying CLI overrides.
    pub fn validate(&mut self) {
        if self.round_size_min > self.round_size_max {
            std::mem::swap(&mut self.round_size_min, &mut self.round_size_max);
        }
        self.round_size = self.round_size.clamp(self.round_size_min, self.round_size_max);
        self.max_options = self.max_options.max(2);
        if !(self.weight_factor.is_finite() && self.weight_factor > 0.0) {
            log::warn!("Invalid weight_factor {}, using default", self.weight_factor);
            self.weight_factor = default_weight_factor();
        }
        if !(self.streak_bonus.is_finite() && self.streak_bonus >= 0.0) {
            self.streak_bonus = default_streak_bonus();
        }
        self.review_max = self.review_max.max(1);
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            round_size_min: self.round_size_min,
            round_size_max: self.round_size_max,
            round_size: self.round_size,
            max_options: self.max_options,
            base_points: self.base_points,
            streak_bonus: self.streak_bonus,
            auto_advance_ms: self.auto_advance_ms,
            adaptive_enabled: self.adaptive_enabled,
            weight_factor: self.weight_factor,
            retry_after: self.retry_after,
            max_retries: self.max_retries,
            review_max: self.review_max,
            hardest_count: self.hardest_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_serde_defaults_from_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.round_size, 10);
        assert_eq!(config.max_options, 4);
        assert_eq!(config.auto_advance_ms, 1200);
        assert!(config.adaptive_enabled);
        assert_eq!(config.catalog, "de-basics");
    }

    #[test]
    fn test_config_serde_defaults_from_partial_file() {
        let toml_str = r#"
round_size = 15
adaptive_enabled = false
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.round_size, 15);
        assert!(!config.adaptive_enabled);
        // Missing fields keep defaults
        assert_eq!(config.retry_after, 3);
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.review_max, 5);
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let config = Config::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(config.round_size, deserialized.round_size);
        assert_eq!(config.streak_bonus, deserialized.streak_bonus);
        assert_eq!(config.weight_factor, deserialized.weight_factor);
        assert_eq!(config.catalog, deserialized.catalog);
    }

    #[test]
    fn test_validate_clamps_out_of_range_values() {
        let mut config = Config {
            round_size_min: 20,
            round_size_max: 3,
            round_size: 99,
            max_options: 1,
            weight_factor: -1.0,
            review_max: 0,
            ..Config::default()
        };
        config.validate();
        assert_eq!(config.round_size_min, 3);
        assert_eq!(config.round_size_max, 20);
        assert_eq!(config.round_size, 20);
        assert_eq!(config.max_options, 2);
        assert_eq!(config.weight_factor, 1.2);
        assert_eq!(config.review_max, 1);
    }

    #[test]
    fn test_save_and_load_from_dir() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = Config {
            round_size: 7,
            auto_advance_ms: 0,
            ..Config::default()
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.round_size, 7);
        assert_eq!(loaded.auto_advance_ms, 0);
    }

    #[test]
    fn test_missing_file_loads_defaults() {
        let dir = TempDir::new().unwrap();
        let loaded = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(loaded.round_size, 10);
    }

    #[test]
    fn test_session_config_carries_values() {
        let config = Config {
            retry_after: 5,
            hardest_count: 4,
            ..Config::default()
        };
        let session = config.session_config();
        assert_eq!(session.retry_after, 5);
        assert_eq!(session.hardest_count, 4);
        assert_eq!(session.base_points, 100);
    }
}
