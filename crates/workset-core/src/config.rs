//! Engine tuning parameters.
//!
//! Every threshold the engine uses lives in [`EngineConfig`], which is passed
//! into the engine at construction. Defaults reproduce the reference
//! behaviour; [`EngineConfig::from_env`] overlays `WORKSET_*` variables and
//! the struct deserializes from TOML/JSON for the binaries' `--config` flag.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Errors produced while loading or validating an [`EngineConfig`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("failed to read config file {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("failed to parse config file: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Store capacity used when Initialize does not supply one.
    pub capacity: usize,
    /// Activation lost per minute by an item with no access protection.
    pub base_decay_rate: f64,
    /// Upper clamp on the access-count protection factor. Must be below 1.0
    /// so decay never turns into growth.
    pub max_protection: f64,
    /// Boost applied to a directly focused item.
    pub rehearsal_boost: f64,
    /// Boost applied to the associates of a focused item.
    pub association_strength: f64,
    /// Lexical overlap above which two items are linked.
    pub overlap_threshold: f64,
    /// Items at or below this activation are hidden from reads and pruned by sweeps.
    pub prune_floor: f64,
    /// Activation above which an item is consolidated by a sweep.
    pub importance_activation: f64,
    /// Access count above which an item is consolidated by a sweep.
    pub importance_access_count: u32,
    /// Pre-eviction activation above which a displaced item is consolidated.
    pub displacement_threshold: f64,
    /// Activation above which a consolidated record is marked high importance.
    pub high_importance_activation: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            capacity: 7,
            base_decay_rate: 0.1,
            max_protection: 0.9,
            rehearsal_boost: 0.3,
            association_strength: 0.2,
            overlap_threshold: 0.3,
            prune_floor: 0.1,
            importance_activation: 0.7,
            importance_access_count: 3,
            displacement_threshold: 0.5,
            high_importance_activation: 0.8,
        }
    }
}

impl EngineConfig {
    /// Defaults overlaid with any `WORKSET_*` environment variables.
    ///
    /// Reads:
    /// - WORKSET_CAPACITY
    /// - WORKSET_DECAY_RATE
    /// - WORKSET_MAX_PROTECTION
    /// - WORKSET_REHEARSAL_BOOST
    /// - WORKSET_ASSOCIATION_STRENGTH
    /// - WORKSET_PRUNE_FLOOR
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().overlay(|var| std::env::var(var).ok())
    }

    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let cfg: Self = toml::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Defaults, or the TOML file at `path`, overlaid with the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })?;
                Self::from_toml_str(&raw)?
            }
            None => Self::default(),
        };
        base.overlay(|var| std::env::var(var).ok())
    }

    /// Overlay values from `lookup` onto `self`, then validate.
    pub fn overlay<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        if let Some(v) = parse_var(&lookup, "WORKSET_CAPACITY")? {
            self.capacity = v;
        }
        if let Some(v) = parse_var(&lookup, "WORKSET_DECAY_RATE")? {
            self.base_decay_rate = v;
        }
        if let Some(v) = parse_var(&lookup, "WORKSET_MAX_PROTECTION")? {
            self.max_protection = v;
        }
        if let Some(v) = parse_var(&lookup, "WORKSET_REHEARSAL_BOOST")? {
            self.rehearsal_boost = v;
        }
        if let Some(v) = parse_var(&lookup, "WORKSET_ASSOCIATION_STRENGTH")? {
            self.association_strength = v;
        }
        if let Some(v) = parse_var(&lookup, "WORKSET_PRUNE_FLOOR")? {
            self.prune_floor = v;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::Invalid("capacity must be positive".into()));
        }
        if !(0.0..1.0).contains(&self.max_protection) {
            return Err(ConfigError::Invalid(format!(
                "max_protection must be in [0, 1), got {}",
                self.max_protection
            )));
        }
        let non_negative = [
            ("base_decay_rate", self.base_decay_rate),
            ("rehearsal_boost", self.rehearsal_boost),
            ("association_strength", self.association_strength),
            ("overlap_threshold", self.overlap_threshold),
            ("prune_floor", self.prune_floor),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }
}

fn parse_var<T, F>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&'static str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { var, value: raw }),
    }
}
