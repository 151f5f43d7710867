//! Engine configuration for kinship
//!
//! Thresholds, weights and worker limits are caller-supplied. Defaults live in
//! [`types`]; a TOML file may override any subset of them.

pub mod types;

use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::bail_invalid;
use crate::error::{KinshipError, Result};

pub use types::{
    EngineConfig, ImageConfig, ParallelismConfig, PrefilterConfig, PrefilterMode, SignalWeights,
    TextConfig, CONFIG_FORMAT_VERSION,
};

/// Reject values outside [0, 1] (NaN included)
pub fn check_unit_interval(context: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        bail_invalid!(context, value);
    }
    Ok(())
}

impl SignalWeights {
    pub fn validate(&self) -> Result<()> {
        check_unit_interval("weights.text", self.text)?;
        check_unit_interval("weights.image", self.image)?;
        check_unit_interval("weights.tag", self.tag)?;
        if self.text + self.image + self.tag <= 0.0 {
            bail_invalid!("weights", "all signal weights are zero");
        }
        if self.text + self.tag <= 0.0 {
            // Pairs without a usable image would have nothing left to score with
            bail_invalid!("weights", "text and tag weights are both zero");
        }
        Ok(())
    }
}

impl TextConfig {
    pub fn validate(&self) -> Result<()> {
        check_unit_interval("text.edit_weight", self.edit_weight)?;
        check_unit_interval("text.cosine_weight", self.cosine_weight)?;
        if self.edit_weight + self.cosine_weight <= 0.0 {
            bail_invalid!("text weights", "edit and cosine weights are both zero");
        }
        Ok(())
    }
}

impl ImageConfig {
    pub fn validate(&self) -> Result<()> {
        if self.timeout_ms == 0 {
            bail_invalid!("image.timeout_ms", self.timeout_ms);
        }
        if self.max_concurrent_decodes == 0 {
            bail_invalid!("image.max_concurrent_decodes", self.max_concurrent_decodes);
        }
        if self.max_bytes == 0 {
            bail_invalid!("image.max_bytes", self.max_bytes);
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl PrefilterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.auto_min_notes < 2 {
            bail_invalid!("prefilter.auto_min_notes", self.auto_min_notes);
        }
        if !(self.max_token_df > 0.0 && self.max_token_df <= 1.0) {
            bail_invalid!("prefilter.max_token_df", self.max_token_df);
        }
        check_unit_interval("prefilter.length_ratio", self.length_ratio)
    }

    /// Whether the pre-filter applies to a corpus of `note_count` notes
    pub fn applies_to(&self, note_count: usize) -> bool {
        match self.mode {
            PrefilterMode::Always => true,
            PrefilterMode::Never => false,
            PrefilterMode::Auto => note_count >= self.auto_min_notes,
        }
    }
}

impl EngineConfig {
    /// Validate every option, failing on the first out-of-range value
    pub fn validate(&self) -> Result<()> {
        if self.version != CONFIG_FORMAT_VERSION {
            bail_invalid!("config version", self.version);
        }
        check_unit_interval("edge_threshold", self.edge_threshold)?;
        check_unit_interval("dup_threshold", self.dup_threshold)?;
        self.weights.validate()?;
        self.text.validate()?;
        self.image.validate()?;
        self.prefilter.validate()?;
        Ok(())
    }

    /// Load configuration from a TOML file and validate it
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: EngineConfig = toml::from_str(&content)?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded engine config");
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| KinshipError::Other(format!("failed to serialize config: {}", e)))
    }
}
