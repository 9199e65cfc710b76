use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Main configuration for the Duet compensation runtime
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Dual-carriage geometry
    pub idex: IdexConfig,

    /// Gantry leveling configuration
    #[serde(default)]
    pub gantry: GantryConfig,
}

/// Dual-carriage geometry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdexConfig {
    /// Static X distance between the two toolheads
    pub offset_x: f64,
}

/// Gantry leveling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GantryConfig {
    /// Speed for actuator corrections when no probe helper overrides it
    #[serde(default = "default_lift_speed")]
    pub lift_speed: f64,
}

impl Default for GantryConfig {
    fn default() -> Self {
        Self {
            lift_speed: default_lift_speed(),
        }
    }
}

fn default_lift_speed() -> f64 {
    5.0
}

impl Config {
    /// Load configuration from a file, auto-detecting TOML or JSON format
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;

        // Try to determine format from extension
        let extension = path.extension().and_then(|s| s.to_str());

        match extension {
            Some("toml") => Self::from_toml(&content),
            Some("json") => Self::from_json(&content),
            _ => {
                // Try TOML first (preferred), fall back to JSON
                Self::from_toml(&content).or_else(|_| Self::from_json(&content))
            }
        }
    }

    /// Parse configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("failed to parse config as TOML")
    }

    /// Parse configuration from JSON string
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("failed to parse config as JSON")
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !self.idex.offset_x.is_finite() || self.idex.offset_x <= 0.0 {
            anyhow::bail!("idex.offset_x must be a positive distance");
        }
        if !self.gantry.lift_speed.is_finite() || self.gantry.lift_speed <= 0.0 {
            anyhow::bail!("gantry.lift_speed must be a positive speed");
        }
        Ok(())
    }
}
