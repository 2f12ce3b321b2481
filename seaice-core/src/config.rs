//! Analysis configuration
//!
//! Configuration is stored as TOML:
//!
//! ```toml
//! calendar = "noleap"
//! concentration_variable = "seaice_conc"
//! source_variable = "seaice_source"
//!
//! [clustering]
//! n_clusters = 10
//! gamma = 1.0
//! ```
//!
//! Every key is optional and falls back to its default.

use crate::calendar::Calendar;
use crate::clustering::SpectralParameters;
use crate::errors::{SeaIceError, SeaIceResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Calendar used to derive month lengths when the time axis carries none
    pub calendar: Calendar,
    /// Name of the sea-ice concentration variable
    pub concentration_variable: String,
    /// Name of the sea-ice source variable
    pub source_variable: String,
    pub clustering: SpectralParameters,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            calendar: Calendar::NoLeap,
            concentration_variable: "seaice_conc".to_string(),
            source_variable: "seaice_source".to_string(),
            clustering: SpectralParameters::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn from_toml_str(content: &str) -> SeaIceResult<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| SeaIceError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> SeaIceResult<String> {
        toml::to_string(self).map_err(|e| SeaIceError::InvalidConfig(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> SeaIceResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Names of the variables to read, concentration first
    pub fn variables(&self) -> [&str; 2] {
        [&self.concentration_variable, &self.source_variable]
    }

    pub fn validate(&self) -> SeaIceResult<()> {
        if self.concentration_variable.is_empty() || self.source_variable.is_empty() {
            return Err(SeaIceError::InvalidConfig(
                "variable names must not be empty".to_string(),
            ));
        }
        self.clustering
            .validate()
            .map_err(|e| SeaIceError::InvalidConfig(e.to_string()))
    }
}
