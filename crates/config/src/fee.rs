use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;

/// Error type for fee configuration operations
#[derive(Debug, Error)]
pub enum FeeConfigError {
    #[error("Failed to parse fee config JSON: {0}")]
    JsonParseError(#[from] serde_json::Error),

    #[error("Chain '{0}' not found in fee configuration")]
    ChainNotFound(String),
}

/// Fee calculation configuration for a single chain
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainFeeConfig {
    /// Minimum runtime spec version that supports fee calculation
    /// Below this version, fee calculation is not available
    pub min_calc_fee_runtime: u32,
}

impl ChainFeeConfig {
    /// Check if fee calculation is supported for a given runtime version
    pub fn supports_fee_calculation(&self, spec_version: u32) -> bool {
        spec_version >= self.min_calc_fee_runtime
    }
}

/// Collection of fee configurations for all supported chains
#[derive(Debug, Clone)]
pub struct ChainFeeConfigs {
    configs: HashMap<String, ChainFeeConfig>,
}

impl ChainFeeConfigs {
    /// Load fee configurations from the embedded JSON
    pub fn load() -> Result<Self, FeeConfigError> {
        // Embed the JSON config at compile time
        const CONFIG_JSON: &str = include_str!("chain_fee_config.json");

        let configs: HashMap<String, ChainFeeConfig> = serde_json::from_str(CONFIG_JSON)?;

        Ok(Self { configs })
    }

    /// Get the fee configuration for a specific chain by spec_name
    pub fn get(&self, spec_name: &str) -> Option<&ChainFeeConfig> {
        self.configs
            .get(spec_name)
            .or_else(|| self.configs.get(&spec_name.to_lowercase()))
    }

    /// Get the fee configuration for a chain, returning an error if not found
    pub fn get_or_error(&self, spec_name: &str) -> Result<&ChainFeeConfig, FeeConfigError> {
        self.get(spec_name)
            .ok_or_else(|| FeeConfigError::ChainNotFound(spec_name.to_string()))
    }

    /// Check if fee calculation is supported for a given chain and spec version
    ///
    /// Unknown chains default to supported; the fee model degrades on its own
    /// when the runtime does not expose the constants it needs.
    pub fn supports_fee_calculation(&self, spec_name: &str, spec_version: u32) -> bool {
        match self.get(spec_name) {
            Some(config) => config.supports_fee_calculation(spec_version),
            None => true,
        }
    }

    /// List all configured chain names
    pub fn chain_names(&self) -> Vec<&str> {
        self.configs.keys().map(|s| s.as_str()).collect()
    }
}

impl Default for ChainFeeConfigs {
    fn default() -> Self {
        Self::load().expect("Failed to load embedded fee config")
    }
}
