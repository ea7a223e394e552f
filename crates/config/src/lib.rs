mod error;
mod fee;
mod log;

pub use error::ConfigError;
pub use fee::{ChainFeeConfig, ChainFeeConfigs, FeeConfigError};
pub use log::LogConfig;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct SidecarConfig {
    #[serde(default)]
    pub log: LogConfig,
}

impl SidecarConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = envy::prefixed("SAS_").from_env::<Self>()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.log.validate()?;
        Ok(())
    }
}

impl Default for SidecarConfig {
    fn default() -> Self {
        Self {
            log: LogConfig::default(),
        }
    }
}
