use super::{
    backtesting::BacktestingConfig,
    labeling::LabelingConfig,
    traits::ConfigSection,
    validation::ValidationConfig,
};
use crate::error::TradegateError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub labeling: LabelingConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub backtesting: BacktestingConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), TradegateError> {
        self.labeling.validate()?;
        self.validation.validate()?;
        self.backtesting.validate()?;
        Ok(())
    }
}

pub struct ConfigManager {
    config: Arc<RwLock<AppConfig>>,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config: Arc::new(RwLock::new(AppConfig::default())),
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(&self, path: P) -> Result<(), TradegateError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| TradegateError::Configuration(format!("Failed to read config: {}", e)))?;

        let config: AppConfig = toml::from_str(&contents)
            .map_err(|e| TradegateError::Configuration(format!("Failed to parse config: {}", e)))?;

        config.validate()?;

        *self.config.write().unwrap() = config;
        Ok(())
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), TradegateError> {
        let config = self.config.read().unwrap();
        let toml_str = toml::to_string_pretty(&*config)
            .map_err(|e| TradegateError::Configuration(format!("Failed to serialize: {}", e)))?;

        std::fs::write(path, toml_str)
            .map_err(|e| TradegateError::Configuration(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    pub fn get(&self) -> AppConfig {
        self.config.read().unwrap().clone()
    }

    pub fn update<F>(&self, f: F) -> Result<(), TradegateError>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut config = self.config.write().unwrap();
        f(&mut config);
        config.validate()?;
        Ok(())
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn update_rejects_invalid_changes() {
        let manager = ConfigManager::new();
        let result = manager.update(|config| {
            config.backtesting.cost_per_trade = -0.5;
        });
        assert!(result.is_err());
    }

    #[test]
    fn toml_round_trip_preserves_sections() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.validation.n_splits, config.validation.n_splits);
        assert_eq!(
            parsed.backtesting.cost_per_trade,
            config.backtesting.cost_per_trade
        );
    }
}
