//! Configuration loading functionality.
//!
//! This module provides the [`ConfigLoader`] type for loading engine
//! settings, the holiday calendar and per-lot tariffs from YAML files.

use std::fs;
use std::path::Path;

use crate::calculation::HolidayCalendar;
use crate::error::{EngineError, EngineResult};
use crate::models::parse_rule_records;

use super::types::{
    EngineMetadata, HolidaysConfig, LotTariff, LotTariffConfig, TariffConfig,
};

/// Loads and provides access to tariff configuration.
///
/// The `ConfigLoader` reads YAML configuration files from a directory
/// and provides methods to look up tariffs and the holiday calendar.
///
/// # Directory Structure
///
/// The configuration directory should have the following structure:
/// ```text
/// config/default/
/// ├── engine.yaml      # Engine settings
/// ├── holidays.yaml    # Public holidays
/// └── tariffs/
///     └── station-north.yaml  # One file per parking lot
/// ```
///
/// # Example
///
/// ```no_run
/// use tariff_engine::config::ConfigLoader;
///
/// let loader = ConfigLoader::load("./config/default").unwrap();
///
/// let tariff = loader.get_tariff("station-north").unwrap();
/// println!("{}: {} rules", tariff.name, tariff.rules.len());
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config: TariffConfig,
}

impl ConfigLoader {
    /// Loads configuration from the specified directory.
    ///
    /// # Returns
    ///
    /// Returns a `ConfigLoader` instance on success, or an error if:
    /// - Any required file is missing, or the tariffs directory is empty
    /// - Any file contains invalid YAML
    /// - Any tariff rule is invalid, or two files share a lot id
    ///
    /// # Example
    ///
    /// ```no_run
    /// use tariff_engine::config::ConfigLoader;
    ///
    /// let loader = ConfigLoader::load("./config/default")?;
    /// # Ok::<(), tariff_engine::error::EngineError>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path = path.as_ref();

        let metadata = Self::load_yaml::<EngineMetadata>(&path.join("engine.yaml"))?;
        let holidays = Self::load_yaml::<HolidaysConfig>(&path.join("holidays.yaml"))?;
        let tariffs = Self::load_tariffs(&path.join("tariffs"))?;

        let config = TariffConfig::new(metadata, HolidayCalendar::new(holidays.holidays), tariffs);

        Ok(Self { config })
    }

    /// Loads and parses a YAML file.
    fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> EngineResult<T> {
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|_| EngineError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        serde_yaml::from_str(&content).map_err(|e| EngineError::ConfigParseError {
            path: path_str,
            message: e.to_string(),
        })
    }

    /// Loads every tariff file from the tariffs directory.
    fn load_tariffs(tariffs_dir: &Path) -> EngineResult<Vec<LotTariff>> {
        let tariffs_dir_str = tariffs_dir.display().to_string();

        let entries = fs::read_dir(tariffs_dir).map_err(|_| EngineError::ConfigNotFound {
            path: tariffs_dir_str.clone(),
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|_| EngineError::ConfigNotFound {
                path: tariffs_dir_str.clone(),
            })?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "yaml" || ext == "yml") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut tariffs: Vec<LotTariff> = Vec::with_capacity(paths.len());
        for path in paths {
            let tariff = Self::load_tariff(&path)?;
            if tariffs.iter().any(|t| t.lot_id == tariff.lot_id) {
                return Err(EngineError::ConfigParseError {
                    path: path.display().to_string(),
                    message: format!("duplicate lot_id '{}'", tariff.lot_id),
                });
            }
            tariffs.push(tariff);
        }

        if tariffs.is_empty() {
            return Err(EngineError::ConfigNotFound {
                path: format!("{} (no tariff files found)", tariffs_dir_str),
            });
        }

        Ok(tariffs)
    }

    fn load_tariff(path: &Path) -> EngineResult<LotTariff> {
        let file = Self::load_yaml::<LotTariffConfig>(path)?;
        let invalid = |message: String| EngineError::ConfigParseError {
            path: path.display().to_string(),
            message,
        };

        if file.rules.is_empty() {
            return Err(invalid(format!("tariff '{}' has no rules", file.lot_id)));
        }
        let rules = parse_rule_records(file.rules).map_err(|e| invalid(e.to_string()))?;

        Ok(LotTariff {
            lot_id: file.lot_id,
            name: file.name,
            rules,
        })
    }

    /// Returns the underlying configuration.
    pub fn config(&self) -> &TariffConfig {
        &self.config
    }

    /// Returns the engine metadata.
    pub fn metadata(&self) -> &EngineMetadata {
        self.config.metadata()
    }

    /// Returns the configured holiday calendar.
    pub fn calendar(&self) -> &HolidayCalendar {
        self.config.calendar()
    }

    /// Gets the tariff of a parking lot.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use tariff_engine::config::ConfigLoader;
    ///
    /// let loader = ConfigLoader::load("./config/default")?;
    /// let tariff = loader.get_tariff("city-hall")?;
    /// println!("{} has {} rules", tariff.name, tariff.rules.len());
    /// # Ok::<(), tariff_engine::error::EngineError>(())
    /// ```
    pub fn get_tariff(&self, lot_id: &str) -> EngineResult<&LotTariff> {
        self.config
            .tariffs()
            .get(lot_id)
            .ok_or_else(|| EngineError::TariffNotFound {
                lot_id: lot_id.to_string(),
            })
    }

    /// Ids of every configured lot, in sorted order.
    pub fn tariff_ids(&self) -> Vec<&str> {
        self.config.tariffs().keys().map(String::as_str).collect()
    }
}
