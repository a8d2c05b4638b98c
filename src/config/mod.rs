//! Configuration loading and management for the Tariff Engine.
//!
//! This module loads engine settings, the holiday calendar and named
//! per-lot tariffs from a directory of YAML files.
//!
//! # Example
//!
//! ```no_run
//! use tariff_engine::config::ConfigLoader;
//!
//! let config = ConfigLoader::load("./config/default").unwrap();
//! println!("Loaded {} tariffs", config.tariff_ids().len());
//! ```

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{EngineMetadata, HolidaysConfig, LotTariff, LotTariffConfig, TariffConfig};
