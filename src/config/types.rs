//! Configuration types for the tariff engine.
//!
//! This module contains the strongly-typed configuration structures that
//! are deserialized from YAML configuration files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::calculation::HolidayCalendar;
use crate::models::{Holiday, TariffRule, TariffRuleRecord};

/// Engine settings from `engine.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EngineMetadata {
    /// The human-readable name of this deployment.
    pub name: String,
    /// The version of the tariff data set.
    pub version: String,
    /// ISO 4217 code of the currency prices are expressed in.
    pub currency: String,
    /// Longest session accepted over the API, in minutes.
    pub max_duration_minutes: i64,
}

/// Holiday calendar file structure.
#[derive(Debug, Clone, Deserialize)]
pub struct HolidaysConfig {
    /// Public holidays treated as Sunday/holiday.
    #[serde(default)]
    pub holidays: Vec<Holiday>,
}

/// A per-lot tariff file as written in `tariffs/<lot>.yaml`.
#[derive(Debug, Clone, Deserialize)]
pub struct LotTariffConfig {
    /// Identifier used to request this tariff.
    pub lot_id: String,
    /// Display name of the parking lot.
    pub name: String,
    /// The lot's rules in tariff-sheet form.
    pub rules: Vec<TariffRuleRecord>,
}

/// A parsed, validated tariff for one parking lot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LotTariff {
    /// Identifier used to request this tariff.
    pub lot_id: String,
    /// Display name of the parking lot.
    pub name: String,
    /// The lot's rules.
    pub rules: Vec<TariffRule>,
}

/// The complete configuration loaded from a configuration directory.
#[derive(Debug, Clone)]
pub struct TariffConfig {
    metadata: EngineMetadata,
    calendar: HolidayCalendar,
    tariffs: BTreeMap<String, LotTariff>,
}

impl TariffConfig {
    /// Creates a new TariffConfig from its component parts.
    pub fn new(
        metadata: EngineMetadata,
        calendar: HolidayCalendar,
        tariffs: impl IntoIterator<Item = LotTariff>,
    ) -> Self {
        Self {
            metadata,
            calendar,
            tariffs: tariffs
                .into_iter()
                .map(|tariff| (tariff.lot_id.clone(), tariff))
                .collect(),
        }
    }

    /// Returns the engine metadata.
    pub fn metadata(&self) -> &EngineMetadata {
        &self.metadata
    }

    /// Returns the configured holiday calendar.
    pub fn calendar(&self) -> &HolidayCalendar {
        &self.calendar
    }

    /// Returns all tariffs keyed by lot id.
    pub fn tariffs(&self) -> &BTreeMap<String, LotTariff> {
        &self.tariffs
    }
}
