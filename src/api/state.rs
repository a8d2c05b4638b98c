//! Application state for the Tariff Engine API.

use std::sync::Arc;

use crate::calculation::HolidayCalendar;
use crate::config::ConfigLoader;
use crate::error::{EngineError, EngineResult};
use crate::models::{TariffRule, parse_rule_records};

use super::request::FeeRequest;

/// Shared, read-only state of the fee service.
///
/// Wraps the loaded configuration and answers the per-request questions
/// that depend on it: which rules to bill with, which calendar to resolve
/// day types against, and how long a session may be.
#[derive(Clone)]
pub struct AppState {
    config: Arc<ConfigLoader>,
}

impl AppState {
    /// Creates a new application state with the given configuration loader.
    pub fn new(config: ConfigLoader) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Returns a reference to the configuration loader.
    pub fn config(&self) -> &ConfigLoader {
        &self.config
    }

    /// Picks the configured lot tariff or the inline rules of a request.
    ///
    /// Exactly one of `lot_id` and a non-empty `rules` list must be given.
    pub fn rules_for(&self, request: &FeeRequest) -> EngineResult<Vec<TariffRule>> {
        let inline = request.rules.as_ref().filter(|rules| !rules.is_empty());
        match (request.lot_id.as_deref(), inline) {
            (Some(lot_id), None) => Ok(self.config.get_tariff(lot_id)?.rules.clone()),
            (None, Some(records)) => parse_rule_records(records.clone()),
            (Some(_), Some(_)) => Err(EngineError::invalid(
                "lot_id",
                "provide either lot_id or rules, not both",
            )),
            (None, None) => Err(EngineError::invalid(
                "rules",
                "either lot_id or a non-empty rules list is required",
            )),
        }
    }

    /// The configured holiday calendar plus any holidays in the request.
    pub fn calendar_for(&self, request: &FeeRequest) -> HolidayCalendar {
        self.config
            .calendar()
            .with_holidays(request.holidays.iter().cloned().map(Into::into))
    }

    /// Rejects sessions longer than `max_duration_minutes`.
    pub fn check_duration(&self, duration_minutes: i64) -> EngineResult<()> {
        let max_duration = self.config.metadata().max_duration_minutes;
        if duration_minutes > max_duration {
            return Err(EngineError::invalid(
                "duration_minutes",
                format!("must not exceed {} minutes", max_duration),
            ));
        }
        Ok(())
    }
}
