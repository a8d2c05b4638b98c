//! Core data models for the Tariff Engine.
//!
//! This module contains all the domain models used throughout the engine.

mod calendar;
mod fee_breakdown;
mod session;
mod tariff_rule;

pub use calendar::{DayType, Holiday};
pub use fee_breakdown::{
    AppliedCap, AuditStep, FeeBreakdown, FeeCalculationResult, FeeWarning, SegmentCharge,
};
pub use session::ParkingSession;
pub use tariff_rule::{
    MINUTES_PER_DAY, RuleKind, Scope, TariffRule, TariffRuleRecord, TimeRange, parse_rule_records,
};
