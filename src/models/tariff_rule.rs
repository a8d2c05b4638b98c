//! Tariff rule model and related types.
//!
//! A tariff is a list of [`TariffRule`]s. Each rule is either a metering
//! rule (`Base`, `Progressive`) that prices time in fixed units, or a
//! `Cap` that puts a ceiling on what may be charged within a window.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

use super::DayType;

/// Number of minutes in a calendar day.
pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// The kind of a tariff rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    /// Metered at `unit_price` per `unit_minutes`, ceiling-rounded.
    Base,
    /// Metered like `Base`, but only once the session has run for
    /// `apply_after_minutes`.
    Progressive,
    /// A ceiling on the sum of charges accrued within a window.
    #[serde(rename = "max")]
    Cap,
}

impl std::fmt::Display for RuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleKind::Base => write!(f, "base"),
            RuleKind::Progressive => write!(f, "progressive"),
            RuleKind::Cap => write!(f, "max"),
        }
    }
}

/// A recurring daily time window, in minutes of the local day.
///
/// `end_minute < start_minute` means the window crosses midnight.
/// `start_minute == end_minute` covers the whole day.
///
/// # Example
///
/// ```
/// use tariff_engine::models::TimeRange;
///
/// let night = TimeRange::parse("18:00～9:00").unwrap();
/// assert!(night.crosses_midnight());
/// assert!(night.contains(23 * 60));
/// assert!(night.contains(8 * 60 + 59));
/// assert!(!night.contains(9 * 60));
/// assert_eq!(night.length_minutes(), 15 * 60);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    /// Inclusive start, minutes after local midnight (0..1440).
    pub start_minute: u32,
    /// Exclusive end, minutes after local midnight (0..=1440).
    pub end_minute: u32,
}

impl TimeRange {
    /// Creates a time range, validating both bounds.
    pub fn new(start_minute: u32, end_minute: u32) -> EngineResult<Self> {
        if start_minute >= MINUTES_PER_DAY {
            return Err(EngineError::invalid(
                "time_range",
                format!("start minute {} is outside the day", start_minute),
            ));
        }
        if end_minute > MINUTES_PER_DAY {
            return Err(EngineError::invalid(
                "time_range",
                format!("end minute {} is outside the day", end_minute),
            ));
        }
        Ok(Self {
            start_minute,
            end_minute,
        })
    }

    /// Parses a tariff-sheet range such as `"18:00～9:00"`.
    ///
    /// The wide tilde `～` is the canonical separator; `〜` and `~` are
    /// accepted. `24:00` is only valid as an end bound.
    pub fn parse(value: &str) -> EngineResult<Self> {
        let malformed = |reason: &str| {
            EngineError::invalid(
                "time_range",
                format!("malformed time range '{}': {}", value, reason),
            )
        };

        let mut parts = value.split(['～', '〜', '~']);
        let (Some(start), Some(end), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(malformed("expected exactly one '～' separator"));
        };

        let start_minute = parse_clock(start.trim()).ok_or_else(|| malformed("bad start"))?;
        let end_minute = parse_clock(end.trim()).ok_or_else(|| malformed("bad end"))?;
        if start_minute == MINUTES_PER_DAY {
            return Err(malformed("24:00 is only valid as an end time"));
        }

        Self::new(start_minute, end_minute)
    }

    /// Returns true if the window wraps past local midnight.
    pub fn crosses_midnight(&self) -> bool {
        self.end_minute < self.start_minute
    }

    /// Returns true if `minute_of_day` falls in `[start, end)`, wrapping
    /// past midnight when needed.
    pub fn contains(&self, minute_of_day: u32) -> bool {
        if self.start_minute == self.end_minute {
            true
        } else if self.crosses_midnight() {
            minute_of_day >= self.start_minute || minute_of_day < self.end_minute
        } else {
            minute_of_day >= self.start_minute && minute_of_day < self.end_minute
        }
    }

    /// Length of one daily instance of the window.
    pub fn length_minutes(&self) -> u32 {
        if self.start_minute == self.end_minute {
            MINUTES_PER_DAY
        } else if self.crosses_midnight() {
            MINUTES_PER_DAY - self.start_minute + self.end_minute
        } else {
            self.end_minute - self.start_minute
        }
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{:02}～{}:{:02}",
            self.start_minute / 60,
            self.start_minute % 60,
            self.end_minute / 60,
            self.end_minute % 60
        )
    }
}

/// Parses `H:MM` / `HH:MM` into minutes after midnight. `24:00` is allowed.
fn parse_clock(value: &str) -> Option<u32> {
    let (hours, minutes) = value.split_once(':')?;
    if hours.is_empty() || hours.len() > 2 || minutes.len() != 2 {
        return None;
    }
    let hours: u32 = hours.parse().ok()?;
    let minutes: u32 = minutes.parse().ok()?;
    if minutes >= 60 || hours > 24 || (hours == 24 && minutes != 0) {
        return None;
    }
    Some(hours * 60 + minutes)
}

/// Where and when a rule applies.
///
/// An absent `time_range` or `day_types` applies unconditionally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    /// The daily window the rule applies in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_range: Option<TimeRange>,
    /// The day types the rule applies on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_types: Option<BTreeSet<DayType>>,
}

impl Scope {
    /// The day-type restriction, treating an empty set as no restriction.
    pub fn day_restriction(&self) -> Option<&BTreeSet<DayType>> {
        self.day_types.as_ref().filter(|days| !days.is_empty())
    }

    /// Returns true if neither a time range nor a day-type restriction is set.
    pub fn is_unscoped(&self) -> bool {
        self.time_range.is_none() && self.day_restriction().is_none()
    }

    /// Number of restrictions present; higher wins when rules overlap.
    pub fn specificity(&self) -> u8 {
        u8::from(self.time_range.is_some()) + u8::from(self.day_restriction().is_some())
    }
}

/// A single rule of a tariff schedule.
///
/// # Example
///
/// ```
/// use tariff_engine::models::{RuleKind, TariffRule, TimeRange};
///
/// let night = TariffRule::base(60, 100)
///     .with_time_range(TimeRange::parse("22:00～8:00").unwrap());
/// assert_eq!(night.kind, RuleKind::Base);
/// assert!(!night.scope.is_unscoped());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TariffRule {
    /// The kind of rule.
    pub kind: RuleKind,
    /// Metering unit (or cap window length) in minutes.
    pub unit_minutes: i64,
    /// Price per unit (or the cap ceiling), in the currency's smallest unit.
    pub unit_price: i64,
    /// Where and when the rule applies.
    #[serde(default)]
    pub scope: Scope,
    /// For progressive rules, elapsed minutes before the rule activates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apply_after_minutes: Option<i64>,
}

impl TariffRule {
    /// An unscoped base rule.
    pub fn base(unit_minutes: i64, unit_price: i64) -> Self {
        Self {
            kind: RuleKind::Base,
            unit_minutes,
            unit_price,
            scope: Scope::default(),
            apply_after_minutes: None,
        }
    }

    /// An unscoped progressive rule that activates after `apply_after_minutes`.
    pub fn progressive(unit_minutes: i64, unit_price: i64, apply_after_minutes: i64) -> Self {
        Self {
            kind: RuleKind::Progressive,
            unit_minutes,
            unit_price,
            scope: Scope::default(),
            apply_after_minutes: Some(apply_after_minutes),
        }
    }

    /// An unscoped cap of `unit_price` per window of `unit_minutes`.
    pub fn cap(unit_minutes: i64, unit_price: i64) -> Self {
        Self {
            kind: RuleKind::Cap,
            unit_minutes,
            unit_price,
            scope: Scope::default(),
            apply_after_minutes: None,
        }
    }

    /// Restricts the rule to a daily time window.
    pub fn with_time_range(mut self, time_range: TimeRange) -> Self {
        self.scope.time_range = Some(time_range);
        self
    }

    /// Restricts the rule to the given day types.
    pub fn with_day_types(mut self, day_types: impl IntoIterator<Item = DayType>) -> Self {
        self.scope.day_types = Some(day_types.into_iter().collect());
        self
    }

    /// Returns true for `Base` and `Progressive` rules.
    pub fn is_metering(&self) -> bool {
        matches!(self.kind, RuleKind::Base | RuleKind::Progressive)
    }

    /// Checks the numeric invariants of the rule.
    ///
    /// `field` is the prefix used in error messages (e.g. `rules[3]`).
    pub fn validate(&self, field: &str) -> EngineResult<()> {
        if self.unit_minutes <= 0 {
            return Err(EngineError::invalid(
                format!("{}.minutes", field),
                format!("must be positive, got {}", self.unit_minutes),
            ));
        }
        if self.unit_price < 0 {
            return Err(EngineError::invalid(
                format!("{}.price", field),
                format!("must not be negative, got {}", self.unit_price),
            ));
        }
        if self.kind == RuleKind::Progressive {
            match self.apply_after_minutes {
                None => {
                    return Err(EngineError::invalid(
                        format!("{}.apply_after", field),
                        "is required for progressive rules",
                    ));
                }
                Some(after) if after < 0 => {
                    return Err(EngineError::invalid(
                        format!("{}.apply_after", field),
                        format!("must not be negative, got {}", after),
                    ));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

/// A tariff rule as it appears in tariff sheets and API requests.
///
/// # Example
///
/// ```
/// use tariff_engine::models::{RuleKind, TariffRule, TariffRuleRecord};
///
/// let record: TariffRuleRecord = serde_json::from_str(
///     r#"{"type": "max", "minutes": 1440, "price": 900}"#,
/// ).unwrap();
/// let rule = TariffRule::try_from(record).unwrap();
/// assert_eq!(rule.kind, RuleKind::Cap);
/// assert!(rule.scope.is_unscoped());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TariffRuleRecord {
    /// `base`, `progressive` or `max`.
    #[serde(rename = "type")]
    pub rule_type: RuleKind,
    /// Metering unit or cap window, in minutes.
    pub minutes: i64,
    /// Unit price or cap ceiling.
    pub price: i64,
    /// Daily window such as `"18:00～9:00"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_range: Option<String>,
    /// Day label such as `"月～金"` or `"土日祝"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_type: Option<String>,
    /// Elapsed minutes before a progressive rule activates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apply_after: Option<i64>,
}

impl TryFrom<TariffRuleRecord> for TariffRule {
    type Error = EngineError;

    fn try_from(record: TariffRuleRecord) -> EngineResult<Self> {
        let time_range = record
            .time_range
            .as_deref()
            .map(TimeRange::parse)
            .transpose()?;
        let day_types = record
            .day_type
            .as_deref()
            .map(DayType::parse_label)
            .transpose()?;
        let apply_after_minutes = match record.rule_type {
            RuleKind::Progressive => record.apply_after,
            RuleKind::Base | RuleKind::Cap => None,
        };

        let rule = TariffRule {
            kind: record.rule_type,
            unit_minutes: record.minutes,
            unit_price: record.price,
            scope: Scope {
                time_range,
                day_types,
            },
            apply_after_minutes,
        };
        rule.validate("rule")?;
        Ok(rule)
    }
}

/// Converts a list of records, prefixing errors with the rule's index.
pub fn parse_rule_records(records: Vec<TariffRuleRecord>) -> EngineResult<Vec<TariffRule>> {
    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            TariffRule::try_from(record).map_err(|err| match err {
                EngineError::InvalidInput { field, message } => EngineError::InvalidInput {
                    field: format!("rules[{}].{}", index, field.trim_start_matches("rule.")),
                    message,
                },
                other => other,
            })
        })
        .collect()
}
