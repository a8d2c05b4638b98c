//! Rule scope matching.
//!
//! Decides whether a rule's scope covers a local instant, and which single
//! metering rule is in force at that instant.

use chrono::NaiveDateTime;

use crate::error::{EngineError, EngineResult};
use crate::models::{RuleKind, Scope, TariffRule};

use super::calendar::{CalendarResolver, minute_of_day};

/// Returns true if `scope` applies at the local instant.
///
/// # Example
///
/// ```
/// use tariff_engine::calculation::{HolidayCalendar, scope_matches};
/// use tariff_engine::models::{DayType, Scope, TimeRange};
/// use chrono::NaiveDateTime;
///
/// let scope = Scope {
///     time_range: Some(TimeRange::parse("18:00～9:00").unwrap()),
///     day_types: Some([DayType::Weekday].into_iter().collect()),
/// };
/// // Friday 2026-06-05, 23:00
/// let instant = NaiveDateTime::parse_from_str("2026-06-05 23:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
/// assert!(scope_matches(&scope, instant, &HolidayCalendar::default()));
/// ```
pub fn scope_matches<C>(scope: &Scope, instant: NaiveDateTime, calendar: &C) -> bool
where
    C: CalendarResolver + ?Sized,
{
    if let Some(days) = scope.day_restriction() {
        if !days.contains(&calendar.day_type(instant.date())) {
            return false;
        }
    }
    match scope.time_range {
        Some(range) => range.contains(minute_of_day(instant)),
        None => true,
    }
}

/// Resolves the metering rule in force at an instant.
///
/// An eligible progressive rule (its threshold reached by `elapsed_minutes`
/// and its scope matching) takes precedence over base rules. Within a kind,
/// the more specific scope wins; tiered progressive rules of equal
/// specificity resolve to the latest threshold reached. Anything still tied
/// is an [`EngineError::AmbiguousScope`], including tied base rules hidden
/// behind an active progressive rule.
///
/// Returns the index of the rule in `rules`, or `None` if no metering rule
/// applies.
pub fn resolve_metering_rule<C>(
    rules: &[TariffRule],
    instant: NaiveDateTime,
    elapsed_minutes: i64,
    calendar: &C,
) -> EngineResult<Option<usize>>
where
    C: CalendarResolver + ?Sized,
{
    let base = most_specific(rules, RuleKind::Base, elapsed_minutes, |rule| {
        scope_matches(&rule.scope, instant, calendar)
    })?;
    let progressive = most_specific(rules, RuleKind::Progressive, elapsed_minutes, |rule| {
        rule.apply_after_minutes.unwrap_or(0) <= elapsed_minutes
            && scope_matches(&rule.scope, instant, calendar)
    })?;

    Ok(progressive.or(base))
}

/// Picks the single best candidate of `kind` accepted by `applies`.
fn most_specific<F>(
    rules: &[TariffRule],
    kind: RuleKind,
    elapsed_minutes: i64,
    applies: F,
) -> EngineResult<Option<usize>>
where
    F: Fn(&TariffRule) -> bool,
{
    let rank = |rule: &TariffRule| (rule.scope.specificity(), rule.apply_after_minutes.unwrap_or(0));

    let mut best: Option<usize> = None;
    let mut tied_with: Option<usize> = None;

    for (index, rule) in rules.iter().enumerate() {
        if rule.kind != kind || !applies(rule) {
            continue;
        }
        match best {
            None => best = Some(index),
            Some(current) => {
                let (candidate_rank, current_rank) = (rank(rule), rank(&rules[current]));
                if candidate_rank > current_rank {
                    best = Some(index);
                    tied_with = None;
                } else if candidate_rank == current_rank {
                    tied_with.get_or_insert(index);
                }
            }
        }
    }

    match (best, tied_with) {
        (Some(first_rule), Some(second_rule)) => Err(EngineError::AmbiguousScope {
            kind,
            offset_minutes: elapsed_minutes,
            first_rule,
            second_rule,
        }),
        (best, _) => Ok(best),
    }
}
