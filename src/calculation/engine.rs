//! The fee engine facade.
//!
//! [`compute_fee`] validates its inputs and runs the pipeline:
//! cap windows → breakpoints → segments → accrual → cap optimization.
//! It is a pure function of the rules, the session and the calendar.

use serde_json::json;
use tracing::debug;

use crate::error::{EngineError, EngineResult};
use crate::models::{
    AppliedCap, AuditStep, FeeBreakdown, FeeWarning, ParkingSession, SegmentCharge, TariffRule,
};

use super::accrual::Accrual;
use super::breakpoints::build_breakpoints;
use super::calendar::CalendarResolver;
use super::cap_optimizer::{CapPlan, CapWindow, cap_windows, optimize};
use super::segments::{Segment, group_segments};

/// Warning code for spans billed at zero because no metering rule applies.
pub const NO_APPLICABLE_RATE: &str = "NO_APPLICABLE_RATE";

/// Computes the minimal legal fee for a parking session.
///
/// # Errors
///
/// - [`EngineError::InvalidInput`] for an empty rule list, an invalid
///   rule, or a non-positive duration.
/// - [`EngineError::AmbiguousScope`] when two equally specific metering
///   rules of one kind match the same instant.
///
/// # Examples
///
/// ## Ceiling metering
///
/// ```
/// use tariff_engine::calculation::{HolidayCalendar, compute_fee};
/// use tariff_engine::models::{ParkingSession, TariffRule};
/// use chrono::DateTime;
///
/// let rules = vec![TariffRule::base(12, 100)];
/// let session = ParkingSession::new(
///     DateTime::parse_from_rfc3339("2026-06-01T10:00:00+09:00").unwrap(),
///     120,
/// );
/// let breakdown = compute_fee(&rules, &session, &HolidayCalendar::default()).unwrap();
/// assert_eq!(breakdown.total_fee, 1000);
/// ```
///
/// ## A rolling daily cap
///
/// ```
/// use tariff_engine::calculation::{HolidayCalendar, compute_fee};
/// use tariff_engine::models::{ParkingSession, TariffRule};
/// use chrono::DateTime;
///
/// let rules = vec![TariffRule::base(60, 100), TariffRule::cap(1440, 1000)];
/// let session = ParkingSession::new(
///     DateTime::parse_from_rfc3339("2026-06-01T10:00:00+09:00").unwrap(),
///     3000,
/// );
/// let breakdown = compute_fee(&rules, &session, &HolidayCalendar::default()).unwrap();
/// assert_eq!(breakdown.total_fee, 2200);
/// assert_eq!(breakdown.caps_applied.len(), 2);
/// ```
pub fn compute_fee<C>(
    rules: &[TariffRule],
    session: &ParkingSession,
    calendar: &C,
) -> EngineResult<FeeBreakdown>
where
    C: CalendarResolver + ?Sized,
{
    validate(rules, session)?;

    let windows = cap_windows(rules, session, calendar);
    let breakpoints = build_breakpoints(rules, session, &windows);
    let segments = group_segments(rules, session, &breakpoints, calendar)?;
    let accrual = Accrual::new(rules, &segments)?;
    let plan = optimize(&breakpoints, &windows, rules, &accrual);

    debug!(
        rules = rules.len(),
        breakpoints = breakpoints.len(),
        segments = segments.len(),
        cap_windows = windows.len(),
        raw_total = accrual.total(),
        total_fee = plan.total,
        "Computed fee"
    );

    let mut charges = Vec::new();
    let mut caps_applied = Vec::new();
    for step in &plan.steps {
        let capped = step.window.is_some();
        charges.extend(accrual.charges(step.start_offset, step.end_offset, capped));
        if let Some(window_index) = step.window {
            let rule = &rules[windows[window_index].rule_index];
            caps_applied.push(AppliedCap {
                start_offset: step.start_offset,
                end_offset: step.end_offset,
                rule: rule.clone(),
                cap_price: rule.unit_price,
                raw_charge: accrual.raw(step.start_offset, step.end_offset),
            });
        }
    }

    let warnings = uncovered_warnings(&segments);
    let audit_trace = audit_trace(rules, &breakpoints, &windows, &accrual, &plan, &caps_applied);

    Ok(FeeBreakdown {
        total_fee: plan.total,
        raw_total: accrual.total(),
        segments: charges,
        caps_applied,
        warnings,
        audit_trace,
    })
}

fn validate(rules: &[TariffRule], session: &ParkingSession) -> EngineResult<()> {
    if rules.is_empty() {
        return Err(EngineError::invalid("rules", "at least one rule is required"));
    }
    for (index, rule) in rules.iter().enumerate() {
        rule.validate(&format!("rules[{}]", index))?;
    }
    session.validate()
}

fn uncovered_warnings(segments: &[Segment]) -> Vec<FeeWarning> {
    segments
        .iter()
        .filter(|segment| segment.rule_index.is_none())
        .map(|segment| FeeWarning {
            code: NO_APPLICABLE_RATE.to_string(),
            message: format!(
                "No base or progressive rule applies from minute {} to {}; charged 0",
                segment.start_offset, segment.end_offset
            ),
            severity: "medium".to_string(),
        })
        .collect()
}

fn audit_trace(
    rules: &[TariffRule],
    breakpoints: &[i64],
    windows: &[CapWindow],
    accrual: &Accrual<'_>,
    plan: &CapPlan,
    caps_applied: &[AppliedCap],
) -> Vec<AuditStep> {
    let segments = accrual.segments();

    let segment_rows: Vec<serde_json::Value> = segments
        .iter()
        .map(|s| {
            json!({
                "start_offset": s.start_offset,
                "end_offset": s.end_offset,
                "rule_index": s.rule_index,
            })
        })
        .collect();
    let accrual_rows: Vec<serde_json::Value> = segments
        .iter()
        .map(|s| {
            json!({
                "start_offset": s.start_offset,
                "end_offset": s.end_offset,
                "charge": accrual.raw(s.start_offset, s.end_offset),
            })
        })
        .collect();
    let cap_rows: Vec<serde_json::Value> = caps_applied
        .iter()
        .map(|c| {
            json!({
                "start_offset": c.start_offset,
                "end_offset": c.end_offset,
                "cap_price": c.cap_price,
                "raw_charge": c.raw_charge,
            })
        })
        .collect();

    let savings = accrual.total() - plan.total;
    let optimization_reasoning = if caps_applied.is_empty() {
        format!(
            "No cap window is cheaper than metering; fee is the raw total {}",
            plan.total
        )
    } else {
        format!(
            "Applied {} of {} cap windows, saving {} against the raw total {}",
            caps_applied.len(),
            windows.len(),
            savings,
            accrual.total()
        )
    };

    vec![
        AuditStep {
            step_number: 1,
            rule_id: "breakpoints".to_string(),
            rule_name: "Breakpoint Builder".to_string(),
            input: json!({
                "rules": rules.len(),
                "cap_windows": windows.len(),
            }),
            output: json!({ "breakpoints": breakpoints }),
            reasoning: format!(
                "{} offsets where the applicable rules may change",
                breakpoints.len()
            ),
        },
        AuditStep {
            step_number: 2,
            rule_id: "segmentation".to_string(),
            rule_name: "Segment Grouper".to_string(),
            input: json!({ "intervals": breakpoints.len().saturating_sub(1) }),
            output: json!({ "segments": segment_rows }),
            reasoning: format!(
                "Merged elementary intervals into {} segments billed under one rule each",
                segments.len()
            ),
        },
        AuditStep {
            step_number: 3,
            rule_id: "accrual".to_string(),
            rule_name: "Accrual Calculator".to_string(),
            input: json!({ "segments": segments.len() }),
            output: json!({
                "charges": accrual_rows,
                "raw_total": accrual.total(),
            }),
            reasoning: format!(
                "Ceiling-rounded each segment by its rule's unit; raw total {}",
                accrual.total()
            ),
        },
        AuditStep {
            step_number: 4,
            rule_id: "cap_optimization".to_string(),
            rule_name: "Cap Optimizer".to_string(),
            input: json!({
                "raw_total": accrual.total(),
                "cap_windows": windows.len(),
            }),
            output: json!({
                "total_fee": plan.total,
                "caps_applied": cap_rows,
            }),
            reasoning: optimization_reasoning,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculation::{HolidayCalendar, get_day_type};
    use crate::models::{DayType, Holiday, RuleKind, TimeRange};
    use chrono::{DateTime, NaiveDate};

    fn session(start: &str, duration_minutes: i64) -> ParkingSession {
        ParkingSession::new(DateTime::parse_from_rfc3339(start).unwrap(), duration_minutes)
    }

    fn range(value: &str) -> TimeRange {
        TimeRange::parse(value).unwrap()
    }

    fn fee(rules: &[TariffRule], session: &ParkingSession) -> FeeBreakdown {
        compute_fee(rules, session, &HolidayCalendar::default()).unwrap()
    }

    fn assert_partition(breakdown: &FeeBreakdown, duration: i64) {
        assert_eq!(breakdown.segments.first().map(|s| s.start_offset), Some(0));
        assert_eq!(breakdown.segments.last().map(|s| s.end_offset), Some(duration));
        for pair in breakdown.segments.windows(2) {
            assert_eq!(pair[0].end_offset, pair[1].start_offset);
        }
        for segment in &breakdown.segments {
            assert!(segment.start_offset < segment.end_offset);
        }
    }

    fn assert_total_consistent(breakdown: &FeeBreakdown) {
        let uncapped: i64 = breakdown
            .segments
            .iter()
            .filter(|s| !s.capped)
            .map(|s| s.charge)
            .sum();
        let caps: i64 = breakdown.caps_applied.iter().map(|c| c.cap_price).sum();
        assert_eq!(breakdown.total_fee, uncapped + caps);
    }

    fn dominance_rules() -> Vec<TariffRule> {
        let night = range("22:00～3:00");
        vec![
            TariffRule::base(60, 100).with_time_range(night),
            TariffRule::cap(300, 300).with_time_range(night),
            TariffRule::base(80, 100).with_time_range(range("3:00～22:00")),
            TariffRule::cap(1440, 900),
        ]
    }

    #[test]
    fn test_ceiling_metering() {
        let breakdown = fee(&[TariffRule::base(12, 100)], &session("2026-06-01T10:00:00+09:00", 120));
        assert_eq!(breakdown.total_fee, 1000);
        assert_eq!(breakdown.raw_total, 1000);
        assert_eq!(breakdown.segments.len(), 1);
        assert!(breakdown.caps_applied.is_empty());
        assert!(breakdown.warnings.is_empty());
    }

    #[test]
    fn test_progressive_staging_meters_past_threshold() {
        let rules = vec![TariffRule::base(30, 0), TariffRule::progressive(30, 250, 30)];
        for (duration, expected) in [(30, 0), (60, 250), (120, 750), (180, 1250)] {
            let breakdown = fee(&rules, &session("2026-06-01T10:00:00+09:00", duration));
            assert_eq!(breakdown.total_fee, expected, "duration {}", duration);
        }
    }

    #[test]
    fn test_progressive_partial_unit_rounds_up() {
        let rules = vec![TariffRule::base(30, 0), TariffRule::progressive(30, 250, 30)];
        let breakdown = fee(&rules, &session("2026-06-01T10:00:00+09:00", 61));
        assert_eq!(breakdown.total_fee, 500);
    }

    #[test]
    fn test_midnight_crossing_night_and_day() {
        let rules = vec![
            TariffRule::base(60, 100).with_time_range(range("18:00～9:00")),
            TariffRule::base(30, 100).with_time_range(range("9:00～18:00")),
        ];
        let breakdown = fee(&rules, &session("2026-06-05T18:00:00+09:00", 960));

        assert_eq!(breakdown.total_fee, 1700);
        assert_eq!(breakdown.segments.len(), 2);
        assert_eq!(breakdown.segments[0].charge, 1500);
        assert_eq!(breakdown.segments[1].charge, 200);
        assert_partition(&breakdown, 960);
    }

    #[test]
    fn test_multi_day_rolling_cap() {
        let rules = vec![TariffRule::base(60, 100), TariffRule::cap(1440, 1000)];

        let two_days = fee(&rules, &session("2026-06-01T10:00:00+09:00", 2880));
        assert_eq!(two_days.total_fee, 2000);
        assert_eq!(two_days.raw_total, 4800);
        assert_eq!(two_days.caps_applied.len(), 2);

        let fifty_hours = fee(&rules, &session("2026-06-01T10:00:00+09:00", 3000));
        assert_eq!(fifty_hours.total_fee, 2200);
        assert_eq!(fifty_hours.caps_applied.len(), 2);
        let last = fifty_hours.segments.last().unwrap();
        assert_eq!((last.start_offset, last.end_offset, last.charge), (2880, 3000, 200));
        assert!(!last.capped);
        assert_total_consistent(&fifty_hours);
    }

    #[test]
    fn test_unscoped_cap_dominates_long_stay() {
        let breakdown = fee(&dominance_rules(), &session("2026-06-01T22:00:00+09:00", 760));
        assert_eq!(breakdown.raw_total, 1100);
        assert_eq!(breakdown.total_fee, 900);
        assert_total_consistent(&breakdown);
        assert_partition(&breakdown, 760);
    }

    #[test]
    fn test_daytime_stay_does_not_apply_cap() {
        let breakdown = fee(&dominance_rules(), &session("2026-06-01T12:00:00+09:00", 120));
        assert_eq!(breakdown.total_fee, 200);
        assert!(breakdown.caps_applied.is_empty());
    }

    #[test]
    fn test_night_cap_wins_for_night_stay() {
        let breakdown = fee(&dominance_rules(), &session("2026-06-01T22:00:00+09:00", 300));
        assert_eq!(breakdown.raw_total, 500);
        assert_eq!(breakdown.total_fee, 300);
        assert_eq!(breakdown.caps_applied.len(), 1);

        let cap = &breakdown.caps_applied[0];
        assert_eq!(cap.rule.kind, RuleKind::Cap);
        assert_eq!(cap.rule.scope.time_range, Some(range("22:00～3:00")));
        assert_eq!((cap.cap_price, cap.raw_charge), (300, 500));
        assert!(breakdown.segments.iter().all(|s| s.capped));
    }

    #[test]
    fn test_daily_cap_beats_night_cap_plus_day_rate() {
        let mut rules = dominance_rules();
        rules[2] = TariffRule::base(80, 110).with_time_range(range("3:00～22:00"));
        let breakdown = fee(&rules, &session("2026-06-01T22:00:00+09:00", 760));

        assert_eq!(breakdown.total_fee, 900);
        assert_eq!(breakdown.caps_applied.len(), 1);
        assert!(breakdown.caps_applied[0].rule.scope.is_unscoped());
    }

    #[test]
    fn test_night_cap_skipped_when_session_starts_mid_window() {
        // The 22:00 window opened before the session, so it never applies
        let breakdown = fee(&dominance_rules(), &session("2026-06-01T23:00:00+09:00", 240));
        assert_eq!(breakdown.raw_total, 400);
        assert_eq!(breakdown.total_fee, 400);
        assert!(breakdown.caps_applied.is_empty());
    }

    #[test]
    fn test_night_cap_skipped_when_session_ends_mid_window() {
        // Leaving at 02:00 cuts the 22:00～3:00 window short
        let night = range("22:00～3:00");
        let rules = vec![
            TariffRule::base(60, 100).with_time_range(night),
            TariffRule::cap(300, 200).with_time_range(night),
        ];
        let breakdown = fee(&rules, &session("2026-06-01T22:00:00+09:00", 240));
        assert_eq!(breakdown.raw_total, 400);
        assert_eq!(breakdown.total_fee, 400);
        assert!(breakdown.caps_applied.is_empty());
    }

    #[test]
    fn test_weekday_and_weekend_rates_with_holiday() {
        let rules = vec![
            TariffRule::base(60, 200).with_day_types([DayType::Weekday]),
            TariffRule::base(60, 100)
                .with_day_types([DayType::Saturday, DayType::SundayOrHoliday]),
        ];
        // 2026-11-03 is a Tuesday holiday
        let session = session("2026-11-03T10:00:00+09:00", 120);

        let plain = compute_fee(&rules, &session, &HolidayCalendar::default()).unwrap();
        assert_eq!(plain.total_fee, 400);

        let holidays = HolidayCalendar::new(vec![Holiday {
            date: NaiveDate::from_ymd_opt(2026, 11, 3).unwrap(),
            name: "文化の日".to_string(),
        }]);
        let holiday = compute_fee(&rules, &session, &holidays).unwrap();
        assert_eq!(holiday.total_fee, 200);
    }

    #[test]
    fn test_closure_calendar_is_accepted() {
        let rules = vec![
            TariffRule::base(60, 200).with_day_types([DayType::Weekday]),
            TariffRule::base(60, 100).with_day_types([DayType::SundayOrHoliday]),
        ];
        let every_day_is_sunday = |_: NaiveDate| DayType::SundayOrHoliday;
        let breakdown = compute_fee(
            &rules,
            &session("2026-06-01T10:00:00+09:00", 60),
            &every_day_is_sunday,
        )
        .unwrap();
        assert_eq!(breakdown.total_fee, 100);

        let by_weekday =
            compute_fee(&rules, &session("2026-06-01T10:00:00+09:00", 60), &get_day_type).unwrap();
        assert_eq!(by_weekday.total_fee, 200);
    }

    #[test]
    fn test_uncovered_span_is_free_with_warning() {
        let rules = vec![TariffRule::base(60, 100).with_time_range(range("9:00～18:00"))];
        let breakdown = fee(&rules, &session("2026-06-01T17:00:00+09:00", 180));

        assert_eq!(breakdown.total_fee, 100);
        assert_eq!(breakdown.warnings.len(), 1);
        assert_eq!(breakdown.warnings[0].code, NO_APPLICABLE_RATE);
        assert_eq!(breakdown.warnings[0].severity, "medium");
        let uncovered = &breakdown.segments[1];
        assert_eq!(uncovered.rule, None);
        assert_eq!(uncovered.charge, 0);
        assert_partition(&breakdown, 180);
    }

    #[test]
    fn test_caps_only_tariff_charges_nothing() {
        let breakdown = fee(&[TariffRule::cap(1440, 900)], &session("2026-06-01T10:00:00+09:00", 60));
        assert_eq!(breakdown.total_fee, 0);
        assert_eq!(breakdown.warnings.len(), 1);
    }

    #[test]
    fn test_empty_rules_rejected() {
        match compute_fee(&[], &session("2026-06-01T10:00:00+09:00", 60), &HolidayCalendar::default()) {
            Err(EngineError::InvalidInput { field, .. }) => assert_eq!(field, "rules"),
            other => panic!("Expected InvalidInput, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_rule_reports_index() {
        let rules = vec![TariffRule::base(60, 100), TariffRule::base(0, 100)];
        match compute_fee(&rules, &session("2026-06-01T10:00:00+09:00", 60), &HolidayCalendar::default()) {
            Err(EngineError::InvalidInput { field, .. }) => assert_eq!(field, "rules[1].minutes"),
            other => panic!("Expected InvalidInput, got {:?}", other),
        }
    }

    #[test]
    fn test_huge_unit_bills_a_single_unit() {
        let rules = vec![TariffRule::base(i64::MAX, 100)];
        let breakdown = fee(&rules, &session("2026-06-01T10:00:00+09:00", 60));
        assert_eq!(breakdown.total_fee, 100);
        assert_eq!(breakdown.raw_total, 100);
    }

    #[test]
    fn test_unrepresentable_fee_is_a_calculation_error() {
        let rules = vec![TariffRule::base(1, i64::MAX)];
        let result = compute_fee(
            &rules,
            &session("2026-06-01T10:00:00+09:00", 2),
            &HolidayCalendar::default(),
        );
        assert!(matches!(result, Err(EngineError::CalculationError { .. })));
    }

    #[test]
    fn test_non_positive_duration_rejected() {
        let rules = vec![TariffRule::base(60, 100)];
        for duration in [0, -1] {
            let result = compute_fee(
                &rules,
                &session("2026-06-01T10:00:00+09:00", duration),
                &HolidayCalendar::default(),
            );
            assert!(matches!(result, Err(EngineError::InvalidInput { .. })));
        }
    }

    #[test]
    fn test_ambiguous_rules_fail_loudly() {
        let rules = vec![TariffRule::base(60, 100), TariffRule::base(30, 100)];
        let result = compute_fee(
            &rules,
            &session("2026-06-01T10:00:00+09:00", 60),
            &HolidayCalendar::default(),
        );
        assert!(matches!(result, Err(EngineError::AmbiguousScope { .. })));
    }

    #[test]
    fn test_overlapping_caps_are_not_ambiguous() {
        let rules = vec![
            TariffRule::base(60, 100),
            TariffRule::cap(1440, 900),
            TariffRule::cap(1440, 800),
        ];
        let breakdown = fee(&rules, &session("2026-06-01T10:00:00+09:00", 1440));
        assert_eq!(breakdown.total_fee, 800);
    }

    #[test]
    fn test_seconds_in_start_are_ignored() {
        let rules = vec![
            TariffRule::base(60, 100).with_time_range(range("18:00～9:00")),
            TariffRule::base(30, 100).with_time_range(range("9:00～18:00")),
        ];
        let exact = fee(&rules, &session("2026-06-05T18:00:00+09:00", 960));
        let late = fee(&rules, &session("2026-06-05T18:00:59+09:00", 960));
        assert_eq!(exact.total_fee, late.total_fee);
    }

    #[test]
    fn test_deterministic() {
        let rules = dominance_rules();
        let s = session("2026-06-05T20:15:00+09:00", 4321);
        assert_eq!(fee(&rules, &s), fee(&rules, &s));
    }

    #[test]
    fn test_audit_trace_records_each_stage() {
        let breakdown = fee(&dominance_rules(), &session("2026-06-01T22:00:00+09:00", 760));
        let ids: Vec<&str> = breakdown.audit_trace.iter().map(|s| s.rule_id.as_str()).collect();
        assert_eq!(ids, vec!["breakpoints", "segmentation", "accrual", "cap_optimization"]);
        assert_eq!(breakdown.audit_trace[3].output["total_fee"], 900);
        assert_eq!(breakdown.audit_trace[2].output["raw_total"], 1100);
    }
}
