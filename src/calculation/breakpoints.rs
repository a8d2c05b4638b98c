//! Breakpoint construction.
//!
//! A breakpoint is an offset (minutes from session start) at which the set
//! of applicable rules may change. Between two consecutive breakpoints the
//! resolved metering rule is constant, and every cap window starts and ends
//! on a breakpoint.

use crate::models::{ParkingSession, TariffRule};

use super::calendar::{days_spanned, midnight_offset};
use super::cap_optimizer::CapWindow;

/// Builds the sorted, deduplicated breakpoints of a session.
///
/// The result always starts at `0` and ends at `duration_minutes`. In
/// between it holds:
/// - every daily time-range boundary of every rule,
/// - every progressive `apply_after` threshold,
/// - every local midnight, when any rule is restricted by day type,
/// - the bounds of every cap window.
///
/// # Example
///
/// ```
/// use tariff_engine::calculation::build_breakpoints;
/// use tariff_engine::models::{ParkingSession, TariffRule, TimeRange};
/// use chrono::DateTime;
///
/// let rules = vec![
///     TariffRule::base(60, 100).with_time_range(TimeRange::parse("18:00～9:00").unwrap()),
///     TariffRule::base(30, 100).with_time_range(TimeRange::parse("9:00～18:00").unwrap()),
/// ];
/// let session = ParkingSession::new(
///     DateTime::parse_from_rfc3339("2026-06-05T18:00:00+09:00").unwrap(),
///     960,
/// );
/// assert_eq!(build_breakpoints(&rules, &session, &[]), vec![0, 900, 960]);
/// ```
pub fn build_breakpoints(
    rules: &[TariffRule],
    session: &ParkingSession,
    cap_windows: &[CapWindow],
) -> Vec<i64> {
    let duration = session.duration_minutes;
    let mut points = vec![0, duration];

    let needs_midnights = rules
        .iter()
        .any(|rule| rule.scope.day_restriction().is_some());

    for day in days_spanned(session) {
        let midnight = midnight_offset(session, day);
        if needs_midnights {
            points.push(midnight);
        }
        for range in rules.iter().filter_map(|rule| rule.scope.time_range) {
            if range.start_minute == range.end_minute {
                continue;
            }
            points.push(midnight + i64::from(range.start_minute));
            points.push(midnight + i64::from(range.end_minute));
        }
    }

    points.extend(rules.iter().filter_map(|rule| rule.apply_after_minutes));

    for window in cap_windows {
        points.push(window.start_offset);
        points.push(window.end_offset);
    }

    points.retain(|offset| (0..=duration).contains(offset));
    points.sort_unstable();
    points.dedup();
    points
}
