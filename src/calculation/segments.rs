//! Segment grouping.
//!
//! Splits a session at its breakpoints, resolves the metering rule of each
//! elementary interval, and merges neighbours billed under the same rule.

use serde::{Deserialize, Serialize};

use crate::error::EngineResult;
use crate::models::{ParkingSession, TariffRule};

use super::calendar::CalendarResolver;
use super::scope_matcher::resolve_metering_rule;

/// A maximal stretch of the session billed under one metering rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// Minutes from session start where the segment begins.
    pub start_offset: i64,
    /// Minutes from session start where the segment ends (exclusive).
    pub end_offset: i64,
    /// Index into the rule list, or `None` if no metering rule applies.
    pub rule_index: Option<usize>,
}

impl Segment {
    /// Length of the segment in minutes.
    pub fn minutes(&self) -> i64 {
        self.end_offset - self.start_offset
    }
}

/// Groups the elementary intervals between `breakpoints` into segments.
///
/// The rule for each interval is resolved at its first minute, with the
/// elapsed time equal to its offset. Consecutive intervals resolving to the
/// same rule (or both to none) merge into one segment, so the ceiling
/// rounding of a rule restarts only where its run is interrupted.
///
/// # Errors
///
/// Propagates [`crate::error::EngineError::AmbiguousScope`] from rule
/// resolution.
pub fn group_segments<C>(
    rules: &[TariffRule],
    session: &ParkingSession,
    breakpoints: &[i64],
    calendar: &C,
) -> EngineResult<Vec<Segment>>
where
    C: CalendarResolver + ?Sized,
{
    let mut segments: Vec<Segment> = Vec::new();

    for pair in breakpoints.windows(2) {
        let (start, end) = (pair[0], pair[1]);
        let rule_index = resolve_metering_rule(rules, session.local_at(start), start, calendar)?;

        match segments.last_mut() {
            Some(last) if last.rule_index == rule_index && last.end_offset == start => {
                last.end_offset = end;
            }
            _ => segments.push(Segment {
                start_offset: start,
                end_offset: end,
                rule_index,
            }),
        }
    }

    Ok(segments)
}
