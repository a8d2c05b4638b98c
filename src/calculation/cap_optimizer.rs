//! Cap window enumeration and optimization.
//!
//! A cap replaces whatever accrues inside one of its windows with its cap
//! price. Windows of different caps may overlap, so picking which ones to
//! apply is an optimization problem: find the cheapest way to cover the
//! session with metered spans and non-overlapping cap windows.
//!
//! Every cap window starts and ends on a breakpoint, which turns the
//! problem into a shortest path over the breakpoints:
//!
//! ```text
//! dp[0] = 0
//! dp[j] = min( dp[i] + raw(b_i, b_j)   for every open start i < j,
//!              dp[i] + cap_price       for every cap window [b_i, b_j) )
//! ```
//!
//! See [`optimize`] for which starts stay open.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{MINUTES_PER_DAY, ParkingSession, RuleKind, TariffRule};

use super::accrual::{Accrual, units};
use super::calendar::{CalendarResolver, days_spanned, midnight_offset};
use super::segments::Segment;

/// One concrete window of a cap rule inside the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapWindow {
    /// Index of the cap rule.
    pub rule_index: usize,
    /// Minutes from session start where the window begins.
    pub start_offset: i64,
    /// Minutes from session start where the window ends (exclusive).
    pub end_offset: i64,
}

/// Enumerates every cap window that overlaps the session.
///
/// An unscoped cap tiles the session from its start in windows of
/// `unit_minutes`. A scoped cap opens one instance per local day, at the
/// start of its time range (or at midnight when it only has day types),
/// lasting one time-range length (or one day). Instances are tiled by
/// `unit_minutes` from their own start. A day-type restriction is checked
/// against the date the instance opens on.
///
/// A rolling window cut short by the end of the session still charges the
/// full cap price. A calendar window only applies when it lies entirely
/// inside the session; one that opened before the session started or
/// closes after it ends is skipped.
///
/// # Example
///
/// ```
/// use tariff_engine::calculation::{HolidayCalendar, cap_windows};
/// use tariff_engine::models::{ParkingSession, TariffRule};
/// use chrono::DateTime;
///
/// let rules = vec![TariffRule::base(60, 100), TariffRule::cap(1440, 1000)];
/// let session = ParkingSession::new(
///     DateTime::parse_from_rfc3339("2026-06-01T10:00:00+09:00").unwrap(),
///     3000,
/// );
/// let windows = cap_windows(&rules, &session, &HolidayCalendar::default());
/// let bounds: Vec<(i64, i64)> = windows.iter().map(|w| (w.start_offset, w.end_offset)).collect();
/// assert_eq!(bounds, vec![(0, 1440), (1440, 2880), (2880, 3000)]);
/// ```
pub fn cap_windows<C>(rules: &[TariffRule], session: &ParkingSession, calendar: &C) -> Vec<CapWindow>
where
    C: CalendarResolver + ?Sized,
{
    let duration = session.duration_minutes;
    let mut windows = Vec::new();

    for (rule_index, rule) in rules.iter().enumerate() {
        if rule.kind != RuleKind::Cap {
            continue;
        }

        if rule.scope.is_unscoped() {
            windows.extend(
                tiles(0, duration, rule.unit_minutes).map(|(start_offset, end_offset)| CapWindow {
                    rule_index,
                    start_offset,
                    end_offset,
                }),
            );
            continue;
        }

        for day in days_spanned(session) {
            if !opens_on(rule, day, calendar) {
                continue;
            }
            let (start_minute, length) = match rule.scope.time_range {
                Some(range) => (range.start_minute, range.length_minutes()),
                None => (0, MINUTES_PER_DAY),
            };
            let anchor = midnight_offset(session, day) + i64::from(start_minute);
            windows.extend(
                tiles(anchor, anchor + i64::from(length), rule.unit_minutes)
                    .filter(|&(start, end)| start >= 0 && end <= duration)
                    .map(|(start_offset, end_offset)| CapWindow {
                        rule_index,
                        start_offset,
                        end_offset,
                    }),
            );
        }
    }

    windows
}

fn opens_on<C>(rule: &TariffRule, day: NaiveDate, calendar: &C) -> bool
where
    C: CalendarResolver + ?Sized,
{
    rule.scope
        .day_restriction()
        .is_none_or(|days| days.contains(&calendar.day_type(day)))
}

/// Consecutive windows of `unit` minutes over `[from, to)`, the last one
/// cut at `to`.
fn tiles(from: i64, to: i64, unit: i64) -> impl Iterator<Item = (i64, i64)> {
    std::iter::successors(Some(from), move |&start| Some(start.saturating_add(unit)))
        .take_while(move |&start| start < to)
        .map(move |start| (start, start.saturating_add(unit).min(to)))
}

/// One step of the cheapest path over the breakpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStep {
    /// Minutes from session start where the step begins.
    pub start_offset: i64,
    /// Minutes from session start where the step ends (exclusive).
    pub end_offset: i64,
    /// Index into the cap windows if this step is capped, `None` if metered.
    pub window: Option<usize>,
}

/// The cheapest covering of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapPlan {
    /// Steps in offset order, partitioning the session.
    pub steps: Vec<PlanStep>,
    /// Cost of the plan.
    pub total: i64,
}

/// Finds the cheapest combination of metered spans and cap windows.
///
/// A metered span only ever needs to start at the session start, at a
/// segment start, or where a cap window ends: anywhere else it can be
/// extended backwards at no extra cost. Spans are also cut at segment
/// starts, which costs nothing since rounding restarts there anyway.
///
/// Within one segment, a span from `a` costs `dp[a] + ceil((t - a) / unit)
/// * price` at `t`. An earlier start is dropped once a later one is never
/// worse, which leaves at most one open start per `unit` residue, so the
/// pass stays linear in the breakpoints for short units.
///
/// Metered edges are tried before cap edges and only a strictly cheaper
/// candidate replaces the current best, so a cap is applied only when it
/// actually saves money and the result is deterministic.
pub fn optimize(
    breakpoints: &[i64],
    windows: &[CapWindow],
    rules: &[TariffRule],
    accrual: &Accrual<'_>,
) -> CapPlan {
    let count = breakpoints.len();
    if count < 2 {
        return CapPlan {
            steps: Vec::new(),
            total: 0,
        };
    }

    // Cap edges grouped by the breakpoint they end on.
    let mut ending_at: Vec<Vec<(usize, usize)>> = vec![Vec::new(); count];
    for (window_index, window) in windows.iter().enumerate() {
        let (Ok(from), Ok(to)) = (
            breakpoints.binary_search(&window.start_offset),
            breakpoints.binary_search(&window.end_offset),
        ) else {
            continue;
        };
        ending_at[to].push((from, window_index));
    }

    let segments = accrual.segments();
    let mut segment = 0;

    let mut best = vec![i64::MAX; count];
    let mut via: Vec<Option<(usize, Option<usize>)>> = vec![None; count];
    best[0] = 0;
    let mut open = OpenStarts::new(rate(rules, segments.first()));
    open.admit(0, breakpoints, &best);

    for to in 1..count {
        for &from in &open.starts {
            let candidate =
                best[from].saturating_add(accrual.raw(breakpoints[from], breakpoints[to]));
            if candidate < best[to] {
                best[to] = candidate;
                via[to] = Some((from, None));
            }
        }
        for &(from, window_index) in &ending_at[to] {
            let price = rules[windows[window_index].rule_index].unit_price;
            let candidate = best[from].saturating_add(price);
            if candidate < best[to] {
                best[to] = candidate;
                via[to] = Some((from, Some(window_index)));
            }
        }

        if segments
            .get(segment)
            .is_some_and(|s| s.end_offset == breakpoints[to])
        {
            segment += 1;
            open = OpenStarts::new(rate(rules, segments.get(segment)));
            open.admit(to, breakpoints, &best);
        } else if !ending_at[to].is_empty() {
            open.admit(to, breakpoints, &best);
        }
    }

    let mut steps = Vec::new();
    let mut at = count - 1;
    while let Some((from, window)) = via[at] {
        steps.push(PlanStep {
            start_offset: breakpoints[from],
            end_offset: breakpoints[at],
            window,
        });
        at = from;
    }
    steps.reverse();

    CapPlan {
        steps,
        total: best[count - 1],
    }
}

/// Unit length and price of a segment; uncovered time is free.
fn rate(rules: &[TariffRule], segment: Option<&Segment>) -> (i64, i64) {
    match segment.and_then(|s| s.rule_index).map(|i| &rules[i]) {
        Some(rule) => (rule.unit_minutes, rule.unit_price),
        None => (1, 0),
    }
}

/// Breakpoints a metered span may start from within the current segment.
struct OpenStarts {
    unit: i64,
    price: i64,
    starts: Vec<usize>,
}

impl OpenStarts {
    fn new((unit, price): (i64, i64)) -> Self {
        Self {
            unit,
            price,
            starts: Vec::new(),
        }
    }

    /// Adds `index` as a start, dropping whichever starts it makes redundant.
    ///
    /// For an earlier start `a` and the new start `b`, with `g = b - a`,
    /// every later cost from `a` lies between
    /// `dp[a] + floor(g / unit) * price` and `dp[a] + ceil(g / unit) * price`
    /// above the cost from `b` minus `dp[b]`.
    fn admit(&mut self, index: usize, breakpoints: &[i64], best: &[i64]) {
        let cost_via = |from: usize, round_up: bool| {
            let gap = breakpoints[index] - breakpoints[from];
            let whole = if round_up {
                units(gap, self.unit)
            } else {
                gap / self.unit
            };
            best[from].saturating_add(whole.saturating_mul(self.price))
        };

        if self
            .starts
            .iter()
            .any(|&from| cost_via(from, true) <= best[index])
        {
            return;
        }
        let kept: Vec<usize> = self
            .starts
            .iter()
            .copied()
            .filter(|&from| cost_via(from, false) < best[index])
            .collect();
        self.starts = kept;
        self.starts.push(index);
    }
}
