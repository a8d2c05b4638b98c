//! Raw accrual of metered charges.
//!
//! Every metering rule bills in whole units: a stretch of `m` minutes under
//! a rule of `unit_minutes`/`unit_price` costs `ceil(m / unit_minutes) *
//! unit_price`. Rounding restarts wherever a segment is cut, so a span that
//! begins or ends inside a segment is billed from its own clipped start.

use crate::error::{EngineError, EngineResult};
use crate::models::{SegmentCharge, TariffRule};

use super::segments::Segment;

/// Ceiling-rounded charge for `minutes` under `rule`.
///
/// Minutes with no applicable rule are free.
///
/// # Example
///
/// ```
/// use tariff_engine::calculation::segment_charge;
/// use tariff_engine::models::TariffRule;
///
/// let rule = TariffRule::base(80, 100);
/// assert_eq!(segment_charge(Some(&rule), 460), 600);
/// assert_eq!(segment_charge(Some(&rule), 80), 100);
/// assert_eq!(segment_charge(None, 460), 0);
/// ```
pub fn segment_charge(rule: Option<&TariffRule>, minutes: i64) -> i64 {
    checked_segment_charge(rule, minutes).unwrap_or(i64::MAX)
}

/// Like [`segment_charge`], but `None` if the charge does not fit in an
/// `i64`.
pub fn checked_segment_charge(rule: Option<&TariffRule>, minutes: i64) -> Option<i64> {
    match rule {
        Some(rule) if minutes > 0 => units(minutes, rule.unit_minutes).checked_mul(rule.unit_price),
        _ => Some(0),
    }
}

/// `ceil(minutes / unit)` for positive operands, without overflow.
pub(crate) fn units(minutes: i64, unit: i64) -> i64 {
    minutes / unit + i64::from(minutes % unit != 0)
}

/// Answers "what would this span cost uncapped?" for any span of a session.
///
/// Built once per calculation from the grouped segments. Full-segment
/// charges are prefix-summed so each query only rounds the two clipped
/// ends.
#[derive(Debug)]
pub struct Accrual<'a> {
    rules: &'a [TariffRule],
    segments: &'a [Segment],
    prefix: Vec<i64>,
}

impl<'a> Accrual<'a> {
    /// Prices the segments of a session.
    ///
    /// A clipped span never costs more than the segment it is cut from, so
    /// once every full segment fits, so does every later query.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::CalculationError`] if a segment charge or the
    /// uncapped total does not fit in an `i64`.
    pub fn new(rules: &'a [TariffRule], segments: &'a [Segment]) -> EngineResult<Self> {
        let mut prefix = Vec::with_capacity(segments.len() + 1);
        let mut running: i64 = 0;
        prefix.push(running);
        for segment in segments {
            let overflow = || EngineError::CalculationError {
                message: "uncapped fee exceeds the representable range".to_string(),
            };
            let charge =
                checked_segment_charge(segment.rule_index.map(|i| &rules[i]), segment.minutes())
                    .ok_or_else(overflow)?;
            running = running.checked_add(charge).ok_or_else(overflow)?;
            prefix.push(running);
        }
        Ok(Self {
            rules,
            segments,
            prefix,
        })
    }

    /// The segments being priced.
    pub fn segments(&self) -> &[Segment] {
        self.segments
    }

    /// Uncapped total of the whole session.
    pub fn total(&self) -> i64 {
        self.prefix.last().copied().unwrap_or(0)
    }

    /// Uncapped charge of `[from, to)`.
    pub fn raw(&self, from: i64, to: i64) -> i64 {
        let Some((first, last)) = self.covering(from, to) else {
            return 0;
        };
        if first == last {
            return self.clipped(first, from, to);
        }
        let head = self.clipped(first, from, self.segments[first].end_offset);
        let body = self.prefix[last] - self.prefix[first + 1];
        let tail = self.clipped(last, self.segments[last].start_offset, to);
        head.saturating_add(body).saturating_add(tail)
    }

    /// Itemizes `[from, to)` into clipped segment charges.
    pub fn charges(&self, from: i64, to: i64, capped: bool) -> Vec<SegmentCharge> {
        let Some((first, last)) = self.covering(from, to) else {
            return Vec::new();
        };
        (first..=last)
            .map(|index| {
                let segment = &self.segments[index];
                let start = segment.start_offset.max(from);
                let end = segment.end_offset.min(to);
                SegmentCharge {
                    start_offset: start,
                    end_offset: end,
                    rule: segment.rule_index.map(|i| self.rules[i].clone()),
                    charge: self.clipped(index, start, end),
                    capped,
                }
            })
            .collect()
    }

    /// Indices of the first and last segments overlapping `[from, to)`.
    fn covering(&self, from: i64, to: i64) -> Option<(usize, usize)> {
        if from >= to {
            return None;
        }
        let first = self.segments.partition_point(|s| s.end_offset <= from);
        let last = self.segments.partition_point(|s| s.end_offset < to);
        if first >= self.segments.len() || last >= self.segments.len() {
            return None;
        }
        Some((first, last))
    }

    fn clipped(&self, index: usize, from: i64, to: i64) -> i64 {
        let segment = &self.segments[index];
        let rule = segment.rule_index.map(|i| &self.rules[i]);
        segment_charge(rule, to.min(segment.end_offset) - from.max(segment.start_offset))
    }
}
