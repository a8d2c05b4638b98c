//! Fee breakdown models for the Tariff Engine.
//!
//! This module contains the [`FeeBreakdown`] type returned by the engine and
//! the [`FeeCalculationResult`] envelope returned by the HTTP API, together
//! with the itemized segments, applied caps, warnings and audit steps.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::TariffRule;

/// A priced billing segment of the session.
///
/// Segments partition `[0, duration_minutes)`. A segment whose `capped` flag
/// is set lies inside an applied cap window: its `charge` is what it would
/// have cost, and is replaced by the cap price in the total.
///
/// # Example
///
/// ```
/// use tariff_engine::models::{SegmentCharge, TariffRule};
///
/// let segment = SegmentCharge {
///     start_offset: 0,
///     end_offset: 900,
///     rule: Some(TariffRule::base(60, 100)),
///     charge: 1500,
///     capped: false,
/// };
/// assert_eq!(segment.minutes(), 900);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentCharge {
    /// Minutes from session start where the segment begins.
    pub start_offset: i64,
    /// Minutes from session start where the segment ends (exclusive).
    pub end_offset: i64,
    /// The metering rule in effect, if any.
    pub rule: Option<TariffRule>,
    /// Ceiling-rounded charge for the segment.
    pub charge: i64,
    /// Whether the charge was absorbed by a cap.
    pub capped: bool,
}

impl SegmentCharge {
    /// Length of the segment in minutes.
    pub fn minutes(&self) -> i64 {
        self.end_offset - self.start_offset
    }
}

/// A cap window the optimizer chose to apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedCap {
    /// Minutes from session start where the window begins.
    pub start_offset: i64,
    /// Minutes from session start where the window ends (exclusive).
    pub end_offset: i64,
    /// The cap rule.
    pub rule: TariffRule,
    /// The price charged for the window.
    pub cap_price: i64,
    /// What the window would have cost without the cap.
    pub raw_charge: i64,
}

/// A warning generated during calculation.
///
/// Warnings indicate potential issues that don't prevent calculation
/// but may require attention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeWarning {
    /// A code identifying the type of warning.
    pub code: String,
    /// A human-readable description of the warning.
    pub message: String,
    /// The severity level (e.g., "low", "medium", "high").
    pub severity: String,
}

/// A single step in the audit trace recording a calculation decision.
///
/// Each step captures the input, output, and reasoning for one stage of
/// the computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStep {
    /// The sequential step number.
    pub step_number: u32,
    /// The identifier of the stage (e.g. `breakpoints`).
    pub rule_id: String,
    /// The human-readable name of the stage.
    pub rule_name: String,
    /// The input data for this step.
    pub input: serde_json::Value,
    /// The output data from this step.
    pub output: serde_json::Value,
    /// Human-readable explanation of the decision.
    pub reasoning: String,
}

/// The engine's answer for one session.
///
/// # Example
///
/// ```
/// use tariff_engine::models::FeeBreakdown;
///
/// let breakdown = FeeBreakdown {
///     total_fee: 0,
///     raw_total: 0,
///     segments: vec![],
///     caps_applied: vec![],
///     warnings: vec![],
///     audit_trace: vec![],
/// };
/// assert!(breakdown.savings() == 0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeBreakdown {
    /// The minimal legal fee.
    pub total_fee: i64,
    /// The fee before any cap is applied.
    pub raw_total: i64,
    /// Itemized segments partitioning the session.
    pub segments: Vec<SegmentCharge>,
    /// Cap windows chosen by the optimizer.
    pub caps_applied: Vec<AppliedCap>,
    /// Non-fatal issues, such as spans with no applicable rate.
    pub warnings: Vec<FeeWarning>,
    /// Record of each computation stage.
    pub audit_trace: Vec<AuditStep>,
}

impl FeeBreakdown {
    /// How much the applied caps saved against the raw total.
    pub fn savings(&self) -> i64 {
        self.raw_total - self.total_fee
    }
}

/// The complete result of a fee calculation served over the API.
///
/// # Example
///
/// ```
/// use tariff_engine::models::{FeeBreakdown, FeeCalculationResult};
/// use chrono::{DateTime, Utc};
/// use uuid::Uuid;
///
/// let result = FeeCalculationResult {
///     calculation_id: Uuid::new_v4(),
///     timestamp: Utc::now(),
///     engine_version: "0.1.0".to_string(),
///     lot_id: None,
///     parking_start: DateTime::parse_from_rfc3339("2026-06-05T18:00:00+09:00").unwrap(),
///     duration_minutes: 60,
///     breakdown: FeeBreakdown {
///         total_fee: 100,
///         raw_total: 100,
///         segments: vec![],
///         caps_applied: vec![],
///         warnings: vec![],
///         audit_trace: vec![],
///     },
///     duration_us: 42,
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeCalculationResult {
    /// Unique identifier for this calculation.
    pub calculation_id: Uuid,
    /// When the calculation was performed.
    pub timestamp: DateTime<Utc>,
    /// The version of the engine that performed the calculation.
    pub engine_version: String,
    /// The configured lot whose tariff was used, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lot_id: Option<String>,
    /// When the session started.
    pub parking_start: DateTime<FixedOffset>,
    /// Length of the session in minutes.
    pub duration_minutes: i64,
    /// The fee and its itemization.
    pub breakdown: FeeBreakdown,
    /// The total calculation duration in microseconds.
    pub duration_us: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_segment(start: i64, end: i64, charge: i64, capped: bool) -> SegmentCharge {
        SegmentCharge {
            start_offset: start,
            end_offset: end,
            rule: Some(TariffRule::base(60, 100)),
            charge,
            capped,
        }
    }

    #[test]
    fn test_total_equals_uncapped_segments_plus_caps() {
        let breakdown = FeeBreakdown {
            total_fee: 500,
            raw_total: 700,
            segments: vec![
                sample_segment(0, 300, 500, true),
                sample_segment(300, 460, 200, false),
            ],
            caps_applied: vec![AppliedCap {
                start_offset: 0,
                end_offset: 300,
                rule: TariffRule::cap(300, 300),
                cap_price: 300,
                raw_charge: 500,
            }],
            warnings: vec![],
            audit_trace: vec![],
        };

        let uncapped: i64 = breakdown
            .segments
            .iter()
            .filter(|s| !s.capped)
            .map(|s| s.charge)
            .sum();
        let caps: i64 = breakdown.caps_applied.iter().map(|c| c.cap_price).sum();
        assert_eq!(breakdown.total_fee, uncapped + caps);
        assert_eq!(breakdown.savings(), 200);
    }

    #[test]
    fn test_segment_serialization() {
        let segment = sample_segment(0, 60, 100, false);
        let json = serde_json::to_value(&segment).unwrap();
        assert_eq!(json["start_offset"], 0);
        assert_eq!(json["rule"]["kind"], "base");
        assert_eq!(json["capped"], false);

        let deserialized: SegmentCharge = serde_json::from_value(json).unwrap();
        assert_eq!(deserialized, segment);
    }

    #[test]
    fn test_result_serialization_skips_missing_lot() {
        let result = FeeCalculationResult {
            calculation_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            engine_version: "0.1.0".to_string(),
            lot_id: None,
            parking_start: DateTime::parse_from_rfc3339("2026-06-05T18:00:00+09:00").unwrap(),
            duration_minutes: 60,
            breakdown: FeeBreakdown {
                total_fee: 100,
                raw_total: 100,
                segments: vec![sample_segment(0, 60, 100, false)],
                caps_applied: vec![],
                warnings: vec![],
                audit_trace: vec![],
            },
            duration_us: 10,
        };

        let json = serde_json::to_string(&result).unwrap();
        assert!(!json.contains("lot_id"));

        let deserialized: FeeCalculationResult = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, result);
    }
}
