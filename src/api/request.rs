//! Request types for the Tariff Engine API.
//!
//! This module defines the JSON request structures for the `/calculate` endpoint.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::{Holiday, ParkingSession, TariffRuleRecord};

/// Request body for the `/calculate` endpoint.
///
/// Names either a configured lot (`lot_id`) or carries its own `rules`,
/// never both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeRequest {
    /// A configured parking lot whose tariff should be used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lot_id: Option<String>,
    /// An ad-hoc tariff in tariff-sheet form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<Vec<TariffRuleRecord>>,
    /// When the vehicle entered, with its UTC offset.
    pub parking_start: DateTime<FixedOffset>,
    /// Length of the stay in minutes.
    pub duration_minutes: i64,
    /// Extra holidays merged into the configured calendar.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub holidays: Vec<HolidayRequest>,
}

impl FeeRequest {
    /// The session being priced.
    pub fn session(&self) -> ParkingSession {
        ParkingSession::new(self.parking_start, self.duration_minutes)
    }
}

/// Holiday information in a fee request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HolidayRequest {
    /// The date of the holiday.
    pub date: NaiveDate,
    /// The name of the holiday.
    #[serde(default)]
    pub name: String,
}

impl From<HolidayRequest> for Holiday {
    fn from(req: HolidayRequest) -> Self {
        Holiday {
            date: req.date,
            name: req.name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RuleKind;

    #[test]
    fn test_deserialize_lot_request() {
        let json = r#"{
            "lot_id": "station-north",
            "parking_start": "2026-06-05T22:00:00+09:00",
            "duration_minutes": 760
        }"#;

        let request: FeeRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.lot_id.as_deref(), Some("station-north"));
        assert!(request.rules.is_none());
        assert!(request.holidays.is_empty());

        let session = request.session();
        assert_eq!(session.duration_minutes, 760);
        assert_eq!(session.local_start().to_string(), "2026-06-05 22:00:00");
    }

    #[test]
    fn test_deserialize_inline_rules_with_holidays() {
        let json = r#"{
            "rules": [
                {"type": "base", "minutes": 60, "price": 100, "time_range": "18:00～9:00"},
                {"type": "max", "minutes": 1440, "price": 900}
            ],
            "parking_start": "2026-06-05T18:00:00+09:00",
            "duration_minutes": 960,
            "holidays": [{"date": "2026-06-08"}]
        }"#;

        let request: FeeRequest = serde_json::from_str(json).unwrap();
        let rules = request.rules.as_ref().unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[1].rule_type, RuleKind::Cap);

        let holiday: Holiday = request.holidays[0].clone().into();
        assert_eq!(holiday.date, NaiveDate::from_ymd_opt(2026, 6, 8).unwrap());
        assert!(holiday.name.is_empty());
    }

    #[test]
    fn test_missing_start_is_rejected() {
        let json = r#"{"lot_id": "city-hall", "duration_minutes": 60}"#;
        let err = serde_json::from_str::<FeeRequest>(json).unwrap_err();
        assert!(err.to_string().contains("missing field `parking_start`"));
    }
}
