//! Day-type and holiday models.
//!
//! Tariff rules are scoped by the [`DayType`] of a calendar date. The
//! classification itself is produced by a calendar resolver (see
//! [`crate::calculation::CalendarResolver`]); this module only defines the
//! vocabulary and how tariff sheets spell it.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Represents the classification of a calendar date for rate scoping.
///
/// # Example
///
/// ```
/// use tariff_engine::models::DayType;
///
/// let day_type = DayType::SundayOrHoliday;
/// assert_eq!(format!("{}", day_type), "Sunday/Holiday");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayType {
    /// Monday through Friday, excluding holidays.
    Weekday,
    /// Saturday, excluding holidays.
    Saturday,
    /// Sunday or any public holiday.
    SundayOrHoliday,
}

impl std::fmt::Display for DayType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DayType::Weekday => write!(f, "Weekday"),
            DayType::Saturday => write!(f, "Saturday"),
            DayType::SundayOrHoliday => write!(f, "Sunday/Holiday"),
        }
    }
}

impl DayType {
    /// Parses a tariff-sheet day label into the set of day types it covers.
    ///
    /// Accepts the labels used on Japanese tariff boards (`月～金`, `土日祝`,
    /// `土`, `日祝`) and the English aliases `weekday`, `weekend`,
    /// `saturday` and `sunday_or_holiday`.
    ///
    /// # Example
    ///
    /// ```
    /// use tariff_engine::models::DayType;
    ///
    /// let days = DayType::parse_label("土日祝").unwrap();
    /// assert!(days.contains(&DayType::Saturday));
    /// assert!(days.contains(&DayType::SundayOrHoliday));
    /// assert!(!days.contains(&DayType::Weekday));
    /// ```
    pub fn parse_label(label: &str) -> EngineResult<BTreeSet<DayType>> {
        let normalized: String = label
            .trim()
            .chars()
            .map(|c| match c {
                '〜' | '~' => '～',
                other => other,
            })
            .collect();

        let days: &[DayType] = match normalized.to_lowercase().as_str() {
            "月～金" | "平日" | "weekday" => &[DayType::Weekday],
            "土日祝" | "weekend" => &[DayType::Saturday, DayType::SundayOrHoliday],
            "土" | "saturday" => &[DayType::Saturday],
            "日祝" | "sunday_or_holiday" => &[DayType::SundayOrHoliday],
            _ => {
                return Err(EngineError::invalid(
                    "day_type",
                    format!("unknown day type label '{}'", label),
                ));
            }
        };

        Ok(days.iter().copied().collect())
    }
}

/// Represents a public holiday.
///
/// # Example
///
/// ```
/// use tariff_engine::models::Holiday;
/// use chrono::NaiveDate;
///
/// let holiday = Holiday {
///     date: NaiveDate::from_ymd_opt(2026, 5, 4).unwrap(),
///     name: "みどりの日".to_string(),
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holiday {
    /// The date of the holiday.
    pub date: NaiveDate,
    /// The name of the holiday.
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weekday_label() {
        let days = DayType::parse_label("月～金").unwrap();
        assert_eq!(days.len(), 1);
        assert!(days.contains(&DayType::Weekday));
    }

    #[test]
    fn test_wave_dash_and_ascii_tilde_are_equivalent() {
        assert_eq!(
            DayType::parse_label("月〜金").unwrap(),
            DayType::parse_label("月~金").unwrap()
        );
    }

    #[test]
    fn test_saturday_and_sunday_holiday_labels() {
        assert_eq!(
            DayType::parse_label("土").unwrap().into_iter().collect::<Vec<_>>(),
            vec![DayType::Saturday]
        );
        assert_eq!(
            DayType::parse_label("日祝").unwrap().into_iter().collect::<Vec<_>>(),
            vec![DayType::SundayOrHoliday]
        );
    }

    #[test]
    fn test_english_aliases() {
        assert_eq!(
            DayType::parse_label("Weekend").unwrap(),
            DayType::parse_label("土日祝").unwrap()
        );
        assert_eq!(
            DayType::parse_label("weekday").unwrap(),
            DayType::parse_label("月～金").unwrap()
        );
    }

    #[test]
    fn test_unknown_label_is_rejected() {
        match DayType::parse_label("火") {
            Err(EngineError::InvalidInput { field, message }) => {
                assert_eq!(field, "day_type");
                assert!(message.contains("火"));
            }
            other => panic!("Expected InvalidInput error, got {:?}", other),
        }
    }

    #[test]
    fn test_day_type_serialization() {
        let json = serde_json::to_string(&DayType::SundayOrHoliday).unwrap();
        assert_eq!(json, "\"sunday_or_holiday\"");

        let deserialized: DayType = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, DayType::SundayOrHoliday);
    }

    #[test]
    fn test_holiday_deserialization() {
        let holiday: Holiday =
            serde_json::from_str(r#"{"date": "2026-11-03", "name": "文化の日"}"#).unwrap();
        assert_eq!(holiday.date, NaiveDate::from_ymd_opt(2026, 11, 3).unwrap());
        assert_eq!(holiday.name, "文化の日");
    }
}
