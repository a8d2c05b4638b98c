//! Calendar resolution for day-type scoped rates.
//!
//! This module provides the [`CalendarResolver`] seam through which the
//! engine learns whether a date is a weekday, a Saturday, or a Sunday/holiday,
//! plus helpers to read the local minute-of-day of an instant.

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};

use crate::models::{DayType, Holiday, ParkingSession};

/// Maps a local calendar date to its [`DayType`].
///
/// Implementations must be pure: the same date always yields the same day
/// type. Any `Fn(NaiveDate) -> DayType` closure is a resolver.
///
/// # Example
///
/// ```
/// use tariff_engine::calculation::CalendarResolver;
/// use tariff_engine::models::DayType;
/// use chrono::NaiveDate;
///
/// let always_weekday = |_: NaiveDate| DayType::Weekday;
/// let date = NaiveDate::from_ymd_opt(2026, 6, 7).unwrap(); // a Sunday
/// assert_eq!(always_weekday.day_type(date), DayType::Weekday);
/// ```
pub trait CalendarResolver: Send + Sync {
    /// Returns the day type of `date`.
    fn day_type(&self, date: NaiveDate) -> DayType;
}

impl<F> CalendarResolver for F
where
    F: Fn(NaiveDate) -> DayType + Send + Sync,
{
    fn day_type(&self, date: NaiveDate) -> DayType {
        self(date)
    }
}

/// Determines the day type of a date from its weekday alone.
///
/// # Example
///
/// ```
/// use tariff_engine::calculation::get_day_type;
/// use tariff_engine::models::DayType;
/// use chrono::NaiveDate;
///
/// // 2026-06-06 is a Saturday
/// assert_eq!(get_day_type(NaiveDate::from_ymd_opt(2026, 6, 6).unwrap()), DayType::Saturday);
/// // 2026-06-08 is a Monday
/// assert_eq!(get_day_type(NaiveDate::from_ymd_opt(2026, 6, 8).unwrap()), DayType::Weekday);
/// ```
pub fn get_day_type(date: NaiveDate) -> DayType {
    match date.weekday() {
        Weekday::Sat => DayType::Saturday,
        Weekday::Sun => DayType::SundayOrHoliday,
        _ => DayType::Weekday,
    }
}

/// A calendar with a fixed set of public holidays.
///
/// Holidays resolve to [`DayType::SundayOrHoliday`] whatever weekday they
/// fall on; every other date resolves by weekday.
///
/// # Example
///
/// ```
/// use tariff_engine::calculation::{CalendarResolver, HolidayCalendar};
/// use tariff_engine::models::{DayType, Holiday};
/// use chrono::NaiveDate;
///
/// let culture_day = NaiveDate::from_ymd_opt(2026, 11, 3).unwrap(); // a Tuesday
/// let calendar = HolidayCalendar::new(vec![Holiday {
///     date: culture_day,
///     name: "文化の日".to_string(),
/// }]);
/// assert_eq!(calendar.day_type(culture_day), DayType::SundayOrHoliday);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HolidayCalendar {
    holidays: BTreeSet<NaiveDate>,
}

impl HolidayCalendar {
    /// Creates a calendar from a list of holidays.
    pub fn new(holidays: impl IntoIterator<Item = Holiday>) -> Self {
        Self {
            holidays: holidays.into_iter().map(|h| h.date).collect(),
        }
    }

    /// Returns a copy of this calendar with additional holidays.
    pub fn with_holidays(&self, extra: impl IntoIterator<Item = Holiday>) -> Self {
        let mut holidays = self.holidays.clone();
        holidays.extend(extra.into_iter().map(|h| h.date));
        Self { holidays }
    }

    /// Returns true if `date` is a configured holiday.
    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays.contains(&date)
    }

    /// Number of configured holidays.
    pub fn len(&self) -> usize {
        self.holidays.len()
    }

    /// Returns true if no holidays are configured.
    pub fn is_empty(&self) -> bool {
        self.holidays.is_empty()
    }
}

impl CalendarResolver for HolidayCalendar {
    fn day_type(&self, date: NaiveDate) -> DayType {
        if self.is_holiday(date) {
            DayType::SundayOrHoliday
        } else {
            get_day_type(date)
        }
    }
}

/// Minutes elapsed since local midnight.
pub fn minute_of_day(instant: NaiveDateTime) -> u32 {
    instant.hour() * 60 + instant.minute()
}

/// Every local date a session touches, starting the day before it begins.
///
/// The leading day catches daily windows that open before the session
/// and are still running when it starts.
pub fn days_spanned(session: &ParkingSession) -> impl Iterator<Item = NaiveDate> {
    let first = session.local_start().date();
    let first = first.pred_opt().unwrap_or(first);
    let last = session.local_end().date();
    first.iter_days().take_while(move |day| *day <= last)
}

/// Offset from session start of local midnight on `date`.
pub fn midnight_offset(session: &ParkingSession, date: NaiveDate) -> i64 {
    session.offset_of(date.and_time(NaiveTime::MIN))
}
