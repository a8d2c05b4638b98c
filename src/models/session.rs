//! Parking session model.

use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// A single parking stay to be priced.
///
/// Sessions are immutable inputs created per fee request. Local clock
/// time is taken in the offset carried by `start`.
///
/// # Example
///
/// ```
/// use tariff_engine::models::ParkingSession;
/// use chrono::DateTime;
///
/// let session = ParkingSession::new(
///     DateTime::parse_from_rfc3339("2026-06-05T18:00:00+09:00").unwrap(),
///     960,
/// );
/// assert_eq!(session.local_start().to_string(), "2026-06-05 18:00:00");
/// assert_eq!(session.local_end().to_string(), "2026-06-06 10:00:00");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParkingSession {
    /// When the vehicle entered.
    pub start: DateTime<FixedOffset>,
    /// Length of the stay in minutes.
    pub duration_minutes: i64,
}

impl ParkingSession {
    /// Creates a new session.
    pub fn new(start: DateTime<FixedOffset>, duration_minutes: i64) -> Self {
        Self {
            start,
            duration_minutes,
        }
    }

    /// Rejects non-positive durations.
    pub fn validate(&self) -> EngineResult<()> {
        if self.duration_minutes <= 0 {
            return Err(EngineError::invalid(
                "duration_minutes",
                format!("must be positive, got {}", self.duration_minutes),
            ));
        }
        Duration::try_minutes(self.duration_minutes)
            .and_then(|span| self.local_start().checked_add_signed(span))
            .ok_or_else(|| {
                EngineError::invalid(
                    "duration_minutes",
                    format!("{} is out of the supported range", self.duration_minutes),
                )
            })?;
        Ok(())
    }

    /// Local wall-clock start, truncated to the minute.
    pub fn local_start(&self) -> NaiveDateTime {
        let local = self.start.naive_local();
        local
            .with_second(0)
            .and_then(|dt| dt.with_nanosecond(0))
            .unwrap_or(local)
    }

    /// Local wall-clock time `offset_minutes` after the start.
    pub fn local_at(&self, offset_minutes: i64) -> NaiveDateTime {
        self.local_start() + Duration::minutes(offset_minutes)
    }

    /// Local wall-clock end of the stay.
    pub fn local_end(&self) -> NaiveDateTime {
        self.local_at(self.duration_minutes)
    }

    /// Minutes from the session start to a local wall-clock instant.
    pub fn offset_of(&self, local: NaiveDateTime) -> i64 {
        (local - self.local_start()).num_minutes()
    }
}
