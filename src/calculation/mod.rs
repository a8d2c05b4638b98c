//! Fee calculation for the Tariff Engine.
//!
//! Each stage of the pipeline lives in its own module: calendar resolution,
//! rule scope matching, breakpoint construction, segment grouping, raw
//! accrual, and cap optimization. [`compute_fee`] runs them in order.

mod accrual;
mod breakpoints;
mod calendar;
mod cap_optimizer;
mod engine;
mod scope_matcher;
mod segments;

pub use accrual::{Accrual, checked_segment_charge, segment_charge};
pub use breakpoints::build_breakpoints;
pub use calendar::{CalendarResolver, HolidayCalendar, get_day_type, minute_of_day};
pub use cap_optimizer::{CapPlan, CapWindow, PlanStep, cap_windows, optimize};
pub use engine::{NO_APPLICABLE_RATE, compute_fee};
pub use scope_matcher::{resolve_metering_rule, scope_matches};
pub use segments::{Segment, group_segments};
