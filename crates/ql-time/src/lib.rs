//! # ql-time
//!
//! `Date` arithmetic and day-count conventions — the calendar primitives
//! shared by the bond, curve, and lattice crates.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// ── Modules ───────────────────────────────────────────────────────────────────

/// `Date` type.
pub mod date;

/// `DayCounter` trait and built-in day-count conventions.
pub mod day_counter;

/// `TimeUnit` — days, weeks, months, years.
pub mod time_unit;

/// `Weekday` — day of the week.
pub mod weekday;

// ── Convenience re-exports ────────────────────────────────────────────────────

pub use date::Date;
pub use day_counter::{Actual360, Actual36525, Actual365Fixed, DayCounter, Thirty360};
pub use time_unit::TimeUnit;
pub use weekday::Weekday;
