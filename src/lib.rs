//! Cron expression parser with a timezone-aware search for upcoming events.
//!
//! A [`Schedule`] is parsed once from a 4- or 5-field cron expression
//! (including the `L`, `LW`, `W` and `#` extensions, month and weekday names,
//! and `@`-shortcuts) and can then answer two questions: does a given instant
//! match ([`Schedule::matches`]), and when does the schedule fire next in a
//! given IANA timezone ([`Schedule::upcoming`], [`Schedule::iter`]).
//!
//! Parsing and searching are pure computations over immutable values: no
//! background threads, no I/O, and schedules can be shared across threads
//! without synchronization.
//!
//! # Examples
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use cronex::{Result, Schedule, SearchOptions};
//!
//! fn main() -> Result<()> {
//!     let schedule = Schedule::parse("0 9 * * 1-5")?;
//!     let options = SearchOptions::new()
//!         .start_at(&Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
//!         .match_count(3);
//!
//!     let standups = schedule.upcoming(&options);
//!     assert_eq!(standups[0].to_rfc3339(), "2024-01-01T09:00:00+00:00");
//!     assert_eq!(standups[1].to_rfc3339(), "2024-01-02T09:00:00+00:00");
//!     assert!(schedule.matches(&standups[2]));
//!
//!     Ok(())
//! }
//! ```
#![deny(unsafe_code, missing_docs)]

/// Crate specific Errors implementation.
pub mod error;
mod field;
/// Cron expression parser and match predicate.
pub mod schedule;
/// Forward search for upcoming events of a schedule.
pub mod search;
mod utils;

/// Re-export of public entities.
pub use error::{CronError, ErrorKind};
pub use schedule::Schedule;
pub use search::{SearchOptions, Upcoming};

/// Convenient alias for `Result`.
pub type Result<T, E = CronError> = std::result::Result<T, E>;

#[cfg(test)]
use rstest_reuse;
