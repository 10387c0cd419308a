use crate::{
    field::{Field, FieldValue},
    schedule::Schedule,
    utils,
};
use chrono::{DateTime, Datelike, LocalResult, NaiveDate, TimeDelta, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use std::fmt::{self, Debug};

/// Upper bound of a single day-by-day scan inside an advance step. Sparse
/// expressions (`0 0 29 2 *`) need several years of headroom per step; the
/// outer loop budget caps the total work.
const MAX_DAY_SCAN: usize = 4 * 366;

/// How far a nonexistent local time is probed forward, in minutes. No zone
/// in the IANA database skips more than a day.
const MAX_GAP_PROBE: usize = 25 * 60;

type Validator = Box<dyn Fn(&DateTime<Tz>) -> bool>;

/// Options of a forward search for upcoming events.
///
/// # Examples
///
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use chrono_tz::Tz;
/// use cronex::SearchOptions;
///
/// let options = SearchOptions::new()
///     .timezone("America/New_York".parse::<Tz>().unwrap())
///     .start_at(&Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
///     .match_count(10);
/// ```
pub struct SearchOptions {
    timezone: Tz,
    start_at: Option<DateTime<Utc>>,
    match_count: usize,
    max_loop_count: usize,
    match_validator: Option<Validator>,
}

impl SearchOptions {
    /// Options with all defaults: UTC, starting now, at most 2 matches,
    /// at most 1000 search steps, no validator.
    pub fn new() -> Self {
        Self::default()
    }

    /// IANA timezone the events are computed and returned in.
    pub fn timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    /// Inclusive lower bound of the search, truncated to the whole minute.
    /// Defaults to the current wall-clock instant.
    pub fn start_at<T: TimeZone>(mut self, start_at: &DateTime<T>) -> Self {
        self.start_at = Some(start_at.with_timezone(&Utc));
        self
    }

    /// Maximum number of instants [`Schedule::upcoming`] emits.
    pub fn match_count(mut self, match_count: usize) -> Self {
        self.match_count = match_count;
        self
    }

    /// Upper bound on search steps, protecting against pathological
    /// expressions. An exhausted budget ends the search with the instants
    /// found so far.
    pub fn max_loop_count(mut self, max_loop_count: usize) -> Self {
        self.max_loop_count = max_loop_count;
        self
    }

    /// Extra filter over matching instants. Rejected instants are not
    /// emitted and do not count against [`SearchOptions::match_count`].
    pub fn match_validator(mut self, validator: impl Fn(&DateTime<Tz>) -> bool + 'static) -> Self {
        self.match_validator = Some(Box::new(validator));
        self
    }
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            timezone: Tz::UTC,
            start_at: None,
            match_count: 2,
            max_loop_count: 1000,
            match_validator: None,
        }
    }
}

impl Debug for SearchOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchOptions")
            .field("timezone", &self.timezone)
            .field("start_at", &self.start_at)
            .field("match_count", &self.match_count)
            .field("max_loop_count", &self.max_loop_count)
            .field("match_validator", &self.match_validator.is_some())
            .finish()
    }
}

impl Schedule {
    /// Returns the upcoming events of this schedule, at most
    /// [`SearchOptions::match_count`] of them, in ascending order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use chrono::{TimeZone, Utc};
    /// use cronex::{Schedule, SearchOptions};
    ///
    /// let schedule = Schedule::parse("0 0 L * *")?;
    /// let options = SearchOptions::new()
    ///     .start_at(&Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
    ///     .match_count(2);
    ///
    /// let month_ends = schedule.upcoming(&options);
    /// assert_eq!(month_ends[0].to_rfc3339(), "2024-01-31T00:00:00+00:00");
    /// assert_eq!(month_ends[1].to_rfc3339(), "2024-02-29T00:00:00+00:00");
    /// # Ok::<(), cronex::CronError>(())
    /// ```
    pub fn upcoming(&self, options: &SearchOptions) -> Vec<DateTime<Tz>> {
        self.iter(options).take(options.match_count).collect()
    }

    /// Lazy variant of [`Schedule::upcoming`]: an iterator over upcoming
    /// events, not limited by [`SearchOptions::match_count`] but still
    /// bounded by [`SearchOptions::max_loop_count`] search steps in total.
    pub fn iter<'a>(&'a self, options: &'a SearchOptions) -> Upcoming<'a> {
        let cursor = options
            .start_at
            .unwrap_or_else(Utc::now)
            .with_timezone(&options.timezone)
            .with_second(0)
            .and_then(|start| start.with_nanosecond(0));

        Upcoming {
            schedule: self,
            options,
            cursor,
            budget: options.max_loop_count,
        }
    }

    /// Earliest instant strictly after `cursor` that could match: no instant
    /// between the two satisfies [`Schedule::matches`], and the result may
    /// itself be a non-matching probe point which the caller re-checks.
    fn advance<T: TimeZone>(&self, cursor: &DateTime<T>) -> Option<DateTime<T>> {
        if self.minute.is_unrestricted()
            && self.hour.is_unrestricted()
            && self.dom.is_unrestricted()
            && self.month.is_unrestricted()
            && self.dow.is_unrestricted()
        {
            return cursor.clone().checked_add_signed(TimeDelta::minutes(1));
        }

        let (year, month, day) = (cursor.year(), cursor.month(), cursor.day());
        let dow = cursor.weekday().num_days_from_sunday() as FieldValue;

        if self.month.accepts(month as FieldValue) && self.day_matches(year, month, day, dow) {
            let date = cursor.date_naive();
            let hour = cursor.hour() as FieldValue;

            if self.hour.accepts(hour) {
                if let Some(minute) =
                    self.minute.next_after(cursor.minute() as FieldValue, Field::Minute.max())
                {
                    return at_local(&cursor.timezone(), date, hour as u32, minute as u32);
                }
            }
            if let Some(next_hour) = self.hour.next_after(hour, Field::Hour.max()) {
                let minute = self.minute.first(Field::Minute.min(), Field::Minute.max())?;
                return at_local(&cursor.timezone(), date, next_hour as u32, minute as u32);
            }
        }

        self.next_day(cursor)
    }

    /// Day-by-day part of [`Schedule::advance`]: the first day after
    /// `cursor`'s satisfying the month and day constraints, at the first
    /// accepted hour and minute.
    fn next_day<T: TimeZone>(&self, cursor: &DateTime<T>) -> Option<DateTime<T>> {
        let timezone = cursor.timezone();
        let first_hour = self.hour.first(Field::Hour.min(), Field::Hour.max())? as u32;
        let first_minute = self.minute.first(Field::Minute.min(), Field::Minute.max())? as u32;

        // With an unconstrained day of week and no day extensions, days below
        // the smallest accepted day of month can be skipped wholesale.
        let plain_dom_min = if self.dow.is_unrestricted() && !self.dom.has_day_extensions() {
            self.dom
                .first(Field::DayOfMonth.min(), Field::DayOfMonth.max())
                .map(|day| day as u32)
        } else {
            None
        };

        let mut date = cursor.date_naive().succ_opt()?;
        for _ in 0..MAX_DAY_SCAN {
            let (year, month) = (date.year(), date.month());

            if !self.month.accepts(month as FieldValue) {
                let (next_year, next_month) = self.next_month(year, month)?;
                date = NaiveDate::from_ymd_opt(next_year, next_month, 1)?;
                continue;
            }

            if let Some(min_day) = plain_dom_min {
                if min_day > utils::days_in_month(year, month) {
                    // no day of this month can satisfy day of month
                    date = next_month_start(year, month)?;
                    continue;
                }
                if date.day() < min_day {
                    date = NaiveDate::from_ymd_opt(year, month, min_day)?;
                }
            }

            let dow = date.weekday().num_days_from_sunday() as FieldValue;
            if self.day_matches(year, month, date.day(), dow) {
                return at_local(&timezone, date, first_hour, first_minute);
            }

            date = date.succ_opt()?;
        }

        // Scan bound reached on a very sparse expression: hand back a probe
        // point and let the caller keep searching under its own loop budget.
        at_local(&timezone, date, first_hour, first_minute)
    }

    fn next_month(&self, year: i32, month: u32) -> Option<(i32, u32)> {
        if let Some(next) = self.month.next_after(month as FieldValue, Field::Month.max()) {
            return Some((year, next as u32));
        }
        let first = self.month.first(Field::Month.min(), Field::Month.max())?;
        Some((year.checked_add(1)?, first as u32))
    }
}

fn next_month_start(year: i32, month: u32) -> Option<NaiveDate> {
    if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
}

/// Local wall-clock constructor. An ambiguous local time resolves to its
/// earliest instant; a time inside a DST gap resolves to the first local
/// minute after the gap.
fn at_local<T: TimeZone>(timezone: &T, date: NaiveDate, hour: u32, minute: u32) -> Option<DateTime<T>> {
    let mut naive = date.and_hms_opt(hour, minute, 0)?;

    for _ in 0..MAX_GAP_PROBE {
        match timezone.from_local_datetime(&naive) {
            LocalResult::Single(instant) => return Some(instant),
            LocalResult::Ambiguous(earliest, _) => return Some(earliest),
            LocalResult::None => naive = naive.checked_add_signed(TimeDelta::minutes(1))?,
        }
    }

    None
}

/// Iterator over the upcoming events of a schedule, returned by
/// [`Schedule::iter`].
///
/// Yields matching instants in ascending order until the loop budget of its
/// [`SearchOptions`] is exhausted or the schedule proves unsatisfiable.
pub struct Upcoming<'a> {
    schedule: &'a Schedule,
    options: &'a SearchOptions,
    cursor: Option<DateTime<Tz>>,
    budget: usize,
}

impl Iterator for Upcoming<'_> {
    type Item = DateTime<Tz>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.budget == 0 {
                return None;
            }
            self.budget -= 1;

            let cursor = self.cursor.take()?;
            let hit = self.schedule.matches(&cursor)
                && self
                    .options
                    .match_validator
                    .as_ref()
                    .map_or(true, |accept| accept(&cursor));

            self.cursor = match self.schedule.advance(&cursor) {
                // The cursor must move strictly forward; around a backward
                // clock fold the earliest local mapping may not, so degrade
                // to plain minute stepping there.
                Some(next) if next > cursor => Some(next),
                Some(_) => cursor.checked_add_signed(TimeDelta::minutes(1)),
                None => None,
            };

            if hit {
                return Some(cursor);
            }
        }
    }
}
