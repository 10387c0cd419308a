/// Calendar lookups shared by the match predicate and the search engine.
///
/// All functions expect a valid date and panic otherwise; callers clamp and
/// range-check before resolving.
use crate::field::FieldValue;
use chrono::{Datelike, NaiveDate};

/// Returns `true` if provided year is leap.
#[inline]
pub(crate) fn is_leap_year(year: i32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

/// Returns number of days in the specified month.
pub(crate) fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => panic!("Invalid month: {month}"),
    }
}

/// Day of the week (Sunday = 0) of the specified date.
pub(crate) fn day_of_week(year: i32, month: u32, day: u32) -> FieldValue {
    NaiveDate::from_ymd_opt(year, month, day)
        .map(|date| date.weekday().num_days_from_sunday() as FieldValue)
        .unwrap_or_else(|| panic!("Invalid date: {year:04}-{month:02}-{day:02}"))
}

/// Day in the month of the last weekday (Mon-Fri).
pub(crate) fn last_weekday_of_month(year: i32, month: u32) -> u32 {
    let mut day = days_in_month(year, month);

    while !(1..=5).contains(&day_of_week(year, month, day)) {
        day -= 1;
    }

    day
}

/// Day in the month of the weekday (Mon-Fri) nearest to `day`, within the
/// same month. Saturday resolves backward and Sunday forward, flipping
/// direction at the month boundaries.
pub(crate) fn nearest_weekday(year: i32, month: u32, day: u32) -> u32 {
    let dow = day_of_week(year, month, day);
    let last_day = days_in_month(year, month);

    // middle of the week
    if (1..=5).contains(&dow) {
        day
    } else if dow == 0 {
        // sunday
        if day == last_day {
            day - 2
        } else {
            day + 1
        }
    } else {
        // saturday
        if day == 1 {
            day + 2
        } else {
            day - 1
        }
    }
}
