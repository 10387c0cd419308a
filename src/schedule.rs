use crate::{
    error::ErrorKind,
    field::{Field, FieldMatcher, FieldValue},
    utils, CronError, Result,
};
use chrono::{DateTime, Datelike, TimeZone, Timelike};
use std::{fmt::Display, str::FromStr};

/// Shortcut expressions and their five-field expansions.
const MACROS: [(&str, &str); 6] = [
    ("@yearly", "0 0 1 1 *"),
    ("@monthly", "0 0 1 * *"),
    ("@weekly", "0 0 ? * 0"),
    ("@daily", "0 0 * * *"),
    ("@hourly", "0 * * * *"),
    ("@minutely", "* * * * *"),
];

/// A parsed cron expression.
///
/// | Field        | Required | Allowed values  | Allowed special characters |
/// | ------------ | -------- | --------------- | -------------------------- |
/// | Minutes      | Yes      | 0-59            | * , - /                    |
/// | Hours        | Yes      | 0-23            | * , - /                    |
/// | Day of Month | Yes      | 1-31            | * , - / ? L LW W           |
/// | Month        | Yes      | 1-12 or JAN-DEC | * , - /                    |
/// | Day of Week  | No       | 0-7 or SUN-SAT  | * , - / ? L #              |
///
/// A missing day-of-week field is treated as `*`, and `@yearly`, `@monthly`,
/// `@weekly`, `@daily`, `@hourly` and `@minutely` expand per the table above.
/// Day of week `7` is Sunday, same as `0`.
///
/// A schedule is immutable once parsed and holds no references, so it can be
/// shared between threads freely.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Schedule {
    pattern: String,
    pub(crate) minute: FieldMatcher,
    pub(crate) hour: FieldMatcher,
    pub(crate) dom: FieldMatcher,
    pub(crate) month: FieldMatcher,
    pub(crate) dow: FieldMatcher,
}

impl Schedule {
    /// Parses a cron expression.
    ///
    /// Parsing is all-or-nothing: the first offending field turns the whole
    /// expression into a [`CronError`] which echoes the input.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use cronex::Schedule;
    ///
    /// assert!(Schedule::parse("0 9 * * MON-FRI").is_ok());
    /// assert!(Schedule::parse("@daily").is_ok());
    /// assert!(Schedule::parse("60 * * * *").is_err());
    /// ```
    pub fn parse(pattern: impl AsRef<str>) -> Result<Self> {
        let pattern = pattern.as_ref();
        let trimmed = pattern.trim();

        if trimmed.is_empty() {
            return Err(CronError::new(pattern, ErrorKind::EmptyExpression));
        }

        let expanded = if trimmed.starts_with('@') {
            let lowered = trimmed.to_lowercase();
            MACROS
                .iter()
                .find(|(name, _)| *name == lowered)
                .map(|(_, expansion)| *expansion)
                .ok_or_else(|| {
                    CronError::new(pattern, ErrorKind::UnknownMacro(trimmed.to_string()))
                })?
        } else {
            trimmed
        };

        let [minute, hour, dom, month, dow] =
            Self::parse_fields(expanded).map_err(|kind| CronError::new(pattern, kind))?;

        Ok(Self {
            pattern: pattern.to_string(),
            minute,
            hour,
            dom,
            month,
            dow,
        })
    }

    fn parse_fields(text: &str) -> std::result::Result<[FieldMatcher; 5], ErrorKind> {
        let parts: Vec<&str> = text.split_whitespace().collect();
        if !(4..=5).contains(&parts.len()) {
            return Err(ErrorKind::WrongFieldCount(parts.len()));
        }

        Ok([
            FieldMatcher::parse(Field::Minute, parts[0])?,
            FieldMatcher::parse(Field::Hour, parts[1])?,
            FieldMatcher::parse(Field::DayOfMonth, parts[2])?,
            FieldMatcher::parse(Field::Month, parts[3])?,
            match parts.get(4) {
                Some(dow) => FieldMatcher::parse(Field::DayOfWeek, dow)?,
                None => FieldMatcher::Any,
            },
        ])
    }

    /// The expression text as it was passed to [`Schedule::parse`].
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Returns `true` when `instant`, read in its own timezone, is selected
    /// by this schedule.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use chrono::{TimeZone, Utc};
    /// use cronex::Schedule;
    ///
    /// let last_day = Schedule::parse("0 0 L * *")?;
    /// assert!(last_day.matches(&Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap()));
    /// assert!(!last_day.matches(&Utc.with_ymd_and_hms(2024, 1, 30, 0, 0, 0).unwrap()));
    /// # Ok::<(), cronex::CronError>(())
    /// ```
    pub fn matches<Tz: TimeZone>(&self, instant: &DateTime<Tz>) -> bool {
        self.minute.accepts(instant.minute() as FieldValue)
            && self.hour.accepts(instant.hour() as FieldValue)
            && self.month.accepts(instant.month() as FieldValue)
            && self.day_matches(
                instant.year(),
                instant.month(),
                instant.day(),
                instant.weekday().num_days_from_sunday() as FieldValue,
            )
    }

    /// Vixie day rule: `?` and a bare `*` exclude their field from the day
    /// decision; when both day fields are constrained, either may match.
    pub(crate) fn day_matches(&self, year: i32, month: u32, day: u32, dow: FieldValue) -> bool {
        match (self.dom.is_unrestricted(), self.dow.is_unrestricted()) {
            (true, true) => true,
            (false, true) => self.dom_matches(year, month, day),
            (true, false) => self.dow_matches(year, month, day, dow),
            (false, false) => {
                self.dom_matches(year, month, day) || self.dow_matches(year, month, day, dow)
            }
        }
    }

    fn dom_matches(&self, year: i32, month: u32, day: u32) -> bool {
        let Some(set) = self.dom.clauses() else {
            return true;
        };

        if set.accepts(day as FieldValue) {
            return true;
        }

        let last_day = utils::days_in_month(year, month);
        if set.last_day && day == last_day {
            return true;
        }
        if set.last_weekday && day == utils::last_weekday_of_month(year, month) {
            return true;
        }
        set.nearest_weekdays
            .iter()
            .any(|&target| utils::nearest_weekday(year, month, (target as u32).min(last_day)) == day)
    }

    fn dow_matches(&self, year: i32, month: u32, day: u32, dow: FieldValue) -> bool {
        let Some(set) = self.dow.clauses() else {
            return true;
        };

        // both 0 and 7 select Sunday
        if set.accepts(dow) || (dow == 0 && set.accepts(7)) {
            return true;
        }

        // `(day - 1) / 7 + 1` is the instance of this date among the days
        // sharing its weekday within the month
        if set
            .nth_dows
            .iter()
            .any(|&(target, nth)| target == dow && (day - 1) / 7 + 1 == nth as u32)
        {
            return true;
        }

        set.last_dows
            .iter()
            .any(|&target| target == dow && day + 7 > utils::days_in_month(year, month))
    }
}

impl Display for Schedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.pattern)
    }
}

impl FromStr for Schedule {
    type Err = CronError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for Schedule {
    type Error = CronError;

    fn try_from(value: &str) -> Result<Self> {
        Self::parse(value)
    }
}

impl TryFrom<String> for Schedule {
    type Error = CronError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rstest::rstest;

    fn instant(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, hour, minute, 0).unwrap()
    }

    #[rstest]
    #[case("@yearly", "0 0 1 1 *")]
    #[case("@monthly", "0 0 1 * *")]
    #[case("@weekly", "0 0 ? * 0")]
    #[case("@daily", "0 0 * * *")]
    #[case("@hourly", "0 * * * *")]
    #[case("@minutely", "* * * * *")]
    #[case("@Daily", "0 0 * * *")]
    #[case("  @HOURLY  ", "0 * * * *")]
    fn macros_expand(#[case] shortcut: &str, #[case] expansion: &str) {
        let parsed = Schedule::parse(shortcut).unwrap();
        let expanded = Schedule::parse(expansion).unwrap();
        assert_eq!(
            (parsed.minute, parsed.hour, parsed.dom, parsed.month, parsed.dow),
            (
                expanded.minute,
                expanded.hour,
                expanded.dom,
                expanded.month,
                expanded.dow
            )
        );
    }

    #[test]
    fn unknown_macro_is_rejected() {
        let error = Schedule::parse("@fortnightly").unwrap_err();
        assert_eq!(
            error.kind(),
            &ErrorKind::UnknownMacro("@fortnightly".to_string())
        );
    }

    #[test]
    fn empty_expression_is_rejected() {
        for input in ["", "   ", "\t\n"] {
            let error = Schedule::parse(input).unwrap_err();
            assert_eq!(error.kind(), &ErrorKind::EmptyExpression, "input = {input:?}");
        }
    }

    #[rstest]
    #[case("*", 1)]
    #[case("* * *", 3)]
    #[case("* * * * * *", 6)]
    fn wrong_field_count_is_rejected(#[case] input: &str, #[case] count: usize) {
        let error = Schedule::parse(input).unwrap_err();
        assert_eq!(error.kind(), &ErrorKind::WrongFieldCount(count));
    }

    #[test]
    fn four_fields_default_day_of_week_to_any() {
        let four = Schedule::parse("0 9 15 *").unwrap();
        assert_eq!(four.dow, FieldMatcher::Any);

        let five = Schedule::parse("0 9 15 * *").unwrap();
        assert_eq!(
            (four.minute, four.hour, four.dom, four.month, four.dow),
            (five.minute, five.hour, five.dom, five.month, five.dow)
        );
    }

    #[test]
    fn display_echoes_the_input() {
        assert_eq!(Schedule::parse("0 9 * * 1-5").unwrap().to_string(), "0 9 * * 1-5");
        assert_eq!(Schedule::parse("@daily").unwrap().to_string(), "@daily");
        assert_eq!(Schedule::parse("0 0 LW * *").unwrap().pattern(), "0 0 LW * *");
    }

    #[test]
    fn conversions_agree_with_parse() {
        let expected = Schedule::parse("*/5 12 * * *").unwrap();
        assert_eq!("*/5 12 * * *".parse::<Schedule>().unwrap(), expected);
        assert_eq!(Schedule::try_from("*/5 12 * * *").unwrap(), expected);
        assert_eq!(Schedule::try_from(String::from("*/5 12 * * *")).unwrap(), expected);
        assert!("*/5 12 * *".parse::<Schedule>().is_ok());
        assert!("not a cron".parse::<Schedule>().is_err());
    }

    #[rstest]
    // minute, hour and month must all match
    #[case("30 9 * * *", 2024, 1, 1, 9, 30, true)]
    #[case("30 9 * * *", 2024, 1, 1, 9, 31, false)]
    #[case("30 9 * * *", 2024, 1, 1, 10, 30, false)]
    #[case("30 9 15 2 *", 2024, 2, 15, 9, 30, true)]
    #[case("30 9 15 2 *", 2024, 3, 15, 9, 30, false)]
    // day of week names and numbers, 7 = Sunday = 0 (2024-01-07 is a Sunday)
    #[case("0 0 * * SUN", 2024, 1, 7, 0, 0, true)]
    #[case("0 0 * * 0", 2024, 1, 7, 0, 0, true)]
    #[case("0 0 * * 7", 2024, 1, 7, 0, 0, true)]
    #[case("0 0 * * 5-7", 2024, 1, 7, 0, 0, true)]
    #[case("0 0 * * 5-7", 2024, 1, 6, 0, 0, true)]
    #[case("0 0 * * 5-7", 2024, 1, 4, 0, 0, false)]
    // last day of month
    #[case("0 0 L * *", 2024, 2, 29, 0, 0, true)]
    #[case("0 0 L * *", 2024, 2, 28, 0, 0, false)]
    // last weekday of month (2024-03-31 is a Sunday)
    #[case("0 0 LW * *", 2024, 3, 29, 0, 0, true)]
    #[case("0 0 LW * *", 2024, 3, 31, 0, 0, false)]
    // nearest weekday (2024-06-01 is a Saturday)
    #[case("0 0 1W 6 *", 2024, 6, 3, 0, 0, true)]
    #[case("0 0 1W 6 *", 2024, 6, 1, 0, 0, false)]
    // nth weekday (2024-01-19 is the third Friday)
    #[case("0 0 ? * 5#3", 2024, 1, 19, 0, 0, true)]
    #[case("0 0 ? * 5#3", 2024, 1, 12, 0, 0, false)]
    #[case("0 0 ? * 5#3", 2024, 1, 18, 0, 0, false)]
    // last weekday instance (2024-01-26 is the last Friday)
    #[case("0 0 ? * 5L", 2024, 1, 26, 0, 0, true)]
    #[case("0 0 ? * 5L", 2024, 1, 19, 0, 0, false)]
    fn matches_single_instants(
        #[case] pattern: &str,
        #[case] year: i32,
        #[case] month: u32,
        #[case] day: u32,
        #[case] hour: u32,
        #[case] minute: u32,
        #[case] expected: bool,
    ) {
        let schedule = Schedule::parse(pattern).unwrap();
        assert_eq!(
            schedule.matches(&instant(year, month, day, hour, minute)),
            expected,
            "pattern = {pattern}, instant = {year:04}-{month:02}-{day:02} {hour:02}:{minute:02}"
        );
    }

    // 2024-01-15 is a Monday, 2024-01-19 is a Friday.
    #[rstest]
    // both day fields constrained: either side may match
    #[case("0 9 15 * 5", 2024, 1, 15, true)]
    #[case("0 9 15 * 5", 2024, 1, 19, true)]
    #[case("0 9 15 * 5", 2024, 1, 16, false)]
    // day of month constrained, day of week a bare `*`: day of month decides
    #[case("0 9 15 * *", 2024, 1, 15, true)]
    #[case("0 9 15 * *", 2024, 1, 19, false)]
    // day of month omitted with `?`: day of week alone decides
    #[case("0 9 ? * 5", 2024, 1, 19, true)]
    #[case("0 9 ? * 5", 2024, 1, 15, false)]
    // both unconstrained: every day
    #[case("0 9 * * ?", 2024, 1, 16, true)]
    #[case("0 9 ? * *", 2024, 1, 16, true)]
    fn day_disjunction_rule(
        #[case] pattern: &str,
        #[case] year: i32,
        #[case] month: u32,
        #[case] day: u32,
        #[case] expected: bool,
    ) {
        let schedule = Schedule::parse(pattern).unwrap();
        assert_eq!(
            schedule.matches(&instant(year, month, day, 9, 0)),
            expected,
            "pattern = {pattern}, day = {day}"
        );
    }

    #[test]
    fn matches_reads_fields_in_the_instants_own_timezone() {
        use chrono_tz::Europe::Kyiv;

        let schedule = Schedule::parse("0 9 * * *").unwrap();
        let in_kyiv = Kyiv.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();

        assert!(schedule.matches(&in_kyiv));
        // same instant, but 06:00 in UTC
        assert!(!schedule.matches(&in_kyiv.with_timezone(&Utc)));
    }
}
