use crate::error::ErrorKind;

/// Numeric type of all field values.
pub(crate) type FieldValue = u8;

const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];
const DAYS_OF_WEEK: [&str; 7] = ["sun", "mon", "tue", "wed", "thu", "fri", "sat"];

/// The five fields of an expression, in pattern order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum Field {
    Minute,
    Hour,
    DayOfMonth,
    Month,
    DayOfWeek,
}

impl Field {
    pub(crate) const fn name(self) -> &'static str {
        match self {
            Field::Minute => "minute",
            Field::Hour => "hour",
            Field::DayOfMonth => "day_of_month",
            Field::Month => "month",
            Field::DayOfWeek => "day_of_week",
        }
    }

    pub(crate) const fn min(self) -> FieldValue {
        match self {
            Field::Minute | Field::Hour | Field::DayOfWeek => 0,
            Field::DayOfMonth | Field::Month => 1,
        }
    }

    pub(crate) const fn max(self) -> FieldValue {
        match self {
            Field::Minute => 59,
            Field::Hour => 23,
            Field::DayOfMonth => 31,
            Field::Month => 12,
            Field::DayOfWeek => 6,
        }
    }

    /// Upper bound for range and step endpoints. Day of week admits `7` as a
    /// second spelling of Sunday, so `*`-headed and open-ended steps run
    /// through it.
    const fn endpoint_max(self) -> FieldValue {
        match self {
            Field::DayOfWeek => 7,
            _ => self.max(),
        }
    }

    const fn aliases(self) -> Option<&'static [&'static str]> {
        match self {
            Field::Month => Some(&MONTHS),
            Field::DayOfWeek => Some(&DAYS_OF_WEEK),
            _ => None,
        }
    }
}

/// One arithmetic progression `from, from + step, … ≤ to`.
///
/// A zero step is representable and accepts nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct Step {
    pub(crate) from: FieldValue,
    pub(crate) to: FieldValue,
    pub(crate) step: FieldValue,
}

/// Clauses accumulated from the comma-list of a single field token.
///
/// The field matches a value when any clause accepts it. Day extensions
/// (`last_*`, `nearest_weekdays`, `nth_dows`) need the containing month to
/// resolve and are evaluated by the schedule, not here.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct ClauseSet {
    /// Explicit values, sorted ascending, deduplicated.
    pub(crate) values: Vec<FieldValue>,
    /// Closed intervals in insertion order, deduplicated by `(from, to)`.
    pub(crate) ranges: Vec<(FieldValue, FieldValue)>,
    pub(crate) steps: Vec<Step>,
    /// `L`: last calendar day of the month (day of month only).
    pub(crate) last_day: bool,
    /// `LW`: last Mon-Fri of the month (day of month only).
    pub(crate) last_weekday: bool,
    /// `<n>W` targets (day of month only).
    pub(crate) nearest_weekdays: Vec<FieldValue>,
    /// `<d>#<k>` pairs, instance 1..=5 (day of week only).
    pub(crate) nth_dows: Vec<(FieldValue, FieldValue)>,
    /// `<d>L` weekdays (day of week only).
    pub(crate) last_dows: Vec<FieldValue>,
}

impl ClauseSet {
    pub(crate) fn accepts(&self, value: FieldValue) -> bool {
        self.values.binary_search(&value).is_ok()
            || self.ranges.iter().any(|&(from, to)| (from..=to).contains(&value))
            || self.steps.iter().any(|s| {
                s.step > 0 && value >= s.from && value <= s.to && (value - s.from) % s.step == 0
            })
    }

    pub(crate) fn has_day_extensions(&self) -> bool {
        self.last_day
            || self.last_weekday
            || !self.nearest_weekdays.is_empty()
            || !self.nth_dows.is_empty()
            || !self.last_dows.is_empty()
    }

    fn push_value(&mut self, value: FieldValue) {
        if let Err(position) = self.values.binary_search(&value) {
            self.values.insert(position, value);
        }
    }

    fn push_range(&mut self, from: FieldValue, to: FieldValue) {
        if !self.ranges.contains(&(from, to)) {
            self.ranges.push((from, to));
        }
    }
}

/// Normalized matcher of a single field.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum FieldMatcher {
    /// `*`: every value in range.
    Any,
    /// `?`: every value, and the field opts out of the day decision.
    Omit,
    /// Everything else: a union of clauses.
    Clauses(ClauseSet),
}

impl FieldMatcher {
    pub(crate) fn parse(field: Field, token: &str) -> Result<Self, ErrorKind> {
        if token == "*" {
            return Ok(FieldMatcher::Any);
        }
        if token == "?" {
            return if matches!(field, Field::DayOfMonth | Field::DayOfWeek) {
                Ok(FieldMatcher::Omit)
            } else {
                Err(ErrorKind::MisplacedExtension {
                    field: field.name(),
                    token: token.to_string(),
                })
            };
        }

        let token = token.to_lowercase();
        let mut set = ClauseSet::default();

        for part in token.split(',') {
            if part == "*" || part == "?" {
                // Whole-field terms cannot be list members.
                return Err(bad_token(field, part));
            }
            match field {
                Field::DayOfMonth if part == "l" => set.last_day = true,
                Field::DayOfMonth if part == "lw" => set.last_weekday = true,
                Field::DayOfMonth if part.len() > 1 && part.ends_with('w') => {
                    let day = parse_value(field, &part[..part.len() - 1])?;
                    set.nearest_weekdays.push(day);
                }
                Field::DayOfWeek if part.len() > 1 && part.ends_with('l') => {
                    let dow = parse_value(field, &part[..part.len() - 1])?;
                    set.last_dows.push(dow);
                }
                Field::DayOfWeek if part.contains('#') => {
                    let (dow, nth) = part.split_once('#').unwrap();
                    let dow = parse_value(field, dow)?;
                    let nth = nth
                        .parse::<FieldValue>()
                        .ok()
                        .filter(|nth| (1..=5).contains(nth))
                        .ok_or_else(|| bad_token(field, part))?;
                    set.nth_dows.push((dow, nth));
                }
                _ if part == "l" || part == "lw" || part.contains('#') => {
                    return Err(misplaced(field, part));
                }
                _ if part.len() > 1
                    && (part.ends_with('w') || part.ends_with('l'))
                    && part[..part.len() - 1].bytes().all(|byte| byte.is_ascii_digit()) =>
                {
                    return Err(misplaced(field, part));
                }
                _ if part.contains('/') => parse_step(field, part, &mut set)?,
                _ if part.contains('-') => {
                    let (from, to) = parse_range(field, part)?;
                    set.push_range(from, to);
                }
                _ => set.push_value(parse_value(field, part)?),
            }
        }

        Ok(FieldMatcher::Clauses(set))
    }

    #[inline]
    pub(crate) fn is_unrestricted(&self) -> bool {
        matches!(self, FieldMatcher::Any | FieldMatcher::Omit)
    }

    pub(crate) fn clauses(&self) -> Option<&ClauseSet> {
        match self {
            FieldMatcher::Clauses(set) => Some(set),
            _ => None,
        }
    }

    /// Membership by plain clauses (values, ranges, steps); day extensions
    /// are resolved by the schedule against a concrete month.
    pub(crate) fn accepts(&self, value: FieldValue) -> bool {
        match self {
            FieldMatcher::Any | FieldMatcher::Omit => true,
            FieldMatcher::Clauses(set) => set.accepts(value),
        }
    }

    /// Smallest accepted value in `min..=max`.
    pub(crate) fn first(&self, min: FieldValue, max: FieldValue) -> Option<FieldValue> {
        match self {
            FieldMatcher::Any | FieldMatcher::Omit => Some(min),
            FieldMatcher::Clauses(set) => (min..=max).find(|&value| set.accepts(value)),
        }
    }

    /// Smallest accepted value strictly greater than `value`, up to `max`.
    pub(crate) fn next_after(&self, value: FieldValue, max: FieldValue) -> Option<FieldValue> {
        match self {
            FieldMatcher::Any | FieldMatcher::Omit => value.checked_add(1).filter(|&next| next <= max),
            FieldMatcher::Clauses(set) => (value.saturating_add(1)..=max).find(|&next| set.accepts(next)),
        }
    }

    pub(crate) fn has_day_extensions(&self) -> bool {
        match self {
            FieldMatcher::Clauses(set) => set.has_day_extensions(),
            _ => false,
        }
    }
}

fn parse_step(field: Field, part: &str, set: &mut ClauseSet) -> Result<(), ErrorKind> {
    let (head, step) = part.split_once('/').unwrap();
    let step = step.parse::<FieldValue>().map_err(|_| bad_token(field, part))?;

    let (from, to) = if head == "*" {
        (field.min(), field.endpoint_max())
    } else if head.contains('-') {
        parse_range(field, head)?
    } else {
        (parse_endpoint(field, head)?, field.endpoint_max())
    };

    set.steps.push(Step { from, to, step });
    Ok(())
}

fn parse_range(field: Field, token: &str) -> Result<(FieldValue, FieldValue), ErrorKind> {
    let (from, to) = token.split_once('-').unwrap();
    let from = parse_endpoint(field, from)?;
    let to = parse_endpoint(field, to)?;
    if from > to {
        return Err(bad_token(field, token));
    }
    Ok((from, to))
}

/// Single value: aliases resolve first, then a range-checked integer.
/// Day-of-week `7` normalizes to Sunday.
fn parse_value(field: Field, token: &str) -> Result<FieldValue, ErrorKind> {
    let value = parse_endpoint(field, token)?;
    if field == Field::DayOfWeek && value == 7 {
        Ok(0)
    } else {
        Ok(value)
    }
}

/// Range/step endpoint: like [`parse_value`] but a day-of-week `7` is kept,
/// so ranges such as `5-7` stay ordered. The matcher treats Sunday as both.
fn parse_endpoint(field: Field, token: &str) -> Result<FieldValue, ErrorKind> {
    if let Some(aliases) = field.aliases() {
        if let Some(position) = aliases.iter().position(|&alias| alias == token) {
            return Ok(position as FieldValue + field.min());
        }
    }

    let value = token.parse::<u32>().map_err(|_| bad_token(field, token))?;
    if value < field.min() as u32 || value > field.endpoint_max() as u32 {
        return Err(ErrorKind::OutOfRange {
            field: field.name(),
            value,
        });
    }
    Ok(value as FieldValue)
}

fn bad_token(field: Field, token: &str) -> ErrorKind {
    ErrorKind::BadToken {
        field: field.name(),
        token: token.to_string(),
    }
}

fn misplaced(field: Field, token: &str) -> ErrorKind {
    ErrorKind::MisplacedExtension {
        field: field.name(),
        token: token.to_string(),
    }
}
