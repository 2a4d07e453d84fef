use std::fmt;

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, TimeZone, Utc};
use serde::Serialize;

/// An ISO-8601 week: Monday start, week 1 holds the year's first Thursday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct IsoWeek {
    pub year: i32,
    pub week: u32,
}

impl fmt::Display for IsoWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-W{:02}", self.year, self.week)
    }
}

/// The year is taken from the Thursday of the date's week, so early January
/// days can belong to the previous ISO year and late December days to the next.
pub fn iso_week(date: NaiveDate) -> IsoWeek {
    let weekday = i64::from(date.weekday().number_from_monday());
    let thursday = date + Duration::days(4 - weekday);

    IsoWeek {
        year: thursday.year(),
        week: thursday.ordinal0() / 7 + 1,
    }
}

pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// The calendar day of `instant` as seen in `zone`.
pub fn local_date<Tz: TimeZone>(instant: DateTime<Utc>, zone: &Tz) -> NaiveDate {
    instant.with_timezone(zone).date_naive()
}

/// Today on the machine's local clock. Dashboard and goal weeks follow this day.
pub fn today() -> NaiveDate {
    local_date(Utc::now(), &Local)
}
