//! Calendar keys used to bucket rest events.
//!
//! Daily buckets are keyed `YYYY-MM-DD`, weekly buckets `YYYY-Www` with
//! ISO-8601 week numbering (weeks start on Monday, week 1 holds the
//! year's first Thursday).

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Utc};

use crate::error::{Error, Result};

const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

/// Calendar date of `at` as seen from `offset`.
pub fn local_date(at: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    at.with_timezone(&offset).date_naive()
}

pub fn date_key(date: NaiveDate) -> String {
    date.format(DATE_KEY_FORMAT).to_string()
}

pub fn parse_date_key(key: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(key, DATE_KEY_FORMAT)
        .map_err(|e| Error::invalid(format!("malformed date key {key:?}: {e}")))
}

/// ISO week identifier of `date`. The ISO year can differ from the
/// calendar year around New Year (2023-01-01 is `2022-W52`).
pub fn week_key(date: NaiveDate) -> String {
    let iso = date.iso_week();
    format!("{}-W{:02}", iso.year(), iso.week())
}

pub fn parse_week_key(key: &str) -> Result<(i32, u32)> {
    let malformed = || Error::invalid(format!("malformed week key {key:?}"));
    let (year, week) = key.split_once("-W").ok_or_else(malformed)?;
    let year: i32 = year.parse().map_err(|_| malformed())?;
    let week: u32 = week.parse().map_err(|_| malformed())?;
    if !(1..=53).contains(&week) {
        return Err(malformed());
    }
    Ok((year, week))
}

/// Monday of ISO week `week` in `year`.
///
/// Jan 1 plus `(week - 1) * 7` days lands inside the target week; it is
/// then rolled back to Monday when it falls on Sunday..Thursday
/// (Sunday = 0) and forward otherwise.
pub fn week_start(year: i32, week: u32) -> Option<NaiveDate> {
    let jan1 = NaiveDate::from_ymd_opt(year, 1, 1)?;
    let simple = jan1.checked_add_signed(Duration::days((i64::from(week) - 1) * 7))?;
    let weekday = i64::from(simple.weekday().num_days_from_sunday());
    let shift = if weekday <= 4 { 1 - weekday } else { 8 - weekday };
    simple.checked_add_signed(Duration::days(shift))
}

pub fn week_start_of_key(key: &str) -> Result<NaiveDate> {
    let (year, week) = parse_week_key(key)?;
    week_start(year, week).ok_or_else(|| Error::invalid(format!("week key out of range {key:?}")))
}
