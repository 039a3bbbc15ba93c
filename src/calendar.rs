//! Week boundaries, clocks and calendar-date encoding.
//!
//! Every weekly aggregate in the crate is keyed by the instant returned from
//! [`week_start`]: the most recent Monday at local 00:00:00.000. Sunday belongs
//! to the week of the preceding Monday.

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, NaiveTime, SubsecRound, TimeZone, Utc};

/// Source of "now" for week calculations.
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to a single instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Start of the week containing `instant`, in the local time zone.
pub fn week_start(instant: DateTime<Utc>) -> DateTime<Utc> {
    week_start_in(instant, &Local)
}

/// Start of the week before the one containing `instant`, in the local time zone.
pub fn previous_week_start(instant: DateTime<Utc>) -> DateTime<Utc> {
    shift_weeks_in(week_start_in(instant, &Local), -1, &Local)
}

/// Move a week start by `weeks` calendar weeks in the local time zone.
pub fn shift_weeks(week_start: DateTime<Utc>, weeks: i64) -> DateTime<Utc> {
    shift_weeks_in(week_start, weeks, &Local)
}

/// Start of the week containing `instant`, evaluated in `tz`.
pub fn week_start_in<Tz: TimeZone>(instant: DateTime<Utc>, tz: &Tz) -> DateTime<Utc> {
    let local = instant.with_timezone(tz);
    let days_from_monday = i64::from(local.weekday().num_days_from_monday());
    let monday = local.date_naive() - Duration::days(days_from_monday);
    start_of_day_in(monday, tz)
}

/// Move a week start by `weeks` calendar weeks, evaluated in `tz`.
///
/// Arithmetic happens on the local calendar date so that weeks spanning a
/// daylight-saving transition still land on Monday midnight.
pub fn shift_weeks_in<Tz: TimeZone>(week_start: DateTime<Utc>, weeks: i64, tz: &Tz) -> DateTime<Utc> {
    let monday = week_start.with_timezone(tz).date_naive() + Duration::weeks(weeks);
    start_of_day_in(monday, tz)
}

/// First instant of `date` in `tz`.
///
/// When midnight itself is skipped by a DST jump the first valid instant of
/// the day is used instead.
fn start_of_day_in<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&midnight)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(midnight + Duration::hours(1))).earliest())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
}

/// Milliseconds since the Unix epoch.
pub fn to_millis(instant: DateTime<Utc>) -> i64 {
    instant.timestamp_millis()
}

/// Drop sub-millisecond digits, matching what storage and the mirror keep.
pub fn truncate_to_millis(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant.trunc_subsecs(3)
}

/// Instant from milliseconds since the Unix epoch.
pub fn from_millis(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}

/// Encode a calendar date as `YYYY-MM-DD`.
pub fn encode_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Decode a `YYYY-MM-DD` calendar date.
pub fn decode_date(value: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
}
