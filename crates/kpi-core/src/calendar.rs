//! Calendar arithmetic on frequency buckets
//!
//! A bucket is the half-open interval `[round_down(t), next_date(round_down(t), 1))`.
//! All functions are pure and operate on naive (zone-less) timestamps.

use crate::enums::FrequencyType;
use crate::error::{Error, Result};
use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime, Timelike};

/// Add `count` units of `frequency` to `current`
///
/// Month-based frequencies clamp to the last day of the target month
/// (31 January + 1 month = 28/29 February). Returns `None` if the result
/// leaves the representable range.
pub fn next_date(
    current: NaiveDateTime,
    frequency: FrequencyType,
    count: i32,
) -> Option<NaiveDateTime> {
    let count64 = i64::from(count);
    match frequency {
        FrequencyType::Year => add_months(current, count.checked_mul(12)?),
        FrequencyType::Semester => add_months(current, count.checked_mul(6)?),
        FrequencyType::Month => add_months(current, count),
        FrequencyType::Week => current.checked_add_signed(Duration::days(count64 * 7)),
        FrequencyType::Day => current.checked_add_signed(Duration::days(count64)),
        FrequencyType::Hour => current.checked_add_signed(Duration::hours(count64)),
        FrequencyType::Minute => current.checked_add_signed(Duration::minutes(count64)),
        FrequencyType::Seconds => current.checked_add_signed(Duration::seconds(count64)),
    }
}

fn add_months(current: NaiveDateTime, months: i32) -> Option<NaiveDateTime> {
    let delta = Months::new(months.unsigned_abs());
    if months >= 0 {
        current.checked_add_months(delta)
    } else {
        current.checked_sub_months(delta)
    }
}

/// Iterator over bucket boundaries, see [`date_range`]
#[derive(Debug, Clone)]
pub struct DateRange {
    start: NaiveDateTime,
    end: NaiveDateTime,
    frequency: FrequencyType,
    index: Option<i32>,
}

impl Iterator for DateRange {
    type Item = NaiveDateTime;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.index?;
        // Offsets are computed from `start` so month clamping never accumulates.
        let current = next_date(self.start, self.frequency, index).filter(|d| *d <= self.end);
        self.index = match current {
            Some(_) => index.checked_add(1),
            None => None,
        };
        current
    }
}

/// Dates from `start` to `end` (inclusive) in steps of one `frequency` unit
///
/// Empty when `start > end`.
pub fn date_range(start: NaiveDateTime, end: NaiveDateTime, frequency: FrequencyType) -> DateRange {
    DateRange {
        start,
        end,
        frequency,
        index: Some(0),
    }
}

/// Truncate `current` to the start of its bucket
///
/// Sub-second precision is always dropped. Weeks start on Monday,
/// semesters on 1 January or 1 July.
pub fn round_down(current: NaiveDateTime, frequency: FrequencyType) -> Result<NaiveDateTime> {
    let date = current.date();
    let time = current.time();

    let rounded = match frequency {
        FrequencyType::Year => midnight(NaiveDate::from_ymd_opt(date.year(), 1, 1)),
        FrequencyType::Semester => {
            let month = if date.month() <= 6 { 1 } else { 7 };
            midnight(NaiveDate::from_ymd_opt(date.year(), month, 1))
        }
        FrequencyType::Month => midnight(date.with_day(1)),
        FrequencyType::Week => {
            let offset = i64::from(date.weekday().num_days_from_monday());
            midnight(date.checked_sub_signed(Duration::days(offset)))
        }
        FrequencyType::Day => midnight(Some(date)),
        FrequencyType::Hour => date.and_hms_opt(time.hour(), 0, 0),
        FrequencyType::Minute => date.and_hms_opt(time.hour(), time.minute(), 0),
        FrequencyType::Seconds => date.and_hms_opt(time.hour(), time.minute(), time.second()),
    };

    rounded.ok_or(Error::DateOutOfRange)
}

fn midnight(date: Option<NaiveDate>) -> Option<NaiveDateTime> {
    date.and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Last whole second inside the bucket containing `current`
///
/// Buckets are closed intervals `[round_down(t), round_up(t)]`. A
/// [`FrequencyType::Seconds`] bucket is one second wide, so its start and end
/// coincide: `round_up(t, Seconds) == round_down(t, Seconds)`.
pub fn round_up(current: NaiveDateTime, frequency: FrequencyType) -> Result<NaiveDateTime> {
    let start = round_down(current, frequency)?;
    next_date(start, frequency, 1)
        .and_then(|next| next.checked_sub_signed(Duration::seconds(1)))
        .ok_or(Error::DateOutOfRange)
}
