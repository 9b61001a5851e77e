//! Conversions between civil date/time values and the millisecond counts stored on the wire.
//!
//! All temporal types share one representation: a signed 64-bit count of milliseconds since
//! [`EPOCH`]. Dates are truncated to whole days and times keep only the time of day.

use jiff::SignedDuration;
use jiff::civil::{self, Date, DateTime, Time};
use sbdf_error::{SbdfResult, sbdf_err};

use crate::ValueType;

/// The instant all temporal values are measured from, `0001-01-01T00:00:00`.
pub const EPOCH: DateTime = civil::date(1, 1, 1).at(0, 0, 0, 0);

/// Milliseconds in one day.
pub const MILLIS_PER_DAY: i64 = 86_400_000;

const MILLIS_PER_HOUR: i64 = 3_600_000;
const MILLIS_PER_MINUTE: i64 = 60_000;
const MILLIS_PER_SECOND: i64 = 1_000;
const NANOS_PER_MILLI: i64 = 1_000_000;

/// Milliseconds from [`EPOCH`] to `datetime`, dropping sub-millisecond precision.
#[allow(clippy::cast_possible_truncation)]
pub fn datetime_to_millis(datetime: DateTime) -> i64 {
    // civil datetimes span years -9999..=9999, well inside i64 milliseconds
    EPOCH.duration_until(datetime).as_millis() as i64
}

/// The datetime `millis` milliseconds after [`EPOCH`].
pub fn millis_to_datetime(millis: i64) -> SbdfResult<DateTime> {
    Ok(EPOCH.checked_add(SignedDuration::from_millis(millis))?)
}

/// Milliseconds from [`EPOCH`] to midnight of `date`.
pub fn date_to_millis(date: Date) -> i64 {
    datetime_to_millis(date.to_datetime(Time::midnight()))
}

/// The date containing the instant `millis` milliseconds after [`EPOCH`].
pub fn millis_to_date(millis: i64) -> SbdfResult<Date> {
    Ok(millis_to_datetime(truncate_to_date(millis))?.date())
}

/// Milliseconds since midnight.
pub fn time_to_millis(time: Time) -> i64 {
    i64::from(time.hour()) * MILLIS_PER_HOUR
        + i64::from(time.minute()) * MILLIS_PER_MINUTE
        + i64::from(time.second()) * MILLIS_PER_SECOND
        + i64::from(time.subsec_nanosecond()) / NANOS_PER_MILLI
}

/// The time of day of the instant `millis` milliseconds after [`EPOCH`].
pub fn millis_to_time(millis: i64) -> SbdfResult<Time> {
    let millis = truncate_to_time(millis);
    let part = |value: i64| {
        i8::try_from(value).map_err(|_| sbdf_err!("time component {} out of range", value))
    };
    let hour = part(millis / MILLIS_PER_HOUR)?;
    let minute = part(millis % MILLIS_PER_HOUR / MILLIS_PER_MINUTE)?;
    let second = part(millis % MILLIS_PER_MINUTE / MILLIS_PER_SECOND)?;
    let nanos = i32::try_from(millis % MILLIS_PER_SECOND * NANOS_PER_MILLI)
        .map_err(|_| sbdf_err!("time component out of range"))?;
    Ok(Time::new(hour, minute, second, nanos)?)
}

/// Milliseconds in `span`, dropping sub-millisecond precision.
#[allow(clippy::cast_possible_truncation)]
pub fn timespan_to_millis(span: SignedDuration) -> i64 {
    span.as_millis().clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
}

/// A duration of `millis` milliseconds.
pub fn millis_to_timespan(millis: i64) -> SignedDuration {
    SignedDuration::from_millis(millis)
}

/// Drop the time-of-day component of an epoch-relative millisecond count.
pub fn truncate_to_date(millis: i64) -> i64 {
    millis.div_euclid(MILLIS_PER_DAY) * MILLIS_PER_DAY
}

/// Drop the date component of an epoch-relative millisecond count.
pub fn truncate_to_time(millis: i64) -> i64 {
    millis.rem_euclid(MILLIS_PER_DAY)
}

/// Reinterpret milliseconds taken from a [`ValueType::DateTime`] source as `target`.
///
/// Date discards the time of day, Time discards the date, and every other type keeps the
/// count unchanged.
pub fn convert_datetime_millis(millis: i64, target: ValueType) -> i64 {
    match target {
        ValueType::Date => truncate_to_date(millis),
        ValueType::Time => truncate_to_time(millis),
        _ => millis,
    }
}
