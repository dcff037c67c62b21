#![deny(unsafe_code)]
#![deny(warnings)]
//! Conversions between Unix time and the RTC's `DateTime`
//!
//! The date arithmetic lives in `m2m_core::calendar`; this module only maps
//! its broken-down time onto the embassy-stm32 RTC representation.

use embassy_stm32::rtc::{DateTime, DayOfWeek};
use m2m_core::calendar::CivilTime;

fn day_of_week(weekday: u8) -> DayOfWeek {
    match weekday {
        0 => DayOfWeek::Monday,
        1 => DayOfWeek::Tuesday,
        2 => DayOfWeek::Wednesday,
        3 => DayOfWeek::Thursday,
        4 => DayOfWeek::Friday,
        5 => DayOfWeek::Saturday,
        _ => DayOfWeek::Sunday,
    }
}

/// RTC date/time for `unix_secs`, `None` outside the RTC's year range.
pub fn unix_to_datetime(unix_secs: u64) -> Option<DateTime> {
    let civil = CivilTime::from_unix(i64::try_from(unix_secs).ok()?);
    let year = u16::try_from(civil.year).ok()?;
    DateTime::from(
        year,
        civil.month,
        civil.day,
        day_of_week(civil.weekday),
        civil.hour,
        civil.minute,
        civil.second,
        0,
    )
    .ok()
}

/// Unix seconds of an RTC date/time. Dates before 1970 read as 0.
pub fn datetime_to_unix(dt: &DateTime) -> u64 {
    let civil = CivilTime {
        year: i32::from(dt.year()),
        month: dt.month(),
        day: dt.day(),
        hour: dt.hour(),
        minute: dt.minute(),
        second: dt.second(),
        weekday: 0,
    };
    u64::try_from(civil.to_unix()).unwrap_or(0)
}
