//! Civil date/time from Unix seconds
//!
//! Uses Howard Hinnant's `civil_from_days` / `days_from_civil`, which are
//! O(1) and exact over the proleptic Gregorian calendar.
//! Reference: http://howardhinnant.github.io/date_algorithms.html

const SECONDS_PER_DAY: i64 = 86_400;

/// Days from 0000-03-01 to 1970-01-01
const EPOCH_SHIFT_DAYS: i64 = 719_468;

const DAYS_PER_ERA: i64 = 146_097;

/// Broken-down calendar time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CivilTime {
    pub year: i32,
    /// 1..=12
    pub month: u8,
    /// 1..=31
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    /// 0 = Monday .. 6 = Sunday
    pub weekday: u8,
}

impl CivilTime {
    /// Calendar time of `secs` seconds after 1970-01-01T00:00:00.
    pub fn from_unix(secs: i64) -> Self {
        let days = secs.div_euclid(SECONDS_PER_DAY);
        let secs_of_day = secs.rem_euclid(SECONDS_PER_DAY);
        let (year, month, day) = civil_from_days(days);
        Self {
            year,
            month,
            day,
            hour: (secs_of_day / 3600) as u8,
            minute: (secs_of_day % 3600 / 60) as u8,
            second: (secs_of_day % 60) as u8,
            // 1970-01-01 was a Thursday
            weekday: (days + 3).rem_euclid(7) as u8,
        }
    }

    /// Seconds since 1970-01-01T00:00:00 of this calendar time.
    pub fn to_unix(&self) -> i64 {
        days_from_civil(self.year, self.month, self.day) * SECONDS_PER_DAY
            + i64::from(self.hour) * 3600
            + i64::from(self.minute) * 60
            + i64::from(self.second)
    }
}

impl core::fmt::Display for CivilTime {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

fn civil_from_days(days: i64) -> (i32, u8, u8) {
    let z = days + EPOCH_SHIFT_DAYS;
    let era = z.div_euclid(DAYS_PER_ERA);
    let doe = z.rem_euclid(DAYS_PER_ERA);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    // March-based month
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u8;
    let month = if mp < 10 { mp + 3 } else { mp - 9 } as u8;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year as i32, month, day)
}

fn days_from_civil(year: i32, month: u8, day: u8) -> i64 {
    let month = i64::from(month);
    let year = i64::from(year) - i64::from(month <= 2);
    let era = year.div_euclid(400);
    let yoe = year.rem_euclid(400);
    let mp = if month > 2 { month - 3 } else { month + 9 };
    let doy = (153 * mp + 2) / 5 + i64::from(day) - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * DAYS_PER_ERA + doe - EPOCH_SHIFT_DAYS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unix_epoch() {
        let t = CivilTime::from_unix(0);
        assert_eq!((t.year, t.month, t.day), (1970, 1, 1));
        assert_eq!((t.hour, t.minute, t.second), (0, 0, 0));
        // Thursday
        assert_eq!(t.weekday, 3);
    }

    #[test]
    fn test_validity_threshold_instant() {
        let t = CivilTime::from_unix(1_700_000_000);
        assert_eq!(std::format!("{}", t), "2023-11-14 22:13:20");
        assert_eq!(t.weekday, 1);
    }

    #[test]
    fn test_leap_day() {
        // 2024-02-29 12:00:00
        let t = CivilTime::from_unix(1_709_208_000);
        assert_eq!((t.year, t.month, t.day, t.hour), (2024, 2, 29, 12));
        let next = CivilTime::from_unix(1_709_208_000 + 12 * 3600);
        assert_eq!((next.month, next.day), (3, 1));
    }

    #[test]
    fn test_before_epoch() {
        let t = CivilTime::from_unix(-1);
        assert_eq!(std::format!("{}", t), "1969-12-31 23:59:59");
    }

    #[test]
    fn test_round_trip() {
        for secs in [
            0i64,
            946_684_800,
            1_609_459_200,
            1_704_067_200,
            2_147_483_647,
            4_102_444_800,
            -86_400 * 365,
        ] {
            assert_eq!(CivilTime::from_unix(secs).to_unix(), secs, "{}", secs);
        }
    }
}
