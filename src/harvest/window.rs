//! Retention window arithmetic.

use std::time::Duration;

use chrono::{DateTime, LocalResult, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;

/// `now` minus the retention window, saturating at the earliest representable time.
pub fn retention_cutoff(now: NaiveDateTime, window: Duration) -> NaiveDateTime {
    chrono::Duration::from_std(window)
        .ok()
        .and_then(|window| now.checked_sub_signed(window))
        .unwrap_or(NaiveDateTime::MIN)
}

/// Boundary used for the received-time query.
///
/// This is midnight in `tz` of the calendar day *after* the cutoff date, not
/// the cutoff itself. Items received on the cutoff day are therefore outside
/// the boundary. The shift is kept as-is.
pub fn protocol_boundary(cutoff: NaiveDateTime, tz: Tz) -> DateTime<Tz> {
    let day = cutoff.date().succ_opt().unwrap_or(cutoff.date());
    let midnight = day.and_time(NaiveTime::MIN);
    match tz.from_local_datetime(&midnight) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earliest, _) => earliest,
        // Midnight skipped by a DST transition: take the first local time
        // after the gap, which is still on the boundary day.
        LocalResult::None => (1..=48)
            .find_map(|step| {
                let later = midnight + chrono::Duration::minutes(30 * step);
                tz.from_local_datetime(&later).earliest()
            })
            .unwrap_or_else(|| tz.from_utc_datetime(&midnight)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn test_cutoff_subtracts_window() {
        let now = at(2024, 6, 1, 12, 0, 0);
        let cutoff = retention_cutoff(now, Duration::from_secs(60 * 60 * 24 * 90));
        assert_eq!(cutoff, at(2024, 3, 3, 12, 0, 0));
    }

    #[test]
    fn test_zero_window() {
        let now = at(2024, 6, 1, 12, 0, 0);
        assert_eq!(retention_cutoff(now, Duration::ZERO), now);
    }

    #[test]
    fn test_boundary_is_next_day_midnight_in_zone() {
        let boundary =
            protocol_boundary(at(2024, 3, 3, 12, 0, 0), chrono_tz::Asia::Singapore);
        assert_eq!(
            boundary.date_naive(),
            NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
        );
        assert_eq!(boundary.hour(), 0);
        assert_eq!(boundary.to_rfc3339(), "2024-03-04T00:00:00+08:00");
    }

    #[test]
    fn test_boundary_rolls_over_month_and_year() {
        let tz = chrono_tz::UTC;
        assert_eq!(
            protocol_boundary(at(2024, 2, 29, 23, 59, 59), tz).date_naive(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
        assert_eq!(
            protocol_boundary(at(2023, 12, 31, 0, 0, 0), tz).date_naive(),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
        );
    }

    #[test]
    fn test_boundary_when_midnight_is_skipped() {
        // Sao Paulo clocks jumped from 00:00 to 01:00 on 2018-11-04.
        let cutoff = at(2018, 11, 3, 8, 0, 0);
        let boundary = protocol_boundary(cutoff, chrono_tz::America::Sao_Paulo);
        assert_eq!(boundary.date_naive(), cutoff.date().succ_opt().unwrap());
        assert_eq!(boundary.to_rfc3339(), "2018-11-04T01:00:00-02:00");
        assert_eq!(boundary.naive_utc(), at(2018, 11, 4, 3, 0, 0));
    }
}
