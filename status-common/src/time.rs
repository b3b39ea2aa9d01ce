//! Timestamp, week, and timezone utilities

use chrono::{
    DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc,
};
use chrono_tz::Tz;

use crate::{Error, Result};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Interpret a timestamp without offset as UTC
pub fn normalize_utc(naive: NaiveDateTime) -> DateTime<Utc> {
    Utc.from_utc_datetime(&naive)
}

/// Monday of the week containing `instant`, in the team's timezone
///
/// # Examples
///
/// ```
/// use chrono::{NaiveDate, TimeZone, Utc};
/// use status_common::time::week_start_date;
///
/// // Monday 03:00 UTC is still Sunday evening in Los Angeles
/// let instant = Utc.with_ymd_and_hms(2024, 3, 11, 3, 0, 0).unwrap();
/// let week = week_start_date(instant, chrono_tz::America::Los_Angeles);
/// assert_eq!(week, NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
/// ```
pub fn week_start_date(instant: DateTime<Utc>, tz: Tz) -> NaiveDate {
    let local_date = instant.with_timezone(&tz).date_naive();
    local_date - Duration::days(local_date.weekday().num_days_from_monday() as i64)
}

/// Parse an IANA timezone name
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|_| Error::Validation(format!("Invalid timezone: {}", name)))
}

/// All known timezone names, sorted
pub fn all_timezones() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = chrono_tz::TZ_VARIANTS.iter().map(|tz| tz.name()).collect();
    names.sort_unstable();
    names
}

/// Parse a prompt time in 24-hour `HH:MM` format
pub fn parse_prompt_time(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|_| Error::Validation("Time must be in HH:MM format".to_string()))
}

/// Validate a prompt day (0 = Monday .. 6 = Sunday)
pub fn validate_prompt_day(prompt_day: i64) -> Result<()> {
    if (0..=6).contains(&prompt_day) {
        Ok(())
    } else {
        Err(Error::Validation(
            "prompt_day must be between 0 (Monday) and 6 (Sunday)".to_string(),
        ))
    }
}

/// UTC instant of a team's prompt within the week starting `week_start`
///
/// Local times that fall into a DST gap are pushed forward by one hour;
/// ambiguous local times resolve to the earlier instant.
pub fn prompt_instant_for_week(
    week_start: NaiveDate,
    prompt_day: i64,
    prompt_time: NaiveTime,
    tz: Tz,
) -> Result<DateTime<Utc>> {
    validate_prompt_day(prompt_day)?;

    let local = (week_start + Duration::days(prompt_day)).and_time(prompt_time);
    tz.from_local_datetime(&local)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(local + Duration::hours(1))).earliest())
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| Error::Internal(format!("Unrepresentable local time {} in {}", local, tz.name())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    #[test]
    fn test_now_returns_recent_timestamp() {
        let timestamp = now();
        assert!(timestamp.timestamp() > 946_684_800); // 2000-01-01 00:00:00 UTC
        assert!(timestamp.timestamp() < 4_102_444_800); // 2100-01-01 00:00:00 UTC
    }

    #[test]
    fn test_normalize_utc_keeps_wall_clock() {
        let naive = NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        let utc = normalize_utc(naive);
        assert_eq!(utc.naive_utc(), naive);
    }

    #[test]
    fn test_week_start_is_monday() {
        let instant = Utc.with_ymd_and_hms(2024, 3, 7, 15, 0, 0).unwrap(); // Thursday
        let week = week_start_date(instant, Tz::UTC);
        assert_eq!(week, NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
        assert_eq!(week.weekday(), Weekday::Mon);
    }

    #[test]
    fn test_week_start_on_monday_itself() {
        let instant = Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap();
        assert_eq!(
            week_start_date(instant, Tz::UTC),
            NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
        );
    }

    #[test]
    fn test_week_start_uses_team_timezone() {
        // Monday 01:00 in Tokyo is Sunday 16:00 UTC
        let instant = Utc.with_ymd_and_hms(2024, 3, 10, 16, 0, 0).unwrap();
        assert_eq!(
            week_start_date(instant, Tz::UTC),
            NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
        );
        assert_eq!(
            week_start_date(instant, chrono_tz::Asia::Tokyo),
            NaiveDate::from_ymd_opt(2024, 3, 11).unwrap()
        );
    }

    #[test]
    fn test_parse_timezone() {
        assert!(parse_timezone("America/Los_Angeles").is_ok());
        assert!(matches!(parse_timezone("Mars/Olympus"), Err(Error::Validation(_))));
    }

    #[test]
    fn test_all_timezones_sorted_and_complete() {
        let names = all_timezones();
        assert!(names.contains(&"UTC"));
        assert!(names.contains(&"Europe/Berlin"));
        assert!(names.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_parse_prompt_time() {
        assert_eq!(
            parse_prompt_time("10:00").unwrap(),
            NaiveTime::from_hms_opt(10, 0, 0).unwrap()
        );
        assert!(parse_prompt_time("25:00").is_err());
        assert!(parse_prompt_time("10am").is_err());
    }

    #[test]
    fn test_validate_prompt_day() {
        assert!(validate_prompt_day(0).is_ok());
        assert!(validate_prompt_day(6).is_ok());
        assert!(validate_prompt_day(7).is_err());
        assert!(validate_prompt_day(-1).is_err());
    }

    #[test]
    fn test_prompt_instant_in_team_timezone() {
        let week = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();
        let time = NaiveTime::from_hms_opt(10, 0, 0).unwrap();
        // Tuesday 10:00 PST = 18:00 UTC
        let instant =
            prompt_instant_for_week(week, 1, time, chrono_tz::America::Los_Angeles).unwrap();
        assert_eq!(instant, Utc.with_ymd_and_hms(2024, 1, 9, 18, 0, 0).unwrap());
    }

    #[test]
    fn test_prompt_instant_in_dst_gap_moves_forward() {
        // 2024-03-10 02:30 does not exist in Los Angeles
        let week = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let time = NaiveTime::from_hms_opt(2, 30, 0).unwrap();
        let instant =
            prompt_instant_for_week(week, 6, time, chrono_tz::America::Los_Angeles).unwrap();
        // 03:30 PDT = 10:30 UTC
        assert_eq!(instant, Utc.with_ymd_and_hms(2024, 3, 10, 10, 30, 0).unwrap());
    }
}
