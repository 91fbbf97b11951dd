use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use crate::ApiError;

/// Parses a `YYYY-MM-DD` date filter parameter as the start of that day,
/// UTC: `[00:00:00Z`.
pub fn parse_range_start(raw: &str) -> Result<DateTime<Utc>, ApiError> {
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| ApiError::bad_input(format!("invalid date '{raw}', expected YYYY-MM-DD")))?;
    Ok(DateTime::from_naive_utc_and_offset(
        date.and_time(NaiveTime::MIN),
        Utc,
    ))
}

/// Parses a `YYYY-MM-DD` date filter parameter as the end of that day,
/// UTC: `23:59:59Z]` inclusive.
pub fn parse_range_end(raw: &str) -> Result<DateTime<Utc>, ApiError> {
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| ApiError::bad_input(format!("invalid date '{raw}', expected YYYY-MM-DD")))?;
    let time = NaiveTime::from_hms_opt(23, 59, 59).expect("valid constant time");
    Ok(DateTime::from_naive_utc_and_offset(
        date.and_time(time),
        Utc,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_of_day_is_inclusive_of_23_59_59() {
        let end = parse_range_end("2024-01-15").unwrap();
        assert_eq!(end.format("%H:%M:%S").to_string(), "23:59:59");
    }

    #[test]
    fn rejects_malformed_date() {
        assert!(parse_range_start("15-01-2024").is_err());
    }
}
