//! Shared utility functions for the hydro-economic coupling crates.

/// Date utility functions
pub mod dates {
    use chrono::{NaiveDate, TimeDelta};
    use std::mem::replace;

    /// Formats accepted by [`parse_flexible`], tried in order.
    ///
    /// Farm records coming out of the economic model use `m/d/YYYY`, the
    /// GeoJSON and CSV inputs use ISO dates.
    pub const ACCEPTED_FORMATS: [&str; 4] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d", "%Y%m%d"];

    /// Format used for dates in node time-series documents.
    pub const SERIES_FORMAT: &str = "%Y/%m/%d";

    /// Format a NaiveDate as "YYYY-MM-DD"
    pub fn format_date(date: &NaiveDate) -> String {
        date.format("%Y-%m-%d").to_string()
    }

    /// Format a NaiveDate as "YYYY/MM/DD"
    pub fn format_series_date(date: &NaiveDate) -> String {
        date.format(SERIES_FORMAT).to_string()
    }

    /// Parse a date in any of the [`ACCEPTED_FORMATS`].
    ///
    /// Ambiguous short years are not accepted; `06/03/12` is an error rather
    /// than a guess.
    pub fn parse_flexible(s: &str) -> anyhow::Result<NaiveDate> {
        let trimmed = s.trim();
        ACCEPTED_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
            .ok_or_else(|| anyhow::anyhow!("unrecognised date '{}'", s))
    }

    /// Number of days from `start` to `end`, inclusive of both ends.
    /// Zero when `end` is before `start`.
    pub fn days_inclusive(start: &NaiveDate, end: &NaiveDate) -> usize {
        let days = (*end - *start).num_days();
        if days < 0 {
            0
        } else {
            days as usize + 1
        }
    }

    /// A date range iterator that yields each date from the start date
    /// through the end date (inclusive).
    #[derive(Clone, Eq, PartialEq, Copy, Debug)]
    pub struct DateRange(pub NaiveDate, pub NaiveDate);

    impl Iterator for DateRange {
        type Item = NaiveDate;
        fn next(&mut self) -> Option<Self::Item> {
            if self.0 <= self.1 {
                let next = self.0 + TimeDelta::days(1);
                Some(replace(&mut self.0, next))
            } else {
                None
            }
        }

        fn size_hint(&self) -> (usize, Option<usize>) {
            let n = days_inclusive(&self.0, &self.1);
            (n, Some(n))
        }
    }

    impl ExactSizeIterator for DateRange {}

    #[cfg(test)]
    mod tests {
        use super::*;
        use chrono::NaiveDate;

        #[test]
        fn test_format_and_parse() {
            let date = NaiveDate::from_ymd_opt(2023, 6, 15).unwrap();
            let formatted = format_date(&date);
            assert_eq!(formatted, "2023-06-15");
            let parsed = parse_flexible(&formatted).unwrap();
            assert_eq!(parsed, date);
            assert_eq!(format_series_date(&date), "2023/06/15");
        }

        #[test]
        fn test_parse_flexible() {
            let expected = NaiveDate::from_ymd_opt(2012, 6, 3).unwrap();
            assert_eq!(parse_flexible("2012-06-03").unwrap(), expected);
            assert_eq!(parse_flexible("06/03/2012").unwrap(), expected);
            assert_eq!(parse_flexible(" 2012/06/03 ").unwrap(), expected);
            assert_eq!(parse_flexible("20120603").unwrap(), expected);
            assert!(parse_flexible("06/03/12").is_err());
            assert!(parse_flexible("June 3rd").is_err());
        }

        #[test]
        fn test_days_inclusive() {
            let start = NaiveDate::from_ymd_opt(2020, 5, 1).unwrap();
            let end = NaiveDate::from_ymd_opt(2020, 5, 4).unwrap();
            assert_eq!(days_inclusive(&start, &end), 4);
            assert_eq!(days_inclusive(&start, &start), 1);
            assert_eq!(days_inclusive(&end, &start), 0);
        }

        #[test]
        fn test_date_range_iteration() {
            let start = NaiveDate::from_ymd_opt(2020, 2, 27).unwrap();
            let end = NaiveDate::from_ymd_opt(2020, 3, 2).unwrap();
            let dates: Vec<NaiveDate> = DateRange(start, end).collect();
            // leap year: Feb 27, 28, 29, Mar 1, 2
            assert_eq!(dates.len(), 5);
            assert_eq!(dates[2], NaiveDate::from_ymd_opt(2020, 2, 29).unwrap());
            assert_eq!(dates[4], end);
            assert_eq!(DateRange(start, end).len(), 5);
        }

        #[test]
        fn test_date_range_empty() {
            let start = NaiveDate::from_ymd_opt(2022, 3, 15).unwrap();
            let end = NaiveDate::from_ymd_opt(2022, 3, 14).unwrap();
            assert_eq!(DateRange(start, end).count(), 0);
        }
    }
}
