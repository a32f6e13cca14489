//! Week index to calendar date range
//!
//! Barchart weeks are quarter-months: days 1-7, 8-14, 15-21 and 22 through
//! the end of the month.

use crate::week::{CyclicWeek, WEEKS_PER_MONTH};
use chrono::{Datelike, Month, Months, NaiveDate};
use serde::Serialize;
use std::fmt;

/// Reference year for month lengths; not a leap year so February ends on 28
const REFERENCE_YEAR: i32 = 2023;

const SHORTHAND: [&str; WEEKS_PER_MONTH] = ["early", "mid", "late", "late"];

/// Calendar days covered by one barchart week
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    /// 1-based month
    pub month: u32,
    pub start_day: u32,
    pub end_day: u32,
    #[serde(skip)]
    week_in_month: usize,
}

impl DateRange {
    pub fn month_name(&self) -> &'static str {
        month_name(self.month)
    }

    /// e.g. "May 1-7"
    pub fn label(&self) -> String {
        format!("{} {}-{}", self.month_name(), self.start_day, self.end_day)
    }

    /// e.g. "early May"
    pub fn shorthand(&self) -> String {
        format!("{} {}", SHORTHAND[self.week_in_month], self.month_name())
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Map a week index to its calendar date range
pub fn week_to_date_range(week: CyclicWeek) -> DateRange {
    let month = (week.index() / WEEKS_PER_MONTH) as u32 + 1;
    let week_in_month = week.index() % WEEKS_PER_MONTH;

    let start_day = 7 * week_in_month as u32 + 1;
    let end_day = if week_in_month + 1 < WEEKS_PER_MONTH {
        start_day + 6
    } else {
        last_day_of_month(month)
    };

    DateRange {
        month,
        start_day,
        end_day,
        week_in_month,
    }
}

fn last_day_of_month(month: u32) -> u32 {
    NaiveDate::from_ymd_opt(REFERENCE_YEAR, month, 1)
        .and_then(|first| first.checked_add_months(Months::new(1)))
        .and_then(|next| next.pred_opt())
        .map(|last| last.day())
        // month is always 1..=12 here
        .unwrap_or(28)
}

fn month_name(month: u32) -> &'static str {
    u8::try_from(month)
        .ok()
        .and_then(|m| Month::try_from(m).ok())
        .map(|m| m.name())
        .unwrap_or("Unknown")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn range(index: usize) -> DateRange {
        week_to_date_range(CyclicWeek::new(index))
    }

    #[test]
    fn test_first_weeks_of_year() {
        assert_eq!(range(0).label(), "January 1-7");
        assert_eq!(range(1).label(), "January 8-14");
        assert_eq!(range(2).label(), "January 15-21");
        assert_eq!(range(3).label(), "January 22-31");
    }

    #[test]
    fn test_last_week_uses_month_length() {
        assert_eq!(range(7).label(), "February 22-28");
        assert_eq!(range(15).label(), "April 22-30");
        assert_eq!(range(31).label(), "August 22-31");
        assert_eq!(range(47).label(), "December 22-31");
    }

    #[test]
    fn test_shorthand() {
        assert_eq!(range(16).shorthand(), "early May");
        assert_eq!(range(17).shorthand(), "mid May");
        assert_eq!(range(18).shorthand(), "late May");
        assert_eq!(range(19).shorthand(), "late May");
    }

    #[test]
    fn test_fields() {
        let may = range(18);
        assert_eq!(may.month, 5);
        assert_eq!(may.start_day, 15);
        assert_eq!(may.end_day, 21);
        assert_eq!(may.to_string(), "May 15-21");
    }

    #[test]
    fn test_every_week_maps_to_a_valid_date() {
        for index in 0..48 {
            let r = range(index);
            assert!(NaiveDate::from_ymd_opt(REFERENCE_YEAR, r.month, r.end_day).is_some());
            assert!(r.start_day <= r.end_day);
        }
    }
}
