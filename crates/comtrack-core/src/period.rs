//! # Period Calculator
//!
//! Computes the closed date intervals that commission totals are summed over.
//!
//! ## Period Kinds
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Period Boundaries (ref = 2024-02-15)                │
//! │                                                                         │
//! │  MONTH     current   2024-02-01 .. 2024-02-29   (leap year)            │
//! │            previous  2024-01-01 .. 2024-01-31                          │
//! │            last year 2023-02-01 .. 2023-02-28                          │
//! │                                                                         │
//! │  QUARTER   calendar blocks [Jan-Mar] [Apr-Jun] [Jul-Sep] [Oct-Dec]     │
//! │            current   2024-01-01 .. 2024-03-31                          │
//! │            previous  2023-10-01 .. 2023-12-31   (wraps the year)       │
//! │            last year 2023-01-01 .. 2023-03-31                          │
//! │                                                                         │
//! │  YEAR      financial year, April 1 .. March 31                          │
//! │            current   2023-04-01 .. 2024-03-31   (Feb → FY started 2023)│
//! │            previous  2022-04-01 .. 2023-03-31                          │
//! │            last year == previous                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Quarters are calendar quarters, deliberately NOT aligned to the financial
//! year. All arithmetic goes through `chrono::Months`, so month lengths and
//! leap years are never hardcoded.

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::FINANCIAL_YEAR_START_MONTH;

// =============================================================================
// Period Kind
// =============================================================================

/// Granularity of a period-over-period comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum PeriodKind {
    /// Calendar month.
    #[default]
    Month,
    /// Calendar quarter (Jan, Apr, Jul, Oct blocks).
    Quarter,
    /// Financial year, April to March.
    Year,
}

impl PeriodKind {
    /// All kinds, in the order they are offered to the dashboard.
    pub const ALL: [PeriodKind; 3] = [PeriodKind::Month, PeriodKind::Quarter, PeriodKind::Year];

    /// Lowercase wire name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            PeriodKind::Month => "month",
            PeriodKind::Quarter => "quarter",
            PeriodKind::Year => "year",
        }
    }
}

impl fmt::Display for PeriodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PeriodKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "month" => Ok(PeriodKind::Month),
            "quarter" => Ok(PeriodKind::Quarter),
            "year" => Ok(PeriodKind::Year),
            _ => Err(ValidationError::NotAllowed {
                field: "period".to_string(),
                allowed: PeriodKind::ALL.iter().map(|k| k.to_string()).collect(),
            }),
        }
    }
}

// =============================================================================
// Date Range
// =============================================================================

/// A closed date interval `[start, end]`.
///
/// Invariant: `start <= end`. Every constructor in this module produces
/// ranges that begin on the first of a month and end on the last day of a
/// month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DateRange {
    #[ts(as = "String")]
    pub start: NaiveDate,
    #[ts(as = "String")]
    pub end: NaiveDate,
}

impl DateRange {
    /// Creates a range. Swaps the bounds if given in reverse order.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        if start <= end {
            DateRange { start, end }
        } else {
            DateRange { start: end, end: start }
        }
    }

    /// `months` whole months starting at `first` (which must be a 1st).
    fn spanning_months(first: NaiveDate, months: u32) -> Self {
        DateRange {
            start: first,
            end: first + Months::new(months) - Days::new(1),
        }
    }

    /// The same-length range `months` months earlier.
    fn shifted_back(&self, months: u32, length: u32) -> Self {
        DateRange::spanning_months(self.start - Months::new(months), length)
    }

    /// Whether `date` lies inside the range (both ends inclusive).
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

// =============================================================================
// Boundary Functions
// =============================================================================

/// First day of the month containing `date`.
pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.day0()))
}

/// Last day of the given month, or `None` for an invalid year/month.
///
/// ```rust
/// use chrono::NaiveDate;
/// use comtrack_core::period::last_day_of_month;
///
/// assert_eq!(last_day_of_month(2024, 2), NaiveDate::from_ymd_opt(2024, 2, 29));
/// assert_eq!(last_day_of_month(2023, 2), NaiveDate::from_ymd_opt(2023, 2, 28));
/// assert_eq!(last_day_of_month(2023, 13), None);
/// ```
pub fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1).map(|first| first + Months::new(1) - Days::new(1))
}

/// The calendar month containing `date`.
pub fn month_range(date: NaiveDate) -> DateRange {
    DateRange::spanning_months(first_of_month(date), 1)
}

/// The calendar quarter (Jan/Apr/Jul/Oct block) containing `date`.
pub fn quarter_range(date: NaiveDate) -> DateRange {
    let into_quarter = date.month0() % 3;
    DateRange::spanning_months(first_of_month(date) - Months::new(into_quarter), 3)
}

/// The financial year (April 1 to March 31) containing `date`.
///
/// For January to March the financial year started the previous April.
pub fn financial_year_range(date: NaiveDate) -> DateRange {
    let since_start = (date.month() + 12 - FINANCIAL_YEAR_START_MONTH) % 12;
    DateRange::spanning_months(first_of_month(date) - Months::new(since_start), 12)
}

// =============================================================================
// Period Windows
// =============================================================================

/// The three ranges compared for one period kind and reference date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PeriodWindows {
    pub kind: PeriodKind,
    pub current: DateRange,
    pub previous: DateRange,
    pub same_period_last_year: DateRange,
}

impl PeriodWindows {
    /// Derives current / previous / same-period-last-year for `reference`.
    ///
    /// `reference` must lie in `MIN_YEAR..=MAX_YEAR`; the request parsers
    /// reject anything else.
    ///
    /// ## Example
    /// ```rust
    /// use chrono::NaiveDate;
    /// use comtrack_core::period::{PeriodKind, PeriodWindows};
    ///
    /// let jan = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
    /// let w = PeriodWindows::for_date(PeriodKind::Month, jan);
    /// assert_eq!(w.previous.start, NaiveDate::from_ymd_opt(2023, 12, 1).unwrap());
    /// assert_eq!(w.previous.end, NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());
    /// ```
    pub fn for_date(kind: PeriodKind, reference: NaiveDate) -> Self {
        let (current, length) = match kind {
            PeriodKind::Month => (month_range(reference), 1),
            PeriodKind::Quarter => (quarter_range(reference), 3),
            PeriodKind::Year => (financial_year_range(reference), 12),
        };

        let previous = current.shifted_back(length, length);
        // For a year the prior period already is last year's period.
        let same_period_last_year = current.shifted_back(12, length);

        PeriodWindows {
            kind,
            current,
            previous,
            same_period_last_year,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn every_day(from: NaiveDate, to: NaiveDate) -> impl Iterator<Item = NaiveDate> {
        from.iter_days().take_while(move |day| *day <= to)
    }

    #[test]
    fn test_period_kind_parsing() {
        assert_eq!("month".parse::<PeriodKind>().unwrap(), PeriodKind::Month);
        assert_eq!("Quarter".parse::<PeriodKind>().unwrap(), PeriodKind::Quarter);
        assert_eq!("year".parse::<PeriodKind>().unwrap(), PeriodKind::Year);
        assert!("week".parse::<PeriodKind>().is_err());
        assert!("".parse::<PeriodKind>().is_err());
    }

    #[test]
    fn test_last_day_of_month_generic() {
        assert_eq!(last_day_of_month(2024, 2), Some(d(2024, 2, 29)));
        assert_eq!(last_day_of_month(1900, 2), Some(d(1900, 2, 28)));
        assert_eq!(last_day_of_month(2000, 2), Some(d(2000, 2, 29)));
        assert_eq!(last_day_of_month(2024, 4), Some(d(2024, 4, 30)));
        assert_eq!(last_day_of_month(2024, 12), Some(d(2024, 12, 31)));
        assert_eq!(last_day_of_month(2024, 0), None);
    }

    #[test]
    fn test_month_windows() {
        let w = PeriodWindows::for_date(PeriodKind::Month, d(2024, 3, 10));
        assert_eq!(w.current, DateRange::new(d(2024, 3, 1), d(2024, 3, 31)));
        assert_eq!(w.previous, DateRange::new(d(2024, 2, 1), d(2024, 2, 29)));
        assert_eq!(w.same_period_last_year, DateRange::new(d(2023, 3, 1), d(2023, 3, 31)));
    }

    #[test]
    fn test_month_rollover_into_previous_year() {
        let w = PeriodWindows::for_date(PeriodKind::Month, d(2024, 1, 15));
        assert_eq!(w.previous, DateRange::new(d(2023, 12, 1), d(2023, 12, 31)));
    }

    #[test]
    fn test_previous_month_never_skips_or_repeats() {
        for day in every_day(d(2019, 1, 1), d(2026, 12, 31)) {
            let w = PeriodWindows::for_date(PeriodKind::Month, day);
            assert_eq!(w.previous.end + Days::new(1), w.current.start, "ref {day}");
            assert_eq!(w.previous.start.day(), 1);
            assert!(w.current.contains(day));
        }
    }

    #[test]
    fn test_quarter_blocks_are_fixed() {
        for day in every_day(d(2019, 1, 1), d(2026, 12, 31)) {
            let q = quarter_range(day);
            assert!([1, 4, 7, 10].contains(&q.start.month()), "ref {day}");
            assert_eq!(q.start.day(), 1);
            assert_eq!(q.end.month(), q.start.month() + 2);
            assert_eq!(Some(q.end), last_day_of_month(q.start.year(), q.end.month()));
            assert!(q.contains(day));
        }
    }

    #[test]
    fn test_quarter_wraps_year() {
        let w = PeriodWindows::for_date(PeriodKind::Quarter, d(2024, 2, 15));
        assert_eq!(w.current, DateRange::new(d(2024, 1, 1), d(2024, 3, 31)));
        assert_eq!(w.previous, DateRange::new(d(2023, 10, 1), d(2023, 12, 31)));
        assert_eq!(w.same_period_last_year, DateRange::new(d(2023, 1, 1), d(2023, 3, 31)));

        let w = PeriodWindows::for_date(PeriodKind::Quarter, d(2024, 11, 30));
        assert_eq!(w.current, DateRange::new(d(2024, 10, 1), d(2024, 12, 31)));
        assert_eq!(w.previous, DateRange::new(d(2024, 7, 1), d(2024, 9, 30)));
    }

    #[test]
    fn test_financial_year_always_april_to_march() {
        for day in every_day(d(2019, 1, 1), d(2026, 12, 31)) {
            let fy = financial_year_range(day);
            assert_eq!((fy.start.month(), fy.start.day()), (4, 1), "ref {day}");
            assert_eq!((fy.end.month(), fy.end.day()), (3, 31), "ref {day}");
            assert_eq!(fy.end.year(), fy.start.year() + 1);

            let expected_start_year = if day.month() <= 3 { day.year() - 1 } else { day.year() };
            assert_eq!(fy.start.year(), expected_start_year, "ref {day}");
        }
    }

    #[test]
    fn test_financial_year_before_april() {
        let fy = financial_year_range(d(2024, 3, 10));
        assert_eq!(fy, DateRange::new(d(2023, 4, 1), d(2024, 3, 31)));

        let fy = financial_year_range(d(2024, 4, 1));
        assert_eq!(fy, DateRange::new(d(2024, 4, 1), d(2025, 3, 31)));
    }

    #[test]
    fn test_year_same_period_equals_previous() {
        let w = PeriodWindows::for_date(PeriodKind::Year, d(2024, 6, 1));
        assert_eq!(w.current, DateRange::new(d(2024, 4, 1), d(2025, 3, 31)));
        assert_eq!(w.previous, DateRange::new(d(2023, 4, 1), d(2024, 3, 31)));
        assert_eq!(w.same_period_last_year, w.previous);
    }

    #[test]
    fn test_date_range_new_orders_bounds() {
        let r = DateRange::new(d(2024, 5, 31), d(2024, 5, 1));
        assert_eq!(r.start, d(2024, 5, 1));
        assert!(r.contains(d(2024, 5, 31)));
        assert!(!r.contains(d(2024, 6, 1)));
        assert_eq!(r.to_string(), "2024-05-01..2024-05-31");
    }

    #[test]
    fn test_windows_at_supported_year_bounds() {
        for kind in [PeriodKind::Month, PeriodKind::Quarter, PeriodKind::Year] {
            let earliest = PeriodWindows::for_date(kind, d(crate::MIN_YEAR, 1, 1));
            assert!(earliest.same_period_last_year.start < earliest.current.start);

            let latest = PeriodWindows::for_date(kind, d(crate::MAX_YEAR, 12, 31));
            assert!(latest.current.contains(d(crate::MAX_YEAR, 12, 31)));
        }
    }
}
