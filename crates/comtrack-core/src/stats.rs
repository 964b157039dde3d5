//! # Stats Assembler
//!
//! Turns raw conditional-sum totals plus period boundaries into the records
//! the dashboard renders.
//!
//! ## Data Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  PeriodWindows ─────────┐                                              │
//! │  (period.rs)            │                                              │
//! │                         ▼                                              │
//! │  PeriodTotals ──► PeriodStats::assemble ──► { period,                  │
//! │  (one SQL row)                                 currentPeriod,          │
//! │                                                previousPeriod + %,     │
//! │                                                samePeriodLastYear + % }│
//! │                                                                         │
//! │  OverviewTotals ──► CommissionOverview::assemble                       │
//! │  TypeTotalsRow[] ──► TypeBreakdown::assemble (grand total = Σ rows)    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Percentage Change Policy
//! `pct_change(current, comparison)` is `0.0` whenever the comparison total
//! is zero, whatever the current total is. A drop to nothing against a
//! non-zero comparison is reported as `-100.0`, never `0.0`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::period::{DateRange, PeriodKind, PeriodWindows};

// =============================================================================
// Percentage Change
// =============================================================================

/// `(current − comparison) / comparison × 100`, or `0.0` when comparison is zero.
///
/// The difference is taken exactly in paise; only the final ratio is `f64`.
///
/// ## Example
/// ```rust
/// use comtrack_core::money::Money;
/// use comtrack_core::stats::pct_change;
///
/// assert_eq!(pct_change(Money::from_rupees(1000), Money::from_rupees(800)), 25.0);
/// assert_eq!(pct_change(Money::from_rupees(1000), Money::zero()), 0.0);
/// ```
pub fn pct_change(current: Money, comparison: Money) -> f64 {
    if comparison.is_zero() {
        return 0.0;
    }
    let delta = i128::from(current.paise()) - i128::from(comparison.paise());
    delta as f64 / comparison.paise() as f64 * 100.0
}

// =============================================================================
// Period Stats
// =============================================================================

/// Raw output of the single conditional-sum query for one period kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PeriodTotals {
    pub all_time: Money,
    pub current: Money,
    pub previous: Money,
    pub same_period_last_year: Money,
}

/// The period being reported on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CurrentPeriod {
    #[ts(as = "String")]
    pub total: Money,
    #[ts(as = "String")]
    pub start_date: NaiveDate,
    #[ts(as = "String")]
    pub end_date: NaiveDate,
}

/// A comparator period and the current period's change against it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ComparisonPeriod {
    #[ts(as = "String")]
    pub total: Money,
    #[ts(as = "String")]
    pub start_date: NaiveDate,
    #[ts(as = "String")]
    pub end_date: NaiveDate,
    pub percentage_change: f64,
}

/// Current vs previous vs same-period-last-year for one period kind.
///
/// ## JSON Shape
/// ```json
/// {
///   "period": "year",
///   "totalCommissions": "1800.00",
///   "currentPeriod": { "total": "1000.00", "startDate": "2024-04-01", "endDate": "2025-03-31" },
///   "previousPeriod": { "total": "800.00", "startDate": "2023-04-01", "endDate": "2024-03-31", "percentageChange": 25.0 },
///   "samePeriodLastYear": { "total": "800.00", "startDate": "2023-04-01", "endDate": "2024-03-31", "percentageChange": 25.0 }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PeriodStats {
    pub period: PeriodKind,
    #[ts(as = "String")]
    pub total_commissions: Money,
    pub current_period: CurrentPeriod,
    pub previous_period: ComparisonPeriod,
    pub same_period_last_year: ComparisonPeriod,
}

impl PeriodStats {
    /// Combines boundaries and totals into the final record.
    pub fn assemble(windows: &PeriodWindows, totals: &PeriodTotals) -> Self {
        let comparison = |total: Money, range: DateRange| ComparisonPeriod {
            total,
            start_date: range.start,
            end_date: range.end,
            percentage_change: pct_change(totals.current, total),
        };

        PeriodStats {
            period: windows.kind,
            total_commissions: totals.all_time,
            current_period: CurrentPeriod {
                total: totals.current,
                start_date: windows.current.start,
                end_date: windows.current.end,
            },
            previous_period: comparison(totals.previous, windows.previous),
            same_period_last_year: comparison(
                totals.same_period_last_year,
                windows.same_period_last_year,
            ),
        }
    }
}

// =============================================================================
// Commission Overview
// =============================================================================

/// Raw output of the overview query: all-time, FY and month triad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OverviewTotals {
    pub all_time: Money,
    pub current_financial_year: Money,
    pub previous_financial_year: Money,
    pub current_month: Money,
    pub same_month_last_year: Money,
    /// Distinct calendar months with at least one transaction in the current FY.
    pub financial_year_months: u32,
}

/// A total with its change against a comparator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TotalWithChange {
    #[ts(as = "String")]
    pub total: Money,
    pub percentage_change: f64,
}

/// Headline cards: lifetime total, this FY, this month, monthly average.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CommissionOverview {
    #[ts(as = "String")]
    pub total_commissions: Money,
    /// Versus the previous financial year.
    pub current_financial_year: TotalWithChange,
    /// Versus the same month one year earlier.
    pub current_month: TotalWithChange,
    /// Current FY total over the months of the FY that have data.
    #[ts(as = "String")]
    pub monthly_average: Money,
}

impl CommissionOverview {
    pub fn assemble(totals: &OverviewTotals) -> Self {
        CommissionOverview {
            total_commissions: totals.all_time,
            current_financial_year: TotalWithChange {
                total: totals.current_financial_year,
                percentage_change: pct_change(
                    totals.current_financial_year,
                    totals.previous_financial_year,
                ),
            },
            current_month: TotalWithChange {
                total: totals.current_month,
                percentage_change: pct_change(totals.current_month, totals.same_month_last_year),
            },
            monthly_average: totals
                .current_financial_year
                .divide_round(totals.financial_year_months.max(1)),
        }
    }
}

// =============================================================================
// Entity Type Breakdown
// =============================================================================

/// One row of the grouped per-type financial year query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeTotalsRow {
    pub entity_type_id: String,
    pub entity_type_name: String,
    pub current_total: Money,
    pub previous_total: Money,
}

/// Current vs previous financial year for one entity type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct EntityTypeTotal {
    pub entity_type_id: String,
    pub entity_type_name: String,
    #[serde(rename = "currentFYTotal")]
    #[ts(as = "String")]
    pub current_fy_total: Money,
    #[serde(rename = "previousFYTotal")]
    #[ts(as = "String")]
    pub previous_fy_total: Money,
    pub percentage_change: f64,
}

/// Sum of every entity type's totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct GrandTotal {
    #[serde(rename = "currentFYTotal")]
    #[ts(as = "String")]
    pub current_fy_total: Money,
    #[serde(rename = "previousFYTotal")]
    #[ts(as = "String")]
    pub previous_fy_total: Money,
    pub percentage_change: f64,
}

/// Per-type breakdown with a grand total that always matches it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TypeBreakdown {
    pub grand_total: GrandTotal,
    pub entity_type_totals: Vec<EntityTypeTotal>,
}

impl TypeBreakdown {
    /// Builds the breakdown. The grand total is the sum of the rows, never a
    /// separate query.
    pub fn assemble(rows: Vec<TypeTotalsRow>) -> Self {
        let current: Money = rows.iter().map(|r| r.current_total).sum();
        let previous: Money = rows.iter().map(|r| r.previous_total).sum();

        let entity_type_totals = rows
            .into_iter()
            .map(|row| EntityTypeTotal {
                percentage_change: pct_change(row.current_total, row.previous_total),
                entity_type_id: row.entity_type_id,
                entity_type_name: row.entity_type_name,
                current_fy_total: row.current_total,
                previous_fy_total: row.previous_total,
            })
            .collect();

        TypeBreakdown {
            grand_total: GrandTotal {
                current_fy_total: current,
                previous_fy_total: previous,
                percentage_change: pct_change(current, previous),
            },
            entity_type_totals,
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

    fn row(name: &str, current: i64, previous: i64) -> TypeTotalsRow {
        TypeTotalsRow {
            entity_type_id: format!("id-{name}"),
            entity_type_name: name.to_string(),
            current_total: Money::from_rupees(current),
            previous_total: Money::from_rupees(previous),
        }
    }

    #[test]
    fn test_pct_change_zero_comparison() {
        for current in [0, 1, -1, 5_000_000, -250] {
            assert_eq!(pct_change(Money::from_paise(current), Money::zero()), 0.0);
        }
    }

    #[test]
    fn test_pct_change_values() {
        assert_eq!(pct_change(Money::from_rupees(1000), Money::from_rupees(800)), 25.0);
        assert_eq!(pct_change(Money::from_rupees(400), Money::from_rupees(800)), -50.0);
        assert_eq!(pct_change(Money::zero(), Money::from_rupees(800)), -100.0);
        assert_eq!(pct_change(Money::from_rupees(800), Money::from_rupees(800)), 0.0);
    }

    #[test]
    fn test_period_stats_year_scenario() {
        let windows = PeriodWindows::for_date(PeriodKind::Year, d(2024, 6, 1));
        let totals = PeriodTotals {
            all_time: Money::from_rupees(1800),
            current: Money::from_rupees(1000),
            previous: Money::from_rupees(800),
            same_period_last_year: Money::from_rupees(800),
        };

        let stats = PeriodStats::assemble(&windows, &totals);
        assert_eq!(stats.period, PeriodKind::Year);
        assert_eq!(stats.current_period.total, Money::from_rupees(1000));
        assert_eq!(stats.current_period.start_date, d(2024, 4, 1));
        assert_eq!(stats.previous_period.total, Money::from_rupees(800));
        assert_eq!(stats.previous_period.percentage_change, 25.0);
        assert_eq!(stats.same_period_last_year, stats.previous_period);
    }

    #[test]
    fn test_period_stats_json_shape() {
        let windows = PeriodWindows::for_date(PeriodKind::Month, d(2024, 3, 10));
        let stats = PeriodStats::assemble(&windows, &PeriodTotals::default());
        let json = serde_json::to_value(&stats).unwrap();

        assert_eq!(json["period"], "month");
        assert_eq!(json["currentPeriod"]["startDate"], "2024-03-01");
        assert_eq!(json["currentPeriod"]["endDate"], "2024-03-31");
        assert_eq!(json["previousPeriod"]["endDate"], "2024-02-29");
        assert_eq!(json["samePeriodLastYear"]["startDate"], "2023-03-01");
        assert_eq!(json["previousPeriod"]["percentageChange"], 0.0);
        assert_eq!(json["currentPeriod"]["total"], "0.00");
    }

    #[test]
    fn test_overview_monthly_average() {
        let totals = OverviewTotals {
            all_time: Money::from_rupees(5000),
            current_financial_year: Money::from_rupees(3000),
            previous_financial_year: Money::from_rupees(2000),
            current_month: Money::from_rupees(1000),
            same_month_last_year: Money::zero(),
            financial_year_months: 3,
        };
        let overview = CommissionOverview::assemble(&totals);
        assert_eq!(overview.monthly_average, Money::from_rupees(1000));
        assert_eq!(overview.current_financial_year.percentage_change, 50.0);
        assert_eq!(overview.current_month.percentage_change, 0.0);
    }

    #[test]
    fn test_overview_without_fy_data_divides_by_one() {
        let overview = CommissionOverview::assemble(&OverviewTotals::default());
        assert_eq!(overview.monthly_average, Money::zero());
    }

    #[test]
    fn test_grand_total_is_sum_of_rows() {
        let breakdown = TypeBreakdown::assemble(vec![
            row("Motor", 1000, 500),
            row("Health", 250, 0),
            row("Life", 0, 400),
        ]);

        let summed: Money = breakdown
            .entity_type_totals
            .iter()
            .map(|t| t.current_fy_total)
            .sum();
        assert_eq!(breakdown.grand_total.current_fy_total, summed);
        assert_eq!(breakdown.grand_total.current_fy_total, Money::from_rupees(1250));
        assert_eq!(breakdown.grand_total.previous_fy_total, Money::from_rupees(900));
    }

    #[test]
    fn test_type_without_current_sales_is_negative() {
        let breakdown = TypeBreakdown::assemble(vec![row("Life", 0, 400), row("Motor", 10, 400)]);
        let life = &breakdown.entity_type_totals[0];
        assert_eq!(life.percentage_change, -100.0);
        let motor = &breakdown.entity_type_totals[1];
        assert!(motor.percentage_change < 0.0 && motor.percentage_change > -100.0);
    }

    #[test]
    fn test_breakdown_json_field_names() {
        let breakdown = TypeBreakdown::assemble(vec![row("Motor", 1000, 800)]);
        let json = serde_json::to_value(&breakdown).unwrap();
        assert_eq!(json["grandTotal"]["currentFYTotal"], "1000.00");
        assert_eq!(json["entityTypeTotals"][0]["previousFYTotal"], "800.00");
        assert_eq!(json["entityTypeTotals"][0]["percentageChange"], 25.0);
    }

    #[test]
    fn test_empty_breakdown() {
        let breakdown = TypeBreakdown::assemble(Vec::new());
        assert!(breakdown.entity_type_totals.is_empty());
        assert_eq!(breakdown.grand_total.current_fy_total, Money::zero());
        assert_eq!(breakdown.grand_total.percentage_change, 0.0);
    }
}
