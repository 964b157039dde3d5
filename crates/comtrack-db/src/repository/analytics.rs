//! # Analytics Repository
//!
//! Read-only aggregations over `entity_transactions`. Everything the
//! dashboard shows as a number comes from here.
//!
//! ## Conditional-Sum Aggregation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 One Round-Trip, Many Periods                            │
//! │                                                                         │
//! │  PeriodSumQuery::new()                                                 │
//! │      .sum("current",  2024-04-01..2025-03-31)                          │
//! │      .sum("previous", 2023-04-01..2024-03-31)                          │
//! │      .count_months_in(2024-04-01..2025-03-31)                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SELECT COALESCE(SUM(amount), 0)                             all_time, │
//! │         COALESCE(SUM(CASE WHEN month BETWEEN ? AND ?                   │
//! │                           THEN amount ELSE 0 END), 0)        range_0,  │
//! │         COALESCE(SUM(CASE WHEN month BETWEEN ? AND ?                   │
//! │                           THEN amount ELSE 0 END), 0)        range_1,  │
//! │         COUNT(DISTINCT CASE WHEN month BETWEEN ? AND ?                 │
//! │                             THEN month END)          months_with_data  │
//! │  FROM entity_transactions                                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  PeriodSums { all_time, "current" → ₹1000, "previous" → ₹800, 3 }     │
//! │                                                                         │
//! │  Every total is read from the same snapshot, so they can't disagree    │
//! │  under concurrent writes.                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Amounts are INTEGER paise, so SQLite sums them exactly. Range bounds are
//! bound parameters; range names never reach the SQL text.

use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use comtrack_core::stats::{OverviewTotals, TypeTotalsRow};
use comtrack_core::{
    DateRange, LandingSummary, Money, MonthlyCount, MonthlyTrendPoint, PeriodKind, PeriodTotals,
    PeriodWindows, RecentTransaction, TopPartner, TransactionStats,
};

// =============================================================================
// Query Builder
// =============================================================================

/// Renders `COALESCE(SUM(CASE WHEN <column> BETWEEN ? AND ? ...), 0) AS <alias>`.
fn conditional_sum(date_column: &str, amount_column: &str, alias: &str) -> String {
    format!(
        "COALESCE(SUM(CASE WHEN {date_column} BETWEEN ? AND ? THEN {amount_column} ELSE 0 END), 0) AS {alias}"
    )
}

/// Builder for a single conditional-sum query over named date ranges.
///
/// ## Example
/// ```rust,ignore
/// let sums = PeriodSumQuery::new()
///     .sum("current", windows.current)
///     .sum("previous", windows.previous)
///     .fetch(&pool)
///     .await?;
///
/// let change = pct_change(sums.total("current"), sums.total("previous"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct PeriodSumQuery {
    ranges: Vec<(&'static str, DateRange)>,
    month_count_range: Option<DateRange>,
}

/// Output row of a [`PeriodSumQuery`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PeriodSums {
    /// Sum over every transaction, regardless of range.
    pub all_time: Money,
    /// One total per named range, in the order they were added.
    pub totals: Vec<(&'static str, Money)>,
    /// Distinct months with data inside the counted range (0 if none requested).
    pub months_with_data: u32,
}

impl PeriodSums {
    /// Total for the named range; zero for a name that wasn't queried.
    pub fn total(&self, name: &str) -> Money {
        self.totals
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, total)| *total)
            .unwrap_or_default()
    }
}

impl PeriodSumQuery {
    /// Creates an empty query. Fetching it yields just the all-time total.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a named range to sum over.
    pub fn sum(mut self, name: &'static str, range: DateRange) -> Self {
        self.ranges.push((name, range));
        self
    }

    /// Also counts the distinct calendar months with data inside `range`.
    pub fn count_months_in(mut self, range: DateRange) -> Self {
        self.month_count_range = Some(range);
        self
    }

    /// Renders the SQL text. Placeholders are bound in range order, then
    /// the month-count range.
    pub fn sql(&self) -> String {
        let mut columns = vec!["COALESCE(SUM(amount), 0) AS all_time".to_string()];

        for index in 0..self.ranges.len() {
            columns.push(conditional_sum("month", "amount", &format!("range_{index}")));
        }

        if self.month_count_range.is_some() {
            // months are stored as the 1st, so distinct dates are distinct months
            columns.push(
                "COUNT(DISTINCT CASE WHEN month BETWEEN ? AND ? THEN month END) AS months_with_data"
                    .to_string(),
            );
        }

        format!("SELECT {} FROM entity_transactions", columns.join(", "))
    }

    /// Executes the query in one round-trip.
    pub async fn fetch(&self, pool: &SqlitePool) -> DbResult<PeriodSums> {
        let sql = self.sql();
        let mut query = sqlx::query(&sql);

        for (_, range) in &self.ranges {
            query = query.bind(range.start).bind(range.end);
        }
        if let Some(range) = self.month_count_range {
            query = query.bind(range.start).bind(range.end);
        }

        let row = query.fetch_one(pool).await?;

        let mut totals = Vec::with_capacity(self.ranges.len());
        for (index, (name, _)) in self.ranges.iter().enumerate() {
            totals.push((*name, money(&row, &format!("range_{index}"))?));
        }

        let months_with_data = if self.month_count_range.is_some() {
            let count: i64 = row.try_get("months_with_data")?;
            u32::try_from(count).unwrap_or(u32::MAX)
        } else {
            0
        };

        let sums = PeriodSums {
            all_time: money(&row, "all_time")?,
            totals,
            months_with_data,
        };

        debug!(
            ranges = self.ranges.len(),
            all_time = %sums.all_time,
            months_with_data = sums.months_with_data,
            "Period sums fetched"
        );
        Ok(sums)
    }
}

fn money(row: &SqliteRow, column: &str) -> DbResult<Money> {
    Ok(Money::from_paise(row.try_get::<i64, _>(column)?))
}

// =============================================================================
// Analytics Repository
// =============================================================================

/// Repository for dashboard aggregations.
#[derive(Debug, Clone)]
pub struct AnalyticsRepository {
    pool: SqlitePool,
}

impl AnalyticsRepository {
    /// Creates a new AnalyticsRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AnalyticsRepository { pool }
    }

    /// Totals for the three windows of a period plus the all-time total.
    pub async fn period_totals(&self, windows: &PeriodWindows) -> DbResult<PeriodTotals> {
        let sums = PeriodSumQuery::new()
            .sum("current", windows.current)
            .sum("previous", windows.previous)
            .sum("same_period_last_year", windows.same_period_last_year)
            .fetch(&self.pool)
            .await?;

        Ok(PeriodTotals {
            all_time: sums.all_time,
            current: sums.total("current"),
            previous: sums.total("previous"),
            same_period_last_year: sums.total("same_period_last_year"),
        })
    }

    /// The all-time / financial year / month triad for `reference`.
    pub async fn overview_totals(&self, reference: NaiveDate) -> DbResult<OverviewTotals> {
        let year = PeriodWindows::for_date(PeriodKind::Year, reference);
        let month = PeriodWindows::for_date(PeriodKind::Month, reference);

        let sums = PeriodSumQuery::new()
            .sum("current_financial_year", year.current)
            .sum("previous_financial_year", year.previous)
            .sum("current_month", month.current)
            .sum("same_month_last_year", month.same_period_last_year)
            .count_months_in(year.current)
            .fetch(&self.pool)
            .await?;

        Ok(OverviewTotals {
            all_time: sums.all_time,
            current_financial_year: sums.total("current_financial_year"),
            previous_financial_year: sums.total("previous_financial_year"),
            current_month: sums.total("current_month"),
            same_month_last_year: sums.total("same_month_last_year"),
            financial_year_months: sums.months_with_data,
        })
    }

    /// Per entity type totals for two ranges in one grouped query.
    ///
    /// Every entity type appears, including those without transactions.
    /// Rows are ordered by type name.
    pub async fn type_totals(
        &self,
        current: DateRange,
        previous: DateRange,
    ) -> DbResult<Vec<TypeTotalsRow>> {
        let sql = format!(
            r#"
            SELECT
                et.id   AS entity_type_id,
                et.name AS entity_type_name,
                {},
                {}
            FROM entity_types et
            LEFT JOIN entities e ON e.type_id = et.id
            LEFT JOIN entity_transactions t ON t.entity_id = e.id
            GROUP BY et.id, et.name
            ORDER BY et.name
            "#,
            conditional_sum("t.month", "t.amount", "current_total"),
            conditional_sum("t.month", "t.amount", "previous_total"),
        );

        let rows = sqlx::query(&sql)
            .bind(current.start)
            .bind(current.end)
            .bind(previous.start)
            .bind(previous.end)
            .fetch_all(&self.pool)
            .await?;

        let totals = rows
            .iter()
            .map(|row| {
                Ok(TypeTotalsRow {
                    entity_type_id: row.try_get("entity_type_id")?,
                    entity_type_name: row.try_get("entity_type_name")?,
                    current_total: money(row, "current_total")?,
                    previous_total: money(row, "previous_total")?,
                })
            })
            .collect::<DbResult<Vec<_>>>()?;

        debug!(types = totals.len(), current = %current, previous = %previous, "Type totals fetched");
        Ok(totals)
    }

    /// Per entity type totals for the financial year containing `reference`
    /// against the one before it.
    pub async fn financial_year_type_totals(&self, reference: NaiveDate) -> DbResult<Vec<TypeTotalsRow>> {
        let year = PeriodWindows::for_date(PeriodKind::Year, reference);
        self.type_totals(year.current, year.previous).await
    }

    /// Sum, count, mean, max and min over every transaction.
    pub async fn transaction_stats(&self) -> DbResult<TransactionStats> {
        let row = sqlx::query(
            r#"
            SELECT
                COALESCE(SUM(amount), 0) AS total_amount,
                COUNT(*)                 AS transaction_count,
                COALESCE(MAX(amount), 0) AS max_amount,
                COALESCE(MIN(amount), 0) AS min_amount
            FROM entity_transactions
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let total_amount = money(&row, "total_amount")?;
        let transaction_count: i64 = row.try_get("transaction_count")?;

        Ok(TransactionStats {
            total_amount,
            transaction_count,
            average_amount: total_amount.divide_round(clamp_count(transaction_count)),
            max_amount: money(&row, "max_amount")?,
            min_amount: money(&row, "min_amount")?,
        })
    }

    /// Headline counts for the landing page.
    pub async fn landing_summary(&self) -> DbResult<LandingSummary> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COALESCE(SUM(amount), 0) FROM entity_transactions) AS total_commissions,
                (SELECT COUNT(*) FROM entity_transactions)                AS transaction_count,
                (SELECT COUNT(*) FROM entities)                           AS total_partners,
                (SELECT COUNT(*) FROM entity_types)                       AS total_product_types
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let total_commissions = money(&row, "total_commissions")?;
        let transaction_count: i64 = row.try_get("transaction_count")?;

        Ok(LandingSummary {
            total_commissions,
            total_partners: row.try_get("total_partners")?,
            total_product_types: row.try_get("total_product_types")?,
            avg_commission_per_transaction: total_commissions
                .divide_round(clamp_count(transaction_count)),
        })
    }

    /// Totals of the latest `months` months that have data, oldest first.
    pub async fn monthly_trend(&self, months: u32) -> DbResult<Vec<MonthlyTrendPoint>> {
        let rows = sqlx::query(
            r#"
            SELECT month, SUM(amount) AS total
            FROM entity_transactions
            GROUP BY month
            ORDER BY month DESC
            LIMIT ?1
            "#,
        )
        .bind(i64::from(months))
        .fetch_all(&self.pool)
        .await?;

        let mut trend = rows
            .iter()
            .map(|row| {
                Ok(MonthlyTrendPoint {
                    month: row.try_get("month")?,
                    total: money(row, "total")?,
                })
            })
            .collect::<DbResult<Vec<_>>>()?;

        trend.reverse();
        Ok(trend)
    }

    /// Partners ranked by lifetime commission, highest first.
    pub async fn top_partners(&self, limit: u32) -> DbResult<Vec<TopPartner>> {
        let rows = sqlx::query(
            r#"
            SELECT e.id, e.name, SUM(t.amount) AS total_commission
            FROM entities e
            INNER JOIN entity_transactions t ON t.entity_id = e.id
            GROUP BY e.id, e.name
            ORDER BY total_commission DESC, e.name
            LIMIT ?1
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(TopPartner {
                    id: row.try_get("id")?,
                    name: row.try_get("name")?,
                    total_commission: money(row, "total_commission")?,
                })
            })
            .collect()
    }

    /// The `limit` most recently entered transactions with partner names.
    pub async fn recent_transactions(&self, limit: u32) -> DbResult<Vec<RecentTransaction>> {
        let rows = sqlx::query(
            r#"
            SELECT
                t.id,
                t.entity_id,
                e.name    AS entity_name,
                e.type_id AS entity_type_id,
                t.month,
                t.amount,
                t.created_at
            FROM entity_transactions t
            INNER JOIN entities e ON e.id = t.entity_id
            ORDER BY t.created_at DESC, t.month DESC
            LIMIT ?1
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(RecentTransaction {
                    id: row.try_get("id")?,
                    entity_id: row.try_get("entity_id")?,
                    entity_name: row.try_get("entity_name")?,
                    entity_type_id: row.try_get("entity_type_id")?,
                    month: row.try_get("month")?,
                    amount: money(row, "amount")?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }

    /// Partners created per calendar month, latest `months` months, oldest first.
    pub async fn partner_growth(&self, months: u32) -> DbResult<Vec<MonthlyCount>> {
        self.created_per_month("entities", months).await
    }

    /// Entity types created per calendar month, latest `months` months, oldest first.
    pub async fn product_type_growth(&self, months: u32) -> DbResult<Vec<MonthlyCount>> {
        self.created_per_month("entity_types", months).await
    }

    async fn created_per_month(&self, table: &'static str, months: u32) -> DbResult<Vec<MonthlyCount>> {
        let sql = format!(
            r#"
            SELECT date(created_at, 'start of month') AS month, COUNT(*) AS count
            FROM {table}
            GROUP BY date(created_at, 'start of month')
            ORDER BY month DESC
            LIMIT ?1
            "#
        );

        let rows = sqlx::query(&sql)
            .bind(i64::from(months))
            .fetch_all(&self.pool)
            .await?;

        let mut growth = rows
            .iter()
            .map(|row| {
                Ok(MonthlyCount {
                    month: row.try_get("month")?,
                    count: row.try_get("count")?,
                })
            })
            .collect::<DbResult<Vec<_>>>()?;

        growth.reverse();
        Ok(growth)
    }
}

fn clamp_count(count: i64) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}

// =============================================================================
// Unit Tests
// =============================================================================
