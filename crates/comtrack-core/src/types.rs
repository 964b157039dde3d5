//! # Domain Types
//!
//! Records stored by the database layer and the read models served to the
//! dashboard.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────────┐   │
//! │  │   EntityType    │   │     Entity      │   │  EntityTransaction  │   │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────────  │   │
//! │  │  id (UUID)      │◄──│  type_id (FK)   │◄──│  entity_id (FK)     │   │
//! │  │  name (unique)  │   │  id (UUID)      │   │  month (1st of mo.) │   │
//! │  │  "Motor"        │   │  name "Acme"    │   │  amount (Money)     │   │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────────┘   │
//! │                                                                         │
//! │  Read models: TransactionStats, LandingSummary, MonthlyTrendPoint,     │
//! │               TopPartner, RecentCommissions, PerformanceData, ...      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! An *entity* is a commission-paying partner; its *entity type* is the
//! product category used for breakdown grouping.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::period::PeriodKind;
use crate::stats::{CommissionOverview, PeriodStats, TypeBreakdown};

// =============================================================================
// Stored Records
// =============================================================================

/// A product category that partners belong to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct EntityType {
    /// Unique identifier (UUID v4).
    pub id: String,
    /// Unique display name.
    pub name: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A commission-paying partner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Entity {
    pub id: String,
    pub name: String,
    /// The entity type this partner is grouped under.
    pub type_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// One month's commission from one partner.
///
/// `month` is always the first day of its calendar month. Records are never
/// deleted; the amount may be corrected after the fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct EntityTransaction {
    pub id: String,
    pub entity_id: String,
    #[ts(as = "String")]
    pub month: NaiveDate,
    #[ts(as = "String")]
    pub amount: Money,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// An entity joined with its type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct EntityWithType {
    pub entity: Entity,
    pub entity_type: EntityType,
}

/// A transaction joined with its entity and entity type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TransactionWithRelations {
    pub transaction: EntityTransaction,
    pub entity: Entity,
    pub entity_type: EntityType,
}

// =============================================================================
// Requests
// =============================================================================

/// Body of `POST /api/analytics/entity-types`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewEntityType {
    pub name: String,
}

/// Body of `POST /api/analytics/entities`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewEntity {
    pub name: String,
    pub type_id: String,
}

/// Body of `POST /api/analytics/transactions`.
///
/// `month` accepts `YYYY-MM-DD` (any day, normalized to the 1st) or `YYYY-MM`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewEntityTransaction {
    pub entity_id: String,
    pub month: String,
    #[ts(as = "String")]
    pub amount: Money,
}

/// Body of `PATCH /api/analytics/transactions/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TransactionCorrection {
    #[ts(as = "String")]
    pub amount: Money,
}

// =============================================================================
// Read Models
// =============================================================================

/// Aggregate figures over every transaction.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TransactionStats {
    #[ts(as = "String")]
    pub total_amount: Money,
    pub transaction_count: i64,
    #[ts(as = "String")]
    pub average_amount: Money,
    #[ts(as = "String")]
    pub max_amount: Money,
    #[ts(as = "String")]
    pub min_amount: Money,
}

/// Summary cards on the landing page.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LandingSummary {
    #[ts(as = "String")]
    pub total_commissions: Money,
    pub total_partners: i64,
    pub total_product_types: i64,
    #[ts(as = "String")]
    pub avg_commission_per_transaction: Money,
}

/// Commission total of one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct MonthlyTrendPoint {
    #[ts(as = "String")]
    pub month: NaiveDate,
    #[ts(as = "String")]
    pub total: Money,
}

/// Number of records created in one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct MonthlyCount {
    #[ts(as = "String")]
    pub month: NaiveDate,
    pub count: i64,
}

/// A partner ranked by lifetime commission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TopPartner {
    pub id: String,
    pub name: String,
    #[ts(as = "String")]
    pub total_commission: Money,
}

/// Latest transactions with the owning partner's name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RecentTransaction {
    pub id: String,
    pub entity_id: String,
    pub entity_name: String,
    pub entity_type_id: String,
    #[ts(as = "String")]
    pub month: NaiveDate,
    #[ts(as = "String")]
    pub amount: Money,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Latest transactions plus the financial year breakdown by entity type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RecentCommissions {
    pub transactions: Vec<TransactionWithRelations>,
    #[serde(flatten)]
    pub breakdown: TypeBreakdown,
}

// =============================================================================
// Response Payloads
// =============================================================================

/// `GET /api/analytics/transactions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TransactionsData {
    pub transactions: Vec<TransactionWithRelations>,
    pub stats: TransactionStats,
    pub commission_stats: CommissionOverview,
    pub recent_commissions_data: RecentCommissions,
}

/// `GET /api/analytics`: everything the analytics page renders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AnalyticsData {
    pub entity_types: Vec<EntityType>,
    pub entities: Vec<EntityWithType>,
    #[serde(flatten)]
    pub transactions: TransactionsData,
}

/// `GET /api/analytics/landing`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LandingPageData {
    pub summary: LandingSummary,
    pub monthly_trend: Vec<MonthlyTrendPoint>,
    pub top_partners: Vec<TopPartner>,
    pub recent_transactions: Vec<RecentTransaction>,
    pub partner_growth: Vec<MonthlyCount>,
    pub product_type_growth: Vec<MonthlyCount>,
}

/// `GET /api/performance`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PerformanceData {
    pub transactions: Vec<TransactionWithRelations>,
    pub commission_stats: PeriodStats,
    pub period: PeriodKind,
    /// The `date` query parameter exactly as supplied, if any.
    pub custom_date: Option<String>,
}

impl AnalyticsData {
    /// True when nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.entity_types.is_empty()
            && self.entities.is_empty()
            && self.transactions.transactions.is_empty()
            && self.transactions.stats.transaction_count == 0
    }
}
