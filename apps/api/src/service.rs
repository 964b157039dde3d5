//! # Analytics Service
//!
//! Everything the HTTP layer asks for goes through here: cached period
//! statistics, dashboard payloads and the write paths that invalidate them.
//!
//! ## Period Stats Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  period_stats(Quarter, None)                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  period_cache.get("v1:commission_stats_quarter") ── hit ──► return     │
//! │       │ miss                                                            │
//! │       ▼                                                                 │
//! │  PeriodWindows::for_date(Quarter, clock.today())     (comtrack-core)   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  analytics.period_totals(&windows)  ── ONE query ──  (comtrack-db)     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  PeriodStats::assemble(&windows, &totals)            (comtrack-core)   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  period_cache.set(key, stats, generation) ──────────────────► return   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Reads that make up one response run concurrently with `tokio::try_join!`
//! and share the connection pool.

use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, info};

use comtrack_core::validation::{
    parse_month, validate_id, validate_new_entity, validate_new_entity_type,
};
use comtrack_core::{
    AnalyticsData, CommissionOverview, CoreError, EntityTransaction, EntityType, EntityWithType,
    Entity, LandingPageData, NewEntity, NewEntityTransaction, NewEntityType, PerformanceData,
    PeriodKind, PeriodStats, PeriodWindows, RecentCommissions, TransactionCorrection,
    TransactionStats, TransactionWithRelations, TransactionsData, TypeBreakdown,
    RECENT_TRANSACTION_LIMIT, TOP_PARTNER_LIMIT, TREND_MONTHS,
};
use comtrack_db::{Database, DbResult};

use crate::cache::{CacheKey, Clock, StatsCache};
use crate::config::CacheSettings;
use crate::error::ApiResult;

/// Cached analytics over the commission store.
pub struct AnalyticsService {
    db: Database,
    clock: Arc<dyn Clock>,
    overview_cache: StatsCache<CommissionOverview>,
    period_cache: StatsCache<PeriodStats>,
}

impl AnalyticsService {
    /// Creates the service with empty caches.
    pub fn new(db: Database, clock: Arc<dyn Clock>, settings: &CacheSettings) -> Self {
        info!(
            ttl_secs = settings.ttl_secs,
            capacity = settings.capacity,
            "Stats caches ready"
        );

        AnalyticsService {
            db,
            overview_cache: StatsCache::new(clock.clone(), settings.ttl(), settings.capacity),
            period_cache: StatsCache::new(clock.clone(), settings.ttl(), settings.capacity),
            clock,
        }
    }

    /// The underlying database handle.
    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Today according to the injected clock.
    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    // =========================================================================
    // Cached Aggregations
    // =========================================================================

    /// All-time total, current financial year and current month, with changes.
    pub async fn commission_overview(&self) -> DbResult<CommissionOverview> {
        let key = CacheKey::Overview;
        if let Some(cached) = self.overview_cache.get(&key).await {
            return Ok(cached);
        }
        let generation = self.overview_cache.generation();

        let today = self.today();
        let totals = self.db.analytics().overview_totals(today).await?;
        let overview = CommissionOverview::assemble(&totals);

        debug!(
            reference = %today,
            total = %overview.total_commissions,
            "Commission overview computed"
        );
        self.overview_cache.set(&key, overview.clone(), generation).await;
        Ok(overview)
    }

    /// Current vs previous vs same period last year for `kind`.
    ///
    /// `reference` defaults to today. Explicit dates are cached separately
    /// from the rolling "today" entry.
    pub async fn period_stats(
        &self,
        kind: PeriodKind,
        reference: Option<NaiveDate>,
    ) -> DbResult<PeriodStats> {
        let key = CacheKey::for_period(kind, reference);
        if let Some(cached) = self.period_cache.get(&key).await {
            return Ok(cached);
        }
        let generation = self.period_cache.generation();

        let windows = PeriodWindows::for_date(kind, reference.unwrap_or_else(|| self.today()));
        let totals = self.db.analytics().period_totals(&windows).await?;
        let stats = PeriodStats::assemble(&windows, &totals);

        debug!(
            key = %key,
            current = %windows.current,
            total = %totals.current,
            "Period stats computed"
        );
        self.period_cache.set(&key, stats.clone(), generation).await;
        Ok(stats)
    }

    // =========================================================================
    // Uncached Reads
    // =========================================================================

    /// Transactions inside the current window of `kind`.
    pub async fn transactions_for_period(
        &self,
        kind: PeriodKind,
        reference: Option<NaiveDate>,
    ) -> DbResult<Vec<TransactionWithRelations>> {
        let windows = PeriodWindows::for_date(kind, reference.unwrap_or_else(|| self.today()));
        self.db.transactions().list_in_range(windows.current).await
    }

    /// Payload of `GET /api/performance`.
    pub async fn performance(
        &self,
        kind: PeriodKind,
        reference: Option<NaiveDate>,
        custom_date: Option<String>,
    ) -> DbResult<PerformanceData> {
        let (transactions, commission_stats) = tokio::try_join!(
            self.transactions_for_period(kind, reference),
            self.period_stats(kind, reference),
        )?;

        Ok(PerformanceData {
            transactions,
            commission_stats,
            period: kind,
            custom_date,
        })
    }

    /// Latest transactions plus this financial year's per-type breakdown.
    pub async fn recent_commissions(&self) -> DbResult<RecentCommissions> {
        let transactions = self.db.transactions();
        let analytics = self.db.analytics();
        let today = self.today();

        let (recent, rows) = tokio::try_join!(
            transactions.recent_with_relations(RECENT_TRANSACTION_LIMIT),
            analytics.financial_year_type_totals(today),
        )?;

        Ok(RecentCommissions {
            transactions: recent,
            breakdown: TypeBreakdown::assemble(rows),
        })
    }

    pub async fn transaction_stats(&self) -> DbResult<TransactionStats> {
        self.db.analytics().transaction_stats().await
    }

    /// Payload of `GET /api/analytics/transactions`.
    pub async fn transactions_data(&self) -> DbResult<TransactionsData> {
        let transactions = self.db.transactions();

        let (all, stats, commission_stats, recent_commissions_data) = tokio::try_join!(
            transactions.list_with_relations(),
            self.transaction_stats(),
            self.commission_overview(),
            self.recent_commissions(),
        )?;

        Ok(TransactionsData {
            transactions: all,
            stats,
            commission_stats,
            recent_commissions_data,
        })
    }

    /// Payload of `GET /api/analytics`.
    pub async fn dashboard(&self) -> DbResult<AnalyticsData> {
        let entity_types = self.db.entity_types();
        let entities = self.db.entities();

        let (entity_types, entities, transactions) = tokio::try_join!(
            entity_types.list(),
            entities.list_with_type(),
            self.transactions_data(),
        )?;

        Ok(AnalyticsData {
            entity_types,
            entities,
            transactions,
        })
    }

    /// Payload of `GET /api/analytics/landing`.
    pub async fn landing_page(&self) -> DbResult<LandingPageData> {
        let analytics = self.db.analytics();

        let (
            summary,
            monthly_trend,
            top_partners,
            recent_transactions,
            partner_growth,
            product_type_growth,
        ) = tokio::try_join!(
            analytics.landing_summary(),
            analytics.monthly_trend(TREND_MONTHS),
            analytics.top_partners(TOP_PARTNER_LIMIT),
            analytics.recent_transactions(RECENT_TRANSACTION_LIMIT),
            analytics.partner_growth(TREND_MONTHS),
            analytics.product_type_growth(TREND_MONTHS),
        )?;

        Ok(LandingPageData {
            summary,
            monthly_trend,
            top_partners,
            recent_transactions,
            partner_growth,
            product_type_growth,
        })
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    pub async fn list_entity_types(&self) -> DbResult<Vec<EntityType>> {
        self.db.entity_types().list().await
    }

    pub async fn create_entity_type(&self, input: &NewEntityType) -> ApiResult<EntityType> {
        let input = validate_new_entity_type(input)?;
        let created = self.db.entity_types().create(&input).await?;

        info!(id = %created.id, name = %created.name, "Entity type created");
        self.invalidate().await;
        Ok(created)
    }

    pub async fn list_entities(&self) -> DbResult<Vec<EntityWithType>> {
        self.db.entities().list_with_type().await
    }

    pub async fn create_entity(&self, input: &NewEntity) -> ApiResult<Entity> {
        let input = validate_new_entity(input)?;

        if self.db.entity_types().get_by_id(&input.type_id).await?.is_none() {
            return Err(CoreError::EntityTypeNotFound(input.type_id).into());
        }

        let created = self.db.entities().create(&input).await?;

        info!(id = %created.id, type_id = %created.type_id, "Entity created");
        self.invalidate().await;
        Ok(created)
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    pub async fn create_transaction(
        &self,
        input: &NewEntityTransaction,
    ) -> ApiResult<EntityTransaction> {
        let entity_id = validate_id("entityId", &input.entity_id)?;
        let month = parse_month(&input.month)?;

        let created = self
            .db
            .transactions()
            .create(&entity_id, month, input.amount)
            .await?;

        info!(
            id = %created.id,
            entity_id = %created.entity_id,
            month = %created.month,
            "Transaction recorded"
        );
        self.invalidate().await;
        Ok(created)
    }

    pub async fn correct_transaction(
        &self,
        id: &str,
        correction: &TransactionCorrection,
    ) -> ApiResult<EntityTransaction> {
        let id = validate_id("id", id)?;
        let corrected = self
            .db
            .transactions()
            .correct_amount(&id, correction.amount)
            .await?;

        self.invalidate().await;
        Ok(corrected)
    }

    /// Transactions of one entity, newest month first.
    pub async fn entity_transactions(&self, entity_id: &str) -> ApiResult<Vec<EntityTransaction>> {
        let entity_id = validate_id("entityId", entity_id)?;

        if self.db.entities().get_by_id(&entity_id).await?.is_none() {
            return Err(CoreError::EntityNotFound(entity_id).into());
        }

        Ok(self.db.transactions().list_by_entity(&entity_id).await?)
    }

    /// Drops every cached aggregation so the next read sees new data.
    pub async fn invalidate(&self) {
        self.overview_cache.clear().await;
        self.period_cache.clear().await;
        debug!("Stats caches invalidated");
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{ManualClock, DEFAULT_TTL};
    use comtrack_core::Money;
    use comtrack_db::DbConfig;
    use std::time::Duration;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    async fn setup(today: NaiveDate) -> (AnalyticsService, Arc<ManualClock>, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let clock = Arc::new(ManualClock::new(today));
        let service = AnalyticsService::new(db, clock.clone(), &CacheSettings::default());

        let motor = service
            .create_entity_type(&NewEntityType {
                name: "Motor".into(),
            })
            .await
            .unwrap();
        let acme = service
            .create_entity(&NewEntity {
                name: "Acme".into(),
                type_id: motor.id,
            })
            .await
            .unwrap();

        (service, clock, acme.id)
    }

    /// Inserts behind the service's back so the caches are not invalidated.
    async fn record_directly(service: &AnalyticsService, entity_id: &str, month: NaiveDate, rupees: i64) {
        service
            .db()
            .transactions()
            .create(entity_id, month, Money::from_rupees(rupees))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_period_stats_served_from_cache_within_ttl() {
        let (service, clock, acme) = setup(d(2024, 6, 15)).await;
        record_directly(&service, &acme, d(2024, 6, 1), 100).await;

        let first = service.period_stats(PeriodKind::Month, None).await.unwrap();
        assert_eq!(first.current_period.total, Money::from_rupees(100));

        // New data is invisible while the cached entry is fresh
        record_directly(&service, &acme, d(2024, 6, 1), 50).await;
        clock.advance(DEFAULT_TTL - Duration::from_secs(1));
        let second = service.period_stats(PeriodKind::Month, None).await.unwrap();
        assert_eq!(second, first);

        // ...and visible once it expires
        clock.advance(Duration::from_secs(1));
        let third = service.period_stats(PeriodKind::Month, None).await.unwrap();
        assert_eq!(third.current_period.total, Money::from_rupees(150));
    }

    #[tokio::test]
    async fn test_custom_date_cached_separately() {
        let (service, _clock, acme) = setup(d(2024, 6, 15)).await;
        record_directly(&service, &acme, d(2024, 6, 1), 100).await;
        record_directly(&service, &acme, d(2024, 3, 1), 70).await;

        let rolling = service.period_stats(PeriodKind::Month, None).await.unwrap();
        let march = service
            .period_stats(PeriodKind::Month, Some(d(2024, 3, 10)))
            .await
            .unwrap();

        assert_eq!(rolling.current_period.total, Money::from_rupees(100));
        assert_eq!(march.current_period.total, Money::from_rupees(70));
        assert_eq!(march.current_period.start_date, d(2024, 3, 1));
    }

    #[tokio::test]
    async fn test_writes_invalidate_caches() {
        let (service, _clock, acme) = setup(d(2024, 6, 15)).await;

        let before = service.commission_overview().await.unwrap();
        assert_eq!(before.total_commissions, Money::zero());

        service
            .create_transaction(&NewEntityTransaction {
                entity_id: acme.clone(),
                month: "2024-06-20".into(),
                amount: Money::from_rupees(250),
            })
            .await
            .unwrap();

        let after = service.commission_overview().await.unwrap();
        assert_eq!(after.total_commissions, Money::from_rupees(250));
        assert_eq!(after.current_month.total, Money::from_rupees(250));
    }

    #[tokio::test]
    async fn test_stats_read_before_write_not_cached_after_it() {
        let (service, _clock, acme) = setup(d(2024, 6, 15)).await;
        record_directly(&service, &acme, d(2024, 6, 1), 100).await;

        // A reader misses and computes from the pre-write data...
        let key = CacheKey::Period(PeriodKind::Month);
        let generation = service.period_cache.generation();
        let windows = PeriodWindows::for_date(PeriodKind::Month, service.today());
        let totals = service.db().analytics().period_totals(&windows).await.unwrap();
        let stale = PeriodStats::assemble(&windows, &totals);

        // ...while a write commits and invalidates
        service
            .create_transaction(&NewEntityTransaction {
                entity_id: acme.clone(),
                month: "2024-06-01".into(),
                amount: Money::from_rupees(50),
            })
            .await
            .unwrap();

        assert!(!service.period_cache.set(&key, stale, generation).await);

        let stats = service.period_stats(PeriodKind::Month, None).await.unwrap();
        assert_eq!(stats.current_period.total, Money::from_rupees(150));
    }

    #[tokio::test]
    async fn test_year_scenario_through_service() {
        let (service, _clock, acme) = setup(d(2024, 6, 1)).await;
        record_directly(&service, &acme, d(2024, 4, 1), 1000).await;
        record_directly(&service, &acme, d(2023, 4, 1), 800).await;

        let data = service
            .performance(PeriodKind::Year, Some(d(2024, 6, 1)), Some("2024-06-01".into()))
            .await
            .unwrap();

        assert_eq!(data.commission_stats.current_period.total, Money::from_rupees(1000));
        assert_eq!(data.commission_stats.previous_period.total, Money::from_rupees(800));
        assert_eq!(data.commission_stats.previous_period.percentage_change, 25.0);
        assert_eq!(data.transactions.len(), 1);
        assert_eq!(data.custom_date.as_deref(), Some("2024-06-01"));
    }

    #[tokio::test]
    async fn test_validation_and_not_found() {
        let (service, _clock, acme) = setup(d(2024, 6, 1)).await;

        let err = service
            .create_entity_type(&NewEntityType { name: "  ".into() })
            .await
            .unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::ValidationError);

        let err = service
            .create_transaction(&NewEntityTransaction {
                entity_id: acme.clone(),
                month: "June".into(),
                amount: Money::from_rupees(1),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::ValidationError);

        let err = service
            .entity_transactions("00000000-0000-4000-8000-000000000000")
            .await
            .unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::NotFound);

        let err = service
            .create_entity(&NewEntity {
                name: "Orphan".into(),
                type_id: "00000000-0000-4000-8000-000000000000".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_dashboard_and_landing() {
        let (service, _clock, acme) = setup(d(2024, 6, 15)).await;
        record_directly(&service, &acme, d(2024, 5, 1), 300).await;
        record_directly(&service, &acme, d(2024, 6, 1), 200).await;

        let dashboard = service.dashboard().await.unwrap();
        assert!(!dashboard.is_empty());
        assert_eq!(dashboard.entity_types.len(), 1);
        assert_eq!(dashboard.entities.len(), 1);
        assert_eq!(dashboard.transactions.transactions.len(), 2);
        assert_eq!(dashboard.transactions.stats.transaction_count, 2);
        assert_eq!(
            dashboard
                .transactions
                .recent_commissions_data
                .breakdown
                .grand_total
                .current_fy_total,
            Money::from_rupees(500)
        );

        let landing = service.landing_page().await.unwrap();
        assert_eq!(landing.summary.total_partners, 1);
        assert_eq!(landing.monthly_trend.len(), 2);
        assert_eq!(landing.top_partners[0].name, "Acme");
        assert_eq!(landing.recent_transactions.len(), 2);
    }
}
