//! # Transaction Repository
//!
//! Monthly commission records. Transactions are append-only apart from
//! amount corrections; nothing here deletes rows.
//!
//! ## Month Normalization
//! ```text
//! create(entity, 2024-04-17, ₹1000)
//!          │
//!          ▼
//! month stored as 2024-04-01   ← first_of_month()
//!          │
//!          ▼
//! CHECK (date(month,'start of month') = month) guards the table
//! ```

use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::{transaction_with_relations_from_row, TRANSACTION_WITH_RELATIONS_COLUMNS};
use comtrack_core::period::first_of_month;
use comtrack_core::{DateRange, EntityTransaction, Money, TransactionWithRelations};

/// Repository for transaction database operations.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    /// Creates a new TransactionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TransactionRepository { pool }
    }

    /// Records one month's commission for an entity.
    ///
    /// `month` may be any day; it is stored as the first of its month.
    ///
    /// ## Errors
    /// * `DbError::NotFound` - `entity_id` names no entity
    pub async fn create(
        &self,
        entity_id: &str,
        month: NaiveDate,
        amount: Money,
    ) -> DbResult<EntityTransaction> {
        let now = Utc::now();
        let transaction = EntityTransaction {
            id: Uuid::new_v4().to_string(),
            entity_id: entity_id.to_string(),
            month: first_of_month(month),
            amount,
            created_at: now,
            updated_at: now,
        };

        debug!(
            id = %transaction.id,
            entity_id = %transaction.entity_id,
            month = %transaction.month,
            amount = %transaction.amount,
            "Inserting transaction"
        );

        sqlx::query(
            r#"
            INSERT INTO entity_transactions (id, entity_id, month, amount, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&transaction.id)
        .bind(&transaction.entity_id)
        .bind(transaction.month)
        .bind(transaction.amount)
        .bind(transaction.created_at)
        .bind(transaction.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::ForeignKeyViolation { .. } => DbError::not_found("Entity", entity_id),
            other => other,
        })?;

        Ok(transaction)
    }

    /// Replaces the amount of an existing transaction.
    ///
    /// ## Errors
    /// * `DbError::NotFound` - no transaction with this id
    pub async fn correct_amount(&self, id: &str, amount: Money) -> DbResult<EntityTransaction> {
        let result = sqlx::query(
            r#"
            UPDATE entity_transactions
            SET amount = ?1, updated_at = ?2
            WHERE id = ?3
            "#,
        )
        .bind(amount)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Transaction", id));
        }

        info!(id = %id, amount = %amount, "Transaction amount corrected");

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Transaction", id))
    }

    /// Gets a transaction by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<EntityTransaction>> {
        let transaction = sqlx::query_as::<_, EntityTransaction>(
            r#"
            SELECT id, entity_id, month, amount, created_at, updated_at
            FROM entity_transactions
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(transaction)
    }

    /// Lists every transaction with its entity and type, newest month first.
    pub async fn list_with_relations(&self) -> DbResult<Vec<TransactionWithRelations>> {
        let sql = format!(
            r#"
            SELECT {TRANSACTION_WITH_RELATIONS_COLUMNS}
            FROM entity_transactions t
            INNER JOIN entities e ON e.id = t.entity_id
            INNER JOIN entity_types et ON et.id = e.type_id
            ORDER BY t.month DESC, t.created_at DESC
            "#
        );

        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(transaction_with_relations_from_row).collect()
    }

    /// Lists one entity's transactions, newest month first.
    pub async fn list_by_entity(&self, entity_id: &str) -> DbResult<Vec<EntityTransaction>> {
        let transactions = sqlx::query_as::<_, EntityTransaction>(
            r#"
            SELECT id, entity_id, month, amount, created_at, updated_at
            FROM entity_transactions
            WHERE entity_id = ?1
            ORDER BY month DESC, created_at DESC
            "#,
        )
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await?;

        debug!(entity_id = %entity_id, count = transactions.len(), "Listed entity transactions");
        Ok(transactions)
    }

    /// Lists transactions whose month falls inside `range`, newest first.
    pub async fn list_in_range(&self, range: DateRange) -> DbResult<Vec<TransactionWithRelations>> {
        let sql = format!(
            r#"
            SELECT {TRANSACTION_WITH_RELATIONS_COLUMNS}
            FROM entity_transactions t
            INNER JOIN entities e ON e.id = t.entity_id
            INNER JOIN entity_types et ON et.id = e.type_id
            WHERE t.month BETWEEN ?1 AND ?2
            ORDER BY t.month DESC, t.created_at DESC
            "#
        );

        let rows = sqlx::query(&sql)
            .bind(range.start)
            .bind(range.end)
            .fetch_all(&self.pool)
            .await?;

        debug!(range = %range, count = rows.len(), "Listed transactions in range");
        rows.iter().map(transaction_with_relations_from_row).collect()
    }

    /// The `limit` most recently entered transactions.
    pub async fn recent_with_relations(&self, limit: u32) -> DbResult<Vec<TransactionWithRelations>> {
        let sql = format!(
            r#"
            SELECT {TRANSACTION_WITH_RELATIONS_COLUMNS}
            FROM entity_transactions t
            INNER JOIN entities e ON e.id = t.entity_id
            INNER JOIN entity_types et ON et.id = e.type_id
            ORDER BY t.created_at DESC, t.month DESC
            LIMIT ?1
            "#
        );

        let rows = sqlx::query(&sql)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(transaction_with_relations_from_row).collect()
    }

    /// Counts transactions.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM entity_transactions")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fixtures::{self, d};

    #[tokio::test]
    async fn test_create_normalizes_month() {
        let db = fixtures::db().await;
        let motor = fixtures::entity_type(&db, "Motor").await;
        let acme = fixtures::entity(&db, "Acme", &motor.id).await;

        let created = db
            .transactions()
            .create(&acme.id, d(2024, 4, 17), Money::from_paise(10_497_624))
            .await
            .unwrap();
        assert_eq!(created.month, d(2024, 4, 1));

        let stored = db.transactions().get_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(stored.month, d(2024, 4, 1));
        assert_eq!(stored.amount, Money::from_paise(10_497_624));
    }

    #[tokio::test]
    async fn test_create_for_missing_entity() {
        let db = fixtures::db().await;

        let err = db
            .transactions()
            .create(&Uuid::new_v4().to_string(), d(2024, 4, 1), Money::from_rupees(1))
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_correct_amount() {
        let db = fixtures::db().await;
        let motor = fixtures::entity_type(&db, "Motor").await;
        let acme = fixtures::entity(&db, "Acme", &motor.id).await;
        let created = db
            .transactions()
            .create(&acme.id, d(2024, 5, 1), Money::from_rupees(500))
            .await
            .unwrap();

        let corrected = db
            .transactions()
            .correct_amount(&created.id, Money::from_rupees(450))
            .await
            .unwrap();

        assert_eq!(corrected.amount, Money::from_rupees(450));
        assert_eq!(corrected.month, created.month);
        assert!(corrected.updated_at >= created.updated_at);

        let missing = db
            .transactions()
            .correct_amount(&Uuid::new_v4().to_string(), Money::from_rupees(1))
            .await;
        assert!(matches!(missing, Err(DbError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_list_in_range_and_ordering() {
        let db = fixtures::db().await;
        let motor = fixtures::entity_type(&db, "Motor").await;
        let acme = fixtures::entity(&db, "Acme", &motor.id).await;
        fixtures::record(&db, &acme.id, d(2024, 3, 1), 100).await;
        fixtures::record(&db, &acme.id, d(2024, 4, 1), 200).await;
        fixtures::record(&db, &acme.id, d(2024, 6, 1), 300).await;
        fixtures::record(&db, &acme.id, d(2024, 7, 1), 400).await;

        let q1 = db
            .transactions()
            .list_in_range(DateRange::new(d(2024, 4, 1), d(2024, 6, 30)))
            .await
            .unwrap();
        let months: Vec<NaiveDate> = q1.iter().map(|t| t.transaction.month).collect();
        assert_eq!(months, vec![d(2024, 6, 1), d(2024, 4, 1)]);
        assert_eq!(q1[0].entity.name, "Acme");
        assert_eq!(q1[0].entity_type.name, "Motor");

        let all = db.transactions().list_with_relations().await.unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(all[0].transaction.month, d(2024, 7, 1));

        let by_entity = db.transactions().list_by_entity(&acme.id).await.unwrap();
        assert_eq!(by_entity.len(), 4);
        assert_eq!(by_entity[3].month, d(2024, 3, 1));
    }

    #[tokio::test]
    async fn test_recent_with_relations_limit() {
        let db = fixtures::db().await;
        let motor = fixtures::entity_type(&db, "Motor").await;
        let acme = fixtures::entity(&db, "Acme", &motor.id).await;
        for month in 1..=5 {
            fixtures::record(&db, &acme.id, d(2024, month, 1), 10).await;
        }

        let recent = db.transactions().recent_with_relations(3).await.unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(db.transactions().count().await.unwrap(), 5);
    }
}
