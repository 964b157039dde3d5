//! # Repository Module
//!
//! One repository per table, plus the read-only aggregation repository.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  AnalyticsService                                                      │
//! │       │                                                                 │
//! │       │  db.analytics().period_totals(&windows)                        │
//! │       ▼                                                                 │
//! │  EntityTypeRepository   list / get / create / count                    │
//! │  EntityRepository       list_with_type / list_by_type / create         │
//! │  TransactionRepository  create / correct_amount / list_* / recent      │
//! │  AnalyticsRepository    conditional sums, breakdowns, trends           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Queries are built at runtime with `sqlx::query`/`query_as`, so the crate
//! compiles without a live database or offline query data.

pub mod analytics;
pub mod entity;
pub mod entity_type;
pub mod transaction;

use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use comtrack_core::{Entity, EntityTransaction, EntityType, EntityWithType, TransactionWithRelations};

use crate::error::DbResult;

// =============================================================================
// Joined Row Mapping
// =============================================================================

/// Column list selecting a transaction with its entity and entity type.
///
/// Expects the aliases `t`, `e` and `et` for `entity_transactions`,
/// `entities` and `entity_types`.
pub(crate) const TRANSACTION_WITH_RELATIONS_COLUMNS: &str = r#"
    t.id          AS t_id,
    t.entity_id   AS t_entity_id,
    t.month       AS t_month,
    t.amount      AS t_amount,
    t.created_at  AS t_created_at,
    t.updated_at  AS t_updated_at,
    e.id          AS e_id,
    e.name        AS e_name,
    e.type_id     AS e_type_id,
    e.created_at  AS e_created_at,
    e.updated_at  AS e_updated_at,
    et.id         AS et_id,
    et.name       AS et_name,
    et.created_at AS et_created_at,
    et.updated_at AS et_updated_at
"#;

/// Column list selecting an entity with its type (aliases `e`, `et`).
pub(crate) const ENTITY_WITH_TYPE_COLUMNS: &str = r#"
    e.id          AS e_id,
    e.name        AS e_name,
    e.type_id     AS e_type_id,
    e.created_at  AS e_created_at,
    e.updated_at  AS e_updated_at,
    et.id         AS et_id,
    et.name       AS et_name,
    et.created_at AS et_created_at,
    et.updated_at AS et_updated_at
"#;

fn entity_from_row(row: &SqliteRow) -> DbResult<Entity> {
    Ok(Entity {
        id: row.try_get("e_id")?,
        name: row.try_get("e_name")?,
        type_id: row.try_get("e_type_id")?,
        created_at: row.try_get("e_created_at")?,
        updated_at: row.try_get("e_updated_at")?,
    })
}

fn entity_type_from_row(row: &SqliteRow) -> DbResult<EntityType> {
    Ok(EntityType {
        id: row.try_get("et_id")?,
        name: row.try_get("et_name")?,
        created_at: row.try_get("et_created_at")?,
        updated_at: row.try_get("et_updated_at")?,
    })
}

pub(crate) fn entity_with_type_from_row(row: &SqliteRow) -> DbResult<EntityWithType> {
    Ok(EntityWithType {
        entity: entity_from_row(row)?,
        entity_type: entity_type_from_row(row)?,
    })
}

pub(crate) fn transaction_with_relations_from_row(
    row: &SqliteRow,
) -> DbResult<TransactionWithRelations> {
    Ok(TransactionWithRelations {
        transaction: EntityTransaction {
            id: row.try_get("t_id")?,
            entity_id: row.try_get("t_entity_id")?,
            month: row.try_get("t_month")?,
            amount: row.try_get("t_amount")?,
            created_at: row.try_get("t_created_at")?,
            updated_at: row.try_get("t_updated_at")?,
        },
        entity: entity_from_row(row)?,
        entity_type: entity_type_from_row(row)?,
    })
}

// =============================================================================
// Test Fixtures
// =============================================================================
