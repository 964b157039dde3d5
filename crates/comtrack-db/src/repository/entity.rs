//! # Entity Repository
//!
//! Commission-paying partners. Each entity belongs to exactly one entity
//! type; inserting under an unknown type fails with
//! [`DbError::NotFound`].

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::{entity_with_type_from_row, ENTITY_WITH_TYPE_COLUMNS};
use comtrack_core::{Entity, EntityWithType, NewEntity};

/// Repository for entity database operations.
#[derive(Debug, Clone)]
pub struct EntityRepository {
    pool: SqlitePool,
}

impl EntityRepository {
    /// Creates a new EntityRepository.
    pub fn new(pool: SqlitePool) -> Self {
        EntityRepository { pool }
    }

    /// Lists every entity with its type, ordered by entity name.
    pub async fn list_with_type(&self) -> DbResult<Vec<EntityWithType>> {
        let sql = format!(
            r#"
            SELECT {ENTITY_WITH_TYPE_COLUMNS}
            FROM entities e
            INNER JOIN entity_types et ON et.id = e.type_id
            ORDER BY e.name
            "#
        );

        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        let entities = rows
            .iter()
            .map(entity_with_type_from_row)
            .collect::<DbResult<Vec<_>>>()?;

        debug!(count = entities.len(), "Listed entities");
        Ok(entities)
    }

    /// Lists the entities of one type, ordered by name.
    pub async fn list_by_type(&self, type_id: &str) -> DbResult<Vec<Entity>> {
        let entities = sqlx::query_as::<_, Entity>(
            r#"
            SELECT id, name, type_id, created_at, updated_at
            FROM entities
            WHERE type_id = ?1
            ORDER BY name
            "#,
        )
        .bind(type_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entities)
    }

    /// Gets an entity by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Entity>> {
        let entity = sqlx::query_as::<_, Entity>(
            r#"
            SELECT id, name, type_id, created_at, updated_at
            FROM entities
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entity)
    }

    /// Inserts a new entity. The input is expected to be validated.
    ///
    /// ## Errors
    /// * `DbError::NotFound` - `type_id` names no entity type
    pub async fn create(&self, input: &NewEntity) -> DbResult<Entity> {
        let now = Utc::now();
        let entity = Entity {
            id: Uuid::new_v4().to_string(),
            name: input.name.clone(),
            type_id: input.type_id.clone(),
            created_at: now,
            updated_at: now,
        };

        debug!(id = %entity.id, type_id = %entity.type_id, "Inserting entity");

        sqlx::query(
            r#"
            INSERT INTO entities (id, name, type_id, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&entity.id)
        .bind(&entity.name)
        .bind(&entity.type_id)
        .bind(entity.created_at)
        .bind(entity.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::ForeignKeyViolation { .. } => {
                DbError::not_found("Entity type", input.type_id.clone())
            }
            other => other,
        })?;

        Ok(entity)
    }

    /// Counts entities.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM entities")
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
    use crate::repository::fixtures;

    #[tokio::test]
    async fn test_list_with_type() {
        let db = fixtures::db().await;
        let motor = fixtures::entity_type(&db, "Motor").await;
        let life = fixtures::entity_type(&db, "Life").await;
        fixtures::entity(&db, "Zenith Motors", &motor.id).await;
        fixtures::entity(&db, "Acme Life", &life.id).await;

        let entities = db.entities().list_with_type().await.unwrap();

        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].entity.name, "Acme Life");
        assert_eq!(entities[0].entity_type.name, "Life");
        assert_eq!(entities[1].entity.name, "Zenith Motors");
        assert_eq!(entities[1].entity_type.id, motor.id);
    }

    #[tokio::test]
    async fn test_list_by_type() {
        let db = fixtures::db().await;
        let motor = fixtures::entity_type(&db, "Motor").await;
        let life = fixtures::entity_type(&db, "Life").await;
        fixtures::entity(&db, "B Motors", &motor.id).await;
        fixtures::entity(&db, "A Motors", &motor.id).await;
        fixtures::entity(&db, "Acme Life", &life.id).await;

        let names: Vec<String> = db
            .entities()
            .list_by_type(&motor.id)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();

        assert_eq!(names, vec!["A Motors", "B Motors"]);
        assert_eq!(db.entities().count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_create_under_missing_type() {
        let db = fixtures::db().await;
        let missing = Uuid::new_v4().to_string();

        let err = db
            .entities()
            .create(&NewEntity {
                name: "Orphan".to_string(),
                type_id: missing.clone(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::NotFound { ref id, .. } if *id == missing));
    }
}
