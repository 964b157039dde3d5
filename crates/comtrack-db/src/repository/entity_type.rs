//! # Entity Type Repository
//!
//! Product categories. Names are unique; a duplicate insert surfaces as
//! [`DbError::UniqueViolation`] carrying the rejected name.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use comtrack_core::{EntityType, NewEntityType};

/// Repository for entity type database operations.
#[derive(Debug, Clone)]
pub struct EntityTypeRepository {
    pool: SqlitePool,
}

impl EntityTypeRepository {
    /// Creates a new EntityTypeRepository.
    pub fn new(pool: SqlitePool) -> Self {
        EntityTypeRepository { pool }
    }

    /// Lists every entity type ordered by name.
    pub async fn list(&self) -> DbResult<Vec<EntityType>> {
        let types = sqlx::query_as::<_, EntityType>(
            r#"
            SELECT id, name, created_at, updated_at
            FROM entity_types
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        debug!(count = types.len(), "Listed entity types");
        Ok(types)
    }

    /// Gets an entity type by ID.
    ///
    /// ## Returns
    /// * `Ok(Some(EntityType))` - found
    /// * `Ok(None)` - no such id
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<EntityType>> {
        let entity_type = sqlx::query_as::<_, EntityType>(
            r#"
            SELECT id, name, created_at, updated_at
            FROM entity_types
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entity_type)
    }

    /// Inserts a new entity type. The input is expected to be validated.
    ///
    /// ## Errors
    /// * `DbError::UniqueViolation` - the name is already taken
    pub async fn create(&self, input: &NewEntityType) -> DbResult<EntityType> {
        let now = Utc::now();
        let entity_type = EntityType {
            id: Uuid::new_v4().to_string(),
            name: input.name.clone(),
            created_at: now,
            updated_at: now,
        };

        debug!(id = %entity_type.id, name = %entity_type.name, "Inserting entity type");

        sqlx::query(
            r#"
            INSERT INTO entity_types (id, name, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&entity_type.id)
        .bind(&entity_type.name)
        .bind(entity_type.created_at)
        .bind(entity_type.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("name", input.name.clone()),
            other => other,
        })?;

        Ok(entity_type)
    }

    /// Counts entity types.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM entity_types")
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
    async fn test_create_and_list_sorted() {
        let db = fixtures::db().await;
        let repo = db.entity_types();

        fixtures::entity_type(&db, "Motor").await;
        fixtures::entity_type(&db, "Health").await;
        fixtures::entity_type(&db, "Life").await;

        let names: Vec<String> = repo.list().await.unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["Health", "Life", "Motor"]);
        assert_eq!(repo.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected() {
        let db = fixtures::db().await;
        fixtures::entity_type(&db, "Motor").await;

        let err = db
            .entity_types()
            .create(&NewEntityType {
                name: "Motor".to_string(),
            })
            .await
            .unwrap_err();

        match err {
            DbError::UniqueViolation { field, value } => {
                assert_eq!(field, "name");
                assert_eq!(value, "Motor");
            }
            other => panic!("expected UniqueViolation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_get_by_id() {
        let db = fixtures::db().await;
        let created = fixtures::entity_type(&db, "Travel").await;

        let found = db.entity_types().get_by_id(&created.id).await.unwrap();
        assert_eq!(found.map(|t| t.name), Some("Travel".to_string()));

        let missing = db.entity_types().get_by_id(&Uuid::new_v4().to_string()).await.unwrap();
        assert!(missing.is_none());
    }
}
