//! Annotation repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use biblio_core::{
    Annotation, AnnotationRepository, CreateAnnotationRequest, Error, Result,
};

/// PostgreSQL implementation of AnnotationRepository.
#[derive(Clone)]
pub struct PgAnnotationRepository {
    pool: Pool<Postgres>,
}

impl PgAnnotationRepository {
    /// Create a new PgAnnotationRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn map_annotation_row(row: &sqlx::postgres::PgRow) -> Annotation {
    Annotation {
        id: row.get("id"),
        entry_id: row.get("entry_id"),
        user_id: row.get("user_id"),
        body: row.get("body"),
        created_at_utc: row.get("created_at_utc"),
        updated_at_utc: row.get("updated_at_utc"),
    }
}

#[async_trait]
impl AnnotationRepository for PgAnnotationRepository {
    async fn create(
        &self,
        user_id: Uuid,
        entry_id: Uuid,
        req: CreateAnnotationRequest,
    ) -> Result<Uuid> {
        if req.body.trim().is_empty() {
            return Err(Error::InvalidInput(
                "Annotation body cannot be empty".to_string(),
            ));
        }

        let id = Uuid::now_v7();
        let now = Utc::now();

        // The INSERT..SELECT guard keeps annotations on entries the caller
        // does not own from ever existing.
        let result = sqlx::query(
            "INSERT INTO annotation (id, entry_id, user_id, body, created_at_utc, updated_at_utc)
             SELECT $1, $2, $3, $4, $5, $5
             WHERE EXISTS (SELECT 1 FROM entry WHERE id = $2 AND user_id = $3)",
        )
        .bind(id)
        .bind(entry_id)
        .bind(user_id)
        .bind(&req.body)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::EntryNotFound(entry_id));
        }
        Ok(id)
    }

    async fn list_for_entry(&self, user_id: Uuid, entry_id: Uuid) -> Result<Vec<Annotation>> {
        let rows = sqlx::query(
            r#"SELECT a.*
               FROM annotation a
               JOIN entry e ON e.id = a.entry_id
               WHERE a.entry_id = $1 AND e.user_id = $2
               ORDER BY a.created_at_utc ASC"#,
        )
        .bind(entry_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(map_annotation_row).collect())
    }

    async fn update(&self, user_id: Uuid, id: Uuid, body: &str) -> Result<()> {
        if body.trim().is_empty() {
            return Err(Error::InvalidInput(
                "Annotation body cannot be empty".to_string(),
            ));
        }

        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE annotation SET body = $3, updated_at_utc = $4
             WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .bind(body)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("annotation {}", id)));
        }
        Ok(())
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM annotation WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("annotation {}", id)));
        }
        Ok(())
    }
}
