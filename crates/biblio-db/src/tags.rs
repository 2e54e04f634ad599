//! Tag repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use biblio_core::{CreateTagRequest, Error, Result, Tag, TagRepository};

/// Validate a tag name.
///
/// Rules:
/// - Length between 1-100 characters
/// - Allowed characters: alphanumeric, hyphens (-), underscores (_), forward slashes (/)
/// - No spaces or other special characters
///
/// Returns Ok(()) if valid, Err with message if invalid.
pub fn validate_tag_name(tag: &str) -> std::result::Result<(), String> {
    if tag.is_empty() {
        return Err("Tag name cannot be empty".to_string());
    }
    if tag.len() > 100 {
        return Err("Tag name must be 100 characters or less".to_string());
    }

    let invalid_chars: Vec<char> = tag
        .chars()
        .filter(|c| !c.is_alphanumeric() && *c != '-' && *c != '_' && *c != '/')
        .collect();

    if !invalid_chars.is_empty() {
        let chars_display: String = invalid_chars
            .iter()
            .take(5)
            .map(|c| format!("'{}'", c))
            .collect::<Vec<_>>()
            .join(", ");
        return Err(format!(
            "Tag contains invalid characters: {}. Only alphanumeric characters, hyphens, underscores, and forward slashes are allowed",
            chars_display
        ));
    }

    Ok(())
}

/// PostgreSQL implementation of TagRepository.
#[derive(Clone)]
pub struct PgTagRepository {
    pool: Pool<Postgres>,
}

impl PgTagRepository {
    /// Create a new PgTagRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TagRepository for PgTagRepository {
    async fn create(&self, user_id: Uuid, req: CreateTagRequest) -> Result<Uuid> {
        validate_tag_name(&req.name).map_err(Error::InvalidInput)?;

        let id = Uuid::now_v7();
        let now = Utc::now();

        // Uniqueness is case-insensitive per user; the partial index on
        // (user_id, LOWER(name)) turns duplicates into a conflict.
        sqlx::query(
            "INSERT INTO tag (id, user_id, name, color, group_name, created_at_utc)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(id)
        .bind(user_id)
        .bind(&req.name)
        .bind(&req.color)
        .bind(&req.group_name)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Error::Conflict(format!("A tag named '{}' already exists", req.name))
            }
            _ => Error::Database(e),
        })?;

        Ok(id)
    }

    async fn list(&self, user_id: Uuid) -> Result<Vec<Tag>> {
        let rows = sqlx::query(
            r#"
            SELECT
                t.id, t.user_id, t.name, t.color, t.group_name, t.created_at_utc,
                COUNT(et.entry_id) as entry_count
            FROM tag t
            LEFT JOIN entry_tag et ON et.tag_id = t.id
            WHERE t.user_id = $1
            GROUP BY t.id
            ORDER BY t.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let tags = rows
            .into_iter()
            .map(|row| Tag {
                id: row.get("id"),
                user_id: row.get("user_id"),
                name: row.get("name"),
                color: row.get("color"),
                group_name: row.get("group_name"),
                created_at_utc: row.get("created_at_utc"),
                entry_count: row.get("entry_count"),
            })
            .collect();

        Ok(tags)
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        sqlx::query("DELETE FROM entry_tag WHERE tag_id = $1 AND EXISTS (SELECT 1 FROM tag WHERE id = $1 AND user_id = $2)")
            .bind(id)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        let result = sqlx::query("DELETE FROM tag WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::TagNotFound(id));
        }

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    async fn add_to_entry(&self, user_id: Uuid, entry_id: Uuid, tag_id: Uuid) -> Result<()> {
        let now = Utc::now();

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        // Both sides of the link must belong to the caller.
        let entry_owned = sqlx::query("SELECT 1 FROM entry WHERE id = $1 AND user_id = $2")
            .bind(entry_id)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(Error::Database)?;
        if entry_owned.is_none() {
            return Err(Error::EntryNotFound(entry_id));
        }

        let tag_owned = sqlx::query("SELECT 1 FROM tag WHERE id = $1 AND user_id = $2")
            .bind(tag_id)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(Error::Database)?;
        if tag_owned.is_none() {
            return Err(Error::TagNotFound(tag_id));
        }

        sqlx::query(
            "INSERT INTO entry_tag (entry_id, tag_id, created_at_utc) VALUES ($1, $2, $3)
             ON CONFLICT (entry_id, tag_id) DO NOTHING",
        )
        .bind(entry_id)
        .bind(tag_id)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    async fn remove_from_entry(&self, user_id: Uuid, entry_id: Uuid, tag_id: Uuid) -> Result<()> {
        sqlx::query(
            "DELETE FROM entry_tag et
             USING entry e
             WHERE et.entry_id = $1 AND et.tag_id = $2
               AND e.id = et.entry_id AND e.user_id = $3",
        )
        .bind(entry_id)
        .bind(tag_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    async fn get_for_entry(&self, user_id: Uuid, entry_id: Uuid) -> Result<Vec<String>> {
        let rows = sqlx::query(
            r#"SELECT t.name
               FROM entry_tag et
               JOIN tag t ON t.id = et.tag_id
               JOIN entry e ON e.id = et.entry_id
               WHERE et.entry_id = $1 AND e.user_id = $2
               ORDER BY t.name"#,
        )
        .bind(entry_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(|row| row.get("name")).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_tag_names() {
        for name in ["ml", "machine-learning", "stats/bayes", "q4_review"] {
            assert!(validate_tag_name(name).is_ok(), "expected '{}' valid", name);
        }
    }

    #[test]
    fn test_empty_tag_name_rejected() {
        assert!(validate_tag_name("").is_err());
    }

    #[test]
    fn test_overlong_tag_name_rejected() {
        assert!(validate_tag_name(&"x".repeat(101)).is_err());
    }

    #[test]
    fn test_tag_name_with_spaces_rejected() {
        let err = validate_tag_name("machine learning").unwrap_err();
        assert!(err.contains("invalid characters"));
    }
}
