//! Project repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use biblio_core::{
    CreateProjectRequest, Error, Project, ProjectRef, ProjectRepository, Result,
    UpdateProjectRequest,
};

/// Validate a project slug.
///
/// Rules:
/// - Length between 1-64 characters
/// - Allowed characters: lowercase alphanumeric and hyphens
/// - Must not parse as a UUID (slugs and ids share a URL segment)
pub fn validate_slug(slug: &str) -> std::result::Result<(), String> {
    if slug.is_empty() {
        return Err("Slug cannot be empty".to_string());
    }
    if slug.len() > 64 {
        return Err("Slug must be 64 characters or less".to_string());
    }
    if !slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(
            "Slug may only contain lowercase letters, digits, and hyphens".to_string(),
        );
    }
    if Uuid::parse_str(slug).is_ok() {
        return Err("Slug must not be a UUID".to_string());
    }
    Ok(())
}

/// PostgreSQL implementation of ProjectRepository.
#[derive(Clone)]
pub struct PgProjectRepository {
    pool: Pool<Postgres>,
}

impl PgProjectRepository {
    /// Create a new PgProjectRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn map_project_row(row: &sqlx::postgres::PgRow) -> Project {
    Project {
        id: row.get("id"),
        user_id: row.get("user_id"),
        slug: row.get("slug"),
        name: row.get("name"),
        description: row.get("description"),
        created_at_utc: row.get("created_at_utc"),
        updated_at_utc: row.get("updated_at_utc"),
        entry_count: row.get("entry_count"),
    }
}

#[async_trait]
impl ProjectRepository for PgProjectRepository {
    async fn create(&self, user_id: Uuid, req: CreateProjectRequest) -> Result<Uuid> {
        validate_slug(&req.slug).map_err(Error::InvalidInput)?;

        let id = Uuid::now_v7();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO project (id, user_id, slug, name, description, created_at_utc, updated_at_utc)
             VALUES ($1, $2, $3, $4, $5, $6, $6)",
        )
        .bind(id)
        .bind(user_id)
        .bind(&req.slug)
        .bind(&req.name)
        .bind(&req.description)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Error::Conflict(format!("A project with slug '{}' already exists", req.slug))
            }
            _ => Error::Database(e),
        })?;

        Ok(id)
    }

    async fn fetch(&self, user_id: Uuid, project: &ProjectRef) -> Result<Project> {
        // Explicit two-variant dispatch: one parameterized query per
        // reference kind, no dynamic where-clause assembly.
        let row = match project {
            ProjectRef::Id(id) => {
                sqlx::query(
                    r#"SELECT p.*, COUNT(e.id) as entry_count
                       FROM project p
                       LEFT JOIN entry e ON e.project_id = p.id
                       WHERE p.id = $1 AND p.user_id = $2
                       GROUP BY p.id"#,
                )
                .bind(id)
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
            }
            ProjectRef::Slug(slug) => {
                sqlx::query(
                    r#"SELECT p.*, COUNT(e.id) as entry_count
                       FROM project p
                       LEFT JOIN entry e ON e.project_id = p.id
                       WHERE p.slug = $1 AND p.user_id = $2
                       GROUP BY p.id"#,
                )
                .bind(slug)
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
            }
        }
        .map_err(Error::Database)?;

        row.map(|r| map_project_row(&r))
            .ok_or_else(|| Error::ProjectNotFound(project.to_string()))
    }

    async fn list(&self, user_id: Uuid) -> Result<Vec<Project>> {
        let rows = sqlx::query(
            r#"SELECT p.*, COUNT(e.id) as entry_count
               FROM project p
               LEFT JOIN entry e ON e.project_id = p.id
               WHERE p.user_id = $1
               GROUP BY p.id
               ORDER BY p.created_at_utc DESC"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(map_project_row).collect())
    }

    async fn update(
        &self,
        user_id: Uuid,
        project: &ProjectRef,
        req: UpdateProjectRequest,
    ) -> Result<()> {
        let now = Utc::now();
        let result = match project {
            ProjectRef::Id(id) => {
                sqlx::query(
                    "UPDATE project
                     SET name = COALESCE($3, name),
                         description = COALESCE($4, description),
                         updated_at_utc = $5
                     WHERE id = $1 AND user_id = $2",
                )
                .bind(id)
                .bind(user_id)
                .bind(&req.name)
                .bind(&req.description)
                .bind(now)
                .execute(&self.pool)
                .await
            }
            ProjectRef::Slug(slug) => {
                sqlx::query(
                    "UPDATE project
                     SET name = COALESCE($3, name),
                         description = COALESCE($4, description),
                         updated_at_utc = $5
                     WHERE slug = $1 AND user_id = $2",
                )
                .bind(slug)
                .bind(user_id)
                .bind(&req.name)
                .bind(&req.description)
                .bind(now)
                .execute(&self.pool)
                .await
            }
        }
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::ProjectNotFound(project.to_string()));
        }
        Ok(())
    }

    async fn delete(&self, user_id: Uuid, project: &ProjectRef) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        // Resolve the reference to a concrete id inside the transaction.
        let row = match project {
            ProjectRef::Id(id) => {
                sqlx::query("SELECT id FROM project WHERE id = $1 AND user_id = $2")
                    .bind(id)
                    .bind(user_id)
                    .fetch_optional(&mut *tx)
                    .await
            }
            ProjectRef::Slug(slug) => {
                sqlx::query("SELECT id FROM project WHERE slug = $1 AND user_id = $2")
                    .bind(slug)
                    .bind(user_id)
                    .fetch_optional(&mut *tx)
                    .await
            }
        }
        .map_err(Error::Database)?;

        let project_id: Uuid = row
            .map(|r| r.get("id"))
            .ok_or_else(|| Error::ProjectNotFound(project.to_string()))?;

        // Entries survive project deletion with their project cleared;
        // share links do not outlive the project they expose.
        sqlx::query("UPDATE entry SET project_id = NULL WHERE project_id = $1")
            .bind(project_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        sqlx::query("DELETE FROM share_link WHERE project_id = $1")
            .bind(project_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        sqlx::query("DELETE FROM project WHERE id = $1")
            .bind(project_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_slugs() {
        for slug in ["thesis", "thesis-sources", "a", "ml-2026"] {
            assert!(validate_slug(slug).is_ok(), "expected '{}' valid", slug);
        }
    }

    #[test]
    fn test_invalid_slugs() {
        assert!(validate_slug("").is_err());
        assert!(validate_slug("Has Caps").is_err());
        assert!(validate_slug("under_score").is_err());
        assert!(validate_slug(&"x".repeat(65)).is_err());
    }

    #[test]
    fn test_uuid_slug_is_rejected() {
        let id = Uuid::new_v4().to_string();
        assert!(validate_slug(&id).is_err());
    }
}
