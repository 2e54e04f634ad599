//! Share-link repository implementation.
//!
//! Public share links expose a read-only view of one project. The opaque
//! token leaves the server exactly once, at creation; resolution is a
//! digest lookup, and revocation is a tombstone — a revoked token is
//! indistinguishable from an unknown one.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use biblio_core::{
    CreatedShare, Entry, EntryFull, Error, Result, ShareLink, ShareRepository, SharedProjectView,
};

use crate::tokens::{mint_token, token_digest, SHARE_TOKEN_PREFIX};

/// PostgreSQL implementation of ShareRepository.
#[derive(Clone)]
pub struct PgShareRepository {
    pool: Pool<Postgres>,
}

impl PgShareRepository {
    /// Create a new PgShareRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn map_share_row(row: &sqlx::postgres::PgRow) -> ShareLink {
    ShareLink {
        id: row.get("id"),
        project_id: row.get("project_id"),
        created_at_utc: row.get("created_at_utc"),
        revoked_at: row.get("revoked_at"),
    }
}

#[async_trait]
impl ShareRepository for PgShareRepository {
    async fn create(&self, user_id: Uuid, project_id: Uuid) -> Result<CreatedShare> {
        let owned = sqlx::query("SELECT 1 FROM project WHERE id = $1 AND user_id = $2")
            .bind(project_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        if owned.is_none() {
            return Err(Error::ProjectNotFound(project_id.to_string()));
        }

        let (token, digest) = mint_token(SHARE_TOKEN_PREFIX);
        let id = Uuid::now_v7();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO share_link (id, project_id, token_digest, created_at_utc, revoked_at)
             VALUES ($1, $2, $3, $4, NULL)",
        )
        .bind(id)
        .bind(project_id)
        .bind(&digest)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(CreatedShare {
            link: ShareLink {
                id,
                project_id,
                created_at_utc: now,
                revoked_at: None,
            },
            token,
        })
    }

    async fn list_for_project(&self, user_id: Uuid, project_id: Uuid) -> Result<Vec<ShareLink>> {
        let rows = sqlx::query(
            r#"SELECT s.id, s.project_id, s.created_at_utc, s.revoked_at
               FROM share_link s
               JOIN project p ON p.id = s.project_id
               WHERE s.project_id = $1 AND p.user_id = $2
               ORDER BY s.created_at_utc DESC"#,
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(map_share_row).collect())
    }

    async fn revoke(&self, user_id: Uuid, share_id: Uuid) -> Result<()> {
        // COALESCE keeps the original revocation time on repeat calls.
        let result = sqlx::query(
            "UPDATE share_link s
             SET revoked_at = COALESCE(s.revoked_at, $3)
             FROM project p
             WHERE s.id = $1 AND p.id = s.project_id AND p.user_id = $2",
        )
        .bind(share_id)
        .bind(user_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("share link {}", share_id)));
        }
        Ok(())
    }

    async fn resolve(&self, token: &str) -> Result<Option<SharedProjectView>> {
        let digest = token_digest(token);

        let row = sqlx::query(
            r#"SELECT p.id as project_id, p.name, p.description
               FROM share_link s
               JOIN project p ON p.id = s.project_id
               WHERE s.token_digest = $1 AND s.revoked_at IS NULL"#,
        )
        .bind(&digest)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let project_id: Uuid = row.get("project_id");
        let entry_rows = sqlx::query(
            r#"SELECT * FROM entry
               WHERE project_id = $1
               ORDER BY created_at_utc DESC, id DESC"#,
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let mut entries = Vec::with_capacity(entry_rows.len());
        for entry_row in &entry_rows {
            let entry = Entry {
                id: entry_row.get("id"),
                user_id: entry_row.get("user_id"),
                project_id: entry_row.get("project_id"),
                title: entry_row.get("title"),
                authors: entry_row.get("authors"),
                created_at_utc: entry_row.get("created_at_utc"),
                updated_at_utc: entry_row.get("updated_at_utc"),
            };
            entries.push(EntryFull {
                entry,
                tags: Vec::new(),
            });
        }

        // One batch query for tag names across the shared entries.
        let ids: Vec<Uuid> = entries.iter().map(|e| e.entry.id).collect();
        if !ids.is_empty() {
            let tag_rows = sqlx::query(
                r#"SELECT et.entry_id, t.name
                   FROM entry_tag et
                   JOIN tag t ON t.id = et.tag_id
                   WHERE et.entry_id = ANY($1)
                   ORDER BY et.entry_id, t.name"#,
            )
            .bind(&ids)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

            for tag_row in tag_rows {
                let entry_id: Uuid = tag_row.get("entry_id");
                if let Some(full) = entries.iter_mut().find(|e| e.entry.id == entry_id) {
                    full.tags.push(tag_row.get("name"));
                }
            }
        }

        Ok(Some(SharedProjectView {
            project_name: row.get("name"),
            project_description: row.get("description"),
            entries,
        }))
    }
}
