//! Entry repository implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use biblio_core::{
    CreateEntryRequest, Entry, EntryFull, EntryRepository, Error, ListEntriesRequest,
    ListEntriesResponse, Result, UpdateEntryRequest,
};

/// PostgreSQL implementation of EntryRepository.
#[derive(Clone)]
pub struct PgEntryRepository {
    pool: Pool<Postgres>,
}

impl PgEntryRepository {
    /// Create a new PgEntryRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Tag names for a batch of entries in one query, keyed by entry id.
    async fn tag_names_for(&self, entry_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<String>>> {
        if entry_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query(
            r#"SELECT et.entry_id, t.name
               FROM entry_tag et
               JOIN tag t ON t.id = et.tag_id
               WHERE et.entry_id = ANY($1)
               ORDER BY et.entry_id, t.name"#,
        )
        .bind(entry_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let mut map: HashMap<Uuid, Vec<String>> = HashMap::new();
        for row in rows {
            let entry_id: Uuid = row.get("entry_id");
            map.entry(entry_id).or_default().push(row.get("name"));
        }
        Ok(map)
    }
}

fn map_entry_row(row: &sqlx::postgres::PgRow) -> Entry {
    Entry {
        id: row.get("id"),
        user_id: row.get("user_id"),
        project_id: row.get("project_id"),
        title: row.get("title"),
        authors: row.get("authors"),
        created_at_utc: row.get("created_at_utc"),
        updated_at_utc: row.get("updated_at_utc"),
    }
}

#[async_trait]
impl EntryRepository for PgEntryRepository {
    async fn insert(&self, user_id: Uuid, req: CreateEntryRequest) -> Result<Uuid> {
        if req.title.trim().is_empty() {
            return Err(Error::InvalidInput("Entry title cannot be empty".to_string()));
        }

        let id = Uuid::now_v7();
        let now = Utc::now();

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        // The project, when given, must belong to the same user.
        if let Some(project_id) = req.project_id {
            let owned = sqlx::query("SELECT 1 FROM project WHERE id = $1 AND user_id = $2")
                .bind(project_id)
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(Error::Database)?;
            if owned.is_none() {
                return Err(Error::ProjectNotFound(project_id.to_string()));
            }
        }

        sqlx::query(
            "INSERT INTO entry (id, user_id, project_id, title, authors, created_at_utc, updated_at_utc)
             VALUES ($1, $2, $3, $4, $5, $6, $6)",
        )
        .bind(id)
        .bind(user_id)
        .bind(req.project_id)
        .bind(&req.title)
        .bind(&req.authors)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        for tag_id in req.tags.unwrap_or_default() {
            let result = sqlx::query(
                "INSERT INTO entry_tag (entry_id, tag_id, created_at_utc)
                 SELECT $1, $2, $3
                 WHERE EXISTS (SELECT 1 FROM tag WHERE id = $2 AND user_id = $4)
                 ON CONFLICT (entry_id, tag_id) DO NOTHING",
            )
            .bind(id)
            .bind(tag_id)
            .bind(now)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

            if result.rows_affected() == 0 {
                return Err(Error::TagNotFound(tag_id));
            }
        }

        tx.commit().await.map_err(Error::Database)?;
        Ok(id)
    }

    async fn fetch(&self, user_id: Uuid, id: Uuid) -> Result<EntryFull> {
        let row = sqlx::query("SELECT * FROM entry WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?
            .ok_or(Error::EntryNotFound(id))?;

        let entry = map_entry_row(&row);
        let mut tags = self.tag_names_for(&[id]).await?;

        Ok(EntryFull {
            entry,
            tags: tags.remove(&id).unwrap_or_default(),
        })
    }

    async fn list(&self, user_id: Uuid, req: ListEntriesRequest) -> Result<ListEntriesResponse> {
        let limit = req.limit.unwrap_or(50).clamp(1, 500);
        let offset = req.offset.unwrap_or(0).max(0);

        // Explicit two-variant dispatch on the optional project filter.
        let rows = match req.project_id {
            Some(project_id) => {
                sqlx::query(
                    r#"SELECT *, COUNT(*) OVER() as total
                       FROM entry
                       WHERE user_id = $1 AND project_id = $2
                       ORDER BY created_at_utc DESC, id DESC
                       LIMIT $3 OFFSET $4"#,
                )
                .bind(user_id)
                .bind(project_id)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(
                    r#"SELECT *, COUNT(*) OVER() as total
                       FROM entry
                       WHERE user_id = $1
                       ORDER BY created_at_utc DESC, id DESC
                       LIMIT $2 OFFSET $3"#,
                )
                .bind(user_id)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(Error::Database)?;

        let total: i64 = rows.first().map(|r| r.get("total")).unwrap_or(0);
        let entries: Vec<Entry> = rows.iter().map(map_entry_row).collect();
        let ids: Vec<Uuid> = entries.iter().map(|e| e.id).collect();
        let mut tags = self.tag_names_for(&ids).await?;

        Ok(ListEntriesResponse {
            entries: entries
                .into_iter()
                .map(|entry| {
                    let entry_tags = tags.remove(&entry.id).unwrap_or_default();
                    EntryFull {
                        entry,
                        tags: entry_tags,
                    }
                })
                .collect(),
            total,
        })
    }

    async fn update(&self, user_id: Uuid, id: Uuid, req: UpdateEntryRequest) -> Result<()> {
        if let Some(title) = &req.title {
            if title.trim().is_empty() {
                return Err(Error::InvalidInput("Entry title cannot be empty".to_string()));
            }
        }

        let now = Utc::now();
        let (set_project, new_project) = match req.project_id {
            Some(project_id) => (true, project_id),
            None => (false, None),
        };

        if let (true, Some(project_id)) = (set_project, new_project) {
            let owned = sqlx::query("SELECT 1 FROM project WHERE id = $1 AND user_id = $2")
                .bind(project_id)
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(Error::Database)?;
            if owned.is_none() {
                return Err(Error::ProjectNotFound(project_id.to_string()));
            }
        }

        let result = sqlx::query(
            "UPDATE entry
             SET title = COALESCE($3, title),
                 authors = COALESCE($4, authors),
                 project_id = CASE WHEN $5 THEN $6 ELSE project_id END,
                 updated_at_utc = $7
             WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .bind(&req.title)
        .bind(&req.authors)
        .bind(set_project)
        .bind(new_project)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::EntryNotFound(id));
        }
        Ok(())
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let owned = sqlx::query("SELECT 1 FROM entry WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(Error::Database)?;
        if owned.is_none() {
            return Err(Error::EntryNotFound(id));
        }

        // Cascade: annotations, tag links, and similarity rows go with the
        // entry in one transaction.
        sqlx::query("DELETE FROM annotation WHERE entry_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        sqlx::query("DELETE FROM entry_tag WHERE entry_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        sqlx::query("DELETE FROM entry_similarity WHERE entry_a = $1 OR entry_b = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        sqlx::query("DELETE FROM entry WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }
}
