//! Library graph builder.
//!
//! Reads one user's library — an entry page, its tag links, and the
//! similarity rows among those entries — then hands the rows to the pure
//! assembly in `biblio_core::graph`. The graph is built fresh per call and
//! never cached.
//!
//! Tenant isolation is the load-bearing invariant here: the entry query is
//! scoped by `user_id`, and every follow-up query is keyed by the ids that
//! scoped query returned, so no other user's rows can reach assembly.

use std::collections::HashMap;
use std::time::Instant;

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use tracing::debug;
use uuid::Uuid;

use biblio_core::{
    assemble_library_graph, EntryInfo, Error, GraphConfig, LibraryGraph, LibraryGraphRepository,
    Result, SimilarityPair,
};

/// PostgreSQL-backed implementation of LibraryGraphRepository.
#[derive(Clone)]
pub struct PgGraphRepository {
    pool: Pool<Postgres>,
    config: GraphConfig,
}

impl PgGraphRepository {
    /// Create a repository with configuration loaded from the environment.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            pool,
            config: GraphConfig::from_env(),
        }
    }

    /// Create a repository with explicit configuration.
    pub fn with_config(pool: Pool<Postgres>, config: GraphConfig) -> Self {
        Self { pool, config }
    }
}

#[async_trait]
impl LibraryGraphRepository for PgGraphRepository {
    /// Build the library graph over at most `limit` entries.
    ///
    /// Entries are fetched most-recent-first (`created_at_utc DESC`, id as
    /// tiebreak), which fixes the node build order and makes output
    /// deterministic for identical store state.
    async fn build_library_graph(&self, user_id: Uuid, limit: i64) -> Result<LibraryGraph> {
        let start = Instant::now();

        let entry_rows = sqlx::query(
            r#"SELECT id, title, authors
               FROM entry
               WHERE user_id = $1
               ORDER BY created_at_utc DESC, id DESC
               LIMIT $2"#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        // No entries means an empty graph, not an error.
        if entry_rows.is_empty() {
            return Ok(LibraryGraph::empty());
        }

        let mut entries: Vec<EntryInfo> = entry_rows
            .iter()
            .map(|row| EntryInfo {
                id: row.get("id"),
                title: row.get("title"),
                authors: row.get("authors"),
                tags: Vec::new(),
            })
            .collect();
        let entry_ids: Vec<Uuid> = entries.iter().map(|e| e.id).collect();

        let tag_rows = sqlx::query(
            r#"SELECT entry_id, tag_id
               FROM entry_tag
               WHERE entry_id = ANY($1)
               ORDER BY entry_id, tag_id"#,
        )
        .bind(&entry_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let mut tags_by_entry: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for row in tag_rows {
            let entry_id: Uuid = row.get("entry_id");
            tags_by_entry.entry(entry_id).or_default().push(row.get("tag_id"));
        }
        for entry in &mut entries {
            if let Some(tags) = tags_by_entry.remove(&entry.id) {
                entry.tags = tags;
            }
        }

        // Both endpoints are constrained to the scoped entry page, so the
        // similarity read cannot leak another tenant's rows.
        let similarity_rows = sqlx::query(
            r#"SELECT entry_a, entry_b, score, model, computed_at_utc
               FROM entry_similarity
               WHERE entry_a = ANY($1) AND entry_b = ANY($1) AND score >= $2
               ORDER BY entry_a, entry_b"#,
        )
        .bind(&entry_ids)
        .bind(self.config.min_similarity)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let similarities: Vec<SimilarityPair> = similarity_rows
            .into_iter()
            .map(|row| SimilarityPair {
                entry_a: row.get("entry_a"),
                entry_b: row.get("entry_b"),
                score: row.get("score"),
                model: row.get("model"),
                computed_at_utc: row.get("computed_at_utc"),
            })
            .collect();

        let graph = assemble_library_graph(&entries, &similarities, self.config.min_similarity);

        debug!(
            subsystem = "db",
            component = "graph",
            op = "build_library_graph",
            user_id = %user_id,
            limit,
            node_count = graph.nodes.len(),
            edge_count = graph.edges.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Library graph built"
        );

        Ok(graph)
    }
}
