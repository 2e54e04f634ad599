//! Similarity repository implementation.
//!
//! Similarity scores are computed by an offline pipeline and stored with
//! the pair normalized so `entry_a < entry_b`; this layer only reads them
//! for graph construction and exposes an upsert for tooling.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use biblio_core::{Error, Result, SimilarityPair, SimilarityRepository};

/// PostgreSQL implementation of SimilarityRepository.
#[derive(Clone)]
pub struct PgSimilarityRepository {
    pool: Pool<Postgres>,
}

impl PgSimilarityRepository {
    /// Create a new PgSimilarityRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SimilarityRepository for PgSimilarityRepository {
    async fn upsert(
        &self,
        entry_a: Uuid,
        entry_b: Uuid,
        score: f32,
        model: Option<&str>,
    ) -> Result<()> {
        if entry_a == entry_b {
            return Err(Error::InvalidInput(
                "Similarity requires two distinct entries".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&score) {
            return Err(Error::InvalidInput(format!(
                "Similarity score must be in [0.0, 1.0], got {}",
                score
            )));
        }

        // Normalize the pair ordering so each unordered pair is stored once.
        let (a, b) = if entry_a < entry_b {
            (entry_a, entry_b)
        } else {
            (entry_b, entry_a)
        };

        sqlx::query(
            "INSERT INTO entry_similarity (entry_a, entry_b, score, model, computed_at_utc)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (entry_a, entry_b)
             DO UPDATE SET score = $3, model = $4, computed_at_utc = $5",
        )
        .bind(a)
        .bind(b)
        .bind(score)
        .bind(model)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(())
    }

    async fn for_entries(
        &self,
        entry_ids: &[Uuid],
        min_score: f32,
    ) -> Result<Vec<SimilarityPair>> {
        if entry_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            r#"SELECT entry_a, entry_b, score, model, computed_at_utc
               FROM entry_similarity
               WHERE entry_a = ANY($1) AND entry_b = ANY($1) AND score >= $2
               ORDER BY entry_a, entry_b"#,
        )
        .bind(entry_ids)
        .bind(min_score)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|row| SimilarityPair {
                entry_a: row.get("entry_a"),
                entry_b: row.get("entry_b"),
                score: row.get("score"),
                model: row.get("model"),
                computed_at_utc: row.get("computed_at_utc"),
            })
            .collect())
    }
}
