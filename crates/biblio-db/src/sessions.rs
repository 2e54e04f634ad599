//! Session repository implementation.
//!
//! Bearer tokens are validated by digest lookup; expiry and revocation
//! both make a token resolve to nothing, never to an error.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use biblio_core::{AuthUser, Error, Result, SessionRepository, Tier};

use crate::tokens::{mint_token, token_digest, SESSION_TOKEN_PREFIX};

/// PostgreSQL implementation of SessionRepository.
#[derive(Clone)]
pub struct PgSessionRepository {
    pool: Pool<Postgres>,
}

impl PgSessionRepository {
    /// Create a new PgSessionRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    async fn mint(&self, user_id: Uuid, ttl: Duration) -> Result<String> {
        let (token, digest) = mint_token(SESSION_TOKEN_PREFIX);
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO session (id, user_id, token_digest, created_at_utc, expires_at_utc)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(Uuid::now_v7())
        .bind(user_id)
        .bind(&digest)
        .bind(now)
        .bind(now + ttl)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(token)
    }

    async fn validate(&self, token: &str) -> Result<Option<AuthUser>> {
        if !token.starts_with(SESSION_TOKEN_PREFIX) {
            return Ok(None);
        }

        let row = sqlx::query(
            r#"SELECT u.id, u.email, u.tier
               FROM session s
               JOIN app_user u ON u.id = s.user_id
               WHERE s.token_digest = $1
                 AND s.revoked_at IS NULL
                 AND s.expires_at_utc > $2"#,
        )
        .bind(token_digest(token))
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(|r| {
            let tier_value: String = r.get("tier");
            AuthUser {
                id: r.get("id"),
                email: r.get("email"),
                tier: Tier::from_db_value(&tier_value).unwrap_or(Tier::Free),
            }
        }))
    }

    async fn revoke(&self, token: &str) -> Result<()> {
        sqlx::query(
            "UPDATE session SET revoked_at = COALESCE(revoked_at, $2) WHERE token_digest = $1",
        )
        .bind(token_digest(token))
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }
}
