//! # biblio-db
//!
//! PostgreSQL database layer for biblio.
//!
//! This crate provides:
//! - Connection pool management
//! - Repository implementations for all core entities
//! - The library graph builder (scoped reads + pure assembly)
//! - Digest-at-rest token storage for sessions and share links
//!
//! ## Example
//!
//! ```rust,ignore
//! use biblio_db::Database;
//! use biblio_core::{CreateEntryRequest, EntryRepository};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/biblio").await?;
//!
//!     let entry_id = db.entries.insert(user_id, CreateEntryRequest {
//!         project_id: None,
//!         title: "Attention Is All You Need".to_string(),
//!         authors: vec!["Vaswani, A.".to_string()],
//!         tags: None,
//!     }).await?;
//!
//!     println!("Created entry: {}", entry_id);
//!     Ok(())
//! }
//! ```

pub mod annotations;
pub mod entries;
pub mod graph;
pub mod pool;
pub mod projects;
pub mod sessions;
pub mod shares;
pub mod similarity;
pub mod tags;
pub mod tokens;

// Test fixtures for integration tests
pub mod test_fixtures;

// Re-export core types
pub use biblio_core::*;

/// Escape LIKE/ILIKE wildcard characters (`%`, `_`, `\`) in user input.
pub fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

// Re-export repository implementations
pub use annotations::PgAnnotationRepository;
pub use entries::PgEntryRepository;
pub use graph::PgGraphRepository;
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};
pub use projects::{validate_slug, PgProjectRepository};
pub use sessions::PgSessionRepository;
pub use shares::PgShareRepository;
pub use similarity::PgSimilarityRepository;
pub use tags::{validate_tag_name, PgTagRepository};
pub use tokens::{mint_token, token_digest, SESSION_TOKEN_PREFIX, SHARE_TOKEN_PREFIX};

/// Combined database context with all repositories.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Project repository.
    pub projects: PgProjectRepository,
    /// Entry repository.
    pub entries: PgEntryRepository,
    /// Tag repository.
    pub tags: PgTagRepository,
    /// Annotation repository.
    pub annotations: PgAnnotationRepository,
    /// Share-link repository.
    pub shares: PgShareRepository,
    /// Similarity repository.
    pub similarity: PgSimilarityRepository,
    /// Session repository.
    pub sessions: PgSessionRepository,
    /// Library graph builder.
    pub graph: PgGraphRepository,
}

impl Database {
    /// Connect with default pool configuration.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = create_pool(database_url).await?;
        Ok(Self::from_pool(pool))
    }

    /// Connect with custom pool configuration.
    pub async fn connect_with_config(database_url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(database_url, config).await?;
        Ok(Self::from_pool(pool))
    }

    /// Build the repository set over an existing pool.
    pub fn from_pool(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            projects: PgProjectRepository::new(pool.clone()),
            entries: PgEntryRepository::new(pool.clone()),
            tags: PgTagRepository::new(pool.clone()),
            annotations: PgAnnotationRepository::new(pool.clone()),
            shares: PgShareRepository::new(pool.clone()),
            similarity: PgSimilarityRepository::new(pool.clone()),
            sessions: PgSessionRepository::new(pool.clone()),
            graph: PgGraphRepository::new(pool.clone()),
            pool,
        }
    }
}
