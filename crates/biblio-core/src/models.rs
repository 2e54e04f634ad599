//! Core data models for biblio.
//!
//! These types are shared across all biblio crates and represent the
//! core domain entities.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// SUBSCRIPTION TIERS
// =============================================================================

/// Subscription tier gating feature access.
///
/// Variant order matters: tiers derive `Ord`, so `tier >= Tier::Light`
/// expresses "light or pro".
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Default,
    utoipa::ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Free,
    Light,
    Pro,
}

impl Tier {
    pub const fn as_db_value(self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Light => "light",
            Tier::Pro => "pro",
        }
    }

    pub fn from_db_value(value: &str) -> Option<Self> {
        match value {
            "free" => Some(Tier::Free),
            "light" => Some(Tier::Light),
            "pro" => Some(Tier::Pro),
            _ => None,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_db_value())
    }
}

// =============================================================================
// AUTH PRINCIPAL
// =============================================================================

/// An authenticated user resolved from a session token.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub tier: Tier,
}

/// The principal attached to an incoming request.
///
/// Threaded through request extractors — never stored in process-wide
/// mutable state.
#[derive(Debug, Clone)]
pub enum AuthPrincipal {
    /// Valid session token.
    Session(AuthUser),
    /// No credentials, or credentials that failed validation.
    Anonymous,
}

impl AuthPrincipal {
    /// Check if the principal represents an authenticated user.
    pub fn is_authenticated(&self) -> bool {
        !matches!(self, AuthPrincipal::Anonymous)
    }

    /// The authenticated user, if any.
    pub fn user(&self) -> Option<&AuthUser> {
        match self {
            AuthPrincipal::Session(user) => Some(user),
            AuthPrincipal::Anonymous => None,
        }
    }
}

// =============================================================================
// PROJECTS
// =============================================================================

/// A project grouping entries, owned by one user.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Project {
    pub id: Uuid,
    pub user_id: Uuid,
    /// URL-safe identifier, unique per user.
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at_utc: DateTime<Utc>,
    pub updated_at_utc: DateTime<Utc>,
    pub entry_count: i64,
}

/// A project reference from a URL path segment: UUID or slug.
///
/// Explicit two-variant dispatch — each variant maps to its own
/// parameterized query, there is no dynamic where-clause assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectRef {
    Id(Uuid),
    Slug(String),
}

impl ProjectRef {
    /// Parse a path segment: anything that parses as a UUID is an id,
    /// everything else is treated as a slug.
    pub fn parse(segment: &str) -> Self {
        match Uuid::from_str(segment) {
            Ok(id) => ProjectRef::Id(id),
            Err(_) => ProjectRef::Slug(segment.to_string()),
        }
    }
}

impl fmt::Display for ProjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectRef::Id(id) => write!(f, "{}", id),
            ProjectRef::Slug(slug) => f.write_str(slug),
        }
    }
}

impl FromStr for ProjectRef {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(ProjectRef::parse(s))
    }
}

// =============================================================================
// ENTRIES
// =============================================================================

/// A bibliographic record owned by exactly one user.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Entry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub project_id: Option<Uuid>,
    pub title: String,
    /// Author names as entered ("Smith, J."), order preserved.
    pub authors: Vec<String>,
    pub created_at_utc: DateTime<Utc>,
    pub updated_at_utc: DateTime<Utc>,
}

/// An entry with its attached tag names, as returned by fetch endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct EntryFull {
    #[serde(flatten)]
    pub entry: Entry,
    pub tags: Vec<String>,
}

// =============================================================================
// TAGS
// =============================================================================

/// A tag owned by a user; name unique per user (case-insensitive).
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Tag {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub color: Option<String>,
    pub group_name: Option<String>,
    pub created_at_utc: DateTime<Utc>,
    pub entry_count: i64,
}

// =============================================================================
// ANNOTATIONS
// =============================================================================

/// A free-text note attached to an entry.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Annotation {
    pub id: Uuid,
    pub entry_id: Uuid,
    pub user_id: Uuid,
    pub body: String,
    pub created_at_utc: DateTime<Utc>,
    pub updated_at_utc: DateTime<Utc>,
}

// =============================================================================
// SHARING
// =============================================================================

/// A public read-only link for a project.
///
/// The opaque token is returned exactly once at creation; only its digest
/// is stored. Revocation is a tombstone: a revoked token resolves exactly
/// like an unknown one.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ShareLink {
    pub id: Uuid,
    pub project_id: Uuid,
    pub created_at_utc: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

/// Read-only view of a shared project, resolved from a public token.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SharedProjectView {
    pub project_name: String,
    pub project_description: Option<String>,
    pub entries: Vec<EntryFull>,
}

// =============================================================================
// SIMILARITY
// =============================================================================

/// A precomputed similarity score between two entries.
///
/// Pairs are stored normalized (`entry_a < entry_b` by UUID ordering), so
/// each unordered pair appears at most once.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SimilarityPair {
    pub entry_a: Uuid,
    pub entry_b: Uuid,
    /// Cosine-style score in [0.0, 1.0].
    pub score: f32,
    pub model: Option<String>,
    pub computed_at_utc: DateTime<Utc>,
}
