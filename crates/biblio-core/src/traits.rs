//! Core traits for biblio abstractions.
//!
//! These traits define the interfaces that concrete implementations must
//! satisfy, enabling pluggable backends and testability. Every operation
//! that touches owned data takes the owning `user_id` explicitly —
//! tenant isolation is enforced at the query, not the handler.

use async_trait::async_trait;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::graph::LibraryGraph;
use crate::models::*;

// =============================================================================
// PROJECT REPOSITORY
// =============================================================================

/// Request for creating a project.
#[derive(Debug, Clone)]
pub struct CreateProjectRequest {
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
}

/// Request for updating a project. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateProjectRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Repository for project CRUD operations.
#[async_trait]
pub trait ProjectRepository: Send + Sync {
    /// Create a project. Duplicate slug per user is a conflict.
    async fn create(&self, user_id: Uuid, req: CreateProjectRequest) -> Result<Uuid>;

    /// Fetch a project by UUID or slug, scoped to its owner.
    async fn fetch(&self, user_id: Uuid, project: &ProjectRef) -> Result<Project>;

    /// List the user's projects with entry counts.
    async fn list(&self, user_id: Uuid) -> Result<Vec<Project>>;

    /// Update name/description.
    async fn update(
        &self,
        user_id: Uuid,
        project: &ProjectRef,
        req: UpdateProjectRequest,
    ) -> Result<()>;

    /// Delete a project. Entries survive with `project_id` cleared.
    async fn delete(&self, user_id: Uuid, project: &ProjectRef) -> Result<()>;
}

// =============================================================================
// ENTRY REPOSITORY
// =============================================================================

/// Request for creating an entry.
#[derive(Debug, Clone)]
pub struct CreateEntryRequest {
    pub project_id: Option<Uuid>,
    pub title: String,
    pub authors: Vec<String>,
    /// Tag ids to link at creation time.
    pub tags: Option<Vec<Uuid>>,
}

/// Request for updating an entry. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateEntryRequest {
    pub title: Option<String>,
    pub authors: Option<Vec<String>>,
    pub project_id: Option<Option<Uuid>>,
}

/// Request for listing entries.
#[derive(Debug, Clone, Default)]
pub struct ListEntriesRequest {
    /// Restrict to one project.
    pub project_id: Option<Uuid>,
    /// Maximum results.
    pub limit: Option<i64>,
    /// Pagination offset.
    pub offset: Option<i64>,
}

/// Response for listing entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListEntriesResponse {
    pub entries: Vec<EntryFull>,
    pub total: i64,
}

/// Repository for entry CRUD operations.
#[async_trait]
pub trait EntryRepository: Send + Sync {
    /// Insert an entry, linking any given tags in the same transaction.
    async fn insert(&self, user_id: Uuid, req: CreateEntryRequest) -> Result<Uuid>;

    /// Fetch an entry with its tag names.
    async fn fetch(&self, user_id: Uuid, id: Uuid) -> Result<EntryFull>;

    /// List the user's entries, most recent first.
    async fn list(&self, user_id: Uuid, req: ListEntriesRequest) -> Result<ListEntriesResponse>;

    /// Update title/authors/project.
    async fn update(&self, user_id: Uuid, id: Uuid, req: UpdateEntryRequest) -> Result<()>;

    /// Delete an entry. Cascades to annotations, tag links, and
    /// similarity rows in one transaction.
    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<()>;
}

// =============================================================================
// TAG REPOSITORY
// =============================================================================

/// Request for creating a tag.
#[derive(Debug, Clone)]
pub struct CreateTagRequest {
    pub name: String,
    pub color: Option<String>,
    pub group_name: Option<String>,
}

/// Repository for tag management.
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// Create a tag. Duplicate name (case-insensitive) per user is a
    /// conflict.
    async fn create(&self, user_id: Uuid, req: CreateTagRequest) -> Result<Uuid>;

    /// List the user's tags with entry counts.
    async fn list(&self, user_id: Uuid) -> Result<Vec<Tag>>;

    /// Delete a tag and its entry links.
    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<()>;

    /// Link a tag to an entry. Both must belong to the user.
    async fn add_to_entry(&self, user_id: Uuid, entry_id: Uuid, tag_id: Uuid) -> Result<()>;

    /// Unlink a tag from an entry.
    async fn remove_from_entry(&self, user_id: Uuid, entry_id: Uuid, tag_id: Uuid) -> Result<()>;

    /// Tag names for an entry, sorted.
    async fn get_for_entry(&self, user_id: Uuid, entry_id: Uuid) -> Result<Vec<String>>;
}

// =============================================================================
// ANNOTATION REPOSITORY
// =============================================================================

/// Request for creating an annotation.
#[derive(Debug, Clone)]
pub struct CreateAnnotationRequest {
    pub body: String,
}

/// Repository for entry annotations.
#[async_trait]
pub trait AnnotationRepository: Send + Sync {
    async fn create(
        &self,
        user_id: Uuid,
        entry_id: Uuid,
        req: CreateAnnotationRequest,
    ) -> Result<Uuid>;

    async fn list_for_entry(&self, user_id: Uuid, entry_id: Uuid) -> Result<Vec<Annotation>>;

    async fn update(&self, user_id: Uuid, id: Uuid, body: &str) -> Result<()>;

    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<()>;
}

// =============================================================================
// SHARE REPOSITORY
// =============================================================================

/// A freshly minted share link together with its one-time plaintext token.
#[derive(Debug, Clone)]
pub struct CreatedShare {
    pub link: ShareLink,
    /// Returned exactly once; only the digest is stored.
    pub token: String,
}

/// Repository for public project share links.
#[async_trait]
pub trait ShareRepository: Send + Sync {
    /// Mint a share link for a project the user owns.
    async fn create(&self, user_id: Uuid, project_id: Uuid) -> Result<CreatedShare>;

    /// List share links for a project.
    async fn list_for_project(&self, user_id: Uuid, project_id: Uuid) -> Result<Vec<ShareLink>>;

    /// Revoke a share link. A revoked token resolves like an unknown one.
    async fn revoke(&self, user_id: Uuid, share_id: Uuid) -> Result<()>;

    /// Resolve a public token to a read-only project view.
    async fn resolve(&self, token: &str) -> Result<Option<SharedProjectView>>;
}

// =============================================================================
// SIMILARITY REPOSITORY
// =============================================================================

/// Repository for precomputed entry similarity scores.
#[async_trait]
pub trait SimilarityRepository: Send + Sync {
    /// Upsert a similarity score. The pair is normalized so that
    /// `entry_a < entry_b` before writing.
    async fn upsert(
        &self,
        entry_a: Uuid,
        entry_b: Uuid,
        score: f32,
        model: Option<&str>,
    ) -> Result<()>;

    /// Similarity rows where both endpoints are in `entry_ids` and the
    /// score clears `min_score`.
    async fn for_entries(&self, entry_ids: &[Uuid], min_score: f32)
        -> Result<Vec<SimilarityPair>>;
}

// =============================================================================
// SESSION REPOSITORY
// =============================================================================

/// Repository for bearer session tokens.
///
/// Token issuance has no HTTP surface here — `mint` exists for operator
/// tooling and integration tests.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Mint a session token for a user, valid for `ttl`.
    async fn mint(&self, user_id: Uuid, ttl: Duration) -> Result<String>;

    /// Validate a bearer token, resolving the authenticated user.
    /// Expired, revoked, and unknown tokens all yield `None`.
    async fn validate(&self, token: &str) -> Result<Option<AuthUser>>;

    /// Revoke a session token.
    async fn revoke(&self, token: &str) -> Result<()>;
}

// =============================================================================
// LIBRARY GRAPH REPOSITORY
// =============================================================================

/// The Graph Builder seam: reads one user's library and assembles the
/// relationship graph.
#[async_trait]
pub trait LibraryGraphRepository: Send + Sync {
    /// Build the library graph over at most `limit` entries.
    ///
    /// `limit` must already be normalized by the caller (positive,
    /// clamped). A user with no entries gets an empty graph, not an
    /// error; a store failure propagates with no partial result.
    async fn build_library_graph(&self, user_id: Uuid, limit: i64) -> Result<LibraryGraph>;
}
