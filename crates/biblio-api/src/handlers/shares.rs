//! Share-link HTTP handlers.
//!
//! Share links expose a read-only view of one project behind an opaque
//! public token. Creating a link is pro-tier; resolving one requires no
//! authentication at all. Revocation is immediate — a revoked token
//! resolves exactly like an unknown one (404).

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{ApiError, AppState, RequireAuth};
use biblio_core::{ProjectRef, ProjectRepository, ShareLink, ShareRepository, Tier};

// =============================================================================
// RESPONSE TYPES
// =============================================================================

/// Response for share-link creation. The token appears here and nowhere
/// else — only its digest is stored.
#[derive(Debug, Serialize)]
pub struct CreateShareResponse {
    pub share: ShareLink,
    pub token: String,
}

// =============================================================================
// HANDLERS
// =============================================================================

/// Create a public share link for a project.
pub async fn create_share(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(project): Path<String>,
) -> Result<(StatusCode, Json<CreateShareResponse>), ApiError> {
    auth.require_tier_at_least(Tier::Pro)?;

    // Resolve UUID-or-slug to a concrete owned project first.
    let project = state
        .db
        .projects
        .fetch(auth.user.id, &ProjectRef::parse(&project))
        .await?;

    let created = state.db.shares.create(auth.user.id, project.id).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateShareResponse {
            share: created.link,
            token: created.token,
        }),
    ))
}

/// List share links for a project.
pub async fn list_shares(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(project): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    auth.require_tier_at_least(Tier::Pro)?;

    let project = state
        .db
        .projects
        .fetch(auth.user.id, &ProjectRef::parse(&project))
        .await?;
    let shares = state
        .db
        .shares
        .list_for_project(auth.user.id, project.id)
        .await?;

    Ok(Json(serde_json::json!({ "shares": shares })))
}

/// Revoke a share link.
pub async fn revoke_share(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.db.shares.revoke(auth.user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Resolve a public share token to a read-only project view.
///
/// No authentication: the token itself is the capability.
pub async fn resolve_public_share(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let view = state
        .db
        .shares
        .resolve(&token)
        .await?
        .ok_or_else(|| ApiError::NotFound("Share link not found".to_string()))?;

    Ok(Json(serde_json::json!({
        "project": {
            "name": view.project_name,
            "description": view.project_description,
        },
        "entries": view.entries,
    })))
}
