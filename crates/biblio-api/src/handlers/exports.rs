//! Project export handler.
//!
//! Produces a self-describing JSON document: a manifest with counts,
//! the project metadata, and every entry with its tags and annotations
//! inlined. Light tier and above.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{ApiError, AppState, RequireAuth};
use biblio_core::{
    Annotation, AnnotationRepository, EntryFull, EntryRepository, ListEntriesRequest, Project,
    ProjectRef, ProjectRepository, Tier,
};

// =============================================================================
// EXPORT DOCUMENT TYPES
// =============================================================================

#[derive(Debug, Serialize)]
pub struct ExportManifest {
    pub version: String,
    pub format: String,
    pub generated_at: DateTime<Utc>,
    pub counts: ExportCounts,
}

#[derive(Debug, Serialize)]
pub struct ExportCounts {
    pub entries: usize,
    pub annotations: usize,
    pub tags: usize,
}

#[derive(Debug, Serialize)]
pub struct ExportedEntry {
    #[serde(flatten)]
    pub entry: EntryFull,
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Serialize)]
pub struct ExportResponse {
    pub manifest: ExportManifest,
    pub project: Project,
    pub entries: Vec<ExportedEntry>,
}

// =============================================================================
// HANDLER
// =============================================================================

/// Export a project's entries, tags, and annotations as one JSON document.
pub async fn export_project(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(project): Path<String>,
) -> Result<Json<ExportResponse>, ApiError> {
    auth.require_tier_at_least(Tier::Light)?;

    let project = state
        .db
        .projects
        .fetch(auth.user.id, &ProjectRef::parse(&project))
        .await?;

    // One repository-maximum page; exports cap at 500 entries per project.
    let listed = state
        .db
        .entries
        .list(
            auth.user.id,
            ListEntriesRequest {
                project_id: Some(project.id),
                limit: Some(500),
                offset: None,
            },
        )
        .await?;

    let mut entries = Vec::with_capacity(listed.entries.len());
    let mut annotation_count = 0usize;
    let mut tag_count = 0usize;
    for full in listed.entries {
        let annotations = state
            .db
            .annotations
            .list_for_entry(auth.user.id, full.entry.id)
            .await?;
        annotation_count += annotations.len();
        tag_count += full.tags.len();
        entries.push(ExportedEntry {
            entry: full,
            annotations,
        });
    }

    Ok(Json(ExportResponse {
        manifest: ExportManifest {
            version: "1.0.0".to_string(),
            format: "biblio-export".to_string(),
            generated_at: Utc::now(),
            counts: ExportCounts {
                entries: entries.len(),
                annotations: annotation_count,
                tags: tag_count,
            },
        },
        project,
        entries,
    }))
}
