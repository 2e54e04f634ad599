//! biblio-api - HTTP API server for biblio

mod handlers;
mod query_types;

use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{delete, get, patch, post, put},
    Json, Router,
};
use governor::{Quota, RateLimiter};
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use biblio_core::{
    clamp_graph_limit, evaluate_features, AnnotationRepository, AuthPrincipal, AuthUser,
    CreateAnnotationRequest, CreateEntryRequest, CreateProjectRequest, CreateTagRequest,
    EntryRepository, GraphFilterOptions, LibraryGraphRepository, ListEntriesRequest, ProjectRef,
    ProjectRepository, SessionRepository, TagRepository, Tier, UpdateEntryRequest,
    UpdateProjectRequest,
};
use biblio_db::{Database, SESSION_TOKEN_PREFIX};

use handlers::{
    exports::export_project,
    shares::{create_share, list_shares, resolve_public_share, revoke_share},
};
use query_types::{LenientBool, LenientLimit};

// =============================================================================
// REQUEST ID (UUIDv7)
// =============================================================================

/// Generates time-ordered UUIDv7 request correlation IDs.
///
/// UUIDv7 embeds a Unix timestamp, so IDs sort chronologically — useful for
/// log correlation and debugging production incidents.
#[derive(Clone, Default)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

// =============================================================================
// APP STATE
// =============================================================================

/// Global rate limiter type (direct quota, no keyed bucketing).
type GlobalRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Effective rate-limit configuration, surfaced by the status endpoint.
#[derive(Debug, Clone, Serialize)]
struct RateLimitSettings {
    enabled: bool,
    requests: u64,
    period_secs: u64,
}

/// Application state shared across handlers.
///
/// Everything request handlers need is threaded through here — there are
/// no process-wide mutable cells.
#[derive(Clone)]
struct AppState {
    db: Database,
    /// Global rate limiter (None if rate limiting is disabled).
    rate_limiter: Option<Arc<GlobalRateLimiter>>,
    /// Rate-limit configuration for the status endpoint.
    rate_limit: RateLimitSettings,
}

/// OpenAPI documentation (utoipa metadata, used for Swagger UI).
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Biblio API",
        version = "2026.8.0",
        description = "Annotated bibliography backend with projects, tagged entries, sharing, and a library relationship graph"
    ),
    tags(
        (name = "Projects", description = "Project CRUD operations"),
        (name = "Entries", description = "Bibliographic entry CRUD operations"),
        (name = "Tags", description = "Tag management"),
        (name = "Annotations", description = "Entry annotations"),
        (name = "Graph", description = "Library relationship graph"),
        (name = "Sharing", description = "Public read-only share links"),
        (name = "Export", description = "Project export"),
        (name = "System", description = "Health checks and system info")
    ),
    components(schemas(
        biblio_core::LibraryGraph,
        biblio_core::GraphNode,
        biblio_core::GraphEdge,
        biblio_core::NodeId,
        biblio_core::NodeKind,
        biblio_core::EdgeKind,
        biblio_core::Project,
        biblio_core::Entry,
        biblio_core::Tag,
        biblio_core::Annotation,
        biblio_core::ShareLink,
        biblio_core::Tier,
    ))
)]
struct ApiDoc;

// =============================================================================
// MAIN
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with configurable output
    //
    // Environment variables:
    //   LOG_FORMAT  - "json" or "text" (default: "text")
    //   LOG_FILE    - path to log file (optional, enables file logging)
    //   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
    //   RUST_LOG    - standard env filter (default: "biblio_api=debug,tower_http=debug")
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "biblio_api=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(env_filter);

    // Optionally create a file appender with daily rotation
    let _file_guard = if let Some(ref path) = log_file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("biblio-api.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer().with_writer(non_blocking);
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            } else {
                layer = layer.with_ansi(false); // no ANSI in files
            }
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        // Console-only output
        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer();
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );

    // Get configuration from environment
    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "postgres://localhost/biblio".to_string());
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse()
        .unwrap_or(3000);

    // Rate limiting configuration
    // RATE_LIMIT_REQUESTS: requests per period (default: 100)
    // RATE_LIMIT_PERIOD_SECS: period in seconds (default: 60 = 1 minute)
    let rate_limit_requests: u64 = std::env::var("RATE_LIMIT_REQUESTS")
        .unwrap_or_else(|_| "100".to_string())
        .parse()
        .unwrap_or(100);
    let rate_limit_period_secs: u64 = std::env::var("RATE_LIMIT_PERIOD_SECS")
        .unwrap_or_else(|_| "60".to_string())
        .parse()
        .unwrap_or(60);
    let rate_limit_enabled: bool = std::env::var("RATE_LIMIT_ENABLED")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(true);

    info!(
        "Rate limiting: {} ({} requests per {} seconds)",
        if rate_limit_enabled {
            "enabled"
        } else {
            "disabled"
        },
        rate_limit_requests,
        rate_limit_period_secs
    );

    // Connect to database
    info!("Connecting to database...");
    let db = Database::connect(&database_url).await?;
    info!("Database connected");

    // Create rate limiter if enabled
    let rate_limiter = if rate_limit_enabled {
        let quota = Quota::with_period(std::time::Duration::from_secs(rate_limit_period_secs))
            .expect("Rate limit period must be non-zero")
            .allow_burst(
                NonZeroU32::new(rate_limit_requests as u32).expect("Rate limit must be non-zero"),
            );
        Some(Arc::new(RateLimiter::direct(quota)))
    } else {
        None
    };

    // Create app state
    let state = AppState {
        db,
        rate_limiter,
        rate_limit: RateLimitSettings {
            enabled: rate_limit_enabled,
            requests: rate_limit_requests,
            period_secs: rate_limit_period_secs,
        },
    };

    // Build router
    let app = Router::new()
        // Health check
        .route("/health", get(health_check))
        // OpenAPI / Swagger UI
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Library graph
        .route("/api/entries/graph", get(get_library_graph))
        // Projects
        .route("/api/projects", get(list_projects).post(create_project))
        .route(
            "/api/projects/:project",
            get(get_project).patch(update_project).delete(delete_project),
        )
        .route("/api/projects/:project/export", get(export_project))
        .route(
            "/api/projects/:project/shares",
            get(list_shares).post(create_share),
        )
        .route("/api/shares/:id", delete(revoke_share))
        .route("/api/public/shares/:token", get(resolve_public_share))
        // Entries
        .route("/api/entries", get(list_entries).post(create_entry))
        .route(
            "/api/entries/:id",
            get(get_entry).patch(update_entry).delete(delete_entry),
        )
        .route(
            "/api/entries/:id/tags/:tag_id",
            put(tag_entry).delete(untag_entry),
        )
        .route(
            "/api/entries/:id/annotations",
            get(list_annotations).post(create_annotation),
        )
        // Annotations
        .route(
            "/api/annotations/:id",
            patch(update_annotation).delete(delete_annotation),
        )
        // Tags
        .route("/api/tags", get(list_tags).post(create_tag))
        .route("/api/tags/:id", delete(delete_tag))
        // Feature flags
        .route("/api/features", get(get_features))
        // Rate limiting status endpoint
        .route("/api/rate-limit/status", get(rate_limit_status))
        // Middleware
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer({
            let allowed_origins = parse_allowed_origins();

            CorsLayer::new()
                .allow_origin(AllowOrigin::list(allowed_origins))
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::PATCH,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
                .allow_credentials(true)
                .max_age(std::time::Duration::from_secs(3600))
        })
        // JSON bodies only; 1 MB is plenty for bibliography payloads
        .layer(RequestBodyLimitLayer::new(1024 * 1024))
        .with_state(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Parse the CORS origin whitelist from ALLOWED_ORIGINS (comma-separated).
fn parse_allowed_origins() -> Vec<HeaderValue> {
    let raw = std::env::var("ALLOWED_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:3000,http://localhost:5173".to_string());
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse().ok())
        .collect()
}

// =============================================================================
// RATE LIMIT MIDDLEWARE
// =============================================================================

async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Result<impl IntoResponse, (StatusCode, Json<serde_json::Value>)> {
    // If rate limiting is disabled, pass through
    if let Some(limiter) = &state.rate_limiter {
        if limiter.check().is_err() {
            tracing::warn!("Rate limit exceeded");
            return Err((
                StatusCode::TOO_MANY_REQUESTS,
                Json(serde_json::json!({
                    "error": "rate_limit_exceeded",
                    "error_description": "Too many requests. Please wait before retrying."
                })),
            ));
        }
    }

    Ok(next.run(request).await)
}

// =============================================================================
// SYSTEM HANDLERS
// =============================================================================

async fn health_check(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    // A pool-level ping keeps this honest without touching user data.
    sqlx::query("SELECT 1")
        .execute(&state.db.pool)
        .await
        .map_err(biblio_core::Error::Database)?;

    Ok(Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    })))
}

async fn rate_limit_status(
    State(state): State<AppState>,
    auth: RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let (tier_requests, tier_period) = biblio_core::defaults::rate_limit_quota(auth.user.tier);
    Ok(Json(serde_json::json!({
        "global": state.rate_limit,
        "tier": {
            "name": auth.user.tier,
            "requests": tier_requests,
            "period_secs": tier_period,
        },
    })))
}

// =============================================================================
// LIBRARY GRAPH HANDLER
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GraphQuery {
    /// Maximum entries considered; invalid values fall back to the default.
    limit: Option<LenientLimit>,
    #[serde(rename = "showAuthors")]
    show_authors: Option<LenientBool>,
    #[serde(rename = "showTags")]
    show_tags: Option<LenientBool>,
    #[serde(rename = "showSameAuthorEdges")]
    show_same_author_edges: Option<LenientBool>,
    #[serde(rename = "showSimilarEdges")]
    show_similar_edges: Option<LenientBool>,
}

impl GraphQuery {
    fn filter_options(&self) -> GraphFilterOptions {
        GraphFilterOptions {
            show_authors: self.show_authors.map(LenientBool::into_inner).unwrap_or(true),
            show_tags: self.show_tags.map(LenientBool::into_inner).unwrap_or(true),
            show_same_author_edges: self
                .show_same_author_edges
                .map(LenientBool::into_inner)
                .unwrap_or(true),
            show_similar_edges: self
                .show_similar_edges
                .map(LenientBool::into_inner)
                .unwrap_or(true),
        }
    }
}

/// Build and filter the caller's library relationship graph.
///
/// Requires light or pro tier. The limit is normalized before the builder
/// runs; the filter is a pure in-memory transform of the built graph.
async fn get_library_graph(
    State(state): State<AppState>,
    auth: RequireAuth,
    Query(query): Query<GraphQuery>,
) -> Result<impl IntoResponse, ApiError> {
    auth.require_tier_at_least(Tier::Light)?;

    let limit = clamp_graph_limit(query.limit.and_then(LenientLimit::into_inner));
    let graph = state
        .db
        .graph
        .build_library_graph(auth.user.id, limit)
        .await?;
    let filtered = graph.filter_by_type(&query.filter_options());

    Ok(Json(filtered))
}

// =============================================================================
// PROJECT HANDLERS
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CreateProjectBody {
    slug: String,
    name: String,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct UpdateProjectBody {
    name: Option<String>,
    description: Option<String>,
}

async fn list_projects(
    State(state): State<AppState>,
    auth: RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let projects = state.db.projects.list(auth.user.id).await?;
    Ok(Json(serde_json::json!({ "projects": projects })))
}

async fn create_project(
    State(state): State<AppState>,
    auth: RequireAuth,
    Json(body): Json<CreateProjectBody>,
) -> Result<impl IntoResponse, ApiError> {
    let id = state
        .db
        .projects
        .create(
            auth.user.id,
            CreateProjectRequest {
                slug: body.slug,
                name: body.name,
                description: body.description,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

async fn get_project(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(project): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let project = state
        .db
        .projects
        .fetch(auth.user.id, &ProjectRef::parse(&project))
        .await?;
    Ok(Json(project))
}

async fn update_project(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(project): Path<String>,
    Json(body): Json<UpdateProjectBody>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .db
        .projects
        .update(
            auth.user.id,
            &ProjectRef::parse(&project),
            UpdateProjectRequest {
                name: body.name,
                description: body.description,
            },
        )
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_project(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(project): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .db
        .projects
        .delete(auth.user.id, &ProjectRef::parse(&project))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// ENTRY HANDLERS
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CreateEntryBody {
    project_id: Option<Uuid>,
    title: String,
    #[serde(default)]
    authors: Vec<String>,
    tags: Option<Vec<Uuid>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct UpdateEntryBody {
    title: Option<String>,
    authors: Option<Vec<String>>,
    /// Present-and-null clears the project; absent leaves it unchanged.
    #[serde(default, with = "double_option")]
    project_id: Option<Option<Uuid>>,
}

/// Serde helper distinguishing "absent" from "present but null".
mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

#[derive(Debug, Deserialize)]
struct ListEntriesQuery {
    project_id: Option<Uuid>,
    limit: Option<i64>,
    offset: Option<i64>,
}

async fn list_entries(
    State(state): State<AppState>,
    auth: RequireAuth,
    Query(query): Query<ListEntriesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(limit) = query.limit {
        if limit <= 0 {
            return Err(ApiError::BadRequest("limit must be >= 1".to_string()));
        }
    }

    let response = state
        .db
        .entries
        .list(
            auth.user.id,
            ListEntriesRequest {
                project_id: query.project_id,
                limit: query.limit,
                offset: query.offset,
            },
        )
        .await?;
    Ok(Json(response))
}

async fn create_entry(
    State(state): State<AppState>,
    auth: RequireAuth,
    Json(body): Json<CreateEntryBody>,
) -> Result<impl IntoResponse, ApiError> {
    let id = state
        .db
        .entries
        .insert(
            auth.user.id,
            CreateEntryRequest {
                project_id: body.project_id,
                title: body.title,
                authors: body.authors,
                tags: body.tags,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

async fn get_entry(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let entry = state.db.entries.fetch(auth.user.id, id).await?;
    Ok(Json(entry))
}

async fn update_entry(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateEntryBody>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .db
        .entries
        .update(
            auth.user.id,
            id,
            UpdateEntryRequest {
                title: body.title,
                authors: body.authors,
                project_id: body.project_id,
            },
        )
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_entry(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.db.entries.delete(auth.user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn tag_entry(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path((id, tag_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    state.db.tags.add_to_entry(auth.user.id, id, tag_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn untag_entry(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path((id, tag_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .db
        .tags
        .remove_from_entry(auth.user.id, id, tag_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// TAG HANDLERS
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CreateTagBody {
    name: String,
    color: Option<String>,
    group_name: Option<String>,
}

async fn list_tags(
    State(state): State<AppState>,
    auth: RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let tags = state.db.tags.list(auth.user.id).await?;
    Ok(Json(serde_json::json!({ "tags": tags })))
}

async fn create_tag(
    State(state): State<AppState>,
    auth: RequireAuth,
    Json(body): Json<CreateTagBody>,
) -> Result<impl IntoResponse, ApiError> {
    let id = state
        .db
        .tags
        .create(
            auth.user.id,
            CreateTagRequest {
                name: body.name,
                color: body.color,
                group_name: body.group_name,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

async fn delete_tag(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.db.tags.delete(auth.user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// ANNOTATION HANDLERS
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AnnotationBody {
    body: String,
}

async fn list_annotations(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let annotations = state.db.annotations.list_for_entry(auth.user.id, id).await?;
    Ok(Json(serde_json::json!({ "annotations": annotations })))
}

async fn create_annotation(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<Uuid>,
    Json(body): Json<AnnotationBody>,
) -> Result<impl IntoResponse, ApiError> {
    let annotation_id = state
        .db
        .annotations
        .create(auth.user.id, id, CreateAnnotationRequest { body: body.body })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "id": annotation_id })),
    ))
}

async fn update_annotation(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<Uuid>,
    Json(body): Json<AnnotationBody>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .db
        .annotations
        .update(auth.user.id, id, &body.body)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_annotation(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.db.annotations.delete(auth.user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// FEATURE FLAG HANDLER
// =============================================================================

/// Evaluate feature flags for the caller's tier.
///
/// Pure per-request evaluation; nothing is cached between requests.
async fn get_features(auth: RequireAuth) -> Result<impl IntoResponse, ApiError> {
    let features: serde_json::Map<String, serde_json::Value> = evaluate_features(auth.user.tier)
        .into_iter()
        .map(|(name, enabled)| (name.to_string(), serde_json::Value::Bool(enabled)))
        .collect();

    Ok(Json(serde_json::json!({
        "tier": auth.user.tier,
        "features": features,
    })))
}

// =============================================================================
// API ERROR
// =============================================================================

#[derive(Debug)]
enum ApiError {
    Database(biblio_core::Error),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    BadRequest(String),
    Conflict(String),
}

impl From<biblio_core::Error> for ApiError {
    fn from(err: biblio_core::Error) -> Self {
        match &err {
            biblio_core::Error::NotFound(msg) => ApiError::NotFound(msg.clone()),
            biblio_core::Error::EntryNotFound(id) => {
                ApiError::NotFound(format!("Entry not found: {}", id))
            }
            biblio_core::Error::ProjectNotFound(key) => {
                ApiError::NotFound(format!("Project not found: {}", key))
            }
            biblio_core::Error::TagNotFound(id) => {
                ApiError::NotFound(format!("Tag not found: {}", id))
            }
            biblio_core::Error::InvalidInput(msg) => ApiError::BadRequest(msg.clone()),
            biblio_core::Error::Conflict(msg) => ApiError::Conflict(msg.clone()),
            biblio_core::Error::Unauthorized(msg) => ApiError::Unauthorized(msg.clone()),
            biblio_core::Error::Forbidden(msg) => ApiError::Forbidden(msg.clone()),
            biblio_core::Error::Database(sqlx_err) => {
                let msg = sqlx_err.to_string();
                if msg.contains("duplicate key") || msg.contains("unique constraint") {
                    let friendly_msg = if msg.contains("idx_unique_tag_name") {
                        "A tag with this name already exists".to_string()
                    } else if msg.contains("project_user_id_slug_key") || msg.contains("slug") {
                        "A project with this slug already exists".to_string()
                    } else {
                        msg
                    };
                    return ApiError::Conflict(friendly_msg);
                }
                ApiError::Database(err)
            }
            _ => ApiError::Database(err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::Database(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        };

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}

// =============================================================================
// AUTHENTICATION EXTRACTORS
// =============================================================================

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

/// Extractor resolving the request's principal from a Bearer session
/// token. Invalid or missing credentials resolve to Anonymous rather than
/// failing, so optional-auth endpoints can build on this.
#[derive(Debug, Clone)]
struct Auth {
    principal: AuthPrincipal,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for Auth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());

        let principal = match auth_header {
            Some(header) if header.starts_with("Bearer ") => {
                let token = header.trim_start_matches("Bearer ").trim();

                if token.starts_with(SESSION_TOKEN_PREFIX) {
                    match state.db.sessions.validate(token).await {
                        Ok(Some(user)) => AuthPrincipal::Session(user),
                        _ => AuthPrincipal::Anonymous,
                    }
                } else {
                    // Unknown token format
                    AuthPrincipal::Anonymous
                }
            }
            _ => AuthPrincipal::Anonymous,
        };

        Ok(Auth { principal })
    }
}

/// Extractor that requires authentication.
///
/// Use this for endpoints that must have a valid session token.
#[derive(Debug, Clone)]
struct RequireAuth {
    user: AuthUser,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = Auth::from_request_parts(parts, state).await?;

        match auth.principal {
            AuthPrincipal::Session(user) => Ok(RequireAuth { user }),
            AuthPrincipal::Anonymous => Err(ApiError::Unauthorized(
                "Authentication required".to_string(),
            )),
        }
    }
}

impl RequireAuth {
    /// Check that the authenticated user's tier meets the floor.
    fn require_tier_at_least(&self, tier: Tier) -> Result<(), ApiError> {
        if self.user.tier < tier {
            return Err(ApiError::Forbidden(format!(
                "Requires {} tier or higher",
                tier
            )));
        }
        Ok(())
    }
}
