//! Structured logging schema and field name constants for biblio.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation tools can query by standardized field names across
//! every subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events (startup, shutdown), operation completions |
//! | DEBUG | Decision points, intermediate values, config choices |
//! | TRACE | Per-item iteration, high-volume data (rows, edges) |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Correlation ID propagated across request → query → sub-calls.
/// Format: UUIDv7 (time-ordered).
pub const REQUEST_ID: &str = "request_id";

/// Subsystem originating the log event.
/// Values: "api", "db", "graph"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "pool", "builder", "shares", "sessions"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "build_library_graph", "resolve_share", "create_entry"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// User UUID the operation is scoped to.
pub const USER_ID: &str = "user_id";

/// Entry UUID being operated on.
pub const ENTRY_ID: &str = "entry_id";

/// Project UUID or slug being operated on.
pub const PROJECT: &str = "project";

/// Tag UUID being operated on.
pub const TAG_ID: &str = "tag_id";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of results returned by a query.
pub const RESULT_COUNT: &str = "result_count";

/// Number of nodes in a built or filtered graph.
pub const NODE_COUNT: &str = "node_count";

/// Number of edges in a built or filtered graph.
pub const EDGE_COUNT: &str = "edge_count";

/// Effective entry limit applied to a graph build.
pub const LIMIT: &str = "limit";

// ─── Database fields ───────────────────────────────────────────────────────

/// Number of active connections in the pool.
pub const POOL_SIZE: &str = "pool_size";

/// Number of idle connections in the pool.
pub const POOL_IDLE: &str = "pool_idle";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
