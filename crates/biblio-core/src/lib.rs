//! # biblio-core
//!
//! Core types, traits, and abstractions for the biblio backend.
//!
//! This crate provides the foundational data structures and trait
//! definitions that other biblio crates depend on, including the pure
//! library-graph model and filter.

pub mod defaults;
pub mod error;
pub mod features;
pub mod graph;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use defaults::{clamp_graph_limit, GraphConfig, DEFAULT_GRAPH_LIMIT, MAX_GRAPH_LIMIT};
pub use error::{Error, Result};
pub use features::{evaluate_features, Feature};
pub use graph::{
    assemble_library_graph, normalize_author, EdgeKind, EntryInfo, GraphEdge, GraphFilterOptions,
    GraphNode, LibraryGraph, NodeId, NodeKind,
};
pub use models::*;
pub use traits::*;
