//! Contract tests for the graph endpoint's query normalization.
//!
//! The endpoint promises: an invalid or absent limit silently becomes the
//! default, anything above 500 is clamped before the builder runs, and
//! display toggles default to on.

use biblio_core::{
    clamp_graph_limit, GraphFilterOptions, DEFAULT_GRAPH_LIMIT, MAX_GRAPH_LIMIT,
};

#[test]
fn test_limit_1000_is_clamped_to_500() {
    assert_eq!(clamp_graph_limit(Some(1000)), 500);
    assert_eq!(MAX_GRAPH_LIMIT, 500);
}

#[test]
fn test_absent_limit_defaults_to_200() {
    assert_eq!(clamp_graph_limit(None), 200);
    assert_eq!(DEFAULT_GRAPH_LIMIT, 200);
}

#[test]
fn test_malformed_limit_is_normalized_not_rejected() {
    // The query layer parses "abc" to None; the endpoint never 400s on it.
    assert_eq!(clamp_graph_limit(None), DEFAULT_GRAPH_LIMIT);
    assert_eq!(clamp_graph_limit(Some(-1)), DEFAULT_GRAPH_LIMIT);
    assert_eq!(clamp_graph_limit(Some(0)), DEFAULT_GRAPH_LIMIT);
}

#[test]
fn test_every_limit_in_range_is_honored() {
    for limit in 1..=MAX_GRAPH_LIMIT {
        assert_eq!(clamp_graph_limit(Some(limit)), limit);
    }
}

#[test]
fn test_filter_options_default_to_all_visible() {
    let options = GraphFilterOptions::default();
    assert!(options.show_authors);
    assert!(options.show_tags);
    assert!(options.show_same_author_edges);
    assert!(options.show_similar_edges);
}
