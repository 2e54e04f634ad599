//! Library relationship graph: model, assembly, and filtering.
//!
//! The graph is a per-request value: built from one user's library, filtered
//! in memory, serialized, and discarded. It is never persisted or shared
//! across requests.
//!
//! Assembly is pure — the database layer fetches rows and hands them to
//! [`assemble_library_graph`], so the relationship logic is testable without
//! a store.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::SimilarityPair;

// =============================================================================
// NODE AND EDGE MODEL
// =============================================================================

/// Node type discriminator.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Entry,
    Author,
    Tag,
}

/// Edge type discriminator.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    SameAuthor,
    SharedTag,
    Similar,
}

/// Graph node identifier: a string key carrying its own namespace prefix,
/// so entry, author, and tag nodes can never collide.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema,
)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn entry(id: Uuid) -> Self {
        NodeId(format!("entry:{}", id))
    }

    pub fn author(normalized_name: &str) -> Self {
        NodeId(format!("author:{}", normalized_name))
    }

    pub fn tag(id: Uuid) -> Self {
        NodeId(format!("tag:{}", id))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A node in the library graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct GraphNode {
    pub id: NodeId,
    pub label: String,
    pub kind: NodeKind,
}

/// An edge in the library graph.
///
/// `weight` carries the evidence for the relationship: shared author-name
/// count for `same_author`, shared-tag count (always ≥ 1) for `shared_tag`,
/// and the similarity score for `similar`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct GraphEdge {
    pub source: NodeId,
    pub target: NodeId,
    pub edge_type: EdgeKind,
    pub weight: f32,
}

/// The assembled graph: ordered node sequence (insertion order = build
/// order) and edge sequence.
///
/// Invariants, upheld by both [`assemble_library_graph`] and
/// [`LibraryGraph::filter_by_type`]:
/// - every edge endpoint exists in `nodes`;
/// - at most one edge of a given type between the same ordered pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct LibraryGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl LibraryGraph {
    /// An empty graph — what a user with no entries gets.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Check the referential-integrity invariant: every edge endpoint is
    /// present in the node sequence.
    pub fn edges_reference_known_nodes(&self) -> bool {
        let ids: HashSet<&NodeId> = self.nodes.iter().map(|n| &n.id).collect();
        self.edges
            .iter()
            .all(|e| ids.contains(&e.source) && ids.contains(&e.target))
    }

    /// Number of entry-kind nodes.
    pub fn entry_node_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Entry)
            .count()
    }
}

// =============================================================================
// ASSEMBLY
// =============================================================================

/// Per-entry facts the builder feeds into assembly.
#[derive(Debug, Clone)]
pub struct EntryInfo {
    pub id: Uuid,
    pub title: String,
    pub authors: Vec<String>,
    pub tags: Vec<Uuid>,
}

/// Normalize an author name for matching: trimmed, case-insensitive.
pub fn normalize_author(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Assemble the library graph from fetched rows.
///
/// One node per entry, in slice order (the caller fetches most-recent-first,
/// so insertion order is the documented build order). For each unordered
/// entry pair: a `shared_tag` edge weighted by the shared-tag count when at
/// least one tag is shared (zero-weight edges are never created), and a
/// `same_author` edge weighted by the number of matching normalized author
/// names. One `similar` edge per similarity row whose score clears
/// `min_similarity` and whose endpoints are both in the entry set.
///
/// Deterministic: identical inputs produce identical graphs.
pub fn assemble_library_graph(
    entries: &[EntryInfo],
    similarities: &[SimilarityPair],
    min_similarity: f32,
) -> LibraryGraph {
    let mut graph = LibraryGraph {
        nodes: Vec::with_capacity(entries.len()),
        edges: Vec::new(),
    };

    let mut entry_index: HashMap<Uuid, usize> = HashMap::with_capacity(entries.len());
    for (i, entry) in entries.iter().enumerate() {
        entry_index.insert(entry.id, i);
        graph.nodes.push(GraphNode {
            id: NodeId::entry(entry.id),
            label: entry.title.clone(),
            kind: NodeKind::Entry,
        });
    }

    // Precompute per-entry normalized author and tag sets.
    let author_sets: Vec<HashSet<String>> = entries
        .iter()
        .map(|e| {
            e.authors
                .iter()
                .map(|a| normalize_author(a))
                .filter(|a| !a.is_empty())
                .collect()
        })
        .collect();
    let tag_sets: Vec<HashSet<Uuid>> = entries
        .iter()
        .map(|e| e.tags.iter().copied().collect())
        .collect();

    // Pairwise relationship edges, i < j, so each ordered pair appears once.
    for i in 0..entries.len() {
        for j in (i + 1)..entries.len() {
            let shared_authors = author_sets[i].intersection(&author_sets[j]).count();
            if shared_authors > 0 {
                graph.edges.push(GraphEdge {
                    source: NodeId::entry(entries[i].id),
                    target: NodeId::entry(entries[j].id),
                    edge_type: EdgeKind::SameAuthor,
                    weight: shared_authors as f32,
                });
            }

            let shared_tags = tag_sets[i].intersection(&tag_sets[j]).count();
            if shared_tags > 0 {
                graph.edges.push(GraphEdge {
                    source: NodeId::entry(entries[i].id),
                    target: NodeId::entry(entries[j].id),
                    edge_type: EdgeKind::SharedTag,
                    weight: shared_tags as f32,
                });
            }
        }
    }

    // Similarity edges: rows arrive pair-normalized (entry_a < entry_b), but
    // guard against duplicates and endpoints outside the fetched page.
    let mut seen_pairs: HashSet<(Uuid, Uuid)> = HashSet::new();
    for pair in similarities {
        if pair.score < min_similarity || pair.entry_a == pair.entry_b {
            continue;
        }
        if !entry_index.contains_key(&pair.entry_a) || !entry_index.contains_key(&pair.entry_b) {
            continue;
        }
        if !seen_pairs.insert((pair.entry_a, pair.entry_b)) {
            continue;
        }
        graph.edges.push(GraphEdge {
            source: NodeId::entry(pair.entry_a),
            target: NodeId::entry(pair.entry_b),
            edge_type: EdgeKind::Similar,
            weight: pair.score,
        });
    }

    graph
}

// =============================================================================
// FILTERING
// =============================================================================

/// Display toggles for [`LibraryGraph::filter_by_type`]. Every toggle
/// defaults to true (show everything).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphFilterOptions {
    /// When false, removes author nodes and `same_author` edges.
    pub show_authors: bool,
    /// When false, removes tag nodes and `shared_tag` edges.
    pub show_tags: bool,
    /// When false, removes `same_author` edges but keeps author nodes.
    pub show_same_author_edges: bool,
    /// When false, removes `similar` edges.
    pub show_similar_edges: bool,
}

impl Default for GraphFilterOptions {
    fn default() -> Self {
        Self {
            show_authors: true,
            show_tags: true,
            show_same_author_edges: true,
            show_similar_edges: true,
        }
    }
}

impl LibraryGraph {
    /// Produce a reduced view of the graph without re-querying the store.
    ///
    /// Pure and idempotent: applying the same options to an already-filtered
    /// graph is a no-op. Any edge referencing a removed node is removed too,
    /// so the output upholds the referential-integrity invariant.
    pub fn filter_by_type(&self, options: &GraphFilterOptions) -> LibraryGraph {
        let nodes: Vec<GraphNode> = self
            .nodes
            .iter()
            .filter(|n| match n.kind {
                NodeKind::Entry => true,
                NodeKind::Author => options.show_authors,
                NodeKind::Tag => options.show_tags,
            })
            .cloned()
            .collect();

        let surviving: HashSet<&NodeId> = nodes.iter().map(|n| &n.id).collect();

        let edges: Vec<GraphEdge> = self
            .edges
            .iter()
            .filter(|e| match e.edge_type {
                EdgeKind::SameAuthor => {
                    options.show_authors && options.show_same_author_edges
                }
                EdgeKind::SharedTag => options.show_tags,
                EdgeKind::Similar => options.show_similar_edges,
            })
            .filter(|e| surviving.contains(&e.source) && surviving.contains(&e.target))
            .cloned()
            .collect();

        LibraryGraph { nodes, edges }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(id: Uuid, title: &str, authors: &[&str], tags: &[Uuid]) -> EntryInfo {
        EntryInfo {
            id,
            title: title.to_string(),
            authors: authors.iter().map(|a| a.to_string()).collect(),
            tags: tags.to_vec(),
        }
    }

    fn similarity(a: Uuid, b: Uuid, score: f32) -> SimilarityPair {
        SimilarityPair {
            entry_a: a,
            entry_b: b,
            score,
            model: None,
            computed_at_utc: Utc::now(),
        }
    }

    /// Three entries: 1 and 2 share author "Smith, J."; 2 and 3 share two
    /// tags. Expect 3 entry nodes, one same_author edge (1↔2), one
    /// shared_tag edge (2↔3, weight 2).
    fn three_entry_library() -> (Vec<EntryInfo>, [Uuid; 3]) {
        let ids = [Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
        let ml = Uuid::new_v4();
        let stats = Uuid::new_v4();
        let entries = vec![
            entry(ids[0], "Deep Learning", &["Smith, J."], &[]),
            entry(ids[1], "Graph Methods", &["smith, j. ", "Doe, A."], &[ml, stats]),
            entry(ids[2], "Survey of ML", &["Chen, L."], &[ml, stats]),
        ];
        (entries, ids)
    }

    #[test]
    fn test_three_entry_scenario() {
        let (entries, ids) = three_entry_library();
        let graph = assemble_library_graph(&entries, &[], 0.5);

        assert_eq!(graph.entry_node_count(), 3);
        assert_eq!(graph.edges.len(), 2);

        let same_author: Vec<_> = graph
            .edges
            .iter()
            .filter(|e| e.edge_type == EdgeKind::SameAuthor)
            .collect();
        assert_eq!(same_author.len(), 1);
        assert_eq!(same_author[0].source, NodeId::entry(ids[0]));
        assert_eq!(same_author[0].target, NodeId::entry(ids[1]));
        assert_eq!(same_author[0].weight, 1.0);

        let shared_tag: Vec<_> = graph
            .edges
            .iter()
            .filter(|e| e.edge_type == EdgeKind::SharedTag)
            .collect();
        assert_eq!(shared_tag.len(), 1);
        assert_eq!(shared_tag[0].source, NodeId::entry(ids[1]));
        assert_eq!(shared_tag[0].target, NodeId::entry(ids[2]));
        assert_eq!(shared_tag[0].weight, 2.0);
    }

    #[test]
    fn test_empty_library_yields_empty_graph() {
        let graph = assemble_library_graph(&[], &[], 0.5);
        assert!(graph.nodes.is_empty());
        assert!(graph.edges.is_empty());
        assert_eq!(graph, LibraryGraph::empty());
    }

    #[test]
    fn test_no_zero_weight_edges() {
        let a = entry(Uuid::new_v4(), "A", &["X"], &[Uuid::new_v4()]);
        let b = entry(Uuid::new_v4(), "B", &["Y"], &[Uuid::new_v4()]);
        let graph = assemble_library_graph(&[a, b], &[], 0.5);
        assert!(graph.edges.is_empty());
        assert!(graph.edges.iter().all(|e| e.weight > 0.0));
    }

    #[test]
    fn test_author_match_is_trimmed_and_case_insensitive() {
        let a = entry(Uuid::new_v4(), "A", &["  SMITH, J.  "], &[]);
        let b = entry(Uuid::new_v4(), "B", &["smith, j."], &[]);
        let graph = assemble_library_graph(&[a, b], &[], 0.5);
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].edge_type, EdgeKind::SameAuthor);
    }

    #[test]
    fn test_empty_author_names_never_match() {
        let a = entry(Uuid::new_v4(), "A", &["  "], &[]);
        let b = entry(Uuid::new_v4(), "B", &[""], &[]);
        let graph = assemble_library_graph(&[a, b], &[], 0.5);
        assert!(graph.edges.is_empty());
    }

    #[test]
    fn test_similarity_threshold_and_weight() {
        let (entries, ids) = three_entry_library();
        let sims = vec![
            similarity(ids[0], ids[2], 0.9),
            similarity(ids[0], ids[1], 0.3), // below threshold
        ];
        let graph = assemble_library_graph(&entries, &sims, 0.5);

        let similar: Vec<_> = graph
            .edges
            .iter()
            .filter(|e| e.edge_type == EdgeKind::Similar)
            .collect();
        assert_eq!(similar.len(), 1);
        assert_eq!(similar[0].weight, 0.9);
    }

    #[test]
    fn test_similarity_to_unfetched_entry_is_dropped() {
        let (entries, ids) = three_entry_library();
        let outsider = Uuid::new_v4();
        let sims = vec![similarity(ids[0], outsider, 0.95)];
        let graph = assemble_library_graph(&entries, &sims, 0.5);

        assert!(graph
            .edges
            .iter()
            .all(|e| e.edge_type != EdgeKind::Similar));
        assert!(graph.edges_reference_known_nodes());
    }

    #[test]
    fn test_duplicate_similarity_rows_produce_one_edge() {
        let (entries, ids) = three_entry_library();
        let sims = vec![
            similarity(ids[0], ids[2], 0.9),
            similarity(ids[0], ids[2], 0.8),
        ];
        let graph = assemble_library_graph(&entries, &sims, 0.5);
        let similar_count = graph
            .edges
            .iter()
            .filter(|e| e.edge_type == EdgeKind::Similar)
            .count();
        assert_eq!(similar_count, 1);
    }

    #[test]
    fn test_assembly_is_deterministic() {
        let (entries, ids) = three_entry_library();
        let sims = vec![similarity(ids[0], ids[2], 0.7)];
        let first = assemble_library_graph(&entries, &sims, 0.5);
        let second = assemble_library_graph(&entries, &sims, 0.5);
        assert_eq!(first, second);
    }

    #[test]
    fn test_builder_output_upholds_referential_integrity() {
        let (entries, ids) = three_entry_library();
        let sims = vec![similarity(ids[1], ids[2], 0.8)];
        let graph = assemble_library_graph(&entries, &sims, 0.5);
        assert!(graph.edges_reference_known_nodes());
    }

    // ─── Filter ────────────────────────────────────────────────────────────

    /// A graph that also carries author and tag nodes, as a richer builder
    /// (or an older payload) might produce.
    fn mixed_kind_graph() -> LibraryGraph {
        let e1 = Uuid::new_v4();
        let e2 = Uuid::new_v4();
        let tag_id = Uuid::new_v4();
        LibraryGraph {
            nodes: vec![
                GraphNode {
                    id: NodeId::entry(e1),
                    label: "Paper One".to_string(),
                    kind: NodeKind::Entry,
                },
                GraphNode {
                    id: NodeId::entry(e2),
                    label: "Paper Two".to_string(),
                    kind: NodeKind::Entry,
                },
                GraphNode {
                    id: NodeId::author("smith, j."),
                    label: "Smith, J.".to_string(),
                    kind: NodeKind::Author,
                },
                GraphNode {
                    id: NodeId::tag(tag_id),
                    label: "ml".to_string(),
                    kind: NodeKind::Tag,
                },
            ],
            edges: vec![
                GraphEdge {
                    source: NodeId::entry(e1),
                    target: NodeId::entry(e2),
                    edge_type: EdgeKind::SameAuthor,
                    weight: 1.0,
                },
                GraphEdge {
                    source: NodeId::entry(e1),
                    target: NodeId::entry(e2),
                    edge_type: EdgeKind::SharedTag,
                    weight: 1.0,
                },
                GraphEdge {
                    source: NodeId::entry(e1),
                    target: NodeId::entry(e2),
                    edge_type: EdgeKind::Similar,
                    weight: 0.8,
                },
            ],
        }
    }

    #[test]
    fn test_filter_defaults_are_a_no_op() {
        let graph = mixed_kind_graph();
        let filtered = graph.filter_by_type(&GraphFilterOptions::default());
        assert_eq!(filtered, graph);
    }

    #[test]
    fn test_filter_hide_same_author_edges_keeps_nodes() {
        let (entries, _) = three_entry_library();
        let graph = assemble_library_graph(&entries, &[], 0.5);
        let filtered = graph.filter_by_type(&GraphFilterOptions {
            show_same_author_edges: false,
            ..Default::default()
        });

        assert_eq!(filtered.nodes, graph.nodes);
        assert_eq!(filtered.edges.len(), 1);
        assert_eq!(filtered.edges[0].edge_type, EdgeKind::SharedTag);
    }

    #[test]
    fn test_filter_hide_authors_removes_author_nodes_and_edges() {
        let graph = mixed_kind_graph();
        let filtered = graph.filter_by_type(&GraphFilterOptions {
            show_authors: false,
            ..Default::default()
        });

        assert!(filtered.nodes.iter().all(|n| n.kind != NodeKind::Author));
        assert!(filtered
            .edges
            .iter()
            .all(|e| e.edge_type != EdgeKind::SameAuthor));
        assert!(filtered.edges_reference_known_nodes());
    }

    #[test]
    fn test_filter_hide_tags_removes_tag_nodes_and_shared_tag_edges() {
        let graph = mixed_kind_graph();
        let filtered = graph.filter_by_type(&GraphFilterOptions {
            show_tags: false,
            ..Default::default()
        });

        assert!(filtered.nodes.iter().all(|n| n.kind != NodeKind::Tag));
        assert!(filtered
            .edges
            .iter()
            .all(|e| e.edge_type != EdgeKind::SharedTag));
    }

    #[test]
    fn test_filter_drops_edges_to_removed_nodes() {
        let e1 = Uuid::new_v4();
        let mut graph = mixed_kind_graph();
        // An edge anchored on the tag node itself.
        graph.edges.push(GraphEdge {
            source: NodeId::entry(e1),
            target: graph.nodes[3].id.clone(),
            edge_type: EdgeKind::Similar,
            weight: 0.9,
        });
        graph.nodes.push(GraphNode {
            id: NodeId::entry(e1),
            label: "Paper Three".to_string(),
            kind: NodeKind::Entry,
        });

        let filtered = graph.filter_by_type(&GraphFilterOptions {
            show_tags: false,
            ..Default::default()
        });

        // The similar edge pointing at the removed tag node must go too.
        assert!(filtered.edges_reference_known_nodes());
        assert!(filtered
            .edges
            .iter()
            .all(|e| e.target != graph.nodes[3].id));
    }

    #[test]
    fn test_filter_is_idempotent() {
        let graph = mixed_kind_graph();
        for options in [
            GraphFilterOptions::default(),
            GraphFilterOptions {
                show_authors: false,
                ..Default::default()
            },
            GraphFilterOptions {
                show_tags: false,
                show_similar_edges: false,
                ..Default::default()
            },
            GraphFilterOptions {
                show_authors: false,
                show_tags: false,
                show_same_author_edges: false,
                show_similar_edges: false,
            },
        ] {
            let once = graph.filter_by_type(&options);
            let twice = once.filter_by_type(&options);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_filter_is_monotone() {
        let graph = mixed_kind_graph();
        let all = graph.filter_by_type(&GraphFilterOptions::default());
        for options in [
            GraphFilterOptions {
                show_authors: false,
                ..Default::default()
            },
            GraphFilterOptions {
                show_tags: false,
                ..Default::default()
            },
            GraphFilterOptions {
                show_same_author_edges: false,
                ..Default::default()
            },
            GraphFilterOptions {
                show_similar_edges: false,
                ..Default::default()
            },
        ] {
            let reduced = graph.filter_by_type(&options);
            assert!(reduced.nodes.len() <= all.nodes.len());
            assert!(reduced.edges.len() <= all.edges.len());
        }
    }

    #[test]
    fn test_filter_does_not_mutate_input() {
        let graph = mixed_kind_graph();
        let snapshot = graph.clone();
        let _ = graph.filter_by_type(&GraphFilterOptions {
            show_authors: false,
            show_tags: false,
            show_same_author_edges: false,
            show_similar_edges: false,
        });
        assert_eq!(graph, snapshot);
    }

    #[test]
    fn test_serialized_shape_is_nodes_and_edges() {
        let (entries, _) = three_entry_library();
        let graph = assemble_library_graph(&entries, &[], 0.5);
        let json = serde_json::to_value(&graph).unwrap();
        assert!(json.get("nodes").unwrap().is_array());
        assert!(json.get("edges").unwrap().is_array());
        assert_eq!(json.as_object().unwrap().len(), 2);
    }
}
