//! Contract tests for tier gating.
//!
//! The graph endpoint admits light and pro; sharing is pro-only; export is
//! light and above. The gate is a plain ordering check on the tier enum,
//! so these pin the ordering and the feature table together.

use biblio_core::{evaluate_features, Feature, Tier};

#[test]
fn test_graph_endpoint_admits_light_and_pro() {
    let gate = |tier: Tier| tier >= Tier::Light;
    assert!(gate(Tier::Light));
    assert!(gate(Tier::Pro));
    assert!(!gate(Tier::Free));
}

#[test]
fn test_feature_table_matches_endpoint_gates() {
    // Graph: light or pro.
    assert_eq!(Feature::LibraryGraph.minimum_tier(), Tier::Light);
    // Sharing: pro only.
    assert_eq!(Feature::PublicSharing.minimum_tier(), Tier::Pro);
    // Export: light or pro.
    assert_eq!(Feature::ProjectExport.minimum_tier(), Tier::Light);
}

#[test]
fn test_free_tier_sees_graph_disabled_in_feature_response() {
    let features = evaluate_features(Tier::Free);
    assert!(features.contains(&("library_graph", false)));
}

#[test]
fn test_pro_tier_sees_all_features_enabled() {
    let features = evaluate_features(Tier::Pro);
    assert!(features.iter().all(|(_, enabled)| *enabled));
}

#[test]
fn test_tier_db_values_round_trip() {
    for tier in [Tier::Free, Tier::Light, Tier::Pro] {
        assert_eq!(Tier::from_db_value(tier.as_db_value()), Some(tier));
    }
}
