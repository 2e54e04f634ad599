//! Feature flags evaluated from the subscription tier.
//!
//! Evaluation is a pure function of the caller's tier, computed per
//! request. There is no process-wide flag state and nothing to
//! invalidate.

use serde::{Deserialize, Serialize};

use crate::models::Tier;

/// Features gated by subscription tier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// The library relationship graph endpoint.
    LibraryGraph,
    /// Public read-only share links.
    PublicSharing,
    /// Project JSON export.
    ProjectExport,
    /// Entry annotations.
    Annotations,
}

impl Feature {
    pub const ALL: [Feature; 4] = [
        Feature::LibraryGraph,
        Feature::PublicSharing,
        Feature::ProjectExport,
        Feature::Annotations,
    ];

    /// Lowest tier that unlocks the feature.
    pub const fn minimum_tier(self) -> Tier {
        match self {
            Feature::LibraryGraph => Tier::Light,
            Feature::PublicSharing => Tier::Pro,
            Feature::ProjectExport => Tier::Light,
            Feature::Annotations => Tier::Free,
        }
    }

    /// Whether a given tier unlocks the feature.
    pub fn enabled_for(self, tier: Tier) -> bool {
        tier >= self.minimum_tier()
    }

    /// Stable wire name, matching the serde representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Feature::LibraryGraph => "library_graph",
            Feature::PublicSharing => "public_sharing",
            Feature::ProjectExport => "project_export",
            Feature::Annotations => "annotations",
        }
    }
}

/// Evaluate every feature for a tier: (wire name, enabled) pairs in
/// declaration order.
pub fn evaluate_features(tier: Tier) -> Vec<(&'static str, bool)> {
    Feature::ALL
        .iter()
        .map(|f| (f.as_str(), f.enabled_for(tier)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_tier_gets_annotations_only() {
        assert!(Feature::Annotations.enabled_for(Tier::Free));
        assert!(!Feature::LibraryGraph.enabled_for(Tier::Free));
        assert!(!Feature::PublicSharing.enabled_for(Tier::Free));
        assert!(!Feature::ProjectExport.enabled_for(Tier::Free));
    }

    #[test]
    fn test_light_tier_unlocks_graph_and_export() {
        assert!(Feature::LibraryGraph.enabled_for(Tier::Light));
        assert!(Feature::ProjectExport.enabled_for(Tier::Light));
        assert!(!Feature::PublicSharing.enabled_for(Tier::Light));
    }

    #[test]
    fn test_pro_tier_unlocks_everything() {
        for feature in Feature::ALL {
            assert!(feature.enabled_for(Tier::Pro));
        }
    }

    #[test]
    fn test_evaluate_features_covers_all_flags() {
        let evaluated = evaluate_features(Tier::Light);
        assert_eq!(evaluated.len(), Feature::ALL.len());
        assert!(evaluated.contains(&("library_graph", true)));
        assert!(evaluated.contains(&("public_sharing", false)));
    }

    #[test]
    fn test_wire_names_match_serde() {
        for feature in Feature::ALL {
            let json = serde_json::to_string(&feature).unwrap();
            assert_eq!(json, format!("\"{}\"", feature.as_str()));
        }
    }
}
