use serde::Deserialize;
use tracing::debug;

use crate::grid::Grid;

use super::{FeatureField, FeatureIntents, NO_FEATURE};

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ApplyConfig {
    /// Accept every planned placement, even onto occupied tiles.
    pub allow_overlap: bool,
    pub reserve_volcanoes: bool,
    pub reserve_natural_wonders: bool,
}

impl Default for ApplyConfig {
    fn default() -> Self {
        Self {
            allow_overlap: false,
            reserve_volcanoes: true,
            reserve_natural_wonders: true,
        }
    }
}

/// Merge the family lists in priority order. Without overlap a tile takes at
/// most one feature and reserved tiles take none; with overlap the per-tile
/// field keeps the first, highest-priority feature.
pub fn apply(
    grid: &Grid,
    intents: &FeatureIntents,
    reserved: &[bool],
    config: &ApplyConfig,
) -> FeatureField {
    let mut feature = vec![NO_FEATURE; grid.size()];
    let mut placements = Vec::new();
    let mut rejected = 0u32;

    for placement in intents.in_priority_order() {
        let index = grid.index(placement.x, placement.y);
        let free = feature[index] == NO_FEATURE && !reserved[index];
        if !free && !config.allow_overlap {
            debug!(
                x = placement.x,
                y = placement.y,
                feature = %placement.feature,
                "placement rejected"
            );
            rejected += 1;
            continue;
        }
        if feature[index] == NO_FEATURE {
            feature[index] = placement.feature.code();
        }
        placements.push(placement.clone());
    }

    FeatureField {
        feature,
        placements,
        rejected,
        allow_overlap: config.allow_overlap,
    }
}
