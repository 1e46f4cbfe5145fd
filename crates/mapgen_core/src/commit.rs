use serde::Serialize;
use tracing::{debug, info};

use crate::artifacts::ArtifactStore;
use crate::ecology::{BiomeId, FeatureField, FeatureKind, PlotEffects, RefinedBiomes};
use crate::error::{MapgenError, Result};
use crate::host::HostSurface;
use crate::hydrology::ClimateField;
use crate::morphology::Heightfield;
use crate::placement::PlacementInputs;

/// Counts of what one commit wrote to the host.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CommitReport {
    pub tiles: usize,
    pub features: usize,
    pub plot_effects: usize,
    /// Tiles the host had already revealed, which need a visibility refresh.
    pub revealed: usize,
}

/// Write every published result to the host in one pass.
///
/// All artifacts are read before the first write, so a missing artifact or a
/// grid mismatch leaves the host untouched.
pub fn commit(store: &ArtifactStore, host: &mut dyn HostSurface) -> Result<CommitReport> {
    let grid = *store.grid();
    if host.grid() != grid {
        let host_grid = host.grid();
        return Err(MapgenError::HostGridMismatch {
            expected: (grid.width, grid.height),
            found: (host_grid.width, host_grid.height),
        });
    }
    let heightfield = store.read::<Heightfield>()?;
    let climate = store.read::<ClimateField>()?;
    let biomes = store.read::<RefinedBiomes>()?;
    let features = store.read::<FeatureField>()?;
    let effects = store.read::<PlotEffects>()?;
    let placement = store.read::<PlacementInputs>()?;

    let mut report = CommitReport::default();
    for index in 0..grid.size() {
        let (x, y) = grid.coords(index);
        host.set_elevation(x, y, heightfield.elevation[index]);
        host.set_terrain(x, y, heightfield.terrain_at(index));
        if host.is_revealed(x, y) {
            report.revealed += 1;
        }
        report.tiles += 1;
    }
    host.recalculate_areas();
    host.stamp_continents();

    for index in 0..grid.size() {
        let (x, y) = grid.coords(index);
        host.set_climate(x, y, climate.rainfall[index], climate.humidity[index]);
        if let Some(biome) = BiomeId::from_code(biomes.biome_index[index]) {
            host.set_biome(x, y, biome);
        }
        let feature = FeatureKind::from_code(features.feature[index]);
        if feature.is_some() {
            report.features += 1;
        }
        host.set_feature(x, y, feature);
    }

    for effect in &effects.placements {
        host.set_plot_effect(effect.x, effect.y, effect.effect);
        report.plot_effects += 1;
    }
    debug!(
        land = heightfield.land_mask.iter().filter(|&&l| l != 0).count(),
        starts = placement.starts.len(),
        "handing placement inputs to host"
    );
    host.apply_placement_inputs(placement);

    info!(
        tiles = report.tiles,
        features = report.features,
        plot_effects = report.plot_effects,
        revealed = report.revealed,
        "committed to host"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;
    use crate::host::MemoryHost;

    #[test]
    fn grid_mismatch_leaves_host_untouched() {
        let store = ArtifactStore::new(Grid::new(2, 2, false));
        let mut host = MemoryHost::new(3, 2, false, 0);
        let err = commit(&store, &mut host).unwrap_err();
        assert!(matches!(
            err,
            MapgenError::HostGridMismatch {
                expected: (2, 2),
                found: (3, 2)
            }
        ));
        assert!(host.terrain.iter().all(Option::is_none));
    }

    #[test]
    fn missing_artifacts_abort_before_writes() {
        let store = ArtifactStore::new(Grid::new(2, 2, false));
        let mut host = MemoryHost::new(2, 2, false, 0);
        assert!(matches!(
            commit(&store, &mut host),
            Err(MapgenError::Unpublished(_))
        ));
        assert!(host.placement.is_none());
    }
}
