use crate::foundation::UpliftField;
use crate::grid::Grid;
use crate::rng::Stream;

use super::{CoastConfig, HeightfieldBuffer, TerrainType};

const BAY_DEPTH_M: f64 = -30.0;
const SHELF_DEPTH_M: f64 = -50.0;

#[derive(Debug, Default, PartialEq, Eq)]
pub(super) struct CoastStats {
    pub bays: usize,
    pub shelf: usize,
}

/// Carve bays at convergent margins, then mark shallow water next to land
/// as shelf. Convergent margins keep a rugged, narrower shelf; passive
/// margins get a bonus toward an unbroken shelf.
pub(super) fn refine(
    grid: &Grid,
    buffer: &mut HeightfieldBuffer,
    uplift: &UpliftField,
    config: &CoastConfig,
    stream: &Stream,
) -> CoastStats {
    let mut stats = CoastStats::default();
    let bay_stream = stream.derive(0);
    let shelf_stream = stream.derive(1);

    for index in 0..grid.size() {
        if !buffer.is_land(index) || !uplift.is_convergent(index) {
            continue;
        }
        let closeness = f64::from(uplift.closeness[index]);
        if closeness < config.convergent_closeness {
            continue;
        }
        if !grid.neighbors4(index).any(|n| !buffer.is_land(n)) {
            continue;
        }
        if strands_neighbor(grid, buffer, index) {
            continue;
        }
        let roll = bay_stream.derive(index as u64).next_f64();
        if roll < config.bay_chance * closeness {
            buffer.terrain[index] = TerrainType::Coast;
            buffer.elevation[index] = BAY_DEPTH_M;
            stats.bays += 1;
        }
    }

    for index in 0..grid.size() {
        if buffer.terrain[index] != TerrainType::Ocean {
            continue;
        }
        if !grid.neighbors8(index).any(|n| buffer.is_land(n)) {
            continue;
        }
        let passive = !uplift.is_convergent(index)
            || f64::from(uplift.closeness[index]) < config.convergent_closeness;
        let chance = if passive {
            config.shelf_chance + config.passive_shelf_bonus
        } else {
            config.shelf_chance
        };
        if shelf_stream.derive(index as u64).next_f64() < chance {
            buffer.terrain[index] = TerrainType::Coast;
            buffer.elevation[index] = buffer.elevation[index].max(SHELF_DEPTH_M);
            stats.shelf += 1;
        }
    }
    stats
}

/// True when sinking `index` would leave some land neighbour with no other
/// land neighbour.
fn strands_neighbor(grid: &Grid, buffer: &HeightfieldBuffer, index: usize) -> bool {
    grid.neighbors4(index)
        .filter(|&n| buffer.is_land(n))
        .any(|n| {
            !grid
                .neighbors4(n)
                .any(|m| m != index && buffer.is_land(m))
        })
}
