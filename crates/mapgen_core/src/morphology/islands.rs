use crate::grid::Grid;
use crate::rng::Stream;

use super::{HeightfieldBuffer, IslandConfig, TerrainType};

const ISLAND_ELEVATION_M: f64 = 120.0;
const CHANCE_STEP_PER_RETRY: f64 = 0.5;

#[derive(Debug, PartialEq)]
pub(super) struct IslandOutcome {
    pub raised: usize,
    pub coverage: f64,
    pub attempts: u32,
    pub converged: bool,
}

/// Raise islands on hotspot tiles. Each retry draws from a fresh substream
/// with a higher chance; the last attempt is kept when the cap runs out.
pub(super) fn raise(
    grid: &Grid,
    buffer: &mut HeightfieldBuffer,
    hotspot: &[u8],
    config: &IslandConfig,
    stream: &Stream,
) -> IslandOutcome {
    let sites: Vec<usize> = (0..grid.size())
        .filter(|&i| hotspot[i] != 0 && !buffer.is_land(i))
        .collect();
    if sites.is_empty() {
        return IslandOutcome {
            raised: 0,
            coverage: 0.0,
            attempts: 0,
            converged: config.coverage_target <= 0.0,
        };
    }

    let floor = config.coverage_target * (1.0 - config.tolerance);
    let mut attempts = 0;
    let mut chosen;
    let mut coverage;
    loop {
        let chance =
            (config.chance * (1.0 + CHANCE_STEP_PER_RETRY * f64::from(attempts))).min(1.0);
        let attempt_stream = stream.derive(u64::from(attempts));
        attempts += 1;
        chosen = sites
            .iter()
            .copied()
            .filter(|&i| attempt_stream.derive(i as u64).next_f64() < chance)
            .collect::<Vec<_>>();
        coverage = chosen.len() as f64 / sites.len() as f64;
        if coverage >= floor || attempts > config.max_retries {
            break;
        }
    }

    for &index in &chosen {
        buffer.terrain[index] = TerrainType::Flat;
        buffer.elevation[index] = ISLAND_ELEVATION_M;
    }
    for &index in &chosen {
        for neighbor in grid.neighbors8(index) {
            if buffer.terrain[neighbor] == TerrainType::Ocean {
                buffer.terrain[neighbor] = TerrainType::Coast;
                buffer.elevation[neighbor] = buffer.elevation[neighbor].max(-50.0);
            }
        }
    }

    IslandOutcome {
        raised: chosen.len(),
        coverage,
        attempts,
        converged: coverage >= floor,
    }
}
