use crate::foundation::UpliftField;
use crate::grid::Grid;
use crate::rng::Stream;

use super::{HeightfieldBuffer, MountainConfig, TerrainType};

const VOLCANO_HEIGHT_SHARE: f64 = 0.8;

#[derive(Debug, Default, PartialEq, Eq)]
pub(super) struct ReliefStats {
    pub mountains: usize,
    pub hills: usize,
    pub volcanoes: usize,
}

/// Relief score per land tile: tectonic and fractal terms each shaped by
/// their own exponent, depressed along rifts, normalized by the land maximum.
pub(super) fn scores(
    buffer: &HeightfieldBuffer,
    uplift: &UpliftField,
    noise: &[f64],
    config: &MountainConfig,
) -> Vec<f64> {
    let raw: Vec<f64> = (0..buffer.elevation.len())
        .map(|i| {
            if !buffer.is_land(i) {
                return 0.0;
            }
            let tectonic = f64::from(uplift.uplift[i]).powf(config.tectonic_exponent)
                * config.tectonic_intensity;
            let fractal = noise[i].powf(config.noise_exponent) * config.noisiness;
            (tectonic + fractal - config.rift_depression * f64::from(uplift.rift[i])).max(0.0)
        })
        .collect();
    let max = raw.iter().copied().fold(0.0, f64::max);
    if max <= f64::EPSILON {
        return raw;
    }
    raw.into_iter().map(|v| v / max).collect()
}

pub(super) fn apply(
    grid: &Grid,
    buffer: &mut HeightfieldBuffer,
    uplift: &UpliftField,
    hotspot: &[u8],
    scores: &[f64],
    config: &MountainConfig,
    stream: &Stream,
) -> ReliefStats {
    let mut stats = ReliefStats::default();
    for index in 0..grid.size() {
        if !buffer.is_land(index) {
            continue;
        }
        let score = scores[index];
        if score >= config.mountain_threshold {
            buffer.terrain[index] = TerrainType::Mountain;
            buffer.elevation[index] += config.mountain_height * score;
            stats.mountains += 1;
        } else if score >= config.hill_threshold {
            buffer.terrain[index] = TerrainType::Hill;
            buffer.elevation[index] += config.hill_height * score;
            stats.hills += 1;
        }
    }

    let mut vents: Vec<usize> = Vec::new();
    for index in 0..grid.size() {
        if !buffer.is_land(index) {
            continue;
        }
        let arc = uplift.is_convergent(index)
            && f64::from(uplift.closeness[index]) >= config.volcano_closeness;
        if !arc && hotspot[index] == 0 {
            continue;
        }
        if vents
            .iter()
            .any(|&v| grid.chebyshev(v, index) < config.volcano_spacing)
        {
            continue;
        }
        if stream.derive(index as u64).next_f64() >= config.volcano_chance {
            continue;
        }
        if buffer.terrain[index] != TerrainType::Mountain {
            buffer.terrain[index] = TerrainType::Mountain;
            buffer.elevation[index] += config.mountain_height * VOLCANO_HEIGHT_SHARE;
        }
        buffer.volcano[index] = true;
        vents.push(index);
        stats.volcanoes += 1;
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    fn land(grid: &Grid) -> HeightfieldBuffer {
        HeightfieldBuffer {
            elevation: vec![100.0; grid.size()],
            terrain: vec![TerrainType::Flat; grid.size()],
            volcano: vec![false; grid.size()],
        }
    }

    fn ridge(grid: &Grid) -> UpliftField {
        let uplift = (0..grid.size())
            .map(|i| if grid.coords(i).0 == 2 { 1.0 } else { 0.1 })
            .collect();
        UpliftField {
            uplift,
            rift: vec![0.0; grid.size()],
            closeness: vec![1.0; grid.size()],
            boundary_kind: vec![1; grid.size()],
            boundary_distance: vec![0; grid.size()],
        }
    }

    #[test]
    fn uplift_ridge_becomes_mountains() {
        let grid = Grid::new(5, 3, false);
        let mut buffer = land(&grid);
        let uplift = ridge(&grid);
        let config = MountainConfig {
            noisiness: 0.0,
            volcano_chance: 0.0,
            ..MountainConfig::default()
        };
        let noise = vec![0.5; grid.size()];
        let scores = scores(&buffer, &uplift, &noise, &config);
        let hotspot = vec![0; grid.size()];
        let stats = apply(
            &grid,
            &mut buffer,
            &uplift,
            &hotspot,
            &scores,
            &config,
            &Stream::new(1),
        );
        assert_eq!(stats.mountains, 3);
        assert_eq!(buffer.terrain[grid.index(2, 1)], TerrainType::Mountain);
        assert_eq!(buffer.terrain[grid.index(0, 1)], TerrainType::Flat);
        assert!(buffer.elevation[grid.index(2, 1)] > 1_000.0);
    }

    #[test]
    fn higher_intensity_never_reduces_scores_on_ridge() {
        let grid = Grid::new(5, 3, false);
        let buffer = land(&grid);
        let uplift = ridge(&grid);
        let noise = vec![0.5; grid.size()];
        let calm = MountainConfig {
            tectonic_intensity: 0.2,
            ..MountainConfig::default()
        };
        let fierce = MountainConfig {
            tectonic_intensity: 2.0,
            ..MountainConfig::default()
        };
        let a = scores(&buffer, &uplift, &noise, &calm);
        let b = scores(&buffer, &uplift, &noise, &fierce);
        let ridge_tile = grid.index(2, 1);
        let flank = grid.index(0, 1);
        assert!(b[ridge_tile] - b[flank] > a[ridge_tile] - a[flank]);
    }

    #[test]
    fn volcanoes_respect_spacing() {
        let grid = Grid::new(9, 1, false);
        let mut buffer = land(&grid);
        let uplift = ridge(&grid);
        let config = MountainConfig {
            volcano_chance: 1.0,
            volcano_spacing: 3,
            ..MountainConfig::default()
        };
        let scores = vec![0.0; grid.size()];
        let hotspot = vec![0; grid.size()];
        let stats = apply(
            &grid,
            &mut buffer,
            &uplift,
            &hotspot,
            &scores,
            &config,
            &Stream::new(1),
        );
        assert_eq!(stats.volcanoes, 3);
        let vents: Vec<usize> = (0..grid.size()).filter(|&i| buffer.volcano[i]).collect();
        assert_eq!(vents, vec![0, 3, 6]);
    }
}
