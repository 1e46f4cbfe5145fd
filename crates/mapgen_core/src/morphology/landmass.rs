use crate::grid::Grid;

use super::{HeightfieldBuffer, LandmassConfig, TerrainType};

const LAND_FLOOR_M: f64 = 30.0;
const LAND_RANGE_M: f64 = 870.0;
const WATER_FLOOR_M: f64 = -40.0;
const WATER_RANGE_M: f64 = -3_960.0;

pub(super) struct LandmassOutcome {
    pub buffer: HeightfieldBuffer,
    pub water_percent: f64,
    pub attempts: u32,
    pub converged: bool,
}

/// Blend tectonic, crust and noise signals into a land-likelihood score.
pub(super) fn scores(
    uplift: &[f32],
    rift: &[f32],
    continental: &[bool],
    noise: &[f64],
    config: &LandmassConfig,
) -> Vec<f64> {
    (0..uplift.len())
        .map(|i| {
            let crust = if continental[i] { 1.0 } else { 0.0 };
            config.uplift_weight * f64::from(uplift[i]) + config.crust_weight * crust
                + config.noise_weight * noise[i]
                - config.rift_weight * f64::from(rift[i])
        })
        .collect()
}

/// Rank tiles by score and raise the top share as land, correcting the
/// share until the realized water percentage sits within tolerance or the
/// retry cap is spent.
pub(super) fn build(grid: &Grid, scores: &[f64], config: &LandmassConfig) -> LandmassOutcome {
    let size = grid.size();
    let mut order: Vec<usize> = (0..size).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]).then(a.cmp(&b)));

    let target = config.water_percent;
    let mut land_fraction = 1.0 - target / 100.0;
    let mut attempts = 0;
    let mut land;
    let mut water_percent;
    let mut converged;

    loop {
        attempts += 1;
        let land_count = (land_fraction * size as f64).round().clamp(0.0, size as f64) as usize;
        land = vec![false; size];
        for &index in order.iter().take(land_count) {
            land[index] = true;
        }
        clear_polar_rows(grid, &mut land, config.polar_water_rows);
        remove_specks(grid, &mut land);

        let water = land.iter().filter(|&&l| !l).count();
        water_percent = water as f64 / size as f64 * 100.0;
        converged = (water_percent - target).abs() <= config.tolerance_percent;
        if converged || attempts > config.max_retries {
            break;
        }
        land_fraction = (land_fraction + (water_percent - target) / 100.0).clamp(0.0, 1.0);
    }

    LandmassOutcome {
        buffer: elevate(scores, &land),
        water_percent,
        attempts,
        converged,
    }
}

fn clear_polar_rows(grid: &Grid, land: &mut [bool], rows: u32) {
    if rows == 0 {
        return;
    }
    for (index, slot) in land.iter_mut().enumerate() {
        let (_, y) = grid.coords(index);
        if y < rows || y + rows >= grid.height {
            *slot = false;
        }
    }
}

/// Sink land tiles with no land among their four neighbours.
fn remove_specks(grid: &Grid, land: &mut [bool]) {
    if grid.size() <= 4 {
        return;
    }
    let specks: Vec<usize> = (0..grid.size())
        .filter(|&i| land[i] && !grid.neighbors4(i).any(|n| land[n]))
        .collect();
    for index in specks {
        land[index] = false;
    }
}

fn elevate(scores: &[f64], land: &[bool]) -> HeightfieldBuffer {
    let span = |want_land: bool| {
        scores
            .iter()
            .zip(land)
            .filter(|(_, l)| **l == want_land)
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (&s, _)| {
                (lo.min(s), hi.max(s))
            })
    };
    let (land_lo, land_hi) = span(true);
    let (water_lo, water_hi) = span(false);

    let elevation = scores
        .iter()
        .zip(land)
        .map(|(&score, &is_land)| {
            if is_land {
                LAND_FLOOR_M + LAND_RANGE_M * normalized(score, land_lo, land_hi)
            } else {
                WATER_FLOOR_M + WATER_RANGE_M * (1.0 - normalized(score, water_lo, water_hi))
            }
        })
        .collect();
    let terrain = land
        .iter()
        .map(|&l| if l { TerrainType::Flat } else { TerrainType::Ocean })
        .collect();

    HeightfieldBuffer {
        elevation,
        terrain,
        volcano: vec![false; land.len()],
    }
}

fn normalized(value: f64, lo: f64, hi: f64) -> f64 {
    if hi > lo {
        ((value - lo) / (hi - lo)).clamp(0.0, 1.0)
    } else {
        0.5
    }
}
