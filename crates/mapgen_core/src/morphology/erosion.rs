use std::f64::consts::SQRT_2;

use crate::grid::Grid;

use super::{GeomorphologyConfig, HeightfieldBuffer};

/// Land never erodes below this elevation, so coastlines hold still.
const LAND_MIN_M: f64 = 1.0;

#[derive(Debug, Default)]
pub(super) struct ErosionReport {
    pub eroded_m: f64,
    pub deposited_m: f64,
    pub flow_accumulation: Vec<f64>,
    pub sediment: Vec<f64>,
}

/// Run `eras` rounds of fluvial incision, hillslope diffusion and sediment
/// deposition over the land tiles of `buffer`. Water tiles are base level
/// and are never modified.
pub(super) fn run_eras(
    grid: &Grid,
    buffer: &mut HeightfieldBuffer,
    eras: u32,
    config: &GeomorphologyConfig,
) -> ErosionReport {
    let land: Vec<bool> = (0..grid.size()).map(|i| buffer.is_land(i)).collect();
    let mut report = ErosionReport {
        sediment: vec![0.0; grid.size()],
        ..ErosionReport::default()
    };

    for _ in 0..eras {
        let receivers = receivers(grid, &buffer.elevation, &land);
        let area = accumulate(&buffer.elevation, &land, &receivers);

        let mut carried = vec![0.0; grid.size()];
        let incision = incise(grid, &buffer.elevation, &land, &receivers, &area, config);
        for (index, cut) in incision.iter().enumerate() {
            buffer.elevation[index] -= cut;
            carried[index] += cut;
            report.eroded_m += cut;
        }

        let (slumped, lost) = diffuse(grid, &buffer.elevation, &land, config);
        for (index, delta) in slumped.iter().enumerate() {
            buffer.elevation[index] += delta;
        }
        report.eroded_m += lost;

        report.deposited_m += deposit(
            grid,
            &mut buffer.elevation,
            &land,
            &mut carried,
            &mut report.sediment,
            config.deposition_rate,
        );
    }

    let receivers = receivers(grid, &buffer.elevation, &land);
    report.flow_accumulation = accumulate(&buffer.elevation, &land, &receivers);
    report
}

/// D8 steepest-descent receiver for each land tile.
pub(super) fn receivers(grid: &Grid, elevation: &[f64], land: &[bool]) -> Vec<Option<usize>> {
    (0..grid.size())
        .map(|index| {
            if !land[index] {
                return None;
            }
            let (x, y) = grid.coords(index);
            let mut best = None;
            let mut best_drop = 0.0;
            for neighbor in grid.neighbors8(index) {
                let (nx, ny) = grid.coords(neighbor);
                let distance = if nx != x && ny != y { SQRT_2 } else { 1.0 };
                let drop = (elevation[index] - elevation[neighbor]) / distance;
                if drop > best_drop {
                    best_drop = drop;
                    best = Some(neighbor);
                }
            }
            best
        })
        .collect()
}

/// Upstream tile count, including the tile itself, for every land tile.
pub(super) fn accumulate(
    elevation: &[f64],
    land: &[bool],
    receivers: &[Option<usize>],
) -> Vec<f64> {
    let mut order: Vec<usize> = (0..elevation.len()).filter(|&i| land[i]).collect();
    order.sort_by(|&a, &b| elevation[b].total_cmp(&elevation[a]).then(a.cmp(&b)));
    let mut area: Vec<f64> = land.iter().map(|&l| if l { 1.0 } else { 0.0 }).collect();
    for index in order {
        if let Some(receiver) = receivers[index] {
            area[receiver] += area[index];
        }
    }
    area
}

/// Stream-power incision `K * A^m * S^n`, capped so no tile cuts below its
/// receiver or the land floor.
fn incise(
    grid: &Grid,
    elevation: &[f64],
    land: &[bool],
    receivers: &[Option<usize>],
    area: &[f64],
    config: &GeomorphologyConfig,
) -> Vec<f64> {
    (0..grid.size())
        .map(|index| {
            let Some(receiver) = receivers[index] else {
                return 0.0;
            };
            let (x, y) = grid.coords(index);
            let (rx, ry) = grid.coords(receiver);
            let cells = if rx != x && ry != y { SQRT_2 } else { 1.0 };
            let drop = elevation[index] - elevation[receiver];
            let slope = drop / (cells * config.cell_size_m);
            let power = config.erodibility
                * area[index].powf(config.area_exponent)
                * slope.powf(config.slope_exponent);
            let floor = if land[receiver] {
                elevation[receiver].max(LAND_MIN_M)
            } else {
                LAND_MIN_M
            };
            power.min(elevation[index] - floor).max(0.0)
        })
        .collect()
}

/// Talus-limited hillslope transport between 4-neighbours. Returns the
/// per-tile deltas and the volume shed into the sea.
fn diffuse(
    grid: &Grid,
    elevation: &[f64],
    land: &[bool],
    config: &GeomorphologyConfig,
) -> (Vec<f64>, f64) {
    let stable_drop = config.talus_angle_deg.to_radians().tan() * config.cell_size_m;
    let mut delta = vec![0.0; grid.size()];
    let mut lost = 0.0;
    for index in 0..grid.size() {
        if !land[index] {
            continue;
        }
        let mut budget = (elevation[index] - LAND_MIN_M).max(0.0);
        for neighbor in grid.neighbors4(index) {
            let excess = elevation[index] - elevation[neighbor] - stable_drop;
            if excess <= 0.0 {
                continue;
            }
            let moved = (config.diffusivity * excess * 0.5).min(budget);
            budget -= moved;
            delta[index] -= moved;
            if land[neighbor] {
                delta[neighbor] += moved;
            } else {
                lost += moved;
            }
        }
    }
    (delta, lost)
}

/// Route eroded material downstream; whatever reaches a land pit is
/// partially deposited there, up to the pit's spill height.
fn deposit(
    grid: &Grid,
    elevation: &mut [f64],
    land: &[bool],
    carried: &mut [f64],
    sediment: &mut [f64],
    rate: f64,
) -> f64 {
    let receivers = receivers(grid, elevation, land);
    let mut order: Vec<usize> = (0..grid.size()).filter(|&i| land[i]).collect();
    order.sort_by(|&a, &b| elevation[b].total_cmp(&elevation[a]).then(a.cmp(&b)));

    let mut deposited = 0.0;
    for index in order {
        match receivers[index] {
            Some(receiver) => {
                if land[receiver] {
                    carried[receiver] += carried[index];
                }
            }
            None => {
                let spill = grid
                    .neighbors8(index)
                    .map(|n| elevation[n])
                    .fold(f64::INFINITY, f64::min);
                let room = (spill - elevation[index]).max(0.0);
                let amount = (carried[index] * rate).min(room);
                if amount > 0.0 {
                    elevation[index] += amount;
                    sediment[index] += amount;
                    deposited += amount;
                }
            }
        }
    }
    deposited
}
