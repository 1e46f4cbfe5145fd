use std::f64::consts::PI;

use crate::grid::Grid;
use crate::rng::Stream;

use super::CirculationParams;

const CELL_WIDTH_DEG: f64 = 30.0;
const JET_MIN_DEG: f64 = 30.0;
const JET_MAX_DEG: f64 = 65.0;
const JET_HALF_WIDTH_DEG: f64 = 4.0;
const JET_SHARE: f64 = 0.6;

/// Zonal and poleward direction of the prevailing wind in each
/// circulation cell: trades, westerlies, polar easterlies.
fn cell(abs_lat: f64) -> (f64, f64) {
    if abs_lat < CELL_WIDTH_DEG {
        (-1.0, -0.5)
    } else if abs_lat < 2.0 * CELL_WIDTH_DEG {
        (1.0, 0.5)
    } else {
        (-0.6, -0.3)
    }
}

/// Row-uniform wind vectors. `u` is eastward and `v` points toward
/// increasing row index (south); both are in quantized wind units.
pub(super) fn winds(
    grid: &Grid,
    latitudes: &[f64],
    params: &CirculationParams,
    stream: &Stream,
) -> (Vec<f64>, Vec<f64>) {
    let mut wind_u = vec![0.0; grid.size()];
    let mut wind_v = vec![0.0; grid.size()];
    let speed = params.base_speed;

    for (y, &lat) in latitudes.iter().enumerate() {
        let abs_lat = lat.abs();
        let (zonal, poleward) = cell(abs_lat);
        let position = (abs_lat % CELL_WIDTH_DEG) / CELL_WIDTH_DEG;
        let strength = 0.35 + 0.65 * (PI * position).sin();

        let mut u = speed * zonal * strength;
        let streaks = params.jet_streaks.max(1) as f64;
        for k in 0..params.jet_streaks {
            let center = JET_MIN_DEG + (f64::from(k) + 0.5) * (JET_MAX_DEG - JET_MIN_DEG) / streaks;
            let d = (abs_lat - center) / JET_HALF_WIDTH_DEG;
            u += speed * params.jet_strength * JET_SHARE * (-d * d).exp();
        }

        let mut jitter = stream.derive(y as u64);
        u += jitter.next_signed_unit() * params.variance * speed * 0.25;
        let toward_pole = speed * poleward * strength
            + jitter.next_signed_unit() * params.variance * speed * 0.15;
        // North is up, so poleward is -y in the north and +y in the south.
        let hemisphere = if lat < 0.0 { -1.0 } else { 1.0 };
        let v = -hemisphere * toward_pole;

        let row = y * grid.width as usize;
        for x in 0..grid.width as usize {
            wind_u[row + x] = u;
            wind_v[row + x] = v;
        }
    }
    (wind_u, wind_v)
}
