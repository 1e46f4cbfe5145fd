use crate::fixed::clamp_u8;
use crate::grid::Grid;
use crate::morphology::TerrainType;

use super::PrecipitationParams;

pub(super) const RAINFALL_MAX: f64 = 200.0;

/// Static per-run inputs shared by every season phase.
pub(super) struct Surface<'a> {
    pub grid: &'a Grid,
    pub elevation_m: &'a [f64],
    pub terrain: &'a [u8],
    pub land: &'a [bool],
    /// Ring distance to the nearest water tile, `u32::MAX` beyond the radius.
    pub water_distance: &'a [u32],
    /// Perlin texture in `[-1, 1]`.
    pub noise: &'a [f64],
}

/// Rainfall (0..=200) and humidity (0..=255) for one phase.
pub(super) fn precipitate(
    surface: &Surface<'_>,
    humidity: &[f64],
    wind_u: &[f64],
    wind_v: &[f64],
    params: &PrecipitationParams,
) -> (Vec<u8>, Vec<u8>) {
    let size = surface.grid.size();
    let mut rainfall = Vec::with_capacity(size);
    let mut humidity_out = Vec::with_capacity(size);
    for index in 0..size {
        let h = humidity[index].clamp(0.0, 1.0);
        let mut rain = h.powf(params.humidity_exponent) * params.rainfall_scale;
        if surface.land[index] {
            rain += coastal_bonus(surface, index, params);
            rain -= rain_shadow(surface, index, wind_u[index], wind_v[index], params);
        }
        rain += surface.noise[index] * params.noise_amplitude;
        rainfall.push(clamp_u8(rain.clamp(0.0, RAINFALL_MAX)));
        humidity_out.push(clamp_u8(h * 255.0));
    }
    (rainfall, humidity_out)
}

/// Extra rain for land within `gradient_radius` rings of water, more for
/// nearer rings and for lowlands.
fn coastal_bonus(surface: &Surface<'_>, index: usize, params: &PrecipitationParams) -> f64 {
    let distance = surface.water_distance[index];
    if distance == 0 || distance > params.gradient_radius {
        return 0.0;
    }
    let rings = f64::from(params.gradient_radius + 1 - distance);
    let mut bonus = params.per_ring_bonus * rings;
    if surface.elevation_m[index] <= params.lowland_max_elevation_m {
        bonus += params.lowland_bonus;
    }
    bonus
}

/// Rain lost when a barrier higher than the tile stands within
/// `barrier_steps` tiles upwind.
fn rain_shadow(
    surface: &Surface<'_>,
    index: usize,
    wind_u: f64,
    wind_v: f64,
    params: &PrecipitationParams,
) -> f64 {
    let magnitude = wind_u.abs().max(wind_v.abs());
    if magnitude < 1.0 {
        return 0.0;
    }
    let dx = -(wind_u / magnitude).round() as i32;
    let dy = -(wind_v / magnitude).round() as i32;
    let here = surface.elevation_m[index];

    let mut at = index;
    let mut rise: Option<f64> = None;
    for _ in 0..params.barrier_steps {
        let Some(next) = surface.grid.offset(at, dx, dy) else {
            break;
        };
        at = next;
        let elevation = surface.elevation_m[at];
        let barrier = surface.terrain[at] == TerrainType::Mountain.code()
            || elevation >= params.barrier_elevation_m;
        if barrier && elevation > here {
            let gain = elevation - here;
            rise = Some(rise.map_or(gain, |r: f64| r.max(gain)));
        }
    }
    match rise {
        Some(rise) => {
            let steps = (rise / params.barrier_elevation_m).floor();
            params.reduction_base + params.reduction_per_step * steps
        }
        None => 0.0,
    }
}
