use crate::fixed::ramp;

use super::EvaporationParams;

/// Evaporation source strength per tile, scaled by how warm the surface is.
pub(super) fn sources(land: &[bool], temperature_c: &[f64], params: &EvaporationParams) -> Vec<f64> {
    land.iter()
        .zip(temperature_c)
        .map(|(&is_land, &t)| {
            let warmth = ramp(t, params.min_temperature_c, params.max_temperature_c);
            let strength = if is_land {
                params.land_strength
            } else {
                params.ocean_strength
            };
            strength * warmth
        })
        .collect()
}
