use std::f64::consts::TAU;

use super::ForcingConfig;

const MAX_LATITUDE_DEG: f64 = 89.999;

/// Annual phases sampled for a given mode count.
pub(super) fn season_phases(mode_count: u8) -> &'static [f64] {
    if mode_count == 4 {
        &[0.0, 0.25, 0.5, 0.75]
    } else {
        &[0.25, 0.75]
    }
}

pub(super) fn declination_deg(axial_tilt_deg: f64, phase: f64) -> f64 {
    axial_tilt_deg * (TAU * phase).sin()
}

/// Row latitudes shifted by the solar declination of one phase.
pub(super) fn seasonal_latitudes(latitudes: &[f64], declination_deg: f64) -> Vec<f64> {
    latitudes
        .iter()
        .map(|&lat| {
            if lat.is_finite() {
                (lat - declination_deg).clamp(-MAX_LATITUDE_DEG, MAX_LATITUDE_DEG)
            } else {
                0.0
            }
        })
        .collect()
}

/// Relative insolation per row in `[floor, 1]`.
pub(super) fn insolation(latitudes: &[f64], config: &ForcingConfig) -> Vec<f64> {
    latitudes
        .iter()
        .map(|&lat| {
            let sun = lat.to_radians().cos().max(0.0).powf(config.cos_exponent);
            config.insolation_floor + (1.0 - config.insolation_floor) * sun
        })
        .collect()
}
