use std::f64::consts::TAU;

use noise::{Fbm, MultiFractal, NoiseFn, Perlin};
use serde::Deserialize;

use crate::error::{check, check_range, Result};
use crate::grid::Grid;

const MAX_OCTAVES: usize = 32;

/// Fractal noise parameters shared by every noise-driven step.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct FractalConfig {
    pub octaves: usize,
    pub frequency: f64,
    pub persistence: f64,
}

impl Default for FractalConfig {
    fn default() -> Self {
        Self {
            octaves: 5,
            frequency: 3.0,
            persistence: 0.5,
        }
    }
}

impl FractalConfig {
    pub fn validate(&self, step: &str) -> Result<()> {
        check(
            (1..=MAX_OCTAVES).contains(&self.octaves),
            step,
            "noise.octaves",
            "must be between 1 and 32",
        )?;
        check_range(self.frequency, 0.01, 64.0, step, "noise.frequency")?;
        check_range(self.persistence, 0.0, 1.0, step, "noise.persistence")
    }
}

/// Sample fractal noise for every tile, mapped into `[0, 1]`.
///
/// Wrapping grids are sampled on a cylinder so the east and west edges meet
/// without a seam.
pub fn fractal_field(grid: &Grid, seed: u32, config: &FractalConfig) -> Vec<f64> {
    let fbm: Fbm<Perlin> = Fbm::new(seed)
        .set_octaves(config.octaves)
        .set_frequency(config.frequency)
        .set_persistence(config.persistence);
    let width = f64::from(grid.width.max(1));
    let radius = 1.0 / TAU;

    (0..grid.size())
        .map(|index| {
            let (x, y) = grid.coords(index);
            let u = (f64::from(x) + 0.5) / width;
            let v = (f64::from(y) + 0.5) / width;
            let point = if grid.wrap_x {
                [(TAU * u).cos() * radius, (TAU * u).sin() * radius, v]
            } else {
                [u, v, 0.0]
            };
            (fbm.get(point) * 0.5 + 0.5).clamp(0.0, 1.0)
        })
        .collect()
}

/// Single-octave Perlin texture in `[-1, 1]`, with `frequency` in cycles
/// per tile.
pub fn perlin_field(grid: &Grid, seed: u32, frequency: f64) -> Vec<f64> {
    let perlin = Perlin::new(seed);
    let width = f64::from(grid.width.max(1));
    let radius = width * frequency / TAU;

    (0..grid.size())
        .map(|index| {
            let (x, y) = grid.coords(index);
            let fy = f64::from(y) * frequency;
            let point = if grid.wrap_x {
                let angle = TAU * f64::from(x) / width;
                [angle.cos() * radius, angle.sin() * radius, fy]
            } else {
                [f64::from(x) * frequency, fy, 0.0]
            };
            perlin.get(point).clamp(-1.0, 1.0)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_is_unit_bounded_and_repeatable() {
        let grid = Grid::new(16, 8, true);
        let config = FractalConfig::default();
        let a = fractal_field(&grid, 17, &config);
        let b = fractal_field(&grid, 17, &config);
        assert_eq!(a, b);
        assert!(a.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn seed_changes_field() {
        let grid = Grid::new(16, 8, false);
        let config = FractalConfig::default();
        assert_ne!(
            fractal_field(&grid, 1, &config),
            fractal_field(&grid, 2, &config)
        );
    }

    #[test]
    fn perlin_texture_is_signed_unit() {
        let grid = Grid::new(20, 10, true);
        let field = perlin_field(&grid, 5, 0.12);
        assert_eq!(field.len(), grid.size());
        assert!(field.iter().all(|v| (-1.0..=1.0).contains(v)));
        assert_eq!(field, perlin_field(&grid, 5, 0.12));
    }

    #[test]
    fn zero_octaves_rejected() {
        let config = FractalConfig {
            octaves: 0,
            ..FractalConfig::default()
        };
        assert!(config.validate("morphology/landmass").is_err());
    }
}
