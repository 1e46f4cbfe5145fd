use serde::Deserialize;
use serde_json::Value;

use crate::error::{check, check_range, Result};
use crate::grid::Grid;
use crate::strategy::{parse_config, Registry};

use super::{BiomeId, BIOME_EDGES_STEP};

/// Relabels isolated land tiles after classification. Water labels never
/// change and land never turns into water.
pub trait BiomeEdgeStrategy {
    fn refine(&self, grid: &Grid, biome: &[u8], land: &[bool]) -> Vec<u8>;
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct VoteConfig {
    pub radius: u32,
    pub iterations: u32,
}

impl Default for VoteConfig {
    fn default() -> Self {
        Self {
            radius: 1,
            iterations: 1,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct GaussianConfig {
    pub radius: u32,
    pub iterations: u32,
    pub sigma: f64,
}

impl Default for GaussianConfig {
    fn default() -> Self {
        Self {
            radius: 1,
            iterations: 1,
            sigma: 1.0,
        }
    }
}

fn is_isolated(grid: &Grid, labels: &[u8], land: &[bool], index: usize) -> bool {
    let mut land_neighbors = grid.neighbors8(index).filter(|&n| land[n]).peekable();
    land_neighbors.peek().is_some() && land_neighbors.all(|n| labels[n] != labels[index])
}

/// One Jacobi pass: isolated land tiles take the label with the highest
/// weighted support among land tiles within `radius`. Ties go to the
/// lower biome code.
fn relabel<W>(grid: &Grid, labels: &[u8], land: &[bool], radius: u32, weight: W) -> Vec<u8>
where
    W: Fn(i32, i32) -> f64,
{
    let r = radius as i32;
    (0..grid.size())
        .map(|index| {
            if !land[index] || !is_isolated(grid, labels, land, index) {
                return labels[index];
            }
            let mut support = [0.0f64; BiomeId::COUNT];
            for dy in -r..=r {
                for dx in -r..=r {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    let Some(n) = grid.offset(index, dx, dy) else {
                        continue;
                    };
                    if land[n] {
                        if let Some(slot) = support.get_mut(labels[n] as usize) {
                            *slot += weight(dx, dy);
                        }
                    }
                }
            }
            let mut best = labels[index] as usize;
            let mut best_support = 0.0;
            for (code, &s) in support.iter().enumerate() {
                if s > best_support {
                    best = code;
                    best_support = s;
                }
            }
            best as u8
        })
        .collect()
}

pub struct Vote {
    pub config: VoteConfig,
}

impl BiomeEdgeStrategy for Vote {
    fn refine(&self, grid: &Grid, biome: &[u8], land: &[bool]) -> Vec<u8> {
        let mut labels = biome.to_vec();
        for _ in 0..self.config.iterations {
            labels = relabel(grid, &labels, land, self.config.radius, |_, _| 1.0);
        }
        labels
    }
}

pub struct Gaussian {
    pub config: GaussianConfig,
}

impl BiomeEdgeStrategy for Gaussian {
    fn refine(&self, grid: &Grid, biome: &[u8], land: &[bool]) -> Vec<u8> {
        let spread = 2.0 * self.config.sigma * self.config.sigma;
        let mut labels = biome.to_vec();
        for _ in 0..self.config.iterations {
            labels = relabel(grid, &labels, land, self.config.radius, |dx, dy| {
                (-f64::from(dx * dx + dy * dy) / spread).exp()
            });
        }
        labels
    }
}

fn check_passes(step: &str, radius: u32, iterations: u32) -> Result<()> {
    check((1..=4).contains(&radius), step, "radius", "must be within 1..=4")?;
    check(iterations <= 8, step, "iterations", "must be at most 8")
}

fn vote(step: &'static str, config: &Value) -> Result<Box<dyn BiomeEdgeStrategy>> {
    let config: VoteConfig = parse_config(step, config)?;
    check_passes(step, config.radius, config.iterations)?;
    Ok(Box::new(Vote { config }))
}

fn gaussian(step: &'static str, config: &Value) -> Result<Box<dyn BiomeEdgeStrategy>> {
    let config: GaussianConfig = parse_config(step, config)?;
    check_passes(step, config.radius, config.iterations)?;
    check_range(config.sigma, 0.1, 8.0, step, "sigma")?;
    Ok(Box::new(Gaussian { config }))
}

pub fn registry() -> Registry<dyn BiomeEdgeStrategy> {
    Registry::new(BIOME_EDGES_STEP)
        .with("vote", vote)
        .with("gaussian", gaussian)
}
