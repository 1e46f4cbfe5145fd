use serde::Deserialize;

use crate::error::{check, check_range, Result};
use crate::fixed::clamp01;
use crate::grid::Grid;

use super::{Basin, BASINS_STEP};

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ResourceTarget {
    pub id: String,
    /// Maximum number of basins for this resource.
    pub target: u32,
    /// Signed preference for fertile (+) or barren (-) ground.
    pub fertility_bias: f64,
    /// Signed preference for wet (+) or dry (-) ground.
    pub moisture_bias: f64,
    /// Minimum Chebyshev distance between two basin centers of this resource.
    pub min_spacing: u32,
    pub radius: u32,
}

impl Default for ResourceTarget {
    fn default() -> Self {
        Self {
            id: String::new(),
            target: 4,
            fertility_bias: 1.0,
            moisture_bias: 0.0,
            min_spacing: 3,
            radius: 1,
        }
    }
}

impl ResourceTarget {
    fn new(id: &str, target: u32, fertility_bias: f64, moisture_bias: f64) -> Self {
        Self {
            id: id.to_string(),
            target,
            fertility_bias,
            moisture_bias,
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct BasinConfig {
    pub resources: Vec<ResourceTarget>,
    pub min_confidence: f64,
    pub max_per_resource: u32,
}

impl Default for BasinConfig {
    fn default() -> Self {
        Self {
            resources: vec![
                ResourceTarget::new("RESOURCE_WHEAT", 6, 1.0, 0.2),
                ResourceTarget::new("RESOURCE_COTTON", 4, 0.6, 0.8),
                ResourceTarget::new("RESOURCE_IRON", 4, -0.6, -0.2),
            ],
            min_confidence: 0.3,
            max_per_resource: 14,
        }
    }
}

impl BasinConfig {
    pub fn validate(&self) -> Result<()> {
        let step = BASINS_STEP;
        check_range(self.min_confidence, 0.0, 1.0, step, "min_confidence")?;
        for (slot, resource) in self.resources.iter().enumerate() {
            let field = |name: &str| format!("resources[{slot}].{name}");
            check(!resource.id.is_empty(), step, &field("id"), "must not be empty")?;
            check(
                self.resources[..slot].iter().all(|r| r.id != resource.id),
                step,
                &field("id"),
                "is listed twice",
            )?;
            check_range(resource.fertility_bias, -2.0, 2.0, step, &field("fertility_bias"))?;
            check_range(resource.moisture_bias, -2.0, 2.0, step, &field("moisture_bias"))?;
            check(resource.radius <= 4, step, &field("radius"), "must be at most 4")?;
            check(
                resource.min_spacing <= 64,
                step,
                &field("min_spacing"),
                "must be at most 64",
            )?;
        }
        Ok(())
    }
}

pub struct BasinInputs<'a> {
    pub grid: &'a Grid,
    pub land: &'a [bool],
    pub fertility: &'a [f32],
    pub rainfall: &'a [u8],
}

#[derive(Debug, Default)]
pub struct BasinPlan {
    pub basins: Vec<Basin>,
    /// Resources with a positive target and no candidate tile.
    pub starved: Vec<String>,
}

/// Suitability of one tile in `[0, 1]`; 0.5 is neutral.
fn confidence(resource: &ResourceTarget, fertility: f64, moisture: f64) -> f64 {
    let weight = resource.fertility_bias.abs() + resource.moisture_bias.abs();
    if weight <= f64::EPSILON {
        return 0.5;
    }
    let signal = resource.fertility_bias * (2.0 * fertility - 1.0)
        + resource.moisture_bias * (2.0 * moisture - 1.0);
    clamp01(0.5 + 0.5 * signal / weight)
}

/// Rank candidates per resource and pick spaced basin centers greedily.
/// Centers already claimed by an earlier resource are skipped.
pub fn plan(inputs: &BasinInputs<'_>, config: &BasinConfig) -> BasinPlan {
    let grid = inputs.grid;
    let mut claimed = vec![false; grid.size()];
    let mut outcome = BasinPlan::default();

    for resource in &config.resources {
        let cap = resource.target.min(config.max_per_resource) as usize;
        if cap == 0 {
            continue;
        }
        let scores: Vec<f64> = (0..grid.size())
            .map(|i| {
                let moisture = f64::from(inputs.rainfall[i]) / 200.0;
                confidence(resource, f64::from(inputs.fertility[i]), moisture)
            })
            .collect();
        let mut candidates: Vec<usize> = (0..grid.size())
            .filter(|&i| inputs.land[i] && !claimed[i] && scores[i] >= config.min_confidence)
            .collect();
        if candidates.is_empty() {
            outcome.starved.push(resource.id.clone());
            continue;
        }
        candidates.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]).then(a.cmp(&b)));

        let mut centers: Vec<usize> = Vec::new();
        for center in candidates {
            if centers.len() == cap {
                break;
            }
            if centers
                .iter()
                .any(|&c| grid.chebyshev(c, center) < resource.min_spacing)
            {
                continue;
            }
            claimed[center] = true;
            centers.push(center);

            let plots: Vec<usize> = (0..grid.size())
                .filter(|&i| inputs.land[i] && grid.chebyshev(center, i) <= resource.radius)
                .collect();
            let intensity = plots.iter().map(|&i| scores[i] as f32).collect();
            outcome.basins.push(Basin {
                resource_id: resource.id.clone(),
                plots,
                intensity,
                confidence: scores[center] as f32,
            });
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wheat(target: u32) -> BasinConfig {
        BasinConfig {
            resources: vec![ResourceTarget::new("RESOURCE_WHEAT", target, 1.0, 0.0)],
            ..BasinConfig::default()
        }
    }

    #[test]
    fn default_config_validates() {
        BasinConfig::default().validate().unwrap();
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut config = wheat(2);
        config.resources.push(ResourceTarget::new("RESOURCE_WHEAT", 1, 0.0, 1.0));
        let message = config.validate().unwrap_err().to_string();
        assert!(message.contains("resources[1].id"));
    }

    #[test]
    fn fertile_tiles_rank_first_and_respect_spacing() {
        let grid = Grid::new(8, 1, false);
        let land = vec![true; 8];
        let fertility = [0.9, 0.95, 0.2, 0.2, 0.2, 0.8, 0.2, 0.2];
        let rainfall = vec![100; 8];
        let inputs = BasinInputs {
            grid: &grid,
            land: &land,
            fertility: &fertility,
            rainfall: &rainfall,
        };
        let outcome = plan(&inputs, &wheat(3));
        let centers: Vec<usize> = outcome.basins.iter().map(|b| b.plots[1]).collect();
        // Tile 0 is too close to tile 1 and the rest fall below confidence.
        assert_eq!(outcome.basins.len(), 2);
        assert_eq!(centers, vec![1, 5]);
        assert!(outcome.basins[0].confidence > outcome.basins[1].confidence);
        assert_eq!(outcome.basins[0].plots, vec![0, 1, 2]);
    }

    #[test]
    fn resource_without_land_is_starved() {
        let grid = Grid::new(2, 1, false);
        let inputs = BasinInputs {
            grid: &grid,
            land: &[false, false],
            fertility: &[0.0, 0.0],
            rainfall: &[0, 0],
        };
        let outcome = plan(&inputs, &wheat(2));
        assert!(outcome.basins.is_empty());
        assert_eq!(outcome.starved, vec!["RESOURCE_WHEAT".to_string()]);
    }
}
