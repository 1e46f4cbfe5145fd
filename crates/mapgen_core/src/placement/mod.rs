//! Placement stage: the handful of values the host needs to seed natural
//! wonders, floodplains, and start positions. Nothing is committed to tiles
//! here; the batch commit hands [`PlacementInputs`] to the host.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::artifacts::{Artifact, ArtifactStore, Shape};
use crate::context::RunContext;
use crate::diagnostics::{Code, Diagnostics};
use crate::error::{check, check_range, Result};
use crate::grid::Grid;
use crate::morphology::{Drainage, Heightfield};
use crate::step::Step;

pub const PLACEMENT_STEP: &str = "placement/inputs";

/// Upper bound on the natural wonder count a recipe may ask for.
pub const MAX_WONDERS: u32 = 1_000;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub enum WonderPolicy {
    Fixed {
        count: u32,
    },
    /// Count proportional to land area, clamped to `[min, max]`.
    Scaled {
        per_thousand_land: f64,
        min: u32,
        max: u32,
    },
}

impl Default for WonderPolicy {
    fn default() -> Self {
        WonderPolicy::Scaled {
            per_thousand_land: 2.5,
            min: 2,
            max: 8,
        }
    }
}

impl WonderPolicy {
    pub fn count(&self, land_tiles: usize) -> u32 {
        match *self {
            WonderPolicy::Fixed { count } => count,
            WonderPolicy::Scaled {
                per_thousand_land,
                min,
                max,
            } => {
                let scaled = (land_tiles as f64 * per_thousand_land / 1_000.0).round();
                (scaled.clamp(0.0, f64::from(u32::MAX)) as u32).clamp(min, max)
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct FloodplainConfig {
    pub min_length: u32,
    pub max_length: u32,
}

impl Default for FloodplainConfig {
    fn default() -> Self {
        Self {
            min_length: 4,
            max_length: 10,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StartOverride {
    pub player: u32,
    pub x: u32,
    pub y: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct PlacementConfig {
    pub wonders: WonderPolicy,
    /// One wonder beyond what the policy yields.
    pub wonders_plus_one: bool,
    pub floodplains: FloodplainConfig,
    pub starts: Vec<StartOverride>,
}

impl PlacementConfig {
    pub fn validate(&self) -> Result<()> {
        let step = PLACEMENT_STEP;
        match self.wonders {
            WonderPolicy::Fixed { count } => {
                check(count <= MAX_WONDERS, step, "wonders.count", "must be at most 1000")?;
            }
            WonderPolicy::Scaled {
                per_thousand_land,
                min,
                max,
            } => {
                check_range(per_thousand_land, 0.0, 1_000.0, step, "wonders.per_thousand_land")?;
                check(min <= max, step, "wonders.max", "must be at least min")?;
                check(max <= MAX_WONDERS, step, "wonders.max", "must be at most 1000")?;
            }
        }
        let floodplains = &self.floodplains;
        check(
            floodplains.min_length >= 1,
            step,
            "floodplains.min_length",
            "must be at least 1",
        )?;
        check(
            floodplains.min_length <= floodplains.max_length,
            step,
            "floodplains.max_length",
            "must be at least min_length",
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlacementInputs {
    pub natural_wonders: u32,
    pub floodplain_min_length: u32,
    pub floodplain_max_length: u32,
    pub starts: Vec<StartOverride>,
}

impl Artifact for PlacementInputs {
    const NAME: &'static str = "placement.inputs";
    const SHAPE: Shape = Shape::Records;

    fn validate(&self, grid: &Grid) -> Vec<String> {
        let mut issues = Vec::new();
        if self.floodplain_min_length == 0 || self.floodplain_min_length > self.floodplain_max_length {
            issues.push(format!(
                "floodplain bounds {}..={} are not a non-empty range starting at 1 or more",
                self.floodplain_min_length, self.floodplain_max_length
            ));
        }
        for (slot, start) in self.starts.iter().enumerate() {
            if start.x >= grid.width || start.y >= grid.height {
                issues.push(format!("starts[{slot}] is off the grid"));
            }
            if self.starts[..slot].iter().any(|s| s.player == start.player) {
                issues.push(format!("starts[{slot}] repeats player {}", start.player));
            }
        }
        issues
    }
}

/// Size of the largest 8-connected group of river tiles.
pub fn longest_river_run(grid: &Grid, river_mask: &[u8]) -> u32 {
    let mut seen = vec![false; grid.size()];
    let mut longest = 0u32;
    let mut stack = Vec::new();
    for start in 0..grid.size() {
        if river_mask[start] == 0 || seen[start] {
            continue;
        }
        seen[start] = true;
        stack.push(start);
        let mut size = 0u32;
        while let Some(index) = stack.pop() {
            size += 1;
            for neighbor in grid.neighbors8(index) {
                if river_mask[neighbor] != 0 && !seen[neighbor] {
                    seen[neighbor] = true;
                    stack.push(neighbor);
                }
            }
        }
        longest = longest.max(size);
    }
    longest
}

/// Keep overrides that land on an in-bounds land tile, first entry per player.
fn accept_starts(
    grid: &Grid,
    heightfield: &Heightfield,
    requested: &[StartOverride],
    diagnostics: &mut Diagnostics,
) -> Vec<StartOverride> {
    let mut accepted: Vec<StartOverride> = Vec::new();
    for start in requested {
        let reason = if start.x >= grid.width || start.y >= grid.height {
            Some("is off the grid")
        } else if !heightfield.is_land(grid.index(start.x, start.y)) {
            Some("is on water")
        } else if accepted.iter().any(|s| s.player == start.player) {
            Some("repeats a player")
        } else {
            None
        };
        match reason {
            Some(reason) => diagnostics.warn(
                PLACEMENT_STEP,
                Code::StartOverrideRejected,
                format!(
                    "start for player {} at ({}, {}) {reason}",
                    start.player, start.x, start.y
                ),
            ),
            None => accepted.push(*start),
        }
    }
    accepted
}

pub struct PlacementStep {
    pub config: PlacementConfig,
}

impl Step for PlacementStep {
    fn id(&self) -> &'static str {
        PLACEMENT_STEP
    }

    fn requires(&self) -> &'static [&'static str] {
        &[Heightfield::NAME, Drainage::NAME]
    }

    fn provides(&self) -> &'static [&'static str] {
        &[PlacementInputs::NAME]
    }

    fn declare(&self, store: &mut ArtifactStore) {
        store.declare::<PlacementInputs>();
    }

    fn run(&self, ctx: &mut RunContext) -> Result<()> {
        let grid = ctx.grid;
        let heightfield = ctx.artifacts.read::<Heightfield>()?;
        let drainage = ctx.artifacts.read::<Drainage>()?;

        let land_tiles = heightfield.land_mask.iter().filter(|&&l| l != 0).count();
        let natural_wonders = self
            .config
            .wonders
            .count(land_tiles)
            .saturating_add(u32::from(self.config.wonders_plus_one));

        let floodplains = &self.config.floodplains;
        let longest = longest_river_run(&grid, &drainage.river_mask);
        let mut max_length = floodplains.max_length;
        if longest < max_length {
            max_length = longest.max(floodplains.min_length);
            ctx.diagnostics.warn(
                PLACEMENT_STEP,
                Code::FloodplainBoundsClamped,
                format!(
                    "max_length {} exceeds the longest river run {longest}; using {max_length}",
                    floodplains.max_length
                ),
            );
        }

        let starts = accept_starts(&grid, heightfield, &self.config.starts, &mut ctx.diagnostics);
        debug!(
            natural_wonders,
            longest_river = longest,
            starts = starts.len(),
            "placement inputs resolved"
        );
        ctx.artifacts.publish(PlacementInputs {
            natural_wonders,
            floodplain_min_length: floodplains.min_length,
            floodplain_max_length: max_length,
            starts,
        })
    }
}
