//! Narrative stage: qualitative overlays that bias later stages toward
//! readable geography. The overlays live in a [`StoryBuffer`] on the run
//! context while morphology is still shaping the land, and are published as
//! [`StoryOverlays`] once the corridors pass has run.

mod corridors;
mod hotspots;
mod margins;
mod rifts;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::artifacts::{check_domain, check_len, Artifact, ArtifactStore, Shape};
use crate::context::RunContext;
use crate::diagnostics::Code;
use crate::error::{check, check_range, Result};
use crate::foundation::UpliftField;
use crate::grid::Grid;
use crate::morphology::Heightfield;
use crate::step::Step;

pub const MARGINS_STEP: &str = "narrative/margins";
pub const HOTSPOTS_STEP: &str = "narrative/hotspots";
pub const RIFTS_STEP: &str = "narrative/rifts";
pub const CORRIDORS_STEP: &str = "narrative/corridors";

/// Working overlay masks, one byte per tile.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StoryBuffer {
    pub active_margin: Vec<u8>,
    pub passive_margin: Vec<u8>,
    pub hotspot: Vec<u8>,
    pub rift_line: Vec<u8>,
    pub rift_shoulder: Vec<u8>,
    pub sea_lane: Vec<u8>,
    pub land_corridor: Vec<u8>,
}

impl StoryBuffer {
    pub fn new(size: usize) -> Self {
        Self {
            active_margin: vec![0; size],
            passive_margin: vec![0; size],
            hotspot: vec![0; size],
            rift_line: vec![0; size],
            rift_shoulder: vec![0; size],
            sea_lane: vec![0; size],
            land_corridor: vec![0; size],
        }
    }

    pub fn snapshot(&self) -> StoryOverlays {
        StoryOverlays {
            active_margin: self.active_margin.clone(),
            passive_margin: self.passive_margin.clone(),
            hotspot: self.hotspot.clone(),
            rift_line: self.rift_line.clone(),
            rift_shoulder: self.rift_shoulder.clone(),
            sea_lane: self.sea_lane.clone(),
            land_corridor: self.land_corridor.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StoryOverlays {
    pub active_margin: Vec<u8>,
    pub passive_margin: Vec<u8>,
    pub hotspot: Vec<u8>,
    pub rift_line: Vec<u8>,
    pub rift_shoulder: Vec<u8>,
    pub sea_lane: Vec<u8>,
    pub land_corridor: Vec<u8>,
}

impl StoryOverlays {
    fn masks(&self) -> [(&'static str, &[u8]); 7] {
        [
            ("active_margin", self.active_margin.as_slice()),
            ("passive_margin", self.passive_margin.as_slice()),
            ("hotspot", self.hotspot.as_slice()),
            ("rift_line", self.rift_line.as_slice()),
            ("rift_shoulder", self.rift_shoulder.as_slice()),
            ("sea_lane", self.sea_lane.as_slice()),
            ("land_corridor", self.land_corridor.as_slice()),
        ]
    }
}

impl Artifact for StoryOverlays {
    const NAME: &'static str = "narrative.overlays";
    const SHAPE: Shape = Shape::PerTile(&[
        "active_margin",
        "passive_margin",
        "hotspot",
        "rift_line",
        "rift_shoulder",
        "sea_lane",
        "land_corridor",
    ]);

    fn validate(&self, grid: &Grid) -> Vec<String> {
        let mut issues = Vec::new();
        for (field, mask) in self.masks() {
            check_len(&mut issues, field, mask.len(), grid);
            check_domain(&mut issues, field, mask, 1);
        }
        issues
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct MarginsConfig {
    /// Share of eligible coastal land tagged as active margin.
    pub active_fraction: f64,
    pub passive_fraction: f64,
    /// Coastline segments shorter than this are ignored.
    pub min_segment_length: u32,
}

impl Default for MarginsConfig {
    fn default() -> Self {
        Self {
            active_fraction: 0.25,
            passive_fraction: 0.25,
            min_segment_length: 12,
        }
    }
}

impl MarginsConfig {
    pub fn validate(&self) -> Result<()> {
        check_range(self.active_fraction, 0.0, 1.0, MARGINS_STEP, "active_fraction")?;
        check_range(self.passive_fraction, 0.0, 1.0, MARGINS_STEP, "passive_fraction")
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct HotspotConfig {
    pub max_trails: u32,
    pub steps: u32,
    /// Tiles advanced per trail step.
    pub step_length: u32,
    pub min_land_distance: u32,
    /// Manhattan separation between trail seeds.
    pub min_separation: u32,
}

impl Default for HotspotConfig {
    fn default() -> Self {
        Self {
            max_trails: 12,
            steps: 15,
            step_length: 2,
            min_land_distance: 5,
            min_separation: 12,
        }
    }
}

impl HotspotConfig {
    pub fn validate(&self) -> Result<()> {
        check(self.max_trails <= 256, HOTSPOTS_STEP, "max_trails", "must be at most 256")?;
        check(self.steps <= 256, HOTSPOTS_STEP, "steps", "must be at most 256")?;
        check(
            (1..=16).contains(&self.step_length),
            HOTSPOTS_STEP,
            "step_length",
            "must be between 1 and 16",
        )?;
        check(
            self.min_land_distance <= 64,
            HOTSPOTS_STEP,
            "min_land_distance",
            "must be at most 64",
        )
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct RiftConfig {
    pub max_rifts: u32,
    /// Tiles traced along each rift line.
    pub steps: u32,
    /// Rift potential a land tile needs to seed or extend a line.
    pub min_rift: f64,
    pub shoulder_width: u32,
}

impl Default for RiftConfig {
    fn default() -> Self {
        Self {
            max_rifts: 3,
            steps: 18,
            min_rift: 0.35,
            shoulder_width: 1,
        }
    }
}

impl RiftConfig {
    pub fn validate(&self) -> Result<()> {
        check(self.max_rifts <= 64, RIFTS_STEP, "max_rifts", "must be at most 64")?;
        check(self.steps <= 512, RIFTS_STEP, "steps", "must be at most 512")?;
        check_range(self.min_rift, 0.0, 1.0, RIFTS_STEP, "min_rift")?;
        check(
            self.shoulder_width <= 8,
            RIFTS_STEP,
            "shoulder_width",
            "must be at most 8",
        )
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct SeaLaneConfig {
    pub max_lanes: u32,
    pub scan_stride: u32,
    /// Minimum open-water run relative to the scanned axis.
    pub min_length_fraction: f64,
    pub lane_spacing: u32,
    pub min_channel_width: u32,
}

impl Default for SeaLaneConfig {
    fn default() -> Self {
        Self {
            max_lanes: 3,
            scan_stride: 6,
            min_length_fraction: 0.7,
            lane_spacing: 6,
            min_channel_width: 3,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct LandCorridorConfig {
    pub from_rift_shoulders: bool,
    pub max_corridors: u32,
    pub min_run_length: u32,
    /// Rows kept between accepted corridors.
    pub spacing: u32,
}

impl Default for LandCorridorConfig {
    fn default() -> Self {
        Self {
            from_rift_shoulders: true,
            max_corridors: 2,
            min_run_length: 24,
            spacing: 0,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct CorridorConfig {
    pub sea: SeaLaneConfig,
    pub land: LandCorridorConfig,
}

impl CorridorConfig {
    pub fn validate(&self) -> Result<()> {
        let step = CORRIDORS_STEP;
        check(self.sea.max_lanes <= 32, step, "sea.max_lanes", "must be at most 32")?;
        check(
            self.sea.scan_stride >= 2,
            step,
            "sea.scan_stride",
            "must be at least 2",
        )?;
        check_range(
            self.sea.min_length_fraction,
            0.4,
            1.0,
            step,
            "sea.min_length_fraction",
        )?;
        check(
            (1..=15).contains(&self.sea.min_channel_width),
            step,
            "sea.min_channel_width",
            "must be between 1 and 15",
        )?;
        check(
            self.land.max_corridors <= 32,
            step,
            "land.max_corridors",
            "must be at most 32",
        )?;
        check(
            self.land.min_run_length >= 1,
            step,
            "land.min_run_length",
            "must be at least 1",
        )
    }
}

fn land_mask(ctx: &RunContext) -> Result<Vec<bool>> {
    let buffer = ctx.buffers.heightfield()?;
    Ok((0..ctx.grid.size()).map(|i| buffer.is_land(i)).collect())
}

pub struct MarginsStep {
    pub config: MarginsConfig,
}

impl Step for MarginsStep {
    fn id(&self) -> &'static str {
        MARGINS_STEP
    }

    fn requires(&self) -> &'static [&'static str] {
        &[UpliftField::NAME]
    }

    fn run(&self, ctx: &mut RunContext) -> Result<()> {
        let land = land_mask(ctx)?;
        let uplift = ctx.artifacts.read::<UpliftField>()?;
        let tagged = margins::classify(&ctx.grid, &land, uplift, &self.config);
        debug!(
            segments = tagged.segments,
            active = tagged.active.len(),
            passive = tagged.passive.len(),
            "margins tagged"
        );
        let story = ctx.story_mut();
        for index in tagged.active {
            story.active_margin[index] = 1;
        }
        for index in tagged.passive {
            story.passive_margin[index] = 1;
        }
        Ok(())
    }
}

pub struct HotspotsStep {
    pub config: HotspotConfig,
}

impl Step for HotspotsStep {
    fn id(&self) -> &'static str {
        HOTSPOTS_STEP
    }

    fn run(&self, ctx: &mut RunContext) -> Result<()> {
        let land = land_mask(ctx)?;
        let mut rng = ctx.rng(HOTSPOTS_STEP, "trails");
        let trails = hotspots::seed_trails(&ctx.grid, &land, &self.config, &mut rng);
        let points: usize = trails.iter().map(Vec::len).sum();
        debug!(trails = trails.len(), points, "hotspot trails seeded");
        if trails.is_empty() && self.config.max_trails > 0 {
            ctx.diagnostics.warn(
                HOTSPOTS_STEP,
                Code::NoHotspotSites,
                format!(
                    "no open water at least {} tiles from land",
                    self.config.min_land_distance
                ),
            );
        }
        let story = ctx.story_mut();
        for index in trails.into_iter().flatten() {
            story.hotspot[index] = 1;
        }
        Ok(())
    }
}

pub struct RiftsStep {
    pub config: RiftConfig,
}

impl Step for RiftsStep {
    fn id(&self) -> &'static str {
        RIFTS_STEP
    }

    fn requires(&self) -> &'static [&'static str] {
        &[UpliftField::NAME]
    }

    fn run(&self, ctx: &mut RunContext) -> Result<()> {
        let land = land_mask(ctx)?;
        let uplift = ctx.artifacts.read::<UpliftField>()?;
        let traced = rifts::trace(&ctx.grid, &land, &uplift.rift, &self.config);
        debug!(
            lines = traced.lines,
            shoulders = traced.shoulder.iter().filter(|&&s| s != 0).count(),
            "rifts traced"
        );
        let story = ctx.story_mut();
        story.rift_line = traced.line;
        story.rift_shoulder = traced.shoulder;
        Ok(())
    }
}

pub struct CorridorsStep {
    pub config: CorridorConfig,
}

impl Step for CorridorsStep {
    fn id(&self) -> &'static str {
        CORRIDORS_STEP
    }

    fn requires(&self) -> &'static [&'static str] {
        &[Heightfield::NAME]
    }

    fn provides(&self) -> &'static [&'static str] {
        &[StoryOverlays::NAME]
    }

    fn declare(&self, store: &mut ArtifactStore) {
        store.declare::<StoryOverlays>();
    }

    fn run(&self, ctx: &mut RunContext) -> Result<()> {
        let grid = ctx.grid;
        let heightfield = ctx.artifacts.read::<Heightfield>()?;
        let land: Vec<bool> = (0..grid.size()).map(|i| heightfield.is_land(i)).collect();
        let water: Vec<bool> = land.iter().map(|&l| !l).collect();

        let lanes = corridors::sea_lanes(&grid, &water, &self.config.sea);
        let shoulder = ctx
            .buffers
            .story
            .as_ref()
            .map(|story| story.rift_shoulder.clone())
            .unwrap_or_else(|| vec![0; grid.size()]);
        let land_runs = corridors::land_corridors(&grid, &land, &shoulder, &self.config.land);
        debug!(
            sea_lanes = lanes.len(),
            land_corridors = land_runs.len(),
            "corridors tagged"
        );

        let story = ctx.story_mut();
        for lane in &lanes {
            for index in lane.tiles(&grid) {
                story.sea_lane[index] = 1;
            }
        }
        for run in &land_runs {
            for index in run.tiles(&grid) {
                story.land_corridor[index] = 1;
            }
        }
        let overlays = story.snapshot();
        ctx.artifacts.publish(overlays)
    }
}
