//! Morphology stage: land mask, coasts, islands, relief and erosion.
//!
//! Steps in this stage share a mutable [`HeightfieldBuffer`] held by the run
//! context. The read-only [`Heightfield`] artifact is a snapshot of that
//! buffer, published once erosion has finished.

mod coast;
mod erosion;
mod islands;
mod landmass;
mod relief;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::artifacts::{check_domain, check_finite, check_len, Artifact, ArtifactStore, Shape};
use crate::context::RunContext;
use crate::diagnostics::Code;
use crate::error::{check, check_range, Result};
use crate::fixed::clamp_i16;
use crate::foundation::{CrustType, PlateGraph, PlateMesh, UpliftField};
use crate::grid::Grid;
use crate::noise_field::{fractal_field, FractalConfig};
use crate::rng::noise_seed;
use crate::step::Step;

pub const LANDMASS_STEP: &str = "morphology/landmass";
pub const COASTLINES_STEP: &str = "morphology/coastlines";
pub const ISLANDS_STEP: &str = "morphology/islands";
pub const MOUNTAINS_STEP: &str = "morphology/mountains";
pub const GEOMORPHOLOGY_STEP: &str = "morphology/geomorphology";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerrainType {
    Ocean,
    Coast,
    Flat,
    Hill,
    Mountain,
}

impl TerrainType {
    pub const ALL: [TerrainType; 5] = [
        TerrainType::Ocean,
        TerrainType::Coast,
        TerrainType::Flat,
        TerrainType::Hill,
        TerrainType::Mountain,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    pub fn is_water(self) -> bool {
        matches!(self, TerrainType::Ocean | TerrainType::Coast)
    }

    /// Host terrain identifier.
    pub fn host_id(self) -> &'static str {
        match self {
            TerrainType::Ocean => "TERRAIN_OCEAN",
            TerrainType::Coast => "TERRAIN_COAST",
            TerrainType::Flat => "TERRAIN_FLAT",
            TerrainType::Hill => "TERRAIN_HILL",
            TerrainType::Mountain => "TERRAIN_MOUNTAIN",
        }
    }
}

/// Working elevation state owned by the morphology stage.
#[derive(Clone, Debug, PartialEq)]
pub struct HeightfieldBuffer {
    pub elevation: Vec<f64>,
    pub terrain: Vec<TerrainType>,
    pub volcano: Vec<bool>,
}

impl HeightfieldBuffer {
    pub fn is_land(&self, index: usize) -> bool {
        !self.terrain[index].is_water()
    }

    pub fn land_count(&self) -> usize {
        self.terrain.iter().filter(|t| !t.is_water()).count()
    }

    pub fn snapshot(&self) -> Heightfield {
        Heightfield {
            elevation: self.elevation.iter().map(|&e| clamp_i16(e)).collect(),
            terrain: self.terrain.iter().map(|t| t.code()).collect(),
            land_mask: self.terrain.iter().map(|t| u8::from(!t.is_water())).collect(),
            volcano: self.volcano.iter().map(|&v| u8::from(v)).collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Heightfield {
    pub elevation: Vec<i16>,
    pub terrain: Vec<u8>,
    pub land_mask: Vec<u8>,
    pub volcano: Vec<u8>,
}

impl Heightfield {
    pub fn is_land(&self, index: usize) -> bool {
        self.land_mask[index] != 0
    }

    pub fn terrain_at(&self, index: usize) -> TerrainType {
        TerrainType::from_code(self.terrain[index]).unwrap_or(TerrainType::Ocean)
    }
}

impl Artifact for Heightfield {
    const NAME: &'static str = "morphology.heightfield";
    const SHAPE: Shape = Shape::PerTile(&["elevation", "terrain", "land_mask", "volcano"]);

    fn validate(&self, grid: &Grid) -> Vec<String> {
        let mut issues = Vec::new();
        check_len(&mut issues, "elevation", self.elevation.len(), grid);
        check_len(&mut issues, "terrain", self.terrain.len(), grid);
        check_len(&mut issues, "land_mask", self.land_mask.len(), grid);
        check_len(&mut issues, "volcano", self.volcano.len(), grid);
        check_domain(&mut issues, "terrain", &self.terrain, TerrainType::Mountain.code());
        check_domain(&mut issues, "land_mask", &self.land_mask, 1);
        for (index, (&terrain, &land)) in self.terrain.iter().zip(&self.land_mask).enumerate() {
            let water = TerrainType::from_code(terrain).map_or(true, TerrainType::is_water);
            if water == (land != 0) {
                issues.push(format!("terrain and land_mask disagree at tile {index}"));
                break;
            }
        }
        issues
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Drainage {
    pub flow_accumulation: Vec<f32>,
    pub river_mask: Vec<u8>,
    pub sediment: Vec<f32>,
}

impl Artifact for Drainage {
    const NAME: &'static str = "morphology.drainage";
    const SHAPE: Shape = Shape::PerTile(&["flow_accumulation", "river_mask", "sediment"]);

    fn validate(&self, grid: &Grid) -> Vec<String> {
        let mut issues = Vec::new();
        check_len(&mut issues, "flow_accumulation", self.flow_accumulation.len(), grid);
        check_len(&mut issues, "river_mask", self.river_mask.len(), grid);
        check_len(&mut issues, "sediment", self.sediment.len(), grid);
        check_domain(&mut issues, "river_mask", &self.river_mask, 1);
        check_finite(&mut issues, "sediment", &self.sediment);
        issues
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct LandmassConfig {
    pub water_percent: f64,
    pub tolerance_percent: f64,
    pub max_retries: u32,
    pub uplift_weight: f64,
    pub crust_weight: f64,
    pub noise_weight: f64,
    pub rift_weight: f64,
    pub polar_water_rows: u32,
    pub noise: FractalConfig,
}

impl Default for LandmassConfig {
    fn default() -> Self {
        Self {
            water_percent: 62.0,
            tolerance_percent: 2.5,
            max_retries: 3,
            uplift_weight: 0.55,
            crust_weight: 0.35,
            noise_weight: 0.25,
            rift_weight: 0.3,
            polar_water_rows: 0,
            noise: FractalConfig::default(),
        }
    }
}

impl LandmassConfig {
    pub fn validate(&self) -> Result<()> {
        check_range(self.water_percent, 0.0, 100.0, LANDMASS_STEP, "water_percent")?;
        check_range(self.tolerance_percent, 0.0, 50.0, LANDMASS_STEP, "tolerance_percent")?;
        check(self.max_retries <= 16, LANDMASS_STEP, "max_retries", "must be at most 16")?;
        check_range(self.uplift_weight, 0.0, 4.0, LANDMASS_STEP, "uplift_weight")?;
        check_range(self.crust_weight, 0.0, 4.0, LANDMASS_STEP, "crust_weight")?;
        check_range(self.noise_weight, 0.0, 4.0, LANDMASS_STEP, "noise_weight")?;
        check_range(self.rift_weight, 0.0, 4.0, LANDMASS_STEP, "rift_weight")?;
        self.noise.validate(LANDMASS_STEP)
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct CoastConfig {
    pub shelf_chance: f64,
    pub bay_chance: f64,
    pub convergent_closeness: f64,
    pub passive_shelf_bonus: f64,
}

impl Default for CoastConfig {
    fn default() -> Self {
        Self {
            shelf_chance: 0.85,
            bay_chance: 0.18,
            convergent_closeness: 0.5,
            passive_shelf_bonus: 0.1,
        }
    }
}

impl CoastConfig {
    pub fn validate(&self) -> Result<()> {
        check_range(self.shelf_chance, 0.0, 1.0, COASTLINES_STEP, "shelf_chance")?;
        check_range(self.bay_chance, 0.0, 1.0, COASTLINES_STEP, "bay_chance")?;
        check_range(
            self.convergent_closeness,
            0.0,
            1.0,
            COASTLINES_STEP,
            "convergent_closeness",
        )?;
        check_range(
            self.passive_shelf_bonus,
            0.0,
            1.0,
            COASTLINES_STEP,
            "passive_shelf_bonus",
        )
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct IslandConfig {
    /// Share of hotspot tiles that should surface as islands.
    pub coverage_target: f64,
    pub chance: f64,
    /// Relative shortfall accepted before a retry.
    pub tolerance: f64,
    pub max_retries: u32,
}

impl Default for IslandConfig {
    fn default() -> Self {
        Self {
            coverage_target: 0.3,
            chance: 0.3,
            tolerance: 0.25,
            max_retries: 3,
        }
    }
}

impl IslandConfig {
    pub fn validate(&self) -> Result<()> {
        check_range(self.coverage_target, 0.0, 1.0, ISLANDS_STEP, "coverage_target")?;
        check_range(self.chance, 0.0, 1.0, ISLANDS_STEP, "chance")?;
        check_range(self.tolerance, 0.0, 1.0, ISLANDS_STEP, "tolerance")?;
        check(self.max_retries <= 16, ISLANDS_STEP, "max_retries", "must be at most 16")
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct MountainConfig {
    pub tectonic_intensity: f64,
    pub tectonic_exponent: f64,
    pub noisiness: f64,
    pub noise_exponent: f64,
    pub mountain_threshold: f64,
    pub hill_threshold: f64,
    pub rift_depression: f64,
    pub mountain_height: f64,
    pub hill_height: f64,
    pub volcano_chance: f64,
    pub volcano_closeness: f64,
    pub volcano_spacing: u32,
    pub noise: FractalConfig,
}

impl Default for MountainConfig {
    fn default() -> Self {
        Self {
            tectonic_intensity: 1.0,
            tectonic_exponent: 1.2,
            noisiness: 0.45,
            noise_exponent: 1.6,
            mountain_threshold: 0.62,
            hill_threshold: 0.38,
            rift_depression: 0.4,
            mountain_height: 1_800.0,
            hill_height: 450.0,
            volcano_chance: 0.08,
            volcano_closeness: 0.6,
            volcano_spacing: 3,
            noise: FractalConfig {
                octaves: 4,
                frequency: 6.0,
                persistence: 0.55,
            },
        }
    }
}

impl MountainConfig {
    pub fn validate(&self) -> Result<()> {
        let step = MOUNTAINS_STEP;
        check_range(self.tectonic_intensity, 0.0, 8.0, step, "tectonic_intensity")?;
        check_range(self.tectonic_exponent, 0.1, 8.0, step, "tectonic_exponent")?;
        check_range(self.noisiness, 0.0, 8.0, step, "noisiness")?;
        check_range(self.noise_exponent, 0.1, 8.0, step, "noise_exponent")?;
        check_range(self.mountain_threshold, 0.0, 1.0, step, "mountain_threshold")?;
        check_range(self.hill_threshold, 0.0, self.mountain_threshold, step, "hill_threshold")?;
        check_range(self.rift_depression, 0.0, 4.0, step, "rift_depression")?;
        check_range(self.mountain_height, 0.0, 9_000.0, step, "mountain_height")?;
        check_range(self.hill_height, 0.0, 9_000.0, step, "hill_height")?;
        check_range(self.volcano_chance, 0.0, 1.0, step, "volcano_chance")?;
        check_range(self.volcano_closeness, 0.0, 1.0, step, "volcano_closeness")?;
        self.noise.validate(step)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorldAge {
    Young,
    Mature,
    Old,
}

impl WorldAge {
    pub fn eras(self) -> u32 {
        match self {
            WorldAge::Young => 2,
            WorldAge::Mature => 3,
            WorldAge::Old => 5,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct GeomorphologyConfig {
    pub world_age: WorldAge,
    /// Overrides the era count implied by `world_age`.
    pub eras: Option<u32>,
    pub erodibility: f64,
    pub area_exponent: f64,
    pub slope_exponent: f64,
    pub diffusivity: f64,
    pub talus_angle_deg: f64,
    pub deposition_rate: f64,
    pub cell_size_m: f64,
    pub river_min_drainage: f64,
}

impl Default for GeomorphologyConfig {
    fn default() -> Self {
        Self {
            world_age: WorldAge::Mature,
            eras: None,
            erodibility: 12.0,
            area_exponent: 0.5,
            slope_exponent: 1.0,
            diffusivity: 0.25,
            talus_angle_deg: 33.0,
            deposition_rate: 0.5,
            cell_size_m: 1_000.0,
            river_min_drainage: 12.0,
        }
    }
}

impl GeomorphologyConfig {
    pub fn era_count(&self) -> u32 {
        self.eras.unwrap_or_else(|| self.world_age.eras())
    }

    pub fn validate(&self) -> Result<()> {
        let step = GEOMORPHOLOGY_STEP;
        check(self.era_count() <= 12, step, "eras", "must be at most 12")?;
        check_range(self.erodibility, 0.0, 1_000.0, step, "erodibility")?;
        check_range(self.area_exponent, 0.0, 2.0, step, "area_exponent")?;
        check_range(self.slope_exponent, 0.1, 4.0, step, "slope_exponent")?;
        check_range(self.diffusivity, 0.0, 1.0, step, "diffusivity")?;
        check_range(self.talus_angle_deg, 1.0, 89.0, step, "talus_angle_deg")?;
        check_range(self.deposition_rate, 0.0, 1.0, step, "deposition_rate")?;
        check_range(self.cell_size_m, 1.0, 1.0e6, step, "cell_size_m")?;
        check_range(self.river_min_drainage, 1.0, 1.0e9, step, "river_min_drainage")
    }
}

fn hotspot_mask(ctx: &RunContext) -> Vec<u8> {
    ctx.buffers
        .story
        .as_ref()
        .map(|story| story.hotspot.clone())
        .unwrap_or_else(|| vec![0; ctx.grid.size()])
}

pub struct LandmassStep {
    pub config: LandmassConfig,
}

impl Step for LandmassStep {
    fn id(&self) -> &'static str {
        LANDMASS_STEP
    }

    fn requires(&self) -> &'static [&'static str] {
        &[PlateMesh::NAME, PlateGraph::NAME, UpliftField::NAME]
    }

    fn run(&self, ctx: &mut RunContext) -> Result<()> {
        let mesh = ctx.artifacts.read::<PlateMesh>()?;
        let graph = ctx.artifacts.read::<PlateGraph>()?;
        let uplift = ctx.artifacts.read::<UpliftField>()?;

        let continental: Vec<bool> = mesh
            .plate_id
            .iter()
            .map(|&id| graph.plates[id as usize].crust == CrustType::Continental)
            .collect();
        let noise = fractal_field(
            &ctx.grid,
            noise_seed(ctx.root_seed, LANDMASS_STEP, "relief"),
            &self.config.noise,
        );
        let scores = landmass::scores(
            &uplift.uplift,
            &uplift.rift,
            &continental,
            &noise,
            &self.config,
        );
        let outcome = landmass::build(&ctx.grid, &scores, &self.config);

        debug!(
            water_percent = outcome.water_percent,
            attempts = outcome.attempts,
            "land mask settled"
        );
        if !outcome.converged {
            ctx.diagnostics.warn(
                LANDMASS_STEP,
                Code::WaterCoverageOffTarget,
                format!(
                    "water {:.1}% after {} attempts, target {:.1}% +/- {:.1}",
                    outcome.water_percent,
                    outcome.attempts,
                    self.config.water_percent,
                    self.config.tolerance_percent
                ),
            );
        }
        ctx.buffers.heightfield = Some(outcome.buffer);
        Ok(())
    }
}

pub struct CoastlinesStep {
    pub config: CoastConfig,
}

impl Step for CoastlinesStep {
    fn id(&self) -> &'static str {
        COASTLINES_STEP
    }

    fn requires(&self) -> &'static [&'static str] {
        &[UpliftField::NAME]
    }

    fn run(&self, ctx: &mut RunContext) -> Result<()> {
        let stream = ctx.stream(COASTLINES_STEP, "coast");
        let buffer = ctx.buffers.heightfield_mut()?;
        let uplift = ctx.artifacts.read::<UpliftField>()?;
        let stats = coast::refine(&ctx.grid, buffer, uplift, &self.config, &stream);
        debug!(bays = stats.bays, shelf = stats.shelf, "coastline refined");
        Ok(())
    }
}

pub struct IslandsStep {
    pub config: IslandConfig,
}

impl Step for IslandsStep {
    fn id(&self) -> &'static str {
        ISLANDS_STEP
    }

    fn run(&self, ctx: &mut RunContext) -> Result<()> {
        let hotspot = hotspot_mask(ctx);
        let stream = ctx.stream(ISLANDS_STEP, "islands");
        let buffer = ctx.buffers.heightfield_mut()?;
        let outcome = islands::raise(&ctx.grid, buffer, &hotspot, &self.config, &stream);
        debug!(
            raised = outcome.raised,
            coverage = outcome.coverage,
            attempts = outcome.attempts,
            "islands raised"
        );
        if !outcome.converged {
            ctx.diagnostics.warn(
                ISLANDS_STEP,
                Code::IslandCoverageBelowTarget,
                format!(
                    "coverage {:.2} after {} attempts, target {:.2}",
                    outcome.coverage, outcome.attempts, self.config.coverage_target
                ),
            );
        }
        Ok(())
    }
}

pub struct MountainsStep {
    pub config: MountainConfig,
}

impl Step for MountainsStep {
    fn id(&self) -> &'static str {
        MOUNTAINS_STEP
    }

    fn requires(&self) -> &'static [&'static str] {
        &[UpliftField::NAME]
    }

    fn run(&self, ctx: &mut RunContext) -> Result<()> {
        let hotspot = hotspot_mask(ctx);
        let stream = ctx.stream(MOUNTAINS_STEP, "volcanoes");
        let noise = fractal_field(
            &ctx.grid,
            noise_seed(ctx.root_seed, MOUNTAINS_STEP, "relief"),
            &self.config.noise,
        );
        let buffer = ctx.buffers.heightfield_mut()?;
        let uplift = ctx.artifacts.read::<UpliftField>()?;
        let scores = relief::scores(buffer, uplift, &noise, &self.config);
        let stats = relief::apply(
            &ctx.grid,
            buffer,
            uplift,
            &hotspot,
            &scores,
            &self.config,
            &stream,
        );
        debug!(
            mountains = stats.mountains,
            hills = stats.hills,
            volcanoes = stats.volcanoes,
            "relief placed"
        );
        Ok(())
    }
}

pub struct GeomorphologyStep {
    pub config: GeomorphologyConfig,
}

impl Step for GeomorphologyStep {
    fn id(&self) -> &'static str {
        GEOMORPHOLOGY_STEP
    }

    fn provides(&self) -> &'static [&'static str] {
        &[Heightfield::NAME, Drainage::NAME]
    }

    fn declare(&self, store: &mut ArtifactStore) {
        store.declare::<Heightfield>();
        store.declare::<Drainage>();
    }

    fn run(&self, ctx: &mut RunContext) -> Result<()> {
        let grid = ctx.grid;
        let eras = self.config.era_count();
        let buffer = ctx.buffers.heightfield_mut()?;
        let report = erosion::run_eras(&grid, buffer, eras, &self.config);
        let threshold = self.config.river_min_drainage;
        let river_mask: Vec<u8> = (0..grid.size())
            .map(|i| u8::from(buffer.is_land(i) && report.flow_accumulation[i] >= threshold))
            .collect();
        debug!(
            eras,
            eroded_m = report.eroded_m,
            deposited_m = report.deposited_m,
            river_tiles = river_mask.iter().filter(|&&r| r != 0).count(),
            "erosion complete"
        );
        let heightfield = buffer.snapshot();
        let drainage = Drainage {
            flow_accumulation: report.flow_accumulation.iter().map(|&a| a as f32).collect(),
            river_mask,
            sediment: report.sediment.iter().map(|&s| s as f32).collect(),
        };
        ctx.artifacts.publish(heightfield)?;
        ctx.artifacts.publish(drainage)
    }
}
