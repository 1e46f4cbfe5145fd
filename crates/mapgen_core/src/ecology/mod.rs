//! Ecology stage: soils, resource basins, biomes, and the feature and
//! plot-effect plans that dress the finished terrain.
//!
//! Classification is pure over published artifacts. The random families
//! (features, plot effects) each roll on their own seeded stream, so
//! enabling one family never perturbs another.

pub mod apply;
pub mod basins;
pub mod biomes;
pub mod edges;
pub mod effects;
pub mod features;
pub mod pedology;

pub use apply::ApplyConfig;
pub use basins::{BasinConfig, ResourceTarget};
pub use biomes::BiomeConfig;
pub use edges::BiomeEdgeStrategy;
pub use effects::PlotEffectsConfig;
pub use features::FeaturePlanConfig;
pub use pedology::{PedologyStrategy, SoilInputs};

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_with::{skip_serializing_none, SerializeDisplay};
use tracing::debug;

use crate::artifacts::{check_domain, check_finite, check_len, Artifact, ArtifactStore, Shape};
use crate::context::RunContext;
use crate::diagnostics::Code;
use crate::error::Result;
use crate::grid::Grid;
use crate::hydrology::ClimateField;
use crate::morphology::{Drainage, Heightfield};
use crate::narrative::StoryOverlays;
use crate::noise_field::perlin_field;
use crate::rng::noise_seed;
use crate::step::Step;

pub const PEDOLOGY_STEP: &str = "ecology/pedology";
pub const BASINS_STEP: &str = "ecology/resource-basins";
pub const BIOMES_STEP: &str = "ecology/biomes";
pub const BIOME_EDGES_STEP: &str = "ecology/biome-edges";
pub const FEATURE_PLAN_STEP: &str = "ecology/feature-plan";
pub const PLOT_EFFECTS_STEP: &str = "ecology/plot-effects";
pub const FEATURE_APPLY_STEP: &str = "ecology/feature-apply";

/// Per-tile feature value for a bare tile.
pub const NO_FEATURE: i16 = -1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoilType {
    Bedrock,
    Sandy,
    Loam,
    Clay,
    Peat,
    Volcanic,
    Alluvial,
}

impl SoilType {
    pub const COUNT: usize = 7;
    pub const ALL: [SoilType; Self::COUNT] = [
        SoilType::Bedrock,
        SoilType::Sandy,
        SoilType::Loam,
        SoilType::Clay,
        SoilType::Peat,
        SoilType::Volcanic,
        SoilType::Alluvial,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    /// Relative fertility of the parent material.
    pub fn fertility_factor(self) -> f64 {
        match self {
            SoilType::Bedrock => 0.2,
            SoilType::Sandy => 0.5,
            SoilType::Loam => 1.0,
            SoilType::Clay => 0.8,
            SoilType::Peat => 0.7,
            SoilType::Volcanic => 1.1,
            SoilType::Alluvial => 1.15,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiomeId {
    Snow,
    Tundra,
    Boreal,
    TemperateDry,
    TemperateHumid,
    TropicalSeasonal,
    TropicalRainforest,
    Desert,
    Marine,
}

impl BiomeId {
    pub const COUNT: usize = 9;
    pub const ALL: [BiomeId; Self::COUNT] = [
        BiomeId::Snow,
        BiomeId::Tundra,
        BiomeId::Boreal,
        BiomeId::TemperateDry,
        BiomeId::TemperateHumid,
        BiomeId::TropicalSeasonal,
        BiomeId::TropicalRainforest,
        BiomeId::Desert,
        BiomeId::Marine,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    /// Host biome identifier this symbol is bound to.
    pub fn host_id(self) -> &'static str {
        match self {
            BiomeId::Snow | BiomeId::Tundra | BiomeId::Boreal => "BIOME_TUNDRA",
            BiomeId::TemperateDry => "BIOME_PLAINS",
            BiomeId::TemperateHumid | BiomeId::TropicalSeasonal => "BIOME_GRASSLAND",
            BiomeId::TropicalRainforest => "BIOME_TROPICAL",
            BiomeId::Desert => "BIOME_DESERT",
            BiomeId::Marine => "BIOME_MARINE",
        }
    }
}

/// One value per land biome. Marine tiles never read from it.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(
    deny_unknown_fields,
    default,
    bound(deserialize = "T: Deserialize<'de> + Default")
)]
pub struct PerBiome<T> {
    pub snow: T,
    pub tundra: T,
    pub boreal: T,
    pub temperate_dry: T,
    pub temperate_humid: T,
    pub tropical_seasonal: T,
    pub tropical_rainforest: T,
    pub desert: T,
}

impl<T> PerBiome<T> {
    pub fn get(&self, biome: BiomeId) -> Option<&T> {
        match biome {
            BiomeId::Snow => Some(&self.snow),
            BiomeId::Tundra => Some(&self.tundra),
            BiomeId::Boreal => Some(&self.boreal),
            BiomeId::TemperateDry => Some(&self.temperate_dry),
            BiomeId::TemperateHumid => Some(&self.temperate_humid),
            BiomeId::TropicalSeasonal => Some(&self.tropical_seasonal),
            BiomeId::TropicalRainforest => Some(&self.tropical_rainforest),
            BiomeId::Desert => Some(&self.desert),
            BiomeId::Marine => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeatureFamily {
    Vegetation,
    Wetland,
    Reef,
    Ice,
}

/// Host feature symbols; serialized as their `FEATURE_*` identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, SerializeDisplay)]
pub enum FeatureKind {
    Forest,
    Rainforest,
    Taiga,
    SavannaWoodland,
    SagebrushSteppe,
    Marsh,
    TundraBog,
    Mangrove,
    Oasis,
    WateringHole,
    Reef,
    ColdReef,
    Atoll,
    Ice,
}

impl FeatureKind {
    pub const ALL: [FeatureKind; 14] = [
        FeatureKind::Forest,
        FeatureKind::Rainforest,
        FeatureKind::Taiga,
        FeatureKind::SavannaWoodland,
        FeatureKind::SagebrushSteppe,
        FeatureKind::Marsh,
        FeatureKind::TundraBog,
        FeatureKind::Mangrove,
        FeatureKind::Oasis,
        FeatureKind::WateringHole,
        FeatureKind::Reef,
        FeatureKind::ColdReef,
        FeatureKind::Atoll,
        FeatureKind::Ice,
    ];

    pub fn code(self) -> i16 {
        self as i16
    }

    pub fn from_code(code: i16) -> Option<Self> {
        usize::try_from(code)
            .ok()
            .and_then(|slot| Self::ALL.get(slot).copied())
    }

    pub fn family(self) -> FeatureFamily {
        use FeatureKind::*;
        match self {
            Forest | Rainforest | Taiga | SavannaWoodland | SagebrushSteppe => {
                FeatureFamily::Vegetation
            }
            Marsh | TundraBog | Mangrove | Oasis | WateringHole => FeatureFamily::Wetland,
            Reef | ColdReef | Atoll => FeatureFamily::Reef,
            Ice => FeatureFamily::Ice,
        }
    }

    pub fn host_id(self) -> &'static str {
        match self {
            FeatureKind::Forest => "FEATURE_FOREST",
            FeatureKind::Rainforest => "FEATURE_RAINFOREST",
            FeatureKind::Taiga => "FEATURE_TAIGA",
            FeatureKind::SavannaWoodland => "FEATURE_SAVANNA_WOODLAND",
            FeatureKind::SagebrushSteppe => "FEATURE_SAGEBRUSH_STEPPE",
            FeatureKind::Marsh => "FEATURE_MARSH",
            FeatureKind::TundraBog => "FEATURE_TUNDRA_BOG",
            FeatureKind::Mangrove => "FEATURE_MANGROVE",
            FeatureKind::Oasis => "FEATURE_OASIS",
            FeatureKind::WateringHole => "FEATURE_WATERING_HOLE",
            FeatureKind::Reef => "FEATURE_REEF",
            FeatureKind::ColdReef => "FEATURE_COLD_REEF",
            FeatureKind::Atoll => "FEATURE_ATOLL",
            FeatureKind::Ice => "FEATURE_ICE",
        }
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.host_id())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, SerializeDisplay)]
pub enum PlotEffect {
    SnowLight,
    SnowMedium,
    SnowHeavy,
    Sand,
    Burned,
}

impl PlotEffect {
    pub fn host_id(self) -> &'static str {
        match self {
            PlotEffect::SnowLight => "PLOTEFFECT_SNOW_LIGHT_PERMANENT",
            PlotEffect::SnowMedium => "PLOTEFFECT_SNOW_MEDIUM_PERMANENT",
            PlotEffect::SnowHeavy => "PLOTEFFECT_SNOW_HEAVY_PERMANENT",
            PlotEffect::Sand => "PLOTEFFECT_SAND",
            PlotEffect::Burned => "PLOTEFFECT_BURNED",
        }
    }
}

impl fmt::Display for PlotEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.host_id())
    }
}

fn check_in_bounds(
    issues: &mut Vec<String>,
    field: &str,
    slot: usize,
    x: u32,
    y: u32,
    grid: &Grid,
) {
    if x >= grid.width || y >= grid.height {
        issues.push(format!(
            "{field}[{slot}] at ({x}, {y}) is outside {}x{}",
            grid.width, grid.height
        ));
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Pedology {
    pub soil_type: Vec<u8>,
    pub fertility: Vec<f32>,
}

impl Artifact for Pedology {
    const NAME: &'static str = "ecology.pedology";
    const SHAPE: Shape = Shape::PerTile(&["soil_type", "fertility"]);

    fn validate(&self, grid: &Grid) -> Vec<String> {
        let mut issues = Vec::new();
        check_len(&mut issues, "soil_type", self.soil_type.len(), grid);
        check_len(&mut issues, "fertility", self.fertility.len(), grid);
        check_domain(&mut issues, "soil_type", &self.soil_type, SoilType::Alluvial.code());
        check_finite(&mut issues, "fertility", &self.fertility);
        if let Some(position) = self.fertility.iter().position(|f| !(0.0..=1.0).contains(f)) {
            issues.push(format!("fertility[{position}] is outside [0, 1]"));
        }
        issues
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Basin {
    pub resource_id: String,
    pub plots: Vec<usize>,
    pub intensity: Vec<f32>,
    pub confidence: f32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ResourceBasins {
    pub basins: Vec<Basin>,
}

impl Artifact for ResourceBasins {
    const NAME: &'static str = "ecology.resource-basins";
    const SHAPE: Shape = Shape::Records;

    fn validate(&self, grid: &Grid) -> Vec<String> {
        let mut issues = Vec::new();
        for (slot, basin) in self.basins.iter().enumerate() {
            if basin.resource_id.is_empty() {
                issues.push(format!("basins[{slot}] has an empty resource_id"));
            }
            if basin.plots.len() != basin.intensity.len() {
                issues.push(format!(
                    "basins[{slot}] has {} plots but {} intensities",
                    basin.plots.len(),
                    basin.intensity.len()
                ));
            }
            if let Some(plot) = basin.plots.iter().find(|&&p| p >= grid.size()) {
                issues.push(format!("basins[{slot}] plot {plot} is off the grid"));
            }
            if !(0.0..=1.0).contains(&basin.confidence) {
                issues.push(format!("basins[{slot}] confidence is outside [0, 1]"));
            }
        }
        issues
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BiomeField {
    pub biome_index: Vec<u8>,
    pub vegetation_density: Vec<f32>,
    pub effective_moisture: Vec<f32>,
    pub surface_temperature: Vec<f32>,
    pub aridity_index: Vec<f32>,
    pub freeze_index: Vec<f32>,
}

impl BiomeField {
    fn floats(&self) -> [(&'static str, &[f32]); 5] {
        [
            ("vegetation_density", self.vegetation_density.as_slice()),
            ("effective_moisture", self.effective_moisture.as_slice()),
            ("surface_temperature", self.surface_temperature.as_slice()),
            ("aridity_index", self.aridity_index.as_slice()),
            ("freeze_index", self.freeze_index.as_slice()),
        ]
    }
}

impl Artifact for BiomeField {
    const NAME: &'static str = "ecology.biomes";
    const SHAPE: Shape = Shape::PerTile(&[
        "biome_index",
        "vegetation_density",
        "effective_moisture",
        "surface_temperature",
        "aridity_index",
        "freeze_index",
    ]);

    fn validate(&self, grid: &Grid) -> Vec<String> {
        let mut issues = Vec::new();
        check_len(&mut issues, "biome_index", self.biome_index.len(), grid);
        check_domain(&mut issues, "biome_index", &self.biome_index, BiomeId::Marine.code());
        for (field, values) in self.floats() {
            check_len(&mut issues, field, values.len(), grid);
            check_finite(&mut issues, field, values);
        }
        issues
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RefinedBiomes {
    pub biome_index: Vec<u8>,
    /// Tiles relabelled by edge refinement.
    pub changed: u32,
}

impl Artifact for RefinedBiomes {
    const NAME: &'static str = "ecology.biome-edges";
    const SHAPE: Shape = Shape::PerTile(&["biome_index"]);

    fn validate(&self, grid: &Grid) -> Vec<String> {
        let mut issues = Vec::new();
        check_len(&mut issues, "biome_index", self.biome_index.len(), grid);
        check_domain(&mut issues, "biome_index", &self.biome_index, BiomeId::Marine.code());
        issues
    }
}

#[skip_serializing_none]
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FeaturePlacement {
    pub x: u32,
    pub y: u32,
    pub feature: FeatureKind,
    pub weight: Option<f32>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct FeatureIntents {
    pub vegetation: Vec<FeaturePlacement>,
    pub wetlands: Vec<FeaturePlacement>,
    pub reefs: Vec<FeaturePlacement>,
    pub ice: Vec<FeaturePlacement>,
}

impl FeatureIntents {
    fn families(&self) -> [(&'static str, FeatureFamily, &[FeaturePlacement]); 4] {
        [
            ("ice", FeatureFamily::Ice, self.ice.as_slice()),
            ("reefs", FeatureFamily::Reef, self.reefs.as_slice()),
            ("wetlands", FeatureFamily::Wetland, self.wetlands.as_slice()),
            ("vegetation", FeatureFamily::Vegetation, self.vegetation.as_slice()),
        ]
    }

    /// Every placement, ice first, then reefs, wetlands, and vegetation.
    pub fn in_priority_order(&self) -> impl Iterator<Item = &FeaturePlacement> {
        self.ice
            .iter()
            .chain(&self.reefs)
            .chain(&self.wetlands)
            .chain(&self.vegetation)
    }

    pub fn len(&self) -> usize {
        self.families().iter().map(|(_, _, list)| list.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Artifact for FeatureIntents {
    const NAME: &'static str = "ecology.feature-intents";
    const SHAPE: Shape = Shape::Records;

    fn validate(&self, grid: &Grid) -> Vec<String> {
        let mut issues = Vec::new();
        for (field, family, list) in self.families() {
            for (slot, placement) in list.iter().enumerate() {
                check_in_bounds(&mut issues, field, slot, placement.x, placement.y, grid);
                if placement.feature.family() != family {
                    issues.push(format!(
                        "{field}[{slot}] holds {} from another family",
                        placement.feature
                    ));
                }
                if placement.weight.map_or(false, |w| !w.is_finite()) {
                    issues.push(format!("{field}[{slot}] weight is not finite"));
                }
            }
        }
        issues
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlotEffectPlacement {
    pub x: u32,
    pub y: u32,
    pub effect: PlotEffect,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PlotEffects {
    pub placements: Vec<PlotEffectPlacement>,
}

impl Artifact for PlotEffects {
    const NAME: &'static str = "ecology.plot-effects";
    const SHAPE: Shape = Shape::Records;

    fn validate(&self, grid: &Grid) -> Vec<String> {
        let mut issues = Vec::new();
        let mut seen = vec![false; grid.size()];
        for (slot, placement) in self.placements.iter().enumerate() {
            check_in_bounds(&mut issues, "placements", slot, placement.x, placement.y, grid);
            if placement.x < grid.width && placement.y < grid.height {
                let index = grid.index(placement.x, placement.y);
                if std::mem::replace(&mut seen[index], true) {
                    issues.push(format!("placements[{slot}] repeats tile {index}"));
                }
            }
        }
        issues
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FeatureField {
    /// Feature code per tile, [`NO_FEATURE`] when bare.
    pub feature: Vec<i16>,
    pub placements: Vec<FeaturePlacement>,
    pub rejected: u32,
    pub allow_overlap: bool,
}

impl Artifact for FeatureField {
    const NAME: &'static str = "ecology.features";
    const SHAPE: Shape = Shape::PerTile(&["feature"]);

    fn validate(&self, grid: &Grid) -> Vec<String> {
        let mut issues = Vec::new();
        check_len(&mut issues, "feature", self.feature.len(), grid);
        if let Some(position) = self
            .feature
            .iter()
            .position(|&f| f != NO_FEATURE && FeatureKind::from_code(f).is_none())
        {
            issues.push(format!(
                "feature[{position}] = {} is not a feature code",
                self.feature[position]
            ));
        }
        let mut seen = vec![false; grid.size()];
        for (slot, placement) in self.placements.iter().enumerate() {
            check_in_bounds(&mut issues, "placements", slot, placement.x, placement.y, grid);
            if placement.x >= grid.width || placement.y >= grid.height || self.allow_overlap {
                continue;
            }
            let index = grid.index(placement.x, placement.y);
            if std::mem::replace(&mut seen[index], true) {
                issues.push(format!("tile {index} holds more than one feature"));
            } else if self.feature.get(index) != Some(&placement.feature.code()) {
                issues.push(format!("placements[{slot}] disagrees with feature[{index}]"));
            }
        }
        issues
    }
}

fn land_of(heightfield: &Heightfield) -> Vec<bool> {
    (0..heightfield.land_mask.len())
        .map(|i| heightfield.is_land(i))
        .collect()
}

pub struct PedologyStep {
    pub strategy: Box<dyn PedologyStrategy>,
}

impl Step for PedologyStep {
    fn id(&self) -> &'static str {
        PEDOLOGY_STEP
    }

    fn requires(&self) -> &'static [&'static str] {
        &[Heightfield::NAME, Drainage::NAME, ClimateField::NAME]
    }

    fn provides(&self) -> &'static [&'static str] {
        &[Pedology::NAME]
    }

    fn declare(&self, store: &mut ArtifactStore) {
        store.declare::<Pedology>();
    }

    fn run(&self, ctx: &mut RunContext) -> Result<()> {
        let heightfield = ctx.artifacts.read::<Heightfield>()?;
        let drainage = ctx.artifacts.read::<Drainage>()?;
        let climate = ctx.artifacts.read::<ClimateField>()?;
        let pedology = self.strategy.classify(&SoilInputs {
            grid: &ctx.grid,
            elevation: &heightfield.elevation,
            terrain: &heightfield.terrain,
            land: &heightfield.land_mask,
            volcano: &heightfield.volcano,
            sediment: &drainage.sediment,
            rainfall: &climate.rainfall,
            humidity: &climate.humidity,
        });
        let mut counts = [0usize; SoilType::COUNT];
        for &code in &pedology.soil_type {
            if let Some(slot) = counts.get_mut(code as usize) {
                *slot += 1;
            }
        }
        debug!(?counts, "soils classified");
        ctx.artifacts.publish(pedology)
    }
}

pub struct BasinsStep {
    pub config: BasinConfig,
}

impl Step for BasinsStep {
    fn id(&self) -> &'static str {
        BASINS_STEP
    }

    fn requires(&self) -> &'static [&'static str] {
        &[Heightfield::NAME, ClimateField::NAME, Pedology::NAME]
    }

    fn provides(&self) -> &'static [&'static str] {
        &[ResourceBasins::NAME]
    }

    fn declare(&self, store: &mut ArtifactStore) {
        store.declare::<ResourceBasins>();
    }

    fn run(&self, ctx: &mut RunContext) -> Result<()> {
        let land = land_of(ctx.artifacts.read::<Heightfield>()?);
        let climate = ctx.artifacts.read::<ClimateField>()?;
        let pedology = ctx.artifacts.read::<Pedology>()?;
        let plan = basins::plan(
            &basins::BasinInputs {
                grid: &ctx.grid,
                land: &land,
                fertility: &pedology.fertility,
                rainfall: &climate.rainfall,
            },
            &self.config,
        );
        debug!(basins = plan.basins.len(), "resource basins planned");
        for id in &plan.starved {
            ctx.diagnostics.warn(
                BASINS_STEP,
                Code::NoResourceCandidates,
                format!("no tile meets min_confidence for {id}"),
            );
        }
        ctx.artifacts.publish(ResourceBasins {
            basins: plan.basins,
        })
    }
}

pub struct BiomesStep {
    pub config: BiomeConfig,
}

impl Step for BiomesStep {
    fn id(&self) -> &'static str {
        BIOMES_STEP
    }

    fn requires(&self) -> &'static [&'static str] {
        &[
            Heightfield::NAME,
            Drainage::NAME,
            StoryOverlays::NAME,
            ClimateField::NAME,
        ]
    }

    fn provides(&self) -> &'static [&'static str] {
        &[BiomeField::NAME]
    }

    fn declare(&self, store: &mut ArtifactStore) {
        store.declare::<BiomeField>();
    }

    fn run(&self, ctx: &mut RunContext) -> Result<()> {
        let grid = ctx.grid;
        let latitude = ctx.tile_latitudes();
        let noise = perlin_field(
            &grid,
            noise_seed(ctx.root_seed, BIOMES_STEP, "moisture"),
            self.config.noise.frequency,
        );
        let heightfield = ctx.artifacts.read::<Heightfield>()?;
        let drainage = ctx.artifacts.read::<Drainage>()?;
        let overlays = ctx.artifacts.read::<StoryOverlays>()?;
        let climate = ctx.artifacts.read::<ClimateField>()?;
        let land = land_of(heightfield);
        let river_distance = grid.distance_field(|i| drainage.river_mask[i] != 0, 1);

        let field = biomes::classify(
            &biomes::BiomeInputs {
                grid: &grid,
                latitude: &latitude,
                elevation: &heightfield.elevation,
                land: &land,
                rainfall: &climate.rainfall,
                humidity: &climate.humidity,
                river_distance: &river_distance,
                land_corridor: &overlays.land_corridor,
                rift_shoulder: &overlays.rift_shoulder,
                noise: &noise,
            },
            &self.config,
        );
        let mut counts = [0usize; BiomeId::COUNT];
        for &code in &field.biome_index {
            if let Some(slot) = counts.get_mut(code as usize) {
                *slot += 1;
            }
        }
        debug!(?counts, "biomes classified");
        ctx.artifacts.publish(field)
    }
}

pub struct BiomeEdgesStep {
    pub strategy: Box<dyn BiomeEdgeStrategy>,
}

impl Step for BiomeEdgesStep {
    fn id(&self) -> &'static str {
        BIOME_EDGES_STEP
    }

    fn requires(&self) -> &'static [&'static str] {
        &[Heightfield::NAME, BiomeField::NAME]
    }

    fn provides(&self) -> &'static [&'static str] {
        &[RefinedBiomes::NAME]
    }

    fn declare(&self, store: &mut ArtifactStore) {
        store.declare::<RefinedBiomes>();
    }

    fn run(&self, ctx: &mut RunContext) -> Result<()> {
        let land = land_of(ctx.artifacts.read::<Heightfield>()?);
        let field = ctx.artifacts.read::<BiomeField>()?;
        let biome_index = self.strategy.refine(&ctx.grid, &field.biome_index, &land);
        let changed = biome_index
            .iter()
            .zip(&field.biome_index)
            .filter(|(a, b)| a != b)
            .count() as u32;
        debug!(changed, "biome edges refined");
        ctx.artifacts.publish(RefinedBiomes {
            biome_index,
            changed,
        })
    }
}

pub struct FeaturePlanStep {
    pub config: FeaturePlanConfig,
}

impl Step for FeaturePlanStep {
    fn id(&self) -> &'static str {
        FEATURE_PLAN_STEP
    }

    fn requires(&self) -> &'static [&'static str] {
        &[
            Heightfield::NAME,
            Drainage::NAME,
            StoryOverlays::NAME,
            BiomeField::NAME,
            RefinedBiomes::NAME,
        ]
    }

    fn provides(&self) -> &'static [&'static str] {
        &[FeatureIntents::NAME]
    }

    fn declare(&self, store: &mut ArtifactStore) {
        store.declare::<FeatureIntents>();
    }

    fn run(&self, ctx: &mut RunContext) -> Result<()> {
        let grid = ctx.grid;
        let latitude = ctx.tile_latitudes();
        let mut vegetation_rng = ctx.rng(FEATURE_PLAN_STEP, "vegetation");
        let mut wetland_rng = ctx.rng(FEATURE_PLAN_STEP, "wetlands");
        let mut reef_rng = ctx.rng(FEATURE_PLAN_STEP, "reefs");
        let mut ice_rng = ctx.rng(FEATURE_PLAN_STEP, "ice");

        let heightfield = ctx.artifacts.read::<Heightfield>()?;
        let drainage = ctx.artifacts.read::<Drainage>()?;
        let overlays = ctx.artifacts.read::<StoryOverlays>()?;
        let field = ctx.artifacts.read::<BiomeField>()?;
        let refined = ctx.artifacts.read::<RefinedBiomes>()?;
        let land = land_of(heightfield);
        let river_distance = grid.distance_field(
            |i| drainage.river_mask[i] != 0,
            self.config.wetlands.river_radius,
        );

        let inputs = features::FeatureInputs {
            grid: &grid,
            latitude: &latitude,
            terrain: &heightfield.terrain,
            land: &land,
            biome: &refined.biome_index,
            vegetation: &field.vegetation_density,
            moisture: &field.effective_moisture,
            temperature: &field.surface_temperature,
            aridity: &field.aridity_index,
            freeze: &field.freeze_index,
            river_distance: &river_distance,
            hotspot: &overlays.hotspot,
            natural_wonders: &ctx.natural_wonders,
        };
        let config = &self.config;
        let intents = FeatureIntents {
            vegetation: features::plan_vegetation(&inputs, &config.vegetation, &mut vegetation_rng),
            wetlands: features::plan_wetlands(&inputs, &config.wetlands, &mut wetland_rng),
            reefs: features::plan_reefs(&inputs, &config.reefs, &mut reef_rng),
            ice: features::plan_ice(&inputs, &config.ice, &mut ice_rng),
        };
        debug!(
            vegetation = intents.vegetation.len(),
            wetlands = intents.wetlands.len(),
            reefs = intents.reefs.len(),
            ice = intents.ice.len(),
            "feature intents planned"
        );
        ctx.artifacts.publish(intents)
    }
}

pub struct PlotEffectsStep {
    pub config: PlotEffectsConfig,
}

impl Step for PlotEffectsStep {
    fn id(&self) -> &'static str {
        PLOT_EFFECTS_STEP
    }

    fn requires(&self) -> &'static [&'static str] {
        &[Heightfield::NAME, BiomeField::NAME, RefinedBiomes::NAME]
    }

    fn provides(&self) -> &'static [&'static str] {
        &[PlotEffects::NAME]
    }

    fn declare(&self, store: &mut ArtifactStore) {
        store.declare::<PlotEffects>();
    }

    fn run(&self, ctx: &mut RunContext) -> Result<()> {
        let mut rngs = effects::EffectRngs {
            snow: ctx.rng(PLOT_EFFECTS_STEP, "snow"),
            sand: ctx.rng(PLOT_EFFECTS_STEP, "sand"),
            burned: ctx.rng(PLOT_EFFECTS_STEP, "burned"),
        };
        let heightfield = ctx.artifacts.read::<Heightfield>()?;
        let field = ctx.artifacts.read::<BiomeField>()?;
        let refined = ctx.artifacts.read::<RefinedBiomes>()?;
        let land = land_of(heightfield);
        let placements = effects::plan(
            &effects::EffectInputs {
                grid: &ctx.grid,
                land: &land,
                elevation: &heightfield.elevation,
                biome: &refined.biome_index,
                field,
            },
            &self.config,
            &mut rngs,
        );
        debug!(effects = placements.len(), "plot effects planned");
        ctx.artifacts.publish(PlotEffects { placements })
    }
}

pub struct FeatureApplyStep {
    pub config: ApplyConfig,
}

impl Step for FeatureApplyStep {
    fn id(&self) -> &'static str {
        FEATURE_APPLY_STEP
    }

    fn requires(&self) -> &'static [&'static str] {
        &[Heightfield::NAME, FeatureIntents::NAME]
    }

    fn provides(&self) -> &'static [&'static str] {
        &[FeatureField::NAME]
    }

    fn declare(&self, store: &mut ArtifactStore) {
        store.declare::<FeatureField>();
    }

    fn run(&self, ctx: &mut RunContext) -> Result<()> {
        let heightfield = ctx.artifacts.read::<Heightfield>()?;
        let intents = ctx.artifacts.read::<FeatureIntents>()?;
        let reserved: Vec<bool> = (0..ctx.grid.size())
            .map(|i| {
                let volcano = self.config.reserve_volcanoes && heightfield.volcano[i] != 0;
                let wonder = self.config.reserve_natural_wonders
                    && ctx.natural_wonders.get(i).map_or(false, |&w| w != 0);
                volcano || wonder
            })
            .collect();
        let field = apply::apply(&ctx.grid, intents, &reserved, &self.config);
        debug!(
            planned = intents.len(),
            accepted = field.placements.len(),
            rejected = field.rejected,
            "features applied"
        );
        ctx.artifacts.publish(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::morphology::TerrainType;
    use crate::narrative::StoryBuffer;
    use crate::strategy::StrategyChoice;

    #[test]
    fn codes_round_trip_through_tables() {
        for soil in SoilType::ALL {
            assert_eq!(SoilType::from_code(soil.code()), Some(soil));
        }
        for biome in BiomeId::ALL {
            assert_eq!(BiomeId::from_code(biome.code()), Some(biome));
        }
        for feature in FeatureKind::ALL {
            assert_eq!(FeatureKind::from_code(feature.code()), Some(feature));
        }
        assert_eq!(FeatureKind::from_code(NO_FEATURE), None);
    }

    #[test]
    fn symbols_serialize_as_host_ids() {
        let placement = FeaturePlacement {
            x: 1,
            y: 2,
            feature: FeatureKind::Ice,
            weight: None,
        };
        let json = serde_json::to_value(&placement).unwrap();
        assert_eq!(json["feature"], "FEATURE_ICE");
        assert!(json.get("weight").is_none());
        assert_eq!(
            serde_json::to_value(PlotEffect::SnowHeavy).unwrap(),
            "PLOTEFFECT_SNOW_HEAVY_PERMANENT"
        );
        assert_eq!(BiomeId::TemperateDry.host_id(), "BIOME_PLAINS");
    }

    #[test]
    fn per_biome_reads_land_slots_only() {
        let table = PerBiome {
            desert: 7,
            ..PerBiome::default()
        };
        assert_eq!(table.get(BiomeId::Desert), Some(&7));
        assert_eq!(table.get(BiomeId::Marine), None);
    }

    #[test]
    fn intents_reject_cross_family_entries() {
        let intents = FeatureIntents {
            ice: vec![FeaturePlacement {
                x: 0,
                y: 0,
                feature: FeatureKind::Forest,
                weight: None,
            }],
            ..FeatureIntents::default()
        };
        let issues = intents.validate(&Grid::new(2, 2, false));
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("FEATURE_FOREST"));
    }

    #[test]
    fn feature_field_rejects_stacked_tiles() {
        let ice = FeaturePlacement {
            x: 0,
            y: 0,
            feature: FeatureKind::Ice,
            weight: None,
        };
        let mut field = FeatureField {
            feature: vec![FeatureKind::Ice.code(), NO_FEATURE],
            placements: vec![ice.clone(), ice],
            rejected: 0,
            allow_overlap: false,
        };
        let grid = Grid::new(2, 1, false);
        assert_eq!(field.validate(&grid).len(), 1);
        field.allow_overlap = true;
        assert!(field.validate(&grid).is_empty());
    }

    #[test]
    fn plot_effects_reject_out_of_bounds() {
        let effects = PlotEffects {
            placements: vec![PlotEffectPlacement {
                x: 5,
                y: 0,
                effect: PlotEffect::Sand,
            }],
        };
        assert_eq!(effects.validate(&Grid::new(2, 2, false)).len(), 1);
    }

    /// 6x6 grid, land in the middle 4x4 with a river column at x = 2.
    fn island_context() -> RunContext {
        let grid = Grid::new(6, 6, false);
        let latitudes = vec![60.0, 40.0, 20.0, 0.0, -20.0, -40.0];
        let mut ctx = RunContext::new(grid, latitudes, 99).unwrap();
        let land: Vec<bool> = (0..grid.size())
            .map(|i| {
                let (x, y) = grid.coords(i);
                (1..5).contains(&x) && (1..5).contains(&y)
            })
            .collect();
        let heightfield = Heightfield {
            elevation: land.iter().map(|&l| if l { 400 } else { -800 }).collect(),
            terrain: land
                .iter()
                .map(|&l| {
                    if l {
                        TerrainType::Flat.code()
                    } else {
                        TerrainType::Coast.code()
                    }
                })
                .collect(),
            land_mask: land.iter().map(|&l| u8::from(l)).collect(),
            volcano: vec![0; grid.size()],
        };
        let river_mask: Vec<u8> = (0..grid.size())
            .map(|i| u8::from(land[i] && grid.coords(i).0 == 2))
            .collect();
        let drainage = Drainage {
            flow_accumulation: vec![1.0; grid.size()],
            sediment: river_mask.iter().map(|&r| f32::from(r) * 2.0).collect(),
            river_mask,
        };
        let climate = ClimateField {
            rainfall: vec![120; grid.size()],
            humidity: vec![140; grid.size()],
        };
        ctx.artifacts.declare::<Heightfield>();
        ctx.artifacts.declare::<Drainage>();
        ctx.artifacts.declare::<ClimateField>();
        ctx.artifacts.declare::<StoryOverlays>();
        ctx.artifacts.publish(heightfield).unwrap();
        ctx.artifacts.publish(drainage).unwrap();
        ctx.artifacts.publish(climate).unwrap();
        ctx.artifacts
            .publish(StoryBuffer::new(grid.size()).snapshot())
            .unwrap();
        ctx
    }

    fn ecology_steps() -> Vec<Box<dyn Step>> {
        vec![
            Box::new(PedologyStep {
                strategy: pedology::registry()
                    .resolve(&StrategyChoice::named("default"))
                    .unwrap(),
            }),
            Box::new(BasinsStep {
                config: BasinConfig::default(),
            }),
            Box::new(BiomesStep {
                config: BiomeConfig::default(),
            }),
            Box::new(BiomeEdgesStep {
                strategy: edges::registry()
                    .resolve(&StrategyChoice::named("vote"))
                    .unwrap(),
            }),
            Box::new(FeaturePlanStep {
                config: FeaturePlanConfig::default(),
            }),
            Box::new(PlotEffectsStep {
                config: PlotEffectsConfig::default(),
            }),
            Box::new(FeatureApplyStep {
                config: ApplyConfig::default(),
            }),
        ]
    }

    fn run_ecology() -> RunContext {
        let mut ctx = island_context();
        let steps = ecology_steps();
        for step in &steps {
            step.declare(&mut ctx.artifacts);
        }
        for step in &steps {
            step.run(&mut ctx).unwrap();
        }
        ctx
    }

    #[test]
    fn stage_publishes_every_artifact() {
        let ctx = run_ecology();
        for name in [
            Pedology::NAME,
            ResourceBasins::NAME,
            BiomeField::NAME,
            RefinedBiomes::NAME,
            FeatureIntents::NAME,
            PlotEffects::NAME,
            FeatureField::NAME,
        ] {
            assert!(ctx.artifacts.is_published(name), "{name} missing");
        }
        let biomes = ctx.artifacts.read::<RefinedBiomes>().unwrap();
        let heightfield = ctx.artifacts.read::<Heightfield>().unwrap();
        for (index, &code) in biomes.biome_index.iter().enumerate() {
            assert_eq!(code == BiomeId::Marine.code(), !heightfield.is_land(index));
        }
    }

    #[test]
    fn stage_is_repeatable() {
        let a = run_ecology();
        let b = run_ecology();
        for name in a.artifacts.names() {
            let left = a.artifacts.snapshot(name).unwrap().unwrap();
            let right = b.artifacts.snapshot(name).unwrap().unwrap();
            assert_eq!(left, right, "{name} differs");
        }
    }
}
