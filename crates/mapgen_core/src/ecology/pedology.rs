use serde::Deserialize;
use serde_json::Value;

use crate::error::{check, check_range, Result};
use crate::fixed::{clamp01, ramp};
use crate::grid::Grid;
use crate::morphology::TerrainType;
use crate::strategy::{parse_config, Registry};

use super::{Pedology, SoilType, PEDOLOGY_STEP};

/// Rainfall that counts as fully wet for soil formation.
const WET_RAINFALL: f64 = 160.0;
const DRY_RAINFALL: f64 = 20.0;
const RUGGED_ELEVATION_M: f64 = 2_500.0;

/// Per-tile inputs shared by every pedology strategy.
pub struct SoilInputs<'a> {
    pub grid: &'a Grid,
    pub elevation: &'a [i16],
    pub terrain: &'a [u8],
    pub land: &'a [u8],
    pub volcano: &'a [u8],
    pub sediment: &'a [f32],
    pub rainfall: &'a [u8],
    pub humidity: &'a [u8],
}

pub trait PedologyStrategy {
    fn classify(&self, inputs: &SoilInputs<'_>) -> Pedology;
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct SoilWeights {
    pub climate_weight: f64,
    pub relief_weight: f64,
    pub sediment_weight: f64,
    pub bedrock_weight: f64,
    pub fertility_ceiling: f64,
    /// Deposited sediment (m) treated as a full alluvial layer.
    pub sediment_saturation_m: f64,
}

impl Default for SoilWeights {
    fn default() -> Self {
        Self {
            climate_weight: 1.0,
            relief_weight: 0.8,
            sediment_weight: 1.0,
            bedrock_weight: 0.6,
            fertility_ceiling: 0.95,
            sediment_saturation_m: 5.0,
        }
    }
}

impl SoilWeights {
    pub fn validate(&self) -> Result<()> {
        let step = PEDOLOGY_STEP;
        check_range(self.climate_weight, 0.0, 4.0, step, "climate_weight")?;
        check_range(self.relief_weight, 0.0, 4.0, step, "relief_weight")?;
        check_range(self.sediment_weight, 0.0, 4.0, step, "sediment_weight")?;
        check_range(self.bedrock_weight, 0.0, 4.0, step, "bedrock_weight")?;
        check_range(self.fertility_ceiling, 0.0, 1.0, step, "fertility_ceiling")?;
        check_range(self.sediment_saturation_m, 0.01, 1_000.0, step, "sediment_saturation_m")
    }
}

/// Normalized drivers of one land tile, all in `[0, 1]`.
#[derive(Clone, Copy, Debug)]
struct Sample {
    climate: f64,
    relief: f64,
    sediment: f64,
    mountain: bool,
    volcano: bool,
}

impl Sample {
    fn at(inputs: &SoilInputs<'_>, index: usize, weights: &SoilWeights) -> Self {
        let rain = ramp(f64::from(inputs.rainfall[index]), DRY_RAINFALL, WET_RAINFALL);
        let humid = f64::from(inputs.humidity[index]) / 255.0;
        Self {
            climate: rain * 0.7 + humid * 0.3,
            relief: ramp(f64::from(inputs.elevation[index]), 0.0, RUGGED_ELEVATION_M),
            sediment: ramp(
                f64::from(inputs.sediment[index]),
                0.0,
                weights.sediment_saturation_m,
            ),
            mountain: inputs.terrain[index] == TerrainType::Mountain.code(),
            volcano: inputs.volcano[index] != 0,
        }
    }
}

/// Formation scores indexed by `SoilType` code.
fn scores(sample: &Sample, weights: &SoilWeights) -> [f64; SoilType::COUNT] {
    let lowland = 1.0 - sample.relief;
    let mut scores = [0.0; SoilType::COUNT];
    scores[SoilType::Bedrock as usize] = weights.bedrock_weight
        * sample.relief
        * sample.relief
        * if sample.mountain { 1.5 } else { 1.0 };
    scores[SoilType::Sandy as usize] = 0.5 * (1.0 - sample.climate) * lowland;
    scores[SoilType::Loam as usize] =
        0.5 * weights.relief_weight * lowland * (1.0 - (sample.climate - 0.5).abs() * 2.0);
    scores[SoilType::Clay as usize] = 0.45 * weights.climate_weight * sample.climate * lowland;
    scores[SoilType::Peat as usize] =
        0.5 * weights.climate_weight * sample.climate.powi(3) * lowland.powi(2);
    scores[SoilType::Volcanic as usize] = if sample.volcano { 2.0 } else { 0.0 };
    scores[SoilType::Alluvial as usize] = weights.sediment_weight * sample.sediment;
    scores
}

fn pick(scores: &[f64; SoilType::COUNT]) -> SoilType {
    let mut best = 0;
    for (code, &score) in scores.iter().enumerate() {
        if score > scores[best] {
            best = code;
        }
    }
    SoilType::ALL[best]
}

fn fertility(sample: &Sample, soil: SoilType, weights: &SoilWeights) -> f64 {
    let total = weights.climate_weight + weights.sediment_weight + weights.relief_weight;
    if total <= 0.0 {
        return 0.0;
    }
    let raw = (weights.climate_weight * sample.climate
        + weights.sediment_weight * sample.sediment
        + weights.relief_weight * (1.0 - sample.relief))
        / total;
    clamp01(raw * soil.fertility_factor()).min(weights.fertility_ceiling)
}

/// Shared classification pass. `adjust` lets a strategy bias scores and
/// fertility for one tile before the soil is picked.
fn classify_with<F>(inputs: &SoilInputs<'_>, weights: &SoilWeights, adjust: F) -> Pedology
where
    F: Fn(usize, &mut [f64; SoilType::COUNT]) -> f64,
{
    let size = inputs.grid.size();
    let mut soil_type = Vec::with_capacity(size);
    let mut fertility_out = Vec::with_capacity(size);
    for index in 0..size {
        if inputs.land[index] == 0 {
            let shelf = inputs.terrain[index] == TerrainType::Coast.code();
            let soil = if shelf { SoilType::Sandy } else { SoilType::Bedrock };
            soil_type.push(soil.code());
            fertility_out.push(0.0);
            continue;
        }
        let sample = Sample::at(inputs, index, weights);
        let mut tile_scores = scores(&sample, weights);
        let bonus = adjust(index, &mut tile_scores);
        let soil = pick(&tile_scores);
        let value =
            clamp01(fertility(&sample, soil, weights) + bonus).min(weights.fertility_ceiling);
        soil_type.push(soil.code());
        fertility_out.push(value as f32);
    }
    Pedology {
        soil_type,
        fertility: fertility_out,
    }
}

pub struct DefaultPedology {
    pub weights: SoilWeights,
}

impl PedologyStrategy for DefaultPedology {
    fn classify(&self, inputs: &SoilInputs<'_>) -> Pedology {
        classify_with(inputs, &self.weights, |_, _| 0.0)
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct CoastalShelfConfig {
    pub weights: SoilWeights,
    /// Rings of land from the shoreline that count as coastal.
    pub shelf_radius: u32,
    pub coastal_bonus: f64,
}

impl Default for CoastalShelfConfig {
    fn default() -> Self {
        Self {
            weights: SoilWeights::default(),
            shelf_radius: 2,
            coastal_bonus: 0.35,
        }
    }
}

/// Favours sandy and alluvial soils and extra fertility near the shore.
pub struct CoastalShelf {
    pub config: CoastalShelfConfig,
}

impl PedologyStrategy for CoastalShelf {
    fn classify(&self, inputs: &SoilInputs<'_>) -> Pedology {
        let radius = self.config.shelf_radius;
        let distance = inputs.grid.distance_field(|i| inputs.land[i] == 0, radius);
        let bonus = self.config.coastal_bonus;
        classify_with(inputs, &self.config.weights, |index, scores| {
            let ring = distance[index];
            if ring == u32::MAX || ring == 0 {
                return 0.0;
            }
            let nearness = f64::from(radius + 1 - ring) / f64::from(radius + 1);
            scores[SoilType::Sandy as usize] += bonus * nearness;
            scores[SoilType::Alluvial as usize] += bonus * nearness * 0.5;
            bonus * nearness * 0.25
        })
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct OrogenyBoostedConfig {
    pub weights: SoilWeights,
    pub alpine_elevation_m: f64,
    pub alpine_bonus: f64,
    /// Volcanic soil reaches this many tiles from a vent.
    pub volcanic_radius: u32,
    pub volcanic_bonus: f64,
}

impl Default for OrogenyBoostedConfig {
    fn default() -> Self {
        Self {
            weights: SoilWeights::default(),
            alpine_elevation_m: 1_200.0,
            alpine_bonus: 0.4,
            volcanic_radius: 2,
            volcanic_bonus: 0.5,
        }
    }
}

/// Fresh volcanic and alpine soils around young relief.
pub struct OrogenyBoosted {
    pub config: OrogenyBoostedConfig,
}

impl PedologyStrategy for OrogenyBoosted {
    fn classify(&self, inputs: &SoilInputs<'_>) -> Pedology {
        let config = &self.config;
        let vents = inputs
            .grid
            .distance_field(|i| inputs.volcano[i] != 0, config.volcanic_radius);
        classify_with(inputs, &config.weights, |index, scores| {
            let mut bonus = 0.0;
            if vents[index] != u32::MAX {
                let reach = f64::from(config.volcanic_radius + 1 - vents[index])
                    / f64::from(config.volcanic_radius + 1);
                scores[SoilType::Volcanic as usize] += config.volcanic_bonus * reach;
                bonus += 0.1 * reach;
            }
            if f64::from(inputs.elevation[index]) >= config.alpine_elevation_m {
                scores[SoilType::Bedrock as usize] += config.alpine_bonus * 0.5;
                scores[SoilType::Volcanic as usize] += config.alpine_bonus;
            }
            bonus
        })
    }
}

fn default_strategy(step: &'static str, config: &Value) -> Result<Box<dyn PedologyStrategy>> {
    let weights: SoilWeights = parse_config(step, config)?;
    weights.validate()?;
    Ok(Box::new(DefaultPedology { weights }))
}

fn coastal_shelf(step: &'static str, config: &Value) -> Result<Box<dyn PedologyStrategy>> {
    let config: CoastalShelfConfig = parse_config(step, config)?;
    config.weights.validate()?;
    check(
        config.shelf_radius <= 16,
        step,
        "shelf_radius",
        "must be at most 16",
    )?;
    check_range(config.coastal_bonus, 0.0, 2.0, step, "coastal_bonus")?;
    Ok(Box::new(CoastalShelf { config }))
}

fn orogeny_boosted(step: &'static str, config: &Value) -> Result<Box<dyn PedologyStrategy>> {
    let config: OrogenyBoostedConfig = parse_config(step, config)?;
    config.weights.validate()?;
    check_range(config.alpine_elevation_m, 0.0, 9_000.0, step, "alpine_elevation_m")?;
    check_range(config.alpine_bonus, 0.0, 4.0, step, "alpine_bonus")?;
    check_range(config.volcanic_bonus, 0.0, 4.0, step, "volcanic_bonus")?;
    check(
        config.volcanic_radius <= 16,
        step,
        "volcanic_radius",
        "must be at most 16",
    )?;
    Ok(Box::new(OrogenyBoosted { config }))
}

pub fn registry() -> Registry<dyn PedologyStrategy> {
    Registry::new(PEDOLOGY_STEP)
        .with("default", default_strategy)
        .with("coastal-shelf", coastal_shelf)
        .with("orogeny-boosted", orogeny_boosted)
}
