use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;

use crate::error::{check, check_range, Result};
use crate::fixed::ramp;
use crate::grid::Grid;

use super::{BiomeField, BiomeId, PlotEffect, PlotEffectPlacement, PLOT_EFFECTS_STEP};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElevationMode {
    /// Ramp between two elevations in meters.
    #[default]
    Absolute,
    /// Ramp between two quantiles of land elevation.
    Percentile,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct SnowConfig {
    pub enabled: bool,
    pub chance: f64,
    pub freeze_weight: f64,
    pub elevation_weight: f64,
    pub moisture_weight: f64,
    pub normalization: f64,
    pub bias: f64,
    pub light_threshold: f64,
    pub medium_threshold: f64,
    pub heavy_threshold: f64,
    pub elevation_mode: ElevationMode,
    pub elevation_min_m: f64,
    pub elevation_max_m: f64,
    pub elevation_percentile_min: f64,
    pub elevation_percentile_max: f64,
    pub moisture_min: f64,
    pub moisture_max: f64,
    pub max_temperature_c: f64,
    pub max_aridity: f64,
    /// Empty allows every land biome.
    pub allowed_biomes: Vec<BiomeId>,
}

impl Default for SnowConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            chance: 80.0,
            freeze_weight: 1.0,
            elevation_weight: 1.0,
            moisture_weight: 1.0,
            normalization: 3.0,
            bias: 0.0,
            light_threshold: 0.35,
            medium_threshold: 0.6,
            heavy_threshold: 0.8,
            elevation_mode: ElevationMode::Absolute,
            elevation_min_m: 200.0,
            elevation_max_m: 2_400.0,
            elevation_percentile_min: 0.7,
            elevation_percentile_max: 0.98,
            moisture_min: 40.0,
            moisture_max: 160.0,
            max_temperature_c: 4.0,
            max_aridity: 0.9,
            allowed_biomes: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct SandConfig {
    pub enabled: bool,
    pub chance: f64,
    pub min_aridity: f64,
    pub min_temperature_c: f64,
    pub max_freeze: f64,
    pub max_vegetation: f64,
    pub max_moisture: f64,
    pub allowed_biomes: Vec<BiomeId>,
}

impl Default for SandConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            chance: 18.0,
            min_aridity: 0.55,
            min_temperature_c: 18.0,
            max_freeze: 0.25,
            max_vegetation: 0.2,
            max_moisture: 90.0,
            allowed_biomes: vec![BiomeId::Desert, BiomeId::TemperateDry],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct BurnedConfig {
    pub enabled: bool,
    pub chance: f64,
    pub min_aridity: f64,
    pub min_temperature_c: f64,
    pub max_freeze: f64,
    pub max_vegetation: f64,
    pub max_moisture: f64,
    pub allowed_biomes: Vec<BiomeId>,
}

impl Default for BurnedConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            chance: 8.0,
            min_aridity: 0.45,
            min_temperature_c: 20.0,
            max_freeze: 0.2,
            max_vegetation: 0.35,
            max_moisture: 110.0,
            allowed_biomes: vec![BiomeId::TemperateDry, BiomeId::TropicalSeasonal],
        }
    }
}

/// Shared gate for the dry-land effects.
struct Gate<'a> {
    enabled: bool,
    chance: f64,
    min_aridity: f64,
    min_temperature_c: f64,
    max_freeze: f64,
    max_vegetation: f64,
    max_moisture: f64,
    allowed_biomes: &'a [BiomeId],
}

impl<'a> From<&'a SandConfig> for Gate<'a> {
    fn from(c: &'a SandConfig) -> Self {
        Self {
            enabled: c.enabled,
            chance: c.chance,
            min_aridity: c.min_aridity,
            min_temperature_c: c.min_temperature_c,
            max_freeze: c.max_freeze,
            max_vegetation: c.max_vegetation,
            max_moisture: c.max_moisture,
            allowed_biomes: &c.allowed_biomes,
        }
    }
}

impl<'a> From<&'a BurnedConfig> for Gate<'a> {
    fn from(c: &'a BurnedConfig) -> Self {
        Self {
            enabled: c.enabled,
            chance: c.chance,
            min_aridity: c.min_aridity,
            min_temperature_c: c.min_temperature_c,
            max_freeze: c.max_freeze,
            max_vegetation: c.max_vegetation,
            max_moisture: c.max_moisture,
            allowed_biomes: &c.allowed_biomes,
        }
    }
}

impl Gate<'_> {
    fn admits(&self, field: &BiomeField, index: usize, biome: BiomeId) -> bool {
        self.enabled
            && allowed(self.allowed_biomes, biome)
            && f64::from(field.aridity_index[index]) >= self.min_aridity
            && f64::from(field.surface_temperature[index]) >= self.min_temperature_c
            && f64::from(field.freeze_index[index]) <= self.max_freeze
            && f64::from(field.vegetation_density[index]) <= self.max_vegetation
            && f64::from(field.effective_moisture[index]) <= self.max_moisture
    }
}

fn allowed(list: &[BiomeId], biome: BiomeId) -> bool {
    list.is_empty() || list.contains(&biome)
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct PlotEffectsConfig {
    pub snow: SnowConfig,
    pub sand: SandConfig,
    pub burned: BurnedConfig,
}

impl PlotEffectsConfig {
    pub fn validate(&self) -> Result<()> {
        let step = PLOT_EFFECTS_STEP;
        let s = &self.snow;
        check_range(s.chance, 0.0, 100.0, step, "snow.chance")?;
        check_range(s.normalization, 0.01, 100.0, step, "snow.normalization")?;
        check(
            s.light_threshold <= s.medium_threshold && s.medium_threshold <= s.heavy_threshold,
            step,
            "snow.heavy_threshold",
            "severity thresholds must ascend light <= medium <= heavy",
        )?;
        check(
            s.elevation_min_m < s.elevation_max_m,
            step,
            "snow.elevation_max_m",
            "must exceed elevation_min_m",
        )?;
        check_range(
            s.elevation_percentile_min,
            0.0,
            1.0,
            step,
            "snow.elevation_percentile_min",
        )?;
        check_range(
            s.elevation_percentile_max,
            s.elevation_percentile_min,
            1.0,
            step,
            "snow.elevation_percentile_max",
        )?;
        check(
            s.moisture_min < s.moisture_max,
            step,
            "snow.moisture_max",
            "must exceed moisture_min",
        )?;
        check(
            !s.allowed_biomes.contains(&BiomeId::Marine),
            step,
            "snow.allowed_biomes",
            "marine tiles never take plot effects",
        )?;
        check_range(self.sand.chance, 0.0, 100.0, step, "sand.chance")?;
        check_range(self.burned.chance, 0.0, 100.0, step, "burned.chance")
    }
}

pub struct EffectInputs<'a> {
    pub grid: &'a Grid,
    pub land: &'a [bool],
    pub elevation: &'a [i16],
    /// Refined biome labels.
    pub biome: &'a [u8],
    pub field: &'a BiomeField,
}

/// Random streams for each effect, kept apart so enabling one effect never
/// shifts another's rolls.
pub struct EffectRngs {
    pub snow: ChaCha8Rng,
    pub sand: ChaCha8Rng,
    pub burned: ChaCha8Rng,
}

fn quantile(sorted: &[i16], q: f64) -> f64 {
    let last = sorted.len().saturating_sub(1);
    let slot = ((last as f64) * q).round() as usize;
    sorted.get(slot.min(last)).map_or(0.0, |&e| f64::from(e))
}

fn snow_severity(score: f64, config: &SnowConfig) -> Option<PlotEffect> {
    if score >= config.heavy_threshold {
        Some(PlotEffect::SnowHeavy)
    } else if score >= config.medium_threshold {
        Some(PlotEffect::SnowMedium)
    } else if score >= config.light_threshold {
        Some(PlotEffect::SnowLight)
    } else {
        None
    }
}

/// Plan one effect per land tile, trying snow, then sand, then burned.
pub fn plan(
    inputs: &EffectInputs<'_>,
    config: &PlotEffectsConfig,
    rngs: &mut EffectRngs,
) -> Vec<PlotEffectPlacement> {
    let grid = inputs.grid;
    let field = inputs.field;
    let snow = &config.snow;

    let (low_m, high_m) = match snow.elevation_mode {
        ElevationMode::Absolute => (snow.elevation_min_m, snow.elevation_max_m),
        ElevationMode::Percentile => {
            let mut land_elevation: Vec<i16> = (0..grid.size())
                .filter(|&i| inputs.land[i])
                .map(|i| inputs.elevation[i])
                .collect();
            land_elevation.sort_unstable();
            (
                quantile(&land_elevation, snow.elevation_percentile_min),
                quantile(&land_elevation, snow.elevation_percentile_max),
            )
        }
    };
    let sand = Gate::from(&config.sand);
    let burned = Gate::from(&config.burned);

    let mut out = Vec::new();
    for index in 0..grid.size() {
        if !inputs.land[index] {
            continue;
        }
        let Some(biome) = BiomeId::from_code(inputs.biome[index]) else {
            continue;
        };
        let mut effect = None;

        if snow.enabled
            && allowed(&snow.allowed_biomes, biome)
            && f64::from(field.surface_temperature[index]) <= snow.max_temperature_c
            && f64::from(field.aridity_index[index]) <= snow.max_aridity
        {
            let elevation = ramp(f64::from(inputs.elevation[index]), low_m, high_m);
            let moisture = ramp(
                f64::from(field.effective_moisture[index]),
                snow.moisture_min,
                snow.moisture_max,
            );
            let score = (snow.freeze_weight * f64::from(field.freeze_index[index])
                + snow.elevation_weight * elevation
                + snow.moisture_weight * moisture)
                / snow.normalization
                + snow.bias;
            if let Some(severity) = snow_severity(score, snow) {
                if rngs.snow.gen::<f64>() * 100.0 < snow.chance {
                    effect = Some(severity);
                }
            }
        }
        if effect.is_none()
            && sand.admits(field, index, biome)
            && rngs.sand.gen::<f64>() * 100.0 < sand.chance
        {
            effect = Some(PlotEffect::Sand);
        }
        if effect.is_none()
            && burned.admits(field, index, biome)
            && rngs.burned.gen::<f64>() * 100.0 < burned.chance
        {
            effect = Some(PlotEffect::Burned);
        }

        if let Some(effect) = effect {
            let (x, y) = grid.coords(index);
            out.push(PlotEffectPlacement { x, y, effect });
        }
    }
    out
}
