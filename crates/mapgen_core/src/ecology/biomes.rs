use serde::Deserialize;

use crate::error::{check, check_range, Result};
use crate::fixed::{clamp01, ramp};
use crate::grid::Grid;

use super::{BiomeField, BiomeId, PerBiome, BIOMES_STEP};

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct TemperatureConfig {
    pub equator_c: f64,
    pub pole_c: f64,
    pub lapse_rate_c_per_km: f64,
    pub sea_level_m: f64,
    pub bias_c: f64,
    pub polar_cutoff_c: f64,
    pub tundra_cutoff_c: f64,
    pub mid_latitude_c: f64,
    pub tropical_threshold_c: f64,
}

impl Default for TemperatureConfig {
    fn default() -> Self {
        Self {
            equator_c: 28.0,
            pole_c: -8.0,
            lapse_rate_c_per_km: 6.5,
            sea_level_m: 0.0,
            bias_c: 0.0,
            polar_cutoff_c: -5.0,
            tundra_cutoff_c: 2.0,
            mid_latitude_c: 12.0,
            tropical_threshold_c: 24.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct MoistureConfig {
    /// Ascending zone boundaries: arid, semi-arid, sub-humid, humid, per-humid.
    pub thresholds: [f64; 4],
    pub bias: f64,
    pub humidity_weight: f64,
}

impl Default for MoistureConfig {
    fn default() -> Self {
        Self {
            thresholds: [45.0, 90.0, 140.0, 190.0],
            bias: 0.0,
            humidity_weight: 0.35,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct AridityConfig {
    pub temperature_min_c: f64,
    pub temperature_max_c: f64,
    pub pet_base: f64,
    pub pet_temperature_weight: f64,
    pub humidity_dampening: f64,
    pub rainfall_weight: f64,
    pub bias: f64,
    pub normalization: f64,
    /// Aridity at which moisture zones shift one and two steps drier.
    pub moisture_shift_thresholds: [f64; 2],
    pub vegetation_penalty: f64,
}

impl Default for AridityConfig {
    fn default() -> Self {
        Self {
            temperature_min_c: 0.0,
            temperature_max_c: 35.0,
            pet_base: 20.0,
            pet_temperature_weight: 80.0,
            humidity_dampening: 0.5,
            rainfall_weight: 1.0,
            bias: 0.0,
            normalization: 120.0,
            moisture_shift_thresholds: [0.45, 0.7],
            vegetation_penalty: 0.15,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct FreezeConfig {
    pub min_temperature_c: f64,
    pub max_temperature_c: f64,
}

impl Default for FreezeConfig {
    fn default() -> Self {
        Self {
            min_temperature_c: -10.0,
            max_temperature_c: 2.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct VegetationModifier {
    pub multiplier: f64,
    pub bonus: f64,
}

impl Default for VegetationModifier {
    fn default() -> Self {
        Self::scaled(1.0)
    }
}

impl VegetationModifier {
    const fn scaled(multiplier: f64) -> Self {
        Self {
            multiplier,
            bonus: 0.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct VegetationConfig {
    pub base: f64,
    pub moisture_weight: f64,
    pub humidity_weight: f64,
    pub moisture_normalization_padding: f64,
    pub modifiers: PerBiome<VegetationModifier>,
}

impl Default for VegetationConfig {
    fn default() -> Self {
        Self {
            base: 0.2,
            moisture_weight: 0.55,
            humidity_weight: 0.25,
            moisture_normalization_padding: 40.0,
            modifiers: PerBiome {
                snow: VegetationModifier::scaled(0.05),
                tundra: VegetationModifier::scaled(0.35),
                boreal: VegetationModifier::scaled(0.75),
                temperate_dry: VegetationModifier::scaled(0.75),
                temperate_humid: VegetationModifier::scaled(1.0),
                tropical_seasonal: VegetationModifier::scaled(1.0),
                tropical_rainforest: VegetationModifier {
                    multiplier: 1.0,
                    bonus: 0.25,
                },
                desert: VegetationModifier::scaled(0.1),
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct BiomeNoiseConfig {
    /// Relative moisture jitter.
    pub amplitude: f64,
    pub frequency: f64,
    /// Moisture added to land tiles beside a river.
    pub riparian_moisture_bonus: f64,
}

impl Default for BiomeNoiseConfig {
    fn default() -> Self {
        Self {
            amplitude: 0.03,
            frequency: 0.15,
            riparian_moisture_bonus: 8.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct OverlayBonusConfig {
    pub corridor_moisture_bonus: f64,
    pub rift_shoulder_moisture_bonus: f64,
}

impl Default for OverlayBonusConfig {
    fn default() -> Self {
        Self {
            corridor_moisture_bonus: 8.0,
            rift_shoulder_moisture_bonus: 5.0,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct BiomeConfig {
    pub temperature: TemperatureConfig,
    pub moisture: MoistureConfig,
    pub aridity: AridityConfig,
    pub freeze: FreezeConfig,
    pub vegetation: VegetationConfig,
    pub noise: BiomeNoiseConfig,
    pub overlays: OverlayBonusConfig,
}

impl BiomeConfig {
    pub fn validate(&self) -> Result<()> {
        let step = BIOMES_STEP;
        let t = &self.temperature;
        check_range(t.equator_c, -50.0, 60.0, step, "temperature.equator_c")?;
        check_range(t.pole_c, -80.0, 40.0, step, "temperature.pole_c")?;
        check_range(
            t.lapse_rate_c_per_km,
            0.0,
            15.0,
            step,
            "temperature.lapse_rate_c_per_km",
        )?;
        check(
            t.polar_cutoff_c <= t.tundra_cutoff_c
                && t.tundra_cutoff_c <= t.mid_latitude_c
                && t.mid_latitude_c <= t.tropical_threshold_c,
            step,
            "temperature.tropical_threshold_c",
            "temperature cutoffs must ascend polar <= tundra <= mid <= tropical",
        )?;

        let thresholds = &self.moisture.thresholds;
        check(
            thresholds.windows(2).all(|w| w[0] <= w[1]) && thresholds[0] >= 0.0,
            step,
            "moisture.thresholds",
            "must be non-negative and ascending",
        )?;
        check_range(
            self.moisture.humidity_weight,
            0.0,
            2.0,
            step,
            "moisture.humidity_weight",
        )?;

        let a = &self.aridity;
        check(
            a.temperature_min_c < a.temperature_max_c,
            step,
            "aridity.temperature_max_c",
            "must exceed temperature_min_c",
        )?;
        check_range(a.normalization, 1.0, 1_000.0, step, "aridity.normalization")?;
        check_range(a.humidity_dampening, 0.0, 1.0, step, "aridity.humidity_dampening")?;
        check(
            a.moisture_shift_thresholds[0] <= a.moisture_shift_thresholds[1],
            step,
            "aridity.moisture_shift_thresholds",
            "must be ascending",
        )?;
        check_range(a.vegetation_penalty, 0.0, 1.0, step, "aridity.vegetation_penalty")?;
        check(
            self.freeze.min_temperature_c < self.freeze.max_temperature_c,
            step,
            "freeze.max_temperature_c",
            "must exceed min_temperature_c",
        )?;

        check_range(self.vegetation.base, 0.0, 1.0, step, "vegetation.base")?;
        check_range(
            self.vegetation.moisture_normalization_padding,
            0.0,
            500.0,
            step,
            "vegetation.moisture_normalization_padding",
        )?;
        check_range(self.noise.amplitude, 0.0, 0.5, step, "noise.amplitude")?;
        check_range(self.noise.frequency, 0.001, 4.0, step, "noise.frequency")?;
        check_range(
            self.noise.riparian_moisture_bonus,
            0.0,
            100.0,
            step,
            "noise.riparian_moisture_bonus",
        )
    }
}

/// Everything classification reads, per tile.
pub struct BiomeInputs<'a> {
    pub grid: &'a Grid,
    /// Degrees, one entry per tile.
    pub latitude: &'a [f64],
    pub elevation: &'a [i16],
    pub land: &'a [bool],
    pub rainfall: &'a [u8],
    pub humidity: &'a [u8],
    /// Distance to the nearest river tile, `u32::MAX` when none is near.
    pub river_distance: &'a [u32],
    pub land_corridor: &'a [u8],
    pub rift_shoulder: &'a [u8],
    /// Signed unit noise texture.
    pub noise: &'a [f64],
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum MoistureZone {
    Arid,
    SemiArid,
    SubHumid,
    Humid,
    PerHumid,
}

impl MoistureZone {
    const ORDER: [MoistureZone; 5] = [
        MoistureZone::Arid,
        MoistureZone::SemiArid,
        MoistureZone::SubHumid,
        MoistureZone::Humid,
        MoistureZone::PerHumid,
    ];

    fn of(moisture: f64, thresholds: &[f64; 4], drier_by: usize) -> Self {
        let wet_steps = thresholds.iter().filter(|&&t| moisture >= t).count();
        Self::ORDER[wet_steps.saturating_sub(drier_by)]
    }
}

fn select(temperature: f64, zone: MoistureZone, config: &TemperatureConfig) -> BiomeId {
    use MoistureZone::*;
    if temperature <= config.polar_cutoff_c {
        BiomeId::Snow
    } else if temperature <= config.tundra_cutoff_c {
        BiomeId::Tundra
    } else if temperature < config.mid_latitude_c {
        match zone {
            Arid => BiomeId::Tundra,
            _ => BiomeId::Boreal,
        }
    } else if temperature < config.tropical_threshold_c {
        match zone {
            Arid => BiomeId::Desert,
            SemiArid => BiomeId::TemperateDry,
            _ => BiomeId::TemperateHumid,
        }
    } else {
        match zone {
            Arid => BiomeId::Desert,
            SemiArid | SubHumid | Humid => BiomeId::TropicalSeasonal,
            PerHumid => BiomeId::TropicalRainforest,
        }
    }
}

fn surface_temperature(latitude: f64, elevation_m: f64, config: &TemperatureConfig) -> f64 {
    let polar_share = (latitude.abs() / 90.0).clamp(0.0, 1.0);
    let sea_level = config.equator_c - (config.equator_c - config.pole_c) * polar_share;
    let lift_km = (elevation_m - config.sea_level_m).max(0.0) / 1_000.0;
    sea_level - config.lapse_rate_c_per_km * lift_km + config.bias_c
}

fn aridity(temperature: f64, rainfall: f64, humidity: f64, config: &AridityConfig) -> f64 {
    let warmth = ramp(temperature, config.temperature_min_c, config.temperature_max_c);
    let pet = (config.pet_base + config.pet_temperature_weight * warmth)
        * (1.0 - config.humidity_dampening * humidity);
    clamp01((pet - config.rainfall_weight * rainfall) / config.normalization + config.bias)
}

/// Classify every tile. Pure: the same inputs always give the same field.
pub fn classify(inputs: &BiomeInputs<'_>, config: &BiomeConfig) -> BiomeField {
    let size = inputs.grid.size();
    let mut field = BiomeField {
        biome_index: Vec::with_capacity(size),
        vegetation_density: Vec::with_capacity(size),
        effective_moisture: Vec::with_capacity(size),
        surface_temperature: Vec::with_capacity(size),
        aridity_index: Vec::with_capacity(size),
        freeze_index: Vec::with_capacity(size),
    };
    let wettest = config.moisture.thresholds[3] + config.vegetation.moisture_normalization_padding;

    for index in 0..size {
        let rainfall = f64::from(inputs.rainfall[index]);
        let humidity = f64::from(inputs.humidity[index]) / 255.0;
        let temperature = surface_temperature(
            inputs.latitude[index],
            f64::from(inputs.elevation[index]),
            &config.temperature,
        );

        let mut moisture = rainfall
            + f64::from(inputs.humidity[index]) * config.moisture.humidity_weight
            + config.moisture.bias;
        moisture *= 1.0 + config.noise.amplitude * inputs.noise[index];
        if inputs.river_distance[index] <= 1 {
            moisture += config.noise.riparian_moisture_bonus;
        }
        if inputs.land_corridor[index] != 0 {
            moisture += config.overlays.corridor_moisture_bonus;
        }
        if inputs.rift_shoulder[index] != 0 {
            moisture += config.overlays.rift_shoulder_moisture_bonus;
        }
        let moisture = moisture.max(0.0);

        let arid = aridity(temperature, rainfall, humidity, &config.aridity);
        let freeze = 1.0
            - ramp(
                temperature,
                config.freeze.min_temperature_c,
                config.freeze.max_temperature_c,
            );

        let (biome, vegetation) = if inputs.land[index] {
            let shifts = &config.aridity.moisture_shift_thresholds;
            let drier_by = shifts.iter().filter(|&&s| arid >= s).count();
            let zone = MoistureZone::of(moisture, &config.moisture.thresholds, drier_by);
            let biome = select(temperature, zone, &config.temperature);
            let vegetation = config.vegetation.base
                + config.vegetation.moisture_weight * ramp(moisture, 0.0, wettest)
                + config.vegetation.humidity_weight * humidity;
            let modifier = config
                .vegetation
                .modifiers
                .get(biome)
                .copied()
                .unwrap_or_default();
            let density = vegetation * modifier.multiplier + modifier.bonus
                - arid * config.aridity.vegetation_penalty;
            (biome, clamp01(density))
        } else {
            (BiomeId::Marine, 0.0)
        };

        field.biome_index.push(biome.code());
        field.vegetation_density.push(vegetation as f32);
        field.effective_moisture.push(moisture as f32);
        field.surface_temperature.push(temperature as f32);
        field.aridity_index.push(arid as f32);
        field.freeze_index.push(freeze as f32);
    }
    field
}
