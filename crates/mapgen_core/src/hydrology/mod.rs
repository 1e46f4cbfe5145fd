//! Hydrology stage: the per-season climate sub-chain and its aggregation.
//!
//! Each season phase runs radiative forcing, thermal state, circulation,
//! ocean currents, evaporation, moisture transport and precipitation over
//! immutable inputs. The phase results are folded into seasonal means and
//! amplitudes, which are the only climate values published.

mod aggregate;
mod circulation;
mod currents;
mod evaporation;
mod forcing;
mod moisture;
mod precipitation;
mod thermal;

pub use aggregate::{summarize, PhaseResult, SeasonalSummary};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::artifacts::{check_domain, check_len, Artifact, ArtifactStore, Shape};
use crate::context::RunContext;
use crate::error::{check, check_range, Result};
use crate::fixed::clamp_i8;
use crate::grid::Grid;
use crate::morphology::Heightfield;
use crate::noise_field::perlin_field;
use crate::rng::{noise_seed, Stream};
use crate::step::Step;

use precipitation::{Surface, RAINFALL_MAX};

pub const CLIMATE_STEP: &str = "hydrology/climate-baseline";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ClimateField {
    /// 0..=200.
    pub rainfall: Vec<u8>,
    pub humidity: Vec<u8>,
}

impl Artifact for ClimateField {
    const NAME: &'static str = "hydrology.climate";
    const SHAPE: Shape = Shape::PerTile(&["rainfall", "humidity"]);

    fn validate(&self, grid: &Grid) -> Vec<String> {
        let mut issues = Vec::new();
        check_len(&mut issues, "rainfall", self.rainfall.len(), grid);
        check_len(&mut issues, "humidity", self.humidity.len(), grid);
        check_domain(&mut issues, "rainfall", &self.rainfall, RAINFALL_MAX as u8);
        issues
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Seasonality {
    pub mode_count: u8,
    pub axial_tilt_deg: f64,
    pub rainfall_amplitude: Vec<u8>,
    pub humidity_amplitude: Vec<u8>,
}

impl Artifact for Seasonality {
    const NAME: &'static str = "hydrology.seasonality";
    const SHAPE: Shape = Shape::PerTile(&["rainfall_amplitude", "humidity_amplitude"]);

    fn validate(&self, grid: &Grid) -> Vec<String> {
        let mut issues = Vec::new();
        if self.mode_count != 2 && self.mode_count != 4 {
            issues.push(format!("mode_count {} is not 2 or 4", self.mode_count));
        }
        if !self.axial_tilt_deg.is_finite() {
            issues.push("axial_tilt_deg is not finite".to_string());
        }
        check_len(&mut issues, "rainfall_amplitude", self.rainfall_amplitude.len(), grid);
        check_len(&mut issues, "humidity_amplitude", self.humidity_amplitude.len(), grid);
        issues
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WindField {
    pub wind_u: Vec<i8>,
    pub wind_v: Vec<i8>,
    pub current_u: Vec<i8>,
    pub current_v: Vec<i8>,
}

impl Artifact for WindField {
    const NAME: &'static str = "hydrology.wind";
    const SHAPE: Shape = Shape::PerTile(&["wind_u", "wind_v", "current_u", "current_v"]);

    fn validate(&self, grid: &Grid) -> Vec<String> {
        let mut issues = Vec::new();
        check_len(&mut issues, "wind_u", self.wind_u.len(), grid);
        check_len(&mut issues, "wind_v", self.wind_v.len(), grid);
        check_len(&mut issues, "current_u", self.current_u.len(), grid);
        check_len(&mut issues, "current_v", self.current_v.len(), grid);
        issues
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dryness {
    Wet,
    #[default]
    Mix,
    Dry,
}

impl Dryness {
    pub fn scale(self) -> f64 {
        match self {
            Dryness::Wet => 1.15,
            Dryness::Mix => 1.0,
            Dryness::Dry => 0.85,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Temperature {
    Cold,
    #[default]
    Temperate,
    Hot,
}

impl Temperature {
    pub fn base_c(self) -> f64 {
        match self {
            Temperature::Cold => 6.0,
            Temperature::Temperate => 14.0,
            Temperature::Hot => 22.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeasonalityKnob {
    Low,
    #[default]
    Normal,
    High,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OceanCoupling {
    Off,
    Simple,
    #[default]
    Earthlike,
}

/// Coarse authoring controls. They only fill values the step config leaves
/// unset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct Knobs {
    pub dryness: Dryness,
    pub temperature: Temperature,
    pub seasonality: SeasonalityKnob,
    pub ocean_coupling: OceanCoupling,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct SeasonalityConfig {
    pub mode_count: Option<u8>,
    pub axial_tilt_deg: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ForcingConfig {
    pub insolation_floor: f64,
    pub cos_exponent: f64,
}

impl Default for ForcingConfig {
    fn default() -> Self {
        Self {
            insolation_floor: 0.12,
            cos_exponent: 1.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ThermalConfig {
    pub base_temperature_c: Option<f64>,
    pub insolation_scale_c: f64,
    pub lapse_rate_c_per_km: f64,
    pub land_heat_capacity: f64,
    pub ocean_heat_capacity: f64,
}

impl Default for ThermalConfig {
    fn default() -> Self {
        Self {
            base_temperature_c: None,
            insolation_scale_c: 40.0,
            lapse_rate_c_per_km: 6.5,
            land_heat_capacity: 0.15,
            ocean_heat_capacity: 0.45,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct CirculationConfig {
    pub jet_streaks: Option<u32>,
    pub jet_strength: Option<f64>,
    pub variance: Option<f64>,
    pub base_speed: f64,
}

impl Default for CirculationConfig {
    fn default() -> Self {
        Self {
            jet_streaks: None,
            jet_strength: None,
            variance: None,
            base_speed: 48.0,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct CurrentConfig {
    pub strength: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct EvaporationConfig {
    pub ocean_strength: Option<f64>,
    pub land_strength: Option<f64>,
    pub min_temperature_c: f64,
    pub max_temperature_c: f64,
}

impl Default for EvaporationConfig {
    fn default() -> Self {
        Self {
            ocean_strength: None,
            land_strength: None,
            min_temperature_c: -10.0,
            max_temperature_c: 35.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct TransportConfig {
    pub iterations: Option<u32>,
    pub retention: f64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            iterations: None,
            retention: 0.9,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct WaterGradientConfig {
    pub radius: Option<u32>,
    pub per_ring_bonus: Option<f64>,
    pub lowland_bonus: Option<f64>,
    pub lowland_max_elevation_m: f64,
}

impl Default for WaterGradientConfig {
    fn default() -> Self {
        Self {
            radius: None,
            per_ring_bonus: None,
            lowland_bonus: None,
            lowland_max_elevation_m: 150.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct OrographicConfig {
    pub barrier_steps: u32,
    pub reduction_base: Option<f64>,
    pub reduction_per_step: Option<f64>,
    /// Height that counts as a barrier, and the size of one reduction step.
    pub barrier_elevation_m: f64,
}

impl Default for OrographicConfig {
    fn default() -> Self {
        Self {
            barrier_steps: 4,
            reduction_base: None,
            reduction_per_step: None,
            barrier_elevation_m: 500.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct PrecipitationConfig {
    pub rainfall_scale: Option<f64>,
    pub humidity_exponent: f64,
    pub noise_amplitude: Option<f64>,
    pub noise_frequency: f64,
    pub water_gradient: WaterGradientConfig,
    pub orographic: OrographicConfig,
}

impl Default for PrecipitationConfig {
    fn default() -> Self {
        Self {
            rainfall_scale: None,
            humidity_exponent: 1.0,
            noise_amplitude: None,
            noise_frequency: 0.12,
            water_gradient: WaterGradientConfig::default(),
            orographic: OrographicConfig::default(),
        }
    }
}

/// Recipe branch for `hydrology/climate-baseline`. Unset values are filled
/// from the stage [`Knobs`] by [`ClimateConfig::resolve`].
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ClimateConfig {
    pub seasonality: SeasonalityConfig,
    pub forcing: ForcingConfig,
    pub thermal: ThermalConfig,
    pub circulation: CirculationConfig,
    pub currents: CurrentConfig,
    pub evaporation: EvaporationConfig,
    pub transport: TransportConfig,
    pub precipitation: PrecipitationConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ThermalParams {
    pub base_temperature_c: f64,
    pub insolation_scale_c: f64,
    pub lapse_rate_c_per_km: f64,
    pub land_heat_capacity: f64,
    pub ocean_heat_capacity: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CirculationParams {
    pub jet_streaks: u32,
    pub jet_strength: f64,
    pub variance: f64,
    pub base_speed: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EvaporationParams {
    pub ocean_strength: f64,
    pub land_strength: f64,
    pub min_temperature_c: f64,
    pub max_temperature_c: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TransportParams {
    pub iterations: u32,
    pub retention: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PrecipitationParams {
    pub rainfall_scale: f64,
    pub humidity_exponent: f64,
    pub noise_amplitude: f64,
    pub noise_frequency: f64,
    pub gradient_radius: u32,
    pub per_ring_bonus: f64,
    pub lowland_bonus: f64,
    pub lowland_max_elevation_m: f64,
    pub barrier_steps: u32,
    pub reduction_base: f64,
    pub reduction_per_step: f64,
    pub barrier_elevation_m: f64,
}

/// Fully resolved climate parameters; no knob lookups remain.
#[derive(Clone, Debug, PartialEq)]
pub struct ClimateParams {
    pub mode_count: u8,
    pub axial_tilt_deg: f64,
    pub forcing: ForcingConfig,
    pub thermal: ThermalParams,
    pub circulation: CirculationParams,
    pub current_strength: f64,
    pub evaporation: EvaporationParams,
    pub transport: TransportParams,
    pub precipitation: PrecipitationParams,
}

impl ClimateConfig {
    /// Fill unset values from the knobs, then validate the result.
    pub fn resolve(&self, knobs: &Knobs) -> Result<ClimateParams> {
        let dryness = knobs.dryness.scale();
        let (modes, tilt, jets, variance, noise) = match knobs.seasonality {
            SeasonalityKnob::Low => (2, 12.0, 2, 0.45, 5.0),
            SeasonalityKnob::Normal => (2, 18.0, 3, 0.6, 6.0),
            SeasonalityKnob::High => (4, 23.44, 4, 0.75, 8.0),
        };
        let (jet_strength, current_strength, iterations, radius, ring) = match knobs.ocean_coupling
        {
            OceanCoupling::Off => (0.85, 0.0, 18, 4, 3.0),
            OceanCoupling::Simple => (1.0, 0.75, 24, 5, 4.0),
            OceanCoupling::Earthlike => (1.05, 1.0, 28, 6, 4.0),
        };
        let wetter = |value: f64| value / dryness.max(0.1);

        let gradient = &self.precipitation.water_gradient;
        let orographic = &self.precipitation.orographic;
        let params = ClimateParams {
            mode_count: self.seasonality.mode_count.unwrap_or(modes),
            axial_tilt_deg: self.seasonality.axial_tilt_deg.unwrap_or(tilt),
            forcing: self.forcing.clone(),
            thermal: ThermalParams {
                base_temperature_c: self
                    .thermal
                    .base_temperature_c
                    .unwrap_or_else(|| knobs.temperature.base_c()),
                insolation_scale_c: self.thermal.insolation_scale_c,
                lapse_rate_c_per_km: self.thermal.lapse_rate_c_per_km,
                land_heat_capacity: self.thermal.land_heat_capacity,
                ocean_heat_capacity: self.thermal.ocean_heat_capacity,
            },
            circulation: CirculationParams {
                jet_streaks: self.circulation.jet_streaks.unwrap_or(jets),
                jet_strength: self.circulation.jet_strength.unwrap_or(jet_strength),
                variance: self.circulation.variance.unwrap_or(variance),
                base_speed: self.circulation.base_speed,
            },
            current_strength: self.currents.strength.unwrap_or(current_strength),
            evaporation: EvaporationParams {
                ocean_strength: self.evaporation.ocean_strength.unwrap_or(dryness),
                land_strength: self.evaporation.land_strength.unwrap_or(0.2 * dryness),
                min_temperature_c: self.evaporation.min_temperature_c,
                max_temperature_c: self.evaporation.max_temperature_c,
            },
            transport: TransportParams {
                iterations: self.transport.iterations.unwrap_or(iterations),
                retention: self.transport.retention,
            },
            precipitation: PrecipitationParams {
                rainfall_scale: self.precipitation.rainfall_scale.unwrap_or(180.0 * dryness),
                humidity_exponent: self.precipitation.humidity_exponent,
                noise_amplitude: self.precipitation.noise_amplitude.unwrap_or(noise),
                noise_frequency: self.precipitation.noise_frequency,
                gradient_radius: gradient.radius.unwrap_or(radius),
                per_ring_bonus: gradient
                    .per_ring_bonus
                    .unwrap_or_else(|| (ring * dryness).round()),
                lowland_bonus: gradient
                    .lowland_bonus
                    .unwrap_or_else(|| (2.0 * dryness).round()),
                lowland_max_elevation_m: gradient.lowland_max_elevation_m,
                barrier_steps: orographic.barrier_steps,
                reduction_base: orographic
                    .reduction_base
                    .unwrap_or_else(|| wetter(8.0).round()),
                reduction_per_step: orographic
                    .reduction_per_step
                    .unwrap_or_else(|| wetter(6.0).round()),
                barrier_elevation_m: orographic.barrier_elevation_m,
            },
        };
        params.validate()?;
        Ok(params)
    }
}

impl ClimateParams {
    pub fn validate(&self) -> Result<()> {
        let step = CLIMATE_STEP;
        check(
            self.mode_count == 2 || self.mode_count == 4,
            step,
            "seasonality.mode_count",
            "must be 2 or 4",
        )?;
        check_range(self.axial_tilt_deg, 0.0, 45.0, step, "seasonality.axial_tilt_deg")?;
        check_range(self.forcing.insolation_floor, 0.0, 1.0, step, "forcing.insolation_floor")?;
        check_range(self.forcing.cos_exponent, 0.1, 8.0, step, "forcing.cos_exponent")?;

        let thermal = &self.thermal;
        check_range(
            thermal.base_temperature_c,
            -40.0,
            50.0,
            step,
            "thermal.base_temperature_c",
        )?;
        check_range(thermal.insolation_scale_c, 0.0, 100.0, step, "thermal.insolation_scale_c")?;
        check_range(thermal.lapse_rate_c_per_km, 0.0, 15.0, step, "thermal.lapse_rate_c_per_km")?;
        check_range(thermal.land_heat_capacity, 0.0, 1.0, step, "thermal.land_heat_capacity")?;
        check_range(thermal.ocean_heat_capacity, 0.0, 1.0, step, "thermal.ocean_heat_capacity")?;

        let circulation = &self.circulation;
        check(
            circulation.jet_streaks <= 8,
            step,
            "circulation.jet_streaks",
            "must be at most 8",
        )?;
        check_range(circulation.jet_strength, 0.0, 4.0, step, "circulation.jet_strength")?;
        check_range(circulation.variance, 0.0, 2.0, step, "circulation.variance")?;
        check_range(circulation.base_speed, 0.0, 127.0, step, "circulation.base_speed")?;
        check_range(self.current_strength, 0.0, 2.0, step, "currents.strength")?;

        let evaporation = &self.evaporation;
        check_range(evaporation.ocean_strength, 0.0, 4.0, step, "evaporation.ocean_strength")?;
        check_range(evaporation.land_strength, 0.0, 4.0, step, "evaporation.land_strength")?;
        check(
            evaporation.min_temperature_c < evaporation.max_temperature_c,
            step,
            "evaporation.max_temperature_c",
            "must exceed min_temperature_c",
        )?;

        check(
            self.transport.iterations <= 64,
            step,
            "transport.iterations",
            "must be at most 64",
        )?;
        check_range(self.transport.retention, 0.0, 1.0, step, "transport.retention")?;

        let rain = &self.precipitation;
        check_range(rain.rainfall_scale, 0.0, 400.0, step, "precipitation.rainfall_scale")?;
        check_range(rain.humidity_exponent, 0.1, 4.0, step, "precipitation.humidity_exponent")?;
        check_range(rain.noise_amplitude, 0.0, 50.0, step, "precipitation.noise_amplitude")?;
        check_range(rain.noise_frequency, 0.001, 4.0, step, "precipitation.noise_frequency")?;
        check(
            rain.gradient_radius <= 16,
            step,
            "precipitation.water_gradient.radius",
            "must be at most 16",
        )?;
        check_range(
            rain.per_ring_bonus,
            0.0,
            50.0,
            step,
            "precipitation.water_gradient.per_ring_bonus",
        )?;
        check_range(
            rain.lowland_bonus,
            0.0,
            50.0,
            step,
            "precipitation.water_gradient.lowland_bonus",
        )?;
        check(
            rain.barrier_steps <= 16,
            step,
            "precipitation.orographic.barrier_steps",
            "must be at most 16",
        )?;
        check_range(
            rain.reduction_base,
            0.0,
            100.0,
            step,
            "precipitation.orographic.reduction_base",
        )?;
        check_range(
            rain.reduction_per_step,
            0.0,
            100.0,
            step,
            "precipitation.orographic.reduction_per_step",
        )?;
        check_range(
            rain.barrier_elevation_m,
            1.0,
            9_000.0,
            step,
            "precipitation.orographic.barrier_elevation_m",
        )
    }
}

fn quantize(values: &[f64]) -> Vec<i8> {
    values.iter().map(|&v| clamp_i8(v)).collect()
}

fn simulate_phase(
    surface: &Surface<'_>,
    water: &[bool],
    latitudes: &[f64],
    phase: f64,
    params: &ClimateParams,
    wind_stream: &Stream,
) -> PhaseResult {
    let grid = surface.grid;
    let declination = forcing::declination_deg(params.axial_tilt_deg, phase);
    let lats = forcing::seasonal_latitudes(latitudes, declination);
    let insolation = forcing::insolation(&lats, &params.forcing);
    let temperature = thermal::surface_temperature(
        grid,
        &insolation,
        surface.elevation_m,
        surface.land,
        &params.thermal,
    );
    let (wind_u, wind_v) = circulation::winds(grid, &lats, &params.circulation, wind_stream);
    let (current_u, current_v) =
        currents::currents(grid, &lats, water, &wind_u, &wind_v, params.current_strength);
    let sources = evaporation::sources(surface.land, &temperature, &params.evaporation);
    let humidity = moisture::transport(grid, &wind_u, &wind_v, &sources, &params.transport);
    let (rainfall, humidity) =
        precipitation::precipitate(surface, &humidity, &wind_u, &wind_v, &params.precipitation);

    PhaseResult {
        rainfall,
        humidity,
        wind_u: quantize(&wind_u),
        wind_v: quantize(&wind_v),
        current_u: quantize(&current_u),
        current_v: quantize(&current_v),
    }
}

pub struct ClimateStep {
    pub params: ClimateParams,
}

impl ClimateStep {
    pub fn new(config: &ClimateConfig, knobs: &Knobs) -> Result<Self> {
        Ok(Self {
            params: config.resolve(knobs)?,
        })
    }
}

impl Step for ClimateStep {
    fn id(&self) -> &'static str {
        CLIMATE_STEP
    }

    fn requires(&self) -> &'static [&'static str] {
        &[Heightfield::NAME]
    }

    fn provides(&self) -> &'static [&'static str] {
        &[ClimateField::NAME, Seasonality::NAME, WindField::NAME]
    }

    fn declare(&self, store: &mut ArtifactStore) {
        store.declare::<ClimateField>();
        store.declare::<Seasonality>();
        store.declare::<WindField>();
    }

    fn run(&self, ctx: &mut RunContext) -> Result<()> {
        let grid = ctx.grid;
        let params = &self.params;
        let heightfield = ctx.artifacts.read::<Heightfield>()?;

        let land: Vec<bool> = (0..grid.size()).map(|i| heightfield.is_land(i)).collect();
        let water: Vec<bool> = land.iter().map(|&l| !l).collect();
        let elevation: Vec<f64> = heightfield.elevation.iter().map(|&e| f64::from(e)).collect();
        let water_distance =
            grid.distance_field(|i| water[i], params.precipitation.gradient_radius);
        let noise = perlin_field(
            &grid,
            noise_seed(ctx.root_seed, CLIMATE_STEP, "precipitation"),
            params.precipitation.noise_frequency,
        );
        let latitudes: Vec<f64> = (0..grid.height as usize)
            .map(|y| ctx.latitudes.get(y).copied().unwrap_or(0.0))
            .collect();
        let wind_stream = ctx.stream(CLIMATE_STEP, "circulation");

        let surface = Surface {
            grid: &grid,
            elevation_m: &elevation,
            terrain: &heightfield.terrain,
            land: &land,
            water_distance: &water_distance,
            noise: &noise,
        };
        let phases: Vec<PhaseResult> = forcing::season_phases(params.mode_count)
            .iter()
            .map(|&phase| simulate_phase(&surface, &water, &latitudes, phase, params, &wind_stream))
            .collect();
        let summary = summarize(&phases, grid.size());

        let land_rain: Vec<f64> = (0..grid.size())
            .filter(|&i| land[i])
            .map(|i| f64::from(summary.rainfall[i]))
            .collect();
        debug!(
            phases = phases.len(),
            mode_count = params.mode_count,
            mean_land_rainfall = land_rain.iter().sum::<f64>() / land_rain.len().max(1) as f64,
            "climate aggregated"
        );

        ctx.artifacts.publish(ClimateField {
            rainfall: summary.rainfall,
            humidity: summary.humidity,
        })?;
        ctx.artifacts.publish(Seasonality {
            mode_count: params.mode_count,
            axial_tilt_deg: params.axial_tilt_deg,
            rainfall_amplitude: summary.rainfall_amplitude,
            humidity_amplitude: summary.humidity_amplitude,
        })?;
        ctx.artifacts.publish(WindField {
            wind_u: summary.wind_u,
            wind_v: summary.wind_v,
            current_u: summary.current_u,
            current_v: summary.current_v,
        })
    }
}
