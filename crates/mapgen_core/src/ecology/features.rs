//! Candidate planning for the four feature families. Each family reads the
//! same immutable inputs, rolls on its own random stream, and returns an
//! independent list; nothing here resolves collisions between families.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;

use crate::error::{check, check_range, Result};
use crate::fixed::clamp01;
use crate::grid::Grid;
use crate::morphology::TerrainType;

use super::{BiomeId, FeatureKind, FeaturePlacement, PerBiome, FEATURE_PLAN_STEP};

pub struct FeatureInputs<'a> {
    pub grid: &'a Grid,
    /// Degrees, one entry per tile.
    pub latitude: &'a [f64],
    pub terrain: &'a [u8],
    pub land: &'a [bool],
    /// Refined biome labels.
    pub biome: &'a [u8],
    pub vegetation: &'a [f32],
    pub moisture: &'a [f32],
    pub temperature: &'a [f32],
    pub aridity: &'a [f32],
    pub freeze: &'a [f32],
    /// Distance to the nearest river tile, `u32::MAX` beyond the search radius.
    pub river_distance: &'a [u32],
    pub hotspot: &'a [u8],
    pub natural_wonders: &'a [u8],
}

impl FeatureInputs<'_> {
    fn biome_at(&self, index: usize) -> BiomeId {
        BiomeId::from_code(self.biome[index]).unwrap_or(BiomeId::Marine)
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct VegetationRules {
    pub tundra_taiga_min_vegetation: f64,
    pub tundra_taiga_min_temperature_c: f64,
    pub tundra_taiga_max_freeze: f64,
    pub dry_forest_min_moisture: f64,
    pub dry_forest_max_aridity: f64,
    pub dry_forest_min_vegetation: f64,
    pub rainforest_min_moisture: f64,
    pub rainforest_max_aridity: f64,
    pub sagebrush_min_vegetation: f64,
    pub sagebrush_max_aridity: f64,
}

impl Default for VegetationRules {
    fn default() -> Self {
        Self {
            tundra_taiga_min_vegetation: 0.25,
            tundra_taiga_min_temperature_c: -2.0,
            tundra_taiga_max_freeze: 0.9,
            dry_forest_min_moisture: 120.0,
            dry_forest_max_aridity: 0.65,
            dry_forest_min_vegetation: 0.45,
            rainforest_min_moisture: 140.0,
            rainforest_max_aridity: 0.6,
            sagebrush_min_vegetation: 0.2,
            sagebrush_max_aridity: 0.85,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct VegetationFeatureConfig {
    pub forest_chance: f64,
    pub rainforest_chance: f64,
    pub taiga_chance: f64,
    pub savanna_chance: f64,
    pub sagebrush_chance: f64,
    /// Scales vegetation density before it multiplies a chance.
    pub density_scalar: f64,
    pub multiplier: f64,
    /// Tiles below their biome's floor never grow vegetation features.
    pub min_vegetation: PerBiome<f64>,
    pub rules: VegetationRules,
}

impl Default for VegetationFeatureConfig {
    fn default() -> Self {
        Self {
            forest_chance: 50.0,
            rainforest_chance: 65.0,
            taiga_chance: 50.0,
            savanna_chance: 30.0,
            sagebrush_chance: 30.0,
            density_scalar: 1.0,
            multiplier: 1.0,
            min_vegetation: PerBiome {
                snow: 0.9,
                tundra: 0.2,
                boreal: 0.25,
                temperate_dry: 0.2,
                temperate_humid: 0.25,
                tropical_seasonal: 0.25,
                tropical_rainforest: 0.3,
                desert: 0.1,
            },
            rules: VegetationRules::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct WetlandConfig {
    pub river_radius: u32,
    pub marsh_chance: f64,
    pub bog_chance: f64,
    /// At or below this temperature river wetlands become bogs.
    pub cold_temperature_c: f64,
    pub mangrove_chance: f64,
    pub mangrove_min_temperature_c: f64,
    pub oasis_chance: f64,
    pub watering_hole_chance: f64,
    /// Minimum Chebyshev gap between two oases or watering holes.
    pub spring_spacing: u32,
    pub multiplier: f64,
}

impl Default for WetlandConfig {
    fn default() -> Self {
        Self {
            river_radius: 2,
            marsh_chance: 30.0,
            bog_chance: 30.0,
            cold_temperature_c: 2.0,
            mangrove_chance: 30.0,
            mangrove_min_temperature_c: 18.0,
            oasis_chance: 12.0,
            watering_hole_chance: 4.0,
            spring_spacing: 2,
            multiplier: 1.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ReefConfig {
    pub reef_chance: f64,
    pub cold_reef_chance: f64,
    /// Shelf tiles poleward of this latitude grow cold reefs.
    pub warm_max_latitude: f64,
    pub atoll_chance: f64,
    /// Extra atoll chance beside an existing atoll inside the equatorial band.
    pub atoll_growth_equatorial: f64,
    pub atoll_growth_other: f64,
    pub equatorial_band: f64,
    pub multiplier: f64,
}

impl Default for ReefConfig {
    fn default() -> Self {
        Self {
            reef_chance: 30.0,
            cold_reef_chance: 30.0,
            warm_max_latitude: 55.0,
            atoll_chance: 12.0,
            atoll_growth_equatorial: 15.0,
            atoll_growth_other: 5.0,
            equatorial_band: 23.0,
            multiplier: 1.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct IceConfig {
    pub chance: f64,
    pub min_abs_latitude: f64,
    pub forbid_adjacent_to_land: bool,
    pub land_radius: u32,
    pub forbid_adjacent_to_wonders: bool,
    pub wonder_radius: u32,
}

impl Default for IceConfig {
    fn default() -> Self {
        Self {
            chance: 90.0,
            min_abs_latitude: 78.0,
            forbid_adjacent_to_land: true,
            land_radius: 1,
            forbid_adjacent_to_wonders: true,
            wonder_radius: 1,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct FeaturePlanConfig {
    pub vegetation: VegetationFeatureConfig,
    pub wetlands: WetlandConfig,
    pub reefs: ReefConfig,
    pub ice: IceConfig,
}

impl FeaturePlanConfig {
    pub fn validate(&self) -> Result<()> {
        let step = FEATURE_PLAN_STEP;
        let percent = |value: f64, field: &str| check_range(value, 0.0, 100.0, step, field);

        let v = &self.vegetation;
        percent(v.forest_chance, "vegetation.forest_chance")?;
        percent(v.rainforest_chance, "vegetation.rainforest_chance")?;
        percent(v.taiga_chance, "vegetation.taiga_chance")?;
        percent(v.savanna_chance, "vegetation.savanna_chance")?;
        percent(v.sagebrush_chance, "vegetation.sagebrush_chance")?;
        check_range(v.density_scalar, 0.0, 10.0, step, "vegetation.density_scalar")?;
        check_range(v.multiplier, 0.0, 10.0, step, "vegetation.multiplier")?;

        let w = &self.wetlands;
        check(w.river_radius <= 8, step, "wetlands.river_radius", "must be at most 8")?;
        percent(w.marsh_chance, "wetlands.marsh_chance")?;
        percent(w.bog_chance, "wetlands.bog_chance")?;
        percent(w.mangrove_chance, "wetlands.mangrove_chance")?;
        percent(w.oasis_chance, "wetlands.oasis_chance")?;
        percent(w.watering_hole_chance, "wetlands.watering_hole_chance")?;
        check_range(w.multiplier, 0.0, 10.0, step, "wetlands.multiplier")?;

        let r = &self.reefs;
        percent(r.reef_chance, "reefs.reef_chance")?;
        percent(r.cold_reef_chance, "reefs.cold_reef_chance")?;
        check_range(r.warm_max_latitude, 0.0, 90.0, step, "reefs.warm_max_latitude")?;
        percent(r.atoll_chance, "reefs.atoll_chance")?;
        percent(r.atoll_growth_equatorial, "reefs.atoll_growth_equatorial")?;
        percent(r.atoll_growth_other, "reefs.atoll_growth_other")?;
        check_range(r.equatorial_band, 0.0, 90.0, step, "reefs.equatorial_band")?;
        check_range(r.multiplier, 0.0, 10.0, step, "reefs.multiplier")?;

        let i = &self.ice;
        percent(i.chance, "ice.chance")?;
        check_range(i.min_abs_latitude, 0.0, 90.0, step, "ice.min_abs_latitude")?;
        check(i.land_radius <= 8, step, "ice.land_radius", "must be at most 8")?;
        check(i.wonder_radius <= 8, step, "ice.wonder_radius", "must be at most 8")
    }
}

/// Percent roll; a chance of 100 always passes and 0 never does.
fn roll(rng: &mut ChaCha8Rng, percent: f64) -> bool {
    rng.gen::<f64>() * 100.0 < percent
}

fn placement(
    grid: &Grid,
    index: usize,
    feature: FeatureKind,
    weight: Option<f32>,
) -> FeaturePlacement {
    let (x, y) = grid.coords(index);
    FeaturePlacement {
        x,
        y,
        feature,
        weight,
    }
}

pub fn plan_ice(
    inputs: &FeatureInputs<'_>,
    config: &IceConfig,
    rng: &mut ChaCha8Rng,
) -> Vec<FeaturePlacement> {
    let grid = inputs.grid;
    let near_land = config
        .forbid_adjacent_to_land
        .then(|| grid.distance_field(|i| inputs.land[i], config.land_radius));
    let near_wonder = config
        .forbid_adjacent_to_wonders
        .then(|| grid.distance_field(|i| inputs.natural_wonders[i] != 0, config.wonder_radius));

    let mut out = Vec::new();
    for index in 0..grid.size() {
        if inputs.land[index] || inputs.latitude[index].abs() < config.min_abs_latitude {
            continue;
        }
        if near_land.as_ref().map_or(false, |d| d[index] <= config.land_radius)
            || near_wonder.as_ref().map_or(false, |d| d[index] <= config.wonder_radius)
        {
            continue;
        }
        if roll(rng, config.chance) {
            out.push(placement(grid, index, FeatureKind::Ice, None));
        }
    }
    out
}

pub fn plan_reefs(
    inputs: &FeatureInputs<'_>,
    config: &ReefConfig,
    rng: &mut ChaCha8Rng,
) -> Vec<FeaturePlacement> {
    let grid = inputs.grid;
    let mut atoll = vec![false; grid.size()];
    let mut out = Vec::new();
    for index in 0..grid.size() {
        if inputs.land[index] {
            continue;
        }
        let latitude = inputs.latitude[index].abs();
        let terrain = inputs.terrain[index];
        if inputs.hotspot[index] != 0 && terrain == TerrainType::Ocean.code() {
            let mut chance = config.atoll_chance;
            if grid.neighbors8(index).any(|n| atoll[n]) {
                chance += if latitude <= config.equatorial_band {
                    config.atoll_growth_equatorial
                } else {
                    config.atoll_growth_other
                };
            }
            if roll(rng, chance * config.multiplier) {
                atoll[index] = true;
                out.push(placement(grid, index, FeatureKind::Atoll, None));
            }
        } else if terrain == TerrainType::Coast.code() {
            let (feature, chance) = if latitude <= config.warm_max_latitude {
                (FeatureKind::Reef, config.reef_chance)
            } else {
                (FeatureKind::ColdReef, config.cold_reef_chance)
            };
            if roll(rng, chance * config.multiplier) {
                out.push(placement(grid, index, feature, None));
            }
        }
    }
    out
}

pub fn plan_wetlands(
    inputs: &FeatureInputs<'_>,
    config: &WetlandConfig,
    rng: &mut ChaCha8Rng,
) -> Vec<FeaturePlacement> {
    let grid = inputs.grid;
    let mut springs: Vec<usize> = Vec::new();
    let mut out = Vec::new();
    for index in 0..grid.size() {
        if !inputs.land[index] {
            continue;
        }
        let biome = inputs.biome_at(index);
        let temperature = f64::from(inputs.temperature[index]);
        let coastal = grid.neighbors4(index).any(|n| !inputs.land[n]);
        let near_river = inputs.river_distance[index] <= config.river_radius;

        let candidate = if near_river {
            let cold = matches!(biome, BiomeId::Snow | BiomeId::Tundra | BiomeId::Boreal)
                || temperature <= config.cold_temperature_c;
            Some(if cold {
                (FeatureKind::TundraBog, config.bog_chance)
            } else {
                (FeatureKind::Marsh, config.marsh_chance)
            })
        } else if coastal {
            let tropical = matches!(
                biome,
                BiomeId::TropicalSeasonal | BiomeId::TropicalRainforest
            );
            (tropical || temperature >= config.mangrove_min_temperature_c)
                .then_some((FeatureKind::Mangrove, config.mangrove_chance))
        } else {
            match biome {
                BiomeId::Desert => Some((FeatureKind::Oasis, config.oasis_chance)),
                BiomeId::TemperateDry | BiomeId::TropicalSeasonal => {
                    Some((FeatureKind::WateringHole, config.watering_hole_chance))
                }
                _ => None,
            }
        };
        let Some((feature, chance)) = candidate else {
            continue;
        };
        let spring = matches!(feature, FeatureKind::Oasis | FeatureKind::WateringHole);
        if spring
            && springs
                .iter()
                .any(|&s| grid.chebyshev(s, index) <= config.spring_spacing)
        {
            continue;
        }
        if roll(rng, chance * config.multiplier) {
            if spring {
                springs.push(index);
            }
            out.push(placement(grid, index, feature, None));
        }
    }
    out
}

fn vegetation_feature(
    inputs: &FeatureInputs<'_>,
    index: usize,
    biome: BiomeId,
    config: &VegetationFeatureConfig,
) -> Option<(FeatureKind, f64)> {
    let rules = &config.rules;
    let vegetation = f64::from(inputs.vegetation[index]);
    let moisture = f64::from(inputs.moisture[index]);
    let aridity = f64::from(inputs.aridity[index]);
    match biome {
        BiomeId::Snow | BiomeId::Marine => None,
        BiomeId::Tundra => (vegetation >= rules.tundra_taiga_min_vegetation
            && f64::from(inputs.temperature[index]) >= rules.tundra_taiga_min_temperature_c
            && f64::from(inputs.freeze[index]) <= rules.tundra_taiga_max_freeze)
            .then_some((FeatureKind::Taiga, config.taiga_chance)),
        BiomeId::Boreal => Some((FeatureKind::Taiga, config.taiga_chance)),
        BiomeId::TemperateDry => Some(
            if moisture >= rules.dry_forest_min_moisture
                && aridity <= rules.dry_forest_max_aridity
                && vegetation >= rules.dry_forest_min_vegetation
            {
                (FeatureKind::Forest, config.forest_chance)
            } else {
                (FeatureKind::SagebrushSteppe, config.sagebrush_chance)
            },
        ),
        BiomeId::TemperateHumid => Some((FeatureKind::Forest, config.forest_chance)),
        BiomeId::TropicalSeasonal => Some(
            if moisture >= rules.rainforest_min_moisture
                && aridity <= rules.rainforest_max_aridity
            {
                (FeatureKind::Rainforest, config.rainforest_chance)
            } else {
                (FeatureKind::SavannaWoodland, config.savanna_chance)
            },
        ),
        BiomeId::TropicalRainforest => Some((FeatureKind::Rainforest, config.rainforest_chance)),
        BiomeId::Desert => (vegetation >= rules.sagebrush_min_vegetation
            && aridity <= rules.sagebrush_max_aridity)
            .then_some((FeatureKind::SagebrushSteppe, config.sagebrush_chance)),
    }
}

pub fn plan_vegetation(
    inputs: &FeatureInputs<'_>,
    config: &VegetationFeatureConfig,
    rng: &mut ChaCha8Rng,
) -> Vec<FeaturePlacement> {
    let grid = inputs.grid;
    let mut out = Vec::new();
    for index in 0..grid.size() {
        if !inputs.land[index] {
            continue;
        }
        let biome = inputs.biome_at(index);
        let vegetation = f64::from(inputs.vegetation[index]);
        let floor = config.min_vegetation.get(biome).copied().unwrap_or(1.0);
        if vegetation < floor {
            continue;
        }
        let Some((feature, base)) = vegetation_feature(inputs, index, biome, config) else {
            continue;
        };
        let chance = base * clamp01(vegetation * config.density_scalar) * config.multiplier;
        if roll(rng, chance) {
            out.push(placement(grid, index, feature, Some(vegetation as f32)));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    struct World {
        grid: Grid,
        latitude: Vec<f64>,
        terrain: Vec<u8>,
        land: Vec<bool>,
        biome: Vec<u8>,
        vegetation: Vec<f32>,
        moisture: Vec<f32>,
        temperature: Vec<f32>,
        aridity: Vec<f32>,
        freeze: Vec<f32>,
        river: Vec<u32>,
        hotspot: Vec<u8>,
        wonders: Vec<u8>,
    }

    impl World {
        fn ocean(width: u32, height: u32, latitude: f64) -> Self {
            let grid = Grid::new(width, height, false);
            let size = grid.size();
            Self {
                grid,
                latitude: vec![latitude; size],
                terrain: vec![TerrainType::Ocean.code(); size],
                land: vec![false; size],
                biome: vec![BiomeId::Marine.code(); size],
                vegetation: vec![0.0; size],
                moisture: vec![0.0; size],
                temperature: vec![0.0; size],
                aridity: vec![0.0; size],
                freeze: vec![0.0; size],
                river: vec![u32::MAX; size],
                hotspot: vec![0; size],
                wonders: vec![0; size],
            }
        }

        fn land(width: u32, height: u32, biome: BiomeId) -> Self {
            let mut world = Self::ocean(width, height, 20.0);
            let size = world.grid.size();
            world.terrain = vec![TerrainType::Flat.code(); size];
            world.land = vec![true; size];
            world.biome = vec![biome.code(); size];
            world.vegetation = vec![0.9; size];
            world.moisture = vec![150.0; size];
            world.temperature = vec![20.0; size];
            world
        }

        fn inputs(&self) -> FeatureInputs<'_> {
            FeatureInputs {
                grid: &self.grid,
                latitude: &self.latitude,
                terrain: &self.terrain,
                land: &self.land,
                biome: &self.biome,
                vegetation: &self.vegetation,
                moisture: &self.moisture,
                temperature: &self.temperature,
                aridity: &self.aridity,
                freeze: &self.freeze,
                river_distance: &self.river,
                hotspot: &self.hotspot,
                natural_wonders: &self.wonders,
            }
        }
    }

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(7)
    }

    #[test]
    fn polar_ocean_freezes_everywhere_at_full_chance() {
        let world = World::ocean(2, 2, 80.0);
        let config = IceConfig {
            chance: 100.0,
            min_abs_latitude: 0.0,
            forbid_adjacent_to_land: false,
            forbid_adjacent_to_wonders: false,
            ..IceConfig::default()
        };
        let ice = plan_ice(&world.inputs(), &config, &mut rng());
        assert_eq!(ice.len(), 4);
        assert!(ice.iter().all(|p| p.feature == FeatureKind::Ice));
    }

    #[test]
    fn ice_keeps_clear_of_land_and_wonders() {
        let mut world = World::ocean(6, 1, 85.0);
        world.land[0] = true;
        world.wonders[5] = 1;
        let config = IceConfig {
            chance: 100.0,
            ..IceConfig::default()
        };
        let ice = plan_ice(&world.inputs(), &config, &mut rng());
        let xs: Vec<u32> = ice.iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![2, 3]);
    }

    #[test]
    fn ice_respects_latitude_floor() {
        let world = World::ocean(2, 2, 40.0);
        let config = IceConfig {
            chance: 100.0,
            ..IceConfig::default()
        };
        assert!(plan_ice(&world.inputs(), &config, &mut rng()).is_empty());
    }

    #[test]
    fn reefs_split_by_latitude() {
        let mut world = World::ocean(2, 1, 10.0);
        world.terrain = vec![TerrainType::Coast.code(); 2];
        world.latitude[1] = 70.0;
        let config = ReefConfig {
            reef_chance: 100.0,
            cold_reef_chance: 100.0,
            ..ReefConfig::default()
        };
        let reefs = plan_reefs(&world.inputs(), &config, &mut rng());
        let kinds: Vec<FeatureKind> = reefs.iter().map(|p| p.feature).collect();
        assert_eq!(kinds, vec![FeatureKind::Reef, FeatureKind::ColdReef]);
    }

    #[test]
    fn atolls_only_on_hotspot_ocean() {
        let mut world = World::ocean(3, 1, 5.0);
        world.hotspot[1] = 1;
        let config = ReefConfig {
            atoll_chance: 100.0,
            ..ReefConfig::default()
        };
        let reefs = plan_reefs(&world.inputs(), &config, &mut rng());
        assert_eq!(reefs.len(), 1);
        assert_eq!((reefs[0].x, reefs[0].feature), (1, FeatureKind::Atoll));
    }

    #[test]
    fn cold_river_banks_become_bogs() {
        let mut world = World::land(3, 3, BiomeId::Tundra);
        world.river = vec![1; 9];
        let config = WetlandConfig {
            bog_chance: 100.0,
            ..WetlandConfig::default()
        };
        let wet = plan_wetlands(&world.inputs(), &config, &mut rng());
        assert_eq!(wet.len(), 9);
        assert!(wet.iter().all(|p| p.feature == FeatureKind::TundraBog));
    }

    #[test]
    fn oases_keep_their_spacing() {
        let world = World::land(6, 1, BiomeId::Desert);
        let config = WetlandConfig {
            oasis_chance: 100.0,
            spring_spacing: 2,
            ..WetlandConfig::default()
        };
        let wet = plan_wetlands(&world.inputs(), &config, &mut rng());
        let xs: Vec<u32> = wet.iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![0, 3]);
    }

    #[test]
    fn humid_temperate_grows_forest_with_weight() {
        let world = World::land(2, 2, BiomeId::TemperateHumid);
        let config = VegetationFeatureConfig {
            forest_chance: 100.0,
            density_scalar: 2.0,
            ..VegetationFeatureConfig::default()
        };
        let plants = plan_vegetation(&world.inputs(), &config, &mut rng());
        assert_eq!(plants.len(), 4);
        assert!(plants
            .iter()
            .all(|p| p.feature == FeatureKind::Forest && p.weight == Some(0.9)));
    }

    #[test]
    fn sparse_vegetation_stays_bare() {
        let mut world = World::land(2, 2, BiomeId::TemperateHumid);
        world.vegetation = vec![0.1; 4];
        let config = VegetationFeatureConfig {
            forest_chance: 100.0,
            ..VegetationFeatureConfig::default()
        };
        assert!(plan_vegetation(&world.inputs(), &config, &mut rng()).is_empty());
    }

    #[test]
    fn chance_over_hundred_is_rejected() {
        let mut config = FeaturePlanConfig::default();
        config.reefs.atoll_chance = 120.0;
        let message = config.validate().unwrap_err().to_string();
        assert!(message.contains("reefs.atoll_chance"));
    }
}
