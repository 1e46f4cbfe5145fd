use std::collections::HashSet;

use serde_json::json;

use mapgen_core::artifacts::Artifact;
use mapgen_core::ecology::basins::{self, BasinInputs};
use mapgen_core::ecology::features::{plan_ice, FeatureInputs, IceConfig};
use mapgen_core::ecology::{
    pedology, BasinConfig, FeatureKind, Pedology, ResourceTarget, SoilInputs, SoilType,
};
use mapgen_core::grid::Grid;
use mapgen_core::morphology::TerrainType;
use mapgen_core::rng::step_rng;
use mapgen_core::strategy::StrategyChoice;

#[test]
fn orogeny_boosted_soils_on_high_wet_land() {
    let grid = Grid::new(2, 2, false);
    let size = grid.size();
    let choice: StrategyChoice = serde_json::from_value(json!({
        "strategy": "orogeny-boosted",
        "config": {}
    }))
    .unwrap();
    let strategy = pedology::registry().resolve(&choice).unwrap();

    let elevation = vec![1_800i16; size];
    let terrain = vec![TerrainType::Mountain.code(); size];
    let land = vec![1u8; size];
    let volcano = vec![0u8; size];
    let sediment = vec![0.0f32; size];
    let rainfall = vec![80u8; size];
    let humidity = vec![50u8; size];
    let soils = strategy.classify(&SoilInputs {
        grid: &grid,
        elevation: &elevation,
        terrain: &terrain,
        land: &land,
        volcano: &volcano,
        sediment: &sediment,
        rainfall: &rainfall,
        humidity: &humidity,
    });

    assert_eq!(soils.soil_type.len(), 4);
    assert!(soils
        .soil_type
        .iter()
        .all(|&code| SoilType::from_code(code).is_some() && code <= 6));
    assert!(soils.fertility.iter().all(|f| (0.0..=1.0).contains(f)));
    assert!(Pedology::validate(&soils, &grid).is_empty());
}

#[test]
fn polar_ocean_fills_with_ice() {
    let grid = Grid::new(2, 2, false);
    let size = grid.size();
    let latitude = vec![80.0; size];
    let terrain = vec![TerrainType::Ocean.code(); size];
    let land = vec![false; size];
    let marine = vec![8u8; size];
    let zeros = vec![0.0f32; size];
    let far = vec![u32::MAX; size];
    let none = vec![0u8; size];
    let inputs = FeatureInputs {
        grid: &grid,
        latitude: &latitude,
        terrain: &terrain,
        land: &land,
        biome: &marine,
        vegetation: &zeros,
        moisture: &zeros,
        temperature: &zeros,
        aridity: &zeros,
        freeze: &zeros,
        river_distance: &far,
        hotspot: &none,
        natural_wonders: &none,
    };
    let config = IceConfig {
        chance: 100.0,
        min_abs_latitude: 0.0,
        forbid_adjacent_to_land: false,
        forbid_adjacent_to_wonders: false,
        ..IceConfig::default()
    };
    let mut rng = step_rng(11, "ecology/feature-plan", "ice");
    let ice = plan_ice(&inputs, &config, &mut rng);

    assert_eq!(ice.len(), 4);
    assert!(ice.iter().all(|p| p.feature == FeatureKind::Ice));
    let tiles: HashSet<(u32, u32)> = ice.iter().map(|p| (p.x, p.y)).collect();
    assert_eq!(tiles.len(), 4);
}

#[test]
fn basin_count_respects_target() {
    let grid = Grid::new(2, 2, false);
    let size = grid.size();
    let config = BasinConfig {
        resources: vec![ResourceTarget {
            id: "RESOURCE_SALT".to_string(),
            target: 2,
            min_spacing: 0,
            ..ResourceTarget::default()
        }],
        ..BasinConfig::default()
    };
    config.validate().unwrap();

    let land = vec![true; size];
    let fertility = vec![0.7f32; size];
    let rainfall = vec![90u8; size];
    let plan = basins::plan(
        &BasinInputs {
            grid: &grid,
            land: &land,
            fertility: &fertility,
            rainfall: &rainfall,
        },
        &config,
    );

    assert!(!plan.basins.is_empty());
    assert!(plan.basins.len() <= 2);
    assert!(plan.basins.iter().all(|b| b.resource_id == "RESOURCE_SALT"));
    assert!(plan.starved.is_empty());
}
