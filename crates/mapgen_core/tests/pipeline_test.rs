use serde_json::json;

use mapgen_core::config::{Recipe, SeedSpec};
use mapgen_core::ecology::{BiomeId, FeatureField, RefinedBiomes, NO_FEATURE};
use mapgen_core::error::MapgenError;
use mapgen_core::generate;
use mapgen_core::host::MemoryHost;
use mapgen_core::io::snapshot::write_ndjson;
use mapgen_core::morphology::Heightfield;
use mapgen_core::placement::PlacementInputs;

fn seeded(seed: u64) -> Recipe {
    Recipe {
        seed: Some(SeedSpec::Number(seed)),
        ..Recipe::default()
    }
}

fn run_bytes(recipe: &Recipe) -> Vec<u8> {
    let mut host = MemoryHost::new(24, 16, true, 0);
    let output = generate(recipe, &mut host).expect("run succeeds");
    let mut bytes = Vec::new();
    write_ndjson(&output.artifacts, &output.warnings, &mut bytes).expect("snapshot writes");
    bytes
}

#[test]
fn identical_seeds_give_identical_bytes() {
    let recipe = seeded(31_337);
    assert_eq!(run_bytes(&recipe), run_bytes(&recipe));
}

#[test]
fn different_seeds_diverge() {
    assert_ne!(run_bytes(&seeded(1)), run_bytes(&seeded(2)));
}

#[test]
fn text_seed_replays() {
    let recipe: Recipe = serde_json::from_value(json!({"seed": "old world"})).unwrap();
    assert_eq!(run_bytes(&recipe), run_bytes(&recipe));
}

#[test]
fn every_step_publishes_before_commit() {
    let mut host = MemoryHost::new(20, 12, true, 0);
    let output = generate(&seeded(7), &mut host).unwrap();
    let names = output.artifacts.names();
    for expected in [
        "foundation.mesh",
        "foundation.plates",
        "foundation.uplift",
        "morphology.heightfield",
        "morphology.drainage",
        "narrative.overlays",
        "hydrology.climate",
        "hydrology.seasonality",
        "hydrology.wind",
        "ecology.pedology",
        "ecology.resource-basins",
        "ecology.biomes",
        "ecology.biome-edges",
        "ecology.feature-intents",
        "ecology.plot-effects",
        "ecology.features",
        "placement.inputs",
    ] {
        assert!(names.contains(&expected), "{expected} was not published");
    }
    assert_eq!(names.last(), Some(&"placement.inputs"));
}

#[test]
fn biomes_are_marine_exactly_on_water() {
    let mut host = MemoryHost::new(24, 16, true, 0);
    let output = generate(&seeded(99), &mut host).unwrap();
    let heightfield = output.artifacts.read::<Heightfield>().unwrap();
    let biomes = output.artifacts.read::<RefinedBiomes>().unwrap();
    let marine = BiomeId::Marine.code();
    for (index, &biome) in biomes.biome_index.iter().enumerate() {
        assert!(biome < BiomeId::COUNT as u8);
        assert_eq!(
            biome == marine,
            !heightfield.is_land(index),
            "tile {index} mixes marine and land"
        );
    }
}

#[test]
fn commit_mirrors_artifacts_on_the_host() {
    let mut host = MemoryHost::new(16, 10, true, 0);
    let output = generate(&seeded(5), &mut host).unwrap();
    let heightfield = output.artifacts.read::<Heightfield>().unwrap();
    let features = output.artifacts.read::<FeatureField>().unwrap();

    assert_eq!(host.elevation, heightfield.elevation);
    for index in 0..heightfield.terrain.len() {
        assert_eq!(host.terrain[index], Some(heightfield.terrain_at(index)));
        assert_eq!(
            host.feature[index].map(|f| f.code()).unwrap_or(NO_FEATURE),
            features.feature[index]
        );
    }
    let land = heightfield.land_mask.iter().filter(|&&l| l != 0).count();
    assert_eq!(host.land_area, land);
    assert_eq!(host.land_area + host.water_area, 160);
    assert_eq!(
        host.placement.as_ref(),
        Some(output.artifacts.read::<PlacementInputs>().unwrap())
    );
    assert_eq!(output.report.tiles, 160);
}

#[test]
fn features_never_stack_without_overlap() {
    let mut host = MemoryHost::new(24, 16, true, 0);
    let output = generate(&seeded(12), &mut host).unwrap();
    let field = output.artifacts.read::<FeatureField>().unwrap();
    let mut seen = std::collections::HashSet::new();
    for placement in &field.placements {
        assert!(seen.insert((placement.x, placement.y)));
    }
}

#[test]
fn natural_wonders_stay_bare() {
    let mut host = MemoryHost::new(16, 10, true, 0).with_natural_wonder(3, 4);
    let output = generate(&seeded(8), &mut host).unwrap();
    let field = output.artifacts.read::<FeatureField>().unwrap();
    assert_eq!(field.feature[4 * 16 + 3], NO_FEATURE);
}

#[test]
fn seedless_recipe_draws_from_host() {
    let mut a = MemoryHost::new(12, 8, true, 77);
    let mut b = MemoryHost::new(12, 8, true, 77);
    let first = generate(&Recipe::default(), &mut a).unwrap();
    let second = generate(&Recipe::default(), &mut b).unwrap();
    assert_eq!(first.root_seed, second.root_seed);

    let mut c = MemoryHost::new(12, 8, true, 78);
    let third = generate(&Recipe::default(), &mut c).unwrap();
    assert_ne!(first.root_seed, third.root_seed);
}

#[test]
fn config_errors_surface_before_the_host_is_touched() {
    let recipe: Recipe = serde_json::from_value(json!({
        "seed": 1,
        "ecology": {"feature-plan": {"ice": {"chance": 140}}}
    }))
    .unwrap();
    let mut host = MemoryHost::new(8, 8, false, 0);
    match generate(&recipe, &mut host) {
        Err(MapgenError::Config { step, field, .. }) => {
            assert_eq!(step, "ecology/feature-plan");
            assert!(field.contains("ice.chance"), "unexpected field {field}");
        }
        Err(other) => panic!("unexpected error {other}"),
        Ok(_) => panic!("out-of-range chance was accepted"),
    }
    assert!(host.terrain.iter().all(Option::is_none));
}

#[test]
fn empty_host_grid_is_rejected() {
    let mut host = MemoryHost::new(0, 4, false, 0);
    assert!(matches!(
        generate(&seeded(1), &mut host),
        Err(MapgenError::EmptyGrid { width: 0, height: 4 })
    ));
}
