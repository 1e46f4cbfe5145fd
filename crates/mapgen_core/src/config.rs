//! Recipe documents and their compilation into a [`Pipeline`].
//!
//! A recipe is a JSON tree with one branch per stage and one sub-branch per
//! step. Compilation parses and validates every branch before any step
//! runs, so configuration errors never surface mid-simulation.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::ecology::{
    self, ApplyConfig, BasinConfig, BiomeConfig, FeaturePlanConfig, PlotEffectsConfig,
};
use crate::error::{MapgenError, Result};
use crate::foundation::{MeshConfig, MeshStep, UpliftConfig, UpliftStep, MESH_STEP, UPLIFT_STEP};
use crate::hydrology::{ClimateConfig, ClimateStep, Knobs, CLIMATE_STEP};
use crate::morphology::{
    CoastConfig, CoastlinesStep, GeomorphologyConfig, GeomorphologyStep, IslandConfig,
    IslandsStep, LandmassConfig, LandmassStep, MountainConfig, MountainsStep, COASTLINES_STEP,
    GEOMORPHOLOGY_STEP, ISLANDS_STEP, LANDMASS_STEP, MOUNTAINS_STEP,
};
use crate::narrative::{
    CorridorConfig, CorridorsStep, HotspotConfig, HotspotsStep, MarginsConfig, MarginsStep,
    RiftConfig, RiftsStep, CORRIDORS_STEP, HOTSPOTS_STEP, MARGINS_STEP, RIFTS_STEP,
};
use crate::placement::{PlacementConfig, PlacementStep, PLACEMENT_STEP};
use crate::rng::root_seed_from_text;
use crate::step::{Pipeline, Step};
use crate::strategy::{parse_config, StrategyChoice};

/// Stages and the step keys each accepts, in recipe terms.
const LAYOUT: &[(&str, &[&str])] = &[
    ("foundation", &["mesh", "uplift"]),
    (
        "morphology",
        &["landmass", "coastlines", "islands", "mountains", "geomorphology"],
    ),
    ("narrative", &["margins", "hotspots", "rifts", "corridors"]),
    ("hydrology", &["knobs", "climate-baseline"]),
    (
        "ecology",
        &[
            "pedology",
            "resource-basins",
            "biomes",
            "biome-edges",
            "feature-plan",
            "plot-effects",
            "feature-apply",
        ],
    ),
    ("placement", &["inputs"]),
];

pub const ROOT_SEED_PURPOSE: &str = "mapgen/root-seed";

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SeedSpec {
    Number(u64),
    Text(String),
}

impl SeedSpec {
    pub fn root(&self) -> u64 {
        match self {
            SeedSpec::Number(seed) => *seed,
            SeedSpec::Text(text) => root_seed_from_text(text),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Recipe {
    #[serde(default)]
    pub seed: Option<SeedSpec>,
    #[serde(flatten)]
    pub stages: BTreeMap<String, Value>,
}

impl Recipe {
    fn branch(&self, stage: &str, step: &str) -> Value {
        self.stages
            .get(stage)
            .and_then(|branch| branch.get(step))
            .cloned()
            .unwrap_or(Value::Null)
    }

    /// Reject stage and step keys the pipeline does not know.
    fn check_layout(&self) -> Result<()> {
        for (stage, value) in &self.stages {
            let steps = LAYOUT
                .iter()
                .find(|(name, _)| name == stage)
                .map(|(_, steps)| *steps)
                .ok_or_else(|| MapgenError::config("recipe", stage, "unknown stage"))?;
            match value {
                Value::Null => {}
                Value::Object(branch) => {
                    if let Some(key) = branch.keys().find(|key| !steps.contains(&key.as_str())) {
                        return Err(MapgenError::config(stage, key, "unknown step"));
                    }
                }
                other => {
                    return Err(MapgenError::config(
                        "recipe",
                        stage,
                        format!("expected an object, found {other}"),
                    ))
                }
            }
        }
        Ok(())
    }

    fn step_config<C>(&self, stage: &str, step: &str, id: &str) -> Result<C>
    where
        C: DeserializeOwned + Default,
    {
        parse_config(id, &self.branch(stage, step))
    }

    /// Strategy branch, or `fallback` with default config when absent.
    fn strategy(&self, stage: &str, step: &str, id: &str, fallback: &str) -> Result<StrategyChoice> {
        match self.branch(stage, step) {
            Value::Null => Ok(StrategyChoice::named(fallback)),
            value => serde_json::from_value(value)
                .map_err(|err| MapgenError::config(id, "strategy", err.to_string())),
        }
    }
}

/// Normalize `recipe` into the fixed twenty-step pipeline.
pub fn compile(recipe: &Recipe) -> Result<Pipeline> {
    recipe.check_layout()?;

    let mesh: MeshConfig = recipe.step_config("foundation", "mesh", MESH_STEP)?;
    mesh.validate()?;
    let uplift: UpliftConfig =
        recipe.step_config("foundation", "uplift", UPLIFT_STEP)?;
    uplift.validate()?;

    let landmass: LandmassConfig =
        recipe.step_config("morphology", "landmass", LANDMASS_STEP)?;
    landmass.validate()?;
    let coast: CoastConfig =
        recipe.step_config("morphology", "coastlines", COASTLINES_STEP)?;
    coast.validate()?;
    let islands: IslandConfig =
        recipe.step_config("morphology", "islands", ISLANDS_STEP)?;
    islands.validate()?;
    let mountains: MountainConfig =
        recipe.step_config("morphology", "mountains", MOUNTAINS_STEP)?;
    mountains.validate()?;
    let geomorphology: GeomorphologyConfig = recipe.step_config(
        "morphology",
        "geomorphology",
        GEOMORPHOLOGY_STEP,
    )?;
    geomorphology.validate()?;

    let margins: MarginsConfig =
        recipe.step_config("narrative", "margins", MARGINS_STEP)?;
    margins.validate()?;
    let hotspots: HotspotConfig =
        recipe.step_config("narrative", "hotspots", HOTSPOTS_STEP)?;
    hotspots.validate()?;
    let rifts: RiftConfig = recipe.step_config("narrative", "rifts", RIFTS_STEP)?;
    rifts.validate()?;
    let corridors: CorridorConfig =
        recipe.step_config("narrative", "corridors", CORRIDORS_STEP)?;
    corridors.validate()?;

    let knobs: Knobs = recipe.step_config("hydrology", "knobs", "hydrology/knobs")?;
    let climate: ClimateConfig =
        recipe.step_config("hydrology", "climate-baseline", CLIMATE_STEP)?;
    let climate = ClimateStep::new(&climate, &knobs)?;

    let pedology = ecology::pedology::registry().resolve(&recipe.strategy(
        "ecology",
        "pedology",
        ecology::PEDOLOGY_STEP,
        "default",
    )?)?;
    let basins: BasinConfig =
        recipe.step_config("ecology", "resource-basins", ecology::BASINS_STEP)?;
    basins.validate()?;
    let biomes: BiomeConfig = recipe.step_config("ecology", "biomes", ecology::BIOMES_STEP)?;
    biomes.validate()?;
    let edges = ecology::edges::registry().resolve(&recipe.strategy(
        "ecology",
        "biome-edges",
        ecology::BIOME_EDGES_STEP,
        "vote",
    )?)?;
    let features: FeaturePlanConfig =
        recipe.step_config("ecology", "feature-plan", ecology::FEATURE_PLAN_STEP)?;
    features.validate()?;
    let effects: PlotEffectsConfig =
        recipe.step_config("ecology", "plot-effects", ecology::PLOT_EFFECTS_STEP)?;
    effects.validate()?;
    let apply: ApplyConfig =
        recipe.step_config("ecology", "feature-apply", ecology::FEATURE_APPLY_STEP)?;

    let placement: PlacementConfig =
        recipe.step_config("placement", "inputs", PLACEMENT_STEP)?;
    placement.validate()?;

    let steps: Vec<Box<dyn Step>> = vec![
        Box::new(MeshStep { config: mesh }),
        Box::new(UpliftStep { config: uplift }),
        Box::new(LandmassStep { config: landmass }),
        Box::new(CoastlinesStep { config: coast }),
        Box::new(MarginsStep { config: margins }),
        Box::new(HotspotsStep { config: hotspots }),
        Box::new(IslandsStep { config: islands }),
        Box::new(MountainsStep { config: mountains }),
        Box::new(RiftsStep { config: rifts }),
        Box::new(GeomorphologyStep {
            config: geomorphology,
        }),
        Box::new(CorridorsStep { config: corridors }),
        Box::new(climate),
        Box::new(ecology::PedologyStep { strategy: pedology }),
        Box::new(ecology::BasinsStep { config: basins }),
        Box::new(ecology::BiomesStep { config: biomes }),
        Box::new(ecology::BiomeEdgesStep { strategy: edges }),
        Box::new(ecology::FeaturePlanStep { config: features }),
        Box::new(ecology::PlotEffectsStep { config: effects }),
        Box::new(ecology::FeatureApplyStep { config: apply }),
        Box::new(PlacementStep { config: placement }),
    ];
    let pipeline = Pipeline::new(steps)?;
    debug!(steps = pipeline.step_ids().len(), "recipe compiled");
    Ok(pipeline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn recipe(value: Value) -> Recipe {
        serde_json::from_value(value).unwrap()
    }

    fn config_error(value: Value) -> (String, String) {
        match compile(&recipe(value)).err() {
            Some(MapgenError::Config { step, field, .. }) => (step, field),
            other => panic!("expected a config error, got {other:?}"),
        }
    }

    #[test]
    fn empty_recipe_compiles_in_fixed_order() {
        let pipeline = compile(&Recipe::default()).unwrap();
        assert_eq!(
            pipeline.step_ids(),
            vec![
                "foundation/mesh",
                "foundation/uplift",
                "morphology/landmass",
                "morphology/coastlines",
                "narrative/margins",
                "narrative/hotspots",
                "morphology/islands",
                "morphology/mountains",
                "narrative/rifts",
                "morphology/geomorphology",
                "narrative/corridors",
                "hydrology/climate-baseline",
                "ecology/pedology",
                "ecology/resource-basins",
                "ecology/biomes",
                "ecology/biome-edges",
                "ecology/feature-plan",
                "ecology/plot-effects",
                "ecology/feature-apply",
                "placement/inputs",
            ]
        );
    }

    #[test]
    fn unknown_stage_is_rejected() {
        let (step, field) = config_error(json!({"geology": {}}));
        assert_eq!((step.as_str(), field.as_str()), ("recipe", "geology"));
    }

    #[test]
    fn unknown_step_is_rejected() {
        let (step, field) = config_error(json!({"ecology": {"fauna": {}}}));
        assert_eq!((step.as_str(), field.as_str()), ("ecology", "fauna"));
    }

    #[test]
    fn out_of_range_field_names_step_and_field() {
        let (step, field) = config_error(json!({"foundation": {"mesh": {"plate_count": 1}}}));
        assert_eq!(step, "foundation/mesh");
        assert_eq!(field, "plate_count");
    }

    #[test]
    fn unknown_field_is_rejected() {
        let (step, field) =
            config_error(json!({"placement": {"inputs": {"wonder_count": 3}}}));
        assert_eq!(step, "placement/inputs");
        assert_eq!(field, "wonder_count");
    }

    #[test]
    fn huge_fixed_wonder_count_fails_compile() {
        let (step, field) = config_error(json!({"placement": {"inputs": {
            "wonders": {"fixed": {"count": 4_294_967_295u32}},
            "wonders_plus_one": true
        }}}));
        assert_eq!(step, "placement/inputs");
        assert_eq!(field, "wonders.count");
    }

    #[test]
    fn bad_knob_names_field() {
        let (step, field) = config_error(json!({"hydrology": {"knobs": {"dryness": "arid"}}}));
        assert_eq!(step, "hydrology/knobs");
        assert_eq!(field, "dryness");
    }

    #[test]
    fn unknown_strategy_is_rejected() {
        let result = compile(&recipe(json!({
            "ecology": {"pedology": {"strategy": "lunar"}}
        })));
        assert!(matches!(result, Err(MapgenError::UnknownStrategy { .. })));
    }

    #[test]
    fn strategy_config_is_validated() {
        let (step, field) = config_error(json!({
            "ecology": {"biome-edges": {"strategy": "vote", "config": {"radius": 0}}}
        }));
        assert_eq!(step, "ecology/biome-edges");
        assert_eq!(field, "radius");
    }

    #[test]
    fn seeds_accept_numbers_and_text() {
        let numeric = recipe(json!({"seed": 42}));
        assert_eq!(numeric.seed.unwrap().root(), 42);
        let text = recipe(json!({"seed": "pangaea"}));
        assert_eq!(text.seed.unwrap().root(), root_seed_from_text("pangaea"));
        assert!(recipe(json!({})).seed.is_none());
    }
}
