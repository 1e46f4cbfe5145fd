use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};

use crate::config::Recipe;

impl Recipe {
    /// Load a recipe JSON document from disk.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("failed to open recipe file {:?}", path))?;
        Self::from_reader(BufReader::new(file))
            .with_context(|| format!("failed to read recipe {:?}", path))
    }

    /// Deserialize a recipe document from an arbitrary reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        serde_json::from_reader(reader).context("invalid recipe json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SeedSpec;

    #[test]
    fn reads_nested_branches() {
        let json = r#"{
            "seed": "archipelago",
            "morphology": {"landmass": {"water_percent": 70}},
            "ecology": {"pedology": {"strategy": "coastal-shelf"}}
        }"#;
        let recipe = Recipe::from_reader(json.as_bytes()).unwrap();
        assert_eq!(recipe.seed, Some(SeedSpec::Text("archipelago".to_string())));
        assert_eq!(recipe.stages["morphology"]["landmass"]["water_percent"], 70);
        assert!(crate::config::compile(&recipe).is_ok());
    }

    #[test]
    fn malformed_json_reports_context() {
        let err = Recipe::from_reader("{ seed: ".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("invalid recipe json"));
    }

    #[test]
    fn missing_file_names_path() {
        let err = Recipe::load_from_path(Path::new("/nonexistent/recipe.json")).unwrap_err();
        assert!(format!("{err:#}").contains("recipe.json"));
    }
}
