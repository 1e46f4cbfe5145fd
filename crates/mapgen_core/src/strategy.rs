//! Tagged strategy selection.
//!
//! A strategy branch in a recipe is `{ "strategy": "<id>", "config": { ... } }`.
//! The registry maps the id to a constructor that validates the config
//! against that strategy's own schema and returns the implementation. The
//! lookup happens once, while the recipe is compiled into a pipeline.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{MapgenError, Result};

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StrategyChoice {
    pub strategy: String,
    #[serde(default)]
    pub config: Value,
}

impl StrategyChoice {
    pub fn named(strategy: &str) -> Self {
        Self {
            strategy: strategy.to_string(),
            config: Value::Null,
        }
    }
}

pub type Constructor<T> = fn(step: &'static str, config: &Value) -> Result<Box<T>>;

pub struct Registry<T: ?Sized> {
    step: &'static str,
    entries: Vec<(&'static str, Constructor<T>)>,
}

impl<T: ?Sized> Registry<T> {
    pub fn new(step: &'static str) -> Self {
        Self {
            step,
            entries: Vec::new(),
        }
    }

    pub fn with(mut self, id: &'static str, constructor: Constructor<T>) -> Self {
        self.entries.push((id, constructor));
        self
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.entries.iter().map(|(id, _)| *id).collect()
    }

    pub fn resolve(&self, choice: &StrategyChoice) -> Result<Box<T>> {
        let constructor = self
            .entries
            .iter()
            .find(|(id, _)| *id == choice.strategy)
            .map(|(_, constructor)| *constructor)
            .ok_or_else(|| MapgenError::UnknownStrategy {
                step: self.step.to_string(),
                strategy: choice.strategy.clone(),
            })?;
        constructor(self.step, &choice.config)
    }
}

/// Deserialize a config object against `C`'s schema. `null` yields the
/// defaults. Errors name the offending top-level field.
pub fn parse_config<C>(step: &str, value: &Value) -> Result<C>
where
    C: DeserializeOwned + Default,
{
    match value {
        Value::Null => Ok(C::default()),
        Value::Object(map) => C::deserialize(value).map_err(|err| {
            let field = offending_field::<C>(map).unwrap_or_else(|| "<root>".to_string());
            MapgenError::config(step, &field, err.to_string())
        }),
        other => Err(MapgenError::config(
            step,
            "<root>",
            format!("expected an object, found {other}"),
        )),
    }
}

/// Find the first key that fails to deserialize on its own. Every config
/// type uses `#[serde(default)]`, so a single-key object only fails for
/// that key.
fn offending_field<C: DeserializeOwned>(map: &Map<String, Value>) -> Option<String> {
    map.iter()
        .find(|(key, value)| {
            let mut single = Map::new();
            single.insert((*key).clone(), (*value).clone());
            serde_json::from_value::<C>(Value::Object(single)).is_err()
        })
        .map(|(key, _)| key.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    trait Shout {
        fn shout(&self) -> String;
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(deny_unknown_fields, default)]
    struct LoudConfig {
        volume: u8,
    }

    struct Loud(LoudConfig);

    impl Shout for Loud {
        fn shout(&self) -> String {
            format!("loud {}", self.0.volume)
        }
    }

    fn loud(step: &'static str, config: &Value) -> Result<Box<dyn Shout>> {
        Ok(Box::new(Loud(parse_config(step, config)?)))
    }

    fn registry() -> Registry<dyn Shout> {
        Registry::new("test/shout").with("loud", loud)
    }

    #[test]
    fn resolves_known_strategy() {
        let choice: StrategyChoice =
            serde_json::from_value(json!({"strategy": "loud", "config": {"volume": 3}})).unwrap();
        assert_eq!(registry().resolve(&choice).unwrap().shout(), "loud 3");
    }

    #[test]
    fn missing_config_uses_defaults() {
        let choice = StrategyChoice::named("loud");
        assert_eq!(registry().resolve(&choice).unwrap().shout(), "loud 0");
    }

    #[test]
    fn unknown_strategy_is_rejected() {
        let err = registry()
            .resolve(&StrategyChoice::named("quiet"))
            .err()
            .unwrap();
        assert!(matches!(err, MapgenError::UnknownStrategy { .. }));
    }

    #[test]
    fn unknown_key_names_field() {
        let choice: StrategyChoice =
            serde_json::from_value(json!({"strategy": "loud", "config": {"pitch": 1}})).unwrap();
        match registry().resolve(&choice).err().unwrap() {
            MapgenError::Config { step, field, .. } => {
                assert_eq!(step, "test/shout");
                assert_eq!(field, "pitch");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn wrong_type_names_field() {
        let err = parse_config::<LoudConfig>("s", &json!({"volume": "max"})).unwrap_err();
        match err {
            MapgenError::Config { field, .. } => assert_eq!(field, "volume"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
