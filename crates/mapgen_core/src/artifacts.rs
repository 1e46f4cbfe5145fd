//! Typed artifact store.
//!
//! An artifact is declared once, published once by the step that owns it, and
//! read-only afterwards. Publication runs the artifact's validator and fails
//! the run on any violated check.

use std::any::Any;
use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::error::{MapgenError, Result};
use crate::grid::Grid;

/// Layout of an artifact's payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "fields")]
pub enum Shape {
    /// Named arrays that must each hold exactly one value per tile.
    PerTile(&'static [&'static str]),
    /// A list of records with its own validation rules.
    Records,
}

pub trait Artifact: Serialize + Send + Sync + 'static {
    const NAME: &'static str;
    const SHAPE: Shape;

    /// Return every violated check; empty means the value is acceptable.
    fn validate(&self, grid: &Grid) -> Vec<String>;
}

/// Push an issue when a per-tile array has the wrong length.
pub fn check_len(issues: &mut Vec<String>, field: &str, len: usize, grid: &Grid) {
    if len != grid.size() {
        issues.push(format!(
            "{field} has length {len}, expected {} ({}x{})",
            grid.size(),
            grid.width,
            grid.height
        ));
    }
}

/// Push an issue for the first tile whose value falls outside `domain_max`.
pub fn check_domain(issues: &mut Vec<String>, field: &str, values: &[u8], domain_max: u8) {
    if let Some(position) = values.iter().position(|&v| v > domain_max) {
        issues.push(format!(
            "{field}[{position}] = {} is outside 0..={domain_max}",
            values[position]
        ));
    }
}

/// Push an issue for the first non-finite value.
pub fn check_finite(issues: &mut Vec<String>, field: &str, values: &[f32]) {
    if let Some(position) = values.iter().position(|v| !v.is_finite()) {
        issues.push(format!("{field}[{position}] is not finite"));
    }
}

trait Published: Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn to_json(&self) -> serde_json::Result<Value>;
}

impl<A: Artifact> Published for A {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn to_json(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}

struct Slot {
    shape: Shape,
    value: Option<Box<dyn Published>>,
}

/// Single-writer registry of published artifacts for one run.
pub struct ArtifactStore {
    grid: Grid,
    slots: BTreeMap<&'static str, Slot>,
    order: Vec<&'static str>,
}

impl ArtifactStore {
    pub fn new(grid: Grid) -> Self {
        Self {
            grid,
            slots: BTreeMap::new(),
            order: Vec::new(),
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Register a contract. Declaring the same artifact twice is a no-op.
    pub fn declare<A: Artifact>(&mut self) {
        self.slots.entry(A::NAME).or_insert(Slot {
            shape: A::SHAPE,
            value: None,
        });
    }

    /// Validate and publish `value`. Fails fast on any contract violation.
    pub fn publish<A: Artifact>(&mut self, value: A) -> Result<()> {
        let slot = self
            .slots
            .get_mut(A::NAME)
            .ok_or(MapgenError::Undeclared(A::NAME))?;
        if slot.value.is_some() {
            return Err(MapgenError::AlreadyPublished(A::NAME));
        }
        let issues = value.validate(&self.grid);
        if !issues.is_empty() {
            return Err(MapgenError::Contract {
                artifact: A::NAME,
                issues,
            });
        }
        slot.value = Some(Box::new(value));
        self.order.push(A::NAME);
        Ok(())
    }

    pub fn read<A: Artifact>(&self) -> Result<&A> {
        self.slots
            .get(A::NAME)
            .and_then(|slot| slot.value.as_ref())
            .and_then(|value| value.as_any().downcast_ref::<A>())
            .ok_or(MapgenError::Unpublished(A::NAME))
    }

    /// Like [`read`](Self::read), but `None` when the artifact was never produced.
    pub fn try_read<A: Artifact>(&self) -> Option<&A> {
        self.read::<A>().ok()
    }

    pub fn is_published(&self, name: &str) -> bool {
        self.slots
            .get(name)
            .map_or(false, |slot| slot.value.is_some())
    }

    /// Published artifact names in publication order.
    pub fn names(&self) -> &[&'static str] {
        &self.order
    }

    pub fn shape(&self, name: &str) -> Option<Shape> {
        self.slots.get(name).map(|slot| slot.shape)
    }

    /// JSON view of a published artifact, for inspection tooling.
    pub fn snapshot(&self, name: &str) -> Option<serde_json::Result<Value>> {
        self.slots
            .get(name)
            .and_then(|slot| slot.value.as_ref())
            .map(|value| value.to_json())
    }
}
