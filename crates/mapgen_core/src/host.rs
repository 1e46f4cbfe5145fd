//! Capability surface the pipeline needs from a host engine.
//!
//! Reads happen once, before the first step runs; writes happen only in the
//! batch commit after every artifact has validated. [`MemoryHost`] is a
//! self-contained implementation for tests and the command-line tools.

use std::collections::BTreeMap;

use crate::ecology::{BiomeId, FeatureKind, PlotEffect};
use crate::grid::Grid;
use crate::morphology::TerrainType;
use crate::placement::PlacementInputs;
use crate::rng::{derive_seed, Stream};

pub trait HostSurface {
    fn grid(&self) -> Grid;

    /// Latitude of row `y` in degrees, north positive.
    fn latitude(&self, y: u32) -> f64;

    /// Uniform draw in `[0, max)` from the host's purpose-scoped source.
    fn random(&mut self, purpose: &str, max: u32) -> u32;

    fn is_natural_wonder(&self, x: u32, y: u32) -> bool;

    fn is_revealed(&self, x: u32, y: u32) -> bool;

    fn set_elevation(&mut self, x: u32, y: u32, meters: i16);

    fn set_terrain(&mut self, x: u32, y: u32, terrain: TerrainType);

    fn set_climate(&mut self, x: u32, y: u32, rainfall: u8, humidity: u8);

    fn set_biome(&mut self, x: u32, y: u32, biome: BiomeId);

    /// `None` clears the tile.
    fn set_feature(&mut self, x: u32, y: u32, feature: Option<FeatureKind>);

    fn set_plot_effect(&mut self, x: u32, y: u32, effect: PlotEffect);

    /// Rebuild land and water areas after terrain changed.
    fn recalculate_areas(&mut self);

    fn stamp_continents(&mut self);

    fn apply_placement_inputs(&mut self, inputs: &PlacementInputs);
}

/// Latitude at the centre of row `y`, spanning +90 at the top to -90 at the
/// bottom.
pub fn row_latitude(y: u32, height: u32) -> f64 {
    let ratio = (f64::from(y) + 0.5) / f64::from(height.max(1));
    90.0 - ratio * 180.0
}

/// In-memory host. Every write lands in a public per-tile array so tests can
/// inspect exactly what a commit produced.
#[derive(Clone, Debug)]
pub struct MemoryHost {
    grid: Grid,
    latitudes: Vec<f64>,
    seed: u64,
    draws: BTreeMap<String, u64>,
    wonders: Vec<bool>,
    revealed: Vec<bool>,
    pub elevation: Vec<i16>,
    pub terrain: Vec<Option<TerrainType>>,
    pub rainfall: Vec<u8>,
    pub humidity: Vec<u8>,
    pub biome: Vec<Option<BiomeId>>,
    pub feature: Vec<Option<FeatureKind>>,
    pub plot_effects: Vec<Vec<PlotEffect>>,
    /// Continent id per land tile, assigned by [`HostSurface::stamp_continents`].
    pub continent: Vec<Option<u32>>,
    pub land_area: usize,
    pub water_area: usize,
    pub placement: Option<PlacementInputs>,
}

impl MemoryHost {
    pub fn new(width: u32, height: u32, wrap_x: bool, seed: u64) -> Self {
        let grid = Grid::new(width, height, wrap_x);
        let size = grid.size();
        Self {
            grid,
            latitudes: (0..height).map(|y| row_latitude(y, height)).collect(),
            seed,
            draws: BTreeMap::new(),
            wonders: vec![false; size],
            revealed: vec![false; size],
            elevation: vec![0; size],
            terrain: vec![None; size],
            rainfall: vec![0; size],
            humidity: vec![0; size],
            biome: vec![None; size],
            feature: vec![None; size],
            plot_effects: vec![Vec::new(); size],
            continent: vec![None; size],
            land_area: 0,
            water_area: 0,
            placement: None,
        }
    }

    /// Replace the per-row latitude table. Rows beyond the table read 0.
    pub fn with_latitudes(mut self, latitudes: Vec<f64>) -> Self {
        self.latitudes = latitudes;
        self
    }

    pub fn with_natural_wonder(mut self, x: u32, y: u32) -> Self {
        let index = self.grid.index(x, y);
        self.wonders[index] = true;
        self
    }

    pub fn reveal(&mut self, x: u32, y: u32) {
        let index = self.grid.index(x, y);
        self.revealed[index] = true;
    }

    fn slot(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.grid.width && y < self.grid.height).then(|| self.grid.index(x, y))
    }

    fn is_land(&self, index: usize) -> bool {
        self.terrain[index].map_or(false, |terrain| !terrain.is_water())
    }
}

impl HostSurface for MemoryHost {
    fn grid(&self) -> Grid {
        self.grid
    }

    fn latitude(&self, y: u32) -> f64 {
        self.latitudes.get(y as usize).copied().unwrap_or(0.0)
    }

    fn random(&mut self, purpose: &str, max: u32) -> u32 {
        let counter = self.draws.entry(purpose.to_string()).or_insert(0);
        let mut stream = Stream::new(derive_seed(self.seed, "host", purpose)).derive(*counter);
        *counter += 1;
        stream.next_below(max)
    }

    fn is_natural_wonder(&self, x: u32, y: u32) -> bool {
        self.slot(x, y).map_or(false, |index| self.wonders[index])
    }

    fn is_revealed(&self, x: u32, y: u32) -> bool {
        self.slot(x, y).map_or(false, |index| self.revealed[index])
    }

    fn set_elevation(&mut self, x: u32, y: u32, meters: i16) {
        if let Some(index) = self.slot(x, y) {
            self.elevation[index] = meters;
        }
    }

    fn set_terrain(&mut self, x: u32, y: u32, terrain: TerrainType) {
        if let Some(index) = self.slot(x, y) {
            self.terrain[index] = Some(terrain);
        }
    }

    fn set_climate(&mut self, x: u32, y: u32, rainfall: u8, humidity: u8) {
        if let Some(index) = self.slot(x, y) {
            self.rainfall[index] = rainfall;
            self.humidity[index] = humidity;
        }
    }

    fn set_biome(&mut self, x: u32, y: u32, biome: BiomeId) {
        if let Some(index) = self.slot(x, y) {
            self.biome[index] = Some(biome);
        }
    }

    fn set_feature(&mut self, x: u32, y: u32, feature: Option<FeatureKind>) {
        if let Some(index) = self.slot(x, y) {
            self.feature[index] = feature;
        }
    }

    fn set_plot_effect(&mut self, x: u32, y: u32, effect: PlotEffect) {
        if let Some(index) = self.slot(x, y) {
            self.plot_effects[index].push(effect);
        }
    }

    fn recalculate_areas(&mut self) {
        let land = (0..self.grid.size()).filter(|&i| self.is_land(i)).count();
        self.land_area = land;
        self.water_area = self.grid.size() - land;
    }

    /// Label 4-connected land regions in scan order.
    fn stamp_continents(&mut self) {
        let mut continent = vec![None; self.grid.size()];
        let mut next = 0u32;
        let mut stack = Vec::new();
        for start in 0..self.grid.size() {
            if !self.is_land(start) || continent[start].is_some() {
                continue;
            }
            continent[start] = Some(next);
            stack.push(start);
            while let Some(index) = stack.pop() {
                for neighbor in self.grid.neighbors4(index) {
                    if self.is_land(neighbor) && continent[neighbor].is_none() {
                        continent[neighbor] = Some(next);
                        stack.push(neighbor);
                    }
                }
            }
            next += 1;
        }
        self.continent = continent;
    }

    fn apply_placement_inputs(&mut self, inputs: &PlacementInputs) {
        self.placement = Some(inputs.clone());
    }
}
