use rand_chacha::ChaCha8Rng;

use crate::artifacts::ArtifactStore;
use crate::diagnostics::Diagnostics;
use crate::error::{MapgenError, Result};
use crate::grid::Grid;
use crate::morphology::HeightfieldBuffer;
use crate::narrative::StoryBuffer;
use crate::rng::{step_rng, Stream};

/// Mutable working state owned by the stage that authors it. Artifacts are
/// snapshots of these buffers taken when the owning stage is done with them.
#[derive(Debug, Default)]
pub struct StageBuffers {
    pub heightfield: Option<HeightfieldBuffer>,
    pub story: Option<StoryBuffer>,
}

impl StageBuffers {
    pub fn heightfield(&self) -> Result<&HeightfieldBuffer> {
        self.heightfield
            .as_ref()
            .ok_or(MapgenError::MissingBuffer("heightfield"))
    }

    pub fn heightfield_mut(&mut self) -> Result<&mut HeightfieldBuffer> {
        self.heightfield
            .as_mut()
            .ok_or(MapgenError::MissingBuffer("heightfield"))
    }
}

/// Everything a step may touch while the pipeline runs. Host state is
/// captured up front so steps never call back into the host.
pub struct RunContext {
    pub grid: Grid,
    /// Latitude in degrees for each row, north positive.
    pub latitudes: Vec<f64>,
    pub root_seed: u64,
    /// 1 where the host reports a natural wonder.
    pub natural_wonders: Vec<u8>,
    pub artifacts: ArtifactStore,
    pub buffers: StageBuffers,
    pub diagnostics: Diagnostics,
}

impl RunContext {
    pub fn new(grid: Grid, latitudes: Vec<f64>, root_seed: u64) -> Result<Self> {
        if grid.size() == 0 {
            return Err(MapgenError::EmptyGrid {
                width: grid.width,
                height: grid.height,
            });
        }
        Ok(Self {
            grid,
            natural_wonders: vec![0; grid.size()],
            latitudes,
            root_seed,
            artifacts: ArtifactStore::new(grid),
            buffers: StageBuffers::default(),
            diagnostics: Diagnostics::default(),
        })
    }

    pub fn with_natural_wonders(mut self, mask: Vec<u8>) -> Self {
        self.natural_wonders = mask;
        self
    }

    pub fn latitude_of(&self, index: usize) -> f64 {
        let (_, y) = self.grid.coords(index);
        self.latitudes.get(y as usize).copied().unwrap_or(0.0)
    }

    /// Per-tile latitudes, expanded from the row table.
    pub fn tile_latitudes(&self) -> Vec<f64> {
        (0..self.grid.size()).map(|i| self.latitude_of(i)).collect()
    }

    pub fn rng(&self, step: &str, label: &str) -> ChaCha8Rng {
        step_rng(self.root_seed, step, label)
    }

    pub fn stream(&self, step: &str, label: &str) -> Stream {
        Stream::for_step(self.root_seed, step, label)
    }

    /// Story buffer, created empty on first use.
    pub fn story_mut(&mut self) -> &mut StoryBuffer {
        let size = self.grid.size();
        self.buffers
            .story
            .get_or_insert_with(|| StoryBuffer::new(size))
    }
}
