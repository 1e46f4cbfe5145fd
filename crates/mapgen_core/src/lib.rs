pub mod artifacts;
pub mod commit;
pub mod config;
pub mod context;
pub mod diagnostics;
pub mod ecology;
pub mod error;
pub mod fixed;
pub mod foundation;
pub mod grid;
pub mod host;
pub mod hydrology;
pub mod io;
pub mod morphology;
pub mod narrative;
pub mod noise_field;
pub mod placement;
pub mod rng;
pub mod step;
pub mod strategy;

use tracing::info;

use artifacts::ArtifactStore;
use commit::{commit, CommitReport};
use config::{compile, Recipe, ROOT_SEED_PURPOSE};
use context::RunContext;
use diagnostics::Warning;
use error::Result;
use host::HostSurface;

/// Everything a finished run leaves behind besides the host writes.
pub struct RunOutput {
    pub root_seed: u64,
    pub artifacts: ArtifactStore,
    pub warnings: Vec<Warning>,
    pub report: CommitReport,
}

/// Build a 64-bit seed from four 16-bit draws, high chunk first. `draw`
/// returns a value in `[0, max)`, so every bit pattern is reachable.
fn assemble_seed(mut draw: impl FnMut(u32) -> u32) -> u64 {
    (0..4).fold(0u64, |seed, _| (seed << 16) | u64::from(draw(1 << 16) & 0xFFFF))
}

/// Generate a map for `host` from `recipe`.
///
/// The recipe is compiled and validated before any host state is read. Host
/// reads (latitudes, wonder tags, and the root seed when the recipe has none)
/// happen once up front; the host is written only after every step has
/// published and validated its artifacts.
pub fn generate(recipe: &Recipe, host: &mut dyn HostSurface) -> Result<RunOutput> {
    let pipeline = compile(recipe)?;

    let root_seed = match &recipe.seed {
        Some(seed) => seed.root(),
        None => assemble_seed(|max| host.random(ROOT_SEED_PURPOSE, max)),
    };

    let grid = host.grid();
    let latitudes = (0..grid.height).map(|y| host.latitude(y)).collect();
    let wonders = (0..grid.size())
        .map(|index| {
            let (x, y) = grid.coords(index);
            u8::from(host.is_natural_wonder(x, y))
        })
        .collect();
    let mut ctx = RunContext::new(grid, latitudes, root_seed)?.with_natural_wonders(wonders);

    info!(
        width = grid.width,
        height = grid.height,
        root_seed,
        "generating map"
    );
    pipeline.run(&mut ctx)?;
    let report = commit(&ctx.artifacts, host)?;

    Ok(RunOutput {
        root_seed,
        artifacts: ctx.artifacts,
        warnings: ctx.diagnostics.into_warnings(),
        report,
    })
}
