use std::time::Instant;

use tracing::{debug, info, info_span};

use crate::artifacts::ArtifactStore;
use crate::context::RunContext;
use crate::error::{MapgenError, Result};

/// One unit of the pipeline. A step reads published artifacts (and the
/// stage buffers its stage owns) and publishes the artifacts it provides.
pub trait Step {
    /// `stage/step` identifier; also the seed-derivation key.
    fn id(&self) -> &'static str;

    /// Artifacts that must be published before this step runs.
    fn requires(&self) -> &'static [&'static str] {
        &[]
    }

    /// Artifacts this step publishes.
    fn provides(&self) -> &'static [&'static str] {
        &[]
    }

    /// Register the contracts for everything in [`provides`](Self::provides).
    fn declare(&self, _store: &mut ArtifactStore) {}

    fn run(&self, ctx: &mut RunContext) -> Result<()>;
}

/// Ordered list of steps, checked so every requirement has an earlier provider.
pub struct Pipeline {
    steps: Vec<Box<dyn Step>>,
}

impl Pipeline {
    pub fn new(steps: Vec<Box<dyn Step>>) -> Result<Self> {
        let mut provided: Vec<&'static str> = Vec::new();
        for step in &steps {
            for &artifact in step.requires() {
                if !provided.contains(&artifact) {
                    return Err(MapgenError::MissingDependency {
                        step: step.id(),
                        artifact,
                    });
                }
            }
            provided.extend_from_slice(step.provides());
        }
        Ok(Self { steps })
    }

    pub fn step_ids(&self) -> Vec<&'static str> {
        self.steps.iter().map(|step| step.id()).collect()
    }

    pub fn run(&self, ctx: &mut RunContext) -> Result<()> {
        for step in &self.steps {
            step.declare(&mut ctx.artifacts);
        }
        for step in &self.steps {
            run_step(step.as_ref(), ctx)?;
        }
        Ok(())
    }
}

fn run_step(step: &dyn Step, ctx: &mut RunContext) -> Result<()> {
    let id = step.id();
    let span = info_span!("step", id);
    let _guard = span.enter();

    for &artifact in step.requires() {
        if !ctx.artifacts.is_published(artifact) {
            return Err(MapgenError::MissingDependency { step: id, artifact });
        }
    }

    let started = Instant::now();
    step.run(ctx)?;

    for &artifact in step.provides() {
        if !ctx.artifacts.is_published(artifact) {
            return Err(MapgenError::Unpublished(artifact));
        }
        debug!(artifact, "published");
    }
    info!(elapsed_ms = started.elapsed().as_millis() as u64, "step complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::{check_len, Artifact, Shape};
    use crate::grid::Grid;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Marker {
        values: Vec<u8>,
    }

    impl Artifact for Marker {
        const NAME: &'static str = "test.marker";
        const SHAPE: Shape = Shape::PerTile(&["values"]);

        fn validate(&self, grid: &Grid) -> Vec<String> {
            let mut issues = Vec::new();
            check_len(&mut issues, "values", self.values.len(), grid);
            issues
        }
    }

    struct Producer {
        len: usize,
    }

    impl Step for Producer {
        fn id(&self) -> &'static str {
            "test/producer"
        }

        fn provides(&self) -> &'static [&'static str] {
            &[Marker::NAME]
        }

        fn declare(&self, store: &mut ArtifactStore) {
            store.declare::<Marker>();
        }

        fn run(&self, ctx: &mut RunContext) -> Result<()> {
            ctx.artifacts.publish(Marker {
                values: vec![1; self.len],
            })
        }
    }

    struct Consumer;

    impl Step for Consumer {
        fn id(&self) -> &'static str {
            "test/consumer"
        }

        fn requires(&self) -> &'static [&'static str] {
            &[Marker::NAME]
        }

        fn run(&self, ctx: &mut RunContext) -> Result<()> {
            let marker = ctx.artifacts.read::<Marker>()?;
            assert_eq!(marker.values.len(), ctx.grid.size());
            Ok(())
        }
    }

    fn context() -> RunContext {
        RunContext::new(Grid::new(2, 2, false), vec![10.0, -10.0], 1).unwrap()
    }

    #[test]
    fn ordering_is_checked_at_build_time() {
        let result = Pipeline::new(vec![Box::new(Consumer), Box::new(Producer { len: 4 })]);
        assert!(matches!(
            result,
            Err(MapgenError::MissingDependency {
                step: "test/consumer",
                artifact: "test.marker"
            })
        ));
    }

    #[test]
    fn producer_then_consumer_runs() {
        let pipeline =
            Pipeline::new(vec![Box::new(Producer { len: 4 }), Box::new(Consumer)]).unwrap();
        let mut ctx = context();
        pipeline.run(&mut ctx).unwrap();
        assert_eq!(pipeline.step_ids(), vec!["test/producer", "test/consumer"]);
    }

    #[test]
    fn contract_violation_aborts_before_consumers() {
        let pipeline =
            Pipeline::new(vec![Box::new(Producer { len: 3 }), Box::new(Consumer)]).unwrap();
        let mut ctx = context();
        let err = pipeline.run(&mut ctx).unwrap_err();
        assert!(matches!(err, MapgenError::Contract { .. }));
    }
}
