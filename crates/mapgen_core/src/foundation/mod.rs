//! Foundation stage: plate mesh, crust, motion, boundaries and the uplift
//! and rift potential they project onto the grid.

mod mesh;
mod plates;
mod uplift;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::artifacts::{check_finite, check_len, Artifact, ArtifactStore, Shape};
use crate::context::RunContext;
use crate::error::{check, check_range, Result};
use crate::grid::Grid;
use crate::step::Step;

pub const MESH_STEP: &str = "foundation/mesh";
pub const UPLIFT_STEP: &str = "foundation/uplift";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrustType {
    Continental,
    Oceanic,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryKind {
    Convergent,
    Divergent,
    Transform,
}

impl BoundaryKind {
    /// Per-tile encoding; 0 is reserved for "no boundary in range".
    pub fn code(self) -> u8 {
        match self {
            BoundaryKind::Convergent => 1,
            BoundaryKind::Divergent => 2,
            BoundaryKind::Transform => 3,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Plate {
    pub id: u16,
    pub crust: CrustType,
    pub velocity: [f64; 2],
    pub area: u32,
    pub centroid: [f64; 2],
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlateBoundary {
    pub a: u16,
    pub b: u16,
    pub kind: BoundaryKind,
    pub closing_speed: f64,
    pub magnitude: f64,
    pub length: u32,
}

#[derive(Clone, Debug, Serialize)]
pub struct PlateGraph {
    pub plates: Vec<Plate>,
    pub boundaries: Vec<PlateBoundary>,
}

impl Artifact for PlateGraph {
    const NAME: &'static str = "foundation.plates";
    const SHAPE: Shape = Shape::Records;

    fn validate(&self, grid: &Grid) -> Vec<String> {
        let mut issues = Vec::new();
        for (position, plate) in self.plates.iter().enumerate() {
            if plate.id as usize != position {
                issues.push(format!("plate at {position} carries id {}", plate.id));
            }
        }
        let area: u64 = self.plates.iter().map(|p| u64::from(p.area)).sum();
        if area != grid.size() as u64 {
            issues.push(format!("plate areas sum to {area}, grid has {}", grid.size()));
        }
        for boundary in &self.boundaries {
            if boundary.a >= boundary.b || boundary.b as usize >= self.plates.len() {
                issues.push(format!(
                    "boundary ({}, {}) is not an ordered pair of known plates",
                    boundary.a, boundary.b
                ));
            }
        }
        issues
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct PlateMesh {
    pub plate_count: u16,
    pub plate_id: Vec<u16>,
}

impl Artifact for PlateMesh {
    const NAME: &'static str = "foundation.mesh";
    const SHAPE: Shape = Shape::PerTile(&["plate_id"]);

    fn validate(&self, grid: &Grid) -> Vec<String> {
        let mut issues = Vec::new();
        check_len(&mut issues, "plate_id", self.plate_id.len(), grid);
        if let Some(&id) = self.plate_id.iter().find(|&&id| id >= self.plate_count) {
            issues.push(format!("plate_id {id} exceeds plate_count {}", self.plate_count));
        }
        issues
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct UpliftField {
    pub uplift: Vec<f32>,
    pub rift: Vec<f32>,
    pub closeness: Vec<f32>,
    pub boundary_kind: Vec<u8>,
    pub boundary_distance: Vec<u8>,
}

impl UpliftField {
    pub fn is_convergent(&self, index: usize) -> bool {
        self.boundary_kind[index] == BoundaryKind::Convergent.code()
    }
}

impl Artifact for UpliftField {
    const NAME: &'static str = "foundation.uplift";
    const SHAPE: Shape = Shape::PerTile(&[
        "uplift",
        "rift",
        "closeness",
        "boundary_kind",
        "boundary_distance",
    ]);

    fn validate(&self, grid: &Grid) -> Vec<String> {
        let mut issues = Vec::new();
        check_len(&mut issues, "uplift", self.uplift.len(), grid);
        check_len(&mut issues, "rift", self.rift.len(), grid);
        check_len(&mut issues, "closeness", self.closeness.len(), grid);
        check_len(&mut issues, "boundary_kind", self.boundary_kind.len(), grid);
        check_len(&mut issues, "boundary_distance", self.boundary_distance.len(), grid);
        check_finite(&mut issues, "uplift", &self.uplift);
        check_finite(&mut issues, "rift", &self.rift);
        issues
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct MeshConfig {
    pub plate_count: u32,
    pub relaxation_steps: u32,
    pub continental_ratio: f64,
    pub convergent_threshold: f64,
    pub divergent_threshold: f64,
    pub min_speed: f64,
    pub max_speed: f64,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            plate_count: 8,
            relaxation_steps: 5,
            continental_ratio: 0.35,
            convergent_threshold: 0.15,
            divergent_threshold: 0.15,
            min_speed: 0.5,
            max_speed: 1.0,
        }
    }
}

impl MeshConfig {
    pub fn validate(&self) -> Result<()> {
        check(
            (2..=64).contains(&self.plate_count),
            MESH_STEP,
            "plate_count",
            "must be between 2 and 64",
        )?;
        check(
            self.relaxation_steps <= 16,
            MESH_STEP,
            "relaxation_steps",
            "must be at most 16",
        )?;
        check_range(self.continental_ratio, 0.0, 1.0, MESH_STEP, "continental_ratio")?;
        check_range(self.convergent_threshold, 0.0, 2.0, MESH_STEP, "convergent_threshold")?;
        check_range(self.divergent_threshold, 0.0, 2.0, MESH_STEP, "divergent_threshold")?;
        check_range(self.min_speed, 0.0, 4.0, MESH_STEP, "min_speed")?;
        check_range(self.max_speed, self.min_speed, 4.0, MESH_STEP, "max_speed")
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct UpliftConfig {
    pub boundary_radius: u32,
    pub falloff_exponent: f64,
    pub convergent_weight: f64,
    pub transform_weight: f64,
    pub divergent_weight: f64,
    pub continental_base: f64,
}

impl Default for UpliftConfig {
    fn default() -> Self {
        Self {
            boundary_radius: 5,
            falloff_exponent: 1.5,
            convergent_weight: 1.0,
            transform_weight: 0.35,
            divergent_weight: 1.0,
            continental_base: 0.2,
        }
    }
}

impl UpliftConfig {
    pub fn validate(&self) -> Result<()> {
        check(
            (1..=32).contains(&self.boundary_radius),
            UPLIFT_STEP,
            "boundary_radius",
            "must be between 1 and 32",
        )?;
        check_range(self.falloff_exponent, 0.1, 8.0, UPLIFT_STEP, "falloff_exponent")?;
        check_range(self.convergent_weight, 0.0, 4.0, UPLIFT_STEP, "convergent_weight")?;
        check_range(self.transform_weight, 0.0, 4.0, UPLIFT_STEP, "transform_weight")?;
        check_range(self.divergent_weight, 0.0, 4.0, UPLIFT_STEP, "divergent_weight")?;
        check_range(self.continental_base, 0.0, 1.0, UPLIFT_STEP, "continental_base")
    }
}

pub struct MeshStep {
    pub config: MeshConfig,
}

impl Step for MeshStep {
    fn id(&self) -> &'static str {
        MESH_STEP
    }

    fn provides(&self) -> &'static [&'static str] {
        &[PlateMesh::NAME, PlateGraph::NAME]
    }

    fn declare(&self, store: &mut ArtifactStore) {
        store.declare::<PlateMesh>();
        store.declare::<PlateGraph>();
    }

    fn run(&self, ctx: &mut RunContext) -> Result<()> {
        let grid = ctx.grid;
        let plate_count = (self.config.plate_count as usize).min(grid.size()).max(1);

        let mut site_rng = ctx.rng(MESH_STEP, "sites");
        let mesh = mesh::build(&grid, plate_count, self.config.relaxation_steps, &mut site_rng);

        let mut areas = vec![0u32; plate_count];
        for &id in &mesh.plate_id {
            areas[id as usize] += 1;
        }
        let centroids = mesh::centroids(&grid, &mesh.plate_id, &mesh.sites);

        let mut crust_rng = ctx.rng(MESH_STEP, "crust");
        let crust = plates::assign_crust(&areas, self.config.continental_ratio, &mut crust_rng);
        let mut motion_rng = ctx.rng(MESH_STEP, "motion");
        let velocity = plates::assign_motion(
            plate_count,
            self.config.min_speed,
            self.config.max_speed,
            &mut motion_rng,
        );

        let plates: Vec<Plate> = (0..plate_count)
            .map(|id| Plate {
                id: id as u16,
                crust: crust[id],
                velocity: velocity[id],
                area: areas[id],
                centroid: [centroids[id].0, centroids[id].1],
            })
            .collect();

        let edges = plates::adjacency(&grid, &mesh.plate_id);
        let boundaries = plates::classify(
            &grid,
            &plates,
            &edges,
            self.config.convergent_threshold,
            self.config.divergent_threshold,
        );
        debug!(
            plates = plates.len(),
            boundaries = boundaries.len(),
            "plate graph built"
        );

        ctx.artifacts.publish(PlateMesh {
            plate_count: plate_count as u16,
            plate_id: mesh.plate_id,
        })?;
        ctx.artifacts.publish(PlateGraph { plates, boundaries })
    }
}

pub struct UpliftStep {
    pub config: UpliftConfig,
}

impl Step for UpliftStep {
    fn id(&self) -> &'static str {
        UPLIFT_STEP
    }

    fn requires(&self) -> &'static [&'static str] {
        &[PlateMesh::NAME, PlateGraph::NAME]
    }

    fn provides(&self) -> &'static [&'static str] {
        &[UpliftField::NAME]
    }

    fn declare(&self, store: &mut ArtifactStore) {
        store.declare::<UpliftField>();
    }

    fn run(&self, ctx: &mut RunContext) -> Result<()> {
        let mesh = ctx.artifacts.read::<PlateMesh>()?;
        let graph = ctx.artifacts.read::<PlateGraph>()?;
        let field = uplift::project(
            &ctx.grid,
            &mesh.plate_id,
            &graph.plates,
            &graph.boundaries,
            &self.config,
        );
        ctx.artifacts.publish(field)
    }
}
