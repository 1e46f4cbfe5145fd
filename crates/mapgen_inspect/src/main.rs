use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use clap::Parser;
use mapgen_core::config::{Recipe, SeedSpec};
use mapgen_core::generate;
use mapgen_core::host::MemoryHost;
use mapgen_core::io::snapshot::{collect, read_ndjson, SnapshotLine};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "mapgen_inspect", about = "HTTP inspector for map artifact snapshots")]
struct Args {
    /// Serve an NDJSON snapshot written by `mapgen_run` instead of generating.
    #[arg(long, value_name = "PATH", conflicts_with = "recipe")]
    snapshot: Option<PathBuf>,

    /// Recipe to generate from when no snapshot is given.
    #[arg(long, value_name = "PATH")]
    recipe: Option<PathBuf>,

    #[arg(long, default_value_t = 84)]
    width: u32,

    #[arg(long, default_value_t = 54)]
    height: u32,

    #[arg(long)]
    seed: Option<u64>,

    /// Address to bind (defaults to 127.0.0.1).
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,

    #[arg(long, default_value_t = 8788)]
    port: u16,
}

/// Published artifacts and warnings of one run, keyed for lookup.
#[derive(Debug, Default)]
struct Inspection {
    order: Vec<String>,
    shapes: BTreeMap<String, Value>,
    values: BTreeMap<String, Value>,
    warnings: Vec<Value>,
}

impl Inspection {
    fn from_lines(lines: Vec<SnapshotLine>) -> Self {
        let mut inspection = Self::default();
        for line in lines {
            match line {
                SnapshotLine::Artifact { name, shape, value } => {
                    inspection.order.push(name.clone());
                    inspection.shapes.insert(name.clone(), shape);
                    inspection.values.insert(name, value);
                }
                SnapshotLine::Warning { warning } => inspection.warnings.push(warning),
            }
        }
        inspection
    }
}

type AppState = Arc<Inspection>;

fn load(args: &Args) -> Result<Inspection> {
    if let Some(path) = &args.snapshot {
        let file = File::open(path).with_context(|| format!("failed to open {:?}", path))?;
        let lines = read_ndjson(BufReader::new(file))
            .with_context(|| format!("failed to load snapshot {:?}", path))?;
        return Ok(Inspection::from_lines(lines));
    }

    let mut recipe = match &args.recipe {
        Some(path) => Recipe::load_from_path(path)?,
        None => Recipe::default(),
    };
    if let Some(seed) = args.seed {
        recipe.seed = Some(SeedSpec::Number(seed));
    }
    let mut host = MemoryHost::new(args.width, args.height, true, 0);
    let output = generate(&recipe, &mut host).context("map generation failed")?;
    info!(root_seed = output.root_seed, "generated map for inspection");
    Ok(Inspection::from_lines(collect(
        &output.artifacts,
        &output.warnings,
    )?))
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/artifacts", get(list_artifacts))
        .route("/artifacts/:name", get(artifact))
        .route("/warnings", get(warnings))
        .with_state(state)
}

async fn list_artifacts(State(state): State<AppState>) -> Json<Value> {
    let listing: Vec<Value> = state
        .order
        .iter()
        .map(|name| json!({"name": name, "shape": state.shapes.get(name)}))
        .collect();
    Json(Value::Array(listing))
}

async fn artifact(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    state
        .values
        .get(&name)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn warnings(State(state): State<AppState>) -> Json<Value> {
    Json(Value::Array(state.warnings.clone()))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let args = Args::parse();
    let inspection = load(&args)?;
    info!(artifacts = inspection.order.len(), "snapshot loaded");

    let app = router(Arc::new(inspection));
    let addr: SocketAddr = format!("{}:{}", args.bind, args.port)
        .parse()
        .with_context(|| format!("invalid bind address {}:{}", args.bind, args.port))?;

    info!(%addr, "starting mapgen_inspect");
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app.into_make_service())
        .await
        .context("server error")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    fn inspection() -> AppState {
        Arc::new(Inspection::from_lines(vec![
            SnapshotLine::Artifact {
                name: "hydrology.climate".to_string(),
                shape: json!({"kind": "per_tile", "fields": ["rainfall", "humidity"]}),
                value: json!({"rainfall": [10], "humidity": [20]}),
            },
            SnapshotLine::Warning {
                warning: json!({"step": "placement/inputs", "code": "start_override_rejected"}),
            },
        ]))
    }

    #[test]
    fn snapshot_and_recipe_conflict() {
        let err = Args::try_parse_from([
            "mapgen_inspect",
            "--snapshot",
            "run.ndjson",
            "--recipe",
            "recipe.json",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }

    #[tokio::test]
    async fn lists_artifacts_in_order() {
        let Json(listing) = list_artifacts(State(inspection())).await;
        assert_eq!(listing[0]["name"], "hydrology.climate");
        assert_eq!(listing[0]["shape"]["kind"], "per_tile");
    }

    #[tokio::test]
    async fn unknown_artifact_is_not_found() {
        let missing = artifact(State(inspection()), Path("ecology.nope".to_string())).await;
        assert_eq!(missing.err(), Some(StatusCode::NOT_FOUND));
        let Json(found) = artifact(State(inspection()), Path("hydrology.climate".to_string()))
            .await
            .unwrap();
        assert_eq!(found["humidity"][0], 20);
    }

    #[tokio::test]
    async fn serves_warnings() {
        let Json(listed) = warnings(State(inspection())).await;
        assert_eq!(listed[0]["code"], "start_override_rejected");
    }
}
