//! NDJSON artifact snapshots: one line per published artifact, in
//! publication order, followed by one line per warning.

use std::io::{BufRead, Write};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::artifacts::ArtifactStore;
use crate::diagnostics::Warning;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SnapshotLine {
    Artifact {
        name: String,
        shape: Value,
        value: Value,
    },
    Warning {
        warning: Value,
    },
}

impl SnapshotLine {
    pub fn to_ndjson(&self) -> serde_json::Result<String> {
        let mut json = serde_json::to_string(self)?;
        json.push('\n');
        Ok(json)
    }
}

/// Snapshot lines for every published artifact and every warning.
pub fn collect(store: &ArtifactStore, warnings: &[Warning]) -> Result<Vec<SnapshotLine>> {
    let mut lines = Vec::with_capacity(store.names().len() + warnings.len());
    for &name in store.names() {
        let value = store
            .snapshot(name)
            .ok_or_else(|| anyhow!("artifact {name} vanished from the store"))?
            .with_context(|| format!("failed to serialize artifact {name}"))?;
        let shape = serde_json::to_value(store.shape(name))?;
        lines.push(SnapshotLine::Artifact {
            name: name.to_string(),
            shape,
            value,
        });
    }
    for warning in warnings {
        lines.push(SnapshotLine::Warning {
            warning: serde_json::to_value(warning)?,
        });
    }
    Ok(lines)
}

/// Write the snapshot as NDJSON. Returns the number of lines written.
pub fn write_ndjson<W: Write>(
    store: &ArtifactStore,
    warnings: &[Warning],
    mut writer: W,
) -> Result<usize> {
    let lines = collect(store, warnings)?;
    for line in &lines {
        writer.write_all(line.to_ndjson()?.as_bytes())?;
    }
    writer.flush()?;
    Ok(lines.len())
}

pub fn read_ndjson<R: BufRead>(reader: R) -> Result<Vec<SnapshotLine>> {
    reader
        .lines()
        .enumerate()
        .filter(|(_, line)| line.as_ref().map_or(true, |l| !l.trim().is_empty()))
        .map(|(number, line)| {
            let line = line.with_context(|| format!("failed to read snapshot line {}", number + 1))?;
            serde_json::from_str(&line)
                .with_context(|| format!("invalid snapshot line {}", number + 1))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::{check_len, Artifact, Shape};
    use crate::diagnostics::Code;
    use crate::grid::Grid;

    #[derive(Serialize)]
    struct Depth {
        depth: Vec<u8>,
    }

    impl Artifact for Depth {
        const NAME: &'static str = "test.depth";
        const SHAPE: Shape = Shape::PerTile(&["depth"]);

        fn validate(&self, grid: &Grid) -> Vec<String> {
            let mut issues = Vec::new();
            check_len(&mut issues, "depth", self.depth.len(), grid);
            issues
        }
    }

    fn store() -> ArtifactStore {
        let mut store = ArtifactStore::new(Grid::new(2, 1, false));
        store.declare::<Depth>();
        store.publish(Depth { depth: vec![3, 4] }).unwrap();
        store
    }

    #[test]
    fn lines_read_back() {
        let warnings = vec![Warning::new(
            "placement/inputs",
            Code::FloodplainBoundsClamped,
            Some("max 10 -> 4".to_string()),
        )];
        let mut buffer = Vec::new();
        let written = write_ndjson(&store(), &warnings, &mut buffer).unwrap();
        assert_eq!(written, 2);

        let text = String::from_utf8(buffer.clone()).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.ends_with('\n'));

        let lines = read_ndjson(buffer.as_slice()).unwrap();
        match &lines[0] {
            SnapshotLine::Artifact { name, shape, value } => {
                assert_eq!(name, "test.depth");
                assert_eq!(shape["kind"], "per_tile");
                assert_eq!(value["depth"][1], 4);
            }
            other => panic!("unexpected line {other:?}"),
        }
        match &lines[1] {
            SnapshotLine::Warning { warning } => {
                assert_eq!(warning["code"], "floodplain_bounds_clamped");
            }
            other => panic!("unexpected line {other:?}"),
        }
    }

    #[test]
    fn blank_lines_are_skipped() {
        let text = "\n{\"kind\":\"warning\",\"warning\":{}}\n\n";
        assert_eq!(read_ndjson(text.as_bytes()).unwrap().len(), 1);
    }

    #[test]
    fn garbage_names_line_number() {
        let text = "{\"kind\":\"warning\",\"warning\":{}}\nnot json\n";
        let err = read_ndjson(text.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}
