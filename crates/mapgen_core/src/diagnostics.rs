use serde::Serialize;
use serde_with::skip_serializing_none;

/// Degenerate-input outcomes that do not abort the run.
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Code {
    WaterCoverageOffTarget,
    IslandCoverageBelowTarget,
    NoHotspotSites,
    NoResourceCandidates,
    FloodplainBoundsClamped,
    StartOverrideRejected,
}

/// Structured warning attached to the run output.
#[skip_serializing_none]
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct Warning {
    pub step: &'static str,
    pub code: Code,
    pub note: Option<String>,
}

impl Warning {
    pub fn new(step: &'static str, code: Code, note: Option<String>) -> Self {
        Self { step, code, note }
    }
}

/// Ordered sink for warnings raised while a run is in flight.
#[derive(Clone, Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    pub fn warn(&mut self, step: &'static str, code: Code, note: impl Into<String>) {
        let note = note.into();
        tracing::warn!(step, code = ?code, %note, "degenerate input");
        self.warnings.push(Warning::new(step, code, Some(note)));
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warnings_keep_insertion_order() {
        let mut diagnostics = Diagnostics::default();
        diagnostics.warn("morphology/landmass", Code::WaterCoverageOffTarget, "71% vs 62%");
        diagnostics.warn("morphology/islands", Code::IslandCoverageBelowTarget, "0.1 vs 0.3");
        let codes: Vec<Code> = diagnostics.warnings().iter().map(|w| w.code).collect();
        assert_eq!(
            codes,
            vec![Code::WaterCoverageOffTarget, Code::IslandCoverageBelowTarget]
        );
    }

    #[test]
    fn note_is_omitted_when_absent() {
        let warning = Warning::new("placement/inputs", Code::StartOverrideRejected, None);
        let json = serde_json::to_value(&warning).unwrap();
        assert!(json.get("note").is_none());
        assert_eq!(json["code"], "start_override_rejected");
    }
}
