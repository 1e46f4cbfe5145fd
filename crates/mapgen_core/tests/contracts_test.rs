use proptest::prelude::*;

use mapgen_core::artifacts::ArtifactStore;
use mapgen_core::error::MapgenError;
use mapgen_core::fixed::clamp_i8;
use mapgen_core::grid::Grid;
use mapgen_core::hydrology::{summarize, ClimateField, PhaseResult, Seasonality};

fn phase(rainfall: u8, humidity: u8, wind: i8) -> PhaseResult {
    PhaseResult {
        rainfall: vec![rainfall],
        humidity: vec![humidity],
        wind_u: vec![wind],
        wind_v: vec![wind.saturating_neg()],
        current_u: vec![0],
        current_v: vec![0],
    }
}

#[test]
fn short_per_tile_arrays_fail_publication() {
    let grid = Grid::new(3, 2, false);
    let mut store = ArtifactStore::new(grid);
    store.declare::<ClimateField>();
    let err = store
        .publish(ClimateField {
            rainfall: vec![10; 5],
            humidity: vec![10; 6],
        })
        .unwrap_err();
    match err {
        MapgenError::Contract { artifact, issues } => {
            assert_eq!(artifact, "hydrology.climate");
            assert_eq!(issues.len(), 1);
            assert!(issues[0].contains("rainfall"));
            assert!(issues[0].contains("expected 6"));
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(!store.is_published("hydrology.climate"));
}

#[test]
fn every_violation_is_reported() {
    let mut store = ArtifactStore::new(Grid::new(2, 2, false));
    store.declare::<Seasonality>();
    let err = store
        .publish(Seasonality {
            mode_count: 3,
            axial_tilt_deg: f64::NAN,
            rainfall_amplitude: vec![0; 4],
            humidity_amplitude: vec![0; 7],
        })
        .unwrap_err();
    match err {
        MapgenError::Contract { issues, .. } => assert_eq!(issues.len(), 3),
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn amplitude_is_half_range() {
    let summary = summarize(&[phase(40, 10, 0), phase(120, 90, 0), phase(90, 30, 0)], 1);
    assert_eq!(summary.rainfall_amplitude, vec![40]);
    assert_eq!(summary.humidity_amplitude, vec![40]);
    assert_eq!(summary.rainfall, vec![83]);
}

#[test]
fn mean_wind_clamps_instead_of_wrapping() {
    assert_eq!(clamp_i8(300.0), 127);
    assert_eq!(clamp_i8(-300.0), -128);
    let summary = summarize(&[phase(0, 0, 127), phase(0, 0, 127)], 1);
    assert_eq!(summary.wind_u, vec![127]);
    assert_eq!(summary.wind_v, vec![-127]);
}

#[test]
fn extreme_westward_wind_averages_in_range() {
    let summary = summarize(&[phase(0, 0, i8::MIN), phase(0, 0, i8::MIN)], 1);
    assert_eq!(summary.wind_u, vec![i8::MIN]);
    assert_eq!(summary.wind_v, vec![127]);

    let forward = summarize(&[phase(10, 0, i8::MIN), phase(30, 0, 5)], 1);
    let backward = summarize(&[phase(30, 0, 5), phase(10, 0, i8::MIN)], 1);
    assert_eq!(forward, backward);
}

proptest! {
    #[test]
    fn amplitude_matches_rounded_half_range(
        values in prop::collection::vec((any::<u8>(), any::<u8>()), 1..6)
    ) {
        let phases: Vec<PhaseResult> =
            values.iter().map(|&(r, h)| phase(r, h, 0)).collect();
        let summary = summarize(&phases, 1);

        let max = values.iter().map(|v| v.0).max().unwrap();
        let min = values.iter().map(|v| v.0).min().unwrap();
        let expected = (f64::from(max - min) / 2.0).round() as u8;
        prop_assert_eq!(summary.rainfall_amplitude[0], expected);
    }

    #[test]
    fn summary_ignores_phase_order(
        values in prop::collection::vec((any::<u8>(), any::<u8>(), any::<i8>()), 1..6)
    ) {
        let phases: Vec<PhaseResult> =
            values.iter().map(|&(r, h, w)| phase(r, h, w)).collect();
        let mut reversed = phases.clone();
        reversed.reverse();
        prop_assert_eq!(summarize(&phases, 1), summarize(&reversed, 1));
    }

    #[test]
    fn i8_quantization_stays_in_domain(value in -1.0e6f64..1.0e6) {
        let quantized = clamp_i8(value);
        let expected = value.round().clamp(-128.0, 127.0);
        prop_assert_eq!(f64::from(quantized), expected);
    }
}
