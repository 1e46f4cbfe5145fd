use std::collections::VecDeque;

use crate::foundation::UpliftField;
use crate::grid::Grid;

use super::MarginsConfig;

#[derive(Debug, Default)]
pub(super) struct Margins {
    pub active: Vec<usize>,
    pub passive: Vec<usize>,
    pub segments: usize,
}

/// Land tiles with at least one water neighbour.
pub(super) fn coastal_land(grid: &Grid, land: &[bool]) -> Vec<bool> {
    (0..grid.size())
        .map(|i| land[i] && grid.neighbors4(i).any(|n| !land[n]))
        .collect()
}

/// 8-connected runs of coastal land, ordered by their lowest tile index.
pub(super) fn segments(grid: &Grid, coastal: &[bool]) -> Vec<Vec<usize>> {
    let mut seen = vec![false; grid.size()];
    let mut segments = Vec::new();
    for start in 0..grid.size() {
        if !coastal[start] || seen[start] {
            continue;
        }
        seen[start] = true;
        let mut segment = Vec::new();
        let mut queue = VecDeque::from([start]);
        while let Some(index) = queue.pop_front() {
            segment.push(index);
            for neighbor in grid.neighbors8(index) {
                if coastal[neighbor] && !seen[neighbor] {
                    seen[neighbor] = true;
                    queue.push_back(neighbor);
                }
            }
        }
        segment.sort_unstable();
        segments.push(segment);
    }
    segments
}

/// Active margins are the coastal tiles closest to convergent boundaries;
/// passive margins are the coastal tiles farthest from any boundary.
pub(super) fn classify(
    grid: &Grid,
    land: &[bool],
    uplift: &UpliftField,
    config: &MarginsConfig,
) -> Margins {
    let coastal = coastal_land(grid, land);
    let segments = segments(grid, &coastal);
    let mut eligible: Vec<usize> = segments
        .iter()
        .filter(|segment| segment.len() >= config.min_segment_length as usize)
        .flatten()
        .copied()
        .collect();
    eligible.sort_unstable();

    let quota = |fraction: f64| (eligible.len() as f64 * fraction).round() as usize;
    let closeness = &uplift.closeness;

    let mut active: Vec<usize> = eligible
        .iter()
        .copied()
        .filter(|&i| uplift.is_convergent(i))
        .collect();
    active.sort_by(|&a, &b| closeness[b].total_cmp(&closeness[a]).then(a.cmp(&b)));
    active.truncate(quota(config.active_fraction));

    let mut passive: Vec<usize> = eligible
        .iter()
        .copied()
        .filter(|&i| !uplift.is_convergent(i))
        .collect();
    passive.sort_by(|&a, &b| closeness[a].total_cmp(&closeness[b]).then(a.cmp(&b)));
    passive.truncate(quota(config.passive_fraction));

    Margins {
        active,
        passive,
        segments: segments.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::BoundaryKind;

    /// Western half land, eastern half water, convergent boundary on the
    /// upper rows of the coast.
    fn setup() -> (Grid, Vec<bool>, UpliftField) {
        let grid = Grid::new(8, 8, false);
        let land: Vec<bool> = (0..grid.size()).map(|i| grid.coords(i).0 < 4).collect();
        let mut uplift = UpliftField {
            uplift: vec![0.0; grid.size()],
            rift: vec![0.0; grid.size()],
            closeness: vec![0.0; grid.size()],
            boundary_kind: vec![0; grid.size()],
            boundary_distance: vec![255; grid.size()],
        };
        for y in 0..3 {
            let index = grid.index(3, y);
            uplift.boundary_kind[index] = BoundaryKind::Convergent.code();
            uplift.closeness[index] = 1.0 - 0.1 * y as f32;
        }
        (grid, land, uplift)
    }

    #[test]
    fn coast_is_a_single_segment() {
        let (grid, land, _) = setup();
        let coastal = coastal_land(&grid, &land);
        let segments = segments(&grid, &coastal);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].len(), 8);
    }

    #[test]
    fn convergent_coast_is_active_and_quiet_coast_is_passive() {
        let (grid, land, uplift) = setup();
        let config = MarginsConfig {
            min_segment_length: 4,
            ..MarginsConfig::default()
        };
        let margins = classify(&grid, &land, &uplift, &config);
        assert_eq!(margins.active, vec![grid.index(3, 0), grid.index(3, 1)]);
        assert_eq!(margins.passive.len(), 2);
        assert!(margins.passive.iter().all(|&i| !uplift.is_convergent(i)));
    }

    #[test]
    fn short_segments_are_ignored() {
        let (grid, land, uplift) = setup();
        let margins = classify(&grid, &land, &uplift, &MarginsConfig::default());
        assert!(margins.active.is_empty());
        assert!(margins.passive.is_empty());
        assert_eq!(margins.segments, 1);
    }
}
