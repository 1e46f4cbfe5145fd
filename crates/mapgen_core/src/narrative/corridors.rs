use crate::grid::Grid;

use super::{LandCorridorConfig, SeaLaneConfig};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub(super) enum Axis {
    Column,
    Row,
}

/// A straight run of tiles along one column or row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) struct Run {
    pub axis: Axis,
    /// Column `x` or row `y` the run lies on.
    pub line: u32,
    pub start: u32,
    pub len: u32,
}

impl Run {
    pub fn tiles<'a>(&self, grid: &'a Grid) -> impl Iterator<Item = usize> + 'a {
        let run = *self;
        (run.start..run.start + run.len).map(move |t| match run.axis {
            Axis::Column => grid.index(run.line, t),
            Axis::Row => grid.index(t, run.line),
        })
    }
}

/// Longest stretch of consecutive positions where `open` holds, as
/// `(start, len)`; the earliest wins a tie.
fn longest_run(len: u32, open: impl Fn(u32) -> bool) -> (u32, u32) {
    let mut best = (0, 0);
    let mut current = 0;
    for position in 0..len {
        if open(position) {
            current += 1;
            if current > best.1 {
                best = (position + 1 - current, current);
            }
        } else {
            current = 0;
        }
    }
    best
}

/// Open water spans at least `min_width` tiles across the lane at `index`.
fn channel_is_wide(grid: &Grid, water: &[bool], axis: Axis, index: usize, min_width: u32) -> bool {
    let reach = ((min_width.saturating_sub(1)) / 2) as i32;
    (-reach..=reach).all(|t| {
        let across = match axis {
            Axis::Column => grid.offset(index, t, 0),
            Axis::Row => grid.offset(index, 0, t),
        };
        across.map_or(false, |tile| water[tile])
    })
}

fn spaced(accepted: &[Run], candidate: &Run, spacing: u32) -> bool {
    accepted
        .iter()
        .filter(|run| run.axis == candidate.axis)
        .all(|run| run.line.abs_diff(candidate.line) >= spacing.max(1))
}

/// Scan every `scan_stride`-th interior column and row for long, wide
/// open-water runs and keep the longest ones, spaced apart per axis.
pub(super) fn sea_lanes(grid: &Grid, water: &[bool], config: &SeaLaneConfig) -> Vec<Run> {
    let mut candidates = Vec::new();
    let stride = config.scan_stride.max(1) as usize;
    let scans = [
        (Axis::Column, grid.width, grid.height),
        (Axis::Row, grid.height, grid.width),
    ];
    for (axis, lines, length) in scans {
        let min_len = ((f64::from(length) * config.min_length_fraction).floor() as u32).max(1);
        for line in (1..lines.saturating_sub(1)).step_by(stride) {
            let tile = |t: u32| match axis {
                Axis::Column => grid.index(line, t),
                Axis::Row => grid.index(t, line),
            };
            let (start, len) = longest_run(length, |t| water[tile(t)]);
            if len < min_len {
                continue;
            }
            let sample = (len / 10).max(1) as usize;
            let wide = (start..start + len)
                .step_by(sample)
                .all(|t| channel_is_wide(grid, water, axis, tile(t), config.min_channel_width));
            if wide {
                candidates.push(Run {
                    axis,
                    line,
                    start,
                    len,
                });
            }
        }
    }
    candidates.sort_by(|a, b| {
        b.len
            .cmp(&a.len)
            .then(a.axis.cmp(&b.axis))
            .then(a.line.cmp(&b.line))
    });

    let mut lanes: Vec<Run> = Vec::new();
    for candidate in candidates {
        if lanes.len() >= config.max_lanes as usize {
            break;
        }
        if spaced(&lanes, &candidate, config.lane_spacing) {
            lanes.push(candidate);
        }
    }
    lanes
}

/// Rows that carry a rift shoulder seed an east-west land corridor along
/// their longest land run.
pub(super) fn land_corridors(
    grid: &Grid,
    land: &[bool],
    shoulder: &[u8],
    config: &LandCorridorConfig,
) -> Vec<Run> {
    if !config.from_rift_shoulders {
        return Vec::new();
    }
    let mut candidates: Vec<Run> = (0..grid.height)
        .filter(|&y| (0..grid.width).any(|x| shoulder[grid.index(x, y)] != 0))
        .filter_map(|y| {
            let (start, len) = longest_run(grid.width, |x| land[grid.index(x, y)]);
            (len >= config.min_run_length).then_some(Run {
                axis: Axis::Row,
                line: y,
                start,
                len,
            })
        })
        .collect();
    candidates.sort_by(|a, b| b.len.cmp(&a.len).then(a.line.cmp(&b.line)));

    let mut corridors: Vec<Run> = Vec::new();
    for candidate in candidates {
        if corridors.len() >= config.max_corridors as usize {
            break;
        }
        if spaced(&corridors, &candidate, config.spacing) {
            corridors.push(candidate);
        }
    }
    corridors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longest_run_prefers_the_earliest_tie() {
        let open = [true, true, false, true, true, false, true];
        assert_eq!(longest_run(7, |i| open[i as usize]), (0, 2));
        assert_eq!(longest_run(3, |_| false), (0, 0));
    }

    #[test]
    fn open_ocean_yields_spaced_lanes() {
        let grid = Grid::new(24, 24, false);
        let water = vec![true; grid.size()];
        let config = SeaLaneConfig::default();
        let lanes = sea_lanes(&grid, &water, &config);
        assert_eq!(lanes.len(), 3);
        for (i, a) in lanes.iter().enumerate() {
            assert_eq!(a.len, 24);
            for b in &lanes[i + 1..] {
                if a.axis == b.axis {
                    assert!(a.line.abs_diff(b.line) >= config.lane_spacing);
                }
            }
        }
    }

    #[test]
    fn narrow_straits_are_skipped() {
        let grid = Grid::new(13, 12, false);
        let water: Vec<bool> = (0..grid.size()).map(|i| grid.coords(i).0 == 7).collect();
        let config = SeaLaneConfig {
            scan_stride: 2,
            ..SeaLaneConfig::default()
        };
        assert!(sea_lanes(&grid, &water, &config).is_empty());
        let relaxed = SeaLaneConfig {
            min_channel_width: 1,
            ..config
        };
        let lanes = sea_lanes(&grid, &water, &relaxed);
        assert_eq!(lanes.len(), 1);
        assert_eq!(lanes[0].axis, Axis::Column);
        assert_eq!(lanes[0].line, 7);
    }

    #[test]
    fn shoulders_seed_land_corridors() {
        let grid = Grid::new(30, 6, false);
        let land = vec![true; grid.size()];
        let mut shoulder = vec![0u8; grid.size()];
        shoulder[grid.index(4, 2)] = 1;
        shoulder[grid.index(4, 4)] = 1;
        let corridors = land_corridors(&grid, &land, &shoulder, &LandCorridorConfig::default());
        let rows: Vec<u32> = corridors.iter().map(|run| run.line).collect();
        assert_eq!(rows, vec![2, 4]);
        assert_eq!(corridors[0].tiles(&grid).count(), 30);

        let disabled = LandCorridorConfig {
            from_rift_shoulders: false,
            ..LandCorridorConfig::default()
        };
        assert!(land_corridors(&grid, &land, &shoulder, &disabled).is_empty());
    }
}
