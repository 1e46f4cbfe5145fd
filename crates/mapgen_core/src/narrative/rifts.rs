use crate::grid::Grid;

use super::RiftConfig;

#[derive(Debug)]
pub(super) struct Rifts {
    pub lines: usize,
    pub line: Vec<u8>,
    pub shoulder: Vec<u8>,
}

/// Trace rift valleys across land by following the rift-potential ridge
/// from the strongest seeds, then mark the land flanking each line.
pub(super) fn trace(grid: &Grid, land: &[bool], rift: &[f32], config: &RiftConfig) -> Rifts {
    let threshold = config.min_rift as f32;
    let eligible = |index: usize| land[index] && rift[index] >= threshold;

    let mut seeds: Vec<usize> = (0..grid.size()).filter(|&i| eligible(i)).collect();
    seeds.sort_by(|&a, &b| rift[b].total_cmp(&rift[a]).then(a.cmp(&b)));

    let mut line = vec![0u8; grid.size()];
    let mut lines = 0;
    for seed in seeds {
        if lines >= config.max_rifts as usize {
            break;
        }
        if line[seed] != 0 || grid.neighbors8(seed).any(|n| line[n] != 0) {
            continue;
        }
        line[seed] = 1;
        let mut at = seed;
        for _ in 1..config.steps {
            let next = grid
                .neighbors8(at)
                .filter(|&n| eligible(n) && line[n] == 0)
                .max_by(|&a, &b| rift[a].total_cmp(&rift[b]).then(b.cmp(&a)));
            match next {
                Some(next) => {
                    line[next] = 1;
                    at = next;
                }
                None => break,
            }
        }
        lines += 1;
    }

    let reach = grid.distance_field(|i| line[i] != 0, config.shoulder_width);
    let shoulder = (0..grid.size())
        .map(|i| {
            let flank = reach[i] > 0 && reach[i] <= config.shoulder_width;
            u8::from(land[i] && flank)
        })
        .collect();

    Rifts {
        lines,
        line,
        shoulder,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valley(grid: &Grid) -> Vec<f32> {
        (0..grid.size())
            .map(|i| if grid.coords(i).1 == 3 { 0.9 } else { 0.1 })
            .collect()
    }

    #[test]
    fn line_follows_the_ridge_with_shoulders_either_side() {
        let grid = Grid::new(10, 7, false);
        let land = vec![true; grid.size()];
        let rifts = trace(&grid, &land, &valley(&grid), &RiftConfig::default());
        assert_eq!(rifts.lines, 1);
        for x in 0..10 {
            assert_eq!(rifts.line[grid.index(x, 3)], 1);
            assert_eq!(rifts.shoulder[grid.index(x, 2)], 1);
            assert_eq!(rifts.shoulder[grid.index(x, 4)], 1);
            assert_eq!(rifts.shoulder[grid.index(x, 0)], 0);
        }
    }

    #[test]
    fn rifts_stay_on_land() {
        let grid = Grid::new(10, 7, false);
        let land: Vec<bool> = (0..grid.size()).map(|i| grid.coords(i).0 < 5).collect();
        let rifts = trace(&grid, &land, &valley(&grid), &RiftConfig::default());
        for index in 0..grid.size() {
            if !land[index] {
                assert_eq!(rifts.line[index], 0);
                assert_eq!(rifts.shoulder[index], 0);
            }
        }
    }

    #[test]
    fn weak_potential_traces_nothing() {
        let grid = Grid::new(6, 6, false);
        let land = vec![true; grid.size()];
        let rift = vec![0.2; grid.size()];
        let rifts = trace(&grid, &land, &rift, &RiftConfig::default());
        assert_eq!(rifts.lines, 0);
        assert!(rifts.shoulder.iter().all(|&s| s == 0));
    }
}
