use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::grid::Grid;

use super::HotspotConfig;

const HEADINGS: [(i32, i32); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

fn manhattan(grid: &Grid, a: usize, b: usize) -> u32 {
    let (ax, ay) = grid.coords(a);
    let (bx, by) = grid.coords(b);
    let dx = grid.dx(f64::from(ax), f64::from(bx)).abs() as u32;
    dx + ay.abs_diff(by)
}

/// Seed hotspot trails in open ocean and march each along a fixed heading.
/// Every trail point stays at least `min_land_distance` tiles from land; a
/// trail stops early at the grid edge or when it nears a coast.
pub(super) fn seed_trails(
    grid: &Grid,
    land: &[bool],
    config: &HotspotConfig,
    rng: &mut ChaCha8Rng,
) -> Vec<Vec<usize>> {
    let reach = grid.distance_field(|i| land[i], config.min_land_distance);
    let open = |index: usize| !land[index] && reach[index] >= config.min_land_distance;

    let mut candidates: Vec<usize> = (0..grid.size()).filter(|&i| open(i)).collect();
    candidates.shuffle(rng);

    let mut seeds: Vec<usize> = Vec::new();
    for candidate in candidates {
        if seeds.len() >= config.max_trails as usize {
            break;
        }
        if seeds
            .iter()
            .all(|&seed| manhattan(grid, seed, candidate) >= config.min_separation)
        {
            seeds.push(candidate);
        }
    }

    seeds
        .into_iter()
        .map(|seed| {
            let (dx, dy) = HEADINGS[rng.gen_range(0..HEADINGS.len())];
            let mut trail = vec![seed];
            let mut at = seed;
            'march: for _ in 0..config.steps {
                for _ in 0..config.step_length {
                    match grid.offset(at, dx, dy) {
                        Some(next) if open(next) => at = next,
                        _ => break 'march,
                    }
                }
                trail.push(at);
            }
            trail
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn trails_keep_clear_of_land() {
        let grid = Grid::new(40, 30, true);
        let land: Vec<bool> = (0..grid.size())
            .map(|i| {
                let (x, y) = grid.coords(i);
                (16..24).contains(&x) && (10..20).contains(&y)
            })
            .collect();
        let config = HotspotConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let trails = seed_trails(&grid, &land, &config, &mut rng);
        assert!(!trails.is_empty());
        assert!(trails.len() <= config.max_trails as usize);

        let reach = grid.distance_field(|i| land[i], config.min_land_distance);
        for point in trails.iter().flatten() {
            assert!(!land[*point]);
            assert!(reach[*point] >= config.min_land_distance);
        }
    }

    #[test]
    fn seeds_respect_separation() {
        let grid = Grid::new(30, 30, false);
        let land = vec![false; grid.size()];
        let config = HotspotConfig {
            min_separation: 10,
            ..HotspotConfig::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let trails = seed_trails(&grid, &land, &config, &mut rng);
        for (i, a) in trails.iter().enumerate() {
            for b in &trails[i + 1..] {
                assert!(manhattan(&grid, a[0], b[0]) >= 10);
            }
        }
    }

    #[test]
    fn landlocked_sea_has_no_sites() {
        let grid = Grid::new(6, 6, false);
        let land: Vec<bool> = (0..grid.size()).map(|i| i % 2 == 0).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let trails = seed_trails(&grid, &land, &HotspotConfig::default(), &mut rng);
        assert!(trails.is_empty());
    }

    #[test]
    fn same_seed_same_trails() {
        let grid = Grid::new(30, 20, true);
        let land = vec![false; grid.size()];
        let config = HotspotConfig::default();
        let a = seed_trails(&grid, &land, &config, &mut ChaCha8Rng::seed_from_u64(9));
        let b = seed_trails(&grid, &land, &config, &mut ChaCha8Rng::seed_from_u64(9));
        assert_eq!(a, b);
    }
}
