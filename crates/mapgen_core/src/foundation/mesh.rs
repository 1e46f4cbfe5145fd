use std::f64::consts::TAU;

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::grid::Grid;

pub(super) struct Mesh {
    pub sites: Vec<(f64, f64)>,
    pub plate_id: Vec<u16>,
}

/// Voronoi partition of the grid around `plate_count` random sites, relaxed
/// toward plate centroids `relaxation_steps` times.
pub(super) fn build(
    grid: &Grid,
    plate_count: usize,
    relaxation_steps: u32,
    rng: &mut ChaCha8Rng,
) -> Mesh {
    let width = f64::from(grid.width);
    let height = f64::from(grid.height);
    let mut sites: Vec<(f64, f64)> = (0..plate_count)
        .map(|_| (rng.gen_range(0.0..width), rng.gen_range(0.0..height)))
        .collect();

    let mut plate_id = assign(grid, &sites);
    for _ in 0..relaxation_steps {
        sites = centroids(grid, &plate_id, &sites);
        plate_id = assign(grid, &sites);
    }
    Mesh { sites, plate_id }
}

fn tile_center(grid: &Grid, index: usize) -> (f64, f64) {
    let (x, y) = grid.coords(index);
    (f64::from(x) + 0.5, f64::from(y) + 0.5)
}

fn assign(grid: &Grid, sites: &[(f64, f64)]) -> Vec<u16> {
    (0..grid.size())
        .map(|index| {
            let center = tile_center(grid, index);
            let mut best = 0usize;
            let mut best_distance = f64::INFINITY;
            for (id, &site) in sites.iter().enumerate() {
                let distance = grid.distance(center, site);
                if distance < best_distance {
                    best_distance = distance;
                    best = id;
                }
            }
            best as u16
        })
        .collect()
}

/// Plate centroids; x uses a circular mean when the grid wraps. Plates that
/// lost every tile keep their previous site.
pub(super) fn centroids(grid: &Grid, plate_id: &[u16], sites: &[(f64, f64)]) -> Vec<(f64, f64)> {
    let width = f64::from(grid.width);
    let mut sum_cos = vec![0.0; sites.len()];
    let mut sum_sin = vec![0.0; sites.len()];
    let mut sum_x = vec![0.0; sites.len()];
    let mut sum_y = vec![0.0; sites.len()];
    let mut count = vec![0u32; sites.len()];

    for (index, &id) in plate_id.iter().enumerate() {
        let id = id as usize;
        let (x, y) = tile_center(grid, index);
        let angle = TAU * x / width;
        sum_cos[id] += angle.cos();
        sum_sin[id] += angle.sin();
        sum_x[id] += x;
        sum_y[id] += y;
        count[id] += 1;
    }

    sites
        .iter()
        .enumerate()
        .map(|(id, &site)| {
            if count[id] == 0 {
                return site;
            }
            let n = f64::from(count[id]);
            let x = if grid.wrap_x {
                let angle = sum_sin[id].atan2(sum_cos[id]).rem_euclid(TAU);
                angle / TAU * width
            } else {
                sum_x[id] / n
            };
            (x, sum_y[id] / n)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn every_tile_gets_a_plate() {
        let grid = Grid::new(24, 12, true);
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mesh = build(&grid, 6, 3, &mut rng);
        assert_eq!(mesh.plate_id.len(), grid.size());
        assert!(mesh.plate_id.iter().all(|&id| id < 6));
        assert_eq!(mesh.sites.len(), 6);
    }

    #[test]
    fn wrapped_centroid_straddles_seam() {
        let grid = Grid::new(10, 1, true);
        // Plate 0 owns columns 9 and 0, which sit next to each other across the seam.
        let plate_id = vec![0, 1, 1, 1, 1, 1, 1, 1, 1, 0];
        let sites = centroids(&grid, &plate_id, &[(0.0, 0.5), (5.0, 0.5)]);
        let x = sites[0].0;
        assert!(x < 0.5 || x > 9.5, "centroid {x} should sit on the seam");
    }

    #[test]
    fn relaxation_is_deterministic() {
        let grid = Grid::new(16, 8, false);
        let a = build(&grid, 4, 4, &mut ChaCha8Rng::seed_from_u64(11));
        let b = build(&grid, 4, 4, &mut ChaCha8Rng::seed_from_u64(11));
        assert_eq!(a.plate_id, b.plate_id);
    }
}
