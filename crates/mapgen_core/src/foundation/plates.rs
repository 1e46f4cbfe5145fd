use std::collections::BTreeMap;
use std::f64::consts::TAU;

use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::grid::Grid;

use super::{BoundaryKind, CrustType, Plate, PlateBoundary};

/// Mark plates continental, in shuffled order, until their combined area
/// reaches `continental_ratio` of the grid.
pub(super) fn assign_crust(
    areas: &[u32],
    continental_ratio: f64,
    rng: &mut ChaCha8Rng,
) -> Vec<CrustType> {
    let total: u64 = areas.iter().map(|&a| u64::from(a)).sum();
    let target = continental_ratio * total as f64;
    let mut order: Vec<usize> = (0..areas.len()).collect();
    order.shuffle(rng);

    let mut crust = vec![CrustType::Oceanic; areas.len()];
    let mut accumulated = 0u64;
    for id in order {
        if (accumulated as f64) < target && areas[id] > 0 {
            crust[id] = CrustType::Continental;
            accumulated += u64::from(areas[id]);
        }
    }
    crust
}

pub(super) fn assign_motion(
    count: usize,
    min_speed: f64,
    max_speed: f64,
    rng: &mut ChaCha8Rng,
) -> Vec<[f64; 2]> {
    (0..count)
        .map(|_| {
            let angle = rng.gen_range(0.0..TAU);
            let speed = if max_speed > min_speed {
                rng.gen_range(min_speed..max_speed)
            } else {
                min_speed
            };
            [angle.cos() * speed, angle.sin() * speed]
        })
        .collect()
}

/// Shared edge lengths between plate pairs, keyed `(low id, high id)`.
pub(super) fn adjacency(grid: &Grid, plate_id: &[u16]) -> BTreeMap<(u16, u16), u32> {
    let mut edges = BTreeMap::new();
    for index in 0..grid.size() {
        for (dx, dy) in [(1, 0), (0, 1)] {
            let Some(neighbor) = grid.offset(index, dx, dy) else {
                continue;
            };
            let (a, b) = (plate_id[index], plate_id[neighbor]);
            if a != b {
                *edges.entry((a.min(b), a.max(b))).or_insert(0) += 1;
            }
        }
    }
    edges
}

/// Classify each plate pair from the relative motion projected on the
/// centroid-to-centroid axis. Positive closing speed means convergence.
pub(super) fn classify(
    grid: &Grid,
    plates: &[Plate],
    edges: &BTreeMap<(u16, u16), u32>,
    convergent_threshold: f64,
    divergent_threshold: f64,
) -> Vec<PlateBoundary> {
    edges
        .iter()
        .map(|(&(a, b), &length)| {
            let pa = &plates[a as usize];
            let pb = &plates[b as usize];
            let dx = grid.dx(pa.centroid[0], pb.centroid[0]);
            let dy = pb.centroid[1] - pa.centroid[1];
            let norm = (dx * dx + dy * dy).sqrt();
            let (nx, ny) = if norm > f64::EPSILON {
                (dx / norm, dy / norm)
            } else {
                (1.0, 0.0)
            };
            let rel = [
                pa.velocity[0] - pb.velocity[0],
                pa.velocity[1] - pb.velocity[1],
            ];
            let closing_speed = rel[0] * nx + rel[1] * ny;
            let magnitude = (rel[0] * rel[0] + rel[1] * rel[1]).sqrt();
            let kind = if closing_speed > convergent_threshold {
                BoundaryKind::Convergent
            } else if closing_speed < -divergent_threshold {
                BoundaryKind::Divergent
            } else {
                BoundaryKind::Transform
            };
            PlateBoundary {
                a,
                b,
                kind,
                closing_speed,
                magnitude,
                length,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn plate(id: u16, x: f64, velocity: [f64; 2]) -> Plate {
        Plate {
            id,
            crust: CrustType::Oceanic,
            velocity,
            area: 4,
            centroid: [x, 0.5],
        }
    }

    #[test]
    fn crust_ratio_is_approached_from_below() {
        let areas = vec![10, 10, 10, 10, 10];
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let crust = assign_crust(&areas, 0.4, &mut rng);
        let continental = crust
            .iter()
            .filter(|&&c| c == CrustType::Continental)
            .count();
        assert_eq!(continental, 2);
    }

    #[test]
    fn head_on_plates_converge() {
        let grid = Grid::new(8, 1, false);
        let plates = vec![plate(0, 1.5, [1.0, 0.0]), plate(1, 5.5, [-1.0, 0.0])];
        let mut edges = BTreeMap::new();
        edges.insert((0, 1), 1);
        let boundaries = classify(&grid, &plates, &edges, 0.15, 0.15);
        assert_eq!(boundaries[0].kind, BoundaryKind::Convergent);
        assert!((boundaries[0].magnitude - 2.0).abs() < 1e-9);
    }

    #[test]
    fn separating_plates_diverge_and_sliding_plates_transform() {
        let grid = Grid::new(8, 1, false);
        let mut edges = BTreeMap::new();
        edges.insert((0, 1), 1);
        let apart = vec![plate(0, 1.5, [-1.0, 0.0]), plate(1, 5.5, [1.0, 0.0])];
        assert_eq!(
            classify(&grid, &apart, &edges, 0.15, 0.15)[0].kind,
            BoundaryKind::Divergent
        );
        let sliding = vec![plate(0, 1.5, [0.0, 1.0]), plate(1, 5.5, [0.0, -1.0])];
        assert_eq!(
            classify(&grid, &sliding, &edges, 0.15, 0.15)[0].kind,
            BoundaryKind::Transform
        );
    }

    #[test]
    fn adjacency_counts_shared_edges_once() {
        let grid = Grid::new(4, 2, false);
        let plate_id = vec![0, 0, 1, 1, 0, 0, 1, 1];
        let edges = adjacency(&grid, &plate_id);
        assert_eq!(edges.get(&(0, 1)), Some(&2));
    }
}
