use std::collections::BTreeMap;

use crate::grid::Grid;

use super::{BoundaryKind, CrustType, Plate, PlateBoundary, UpliftConfig, UpliftField};

pub(super) const BEYOND_RADIUS: u8 = u8::MAX;

/// Project boundary influence onto tiles.
///
/// Every tile within `boundary_radius` rings of a plate boundary is owned by
/// the nearest boundary. When two boundaries are equally near, the one with
/// the larger relative-motion magnitude wins.
pub(super) fn project(
    grid: &Grid,
    plate_id: &[u16],
    plates: &[Plate],
    boundaries: &[PlateBoundary],
    config: &UpliftConfig,
) -> UpliftField {
    let size = grid.size();
    let lookup: BTreeMap<(u16, u16), usize> = boundaries
        .iter()
        .enumerate()
        .map(|(i, b)| ((b.a, b.b), i))
        .collect();
    let magnitude = |edge: usize| boundaries[edge].magnitude;

    let mut distance = vec![u32::MAX; size];
    let mut owner = vec![usize::MAX; size];
    let mut frontier = Vec::new();

    for index in 0..size {
        let here = plate_id[index];
        let mut best: Option<usize> = None;
        for neighbor in grid.neighbors4(index) {
            let there = plate_id[neighbor];
            if there == here {
                continue;
            }
            if let Some(&edge) = lookup.get(&(here.min(there), here.max(there))) {
                best = match best {
                    Some(current) if magnitude(current) >= magnitude(edge) => Some(current),
                    _ => Some(edge),
                };
            }
        }
        if let Some(edge) = best {
            distance[index] = 0;
            owner[index] = edge;
            frontier.push(index);
        }
    }

    for ring in 1..=config.boundary_radius {
        let mut next: BTreeMap<usize, usize> = BTreeMap::new();
        for &index in &frontier {
            let candidate = owner[index];
            for neighbor in grid.neighbors8(index) {
                if distance[neighbor] != u32::MAX {
                    continue;
                }
                next.entry(neighbor)
                    .and_modify(|current| {
                        if magnitude(candidate) > magnitude(*current) {
                            *current = candidate;
                        }
                    })
                    .or_insert(candidate);
            }
        }
        if next.is_empty() {
            break;
        }
        frontier = next.keys().copied().collect();
        for (index, edge) in next {
            distance[index] = ring;
            owner[index] = edge;
        }
    }

    let max_magnitude = boundaries
        .iter()
        .map(|b| b.magnitude)
        .fold(0.0f64, f64::max)
        .max(f64::EPSILON);
    let reach = f64::from(config.boundary_radius) + 1.0;

    let mut field = UpliftField {
        uplift: vec![0.0; size],
        rift: vec![0.0; size],
        closeness: vec![0.0; size],
        boundary_kind: vec![0; size],
        boundary_distance: vec![BEYOND_RADIUS; size],
    };

    for index in 0..size {
        let mut uplift = match plates[plate_id[index] as usize].crust {
            CrustType::Continental => config.continental_base,
            CrustType::Oceanic => 0.0,
        };
        let mut rift = 0.0f64;
        if distance[index] != u32::MAX {
            let boundary = &boundaries[owner[index]];
            let closeness = (1.0 - f64::from(distance[index]) / reach)
                .max(0.0)
                .powf(config.falloff_exponent);
            let motion = 0.5 + 0.5 * (boundary.magnitude / max_magnitude).clamp(0.0, 1.0);
            match boundary.kind {
                BoundaryKind::Convergent => uplift += config.convergent_weight * closeness * motion,
                BoundaryKind::Transform => uplift += config.transform_weight * closeness * motion,
                BoundaryKind::Divergent => rift += config.divergent_weight * closeness * motion,
            }
            field.closeness[index] = closeness as f32;
            field.boundary_kind[index] = boundary.kind.code();
            field.boundary_distance[index] = distance[index].min(u32::from(BEYOND_RADIUS - 1)) as u8;
        }
        field.uplift[index] = uplift.clamp(0.0, 1.0) as f32;
        field.rift[index] = rift.clamp(0.0, 1.0) as f32;
    }
    field
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plate(id: u16, x: f64) -> Plate {
        Plate {
            id,
            crust: CrustType::Oceanic,
            velocity: [0.0, 0.0],
            area: 1,
            centroid: [x, 0.5],
        }
    }

    fn boundary(a: u16, b: u16, kind: BoundaryKind, magnitude: f64) -> PlateBoundary {
        PlateBoundary {
            a,
            b,
            kind,
            closing_speed: 0.0,
            magnitude,
            length: 1,
        }
    }

    fn config() -> UpliftConfig {
        UpliftConfig {
            boundary_radius: 3,
            ..UpliftConfig::default()
        }
    }

    #[test]
    fn equidistant_tile_takes_stronger_boundary() {
        let grid = Grid::new(7, 1, false);
        let plate_id = vec![0, 1, 1, 1, 1, 1, 2];
        let plates = vec![plate(0, 0.5), plate(1, 3.5), plate(2, 6.5)];
        let boundaries = vec![
            boundary(0, 1, BoundaryKind::Transform, 0.2),
            boundary(1, 2, BoundaryKind::Convergent, 1.5),
        ];
        let field = project(&grid, &plate_id, &plates, &boundaries, &config());
        assert_eq!(field.boundary_distance[3], 2);
        assert_eq!(field.boundary_kind[3], BoundaryKind::Convergent.code());
    }

    #[test]
    fn closeness_decays_with_distance() {
        let grid = Grid::new(9, 1, false);
        let plate_id = vec![0, 1, 1, 1, 1, 1, 1, 1, 1];
        let plates = vec![plate(0, 0.5), plate(1, 5.0)];
        let boundaries = vec![boundary(0, 1, BoundaryKind::Convergent, 1.0)];
        let field = project(&grid, &plate_id, &plates, &boundaries, &config());
        assert!(field.closeness[1] > field.closeness[2]);
        assert!(field.closeness[2] > field.closeness[3]);
        assert_eq!(field.boundary_distance[8], BEYOND_RADIUS);
        assert_eq!(field.uplift[8], 0.0);
    }

    #[test]
    fn divergent_boundaries_feed_rift_not_uplift() {
        let grid = Grid::new(4, 1, false);
        let plate_id = vec![0, 0, 1, 1];
        let plates = vec![plate(0, 1.0), plate(1, 3.0)];
        let boundaries = vec![boundary(0, 1, BoundaryKind::Divergent, 1.0)];
        let field = project(&grid, &plate_id, &plates, &boundaries, &config());
        assert!(field.rift[1] > 0.0);
        assert_eq!(field.uplift[1], 0.0);
    }
}
