use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Rectangular tile grid. Per-tile arrays are flat and indexed `y * width + x`.
/// Columns wrap east/west when `wrap_x` is set; rows never wrap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    pub width: u32,
    pub height: u32,
    pub wrap_x: bool,
}

const OFFSETS_4: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
const OFFSETS_8: [(i32, i32); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];

impl Grid {
    pub fn new(width: u32, height: u32, wrap_x: bool) -> Self {
        Self {
            width,
            height,
            wrap_x,
        }
    }

    pub fn size(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    pub fn coords(&self, index: usize) -> (u32, u32) {
        let width = self.width as usize;
        ((index % width) as u32, (index / width) as u32)
    }

    /// Tile at `(x + dx, y + dy)`, honouring horizontal wrap.
    pub fn offset(&self, index: usize, dx: i32, dy: i32) -> Option<usize> {
        let (x, y) = self.coords(index);
        let ny = y as i64 + i64::from(dy);
        if ny < 0 || ny >= i64::from(self.height) {
            return None;
        }
        let mut nx = x as i64 + i64::from(dx);
        let width = i64::from(self.width);
        if self.wrap_x {
            nx = nx.rem_euclid(width);
        } else if nx < 0 || nx >= width {
            return None;
        }
        Some(self.index(nx as u32, ny as u32))
    }

    pub fn neighbors4(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        OFFSETS_4
            .iter()
            .filter_map(move |&(dx, dy)| self.offset(index, dx, dy))
    }

    pub fn neighbors8(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        OFFSETS_8
            .iter()
            .filter_map(move |&(dx, dy)| self.offset(index, dx, dy))
    }

    /// Signed horizontal separation from `x0` to `x1`, shortest way round when wrapping.
    pub fn dx(&self, x0: f64, x1: f64) -> f64 {
        let mut dx = x1 - x0;
        if self.wrap_x {
            let width = f64::from(self.width);
            if dx > width * 0.5 {
                dx -= width;
            } else if dx < -width * 0.5 {
                dx += width;
            }
        }
        dx
    }

    pub fn distance(&self, a: (f64, f64), b: (f64, f64)) -> f64 {
        let dx = self.dx(a.0, b.0);
        let dy = b.1 - a.1;
        (dx * dx + dy * dy).sqrt()
    }

    /// Chebyshev distance between two tiles, wrap aware.
    pub fn chebyshev(&self, a: usize, b: usize) -> u32 {
        let (ax, ay) = self.coords(a);
        let (bx, by) = self.coords(b);
        let dx = self.dx(f64::from(ax), f64::from(bx)).abs() as u32;
        dx.max(ay.abs_diff(by))
    }

    /// Breadth-first ring distance from every tile where `is_source` holds,
    /// capped at `limit`; tiles farther away read `u32::MAX`.
    pub fn distance_field<F>(&self, is_source: F, limit: u32) -> Vec<u32>
    where
        F: Fn(usize) -> bool,
    {
        let mut distance = vec![u32::MAX; self.size()];
        let mut queue = VecDeque::new();
        for (index, slot) in distance.iter_mut().enumerate() {
            if is_source(index) {
                *slot = 0;
                queue.push_back(index);
            }
        }
        while let Some(index) = queue.pop_front() {
            let next = distance[index] + 1;
            if next > limit {
                continue;
            }
            for neighbor in self.neighbors8(index) {
                if distance[neighbor] == u32::MAX {
                    distance[neighbor] = next;
                    queue.push_back(neighbor);
                }
            }
        }
        distance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_links_opposite_edges() {
        let grid = Grid::new(4, 3, true);
        assert_eq!(grid.offset(grid.index(0, 1), -1, 0), Some(grid.index(3, 1)));
        assert_eq!(grid.offset(grid.index(0, 0), 0, -1), None);
    }

    #[test]
    fn flat_grid_stops_at_edges() {
        let grid = Grid::new(4, 3, false);
        assert_eq!(grid.offset(grid.index(0, 1), -1, 0), None);
        assert_eq!(grid.neighbors8(grid.index(0, 0)).count(), 3);
    }

    #[test]
    fn distance_field_counts_rings() {
        let grid = Grid::new(5, 1, false);
        let field = grid.distance_field(|index| index == 0, 2);
        assert_eq!(field, vec![0, 1, 2, u32::MAX, u32::MAX]);
    }

    #[test]
    fn wrapped_dx_takes_short_way() {
        let grid = Grid::new(10, 2, true);
        assert_eq!(grid.dx(9.0, 1.0), 2.0);
        assert_eq!(grid.chebyshev(grid.index(9, 0), grid.index(0, 1)), 1);
    }
}
