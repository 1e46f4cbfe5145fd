use crate::fixed::clamp01;
use crate::grid::Grid;

use super::TransportParams;

/// Wind speed that carries moisture one full tile per pass.
const TILE_WIND: f64 = 127.0;

/// Semi-Lagrangian upwind advection of evaporated moisture. Each pass
/// samples the field one wind step upwind and relaxes it toward the local
/// source, so humidity fades with distance from the sea.
pub(super) fn transport(
    grid: &Grid,
    wind_u: &[f64],
    wind_v: &[f64],
    evaporation: &[f64],
    params: &TransportParams,
) -> Vec<f64> {
    let mut humidity: Vec<f64> = evaporation.iter().map(|&e| clamp01(e)).collect();
    for _ in 0..params.iterations {
        humidity = (0..grid.size())
            .map(|index| {
                let (x, y) = grid.coords(index);
                let sx = f64::from(x) - (wind_u[index] / TILE_WIND).clamp(-1.0, 1.0);
                let sy = f64::from(y) - (wind_v[index] / TILE_WIND).clamp(-1.0, 1.0);
                let carried = sample(grid, &humidity, sx, sy);
                clamp01(
                    carried * params.retention + evaporation[index] * (1.0 - params.retention),
                )
            })
            .collect();
    }
    humidity
}

/// Bilinear sample; columns wrap when the grid does, rows clamp.
fn sample(grid: &Grid, field: &[f64], x: f64, y: f64) -> f64 {
    let width = i64::from(grid.width);
    let max_y = f64::from(grid.height.saturating_sub(1));
    let y = y.clamp(0.0, max_y);
    let x = if grid.wrap_x {
        x.rem_euclid(f64::from(grid.width))
    } else {
        x.clamp(0.0, f64::from(grid.width.saturating_sub(1)))
    };

    let x0 = x.floor() as i64;
    let y0 = y.floor() as i64;
    let fx = x - x0 as f64;
    let fy = y - y0 as f64;
    let column = |cx: i64| {
        if grid.wrap_x {
            cx.rem_euclid(width)
        } else {
            cx.clamp(0, width - 1)
        }
    };
    let row = |cy: i64| cy.clamp(0, i64::from(grid.height) - 1);
    let at = |cx: i64, cy: i64| field[grid.index(column(cx) as u32, row(cy) as u32)];

    let top = at(x0, y0) * (1.0 - fx) + at(x0 + 1, y0) * fx;
    let bottom = at(x0, y0 + 1) * (1.0 - fx) + at(x0 + 1, y0 + 1) * fx;
    top * (1.0 - fy) + bottom * fy
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn humidity_fades_downwind_over_land() {
        let grid = Grid::new(8, 1, false);
        let mut evaporation = vec![0.0; grid.size()];
        evaporation[0] = 1.0;
        let wind_u = vec![127.0; grid.size()];
        let wind_v = vec![0.0; grid.size()];
        let params = TransportParams {
            iterations: 24,
            retention: 0.9,
        };
        let h = transport(&grid, &wind_u, &wind_v, &evaporation, &params);
        for x in 1..7 {
            assert!(h[x] > h[x + 1]);
        }
        assert!(h[1] > 0.5);
        assert!(h.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn calm_air_keeps_local_sources() {
        let grid = Grid::new(3, 3, true);
        let evaporation = vec![0.4; grid.size()];
        let calm = vec![0.0; grid.size()];
        let params = TransportParams {
            iterations: 10,
            retention: 0.8,
        };
        let h = transport(&grid, &calm, &calm, &evaporation, &params);
        assert!(h.iter().all(|&v| (v - 0.4).abs() < 1e-12));
    }

    #[test]
    fn sampling_wraps_columns() {
        let grid = Grid::new(4, 1, true);
        let field = [0.0, 0.0, 0.0, 1.0];
        assert!((sample(&grid, &field, -0.5, 0.0) - 0.5).abs() < 1e-12);
        assert!((sample(&grid, &field, 3.0, 0.0) - 1.0).abs() < 1e-12);
    }
}
