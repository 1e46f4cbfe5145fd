use crate::grid::Grid;

const WIND_DRAG: f64 = 0.5;
const CORIOLIS_DEFLECTION_DEG: f64 = 30.0;

/// Wind-driven surface currents on water tiles. Flow is deflected right of
/// the wind in the north and left in the south, and any component that
/// would run into an adjacent land tile is dropped so currents follow coasts.
pub(super) fn currents(
    grid: &Grid,
    latitudes: &[f64],
    water: &[bool],
    wind_u: &[f64],
    wind_v: &[f64],
    strength: f64,
) -> (Vec<f64>, Vec<f64>) {
    let mut current_u = vec![0.0; grid.size()];
    let mut current_v = vec![0.0; grid.size()];
    if strength <= 0.0 {
        return (current_u, current_v);
    }

    for index in 0..grid.size() {
        if !water[index] {
            continue;
        }
        let (_, y) = grid.coords(index);
        let lat = latitudes[y as usize];
        let turn_deg = if lat > 0.0 {
            CORIOLIS_DEFLECTION_DEG
        } else if lat < 0.0 {
            -CORIOLIS_DEFLECTION_DEG
        } else {
            0.0
        };

        let east = wind_u[index] * WIND_DRAG * strength;
        let north = -wind_v[index] * WIND_DRAG * strength;
        let (sin, cos) = turn_deg.to_radians().sin_cos();
        let mut u = east * cos + north * sin;
        let mut v = -(north * cos - east * sin);

        if blocked(grid, water, index, u.signum() as i32, 0, u) {
            u = 0.0;
        }
        if blocked(grid, water, index, 0, v.signum() as i32, v) {
            v = 0.0;
        }
        current_u[index] = u;
        current_v[index] = v;
    }
    (current_u, current_v)
}

fn blocked(grid: &Grid, water: &[bool], index: usize, dx: i32, dy: i32, component: f64) -> bool {
    if component == 0.0 {
        return false;
    }
    matches!(grid.offset(index, dx, dy), Some(next) if !water[next])
}
