use crate::grid::Grid;

use super::ThermalParams;

/// Insolation at which the surface sits at the base temperature.
const NEUTRAL_INSOLATION: f64 = 0.55;

/// Surface temperature in °C: insolation warming around the base, adiabatic
/// cooling with height, then a pull back toward the base by the tile's heat
/// capacity (oceans are more sluggish than land).
pub(super) fn surface_temperature(
    grid: &Grid,
    insolation_rows: &[f64],
    elevation_m: &[f64],
    land: &[bool],
    params: &ThermalParams,
) -> Vec<f64> {
    (0..grid.size())
        .map(|index| {
            let (_, y) = grid.coords(index);
            let insolation = insolation_rows[y as usize];
            let height_km = elevation_m[index].max(0.0) / 1_000.0;
            let raw = params.base_temperature_c
                + params.insolation_scale_c * (insolation - NEUTRAL_INSOLATION)
                - params.lapse_rate_c_per_km * height_km;
            let capacity = if land[index] {
                params.land_heat_capacity
            } else {
                params.ocean_heat_capacity
            };
            raw + (params.base_temperature_c - raw) * capacity
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ThermalParams {
        ThermalParams {
            base_temperature_c: 14.0,
            insolation_scale_c: 40.0,
            lapse_rate_c_per_km: 6.5,
            land_heat_capacity: 0.0,
            ocean_heat_capacity: 0.5,
        }
    }

    #[test]
    fn altitude_cools() {
        let grid = Grid::new(2, 1, false);
        let t = surface_temperature(&grid, &[0.55], &[0.0, 2_000.0], &[true, true], &params());
        assert_eq!(t[0], 14.0);
        assert!((t[1] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn ocean_is_pulled_toward_base() {
        let grid = Grid::new(2, 1, false);
        let t = surface_temperature(&grid, &[1.0], &[0.0, -500.0], &[true, false], &params());
        assert!((t[0] - 32.0).abs() < 1e-9);
        assert!((t[1] - 23.0).abs() < 1e-9);
    }
}
