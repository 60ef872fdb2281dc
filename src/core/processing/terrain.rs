//! Slope and aspect from a DEM using Horn's (1981) 3×3 weighted gradient.
//!
//! Rows run north to south and columns west to east, as in a north-up
//! GeoTIFF. Cell sizes come from the geotransform, so non-square pixels are
//! handled. Edge cells, and cells whose 3×3 window touches a missing value,
//! come out as `NaN`.
use ndarray::Array2;

use crate::core::raster::Raster;
use crate::types::TerrainAttribute;

/// Aspect assigned to cells with zero gradient.
pub const FLAT_ASPECT: f64 = -1.0;

/// Horn gradient at interior cell `(r, c)` as `(dz/dx, dz/dy)` with x to the
/// east and y to the north. `None` when any neighbour is missing.
///
/// ```text
///   NW  N  NE
///   W   *  E
///   SW  S  SE
/// ```
fn horn_gradient(z: &Array2<f64>, r: usize, c: usize, cell_x: f64, cell_y: f64) -> Option<(f64, f64)> {
    let nw = z[[r - 1, c - 1]];
    let n = z[[r - 1, c]];
    let ne = z[[r - 1, c + 1]];
    let w = z[[r, c - 1]];
    let centre = z[[r, c]];
    let e = z[[r, c + 1]];
    let sw = z[[r + 1, c - 1]];
    let s = z[[r + 1, c]];
    let se = z[[r + 1, c + 1]];

    if [nw, n, ne, w, centre, e, sw, s, se].iter().any(|v| v.is_nan()) {
        return None;
    }

    let dz_dx = ((ne + 2.0 * e + se) - (nw + 2.0 * w + sw)) / (8.0 * cell_x);
    let dz_dy = ((nw + 2.0 * n + ne) - (sw + 2.0 * s + se)) / (8.0 * cell_y);
    Some((dz_dx, dz_dy))
}

/// Cell sizes (x, y) in map units; an identity or degenerate transform gives 1.
fn cell_sizes(dem: &Raster) -> (f64, f64) {
    let (rx, ry) = dem.grid.resolution();
    let fix = |v: f64| if v.abs() > 0.0 && v.is_finite() { v.abs() } else { 1.0 };
    (fix(rx), fix(ry))
}

fn map_interior<F>(dem: &Raster, f: F) -> Raster
where
    F: Fn(f64, f64) -> f64,
{
    let (rows, cols) = dem.shape();
    let mut out = Array2::<f64>::from_elem((rows, cols), f64::NAN);
    if rows >= 3 && cols >= 3 {
        let (cell_x, cell_y) = cell_sizes(dem);
        for r in 1..rows - 1 {
            for c in 1..cols - 1 {
                if let Some((dz_dx, dz_dy)) = horn_gradient(&dem.data, r, c, cell_x, cell_y) {
                    out[[r, c]] = f(dz_dx, dz_dy);
                }
            }
        }
    }
    let mut grid = dem.grid.clone();
    grid.no_data = None;
    Raster::new(out, grid)
}

/// Slope in degrees, in [0, 90).
pub fn slope_degrees(dem: &Raster) -> Raster {
    map_interior(dem, |dz_dx, dz_dy| {
        (dz_dx * dz_dx + dz_dy * dz_dy).sqrt().atan().to_degrees()
    })
}

/// Downslope direction in degrees clockwise from north, in [0, 360).
/// Flat cells get [`FLAT_ASPECT`].
pub fn aspect_degrees(dem: &Raster) -> Raster {
    map_interior(dem, |dz_dx, dz_dy| {
        if dz_dx == 0.0 && dz_dy == 0.0 {
            return FLAT_ASPECT;
        }
        let bearing = (-dz_dx).atan2(-dz_dy).to_degrees();
        if bearing < 0.0 { bearing + 360.0 } else { bearing }
    })
}

pub fn derive(dem: &Raster, attribute: TerrainAttribute) -> Raster {
    match attribute {
        TerrainAttribute::Slope => slope_degrees(dem),
        TerrainAttribute::Aspect => aspect_degrees(dem),
    }
}
