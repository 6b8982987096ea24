//! Reference grid shared by the climate, parameter and water-user rasters.

use crate::{CouplingError, Result};
use serde::{Deserialize, Serialize};

/// Affine transformation coefficients for georeferencing a grid.
///
/// Converts between pixel coordinates (col, row) and map coordinates (x, y):
/// ```text
/// x = origin_x + col * pixel_width + row * row_rotation
/// y = origin_y + col * col_rotation + row * pixel_height
/// ```
///
/// For north-up grids the rotations are 0 and `pixel_height` is negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
    pub row_rotation: f64,
    pub col_rotation: f64,
}

impl GeoTransform {
    /// North-up transform with no rotation.
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
            row_rotation: 0.0,
            col_rotation: 0.0,
        }
    }

    /// From GDAL-style coefficients
    /// `[origin_x, pixel_width, row_rotation, origin_y, col_rotation, pixel_height]`.
    pub fn from_gdal(coeffs: [f64; 6]) -> Self {
        Self {
            origin_x: coeffs[0],
            pixel_width: coeffs[1],
            row_rotation: coeffs[2],
            origin_y: coeffs[3],
            col_rotation: coeffs[4],
            pixel_height: coeffs[5],
        }
    }

    /// From affine-matrix coefficients `[a, b, c, d, e, f]` as raster
    /// libraries print them (`x = a*col + b*row + c`, `y = d*col + e*row + f`).
    pub fn from_affine(coeffs: [f64; 6]) -> Self {
        Self {
            pixel_width: coeffs[0],
            row_rotation: coeffs[1],
            origin_x: coeffs[2],
            col_rotation: coeffs[3],
            pixel_height: coeffs[4],
            origin_y: coeffs[5],
        }
    }

    /// Map coordinates of the centre of cell (row, col).
    pub fn cell_center(&self, row: usize, col: usize) -> (f64, f64) {
        let col_f = col as f64 + 0.5;
        let row_f = row as f64 + 0.5;

        let x = self.origin_x + col_f * self.pixel_width + row_f * self.row_rotation;
        let y = self.origin_y + col_f * self.col_rotation + row_f * self.pixel_height;

        (x, y)
    }

    /// Fractional (col, row) of a map coordinate; NaN for a degenerate transform.
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        let det = self.pixel_width * self.pixel_height - self.row_rotation * self.col_rotation;

        if det.abs() < 1e-12 {
            return (f64::NAN, f64::NAN);
        }

        let dx = x - self.origin_x;
        let dy = y - self.origin_y;

        let col = (self.pixel_height * dx - self.row_rotation * dy) / det;
        let row = (-self.col_rotation * dx + self.pixel_width * dy) / det;

        (col, row)
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, -1.0)
    }
}

/// Shape, transform and nodata of the model's reference raster.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    pub rows: usize,
    pub cols: usize,
    pub transform: GeoTransform,
    #[serde(default)]
    pub nodata: Option<f64>,
}

impl GridSpec {
    pub fn new(rows: usize, cols: usize, transform: GeoTransform) -> Self {
        Self {
            rows,
            cols,
            transform,
            nodata: None,
        }
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Fail with `ShapeMismatch` unless `shape` equals this grid's shape.
    pub fn ensure_shape(&self, shape: (usize, usize)) -> Result<()> {
        if shape != self.shape() {
            return Err(CouplingError::ShapeMismatch {
                er: self.rows,
                ec: self.cols,
                ar: shape.0,
                ac: shape.1,
            });
        }
        Ok(())
    }

    /// Inclusive (row, col) window of the cells whose centres can fall inside
    /// the map-coordinate box, clipped to the grid. `None` when the box misses
    /// the grid entirely.
    pub fn window(&self, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Option<((usize, usize), (usize, usize))> {
        let corners = [
            self.transform.geo_to_pixel(min_x, min_y),
            self.transform.geo_to_pixel(min_x, max_y),
            self.transform.geo_to_pixel(max_x, min_y),
            self.transform.geo_to_pixel(max_x, max_y),
        ];
        if corners.iter().any(|(c, r)| c.is_nan() || r.is_nan()) {
            return None;
        }
        let col_lo = corners.iter().map(|(c, _)| *c).fold(f64::INFINITY, f64::min);
        let col_hi = corners.iter().map(|(c, _)| *c).fold(f64::NEG_INFINITY, f64::max);
        let row_lo = corners.iter().map(|(_, r)| *r).fold(f64::INFINITY, f64::min);
        let row_hi = corners.iter().map(|(_, r)| *r).fold(f64::NEG_INFINITY, f64::max);

        // Cell k has its centre at k + 0.5.
        let first = |lo: f64| (lo - 0.5).ceil().max(0.0);
        let last = |hi: f64, n: usize| (hi - 0.5).floor().min(n as f64 - 1.0);

        let (r0, r1) = (first(row_lo), last(row_hi, self.rows));
        let (c0, c1) = (first(col_lo), last(col_hi, self.cols));
        if self.rows == 0 || self.cols == 0 || r0 > r1 || c0 > c1 {
            return None;
        }
        Some(((r0 as usize, c0 as usize), (r1 as usize, c1 as usize)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_cell_center_roundtrip() {
        let gt = GeoTransform::new(100.0, 200.0, 10.0, -10.0);

        let (x, y) = gt.cell_center(10, 5);
        assert_relative_eq!(x, 155.0, epsilon = 1e-10);
        assert_relative_eq!(y, 95.0, epsilon = 1e-10);

        let (col, row) = gt.geo_to_pixel(x, y);
        assert_relative_eq!(col, 5.5, epsilon = 1e-10);
        assert_relative_eq!(row, 10.5, epsilon = 1e-10);
    }

    #[test]
    fn test_affine_and_gdal_orders_agree() {
        let a = GeoTransform::from_affine([30.0, 0.0, 500000.0, 0.0, -30.0, 5200000.0]);
        let g = GeoTransform::from_gdal([500000.0, 30.0, 0.0, 5200000.0, 0.0, -30.0]);
        assert_eq!(a, g);
        assert_eq!(a, GeoTransform::new(500000.0, 5200000.0, 30.0, -30.0));
    }

    #[test]
    fn test_degenerate_transform() {
        let gt = GeoTransform::new(0.0, 0.0, 0.0, -1.0);
        let (col, row) = gt.geo_to_pixel(1.0, 1.0);
        assert!(col.is_nan() && row.is_nan());
    }

    #[test]
    fn test_ensure_shape() {
        let grid = GridSpec::new(3, 4, GeoTransform::default());
        assert!(grid.ensure_shape((3, 4)).is_ok());
        match grid.ensure_shape((4, 3)) {
            Err(CouplingError::ShapeMismatch { er, ec, ar, ac }) => {
                assert_eq!((er, ec, ar, ac), (3, 4, 4, 3));
            }
            other => panic!("expected ShapeMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_window() {
        // 4x4 grid of unit cells, upper-left corner at (0, 4)
        let grid = GridSpec::new(4, 4, GeoTransform::new(0.0, 4.0, 1.0, -1.0));
        // box covering the centres of rows 0-1, cols 1-2
        assert_eq!(grid.window(1.0, 2.0, 3.0, 4.0), Some(((0, 1), (1, 2))));
        // box partly outside the grid is clipped
        assert_eq!(grid.window(-5.0, -5.0, 1.0, 1.0), Some(((3, 0), (3, 0))));
        // box entirely outside
        assert_eq!(grid.window(10.0, 10.0, 12.0, 12.0), None);
        // box between two centres
        assert_eq!(grid.window(0.6, 0.6, 0.9, 0.9), None);
    }
}
