//! Burns water-user polygons into the model's reference grid.
//!
//! A cell is claimed by a polygon when the cell centre lies inside it.
//! Polygons are burned in input order, so on overlap the later polygon wins.

use geo::{BoundingRect, Contains, Geometry, Point, Polygon};
use hec_core::feature::Feature;
use hec_core::grid::{GeoTransform, GridSpec};
use hec_core::{CouplingError, FarmId, Result};
use log::{debug, info, warn};
use ndarray::Array2;
use std::collections::BTreeSet;

/// Value of cells not claimed by any water user.
pub const DEFAULT_FILL: i64 = 0;

/// Grid of farm ids, aligned with the reference grid.
#[derive(Debug, Clone, PartialEq)]
pub struct WaterUserMask {
    cells: Array2<i64>,
    transform: GeoTransform,
    fill: i64,
}

impl WaterUserMask {
    /// A mask with every cell unclaimed.
    pub fn filled(grid: &GridSpec, fill: i64) -> Self {
        WaterUserMask {
            cells: Array2::from_elem(grid.shape(), fill),
            transform: grid.transform,
            fill,
        }
    }

    /// Wrap an already rasterized grid of farm ids.
    pub fn from_array(cells: Array2<i64>, transform: GeoTransform, fill: i64) -> Self {
        WaterUserMask {
            cells,
            transform,
            fill,
        }
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.cells.dim()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<i64> {
        self.cells.get((row, col)).copied()
    }

    pub fn array(&self) -> &Array2<i64> {
        &self.cells
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn fill(&self) -> i64 {
        self.fill
    }

    /// Number of cells claimed by `farm_id`.
    pub fn count(&self, farm_id: FarmId) -> usize {
        self.cells.iter().filter(|v| **v == farm_id).count()
    }

    /// Distinct farm ids present in the mask.
    pub fn ids(&self) -> BTreeSet<FarmId> {
        self.cells
            .iter()
            .copied()
            .filter(|v| *v != self.fill)
            .collect()
    }
}

/// Rasterizes water-user polygons onto a fixed reference grid.
#[derive(Debug, Clone)]
pub struct WaterUserRasterizer {
    grid: GridSpec,
    fill: i64,
}

impl WaterUserRasterizer {
    pub fn new(grid: GridSpec) -> Self {
        WaterUserRasterizer {
            grid,
            fill: DEFAULT_FILL,
        }
    }

    pub fn with_fill(mut self, fill: i64) -> Self {
        self.fill = fill;
        self
    }

    pub fn grid(&self) -> &GridSpec {
        &self.grid
    }

    /// Burn the integer `id_field` of every feature into a fresh mask.
    ///
    /// Every feature must carry `id_field`; a single missing id fails the
    /// whole call before anything is burned. Features without an areal
    /// geometry are skipped with a warning.
    pub fn rasterize(&self, features: &[Feature], id_field: &str) -> Result<WaterUserMask> {
        let ids = features
            .iter()
            .enumerate()
            .map(|(index, f)| {
                f.int_property(id_field).ok_or_else(|| CouplingError::MissingField {
                    field: id_field.to_string(),
                    index,
                })
            })
            .collect::<Result<Vec<FarmId>>>()?;

        let mut mask = WaterUserMask::filled(&self.grid, self.fill);
        for (feature, id) in features.iter().zip(ids) {
            match &feature.geometry {
                Some(geometry) => {
                    let burned = self.burn_geometry(&mut mask.cells, geometry, id);
                    debug!("water user {} claimed {} cells", id, burned);
                }
                None => warn!("water user {} has no geometry, skipping", id),
            }
        }
        info!(
            "rasterized {} water users onto a {}x{} grid",
            features.len(),
            self.grid.rows,
            self.grid.cols
        );
        Ok(mask)
    }

    fn burn_geometry(&self, cells: &mut Array2<i64>, geometry: &Geometry<f64>, value: i64) -> usize {
        match geometry {
            Geometry::Polygon(p) => self.burn_polygon(cells, p, value),
            Geometry::MultiPolygon(mp) => mp.iter().map(|p| self.burn_polygon(cells, p, value)).sum(),
            Geometry::Rect(r) => self.burn_polygon(cells, &r.to_polygon(), value),
            Geometry::GeometryCollection(gc) => gc
                .iter()
                .map(|g| self.burn_geometry(cells, g, value))
                .sum(),
            _ => {
                warn!("water user {} geometry is not a polygon, skipping", value);
                0
            }
        }
    }

    fn burn_polygon(&self, cells: &mut Array2<i64>, polygon: &Polygon<f64>, value: i64) -> usize {
        let Some(rect) = polygon.bounding_rect() else {
            return 0;
        };
        let Some(((r0, c0), (r1, c1))) = self.grid.window(rect.min().x, rect.min().y, rect.max().x, rect.max().y)
        else {
            return 0;
        };

        let mut burned = 0;
        for row in r0..=r1 {
            for col in c0..=c1 {
                let (x, y) = self.grid.transform.cell_center(row, col);
                if polygon.contains(&Point::new(x, y)) {
                    cells[[row, col]] = value;
                    burned += 1;
                }
            }
        }
        burned
    }
}

/// Burn `id_field` of each feature into a grid shaped like `grid`.
pub fn rasterize(features: &[Feature], id_field: &str, grid: &GridSpec, fill: i64) -> Result<WaterUserMask> {
    WaterUserRasterizer::new(*grid).with_fill(fill).rasterize(features, id_field)
}
