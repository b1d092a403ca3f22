//! Vector-to-raster burning
//!
//! Materializes region and land-class label rasters from vector geometries
//! when the inputs are not already rasters. A pixel takes a geometry's value
//! when its center falls inside the geometry; background stays 0. Later
//! geometries win overlaps.

use aquashift_core::raster::{GeoTransform, Raster};
use geo::{BoundingRect, Contains};
use geo_types::{Geometry, Point};

/// Burn valued geometries into a label raster.
///
/// Pixel-center containment only; pixels whose center touches a geometry
/// boundary are not burned. 0 is the background ("no region") value, so
/// callers should avoid 0 as a burn value.
pub fn rasterize(
    shapes: &[(Geometry<f64>, u32)],
    rows: usize,
    cols: usize,
    transform: GeoTransform,
) -> Raster<u32> {
    let mut output: Raster<u32> = Raster::new(rows, cols);
    output.set_transform(transform);

    for (geometry, value) in shapes {
        let (row_range, col_range) = match pixel_window(geometry, rows, cols, &transform) {
            Some(window) => window,
            None => continue,
        };

        for row in row_range {
            for col in col_range.clone() {
                let (x, y) = transform.pixel_to_geo(col, row);
                if geometry.contains(&Point::new(x, y)) {
                    unsafe { output.set_unchecked(row, col, *value) };
                }
            }
        }
    }

    output
}

/// Clip a geometry's bounding rect to the pixel grid. Returns `None` when
/// the geometry has no extent or lies entirely outside the grid.
fn pixel_window(
    geometry: &Geometry<f64>,
    rows: usize,
    cols: usize,
    transform: &GeoTransform,
) -> Option<(std::ops::Range<usize>, std::ops::Range<usize>)> {
    let rect = geometry.bounding_rect()?;

    let (c0, r0) = transform.geo_to_pixel(rect.min().x, rect.min().y);
    let (c1, r1) = transform.geo_to_pixel(rect.max().x, rect.max().y);

    let col_min = c0.min(c1).floor();
    let col_max = c0.max(c1).ceil();
    let row_min = r0.min(r1).floor();
    let row_max = r0.max(r1).ceil();

    if col_max < 0.0 || row_max < 0.0 || col_min >= cols as f64 || row_min >= rows as f64 {
        return None;
    }

    let col_lo = col_min.max(0.0) as usize;
    let col_hi = (col_max as usize).min(cols);
    let row_lo = row_min.max(0.0) as usize;
    let row_hi = (row_max as usize).min(rows);

    Some((row_lo..row_hi, col_lo..col_hi))
}
