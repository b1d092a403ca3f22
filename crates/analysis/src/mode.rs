//! Per-pixel mode across aligned label rasters
//!
//! Collapses a stack of same-location label rasters for one time period into
//! a single mode raster: each pixel holds the most frequent label across the
//! stack. Ties resolve to the smallest label.

use aquashift_core::raster::Raster;
use aquashift_core::{Error, Result};
use ndarray::Array2;

use crate::maybe_rayon::*;

/// Compute the per-pixel mode of a stack of label rasters.
///
/// The output copies the first raster's georeferencing. Ties resolve to the
/// smallest label, matching the upstream mode product.
///
/// # Errors
/// - [`Error::InvalidParameter`] when the stack is empty
/// - [`Error::ShapeMismatch`] when any raster differs in shape from the first
pub fn pixel_mode(rasters: &[Raster<u8>]) -> Result<Raster<u8>> {
    let first = rasters.first().ok_or(Error::InvalidParameter {
        name: "rasters",
        value: "[]".to_string(),
        reason: "mode needs at least one input raster".to_string(),
    })?;

    let (rows, cols) = first.shape();
    for r in &rasters[1..] {
        if r.shape() != (rows, cols) {
            return Err(Error::ShapeMismatch {
                er: rows,
                ec: cols,
                ar: r.rows(),
                ac: r.cols(),
            });
        }
    }

    let data: Vec<u8> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![0u8; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let mut counts = [0u32; 256];
                for r in rasters {
                    let label = unsafe { r.get_unchecked(row, col) };
                    counts[label as usize] += 1;
                }

                // Ascending scan, strict greater-than: ties keep the
                // smallest label.
                let mut best = 0u8;
                let mut best_count = 0u32;
                for (label, &count) in counts.iter().enumerate() {
                    if count > best_count {
                        best = label as u8;
                        best_count = count;
                    }
                }
                *out = best;
            }
            row_data
        })
        .collect();

    let mut output = first.with_same_meta::<u8>(rows, cols);
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;

    Ok(output)
}
