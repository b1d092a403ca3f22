//! Urbanization-stratified transition aggregation
//!
//! Extends the per-region aggregation by intersecting the transition masks
//! with stable/gained urban class masks from a land-classification raster,
//! and by reporting how urbanized each region is.

use std::collections::BTreeMap;

use aquashift_core::raster::Raster;
use aquashift_core::{Error, Result};

use crate::aggregate::{
    accumulate_pixel, check_region_shape, AggregateParams, ProgressFn, RegionCounts, RegionSummary,
};
use crate::transition::{TransitionKind, TransitionMasks};

/// Urbanization class of a pixel in the land-classification product
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrbanClass {
    NonUrban,
    GainedUrban,
    StableUrban,
}

/// Raster label codes for the urbanization classes. Labels outside the
/// encoding are excluded from the urban masks, like non-urban pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UrbanEncoding {
    pub non_urban: u8,
    pub gained: u8,
    pub stable: u8,
}

impl Default for UrbanEncoding {
    fn default() -> Self {
        Self {
            non_urban: 0,
            gained: 1,
            stable: 2,
        }
    }
}

impl UrbanEncoding {
    /// Decode a raster label
    pub fn class_of(&self, label: u8) -> Option<UrbanClass> {
        if label == self.non_urban {
            Some(UrbanClass::NonUrban)
        } else if label == self.gained {
            Some(UrbanClass::GainedUrban)
        } else if label == self.stable {
            Some(UrbanClass::StableUrban)
        } else {
            None
        }
    }
}

/// Per-region transition areas stratified by urbanization, all in km²
#[derive(Debug, Clone, PartialEq)]
pub struct UrbanRegionSummary {
    /// The plain (unstratified) per-region summary
    pub summary: RegionSummary,
    /// Total pixels belonging to this region
    pub region_pixels: usize,
    pub gained_urban_km2: f64,
    pub stable_urban_km2: f64,
    /// Drying transition area inside gained-urban pixels
    pub dry_gained_km2: f64,
    /// Drying transition area inside stable-urban pixels
    pub dry_stable_km2: f64,
    /// Wetting transition area inside gained-urban pixels
    pub wet_gained_km2: f64,
    /// Wetting transition area inside stable-urban pixels
    pub wet_stable_km2: f64,
    /// `(gained + stable urban pixels) / region pixels * 100`. NaN when the
    /// region has no pixels, which cannot happen for ids taken from the
    /// region raster itself.
    pub urbanization_percent: f64,
}

#[derive(Debug, Clone, Default)]
struct UrbanCounts {
    base: RegionCounts,
    region_pixels: usize,
    gained_pixels: usize,
    stable_pixels: usize,
    dry_gained: usize,
    dry_stable: usize,
    wet_gained: usize,
    wet_stable: usize,
}

/// Aggregate transition masks into per-region areas stratified by
/// urbanization class.
///
/// Same region semantics as [`crate::aggregate::summarize_transitions`]:
/// nonzero region ids only, ascending order, all-zero rows kept. Each
/// drying/wetting transition pixel is additionally attributed to the gained
/// or stable urban stratum of the land-classification raster.
///
/// # Errors
/// [`Error::ShapeMismatch`] when the region or urban raster shape differs
/// from the mask shape.
pub fn summarize_transitions_urban(
    regions: &Raster<u32>,
    masks: &TransitionMasks,
    urban: &Raster<u8>,
    encoding: &UrbanEncoding,
    params: &AggregateParams,
    progress: Option<ProgressFn>,
) -> Result<Vec<UrbanRegionSummary>> {
    let (rows, cols) = check_region_shape(regions, masks)?;
    if urban.shape() != (rows, cols) {
        return Err(Error::ShapeMismatch {
            er: rows,
            ec: cols,
            ar: urban.rows(),
            ac: urban.cols(),
        });
    }

    let mut counts: BTreeMap<u32, UrbanCounts> = BTreeMap::new();

    for row in 0..rows {
        for col in 0..cols {
            let region = unsafe { regions.get_unchecked(row, col) };
            if region == 0 {
                continue;
            }

            let entry = counts.entry(region).or_default();
            entry.region_pixels += 1;
            accumulate_pixel(&mut entry.base, masks, row, col);

            match encoding.class_of(unsafe { urban.get_unchecked(row, col) }) {
                Some(UrbanClass::GainedUrban) => {
                    entry.gained_pixels += 1;
                    for kind in TransitionKind::ALL {
                        if masks.transition(kind)[(row, col)] {
                            if kind.is_drying() {
                                entry.dry_gained += 1;
                            } else {
                                entry.wet_gained += 1;
                            }
                        }
                    }
                }
                Some(UrbanClass::StableUrban) => {
                    entry.stable_pixels += 1;
                    for kind in TransitionKind::ALL {
                        if masks.transition(kind)[(row, col)] {
                            if kind.is_drying() {
                                entry.dry_stable += 1;
                            } else {
                                entry.wet_stable += 1;
                            }
                        }
                    }
                }
                _ => {}
            }
        }
    }

    let pixel_km2 = params.pixel_km2();
    let total = counts.len();
    let summaries = counts
        .iter()
        .enumerate()
        .map(|(index, (&region_id, c))| {
            if let Some(observer) = progress {
                observer(region_id, index, total);
            }

            let urban_pixels = c.gained_pixels + c.stable_pixels;
            let urbanization_percent = if c.region_pixels == 0 {
                f64::NAN
            } else {
                urban_pixels as f64 / c.region_pixels as f64 * 100.0
            };

            UrbanRegionSummary {
                summary: c.base.to_summary(region_id, pixel_km2),
                region_pixels: c.region_pixels,
                gained_urban_km2: c.gained_pixels as f64 * pixel_km2,
                stable_urban_km2: c.stable_pixels as f64 * pixel_km2,
                dry_gained_km2: c.dry_gained as f64 * pixel_km2,
                dry_stable_km2: c.dry_stable as f64 * pixel_km2,
                wet_gained_km2: c.wet_gained as f64 * pixel_km2,
                wet_stable_km2: c.wet_stable as f64 * pixel_km2,
                urbanization_percent,
            }
        })
        .collect();

    Ok(summaries)
}
