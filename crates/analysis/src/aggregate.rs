//! Per-region transition aggregation
//!
//! Aggregates the classifier's boolean masks into physical areas per
//! watershed region (HUC). Regions are identified by unique nonzero labels
//! in a region raster; label 0 is reserved for "no region" and is always
//! excluded. Rows are emitted in ascending region-id order so repeated runs
//! over identical inputs produce identical output.

use std::collections::BTreeMap;

use aquashift_core::raster::Raster;
use aquashift_core::{Error, Result};

use crate::transition::{Period, TransitionKind, TransitionMasks, WaterState};

/// Progress hook invoked once per emitted region: (region id, row index,
/// total regions). Replaces embedded progress printing; pass `None` to run
/// silently.
pub type ProgressFn<'a> = &'a (dyn Fn(u32, usize, usize) + Sync);

/// Parameters shared by the aggregation entry points
#[derive(Debug, Clone)]
pub struct AggregateParams {
    /// Linear meters per pixel edge, applied uniformly to every count
    pub pixel_size: f64,
}

impl Default for AggregateParams {
    fn default() -> Self {
        Self { pixel_size: 30.0 }
    }
}

impl AggregateParams {
    /// Area of one pixel in km²
    pub fn pixel_km2(&self) -> f64 {
        self.pixel_size * self.pixel_size / 1.0e6
    }
}

/// Aggregated transition areas for one region, all in km²
#[derive(Debug, Clone, PartialEq)]
pub struct RegionSummary {
    pub region_id: u32,
    /// Per-state area in period 1, indexed by [`WaterState::index`]
    pub period1_km2: [f64; 3],
    /// Per-state area in period 2, indexed by [`WaterState::index`]
    pub period2_km2: [f64; 3],
    /// Per-kind transition area, indexed by [`TransitionKind::index`]
    pub transitions_km2: [f64; 6],
}

impl RegionSummary {
    fn zero(region_id: u32) -> Self {
        Self {
            region_id,
            period1_km2: [0.0; 3],
            period2_km2: [0.0; 3],
            transitions_km2: [0.0; 6],
        }
    }

    /// Area of one transition kind
    pub fn transition_km2(&self, kind: TransitionKind) -> f64 {
        self.transitions_km2[kind.index()]
    }

    /// Area of one water state within a period
    pub fn water_km2(&self, period: Period, state: WaterState) -> f64 {
        match period {
            Period::First => self.period1_km2[state.index()],
            Period::Second => self.period2_km2[state.index()],
        }
    }

    /// Total area of transitions losing water permanence
    pub fn dry_km2(&self) -> f64 {
        TransitionKind::ALL
            .iter()
            .filter(|k| k.is_drying())
            .map(|k| self.transition_km2(*k))
            .sum()
    }

    /// Total area of transitions gaining water permanence
    pub fn wet_km2(&self) -> f64 {
        TransitionKind::ALL
            .iter()
            .filter(|k| !k.is_drying())
            .map(|k| self.transition_km2(*k))
            .sum()
    }
}

/// Per-region pixel counts accumulated during the single pass
#[derive(Debug, Clone, Default)]
pub(crate) struct RegionCounts {
    pub period1: [usize; 3],
    pub period2: [usize; 3],
    pub transitions: [usize; 6],
}

impl RegionCounts {
    pub(crate) fn to_summary(&self, region_id: u32, pixel_km2: f64) -> RegionSummary {
        let mut summary = RegionSummary::zero(region_id);
        for i in 0..3 {
            summary.period1_km2[i] = self.period1[i] as f64 * pixel_km2;
            summary.period2_km2[i] = self.period2[i] as f64 * pixel_km2;
        }
        for i in 0..6 {
            summary.transitions_km2[i] = self.transitions[i] as f64 * pixel_km2;
        }
        summary
    }
}

pub(crate) fn check_region_shape(
    regions: &Raster<u32>,
    masks: &TransitionMasks,
) -> Result<(usize, usize)> {
    let (rows, cols) = masks.shape();
    if regions.shape() != (rows, cols) {
        return Err(Error::ShapeMismatch {
            er: rows,
            ec: cols,
            ar: regions.rows(),
            ac: regions.cols(),
        });
    }
    Ok((rows, cols))
}

/// Aggregate transition masks into per-region areas.
///
/// One [`RegionSummary`] is produced for every distinct nonzero region id in
/// the region raster, in ascending id order. A region with no overlapping
/// water or transition pixels still yields an all-zero row. A region raster
/// holding only zeros yields an empty vector.
///
/// # Errors
/// [`Error::ShapeMismatch`] when the region raster shape differs from the
/// mask shape.
pub fn summarize_transitions(
    regions: &Raster<u32>,
    masks: &TransitionMasks,
    params: &AggregateParams,
    progress: Option<ProgressFn>,
) -> Result<Vec<RegionSummary>> {
    let (rows, cols) = check_region_shape(regions, masks)?;

    // BTreeMap keeps region ids sorted, which fixes the output order.
    let mut counts: BTreeMap<u32, RegionCounts> = BTreeMap::new();

    for row in 0..rows {
        for col in 0..cols {
            let region = unsafe { regions.get_unchecked(row, col) };
            if region == 0 {
                continue;
            }

            let entry = counts.entry(region).or_default();
            accumulate_pixel(entry, masks, row, col);
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
            c.to_summary(region_id, pixel_km2)
        })
        .collect();

    Ok(summaries)
}

pub(crate) fn accumulate_pixel(
    counts: &mut RegionCounts,
    masks: &TransitionMasks,
    row: usize,
    col: usize,
) {
    for state in WaterState::ALL {
        if masks.water_state(Period::First, state)[(row, col)] {
            counts.period1[state.index()] += 1;
        }
        if masks.water_state(Period::Second, state)[(row, col)] {
            counts.period2[state.index()] += 1;
        }
    }
    for kind in TransitionKind::ALL {
        if masks.transition(kind)[(row, col)] {
            counts.transitions[kind.index()] += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transition::{classify_transitions, WaterEncoding};
    use approx::assert_relative_eq;

    fn raster(data: Vec<u8>, rows: usize, cols: usize) -> Raster<u8> {
        Raster::from_vec(data, rows, cols).unwrap()
    }

    fn regions(data: Vec<u32>, rows: usize, cols: usize) -> Raster<u32> {
        Raster::from_vec(data, rows, cols).unwrap()
    }

    #[test]
    fn test_single_region_scenario() {
        // period1 = [[3,3],[1,2]], period2 = [[1,2],[1,3]], all in region 5
        let p1 = raster(vec![3, 3, 1, 2], 2, 2);
        let p2 = raster(vec![1, 2, 1, 3], 2, 2);
        let masks = classify_transitions(&p1, &p2, &WaterEncoding::default()).unwrap();
        let reg = regions(vec![5; 4], 2, 2);

        let rows =
            summarize_transitions(&reg, &masks, &AggregateParams::default(), None).unwrap();
        assert_eq!(rows.len(), 1);

        let r = &rows[0];
        let pixel = 900.0 / 1.0e6; // 30m pixel
        assert_eq!(r.region_id, 5);
        assert_relative_eq!(r.transition_km2(TransitionKind::PermToNoWater), pixel);
        assert_relative_eq!(r.transition_km2(TransitionKind::PermToSeasonal), pixel);
        assert_relative_eq!(r.transition_km2(TransitionKind::SeasonalToPerm), pixel);
        assert_relative_eq!(r.transition_km2(TransitionKind::SeasonalToNoWater), 0.0);
        assert_relative_eq!(r.transition_km2(TransitionKind::NoWaterToSeasonal), 0.0);
        assert_relative_eq!(r.transition_km2(TransitionKind::NoWaterToPerm), 0.0);

        assert_relative_eq!(r.dry_km2(), 2.0 * pixel);
        assert_relative_eq!(r.wet_km2(), pixel);
    }

    #[test]
    fn test_zero_region_excluded() {
        let p1 = raster(vec![3; 4], 2, 2);
        let p2 = raster(vec![1; 4], 2, 2);
        let masks = classify_transitions(&p1, &p2, &WaterEncoding::default()).unwrap();
        let reg = regions(vec![0, 0, 7, 0], 2, 2);

        let rows =
            summarize_transitions(&reg, &masks, &AggregateParams::default(), None).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].region_id, 7);
    }

    #[test]
    fn test_all_zero_region_raster_yields_empty_report() {
        let p1 = raster(vec![3; 4], 2, 2);
        let p2 = raster(vec![1; 4], 2, 2);
        let masks = classify_transitions(&p1, &p2, &WaterEncoding::default()).unwrap();
        let reg = regions(vec![0; 4], 2, 2);

        let rows =
            summarize_transitions(&reg, &masks, &AggregateParams::default(), None).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_region_without_water_yields_zero_row() {
        // Region 9 covers only out-of-enum labels
        let p1 = raster(vec![3, 0, 3, 0], 2, 2);
        let p2 = raster(vec![1, 0, 1, 0], 2, 2);
        let masks = classify_transitions(&p1, &p2, &WaterEncoding::default()).unwrap();
        let reg = regions(vec![4, 9, 4, 9], 2, 2);

        let rows =
            summarize_transitions(&reg, &masks, &AggregateParams::default(), None).unwrap();
        assert_eq!(rows.len(), 2);

        let r9 = &rows[1];
        assert_eq!(r9.region_id, 9);
        assert_relative_eq!(r9.dry_km2(), 0.0);
        assert_relative_eq!(r9.wet_km2(), 0.0);
        for kind in TransitionKind::ALL {
            assert_relative_eq!(r9.transition_km2(kind), 0.0);
        }
    }

    #[test]
    fn test_rows_ascend_by_region_id() {
        let p1 = raster(vec![1; 9], 3, 3);
        let p2 = raster(vec![1; 9], 3, 3);
        let masks = classify_transitions(&p1, &p2, &WaterEncoding::default()).unwrap();
        let reg = regions(vec![30, 10, 20, 30, 10, 20, 30, 10, 20], 3, 3);

        let rows =
            summarize_transitions(&reg, &masks, &AggregateParams::default(), None).unwrap();
        let ids: Vec<u32> = rows.iter().map(|r| r.region_id).collect();
        assert_eq!(ids, vec![10, 20, 30]);
    }

    #[test]
    fn test_area_scales_with_pixel_size_squared() {
        let p1 = raster(vec![3, 3, 1, 2], 2, 2);
        let p2 = raster(vec![1, 2, 1, 3], 2, 2);
        let masks = classify_transitions(&p1, &p2, &WaterEncoding::default()).unwrap();
        let reg = regions(vec![5; 4], 2, 2);

        let base = summarize_transitions(
            &reg,
            &masks,
            &AggregateParams { pixel_size: 30.0 },
            None,
        )
        .unwrap();
        let doubled = summarize_transitions(
            &reg,
            &masks,
            &AggregateParams { pixel_size: 60.0 },
            None,
        )
        .unwrap();

        for kind in TransitionKind::ALL {
            assert_relative_eq!(
                doubled[0].transition_km2(kind),
                4.0 * base[0].transition_km2(kind)
            );
        }
    }

    #[test]
    fn test_idempotent() {
        let p1 = raster(vec![3, 2, 1, 2, 3, 1], 2, 3);
        let p2 = raster(vec![1, 3, 2, 2, 3, 3], 2, 3);
        let masks = classify_transitions(&p1, &p2, &WaterEncoding::default()).unwrap();
        let reg = regions(vec![1, 1, 2, 2, 3, 3], 2, 3);

        let a = summarize_transitions(&reg, &masks, &AggregateParams::default(), None).unwrap();
        let b = summarize_transitions(&reg, &masks, &AggregateParams::default(), None).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_shape_mismatch() {
        let p1 = raster(vec![1; 4], 2, 2);
        let p2 = raster(vec![1; 4], 2, 2);
        let masks = classify_transitions(&p1, &p2, &WaterEncoding::default()).unwrap();
        let reg = regions(vec![1; 6], 2, 3);

        let result = summarize_transitions(&reg, &masks, &AggregateParams::default(), None);
        assert!(matches!(result, Err(Error::ShapeMismatch { .. })));
    }

    #[test]
    fn test_progress_callback_sees_each_region() {
        let p1 = raster(vec![1; 4], 2, 2);
        let p2 = raster(vec![1; 4], 2, 2);
        let masks = classify_transitions(&p1, &p2, &WaterEncoding::default()).unwrap();
        let reg = regions(vec![2, 2, 8, 8], 2, 2);

        let seen = std::sync::Mutex::new(Vec::new());
        let observer = |id: u32, index: usize, total: usize| {
            seen.lock().unwrap().push((id, index, total));
        };

        summarize_transitions(&reg, &masks, &AggregateParams::default(), Some(&observer))
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![(2, 0, 2), (8, 1, 2)]);
    }
}
