//! Water persistence transition classification
//!
//! Classifies per-pixel state combinations between two time snapshots into a
//! closed set of transition categories. The classifier is a pure function
//! over two aligned label rasters; all downstream aggregation consumes the
//! boolean masks produced here.

use aquashift_core::raster::Raster;
use aquashift_core::{Error, Result};
use ndarray::Array2;

use crate::maybe_rayon::*;

/// Water persistence state of a pixel within one time period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WaterState {
    NoWater,
    Seasonal,
    Permanent,
}

impl WaterState {
    /// All states, in label-code order
    pub const ALL: [WaterState; 3] = [
        WaterState::NoWater,
        WaterState::Seasonal,
        WaterState::Permanent,
    ];

    /// Index into per-state arrays
    pub fn index(self) -> usize {
        match self {
            WaterState::NoWater => 0,
            WaterState::Seasonal => 1,
            WaterState::Permanent => 2,
        }
    }

    /// Short field name used in reports
    pub fn name(self) -> &'static str {
        match self {
            WaterState::NoWater => "no_water",
            WaterState::Seasonal => "seasonal",
            WaterState::Permanent => "permanent",
        }
    }
}

/// Raster label codes for the three water states.
///
/// The codes are dataset configuration, not constants: they must match the
/// encoding used by the upstream mode-computation products. The default
/// matches the standard water persistence product (1/2/3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaterEncoding {
    pub no_water: u8,
    pub seasonal: u8,
    pub permanent: u8,
}

impl Default for WaterEncoding {
    fn default() -> Self {
        Self {
            no_water: 1,
            seasonal: 2,
            permanent: 3,
        }
    }
}

impl WaterEncoding {
    /// Decode a raster label. Labels outside the encoding return `None` and
    /// take part in no transition mask.
    pub fn state_of(&self, label: u8) -> Option<WaterState> {
        if label == self.no_water {
            Some(WaterState::NoWater)
        } else if label == self.seasonal {
            Some(WaterState::Seasonal)
        } else if label == self.permanent {
            Some(WaterState::Permanent)
        } else {
            None
        }
    }

    /// The label code for a state
    pub fn code(&self, state: WaterState) -> u8 {
        match state {
            WaterState::NoWater => self.no_water,
            WaterState::Seasonal => self.seasonal,
            WaterState::Permanent => self.permanent,
        }
    }
}

/// Ordered pair of distinct water states observed between period 1 and
/// period 2. Self-transitions (state unchanged) are never modeled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionKind {
    PermToNoWater,
    PermToSeasonal,
    SeasonalToNoWater,
    SeasonalToPerm,
    NoWaterToSeasonal,
    NoWaterToPerm,
}

impl TransitionKind {
    /// All transition kinds, drying first then wetting
    pub const ALL: [TransitionKind; 6] = [
        TransitionKind::PermToNoWater,
        TransitionKind::PermToSeasonal,
        TransitionKind::SeasonalToNoWater,
        TransitionKind::SeasonalToPerm,
        TransitionKind::NoWaterToSeasonal,
        TransitionKind::NoWaterToPerm,
    ];

    /// Index into per-kind arrays
    pub fn index(self) -> usize {
        match self {
            TransitionKind::PermToNoWater => 0,
            TransitionKind::PermToSeasonal => 1,
            TransitionKind::SeasonalToNoWater => 2,
            TransitionKind::SeasonalToPerm => 3,
            TransitionKind::NoWaterToSeasonal => 4,
            TransitionKind::NoWaterToPerm => 5,
        }
    }

    /// State in period 1
    pub fn source(self) -> WaterState {
        match self {
            TransitionKind::PermToNoWater | TransitionKind::PermToSeasonal => WaterState::Permanent,
            TransitionKind::SeasonalToNoWater | TransitionKind::SeasonalToPerm => {
                WaterState::Seasonal
            }
            TransitionKind::NoWaterToSeasonal | TransitionKind::NoWaterToPerm => WaterState::NoWater,
        }
    }

    /// State in period 2
    pub fn destination(self) -> WaterState {
        match self {
            TransitionKind::PermToNoWater | TransitionKind::SeasonalToNoWater => WaterState::NoWater,
            TransitionKind::PermToSeasonal | TransitionKind::NoWaterToSeasonal => {
                WaterState::Seasonal
            }
            TransitionKind::SeasonalToPerm | TransitionKind::NoWaterToPerm => WaterState::Permanent,
        }
    }

    /// Whether this transition represents a net loss of water permanence.
    /// The other three kinds represent a net gain.
    pub fn is_drying(self) -> bool {
        matches!(
            self,
            TransitionKind::PermToNoWater
                | TransitionKind::PermToSeasonal
                | TransitionKind::SeasonalToNoWater
        )
    }

    /// Classify an observed state pair. Returns `None` when the state did
    /// not change.
    pub fn from_states(source: WaterState, destination: WaterState) -> Option<TransitionKind> {
        use TransitionKind::*;
        use WaterState::*;
        match (source, destination) {
            (Permanent, NoWater) => Some(PermToNoWater),
            (Permanent, Seasonal) => Some(PermToSeasonal),
            (Seasonal, NoWater) => Some(SeasonalToNoWater),
            (Seasonal, Permanent) => Some(SeasonalToPerm),
            (NoWater, Seasonal) => Some(NoWaterToSeasonal),
            (NoWater, Permanent) => Some(NoWaterToPerm),
            _ => None,
        }
    }

    /// Field name used in reports
    pub fn name(self) -> &'static str {
        match self {
            TransitionKind::PermToNoWater => "perm_to_no_water",
            TransitionKind::PermToSeasonal => "perm_to_seasonal",
            TransitionKind::SeasonalToNoWater => "seasonal_to_no_water",
            TransitionKind::SeasonalToPerm => "seasonal_to_perm",
            TransitionKind::NoWaterToSeasonal => "no_water_to_seasonal",
            TransitionKind::NoWaterToPerm => "no_water_to_perm",
        }
    }
}

/// Which of the two compared periods a state mask belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    First,
    Second,
}

/// Boolean masks produced by [`classify_transitions`]: one grid per
/// transition kind plus one grid per (period, water state) pair.
///
/// The masks of the six transition kinds are pairwise disjoint: every pixel
/// is true in at most one of them.
#[derive(Debug, Clone)]
pub struct TransitionMasks {
    shape: (usize, usize),
    transitions: [Array2<bool>; 6],
    period1: [Array2<bool>; 3],
    period2: [Array2<bool>; 3],
}

impl TransitionMasks {
    /// Grid shape shared by every mask
    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    /// Mask of pixels undergoing the given transition
    pub fn transition(&self, kind: TransitionKind) -> &Array2<bool> {
        &self.transitions[kind.index()]
    }

    /// Mask of pixels holding the given state within a period
    pub fn water_state(&self, period: Period, state: WaterState) -> &Array2<bool> {
        match period {
            Period::First => &self.period1[state.index()],
            Period::Second => &self.period2[state.index()],
        }
    }
}

/// Classify per-pixel water state changes between two aligned label rasters.
///
/// Produces one boolean mask per [`TransitionKind`] plus per-period masks for
/// each [`WaterState`]. Pixels whose label in either period falls outside the
/// encoding are false in every transition mask.
///
/// # Errors
/// [`Error::ShapeMismatch`] when the two rasters differ in shape.
pub fn classify_transitions(
    period1: &Raster<u8>,
    period2: &Raster<u8>,
    encoding: &WaterEncoding,
) -> Result<TransitionMasks> {
    let (rows, cols) = period1.shape();
    if period2.shape() != (rows, cols) {
        return Err(Error::ShapeMismatch {
            er: rows,
            ec: cols,
            ar: period2.rows(),
            ac: period2.cols(),
        });
    }

    // Decode labels row-parallel, then fill the masks in one sequential
    // pass over the decoded states.
    let states: Vec<(Option<WaterState>, Option<WaterState>)> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_states = Vec::with_capacity(cols);
            for col in 0..cols {
                let before = encoding.state_of(unsafe { period1.get_unchecked(row, col) });
                let after = encoding.state_of(unsafe { period2.get_unchecked(row, col) });
                row_states.push((before, after));
            }
            row_states
        })
        .collect();

    let mut transitions: [Array2<bool>; 6] =
        std::array::from_fn(|_| Array2::from_elem((rows, cols), false));
    let mut p1_states: [Array2<bool>; 3] =
        std::array::from_fn(|_| Array2::from_elem((rows, cols), false));
    let mut p2_states: [Array2<bool>; 3] =
        std::array::from_fn(|_| Array2::from_elem((rows, cols), false));

    for (i, &(before, after)) in states.iter().enumerate() {
        let pixel = (i / cols, i % cols);

        if let Some(s) = before {
            p1_states[s.index()][pixel] = true;
        }
        if let Some(s) = after {
            p2_states[s.index()][pixel] = true;
        }

        if let (Some(src), Some(dst)) = (before, after) {
            if let Some(kind) = TransitionKind::from_states(src, dst) {
                transitions[kind.index()][pixel] = true;
            }
        }
    }

    Ok(TransitionMasks {
        shape: (rows, cols),
        transitions,
        period1: p1_states,
        period2: p2_states,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raster(data: Vec<u8>, rows: usize, cols: usize) -> Raster<u8> {
        Raster::from_vec(data, rows, cols).unwrap()
    }

    #[test]
    fn test_shape_mismatch() {
        let p1 = raster(vec![1; 4], 2, 2);
        let p2 = raster(vec![1; 6], 2, 3);
        let result = classify_transitions(&p1, &p2, &WaterEncoding::default());
        assert!(matches!(result, Err(Error::ShapeMismatch { .. })));
    }

    #[test]
    fn test_basic_transitions() {
        let p1 = raster(vec![3, 3, 1, 2], 2, 2);
        let p2 = raster(vec![1, 2, 1, 3], 2, 2);

        let masks = classify_transitions(&p1, &p2, &WaterEncoding::default()).unwrap();

        assert!(masks.transition(TransitionKind::PermToNoWater)[(0, 0)]);
        assert!(masks.transition(TransitionKind::PermToSeasonal)[(0, 1)]);
        assert!(masks.transition(TransitionKind::SeasonalToPerm)[(1, 1)]);

        // Pixel (1, 0) did not change state
        for kind in TransitionKind::ALL {
            assert!(!masks.transition(kind)[(1, 0)]);
        }
    }

    #[test]
    fn test_masks_pairwise_disjoint() {
        // Every state pair, including self-pairs and an out-of-enum label
        let p1 = raster(vec![1, 1, 1, 2, 2, 2, 3, 3, 3, 0, 1, 7], 3, 4);
        let p2 = raster(vec![1, 2, 3, 1, 2, 3, 1, 2, 3, 1, 0, 7], 3, 4);

        let masks = classify_transitions(&p1, &p2, &WaterEncoding::default()).unwrap();

        for row in 0..3 {
            for col in 0..4 {
                let hits = TransitionKind::ALL
                    .iter()
                    .filter(|k| masks.transition(**k)[(row, col)])
                    .count();
                assert!(hits <= 1, "pixel ({}, {}) in {} masks", row, col, hits);
            }
        }
    }

    #[test]
    fn test_out_of_enum_labels_excluded() {
        let p1 = raster(vec![0, 3, 255, 3], 2, 2);
        let p2 = raster(vec![1, 0, 1, 255], 2, 2);

        let masks = classify_transitions(&p1, &p2, &WaterEncoding::default()).unwrap();

        for kind in TransitionKind::ALL {
            assert_eq!(masks.transition(kind).iter().filter(|&&v| v).count(), 0);
        }

        // State masks only reflect valid labels
        assert!(masks.water_state(Period::Second, WaterState::NoWater)[(0, 0)]);
        assert!(masks.water_state(Period::First, WaterState::Permanent)[(0, 1)]);
        assert!(!masks.water_state(Period::First, WaterState::Permanent)[(1, 0)]);
    }

    #[test]
    fn test_custom_encoding() {
        let encoding = WaterEncoding {
            no_water: 10,
            seasonal: 20,
            permanent: 30,
        };
        let p1 = raster(vec![30], 1, 1);
        let p2 = raster(vec![10], 1, 1);

        let masks = classify_transitions(&p1, &p2, &encoding).unwrap();
        assert!(masks.transition(TransitionKind::PermToNoWater)[(0, 0)]);
    }

    #[test]
    fn test_classification_stable_across_runs() {
        // Larger grid so the row decode actually spans several chunks; the
        // masks must come out identical and in row-major position on every
        // run.
        let rows = 64;
        let cols = 37;
        let p1_data: Vec<u8> = (0..rows * cols).map(|i| (i % 5) as u8).collect();
        let p2_data: Vec<u8> = (0..rows * cols).map(|i| (i % 7) as u8).collect();
        let p1 = raster(p1_data, rows, cols);
        let p2 = raster(p2_data, rows, cols);

        let a = classify_transitions(&p1, &p2, &WaterEncoding::default()).unwrap();
        let b = classify_transitions(&p1, &p2, &WaterEncoding::default()).unwrap();

        for kind in TransitionKind::ALL {
            assert_eq!(a.transition(kind), b.transition(kind));
        }

        // Spot-check one pixel against a direct decode
        let row = 41;
        let col = 13;
        let enc = WaterEncoding::default();
        let expected = match (
            enc.state_of(p1.get(row, col).unwrap()),
            enc.state_of(p2.get(row, col).unwrap()),
        ) {
            (Some(s), Some(d)) => TransitionKind::from_states(s, d),
            _ => None,
        };
        for kind in TransitionKind::ALL {
            assert_eq!(a.transition(kind)[(row, col)], expected == Some(kind));
        }
    }

    #[test]
    fn test_kind_metadata_consistent() {
        for kind in TransitionKind::ALL {
            assert_eq!(
                TransitionKind::from_states(kind.source(), kind.destination()),
                Some(kind)
            );
            assert_ne!(kind.source(), kind.destination());
        }
        for state in WaterState::ALL {
            assert_eq!(TransitionKind::from_states(state, state), None);
        }
    }
}
