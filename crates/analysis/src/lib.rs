//! # AquaShift Analysis
//!
//! Surface-water transition analysis over multi-temporal label rasters.
//!
//! The pipeline: per-period label rasters are collapsed to a single mode
//! raster each ([`mode`]), per-pixel state changes between the two periods
//! are classified into transition masks ([`transition`]), and the masks are
//! aggregated into per-watershed areas ([`aggregate`]), optionally
//! stratified by urbanization class ([`urban`]). [`report`] flattens the
//! per-region summaries into a tabular result.

pub mod aggregate;
mod maybe_rayon;
pub mod mode;
pub mod rasterize;
pub mod report;
pub mod transition;
pub mod urban;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::aggregate::{
        summarize_transitions, AggregateParams, ProgressFn, RegionSummary,
    };
    pub use crate::mode::pixel_mode;
    pub use crate::rasterize::rasterize;
    pub use crate::report::{Report, ReportRow};
    pub use crate::transition::{
        classify_transitions, Period, TransitionKind, TransitionMasks, WaterEncoding, WaterState,
    };
    pub use crate::urban::{
        summarize_transitions_urban, UrbanClass, UrbanEncoding, UrbanRegionSummary,
    };
    pub use aquashift_core::prelude::*;
}
