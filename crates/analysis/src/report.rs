//! Tabular report assembly
//!
//! Transposes an ordered sequence of per-region summaries into a flat table
//! with one column per named field. No aggregation happens here; the schema
//! is constant per summary variant.

use std::io::Write;

use aquashift_core::{Error, Result};

use crate::aggregate::RegionSummary;
use crate::urban::UrbanRegionSummary;

const PLAIN_HEADERS: &[&str] = &[
    "huc_id",
    "no_water_p1_km2",
    "seasonal_p1_km2",
    "permanent_p1_km2",
    "no_water_p2_km2",
    "seasonal_p2_km2",
    "permanent_p2_km2",
    "perm_to_no_water_km2",
    "perm_to_seasonal_km2",
    "seasonal_to_no_water_km2",
    "seasonal_to_perm_km2",
    "no_water_to_seasonal_km2",
    "no_water_to_perm_km2",
    "dry_total_km2",
    "wet_total_km2",
];

const URBAN_HEADERS: &[&str] = &[
    "huc_id",
    "no_water_p1_km2",
    "seasonal_p1_km2",
    "permanent_p1_km2",
    "no_water_p2_km2",
    "seasonal_p2_km2",
    "permanent_p2_km2",
    "perm_to_no_water_km2",
    "perm_to_seasonal_km2",
    "seasonal_to_no_water_km2",
    "seasonal_to_perm_km2",
    "no_water_to_seasonal_km2",
    "no_water_to_perm_km2",
    "dry_total_km2",
    "wet_total_km2",
    "region_pixels",
    "gained_urban_km2",
    "stable_urban_km2",
    "dry_gained_km2",
    "dry_stable_km2",
    "wet_gained_km2",
    "wet_stable_km2",
    "urbanization_pct",
];

/// A summary type that can be flattened into one table row
pub trait ReportRow {
    /// Column names, in row-value order
    fn headers() -> &'static [&'static str];

    /// Field values matching [`headers`](ReportRow::headers)
    fn values(&self) -> Vec<f64>;
}

impl ReportRow for RegionSummary {
    fn headers() -> &'static [&'static str] {
        PLAIN_HEADERS
    }

    fn values(&self) -> Vec<f64> {
        let mut row = Vec::with_capacity(PLAIN_HEADERS.len());
        row.push(self.region_id as f64);
        row.extend_from_slice(&self.period1_km2);
        row.extend_from_slice(&self.period2_km2);
        row.extend_from_slice(&self.transitions_km2);
        row.push(self.dry_km2());
        row.push(self.wet_km2());
        row
    }
}

impl ReportRow for UrbanRegionSummary {
    fn headers() -> &'static [&'static str] {
        URBAN_HEADERS
    }

    fn values(&self) -> Vec<f64> {
        let mut row = self.summary.values();
        row.push(self.region_pixels as f64);
        row.push(self.gained_urban_km2);
        row.push(self.stable_urban_km2);
        row.push(self.dry_gained_km2);
        row.push(self.dry_stable_km2);
        row.push(self.wet_gained_km2);
        row.push(self.wet_stable_km2);
        row.push(self.urbanization_percent);
        row
    }
}

/// A materialized tabular report
#[derive(Debug, Clone)]
pub struct Report {
    headers: &'static [&'static str],
    rows: Vec<Vec<f64>>,
}

impl Report {
    /// Build a report from an ordered slice of summaries. Row order is
    /// preserved as given.
    pub fn from_rows<R: ReportRow>(rows: &[R]) -> Self {
        Self {
            headers: R::headers(),
            rows: rows.iter().map(ReportRow::values).collect(),
        }
    }

    /// Column names
    pub fn headers(&self) -> &[&'static str] {
        self.headers
    }

    /// Row values
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Number of data rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the report holds no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Write the report as CSV
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv = csv::Writer::from_writer(writer);

        csv.write_record(self.headers)
            .map_err(|e| Error::Other(e.to_string()))?;

        for row in &self.rows {
            let record: Vec<String> = row.iter().map(|v| format!("{}", v)).collect();
            csv.write_record(&record)
                .map_err(|e| Error::Other(e.to_string()))?;
        }

        csv.flush()?;
        Ok(())
    }

    /// Render the report as a CSV string
    pub fn to_csv_string(&self) -> Result<String> {
        let mut buf = Vec::new();
        self.write_csv(&mut buf)?;
        String::from_utf8(buf).map_err(|e| Error::Other(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{summarize_transitions, AggregateParams};
    use crate::transition::{classify_transitions, WaterEncoding};
    use aquashift_core::Raster;

    fn scenario_summaries() -> Vec<RegionSummary> {
        let p1 = Raster::from_vec(vec![3u8, 3, 1, 2], 2, 2).unwrap();
        let p2 = Raster::from_vec(vec![1u8, 2, 1, 3], 2, 2).unwrap();
        let masks = classify_transitions(&p1, &p2, &WaterEncoding::default()).unwrap();
        let regions = Raster::from_vec(vec![5u32; 4], 2, 2).unwrap();
        summarize_transitions(&regions, &masks, &AggregateParams::default(), None).unwrap()
    }

    #[test]
    fn test_schema_matches_values() {
        let report = Report::from_rows(&scenario_summaries());
        assert_eq!(report.len(), 1);
        for row in report.rows() {
            assert_eq!(row.len(), report.headers().len());
        }
    }

    #[test]
    fn test_csv_output() {
        let report = Report::from_rows(&scenario_summaries());
        let csv = report.to_csv_string().unwrap();

        let mut lines = csv.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("huc_id,no_water_p1_km2"));

        let row = lines.next().unwrap();
        assert!(row.starts_with("5,"), "region id column: {}", row);
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_empty_report() {
        let summaries: Vec<RegionSummary> = Vec::new();
        let report = Report::from_rows(&summaries);
        assert!(report.is_empty());

        let csv = report.to_csv_string().unwrap();
        assert_eq!(csv.lines().count(), 1); // header only
    }
}
