//! End-to-end pipeline tests: mode rasters through classification,
//! aggregation and report assembly.

use approx::assert_relative_eq;
use aquashift_analysis::prelude::*;
use aquashift_core::Raster;

fn labels(data: Vec<u8>, rows: usize, cols: usize) -> Raster<u8> {
    Raster::from_vec(data, rows, cols).unwrap()
}

fn regions(data: Vec<u32>, rows: usize, cols: usize) -> Raster<u32> {
    Raster::from_vec(data, rows, cols).unwrap()
}

#[test]
fn mode_then_transitions_end_to_end() {
    // Three yearly observations per period, 2x2 grid, one watershed.
    let period1 = pixel_mode(&[
        labels(vec![3, 3, 1, 2], 2, 2),
        labels(vec![3, 3, 1, 2], 2, 2),
        labels(vec![1, 2, 1, 1], 2, 2),
    ])
    .unwrap();
    let period2 = pixel_mode(&[
        labels(vec![1, 2, 1, 3], 2, 2),
        labels(vec![1, 2, 1, 3], 2, 2),
        labels(vec![2, 1, 1, 3], 2, 2),
    ])
    .unwrap();

    assert_eq!(period1.data().as_slice().unwrap(), &[3, 3, 1, 2]);
    assert_eq!(period2.data().as_slice().unwrap(), &[1, 2, 1, 3]);

    let masks = classify_transitions(&period1, &period2, &WaterEncoding::default()).unwrap();
    let huc = regions(vec![5; 4], 2, 2);
    let rows = summarize_transitions(&huc, &masks, &AggregateParams::default(), None).unwrap();

    assert_eq!(rows.len(), 1);
    let r = &rows[0];
    let pixel = 900.0 / 1.0e6;
    assert_eq!(r.region_id, 5);
    assert_relative_eq!(r.transition_km2(TransitionKind::PermToNoWater), pixel);
    assert_relative_eq!(r.transition_km2(TransitionKind::PermToSeasonal), pixel);
    assert_relative_eq!(r.transition_km2(TransitionKind::SeasonalToPerm), pixel);
    assert_relative_eq!(r.dry_km2(), 2.0 * pixel);
    assert_relative_eq!(r.wet_km2(), pixel);

    let report = Report::from_rows(&rows);
    let csv = report.to_csv_string().unwrap();
    assert_eq!(csv.lines().count(), 2);
    assert!(csv.lines().nth(1).unwrap().starts_with("5,"));
}

#[test]
fn transition_area_bounded_by_region_area() {
    // Mixed labels over several regions; dry + wet can never exceed the
    // region's own footprint.
    let p1 = labels(vec![1, 2, 3, 1, 2, 3, 1, 2, 3, 0, 5, 1], 3, 4);
    let p2 = labels(vec![3, 1, 1, 2, 3, 2, 1, 1, 3, 1, 1, 2], 3, 4);
    let masks = classify_transitions(&p1, &p2, &WaterEncoding::default()).unwrap();
    let huc = regions(vec![1, 1, 1, 2, 2, 2, 3, 3, 3, 4, 4, 4], 3, 4);

    let params = AggregateParams::default();
    let rows = summarize_transitions(&huc, &masks, &params, None).unwrap();
    assert_eq!(rows.len(), 4);

    let pixel = params.pixel_km2();
    for (row, region_pixels) in rows.iter().zip([3usize, 3, 3, 3]) {
        let region_km2 = region_pixels as f64 * pixel;
        assert!(
            row.dry_km2() + row.wet_km2() <= region_km2 + 1e-12,
            "region {}: transitions exceed region area",
            row.region_id
        );
    }
}

#[test]
fn urban_pipeline_with_rasterized_regions() {
    use aquashift_core::GeoTransform;
    use geo_types::{polygon, Geometry};

    // Burn one watershed polygon covering the left half of a 2x4 grid.
    let gt = GeoTransform::new(0.0, 2.0, 1.0, -1.0);
    let west: Geometry<f64> = polygon![
        (x: 0.0, y: 0.0),
        (x: 2.0, y: 0.0),
        (x: 2.0, y: 2.0),
        (x: 0.0, y: 2.0),
        (x: 0.0, y: 0.0),
    ]
    .into();
    let huc = rasterize(&[(west, 17020004)], 2, 4, gt);
    assert_eq!(huc.count_equal(17020004), 4);

    let p1 = labels(vec![3, 3, 3, 3, 2, 2, 2, 2], 2, 4);
    let p2 = labels(vec![1, 1, 1, 1, 2, 2, 2, 2], 2, 4);
    let masks = classify_transitions(&p1, &p2, &WaterEncoding::default()).unwrap();

    let urban = labels(vec![1, 0, 0, 0, 2, 0, 0, 0], 2, 4);
    let rows = summarize_transitions_urban(
        &huc,
        &masks,
        &urban,
        &UrbanEncoding::default(),
        &AggregateParams::default(),
        None,
    )
    .unwrap();

    assert_eq!(rows.len(), 1);
    let r = &rows[0];
    let pixel = 900.0 / 1.0e6;

    assert_eq!(r.region_pixels, 4);
    assert_relative_eq!(r.urbanization_percent, 50.0);
    // Both in-region drying pixels sit in the top row; only (0,0) is urban.
    assert_relative_eq!(r.dry_gained_km2, pixel);
    assert_relative_eq!(r.dry_stable_km2, 0.0);
    assert_relative_eq!(r.summary.dry_km2(), 2.0 * pixel);

    let report = Report::from_rows(&rows);
    let csv = report.to_csv_string().unwrap();
    assert!(csv.lines().next().unwrap().ends_with("urbanization_pct"));
    assert!(csv.lines().nth(1).unwrap().starts_with("17020004,"));
}

#[test]
fn plain_and_urban_reports_share_base_columns() {
    let p1 = labels(vec![3, 1], 1, 2);
    let p2 = labels(vec![1, 1], 1, 2);
    let masks = classify_transitions(&p1, &p2, &WaterEncoding::default()).unwrap();
    let huc = regions(vec![1, 1], 1, 2);
    let urban = labels(vec![0, 0], 1, 2);

    let plain = summarize_transitions(&huc, &masks, &AggregateParams::default(), None).unwrap();
    let stratified = summarize_transitions_urban(
        &huc,
        &masks,
        &urban,
        &UrbanEncoding::default(),
        &AggregateParams::default(),
        None,
    )
    .unwrap();

    let plain_report = Report::from_rows(&plain);
    let urban_report = Report::from_rows(&stratified);

    let base = plain_report.headers();
    assert_eq!(&urban_report.headers()[..base.len()], base);
    assert_eq!(
        &urban_report.rows()[0][..base.len()],
        &plain_report.rows()[0][..]
    );
}
