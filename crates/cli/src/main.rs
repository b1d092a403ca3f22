//! AquaShift CLI - surface water transition analysis

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use aquashift_analysis::aggregate::{summarize_transitions, AggregateParams};
use aquashift_analysis::mode::pixel_mode;
use aquashift_analysis::report::Report;
use aquashift_analysis::transition::{classify_transitions, WaterEncoding};
use aquashift_analysis::urban::{summarize_transitions_urban, UrbanEncoding};
use aquashift_core::io::{read_geotiff, write_geotiff, GeoTiffOptions};
use aquashift_core::Raster;

#[derive(Parser)]
#[command(name = "aquashift")]
#[command(author, version, about = "Surface water transition analysis", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
    /// Collapse a stack of label rasters into a per-pixel mode raster
    Mode {
        /// Input label rasters (repeatable)
        #[arg(short, long = "input", required = true)]
        inputs: Vec<PathBuf>,
        /// Output GeoTIFF
        #[arg(short, long)]
        output: PathBuf,
        /// Compression: LZW, DEFLATE or NONE
        #[arg(long, default_value = "LZW")]
        compression: String,
    },
    /// Per-watershed water transition areas between two periods
    Transitions {
        /// Period 1 water state raster
        #[arg(long)]
        period1: PathBuf,
        /// Period 2 water state raster
        #[arg(long)]
        period2: PathBuf,
        /// Watershed (HUC) region raster
        #[arg(long)]
        regions: PathBuf,
        /// Linear meters per pixel edge
        #[arg(long, default_value_t = 30.0)]
        pixel_size: f64,
        /// Output CSV
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Transition areas stratified by urbanization class
    Urban {
        /// Period 1 water state raster
        #[arg(long)]
        period1: PathBuf,
        /// Period 2 water state raster
        #[arg(long)]
        period2: PathBuf,
        /// Watershed (HUC) region raster
        #[arg(long)]
        regions: PathBuf,
        /// Urbanization class raster (0 non-urban, 1 gained, 2 stable)
        #[arg(long)]
        urban: PathBuf,
        /// Linear meters per pixel edge
        #[arg(long, default_value_t = 30.0)]
        pixel_size: f64,
        /// Output CSV
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default tracing subscriber")?;

    let start = Instant::now();

    match cli.command {
        Commands::Info { input } => cmd_info(&input)?,
        Commands::Mode {
            inputs,
            output,
            compression,
        } => cmd_mode(&inputs, &output, compression)?,
        Commands::Transitions {
            period1,
            period2,
            regions,
            pixel_size,
            output,
        } => cmd_transitions(&period1, &period2, &regions, pixel_size, &output)?,
        Commands::Urban {
            period1,
            period2,
            regions,
            urban,
            pixel_size,
            output,
        } => cmd_urban(&period1, &period2, &regions, &urban, pixel_size, &output)?,
    }

    info!("Done in {:.2?}", start.elapsed());
    Ok(())
}

fn cmd_info(input: &PathBuf) -> Result<()> {
    let raster: Raster<f64> =
        read_geotiff(input).with_context(|| format!("reading {}", input.display()))?;

    let (rows, cols) = raster.shape();
    let (min_x, min_y, max_x, max_y) = raster.bounds();
    let stats = raster.statistics();

    println!("File:       {}", input.display());
    println!("Size:       {} rows x {} cols", rows, cols);
    println!("Cell size:  {}", raster.cell_size());
    println!("Bounds:     ({}, {}) - ({}, {})", min_x, min_y, max_x, max_y);
    println!("Min/Max:    {:?} / {:?}", stats.min, stats.max);
    println!("Valid:      {} ({} nodata)", stats.valid_count, stats.nodata_count);

    Ok(())
}

fn cmd_mode(inputs: &[PathBuf], output: &PathBuf, compression: String) -> Result<()> {
    info!("Computing mode of {} rasters", inputs.len());

    let mut stack = Vec::with_capacity(inputs.len());
    for path in inputs {
        let raster: Raster<u8> =
            read_geotiff(path).with_context(|| format!("reading {}", path.display()))?;
        stack.push(raster);
    }

    let mode = pixel_mode(&stack)?;

    let options = GeoTiffOptions { compression };
    write_geotiff(&mode, output, &options)
        .with_context(|| format!("writing {}", output.display()))?;

    info!("Mode raster saved to {}", output.display());
    Ok(())
}

fn region_progress_bar() -> ProgressBar {
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template("{msg} [{bar:40.cyan/blue}] {pos}/{len}")
            .expect("valid progress template")
            .progress_chars("=> "),
    );
    bar.set_message("Aggregating watersheds");
    bar
}

fn cmd_transitions(
    period1: &PathBuf,
    period2: &PathBuf,
    regions: &PathBuf,
    pixel_size: f64,
    output: &PathBuf,
) -> Result<()> {
    let p1: Raster<u8> =
        read_geotiff(period1).with_context(|| format!("reading {}", period1.display()))?;
    let p2: Raster<u8> =
        read_geotiff(period2).with_context(|| format!("reading {}", period2.display()))?;
    let huc: Raster<u32> =
        read_geotiff(regions).with_context(|| format!("reading {}", regions.display()))?;

    info!("Classifying transitions over {:?} grid", p1.shape());
    let masks = classify_transitions(&p1, &p2, &WaterEncoding::default())?;

    let params = AggregateParams { pixel_size };
    let bar = region_progress_bar();
    let observer = |_id: u32, index: usize, total: usize| {
        if index == 0 {
            bar.set_length(total as u64);
        }
        bar.inc(1);
    };

    let rows = summarize_transitions(&huc, &masks, &params, Some(&observer))?;
    bar.finish_and_clear();
    info!("Aggregated {} watersheds", rows.len());

    let report = Report::from_rows(&rows);
    let file =
        File::create(output).with_context(|| format!("creating {}", output.display()))?;
    report.write_csv(file)?;

    info!("Report saved to {}", output.display());
    Ok(())
}

fn cmd_urban(
    period1: &PathBuf,
    period2: &PathBuf,
    regions: &PathBuf,
    urban: &PathBuf,
    pixel_size: f64,
    output: &PathBuf,
) -> Result<()> {
    let p1: Raster<u8> =
        read_geotiff(period1).with_context(|| format!("reading {}", period1.display()))?;
    let p2: Raster<u8> =
        read_geotiff(period2).with_context(|| format!("reading {}", period2.display()))?;
    let huc: Raster<u32> =
        read_geotiff(regions).with_context(|| format!("reading {}", regions.display()))?;
    let urban_raster: Raster<u8> =
        read_geotiff(urban).with_context(|| format!("reading {}", urban.display()))?;

    info!("Classifying transitions over {:?} grid", p1.shape());
    let masks = classify_transitions(&p1, &p2, &WaterEncoding::default())?;

    let params = AggregateParams { pixel_size };
    let bar = region_progress_bar();
    let observer = |_id: u32, index: usize, total: usize| {
        if index == 0 {
            bar.set_length(total as u64);
        }
        bar.inc(1);
    };

    let rows = summarize_transitions_urban(
        &huc,
        &masks,
        &urban_raster,
        &UrbanEncoding::default(),
        &params,
        Some(&observer),
    )?;
    bar.finish_and_clear();
    info!("Aggregated {} watersheds", rows.len());

    let report = Report::from_rows(&rows);
    let file =
        File::create(output).with_context(|| format!("creating {}", output.display()))?;
    report.write_csv(file)?;

    info!("Report saved to {}", output.display());
    Ok(())
}
