//! greensat CLI - green-space rasters from Sentinel-2 composites

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use greensat_algorithms::imagery::{ndvi, threshold};
use greensat_catalog::{BoundaryStore, Catalog, GeoTiffStore};
use greensat_core::io::{read_geotiff, write_geotiff, write_mask_geotiff};
use greensat_core::Raster;
use greensat_parallel::strategy::set_num_threads;
use greensat_pipeline::{Pipeline, PipelineConfig, RegionStatus};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "greensat")]
#[command(author, version, about = "Green-space rasters from cloud-masked Sentinel-2 composites", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Paths and settings that override the configuration file
#[derive(Args)]
struct Overrides {
    /// Configuration file (defaults apply when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Catalog manifest
    #[arg(long)]
    catalog: Option<PathBuf>,
    /// Boundary directory
    #[arg(long)]
    boundaries: Option<PathBuf>,
    /// Output root
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Worker threads
    #[arg(short, long)]
    threads: Option<usize>,
    /// Only process this group
    #[arg(short, long)]
    group: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline and export one raster per city
    Run {
        #[command(flatten)]
        overrides: Overrides,
        /// Write the run report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Write the default ten-city configuration
    InitConfig {
        /// Output file
        output: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// List the selected and joined scenes per city
    Scenes {
        #[command(flatten)]
        overrides: Overrides,
    },
    /// Print an NDVI percentile per city, the statistic thresholds are picked from
    Calibrate {
        #[command(flatten)]
        overrides: Overrides,
        /// Percentile in [0, 100]
        #[arg(short, long, default_value = "80")]
        percentile: f64,
    },
    /// NDVI of two single-band rasters
    Ndvi {
        /// Near-infrared raster
        nir: PathBuf,
        /// Red raster
        red: PathBuf,
        /// Output file
        output: PathBuf,
    },
    /// Binary mask where a raster is at least a value
    Threshold {
        /// Input raster
        input: PathBuf,
        /// Output file (1 / 0, 255 no-data)
        output: PathBuf,
        /// Threshold value
        #[arg(short, long, default_value = "0.5")]
        value: f64,
    },
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn read_raster(path: &Path) -> Result<Raster<f64>> {
    let pb = spinner("Reading raster...");
    let raster: Raster<f64> =
        read_geotiff(path).with_context(|| format!("Failed to read {}", path.display()))?;
    pb.finish_and_clear();
    info!("Input: {} x {}", raster.cols(), raster.rows());
    Ok(raster)
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

/// Configuration file (or defaults) with command line overrides applied
fn load_config(overrides: &Overrides) -> Result<PipelineConfig> {
    let mut config = match &overrides.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(path) = &overrides.catalog {
        config.catalog = path.clone();
    }
    if let Some(path) = &overrides.boundaries {
        config.boundaries = path.clone();
    }
    if let Some(path) = &overrides.output {
        config.output = path.clone();
    }
    if let Some(name) = &overrides.group {
        if config.group(name).is_none() {
            anyhow::bail!("Unknown group: {}", name);
        }
        config.groups.retain(|g| &g.name == name);
    }
    if let Some(threads) = overrides.threads {
        set_num_threads(threads);
    }
    config.validate()?;
    Ok(config)
}

/// Everything a pipeline reads from disk
struct Inputs {
    catalog: Catalog,
    store: GeoTiffStore,
    boundaries: BoundaryStore,
}

fn open_inputs(config: &PipelineConfig) -> Result<Inputs> {
    let pb = spinner("Loading catalog...");
    let catalog = Catalog::from_manifest(&config.catalog)
        .with_context(|| format!("Failed to load catalog {}", config.catalog.display()))?;
    pb.finish_and_clear();
    let store = GeoTiffStore::with_capacity(catalog.root(), config.band_cache);
    Ok(Inputs {
        catalog,
        store,
        boundaries: BoundaryStore::new(&config.boundaries),
    })
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Run { overrides, report } => {
            let config = load_config(&overrides)?;
            let inputs = open_inputs(&config)?;
            let pipeline = Pipeline::new(&config, &inputs.catalog, &inputs.store, &inputs.boundaries);

            let start = Instant::now();
            let pb = spinner("Processing regions...");
            let run = pipeline.run()?;
            pb.finish_and_clear();

            for region in &run.regions {
                match region.status {
                    RegionStatus::Exported => println!(
                        "{:<14} exported  {} scene(s), {} green of {} valid pixels -> {}",
                        region.region,
                        region.scenes.masked,
                        region.green_pixels,
                        region.valid_pixels,
                        region.output.as_deref().map(|p| p.display().to_string()).unwrap_or_default()
                    ),
                    RegionStatus::Failed => println!(
                        "{:<14} FAILED    {}",
                        region.region,
                        region.error.as_deref().unwrap_or("unknown error")
                    ),
                }
            }
            println!("  Processing time: {:.2?}", start.elapsed());

            if let Some(path) = report {
                run.save(&path)?;
                println!("Report saved to: {}", path.display());
            }
            let failed = run.failed().count();
            if failed > 0 {
                anyhow::bail!("{} of {} region(s) failed", failed, run.regions.len());
            }
        }

        Commands::InitConfig { output, force } => {
            if output.exists() && !force {
                anyhow::bail!("{} exists, use --force to overwrite", output.display());
            }
            PipelineConfig::default()
                .save(&output)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!("Configuration saved to: {}", output.display());
        }

        Commands::Scenes { overrides } => {
            let config = load_config(&overrides)?;
            let inputs = open_inputs(&config)?;
            let pipeline = Pipeline::new(&config, &inputs.catalog, &inputs.store, &inputs.boundaries);

            for group in &config.groups {
                let range = config.date_range_for(group);
                println!("Group {} {}", group.name, range);
                for region_config in &group.regions {
                    let prepared = pipeline
                        .load_region(region_config)
                        .and_then(|(region, _)| pipeline.scenes(&region, &range));
                    match prepared {
                        Ok(prepared) => {
                            println!(
                                "  {}: {} selected, {} joined",
                                region_config.name, prepared.counts.selected, prepared.counts.joined
                            );
                            for scene in &prepared.scenes {
                                let azimuth = scene
                                    .solar_azimuth()
                                    .map(|a| format!("{:.1}", a))
                                    .unwrap_or_else(|| "-".to_string());
                                println!("    {}  {}  azimuth {}", scene.id, scene.datetime.format("%Y-%m-%d"), azimuth);
                            }
                        }
                        Err(e) => println!("  {}: {}", region_config.name, e),
                    }
                }
            }
        }

        Commands::Calibrate { overrides, percentile } => {
            let config = load_config(&overrides)?;
            let inputs = open_inputs(&config)?;
            let pipeline = Pipeline::new(&config, &inputs.catalog, &inputs.store, &inputs.boundaries);

            for group in &config.groups {
                println!("Group {} (threshold {})", group.name, group.threshold);
                for region_config in &group.regions {
                    let pb = spinner(&format!("Compositing {}...", region_config.name));
                    let result = pipeline.calibrate(group, region_config, percentile);
                    pb.finish_and_clear();
                    match result {
                        Ok(Some(value)) => println!("  {}: p{} NDVI = {}", region_config.name, percentile, value),
                        Ok(None) => println!("  {}: no valid NDVI pixels", region_config.name),
                        Err(e) => println!("  {}: {}", region_config.name, e),
                    }
                }
            }
        }

        Commands::Ndvi { nir, red, output } => {
            let nir_raster = read_raster(&nir)?;
            let red_raster = read_raster(&red)?;
            let start = Instant::now();
            let result = ndvi(&nir_raster, &red_raster).context("Failed to calculate NDVI")?;
            let elapsed = start.elapsed();
            write_geotiff(&result, &output).context("Failed to write output")?;
            done("NDVI", &output, elapsed);
        }

        Commands::Threshold { input, output, value } => {
            let raster = read_raster(&input)?;
            let start = Instant::now();
            let result = threshold(&raster, value).context("Failed to threshold raster")?;
            let elapsed = start.elapsed();
            write_mask_geotiff(&result, &output).context("Failed to write output")?;
            done("Threshold", &output, elapsed);
        }

        Commands::Info { input } => {
            let raster = read_raster(&input)?;
            let (rows, cols) = raster.shape();
            let bounds = raster.bounds();
            let stats = raster.statistics();

            println!("File: {}", input.display());
            println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
            println!("Cell size: {}", raster.cell_size());
            println!(
                "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                bounds.min_x, bounds.min_y, bounds.max_x, bounds.max_y
            );
            if let Some(crs) = raster.crs() {
                println!("CRS: {}", crs);
            }
            if let Some(nodata) = raster.nodata() {
                println!("NoData: {}", nodata);
            }
            println!("\nStatistics:");
            if let Some(min) = stats.min {
                println!("  Min: {:.4}", min);
            }
            if let Some(max) = stats.max {
                println!("  Max: {:.4}", max);
            }
            if let Some(mean) = stats.mean {
                println!("  Mean: {:.4}", mean);
            }
            println!(
                "  Valid cells: {} ({:.1}%)",
                stats.valid_count,
                100.0 * stats.valid_count as f64 / raster.len() as f64
            );
        }
    }

    Ok(())
}
