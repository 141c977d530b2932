//! Command-line interface for `geosplit`, a converter that splits multi-subdataset geospatial
//! containers into individually addressable artifacts.
//!
//! This binary provides a user-friendly CLI over the [`geosplit_core`] library: every input
//! container is catalogued, filtered by category, converted in parallel and described by a
//! `manifest.json` in its own output directory.
//!
//! # Architecture
//!
//! The CLI is built using [`clap`] for argument parsing and [`tracing`] for structured logging.
//! It acts as a thin façade that parses arguments, configures logging, picks a raster engine and
//! delegates to [`geosplit_core::operations::BatchRunner`].
//!
//! # Examples
//!
//! ```text
//! geosplit --list scene.h5
//! geosplit -o out --compress zstd --level 9 --no-unknown scene.h5 other.h5
//! ```

mod display;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use tracing::{Level, info};
use tracing_log::LogTracer;
use tracing_subscriber::FmtSubscriber;

use geosplit_core::engine::RasterEngine;
use geosplit_core::error::GeoSplitError;
use geosplit_core::operations::BatchRunner;
use geosplit_core::types::{CategoryFilter, Compression, ConversionOptions};

#[derive(Parser)]
#[command(
    name = "geosplit",
    version,
    about = "Split multi-subdataset geospatial containers into tiled rasters and JSON arrays",
    long_about = "geosplit opens containers such as HDF5 satellite products, classifies every \
                  subdataset, converts the selected ones in parallel to tiled GeoTIFFs (rasters) \
                  or JSON (1-D arrays) and writes a manifest.json per container."
)]
/// Command-line arguments and options for the `geosplit` CLI.
///
/// Category flags are opt-out: every category is converted unless its `--no-*` flag is given.
struct Cli {
    /// Input container files.
    #[arg(value_name = "INPUT", required = true)]
    inputs: Vec<PathBuf>,

    /// List subdatasets instead of converting them.
    #[arg(long)]
    list: bool,

    /// Root output directory; each container gets its own sub-directory.
    #[arg(short, long = "outdir", value_name = "DIR", default_value = "output")]
    outdir: PathBuf,

    /// Replace output files that already exist.
    #[arg(long)]
    overwrite: bool,

    /// Write every output directly into the container directory instead of category folders.
    #[arg(long)]
    no_group: bool,

    /// Tile size of raster outputs (power of two, 64-4096).
    #[arg(long, value_name = "PIXELS", default_value_t = 512)]
    block_size: u32,

    /// Compression codec of raster outputs.
    #[arg(long, value_enum, default_value_t = CompressArg::Lzw)]
    compress: CompressArg,

    /// Compression level, used by deflate and zstd (1-22).
    #[arg(long, value_name = "LEVEL", default_value_t = 6)]
    level: u8,

    /// Number of worker threads (defaults to the number of CPUs).
    #[arg(short = 'j', long, value_name = "N")]
    threads: Option<usize>,

    /// Do not render overview.jpg.
    #[arg(long)]
    no_overview: bool,

    /// Skip image bands (IMG_*).
    #[arg(long)]
    no_image_bands: bool,

    /// Skip geolocation arrays.
    #[arg(long)]
    no_geolocation: bool,

    /// Skip quality and flag layers.
    #[arg(long)]
    no_quality_flags: bool,

    /// Skip time arrays.
    #[arg(long)]
    no_time_data: bool,

    /// Skip sun/satellite geometry and angles.
    #[arg(long)]
    no_auxiliary: bool,

    /// Skip unclassified subdatasets.
    #[arg(long)]
    no_unknown: bool,

    /// Subdataset name pattern, recorded in the manifest. Can be repeated.
    #[arg(long = "pattern", value_name = "PATTERN")]
    patterns: Vec<String>,

    /// Enable verbose (INFO level) logging output.
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug (DEBUG level) logging output with detailed diagnostics.
    #[arg(short, long)]
    debug: bool,
}

/// Codec choices accepted by `--compress`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CompressArg {
    Lzw,
    Deflate,
    Zstd,
    None,
}

impl From<CompressArg> for Compression {
    fn from(arg: CompressArg) -> Self {
        match arg {
            CompressArg::Lzw => Self::Lzw,
            CompressArg::Deflate => Self::Deflate,
            CompressArg::Zstd => Self::Zstd,
            CompressArg::None => Self::None,
        }
    }
}

impl Cli {
    /// Maps the parsed flags onto the library's option snapshot.
    fn conversion_options(&self) -> ConversionOptions {
        ConversionOptions::default()
            .with_output_directory(&self.outdir)
            .with_overwrite(self.overwrite)
            .with_grouping(!self.no_group)
            .with_block_size(self.block_size)
            .with_compression(self.compress.into(), self.level)
            .with_threads(self.threads)
            .with_overview(!self.no_overview)
            .with_categories(CategoryFilter {
                image_bands: !self.no_image_bands,
                geolocation: !self.no_geolocation,
                quality_flags: !self.no_quality_flags,
                time_data: !self.no_time_data,
                auxiliary: !self.no_auxiliary,
                unknown: !self.no_unknown,
            })
            .with_name_patterns(self.patterns.clone())
            .with_list_only(self.list)
    }
}

/// Entry point for the `geosplit` command-line interface.
///
/// This function parses command-line arguments, configures the logging system based on
/// verbosity flags, and runs the batch. Failing containers are reported but do not change
/// the exit status.
///
/// # Errors
///
/// Returns an error if the options are invalid, the logging system cannot be initialized or
/// the raster engine cannot be set up.
fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity flags
    let log_level = if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    };

    // Bridge logs from the `log` crate to the `tracing` ecosystem.
    LogTracer::init()?;

    // Logs go to stderr so that listings on stdout stay machine-readable.
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let options = cli.conversion_options();
    options.validate().map_err(report_fatal)?;

    let engine = raster_engine();
    info!("Processing {} input file(s)", cli.inputs.len());
    let report = BatchRunner::new(engine.as_ref(), &options)
        .run(&cli.inputs)
        .map_err(report_fatal)?;
    display::display_report(&report);

    Ok(())
}

/// Prints the recovery hint of an error that stops the whole run.
fn report_fatal(e: impl Into<GeoSplitError>) -> GeoSplitError {
    let e = e.into();
    if let Some(hint) = e.recovery_suggestion() {
        eprintln!("Hint: {hint}");
    }
    e
}

#[cfg(feature = "gdal")]
fn raster_engine() -> Box<dyn RasterEngine> {
    Box::new(geosplit_core::engine::GdalEngine::new())
}

#[cfg(not(feature = "gdal"))]
fn raster_engine() -> Box<dyn RasterEngine> {
    tracing::warn!("geosplit was built without GDAL; containers cannot be opened");
    Box::new(geosplit_core::engine::UnavailableEngine)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_flags_match_library_defaults() {
        let cli = Cli::try_parse_from(["geosplit", "scene.h5"]).unwrap();
        let options = cli.conversion_options();
        assert_eq!(options, ConversionOptions::default());
        assert_eq!(cli.inputs, vec![PathBuf::from("scene.h5")]);
    }

    #[test]
    fn test_flags_map_onto_options() {
        let cli = Cli::try_parse_from([
            "geosplit",
            "--outdir",
            "out",
            "--overwrite",
            "--no-group",
            "--block-size",
            "256",
            "--compress",
            "zstd",
            "--level",
            "9",
            "-j",
            "3",
            "--no-overview",
            "--no-unknown",
            "--no-time-data",
            "--pattern",
            "IMG_*",
            "--pattern",
            "Lat*",
            "--list",
            "a.h5",
            "b.h5",
        ])
        .unwrap();
        let options = cli.conversion_options();

        assert_eq!(options.output_directory, PathBuf::from("out"));
        assert!(options.overwrite);
        assert!(!options.group_by_classification);
        assert_eq!(options.block_size, 256);
        assert_eq!(options.compression, Compression::Zstd);
        assert_eq!(options.compression_level, 9);
        assert_eq!(options.threads, Some(3));
        assert!(!options.create_overview);
        assert!(!options.include.unknown);
        assert!(!options.include.time_data);
        assert!(options.include.image_bands);
        assert_eq!(options.name_patterns, ["IMG_*", "Lat*"]);
        assert!(options.list_only);
        assert_eq!(cli.inputs.len(), 2);
    }

    #[test]
    fn test_inputs_are_required() {
        assert!(Cli::try_parse_from(["geosplit", "--list"]).is_err());
    }

    #[test]
    fn test_invalid_options_lift_into_root_error() {
        let cli = Cli::try_parse_from(["geosplit", "--block-size", "100", "a.h5"]).unwrap();
        let err = report_fatal(cli.conversion_options().validate().unwrap_err());
        assert!(matches!(err, GeoSplitError::Config(_)));
        assert!(err.to_string().contains("block size"));
    }

    #[test]
    fn test_unknown_codec_is_rejected() {
        assert!(Cli::try_parse_from(["geosplit", "--compress", "jpeg", "a.h5"]).is_err());
    }
}
