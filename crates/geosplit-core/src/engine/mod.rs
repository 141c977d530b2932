//! Raster-access engine abstraction.
//!
//! The pipeline never decodes, reprojects or encodes pixels itself. Everything that touches
//! raster bytes goes through a [`RasterEngine`]: opening containers, describing
//! sub-resources, reading 1-D sample buffers, writing tiled outputs, and building the overview
//! mosaic. Implementations are shared across worker threads and must be `Send + Sync`; every
//! call is blocking.
//!
//! Engines:
//! - `MemoryEngine`: scripted in-memory containers for tests (cargo feature `test-util`).
//! - `GdalEngine`: the system GDAL library (cargo feature `gdal`).
//! - [`UnavailableEngine`]: rejects every container, used when no real engine is compiled in.

use std::path::{Path, PathBuf};

use crate::error::EngineError;
use crate::types::{Compression, ConversionOptions};

#[cfg(feature = "gdal")]
pub mod gdal_backend;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;

#[cfg(feature = "gdal")]
pub use gdal_backend::GdalEngine;
#[cfg(any(test, feature = "test-util"))]
pub use memory::{Lifecycle, MemoryContainer, MemoryEngine, MemoryRaster};

/// Result alias for engine calls.
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Metadata domain listing a container's sub-resources.
pub const SUBDATASETS_DOMAIN: &str = "SUBDATASETS";

/// Properties of one opened sub-resource.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RasterInfo {
    pub width: usize,
    pub height: usize,
    pub band_count: usize,
    /// Data type name of the first band, `None` without bands
    pub data_type: Option<String>,
    /// Coordinate reference; `None` or empty when the resource reports none
    pub crs: Option<String>,
    pub transform: Option<[f64; 6]>,
}

/// Creation settings for tiled raster outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TilingOptions {
    pub block_size: u32,
    pub compression: Compression,
    /// Only set for codecs that honour a level
    pub level: Option<u8>,
}

impl From<&ConversionOptions> for TilingOptions {
    fn from(options: &ConversionOptions) -> Self {
        Self {
            block_size: options.block_size,
            compression: options.compression,
            level: options
                .compression
                .supports_level()
                .then_some(options.compression_level),
        }
    }
}

/// Encoding of the overview preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewFormat {
    Jpeg,
}

impl PreviewFormat {
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
        }
    }
}

/// Blocking raster-access service consumed by the conversion pipeline.
pub trait RasterEngine: Send + Sync {
    /// Short engine name for logs.
    fn name(&self) -> &'static str;

    /// Process-wide setup (driver registration, thread hints). Called once per batch.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot be configured.
    fn initialize(&self, workers: usize) -> EngineResult<()>;

    /// Undo [`RasterEngine::initialize`]. Called once after the last container.
    fn shutdown(&self);

    /// Opens a container and returns its [`SUBDATASETS_DOMAIN`] metadata as `KEY=VALUE` strings.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Open`] if the container cannot be opened.
    fn open_container(&self, path: &Path) -> EngineResult<Vec<String>>;

    /// Opens a sub-resource and reads its dimensions, type and georeferencing.
    ///
    /// # Errors
    ///
    /// Returns an error if the sub-resource cannot be opened.
    fn describe(&self, source: &str) -> EngineResult<RasterInfo>;

    /// Reads every sample of the first band in row-major order.
    ///
    /// # Errors
    ///
    /// Returns an error if the sub-resource cannot be opened or read.
    fn read_samples(&self, source: &str) -> EngineResult<Vec<f64>>;

    /// Writes `source` as a tiled, compressed raster to `destination`.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be read or the output cannot be created.
    fn translate_tiled(
        &self,
        source: &str,
        destination: &Path,
        tiling: &TilingOptions,
    ) -> EngineResult<()>;

    /// Stacks `sources` as separate bands of one mosaic written to `destination`.
    ///
    /// # Errors
    ///
    /// Returns an error if any source cannot be opened or the mosaic cannot be written.
    fn build_mosaic(&self, sources: &[PathBuf], destination: &Path) -> EngineResult<()>;

    /// Downsamples `mosaic` to `scale_percent` of its size and encodes it to `destination`.
    ///
    /// # Errors
    ///
    /// Returns an error if the mosaic cannot be read or the preview cannot be written.
    fn render_preview(
        &self,
        mosaic: &Path,
        destination: &Path,
        scale_percent: u32,
        format: PreviewFormat,
    ) -> EngineResult<()>;
}

/// Engine used when no raster backend is compiled in.
///
/// Lifecycle calls succeed so a batch can run; every data call fails with
/// [`EngineError::Unsupported`], which the pipeline reports per container.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableEngine;

impl UnavailableEngine {
    fn unsupported<T>(operation: &str) -> EngineResult<T> {
        Err(EngineError::Unsupported {
            operation: operation.to_string(),
            message: "geosplit was built without a raster engine".to_string(),
        })
    }
}

impl RasterEngine for UnavailableEngine {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    fn initialize(&self, _workers: usize) -> EngineResult<()> {
        Ok(())
    }

    fn shutdown(&self) {}

    fn open_container(&self, _path: &Path) -> EngineResult<Vec<String>> {
        Self::unsupported("open_container")
    }

    fn describe(&self, _source: &str) -> EngineResult<RasterInfo> {
        Self::unsupported("describe")
    }

    fn read_samples(&self, _source: &str) -> EngineResult<Vec<f64>> {
        Self::unsupported("read_samples")
    }

    fn translate_tiled(&self, _: &str, _: &Path, _: &TilingOptions) -> EngineResult<()> {
        Self::unsupported("translate_tiled")
    }

    fn build_mosaic(&self, _: &[PathBuf], _: &Path) -> EngineResult<()> {
        Self::unsupported("build_mosaic")
    }

    fn render_preview(&self, _: &Path, _: &Path, _: u32, _: PreviewFormat) -> EngineResult<()> {
        Self::unsupported("render_preview")
    }
}
