//! Data types for the subdataset conversion pipeline.
//!
//! This module defines the descriptors produced by the catalog builder, the immutable
//! [`ConversionOptions`] snapshot, and the task/result pair exchanged with the orchestrator.
//! Serialized field names follow the manifest schema (camelCase).

use std::num::NonZeroUsize;
use std::path::PathBuf;

use serde::Serialize;

use crate::classification::Classification;
use crate::error::ConfigError;

/// Coordinate reference assigned when a sub-resource reports none.
pub const DEFAULT_CRS: &str = "EPSG:4326";

/// Identity transform used when a sub-resource reports no geotransform.
pub const IDENTITY_TRANSFORM: [f64; 6] = [0.0, 1.0, 0.0, 0.0, 0.0, 1.0];

/// Pixel extent of a sub-resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RasterDimensions {
    /// Columns
    pub width: usize,
    /// Rows
    pub height: usize,
    /// Number of raster bands
    #[serde(rename = "bands")]
    pub band_count: usize,
}

impl RasterDimensions {
    /// `2` when both axes span more than one cell, `1` otherwise.
    #[must_use]
    pub fn dimensionality(&self) -> u8 {
        if self.width > 1 && self.height > 1 { 2 } else { 1 }
    }
}

/// Spatial reference and affine transform of a sub-resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoReference {
    /// Coordinate reference string (WKT or authority code)
    pub crs: String,
    /// GDAL-style geotransform `[origin_x, pixel_w, rot_x, origin_y, rot_y, pixel_h]`
    pub transform: [f64; 6],
}

impl Default for GeoReference {
    fn default() -> Self {
        Self {
            crs: DEFAULT_CRS.to_string(),
            transform: IDENTITY_TRANSFORM,
        }
    }
}

/// Block size hint recorded for tiled outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TileInfo {
    /// Tile width in pixels
    pub tile_width: u32,
    /// Tile height in pixels
    pub tile_height: u32,
}

/// Band semantics, only present on [`Classification::ImageBand`] descriptors.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BandInfo {
    /// Band identifier, e.g. `VIS` for `IMG_VIS_RADIANCE`
    pub band_name: String,
    /// Remainder after the band identifier, e.g. `RADIANCE`
    pub band_type: String,
    /// Spectral role, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Central wavelength, when known
    #[serde(rename = "wavelength_nm", skip_serializing_if = "Option::is_none")]
    pub wavelength_nm: Option<f64>,
}

/// Acquisition context of a sub-resource, when the producer exposes it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcquisitionInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acquisition_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub satellite: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensor: Option<String>,
}

impl AcquisitionInfo {
    /// Returns `true` when no acquisition field is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.acquisition_time.is_none() && self.satellite.is_none() && self.sensor.is_none()
    }
}

/// One named sub-resource discovered inside a container.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubdatasetDescriptor {
    /// Display name derived from the engine reference
    pub name: String,
    /// Category derived from `name` and `description`
    #[serde(rename = "type")]
    pub classification: Classification,
    /// Producer-supplied description
    pub description: String,
    /// Engine reference used to open the sub-resource
    pub source: String,
    /// Pixel extent; zeroed when the sub-resource could not be opened
    pub dimensions: RasterDimensions,
    /// Spatial reference and transform
    pub geospatial: GeoReference,
    /// Engine data type name of the first band
    #[serde(rename = "dtype", skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tile_info: Option<TileInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub band_info: Option<BandInfo>,
    #[serde(skip_serializing_if = "AcquisitionInfo::is_empty")]
    pub acquisition: AcquisitionInfo,
}

impl SubdatasetDescriptor {
    /// Creates a descriptor with zeroed geometry, classified from its name and description.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>, source: impl Into<String>) -> Self {
        let name = name.into();
        let description = description.into();
        let classification = Classification::classify(&name, &description);
        let band_info = match classification {
            Classification::ImageBand => Some(BandInfo::from_name(&name)),
            Classification::Geolocation
            | Classification::QualityFlag
            | Classification::TimeData
            | Classification::Auxiliary
            | Classification::Unknown => None,
        };
        Self {
            name,
            classification,
            description,
            source: source.into(),
            dimensions: RasterDimensions::default(),
            geospatial: GeoReference::default(),
            data_type: None,
            tile_info: None,
            band_info,
            acquisition: AcquisitionInfo::default(),
        }
    }

    /// `1` for scalar/array sub-resources, `2` for rasters.
    #[must_use]
    pub fn dimensionality(&self) -> u8 {
        self.dimensions.dimensionality()
    }
}

impl BandInfo {
    /// Splits an `IMG_<band>[_<type>]` name into band name and band type.
    ///
    /// Names without the exact `IMG_` prefix yield empty fields.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        let Some(rest) = name.strip_prefix("IMG_") else {
            return Self::default();
        };
        let (band_name, band_type) = rest.split_once('_').unwrap_or((rest, ""));
        Self {
            band_name: band_name.to_string(),
            band_type: band_type.to_string(),
            role: None,
            wavelength_nm: None,
        }
    }
}

/// Compression codec applied to tiled raster outputs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Compression {
    #[default]
    Lzw,
    Deflate,
    Zstd,
    None,
}

impl Compression {
    /// Codec name as understood by the raster engine.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lzw => "LZW",
            Self::Deflate => "DEFLATE",
            Self::Zstd => "ZSTD",
            Self::None => "NONE",
        }
    }

    /// Only DEFLATE and ZSTD take a compression level.
    #[must_use]
    pub fn supports_level(&self) -> bool {
        matches!(self, Self::Deflate | Self::Zstd)
    }
}

/// One inclusion flag per [`Classification`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryFilter {
    #[serde(rename = "convertImageBands")]
    pub image_bands: bool,
    #[serde(rename = "convertGeolocation")]
    pub geolocation: bool,
    #[serde(rename = "convertQualityFlags")]
    pub quality_flags: bool,
    #[serde(rename = "convertTimeData")]
    pub time_data: bool,
    #[serde(rename = "convertAuxiliary")]
    pub auxiliary: bool,
    #[serde(rename = "convertUnknown")]
    pub unknown: bool,
}

impl CategoryFilter {
    /// Every category enabled.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            image_bands: true,
            geolocation: true,
            quality_flags: true,
            time_data: true,
            auxiliary: true,
            unknown: true,
        }
    }

    /// Every category disabled.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            image_bands: false,
            geolocation: false,
            quality_flags: false,
            time_data: false,
            auxiliary: false,
            unknown: false,
        }
    }

    /// Returns the flag governing `classification`.
    #[must_use]
    pub fn includes(&self, classification: Classification) -> bool {
        match classification {
            Classification::ImageBand => self.image_bands,
            Classification::Geolocation => self.geolocation,
            Classification::QualityFlag => self.quality_flags,
            Classification::TimeData => self.time_data,
            Classification::Auxiliary => self.auxiliary,
            Classification::Unknown => self.unknown,
        }
    }
}

impl Default for CategoryFilter {
    fn default() -> Self {
        Self::all()
    }
}

/// Immutable configuration snapshot for one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionOptions {
    /// Root directory receiving one sub-directory per container
    pub output_directory: PathBuf,
    /// Replace outputs that already exist
    pub overwrite: bool,
    /// Place outputs in one folder per classification
    #[serde(rename = "groupByBand")]
    pub group_by_classification: bool,
    /// Tile edge length of tiled raster outputs
    pub block_size: u32,
    /// Codec of tiled raster outputs
    #[serde(rename = "compress")]
    pub compression: Compression,
    /// Codec level, honoured by DEFLATE and ZSTD only
    pub compression_level: u8,
    /// Worker count; `None` uses the host's available parallelism
    #[serde(rename = "numThreads")]
    pub threads: Option<usize>,
    /// Build `overview.jpg` from converted image bands
    pub create_overview: bool,
    /// Per-classification inclusion flags
    #[serde(flatten)]
    pub include: CategoryFilter,
    /// Subdataset name patterns. Recorded in the manifest but not applied by selection.
    #[serde(rename = "subdatasetPatterns", skip_serializing_if = "Vec::is_empty")]
    pub name_patterns: Vec<String>,
    /// Print the catalog instead of converting
    #[serde(skip)]
    pub list_only: bool,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            output_directory: PathBuf::from("output"),
            overwrite: false,
            group_by_classification: true,
            block_size: 512,
            compression: Compression::Lzw,
            compression_level: 6,
            threads: None,
            create_overview: true,
            include: CategoryFilter::all(),
            name_patterns: Vec::new(),
            list_only: false,
        }
    }
}

impl ConversionOptions {
    #[must_use]
    pub fn with_output_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_directory = dir.into();
        self
    }

    #[must_use]
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    #[must_use]
    pub fn with_grouping(mut self, group: bool) -> Self {
        self.group_by_classification = group;
        self
    }

    #[must_use]
    pub fn with_block_size(mut self, block_size: u32) -> Self {
        self.block_size = block_size;
        self
    }

    #[must_use]
    pub fn with_compression(mut self, compression: Compression, level: u8) -> Self {
        self.compression = compression;
        self.compression_level = level;
        self
    }

    #[must_use]
    pub fn with_threads(mut self, threads: Option<usize>) -> Self {
        self.threads = threads;
        self
    }

    #[must_use]
    pub fn with_overview(mut self, create: bool) -> Self {
        self.create_overview = create;
        self
    }

    #[must_use]
    pub fn with_categories(mut self, include: CategoryFilter) -> Self {
        self.include = include;
        self
    }

    #[must_use]
    pub fn with_name_patterns(mut self, patterns: Vec<String>) -> Self {
        self.name_patterns = patterns;
        self
    }

    #[must_use]
    pub fn with_list_only(mut self, list_only: bool) -> Self {
        self.list_only = list_only;
        self
    }

    /// Resolved worker-pool size.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.threads
            .filter(|&n| n > 0)
            .unwrap_or_else(|| std::thread::available_parallelism().map_or(1, NonZeroUsize::get))
    }

    /// Checks option ranges before a run starts.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOption`] for a block size that is not a power of two in
    /// `64..=4096`, a compression level outside `1..=22`, or a zero thread count.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(64..=4096).contains(&self.block_size) || !self.block_size.is_power_of_two() {
            return Err(ConfigError::InvalidOption {
                option: "block size".to_string(),
                message: format!(
                    "{} is not a power of two between 64 and 4096",
                    self.block_size
                ),
            });
        }
        if !(1..=22).contains(&self.compression_level) {
            return Err(ConfigError::InvalidOption {
                option: "compression level".to_string(),
                message: format!("{} is outside 1..=22", self.compression_level),
            });
        }
        if self.threads == Some(0) {
            return Err(ConfigError::InvalidOption {
                option: "threads".to_string(),
                message: "at least one worker is required".to_string(),
            });
        }
        Ok(())
    }
}

/// A selected descriptor paired with its planned output path.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionTask {
    pub descriptor: SubdatasetDescriptor,
    pub output_path: PathBuf,
}

/// Outcome of one conversion task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConversionStatus {
    Converted,
    Skipped,
    Failed,
}

impl ConversionStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Converted => "Converted",
            Self::Skipped => "Skipped",
            Self::Failed => "Failed",
        }
    }
}

/// Size and integrity information about a produced artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    /// Never populated: no hash algorithm is defined for artifacts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

/// One entry of the manifest `files` list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResult {
    pub subdataset: SubdatasetDescriptor,
    pub status: ConversionStatus,
    pub output_path: PathBuf,
    pub file_info: FileInfo,
    /// Failure reason for `Failed` results
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConversionResult {
    #[must_use]
    pub fn converted(task: &ConversionTask, size_bytes: Option<u64>) -> Self {
        Self {
            subdataset: task.descriptor.clone(),
            status: ConversionStatus::Converted,
            output_path: task.output_path.clone(),
            file_info: FileInfo {
                size_bytes,
                checksum: None,
            },
            error: None,
        }
    }

    #[must_use]
    pub fn skipped(task: &ConversionTask) -> Self {
        Self {
            subdataset: task.descriptor.clone(),
            status: ConversionStatus::Skipped,
            output_path: task.output_path.clone(),
            file_info: FileInfo::default(),
            error: None,
        }
    }

    #[must_use]
    pub fn failed(task: &ConversionTask, reason: impl ToString) -> Self {
        Self {
            subdataset: task.descriptor.clone(),
            status: ConversionStatus::Failed,
            output_path: task.output_path.clone(),
            file_info: FileInfo::default(),
            error: Some(reason.to_string()),
        }
    }
}
