//! In-memory raster engine.
//!
//! [`MemoryEngine`] serves scripted containers without touching any native library. Outputs
//! are written as small self-describing files so that sizes, skip decisions and cleanup can
//! be observed on disk. Individual sub-resources can be scripted to fail on open or on
//! write, and the mosaic/preview steps can be made to fail as a whole.
//!
//! # Examples
//!
//! ```
//! use std::path::Path;
//! use geosplit_core::engine::{MemoryContainer, MemoryEngine, MemoryRaster, RasterEngine};
//!
//! let engine = MemoryEngine::new().with_container(
//!     "scene.h5",
//!     MemoryContainer::new()
//!         .with_subdataset("IMG_VIS", "visible radiance", MemoryRaster::grid(4, 3))
//!         .with_subdataset("Scan_Line_Time", "scan times", MemoryRaster::array(vec![1.0, 2.0])),
//! );
//!
//! let entries = engine.open_container(Path::new("scene.h5")).unwrap();
//! assert_eq!(entries.len(), 4);
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use super::{EngineResult, PreviewFormat, RasterEngine, RasterInfo, TilingOptions};
use crate::error::EngineError;

/// One scripted sub-resource.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryRaster {
    pub width: usize,
    pub height: usize,
    pub band_count: usize,
    pub data_type: String,
    pub crs: Option<String>,
    pub transform: Option<[f64; 6]>,
    /// Row-major samples of the first band
    pub samples: Vec<f64>,
    pub fail_open: bool,
    pub fail_write: bool,
}

impl MemoryRaster {
    /// A single-band `Float32` grid whose samples count up from zero.
    #[must_use]
    pub fn grid(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            band_count: 1,
            data_type: "Float32".to_string(),
            crs: None,
            transform: None,
            samples: (0..width * height).map(|v| v as f64).collect(),
            fail_open: false,
            fail_write: false,
        }
    }

    /// A one-row `Float64` array holding `values`.
    #[must_use]
    pub fn array(values: Vec<f64>) -> Self {
        Self {
            width: values.len(),
            height: 1,
            band_count: 1,
            data_type: "Float64".to_string(),
            crs: None,
            transform: None,
            samples: values,
            fail_open: false,
            fail_write: false,
        }
    }

    #[must_use]
    pub fn with_crs(mut self, crs: impl Into<String>) -> Self {
        self.crs = Some(crs.into());
        self
    }

    #[must_use]
    pub fn with_transform(mut self, transform: [f64; 6]) -> Self {
        self.transform = Some(transform);
        self
    }

    #[must_use]
    pub fn with_bands(mut self, band_count: usize) -> Self {
        self.band_count = band_count;
        self
    }

    /// Opening this sub-resource fails.
    #[must_use]
    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    /// Describing succeeds but writing an output fails.
    #[must_use]
    pub fn failing_write(mut self) -> Self {
        self.fail_write = true;
        self
    }
}

/// A scripted container: named sub-resources plus any extra raw metadata entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryContainer {
    subdatasets: Vec<(String, String, MemoryRaster)>,
    extra_metadata: Vec<String>,
}

impl MemoryContainer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sub-resource. Ordinals follow insertion order, starting at 1.
    #[must_use]
    pub fn with_subdataset(
        mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        raster: MemoryRaster,
    ) -> Self {
        self.subdatasets
            .push((name.into(), description.into(), raster));
        self
    }

    /// Adds a raw `KEY=VALUE` entry to the subdataset metadata table.
    #[must_use]
    pub fn with_metadata_entry(mut self, entry: impl Into<String>) -> Self {
        self.extra_metadata.push(entry.into());
        self
    }
}

/// Record of the lifecycle calls a [`MemoryEngine`] has received.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Lifecycle {
    /// Number of `initialize` calls
    pub initialized: usize,
    /// Number of `shutdown` calls
    pub shut_down: usize,
    /// Worker count passed to the latest `initialize`
    pub workers: Option<usize>,
}

/// Engine backed by scripted in-memory containers.
#[derive(Debug, Default)]
pub struct MemoryEngine {
    containers: HashMap<PathBuf, Vec<String>>,
    rasters: HashMap<String, MemoryRaster>,
    fail_mosaic: bool,
    fail_preview: bool,
    mosaics: Mutex<Vec<PathBuf>>,
    lifecycle: Mutex<Lifecycle>,
}

impl MemoryEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `container` under `path`.
    ///
    /// Each sub-resource is addressed as `HDF5:"<path>"://<name>`.
    #[must_use]
    pub fn with_container(mut self, path: impl Into<PathBuf>, container: MemoryContainer) -> Self {
        let path = path.into();
        let mut metadata = Vec::new();
        for (index, (name, description, raster)) in container.subdatasets.into_iter().enumerate() {
            let source = format!("HDF5:\"{}\"://{name}", path.display());
            let ordinal = index + 1;
            metadata.push(format!("SUBDATASET_{ordinal}_NAME={source}"));
            metadata.push(format!("SUBDATASET_{ordinal}_DESC={description}"));
            self.rasters.insert(source, raster);
        }
        metadata.extend(container.extra_metadata);
        self.containers.insert(path, metadata);
        self
    }

    /// Mosaic construction fails.
    #[must_use]
    pub fn failing_mosaic(mut self) -> Self {
        self.fail_mosaic = true;
        self
    }

    /// Preview rendering fails.
    #[must_use]
    pub fn failing_preview(mut self) -> Self {
        self.fail_preview = true;
        self
    }

    /// Mosaic paths built so far, in call order.
    pub fn mosaics_built(&self) -> Vec<PathBuf> {
        self.mosaics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Counts of lifecycle calls.
    pub fn lifecycle(&self) -> Lifecycle {
        *self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn raster(&self, source: &str) -> EngineResult<&MemoryRaster> {
        match self.rasters.get(source) {
            Some(raster) if !raster.fail_open => Ok(raster),
            Some(_) => Err(EngineError::open(source, "scripted open failure")),
            None => Err(EngineError::open(source, "no such sub-resource")),
        }
    }
}

impl RasterEngine for MemoryEngine {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn initialize(&self, workers: usize) -> EngineResult<()> {
        let mut lifecycle = self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner);
        lifecycle.initialized += 1;
        lifecycle.workers = Some(workers);
        Ok(())
    }

    fn shutdown(&self) {
        self.lifecycle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .shut_down += 1;
    }

    fn open_container(&self, path: &Path) -> EngineResult<Vec<String>> {
        self.containers
            .get(path)
            .cloned()
            .ok_or_else(|| EngineError::open(path.display().to_string(), "not a registered container"))
    }

    fn describe(&self, source: &str) -> EngineResult<RasterInfo> {
        let raster = self.raster(source)?;
        Ok(RasterInfo {
            width: raster.width,
            height: raster.height,
            band_count: raster.band_count,
            data_type: (raster.band_count > 0).then(|| raster.data_type.clone()),
            crs: raster.crs.clone(),
            transform: raster.transform,
        })
    }

    fn read_samples(&self, source: &str) -> EngineResult<Vec<f64>> {
        Ok(self.raster(source)?.samples.clone())
    }

    fn translate_tiled(
        &self,
        source: &str,
        destination: &Path,
        tiling: &TilingOptions,
    ) -> EngineResult<()> {
        let raster = self.raster(source)?;
        if raster.fail_write {
            return Err(EngineError::write(
                destination.display().to_string(),
                "scripted write failure",
            ));
        }

        let level = tiling.level.map_or_else(|| "-".to_string(), |l| l.to_string());
        let mut bytes = format!(
            "GSTIFF\n{}x{}x{}\nblock={}\ncompress={}\nlevel={level}\n",
            raster.width,
            raster.height,
            raster.band_count,
            tiling.block_size,
            tiling.compression.as_str(),
        )
        .into_bytes();
        for sample in &raster.samples {
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
        fs::write(destination, bytes)
            .map_err(|e| EngineError::write(destination.display().to_string(), e))
    }

    fn build_mosaic(&self, sources: &[PathBuf], destination: &Path) -> EngineResult<()> {
        if self.fail_mosaic {
            return Err(EngineError::write(
                destination.display().to_string(),
                "scripted mosaic failure",
            ));
        }
        let mut listing = String::from("GSVRT separate\n");
        for source in sources {
            if !source.is_file() {
                return Err(EngineError::open(
                    source.display().to_string(),
                    "mosaic source does not exist",
                ));
            }
            listing.push_str(&source.display().to_string());
            listing.push('\n');
        }
        fs::write(destination, listing)
            .map_err(|e| EngineError::write(destination.display().to_string(), e))?;
        self.mosaics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(destination.to_path_buf());
        Ok(())
    }

    fn render_preview(
        &self,
        mosaic: &Path,
        destination: &Path,
        scale_percent: u32,
        format: PreviewFormat,
    ) -> EngineResult<()> {
        let listing = fs::read_to_string(mosaic)
            .map_err(|e| EngineError::read(mosaic.display().to_string(), e))?;
        if self.fail_preview {
            return Err(EngineError::write(
                destination.display().to_string(),
                "scripted preview failure",
            ));
        }
        let bands = listing.lines().skip(1).count();
        let preview = format!(
            "GS{} scale={scale_percent}% bands={bands}\n",
            format.extension().to_uppercase()
        );
        fs::write(destination, preview)
            .map_err(|e| EngineError::write(destination.display().to_string(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Compression;
    use tempfile::TempDir;

    fn engine() -> MemoryEngine {
        MemoryEngine::new().with_container(
            "scene.h5",
            MemoryContainer::new()
                .with_subdataset("IMG_VIS", "visible", MemoryRaster::grid(3, 2))
                .with_subdataset("Broken", "", MemoryRaster::grid(3, 2).failing_open())
                .with_metadata_entry("SUBDATASET_COUNT=2"),
        )
    }

    #[test]
    fn test_open_container_lists_metadata() {
        let entries = engine().open_container(Path::new("scene.h5")).unwrap();
        assert_eq!(
            entries,
            vec![
                "SUBDATASET_1_NAME=HDF5:\"scene.h5\"://IMG_VIS".to_string(),
                "SUBDATASET_1_DESC=visible".to_string(),
                "SUBDATASET_2_NAME=HDF5:\"scene.h5\"://Broken".to_string(),
                "SUBDATASET_2_DESC=".to_string(),
                "SUBDATASET_COUNT=2".to_string(),
            ]
        );
    }

    #[test]
    fn test_unknown_container_fails_to_open() {
        let err = engine().open_container(Path::new("other.h5")).unwrap_err();
        assert!(matches!(err, EngineError::Open { .. }));
    }

    #[test]
    fn test_describe_and_scripted_failure() {
        let engine = engine();
        let info = engine.describe("HDF5:\"scene.h5\"://IMG_VIS").unwrap();
        assert_eq!((info.width, info.height, info.band_count), (3, 2, 1));
        assert_eq!(info.data_type.as_deref(), Some("Float32"));
        assert!(engine.describe("HDF5:\"scene.h5\"://Broken").is_err());
    }

    #[test]
    fn test_translate_writes_header_and_samples() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("vis.tif");
        let tiling = TilingOptions {
            block_size: 256,
            compression: Compression::Zstd,
            level: Some(9),
        };
        engine()
            .translate_tiled("HDF5:\"scene.h5\"://IMG_VIS", &out, &tiling)
            .unwrap();

        let bytes = fs::read(&out).unwrap();
        let header = b"GSTIFF\n3x2x1\nblock=256\ncompress=ZSTD\nlevel=9\n";
        assert!(bytes.starts_with(header));
        assert_eq!(bytes.len(), header.len() + 6 * 8);
    }

    #[test]
    fn test_mosaic_and_preview() {
        let dir = TempDir::new().unwrap();
        let band = dir.path().join("band.tif");
        fs::write(&band, b"x").unwrap();
        let mosaic = dir.path().join("m.vrt");
        let preview = dir.path().join("overview.jpg");

        let engine = engine();
        engine.build_mosaic(&[band.clone(), band], &mosaic).unwrap();
        engine
            .render_preview(&mosaic, &preview, 10, PreviewFormat::Jpeg)
            .unwrap();

        assert_eq!(engine.mosaics_built(), vec![mosaic]);
        assert_eq!(
            fs::read_to_string(&preview).unwrap(),
            "GSJPG scale=10% bands=2\n"
        );
    }

    #[test]
    fn test_lifecycle_counts() {
        let engine = engine();
        engine.initialize(3).unwrap();
        engine.shutdown();
        assert_eq!(
            engine.lifecycle(),
            Lifecycle {
                initialized: 1,
                shut_down: 1,
                workers: Some(3),
            }
        );
    }
}
