//! GDAL-backed raster engine.
//!
//! Datasets are opened per call and dropped before returning, so one [`GdalEngine`] can be
//! shared by every worker thread. Tiled outputs go through the `COG` driver; the overview is a
//! `-separate` VRT mosaic that is resampled, stretched to bytes and encoded with the `image`
//! crate.

use std::path::{Path, PathBuf};

use gdal::cpl::CslStringList;
use gdal::programs::raster::{BuildVRTOptions, build_vrt};
use gdal::raster::ResampleAlg;
use gdal::{Dataset, DriverManager, Metadata, config};
use image::{ExtendedColorType, ImageFormat};

use super::{EngineResult, PreviewFormat, RasterEngine, RasterInfo, SUBDATASETS_DOMAIN, TilingOptions};
use crate::error::EngineError;

const NUM_THREADS_OPTION: &str = "GDAL_NUM_THREADS";
const READDIR_OPTION: &str = "GDAL_DISABLE_READDIR_ON_OPEN";

/// Engine using the system GDAL library.
#[derive(Debug, Clone, Copy, Default)]
pub struct GdalEngine;

impl GdalEngine {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn open(reference: &str) -> EngineResult<Dataset> {
        Dataset::open(Path::new(reference)).map_err(|e| EngineError::open(reference, e))
    }
}

fn config_error(e: gdal::errors::GdalError) -> EngineError {
    EngineError::Configuration {
        message: e.to_string(),
    }
}

impl RasterEngine for GdalEngine {
    fn name(&self) -> &'static str {
        "gdal"
    }

    fn initialize(&self, workers: usize) -> EngineResult<()> {
        DriverManager::register_all();
        config::set_config_option(NUM_THREADS_OPTION, &workers.to_string()).map_err(config_error)?;
        config::set_config_option(READDIR_OPTION, "EMPTY_DIR").map_err(config_error)?;
        log::debug!(
            "GDAL initialized with {} drivers, {NUM_THREADS_OPTION}={workers}",
            DriverManager::count()
        );
        Ok(())
    }

    fn shutdown(&self) {
        for key in [NUM_THREADS_OPTION, READDIR_OPTION] {
            if let Err(e) = config::clear_config_option(key) {
                log::warn!("Failed to clear {key}: {e}");
            }
        }
    }

    fn open_container(&self, path: &Path) -> EngineResult<Vec<String>> {
        let reference = path.display().to_string();
        let dataset = Dataset::open(path).map_err(|e| EngineError::open(&reference, e))?;
        Ok(dataset.metadata_domain(SUBDATASETS_DOMAIN).unwrap_or_default())
    }

    fn describe(&self, source: &str) -> EngineResult<RasterInfo> {
        let dataset = Self::open(source)?;
        let (width, height) = dataset.raster_size();
        let band_count = dataset.raster_count();

        let data_type = if band_count > 0 {
            let band = dataset
                .rasterband(1)
                .map_err(|e| EngineError::read(source, e))?;
            Some(band.band_type().name())
        } else {
            None
        };

        let projection = dataset.projection();
        Ok(RasterInfo {
            width,
            height,
            band_count,
            data_type,
            crs: (!projection.is_empty()).then_some(projection),
            transform: dataset.geo_transform().ok(),
        })
    }

    fn read_samples(&self, source: &str) -> EngineResult<Vec<f64>> {
        let dataset = Self::open(source)?;
        let band = dataset
            .rasterband(1)
            .map_err(|e| EngineError::read(source, e))?;
        let buffer = band
            .read_band_as::<f64>()
            .map_err(|e| EngineError::read(source, e))?;
        Ok(buffer.data().to_vec())
    }

    fn translate_tiled(
        &self,
        source: &str,
        destination: &Path,
        tiling: &TilingOptions,
    ) -> EngineResult<()> {
        let dest = destination.display().to_string();
        let dataset = Self::open(source)?;
        let driver = DriverManager::get_driver_by_name("COG").map_err(|e| EngineError::write(&dest, e))?;

        let mut options = CslStringList::new();
        let block_size = tiling.block_size.to_string();
        let level = tiling.level.map(|l| l.to_string());
        let mut entries = vec![
            ("BLOCKSIZE", block_size.as_str()),
            ("COMPRESS", tiling.compression.as_str()),
        ];
        if let Some(level) = level.as_deref() {
            entries.push(("LEVEL", level));
        }
        for (key, value) in entries {
            options
                .set_name_value(key, value)
                .map_err(|e| EngineError::write(&dest, e))?;
        }

        let output = dataset
            .create_copy(&driver, destination, &options)
            .map_err(|e| EngineError::write(&dest, e))?;
        output.close().map_err(|e| EngineError::write(&dest, e))
    }

    fn build_mosaic(&self, sources: &[PathBuf], destination: &Path) -> EngineResult<()> {
        let dest = destination.display().to_string();
        let datasets = sources
            .iter()
            .map(|path| {
                Dataset::open(path).map_err(|e| EngineError::open(path.display().to_string(), e))
            })
            .collect::<EngineResult<Vec<_>>>()?;

        let options = BuildVRTOptions::new(["-separate"]).map_err(|e| EngineError::write(&dest, e))?;
        let mosaic = build_vrt(Some(destination), &datasets, Some(options))
            .map_err(|e| EngineError::write(&dest, e))?;
        mosaic.close().map_err(|e| EngineError::write(&dest, e))
    }

    fn render_preview(
        &self,
        mosaic: &Path,
        destination: &Path,
        scale_percent: u32,
        format: PreviewFormat,
    ) -> EngineResult<()> {
        let reference = mosaic.display().to_string();
        let dest = destination.display().to_string();
        let dataset = Dataset::open(mosaic).map_err(|e| EngineError::open(&reference, e))?;

        let (width, height) = dataset.raster_size();
        let scaled = |size: usize| (size * scale_percent as usize / 100).max(1);
        let (out_width, out_height) = (scaled(width), scaled(height));

        // One band gives a grey preview, three or more give RGB from the first three.
        let channels = if dataset.raster_count() >= 3 { 3 } else { 1 };
        let mut planes = Vec::with_capacity(channels);
        for index in 1..=channels {
            let band = dataset
                .rasterband(index)
                .map_err(|e| EngineError::read(&reference, e))?;
            let buffer = band
                .read_as::<f64>(
                    (0, 0),
                    (width, height),
                    (out_width, out_height),
                    Some(ResampleAlg::Average),
                )
                .map_err(|e| EngineError::read(&reference, e))?;
            planes.push(stretch_to_bytes(buffer.data()));
        }

        let pixels = out_width * out_height;
        let mut interleaved = Vec::with_capacity(pixels * channels);
        for pixel in 0..pixels {
            interleaved.extend(planes.iter().map(|plane| plane[pixel]));
        }

        let color = if channels == 3 {
            ExtendedColorType::Rgb8
        } else {
            ExtendedColorType::L8
        };
        let image_format = match format {
            PreviewFormat::Jpeg => ImageFormat::Jpeg,
        };
        let (w, h) = (
            u32::try_from(out_width).map_err(|e| EngineError::write(&dest, e))?,
            u32::try_from(out_height).map_err(|e| EngineError::write(&dest, e))?,
        );
        image::save_buffer_with_format(destination, &interleaved, w, h, color, image_format)
            .map_err(|e| EngineError::write(&dest, e))
    }
}

/// Linearly maps the sample range onto `0..=255`. NaN samples become 0.
fn stretch_to_bytes(samples: &[f64]) -> Vec<u8> {
    let (min, max) = samples
        .iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let span = max - min;
    samples
        .iter()
        .map(|&v| {
            if !v.is_finite() || span.is_nan() || span <= 0.0 {
                0
            } else {
                (((v - min) / span) * 255.0).round() as u8
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stretch_to_bytes() {
        assert_eq!(stretch_to_bytes(&[0.0, 5.0, 10.0]), vec![0, 128, 255]);
        assert_eq!(stretch_to_bytes(&[3.0, 3.0]), vec![0, 0]);
        assert_eq!(stretch_to_bytes(&[f64::NAN, 1.0, 2.0]), vec![0, 0, 255]);
    }

    #[test]
    fn test_missing_container_fails_to_open() {
        let engine = GdalEngine::new();
        engine.initialize(1).unwrap();
        let err = engine
            .open_container(Path::new("/nonexistent/scene.h5"))
            .unwrap_err();
        assert!(matches!(err, EngineError::Open { .. }));
        engine.shutdown();
    }
}
