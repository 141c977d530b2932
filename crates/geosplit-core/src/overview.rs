//! Overview preview of the converted image bands.
//!
//! Converted image bands are stacked as separate bands of a temporary mosaic, which the
//! engine then renders at a fraction of its native size as `overview.jpg`. The mosaic lives in
//! a scoped temporary directory and is removed whether rendering succeeds or not.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::classification::Classification;
use crate::engine::{PreviewFormat, RasterEngine};
use crate::error::OverviewBuildError;
use crate::paths::{container_stem, overview_path};
use crate::types::{ConversionOptions, ConversionResult, ConversionStatus};

/// Preview edge length as a percentage of the mosaic's.
pub const PREVIEW_SCALE_PERCENT: u32 = 10;

/// Output paths of converted two-dimensional image bands, in result order.
#[must_use]
pub fn overview_sources(results: &[ConversionResult]) -> Vec<PathBuf> {
    results
        .iter()
        .filter(|result| {
            result.status == ConversionStatus::Converted
                && result.subdataset.classification == Classification::ImageBand
                && result.subdataset.dimensionality() >= 2
        })
        .map(|result| result.output_path.clone())
        .collect()
}

/// Renders the overview preview of `container`.
///
/// Returns `Ok(None)` when overviews are disabled or no image band was converted.
///
/// # Errors
///
/// Returns [`OverviewBuildError`] if the temporary workspace, the mosaic or the preview
/// cannot be produced.
pub fn build_overview(
    engine: &dyn RasterEngine,
    container: &Path,
    results: &[ConversionResult],
    options: &ConversionOptions,
) -> Result<Option<PathBuf>, OverviewBuildError> {
    if !options.create_overview {
        return Ok(None);
    }
    let sources = overview_sources(results);
    if sources.is_empty() {
        debug!("No converted image bands, skipping overview");
        return Ok(None);
    }

    let destination = overview_path(container, options);
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).map_err(|source| OverviewBuildError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let workspace = tempfile::Builder::new()
        .prefix("geosplit-mosaic-")
        .tempdir()
        .map_err(OverviewBuildError::Workspace)?;
    let mosaic = workspace
        .path()
        .join(format!("{}.vrt", container_stem(container)));

    debug!("Stacking {} image bands into {}", sources.len(), mosaic.display());
    let rendered = engine
        .build_mosaic(&sources, &mosaic)
        .map_err(OverviewBuildError::Mosaic)
        .and_then(|()| {
            engine
                .render_preview(&mosaic, &destination, PREVIEW_SCALE_PERCENT, PreviewFormat::Jpeg)
                .map_err(|source| OverviewBuildError::Preview {
                    path: destination.clone(),
                    source,
                })
        });

    if let Err(e) = workspace.close() {
        warn!("Could not remove temporary mosaic directory: {e}");
    }
    rendered?;

    info!("Overview image generated at: {}", destination.display());
    Ok(Some(destination))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{MemoryContainer, MemoryEngine};
    use crate::types::{ConversionTask, RasterDimensions, SubdatasetDescriptor};
    use tempfile::TempDir;

    fn result(dir: &Path, name: &str, width: usize, status: ConversionStatus) -> ConversionResult {
        let mut descriptor = SubdatasetDescriptor::new(name, "", name);
        descriptor.dimensions = RasterDimensions {
            width,
            height: width,
            band_count: 1,
        };
        let task = ConversionTask {
            descriptor,
            output_path: dir.join(format!("{name}.tif")),
        };
        match status {
            ConversionStatus::Converted => {
                fs::write(&task.output_path, b"band").unwrap();
                ConversionResult::converted(&task, Some(4))
            },
            ConversionStatus::Skipped => ConversionResult::skipped(&task),
            ConversionStatus::Failed => ConversionResult::failed(&task, "boom"),
        }
    }

    fn engine() -> MemoryEngine {
        MemoryEngine::new().with_container("scene.h5", MemoryContainer::new())
    }

    #[test]
    fn test_sources_are_converted_image_rasters() {
        let dir = TempDir::new().unwrap();
        let results = vec![
            result(dir.path(), "IMG_VIS", 8, ConversionStatus::Converted),
            result(dir.path(), "IMG_SWIR", 8, ConversionStatus::Skipped),
            result(dir.path(), "IMG_LINE", 1, ConversionStatus::Converted),
            result(dir.path(), "Latitude", 8, ConversionStatus::Converted),
            result(dir.path(), "IMG_MIR", 8, ConversionStatus::Converted),
        ];
        assert_eq!(
            overview_sources(&results),
            vec![dir.path().join("IMG_VIS.tif"), dir.path().join("IMG_MIR.tif")]
        );
    }

    #[test]
    fn test_overview_written_and_mosaic_removed() {
        let dir = TempDir::new().unwrap();
        let results = vec![result(dir.path(), "IMG_VIS", 8, ConversionStatus::Converted)];
        let options = ConversionOptions::default().with_output_directory(dir.path().join("out"));
        let engine = engine();

        let overview = build_overview(&engine, Path::new("scene.h5"), &results, &options)
            .unwrap()
            .unwrap();
        assert_eq!(overview, dir.path().join("out/scene/overview.jpg"));
        assert!(overview.is_file());

        let mosaics = engine.mosaics_built();
        assert_eq!(mosaics.len(), 1);
        assert!(!mosaics[0].exists());
        assert!(!mosaics[0].parent().unwrap().exists());
    }

    #[test]
    fn test_mosaic_removed_on_failure() {
        let dir = TempDir::new().unwrap();
        let results = vec![result(dir.path(), "IMG_VIS", 8, ConversionStatus::Converted)];
        let options = ConversionOptions::default().with_output_directory(dir.path().join("out"));
        let engine = engine().failing_preview();

        let err = build_overview(&engine, Path::new("scene.h5"), &results, &options).unwrap_err();
        assert!(matches!(err, OverviewBuildError::Preview { .. }));
        assert!(!engine.mosaics_built()[0].exists());
        assert!(!dir.path().join("out/scene/overview.jpg").exists());
    }

    #[test]
    fn test_disabled_or_empty_yields_none() {
        let dir = TempDir::new().unwrap();
        let results = vec![result(dir.path(), "IMG_VIS", 8, ConversionStatus::Converted)];
        let options = ConversionOptions::default()
            .with_output_directory(dir.path().join("out"))
            .with_overview(false);
        assert_eq!(
            build_overview(&engine(), Path::new("scene.h5"), &results, &options).unwrap(),
            None
        );

        let options = options.with_overview(true);
        let only_failed = vec![result(dir.path(), "IMG_SWIR", 8, ConversionStatus::Failed)];
        assert_eq!(
            build_overview(&engine(), Path::new("scene.h5"), &only_failed, &options).unwrap(),
            None
        );
        assert!(!dir.path().join("out").exists());
    }
}
