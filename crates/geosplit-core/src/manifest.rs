//! Per-container manifest.
//!
//! The manifest records what was produced from one container: every conversion result in task
//! order, the status counts, the timing of the run and a snapshot of the options in effect.
//! It is assembled once, optionally given an overview path, and then persisted as
//! `manifest.json` next to the artifacts it describes.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::error::ManifestWriteError;
use crate::types::{ConversionOptions, ConversionResult, ConversionStatus};
use crate::utils::write_pretty_json;

/// Version recorded as `metadata.converterVersion`.
pub const CONVERTER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Status counts of one container run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub duration_ms: u64,
    pub total_subdatasets: usize,
    pub converted: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl Summary {
    /// Counts `results` by status in a single pass.
    #[must_use]
    pub fn tally(results: &[ConversionResult], duration: Duration) -> Self {
        let mut summary = Self {
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            total_subdatasets: results.len(),
            ..Self::default()
        };
        for result in results {
            match result.status {
                ConversionStatus::Converted => summary.converted += 1,
                ConversionStatus::Skipped => summary.skipped += 1,
                ConversionStatus::Failed => summary.failed += 1,
            }
        }
        summary
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestMetadata {
    pub converter_version: String,
    pub conversion_options: ConversionOptions,
}

/// Description of everything produced from one container.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// File name of the container
    pub input_file: String,
    /// UTC assembly time, RFC 3339 with second precision
    pub processing_timestamp: String,
    /// Serialized as `null` when no overview was produced
    pub overview_image: Option<PathBuf>,
    pub summary: Summary,
    pub files: Vec<ConversionResult>,
    pub metadata: ManifestMetadata,
}

impl Manifest {
    /// Builds the manifest of one container run.
    #[must_use]
    pub fn assemble(
        container: &Path,
        results: Vec<ConversionResult>,
        options: &ConversionOptions,
        duration: Duration,
    ) -> Self {
        Self {
            input_file: container.file_name().map_or_else(
                || container.display().to_string(),
                |name| name.to_string_lossy().into_owned(),
            ),
            processing_timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            overview_image: None,
            summary: Summary::tally(&results, duration),
            files: results,
            metadata: ManifestMetadata {
                converter_version: CONVERTER_VERSION.to_string(),
                conversion_options: options.clone(),
            },
        }
    }

    #[must_use]
    pub fn with_overview(mut self, overview: Option<PathBuf>) -> Self {
        self.overview_image = overview;
        self
    }

    /// Writes the manifest to `path` as pretty JSON, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestWriteError`] if the directory or file cannot be written.
    pub fn persist(&self, path: &Path) -> Result<(), ManifestWriteError> {
        let wrap = |source: std::io::Error| ManifestWriteError {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(wrap)?;
        }
        write_pretty_json(path, self).map_err(wrap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ConversionTask, SubdatasetDescriptor};
    use tempfile::TempDir;

    fn results() -> Vec<ConversionResult> {
        let task = |name: &str| ConversionTask {
            descriptor: SubdatasetDescriptor::new(name, "", name),
            output_path: PathBuf::from(format!("out/scene/{name}.tif")),
        };
        vec![
            ConversionResult::converted(&task("IMG_VIS"), Some(1024)),
            ConversionResult::skipped(&task("IMG_SWIR")),
            ConversionResult::failed(&task("Latitude"), "engine refused"),
            ConversionResult::converted(&task("Quality_Flag"), None),
        ]
    }

    #[test]
    fn test_tally_sums_to_total() {
        let summary = Summary::tally(&results(), Duration::from_millis(1500));
        assert_eq!(summary.total_subdatasets, 4);
        assert_eq!(summary.converted, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(
            summary.converted + summary.skipped + summary.failed,
            summary.total_subdatasets
        );
        assert_eq!(summary.duration_ms, 1500);
    }

    #[test]
    fn test_manifest_schema() {
        let manifest = Manifest::assemble(
            Path::new("data/scene.h5"),
            results(),
            &ConversionOptions::default(),
            Duration::from_millis(12),
        );
        let value = serde_json::to_value(&manifest).unwrap();

        assert_eq!(value["inputFile"], "scene.h5");
        assert!(value["overviewImage"].is_null());
        assert_eq!(value["summary"]["durationMs"], 12);
        assert_eq!(value["summary"]["totalSubdatasets"], 4);
        assert_eq!(value["files"][0]["status"], "Converted");
        assert_eq!(value["files"][0]["outputPath"], "out/scene/IMG_VIS.tif");
        assert_eq!(value["files"][0]["fileInfo"]["sizeBytes"], 1024);
        assert_eq!(value["files"][2]["error"], "engine refused");
        assert_eq!(value["metadata"]["converterVersion"], CONVERTER_VERSION);
        assert_eq!(value["metadata"]["conversionOptions"]["blockSize"], 512);

        let timestamp = value["processingTimestamp"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
        assert!(timestamp.ends_with('Z'));
        assert!(!timestamp.contains('.'));
    }

    #[test]
    fn test_persist_creates_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("scene").join("manifest.json");
        let manifest = Manifest::assemble(
            Path::new("scene.h5"),
            results(),
            &ConversionOptions::default(),
            Duration::ZERO,
        )
        .with_overview(Some(PathBuf::from("out/scene/overview.jpg")));

        manifest.persist(&path).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["overviewImage"], "out/scene/overview.jpg");
        assert_eq!(value["files"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn test_persist_failure_is_reported() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, b"").unwrap();

        let manifest = Manifest::assemble(
            Path::new("scene.h5"),
            Vec::new(),
            &ConversionOptions::default(),
            Duration::ZERO,
        );
        let err = manifest.persist(&blocker.join("manifest.json")).unwrap_err();
        assert!(err.to_string().contains("manifest.json"));
    }
}
