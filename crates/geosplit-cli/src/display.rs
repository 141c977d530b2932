//! Display utilities for formatting CLI output.
//!
//! This module provides table row structures and formatting functions
//! for presenting subdataset catalogs and batch results in a human-readable format.

use std::path::Path;

use tabled::{Table, Tabled};

use geosplit_core::classification::Classification;
use geosplit_core::operations::{BatchReport, ContainerOutcome};
use geosplit_core::types::SubdatasetDescriptor;

/// Table row representation for one catalog entry.
#[derive(Tabled)]
pub struct SubdatasetRow {
    /// Display name of the subdataset.
    #[tabled(rename = "Name")]
    pub name: String,
    /// Classification label.
    #[tabled(rename = "Type")]
    pub classification: String,
    /// Band identifier, image bands only.
    #[tabled(rename = "Band")]
    pub band: String,
    /// `width x height x bands`.
    #[tabled(rename = "Dimensions")]
    pub dimensions: String,
    #[tabled(rename = "Description")]
    pub description: String,
}

impl From<&SubdatasetDescriptor> for SubdatasetRow {
    fn from(descriptor: &SubdatasetDescriptor) -> Self {
        let band = match descriptor.classification {
            Classification::ImageBand => descriptor
                .band_info
                .as_ref()
                .map(|info| info.band_name.clone())
                .unwrap_or_default(),
            Classification::Geolocation
            | Classification::QualityFlag
            | Classification::TimeData
            | Classification::Auxiliary
            | Classification::Unknown => String::new(),
        };
        let dims = descriptor.dimensions;
        Self {
            name: descriptor.name.clone(),
            classification: descriptor.classification.to_string(),
            band,
            dimensions: format!("{}x{}x{}", dims.width, dims.height, dims.band_count),
            description: descriptor.description.clone(),
        }
    }
}

/// Table row representation for one container of a batch.
#[derive(Tabled)]
pub struct ContainerRow {
    #[tabled(rename = "Container")]
    pub container: String,
    #[tabled(rename = "Status")]
    pub status: String,
    #[tabled(rename = "Converted")]
    pub converted: String,
    #[tabled(rename = "Skipped")]
    pub skipped: String,
    #[tabled(rename = "Failed")]
    pub failed: String,
    /// Manifest location, or `N/A` when none was written.
    #[tabled(rename = "Manifest")]
    pub manifest: String,
}

fn row(container: &Path, status: &str) -> ContainerRow {
    ContainerRow {
        container: container.display().to_string(),
        status: status.to_string(),
        converted: "-".to_string(),
        skipped: "-".to_string(),
        failed: "-".to_string(),
        manifest: "N/A".to_string(),
    }
}

/// Renders a catalog as a table.
#[must_use]
pub fn catalog_table(catalog: &[SubdatasetDescriptor]) -> String {
    Table::new(catalog.iter().map(SubdatasetRow::from)).to_string()
}

/// Renders one summary row per container that was not only listed.
#[must_use]
pub fn summary_table(report: &BatchReport) -> Option<String> {
    let rows: Vec<ContainerRow> = report
        .containers
        .iter()
        .filter_map(|entry| {
            let container = entry.container.as_path();
            match &entry.outcome {
                ContainerOutcome::Listed(_) => None,
                ContainerOutcome::NothingToConvert => Some(row(container, "Nothing to convert")),
                ContainerOutcome::Failed { .. } => Some(row(container, "Error")),
                ContainerOutcome::Converted {
                    manifest,
                    manifest_path,
                } => Some(ContainerRow {
                    converted: manifest.summary.converted.to_string(),
                    skipped: manifest.summary.skipped.to_string(),
                    failed: manifest.summary.failed.to_string(),
                    manifest: manifest_path
                        .as_ref()
                        .map_or_else(|| "N/A".to_string(), |p| p.display().to_string()),
                    ..row(container, "Processed")
                }),
            }
        })
        .collect();

    (!rows.is_empty()).then(|| Table::new(rows).to_string())
}

/// Prints catalogs, failure hints and the batch summary.
///
/// Tables go to standard output; hints for failed containers go to standard error.
pub fn display_report(report: &BatchReport) {
    for entry in &report.containers {
        match &entry.outcome {
            ContainerOutcome::Listed(catalog) => {
                println!("\n{}", entry.container.display());
                println!("Available subdatasets ({}):\n", catalog.len());
                println!("{}", catalog_table(catalog));
            },
            ContainerOutcome::Failed {
                suggestion: Some(suggestion),
                ..
            } => eprintln!("Hint: {suggestion}"),
            ContainerOutcome::Failed {
                suggestion: None, ..
            }
            | ContainerOutcome::NothingToConvert
            | ContainerOutcome::Converted { .. } => {},
        }
    }

    if let Some(table) = summary_table(report) {
        println!("\n{table}");
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use super::*;
    use geosplit_core::manifest::Manifest;
    use geosplit_core::operations::ContainerReport;
    use geosplit_core::types::{ConversionOptions, RasterDimensions};

    #[test]
    fn test_subdataset_row_for_image_band() {
        let mut descriptor = SubdatasetDescriptor::new("IMG_VIS_RADIANCE", "visible", "ref");
        descriptor.dimensions = RasterDimensions {
            width: 100,
            height: 50,
            band_count: 1,
        };
        let row = SubdatasetRow::from(&descriptor);
        assert_eq!(row.classification, "Image_Band");
        assert_eq!(row.band, "VIS");
        assert_eq!(row.dimensions, "100x50x1");
        assert_eq!(row.description, "visible");
    }

    #[test]
    fn test_subdataset_row_without_band() {
        let row = SubdatasetRow::from(&SubdatasetDescriptor::new("Latitude", "", "ref"));
        assert_eq!(row.classification, "Geolocation");
        assert_eq!(row.band, "");
        assert_eq!(row.dimensions, "0x0x0");
    }

    #[test]
    fn test_catalog_table_has_headers() {
        let table = catalog_table(&[SubdatasetDescriptor::new("IMG_VIS", "", "ref")]);
        for header in ["Name", "Type", "Band", "Dimensions", "Description"] {
            assert!(table.contains(header));
        }
        assert!(table.contains("IMG_VIS"));
    }

    #[test]
    fn test_summary_table() {
        let manifest = Manifest::assemble(
            Path::new("scene.h5"),
            Vec::new(),
            &ConversionOptions::default(),
            Duration::ZERO,
        );
        let report = BatchReport {
            containers: vec![
                ContainerReport {
                    container: PathBuf::from("scene.h5"),
                    outcome: ContainerOutcome::Converted {
                        manifest,
                        manifest_path: Some(PathBuf::from("output/scene/manifest.json")),
                    },
                },
                ContainerReport {
                    container: PathBuf::from("broken.h5"),
                    outcome: ContainerOutcome::Failed {
                        message: "cannot open".to_string(),
                        suggestion: None,
                    },
                },
            ],
        };
        let table = summary_table(&report).unwrap();
        assert!(table.contains("output/scene/manifest.json"));
        assert!(table.contains("Processed"));
        assert!(table.contains("Error"));
        assert!(table.contains("broken.h5"));
    }

    #[test]
    fn test_summary_table_skips_listings() {
        let report = BatchReport {
            containers: vec![ContainerReport {
                container: PathBuf::from("scene.h5"),
                outcome: ContainerOutcome::Listed(Vec::new()),
            }],
        };
        assert!(summary_table(&report).is_none());
        display_report(&report);
    }
}
