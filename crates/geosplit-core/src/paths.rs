//! Output path planning.
//!
//! Every artifact of a container lives under `<output_directory>/<container stem>/`:
//!
//! ```text
//! output/scene/
//! ├── Image_Band/IMG_VIS.tif
//! ├── Time/Scan_Line_Time.json
//! ├── manifest.json
//! └── overview.jpg
//! ```
//!
//! All functions here are pure: the same inputs always produce the same path.

use std::path::{Path, PathBuf};

use crate::types::{ConversionOptions, ConversionTask, SubdatasetDescriptor};

/// File name of the per-container manifest.
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

/// File name of the per-container overview preview.
pub const OVERVIEW_FILE_NAME: &str = "overview.jpg";

const UNNAMED: &str = "unnamed";

/// File name of `container` without its extension.
#[must_use]
pub fn container_stem(container: &Path) -> String {
    container
        .file_stem()
        .map_or_else(|| UNNAMED.to_string(), |stem| stem.to_string_lossy().into_owned())
}

/// Replaces every character outside `[A-Za-z0-9_-]` with `_`.
///
/// # Examples
///
/// ```
/// use geosplit_core::paths::sanitize_name;
///
/// assert_eq!(sanitize_name("Sun Azimuth (deg)"), "Sun_Azimuth__deg_");
/// assert_eq!(sanitize_name("IMG_TIR-1"), "IMG_TIR-1");
/// ```
#[must_use]
pub fn sanitize_name(name: &str) -> String {
    if name.is_empty() {
        return UNNAMED.to_string();
    }
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Directory receiving every artifact of `container`.
#[must_use]
pub fn container_output_dir(container: &Path, options: &ConversionOptions) -> PathBuf {
    options.output_directory.join(container_stem(container))
}

#[must_use]
pub fn manifest_path(container: &Path, options: &ConversionOptions) -> PathBuf {
    container_output_dir(container, options).join(MANIFEST_FILE_NAME)
}

#[must_use]
pub fn overview_path(container: &Path, options: &ConversionOptions) -> PathBuf {
    container_output_dir(container, options).join(OVERVIEW_FILE_NAME)
}

/// Target path of one descriptor.
///
/// A classification folder is inserted when grouping is enabled and the descriptor is not
/// `Unknown`. One-dimensional descriptors become `.json`, everything else `.tif`.
#[must_use]
pub fn plan_output_path(
    container: &Path,
    descriptor: &SubdatasetDescriptor,
    options: &ConversionOptions,
) -> PathBuf {
    let mut path = container_output_dir(container, options);
    if options.group_by_classification
        && let Some(folder) = descriptor.classification.folder_name()
    {
        path.push(folder);
    }
    let extension = if descriptor.dimensionality() == 1 {
        "json"
    } else {
        "tif"
    };
    path.push(format!("{}.{extension}", sanitize_name(&descriptor.name)));
    path
}

/// Pairs every selected descriptor with its planned output path, preserving order.
#[must_use]
pub fn plan_tasks(
    container: &Path,
    selected: Vec<SubdatasetDescriptor>,
    options: &ConversionOptions,
) -> Vec<ConversionTask> {
    selected
        .into_iter()
        .map(|descriptor| ConversionTask {
            output_path: plan_output_path(container, &descriptor, options),
            descriptor,
        })
        .collect()
}
