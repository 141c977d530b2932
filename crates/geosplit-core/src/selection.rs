//! Selection filter applied to a container's catalog.

use log::debug;

use crate::types::{ConversionOptions, SubdatasetDescriptor};

/// Keeps the descriptors whose classification is enabled in `options.include`.
///
/// Order is preserved. `options.name_patterns` is recorded in the manifest but does not
/// narrow the selection.
#[must_use]
pub fn select(
    catalog: &[SubdatasetDescriptor],
    options: &ConversionOptions,
) -> Vec<SubdatasetDescriptor> {
    if !options.name_patterns.is_empty() {
        debug!(
            "Subdataset patterns {:?} are recorded but not applied",
            options.name_patterns
        );
    }
    catalog
        .iter()
        .filter(|descriptor| options.include.includes(descriptor.classification))
        .cloned()
        .collect()
}
