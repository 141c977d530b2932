//! Descriptor catalog builder.
//!
//! A container advertises its sub-resources through the `SUBDATASETS` metadata domain as
//! `SUBDATASET_<n>_NAME=<reference>` / `SUBDATASET_<n>_DESC=<text>` pairs. This module parses
//! that table, opens every referenced sub-resource to read its geometry, and returns one
//! classified [`SubdatasetDescriptor`] per sub-resource, ordered by display name.

use std::collections::BTreeMap;
use std::path::Path;

use log::{debug, warn};

use crate::engine::{RasterEngine, RasterInfo};
use crate::error::ContainerError;
use crate::types::{
    ConversionOptions, DEFAULT_CRS, GeoReference, IDENTITY_TRANSFORM, RasterDimensions,
    SubdatasetDescriptor, TileInfo,
};

const KEY_PREFIX: &str = "SUBDATASET_";

/// Field addressed by a subdataset metadata key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubdatasetField {
    Name,
    Description,
}

/// A parsed `SUBDATASET_<ordinal>_<NAME|DESC>` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubdatasetKey {
    pub ordinal: u32,
    pub field: SubdatasetField,
}

impl SubdatasetKey {
    /// Parses a metadata key. Returns `None` for anything outside the grammar
    /// `SUBDATASET_` digits `_NAME` | `_DESC`.
    ///
    /// # Examples
    ///
    /// ```
    /// use geosplit_core::catalog::{SubdatasetField, SubdatasetKey};
    ///
    /// let key = SubdatasetKey::parse("SUBDATASET_12_DESC").unwrap();
    /// assert_eq!(key.ordinal, 12);
    /// assert_eq!(key.field, SubdatasetField::Description);
    /// assert!(SubdatasetKey::parse("SUBDATASET_COUNT").is_none());
    /// ```
    #[must_use]
    pub fn parse(key: &str) -> Option<Self> {
        let rest = key.strip_prefix(KEY_PREFIX)?;
        let (digits, suffix) = rest.split_once('_')?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let field = match suffix {
            "NAME" => SubdatasetField::Name,
            "DESC" => SubdatasetField::Description,
            _ => return None,
        };
        Some(Self {
            ordinal: digits.parse().ok()?,
            field,
        })
    }
}

/// Splits a `KEY=VALUE` metadata entry and parses its key.
#[must_use]
pub fn parse_entry(entry: &str) -> Option<(SubdatasetKey, &str)> {
    let (key, value) = entry.split_once('=')?;
    Some((SubdatasetKey::parse(key)?, value))
}

/// Human-readable name of an engine reference: the text after the last `:`, then after the
/// last `/`.
///
/// # Examples
///
/// ```
/// use geosplit_core::catalog::display_name;
///
/// assert_eq!(display_name("HDF5:\"scene.h5\"://Geo/Latitude"), "Latitude");
/// assert_eq!(display_name("IMG_VIS"), "IMG_VIS");
/// ```
#[must_use]
pub fn display_name(reference: &str) -> &str {
    let tail = reference.rsplit_once(':').map_or(reference, |(_, tail)| tail);
    tail.rsplit_once('/').map_or(tail, |(_, name)| name)
}

#[derive(Default)]
struct Provisional<'a> {
    source: Option<&'a str>,
    description: Option<&'a str>,
}

/// Enumerates, describes and classifies every sub-resource of `container`.
///
/// Sub-resources that cannot be opened keep zeroed geometry and are still classified.
///
/// # Errors
///
/// Returns [`ContainerError::Open`] if the engine cannot open the container, and
/// [`ContainerError::NoSubdatasets`] if its metadata lists no named sub-resource.
pub fn build_catalog(
    engine: &dyn RasterEngine,
    container: &Path,
    options: &ConversionOptions,
) -> Result<Vec<SubdatasetDescriptor>, ContainerError> {
    let entries = engine
        .open_container(container)
        .map_err(|source| ContainerError::Open {
            path: container.to_path_buf(),
            source,
        })?;

    let mut grouped: BTreeMap<u32, Provisional<'_>> = BTreeMap::new();
    for (key, value) in entries.iter().filter_map(|entry| parse_entry(entry)) {
        let slot = grouped.entry(key.ordinal).or_default();
        match key.field {
            SubdatasetField::Name => slot.source = Some(value),
            SubdatasetField::Description => slot.description = Some(value),
        }
    }

    let mut catalog = Vec::with_capacity(grouped.len());
    for (ordinal, provisional) in grouped {
        let Some(source) = provisional.source else {
            debug!("Ignoring subdataset {ordinal} without a name entry");
            continue;
        };
        let mut descriptor = SubdatasetDescriptor::new(
            display_name(source),
            provisional.description.unwrap_or_default(),
            source,
        );
        match engine.describe(source) {
            Ok(info) => apply_raster_info(&mut descriptor, info, options.block_size),
            Err(e) => warn!("Could not open subdataset {}: {e}", descriptor.name),
        }
        catalog.push(descriptor);
    }

    if catalog.is_empty() {
        return Err(ContainerError::NoSubdatasets {
            path: container.to_path_buf(),
        });
    }

    catalog.sort_by(|a, b| a.name.cmp(&b.name));
    debug!(
        "Found {} subdatasets in {}",
        catalog.len(),
        container.display()
    );
    Ok(catalog)
}

fn apply_raster_info(descriptor: &mut SubdatasetDescriptor, info: RasterInfo, block_size: u32) {
    descriptor.dimensions = RasterDimensions {
        width: info.width,
        height: info.height,
        band_count: info.band_count,
    };
    descriptor.data_type = info.data_type;
    descriptor.geospatial = GeoReference {
        crs: info
            .crs
            .filter(|crs| !crs.is_empty())
            .unwrap_or_else(|| DEFAULT_CRS.to_string()),
        transform: info.transform.unwrap_or(IDENTITY_TRANSFORM),
    };
    if info.band_count > 0 {
        descriptor.tile_info = Some(TileInfo {
            tile_width: block_size,
            tile_height: block_size,
        });
    }
}
