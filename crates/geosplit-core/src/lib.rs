//! `geosplit-core` splits multi-subdataset geospatial containers (HDF5, NetCDF, ...) into one
//! artifact per subdataset plus a `manifest.json` describing the run.
//!
//! This crate includes:
//! - **Catalog**: discovery and classification of a container's subdatasets ([`catalog`],
//!   [`classification`]).
//! - **Selection and planning**: per-category filtering and deterministic output paths
//!   ([`selection`], [`paths`]).
//! - **Conversion**: a bounded worker pool producing tiled rasters or JSON arrays
//!   ([`orchestrator`]).
//! - **Reporting**: the per-container manifest and the optional overview preview
//!   ([`manifest`], [`overview`]).
//!
//! All raster access goes through the [`engine::RasterEngine`] trait. [`operations`] ties the
//! pieces together for a single container and for a batch of inputs.

pub mod catalog;
pub mod classification;
pub mod engine;
pub mod error;
pub mod manifest;
pub mod operations;
pub mod orchestrator;
pub mod overview;
pub mod paths;
pub mod selection;
pub mod types;
pub mod utils;
