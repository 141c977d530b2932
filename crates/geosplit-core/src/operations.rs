//! Container and batch processing.
//!
//! [`process_container`] drives one container through the whole pipeline: catalog,
//! selection, planning, parallel conversion, manifest assembly, overview and persistence.
//! [`BatchRunner`] applies it to every input in turn, bracketing the batch with the engine's
//! lifecycle calls and isolating container failures from each other.

use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{error, info, warn};

use crate::catalog::build_catalog;
use crate::engine::RasterEngine;
use crate::error::{ContainerError, EngineError, GeoSplitError};
use crate::manifest::Manifest;
use crate::orchestrator::run_tasks;
use crate::overview::build_overview;
use crate::paths::{manifest_path, plan_tasks};
use crate::selection::select;
use crate::types::{ConversionOptions, SubdatasetDescriptor};

/// What happened to one container.
#[derive(Debug, Clone, PartialEq)]
pub enum ContainerOutcome {
    /// List-only mode: the catalog, nothing converted
    Listed(Vec<SubdatasetDescriptor>),
    /// The selection was empty; no output was written
    NothingToConvert,
    /// Tasks ran and a manifest was assembled
    Converted {
        manifest: Manifest,
        /// `None` when the manifest could not be written
        manifest_path: Option<PathBuf>,
    },
    /// The container could not be processed at all
    Failed {
        message: String,
        suggestion: Option<String>,
    },
}

/// Outcome of one input of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerReport {
    pub container: PathBuf,
    pub outcome: ContainerOutcome,
}

/// Outcomes of a batch, in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub containers: Vec<ContainerReport>,
}

impl BatchReport {
    /// Number of containers that could not be processed.
    #[must_use]
    pub fn failed_containers(&self) -> usize {
        self.containers
            .iter()
            .filter(|report| matches!(report.outcome, ContainerOutcome::Failed { .. }))
            .count()
    }

    /// Manifests of every converted container.
    pub fn manifests(&self) -> impl Iterator<Item = &Manifest> {
        self.containers.iter().filter_map(|report| match &report.outcome {
            ContainerOutcome::Converted { manifest, .. } => Some(manifest),
            ContainerOutcome::Listed(_)
            | ContainerOutcome::NothingToConvert
            | ContainerOutcome::Failed { .. } => None,
        })
    }
}

/// Runs the full pipeline for one container.
///
/// Task failures, overview failures and manifest write failures are logged and reflected in
/// the returned outcome; they do not make this function fail.
///
/// # Errors
///
/// Returns [`ContainerError`] if the container cannot be opened or lists no subdatasets.
pub fn process_container(
    engine: &dyn RasterEngine,
    container: &Path,
    options: &ConversionOptions,
) -> Result<ContainerOutcome, ContainerError> {
    let started = Instant::now();
    let catalog = build_catalog(engine, container, options)?;
    if options.list_only {
        return Ok(ContainerOutcome::Listed(catalog));
    }

    let selected = select(&catalog, options);
    if selected.is_empty() {
        warn!("No subdatasets matched the selection criteria. Nothing to convert.");
        return Ok(ContainerOutcome::NothingToConvert);
    }
    info!("Found {} subdatasets to process...", selected.len());

    let tasks = plan_tasks(container, selected, options);
    let results = run_tasks(engine, &tasks, options);
    let manifest = Manifest::assemble(container, results, options, started.elapsed());

    let overview = build_overview(engine, container, &manifest.files, options).unwrap_or_else(|e| {
        warn!("{}", GeoSplitError::from(e).user_message());
        None
    });
    let manifest = manifest.with_overview(overview);

    let path = manifest_path(container, options);
    let manifest_path = match manifest.persist(&path) {
        Ok(()) => {
            info!("Manifest file created at: {}", path.display());
            Some(path)
        },
        Err(e) => {
            let e = GeoSplitError::from(e);
            error!("{}", e.user_message());
            if let Some(hint) = e.recovery_suggestion() {
                warn!("{hint}");
            }
            None
        },
    };

    let summary = &manifest.summary;
    info!(
        "Successfully processed {} subdatasets in {} ms.",
        summary.converted, summary.duration_ms
    );
    if summary.failed > 0 {
        warn!("{} subdatasets failed to convert.", summary.failed);
    }

    Ok(ContainerOutcome::Converted {
        manifest,
        manifest_path,
    })
}

/// Processes a list of containers with one engine and one set of options.
pub struct BatchRunner<'a> {
    engine: &'a dyn RasterEngine,
    options: &'a ConversionOptions,
}

impl<'a> BatchRunner<'a> {
    #[must_use]
    pub fn new(engine: &'a dyn RasterEngine, options: &'a ConversionOptions) -> Self {
        Self { engine, options }
    }

    /// Initializes the engine, processes every container in order and shuts the engine down.
    ///
    /// A container that fails is recorded as [`ContainerOutcome::Failed`] and the batch
    /// continues with the next one.
    ///
    /// # Errors
    ///
    /// Returns an error only if the engine cannot be initialized.
    pub fn run(&self, containers: &[PathBuf]) -> Result<BatchReport, EngineError> {
        let workers = self.options.worker_count();
        self.engine.initialize(workers)?;
        info!(
            "Using {} engine with {workers} workers",
            self.engine.name()
        );

        let mut report = BatchReport::default();
        for container in containers {
            info!("Processing: {}", container.display());
            let outcome = match process_container(self.engine, container, self.options) {
                Ok(outcome) => outcome,
                Err(e) => {
                    let e = GeoSplitError::from(e);
                    error!("Error processing file {}: {}", container.display(), e.user_message());
                    ContainerOutcome::Failed {
                        message: e.user_message(),
                        suggestion: e.recovery_suggestion(),
                    }
                },
            };
            report.containers.push(ContainerReport {
                container: container.clone(),
                outcome,
            });
        }

        self.engine.shutdown();
        Ok(report)
    }
}
