//! Parallel conversion of planned tasks.
//!
//! Tasks run on a bounded `rayon` pool. Any failure is captured in the task's own
//! [`ConversionResult`] without affecting siblings. Tasks whose output paths collide are
//! serialized, so results never depend on the pool size. Results are returned in task order.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fs;
use std::path::Path;

use log::{error, info, warn};
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use serde::Serialize;

use crate::engine::{RasterEngine, TilingOptions};
use crate::error::{EngineError, IoErrorExt, TaskError};
use crate::types::{ConversionOptions, ConversionResult, ConversionTask};
use crate::utils::to_pretty_json;

/// JSON document written for one-dimensional subdatasets.
#[derive(Debug, Serialize)]
struct ArrayDocument<'a> {
    name: &'a str,
    data: &'a [f64],
}

/// Runs every task on a pool of `options.worker_count()` threads.
///
/// Tasks that share an output path run one after another on the same worker, in task order,
/// so the first one decides whether the later ones are skipped. Returns one result per task,
/// in the same order as `tasks`. Falls back to converting on the calling thread if the pool
/// cannot be created.
#[must_use]
pub fn run_tasks(
    engine: &dyn RasterEngine,
    tasks: &[ConversionTask],
    options: &ConversionOptions,
) -> Vec<ConversionResult> {
    let buckets = bucket_by_output(tasks);
    let run_bucket = |bucket: &Vec<usize>| -> Vec<(usize, ConversionResult)> {
        bucket
            .iter()
            .map(|&index| (index, run_task(engine, &tasks[index], options)))
            .collect()
    };

    let workers = options.worker_count();
    let pool = ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|index| format!("geosplit-worker-{index}"))
        .build();

    let finished: Vec<Vec<(usize, ConversionResult)>> = match pool {
        Ok(pool) => pool.install(|| buckets.par_iter().map(run_bucket).collect()),
        Err(e) => {
            warn!("Could not start {workers} workers ({e}), converting sequentially");
            buckets.iter().map(run_bucket).collect()
        },
    };

    let mut slots: Vec<Option<ConversionResult>> = vec![None; tasks.len()];
    for (index, result) in finished.into_iter().flatten() {
        slots[index] = Some(result);
    }
    slots.into_iter().flatten().collect()
}

/// Groups task indices by output path, in order of first appearance.
fn bucket_by_output(tasks: &[ConversionTask]) -> Vec<Vec<usize>> {
    let mut positions: HashMap<&Path, usize> = HashMap::new();
    let mut buckets: Vec<Vec<usize>> = Vec::new();
    for (index, task) in tasks.iter().enumerate() {
        match positions.entry(task.output_path.as_path()) {
            Entry::Occupied(slot) => buckets[*slot.get()].push(index),
            Entry::Vacant(slot) => {
                slot.insert(buckets.len());
                buckets.push(vec![index]);
            },
        }
    }
    if buckets.len() < tasks.len() {
        warn!(
            "{} subdatasets share an output path with an earlier one",
            tasks.len() - buckets.len()
        );
    }
    buckets
}

/// Converts one task, or skips it when its output exists and overwriting is off.
#[must_use]
pub fn run_task(
    engine: &dyn RasterEngine,
    task: &ConversionTask,
    options: &ConversionOptions,
) -> ConversionResult {
    let output = &task.output_path;
    if !options.overwrite && output.exists() {
        info!("Skipping existing file: {}", output.display());
        return ConversionResult::skipped(task);
    }

    info!("Processing: {}", task.descriptor.name);
    match convert(engine, task, options) {
        Ok(()) => {
            let size = match fs::metadata(output) {
                Ok(metadata) => Some(metadata.len()),
                Err(e) => {
                    warn!("Could not read size of {}: {e}", output.display());
                    None
                },
            };
            info!("Saved to: {}", output.display());
            ConversionResult::converted(task, size)
        },
        Err(e) => {
            error!("Failed to convert {}: {e}", task.descriptor.name);
            ConversionResult::failed(task, e)
        },
    }
}

fn convert(
    engine: &dyn RasterEngine,
    task: &ConversionTask,
    options: &ConversionOptions,
) -> Result<(), TaskError> {
    if let Some(parent) = task.output_path.parent() {
        fs::create_dir_all(parent).with_path_context(parent)?;
    }

    let descriptor = &task.descriptor;
    let engine_error = |source: EngineError| TaskError::Engine {
        name: descriptor.name.clone(),
        source,
    };

    if descriptor.dimensionality() == 1 {
        let data = engine.read_samples(&descriptor.source).map_err(engine_error)?;
        let document = ArrayDocument {
            name: &descriptor.name,
            data: &data,
        };
        let bytes = to_pretty_json(&document).map_err(|source| TaskError::Serialize {
            name: descriptor.name.clone(),
            source,
        })?;
        fs::write(&task.output_path, bytes).with_path_context(&task.output_path)
    } else {
        engine
            .translate_tiled(
                &descriptor.source,
                &task.output_path,
                &TilingOptions::from(options),
            )
            .map_err(engine_error)
    }
}
