//! Bounded worker pool driving the extraction.
//!
//! Partitioning and merging run on the caller's task. Chunks are extracted on
//! the blocking thread pool with at most `workers` chunks in flight; each
//! worker opens its own circuit handle.

use super::{merge, split, FeatureExtractor, PipelineError, TargetMembership, WorkerContext};
use crate::circuit::{Circuit, CircuitLoader};
use crate::models::CellTable;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use tracing::{debug, info, info_span};

/// Options for one extraction run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Target whose cells are analyzed in isolation.
    pub target: String,
    /// Maximum number of chunks processed concurrently.
    pub workers: usize,
    /// Number of chunks the target is split into.
    pub chunks: usize,
    /// Show a progress bar over chunks.
    pub show_progress: bool,
    /// Log per-chunk percentage progress.
    pub chunk_progress: bool,
}

impl RunOptions {
    /// Check the worker/split configuration before any work starts.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.workers == 0 {
            return Err(PipelineError::NoWorkers);
        }
        if self.chunks == 0 {
            return Err(PipelineError::NoSplits);
        }
        if self.chunks < self.workers {
            return Err(PipelineError::InvalidSplit {
                chunks: self.chunks,
                workers: self.workers,
            });
        }
        Ok(())
    }
}

/// Run the full partition-extract-merge pipeline.
pub async fn run<L: CircuitLoader>(
    loader: Arc<L>,
    options: &RunOptions,
) -> Result<CellTable, PipelineError> {
    options.validate()?;

    let (ids, projections) = {
        let circuit = loader.load()?;
        (
            circuit.list_identifiers(&options.target)?,
            circuit.projection_names()?,
        )
    };

    let chunks = split(&ids, options.chunks)?;
    info!(
        "Created {} data splits for {} using target \"{}\" with {} cells",
        chunks.len(),
        loader.locator(),
        options.target,
        ids.len()
    );

    let membership = Arc::new(TargetMembership::new(&ids));
    let projections = Arc::new(projections);
    let progress = progress_bar(chunks.len(), options.show_progress);

    let mut results = stream::iter(chunks)
        .map(|chunk| {
            let loader = Arc::clone(&loader);
            let membership = Arc::clone(&membership);
            let projections = Arc::clone(&projections);
            let context = WorkerContext {
                chunk_index: chunk.index,
                report_progress: options.chunk_progress,
            };

            async move {
                let index = chunk.index;
                let handle = tokio::task::spawn_blocking(move || {
                    let _span = info_span!("chunk", index = chunk.index, cells = chunk.len()).entered();
                    if chunk.is_empty() {
                        debug!("Chunk {} is empty", chunk.index);
                        return Ok(CellTable::new(projections.to_vec()));
                    }
                    let circuit = loader.load()?;
                    FeatureExtractor::new(&circuit, &membership, &projections, context)
                        .extract(&chunk.ids)
                });

                match handle.await {
                    Ok(Ok(table)) => Ok((index, table)),
                    Ok(Err(source)) => Err(PipelineError::Query {
                        chunk: index,
                        source,
                    }),
                    Err(e) => Err(PipelineError::WorkerPanicked {
                        chunk: index,
                        message: e.to_string(),
                    }),
                }
            }
        })
        .buffer_unordered(options.workers);

    let mut parts = Vec::with_capacity(options.chunks);
    while let Some(result) = results.next().await {
        let (index, table) = match result {
            Ok(part) => part,
            Err(e) => {
                progress.abandon();
                return Err(e);
            }
        };
        debug!("Chunk {} finished with {} cells", index, table.len());
        progress.inc(1);
        parts.push((index, table));
    }
    progress.finish_and_clear();

    merge(&projections, parts)
}

fn progress_bar(len: usize, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({eta})")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}
