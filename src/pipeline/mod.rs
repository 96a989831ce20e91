//! Partition, extract and aggregate.
//!
//! The identifier set of a target is split into ordered chunks, each chunk is
//! turned into a partial [`CellTable`](crate::models::CellTable) by a worker,
//! and the partial tables are merged back in chunk order.

pub mod aggregator;
pub mod extractor;
pub mod partition;
pub mod runner;

pub use aggregator::merge;
pub use extractor::{FeatureExtractor, TargetMembership, WorkerContext};
pub use partition::split;
pub use runner::{run, RunOptions};

use crate::circuit::QueryError;
use thiserror::Error;

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("split count must be at least 1")]
    NoSplits,

    #[error("worker count must be at least 1")]
    NoWorkers,

    #[error("number of data splits ({chunks}) too low for {workers} parallel workers")]
    InvalidSplit { chunks: usize, workers: usize },

    /// A query made before partitioning failed.
    #[error(transparent)]
    Circuit(#[from] QueryError),

    #[error("chunk {chunk} failed: {source}")]
    Query {
        chunk: usize,
        #[source]
        source: QueryError,
    },

    #[error("worker for chunk {chunk} panicked: {message}")]
    WorkerPanicked { chunk: usize, message: String },

    #[error("chunk {chunk} has projection columns {found:?}, expected {expected:?}")]
    SchemaMismatch {
        chunk: usize,
        expected: Vec<String>,
        found: Vec<String>,
    },
}
