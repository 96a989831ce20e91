//! Circuit query capability.
//!
//! The pipeline only talks to a circuit through the [`Circuit`] trait, and
//! obtains independent read-only handles through a [`CircuitLoader`]. The
//! [`MemoryCircuit`] backs both the JSON snapshot loader and the tests.

pub mod memory;
pub mod snapshot;

pub use memory::MemoryCircuit;
pub use snapshot::SnapshotLoader;

use crate::models::{AfferentSynapse, CellId, Morphology, Position};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

/// Name of the target that contains every cell of the circuit.
pub const ALL_TARGET: &str = "All";

/// Errors raised while querying a circuit.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("unknown target: {0}")]
    UnknownTarget(String),

    #[error("cell {0} not found in circuit")]
    CellNotFound(CellId),

    #[error("no morphology for cell {0}")]
    MorphologyMissing(CellId),

    #[error("unknown projection: {0}")]
    UnknownProjection(String),

    #[error("failed to read circuit {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse circuit {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The circuit data violates an invariant (duplicate ids, dangling references).
    #[error("invalid circuit: {0}")]
    Invalid(String),
}

/// Read-only queries against a circuit.
pub trait Circuit {
    /// Ordered identifiers of a named target.
    fn list_identifiers(&self, target: &str) -> Result<Vec<CellId>, QueryError>;

    /// Soma positions of the given cells.
    fn positions(&self, ids: &[CellId]) -> Result<HashMap<CellId, Position>, QueryError>;

    fn morphology(&self, id: CellId) -> Result<Morphology, QueryError>;

    /// All afferent synapses of a cell, from any presynaptic cell in the circuit.
    fn afferent_synapses(&self, id: CellId) -> Result<Vec<AfferentSynapse>, QueryError>;

    /// Names of the external projections, in a stable order.
    fn projection_names(&self) -> Result<Vec<String>, QueryError>;

    /// Number of synapses a projection forms onto a cell.
    ///
    /// Projections carry no branch or type information.
    fn projection_afferent_count(&self, projection: &str, id: CellId) -> Result<u64, QueryError>;
}

/// Opens independent read-only circuit handles, one per worker.
pub trait CircuitLoader: Send + Sync + 'static {
    type Circuit: Circuit;

    /// Human readable locator of the circuit (used in logs and file names).
    fn locator(&self) -> String;

    fn load(&self) -> Result<Self::Circuit, QueryError>;
}
