//! JSON circuit snapshots.
//!
//! A snapshot file describes a whole circuit:
//!
//! ```json
//! {
//!   "cells": [{"id": 1, "x": 0.0, "y": 10.0, "z": 5.0,
//!              "morphology": {"basal_dendrite": 1200.0, "apical_dendrite": 800.0}}],
//!   "targets": {"L5": [1]},
//!   "synapses": [{"pre": 2, "post": 1, "branch_type": "basal_dendrite", "type": 113}],
//!   "projections": {"VPM": [{"post": 1}]}
//! }
//! ```
//!
//! Projections are ordered by name.

use super::{CircuitLoader, MemoryCircuit, QueryError};
use crate::models::{AfferentSynapse, CellId, Morphology, NeuriteType, Position};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize)]
struct SnapshotFile {
    cells: Vec<CellEntry>,
    #[serde(default)]
    targets: HashMap<String, Vec<CellId>>,
    #[serde(default)]
    synapses: Vec<SynapseEntry>,
    #[serde(default)]
    projections: BTreeMap<String, Vec<ProjectionSynapseEntry>>,
}

#[derive(Debug, Deserialize)]
struct CellEntry {
    id: CellId,
    x: f64,
    y: f64,
    z: f64,
    #[serde(default)]
    morphology: Option<MorphologyEntry>,
}

/// Total cable length per neurite type.
#[derive(Debug, Deserialize)]
struct MorphologyEntry {
    #[serde(default)]
    soma: f64,
    #[serde(default)]
    axon: f64,
    #[serde(default)]
    basal_dendrite: f64,
    #[serde(default)]
    apical_dendrite: f64,
}

impl From<MorphologyEntry> for Morphology {
    fn from(entry: MorphologyEntry) -> Self {
        Morphology {
            lengths: [
                (NeuriteType::Soma, entry.soma),
                (NeuriteType::Axon, entry.axon),
                (NeuriteType::BasalDendrite, entry.basal_dendrite),
                (NeuriteType::ApicalDendrite, entry.apical_dendrite),
            ]
            .into_iter()
            .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SynapseEntry {
    pre: CellId,
    post: CellId,
    branch_type: NeuriteType,
    #[serde(rename = "type")]
    synapse_type: u32,
}

#[derive(Debug, Deserialize)]
struct ProjectionSynapseEntry {
    post: CellId,
}

/// Parse snapshot JSON into an in-memory circuit.
pub fn parse_snapshot(content: &str, path: &Path) -> Result<MemoryCircuit, QueryError> {
    let file: SnapshotFile = serde_json::from_str(content).map_err(|source| QueryError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let mut circuit = MemoryCircuit::new();

    for cell in file.cells {
        let position = Position {
            x: cell.x,
            y: cell.y,
            z: cell.z,
        };
        circuit.add_cell(cell.id, position, cell.morphology.map(Morphology::from))?;
    }

    for (name, ids) in file.targets {
        circuit.add_target(&name, ids)?;
    }

    for syn in file.synapses {
        circuit.add_synapse(
            syn.post,
            AfferentSynapse {
                pre_id: syn.pre,
                post_branch_type: syn.branch_type,
                synapse_type: syn.synapse_type,
            },
        )?;
    }

    for (name, synapses) in file.projections {
        circuit.add_projection(&name);
        for syn in synapses {
            circuit.add_projection_synapse(&name, syn.post)?;
        }
    }

    Ok(circuit)
}

/// Loads a circuit from a JSON snapshot file, once per handle.
#[derive(Debug, Clone)]
pub struct SnapshotLoader {
    path: PathBuf,
}

impl SnapshotLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CircuitLoader for SnapshotLoader {
    type Circuit = MemoryCircuit;

    fn locator(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> Result<Self::Circuit, QueryError> {
        let content = std::fs::read_to_string(&self.path).map_err(|source| QueryError::Io {
            path: self.path.clone(),
            source,
        })?;

        let circuit = parse_snapshot(&content, &self.path)?;
        debug!(
            "Loaded circuit {} with {} cells",
            self.path.display(),
            circuit.cell_count()
        );
        Ok(circuit)
    }
}
