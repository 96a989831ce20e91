//! Data models for synapse density extraction.
//!
//! This module contains the core data structures shared by the circuit
//! backends, the extraction pipeline and the table writers.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Unique key of a neuron within a circuit.
pub type CellId = u64;

/// Synapse-type codes at or above this value are excitatory.
pub const EXCITATORY_TYPE_THRESHOLD: u32 = 100;

/// Soma position in circuit space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Type of a neurite (or the soma) a synapse may land on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeuriteType {
    Soma,
    Axon,
    BasalDendrite,
    ApicalDendrite,
}

impl NeuriteType {
    /// Whether this branch type is part of the dendritic tree.
    pub fn is_dendrite(&self) -> bool {
        matches!(self, NeuriteType::BasalDendrite | NeuriteType::ApicalDendrite)
    }
}

/// Morphology summary: total cable length per neurite type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Morphology {
    pub lengths: HashMap<NeuriteType, f64>,
}

impl Morphology {
    /// Total length of all neurites of the given type (0 if absent).
    pub fn total_length(&self, neurite_type: NeuriteType) -> f64 {
        self.lengths.get(&neurite_type).copied().unwrap_or(0.0)
    }

    /// Sum of basal and apical dendrite lengths.
    pub fn total_dendrite_length(&self) -> f64 {
        self.total_length(NeuriteType::BasalDendrite)
            + self.total_length(NeuriteType::ApicalDendrite)
    }
}

/// Excitatory/inhibitory classification of a synapse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynapseClass {
    Excitatory,
    Inhibitory,
}

impl SynapseClass {
    /// Classify a synapse-type code.
    pub fn from_type_code(code: u32) -> Self {
        if code >= EXCITATORY_TYPE_THRESHOLD {
            SynapseClass::Excitatory
        } else {
            SynapseClass::Inhibitory
        }
    }
}

/// One afferent synapse as reported by the circuit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AfferentSynapse {
    /// Presynaptic cell.
    pub pre_id: CellId,
    /// Branch type of the postsynaptic contact.
    pub post_branch_type: NeuriteType,
    /// Synapse-type code (>= 100 excitatory).
    pub synapse_type: u32,
}

impl AfferentSynapse {
    pub fn class(&self) -> SynapseClass {
        SynapseClass::from_type_code(self.synapse_type)
    }
}

/// Count per unit dendrite length. Not-a-number when the length is zero.
pub fn density(count: u64, total_dendrite_length: f64) -> f64 {
    if total_dendrite_length == 0.0 {
        f64::NAN
    } else {
        count as f64 / total_dendrite_length
    }
}

/// One output row.
#[derive(Debug, Clone, PartialEq)]
pub struct CellRecord {
    pub id: CellId,
    pub position: Position,
    pub total_dendrite_length: f64,
    pub local_e_syn_count: u64,
    pub local_i_syn_count: u64,
    /// Aligned with [`CellTable::projections`].
    pub projection_counts: Vec<u64>,
    pub local_e_syn_density: f64,
    pub local_i_syn_density: f64,
    /// Aligned with [`CellTable::projections`].
    pub projection_densities: Vec<f64>,
}

impl CellRecord {
    /// Build a record and derive all densities from the counts.
    pub fn new(
        id: CellId,
        position: Position,
        total_dendrite_length: f64,
        local_e_syn_count: u64,
        local_i_syn_count: u64,
        projection_counts: Vec<u64>,
    ) -> Self {
        let projection_densities = projection_counts
            .iter()
            .map(|&count| density(count, total_dendrite_length))
            .collect();

        Self {
            id,
            position,
            total_dendrite_length,
            local_e_syn_count,
            local_i_syn_count,
            local_e_syn_density: density(local_e_syn_count, total_dendrite_length),
            local_i_syn_density: density(local_i_syn_count, total_dendrite_length),
            projection_counts,
            projection_densities,
        }
    }

    /// Numeric cell values in [`CellTable::column_names`] order (id excluded).
    pub fn values(&self) -> Vec<f64> {
        let mut values = vec![
            self.position.x,
            self.position.y,
            self.position.z,
            self.total_dendrite_length,
            self.local_e_syn_count as f64,
            self.local_i_syn_count as f64,
        ];
        values.extend(self.projection_counts.iter().map(|&c| c as f64));
        values.push(self.local_e_syn_density);
        values.push(self.local_i_syn_density);
        values.extend(self.projection_densities.iter().copied());
        values
    }
}

/// Per-neuron feature table with a schema fixed by the projection names.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CellTable {
    /// Projection names, fixed for the whole run.
    pub projections: Vec<String>,
    /// One row per identifier, in identifier order.
    pub rows: Vec<CellRecord>,
}

impl CellTable {
    /// Creates an empty table for the given projection schema.
    pub fn new(projections: Vec<String>) -> Self {
        Self {
            projections,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row identifiers in table order.
    pub fn ids(&self) -> Vec<CellId> {
        self.rows.iter().map(|r| r.id).collect()
    }

    /// Column names, starting with the `id` key column.
    pub fn column_names(&self) -> Vec<String> {
        let mut columns: Vec<String> = [
            "id",
            "x",
            "y",
            "z",
            "total_dendrite_length",
            "local_E_syn_count",
            "local_I_syn_count",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        columns.extend(self.projections.iter().map(|p| format!("{}_count", p)));
        columns.push("local_E_syn_density".to_string());
        columns.push("local_I_syn_density".to_string());
        columns.extend(self.projections.iter().map(|p| format!("{}_density", p)));
        columns
    }
}

/// Summary statistics of a finished table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableSummary {
    /// Number of rows.
    pub cells: usize,
    /// Rows with zero dendrite length (densities are NaN).
    pub zero_length_cells: usize,
    /// Mean local excitatory density over rows with a defined density.
    pub mean_local_e_density: f64,
    /// Mean local inhibitory density over rows with a defined density.
    pub mean_local_i_density: f64,
    /// Mean density per projection, in schema order.
    pub mean_projection_densities: Vec<(String, f64)>,
}

impl TableSummary {
    /// Creates a summary from a table.
    pub fn from_table(table: &CellTable) -> Self {
        let zero_length_cells = table
            .rows
            .iter()
            .filter(|r| r.total_dendrite_length == 0.0)
            .count();

        let mean_projection_densities = table
            .projections
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let mean = nan_mean(table.rows.iter().map(|r| r.projection_densities[i]));
                (name.clone(), mean)
            })
            .collect();

        Self {
            cells: table.len(),
            zero_length_cells,
            mean_local_e_density: nan_mean(table.rows.iter().map(|r| r.local_e_syn_density)),
            mean_local_i_density: nan_mean(table.rows.iter().map(|r| r.local_i_syn_density)),
            mean_projection_densities,
        }
    }
}

/// Mean of the non-NaN values; NaN if there are none.
fn nan_mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));

    if n == 0 {
        f64::NAN
    } else {
        sum / n as f64
    }
}
