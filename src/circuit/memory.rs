//! In-memory circuit.

use super::{Circuit, CircuitLoader, QueryError, ALL_TARGET};
use crate::models::{AfferentSynapse, CellId, Morphology, Position};
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Clone)]
struct CellEntry {
    position: Position,
    morphology: Option<Morphology>,
}

/// A fully materialized circuit, indexed by postsynaptic cell.
#[derive(Debug, Clone, Default)]
pub struct MemoryCircuit {
    cells: BTreeMap<CellId, CellEntry>,
    targets: HashMap<String, Vec<CellId>>,
    afferents: HashMap<CellId, Vec<AfferentSynapse>>,
    /// Projection name -> synapse count per postsynaptic cell, in insertion order.
    projections: Vec<(String, HashMap<CellId, u64>)>,
}

impl MemoryCircuit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a cell. A `None` morphology makes morphology queries fail.
    pub fn add_cell(
        &mut self,
        id: CellId,
        position: Position,
        morphology: Option<Morphology>,
    ) -> Result<(), QueryError> {
        if self.cells.contains_key(&id) {
            return Err(QueryError::Invalid(format!("duplicate cell id {}", id)));
        }
        self.cells.insert(id, CellEntry { position, morphology });
        Ok(())
    }

    /// Define a named target. Ids must be unique and refer to known cells.
    pub fn add_target(&mut self, name: &str, ids: Vec<CellId>) -> Result<(), QueryError> {
        let mut seen = HashSet::with_capacity(ids.len());
        for id in &ids {
            if !seen.insert(*id) {
                return Err(QueryError::Invalid(format!(
                    "target {} lists cell {} twice",
                    name, id
                )));
            }
            if !self.cells.contains_key(id) {
                return Err(QueryError::Invalid(format!(
                    "target {} references unknown cell {}",
                    name, id
                )));
            }
        }
        self.targets.insert(name.to_string(), ids);
        Ok(())
    }

    /// Add a local synapse onto `post`.
    pub fn add_synapse(&mut self, post: CellId, synapse: AfferentSynapse) -> Result<(), QueryError> {
        for id in [post, synapse.pre_id] {
            if !self.cells.contains_key(&id) {
                return Err(QueryError::Invalid(format!(
                    "synapse references unknown cell {}",
                    id
                )));
            }
        }
        self.afferents.entry(post).or_default().push(synapse);
        Ok(())
    }

    /// Declare a projection (with no synapses yet).
    pub fn add_projection(&mut self, name: &str) {
        if !self.projections.iter().any(|(n, _)| n == name) {
            self.projections.push((name.to_string(), HashMap::new()));
        }
    }

    /// Add one projection synapse onto `post`, declaring the projection if needed.
    pub fn add_projection_synapse(&mut self, name: &str, post: CellId) -> Result<(), QueryError> {
        if !self.cells.contains_key(&post) {
            return Err(QueryError::Invalid(format!(
                "projection {} targets unknown cell {}",
                name, post
            )));
        }
        self.add_projection(name);
        if let Some((_, counts)) = self.projections.iter_mut().find(|(n, _)| n == name) {
            *counts.entry(post).or_insert(0) += 1;
        }
        Ok(())
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    fn cell(&self, id: CellId) -> Result<&CellEntry, QueryError> {
        self.cells.get(&id).ok_or(QueryError::CellNotFound(id))
    }
}

impl Circuit for MemoryCircuit {
    fn list_identifiers(&self, target: &str) -> Result<Vec<CellId>, QueryError> {
        if let Some(ids) = self.targets.get(target) {
            return Ok(ids.clone());
        }
        if target == ALL_TARGET {
            return Ok(self.cells.keys().copied().collect());
        }
        Err(QueryError::UnknownTarget(target.to_string()))
    }

    fn positions(&self, ids: &[CellId]) -> Result<HashMap<CellId, Position>, QueryError> {
        ids.iter()
            .map(|&id| self.cell(id).map(|cell| (id, cell.position)))
            .collect()
    }

    fn morphology(&self, id: CellId) -> Result<Morphology, QueryError> {
        self.cell(id)?
            .morphology
            .clone()
            .ok_or(QueryError::MorphologyMissing(id))
    }

    fn afferent_synapses(&self, id: CellId) -> Result<Vec<AfferentSynapse>, QueryError> {
        self.cell(id)?;
        Ok(self.afferents.get(&id).cloned().unwrap_or_default())
    }

    fn projection_names(&self) -> Result<Vec<String>, QueryError> {
        Ok(self.projections.iter().map(|(n, _)| n.clone()).collect())
    }

    fn projection_afferent_count(&self, projection: &str, id: CellId) -> Result<u64, QueryError> {
        self.cell(id)?;
        let (_, counts) = self
            .projections
            .iter()
            .find(|(n, _)| n == projection)
            .ok_or_else(|| QueryError::UnknownProjection(projection.to_string()))?;
        Ok(counts.get(&id).copied().unwrap_or(0))
    }
}

impl CircuitLoader for MemoryCircuit {
    type Circuit = MemoryCircuit;

    fn locator(&self) -> String {
        format!("memory ({} cells)", self.cells.len())
    }

    fn load(&self) -> Result<Self::Circuit, QueryError> {
        Ok(self.clone())
    }
}
