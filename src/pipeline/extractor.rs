//! Per-cell feature extraction for one chunk.
//!
//! For every cell the extractor reads position and morphology, counts the
//! dendritic synapses coming from inside the target ("in isolation"), counts
//! projection synapses and derives densities per unit dendrite length.

use crate::circuit::{Circuit, QueryError};
use crate::models::{AfferentSynapse, CellId, CellRecord, CellTable, SynapseClass};
use std::collections::HashSet;
use tracing::{debug, info};

/// Membership test against the full target identifier set.
#[derive(Debug, Clone, Default)]
pub struct TargetMembership {
    ids: HashSet<CellId>,
}

impl TargetMembership {
    pub fn new(ids: &[CellId]) -> Self {
        Self {
            ids: ids.iter().copied().collect(),
        }
    }

    pub fn contains(&self, id: CellId) -> bool {
        self.ids.contains(&id)
    }
}

/// Diagnostics settings scoped to one worker.
#[derive(Debug, Clone, Copy)]
pub struct WorkerContext {
    pub chunk_index: usize,
    /// Emit percentage progress lines while the chunk is processed.
    pub report_progress: bool,
}

/// Count local excitatory and inhibitory dendritic synapses.
///
/// Only synapses whose presynaptic cell belongs to the target and which land
/// on a basal or apical dendrite are counted.
pub fn count_local_synapses(
    synapses: &[AfferentSynapse],
    membership: &TargetMembership,
) -> (u64, u64) {
    synapses
        .iter()
        .filter(|s| membership.contains(s.pre_id))
        .filter(|s| s.post_branch_type.is_dendrite())
        .fold((0, 0), |(e, i), s| match s.class() {
            SynapseClass::Excitatory => (e + 1, i),
            SynapseClass::Inhibitory => (e, i + 1),
        })
}

/// Extracts [`CellRecord`]s for a chunk of cells.
pub struct FeatureExtractor<'a, C: Circuit> {
    circuit: &'a C,
    membership: &'a TargetMembership,
    projections: &'a [String],
    context: WorkerContext,
}

impl<'a, C: Circuit> FeatureExtractor<'a, C> {
    pub fn new(
        circuit: &'a C,
        membership: &'a TargetMembership,
        projections: &'a [String],
        context: WorkerContext,
    ) -> Self {
        Self {
            circuit,
            membership,
            projections,
            context,
        }
    }

    /// Build the partial table for `ids`, in the given order.
    ///
    /// The first failing query aborts the chunk.
    pub fn extract(&self, ids: &[CellId]) -> Result<CellTable, QueryError> {
        let mut table = CellTable::new(self.projections.to_vec());

        let (Some(first), Some(last)) = (ids.first(), ids.last()) else {
            debug!("Chunk {} is empty", self.context.chunk_index);
            return Ok(table);
        };

        info!(
            "Creating cell table (incl. {} projections) for {} cells: {}..{}",
            self.projections.len(),
            ids.len(),
            first,
            last
        );

        let positions = self.circuit.positions(ids)?;
        let step = (ids.len() / 5).max(1);

        for (idx, &id) in ids.iter().enumerate() {
            let position = *positions.get(&id).ok_or(QueryError::CellNotFound(id))?;

            let total_dendrite_length = self.circuit.morphology(id)?.total_dendrite_length();

            let synapses = self.circuit.afferent_synapses(id)?;
            let (local_e, local_i) = count_local_synapses(&synapses, self.membership);

            // Projections expose neither branch nor synapse type; every
            // projection synapse is counted as dendritic.
            let projection_counts = self
                .projections
                .iter()
                .map(|p| self.circuit.projection_afferent_count(p, id))
                .collect::<Result<Vec<_>, _>>()?;

            table.rows.push(CellRecord::new(
                id,
                position,
                total_dendrite_length,
                local_e,
                local_i,
                projection_counts,
            ));

            if self.context.report_progress && (idx == 0 || (idx + 1) % step == 0) {
                info!(
                    "PROGRESS [cells {}..{}]: {}%",
                    first,
                    last,
                    (100 * (idx + 1) + ids.len() / 2) / ids.len()
                );
            }
        }

        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::MemoryCircuit;
    use crate::models::{Morphology, NeuriteType, Position};

    fn morph(basal: f64, apical: f64) -> Option<Morphology> {
        Some(Morphology {
            lengths: [
                (NeuriteType::BasalDendrite, basal),
                (NeuriteType::ApicalDendrite, apical),
            ]
            .into_iter()
            .collect(),
        })
    }

    fn syn(pre: CellId, branch: NeuriteType, code: u32) -> AfferentSynapse {
        AfferentSynapse {
            pre_id: pre,
            post_branch_type: branch,
            synapse_type: code,
        }
    }

    fn ctx() -> WorkerContext {
        WorkerContext {
            chunk_index: 0,
            report_progress: true,
        }
    }

    /// Cells 1-4 form the target, 99 is outside of it.
    fn circuit() -> MemoryCircuit {
        let mut c = MemoryCircuit::new();
        c.add_cell(1, Position { x: 1.0, y: 2.0, z: 3.0 }, morph(150.0, 50.0))
            .unwrap();
        c.add_cell(2, Position::default(), morph(0.0, 0.0)).unwrap();
        c.add_cell(3, Position::default(), morph(100.0, 0.0)).unwrap();
        c.add_cell(4, Position::default(), None).unwrap();
        c.add_cell(99, Position::default(), morph(10.0, 10.0)).unwrap();
        c.add_target("T", vec![1, 2, 3, 4]).unwrap();

        // onto 1: 2 local E dendritic, 1 local I dendritic, one on soma, one external
        c.add_synapse(1, syn(2, NeuriteType::BasalDendrite, 113)).unwrap();
        c.add_synapse(1, syn(3, NeuriteType::ApicalDendrite, 100)).unwrap();
        c.add_synapse(1, syn(3, NeuriteType::BasalDendrite, 7)).unwrap();
        c.add_synapse(1, syn(2, NeuriteType::Soma, 120)).unwrap();
        c.add_synapse(1, syn(99, NeuriteType::BasalDendrite, 120)).unwrap();

        // onto 2: three local inhibitory
        for _ in 0..3 {
            c.add_synapse(2, syn(1, NeuriteType::BasalDendrite, 2)).unwrap();
        }

        c.add_projection("POm");
        for _ in 0..4 {
            c.add_projection_synapse("VPM", 1).unwrap();
        }
        c
    }

    #[test]
    fn test_count_local_synapses() {
        let membership = TargetMembership::new(&[1, 2]);
        let synapses = vec![
            syn(1, NeuriteType::BasalDendrite, 100),
            syn(2, NeuriteType::ApicalDendrite, 99),
            syn(2, NeuriteType::Axon, 120),
            syn(5, NeuriteType::BasalDendrite, 120),
        ];
        assert_eq!(count_local_synapses(&synapses, &membership), (1, 1));
        assert_eq!(count_local_synapses(&[], &membership), (0, 0));
    }

    #[test]
    fn test_extract_counts_and_densities() {
        let c = circuit();
        let membership = TargetMembership::new(&[1, 2, 3, 4]);
        let projections = c.projection_names().unwrap();
        let extractor = FeatureExtractor::new(&c, &membership, &projections, ctx());

        let table = extractor.extract(&[1, 2, 3]).unwrap();
        assert_eq!(table.ids(), vec![1, 2, 3]);
        assert_eq!(table.projections, vec!["POm", "VPM"]);

        let r1 = &table.rows[0];
        assert_eq!(r1.position, Position { x: 1.0, y: 2.0, z: 3.0 });
        assert_eq!(r1.total_dendrite_length, 200.0);
        assert_eq!((r1.local_e_syn_count, r1.local_i_syn_count), (2, 1));
        assert_eq!(r1.local_e_syn_density, 0.01);
        assert_eq!(r1.projection_counts, vec![0, 4]);
        assert_eq!(r1.projection_densities, vec![0.0, 0.02]);

        let r2 = &table.rows[1];
        assert_eq!(r2.local_i_syn_count, 3);
        assert!(r2.local_i_syn_density.is_nan());

        let r3 = &table.rows[2];
        assert_eq!((r3.local_e_syn_count, r3.local_i_syn_count), (0, 0));
        assert_eq!(r3.local_e_syn_density, 0.0);
    }

    #[test]
    fn test_membership_is_full_target_not_chunk() {
        let c = circuit();
        let membership = TargetMembership::new(&[1, 2, 3, 4]);
        let extractor = FeatureExtractor::new(&c, &membership, &[], ctx());

        // Chunk holds only cell 1, yet synapses from 2 and 3 are local.
        let table = extractor.extract(&[1]).unwrap();
        assert_eq!(table.rows[0].local_e_syn_count, 2);
        assert_eq!(table.rows[0].local_i_syn_count, 1);
    }

    #[test]
    fn test_smaller_target_drops_outside_synapses() {
        let c = circuit();
        let membership = TargetMembership::new(&[1, 3]);
        let extractor = FeatureExtractor::new(&c, &membership, &[], ctx());

        let table = extractor.extract(&[1]).unwrap();
        assert_eq!(table.rows[0].local_e_syn_count, 1);
        assert_eq!(table.rows[0].local_i_syn_count, 1);
    }

    #[test]
    fn test_empty_chunk() {
        let c = circuit();
        let membership = TargetMembership::new(&[1]);
        let projections = vec!["VPM".to_string()];
        let extractor = FeatureExtractor::new(&c, &membership, &projections, ctx());

        let table = extractor.extract(&[]).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.projections, projections);
    }

    #[test]
    fn test_missing_morphology_is_fatal() {
        let c = circuit();
        let membership = TargetMembership::new(&[1, 2, 3, 4]);
        let extractor = FeatureExtractor::new(&c, &membership, &[], ctx());

        assert!(matches!(
            extractor.extract(&[1, 4, 2]),
            Err(QueryError::MorphologyMissing(4))
        ));
    }

    #[test]
    fn test_unknown_cell_is_fatal() {
        let c = circuit();
        let membership = TargetMembership::new(&[1]);
        let extractor = FeatureExtractor::new(&c, &membership, &[], ctx());

        assert!(matches!(
            extractor.extract(&[1, 500]),
            Err(QueryError::CellNotFound(500))
        ));
    }
}
