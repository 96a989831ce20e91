//! Merging partial tables into the final table.

use super::PipelineError;
use crate::models::CellTable;

/// Merge partial tables tagged with their chunk index.
///
/// Parts may arrive in any completion order; rows are concatenated in chunk
/// index order. Every part must carry the `projections` schema.
pub fn merge(
    projections: &[String],
    mut parts: Vec<(usize, CellTable)>,
) -> Result<CellTable, PipelineError> {
    parts.sort_by_key(|(index, _)| *index);

    let mut merged = CellTable::new(projections.to_vec());
    merged.rows.reserve(parts.iter().map(|(_, t)| t.len()).sum());

    for (index, part) in parts {
        if part.projections != projections {
            return Err(PipelineError::SchemaMismatch {
                chunk: index,
                expected: projections.to_vec(),
                found: part.projections,
            });
        }
        merged.rows.extend(part.rows);
    }

    Ok(merged)
}
