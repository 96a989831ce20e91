//! Splitting an identifier sequence into ordered chunks.

use super::PipelineError;
use crate::models::CellId;

/// An ordered slice of the identifier set, tagged with its position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    pub ids: Vec<CellId>,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Split `ids` into `k` ordered chunks.
///
/// Every chunk but the last holds `ceil(len / k)` ids; the last one takes the
/// remainder. Chunks past the end of `ids` are empty.
pub fn split(ids: &[CellId], k: usize) -> Result<Vec<Chunk>, PipelineError> {
    if k == 0 {
        return Err(PipelineError::NoSplits);
    }

    let n = ids.len();
    let size = n.div_ceil(k);

    let chunks = (0..k)
        .map(|index| {
            let start = (index * size).min(n);
            let end = if index == k - 1 {
                n
            } else {
                ((index + 1) * size).min(n)
            };
            Chunk {
                index,
                ids: ids[start..end].to_vec(),
            }
        })
        .collect();

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn sizes(chunks: &[Chunk]) -> Vec<usize> {
        chunks.iter().map(Chunk::len).collect()
    }

    #[test]
    fn test_ten_into_three() {
        let ids: Vec<CellId> = (1..=10).collect();
        let chunks = split(&ids, 3).unwrap();
        assert_eq!(sizes(&chunks), vec![4, 4, 2]);
        assert_eq!(chunks[0].ids, vec![1, 2, 3, 4]);
        assert_eq!(chunks[2].ids, vec![9, 10]);
    }

    #[test]
    fn test_single_split() {
        let ids: Vec<CellId> = vec![5, 3, 9];
        let chunks = split(&ids, 1).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].ids, ids);
    }

    #[test]
    fn test_more_splits_than_ids() {
        let chunks = split(&[1, 2], 4).unwrap();
        assert_eq!(sizes(&chunks), vec![1, 1, 0, 0]);
        assert!(chunks[3].is_empty());
    }

    #[test]
    fn test_empty_input() {
        let chunks = split(&[], 3).unwrap();
        assert_eq!(sizes(&chunks), vec![0, 0, 0]);
    }

    #[test]
    fn test_zero_splits_rejected() {
        assert!(matches!(split(&[1], 0), Err(PipelineError::NoSplits)));
    }

    #[test]
    fn test_partition_properties() {
        for n in 0..40u64 {
            let ids: Vec<CellId> = (0..n).map(|i| i * 7 + 1).collect();
            for k in 1..12 {
                let chunks = split(&ids, k).unwrap();
                assert_eq!(chunks.len(), k);

                // Concatenation reproduces the input, so chunks are disjoint and cover it.
                let joined: Vec<CellId> = chunks.iter().flat_map(|c| c.ids.clone()).collect();
                assert_eq!(joined, ids);
                let unique: HashSet<_> = joined.iter().collect();
                assert_eq!(unique.len(), ids.len());

                let size = (n as usize).div_ceil(k);
                for (i, chunk) in chunks.iter().enumerate() {
                    assert_eq!(chunk.index, i);
                    assert!(chunk.len() <= size);
                }
                // All non-empty chunks but the last are full.
                let non_empty: Vec<_> = chunks.iter().filter(|c| !c.is_empty()).collect();
                if let Some((_, head)) = non_empty.split_last() {
                    assert!(head.iter().all(|c| c.len() == size));
                }
            }
        }
    }

    #[test]
    fn test_split_is_deterministic() {
        let ids: Vec<CellId> = (0..17).collect();
        assert_eq!(split(&ids, 5).unwrap(), split(&ids, 5).unwrap());
    }
}
