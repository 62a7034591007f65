//! Indexing glue: canonicalize already-materialized index arrays (over the
//! individual or variant dimension) into bounds-checked `usize` positions.
//! Negative-index normalization, slice expansion, and boolean-mask
//! conversion are the out-of-scope outer wrapper's job; this layer only
//! ever sees plain integer arrays and validates them.

use itertools::Itertools;

use crate::error::{CustomError, Result};

/// A validated, materialized index array over one matrix dimension.
#[derive(Debug, Clone)]
pub struct BoundedIndex {
    positions: Vec<usize>,
}

impl BoundedIndex {
    /// Validates `raw` against `bound` (an exclusive upper bound: the
    /// dimension's size). Negative values and out-of-range values are both
    /// reported as `IndexOutOfBounds`, deterministically choosing the
    /// smallest offending index (scanning in sorted order, the same
    /// `itertools::sorted` idiom used to find the first bad index when
    /// validating variant-keep sets).
    pub fn validate(raw: &[i64], bound: usize) -> Result<Self> {
        if raw.len() > i32::MAX as usize {
            return Err(CustomError::IndexTooLarge { len: raw.len() });
        }
        if let Some(&bad) = raw.iter().sorted().find(|&&v| v < 0 || v as usize >= bound) {
            return Err(CustomError::IndexOutOfBounds { idx: bad, bound });
        }
        let positions = raw.iter().map(|&v| v as usize).collect();
        Ok(Self { positions })
    }

    /// The full `0..bound` index, used when the caller requests "all".
    pub fn full(bound: usize) -> Self {
        Self {
            positions: (0..bound).collect(),
        }
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.positions
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_in_bounds_indices_with_duplicates_and_reorder() {
        let idx = BoundedIndex::validate(&[2, 0, 2, 1], 3).unwrap();
        assert_eq!(idx.as_slice(), &[2, 0, 2, 1]);
    }

    #[test]
    fn rejects_negative_index() {
        let err = BoundedIndex::validate(&[0, -1, 2], 3).unwrap_err();
        match err {
            CustomError::IndexOutOfBounds { idx, bound } => {
                assert_eq!(idx, -1);
                assert_eq!(bound, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn rejects_index_at_or_past_bound() {
        let err = BoundedIndex::validate(&[0, 3], 3).unwrap_err();
        match err {
            CustomError::IndexOutOfBounds { idx, .. } => assert_eq!(idx, 3),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn full_covers_the_whole_dimension() {
        let idx = BoundedIndex::full(4);
        assert_eq!(idx.as_slice(), &[0, 1, 2, 3]);
    }

    #[test]
    fn empty_index_is_allowed() {
        let idx = BoundedIndex::validate(&[], 5).unwrap();
        assert!(idx.is_empty());
    }
}
