//! Row partitioning for tree training.
//!
//! All row indices live in one buffer; each leaf owns a contiguous range.
//! Splitting a leaf partitions its range in place: left rows stay at the
//! front under the old leaf id, right rows form the range of a new leaf.
//!
//! ```text
//! Initial (all rows in leaf 0):
//!   indices: [0, 1, 2, 3, 4, 5, 6, 7]
//!   leaf_begin: [0], leaf_count: [8]
//!
//! After splitting leaf 0 (rows 0,2,4,6 go left, 1,3,5,7 go right):
//!   indices: [0, 2, 4, 6, 1, 3, 5, 7]
//!   leaf_begin: [0, 4], leaf_count: [4, 4]
//! ```

use crate::data::BinColumn;

pub struct RowPartitioner {
    indices: Box<[u32]>,
    leaf_begin: Vec<u32>,
    leaf_count: Vec<u32>,
    n_leaves: usize,
}

impl RowPartitioner {
    pub fn new(n_rows: usize, max_leaves: usize) -> Self {
        let mut partitioner = Self {
            indices: (0..n_rows as u32).collect(),
            leaf_begin: vec![0; max_leaves.max(1)],
            leaf_count: vec![0; max_leaves.max(1)],
            n_leaves: 0,
        };
        partitioner.reset();
        partitioner
    }

    /// Put every row back into leaf 0.
    pub fn reset(&mut self) {
        for (i, idx) in self.indices.iter_mut().enumerate() {
            *idx = i as u32;
        }
        self.leaf_begin.fill(0);
        self.leaf_count.fill(0);
        self.leaf_count[0] = self.indices.len() as u32;
        self.n_leaves = 1;
    }

    #[inline]
    pub fn leaf_indices(&self, leaf: usize) -> &[u32] {
        let begin = self.leaf_begin[leaf] as usize;
        let count = self.leaf_count[leaf] as usize;
        &self.indices[begin..begin + count]
    }

    #[inline]
    pub fn leaf_count(&self, leaf: usize) -> u32 {
        self.leaf_count[leaf]
    }

    #[inline]
    pub fn n_leaves(&self) -> usize {
        self.n_leaves
    }

    /// Move rows of `leaf` with `bin > split_bin` into a new leaf.
    ///
    /// Returns `(right_leaf, left_count, right_count)`.
    pub fn split(&mut self, leaf: usize, column: &BinColumn, split_bin: u32) -> (usize, u32, u32) {
        let begin = self.leaf_begin[leaf] as usize;
        let end = begin + self.leaf_count[leaf] as usize;

        let mut left_end = begin;
        for i in begin..end {
            if column.get(self.indices[i] as usize) <= split_bin {
                self.indices.swap(i, left_end);
                left_end += 1;
            }
        }

        let left_count = (left_end - begin) as u32;
        let right_count = (end - left_end) as u32;
        self.leaf_count[leaf] = left_count;

        let right_leaf = self.n_leaves;
        if right_leaf >= self.leaf_begin.len() {
            self.leaf_begin.push(0);
            self.leaf_count.push(0);
        }
        self.leaf_begin[right_leaf] = left_end as u32;
        self.leaf_count[right_leaf] = right_count;
        self.n_leaves += 1;

        (right_leaf, left_count, right_count)
    }
}
