//! Ordered collection of trees.

use super::Tree;
use super::tree::TreeValidationError;

/// An additive ensemble: the raw score of a row is the sum of its leaf
/// values over the trees, in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Forest {
    trees: Vec<Tree>,
}

impl Forest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_tree(&mut self, tree: Tree) {
        self.trees.push(tree);
    }

    /// Keep only the first `n_trees` trees.
    pub fn truncate(&mut self, n_trees: usize) {
        self.trees.truncate(n_trees);
    }

    #[inline]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    #[inline]
    pub fn tree(&self, idx: usize) -> &Tree {
        &self.trees[idx]
    }

    pub fn trees(&self) -> impl Iterator<Item = &Tree> {
        self.trees.iter()
    }

    /// Trees used when `limit` iterations are requested; `None` or a limit
    /// past the end means all of them.
    pub fn used_trees(&self, limit: Option<usize>) -> usize {
        limit.map_or(self.trees.len(), |n| n.min(self.trees.len()))
    }

    /// Raw score of one row over the first `n_trees` trees.
    #[inline]
    pub fn predict_raw<F: Fn(usize) -> f64 + Copy>(&self, feature_value: F, n_trees: usize) -> f64 {
        self.trees[..n_trees]
            .iter()
            .fold(0.0, |acc, tree| acc + tree.predict(feature_value))
    }

    /// Leaf reached in each of the first `n_trees` trees.
    pub fn leaf_indices<F: Fn(usize) -> f64 + Copy>(&self, feature_value: F, n_trees: usize) -> Vec<usize> {
        self.trees[..n_trees]
            .iter()
            .map(|tree| tree.leaf_index(feature_value))
            .collect()
    }

    /// Highest feature index any split uses.
    pub fn max_split_feature(&self) -> Option<u32> {
        self.trees
            .iter()
            .flat_map(|t| t.split_feature().iter().copied())
            .max()
    }

    /// Number of splits on each feature over the first `n_trees` trees.
    pub fn split_counts(&self, n_features: usize, n_trees: usize) -> Vec<u32> {
        let mut counts = vec![0u32; n_features];
        for tree in &self.trees[..n_trees] {
            for &f in tree.split_feature() {
                if let Some(c) = counts.get_mut(f as usize) {
                    *c += 1;
                }
            }
        }
        counts
    }

    /// Validate every tree; returns the first failing tree's index.
    pub fn validate(&self, n_features: usize) -> Result<(), (usize, TreeValidationError)> {
        for (i, tree) in self.trees.iter().enumerate() {
            if let Some(&f) = tree.split_feature().iter().find(|&&f| f as usize >= n_features) {
                return Err((
                    i,
                    TreeValidationError::FeatureOutOfRange {
                        feature: f,
                        n_features,
                    },
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repr::{LeafStats, NodeSplit};

    fn stump(feature: u32, threshold: f64, left: f64, right: f64) -> Tree {
        let mut tree = Tree::new_leaf(LeafStats::default());
        tree.split(
            0,
            &NodeSplit {
                feature,
                threshold,
                gain: 1.0,
                left: LeafStats { value: left, weight: 1.0, count: 1 },
                right: LeafStats { value: right, weight: 1.0, count: 1 },
            },
        );
        tree
    }

    fn forest() -> Forest {
        let mut forest = Forest::new();
        forest.push_tree(stump(0, 0.5, 1.0, 2.0));
        forest.push_tree(stump(1, 0.0, 10.0, 20.0));
        forest.push_tree(stump(0, 1.5, 100.0, 200.0));
        forest
    }

    #[test]
    fn predict_sums_in_order() {
        let forest = forest();
        let row = [1.0, -1.0];
        let value = |f: usize| row[f];
        assert_eq!(forest.predict_raw(value, 3), 2.0 + 10.0 + 100.0);
        assert_eq!(forest.predict_raw(value, 1), 2.0);
        assert_eq!(forest.leaf_indices(value, 3), vec![1, 0, 0]);
    }

    #[test]
    fn used_trees_and_truncate() {
        let mut forest = forest();
        assert_eq!(forest.used_trees(None), 3);
        assert_eq!(forest.used_trees(Some(2)), 2);
        assert_eq!(forest.used_trees(Some(10)), 3);
        forest.truncate(1);
        assert_eq!(forest.n_trees(), 1);
    }

    #[test]
    fn split_counts_and_validation() {
        let forest = forest();
        assert_eq!(forest.split_counts(2, 3), vec![2, 1]);
        assert_eq!(forest.max_split_feature(), Some(1));
        assert!(forest.validate(2).is_ok());
        assert_eq!(forest.validate(1).unwrap_err().0, 1);
    }
}
