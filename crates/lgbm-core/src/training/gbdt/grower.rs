//! Leaf-wise tree grower.
//!
//! Repeatedly splits the leaf with the highest gain until the leaf budget is
//! used up or no leaf has a positive-gain split. Only the smaller child of a
//! split gets its histogram built from rows; the larger one is derived as
//! `parent - smaller`.

use crate::config::BoosterConfig;
use crate::data::Dataset;
use crate::repr::{LeafStats, NodeSplit, Tree};
use crate::training::GradsTuple;
use crate::utils::Parallelism;

use super::histograms::Histogram;
use super::partition::RowPartitioner;
use super::split::{GainParams, SideSums, SplitInfo, find_best_split};

/// Parameters for tree growth.
#[derive(Clone, Debug)]
pub struct GrowerParams {
    /// Maximum number of leaves per tree.
    pub num_leaves: u32,
    /// Maximum depth of a leaf; `None` for unlimited.
    pub max_depth: Option<u32>,
    pub gain: GainParams,
}

impl Default for GrowerParams {
    fn default() -> Self {
        Self {
            num_leaves: 31,
            max_depth: None,
            gain: GainParams::default(),
        }
    }
}

impl From<&BoosterConfig> for GrowerParams {
    fn from(config: &BoosterConfig) -> Self {
        Self {
            num_leaves: config.tree.num_leaves,
            max_depth: config.tree.max_depth(),
            gain: GainParams::from(&config.regularization),
        }
    }
}

/// Per-leaf growth state, indexed by leaf id.
struct LeafState {
    depth: u32,
    histogram: Option<Histogram>,
    best: Option<SplitInfo>,
}

pub struct TreeGrower {
    params: GrowerParams,
    partitioner: RowPartitioner,
    offsets: Vec<usize>,
    leaves: Vec<LeafState>,
}

impl TreeGrower {
    pub fn new(dataset: &Dataset, params: GrowerParams) -> Self {
        let max_leaves = params.num_leaves.max(1) as usize;
        Self {
            partitioner: RowPartitioner::new(dataset.num_data(), max_leaves),
            offsets: dataset.bin_table().bin_offsets(),
            leaves: Vec::with_capacity(max_leaves),
            params,
        }
    }

    pub fn params(&self) -> &GrowerParams {
        &self.params
    }

    /// Grow one tree on `dataset` for the given gradient pairs.
    ///
    /// Leaf values are raw Newton steps; shrinkage is left to the caller.
    pub fn grow(&mut self, dataset: &Dataset, grads: &[GradsTuple], parallelism: Parallelism) -> Tree {
        debug_assert_eq!(grads.len(), dataset.num_data());
        self.partitioner.reset();
        self.leaves.clear();

        let root_sums = grads.iter().fold(
            SideSums {
                count: grads.len() as u32,
                ..SideSums::default()
            },
            |mut acc, p| {
                acc.grad += p.grad as f64;
                acc.hess += p.hess as f64;
                acc
            },
        );
        let mut tree = Tree::new_leaf(self.leaf_stats(&root_sums));

        let root_hist = Histogram::build(
            &self.offsets,
            dataset.columns(),
            self.partitioner.leaf_indices(0),
            grads,
            parallelism,
        );
        self.push_leaf(dataset, root_sums, 0, root_hist, parallelism);

        while tree.num_leaves() < self.params.num_leaves as usize {
            let Some((leaf, split)) = self.pick_leaf() else {
                break;
            };
            self.apply_split(dataset, grads, &mut tree, leaf, split, parallelism);
        }

        tree
    }

    /// Add the last grown tree's leaf values to `scores`, using the final
    /// row partition instead of traversing the tree.
    ///
    /// `tree` must be the tree returned by the latest [`grow`](Self::grow),
    /// possibly rescaled.
    pub fn update_scores(&self, tree: &Tree, scores: &mut [f64]) {
        debug_assert_eq!(tree.num_leaves(), self.partitioner.n_leaves());
        for (leaf, &value) in tree.leaf_value().iter().enumerate() {
            for &row in self.partitioner.leaf_indices(leaf) {
                scores[row as usize] += value;
            }
        }
    }

    fn leaf_stats(&self, sums: &SideSums) -> LeafStats {
        LeafStats {
            value: self.params.gain.leaf_output(sums.grad, sums.hess),
            weight: sums.hess,
            count: sums.count,
        }
    }

    fn can_split(&self, depth: u32, sums: &SideSums) -> bool {
        self.params.max_depth.is_none_or(|d| depth < d)
            && sums.count >= 2 * self.params.gain.min_data_in_leaf.max(1)
    }

    /// Register a new leaf and evaluate its best split.
    fn push_leaf(
        &mut self,
        dataset: &Dataset,
        sums: SideSums,
        depth: u32,
        histogram: Histogram,
        parallelism: Parallelism,
    ) {
        let state = self.evaluate(dataset, sums, depth, histogram, parallelism);
        self.leaves.push(state);
    }

    fn evaluate(
        &self,
        dataset: &Dataset,
        sums: SideSums,
        depth: u32,
        histogram: Histogram,
        parallelism: Parallelism,
    ) -> LeafState {
        if !self.can_split(depth, &sums) {
            return LeafState {
                depth,
                histogram: None,
                best: None,
            };
        }
        let best = find_best_split(
            &histogram,
            &self.offsets,
            dataset.bin_table(),
            &sums,
            &self.params.gain,
            parallelism,
        );
        LeafState {
            depth,
            histogram: best.is_some().then_some(histogram),
            best,
        }
    }

    /// Leaf with the highest gain; ties go to the lowest leaf id.
    fn pick_leaf(&self) -> Option<(usize, SplitInfo)> {
        self.leaves
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.best.map(|b| (i, b)))
            .fold(None, |best: Option<(usize, SplitInfo)>, (i, b)| match best {
                Some((_, cur)) if cur.gain >= b.gain => best,
                _ => Some((i, b)),
            })
    }

    fn apply_split(
        &mut self,
        dataset: &Dataset,
        grads: &[GradsTuple],
        tree: &mut Tree,
        leaf: usize,
        split: SplitInfo,
        parallelism: Parallelism,
    ) {
        let feature = split.feature as usize;
        let threshold = dataset.bin_table().mapper(feature).bin_to_value(split.bin);

        let (right_leaf, left_count, right_count) =
            self.partitioner.split(leaf, dataset.column(feature), split.bin);
        debug_assert_eq!(left_count, split.left.count);
        debug_assert_eq!(right_count, split.right.count);

        let new_leaf = tree.split(
            leaf,
            &NodeSplit {
                feature: split.feature,
                threshold,
                gain: split.gain,
                left: self.leaf_stats(&split.left),
                right: self.leaf_stats(&split.right),
            },
        );
        debug_assert_eq!(new_leaf, right_leaf);

        let parent = &mut self.leaves[leaf];
        let depth = parent.depth + 1;
        let parent_hist = parent.histogram.take();
        parent.best = None;

        // No further splits once the budget is spent.
        let budget_left = tree.num_leaves() < self.params.num_leaves as usize;
        let (left_hist, right_hist) = match parent_hist {
            Some(parent_hist) if budget_left => {
                let build_left = left_count <= right_count;
                let small_leaf = if build_left { leaf } else { right_leaf };
                let small = Histogram::build(
                    &self.offsets,
                    dataset.columns(),
                    self.partitioner.leaf_indices(small_leaf),
                    grads,
                    parallelism,
                );
                let large = Histogram::sibling(&parent_hist, &small);
                if build_left { (small, large) } else { (large, small) }
            }
            _ => {
                self.leaves[leaf] = LeafState {
                    depth,
                    histogram: None,
                    best: None,
                };
                self.leaves.push(LeafState {
                    depth,
                    histogram: None,
                    best: None,
                });
                return;
            }
        };

        let left = self.evaluate(dataset, split.left, depth, left_hist, parallelism);
        self.leaves[leaf] = left;
        self.push_leaf(dataset, split.right, depth, right_hist, parallelism);
    }
}
