//! Regression tree in split-node / leaf array form.
//!
//! Internal nodes and leaves live in separate arrays. A child pointer `c >= 0`
//! is an internal node, `c < 0` is leaf `!c`. A tree with `n` leaves has
//! `n - 1` internal nodes; a single-leaf tree has none.

use super::{MissingType, decision};

/// Threshold under which a value counts as zero for [`MissingType::Zero`].
pub const ZERO_THRESHOLD: f64 = 1e-35;

// ============================================================================
// TreeValidationError
// ============================================================================

/// Structural errors found in externally supplied trees.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeValidationError {
    #[error("tree must have at least one leaf")]
    NoLeaves,

    #[error("{field} has {actual} entries, expected {expected}")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("node {node} points to {child}, outside the tree")]
    ChildOutOfBounds { node: usize, child: i32 },

    #[error("node {node} is reached more than once")]
    DuplicateVisit { node: i32 },

    #[error("{count} nodes are unreachable from the root")]
    Unreachable { count: usize },

    #[error("split on feature {feature}, but the model has {n_features} features")]
    FeatureOutOfRange { feature: u32, n_features: usize },

    #[error("node {node} uses a categorical split")]
    Categorical { node: usize },
}

// ============================================================================
// Split records
// ============================================================================

/// Statistics of one side of a split.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LeafStats {
    pub value: f64,
    /// Sum of hessians.
    pub weight: f64,
    pub count: u32,
}

/// A numerical split applied to a leaf.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeSplit {
    pub feature: u32,
    /// Rows with `value <= threshold` go left.
    pub threshold: f64,
    pub gain: f64,
    pub left: LeafStats,
    pub right: LeafStats,
}

/// Raw arrays of a tree, as read from a model file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TreeParts {
    pub num_leaves: usize,
    pub split_feature: Vec<u32>,
    pub split_gain: Vec<f64>,
    pub threshold: Vec<f64>,
    pub decision_type: Vec<u8>,
    pub left_child: Vec<i32>,
    pub right_child: Vec<i32>,
    pub leaf_value: Vec<f64>,
    pub leaf_weight: Vec<f64>,
    pub leaf_count: Vec<u32>,
    pub internal_value: Vec<f64>,
    pub internal_weight: Vec<f64>,
    pub internal_count: Vec<u32>,
    pub shrinkage: f64,
}

// ============================================================================
// Tree
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    num_leaves: usize,

    split_feature: Vec<u32>,
    split_gain: Vec<f64>,
    threshold: Vec<f64>,
    decision_type: Vec<u8>,
    left_child: Vec<i32>,
    right_child: Vec<i32>,
    internal_value: Vec<f64>,
    internal_weight: Vec<f64>,
    internal_count: Vec<u32>,

    leaf_value: Vec<f64>,
    leaf_weight: Vec<f64>,
    leaf_count: Vec<u32>,
    leaf_parent: Vec<i32>,
    leaf_depth: Vec<u32>,

    shrinkage: f64,
}

impl Tree {
    /// Single-leaf tree.
    pub fn new_leaf(root: LeafStats) -> Self {
        Self {
            num_leaves: 1,
            split_feature: Vec::new(),
            split_gain: Vec::new(),
            threshold: Vec::new(),
            decision_type: Vec::new(),
            left_child: Vec::new(),
            right_child: Vec::new(),
            internal_value: Vec::new(),
            internal_weight: Vec::new(),
            internal_count: Vec::new(),
            leaf_value: vec![root.value],
            leaf_weight: vec![root.weight],
            leaf_count: vec![root.count],
            leaf_parent: vec![-1],
            leaf_depth: vec![0],
            shrinkage: 1.0,
        }
    }

    /// Split `leaf`. The left side keeps the leaf id, the right side gets
    /// the returned new id.
    pub fn split(&mut self, leaf: usize, split: &NodeSplit) -> usize {
        debug_assert!(leaf < self.num_leaves);
        let node = self.num_leaves - 1;
        let new_leaf = self.num_leaves;

        let parent = self.leaf_parent[leaf];
        if parent >= 0 {
            let parent = parent as usize;
            if self.left_child[parent] == !(leaf as i32) {
                self.left_child[parent] = node as i32;
            } else {
                self.right_child[parent] = node as i32;
            }
        }

        self.split_feature.push(split.feature);
        self.split_gain.push(split.gain);
        self.threshold.push(split.threshold);
        self.decision_type.push(decision::DEFAULT_LEFT);
        self.left_child.push(!(leaf as i32));
        self.right_child.push(!(new_leaf as i32));
        self.internal_value.push(self.leaf_value[leaf]);
        self.internal_weight.push(split.left.weight + split.right.weight);
        self.internal_count.push(split.left.count + split.right.count);

        let depth = self.leaf_depth[leaf] + 1;
        self.leaf_value[leaf] = split.left.value;
        self.leaf_weight[leaf] = split.left.weight;
        self.leaf_count[leaf] = split.left.count;
        self.leaf_parent[leaf] = node as i32;
        self.leaf_depth[leaf] = depth;

        self.leaf_value.push(split.right.value);
        self.leaf_weight.push(split.right.weight);
        self.leaf_count.push(split.right.count);
        self.leaf_parent.push(node as i32);
        self.leaf_depth.push(depth);

        self.num_leaves += 1;
        new_leaf
    }

    /// Multiply every output by `rate`.
    pub fn apply_shrinkage(&mut self, rate: f64) {
        self.leaf_value.iter_mut().for_each(|v| *v *= rate);
        self.internal_value.iter_mut().for_each(|v| *v *= rate);
        self.shrinkage *= rate;
    }

    /// Add a constant to every output.
    pub fn add_bias(&mut self, bias: f64) {
        self.leaf_value.iter_mut().for_each(|v| *v += bias);
        self.internal_value.iter_mut().for_each(|v| *v += bias);
    }

    /// Leaf reached by a row whose feature `f` reads as `feature_value(f)`.
    #[inline]
    pub fn leaf_index<F: Fn(usize) -> f64>(&self, feature_value: F) -> usize {
        if self.num_leaves <= 1 {
            return 0;
        }
        let mut node = 0i32;
        while node >= 0 {
            let n = node as usize;
            let value = feature_value(self.split_feature[n] as usize);
            node = if self.goes_left(n, value) {
                self.left_child[n]
            } else {
                self.right_child[n]
            };
        }
        !node as usize
    }

    #[inline]
    pub fn predict<F: Fn(usize) -> f64>(&self, feature_value: F) -> f64 {
        self.leaf_value[self.leaf_index(feature_value)]
    }

    #[inline]
    fn goes_left(&self, node: usize, value: f64) -> bool {
        let decision_type = self.decision_type[node];
        let missing = decision::missing_type(decision_type);
        let mut value = value;
        if value.is_nan() && missing != MissingType::NaN {
            value = 0.0;
        }
        let is_missing = match missing {
            MissingType::None => false,
            MissingType::Zero => value.abs() <= ZERO_THRESHOLD,
            MissingType::NaN => value.is_nan(),
        };
        if is_missing {
            decision::default_left(decision_type)
        } else {
            value <= self.threshold[node]
        }
    }

    // =========================================================================
    // Construction from parts
    // =========================================================================

    /// Build a tree from model-file arrays, checking that the arrays are
    /// consistent and describe a proper binary tree.
    pub fn from_parts(parts: TreeParts) -> Result<Self, TreeValidationError> {
        let n_leaves = parts.num_leaves;
        if n_leaves == 0 {
            return Err(TreeValidationError::NoLeaves);
        }
        let n_internal = n_leaves - 1;

        let check = |field: &'static str, expected: usize, actual: usize| {
            if expected == actual {
                Ok(())
            } else {
                Err(TreeValidationError::LengthMismatch { field, expected, actual })
            }
        };
        check("split_feature", n_internal, parts.split_feature.len())?;
        check("split_gain", n_internal, parts.split_gain.len())?;
        check("threshold", n_internal, parts.threshold.len())?;
        check("decision_type", n_internal, parts.decision_type.len())?;
        check("left_child", n_internal, parts.left_child.len())?;
        check("right_child", n_internal, parts.right_child.len())?;
        check("leaf_value", n_leaves, parts.leaf_value.len())?;

        if let Some(node) = parts.decision_type.iter().position(|&d| decision::is_categorical(d)) {
            return Err(TreeValidationError::Categorical { node });
        }

        let or_default = |v: Vec<f64>, n: usize| if v.len() == n { v } else { vec![0.0; n] };
        let or_default_count = |v: Vec<u32>, n: usize| if v.len() == n { v } else { vec![0; n] };

        // Walk from the root: every node and leaf exactly once
        let mut leaf_parent = vec![-1i32; n_leaves];
        let mut leaf_depth = vec![0u32; n_leaves];
        let mut seen_nodes = vec![false; n_internal];
        let mut seen_leaves = vec![false; n_leaves];
        if n_internal == 0 {
            seen_leaves[0] = true;
        } else {
            let mut stack: Vec<(i32, i32, u32)> = vec![(0, -1, 0)];
            while let Some((child, parent, depth)) = stack.pop() {
                if child >= 0 {
                    let n = child as usize;
                    if n >= n_internal {
                        return Err(TreeValidationError::ChildOutOfBounds {
                            node: parent.max(0) as usize,
                            child,
                        });
                    }
                    if std::mem::replace(&mut seen_nodes[n], true) {
                        return Err(TreeValidationError::DuplicateVisit { node: child });
                    }
                    stack.push((parts.left_child[n], child, depth + 1));
                    stack.push((parts.right_child[n], child, depth + 1));
                } else {
                    let leaf = !child as usize;
                    if leaf >= n_leaves {
                        return Err(TreeValidationError::ChildOutOfBounds {
                            node: parent.max(0) as usize,
                            child,
                        });
                    }
                    if std::mem::replace(&mut seen_leaves[leaf], true) {
                        return Err(TreeValidationError::DuplicateVisit { node: child });
                    }
                    leaf_parent[leaf] = parent;
                    leaf_depth[leaf] = depth;
                }
            }
        }
        let unreachable = seen_nodes.iter().chain(&seen_leaves).filter(|s| !**s).count();
        if unreachable > 0 {
            return Err(TreeValidationError::Unreachable { count: unreachable });
        }

        Ok(Self {
            num_leaves: n_leaves,
            split_feature: parts.split_feature,
            split_gain: parts.split_gain,
            threshold: parts.threshold,
            decision_type: parts.decision_type,
            left_child: parts.left_child,
            right_child: parts.right_child,
            internal_value: or_default(parts.internal_value, n_internal),
            internal_weight: or_default(parts.internal_weight, n_internal),
            internal_count: or_default_count(parts.internal_count, n_internal),
            leaf_value: parts.leaf_value,
            leaf_weight: or_default(parts.leaf_weight, n_leaves),
            leaf_count: or_default_count(parts.leaf_count, n_leaves),
            leaf_parent,
            leaf_depth,
            shrinkage: parts.shrinkage,
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[inline]
    pub fn num_leaves(&self) -> usize {
        self.num_leaves
    }

    pub fn shrinkage(&self) -> f64 {
        self.shrinkage
    }

    pub fn split_feature(&self) -> &[u32] {
        &self.split_feature
    }

    pub fn split_gain(&self) -> &[f64] {
        &self.split_gain
    }

    pub fn threshold(&self) -> &[f64] {
        &self.threshold
    }

    pub fn decision_type(&self) -> &[u8] {
        &self.decision_type
    }

    pub fn left_child(&self) -> &[i32] {
        &self.left_child
    }

    pub fn right_child(&self) -> &[i32] {
        &self.right_child
    }

    pub fn internal_value(&self) -> &[f64] {
        &self.internal_value
    }

    pub fn internal_weight(&self) -> &[f64] {
        &self.internal_weight
    }

    pub fn internal_count(&self) -> &[u32] {
        &self.internal_count
    }

    pub fn leaf_value(&self) -> &[f64] {
        &self.leaf_value
    }

    pub fn leaf_weight(&self) -> &[f64] {
        &self.leaf_weight
    }

    pub fn leaf_count(&self) -> &[u32] {
        &self.leaf_count
    }

    pub fn leaf_depth(&self) -> &[u32] {
        &self.leaf_depth
    }

    /// Deepest leaf depth, 0 for a single leaf.
    pub fn max_depth(&self) -> u32 {
        self.leaf_depth.iter().copied().max().unwrap_or(0)
    }
}
