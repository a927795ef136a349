//! JSON dump of a model, in LightGBM's `dump_model` layout.

use serde::Serialize;

use super::Model;
use crate::repr::{MissingType, Tree, decision};
use crate::training::ObjectiveFn;

#[derive(Debug, Serialize)]
pub struct JsonModel<'a> {
    pub name: &'static str,
    pub version: &'static str,
    pub num_class: u32,
    pub num_tree_per_iteration: u32,
    pub label_index: usize,
    pub max_feature_idx: usize,
    pub objective: String,
    pub feature_names: &'a [String],
    pub feature_infos: &'a [String],
    pub tree_info: Vec<JsonTree>,
}

#[derive(Debug, Serialize)]
pub struct JsonTree {
    pub tree_index: usize,
    pub num_leaves: usize,
    pub num_cat: u32,
    pub shrinkage: f64,
    pub tree_structure: JsonNode,
}

/// A split or a leaf, nested from the root.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum JsonNode {
    Split {
        split_index: usize,
        split_feature: u32,
        split_gain: f64,
        threshold: f64,
        decision_type: &'static str,
        default_left: bool,
        missing_type: &'static str,
        internal_value: f64,
        internal_weight: f64,
        internal_count: u32,
        left_child: Box<JsonNode>,
        right_child: Box<JsonNode>,
    },
    Leaf {
        leaf_index: usize,
        leaf_value: f64,
        leaf_weight: f64,
        leaf_count: u32,
    },
}

impl<'a> JsonModel<'a> {
    pub fn new(model: &'a Model, n_trees: usize) -> Self {
        Self {
            name: "tree",
            version: "v4",
            num_class: 1,
            num_tree_per_iteration: 1,
            label_index: model.label_index,
            max_feature_idx: model.n_features().saturating_sub(1),
            objective: model.objective.model_string(),
            feature_names: &model.feature_names,
            feature_infos: &model.feature_infos,
            tree_info: model
                .forest
                .trees()
                .take(n_trees)
                .enumerate()
                .map(|(i, tree)| JsonTree {
                    tree_index: i,
                    num_leaves: tree.num_leaves(),
                    num_cat: 0,
                    shrinkage: tree.shrinkage(),
                    tree_structure: node(tree, if tree.num_leaves() > 1 { 0 } else { -1 }),
                })
                .collect(),
        }
    }
}

fn node(tree: &Tree, id: i32) -> JsonNode {
    if id < 0 {
        let leaf = !id as usize;
        return JsonNode::Leaf {
            leaf_index: leaf,
            leaf_value: tree.leaf_value()[leaf],
            leaf_weight: tree.leaf_weight()[leaf],
            leaf_count: tree.leaf_count()[leaf],
        };
    }
    let n = id as usize;
    let d = tree.decision_type()[n];
    JsonNode::Split {
        split_index: n,
        split_feature: tree.split_feature()[n],
        split_gain: tree.split_gain()[n],
        threshold: tree.threshold()[n],
        decision_type: "<=",
        default_left: decision::default_left(d),
        missing_type: match decision::missing_type(d) {
            MissingType::None => "None",
            MissingType::Zero => "Zero",
            MissingType::NaN => "NaN",
        },
        internal_value: tree.internal_value()[n],
        internal_weight: tree.internal_weight()[n],
        internal_count: tree.internal_count()[n],
        left_child: Box::new(node(tree, tree.left_child()[n])),
        right_child: Box::new(node(tree, tree.right_child()[n])),
    }
}
