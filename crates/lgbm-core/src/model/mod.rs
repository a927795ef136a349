//! Trained models and their persisted forms.
//!
//! A [`Model`] is everything prediction needs: the forest, the objective
//! whose transform maps raw scores to outputs, and the feature metadata
//! written into the text format. Boosters build one while training; loading
//! a text model yields one directly.

mod json;
mod text;

use std::path::Path;

use crate::data::BinTable;
use crate::error::ErrorKind;
use crate::repr::{Forest, TreeValidationError};
use crate::training::Objective;

pub use json::{JsonModel, JsonNode, JsonTree};

// =============================================================================
// Errors
// =============================================================================

/// Failure to read a text model.
#[derive(Debug, thiserror::Error)]
pub enum ModelParseError {
    #[error("failed to read model file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("model is missing required field '{0}'")]
    MissingField(&'static str),

    #[error("invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    #[error("unsupported objective '{0}'")]
    UnsupportedObjective(String),

    #[error("unsupported model: {0}")]
    Unsupported(String),

    #[error("tree {index}: {source}")]
    InvalidTree {
        index: usize,
        #[source]
        source: TreeValidationError,
    },
}

impl ModelParseError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ModelParseError::Io { .. } => ErrorKind::ResourceUnavailable,
            _ => ErrorKind::MalformedInput,
        }
    }
}

// =============================================================================
// Model
// =============================================================================

/// A single-output tree ensemble with its metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    pub forest: Forest,
    pub objective: Objective,
    /// One name per feature; the feature count of the model.
    pub feature_names: Vec<String>,
    /// `[min:max]` per feature, `none` for constant features.
    pub feature_infos: Vec<String>,
    /// Column of the label in text files used for prediction.
    pub label_index: usize,
    /// `[key: value]` lines of the parameters block.
    pub parameters: Vec<String>,
}

impl Model {
    /// Empty model over the features described by `bin_table`.
    pub fn new(
        objective: Objective,
        feature_names: Vec<String>,
        bin_table: &BinTable,
        label_index: usize,
    ) -> Self {
        Self {
            forest: Forest::new(),
            objective,
            feature_infos: feature_infos(bin_table),
            feature_names,
            label_index,
            parameters: Vec::new(),
        }
    }

    #[inline]
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Text form with the first `num_iteration` trees; `None` writes all.
    pub fn to_text(&self, num_iteration: Option<usize>) -> String {
        text::write_model(self, self.forest.used_trees(num_iteration))
    }

    pub fn from_text(content: &str) -> Result<Self, ModelParseError> {
        text::parse_model(content)
    }

    pub fn save(&self, path: &Path, num_iteration: Option<usize>) -> crate::Result<()> {
        std::fs::write(path, self.to_text(num_iteration)).map_err(|e| crate::Error::io(path, e))
    }

    pub fn load(path: &Path) -> Result<Self, ModelParseError> {
        let content = std::fs::read_to_string(path).map_err(|source| ModelParseError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_text(&content)
    }

    /// JSON dump of the header and the first `num_iteration` trees.
    pub fn to_json(&self, num_iteration: Option<usize>) -> serde_json::Result<String> {
        let dump = JsonModel::new(self, self.forest.used_trees(num_iteration));
        serde_json::to_string(&dump)
    }

    /// `(name, count)` pairs of features used by at least one split,
    /// most used first.
    pub fn feature_importances(&self, n_trees: usize) -> Vec<(&str, u32)> {
        let counts = self.forest.split_counts(self.n_features(), n_trees);
        let mut pairs: Vec<(&str, u32)> = self
            .feature_names
            .iter()
            .map(String::as_str)
            .zip(counts)
            .filter(|&(_, c)| c > 0)
            .collect();
        pairs.sort_by(|a, b| b.1.cmp(&a.1));
        pairs
    }
}

fn feature_infos(bin_table: &BinTable) -> Vec<String> {
    bin_table
        .mappers()
        .iter()
        .map(|m| {
            if m.is_trivial() {
                "none".to_string()
            } else {
                format!("[{}:{}]", m.min_val(), m.max_val())
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::BinMapper;
    use crate::repr::{LeafStats, NodeSplit, Tree};

    pub(super) fn sample_model() -> Model {
        let table = BinTable::new(vec![
            BinMapper::numerical(vec![0.5, 1.5, f64::MAX], 0.0, 2.0),
            BinMapper::trivial(3.0),
            BinMapper::numerical(vec![-1.25, f64::MAX], -2.5, 4.0),
        ]);
        let names = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let mut model = Model::new(Objective::logistic_with_sigmoid(1.5), names, &table, 0);

        let mut tree = Tree::new_leaf(LeafStats::default());
        let right = tree.split(
            0,
            &NodeSplit {
                feature: 0,
                threshold: 0.5,
                gain: 12.25,
                left: LeafStats { value: -0.1, weight: 4.0, count: 4 },
                right: LeafStats { value: 0.3, weight: 6.0, count: 6 },
            },
        );
        tree.split(
            right,
            &NodeSplit {
                feature: 2,
                threshold: -1.25,
                gain: 1.0 / 3.0,
                left: LeafStats { value: 0.2, weight: 2.0, count: 2 },
                right: LeafStats { value: 0.35, weight: 4.0, count: 4 },
            },
        );
        tree.apply_shrinkage(0.1);
        model.forest.push_tree(tree);
        model.forest.push_tree(Tree::new_leaf(LeafStats {
            value: 0.01,
            weight: 10.0,
            count: 10,
        }));
        model.parameters = vec!["[objective: binary]".to_string()];
        model
    }

    #[test]
    fn feature_infos_mark_constant_features() {
        let model = sample_model();
        assert_eq!(model.feature_infos, vec!["[0:2]", "none", "[-2.5:4]"]);
    }

    #[test]
    fn importances_sorted_by_count() {
        let model = sample_model();
        assert_eq!(model.feature_importances(2), vec![("a", 1), ("c", 1)]);
        assert!(model.feature_importances(0).is_empty());
    }

    #[test]
    fn parse_errors_are_malformed_input() {
        let err = Model::from_text("tree\nversion=v4\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedInput);

        let err = Model::load(Path::new("/nonexistent/model.txt")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResourceUnavailable);
    }
}
