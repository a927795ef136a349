//! LightGBM v4 text model format.
//!
//! Line-based `key=value` header, one `Tree=i` block per tree, then
//! `end of trees`, feature importances and the parameters block. Floats are
//! written with Rust's shortest round-trip formatting, so a reloaded model
//! predicts bit-identically.

use std::collections::HashMap;
use std::fmt::{Display, Write};
use std::iter::Peekable;
use std::str::{FromStr, Lines};

use super::{Model, ModelParseError};
use crate::repr::{Forest, Tree, TreeParts};
use crate::training::{Objective, ObjectiveFn};

// =============================================================================
// Writing
// =============================================================================

fn join<T: Display>(values: &[T]) -> String {
    let mut out = String::new();
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        // Writing to a String cannot fail
        let _ = write!(out, "{v}");
    }
    out
}

fn write_tree(index: usize, tree: &Tree) -> String {
    let mut s = String::new();
    let _ = writeln!(s, "Tree={index}");
    let _ = writeln!(s, "num_leaves={}", tree.num_leaves());
    let _ = writeln!(s, "num_cat=0");
    if tree.num_leaves() > 1 {
        let _ = writeln!(s, "split_feature={}", join(tree.split_feature()));
        let _ = writeln!(s, "split_gain={}", join(tree.split_gain()));
        let _ = writeln!(s, "threshold={}", join(tree.threshold()));
        let _ = writeln!(s, "decision_type={}", join(tree.decision_type()));
        let _ = writeln!(s, "left_child={}", join(tree.left_child()));
        let _ = writeln!(s, "right_child={}", join(tree.right_child()));
    }
    let _ = writeln!(s, "leaf_value={}", join(tree.leaf_value()));
    let _ = writeln!(s, "leaf_weight={}", join(tree.leaf_weight()));
    let _ = writeln!(s, "leaf_count={}", join(tree.leaf_count()));
    if tree.num_leaves() > 1 {
        let _ = writeln!(s, "internal_value={}", join(tree.internal_value()));
        let _ = writeln!(s, "internal_weight={}", join(tree.internal_weight()));
        let _ = writeln!(s, "internal_count={}", join(tree.internal_count()));
    }
    let _ = writeln!(s, "is_linear=0");
    let _ = writeln!(s, "shrinkage={}", tree.shrinkage());
    s.push_str("\n\n");
    s
}

pub(super) fn write_model(model: &Model, n_trees: usize) -> String {
    let blocks: Vec<String> = model
        .forest
        .trees()
        .take(n_trees)
        .enumerate()
        .map(|(i, t)| write_tree(i, t))
        .collect();
    let sizes: Vec<usize> = blocks.iter().map(String::len).collect();

    let mut s = String::new();
    let _ = writeln!(s, "tree");
    let _ = writeln!(s, "version=v4");
    let _ = writeln!(s, "num_class=1");
    let _ = writeln!(s, "num_tree_per_iteration=1");
    let _ = writeln!(s, "label_index={}", model.label_index);
    let _ = writeln!(s, "max_feature_idx={}", model.n_features().saturating_sub(1));
    let _ = writeln!(s, "objective={}", model.objective.model_string());
    let _ = writeln!(s, "feature_names={}", model.feature_names.join(" "));
    let _ = writeln!(s, "feature_infos={}", model.feature_infos.join(" "));
    let _ = writeln!(s, "tree_sizes={}", join(&sizes));
    s.push('\n');
    for block in &blocks {
        s.push_str(block);
    }
    s.push_str("end of trees\n\n");

    s.push_str("feature_importances:\n");
    for (name, count) in model.feature_importances(n_trees) {
        let _ = writeln!(s, "{name}={count}");
    }

    s.push_str("\nparameters:\n");
    for line in &model.parameters {
        let _ = writeln!(s, "{line}");
    }
    s.push_str("end of parameters\n\npandas_categorical:null\n");
    s
}

// =============================================================================
// Parsing
// =============================================================================

type LineIter<'a> = Peekable<Lines<'a>>;

/// `key=value` pairs up to the next blank line or `Tree=` line.
fn read_section<'a>(lines: &mut LineIter<'a>) -> HashMap<&'a str, &'a str> {
    let mut kv = HashMap::new();
    while let Some(&line) = lines.peek() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() || line.starts_with("Tree=") || line == "end of trees" {
            break;
        }
        lines.next();
        if let Some((key, value)) = line.split_once('=') {
            kv.insert(key, value);
        }
    }
    kv
}

fn parse_scalar<T: FromStr>(field: &str, value: &str) -> Result<T, ModelParseError> {
    value.trim().parse().map_err(|_| ModelParseError::InvalidValue {
        field: field.to_string(),
        message: format!("cannot parse '{value}'"),
    })
}

fn parse_array<T: FromStr>(field: &str, value: &str) -> Result<Vec<T>, ModelParseError> {
    value
        .split_whitespace()
        .map(|v| parse_scalar(field, v))
        .collect()
}

fn required<'a>(kv: &HashMap<&str, &'a str>, field: &'static str) -> Result<&'a str, ModelParseError> {
    kv.get(field).copied().ok_or(ModelParseError::MissingField(field))
}

fn optional_array<T: FromStr>(
    kv: &HashMap<&str, &str>,
    field: &'static str,
) -> Result<Vec<T>, ModelParseError> {
    kv.get(field).map_or(Ok(Vec::new()), |v| parse_array(field, v))
}

/// Per-split array, required unless the tree is a single leaf.
fn split_array<T: FromStr>(
    kv: &HashMap<&str, &str>,
    field: &'static str,
    num_leaves: usize,
) -> Result<Vec<T>, ModelParseError> {
    if num_leaves > 1 {
        parse_array(field, required(kv, field)?)
    } else {
        Ok(Vec::new())
    }
}

fn parse_tree(index: usize, kv: &HashMap<&str, &str>) -> Result<Tree, ModelParseError> {
    let num_leaves: usize = parse_scalar("num_leaves", required(kv, "num_leaves")?)?;
    let num_cat: usize = kv.get("num_cat").map_or(Ok(0), |v| parse_scalar("num_cat", v))?;
    if num_cat > 0 {
        return Err(ModelParseError::Unsupported(format!(
            "tree {index} uses categorical splits"
        )));
    }
    if kv.get("is_linear").is_some_and(|v| v.trim() != "0") {
        return Err(ModelParseError::Unsupported(format!("tree {index} is linear")));
    }

    let split_feature = split_array(kv, "split_feature", num_leaves)?;
    let threshold = split_array(kv, "threshold", num_leaves)?;
    let left_child = split_array(kv, "left_child", num_leaves)?;
    let right_child = split_array(kv, "right_child", num_leaves)?;
    let n_internal = num_leaves.saturating_sub(1);
    let split_gain = match kv.get("split_gain") {
        Some(v) => parse_array("split_gain", v)?,
        None => vec![0.0; n_internal],
    };
    let decision_type = match kv.get("decision_type") {
        Some(v) => parse_array("decision_type", v)?,
        None => vec![0; n_internal],
    };

    let parts = TreeParts {
        num_leaves,
        split_feature,
        split_gain,
        threshold,
        decision_type,
        left_child,
        right_child,
        leaf_value: parse_array("leaf_value", required(kv, "leaf_value")?)?,
        leaf_weight: optional_array(kv, "leaf_weight")?,
        leaf_count: optional_array(kv, "leaf_count")?,
        internal_value: optional_array(kv, "internal_value")?,
        internal_weight: optional_array(kv, "internal_weight")?,
        internal_count: optional_array(kv, "internal_count")?,
        shrinkage: kv.get("shrinkage").map_or(Ok(1.0), |v| parse_scalar("shrinkage", v))?,
    };
    Tree::from_parts(parts).map_err(|source| ModelParseError::InvalidTree { index, source })
}

/// Lines of the `parameters:` block, if present.
fn parse_parameters(lines: &mut LineIter<'_>) -> Vec<String> {
    let mut params = Vec::new();
    let mut inside = false;
    for line in lines {
        let line = line.trim_end_matches('\r');
        if line == "parameters:" {
            inside = true;
        } else if line == "end of parameters" {
            break;
        } else if inside && !line.is_empty() {
            params.push(line.to_string());
        }
    }
    params
}

pub(super) fn parse_model(content: &str) -> Result<Model, ModelParseError> {
    let mut lines = content.lines().peekable();

    // Optional model type line
    if lines.peek().is_some_and(|l| !l.contains('=')) {
        lines.next();
    }
    let header = read_section(&mut lines);

    let num_class: usize = parse_scalar("num_class", required(&header, "num_class")?)?;
    let per_iteration: usize = header
        .get("num_tree_per_iteration")
        .map_or(Ok(1), |v| parse_scalar("num_tree_per_iteration", v))?;
    if num_class != 1 || per_iteration != 1 {
        return Err(ModelParseError::Unsupported(format!(
            "num_class={num_class}, num_tree_per_iteration={per_iteration}"
        )));
    }
    let max_feature_idx: usize = parse_scalar("max_feature_idx", required(&header, "max_feature_idx")?)?;
    let n_features = max_feature_idx + 1;
    let label_index: usize = header
        .get("label_index")
        .map_or(Ok(0), |v| parse_scalar("label_index", v))?;
    let objective_str = required(&header, "objective")?;
    let objective = Objective::from_model_string(objective_str)
        .ok_or_else(|| ModelParseError::UnsupportedObjective(objective_str.to_string()))?;

    let feature_names: Vec<String> = match header.get("feature_names") {
        Some(v) => v.split_whitespace().map(str::to_string).collect(),
        None => (0..n_features).map(|i| format!("Column_{i}")).collect(),
    };
    if feature_names.len() != n_features {
        return Err(ModelParseError::InvalidValue {
            field: "feature_names".to_string(),
            message: format!("{} names for {n_features} features", feature_names.len()),
        });
    }
    let feature_infos: Vec<String> = match header.get("feature_infos") {
        Some(v) => v.split_whitespace().map(str::to_string).collect(),
        None => vec!["none".to_string(); n_features],
    };

    let mut forest = Forest::new();
    loop {
        let Some(&line) = lines.peek() else {
            return Err(ModelParseError::MissingField("end of trees"));
        };
        let line = line.trim_end_matches('\r');
        if line == "end of trees" {
            lines.next();
            break;
        }
        lines.next();
        let Some(index) = line.strip_prefix("Tree=") else {
            continue;
        };
        let index: usize = parse_scalar("Tree", index)?;
        if index != forest.n_trees() {
            return Err(ModelParseError::InvalidValue {
                field: "Tree".to_string(),
                message: format!("expected tree {}, found tree {index}", forest.n_trees()),
            });
        }
        let kv = read_section(&mut lines);
        forest.push_tree(parse_tree(index, &kv)?);
    }
    if let Some(sizes) = header.get("tree_sizes") {
        let declared = sizes.split_whitespace().count();
        if declared != forest.n_trees() {
            return Err(ModelParseError::InvalidValue {
                field: "tree_sizes".to_string(),
                message: format!("{declared} sizes for {} trees", forest.n_trees()),
            });
        }
    }
    forest
        .validate(n_features)
        .map_err(|(index, source)| ModelParseError::InvalidTree { index, source })?;

    let parameters = parse_parameters(&mut lines);

    Ok(Model {
        forest,
        objective,
        feature_names,
        feature_infos,
        label_index,
        parameters,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::model::tests::sample_model;
    use rstest::rstest;

    #[test]
    fn round_trip_is_exact() {
        let model = sample_model();
        let text = model.to_text(None);
        let parsed = Model::from_text(&text).unwrap();
        assert_eq!(parsed, model);
        assert_eq!(parsed.to_text(None), text);
    }

    #[test]
    fn header_and_sections() {
        let text = sample_model().to_text(None);
        assert!(text.starts_with("tree\nversion=v4\nnum_class=1\n"));
        assert!(text.contains("objective=binary sigmoid:1.5\n"));
        assert!(text.contains("max_feature_idx=2\n"));
        assert!(text.contains("feature_infos=[0:2] none [-2.5:4]\n"));
        assert!(text.contains("\nend of trees\n"));
        assert!(text.contains("feature_importances:\na=1\nc=1\n"));
        assert!(text.contains("parameters:\n[objective: binary]\nend of parameters\n"));
    }

    #[test]
    fn tree_sizes_match_blocks() {
        let text = sample_model().to_text(None);
        let sizes: Vec<usize> = text
            .lines()
            .find_map(|l| l.strip_prefix("tree_sizes="))
            .unwrap()
            .split(' ')
            .map(|s| s.parse().unwrap())
            .collect();
        let start = text.find("Tree=0").unwrap();
        let second = &text[start + sizes[0]..];
        assert!(second.starts_with("Tree=1\n"));
        assert!(second[sizes[1]..].starts_with("end of trees"));
    }

    #[rstest]
    #[case::at_tree_boundary("Tree=1")]
    #[case::before_terminator("end of trees")]
    fn truncated_models_are_rejected(#[case] cut_at: &str) {
        let text = sample_model().to_text(None);
        let cut = &text[..text.find(cut_at).unwrap()];
        let err = Model::from_text(cut).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedInput, "{err}");
    }

    #[test]
    fn dropped_tree_block_is_rejected() {
        let text = sample_model().to_text(None);
        let start = text.find("Tree=1").unwrap();
        let end = text.find("end of trees").unwrap();
        let spliced = format!("{}{}", &text[..start], &text[end..]);
        let err = Model::from_text(&spliced).unwrap_err();
        assert!(matches!(err, ModelParseError::InvalidValue { ref field, .. } if field == "tree_sizes"), "{err}");
    }

    #[test]
    fn num_iteration_limits_trees() {
        let model = sample_model();
        let parsed = Model::from_text(&model.to_text(Some(1))).unwrap();
        assert_eq!(parsed.forest.n_trees(), 1);
        let parsed = Model::from_text(&model.to_text(Some(10))).unwrap();
        assert_eq!(parsed.forest.n_trees(), 2);
    }

    #[rstest]
    #[case::bad_number("leaf_value=0.01", "leaf_value=x")]
    #[case::missing_field("threshold=", "thresh=")]
    #[case::short_array("left_child=-1 -2", "left_child=-1")]
    #[case::categorical("num_cat=0\nsplit_feature", "num_cat=1\nsplit_feature")]
    #[case::objective("objective=binary sigmoid:1.5", "objective=lambdarank")]
    #[case::bad_feature("split_feature=0 2", "split_feature=0 7")]
    #[case::multiclass("num_class=1", "num_class=3")]
    fn malformed_models_are_rejected(#[case] from: &str, #[case] to: &str) {
        let text = sample_model().to_text(None);
        assert!(text.contains(from), "fixture lacks {from:?}");
        let broken = text.replacen(from, to, 1);
        let err = Model::from_text(&broken).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedInput, "{err}");
    }
}
