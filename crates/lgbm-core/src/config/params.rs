//! `key=value` parameter strings.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::ConfigError;

/// Canonical parameter names with their accepted aliases.
const KNOWN_PARAMS: &[(&str, &[&str])] = &[
    ("objective", &["application", "app"]),
    ("metric", &["metrics", "metric_types"]),
    (
        "num_iterations",
        &[
            "num_iteration",
            "num_tree",
            "num_trees",
            "num_round",
            "num_rounds",
            "num_boost_round",
            "n_estimators",
        ],
    ),
    ("learning_rate", &["shrinkage_rate", "eta"]),
    ("num_leaves", &["num_leaf", "max_leaves"]),
    ("max_depth", &[]),
    (
        "min_data_in_leaf",
        &["min_data_per_leaf", "min_data", "min_child_samples"],
    ),
    (
        "min_sum_hessian_in_leaf",
        &[
            "min_sum_hessian_per_leaf",
            "min_sum_hessian",
            "min_hessian",
            "min_child_weight",
        ],
    ),
    ("lambda_l1", &["reg_alpha"]),
    ("lambda_l2", &["reg_lambda", "lambda"]),
    ("min_gain_to_split", &["min_split_gain"]),
    (
        "early_stopping_round",
        &["early_stopping_rounds", "early_stopping", "n_iter_no_change"],
    ),
    ("boost_from_average", &[]),
    ("sigmoid", &[]),
    (
        "is_provide_training_metric",
        &["is_training_metric", "training_metric"],
    ),
    ("metric_freq", &["output_freq"]),
    ("max_bin", &["max_bins"]),
    ("bin_construct_sample_cnt", &["subsample_for_bin"]),
    ("has_header", &["header"]),
    ("label_column", &["label"]),
    (
        "num_threads",
        &["num_thread", "nthread", "nthreads", "n_jobs"],
    ),
    ("verbose", &["verbosity"]),
];

fn canonical_name(key: &str) -> Option<&'static str> {
    KNOWN_PARAMS
        .iter()
        .find(|(name, aliases)| *name == key || aliases.contains(&key))
        .map(|(name, _)| *name)
}

/// Parsed parameters keyed by canonical name.
///
/// # Example
///
/// ```
/// use lgbm_core::config::Params;
///
/// let params = Params::parse("app=binary num_trees=10 eta=0.05").unwrap();
/// assert_eq!(params.get("objective"), Some("binary"));
/// assert_eq!(params.parse_value::<u32>("num_iterations").unwrap(), Some(10));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    values: BTreeMap<&'static str, String>,
}

impl Params {
    /// Parse whitespace-separated `key=value` tokens.
    ///
    /// A key given twice (directly or through an alias) must carry the same
    /// value both times.
    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        let mut values: BTreeMap<&'static str, String> = BTreeMap::new();
        for token in input.split_whitespace() {
            let (key, value) = token
                .split_once('=')
                .ok_or_else(|| ConfigError::MalformedToken(token.to_string()))?;
            let key = key.trim();
            let value = value.trim();
            if key.is_empty() {
                return Err(ConfigError::MalformedToken(token.to_string()));
            }
            let name =
                canonical_name(key).ok_or_else(|| ConfigError::UnknownParameter(key.to_string()))?;
            match values.get(name) {
                Some(existing) if existing != value => {
                    return Err(ConfigError::ConflictingValues {
                        key: name,
                        first: existing.clone(),
                        second: value.to_string(),
                    });
                }
                Some(_) => {}
                None => {
                    values.insert(name, value.to_string());
                }
            }
        }
        Ok(Self { values })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        self.values.iter().map(|(k, v)| (*k, v.as_str()))
    }

    /// Parse the value of `key`, `Ok(None)` when absent.
    pub fn parse_value<T: FromStr>(&self, key: &'static str) -> Result<Option<T>, ConfigError> {
        self.get(key)
            .map(|raw| {
                raw.parse::<T>().map_err(|_| ConfigError::InvalidValue {
                    key,
                    value: raw.to_string(),
                    expected: std::any::type_name::<T>(),
                })
            })
            .transpose()
    }

    /// Booleans accept `true`/`false`, `1`/`0`, `+`/`-`.
    pub fn parse_bool(&self, key: &'static str) -> Result<Option<bool>, ConfigError> {
        self.get(key)
            .map(|raw| match raw.to_ascii_lowercase().as_str() {
                "true" | "1" | "+" => Ok(true),
                "false" | "0" | "-" => Ok(false),
                _ => Err(ConfigError::InvalidValue {
                    key,
                    value: raw.to_string(),
                    expected: "bool",
                }),
            })
            .transpose()
    }
}

/// One `[key: value]` line per parameter, as in the model `parameters:` block.
impl fmt::Display for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.values {
            writeln!(f, "[{key}: {value}]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn parses_canonical_and_aliases() {
        let params =
            Params::parse("app=binary metric=auc num_leaves=31 verbose=0 n_estimators=5").unwrap();
        assert_eq!(params.get("objective"), Some("binary"));
        assert_eq!(params.get("metric"), Some("auc"));
        assert_eq!(params.parse_value::<u32>("num_leaves").unwrap(), Some(31));
        assert_eq!(params.parse_value::<i32>("verbose").unwrap(), Some(0));
        assert_eq!(params.parse_value::<u32>("num_iterations").unwrap(), Some(5));
    }

    #[test]
    fn empty_string_is_empty() {
        assert!(Params::parse("  ").unwrap().is_empty());
    }

    #[test]
    fn repeated_identical_values_are_fine() {
        let params = Params::parse("max_bin=15 max_bins=15").unwrap();
        assert_eq!(params.get("max_bin"), Some("15"));
    }

    #[rstest]
    #[case("max_bin=15 max_bin=16")]
    #[case("eta=0.1 learning_rate=0.2")]
    fn conflicting_values_rejected(#[case] input: &str) {
        assert!(matches!(
            Params::parse(input),
            Err(ConfigError::ConflictingValues { .. })
        ));
    }

    #[rstest]
    #[case("bogus_key=1", "UnknownParameter")]
    #[case("num_leaves", "MalformedToken")]
    #[case("=3", "MalformedToken")]
    fn rejects_bad_tokens(#[case] input: &str, #[case] variant: &str) {
        let err = Params::parse(input).unwrap_err();
        assert!(format!("{err:?}").starts_with(variant));
    }

    #[test]
    fn invalid_number_reported() {
        let params = Params::parse("num_leaves=abc").unwrap();
        assert!(matches!(
            params.parse_value::<u32>("num_leaves"),
            Err(ConfigError::InvalidValue { key: "num_leaves", .. })
        ));
    }

    #[test]
    fn booleans() {
        let params = Params::parse("has_header=true boost_from_average=0 training_metric=yes").unwrap();
        assert_eq!(params.parse_bool("has_header").unwrap(), Some(true));
        assert_eq!(params.parse_bool("boost_from_average").unwrap(), Some(false));
        assert!(params.parse_bool("is_provide_training_metric").is_err());
        assert_eq!(params.parse_bool("sigmoid").unwrap(), None);
    }

    #[test]
    fn display_lists_parameters() {
        let params = Params::parse("objective=binary max_bin=15").unwrap();
        assert_eq!(params.to_string(), "[max_bin: 15]\n[objective: binary]\n");
    }
}
