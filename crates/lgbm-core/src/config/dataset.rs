//! Dataset construction settings.

use bon::Builder;

use super::{ConfigError, Params};
use crate::data::BinningConfig;
use crate::training::Verbosity;

/// How raw values are read and binned.
///
/// ```
/// use lgbm_core::config::{DatasetConfig, Params};
///
/// let params = Params::parse("max_bin=15 header=true").unwrap();
/// let config = DatasetConfig::from_params(&params).unwrap();
/// assert_eq!(config.binning.max_bins, 15);
/// assert!(config.has_header);
/// ```
#[derive(Debug, Clone, PartialEq, Builder)]
#[builder(
    derive(Clone, Debug),
    finish_fn(vis = "", name = __build_internal)
)]
pub struct DatasetConfig {
    #[builder(default)]
    pub binning: BinningConfig,

    /// Text files start with a header row of column names.
    #[builder(default)]
    pub has_header: bool,

    /// Index of the label column in text files.
    #[builder(default)]
    pub label_column: usize,

    /// Worker threads; 0 uses all cores.
    #[builder(default)]
    pub num_threads: usize,

    #[builder(default)]
    pub verbosity: Verbosity,
}

impl<S: dataset_config_builder::IsComplete> DatasetConfigBuilder<S> {
    pub fn build(self) -> Result<DatasetConfig, ConfigError> {
        let config = self.__build_internal();
        config.validate()?;
        Ok(config)
    }
}

impl DatasetConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(2..=65535).contains(&self.binning.max_bins) {
            return Err(ConfigError::out_of_range(
                "max_bin",
                self.binning.max_bins,
                "between 2 and 65535",
            ));
        }
        if self.binning.sample_cnt == 0 {
            return Err(ConfigError::out_of_range("bin_construct_sample_cnt", 0, "at least 1"));
        }
        Ok(())
    }

    /// Read dataset settings from a parameter string; booster-only keys
    /// are ignored.
    pub fn from_params(params: &Params) -> Result<Self, ConfigError> {
        let defaults = BinningConfig::default();
        let max_bins = params.parse_value::<i64>("max_bin")?.unwrap_or(defaults.max_bins as i64);
        if !(2..=65535).contains(&max_bins) {
            return Err(ConfigError::out_of_range("max_bin", max_bins, "between 2 and 65535"));
        }
        let sample_cnt = params
            .parse_value::<usize>("bin_construct_sample_cnt")?
            .unwrap_or(defaults.sample_cnt);
        let label_column = params.parse_value::<i64>("label_column")?.unwrap_or(0);
        if label_column < 0 {
            return Err(ConfigError::out_of_range("label_column", label_column, "non-negative"));
        }

        DatasetConfig::builder()
            .binning(
                BinningConfig::builder()
                    .max_bins(max_bins as u32)
                    .sample_cnt(sample_cnt)
                    .build(),
            )
            .maybe_has_header(params.parse_bool("has_header")?)
            .label_column(label_column as usize)
            .num_threads(params.parse_value::<i64>("num_threads")?.unwrap_or(0).max(0) as usize)
            .verbosity(Verbosity::from_level(params.parse_value("verbose")?.unwrap_or(1)))
            .build()
    }
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            binning: BinningConfig::default(),
            has_header: false,
            label_column: 0,
            num_threads: 0,
            verbosity: Verbosity::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = DatasetConfig::from_params(&Params::default()).unwrap();
        assert_eq!(config, DatasetConfig::default());
        assert_eq!(config.binning.max_bins, 255);
    }

    #[test]
    fn reads_dataset_keys() {
        let params = Params::parse("max_bin=15 label=2 subsample_for_bin=1000 nthreads=2 objective=binary")
            .unwrap();
        let config = DatasetConfig::from_params(&params).unwrap();
        assert_eq!(config.binning.max_bins, 15);
        assert_eq!(config.binning.sample_cnt, 1000);
        assert_eq!(config.label_column, 2);
        assert_eq!(config.num_threads, 2);
    }

    #[test]
    fn max_bin_range() {
        for input in ["max_bin=1", "max_bin=70000", "max_bin=-3"] {
            let params = Params::parse(input).unwrap();
            assert!(matches!(
                DatasetConfig::from_params(&params),
                Err(ConfigError::OutOfRange { key: "max_bin", .. })
            ));
        }
    }

    #[test]
    fn builder_validates() {
        let result = DatasetConfig::builder().binning(BinningConfig::from(1)).build();
        assert!(result.is_err());
    }
}
