//! Binned training and validation data.
//!
//! Every ingestion path (text file, dense buffer, CSR, CSC) produces a
//! [`RawFeatures`] matrix that is binned column by column. A reference
//! Dataset lends its bin table so validation data lands in the same bins
//! as the training data; binary snapshots are restored without re-binning.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ndarray::{Array2, s};

use super::binned::{BinColumn, BinTable, bin_numeric};
use super::dtype::{DType, NumericSlice};
use super::io::Snapshot;
use super::raw::RawFeatures;
use super::text::{TextFormat, read_text_file, read_weight_file};
use crate::config::DatasetConfig;
use crate::error::{Error, ErrorKind, Result};
use crate::training::TrainingLogger;
use crate::utils::run_with_threads;

// =============================================================================
// DatasetError
// =============================================================================

/// Errors from building or mutating a Dataset. All are caller mistakes.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("unsupported dtype tag {tag}, expected 0 (float32), 1 (float64), 2 (int32) or 3 (int64)")]
    UnsupportedDtype { tag: i32 },

    #[error("{role} must be {expected}, got {}", actual.name())]
    DtypeMismatch {
        role: &'static str,
        expected: &'static str,
        actual: DType,
    },

    #[error("shape mismatch: {message}")]
    ShapeMismatch { message: String },

    #[error("invalid sparse layout: {0}")]
    InvalidSparse(String),

    #[error("{field} has {actual} values but the dataset has {expected} rows")]
    FieldLength {
        field: String,
        expected: usize,
        actual: usize,
    },

    #[error("unknown field '{0}', expected 'label' or 'weight'")]
    UnknownField(String),

    #[error("dataset must have at least one row and one feature, got {n_rows} x {n_features}")]
    Empty { n_rows: usize, n_features: usize },

    #[error("reference dataset has {expected} features but the data has {actual}")]
    ReferenceMismatch { expected: usize, actual: usize },

    #[error("dataset is in use by a booster, field '{0}' can no longer change")]
    FieldLocked(String),
}

impl DatasetError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidArgument
    }
}

// =============================================================================
// Dataset
// =============================================================================

/// A feature matrix quantized into bins, plus optional label and weight.
#[derive(Debug, Clone)]
pub struct Dataset {
    n_rows: usize,
    bin_table: Arc<BinTable>,
    columns: Vec<BinColumn>,
    feature_names: Vec<String>,
    label: Option<Vec<f32>>,
    weight: Option<Vec<f32>>,
}

impl Dataset {
    /// Bin a raw matrix. With a `reference`, its bin table is reused and no
    /// boundaries are computed.
    pub fn from_raw(
        raw: &RawFeatures,
        config: &DatasetConfig,
        reference: Option<&Dataset>,
    ) -> Result<Self, DatasetError> {
        let (n_rows, n_features) = (raw.n_rows(), raw.n_features());
        if n_rows == 0 || n_features == 0 {
            return Err(DatasetError::Empty { n_rows, n_features });
        }
        if let Some(reference) = reference {
            if reference.num_feature() != n_features {
                return Err(DatasetError::ReferenceMismatch {
                    expected: reference.num_feature(),
                    actual: n_features,
                });
            }
        }

        let logger = TrainingLogger::new(config.verbosity);
        let values = raw.view();
        let (bin_table, columns) = run_with_threads(config.num_threads, |parallelism| {
            let bin_table = match reference {
                Some(reference) => Arc::clone(&reference.bin_table),
                None => {
                    let mappers = parallelism.map_range(n_features, |f| {
                        let column = values.row(f);
                        match column.as_slice() {
                            Some(slice) => bin_numeric(slice, &config.binning),
                            None => bin_numeric(&column.to_vec(), &config.binning),
                        }
                    });
                    Arc::new(BinTable::new(mappers))
                }
            };
            let columns = BinColumn::from_features(bin_table.mappers(), values, parallelism);
            (bin_table, columns)
        });

        let feature_names = reference
            .map(|r| r.feature_names.clone())
            .unwrap_or_else(|| default_feature_names(n_features));

        logger.info(format_args!(
            "Constructed dataset with {n_rows} rows and {n_features} features ({} bins{})",
            bin_table.total_bins(),
            if reference.is_some() { ", bins from reference" } else { "" }
        ));

        Ok(Self {
            n_rows,
            bin_table,
            columns,
            feature_names,
            label: None,
            weight: None,
        })
    }

    /// Dense `nrow x ncol` buffer in row- or column-major order.
    pub fn from_dense(
        data: NumericSlice<'_>,
        nrow: usize,
        ncol: usize,
        is_row_major: bool,
        config: &DatasetConfig,
        reference: Option<&Dataset>,
    ) -> Result<Self, DatasetError> {
        let raw = RawFeatures::from_dense(data, nrow, ncol, is_row_major)?;
        Self::from_raw(&raw, config, reference)
    }

    pub fn from_csr(
        indptr: NumericSlice<'_>,
        indices: &[i32],
        data: NumericSlice<'_>,
        num_col: usize,
        config: &DatasetConfig,
        reference: Option<&Dataset>,
    ) -> Result<Self, DatasetError> {
        let raw = RawFeatures::from_csr(indptr, indices, data, num_col)?;
        Self::from_raw(&raw, config, reference)
    }

    pub fn from_csc(
        col_ptr: NumericSlice<'_>,
        indices: &[i32],
        data: NumericSlice<'_>,
        num_row: usize,
        config: &DatasetConfig,
        reference: Option<&Dataset>,
    ) -> Result<Self, DatasetError> {
        let raw = RawFeatures::from_csc(col_ptr, indices, data, num_row)?;
        Self::from_raw(&raw, config, reference)
    }

    /// Read a delimited or LibSVM text file. The label column becomes the
    /// label field; `<path>.weight`, when present, the weight field.
    pub fn from_file(path: &Path, config: &DatasetConfig, reference: Option<&Dataset>) -> Result<Self> {
        let table = read_text_file(path, config.has_header)?;
        let (mut features, labels, names) = table.split_label(config.label_column)?;
        // LibSVM files only reach the highest index they mention
        if let Some(reference) = reference {
            if table.format == TextFormat::LibSvm && features.nrows() < reference.num_feature() {
                let mut padded = Array2::zeros((reference.num_feature(), features.ncols()));
                padded.slice_mut(s![..features.nrows(), ..]).assign(&features);
                features = padded;
            }
        }
        let mut dataset = Self::from_raw(&RawFeatures::new(features), config, reference)?;
        if let Some(names) = names {
            if reference.is_none() {
                dataset.feature_names = names;
            }
        }
        dataset.label = Some(labels);

        let weight_path = weight_file_path(path);
        if weight_path.is_file() {
            let weights = read_weight_file(&weight_path)?;
            check_length("weight", dataset.n_rows, weights.len())?;
            TrainingLogger::new(config.verbosity)
                .info(format_args!("Loading weights from {}", weight_path.display()));
            dataset.weight = Some(weights);
        }
        Ok(dataset)
    }

    // =========================================================================
    // Binary snapshots
    // =========================================================================

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let snapshot = Snapshot {
            n_rows: self.n_rows,
            feature_names: self.feature_names.clone(),
            mappers: self.bin_table.mappers().to_vec(),
            columns: self.columns.clone(),
            label: self.label.clone(),
            weight: self.weight.clone(),
        };
        Ok(snapshot.encode()?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let snapshot = Snapshot::decode(bytes)?;
        Ok(Self {
            n_rows: snapshot.n_rows,
            bin_table: Arc::new(BinTable::new(snapshot.mappers)),
            columns: snapshot.columns,
            feature_names: snapshot.feature_names,
            label: snapshot.label,
            weight: snapshot.weight,
        })
    }

    pub fn save_binary(&self, path: &Path) -> Result<()> {
        let bytes = self.to_bytes()?;
        fs::write(path, bytes).map_err(|e| Error::io(path, e))
    }

    pub fn load_binary(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|e| Error::io(path, e))?;
        Self::from_bytes(&bytes)
    }

    // =========================================================================
    // Fields
    // =========================================================================

    /// Replace the label or weight field. On error nothing changes.
    pub fn set_field(&mut self, name: &str, values: NumericSlice<'_>) -> Result<(), DatasetError> {
        let (slot, field) = match name {
            "label" => (&mut self.label, "label"),
            "weight" => (&mut self.weight, "weight"),
            other => return Err(DatasetError::UnknownField(other.to_string())),
        };
        let values = values.float_values(field)?;
        check_length(field, self.n_rows, values.len())?;
        *slot = Some(values.to_f32_vec());
        Ok(())
    }

    /// Stored label or weight, `None` when never set.
    pub fn get_field(&self, name: &str) -> Result<Option<&[f32]>, DatasetError> {
        match name {
            "label" => Ok(self.label.as_deref()),
            "weight" => Ok(self.weight.as_deref()),
            other => Err(DatasetError::UnknownField(other.to_string())),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[inline]
    pub fn num_data(&self) -> usize {
        self.n_rows
    }

    #[inline]
    pub fn num_feature(&self) -> usize {
        self.columns.len()
    }

    pub fn bin_table(&self) -> &Arc<BinTable> {
        &self.bin_table
    }

    /// Same allocation, or equal boundaries.
    pub fn shares_bins_with(&self, other: &Dataset) -> bool {
        Arc::ptr_eq(&self.bin_table, &other.bin_table) || self.bin_table == other.bin_table
    }

    #[inline]
    pub fn column(&self, feature: usize) -> &BinColumn {
        &self.columns[feature]
    }

    pub fn columns(&self) -> &[BinColumn] {
        &self.columns
    }

    #[inline]
    pub fn bin(&self, row: usize, feature: usize) -> u32 {
        self.columns[feature].get(row)
    }

    pub fn label(&self) -> Option<&[f32]> {
        self.label.as_deref()
    }

    pub fn weight(&self) -> Option<&[f32]> {
        self.weight.as_deref()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }
}

fn default_feature_names(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("Column_{i}")).collect()
}

fn weight_file_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(".weight");
    PathBuf::from(os)
}

fn check_length(field: &str, expected: usize, actual: usize) -> Result<(), DatasetError> {
    if expected != actual {
        return Err(DatasetError::FieldLength {
            field: field.to_string(),
            expected,
            actual,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn config(max_bins: u32) -> DatasetConfig {
        DatasetConfig::builder()
            .binning(max_bins.into())
            .num_threads(1)
            .verbosity(crate::training::Verbosity::Silent)
            .build()
            .unwrap()
    }

    fn small() -> Dataset {
        // 4 rows x 2 features, row-major
        let data = [1.0f64, 10.0, 2.0, 20.0, 3.0, 30.0, 4.0, 40.0];
        Dataset::from_dense(NumericSlice::F64(&data), 4, 2, true, &config(255), None).unwrap()
    }

    #[test]
    fn dense_shape_and_bins() {
        let ds = small();
        assert_eq!(ds.num_data(), 4);
        assert_eq!(ds.num_feature(), 2);
        assert_eq!((0..4).map(|r| ds.bin(r, 0)).collect::<Vec<_>>(), vec![0, 1, 2, 3]);
        assert_eq!(ds.feature_names()[1], "Column_1");
        assert!(ds.label().is_none());
    }

    #[test]
    fn empty_is_rejected() {
        let err = Dataset::from_dense(NumericSlice::F64(&[]), 0, 3, true, &config(255), None).unwrap_err();
        assert!(matches!(err, DatasetError::Empty { n_rows: 0, .. }));
    }

    #[test]
    fn reference_shares_table_and_clamps() {
        let ds = small();
        let data = [0.0f32, 100.0, 3.0, 20.0];
        let valid =
            Dataset::from_dense(NumericSlice::F32(&data), 2, 2, true, &config(255), Some(&ds)).unwrap();
        assert!(Arc::ptr_eq(ds.bin_table(), valid.bin_table()));
        assert!(valid.shares_bins_with(&ds));
        assert_eq!(valid.bin(0, 0), 0);
        assert_eq!(valid.bin(0, 1), 3);
        assert_eq!(valid.bin(1, 0), ds.bin(2, 0));
    }

    #[test]
    fn reference_feature_count_must_match() {
        let ds = small();
        let data = [1.0f64; 3];
        let err = Dataset::from_dense(NumericSlice::F64(&data), 1, 3, true, &config(255), Some(&ds))
            .unwrap_err();
        assert!(matches!(err, DatasetError::ReferenceMismatch { expected: 2, actual: 3 }));
    }

    #[test]
    fn set_field_validates_and_is_atomic() {
        let mut ds = small();
        ds.set_field("label", NumericSlice::F64(&[0.0, 1.0, 0.0, 1.0])).unwrap();
        assert_eq!(ds.label().unwrap(), &[0.0, 1.0, 0.0, 1.0]);

        let err = ds.set_field("label", NumericSlice::F32(&[1.0; 3])).unwrap_err();
        assert!(matches!(err, DatasetError::FieldLength { expected: 4, actual: 3, .. }));
        assert!(ds.set_field("label", NumericSlice::I32(&[1; 4])).is_err());
        assert!(matches!(
            ds.set_field("group", NumericSlice::F32(&[1.0; 4])),
            Err(DatasetError::UnknownField(_))
        ));
        assert_eq!(ds.get_field("label").unwrap().unwrap(), &[0.0, 1.0, 0.0, 1.0]);
        assert_eq!(ds.get_field("weight").unwrap(), None);
    }

    #[test]
    fn binary_round_trip() {
        let mut ds = small();
        ds.set_field("weight", NumericSlice::F32(&[1.0, 2.0, 1.0, 2.0])).unwrap();
        let restored = Dataset::from_bytes(&ds.to_bytes().unwrap()).unwrap();
        assert_eq!(restored.num_data(), 4);
        assert_eq!(restored.columns(), ds.columns());
        assert_eq!(restored.weight(), ds.weight());
        assert!(restored.shares_bins_with(&ds));
    }

    #[test]
    fn text_file_with_weights() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("train.csv");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "y,a,b\n1,0.5,3\n0,1.5,4\n1,2.5,5").unwrap();
        fs::write(weight_file_path(&path), "1\n2\n3\n").unwrap();

        let config = DatasetConfig::builder()
            .has_header(true)
            .verbosity(crate::training::Verbosity::Silent)
            .build()
            .unwrap();
        let ds = Dataset::from_file(&path, &config, None).unwrap();
        assert_eq!((ds.num_data(), ds.num_feature()), (3, 2));
        assert_eq!(ds.label().unwrap(), &[1.0, 0.0, 1.0]);
        assert_eq!(ds.weight().unwrap(), &[1.0, 2.0, 3.0]);
        assert_eq!(ds.feature_names(), &["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn missing_file_is_resource_error() {
        let err = Dataset::from_file(Path::new("/no/such/file.tsv"), &config(255), None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResourceUnavailable);
    }
}
