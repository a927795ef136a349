//! Raw (unbinned) feature matrices built from caller buffers.
//!
//! Every ingestion path converges on [`RawFeatures`], a feature-major
//! `[n_features, n_rows]` f64 matrix. Sparse inputs are densified with
//! implicit zeros.

use ndarray::{Array2, ArrayView2};

use super::DatasetError;
use super::dtype::{FloatValues, NumericSlice};

/// Feature-major raw values: `values[[feature, row]]`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFeatures {
    values: Array2<f64>,
}

impl RawFeatures {
    /// Wrap a feature-major matrix.
    pub fn new(values: Array2<f64>) -> Self {
        Self { values }
    }

    /// Dense buffer of `nrow * ncol` values in row- or column-major order.
    pub fn from_dense(
        data: NumericSlice<'_>,
        nrow: usize,
        ncol: usize,
        is_row_major: bool,
    ) -> Result<Self, DatasetError> {
        let values = data.float_values("data")?;
        let expected = nrow.checked_mul(ncol).ok_or_else(|| DatasetError::ShapeMismatch {
            message: format!("{nrow} x {ncol} overflows"),
        })?;
        if values.len() != expected {
            return Err(DatasetError::ShapeMismatch {
                message: format!(
                    "dense buffer has {} values, expected {nrow} rows x {ncol} columns",
                    values.len()
                ),
            });
        }

        let matrix = if is_row_major {
            Array2::from_shape_fn((ncol, nrow), |(f, r)| values.get(r * ncol + f))
        } else {
            Array2::from_shape_fn((ncol, nrow), |(f, r)| values.get(f * nrow + r))
        };
        Ok(Self { values: matrix })
    }

    /// Compressed sparse rows. `indptr` has `n_rows + 1` entries.
    pub fn from_csr(
        indptr: NumericSlice<'_>,
        indices: &[i32],
        data: NumericSlice<'_>,
        num_col: usize,
    ) -> Result<Self, DatasetError> {
        let (offsets, values) = validate_compressed("indptr", indptr, indices, data, num_col)?;
        let n_rows = offsets.len() - 1;
        let mut matrix = Array2::zeros((num_col, n_rows));
        for row in 0..n_rows {
            for k in offsets[row]..offsets[row + 1] {
                matrix[[indices[k] as usize, row]] = values.get(k);
            }
        }
        Ok(Self { values: matrix })
    }

    /// Compressed sparse columns. `col_ptr` has `n_features + 1` entries.
    pub fn from_csc(
        col_ptr: NumericSlice<'_>,
        indices: &[i32],
        data: NumericSlice<'_>,
        num_row: usize,
    ) -> Result<Self, DatasetError> {
        let (offsets, values) = validate_compressed("col_ptr", col_ptr, indices, data, num_row)?;
        let n_features = offsets.len() - 1;
        let mut matrix = Array2::zeros((n_features, num_row));
        for feature in 0..n_features {
            for k in offsets[feature]..offsets[feature + 1] {
                matrix[[feature, indices[k] as usize]] = values.get(k);
            }
        }
        Ok(Self { values: matrix })
    }

    pub fn n_rows(&self) -> usize {
        self.values.ncols()
    }

    pub fn n_features(&self) -> usize {
        self.values.nrows()
    }

    /// Feature-major view `[n_features, n_rows]`.
    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    /// Row-major view `[n_rows, n_features]`, as prediction expects.
    pub fn rows(&self) -> ArrayView2<'_, f64> {
        self.values.t()
    }
}

/// Validate a compressed sparse layout: offsets start at 0, never decrease,
/// end at `nnz`, and every inner index is below `inner_dim`.
fn validate_compressed<'a>(
    role: &'static str,
    ptr: NumericSlice<'_>,
    indices: &[i32],
    data: NumericSlice<'a>,
    inner_dim: usize,
) -> Result<(Vec<usize>, FloatValues<'a>), DatasetError> {
    let offsets = ptr.offsets(role)?;
    let values = data.float_values("data")?;

    if offsets.is_empty() {
        return Err(DatasetError::InvalidSparse(format!("{role} must have at least one entry")));
    }
    if offsets[0] != 0 {
        return Err(DatasetError::InvalidSparse(format!(
            "{role}[0] must be 0, got {}",
            offsets[0]
        )));
    }
    if let Some(i) = offsets.windows(2).position(|w| w[1] < w[0]) {
        return Err(DatasetError::InvalidSparse(format!(
            "{role} decreases at position {}",
            i + 1
        )));
    }
    if indices.len() != values.len() {
        return Err(DatasetError::InvalidSparse(format!(
            "indices has {} entries but data has {}",
            indices.len(),
            values.len()
        )));
    }
    let nnz = offsets[offsets.len() - 1];
    if nnz != values.len() {
        return Err(DatasetError::InvalidSparse(format!(
            "{role} ends at {nnz} but {} values were supplied",
            values.len()
        )));
    }
    if let Some(k) = indices
        .iter()
        .position(|&i| i < 0 || i as usize >= inner_dim)
    {
        return Err(DatasetError::InvalidSparse(format!(
            "index {} at position {k} is outside [0, {inner_dim})",
            indices[k]
        )));
    }
    Ok((offsets, values))
}
