//! Applying a model to raw feature rows.
//!
//! Rows are processed in blocks of [`DEFAULT_BLOCK_SIZE`]; blocks run in
//! parallel when allowed. Traversal reads raw values, so a row gets the same
//! score here as the binned training rows it matches: split thresholds are
//! bin upper bounds.

use std::fmt::Write as _;
use std::io::{BufWriter, Write};
use std::path::Path;

use ndarray::ArrayView2;

use crate::data::{DatasetError, NumericSlice, RawFeatures, text};
use crate::model::Model;
use crate::training::ObjectiveFn;
use crate::utils::Parallelism;
use crate::{Error, Result};

/// Default number of rows per block.
pub const DEFAULT_BLOCK_SIZE: usize = 64;

/// What a prediction produces per row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum PredictKind {
    /// Objective output, e.g. a probability for `binary`.
    #[default]
    Normal = 0,
    /// Sum of leaf values before the objective transform.
    RawScore = 1,
    /// Index of the reached leaf in every used tree.
    LeafIndex = 2,
}

impl PredictKind {
    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            0 => Ok(PredictKind::Normal),
            1 => Ok(PredictKind::RawScore),
            2 => Ok(PredictKind::LeafIndex),
            _ => Err(Error::InvalidArgument(format!("unknown predict type {code}"))),
        }
    }
}

/// Predicts with the first `n_trees` trees of a model.
#[derive(Debug, Clone)]
pub struct Predictor<'m> {
    model: &'m Model,
    kind: PredictKind,
    n_trees: usize,
    block_size: usize,
}

impl<'m> Predictor<'m> {
    /// `num_iteration` of `None` uses every tree.
    pub fn new(model: &'m Model, kind: PredictKind, num_iteration: Option<usize>) -> Self {
        Self {
            model,
            kind,
            n_trees: model.forest.used_trees(num_iteration),
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }

    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size.max(1);
        self
    }

    pub fn n_trees(&self) -> usize {
        self.n_trees
    }

    /// Values written per input row.
    pub fn outputs_per_row(&self) -> usize {
        match self.kind {
            PredictKind::LeafIndex => self.n_trees,
            _ => 1,
        }
    }

    /// Length of the output for `n_rows` rows.
    pub fn num_predictions(&self, n_rows: usize) -> usize {
        n_rows * self.outputs_per_row()
    }

    /// Predict a row-major `[n_rows, n_cols]` matrix. Features past the last
    /// column read as 0; extra columns are ignored.
    pub fn predict_matrix(&self, rows: ArrayView2<'_, f64>, parallelism: Parallelism) -> Vec<f64> {
        let per_row = self.outputs_per_row();
        let mut out = vec![0.0; self.num_predictions(rows.nrows())];
        if per_row == 0 {
            return out;
        }
        let forest = &self.model.forest;
        let block_size = self.block_size;
        parallelism.for_each_chunk_mut(&mut out, block_size * per_row, |block, chunk| {
            let first_row = block * block_size;
            for (i, dst) in chunk.chunks_mut(per_row).enumerate() {
                let row = rows.row(first_row + i);
                let value = |f: usize| row.get(f).copied().unwrap_or(0.0);
                match self.kind {
                    PredictKind::Normal => {
                        dst[0] = self.model.objective.transform(forest.predict_raw(value, self.n_trees));
                    }
                    PredictKind::RawScore => dst[0] = forest.predict_raw(value, self.n_trees),
                    PredictKind::LeafIndex => {
                        for (d, leaf) in dst.iter_mut().zip(forest.leaf_indices(value, self.n_trees)) {
                            *d = leaf as f64;
                        }
                    }
                }
            }
        });
        out
    }

    /// Predict rows given in compressed sparse row form.
    pub fn predict_csr(
        &self,
        indptr: NumericSlice<'_>,
        indices: &[i32],
        data: NumericSlice<'_>,
        num_col: usize,
        parallelism: Parallelism,
    ) -> Result<Vec<f64>, DatasetError> {
        let raw = RawFeatures::from_csr(indptr, indices, data, num_col)?;
        Ok(self.predict_matrix(raw.rows(), parallelism))
    }

    /// Predict every row of a text data file and write one line per row.
    ///
    /// The label column is dropped when rows are wider than the model.
    pub fn predict_file(
        &self,
        input: &Path,
        output: &Path,
        has_header: bool,
        parallelism: Parallelism,
    ) -> Result<()> {
        let table = text::read_text_file(input, has_header)?;
        let rows = table.prediction_rows(self.model.n_features(), self.model.label_index);
        let predictions = self.predict_matrix(rows.view(), parallelism);

        let file = std::fs::File::create(output).map_err(|e| Error::io(output, e))?;
        let mut writer = BufWriter::new(file);
        let mut line = String::new();
        for row in predictions.chunks(self.outputs_per_row().max(1)) {
            line.clear();
            self.format_row(row, &mut line);
            writeln!(writer, "{line}").map_err(|e| Error::io(output, e))?;
        }
        writer.flush().map_err(|e| Error::io(output, e))
    }

    fn format_row(&self, row: &[f64], line: &mut String) {
        for (i, v) in row.iter().enumerate() {
            if i > 0 {
                line.push('\t');
            }
            let _ = match self.kind {
                PredictKind::LeafIndex => write!(line, "{}", *v as usize),
                _ => write!(line, "{v}"),
            };
        }
    }
}
