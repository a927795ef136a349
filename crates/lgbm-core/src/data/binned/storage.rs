//! Column storage for bin indices.

use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

use super::BinMapper;
use crate::utils::Parallelism;

/// Bin indices of one feature for every row.
///
/// Features with at most 256 bins use one byte per row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum BinColumn {
    U8(Box<[u8]>),
    U16(Box<[u16]>),
}

impl BinColumn {
    /// Bin every value of a column with an existing mapper.
    pub fn from_values<'a>(mapper: &BinMapper, values: impl IntoIterator<Item = &'a f64>) -> Self {
        let values = values.into_iter();
        if mapper.n_bins() <= u8::MAX as u32 + 1 {
            BinColumn::U8(values.map(|&v| mapper.value_to_bin(v) as u8).collect())
        } else {
            BinColumn::U16(values.map(|&v| mapper.value_to_bin(v) as u16).collect())
        }
    }

    /// Bin a feature-major `[n_features, n_rows]` matrix, one feature per task.
    pub fn from_features(
        mappers: &[BinMapper],
        features: ArrayView2<'_, f64>,
        parallelism: Parallelism,
    ) -> Vec<Self> {
        parallelism.map_range(features.nrows(), |f| {
            BinColumn::from_values(&mappers[f], features.row(f))
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        match self {
            BinColumn::U8(bins) => bins.len(),
            BinColumn::U16(bins) => bins.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn get(&self, row: usize) -> u32 {
        match self {
            BinColumn::U8(bins) => bins[row] as u32,
            BinColumn::U16(bins) => bins[row] as u32,
        }
    }

    /// Largest stored bin index, `None` when empty.
    pub fn max_bin(&self) -> Option<u32> {
        match self {
            BinColumn::U8(bins) => bins.iter().max().map(|&b| b as u32),
            BinColumn::U16(bins) => bins.iter().max().map(|&b| b as u32),
        }
    }
}
