//! Quantized feature representation used for histogram-based training.

mod bin_mapper;
mod builder;
mod storage;

pub use bin_mapper::{BinMapper, BinTable, MISSING_VALUE, normalize_value};
pub use builder::{BinningConfig, bin_numeric};
pub use storage::BinColumn;
