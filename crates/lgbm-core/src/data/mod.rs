//! Data ingestion, binning and binary snapshots.

pub mod binned;
mod dataset;
mod dtype;
pub mod io;
mod raw;
pub mod text;

pub use binned::{BinColumn, BinMapper, BinTable, BinningConfig, MISSING_VALUE, normalize_value};
pub use dataset::{Dataset, DatasetError};
pub use dtype::{DType, FloatValues, NumericSlice};
pub use io::{DeserializeError, SerializeError};
pub use raw::RawFeatures;
pub use text::{TextFormat, TextReadError, TextTable};
