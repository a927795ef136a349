//! Gradient boosted tree training.
//!
//! - [`grower`] - leaf-wise tree growth
//! - [`histograms`] - gradient histograms over binned features
//! - [`partition`] - row index partitioning for leaves
//! - [`split`] - gain computation and best-split search

pub mod grower;
pub mod histograms;
pub mod partition;
pub mod split;

pub use grower::{GrowerParams, TreeGrower};
pub use histograms::{Histogram, HistogramBin};
pub use partition::RowPartitioner;
pub use split::{GainParams, SideSums, SplitInfo, find_best_split};
