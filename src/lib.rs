//! Convert TC-centered NetCDF domain files into flat, appendable NumPy
//! shards partitioned by calendar month, then shuffle-split the shards
//! into train/test sets for the downstream training pipeline.
//!
//! Two pipelines share one data model:
//! - [`extract::run_extract`] walks a source tree of per-storm domain
//!   files, stacks a fixed variable/level subset from each, filters out
//!   records with too much missing data, and appends the survivors to
//!   per-month `.npy` shards without ever holding more than one record
//!   in memory.
//! - [`split::run_split`] shuffles each month's shard triple with one
//!   shared permutation, carves off a test percentage, and merges the
//!   training remainders into globally shuffled arrays.

pub mod config;
pub mod dates;
pub mod decode;
pub mod error;
pub mod extract;
pub mod filename;
pub mod npy;
pub mod shard;
pub mod split;

pub use config::{default_selectors, ExtractConfig, Naming, SplitConfig, VarSelector, WindowSize};
pub use error::{Error, Result};
pub use extract::{run_extract, ExtractSummary};
pub use split::{run_split, SplitSummary};
