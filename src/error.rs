use std::path::PathBuf;

use thiserror::Error;

/// Error type for both pipelines.
///
/// Only two conditions are ever tolerated at runtime: admission rejection
/// (not an error, just a counted skip) and cold-start deletion failures
/// (logged in [`crate::shard`]). Everything here aborts the run.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{name}: window tag present but not followed by an 8-digit date")]
    MalformedFilename { name: String },

    #[error("source root {0} does not exist; run the domain-generation step first")]
    SourceMissing(PathBuf),

    #[error("variable {var} not found in {path}")]
    MissingVariable { var: String, path: PathBuf },

    #[error("level {level} hPa not present in {path}")]
    MissingLevel { level: i32, path: PathBuf },

    #[error("scalar {name} not found in {path}")]
    MissingScalar { name: String, path: PathBuf },

    #[error("{var} at {level} hPa: expected a 2-D grid, found shape {got:?}")]
    NotAGrid { var: String, level: i32, got: Vec<usize> },

    #[error("{var} at {level} hPa: grid is {got:?} but earlier layers are {want:?}")]
    GridShape { var: String, level: i32, got: Vec<usize>, want: Vec<usize> },

    #[error("output directory {0} already contains files; enable force-rewrite to redo the dataset")]
    OutputAlreadyPopulated(PathBuf),

    #[error("month {month}: shard record counts differ (features {features}, labels {labels}, spacetime {spacetime:?})")]
    ShardMisaligned {
        month: String,
        features: usize,
        labels: usize,
        spacetime: Option<usize>,
    },

    #[error("month {month}: spacetime shard presence differs from earlier months")]
    MixedSpacetime { month: String },

    #[error("no monthly feature shards matching {prefix}MM{suffix}.npy under {dir}")]
    NoShards {
        dir: PathBuf,
        prefix: String,
        suffix: String,
    },

    #[error("NetCDF error: {0}")]
    Netcdf(#[from] netcdf::Error),

    #[error(transparent)]
    Npy(#[from] crate::npy::NpyError),

    #[error("failed to read NPY file: {0}")]
    ReadNpy(#[from] ndarray_npy::ReadNpyError),

    #[error("failed to write NPY file: {0}")]
    WriteNpy(#[from] ndarray_npy::WriteNpyError),

    #[error("shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("bad glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("unreadable path during scan: {0}")]
    Scan(#[from] glob::GlobError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
