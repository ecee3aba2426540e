//! Surface growth - stochastic deposition and kinetic roughening
//!
//! Grows discrete surfaces under a pluggable deposition rule, records the
//! height statistics at fixed checkpoints, extracts scaling exponents by
//! log-log regression, and reduces many independent runs into ensemble
//! averages, optionally across a bounded set of worker threads.

pub mod config;
pub mod deposition;
pub mod ensemble;
pub mod growth;
pub mod numeric;
pub mod output;
pub mod snapshot;
pub mod stats;
pub mod surface;

use thiserror::Error;

// Re-export main types
pub use config::{DepositionModel, GrowthConfig};
pub use deposition::{BallisticDeposition, DepositionStrategy, RandomDeposition};
pub use ensemble::{EnsembleAggregator, EnsembleReducer};
pub use growth::{GrowthTrajectory, LogLogFit, TrajectoryResult};
pub use numeric::{Height, Real};
pub use output::{create_timestamped_output_dir, EnsembleRecord};
pub use snapshot::{Field, SurfaceSnapshot};
pub use stats::{SnapshotAccumulator, StatVector, StatisticalAccumulator};
pub use surface::Surface;

#[derive(Debug, Error)]
pub enum GrowthError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("{context} shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch {
        context: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("invalid snapshot field: {0}")]
    InvalidField(String),
    #[error("invalid checkpoint range {from}..{to} for {len} checkpoints")]
    InvalidRange { from: usize, to: usize, len: usize },
    #[error("ensemble reducer lock poisoned by a panicked worker")]
    ReducerPoisoned,
}
