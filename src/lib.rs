//! gbtrain: a gradient-boosted-tree training and evaluation driver.
//!
//! Ingests large line-oriented numeric datasets through a chunked, parallel
//! parsing pipeline, trains (or loads) a regression forest, and scores
//! held-out data against it, optionally computing the loss of every
//! ensemble prefix in a single pass to pick the optimal number of trees.
//!
//! # Key Types
//!
//! - [`Config`] - Feature catalog and training parameters
//! - [`loading`] - Chunked, parallel dataset loading (chunks, barrier, scheduler, merge)
//! - [`DataStore`] - Bucketing dataset store fed by the loading pipeline
//! - [`Forest`] - Ordered tree ensemble with prefix prediction and a JSON document
//! - [`GbmTrainer`] - Least-squares boosting over the bucketed store
//! - [`EvalPipeline`] - Streaming evaluation with per-prefix loss accounting
//!
//! # Pipeline
//!
//! Training data flows `read_chunks` → `parse_chunks` → `merge_chunks` →
//! [`DataStore::close`] → [`GbmTrainer::fit`]. Once a model exists (trained
//! or loaded), test files flow through [`EvalPipeline`].

pub mod config;
pub mod data;
pub mod eval;
pub mod loading;
pub mod model;
pub mod training;

// =============================================================================
// Convenience Re-exports
// =============================================================================

pub use config::{Config, ConfigError};

pub use data::{DataStore, ParsedRow, RowDecoder, TestRow, TsvDecoder};

pub use loading::{
    merge_chunks, parse_chunks, read_chunks, Chunk, CountingBarrier, MergeError, MergeOutcome,
    DEFAULT_CHUNK_SIZE,
};

pub use model::{Forest, ModelError, Node, Tree};

pub use training::{
    GbmTrainer, LeastSquaresLoss, LossFunction, TrainParams, TrainedModel,
};

pub use eval::{EvalPipeline, TestReport};
