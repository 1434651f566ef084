//! Training infrastructure: loss accumulation and tree induction.
//!
//! - [`LossFunction`] / [`LeastSquaresLoss`]: streaming loss accumulation,
//!   shared between training diagnostics and test evaluation
//! - [`TrainParams`]: boosting parameters with builder defaults
//! - [`GbmTrainer`]: least-squares gradient boosting over the bucketed store

mod loss;
mod trainer;

pub use loss::{LeastSquaresLoss, LossFunction};
pub use trainer::{GbmTrainer, TrainParams, TrainedModel};
