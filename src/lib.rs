//! Tabular machine learning prototypes
//!
//! Load a CSV or Parquet table, configure preprocessing, train
//! classification, regression or clustering models, save the artifacts and
//! publish them to a git branch.

pub mod api;
pub mod core;
pub mod data;
pub mod persistence;
pub mod preprocessing;
pub mod publish;
pub mod training;

// Re-export main types for convenience
pub use crate::api::{quick, RunResults, Trainer, TrainingResult};
pub use crate::core::traits::*;
pub use crate::core::types::*;
pub use crate::core::{Result, TabmlError};
pub use crate::data::{load_data, DataFormat};
pub use crate::persistence::{generate_run_summary, load_pipeline, save_artifacts};
pub use crate::preprocessing::{PreprocessingConfig, Preprocessor};
pub use crate::publish::{compare_url, publish_run, PublishOptions, PublishOutcome};
pub use crate::training::FittedPipeline;

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
