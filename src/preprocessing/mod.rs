//! Preprocessing configuration and the column transformer built from it

pub mod config;
pub mod pipeline;
pub mod scaler;

pub use self::config::{CategoricalImpute, Encoder, NumericImpute, PreprocessingConfig, Scaler};
pub use self::pipeline::{CategoricalColumn, FittedPreprocessor, NumericColumn, Preprocessor};
pub use self::scaler::{FeatureStats, FittedScaler, ScalingMethod};
