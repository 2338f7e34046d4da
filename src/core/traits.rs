//! Core traits for the preprocessing/estimator seam

use crate::core::{FeatureMatrix, Predictions, Result};
use polars::prelude::DataFrame;

/// Fitted transformation from a raw frame to model features
pub trait Transformer {
    /// Transform a frame with the state learned at fit time
    fn transform(&self, df: &DataFrame) -> Result<FeatureMatrix>;

    /// Number of output features
    fn n_features_out(&self) -> usize;

    /// Names of the output features, in column order
    fn feature_names_out(&self) -> Vec<String>;
}

/// Fitted model
pub trait Predictor {
    /// Predict for every row of a feature matrix
    fn predict(&self, features: &FeatureMatrix) -> Result<Predictions>;

    /// Human readable estimator name
    fn estimator_name(&self) -> &'static str;
}
