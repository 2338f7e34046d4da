//! Fitted pipeline: preprocessing state plus estimator

use crate::core::{
    FeatureMatrix, ModelKind, ModelParams, Predictions, Predictor, Result, TabmlError,
    Transformer,
};
use crate::preprocessing::{FittedPreprocessor, Preprocessor};
use crate::training::estimator::FittedEstimator;
use crate::training::target::TargetValues;
use chrono::{DateTime, Utc};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

/// A trained model that maps raw feature frames to predictions
#[derive(Debug, Serialize, Deserialize)]
pub struct FittedPipeline {
    pub kind: ModelKind,
    pub params: ModelParams,
    pub preprocessor: FittedPreprocessor,
    pub estimator: FittedEstimator,
    /// Class labels indexed by the estimator's class codes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classes: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub library_version: String,
}

impl FittedPipeline {
    /// Fit the preprocessor on `features`, then the estimator on the
    /// transformed rows
    pub fn fit(
        kind: ModelKind,
        params: ModelParams,
        preprocessor: &Preprocessor,
        features: &DataFrame,
        target: Option<&TargetValues>,
        seed: u64,
    ) -> Result<Self> {
        let (fitted, matrix) = preprocessor.fit_transform(features)?;
        let estimator = FittedEstimator::fit(kind, &params, &matrix, target, seed)?;

        Ok(Self {
            kind,
            params,
            preprocessor: fitted,
            estimator,
            classes: target.and_then(|t| t.labels()).map(|labels| labels.to_vec()),
            created_at: Utc::now(),
            library_version: crate::VERSION.to_string(),
        })
    }

    /// Apply the fitted preprocessing to a raw frame
    pub fn transform(&self, features: &DataFrame) -> Result<FeatureMatrix> {
        self.preprocessor.transform(features)
    }

    /// Raw estimator output for a raw feature frame
    pub fn predict(&self, features: &DataFrame) -> Result<Predictions> {
        let matrix = self.transform(features)?;
        self.estimator.predict(&matrix)
    }

    /// Predictions rendered for display: class labels for classifiers,
    /// cluster ids for clusterers, numbers for regressors
    pub fn predict_labels(&self, features: &DataFrame) -> Result<Vec<String>> {
        let rendered = match self.predict(features)? {
            Predictions::Labels(codes) => codes
                .into_iter()
                .map(|code| self.class_label(code))
                .collect::<Result<Vec<_>>>()?,
            Predictions::Values(values) => values.iter().map(|v| v.to_string()).collect(),
        };
        Ok(rendered)
    }

    fn class_label(&self, code: i32) -> Result<String> {
        match &self.classes {
            Some(classes) => usize::try_from(code)
                .ok()
                .and_then(|i| classes.get(i))
                .cloned()
                .ok_or_else(|| {
                    TabmlError::InvalidDataset(format!("Predicted unknown class code {code}"))
                }),
            None => Ok(code.to_string()),
        }
    }

    /// Cluster assignments of the training rows, for clustering models
    pub fn cluster_labels(&self) -> Option<&[i32]> {
        self.estimator.cluster_labels()
    }

    pub fn n_features(&self) -> usize {
        self.preprocessor.n_features_out()
    }

    pub fn feature_names(&self) -> Vec<String> {
        self.preprocessor.feature_names_out()
    }
}
