//! Estimator dispatch over the model libraries
//!
//! Each model name maps to one library estimator. Agglomerative clustering
//! is computed from a Ward dendrogram cut at the requested cluster count;
//! it keeps the training labels but has no out-of-sample prediction.

use crate::core::{
    FeatureMatrix, ModelKind, ModelParams, Predictions, Predictor, Result, TabmlError,
};
use crate::training::target::TargetValues;
use kodama::{linkage, Method};
use log::debug;
use serde::{Deserialize, Serialize};
use smartcore::cluster::kmeans::{KMeans, KMeansParameters};
use smartcore::ensemble::random_forest_classifier::{
    RandomForestClassifier, RandomForestClassifierParameters,
};
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::linear::linear_regression::{LinearRegression, LinearRegressionParameters};
use smartcore::linear::logistic_regression::{
    LogisticRegression, LogisticRegressionParameters,
};
use smartcore::metrics::distance::{Distance, Distances};

type Matrix = DenseMatrix<f64>;

/// A fitted library estimator
#[derive(Debug, Serialize, Deserialize)]
pub enum FittedEstimator {
    LogisticRegression(LogisticRegression<f64, i32, Matrix, Vec<i32>>),
    RandomForestClassifier(RandomForestClassifier<f64, i32, Matrix, Vec<i32>>),
    LinearRegression(LinearRegression<f64, f64, Matrix, Vec<f64>>),
    RandomForestRegressor(RandomForestRegressor<f64, f64, Matrix, Vec<f64>>),
    KMeans {
        model: KMeans<f64, i32, Matrix, Vec<i32>>,
        labels: Vec<i32>,
    },
    Agglomerative {
        n_clusters: usize,
        labels: Vec<i32>,
    },
}

impl FittedEstimator {
    /// Fit the estimator for `kind` with `params`.
    ///
    /// Supervised models need a target of the matching kind; clustering
    /// models ignore it. `seed` fixes the k-means initialisation.
    pub fn fit(
        kind: ModelKind,
        params: &ModelParams,
        features: &FeatureMatrix,
        target: Option<&TargetValues>,
        seed: u64,
    ) -> Result<Self> {
        if features.n_rows() == 0 {
            return Err(TabmlError::EmptyDataset);
        }
        if features.n_features() == 0 {
            return Err(TabmlError::InvalidDataset(
                "No feature columns left after preprocessing".to_string(),
            ));
        }
        debug!(
            "Fitting {kind} with {params} on {} rows x {} features",
            features.n_rows(),
            features.n_features()
        );

        let estimator = match (kind, params) {
            (ModelKind::LogisticRegression, ModelParams::LogisticRegression { c }) => {
                if *c <= 0.0 {
                    return Err(TabmlError::InvalidParameter(format!(
                        "C must be positive, got: {c}"
                    )));
                }
                let y = class_codes(kind, target)?;
                let parameters = LogisticRegressionParameters::default().with_alpha(1.0 / c);
                FittedEstimator::LogisticRegression(LogisticRegression::fit(
                    &features.to_dense(),
                    &y,
                    parameters,
                )?)
            }
            (
                ModelKind::RandomForestClassifier,
                ModelParams::RandomForest {
                    n_estimators,
                    max_depth,
                },
            ) => {
                let y = class_codes(kind, target)?;
                let mut parameters =
                    RandomForestClassifierParameters::default().with_n_trees(*n_estimators as _);
                if let Some(depth) = max_depth {
                    parameters = parameters.with_max_depth(*depth as _);
                }
                FittedEstimator::RandomForestClassifier(RandomForestClassifier::fit(
                    &features.to_dense(),
                    &y,
                    parameters,
                )?)
            }
            (ModelKind::LinearRegression, ModelParams::LinearRegression) => {
                let y = continuous_values(kind, target)?;
                FittedEstimator::LinearRegression(LinearRegression::fit(
                    &features.to_dense(),
                    &y,
                    LinearRegressionParameters::default(),
                )?)
            }
            (
                ModelKind::RandomForestRegressor,
                ModelParams::RandomForest {
                    n_estimators,
                    max_depth,
                },
            ) => {
                let y = continuous_values(kind, target)?;
                let mut parameters =
                    RandomForestRegressorParameters::default().with_n_trees(*n_estimators as _);
                if let Some(depth) = max_depth {
                    parameters = parameters.with_max_depth(*depth as _);
                }
                FittedEstimator::RandomForestRegressor(RandomForestRegressor::fit(
                    &features.to_dense(),
                    &y,
                    parameters,
                )?)
            }
            (ModelKind::KMeans, ModelParams::KMeans { n_clusters }) => {
                check_cluster_count(*n_clusters, features.n_rows())?;
                let x = features.to_dense();
                let mut parameters = KMeansParameters::default().with_k(*n_clusters);
                parameters.seed = Some(seed);
                let model: KMeans<f64, i32, Matrix, Vec<i32>> = KMeans::fit(&x, parameters)?;
                let labels = model.predict(&x)?;
                FittedEstimator::KMeans { model, labels }
            }
            (ModelKind::AgglomerativeClustering, ModelParams::Agglomerative { n_clusters }) => {
                check_cluster_count(*n_clusters, features.n_rows())?;
                FittedEstimator::Agglomerative {
                    n_clusters: *n_clusters,
                    labels: ward_labels(&features.rows(), *n_clusters),
                }
            }
            (kind, params) => {
                return Err(TabmlError::InvalidParameter(format!(
                    "Parameters {params} do not apply to {kind}"
                )))
            }
        };
        Ok(estimator)
    }

    /// Cluster assignments of the rows the estimator was fitted on
    pub fn cluster_labels(&self) -> Option<&[i32]> {
        match self {
            FittedEstimator::KMeans { labels, .. } | FittedEstimator::Agglomerative { labels, .. } => {
                Some(labels)
            }
            _ => None,
        }
    }
}

impl Predictor for FittedEstimator {
    fn predict(&self, features: &FeatureMatrix) -> Result<Predictions> {
        if features.n_rows() == 0 {
            return Ok(match self {
                FittedEstimator::LinearRegression(_) | FittedEstimator::RandomForestRegressor(_) => {
                    Predictions::Values(Vec::new())
                }
                _ => Predictions::Labels(Vec::new()),
            });
        }

        let x = features.to_dense();
        let predictions = match self {
            FittedEstimator::LogisticRegression(model) => Predictions::Labels(model.predict(&x)?),
            FittedEstimator::RandomForestClassifier(model) => {
                Predictions::Labels(model.predict(&x)?)
            }
            FittedEstimator::LinearRegression(model) => Predictions::Values(model.predict(&x)?),
            FittedEstimator::RandomForestRegressor(model) => {
                Predictions::Values(model.predict(&x)?)
            }
            FittedEstimator::KMeans { model, .. } => Predictions::Labels(model.predict(&x)?),
            FittedEstimator::Agglomerative { .. } => {
                return Err(TabmlError::PredictionUnsupported(
                    self.estimator_name().to_string(),
                ))
            }
        };
        Ok(predictions)
    }

    fn estimator_name(&self) -> &'static str {
        match self {
            FittedEstimator::LogisticRegression(_) => ModelKind::LogisticRegression.name(),
            FittedEstimator::RandomForestClassifier(_) => ModelKind::RandomForestClassifier.name(),
            FittedEstimator::LinearRegression(_) => ModelKind::LinearRegression.name(),
            FittedEstimator::RandomForestRegressor(_) => ModelKind::RandomForestRegressor.name(),
            FittedEstimator::KMeans { .. } => ModelKind::KMeans.name(),
            FittedEstimator::Agglomerative { .. } => ModelKind::AgglomerativeClustering.name(),
        }
    }
}

fn class_codes(kind: ModelKind, target: Option<&TargetValues>) -> Result<Vec<i32>> {
    match target {
        Some(TargetValues::Classes { codes, .. }) => Ok(codes.clone()),
        Some(TargetValues::Continuous(_)) => Err(TabmlError::InvalidParameter(format!(
            "{kind} needs a categorical target"
        ))),
        None => Err(TabmlError::MissingTarget(kind.problem_type().to_string())),
    }
}

fn continuous_values(kind: ModelKind, target: Option<&TargetValues>) -> Result<Vec<f64>> {
    match target {
        Some(TargetValues::Continuous(values)) => Ok(values.clone()),
        Some(TargetValues::Classes { .. }) => Err(TabmlError::InvalidParameter(format!(
            "{kind} needs a numeric target"
        ))),
        None => Err(TabmlError::MissingTarget(kind.problem_type().to_string())),
    }
}

fn check_cluster_count(n_clusters: usize, n_rows: usize) -> Result<()> {
    if n_clusters < 2 {
        return Err(TabmlError::InvalidParameter(format!(
            "n_clusters must be at least 2, got: {n_clusters}"
        )));
    }
    if n_clusters > n_rows {
        return Err(TabmlError::InvalidDataset(format!(
            "Cannot form {n_clusters} clusters from {n_rows} rows"
        )));
    }
    Ok(())
}

/// Ward linkage over Euclidean distances, cut so that `n_clusters` remain.
/// Labels are numbered by first appearance.
fn ward_labels(rows: &[Vec<f64>], n_clusters: usize) -> Vec<i32> {
    let n = rows.len();
    if n < 2 {
        return vec![0; n];
    }

    let metric = Distances::euclidian::<f64>();
    let mut condensed = Vec::with_capacity(n * (n - 1) / 2);
    for i in 0..n - 1 {
        for j in i + 1..n {
            condensed.push(metric.distance(&rows[i], &rows[j]));
        }
    }
    let dendrogram = linkage(&mut condensed, n, Method::Ward);

    // Dendrogram cluster ids: observations are 0..n, step s creates n + s
    let mut parent: Vec<usize> = (0..n).collect();
    let mut representative: Vec<usize> = (0..n).collect();
    for step in dendrogram.steps().iter().take(n.saturating_sub(n_clusters)) {
        let a = find(&mut parent, representative[step.cluster1]);
        let b = find(&mut parent, representative[step.cluster2]);
        parent[b] = a;
        representative.push(a);
    }

    let mut roots: Vec<usize> = Vec::with_capacity(n_clusters);
    (0..n)
        .map(|i| {
            let root = find(&mut parent, i);
            let label = match roots.iter().position(|&r| r == root) {
                Some(label) => label,
                None => {
                    roots.push(root);
                    roots.len() - 1
                }
            };
            label as i32
        })
        .collect()
}

fn find(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}
