//! Cross-validation and exhaustive grid search

use crate::core::{ModelKind, ModelParams, Predictions, ProblemType, Result, TabmlError};
use crate::data::columns::take_rows;
use crate::preprocessing::Preprocessor;
use crate::training::metrics::{accuracy, r2, silhouette_score};
use crate::training::model::FittedPipeline;
use crate::training::split::k_fold_indices;
use crate::training::target::TargetValues;
use log::{debug, warn};
use polars::prelude::{ChunkAgg, ChunkVar, DataFrame, Float64Chunked, NewChunkedArray};

/// Folds used to score grid candidates
pub const SEARCH_FOLDS: usize = 3;

/// Folds used for the cross-validation summary
pub const CV_FOLDS: usize = 5;

/// Result of a parameter search
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub best_params: ModelParams,
    pub best_score: Option<f64>,
    /// Every candidate with its mean score; `None` when it could not be scored
    pub candidates: Vec<(ModelParams, Option<f64>)>,
}

/// Score of held-out predictions: accuracy for classifiers, R² for
/// regressors
pub fn score(kind: ModelKind, y_true: &TargetValues, predictions: &Predictions) -> Result<f64> {
    match (kind.problem_type(), y_true, predictions) {
        (ProblemType::Classification, TargetValues::Classes { codes, .. }, Predictions::Labels(pred)) => {
            Ok(accuracy(codes, pred))
        }
        (ProblemType::Regression, TargetValues::Continuous(values), Predictions::Values(pred)) => {
            Ok(r2(values, pred))
        }
        _ => Err(TabmlError::InvalidParameter(format!(
            "{kind} cannot be scored against this target"
        ))),
    }
}

/// Per-fold scores of a supervised model; the preprocessor is refit on
/// every training fold
pub fn cross_val_score(
    kind: ModelKind,
    params: &ModelParams,
    preprocessor: &Preprocessor,
    features: &DataFrame,
    target: &TargetValues,
    folds: usize,
    seed: u64,
) -> Result<Vec<f64>> {
    if !kind.problem_type().is_supervised() {
        return Err(TabmlError::InvalidParameter(format!(
            "Cross-validation is not available for {kind}"
        )));
    }

    k_fold_indices(features.height(), folds, seed)?
        .iter()
        .enumerate()
        .map(|(fold, (train, validation))| {
            let train_target = target.select(train);
            let pipeline = FittedPipeline::fit(
                kind,
                *params,
                preprocessor,
                &take_rows(features, train)?,
                Some(&train_target),
                seed,
            )?;
            let predictions = pipeline.predict(&take_rows(features, validation)?)?;
            let fold_score = score(kind, &target.select(validation), &predictions)?;
            debug!("{kind} {params} fold {}: {fold_score:.4}", fold + 1);
            Ok(fold_score)
        })
        .collect()
}

/// Mean and population standard deviation
pub fn mean_std(scores: &[f64]) -> (f64, f64) {
    let scores = Float64Chunked::from_slice("scores".into(), scores);
    (scores.mean().unwrap_or(0.0), scores.std(0).unwrap_or(0.0))
}

/// Exhaustive search over the model's grid with k-fold scoring.
///
/// Returns `None` when the model has no grid.
pub fn grid_search(
    kind: ModelKind,
    preprocessor: &Preprocessor,
    features: &DataFrame,
    target: &TargetValues,
    folds: usize,
    seed: u64,
) -> Result<Option<SearchOutcome>> {
    let grid = ModelParams::grid(kind);
    if grid.is_empty() {
        return Ok(None);
    }

    let candidates = grid
        .into_iter()
        .map(|params| {
            let mean = match cross_val_score(kind, &params, preprocessor, features, target, folds, seed)
            {
                Ok(scores) => Some(mean_std(&scores).0),
                Err(e) => {
                    warn!("Skipping {kind} candidate {params}: {e}");
                    None
                }
            };
            (params, mean)
        })
        .collect();

    best_of(kind, candidates).map(Some)
}

/// Search over a clustering grid: every candidate is fit on all rows and
/// scored by silhouette.
pub fn clustering_search(
    kind: ModelKind,
    preprocessor: &Preprocessor,
    features: &DataFrame,
    seed: u64,
) -> Result<Option<SearchOutcome>> {
    let grid = ModelParams::grid(kind);
    if grid.is_empty() {
        return Ok(None);
    }

    let candidates = grid
        .into_iter()
        .map(|params| {
            let silhouette = FittedPipeline::fit(kind, params, preprocessor, features, None, seed)
                .and_then(|pipeline| {
                    let rows = pipeline.transform(features)?.rows();
                    Ok(pipeline
                        .cluster_labels()
                        .and_then(|labels| silhouette_score(&rows, labels)))
                });
            let silhouette = match silhouette {
                Ok(score) => score,
                Err(e) => {
                    warn!("Skipping {kind} candidate {params}: {e}");
                    None
                }
            };
            debug!("{kind} {params}: silhouette {silhouette:?}");
            (params, silhouette)
        })
        .collect();

    best_of(kind, candidates).map(Some)
}

/// Highest scoring candidate; ties go to the earlier one
fn best_of(kind: ModelKind, candidates: Vec<(ModelParams, Option<f64>)>) -> Result<SearchOutcome> {
    let mut best: Option<(ModelParams, f64)> = None;
    for (params, score) in &candidates {
        if let Some(score) = score {
            if best.map_or(true, |(_, s)| *score > s) {
                best = Some((*params, *score));
            }
        }
    }

    let (best_params, best_score) = best.ok_or_else(|| {
        TabmlError::Training(format!("No {kind} candidate could be scored"))
    })?;
    debug!("Best {kind} parameters: {best_params} ({best_score:.4})");

    Ok(SearchOutcome {
        best_params,
        best_score: Some(best_score),
        candidates,
    })
}
