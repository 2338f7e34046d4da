//! High-level API for training runs
//!
//! A run takes one data frame, a problem type and a list of model names,
//! and produces one [`TrainingResult`] per model.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use tabml::api::Trainer;
//! use tabml::core::{ModelKind, ProblemType};
//! use tabml::data::load_data;
//! use tabml::preprocessing::PreprocessingConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let df = load_data("churn.csv")?;
//!
//! let results = Trainer::new(ProblemType::Classification)
//!     .with_models(&[ModelKind::LogisticRegression, ModelKind::RandomForestClassifier])
//!     .with_preprocessing(PreprocessingConfig::recommended())
//!     .with_tuning(true)
//!     .train(&df, Some("churned"))?;
//!
//! println!("{results}");
//! # Ok(())
//! # }
//! ```

use crate::core::{
    EvaluationMetrics, ModelKind, ModelParams, Predictions, ProblemType, Result, TabmlError,
};
use crate::data::columns::{drop_columns, take_rows};
use crate::data::summary::PREVIEW_ROWS;
use crate::preprocessing::{PreprocessingConfig, Preprocessor};
use crate::training::metrics::{classification_metrics, clustering_metrics, regression_metrics};
use crate::training::search::{
    clustering_search, cross_val_score, grid_search, mean_std, CV_FOLDS, SEARCH_FOLDS,
};
use crate::training::{
    train_test_indices, FittedPipeline, TargetValues, DEFAULT_SEED, DEFAULT_TEST_FRACTION,
};
use log::{debug, info, warn};
use polars::prelude::DataFrame;
use std::fmt;

/// Builder for a training run
#[derive(Debug, Clone)]
pub struct Trainer {
    problem: ProblemType,
    models: Vec<ModelKind>,
    preprocessing: Option<PreprocessingConfig>,
    cross_validation: bool,
    tuning: bool,
    test_fraction: f64,
    seed: u64,
    cv_folds: usize,
    search_folds: usize,
}

impl Trainer {
    /// Create a trainer with cross-validation on and tuning off
    pub fn new(problem: ProblemType) -> Self {
        Self {
            problem,
            models: Vec::new(),
            preprocessing: None,
            cross_validation: true,
            tuning: false,
            test_fraction: DEFAULT_TEST_FRACTION,
            seed: DEFAULT_SEED,
            cv_folds: CV_FOLDS,
            search_folds: SEARCH_FOLDS,
        }
    }

    /// Models to train, in order
    pub fn with_models(mut self, models: &[ModelKind]) -> Self {
        self.models = models.to_vec();
        self
    }

    /// Add a single model
    pub fn with_model(mut self, model: ModelKind) -> Self {
        self.models.push(model);
        self
    }

    /// Preprocessing applied before every model; without one all feature
    /// columns are passed through
    pub fn with_preprocessing(mut self, config: PreprocessingConfig) -> Self {
        self.preprocessing = Some(config);
        self
    }

    /// Report k-fold cross-validation scores for supervised models
    pub fn with_cross_validation(mut self, enabled: bool) -> Self {
        self.cross_validation = enabled;
        self
    }

    /// Run a grid search before the final fit
    pub fn with_tuning(mut self, enabled: bool) -> Self {
        self.tuning = enabled;
        self
    }

    /// Share of rows held out for evaluation
    pub fn with_test_fraction(mut self, fraction: f64) -> Self {
        self.test_fraction = fraction;
        self
    }

    /// Seed for the split and fold shuffles
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Number of cross-validation folds
    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    pub fn problem(&self) -> ProblemType {
        self.problem
    }

    /// Selected models with duplicates removed, checked against the
    /// problem type
    pub fn validated_models(&self) -> Result<Vec<ModelKind>> {
        if self.models.is_empty() {
            return Err(TabmlError::NoModelsSelected);
        }

        let mut models: Vec<ModelKind> = Vec::with_capacity(self.models.len());
        for &kind in &self.models {
            if kind.problem_type() != self.problem {
                return Err(TabmlError::ModelProblemMismatch {
                    model: kind.name().to_string(),
                    problem: self.problem.to_string(),
                });
            }
            if !models.contains(&kind) {
                models.push(kind);
            }
        }
        Ok(models)
    }

    /// Train every selected model on `df`.
    ///
    /// Supervised problems need `target`; clustering ignores it apart from
    /// leaving it out of the features.
    pub fn train(&self, df: &DataFrame, target: Option<&str>) -> Result<RunResults> {
        let models = self.validated_models()?;
        if df.height() == 0 {
            return Err(TabmlError::EmptyDataset);
        }

        let target = match target {
            Some(name) => {
                if df.column(name).is_err() {
                    return Err(TabmlError::ColumnNotFound(name.to_string()));
                }
                Some(name)
            }
            None if self.problem.is_supervised() => {
                return Err(TabmlError::MissingTarget(self.problem.to_string()))
            }
            None => None,
        };

        let preprocessor = self.preprocessor(df, target)?;
        let mut excluded = preprocessor.config().drop.clone();
        if let Some(name) = target {
            if !excluded.iter().any(|d| d == name) {
                excluded.push(name.to_string());
            }
        }
        let features = drop_columns(df, &excluded)?;

        info!(
            "Training {} {} model(s) on {} rows x {} feature columns",
            models.len(),
            self.problem,
            features.height(),
            features.width()
        );

        let results = match target {
            Some(name) if self.problem.is_supervised() => {
                let target = TargetValues::encode(df, name, self.problem)?;
                self.train_supervised(&models, &preprocessor, &features, &target)?
            }
            _ => self.train_clustering(&models, &preprocessor, &features)?,
        };

        Ok(RunResults {
            problem: self.problem,
            results,
        })
    }

    fn preprocessor(&self, df: &DataFrame, target: Option<&str>) -> Result<Preprocessor> {
        let Some(config) = &self.preprocessing else {
            return Ok(Preprocessor::passthrough());
        };

        let config = config.clone().with_inferred_columns(df, target);
        config.validate(target)?;
        if let Some(missing) = config
            .drop
            .iter()
            .chain(&config.num_cols)
            .chain(&config.cat_cols)
            .find(|name| df.column(name.as_str()).is_err())
        {
            return Err(TabmlError::ColumnNotFound(missing.clone()));
        }
        debug!(
            "Preprocessing {} numeric and {} categorical columns",
            config.num_cols.len(),
            config.cat_cols.len()
        );
        Ok(Preprocessor::new(config))
    }

    fn train_supervised(
        &self,
        models: &[ModelKind],
        preprocessor: &Preprocessor,
        features: &DataFrame,
        target: &TargetValues,
    ) -> Result<Vec<TrainingResult>> {
        let (train_idx, test_idx) =
            train_test_indices(features.height(), self.test_fraction, self.seed)?;
        let x_train = take_rows(features, &train_idx)?;
        let x_test = take_rows(features, &test_idx)?;
        let y_train = target.select(&train_idx);
        let y_test = target.select(&test_idx);
        debug!("Split {} train / {} test rows", train_idx.len(), test_idx.len());

        let preview_len = test_idx.len().min(PREVIEW_ROWS);
        let preview_rows: Vec<usize> = (0..preview_len).collect();

        let mut results = Vec::with_capacity(models.len());
        for &kind in models {
            info!("Training {kind}");

            let mut params = ModelParams::default_for(kind);
            let mut best_params = None;
            if self.tuning {
                if let Some(outcome) = grid_search(
                    kind,
                    preprocessor,
                    &x_train,
                    &y_train,
                    self.search_folds,
                    self.seed,
                )? {
                    params = outcome.best_params;
                    best_params = Some(outcome.best_params);
                } else {
                    debug!("{kind} has no parameter grid; using defaults");
                }
            }

            let pipeline = FittedPipeline::fit(
                kind,
                params,
                preprocessor,
                &x_train,
                Some(&y_train),
                self.seed,
            )?;
            let predictions = pipeline.predict(&x_test)?;

            let mut metrics = match (&y_test, &predictions) {
                (TargetValues::Classes { codes, labels }, Predictions::Labels(pred)) => {
                    classification_metrics(codes, pred, labels)
                }
                (TargetValues::Continuous(values), Predictions::Values(pred)) => {
                    regression_metrics(values, pred)
                }
                _ => {
                    return Err(TabmlError::Training(format!(
                        "{kind} produced predictions that do not match the target"
                    )))
                }
            };

            let mut cv_scores = None;
            if self.cross_validation {
                match cross_val_score(
                    kind,
                    &params,
                    preprocessor,
                    &x_train,
                    &y_train,
                    self.cv_folds,
                    self.seed,
                ) {
                    Ok(scores) => {
                        let (mean, std) = mean_std(&scores);
                        metrics.insert("cv_mean", mean);
                        metrics.insert("cv_std", std);
                        cv_scores = Some(scores);
                    }
                    Err(e) => {
                        warn!("Cross-validation failed for {kind}: {e}");
                        metrics.insert_unavailable("cv_mean");
                        metrics.insert_unavailable("cv_std");
                    }
                }
            }

            info!("{kind}: {metrics}");
            results.push(TrainingResult {
                model_name: kind.name().to_string(),
                kind,
                metrics,
                pipeline,
                params,
                best_params,
                cv_scores,
                x_test_head: Some(x_test.head(Some(PREVIEW_ROWS))),
                y_test_head: Some(y_test.select(&preview_rows).display_values()),
            });
        }
        Ok(results)
    }

    fn train_clustering(
        &self,
        models: &[ModelKind],
        preprocessor: &Preprocessor,
        features: &DataFrame,
    ) -> Result<Vec<TrainingResult>> {
        if self.cross_validation {
            debug!("Cross-validation does not apply to clustering; skipping");
        }

        let mut results = Vec::with_capacity(models.len());
        for &kind in models {
            info!("Training {kind}");

            let mut params = ModelParams::default_for(kind);
            let mut best_params = None;
            if self.tuning {
                if let Some(outcome) = clustering_search(kind, preprocessor, features, self.seed)? {
                    params = outcome.best_params;
                    best_params = Some(outcome.best_params);
                }
            }

            let pipeline = FittedPipeline::fit(kind, params, preprocessor, features, None, self.seed)?;
            let rows = pipeline.transform(features)?.rows();
            let metrics = match pipeline.cluster_labels() {
                Some(labels) => clustering_metrics(&rows, labels),
                None => {
                    let mut metrics = EvaluationMetrics::new();
                    metrics.insert_unavailable("silhouette");
                    metrics
                }
            };

            info!("{kind}: {metrics}");
            results.push(TrainingResult {
                model_name: kind.name().to_string(),
                kind,
                metrics,
                pipeline,
                params,
                best_params,
                cv_scores: None,
                x_test_head: None,
                y_test_head: None,
            });
        }
        Ok(results)
    }
}

/// Outcome of training one model
#[derive(Debug)]
pub struct TrainingResult {
    pub model_name: String,
    pub kind: ModelKind,
    pub metrics: EvaluationMetrics,
    pub pipeline: FittedPipeline,
    /// Parameters of the final fit
    pub params: ModelParams,
    /// Set only when a search ran
    pub best_params: Option<ModelParams>,
    /// Per-fold scores when cross-validation ran
    pub cv_scores: Option<Vec<f64>>,
    /// First rows of the held-out features
    pub x_test_head: Option<DataFrame>,
    /// First held-out targets, aligned with `x_test_head`
    pub y_test_head: Option<Vec<String>>,
}

impl TrainingResult {
    /// Best parameters rendered for display, "N/A" when no search ran
    pub fn best_params_display(&self) -> String {
        self.best_params
            .map_or_else(|| "N/A".to_string(), |p| p.to_string())
    }
}

impl fmt::Display for TrainingResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Model: {}", self.model_name)?;
        writeln!(f, "Params: {}", self.params)?;
        writeln!(f, "Best Params: {}", self.best_params_display())?;
        writeln!(f, "Metrics: {}", self.metrics)?;

        if let Some(report) = &self.metrics.report {
            writeln!(
                f,
                "  {:<20} {:>9} {:>9} {:>9} {:>9}",
                "class", "precision", "recall", "f1-score", "support"
            )?;
            let rows = report
                .classes
                .iter()
                .map(|(label, scores)| (label.as_str(), scores))
                .chain([
                    ("macro avg", &report.macro_avg),
                    ("weighted avg", &report.weighted_avg),
                ]);
            for (label, scores) in rows {
                writeln!(
                    f,
                    "  {:<20} {:>9.4} {:>9.4} {:>9.4} {:>9}",
                    label, scores.precision, scores.recall, scores.f1_score, scores.support
                )?;
            }
        }
        Ok(())
    }
}

/// All results of one run, in model order
#[derive(Debug)]
pub struct RunResults {
    pub problem: ProblemType,
    pub results: Vec<TrainingResult>,
}

impl RunResults {
    /// Result for a model by display name
    pub fn get(&self, model_name: &str) -> Option<&TrainingResult> {
        self.results.iter().find(|r| r.model_name == model_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrainingResult> {
        self.results.iter()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

impl fmt::Display for RunResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} run: {} model(s)", self.problem, self.results.len())?;
        for result in &self.results {
            writeln!(f)?;
            write!(f, "{result}")?;
        }
        Ok(())
    }
}

/// Convenience functions for quick operations
pub mod quick {
    use super::*;

    /// Train the named models in one call.
    ///
    /// `model_names` accepts display names ("Random Forest Classifier") or
    /// their kebab/snake forms.
    pub fn train_model(
        df: &DataFrame,
        target: Option<&str>,
        problem: ProblemType,
        model_names: &[&str],
        config: Option<PreprocessingConfig>,
        use_cv: bool,
        tune: bool,
    ) -> Result<RunResults> {
        let models = model_names
            .iter()
            .map(|name| name.parse::<ModelKind>())
            .collect::<Result<Vec<_>>>()?;

        let mut trainer = Trainer::new(problem)
            .with_models(&models)
            .with_cross_validation(use_cv)
            .with_tuning(tune);
        if let Some(config) = config {
            trainer = trainer.with_preprocessing(config);
        }
        trainer.train(df, target)
    }
}
