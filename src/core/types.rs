//! Core type definitions shared across the pipeline

use crate::core::{Result, TabmlError};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::matrix::DenseMatrix;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Problem family selecting which models and metrics apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProblemType {
    Classification,
    Regression,
    Clustering,
}

impl ProblemType {
    /// Whether this problem type needs a target column
    pub fn is_supervised(&self) -> bool {
        !matches!(self, ProblemType::Clustering)
    }

    /// Models offered for this problem type, in menu order
    pub fn models(&self) -> &'static [ModelKind] {
        match self {
            ProblemType::Classification => &[
                ModelKind::LogisticRegression,
                ModelKind::RandomForestClassifier,
            ],
            ProblemType::Regression => &[
                ModelKind::LinearRegression,
                ModelKind::RandomForestRegressor,
            ],
            ProblemType::Clustering => &[ModelKind::KMeans, ModelKind::AgglomerativeClustering],
        }
    }
}

impl fmt::Display for ProblemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProblemType::Classification => "Classification",
            ProblemType::Regression => "Regression",
            ProblemType::Clustering => "Clustering",
        };
        f.write_str(name)
    }
}

impl FromStr for ProblemType {
    type Err = TabmlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "classification" => Ok(ProblemType::Classification),
            "regression" => Ok(ProblemType::Regression),
            "clustering" => Ok(ProblemType::Clustering),
            other => Err(TabmlError::InvalidParameter(format!(
                "Unknown problem type: {other}. Use classification, regression or clustering"
            ))),
        }
    }
}

/// Named model choices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelKind {
    LogisticRegression,
    RandomForestClassifier,
    LinearRegression,
    RandomForestRegressor,
    KMeans,
    AgglomerativeClustering,
}

impl ModelKind {
    /// Display name as shown to the user
    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::LogisticRegression => "Logistic Regression",
            ModelKind::RandomForestClassifier => "Random Forest Classifier",
            ModelKind::LinearRegression => "Linear Regression",
            ModelKind::RandomForestRegressor => "Random Forest Regressor",
            ModelKind::KMeans => "KMeans",
            ModelKind::AgglomerativeClustering => "Agglomerative Clustering",
        }
    }

    /// The problem type this model belongs to
    pub fn problem_type(&self) -> ProblemType {
        match self {
            ModelKind::LogisticRegression | ModelKind::RandomForestClassifier => {
                ProblemType::Classification
            }
            ModelKind::LinearRegression | ModelKind::RandomForestRegressor => {
                ProblemType::Regression
            }
            ModelKind::KMeans | ModelKind::AgglomerativeClustering => ProblemType::Clustering,
        }
    }

    /// File-system friendly name: lowercase, spaces replaced by underscores
    pub fn safe_name(&self) -> String {
        self.name().replace(' ', "_").to_lowercase()
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModelKind {
    type Err = TabmlError;

    /// Accepts display names ("Random Forest Classifier") as well as
    /// kebab/snake forms ("random-forest-classifier")
    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase();

        let kind = match normalized.as_str() {
            "logisticregression" => ModelKind::LogisticRegression,
            "randomforestclassifier" => ModelKind::RandomForestClassifier,
            "linearregression" => ModelKind::LinearRegression,
            "randomforestregressor" => ModelKind::RandomForestRegressor,
            "kmeans" => ModelKind::KMeans,
            "agglomerativeclustering" => ModelKind::AgglomerativeClustering,
            _ => {
                return Err(TabmlError::InvalidParameter(format!(
                    "Unknown model: {}",
                    s.trim()
                )))
            }
        };
        Ok(kind)
    }
}

/// Hyperparameters for one model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ModelParams {
    LogisticRegression { c: f64 },
    RandomForest { n_estimators: usize, max_depth: Option<usize> },
    LinearRegression,
    KMeans { n_clusters: usize },
    Agglomerative { n_clusters: usize },
}

impl ModelParams {
    /// Defaults used when no search runs
    pub fn default_for(kind: ModelKind) -> Self {
        match kind {
            ModelKind::LogisticRegression => ModelParams::LogisticRegression { c: 1.0 },
            ModelKind::RandomForestClassifier | ModelKind::RandomForestRegressor => {
                ModelParams::RandomForest {
                    n_estimators: 100,
                    max_depth: None,
                }
            }
            ModelKind::LinearRegression => ModelParams::LinearRegression,
            ModelKind::KMeans => ModelParams::KMeans { n_clusters: 3 },
            ModelKind::AgglomerativeClustering => ModelParams::Agglomerative { n_clusters: 2 },
        }
    }

    /// Search grid for a model; empty when the model has nothing to tune
    pub fn grid(kind: ModelKind) -> Vec<Self> {
        match kind {
            ModelKind::LogisticRegression => [0.1, 1.0, 10.0]
                .into_iter()
                .map(|c| ModelParams::LogisticRegression { c })
                .collect(),
            ModelKind::RandomForestClassifier => {
                forest_grid(&[50, 100], &[None, Some(10), Some(20)])
            }
            ModelKind::LinearRegression => Vec::new(),
            ModelKind::RandomForestRegressor => forest_grid(&[50, 100], &[None, Some(10)]),
            ModelKind::KMeans => (2..=5)
                .map(|n_clusters| ModelParams::KMeans { n_clusters })
                .collect(),
            ModelKind::AgglomerativeClustering => (2..=4)
                .map(|n_clusters| ModelParams::Agglomerative { n_clusters })
                .collect(),
        }
    }
}

fn forest_grid(n_estimators: &[usize], max_depths: &[Option<usize>]) -> Vec<ModelParams> {
    n_estimators
        .iter()
        .flat_map(|&n| {
            max_depths.iter().map(move |&max_depth| ModelParams::RandomForest {
                n_estimators: n,
                max_depth,
            })
        })
        .collect()
}

impl fmt::Display for ModelParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelParams::LogisticRegression { c } => write!(f, "{{C: {c}}}"),
            ModelParams::RandomForest {
                n_estimators,
                max_depth,
            } => {
                let depth = max_depth.map_or_else(|| "None".to_string(), |d| d.to_string());
                write!(f, "{{n_estimators: {n_estimators}, max_depth: {depth}}}")
            }
            ModelParams::LinearRegression => write!(f, "{{}}"),
            ModelParams::KMeans { n_clusters } | ModelParams::Agglomerative { n_clusters } => {
                write!(f, "{{n_clusters: {n_clusters}}}")
            }
        }
    }
}

/// A single metric: a score, or a note explaining why it is unavailable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Score(f64),
    Unavailable(String),
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Score(v) => write!(f, "{v:.6}"),
            MetricValue::Unavailable(reason) => f.write_str(reason),
        }
    }
}

/// Per-class precision/recall/f1
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassScores {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

/// Classification report with per-class rows and averages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub classes: BTreeMap<String, ClassScores>,
    pub macro_avg: ClassScores,
    pub weighted_avg: ClassScores,
}

/// Metrics for one trained model, keyed by metric name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub scores: BTreeMap<String, MetricValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<ClassificationReport>,
}

impl EvaluationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, value: f64) {
        self.scores.insert(name.to_string(), MetricValue::Score(value));
    }

    pub fn insert_unavailable(&mut self, name: &str) {
        self.scores
            .insert(name.to_string(), MetricValue::Unavailable("N/A".to_string()));
    }

    /// Numeric value of a metric, if present and available
    pub fn get(&self, name: &str) -> Option<f64> {
        match self.scores.get(name) {
            Some(MetricValue::Score(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.scores.contains_key(name)
    }
}

impl fmt::Display for EvaluationMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .scores
            .iter()
            .map(|(name, value)| format!("{name}: {value}"))
            .collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

/// Dense, column-major feature block produced by preprocessing
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    names: Vec<String>,
    columns: Vec<Vec<f64>>,
    n_rows: usize,
}

impl FeatureMatrix {
    /// Build from named columns; all columns must have the same length
    pub fn new(names: Vec<String>, columns: Vec<Vec<f64>>, n_rows: usize) -> Result<Self> {
        if names.len() != columns.len() {
            return Err(TabmlError::InvalidDataset(format!(
                "{} feature names for {} columns",
                names.len(),
                columns.len()
            )));
        }
        if let Some((name, column)) = names.iter().zip(&columns).find(|(_, c)| c.len() != n_rows) {
            return Err(TabmlError::InvalidDataset(format!(
                "Feature '{name}' has {} values, expected {n_rows}",
                column.len()
            )));
        }
        Ok(Self {
            names,
            columns,
            n_rows,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_features(&self) -> usize {
        self.columns.len()
    }

    /// (rows, features)
    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows, self.columns.len())
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn column(&self, i: usize) -> &[f64] {
        &self.columns[i]
    }

    /// Row-major copy of the values
    pub fn rows(&self) -> Vec<Vec<f64>> {
        (0..self.n_rows)
            .map(|r| self.columns.iter().map(|c| c[r]).collect())
            .collect()
    }

    /// Matrix in the estimator library's layout
    pub fn to_dense(&self) -> DenseMatrix<f64> {
        DenseMatrix::from_2d_vec(&self.rows())
    }

    /// Feature block as a data frame, for previews
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let columns: Vec<Column> = self
            .names
            .iter()
            .zip(&self.columns)
            .map(|(name, values)| Series::new(name.as_str().into(), values.as_slice()).into())
            .collect();
        Ok(DataFrame::new(columns)?)
    }
}

/// Raw estimator output
#[derive(Debug, Clone, PartialEq)]
pub enum Predictions {
    /// Encoded class or cluster indices
    Labels(Vec<i32>),
    /// Continuous values
    Values(Vec<f64>),
}

impl Predictions {
    pub fn len(&self) -> usize {
        match self {
            Predictions::Labels(v) => v.len(),
            Predictions::Values(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_kind_parsing() {
        assert_eq!(
            "Random Forest Classifier".parse::<ModelKind>().unwrap(),
            ModelKind::RandomForestClassifier
        );
        assert_eq!(
            "logistic-regression".parse::<ModelKind>().unwrap(),
            ModelKind::LogisticRegression
        );
        assert_eq!("kmeans".parse::<ModelKind>().unwrap(), ModelKind::KMeans);
        assert!("gradient boosting".parse::<ModelKind>().is_err());
    }

    #[test]
    fn test_model_kind_problem_type() {
        for problem in [
            ProblemType::Classification,
            ProblemType::Regression,
            ProblemType::Clustering,
        ] {
            for kind in problem.models() {
                assert_eq!(kind.problem_type(), problem);
            }
        }
    }

    #[test]
    fn test_safe_name() {
        assert_eq!(
            ModelKind::AgglomerativeClustering.safe_name(),
            "agglomerative_clustering"
        );
        assert_eq!(ModelKind::KMeans.safe_name(), "kmeans");
    }

    #[test]
    fn test_param_grids() {
        assert_eq!(ModelParams::grid(ModelKind::LogisticRegression).len(), 3);
        assert_eq!(ModelParams::grid(ModelKind::RandomForestClassifier).len(), 6);
        assert!(ModelParams::grid(ModelKind::LinearRegression).is_empty());
        assert_eq!(ModelParams::grid(ModelKind::RandomForestRegressor).len(), 4);
        assert_eq!(ModelParams::grid(ModelKind::KMeans).len(), 4);
        assert_eq!(ModelParams::grid(ModelKind::AgglomerativeClustering).len(), 3);
    }

    #[test]
    fn test_params_display() {
        let params = ModelParams::RandomForest {
            n_estimators: 50,
            max_depth: None,
        };
        assert_eq!(params.to_string(), "{n_estimators: 50, max_depth: None}");
        assert_eq!(
            ModelParams::default_for(ModelKind::KMeans).to_string(),
            "{n_clusters: 3}"
        );
    }

    #[test]
    fn test_metrics_lookup() {
        let mut metrics = EvaluationMetrics::new();
        metrics.insert("accuracy", 0.75);
        metrics.insert_unavailable("silhouette");

        assert_eq!(metrics.get("accuracy"), Some(0.75));
        assert!(metrics.contains("silhouette"));
        assert_eq!(metrics.get("silhouette"), None);
        assert_eq!(
            metrics.to_string(),
            "{accuracy: 0.750000, silhouette: N/A}"
        );
    }

    #[test]
    fn test_feature_matrix_rows() {
        let matrix = FeatureMatrix::new(
            vec!["a".to_string(), "b".to_string()],
            vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]],
            3,
        )
        .unwrap();

        assert_eq!(matrix.shape(), (3, 2));
        assert_eq!(matrix.rows()[1], vec![2.0, 5.0]);

        let df = matrix.to_dataframe().unwrap();
        assert_eq!(df.shape(), (3, 2));
    }

    #[test]
    fn test_feature_matrix_length_mismatch() {
        let result = FeatureMatrix::new(
            vec!["a".to_string()],
            vec![vec![1.0, 2.0]],
            3,
        );
        assert!(result.is_err());
    }
}
