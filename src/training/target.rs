//! Target column encoding

use crate::core::{ProblemType, Result, TabmlError};
use crate::data::columns::{numeric_values, string_values};
use polars::prelude::DataFrame;

/// Encoded target values
#[derive(Debug, Clone, PartialEq)]
pub enum TargetValues {
    /// Class codes indexing into the sorted class labels
    Classes { codes: Vec<i32>, labels: Vec<String> },
    Continuous(Vec<f64>),
}

impl TargetValues {
    /// Encode the target column for a supervised problem type
    pub fn encode(df: &DataFrame, target: &str, problem: ProblemType) -> Result<Self> {
        match problem {
            ProblemType::Classification => {
                let values = string_values(df, target)?
                    .into_iter()
                    .collect::<Option<Vec<String>>>()
                    .ok_or_else(|| missing_target(target))?;

                let mut labels = values.clone();
                labels.sort();
                labels.dedup();

                let codes = values
                    .iter()
                    .map(|v| labels.binary_search(v).map(|i| i as i32).unwrap_or(-1))
                    .collect();
                Ok(TargetValues::Classes { codes, labels })
            }
            ProblemType::Regression => {
                let values = numeric_values(df, target)?
                    .into_iter()
                    .collect::<Option<Vec<f64>>>()
                    .ok_or_else(|| missing_target(target))?;
                Ok(TargetValues::Continuous(values))
            }
            ProblemType::Clustering => Err(TabmlError::InvalidParameter(
                "Clustering does not use a target column".to_string(),
            )),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            TargetValues::Classes { codes, .. } => codes.len(),
            TargetValues::Continuous(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Subset by row position
    pub fn select(&self, indices: &[usize]) -> Self {
        match self {
            TargetValues::Classes { codes, labels } => TargetValues::Classes {
                codes: indices.iter().map(|&i| codes[i]).collect(),
                labels: labels.clone(),
            },
            TargetValues::Continuous(values) => {
                TargetValues::Continuous(indices.iter().map(|&i| values[i]).collect())
            }
        }
    }

    /// Values as floats, for metric functions
    pub fn as_f64(&self) -> Vec<f64> {
        match self {
            TargetValues::Classes { codes, .. } => codes.iter().map(|&c| c as f64).collect(),
            TargetValues::Continuous(values) => values.clone(),
        }
    }

    /// Class labels, for classification targets
    pub fn labels(&self) -> Option<&[String]> {
        match self {
            TargetValues::Classes { labels, .. } => Some(labels),
            TargetValues::Continuous(_) => None,
        }
    }

    /// Values rendered for display
    pub fn display_values(&self) -> Vec<String> {
        match self {
            TargetValues::Classes { codes, labels } => codes
                .iter()
                .map(|&c| labels[c as usize].clone())
                .collect(),
            TargetValues::Continuous(values) => values.iter().map(|v| v.to_string()).collect(),
        }
    }
}

fn missing_target(target: &str) -> TabmlError {
    TabmlError::InvalidDataset(format!("Target column '{target}' contains missing values"))
}
