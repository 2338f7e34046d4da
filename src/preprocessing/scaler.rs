//! Column statistics, imputation fill values and scaling

use crate::core::Result;
use crate::data::columns::ranked_counts;
use crate::preprocessing::config::NumericImpute;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Statistics for a single numeric column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Population standard deviation
    pub std: f64,
    pub count: usize,
}

impl FeatureStats {
    /// Statistics over the non-missing values; `None` when there are none
    pub fn from_column(values: &Float64Chunked) -> Option<Self> {
        let count = values.len() - values.null_count();
        if count == 0 {
            return None;
        }

        Some(Self {
            min: values.min()?,
            max: values.max()?,
            mean: values.mean()?,
            std: values.std(0)?,
            count,
        })
    }
}

/// Fill value for missing entries under a numeric strategy; `None` when
/// the column has no values to learn from
pub fn numeric_fill_value(
    values: &Float64Chunked,
    strategy: NumericImpute,
) -> Result<Option<f64>> {
    let fill = match strategy {
        NumericImpute::Constant => Some(0.0),
        NumericImpute::Mean => values.mean(),
        NumericImpute::Median => values.median(),
        NumericImpute::MostFrequent => {
            // Ties resolve to the smallest value
            let (modes, _) = ranked_counts(&values.clone().into_series(), false)?;
            modes.f64()?.get(0)
        }
    };
    Ok(fill)
}

/// Most frequent label; ties resolve to the lexicographically smallest
pub fn most_frequent_label(values: &Series) -> Result<Option<String>> {
    let (modes, _) = ranked_counts(&values.cast(&DataType::String)?, false)?;
    Ok(modes.str()?.get(0).map(str::to_string))
}

/// Scaling methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScalingMethod {
    /// (x - mean) / std
    Standard,
    /// (x - min) / (max - min), into [0, 1]
    MinMax,
}

/// Scaling parameters learned from training values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedScaler {
    pub method: ScalingMethod,
    pub stats: FeatureStats,
}

impl FittedScaler {
    pub fn fit(values: &Float64Chunked, method: ScalingMethod) -> Option<Self> {
        FeatureStats::from_column(values).map(|stats| Self { method, stats })
    }

    /// Scale a single value; constant columns map to 0
    pub fn scale_value(&self, value: f64) -> f64 {
        match self.method {
            ScalingMethod::Standard => {
                if self.stats.std < 1e-12 {
                    0.0
                } else {
                    (value - self.stats.mean) / self.stats.std
                }
            }
            ScalingMethod::MinMax => {
                let range = self.stats.max - self.stats.min;
                if range.abs() < 1e-12 {
                    0.0
                } else {
                    (value - self.stats.min) / range
                }
            }
        }
    }
}
