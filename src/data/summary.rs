//! Dataset inspection: shape, columns, preview and target distribution

use crate::core::{Result, TabmlError};
use crate::data::columns::{is_categorical, is_numeric, ranked_counts, string_column};
use polars::prelude::*;
use std::fmt;

/// Rows shown in previews
pub const PREVIEW_ROWS: usize = 5;

/// Targets with fewer distinct values than this are treated as classes
pub const MAX_DISCRETE_TARGET_VALUES: usize = 20;

/// Overview of a loaded table
#[derive(Debug, Clone)]
pub struct DatasetSummary {
    pub n_rows: usize,
    pub n_cols: usize,
    /// Column names with their data types
    pub columns: Vec<(String, String)>,
    pub preview: DataFrame,
}

impl DatasetSummary {
    pub fn from_frame(df: &DataFrame) -> Self {
        let columns = df
            .get_columns()
            .iter()
            .map(|c| (c.name().to_string(), c.dtype().to_string()))
            .collect();

        Self {
            n_rows: df.height(),
            n_cols: df.width(),
            columns,
            preview: df.head(Some(PREVIEW_ROWS)),
        }
    }
}

impl fmt::Display for DatasetSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Preview:")?;
        writeln!(f, "{}", self.preview)?;
        writeln!(f, "Shape: ({}, {})", self.n_rows, self.n_cols)?;
        writeln!(f, "Columns:")?;
        for (name, dtype) in &self.columns {
            writeln!(f, "  {name} ({dtype})")?;
        }
        Ok(())
    }
}

/// Distribution of the target column
#[derive(Debug, Clone, PartialEq)]
pub enum TargetDistribution {
    /// Class label with its share of non-missing rows, most frequent first
    Discrete(Vec<(String, f64)>),
    Continuous,
}

impl fmt::Display for TargetDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetDistribution::Continuous => f.write_str("Continuous"),
            TargetDistribution::Discrete(shares) => {
                let parts: Vec<String> = shares
                    .iter()
                    .map(|(label, share)| format!("{label}: {share:.3}"))
                    .collect();
                write!(f, "{{{}}}", parts.join(", "))
            }
        }
    }
}

/// Normalized value counts for string or low-cardinality targets,
/// `Continuous` otherwise
pub fn target_distribution(df: &DataFrame, target: &str) -> Result<TargetDistribution> {
    let dtype = df
        .column(target)
        .map_err(|_| TabmlError::ColumnNotFound(target.to_string()))?
        .dtype()
        .clone();

    let (labels, shares) = ranked_counts(&string_column(df, target)?, true)?;
    if !is_categorical(&dtype) && labels.len() >= MAX_DISCRETE_TARGET_VALUES {
        return Ok(TargetDistribution::Continuous);
    }

    let shares = shares.cast(&DataType::Float64)?;
    let shares = labels
        .str()?
        .into_iter()
        .zip(shares.f64()?)
        .filter_map(|(label, share)| Some((label?.to_string(), share?)))
        .collect();
    Ok(TargetDistribution::Discrete(shares))
}

/// Counts of non-missing values, most frequent first (ties by label)
pub fn value_counts(df: &DataFrame, name: &str) -> Result<Vec<(String, usize)>> {
    let (labels, counts) = ranked_counts(&string_column(df, name)?, false)?;
    let counts = counts.cast(&DataType::UInt64)?;
    Ok(labels
        .str()?
        .into_iter()
        .zip(counts.u64()?)
        .filter_map(|(label, n)| Some((label?.to_string(), n? as usize)))
        .collect())
}

/// Numeric and categorical feature columns of a frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnRoles {
    pub numeric: Vec<String>,
    pub categorical: Vec<String>,
}

/// Split columns into numeric and categorical roles by dtype, leaving out
/// the target and dropped columns
pub fn infer_column_roles(df: &DataFrame, target: Option<&str>, drop: &[String]) -> ColumnRoles {
    let mut roles = ColumnRoles::default();
    for column in df.get_columns() {
        let name = column.name().as_str();
        if Some(name) == target || drop.iter().any(|d| d == name) {
            continue;
        }
        if is_numeric(column.dtype()) {
            roles.numeric.push(name.to_string());
        } else if is_categorical(column.dtype()) {
            roles.categorical.push(name.to_string());
        }
    }
    roles
}
