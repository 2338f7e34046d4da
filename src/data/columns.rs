//! Typed column access over data frames

use crate::core::{Result, TabmlError};
use polars::prelude::*;

/// Integer, float and boolean columns count as numeric features
pub fn is_numeric(dtype: &DataType) -> bool {
    dtype.is_integer() || dtype.is_float() || matches!(dtype, DataType::Boolean)
}

/// String columns count as categorical features
pub fn is_categorical(dtype: &DataType) -> bool {
    matches!(dtype, DataType::String)
}

/// Column name holding the distinct values in [`ranked_counts`]
const VALUE_COLUMN: &str = "value";

/// Column name holding the counts (or shares) in [`ranked_counts`]
const COUNT_COLUMN: &str = "count";

fn series<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series> {
    df.column(name)
        .map(|column| column.as_materialized_series())
        .map_err(|_| TabmlError::ColumnNotFound(name.to_string()))
}

/// Numeric column cast to `f64`; non-numeric columns are an error
pub fn float_column(df: &DataFrame, name: &str) -> Result<Float64Chunked> {
    let series = series(df, name)?;
    if !is_numeric(series.dtype()) {
        return Err(TabmlError::InvalidDataset(format!(
            "Column '{name}' is not numeric ({})",
            series.dtype()
        )));
    }
    Ok(series.cast(&DataType::Float64)?.f64()?.clone())
}

/// Any column cast to strings
pub fn string_column(df: &DataFrame, name: &str) -> Result<Series> {
    Ok(series(df, name)?.cast(&DataType::String)?)
}

/// Column values as floats, `None` for missing entries
pub fn numeric_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    Ok(float_column(df, name)?.into_iter().collect())
}

/// Column values rendered as strings, `None` for missing entries
pub fn string_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    Ok(string_column(df, name)?
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

/// Distinct non-missing values with their counts (shares when
/// `normalize`), most frequent first; ties keep ascending value order
pub fn ranked_counts(values: &Series, normalize: bool) -> Result<(Series, Series)> {
    let counts = values
        .drop_nulls()
        .with_name(VALUE_COLUMN.into())
        .value_counts(false, false, COUNT_COLUMN.into(), normalize)?
        .sort(
            [COUNT_COLUMN, VALUE_COLUMN],
            SortMultipleOptions::default().with_order_descending_multi([true, false]),
        )?;

    let distinct = counts.column(VALUE_COLUMN)?.as_materialized_series().clone();
    let counts = counts.column(COUNT_COLUMN)?.as_materialized_series().clone();
    Ok((distinct, counts))
}

/// Rows of a frame selected by position, in the given order
pub fn take_rows(df: &DataFrame, indices: &[usize]) -> Result<DataFrame> {
    let idx = IdxCa::from_vec(
        "idx".into(),
        indices.iter().map(|&i| i as IdxSize).collect(),
    );
    Ok(df.take(&idx)?)
}

/// Frame without the named columns; unknown names are an error
pub fn drop_columns(df: &DataFrame, names: &[String]) -> Result<DataFrame> {
    let mut out = df.clone();
    for name in names {
        out = out
            .drop(name)
            .map_err(|_| TabmlError::ColumnNotFound(name.clone()))?;
    }
    Ok(out)
}
