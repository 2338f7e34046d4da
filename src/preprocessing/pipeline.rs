//! Column transformer: numeric and categorical branches plus passthrough
//!
//! Fitting learns fill values, scaling statistics and category lists from
//! the training rows only; transforming applies that state to any frame
//! with the same columns. Output columns are ordered numeric features,
//! then encoded categorical features, then passthrough columns.

use crate::core::{FeatureMatrix, Result, TabmlError, Transformer};
use crate::data::columns::{
    float_column, is_numeric, numeric_values, string_column, string_values,
};
use crate::preprocessing::config::{
    CategoricalImpute, Encoder, NumericImpute, PreprocessingConfig, Scaler,
};
use crate::preprocessing::scaler::{
    most_frequent_label, numeric_fill_value, FittedScaler, ScalingMethod,
};
use log::{debug, warn};
use polars::prelude::{ChunkFillNullValue, DataFrame};
use serde::{Deserialize, Serialize};

/// Fill value used by the constant categorical strategy
pub const MISSING_CATEGORY: &str = "missing";

/// Category assigned to missing values when no imputer is configured
pub const NULL_CATEGORY: &str = "null";

/// Learned state for one numeric column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericColumn {
    pub name: String,
    pub fill: Option<f64>,
    pub scaler: Option<FittedScaler>,
}

/// Learned state for one categorical column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalColumn {
    pub name: String,
    pub fill: Option<String>,
    /// Sorted categories seen at fit time
    pub categories: Vec<String>,
    pub encoder: Encoder,
}

impl CategoricalColumn {
    fn output_names(&self) -> Vec<String> {
        match self.encoder {
            Encoder::OneHot => self
                .categories
                .iter()
                .map(|c| format!("{}_{}", self.name, c))
                .collect(),
            Encoder::Ordinal => vec![self.name.clone()],
        }
    }
}

/// Unfitted preprocessing pipeline
#[derive(Debug, Clone, Default)]
pub struct Preprocessor {
    config: PreprocessingConfig,
}

impl Preprocessor {
    pub fn new(config: PreprocessingConfig) -> Self {
        Self { config }
    }

    /// No transformers: every feature column is passed through
    pub fn passthrough() -> Self {
        Self::default()
    }

    pub fn config(&self) -> &PreprocessingConfig {
        &self.config
    }

    /// Learn the column state from a feature frame (target and dropped
    /// columns already removed)
    pub fn fit(&self, df: &DataFrame) -> Result<FittedPreprocessor> {
        let config = &self.config;

        let numeric = config
            .num_cols
            .iter()
            .map(|name| fit_numeric(df, name, config.num_impute, config.scaler))
            .collect::<Result<Vec<_>>>()?;

        let categorical = config
            .cat_cols
            .iter()
            .map(|name| fit_categorical(df, name, config.cat_impute, config.encoder))
            .collect::<Result<Vec<_>>>()?;

        let mut passthrough = Vec::new();
        for column in df.get_columns() {
            let name = column.name().as_str();
            if config.num_cols.iter().any(|c| c == name) || config.cat_cols.iter().any(|c| c == name)
            {
                continue;
            }
            if !is_numeric(column.dtype()) {
                return Err(TabmlError::InvalidDataset(format!(
                    "Column '{name}' ({}) is not numeric; list it as categorical or drop it",
                    column.dtype()
                )));
            }
            passthrough.push(name.to_string());
        }

        let fitted = FittedPreprocessor {
            numeric,
            categorical,
            passthrough,
        };
        debug!(
            "Fitted preprocessor on {} rows: {} output features",
            df.height(),
            fitted.n_features_out()
        );
        Ok(fitted)
    }

    pub fn fit_transform(&self, df: &DataFrame) -> Result<(FittedPreprocessor, FeatureMatrix)> {
        let fitted = self.fit(df)?;
        let features = fitted.transform(df)?;
        Ok((fitted, features))
    }
}

fn fit_numeric(
    df: &DataFrame,
    name: &str,
    impute: Option<NumericImpute>,
    scaler: Option<Scaler>,
) -> Result<NumericColumn> {
    let values = float_column(df, name)?;

    let fill = match impute {
        Some(strategy) => Some(numeric_fill_value(&values, strategy)?.unwrap_or_else(|| {
            warn!("Column '{name}' has no values to impute from, filling with 0");
            0.0
        })),
        None => None,
    };

    // Scaling statistics are computed after imputation
    let imputed = match fill {
        Some(fill) => values.fill_null_with_values(fill)?,
        None => values,
    };

    let method = match scaler {
        Some(Scaler::Standard) => Some(ScalingMethod::Standard),
        Some(Scaler::MinMax) => Some(ScalingMethod::MinMax),
        Some(Scaler::None) | None => None,
    };
    let scaler = method.and_then(|m| FittedScaler::fit(&imputed, m));

    Ok(NumericColumn {
        name: name.to_string(),
        fill,
        scaler,
    })
}

fn fit_categorical(
    df: &DataFrame,
    name: &str,
    impute: Option<CategoricalImpute>,
    encoder: Option<Encoder>,
) -> Result<CategoricalColumn> {
    let encoder = encoder.ok_or_else(|| {
        TabmlError::InvalidParameter(format!(
            "Categorical column '{name}' requires an encoder"
        ))
    })?;

    let fill = match impute {
        Some(CategoricalImpute::Constant) => Some(MISSING_CATEGORY.to_string()),
        Some(CategoricalImpute::MostFrequent) => Some(
            most_frequent_label(&string_column(df, name)?)?
                .unwrap_or_else(|| MISSING_CATEGORY.to_string()),
        ),
        None => None,
    };

    let values = string_values(df, name)?;
    let mut categories: Vec<String> = values
        .into_iter()
        .map(|v| resolve_category(v, fill.as_deref()))
        .collect();
    categories.sort();
    categories.dedup();

    Ok(CategoricalColumn {
        name: name.to_string(),
        fill,
        categories,
        encoder,
    })
}

fn resolve_category(value: Option<String>, fill: Option<&str>) -> String {
    match (value, fill) {
        (Some(v), _) => v,
        (None, Some(fill)) => fill.to_string(),
        (None, None) => NULL_CATEGORY.to_string(),
    }
}

/// Preprocessing state learned from training rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedPreprocessor {
    pub numeric: Vec<NumericColumn>,
    pub categorical: Vec<CategoricalColumn>,
    pub passthrough: Vec<String>,
}

impl FittedPreprocessor {
    fn transform_numeric(&self, df: &DataFrame, column: &NumericColumn) -> Result<Vec<f64>> {
        numeric_values(df, &column.name)?
            .into_iter()
            .map(|v| {
                let v = v.or(column.fill).ok_or_else(|| {
                    TabmlError::InvalidDataset(format!(
                        "Column '{}' contains missing values; configure an imputation strategy",
                        column.name
                    ))
                })?;
                Ok(match &column.scaler {
                    Some(scaler) => scaler.scale_value(v),
                    None => v,
                })
            })
            .collect()
    }

    fn transform_categorical(
        &self,
        df: &DataFrame,
        column: &CategoricalColumn,
    ) -> Result<Vec<Vec<f64>>> {
        let labels: Vec<String> = string_values(df, &column.name)?
            .into_iter()
            .map(|v| resolve_category(v, column.fill.as_deref()))
            .collect();
        let position = |label: &str| column.categories.binary_search_by(|c| c.as_str().cmp(label)).ok();

        let encoded = match column.encoder {
            Encoder::OneHot => {
                let mut outputs = vec![vec![0.0; labels.len()]; column.categories.len()];
                for (row, label) in labels.iter().enumerate() {
                    // Unknown categories stay all-zero
                    if let Some(k) = position(label) {
                        outputs[k][row] = 1.0;
                    }
                }
                outputs
            }
            Encoder::Ordinal => vec![labels
                .iter()
                .map(|label| position(label).map_or(-1.0, |k| k as f64))
                .collect()],
        };
        Ok(encoded)
    }
}

impl Transformer for FittedPreprocessor {
    fn transform(&self, df: &DataFrame) -> Result<FeatureMatrix> {
        let mut columns = Vec::with_capacity(self.n_features_out());

        for column in &self.numeric {
            columns.push(self.transform_numeric(df, column)?);
        }
        for column in &self.categorical {
            columns.extend(self.transform_categorical(df, column)?);
        }
        for name in &self.passthrough {
            let values = numeric_values(df, name)?
                .into_iter()
                .collect::<Option<Vec<f64>>>()
                .ok_or_else(|| {
                    TabmlError::InvalidDataset(format!(
                        "Passthrough column '{name}' contains missing values"
                    ))
                })?;
            columns.push(values);
        }

        FeatureMatrix::new(self.feature_names_out(), columns, df.height())
    }

    fn n_features_out(&self) -> usize {
        let categorical: usize = self
            .categorical
            .iter()
            .map(|c| match c.encoder {
                Encoder::OneHot => c.categories.len(),
                Encoder::Ordinal => 1,
            })
            .sum();
        self.numeric.len() + categorical + self.passthrough.len()
    }

    fn feature_names_out(&self) -> Vec<String> {
        self.numeric
            .iter()
            .map(|c| c.name.clone())
            .chain(self.categorical.iter().flat_map(|c| c.output_names()))
            .chain(self.passthrough.iter().cloned())
            .collect()
    }
}
