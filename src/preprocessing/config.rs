//! Preprocessing configuration
//!
//! A flat set of named choices. Every field is optional; an empty
//! configuration passes all feature columns through unchanged.

use crate::core::{Result, TabmlError};
use crate::data::infer_column_roles;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::str::FromStr;

/// Missing value strategy for numeric columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericImpute {
    Mean,
    Median,
    MostFrequent,
    /// Fill with 0
    Constant,
}

/// Scaling applied to numeric columns after imputation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scaler {
    #[serde(alias = "standard", alias = "StandardScaler")]
    Standard,
    #[serde(alias = "minmax", alias = "MinMaxScaler")]
    MinMax,
    #[serde(alias = "none")]
    None,
}

/// Missing value strategy for categorical columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoricalImpute {
    MostFrequent,
    /// Fill with the literal "missing"
    Constant,
}

/// Encoding for categorical columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Encoder {
    #[serde(alias = "onehot", alias = "OneHotEncoder")]
    OneHot,
    #[serde(alias = "ordinal", alias = "OrdinalEncoder")]
    Ordinal,
}

fn normalize(s: &str) -> String {
    s.trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase()
}

fn unknown(kind: &str, value: &str) -> TabmlError {
    TabmlError::InvalidParameter(format!("Unknown {kind}: {value}"))
}

impl FromStr for NumericImpute {
    type Err = TabmlError;

    fn from_str(s: &str) -> Result<Self> {
        match normalize(s).as_str() {
            "mean" => Ok(NumericImpute::Mean),
            "median" => Ok(NumericImpute::Median),
            "mostfrequent" => Ok(NumericImpute::MostFrequent),
            "constant" => Ok(NumericImpute::Constant),
            _ => Err(unknown("numeric imputation strategy", s)),
        }
    }
}

impl FromStr for Scaler {
    type Err = TabmlError;

    fn from_str(s: &str) -> Result<Self> {
        match normalize(s).as_str() {
            "standard" | "standardscaler" => Ok(Scaler::Standard),
            "minmax" | "minmaxscaler" => Ok(Scaler::MinMax),
            "none" => Ok(Scaler::None),
            _ => Err(unknown("scaler", s)),
        }
    }
}

impl FromStr for CategoricalImpute {
    type Err = TabmlError;

    fn from_str(s: &str) -> Result<Self> {
        match normalize(s).as_str() {
            "mostfrequent" => Ok(CategoricalImpute::MostFrequent),
            "constant" => Ok(CategoricalImpute::Constant),
            _ => Err(unknown("categorical imputation strategy", s)),
        }
    }
}

impl FromStr for Encoder {
    type Err = TabmlError;

    fn from_str(s: &str) -> Result<Self> {
        match normalize(s).as_str() {
            "onehot" | "onehotencoder" => Ok(Encoder::OneHot),
            "ordinal" | "ordinalencoder" => Ok(Encoder::Ordinal),
            _ => Err(unknown("encoder", s)),
        }
    }
}

/// Named preprocessing choices for one run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessingConfig {
    /// Columns removed before training
    pub drop: Vec<String>,
    pub num_cols: Vec<String>,
    pub cat_cols: Vec<String>,
    pub num_impute: Option<NumericImpute>,
    pub scaler: Option<Scaler>,
    pub cat_impute: Option<CategoricalImpute>,
    pub encoder: Option<Encoder>,
}

impl PreprocessingConfig {
    /// The choices pre-selected in the interactive flow
    pub fn recommended() -> Self {
        Self {
            num_impute: Some(NumericImpute::Mean),
            scaler: Some(Scaler::Standard),
            cat_impute: Some(CategoricalImpute::MostFrequent),
            encoder: Some(Encoder::OneHot),
            ..Self::default()
        }
    }

    /// Read a configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let config = serde_json::from_reader(BufReader::new(file))?;
        Ok(config)
    }

    /// Fill empty column lists from the frame's dtypes, excluding the target
    /// and dropped columns
    pub fn with_inferred_columns(mut self, df: &DataFrame, target: Option<&str>) -> Self {
        if self.num_cols.is_empty() && self.cat_cols.is_empty() {
            let roles = infer_column_roles(df, target, &self.drop);
            self.num_cols = roles.numeric;
            self.cat_cols = roles.categorical;
        }
        self
    }

    /// Whether a numeric scaling step is configured
    pub fn scales(&self) -> bool {
        matches!(self.scaler, Some(Scaler::Standard) | Some(Scaler::MinMax))
    }

    /// Check column lists against each other and the target
    pub fn validate(&self, target: Option<&str>) -> Result<()> {
        if let Some(col) = self.num_cols.iter().find(|c| self.cat_cols.contains(c)) {
            return Err(TabmlError::InvalidParameter(format!(
                "Column '{col}' is listed as both numeric and categorical"
            )));
        }
        if let Some(target) = target {
            if self.num_cols.iter().chain(&self.cat_cols).any(|c| c == target) {
                return Err(TabmlError::InvalidParameter(format!(
                    "Target column '{target}' cannot be used as a feature"
                )));
            }
        }
        if let Some(col) = self
            .drop
            .iter()
            .find(|d| self.num_cols.contains(d) || self.cat_cols.contains(d))
        {
            return Err(TabmlError::InvalidParameter(format!(
                "Column '{col}' is both dropped and used as a feature"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_option_parsing() {
        assert_eq!("mean".parse::<NumericImpute>().unwrap(), NumericImpute::Mean);
        assert_eq!(
            "most_frequent".parse::<NumericImpute>().unwrap(),
            NumericImpute::MostFrequent
        );
        assert_eq!("StandardScaler".parse::<Scaler>().unwrap(), Scaler::Standard);
        assert_eq!("minmax".parse::<Scaler>().unwrap(), Scaler::MinMax);
        assert_eq!("None".parse::<Scaler>().unwrap(), Scaler::None);
        assert_eq!("OneHotEncoder".parse::<Encoder>().unwrap(), Encoder::OneHot);
        assert_eq!("ordinal".parse::<Encoder>().unwrap(), Encoder::Ordinal);
        assert!("robust".parse::<Scaler>().is_err());
    }

    #[test]
    fn test_json_config() {
        let mut temp_file = NamedTempFile::with_suffix(".json").expect("Failed to create temp file");
        write!(
            temp_file,
            r#"{{"drop": ["id"], "num_impute": "median", "scaler": "MinMaxScaler", "encoder": "OrdinalEncoder"}}"#
        )
        .expect("Failed to write");
        temp_file.flush().expect("Failed to flush");

        let config = PreprocessingConfig::from_json_file(temp_file.path()).unwrap();
        assert_eq!(config.drop, vec!["id"]);
        assert_eq!(config.num_impute, Some(NumericImpute::Median));
        assert_eq!(config.scaler, Some(Scaler::MinMax));
        assert_eq!(config.encoder, Some(Encoder::Ordinal));
        assert_eq!(config.cat_impute, None);
        assert!(config.num_cols.is_empty());
    }

    #[test]
    fn test_inferred_columns() {
        let df = df!(
            "a" => [1.0, 2.0],
            "cat" => ["x", "y"],
            "target" => [0i64, 1]
        )
        .unwrap();

        let config = PreprocessingConfig::recommended().with_inferred_columns(&df, Some("target"));
        assert_eq!(config.num_cols, vec!["a"]);
        assert_eq!(config.cat_cols, vec!["cat"]);
        assert!(config.scales());
    }

    #[test]
    fn test_validate() {
        let config = PreprocessingConfig {
            num_cols: vec!["a".to_string()],
            cat_cols: vec!["a".to_string()],
            ..Default::default()
        };
        assert!(config.validate(None).is_err());

        let config = PreprocessingConfig {
            num_cols: vec!["target".to_string()],
            ..Default::default()
        };
        assert!(config.validate(Some("target")).is_err());
        assert!(config.validate(None).is_ok());
    }
}
