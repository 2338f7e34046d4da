//! Dataset compatibility and format validation tests
//!
//! Tests for ensuring CSV and Parquet inputs behave the same across the
//! pipeline

use std::fs;
use std::io::Write;
use tabml::api::Trainer;
use tabml::core::{ModelKind, ProblemType};
use tabml::data::{
    load_data, load_from_bytes, target_distribution, write_parquet, DataFormat, DatasetSummary,
    TargetDistribution,
};
use tabml::preprocessing::PreprocessingConfig;
use tempfile::{NamedTempFile, TempDir};

const CSV_CONTENT: &str = "\
sepal_length,sepal_width,petal_length,colour,species
5.1,3.5,1.4,red,setosa
4.9,3.0,1.4,red,setosa
4.7,3.2,1.3,blue,setosa
4.6,3.1,1.5,red,setosa
5.0,3.6,1.4,blue,setosa
7.0,3.2,4.7,green,versicolor
6.4,3.2,4.5,green,versicolor
6.9,3.1,4.9,blue,versicolor
5.5,2.3,4.0,green,versicolor
6.5,2.8,4.6,green,versicolor
6.3,3.3,6.0,red,virginica
5.8,2.7,5.1,blue,virginica
7.1,3.0,5.9,red,virginica
6.3,2.9,5.6,red,virginica
6.5,3.0,5.8,blue,virginica
";

fn write_csv_file(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("iris.csv");
    fs::write(&path, CSV_CONTENT).expect("Failed to write CSV");
    path
}

/// CSV and Parquet files with identical content load to identical tables
#[test]
fn test_csv_and_parquet_load_identically() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let csv_path = write_csv_file(&dir);
    let parquet_path = dir.path().join("iris.parquet");

    let mut from_csv = load_data(&csv_path).unwrap();
    write_parquet(&mut from_csv, &parquet_path).unwrap();
    let from_parquet = load_data(&parquet_path).unwrap();

    assert_eq!(from_csv.shape(), (15, 5));
    assert_eq!(from_csv.schema(), from_parquet.schema());
    assert!(from_csv.equals_missing(&from_parquet));
}

#[test]
fn test_missing_values_survive_round_trip() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let csv_path = dir.path().join("gaps.csv");
    fs::write(&csv_path, "a,b\n1.0,x\n,y\n3.0,\n").expect("Failed to write CSV");

    let mut from_csv = load_data(&csv_path).unwrap();
    let parquet_path = dir.path().join("gaps.pq");
    write_parquet(&mut from_csv, &parquet_path).unwrap();
    let from_parquet = load_data(&parquet_path).unwrap();

    assert_eq!(from_csv.column("a").unwrap().null_count(), 1);
    assert_eq!(from_csv.column("b").unwrap().null_count(), 1);
    assert!(from_csv.equals_missing(&from_parquet));
}

#[test]
fn test_uploaded_bytes_match_file() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let csv_path = write_csv_file(&dir);

    let from_file = load_data(&csv_path).unwrap();
    let from_bytes = load_from_bytes(CSV_CONTENT.as_bytes().to_vec(), DataFormat::Csv).unwrap();
    assert!(from_file.equals_missing(&from_bytes));

    let parquet_path = dir.path().join("iris.parquet");
    let mut df = from_file.clone();
    write_parquet(&mut df, &parquet_path).unwrap();
    let bytes = fs::read(&parquet_path).unwrap();
    let from_parquet_bytes = load_from_bytes(bytes, DataFormat::Parquet).unwrap();
    assert!(from_file.equals_missing(&from_parquet_bytes));
}

#[test]
fn test_unknown_extension_reads_as_csv() {
    let mut temp_file = NamedTempFile::with_suffix(".txt").expect("Failed to create temp file");
    write!(temp_file, "{CSV_CONTENT}").expect("Failed to write");
    temp_file.flush().expect("Failed to flush");

    let df = load_data(temp_file.path()).unwrap();
    assert_eq!(df.shape(), (15, 5));
}

#[test]
fn test_summary_and_target_distribution() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let df = load_data(write_csv_file(&dir)).unwrap();

    let summary = DatasetSummary::from_frame(&df);
    assert_eq!(summary.n_rows, 15);
    assert_eq!(summary.n_cols, 5);
    assert_eq!(summary.columns[0].0, "sepal_length");

    match target_distribution(&df, "species").unwrap() {
        TargetDistribution::Discrete(shares) => {
            assert_eq!(shares.len(), 3);
            let total: f64 = shares.iter().map(|(_, share)| share).sum();
            assert!((total - 1.0).abs() < 1e-12);
        }
        TargetDistribution::Continuous => panic!("species should be discrete"),
    }
}

/// Both formats give the same model metrics
#[test]
fn test_training_is_format_independent() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let csv_path = write_csv_file(&dir);
    let parquet_path = dir.path().join("iris.parquet");
    let mut df = load_data(&csv_path).unwrap();
    write_parquet(&mut df, &parquet_path).unwrap();

    let train = |path: &std::path::Path| {
        Trainer::new(ProblemType::Classification)
            .with_model(ModelKind::LogisticRegression)
            .with_preprocessing(PreprocessingConfig::recommended())
            .with_cross_validation(false)
            .train(&load_data(path).unwrap(), Some("species"))
            .unwrap()
    };

    let csv_results = train(&csv_path);
    let parquet_results = train(&parquet_path);
    assert_eq!(
        csv_results.get("Logistic Regression").unwrap().metrics,
        parquet_results.get("Logistic Regression").unwrap().metrics
    );
}
