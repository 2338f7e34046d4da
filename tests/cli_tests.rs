//! Integration tests for the CLI application
//!
//! These tests verify that the CLI commands work correctly with real data files.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::{NamedTempFile, TempDir};

/// Helper to create test data files
struct TestDataFiles {
    pub churn_csv: NamedTempFile,
    pub features_csv: NamedTempFile,
    pub points_csv: NamedTempFile,
}

impl TestDataFiles {
    fn new() -> std::io::Result<Self> {
        // Two separable classes
        let mut churn_csv = NamedTempFile::with_suffix(".csv")?;
        writeln!(churn_csv, "tenure,plan,churned")?;
        for i in 0..40 {
            let (tenure, label) = if i % 2 == 0 {
                (1.0 + (i % 5) as f64, "yes")
            } else {
                (30.0 + (i % 7) as f64, "no")
            };
            let plan = ["basic", "plus", "pro"][i % 3];
            writeln!(churn_csv, "{tenure},{plan},{label}")?;
        }
        churn_csv.flush()?;

        // Rows to predict, without the target
        let mut features_csv = NamedTempFile::with_suffix(".csv")?;
        writeln!(features_csv, "tenure,plan")?;
        writeln!(features_csv, "2.0,basic")?;
        writeln!(features_csv, "33.0,pro")?;
        writeln!(features_csv, "1.0,plus")?;
        features_csv.flush()?;

        // Two blobs for clustering
        let mut points_csv = NamedTempFile::with_suffix(".csv")?;
        writeln!(points_csv, "x,y")?;
        for k in 0..5 {
            writeln!(points_csv, "{},{}", 0.1 * k as f64, 0.2 * k as f64)?;
            writeln!(points_csv, "{},{}", 20.0 + 0.1 * k as f64, 20.0 - 0.2 * k as f64)?;
        }
        points_csv.flush()?;

        Ok(TestDataFiles {
            churn_csv,
            features_csv,
            points_csv,
        })
    }
}

fn run_cli(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_tabml"))
        .args(args)
        .output()
        .expect("Failed to run CLI")
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("temp paths are valid UTF-8")
}

/// The single run directory created under `save_dir`
fn saved_run_dir(save_dir: &Path) -> PathBuf {
    let mut runs: Vec<PathBuf> = fs::read_dir(save_dir)
        .expect("save directory exists")
        .map(|entry| entry.unwrap().path())
        .collect();
    assert_eq!(runs.len(), 1, "Expected one run directory");
    runs.remove(0)
}

#[test]
fn test_cli_inspect_command() {
    let test_data = TestDataFiles::new().expect("Failed to create test data");

    let output = run_cli(&[
        "inspect",
        "--data",
        path_str(test_data.churn_csv.path()),
        "--target",
        "churned",
    ]);

    assert!(
        output.status.success(),
        "Inspect command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Shape: (40, 3)"));
    assert!(stdout.contains("Target distribution (churned)"));
    assert!(stdout.contains("yes"));
}

#[test]
fn test_cli_preprocess_command() {
    let test_data = TestDataFiles::new().expect("Failed to create test data");

    let output = run_cli(&[
        "preprocess",
        "--data",
        path_str(test_data.churn_csv.path()),
        "--target",
        "churned",
        "--scaler",
        "minmax",
    ]);

    assert!(
        output.status.success(),
        "Preprocess command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    // tenure plus three one-hot plan columns
    assert!(stdout.contains("Shape: (40, 4)"));
    assert!(!stdout.contains("churned"));
}

#[test]
fn test_cli_preprocess_target_also_dropped() {
    let test_data = TestDataFiles::new().expect("Failed to create test data");

    let output = run_cli(&[
        "preprocess",
        "--data",
        path_str(test_data.churn_csv.path()),
        "--drop",
        "churned",
        "--target",
        "churned",
    ]);

    assert!(
        output.status.success(),
        "Preprocess command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Shape: (40, 4)"));
}

#[test]
fn test_cli_train_and_save() {
    let test_data = TestDataFiles::new().expect("Failed to create test data");
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let save_dir = temp_dir.path().join("runs");

    let output = run_cli(&[
        "train",
        "--data",
        path_str(test_data.churn_csv.path()),
        "--problem",
        "classification",
        "--target",
        "churned",
        "--model",
        "Logistic Regression,random-forest-classifier",
        "--no-cv",
        "--save",
        path_str(&save_dir),
    ]);

    assert!(
        output.status.success(),
        "Train command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Logistic Regression"));
    assert!(stdout.contains("accuracy"));
    assert!(stdout.contains("Artifacts saved to:"));

    let run_dir = saved_run_dir(&save_dir);
    assert!(run_dir.join("run_summary.txt").exists());
    assert!(run_dir.join("logistic_regression.json").exists());
    assert!(run_dir.join("random_forest_classifier.json").exists());
}

#[test]
fn test_cli_train_without_models_fails() {
    let test_data = TestDataFiles::new().expect("Failed to create test data");

    let output = run_cli(&[
        "train",
        "--data",
        path_str(test_data.churn_csv.path()),
        "--problem",
        "classification",
        "--target",
        "churned",
    ]);

    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Select at least one model"));
}

#[test]
fn test_cli_train_rejects_model_for_other_problem() {
    let test_data = TestDataFiles::new().expect("Failed to create test data");

    let output = run_cli(&[
        "train",
        "--data",
        path_str(test_data.churn_csv.path()),
        "--problem",
        "regression",
        "--target",
        "tenure",
        "--model",
        "Random Forest Classifier",
    ]);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("not available for"));
}

#[test]
fn test_cli_train_clustering() {
    let test_data = TestDataFiles::new().expect("Failed to create test data");

    let output = run_cli(&[
        "train",
        "--data",
        path_str(test_data.points_csv.path()),
        "--problem",
        "clustering",
        "--model",
        "kmeans",
        "--tune",
    ]);

    assert!(
        output.status.success(),
        "Clustering command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(String::from_utf8_lossy(&output.stdout).contains("silhouette"));
}

#[test]
fn test_cli_info_and_predict_commands() {
    let test_data = TestDataFiles::new().expect("Failed to create test data");
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let save_dir = temp_dir.path().join("runs");

    let train_output = run_cli(&[
        "train",
        "--data",
        path_str(test_data.churn_csv.path()),
        "--problem",
        "classification",
        "--target",
        "churned",
        "--model",
        "Random Forest Classifier",
        "--no-cv",
        "--save",
        path_str(&save_dir),
    ]);
    assert!(train_output.status.success());

    let model_path = saved_run_dir(&save_dir).join("random_forest_classifier.json");

    let info_output = run_cli(&["info", path_str(&model_path)]);
    assert!(
        info_output.status.success(),
        "Info command failed: {}",
        String::from_utf8_lossy(&info_output.stderr)
    );
    let info = String::from_utf8_lossy(&info_output.stdout);
    assert!(info.contains("=== Pipeline Summary ==="));
    assert!(info.contains("Random Forest Classifier"));

    let predictions_path = temp_dir.path().join("predictions.csv");
    let predict_output = run_cli(&[
        "predict",
        "--model",
        path_str(&model_path),
        "--data",
        path_str(test_data.features_csv.path()),
        "--output",
        path_str(&predictions_path),
    ]);
    assert!(
        predict_output.status.success(),
        "Predict command failed: {}",
        String::from_utf8_lossy(&predict_output.stderr)
    );

    let content = fs::read_to_string(&predictions_path).expect("Failed to read predictions");
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines[0], "index,prediction");
    assert_eq!(lines.len(), 4);
    for (i, line) in lines[1..].iter().enumerate() {
        let (index, label) = line.split_once(',').expect("two fields");
        assert_eq!(index, i.to_string());
        assert!(label == "yes" || label == "no");
    }
}

#[test]
fn test_cli_train_push_failure() {
    let test_data = TestDataFiles::new().expect("Failed to create test data");
    let repo_dir = TempDir::new().expect("Failed to create temp dir");

    let mut options = git2::RepositoryInitOptions::new();
    options.initial_head("main");
    let repo = git2::Repository::init_opts(repo_dir.path(), &options).unwrap();
    {
        let tree = repo
            .find_tree(repo.index().unwrap().write_tree().unwrap())
            .unwrap();
        let signature = git2::Signature::now("Test", "test@example.com").unwrap();
        repo.commit(Some("HEAD"), &signature, &signature, "Initial commit", &tree, &[])
            .unwrap();
    }
    repo.remote("origin", "/nonexistent/remote/path.git").unwrap();

    let output = run_cli(&[
        "train",
        "--data",
        path_str(test_data.churn_csv.path()),
        "--problem",
        "classification",
        "--target",
        "churned",
        "--model",
        "Logistic Regression",
        "--no-cv",
        "--push",
        "--repo",
        path_str(repo_dir.path()),
    ]);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stdout).contains("Failed to push. Check logs."));
    assert_eq!(repo.head().unwrap().name(), Some("refs/heads/main"));
}

#[test]
fn test_cli_missing_data_file() {
    let output = run_cli(&["inspect", "--data", "/nonexistent/table.csv"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_cli_help() {
    let output = run_cli(&["--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("train"));
    assert!(stdout.contains("predict"));
}
