//! Publishing a run into a git repository with a local bare remote

use git2::{Repository, RepositoryInitOptions, Signature};
use polars::prelude::*;
use std::fs;
use std::path::Path;
use tabml::api::{RunResults, Trainer};
use tabml::core::{ModelKind, ProblemType, TabmlError};
use tabml::preprocessing::PreprocessingConfig;
use tabml::publish::{publish_run_at, PublishOptions};
use tempfile::TempDir;

const TIMESTAMP: &str = "20240102030405";

fn run_results() -> RunResults {
    let x: Vec<f64> = (0..20).map(|i| i as f64).collect();
    let y: Vec<f64> = x.iter().map(|v| 3.0 * v + 1.0).collect();
    let df = df! { "x" => x, "y" => y }.unwrap();
    Trainer::new(ProblemType::Regression)
        .with_model(ModelKind::LinearRegression)
        .with_preprocessing(PreprocessingConfig::recommended())
        .with_cross_validation(false)
        .train(&df, Some("y"))
        .unwrap()
}

/// Work repository on `main` with one commit
fn init_work_repo(path: &Path) -> Repository {
    let mut options = RepositoryInitOptions::new();
    options.initial_head("main");
    let repo = Repository::init_opts(path, &options).unwrap();

    fs::write(path.join("README.md"), "prototypes\n").unwrap();
    {
        let mut index = repo.index().unwrap();
        index.add_path(Path::new("README.md")).unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let signature = Signature::now("Test", "test@example.com").unwrap();
        repo.commit(Some("HEAD"), &signature, &signature, "Initial commit", &tree, &[])
            .unwrap();
    }
    repo
}

#[test]
fn test_publish_pushes_branch_with_artifacts() {
    let work_dir = TempDir::new().expect("Failed to create temp dir");
    let remote_dir = TempDir::new().expect("Failed to create temp dir");

    let repo = init_work_repo(work_dir.path());
    let remote_repo = Repository::init_bare(remote_dir.path()).unwrap();
    let remote_url = remote_dir.path().to_str().unwrap();
    repo.remote("origin", remote_url).unwrap();
    let before = repo.head().unwrap().peel_to_commit().unwrap().id();

    let options = PublishOptions::default().with_repo_path(work_dir.path());
    let outcome = publish_run_at(&run_results(), &options, TIMESTAMP).unwrap();

    assert_eq!(outcome.branch, format!("prototype/ml-{TIMESTAMP}"));
    assert_eq!(
        outcome.compare_url,
        format!("{remote_url}/compare/main...prototype/ml-{TIMESTAMP}?expand=1")
    );

    // The remote received the branch and its commit holds the artifacts
    let pushed = remote_repo
        .find_reference(&format!("refs/heads/prototype/ml-{TIMESTAMP}"))
        .unwrap();
    let commit = pushed.peel_to_commit().unwrap();
    assert_eq!(commit.id().to_string(), outcome.commit);
    assert_eq!(commit.message(), Some("Auto-generated ML prototype run"));
    assert_eq!(commit.parent_id(0).unwrap(), before);

    let tree = commit.tree().unwrap();
    let artifacts = Path::new("artifacts").join(TIMESTAMP);
    assert!(tree.get_path(&artifacts.join("run_summary.txt")).is_ok());
    assert!(tree
        .get_path(&artifacts.join("linear_regression.json"))
        .is_ok());

    assert_eq!(outcome.artifact_dir, artifacts);
    assert!(!work_dir.path().join(&artifacts).join("run_summary.txt").exists());

    // HEAD is back on main, unchanged
    let head = repo.head().unwrap();
    assert_eq!(head.name(), Some("refs/heads/main"));
    assert_eq!(head.peel_to_commit().unwrap().id(), before);
}

#[test]
fn test_publish_with_custom_message() {
    let work_dir = TempDir::new().expect("Failed to create temp dir");
    let remote_dir = TempDir::new().expect("Failed to create temp dir");

    let repo = init_work_repo(work_dir.path());
    let remote_repo = Repository::init_bare(remote_dir.path()).unwrap();
    repo.remote("upstream", remote_dir.path().to_str().unwrap())
        .unwrap();

    let options = PublishOptions::default()
        .with_repo_path(work_dir.path())
        .with_remote("upstream")
        .with_base_branch("develop")
        .with_commit_message("Churn baseline");
    let outcome = publish_run_at(&run_results(), &options, TIMESTAMP).unwrap();

    assert!(outcome.compare_url.contains("/compare/develop...prototype/ml-"));
    let commit = remote_repo
        .find_reference(&format!("refs/heads/{}", outcome.branch))
        .unwrap()
        .peel_to_commit()
        .unwrap();
    assert_eq!(commit.message(), Some("Churn baseline"));
}

#[test]
fn test_publish_without_remote_fails() {
    let work_dir = TempDir::new().expect("Failed to create temp dir");
    let repo = init_work_repo(work_dir.path());
    let before = repo.head().unwrap().peel_to_commit().unwrap().id();

    let options = PublishOptions::default().with_repo_path(work_dir.path());
    let err = publish_run_at(&run_results(), &options, TIMESTAMP).unwrap_err();

    assert!(matches!(err, TabmlError::MissingRemote(ref name) if name == "origin"));
    let head = repo.head().unwrap();
    assert_eq!(head.name(), Some("refs/heads/main"));
    assert_eq!(head.peel_to_commit().unwrap().id(), before);
    assert!(repo
        .find_branch(&format!("prototype/ml-{TIMESTAMP}"), git2::BranchType::Local)
        .is_err());
}

#[test]
fn test_publish_push_failure_removes_branch() {
    let work_dir = TempDir::new().expect("Failed to create temp dir");
    let repo = init_work_repo(work_dir.path());
    repo.remote("origin", "/nonexistent/remote/path.git").unwrap();
    let before = repo.head().unwrap().peel_to_commit().unwrap().id();

    let options = PublishOptions::default().with_repo_path(work_dir.path());
    assert!(publish_run_at(&run_results(), &options, TIMESTAMP).is_err());

    let head = repo.head().unwrap();
    assert_eq!(head.name(), Some("refs/heads/main"));
    assert_eq!(head.peel_to_commit().unwrap().id(), before);
    assert!(repo
        .find_branch(&format!("prototype/ml-{TIMESTAMP}"), git2::BranchType::Local)
        .is_err());
}
