//! Run artifacts: serialized pipelines and the run summary
//!
//! An artifact directory holds one `<safe_name>.json` pipeline per model
//! plus a plain-text `run_summary.txt`.

use crate::api::RunResults;
use crate::core::{Predictor, Result, Transformer};
use crate::training::FittedPipeline;
use chrono::Local;
use log::info;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// File name of the run summary inside an artifact directory
pub const SUMMARY_FILE: &str = "run_summary.txt";

/// Local timestamp used for artifact directories and branch names
pub fn run_timestamp() -> String {
    Local::now().format("%Y%m%d%H%M%S").to_string()
}

/// Render the run summary with the given date line
pub fn render_run_summary(results: &RunResults, date: &str) -> String {
    let mut summary = String::new();
    summary.push_str("ML Automation Run Summary\n");
    summary.push_str("=========================\n\n");
    summary.push_str(&format!("Date: {date}\n\n"));

    for result in results.iter() {
        summary.push_str(&format!("Model: {}\n", result.model_name));
        summary.push_str(&format!("Best Params: {}\n", result.best_params_display()));
        summary.push_str(&format!("Metrics: {}\n", result.metrics));
        summary.push_str(&format!("{}\n", "-".repeat(20)));
    }
    summary
}

/// Write the run summary to `path`, dated now
pub fn generate_run_summary<P: AsRef<Path>>(results: &RunResults, path: P) -> Result<()> {
    let summary = render_run_summary(results, &Local::now().to_rfc3339());
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(summary.as_bytes())?;
    writer.flush()?;
    Ok(())
}

/// Create `dir` and write the run summary and every pipeline into it
pub fn save_artifacts<P: AsRef<Path>>(results: &RunResults, dir: P) -> Result<PathBuf> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    generate_run_summary(results, dir.join(SUMMARY_FILE))?;
    for result in results.iter() {
        let path = dir.join(format!("{}.json", result.kind.safe_name()));
        result.pipeline.save_to_file(&path)?;
    }

    info!(
        "Saved {} model(s) and summary to {}",
        results.len(),
        dir.display()
    );
    Ok(dir.to_path_buf())
}

/// Read a pipeline saved by [`save_artifacts`]
pub fn load_pipeline<P: AsRef<Path>>(path: P) -> Result<FittedPipeline> {
    FittedPipeline::load_from_file(path)
}

impl FittedPipeline {
    /// Save the pipeline as pretty-printed JSON
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Load a pipeline from JSON
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let pipeline = serde_json::from_reader(reader)?;
        Ok(pipeline)
    }

    /// Print pipeline summary
    pub fn print_summary(&self) {
        println!("=== Pipeline Summary ===");
        println!("Model: {}", self.estimator.estimator_name());
        println!("Problem Type: {}", self.kind.problem_type());
        println!("Parameters: {}", self.params);
        println!("Library Version: {}", self.library_version);
        println!("Created: {}", self.created_at.to_rfc3339());
        println!("Features ({}):", self.preprocessor.n_features_out());
        for name in self.preprocessor.feature_names_out() {
            println!("  {name}");
        }
        if let Some(classes) = &self.classes {
            println!("Classes: {}", classes.join(", "));
        }
        if let Some(labels) = self.cluster_labels() {
            println!("Training Rows Clustered: {}", labels.len());
        }
    }
}
