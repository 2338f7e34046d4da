//! tabml Command Line Interface
//!
//! Inspect a table, preview preprocessing, train and compare models, save
//! the artifacts and publish them to a git branch.

use clap::{Args, Parser, Subcommand, ValueEnum};
use env_logger::Env;
use log::{error, info};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process;
use tabml::api::Trainer;
use tabml::core::{ModelKind, ProblemType, Result, Transformer};
use tabml::data::columns::drop_columns;
use tabml::data::{load_data, target_distribution, DatasetSummary};
use tabml::persistence::{load_pipeline, run_timestamp, save_artifacts};
use tabml::preprocessing::{
    CategoricalImpute, Encoder, NumericImpute, PreprocessingConfig, Preprocessor, Scaler,
};
use tabml::publish::{publish_run, PublishOptions};

#[derive(Parser)]
#[command(name = "tabml")]
#[command(about = "Configure, train and publish tabular machine learning prototypes")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "tabml contributors")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Preview a table and its target distribution
    Inspect(InspectArgs),
    /// Apply a preprocessing configuration and preview the features
    Preprocess(PreprocessArgs),
    /// Train models and optionally save or publish the artifacts
    Train(TrainArgs),
    /// Display a saved pipeline
    Info(InfoArgs),
    /// Make predictions with a saved pipeline
    Predict(PredictArgs),
}

#[derive(Args)]
struct InspectArgs {
    /// CSV or Parquet file
    #[arg(long)]
    data: PathBuf,

    /// Target column to summarize
    #[arg(short, long)]
    target: Option<String>,
}

#[derive(Args, Clone, Debug, Default)]
struct PreprocessingArgs {
    /// JSON file holding a preprocessing configuration; flags override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Pass every feature column through without preprocessing
    #[arg(long, conflicts_with = "config")]
    raw: bool,

    /// Columns to drop (comma separated)
    #[arg(long, value_delimiter = ',')]
    drop: Vec<String>,

    /// Numeric feature columns (comma separated, inferred when empty)
    #[arg(long, value_delimiter = ',')]
    num_cols: Vec<String>,

    /// Categorical feature columns (comma separated, inferred when empty)
    #[arg(long, value_delimiter = ',')]
    cat_cols: Vec<String>,

    /// Missing value strategy for numeric columns
    #[arg(long)]
    num_impute: Option<CliNumericImpute>,

    /// Numeric scaling
    #[arg(long)]
    scaler: Option<CliScaler>,

    /// Missing value strategy for categorical columns
    #[arg(long)]
    cat_impute: Option<CliCategoricalImpute>,

    /// Categorical encoding
    #[arg(long)]
    encoder: Option<CliEncoder>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CliProblemType {
    #[value(name = "classification")]
    Classification,
    #[value(name = "regression")]
    Regression,
    #[value(name = "clustering")]
    Clustering,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CliNumericImpute {
    #[value(name = "mean")]
    Mean,
    #[value(name = "median")]
    Median,
    #[value(name = "most-frequent", alias = "most_frequent")]
    MostFrequent,
    /// Fill with 0
    #[value(name = "constant")]
    Constant,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CliScaler {
    /// Zero mean, unit variance
    #[value(name = "standard")]
    Standard,
    /// Rescale to [0, 1]
    #[value(name = "minmax")]
    MinMax,
    #[value(name = "none")]
    NoScaling,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CliCategoricalImpute {
    #[value(name = "most-frequent", alias = "most_frequent")]
    MostFrequent,
    /// Fill with "missing"
    #[value(name = "constant")]
    Constant,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CliEncoder {
    #[value(name = "onehot")]
    OneHot,
    #[value(name = "ordinal")]
    Ordinal,
}

impl From<CliProblemType> for ProblemType {
    fn from(cli_problem: CliProblemType) -> Self {
        match cli_problem {
            CliProblemType::Classification => ProblemType::Classification,
            CliProblemType::Regression => ProblemType::Regression,
            CliProblemType::Clustering => ProblemType::Clustering,
        }
    }
}

impl From<CliNumericImpute> for NumericImpute {
    fn from(cli_impute: CliNumericImpute) -> Self {
        match cli_impute {
            CliNumericImpute::Mean => NumericImpute::Mean,
            CliNumericImpute::Median => NumericImpute::Median,
            CliNumericImpute::MostFrequent => NumericImpute::MostFrequent,
            CliNumericImpute::Constant => NumericImpute::Constant,
        }
    }
}

impl From<CliScaler> for Scaler {
    fn from(cli_scaler: CliScaler) -> Self {
        match cli_scaler {
            CliScaler::Standard => Scaler::Standard,
            CliScaler::MinMax => Scaler::MinMax,
            CliScaler::NoScaling => Scaler::None,
        }
    }
}

impl From<CliCategoricalImpute> for CategoricalImpute {
    fn from(cli_impute: CliCategoricalImpute) -> Self {
        match cli_impute {
            CliCategoricalImpute::MostFrequent => CategoricalImpute::MostFrequent,
            CliCategoricalImpute::Constant => CategoricalImpute::Constant,
        }
    }
}

impl From<CliEncoder> for Encoder {
    fn from(cli_encoder: CliEncoder) -> Self {
        match cli_encoder {
            CliEncoder::OneHot => Encoder::OneHot,
            CliEncoder::Ordinal => Encoder::Ordinal,
        }
    }
}

impl PreprocessingArgs {
    /// Configuration from the file (or the pre-selected defaults) with the
    /// flags applied on top; `None` with `--raw`
    fn resolve(&self) -> Result<Option<PreprocessingConfig>> {
        if self.raw {
            return Ok(None);
        }

        let mut config = match &self.config {
            Some(path) => {
                info!("Reading preprocessing configuration from {path:?}");
                PreprocessingConfig::from_json_file(path)?
            }
            None => PreprocessingConfig::recommended(),
        };

        if !self.drop.is_empty() {
            config.drop = self.drop.clone();
        }
        if !self.num_cols.is_empty() {
            config.num_cols = self.num_cols.clone();
        }
        if !self.cat_cols.is_empty() {
            config.cat_cols = self.cat_cols.clone();
        }
        if let Some(impute) = self.num_impute {
            config.num_impute = Some(impute.into());
        }
        if let Some(scaler) = self.scaler {
            config.scaler = Some(scaler.into());
        }
        if let Some(impute) = self.cat_impute {
            config.cat_impute = Some(impute.into());
        }
        if let Some(encoder) = self.encoder {
            config.encoder = Some(encoder.into());
        }
        Ok(Some(config))
    }
}

#[derive(Args)]
struct PreprocessArgs {
    /// CSV or Parquet file
    #[arg(long)]
    data: PathBuf,

    /// Target column, left out of the features
    #[arg(short, long)]
    target: Option<String>,

    #[command(flatten)]
    preprocessing: PreprocessingArgs,
}

#[derive(Args)]
struct TrainArgs {
    /// CSV or Parquet file
    #[arg(long)]
    data: PathBuf,

    /// Problem type
    #[arg(short, long)]
    problem: CliProblemType,

    /// Target column (required for classification and regression)
    #[arg(short, long)]
    target: Option<String>,

    /// Model to train, e.g. "Random Forest Classifier" or kmeans
    /// (repeatable or comma separated)
    #[arg(short, long = "model", value_delimiter = ',')]
    models: Vec<String>,

    #[command(flatten)]
    preprocessing: PreprocessingArgs,

    /// Grid search hyperparameters before the final fit
    #[arg(long)]
    tune: bool,

    /// Skip the cross-validation summary
    #[arg(long)]
    no_cv: bool,

    /// Save pipelines and the run summary into this directory
    #[arg(long)]
    save: Option<PathBuf>,

    /// Commit the artifacts on a new branch and push it
    #[arg(long)]
    push: bool,

    /// Repository to publish into
    #[arg(long, default_value = ".")]
    repo: PathBuf,

    /// Remote to push to
    #[arg(long, default_value = "origin")]
    remote: String,

    /// Base branch for the comparison URL
    #[arg(long, default_value = "main")]
    base: String,

    /// Commit message
    #[arg(long, default_value = "Auto-generated ML prototype run")]
    message: String,
}

#[derive(Args)]
struct InfoArgs {
    /// Saved pipeline file
    model: PathBuf,
}

#[derive(Args)]
struct PredictArgs {
    /// Saved pipeline file
    #[arg(short, long)]
    model: PathBuf,

    /// CSV or Parquet file with the feature columns
    #[arg(long)]
    data: PathBuf,

    /// Output predictions file (optional, prints to stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    let result = match cli.command {
        Commands::Inspect(args) => inspect_command(args),
        Commands::Preprocess(args) => preprocess_command(args),
        Commands::Train(args) => train_command(args),
        Commands::Info(args) => info_command(args),
        Commands::Predict(args) => predict_command(args),
    };

    if let Err(e) = result {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn inspect_command(args: InspectArgs) -> Result<()> {
    let df = load_data(&args.data)?;

    println!("=== Dataset ===");
    print!("{}", DatasetSummary::from_frame(&df));

    if let Some(target) = &args.target {
        println!("\nTarget distribution ({target}):");
        println!("{}", target_distribution(&df, target)?);
    }

    Ok(())
}

fn preprocess_command(args: PreprocessArgs) -> Result<()> {
    let df = load_data(&args.data)?;
    let target = args.target.as_deref();

    let preprocessor = match args.preprocessing.resolve()? {
        Some(config) => {
            let config = config.with_inferred_columns(&df, target);
            config.validate(target)?;
            Preprocessor::new(config)
        }
        None => Preprocessor::passthrough(),
    };

    let mut excluded = preprocessor.config().drop.clone();
    if let Some(target) = target {
        if !excluded.iter().any(|name| name == target) {
            excluded.push(target.to_string());
        }
    }
    let features = drop_columns(&df, &excluded)?;

    let (fitted, matrix) = preprocessor.fit_transform(&features)?;
    let (rows, cols) = matrix.shape();

    println!("=== Preprocessed Features ===");
    println!("Shape: ({rows}, {cols})");
    println!("Features: {}", fitted.feature_names_out().join(", "));
    println!("{}", matrix.to_dataframe()?.head(Some(5)));

    Ok(())
}

fn train_command(args: TrainArgs) -> Result<()> {
    let problem: ProblemType = args.problem.into();
    let models = args
        .models
        .iter()
        .map(|name| name.parse::<ModelKind>())
        .collect::<Result<Vec<_>>>()?;

    let df = load_data(&args.data)?;
    info!("Training {problem} models on {:?}", args.data);

    let mut trainer = Trainer::new(problem)
        .with_models(&models)
        .with_cross_validation(!args.no_cv)
        .with_tuning(args.tune);
    if let Some(config) = args.preprocessing.resolve()? {
        trainer = trainer.with_preprocessing(config);
    }

    let results = trainer.train(&df, args.target.as_deref())?;
    println!("{results}");

    if let Some(dir) = &args.save {
        let saved = save_artifacts(&results, dir.join(run_timestamp()))?;
        println!("Artifacts saved to: {}", saved.display());
    }

    if args.push {
        let options = PublishOptions::default()
            .with_repo_path(&args.repo)
            .with_remote(&args.remote)
            .with_base_branch(&args.base)
            .with_commit_message(&args.message);

        match publish_run(&results, &options) {
            Ok(outcome) => {
                println!("Pushed branch: {}", outcome.branch);
                println!("PR Link: {}", outcome.compare_url);
            }
            Err(e) => {
                println!("Failed to push. Check logs.");
                return Err(e);
            }
        }
    }

    Ok(())
}

fn info_command(args: InfoArgs) -> Result<()> {
    info!("Loading pipeline from: {:?}", args.model);
    let pipeline = load_pipeline(&args.model)?;
    pipeline.print_summary();
    Ok(())
}

fn predict_command(args: PredictArgs) -> Result<()> {
    info!("Loading pipeline from: {:?}", args.model);
    let pipeline = load_pipeline(&args.model)?;

    info!("Loading prediction data from: {:?}", args.data);
    let df = load_data(&args.data)?;
    let predictions = pipeline.predict_labels(&df)?;

    match &args.output {
        Some(path) => {
            let mut writer = BufWriter::new(File::create(path)?);
            write_predictions(&mut writer, &predictions)?;
            writer.flush()?;
            info!("Predictions saved to: {path:?}");
        }
        None => {
            let stdout = io::stdout();
            let mut writer = stdout.lock();
            write_predictions(&mut writer, &predictions)?;
        }
    }

    Ok(())
}

fn write_predictions<W: Write>(writer: &mut W, predictions: &[String]) -> Result<()> {
    writeln!(writer, "index,prediction")?;
    for (i, prediction) in predictions.iter().enumerate() {
        writeln!(writer, "{i},{prediction}")?;
    }
    Ok(())
}
