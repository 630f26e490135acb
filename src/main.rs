use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};

use scamscan_brf::{
    BalancedForest, BalancedForestConfig, Class, ConfusionMatrix, Curve, DecisionTreeConfig, ErrorRates,
    LabeledPool, MaxFeatures, PartitionedValidation, ReferenceClass, SplitCriterion, TaggedSet,
    ThresholdChoice, TreeLearner, TreeLearnerFactory, TreeScoring, default_thresholds,
};
use scamscan_io::{ExperimentName, FeatureReader, ReportWriter};

#[derive(Parser)]
#[command(name = "scamscan")]
#[command(about = "Balanced bootstrap ensemble for scoring rental-ad scam risk")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for reproducibility
    #[arg(long, default_value_t = 42, global = true)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

/// Shared base-learner parameters.
#[derive(Args, Debug, Clone)]
struct TreeArgs {
    /// Maximum tree depth (unlimited if not set)
    #[arg(long)]
    max_depth: Option<usize>,

    /// Minimum samples required to split a node
    #[arg(long, default_value_t = 2)]
    min_samples_split: usize,

    /// Minimum samples required in each leaf
    #[arg(long, default_value_t = 1)]
    min_samples_leaf: usize,

    /// Features considered per split: "sqrt", "log2", "all", a count, or a fraction in (0, 1)
    #[arg(long, default_value = "sqrt")]
    max_features: String,

    /// Split criterion: "gini" or "entropy"
    #[arg(long, default_value = "gini")]
    criterion: String,

    /// Per-tree score: "vote" (0/1 class) or "probability" (leaf scam fraction)
    #[arg(long, default_value = "vote")]
    scoring: String,
}

/// Shared sampling and training parameters.
#[derive(Args, Debug, Clone)]
struct TrainingArgs {
    /// Path to the legit listings CSV
    #[arg(long)]
    legit: PathBuf,

    /// Path to the scam listings CSV
    #[arg(long)]
    scam: PathBuf,

    /// Number of learners in the ensemble
    #[arg(long, default_value_t = 1000)]
    n_estimators: usize,

    /// Fraction of the reference pool kept for training
    #[arg(long, default_value_t = 0.8)]
    train_fraction: f64,

    /// Pool that sizes the test split and each draw: "scam", "legit", or "smaller"
    #[arg(long, default_value = "scam")]
    reference: String,

    /// Classification threshold on the ensemble score
    #[arg(long, default_value_t = 0.5)]
    threshold: f64,

    #[command(flatten)]
    tree: TreeArgs,
}

#[derive(Subcommand)]
enum Command {
    /// Train an ensemble, evaluate it on the withheld test set, and save it
    ///
    /// With `--train-fraction 1.0` nothing is withheld, so the model is saved
    /// without an evaluation report.
    Train {
        #[command(flatten)]
        training: TrainingArgs,

        /// Experiment name for output files (must match [a-zA-Z0-9_-]+)
        #[arg(long)]
        experiment: String,

        /// Output directory for result files
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
    },

    /// Train and evaluate independent ensembles on disjoint partitions of the pools
    Validate {
        #[command(flatten)]
        training: TrainingArgs,

        /// Number of contiguous partitions
        #[arg(long, default_value_t = 4)]
        partitions: usize,

        /// Experiment name for output files (must match [a-zA-Z0-9_-]+)
        #[arg(long)]
        experiment: String,

        /// Output directory for result files
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
    },

    /// Score new listings with a saved ensemble
    Score {
        /// Path to the trained model binary
        #[arg(long)]
        model: PathBuf,

        /// Path to the listings CSV to score; its header must list the model's
        /// feature columns in training order
        #[arg(long)]
        features: PathBuf,

        /// Classification threshold on the ensemble score
        #[arg(long, default_value_t = 0.5)]
        threshold: f64,

        /// Experiment name for output files
        #[arg(long)]
        experiment: String,

        /// Output directory for result files
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct TrainOutput {
    experiment: String,
    n_legit: usize,
    n_scam: usize,
    n_estimators: usize,
    n_features: usize,
    test_rows: usize,
    threshold: f64,
    precision: Option<f64>,
    recall: Option<f64>,
    f1: Option<f64>,
    roc_area: Option<f64>,
    best_threshold: Option<f64>,
    model_path: PathBuf,
    evaluation_path: Option<PathBuf>,
}

#[derive(Serialize)]
struct ValidateOutput {
    experiment: String,
    n_partitions: usize,
    threshold: f64,
    partition_f1: Vec<Option<f64>>,
    mean_f1: Option<f64>,
}

#[derive(Serialize)]
struct ScoreOutput {
    experiment: String,
    n_rows: usize,
    n_flagged: usize,
    threshold: f64,
    model_n_estimators: usize,
    model_n_features: usize,
}

fn parse_max_features(s: &str) -> Result<MaxFeatures> {
    match s {
        "sqrt" => Ok(MaxFeatures::Sqrt),
        "log2" => Ok(MaxFeatures::Log2),
        "all" => Ok(MaxFeatures::All),
        other => {
            if let Ok(count) = other.parse::<usize>() {
                Ok(MaxFeatures::Fixed(count))
            } else if let Ok(fraction) = other.parse::<f64>() {
                Ok(MaxFeatures::Fraction(fraction))
            } else {
                anyhow::bail!("unknown max features: {other} (expected sqrt, log2, all, a count, or a fraction)")
            }
        }
    }
}

fn parse_criterion(s: &str) -> Result<SplitCriterion> {
    match s {
        "gini" => Ok(SplitCriterion::Gini),
        "entropy" => Ok(SplitCriterion::Entropy),
        other => anyhow::bail!("unknown split criterion: {other} (expected gini or entropy)"),
    }
}

fn parse_scoring(s: &str) -> Result<TreeScoring> {
    match s {
        "vote" => Ok(TreeScoring::Vote),
        "probability" => Ok(TreeScoring::Probability),
        other => anyhow::bail!("unknown tree scoring: {other} (expected vote or probability)"),
    }
}

fn parse_reference(s: &str) -> Result<ReferenceClass> {
    match s {
        "scam" => Ok(ReferenceClass::Scam),
        "legit" => Ok(ReferenceClass::Legit),
        "smaller" => Ok(ReferenceClass::Smaller),
        other => anyhow::bail!("unknown reference class: {other} (expected scam, legit, or smaller)"),
    }
}

fn build_factory(tree: &TreeArgs) -> Result<TreeLearnerFactory> {
    let config = DecisionTreeConfig::new()
        .with_max_depth(tree.max_depth)
        .with_min_samples_split(tree.min_samples_split)
        .with_min_samples_leaf(tree.min_samples_leaf)
        .with_max_features(parse_max_features(&tree.max_features)?)
        .with_criterion(parse_criterion(&tree.criterion)?);
    Ok(TreeLearnerFactory::new(config).with_scoring(parse_scoring(&tree.scoring)?))
}

fn build_config(training: &TrainingArgs, seed: u64) -> Result<BalancedForestConfig> {
    Ok(BalancedForestConfig::new(training.n_estimators)?
        .with_train_fraction(training.train_fraction)
        .with_reference_class(parse_reference(&training.reference)?)
        .with_seed(seed))
}

/// Listing pools read from a legit and a scam file with a shared header.
struct Pools {
    feature_names: Vec<String>,
    legit: LabeledPool,
    scam: LabeledPool,
}

/// Read both class files, check they share a header, and build the pools.
fn read_pools(legit: &Path, scam: &Path) -> Result<Pools> {
    let legit = FeatureReader::new(legit)
        .read()
        .context("failed to read legit listings CSV")?;
    let scam = FeatureReader::new(scam)
        .read()
        .context("failed to read scam listings CSV")?;
    legit.check_same_columns(&scam)?;
    info!(
        n_legit = legit.n_rows(),
        n_scam = scam.n_rows(),
        n_features = legit.n_features(),
        "pools loaded"
    );
    Ok(Pools {
        feature_names: legit.feature_names().to_vec(),
        legit: legit.into_pool(Class::Legit)?,
        scam: scam.into_pool(Class::Scam)?,
    })
}

/// Metrics for the withheld test set at one threshold plus the default sweep.
struct TestEvaluation {
    confusion: ConfusionMatrix,
    error_rates: ErrorRates,
    roc: Curve,
    pr: Curve,
    best: Option<ThresholdChoice>,
}

/// Evaluate the forest on its withheld test set.
///
/// Returns `None` when no rows were withheld, as with `--train-fraction 1.0`.
fn evaluate_test_set(
    forest: &BalancedForest<TreeLearner>,
    test: &TaggedSet,
    threshold: f64,
) -> Result<Option<TestEvaluation>> {
    if test.is_empty() {
        warn!("no rows withheld for testing, skipping test-set evaluation");
        return Ok(None);
    }
    let scored = forest
        .score_set(test.features(), test.labels())
        .context("failed to score test set")?;
    let thresholds = default_thresholds();
    let evaluation = TestEvaluation {
        confusion: scored.confusion_matrix(threshold),
        error_rates: scored.error_rates(threshold),
        roc: scored.roc_curve(&thresholds)?,
        pr: scored.pr_curve(&thresholds)?,
        best: scored.best_threshold(&thresholds),
    };
    info!(
        precision = evaluation.confusion.precision(),
        recall = evaluation.confusion.recall(),
        f1 = evaluation.confusion.f1(),
        "test set evaluated"
    );
    Ok(Some(evaluation))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Configure Rayon thread pool
    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Train {
            training,
            experiment,
            output_dir,
        } => {
            let experiment_name = ExperimentName::new(experiment.clone())?;

            // 1. Read pools
            let pools = read_pools(&training.legit, &training.scam)?;

            // 2. Train
            let factory = build_factory(&training.tree)?;
            let config = build_config(&training, cli.seed)?;
            let (forest, test, metadata) = config
                .fit(&factory, &pools.legit, &pools.scam)
                .context("ensemble training failed")?
                .into_parts();
            let forest = forest.with_feature_names(pools.feature_names)?;

            // 3. Evaluate on the withheld test set before anything is written
            let evaluation = evaluate_test_set(&forest, &test, training.threshold)?;

            // 4. Save model
            let writer = ReportWriter::new(&output_dir, experiment_name)?;
            let model_path = writer.model_path();
            forest.save(&model_path).context("failed to save model")?;

            // 5. Write evaluation JSON
            let evaluation_path = evaluation
                .as_ref()
                .map(|e| {
                    writer.write_evaluation(
                        &metadata,
                        training.threshold,
                        &e.confusion,
                        &e.error_rates,
                        &e.roc,
                        &e.pr,
                        e.best.as_ref(),
                    )
                })
                .transpose()?;

            // 6. Print summary
            let confusion = evaluation.as_ref().map(|e| &e.confusion);
            let output = TrainOutput {
                experiment,
                n_legit: pools.legit.len(),
                n_scam: pools.scam.len(),
                n_estimators: forest.n_estimators(),
                n_features: forest.n_features(),
                test_rows: test.len(),
                threshold: training.threshold,
                precision: confusion.and_then(ConfusionMatrix::precision),
                recall: confusion.and_then(ConfusionMatrix::recall),
                f1: confusion.and_then(ConfusionMatrix::f1),
                roc_area: evaluation.as_ref().and_then(|e| e.roc.area()),
                best_threshold: evaluation.as_ref().and_then(|e| e.best.as_ref().map(|b| b.threshold)),
                model_path,
                evaluation_path,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Validate {
            training,
            partitions,
            experiment,
            output_dir,
        } => {
            let experiment_name = ExperimentName::new(experiment.clone())?;

            let pools = read_pools(&training.legit, &training.scam)?;

            let factory = build_factory(&training.tree)?;
            let config = build_config(&training, cli.seed)?;
            let report = PartitionedValidation::new(partitions)?
                .with_threshold(training.threshold)
                .evaluate(&config, &factory, &pools.legit, &pools.scam)
                .context("partitioned validation failed")?;
            info!(mean_f1 = report.mean_f1, "validation complete");

            let writer = ReportWriter::new(&output_dir, experiment_name)?;
            writer.write_validation(&report)?;

            let output = ValidateOutput {
                experiment,
                n_partitions: report.partitions.len(),
                threshold: report.threshold,
                partition_f1: report.partitions.iter().map(|p| p.f1).collect(),
                mean_f1: report.mean_f1,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Score {
            model,
            features,
            threshold,
            experiment,
            output_dir,
        } => {
            let experiment_name = ExperimentName::new(experiment.clone())?;

            // 1. Load model
            let forest = BalancedForest::<TreeLearner>::load(&model).context("failed to load model")?;
            info!(
                n_estimators = forest.n_estimators(),
                n_features = forest.n_features(),
                "model loaded"
            );

            // 2. Read listings
            let listings = FeatureReader::new(&features)
                .read()
                .context("failed to read listings CSV")?;

            // Columns must line up with the ones the model was trained on
            match forest.feature_names() {
                Some(names) => listings.check_columns(&model, names)?,
                None => warn!("model records no feature names, column order is not checked"),
            }

            // 3. Score
            let scores = forest.predict(listings.rows()).context("scoring failed")?;
            let n_flagged = scores.iter().filter(|&&s| s >= threshold).count();

            // 4. Write scores JSON
            let writer = ReportWriter::new(&output_dir, experiment_name)?;
            writer.write_scores(&scores, threshold)?;

            // 5. Print summary
            let output = ScoreOutput {
                experiment,
                n_rows: scores.len(),
                n_flagged,
                threshold,
                model_n_estimators: forest.n_estimators(),
                model_n_features: forest.n_features(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
