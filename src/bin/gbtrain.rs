//! Gradient-boosted-tree training and evaluation driver.
//!
//! ```text
//! # Train on two files, write the model and its feature importances:
//! gbtrain --config-file cfg.json --training-files a.tsv,b.tsv --model-file model.json
//!
//! # Evaluate a saved model, scoring every ensemble prefix:
//! gbtrain --config-file cfg.json --eval-only --model-file model.json \
//!     --testing-files test.tsv --find-optimal-num-trees
//!
//! # Score rows piped on standard input:
//! gbtrain --config-file cfg.json --eval-only --model-file model.json --testing-files stdin
//! ```

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use gbtrain::config::Config;
use gbtrain::data::{DataStore, TsvDecoder};
use gbtrain::eval::EvalPipeline;
use gbtrain::loading::{merge_chunks, parse_chunks, read_chunks, DEFAULT_CHUNK_SIZE};
use gbtrain::model::Forest;
use gbtrain::training::GbmTrainer;

/// Token in `--testing-files` meaning "read test rows from standard input".
const STDIN_TOKEN: &str = "stdin";

#[derive(Parser)]
#[command(
    name = "gbtrain",
    about = "Train and evaluate gradient-boosted regression trees",
    version
)]
struct Cli {
    /// Feature/config definitions
    #[arg(long)]
    config_file: String,

    /// Comma-separated data files for training
    #[arg(long, default_value = "")]
    training_files: String,

    /// Comma-separated data files for testing, or `stdin`
    #[arg(long, default_value = "")]
    testing_files: String,

    /// Path to write (training) or read (--eval-only) the model document
    #[arg(long, default_value = "")]
    model_file: String,

    /// Skip training and load --model-file instead
    #[arg(long)]
    eval_only: bool,

    /// Compute per-prefix losses to trim the number of trees
    #[arg(long)]
    find_optimal_num_trees: bool,

    /// Number of examples sampled for dataset compression
    #[arg(long, default_value_t = 5 * 1024 * 1024)]
    num_examples_for_bucketing: usize,

    /// Number of examples used for training, -1 uses all available
    #[arg(long, default_value_t = -1)]
    num_examples_for_training: i64,

    /// Worker-pool size for chunked loading; 0 disables concurrency
    #[arg(long, default_value_t = 0)]
    num_threads: usize,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    info!("loading config from {}", cli.config_file);
    let config = Config::from_file(&cli.config_file)
        .with_context(|| format!("invalid config file {}", cli.config_file))?;
    let decoder = TsvDecoder::new(config.n_features());

    let forest = if cli.eval_only {
        load_model(&cli, &config)?
    } else {
        train_model(&cli, &config, &decoder)?
    };

    if !cli.testing_files.is_empty() {
        evaluate(&cli, &forest, &decoder)?;
    }
    Ok(())
}

/// Load training files into the store, train, and write the model artifacts.
fn train_model(cli: &Cli, config: &Config, decoder: &TsvDecoder) -> Result<Forest> {
    if cli.training_files.is_empty() {
        bail!("--training-files is required unless --eval-only is set");
    }
    if cli.model_file.is_empty() {
        bail!("--model-file is required in training mode");
    }

    let max_examples = usize::try_from(cli.num_examples_for_training).ok();
    let mut store = DataStore::new(
        config.n_features(),
        cli.num_examples_for_bucketing,
        max_examples,
    )
    .with_max_bins(config.training.max_bins);

    let start = Instant::now();
    for path in cli.training_files.split(',').filter(|s| !s.is_empty()) {
        info!("loading data from {path}");
        let file =
            File::open(path).with_context(|| format!("cannot open training file {path}"))?;
        let mut chunks = read_chunks(BufReader::new(file), DEFAULT_CHUNK_SIZE)
            .with_context(|| format!("failed reading {path}"))?;
        parse_chunks(&mut chunks, decoder, cli.num_threads);
        let outcome = merge_chunks(&chunks, &mut store)
            .with_context(|| format!("aggregating chunks from {path}"))?;
        info!(
            "read {} examples in {:.1?}",
            store.n_examples(),
            start.elapsed()
        );
        if outcome.truncated {
            info!(
                "example cap reached after {} ingested rows; skipping remaining input",
                outcome.ingested
            );
            break;
        }
    }
    store.close();

    info!("training on {} examples", store.n_examples());
    let trained = GbmTrainer::new(&store, &config.training).fit();

    let fimps_path = format!("{}.fimps", cli.model_file);
    dump_importances(&fimps_path, config, &trained.importances)
        .with_context(|| format!("cannot write feature importances to {fimps_path}"))?;

    let writer = File::create(&cli.model_file)
        .with_context(|| format!("cannot create model file {}", cli.model_file))?;
    trained
        .forest
        .to_writer(BufWriter::new(writer))
        .context("failed to write model document")?;
    Ok(trained.forest)
}

/// Load a previously written model document.
fn load_model(cli: &Cli, config: &Config) -> Result<Forest> {
    if cli.model_file.is_empty() {
        bail!("--eval-only requires --model-file");
    }
    info!("loading model from {}", cli.model_file);
    let file = File::open(&cli.model_file)
        .with_context(|| format!("cannot open model file {}", cli.model_file))?;
    let forest = Forest::from_reader(BufReader::new(file), config.n_features())
        .with_context(|| format!("invalid model document {}", cli.model_file))?;
    info!("num trees: {}", forest.n_trees());
    Ok(forest)
}

/// Run every test source through one evaluation pipeline and print the
/// summary artifacts to stdout.
fn evaluate(cli: &Cli, forest: &Forest, decoder: &TsvDecoder) -> Result<()> {
    let mut pipeline = EvalPipeline::new(forest, decoder, cli.find_optimal_num_trees);
    for path in cli.testing_files.split(',').filter(|s| !s.is_empty()) {
        info!("loading data from {path}");
        if path == STDIN_TOKEN {
            pipeline
                .process(io::stdin().lock())
                .context("failed reading test rows from stdin")?;
        } else {
            let file =
                File::open(path).with_context(|| format!("cannot open testing file {path}"))?;
            pipeline
                .process(BufReader::new(file))
                .with_context(|| format!("failed reading {path}"))?;
        }
    }
    let report = pipeline.finish();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if let Some(losses) = &report.prefix_losses {
        write!(out, "Optimal num tree stats:\t{}", losses.len())?;
        for loss in losses {
            write!(out, "\t{loss}")?;
        }
        writeln!(out)?;
    }
    writeln!(out, "Avg loss on test: {}", report.avg_loss())?;
    writeln!(
        out,
        "{}\t{}\t{}\t{}\t{}\t{}",
        report.n_examples,
        report.reduction,
        report.loss,
        report.sum_targets,
        report.sum_sq_targets,
        report.agreement
    )?;

    info!(
        "test loss reduction: {} on num examples: {}",
        report.reduction, report.n_examples
    );
    Ok(())
}

/// Write the tab-separated feature importance dump: id, importance, name.
fn dump_importances(path: &str, config: &Config, importances: &[f64]) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    for (fid, importance) in importances.iter().enumerate() {
        writeln!(out, "{fid}\t{importance}\t{}", config.feature_name(fid))?;
    }
    out.flush()
}
