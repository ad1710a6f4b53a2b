//! checklogic: encode, decode, apply and validate check-logic filters, and
//! aggregate evaluation runs into a results matrix.
//!
//! JSON inputs are read from a file path, or from stdin when the path is `-`.

use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use checklogic::codec::{from_query, preserved_pairs, to_query};
use checklogic::{
    validate_logic, CheckLogic, CheckRegistry, Evaluator, FilterCodec, MatrixAggregator,
    PredicateSet,
};
use checklogic_core::config::load_dotenv;
use checklogic_core::{load_results, Config};

// ── CLI ─────────────────────────────────────────────────────────────

/// Check-logic filter tool.
#[derive(Parser, Debug)]
#[command(name = "checklogic", version, about)]
struct Cli {
    /// YAML check catalog (builtin checks when unset).
    #[arg(long, global = true, env = "CHECKS_REGISTRY_PATH")]
    registry: Option<PathBuf>,

    /// Query parameter that carries the filter in `--query` mode.
    #[arg(long, global = true, env = "FILTER_QUERY_KEY")]
    query_key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the filter string for a JSON tree.
    Encode {
        tree: PathBuf,
        /// Print a full query string instead of the bare filter.
        #[arg(long)]
        query: bool,
    },
    /// Print the JSON tree for a filter string.
    Decode {
        filter: String,
        /// Treat the input as a full query string.
        #[arg(long)]
        query: bool,
    },
    /// Evaluate a filter against every record of a JSON array.
    Filter {
        filter: String,
        records: PathBuf,
        /// Print only the records that pass.
        #[arg(long)]
        matching: bool,
    },
    /// Aggregate a JSON array of evaluation results into a matrix.
    Matrix {
        results: PathBuf,
        /// Comma-separated variable names for the row axis.
        #[arg(long, env = "MATRIX_VARIABLES", value_delimiter = ',')]
        variables: Option<Vec<String>>,
    },
    /// Report problems in a JSON tree.
    Validate { tree: PathBuf },
}

// ── Helpers ─────────────────────────────────────────────────────────

fn load_registry(path: Option<&Path>) -> Result<CheckRegistry> {
    match path {
        Some(path) => CheckRegistry::from_path(path)
            .with_context(|| format!("failed to load check registry from {}", path.display())),
        None => Ok(CheckRegistry::builtin()),
    }
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = read_input(path)?;
    serde_json::from_str(&text).with_context(|| format!("invalid JSON in {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ── Main ────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    config.log_summary();

    let registry_path = cli.registry.or(config.registry.path.clone());
    let registry = load_registry(registry_path.as_deref())?;
    let codec = FilterCodec::new(&registry);
    let query_key = cli.query_key.unwrap_or(config.filters.query_key.clone());

    match cli.command {
        Command::Encode { tree, query } => {
            let logic: CheckLogic = read_json(&tree)?;
            if query {
                println!("{}", to_query(&codec, &logic, &query_key, &[]));
            } else {
                println!("{}", codec.serialize(&logic));
            }
        }
        Command::Decode { filter, query } => {
            let logic = if query {
                for (key, value) in preserved_pairs(&filter, &config.filters.ignore_keys) {
                    info!(key = %key, value = %value, "preserved query param");
                }
                from_query(&codec, &filter, &query_key)
            } else {
                codec.deserialize(&filter)
            }
            .context("malformed filter")?;
            print_json(&logic)?;
        }
        Command::Filter {
            filter,
            records,
            matching,
        } => {
            let logic = codec.deserialize(&filter).context("malformed filter")?;
            let records: Vec<Value> = read_json(&records)?;
            let predicates = PredicateSet::builtin();
            let evaluator = Evaluator::new(&registry, &predicates);

            if matching {
                let kept = evaluator.filter(&logic, &records);
                info!(total = records.len(), matched = kept.len(), "filtered records");
                print_json(&kept)?;
            } else {
                let evaluations: Vec<_> = records
                    .iter()
                    .map(|record| evaluator.evaluate(&logic, record))
                    .collect();
                let passed = evaluations.iter().filter(|e| e.passed).count();
                info!(total = records.len(), passed, "evaluated records");
                print_json(&evaluations)?;
            }
        }
        Command::Matrix { results, variables } => {
            let results = load_results(&results)
                .with_context(|| format!("failed to load results from {}", results.display()))?;
            let mut aggregator = MatrixAggregator::new();
            if let Some(keys) = variables.or(config.matrix.variables.clone()) {
                aggregator = aggregator.restrict_variables(keys);
            }
            let matrix = aggregator.aggregate(&results);
            if matrix.duplicate_matches > 0 {
                warn!(
                    duplicates = matrix.duplicate_matches,
                    "results shadowed by earlier results for the same cell"
                );
            }
            print_json(&matrix)?;
        }
        Command::Validate { tree } => {
            let logic: CheckLogic = read_json(&tree)?;
            let report = validate_logic(&logic, &registry);
            print_json(&report)?;
            if !report.valid {
                bail!("{} validation error(s)", report.errors.len());
            }
        }
    }

    Ok(())
}
