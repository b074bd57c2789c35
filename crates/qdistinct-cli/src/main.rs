//! qdistinct CLI: run DISTINCT over a CSV file and print NDJSON rows.

use clap::{Parser, Subcommand};
use qdistinct_core::prelude::{ExecConfig, KeyStoreKind, Row};
use qdistinct_exec::{ExecMode, ExecOptions, Executor};
use qdistinct_io::readers::csv::CsvReader;
use qdistinct_io::writers::jsonl::JsonlWriter;
use qdistinct_operators::{push_filter, DistinctPlan, Plan, PlanError, Predicate, ValuesPlan};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "qdistinct", version = qdistinct_core::VERSION)]
#[command(about = "Deduplicate rows on a leading key prefix, first occurrence wins", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run DISTINCT over a CSV file (header row names the fields)
    Run {
        /// Path to the input CSV file
        #[arg(short, long)]
        input: PathBuf,

        /// Number of leading columns that form the distinct key
        #[arg(long)]
        hidden_offset: usize,

        /// Protocol: auto, push or pull
        #[arg(long, default_value = "auto")]
        mode: ExecMode,

        /// Filter applied above DISTINCT, e.g. "score > 3"
        #[arg(long = "where")]
        predicate: Option<String>,

        /// Stop after this many output rows
        #[arg(long)]
        limit: Option<usize>,

        /// Print the plan instead of running it
        #[arg(long)]
        explain: bool,

        /// Key store backend: memory or storage (overrides config)
        #[arg(long)]
        store: Option<KeyStoreKind>,

        /// Memory cap in bytes (overrides config)
        #[arg(long)]
        memory_cap: Option<usize>,

        /// Spill directory for storage-backed key stores (overrides config)
        #[arg(long)]
        spill_dir: Option<String>,

        /// Spill URI (file:///path or memory://)
        #[arg(long)]
        spill_uri: Option<String>,
    },
}

struct Overrides {
    store: Option<KeyStoreKind>,
    memory_cap: Option<usize>,
    spill_dir: Option<String>,
    spill_uri: Option<String>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            input,
            hidden_offset,
            mode,
            predicate,
            limit,
            explain,
            store,
            memory_cap,
            spill_dir,
            spill_uri,
        } => {
            let overrides = Overrides {
                store,
                memory_cap,
                spill_dir,
                spill_uri,
            };
            let opts = ExecOptions { mode, limit };
            if let Err(e) = run_distinct(
                &input,
                hidden_offset,
                predicate.as_deref(),
                explain,
                &opts,
                overrides,
            ) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    }
}

fn run_distinct(
    input: &PathBuf,
    hidden_offset: usize,
    predicate: Option<&str>,
    explain: bool,
    opts: &ExecOptions,
    overrides: Overrides,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ExecConfig::from_env();
    apply_overrides(&mut config, overrides);
    let executor = Executor::new(config)?;

    let path = input.to_string_lossy();
    let (schema, rows) = CsvReader::from_path(&path)?.read_rows()?;
    tracing::info!(input = %path, rows = rows.len(), "loaded input");

    let src = ValuesPlan::from_schema(schema, rows);
    let mut plan = build_plan(src, hidden_offset, predicate, &executor)?;

    if explain {
        print!("{}", executor.explain(plan.as_ref()));
        return Ok(());
    }

    let columns = plan.result_fields().iter().map(|f| f.name.clone()).collect();
    let mut writer = JsonlWriter::to_writer(io::stdout().lock(), columns);
    let emitted = executor.stream(plan.as_mut(), opts, &mut |row: Row| {
        writer
            .write_row(&row)
            .map_err(|e| PlanError::Exec(format!("write output: {e}")))
    })?;
    writer.flush()?;

    tracing::info!(rows = emitted, peak_bytes = ?executor.peak_memory_bytes(), "distinct finished");
    Ok(())
}

/// `Values -> Distinct`, with the optional predicate offered on top.
fn build_plan(
    src: ValuesPlan,
    hidden_offset: usize,
    predicate: Option<&str>,
    executor: &Executor,
) -> Result<Box<dyn Plan>, PlanError> {
    let plan: Box<dyn Plan> = Box::new(DistinctPlan::new(Box::new(src), hidden_offset)?);
    match predicate {
        Some(expr) => push_filter(plan, executor.context(), &Predicate::parse(expr)?),
        None => Ok(plan),
    }
}

fn apply_overrides(cfg: &mut ExecConfig, overrides: Overrides) {
    if let Some(store) = overrides.store {
        cfg.key_store = store;
    }
    if let Some(cap) = overrides.memory_cap {
        cfg.mem_cap_bytes = cap;
    }
    if let Some(dir) = overrides.spill_dir {
        cfg.spill_dir = dir;
    }
    if let Some(uri) = overrides.spill_uri {
        cfg.spill_uri = Some(uri);
    }
}
