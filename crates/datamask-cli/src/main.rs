//! datamask CLI
//!
//! Scan tabular files for PII and write masked copies.

mod report_output;
mod rules_file;
mod table_io;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use datamask_pii::{Detector, Masker, TokenStore};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use report_output::ReportDocument;
use table_io::TableFormat;

#[derive(Parser)]
#[command(name = "datamask")]
#[command(about = "datamask - PII scanner and masker for tabular data", long_about = None)]
struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a file and report PII presence per column
    Scan {
        /// Input table (.csv, .json, .jsonl, .xlsx)
        input: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        as_json: bool,

        /// Write the report to a JSON file
        #[arg(long)]
        export_json: Option<PathBuf>,

        /// Write per-column/type counts to a CSV file
        #[arg(long)]
        export_csv: Option<PathBuf>,

        /// Read the input in chunks of this many rows (0 reads it whole)
        #[arg(long, default_value = "0")]
        chunksize: usize,

        /// Rules file (YAML, TOML or JSON)
        #[arg(short, long)]
        rules: Option<PathBuf>,
    },
    /// Mask a file and write the result
    Mask {
        /// Input table (.csv, .json, .jsonl, .xlsx)
        input: PathBuf,

        /// Output path; its extension picks the output format
        #[arg(short, long, required_unless_present = "inplace")]
        output: Option<PathBuf>,

        /// Rules file (YAML, TOML or JSON)
        #[arg(short, long)]
        rules: Option<PathBuf>,

        /// Token store file, overriding the rules option
        #[arg(long)]
        token_store: Option<PathBuf>,

        /// Overwrite the input file
        #[arg(long)]
        inplace: bool,

        /// Process the input in chunks of this many rows (0 reads it whole)
        #[arg(long, default_value = "0")]
        chunksize: usize,
    },
}

fn init_tracing(log_level: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level '{}'", log_level))?,
    };

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level)?;

    match cli.command {
        Commands::Scan {
            input,
            as_json,
            export_json,
            export_csv,
            chunksize,
            rules,
        } => scan(
            &input,
            as_json,
            export_json.as_deref(),
            export_csv.as_deref(),
            chunksize,
            rules.as_deref(),
        ),
        Commands::Mask {
            input,
            output,
            rules,
            token_store,
            inplace,
            chunksize,
        } => {
            let target = if inplace { Some(input.clone()) } else { output };
            let target = target.context("an output path or --inplace is required")?;
            mask(
                &input,
                &target,
                rules.as_deref(),
                token_store.as_deref(),
                chunksize,
            )
        }
    }
}

fn chunk_hint(chunksize: usize) -> Option<usize> {
    (chunksize > 0).then_some(chunksize)
}

fn scan(
    input: &Path,
    as_json: bool,
    export_json: Option<&Path>,
    export_csv: Option<&Path>,
    chunksize: usize,
    rules_path: Option<&Path>,
) -> Result<()> {
    let format = TableFormat::from_path(input)?;
    let rules = rules_file::load_rules(rules_path)?;
    let detector = Detector::new(&rules)?;

    let chunks = table_io::read_chunks(input, format, chunk_hint(chunksize))
        .with_context(|| format!("failed to open {}", input.display()))?;
    let report = datamask_pii::scan(&detector, chunks)
        .with_context(|| format!("failed to scan {}", input.display()))?;

    let file = input.to_string_lossy();
    let document = ReportDocument::new(&file, &report);

    if let Some(path) = export_json {
        report_output::export_json(path, &document)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    if let Some(path) = export_csv
        && !report.is_empty()
    {
        report_output::export_csv(path, &report)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    if as_json {
        println!("{}", document.to_json_pretty()?);
    } else {
        report_output::write_summary(&mut std::io::stdout().lock(), &report)?;
    }
    Ok(())
}

fn mask(
    input: &Path,
    target: &Path,
    rules_path: Option<&Path>,
    token_store: Option<&Path>,
    chunksize: usize,
) -> Result<()> {
    // Both formats are checked before anything is written
    let input_format = TableFormat::from_path(input)?;
    let output_format = TableFormat::from_path(target)?;

    let mut rules = rules_file::load_rules(rules_path)?;
    if let Some(path) = token_store {
        rules = rules.with_token_store(path);
    }

    let mut tokens = TokenStore::open(rules_file::expand_path(&rules.token_store_path()));
    let mut masker = Masker::new(&rules, &mut tokens)?;

    let chunksize = chunk_hint(chunksize);
    let chunks = table_io::read_chunks(input, input_format, chunksize)
        .with_context(|| format!("failed to open {}", input.display()))?;
    let mut sink = table_io::create_sink(target, output_format)
        .with_context(|| format!("failed to create {}", target.display()))?;

    let summary = datamask_pii::mask(&mut masker, chunks, sink.as_mut())
        .with_context(|| format!("failed to mask {}", input.display()))?;
    info!(
        tokens = tokens.len(),
        cells_masked = summary.cells_masked,
        "Wrote {}",
        target.display()
    );

    match chunksize.filter(|_| input_format.supports_chunks()) {
        Some(n) => println!("Masked data written to {} (chunked {})", target.display(), n),
        None => println!("Masked data written to {}", target.display()),
    }
    Ok(())
}
