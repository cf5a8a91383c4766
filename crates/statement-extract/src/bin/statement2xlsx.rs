use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand, ValueEnum};
use statement_extract::{
    CanonicalSchema, ExtractError, ExtractOptions, ExtractionReport, PageSelection,
    convert_pdf_to_csv, convert_pdf_to_xlsx,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "statement2xlsx",
    version,
    about = "Convert bank statement PDFs into a details sheet and a transactions sheet"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Extract statement details and transactions from a PDF.
    Convert(ConvertArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Xlsx,
    Csv,
}

#[derive(Debug, Args)]
struct ConvertArgs {
    /// Input PDF path.
    #[arg(short, long)]
    input: PathBuf,

    /// Output path (.xlsx workbook, or transactions CSV with --format csv).
    #[arg(short, long)]
    output: PathBuf,

    /// Output format; inferred from the output extension when omitted.
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Where to write statement details in CSV mode.
    #[arg(long)]
    details_output: Option<PathBuf>,

    /// Pages that contribute tables, like 1-3,5. Details always come from page 1.
    #[arg(long)]
    pages: Option<String>,

    /// Canonical column name, in priority order. Repeatable; replaces the default schema.
    #[arg(long = "column")]
    columns: Vec<String>,

    /// Character separating detail keys from values.
    #[arg(long, default_value_t = statement_extract::DEFAULT_METADATA_SEPARATOR)]
    separator: char,

    /// Minimum cells required per candidate table row.
    #[arg(long, default_value_t = 2)]
    min_cols: usize,

    /// CSV delimiter character.
    #[arg(long, default_value = ",")]
    delimiter: char,

    /// Log progress and list every warning.
    #[arg(short, long)]
    verbose: bool,
}

impl ConvertArgs {
    fn output_format(&self) -> OutputFormat {
        self.format.unwrap_or_else(|| {
            let is_csv = self
                .output
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
            if is_csv {
                OutputFormat::Csv
            } else {
                OutputFormat::Xlsx
            }
        })
    }
}

fn parse_options(args: &ConvertArgs) -> Result<ExtractOptions> {
    let pages = args
        .pages
        .as_deref()
        .map(PageSelection::from_str)
        .transpose()
        .map_err(|error| anyhow!("invalid page selection: {error}"))
        .context("failed to parse --pages")?;

    let schema = if args.columns.is_empty() {
        CanonicalSchema::default()
    } else {
        CanonicalSchema::new(args.columns.iter().map(|column| column.trim().to_string()))
            .context("failed to parse --column")?
    };

    let delimiter = u8::try_from(args.delimiter)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| anyhow!("delimiter must be a single ASCII character"))?;

    Ok(ExtractOptions {
        pages,
        schema,
        metadata_separator: args.separator,
        min_cols: args.min_cols,
        delimiter,
    })
}

fn log_report(report: &ExtractionReport, verbose: bool) {
    if verbose {
        eprintln!(
            "pages={} tables={} rows={} details={}",
            report.page_count, report.table_count, report.row_count, report.detail_count
        );
    }
    if report.warnings.is_empty() {
        return;
    }

    eprintln!("warning: {} issue(s) detected", report.warnings.len());
    if verbose {
        for warning in &report.warnings {
            eprintln!("  - {warning}");
        }
    }
}

fn run_convert(args: &ConvertArgs, options: &ExtractOptions) -> Result<ExtractionReport, ExtractError> {
    match args.output_format() {
        OutputFormat::Xlsx => convert_pdf_to_xlsx(&args.input, &args.output, options),
        OutputFormat::Csv => convert_pdf_to_csv(
            &args.input,
            &args.output,
            args.details_output.as_deref(),
            options,
        ),
    }
}

fn describe(input: &Path) -> String {
    format!("failed to convert '{}'", input.display())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let Commands::Convert(args) = cli.command;

    let default_filter = if args.verbose {
        "statement_extract=info"
    } else {
        "statement_extract=warn"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    let options = match parse_options(&args) {
        Ok(options) => options,
        Err(error) => {
            eprintln!("error: {error:#}");
            return ExitCode::from(1);
        }
    };

    match run_convert(&args, &options) {
        Ok(report) => {
            log_report(&report, args.verbose);
            ExitCode::SUCCESS
        }
        Err(error) if error.is_no_tables() => {
            eprintln!("error: {}: {error}", describe(&args.input));
            ExitCode::from(2)
        }
        Err(error) => {
            let error = anyhow::Error::new(error).context(describe(&args.input));
            eprintln!("error: {error:#}");
            ExitCode::from(1)
        }
    }
}
