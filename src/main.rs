use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing::error;

use order_cleaner::config::{parse_delimiter, Config};
use order_cleaner::error::{Stage, StageContext, StageError};
use order_cleaner::logging;
use order_cleaner::pipeline::processing::AggregateReport;
use order_cleaner::pipeline::{report_only, Pipeline, RunReport};
use order_cleaner::Column;

#[derive(Parser)]
#[command(name = "order_cleaner")]
#[command(about = "Clean and summarize order-line CSV exports")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate, repair, dedupe and reconcile a file, then write the cleaned copy
    Clean(CleanArgs),
    /// Print aggregate reports for an already-clean file
    Report(ReportArgs),
}

#[derive(Args)]
struct CleanArgs {
    /// Source file
    #[arg(long = "in", value_name = "PATH")]
    input: PathBuf,
    /// Destination for the cleaned file
    #[arg(long = "out", value_name = "PATH")]
    output: PathBuf,
    /// Column used to detect duplicates (default OrderID)
    #[arg(long)]
    dedupe_key: Option<Column>,
    /// Number of rows in the top-N reports
    #[arg(long)]
    top_n: Option<usize>,
    /// Field delimiter, a single character or `tab`
    #[arg(long)]
    delimiter: Option<String>,
    /// Skip rows that do not match the header instead of aborting
    #[arg(long)]
    skip_malformed: bool,
    /// Also write the run report as JSON
    #[arg(long, value_name = "PATH")]
    report: Option<PathBuf>,
    /// Config file (defaults to ./order_cleaner.toml when present)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Args)]
struct ReportArgs {
    #[arg(long = "in", value_name = "PATH")]
    input: PathBuf,
    #[arg(long)]
    top_n: Option<usize>,
    #[arg(long)]
    delimiter: Option<String>,
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

fn load_config(path: Option<&PathBuf>, delimiter: Option<String>) -> Result<Config, StageError> {
    let mut config = Config::load(path.map(|p| p.as_path())).at_stage(Stage::Config)?;
    if let Some(d) = delimiter {
        // reject a bad flag before any file is read
        parse_delimiter(&d).at_stage(Stage::Config)?;
        config.input.delimiter = d;
    }
    Ok(config)
}

fn run_clean(args: CleanArgs) -> Result<(), StageError> {
    let mut config = load_config(args.config.as_ref(), args.delimiter)?;
    if args.skip_malformed {
        config.input.skip_malformed = true;
    }
    if let Some(n) = args.top_n {
        config.report.top_n = n;
    }

    let mut options = config
        .pipeline_options(args.input, args.output)
        .at_stage(Stage::Config)?;
    if let Some(key) = args.dedupe_key {
        options.dedupe_key = key;
    }
    options.report = args.report.clone();

    println!("🧹 Cleaning {}...", options.input.display());
    let report = Pipeline::new(options).run()?;
    print_run_summary(&report);
    if let Some(path) = args.report {
        println!("   Report: {}", path.display());
    }
    Ok(())
}

fn run_report(args: ReportArgs) -> Result<(), StageError> {
    let mut config = load_config(args.config.as_ref(), args.delimiter)?;
    if let Some(n) = args.top_n {
        config.report.top_n = n;
    }
    let load = config.load_options().at_stage(Stage::Config)?;
    let aggregates = report_only(&args.input, &load, config.report.top_n)?;
    print_aggregates(&aggregates);
    Ok(())
}

fn print_run_summary(report: &RunReport) {
    println!("\n📊 Run {}:", report.run_id);
    println!("   Rows loaded: {}", report.rows_loaded);
    println!("   Rows skipped: {}", report.rows_skipped.len());
    println!("   Duplicates removed: {}", report.duplicates_removed);
    println!("   Dates swapped: {}", report.dates_swapped);
    println!(
        "   Repairs: {} product names, {} quantities, {} prices",
        report.repairs.products_filled, report.repairs.quantities_filled, report.repairs.prices_negated
    );
    if let Some(median) = report.repairs.median_quantity {
        println!("   Median quantity: {}", median);
    }
    println!("   Rows written: {} -> {}", report.rows_written, report.output);
    println!("   SHA-256: {}", report.output_sha256);

    if !report.findings.is_empty() {
        println!("\n⚠️  Findings:");
        for (kind, count) in report.finding_counts() {
            println!("   - {:?}: {}", kind, count);
        }
        for finding in &report.findings {
            println!(
                "   row {} {}: {:?}",
                finding.row_index, finding.field, finding.kind
            );
        }
    }
    for skipped in &report.rows_skipped {
        println!("   skipped row {}: {}", skipped.row, skipped.reason);
    }

    print_aggregates(&report.aggregates);
}

fn print_aggregates(aggregates: &AggregateReport) {
    println!("\n🏆 Top selling products:");
    for p in &aggregates.top_selling_products {
        println!("   {:<30} {}", p.product_name, p.quantity);
    }
    println!("\n🐢 Most delayed orders:");
    for d in &aggregates.most_delayed_orders {
        println!("   order {:<10} {} days", d.order_id, d.delay_days);
    }
    println!("\n💰 Revenue by category:");
    for c in &aggregates.revenue_by_category {
        println!("   {:<30} {:.2}", c.category, c.revenue);
    }
}

fn main() -> ExitCode {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Clean(args) => run_clean(args),
        Commands::Report(args) => run_report(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // file log only; the console gets the bare line below
            error!(target: logging::FILE_ONLY_TARGET, "Run failed: {}", e);
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
