//! CLI entry point for the production cleaning pipeline.

use anyhow::{Result, anyhow};
use clap::Parser;
use lex_production::profiler::DataProfiler;
use lex_production::utils::{float_values, missing_count};
use lex_production::{
    CleaningConfig, CleaningReport, Pipeline, ProductionImputer, ReportGenerator, TypeCoercer,
    WorkbookLoader,
};
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Well-production time series cleaner",
    long_about = "Cleans a well-production history exported to a spreadsheet: parses the raw \
                  delimited column, imputes gaps, corrects outliers, removes duplicate keys \
                  and converts pressure to psi.\n\n\
                  EXAMPLES:\n  \
                  # Clean with the default thresholds\n  \
                  lex-production -i production_data_history.xlsx\n\n  \
                  # Write CSV and a JSON report next to it\n  \
                  lex-production -i history.xlsx -o out/cleaned.csv --emit-report\n\n  \
                  # Inspect parse failures and imputation choices without writing\n  \
                  lex-production -i history.xlsx --dry-run"
)]
struct Args {
    /// Path to the workbook to clean
    #[arg(short, long)]
    input: String,

    /// Output file (.xlsx or .csv)
    #[arg(short, long, default_value = "cleaned_production_data_history.xlsx")]
    output: String,

    /// Sheet holding the raw delimited lines
    #[arg(long, default_value = "in")]
    sheet: String,

    /// Field delimiter of the raw lines
    #[arg(long, default_value = ",")]
    delimiter: char,

    /// Treat the first sheet row as data instead of a header
    #[arg(long)]
    no_header: bool,

    /// Missing fraction at or above which production gaps are forward/backward filled
    #[arg(long, default_value = "0.05")]
    missing_rate_threshold: f64,

    /// Absolute skewness above which the median replaces the mean
    #[arg(long, default_value = "0.5")]
    skewness_threshold: f64,

    /// Minimum fraction of fields a row needs to be kept (0.0 - 1.0)
    #[arg(long, default_value = "0.7")]
    min_row_fill_ratio: f64,

    /// Absolute standard score above which a value is an outlier
    #[arg(long, default_value = "2.5")]
    zscore_threshold: f64,

    /// Monitored fields that must spike together to flag a special event
    #[arg(long, default_value = "2")]
    special_event_min_fields: usize,

    /// Multiplier converting pressure to the output unit
    #[arg(long, default_value = "14.5038")]
    pressure_factor: f64,

    /// Keep rows whose Date or Well_ID is missing
    #[arg(long)]
    keep_missing_keys: bool,

    /// Load and coerce the sheet, print diagnostics, write nothing
    #[arg(long)]
    dry_run: bool,

    /// Output JSON to stdout instead of a human-readable summary
    ///
    /// Disables all logs; only the final JSON report is printed.
    #[arg(long)]
    json: bool,

    /// Write a JSON report next to the output file
    ///
    /// The report will be saved as <input_name>_report.json, also when
    /// combined with --json
    #[arg(short = 'r', long)]
    emit_report: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show warnings, errors and the final result)
    #[arg(short, long)]
    quiet: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is disabled so stdout only carries JSON.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    if !Path::new(&args.input).exists() {
        return Err(anyhow!("Input file not found: {}", args.input));
    }

    let config = CleaningConfig::builder()
        .sheet_name(&args.sheet)
        .delimiter(args.delimiter)
        .has_header(!args.no_header)
        .missing_rate_threshold(args.missing_rate_threshold)
        .skewness_threshold(args.skewness_threshold)
        .min_row_fill_ratio(args.min_row_fill_ratio)
        .zscore_threshold(args.zscore_threshold)
        .special_event_min_fields(args.special_event_min_fields)
        .pressure_factor(args.pressure_factor)
        .drop_missing_keys(!args.keep_missing_keys)
        .output_path(&args.output)
        .save_to_disk(!args.dry_run)
        .build()?;

    if args.dry_run {
        return run_dry_run(&args, &config);
    }

    let mut builder = Pipeline::builder().config(config);
    if !args.quiet && !args.json {
        builder = builder.on_progress(|update| {
            info!(
                "[{:.0}%] {}: {}",
                update.progress * 100.0,
                update.stage.display_name(),
                update.message
            );
        });
    }
    let pipeline = builder.build()?;

    info!("{}", "=".repeat(80));
    info!("Cleaning {}...", args.input);
    info!("{}", "=".repeat(80));

    let result = pipeline.process_file(&args.input).map_err(|e| {
        error!("Pipeline failed: {}", e);
        anyhow!("Pipeline failed: {}", e)
    })?;

    let report = ReportGenerator::build_report(&args.input, &result, pipeline.config());

    if args.emit_report {
        let output_dir = Path::new(&args.output)
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let generator = ReportGenerator::new(output_dir);
        let report_path = generator.write_report_to_file(&report, &extract_file_stem(&args.input))?;
        info!("Report written to: {}", report_path.display());
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_human_readable_summary(&report);

    Ok(())
}

/// Load and coerce the sheet, then print what a full run would start from.
///
/// Uses `println!` on purpose: this output is the point of `--dry-run` and
/// must show regardless of the log level.
fn run_dry_run(args: &Args, config: &CleaningConfig) -> Result<()> {
    println!("\n{}", "=".repeat(80));
    println!("DRY RUN - Diagnostics of the raw sheet");
    println!("{}\n", "=".repeat(80));

    let sheet = WorkbookLoader::new(config).load(Path::new(&args.input))?;

    println!("SHEET OVERVIEW");
    println!("{}", "-".repeat(40));
    println!("  File: {}", args.input);
    println!("  Sheet: {}", config.sheet_name);
    println!("  Rows read: {}", sheet.rows_read);
    println!("  Rows loaded: {}", sheet.data.height());
    println!("  Rows quarantined: {}", sheet.quarantined.len());
    for row in sheet.quarantined.iter().take(10) {
        println!("    row {} ({} fields): {}", row.line, row.field_count, row.raw);
    }
    println!();

    let (df, failures) = TypeCoercer::new(config).coerce(sheet.data)?;
    let missing = DataProfiler::missing_counts(&df);

    println!("COLUMNS");
    println!("{}", "-".repeat(40));
    println!("{:<20} {:<10} {:<15}", "Column", "Missing", "Parse failures");
    println!("{}", "-".repeat(50));
    for count in &missing {
        let failed = failures
            .iter()
            .find(|f| f.column == count.column)
            .map(|f| f.count)
            .unwrap_or(0);
        println!("{:<20} {:<10} {:<15}", count.column, count.missing, failed);
    }
    println!();

    let keys = config.schema.key_columns();
    println!("DUPLICATES");
    println!("{}", "-".repeat(40));
    println!(
        "  Rows repeating an earlier {:?}: {}",
        keys,
        DataProfiler::duplicate_key_count(&df, &keys)?
    );
    println!();

    println!("IMPUTATION PREVIEW");
    println!("{}", "-".repeat(40));
    let imputer = ProductionImputer::new(config);
    for name in config.schema.production_columns() {
        let values = float_values(&df, name)?;
        let rate = if values.is_empty() {
            0.0
        } else {
            missing_count(&values) as f64 / values.len() as f64
        };
        match imputer.choose_method(&values) {
            Some(method) => println!("  {}: {:.2}% missing, {}", name, rate * 100.0, method),
            None => println!("  {}: no observed values", name),
        }
    }
    for name in config.schema.sensor_columns() {
        println!("  {}: linear interpolation", name);
    }
    println!();

    println!("{}", "=".repeat(80));
    println!("To clean and write {}, run without --dry-run", args.output);
    println!("{}", "=".repeat(80));

    Ok(())
}

/// Extract the file stem (name without extension) from a path.
fn extract_file_stem(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output")
        .to_string()
}

/// Print a human-readable summary of the cleaning results.
fn print_human_readable_summary(report: &CleaningReport) {
    let summary = &report.processing_summary;

    println!();
    println!("{}", "=".repeat(80));
    println!("CLEANING COMPLETE");
    println!("{}", "=".repeat(80));
    println!();

    println!("Input:  {} ({} rows loaded)", report.input_file, summary.rows_loaded);
    if let Some(ref output_file) = report.output_file {
        println!("Output: {} ({} rows)", output_file, summary.rows_after);
    }
    println!();

    println!("Processing Summary:");
    println!("  Duration: {}ms", summary.duration_ms);
    println!(
        "  Rows: {} -> {} ({} removed, {:.1}%)",
        summary.rows_loaded, summary.rows_after, summary.rows_removed, summary.rows_removed_percent
    );
    println!("  Quarantined rows: {}", summary.rows_quarantined);
    println!(
        "  Duplicates: {} before, {} after",
        summary.duplicates_before, summary.duplicates_after
    );
    println!();

    println!("Missing Values:");
    println!("{:<20} {:<10} {:<10}", "Column", "Before", "After");
    for column in &report.summary.column_summaries {
        println!(
            "{:<20} {:<10} {:<10}",
            column.name, column.missing_before, column.missing_after
        );
    }
    println!();

    println!("Imputation:");
    for imputation in &report.imputations {
        let method = imputation
            .method
            .map(|m| m.to_string())
            .unwrap_or_else(|| "none (no observed values)".to_string());
        println!(
            "  {}: {:.2}% missing, {}",
            imputation.column,
            imputation.missing_rate * 100.0,
            method
        );
    }
    println!();

    println!("Outliers:");
    for field in &report.outliers.fields {
        println!(
            "  {}: {} detected, {} corrected",
            field.column, field.outliers, field.corrected
        );
    }
    println!("  Special events: {}", report.outliers.special_events);
    println!();

    if !summary.warnings.is_empty() {
        println!("Warnings:");
        for warning in &summary.warnings {
            println!("  ! {}", warning);
        }
        println!();
    }

    println!("Use --json for machine-readable output");
    println!("Use --emit-report to save detailed JSON report");
    println!("{}", "=".repeat(80));
}
