//! Report generation module.
//!
//! A [`CleaningReport`] gathers the summary, imputation and outlier outcomes
//! and distribution data of one run. It serves:
//! - JSON output to stdout (`--json` CLI flag)
//! - JSON file output (`--emit-report` CLI flag)
//! - Programmatic access in library mode
//!
//! # Example
//!
//! ```rust,ignore
//! use lex_production::reporting::ReportGenerator;
//!
//! let report = ReportGenerator::build_report("production_data_history.xlsx", &result, &config);
//! println!("{}", serde_json::to_string_pretty(&report)?);
//!
//! let generator = ReportGenerator::new(PathBuf::from("output"));
//! generator.write_report_to_file(&report, "production_data_history")?;
//! ```

pub mod distribution;
mod generator;

pub use distribution::{BoxPlotSummary, DensityCurve, DistributionReport};
pub use generator::{CleaningReport, ProcessingSummaryReport, ReportGenerator};
