//! Well-Production Cleaning Library
//!
//! One-shot cleaning of a well-production time series exported to a
//! spreadsheet, built with Rust and Polars.
//!
//! # Overview
//!
//! A run takes the raw sheet through seven stages:
//!
//! - **Loading**: split a single delimited text column into eight fields,
//!   quarantining malformed rows
//! - **Type Coercion**: parse dates and measures, unparsable values become missing
//! - **Imputation**: skewness-conditioned mean/median or forward/backward fill
//!   for production, linear interpolation for sensors
//! - **Row Filtering**: drop rows with too few fields present
//! - **Outlier Handling**: standard-score outliers, special events, corrections
//! - **Deduplication and Normalization**: unique (Date, Well_ID), formatted
//!   dates, pressure in psi
//! - **Writing**: `.xlsx` or `.csv` output
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use lex_production::{CleaningConfig, Pipeline};
//!
//! let config = CleaningConfig::builder()
//!     .output_path("cleaned_production_data_history.xlsx")
//!     .zscore_threshold(2.5)
//!     .build()?;
//!
//! let result = Pipeline::builder()
//!     .config(config)
//!     .build()?
//!     .process_file("production_data_history.xlsx")?;
//!
//! println!("Kept {} of {} rows", result.summary.rows_after, result.summary.rows_loaded);
//! println!("Special events: {}", result.outliers.special_events);
//! ```
//!
//! # Progress Reporting
//!
//! The pipeline supports progress reporting and cancellation between stages:
//!
//! ```rust,ignore
//! use lex_production::{CancellationToken, CleaningError, Pipeline};
//!
//! let token = CancellationToken::new();
//! let token_for_cancel = token.clone();
//!
//! std::thread::spawn(move || {
//!     std::thread::sleep(std::time::Duration::from_secs(10));
//!     token_for_cancel.cancel();
//! });
//!
//! let result = Pipeline::builder()
//!     .cancellation_token(token)
//!     .on_progress(|update| {
//!         println!("[{:?}] {}", update.stage, update.message);
//!     })
//!     .build()?
//!     .process_file("production_data_history.xlsx");
//!
//! match result {
//!     Ok(result) => println!("Success!"),
//!     Err(CleaningError::Cancelled) => println!("Cancelled by user"),
//!     Err(e) => println!("Error: {}", e),
//! }
//! ```

pub mod cleaner;
pub mod config;
pub mod error;
pub mod imputers;
pub mod loader;
pub mod pipeline;
pub mod profiler;
pub mod reporting;
pub mod types;
pub mod utils;
pub mod writer;

// Re-exports for convenient access
pub use cleaner::{DataCleaner, TypeCoercer};
pub use config::{CleaningConfig, CleaningConfigBuilder, ConfigValidationError};
pub use error::{CleaningError, Result as ProductionResult, ResultExt};
pub use imputers::{LinearInterpolator, ProductionImputer};
pub use loader::{LoadedSheet, WorkbookLoader};
pub use pipeline::{
    CancellationToken, CleaningStage, ClosureProgressReporter, OutlierHandler, Pipeline,
    PipelineBuilder, ProgressReporter, ProgressUpdate,
};
pub use reporting::{CleaningReport, DistributionReport, ReportGenerator};
pub use types::{
    ActionType, CleaningAction, CleaningResult, CleaningSummary, ColumnImputation, ColumnSummary,
    ImputationMethod, OutlierReport, ProductionSchema, QuarantinedRow,
};
pub use writer::TableWriter;
