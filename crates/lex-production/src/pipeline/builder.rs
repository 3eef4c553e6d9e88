//! Main cleaning pipeline module.
//!
//! This module provides the core `Pipeline` struct and builder for
//! orchestrating the cleaning run.

use crate::cleaner::{DataCleaner, TypeCoercer};
use crate::config::{CleaningConfig, ConfigValidationError};
use crate::error::{CleaningError, Result};
use crate::imputers::{LinearInterpolator, ProductionImputer};
use crate::loader::{LoadedSheet, WorkbookLoader};
use crate::pipeline::OutlierHandler;
use crate::pipeline::progress::{
    CancellationToken, CleaningStage, ClosureProgressReporter, ProgressReporter, ProgressUpdate,
};
use crate::profiler::DataProfiler;
use crate::reporting::distribution::{DistributionReport, box_plot, kernel_density};
use crate::types::{
    ActionType, CleaningAction, CleaningResult, CleaningSummary, ColumnImputation, OutlierReport,
    ProductionSchema,
};
use crate::utils::{float_values, observed};
use crate::writer::TableWriter;
use polars::prelude::*;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// The main cleaning pipeline.
///
/// Use [`Pipeline::builder()`] to create a new pipeline with custom configuration.
///
/// # Example
///
/// ```rust,ignore
/// use lex_production::{CancellationToken, CleaningConfig, Pipeline};
///
/// let token = CancellationToken::new();
///
/// let result = Pipeline::builder()
///     .cancellation_token(token.clone())
///     .on_progress(|update| {
///         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
///     })
///     .config(CleaningConfig::builder().output_path("out/cleaned.xlsx").build()?)
///     .build()?
///     .process_file("production_data_history.xlsx")?;
/// ```
pub struct Pipeline {
    config: CleaningConfig,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    cancellation_token: CancellationToken,
    cleaner: DataCleaner,
}

// Ensure Pipeline is Send (can be moved to a worker thread)
static_assertions::assert_impl_all!(Pipeline: Send);

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// The configuration this pipeline runs with.
    pub fn config(&self) -> &CleaningConfig {
        &self.config
    }

    /// Load the configured sheet of the workbook at `path` and clean it.
    ///
    /// # Errors
    ///
    /// Returns `Err(CleaningError::Cancelled)` if the pipeline was cancelled
    /// via the cancellation token. Unreadable workbooks, a missing sheet and
    /// write failures abort the run.
    pub fn process_file(&self, path: impl AsRef<Path>) -> Result<CleaningResult> {
        let path = path.as_ref();
        self.finish(self.check_cancelled().and_then(|_| {
            self.report_progress(ProgressUpdate::new(
                CleaningStage::Loading,
                0.0,
                format!("Reading {}...", path.display()),
            ));
            let sheet = WorkbookLoader::new(&self.config).load(path)?;
            self.process_internal(sheet)
        }))
    }

    /// Clean an already loaded sheet.
    pub fn process(&self, sheet: LoadedSheet) -> Result<CleaningResult> {
        self.finish(self.process_internal(sheet))
    }

    fn finish(&self, outcome: Result<CleaningResult>) -> Result<CleaningResult> {
        match outcome {
            Ok(result) => {
                self.report_progress(ProgressUpdate::complete("Pipeline completed successfully"));
                Ok(result)
            }
            Err(e) => {
                if e.is_cancelled() {
                    self.report_progress(ProgressUpdate::cancelled());
                } else {
                    self.report_progress(ProgressUpdate::failed(e.to_string()));
                }
                error!("Pipeline error: {}", e);
                Err(e)
            }
        }
    }

    /// Check if cancellation has been requested.
    fn check_cancelled(&self) -> Result<()> {
        if self.cancellation_token.is_cancelled() {
            return Err(CleaningError::Cancelled);
        }
        Ok(())
    }

    /// Report progress if a reporter is configured.
    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    fn process_internal(&self, sheet: LoadedSheet) -> Result<CleaningResult> {
        let start_time = Instant::now();
        let schema = &self.config.schema;
        let keys = schema.key_columns();

        info!("Starting cleaning pipeline...");

        let mut summary = CleaningSummary::new();
        let mut distributions = DistributionReport::default();
        summary.rows_loaded = sheet.data.height();
        summary.rows_quarantined = sheet.quarantined.len();
        if !sheet.quarantined.is_empty() {
            let lines: Vec<String> = sheet.quarantined.iter().map(|q| q.line.to_string()).collect();
            summary.add_warning(format!(
                "{} row(s) did not split into {} fields and were quarantined",
                sheet.quarantined.len(),
                ProductionSchema::FIELD_COUNT
            ));
            summary.add_action(
                CleaningAction::new(
                    ActionType::RowsQuarantined,
                    "dataset",
                    format!("Quarantined {} malformed row(s)", sheet.quarantined.len()),
                )
                .with_details(format!("Sheet rows: {}", lines.join(", "))),
            );
        }
        summary.quarantined = sheet.quarantined;
        self.report_progress(ProgressUpdate::new(
            CleaningStage::Loading,
            1.0,
            format!("Loaded {} rows", summary.rows_loaded),
        ));

        self.check_cancelled()?;

        // Step 1: Type coercion
        self.report_progress(ProgressUpdate::new(
            CleaningStage::TypeCoercion,
            0.0,
            "Coercing column types...",
        ));
        info!("Step 1: Coercing column types...");

        // Before-cleaning counts are taken on the raw text fields
        for name in schema.field_names() {
            summary.column_mut(name);
        }
        for count in DataProfiler::missing_counts(&sheet.data) {
            info!("Missing values in '{}' before cleaning: {}", count.column, count.missing);
            summary.column_mut(&count.column).missing_before = count.missing;
        }
        summary.duplicates_before = DataProfiler::duplicate_key_count(&sheet.data, &keys)
            .map_err(|e| CleaningError::CleaningFailed(format!("{:#}", e)))?;
        info!("Duplicate {:?} rows before cleaning: {}", keys, summary.duplicates_before);

        let (df, failures) = TypeCoercer::new(&self.config)
            .coerce(sheet.data)
            .map_err(|e| CleaningError::CoercionFailed(format!("{:#}", e)))?;

        let total_failures: usize = failures.iter().map(|f| f.count).sum();
        for failure in &failures {
            summary.column_mut(&failure.column).parse_failures = failure.count;
        }

        let mut action = CleaningAction::new(
            ActionType::TypeCoerced,
            "dataset",
            format!(
                "Parsed '{}' as dates and {} measure columns as numbers",
                schema.date,
                schema.numeric_columns().len()
            ),
        );
        if total_failures > 0 {
            let details: Vec<String> = failures
                .iter()
                .filter(|f| f.count > 0)
                .map(|f| format!("{}: {}", f.column, f.count))
                .collect();
            action = action.with_details(format!("Unparsable values: {}", details.join(", ")));
        }
        summary.add_action(action);

        self.report_progress(ProgressUpdate::new(
            CleaningStage::TypeCoercion,
            1.0,
            "Type coercion complete",
        ));

        self.check_cancelled()?;

        // Step 2: Imputation
        info!("Step 2: Imputing missing values...");
        let mut df = df;
        let mut imputations = Vec::new();

        let production = schema.production_columns();
        self.record_densities(&df, &production, "before_imputation", &mut distributions)?;

        let imputer = ProductionImputer::new(&self.config);
        let sensors = schema.sensor_columns();
        let total = production.len() + sensors.len();

        for (idx, name) in production.iter().chain(sensors.iter()).enumerate() {
            self.check_cancelled()?;
            self.report_progress(ProgressUpdate::with_items(
                CleaningStage::Imputation,
                format!("Column: {}", name),
                idx,
                total,
                format!("Imputing '{}'...", name),
            ));

            let outcome = if production.contains(name) {
                imputer.impute_column(&mut df, name)
            } else {
                LinearInterpolator.impute_column(&mut df, name)
            };
            let imputation = outcome.map_err(|e| CleaningError::ImputationFailed {
                column: name.to_string(),
                reason: format!("{:#}", e),
            })?;
            self.record_imputation(&mut summary, &imputation);
            imputations.push(imputation);
        }

        self.report_progress(ProgressUpdate::new(
            CleaningStage::Imputation,
            1.0,
            "Imputation complete",
        ));

        self.check_cancelled()?;

        // Step 3: Row filter
        self.report_progress(ProgressUpdate::new(
            CleaningStage::RowFiltering,
            0.0,
            "Dropping sparse rows...",
        ));
        info!("Step 3: Dropping sparse rows...");

        let (df, removed) = self
            .cleaner
            .drop_sparse_rows(df, self.config.min_row_fill_ratio)
            .map_err(|e| CleaningError::CleaningFailed(format!("{:#}", e)))?;
        summary.rows_removed_sparse = removed;
        self.record_densities(&df, &production, "after_imputation", &mut distributions)?;
        if removed > 0 {
            summary.add_action(CleaningAction::new(
                ActionType::RowsRemoved,
                "dataset",
                format!(
                    "Removed {} row(s) with less than {:.0}% of fields present",
                    removed,
                    self.config.min_row_fill_ratio * 100.0
                ),
            ));
        }

        self.check_cancelled()?;

        // Step 4: Outliers
        self.report_progress(ProgressUpdate::new(
            CleaningStage::OutlierHandling,
            0.0,
            "Handling outliers...",
        ));
        info!("Step 4: Handling outliers...");

        for name in schema.monitored_columns() {
            let values = observed(&float_values(&df, name)?);
            if let Some(plot) = box_plot(name, &values) {
                distributions.box_plots.push(plot);
            }
        }

        let mut df = df;
        let outliers = OutlierHandler::new(&self.config)
            .handle(&mut df)
            .map_err(|e| CleaningError::OutlierHandlingFailed(format!("{:#}", e)))?;
        self.record_outliers(&mut summary, &outliers);

        self.report_progress(ProgressUpdate::new(
            CleaningStage::OutlierHandling,
            1.0,
            format!(
                "{} outlier(s), {} special event(s)",
                outliers.total_outliers(),
                outliers.special_events
            ),
        ));

        self.check_cancelled()?;

        // Step 5: Missing keys and duplicates
        self.report_progress(ProgressUpdate::new(
            CleaningStage::Deduplication,
            0.0,
            "Removing duplicate keys...",
        ));
        info!("Step 5: Removing duplicate keys...");

        let df = if self.config.drop_missing_keys {
            let (df, removed) = self
                .cleaner
                .drop_missing_keys(df, &keys)
                .map_err(|e| CleaningError::CleaningFailed(format!("{:#}", e)))?;
            summary.rows_removed_missing_keys = removed;
            if removed > 0 {
                summary.add_action(CleaningAction::new(
                    ActionType::RowsRemoved,
                    "dataset",
                    format!("Removed {} row(s) with a missing {:?}", removed, keys),
                ));
            }
            df
        } else {
            df
        };

        let (df, removed) = self
            .cleaner
            .deduplicate_keys(df, &keys)
            .map_err(|e| CleaningError::CleaningFailed(format!("{:#}", e)))?;
        summary.duplicates_removed = removed;
        if removed > 0 {
            summary.add_action(CleaningAction::new(
                ActionType::DuplicatesRemoved,
                "dataset",
                format!("Removed {} duplicate {:?} row(s), keeping the first", removed, keys),
            ));
        }
        summary.duplicates_after = DataProfiler::duplicate_key_count(&df, &keys)
            .map_err(|e| CleaningError::CleaningFailed(format!("{:#}", e)))?;
        info!("Duplicate {:?} rows after cleaning: {}", keys, summary.duplicates_after);

        self.check_cancelled()?;

        // Step 6: Normalization
        self.report_progress(ProgressUpdate::new(
            CleaningStage::Normalization,
            0.0,
            "Normalizing dates and units...",
        ));
        info!("Step 6: Normalizing dates and units...");

        let df = self
            .cleaner
            .normalize(
                df,
                schema,
                &self.config.date_output_format,
                self.config.pressure_factor,
            )
            .map_err(|e| CleaningError::CleaningFailed(format!("{:#}", e)))?;
        summary.add_action(CleaningAction::new(
            ActionType::DateReformatted,
            schema.date.as_str(),
            format!("Formatted dates as '{}'", self.config.date_output_format),
        ));
        summary.add_action(CleaningAction::new(
            ActionType::UnitConverted,
            schema.pressure.as_str(),
            format!("Converted bar to psi (x {})", self.config.pressure_factor),
        ));

        for count in DataProfiler::missing_counts(&df) {
            info!("Missing values in '{}' after cleaning: {}", count.column, count.missing);
            summary.column_mut(&count.column).missing_after = count.missing;
        }
        summary.rows_after = df.height();

        self.check_cancelled()?;

        // Step 7: Write
        let output_path = if self.config.save_to_disk {
            self.report_progress(ProgressUpdate::new(
                CleaningStage::Writing,
                0.0,
                format!("Writing {}...", self.config.output_path.display()),
            ));
            info!("Step 7: Writing cleaned table...");

            let path = TableWriter::new(&self.config).write(&df, &self.config.output_path)?;
            summary.add_action(CleaningAction::new(
                ActionType::TableWritten,
                path.display().to_string(),
                format!("Wrote {} rows x {} columns", df.height(), df.width()),
            ));
            Some(path)
        } else {
            debug!("Skipping write (save_to_disk = false)");
            None
        };

        summary.duration_ms = start_time.elapsed().as_millis() as u64;
        info!(
            "Cleaning complete: {} -> {} rows in {}ms",
            summary.rows_loaded, summary.rows_after, summary.duration_ms
        );

        Ok(CleaningResult {
            data: df,
            summary,
            imputations,
            outliers,
            distributions,
            output_path,
        })
    }

    fn record_densities(
        &self,
        df: &DataFrame,
        columns: &[&str],
        label: &str,
        distributions: &mut DistributionReport,
    ) -> Result<()> {
        for name in columns {
            let values = observed(&float_values(df, name)?);
            if let Some(curve) = kernel_density(name, label, &values, self.config.kde_points) {
                distributions.densities.push(curve);
            } else {
                debug!("No density for '{}' ({}): too few distinct values", name, label);
            }
        }
        Ok(())
    }

    fn record_imputation(&self, summary: &mut CleaningSummary, imputation: &ColumnImputation) {
        summary.column_mut(&imputation.column).imputation_method = imputation.method;

        match imputation.method {
            None if imputation.missing_before > 0 => {
                summary.add_warning(format!(
                    "'{}' has no observed values; {} missing value(s) left unfilled",
                    imputation.column, imputation.missing_before
                ));
            }
            Some(method) if imputation.filled() > 0 => {
                let sensors = self.config.schema.sensor_columns();
                let action_type = if sensors.contains(&imputation.column.as_str()) {
                    ActionType::ValueInterpolated
                } else {
                    ActionType::ValueImputed
                };
                summary.add_action(
                    CleaningAction::new(
                        action_type,
                        imputation.column.as_str(),
                        format!("Filled {} missing value(s) using {}", imputation.filled(), method),
                    )
                    .with_details(format!("{:.2}% missing", imputation.missing_rate * 100.0)),
                );
            }
            _ => {}
        }
    }

    fn record_outliers(&self, summary: &mut CleaningSummary, outliers: &OutlierReport) {
        summary.special_events = outliers.special_events;
        for field in &outliers.fields {
            let column = summary.column_mut(&field.column);
            column.outliers_detected = field.outliers;
            column.outliers_corrected = field.corrected;
            if field.corrected > 0 {
                summary.add_action(CleaningAction::new(
                    ActionType::OutlierCorrected,
                    field.column.as_str(),
                    format!(
                        "Corrected {} of {} outlier(s)",
                        field.corrected, field.outliers
                    ),
                ));
            }
        }
        if outliers.special_events > 0 {
            summary.add_action(CleaningAction::new(
                ActionType::SpecialEventFlagged,
                self.config.schema.special_event.as_str(),
                format!("Flagged {} row(s) as special events", outliers.special_events),
            ));
        }
    }
}

/// Builder for creating a configured [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<CleaningConfig>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    cancellation_token: Option<CancellationToken>,
}

static_assertions::assert_impl_all!(PipelineBuilder: Send);

impl PipelineBuilder {
    /// Set the cleaning configuration.
    pub fn config(mut self, config: CleaningConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set a progress reporter for receiving updates during processing.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    ///
    /// This is a convenience method for simple progress handling.
    /// For more complex scenarios, use [`progress_reporter`](Self::progress_reporter).
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Set a cancellation token for stopping the pipeline.
    ///
    /// Clone the token and call [`CancellationToken::cancel()`] from any
    /// thread. The pipeline checks it between stages and returns
    /// [`CleaningError::Cancelled`].
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<Pipeline, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(Pipeline {
            config,
            progress_reporter: self.progress_reporter,
            cancellation_token: self.cancellation_token.unwrap_or_default(),
            cleaner: DataCleaner,
        })
    }
}
