use crate::reporting::distribution::DistributionReport;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Column names of the production table.
///
/// The eight raw fields appear in the order they are encoded in each sheet
/// line; `special_event` names the flag column added by the outlier handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionSchema {
    pub date: String,
    pub well_id: String,
    pub oil_production: String,
    pub gas_production: String,
    pub water_production: String,
    pub choke_size: String,
    pub pressure: String,
    pub temperature: String,
    pub special_event: String,
}

impl Default for ProductionSchema {
    fn default() -> Self {
        Self {
            date: "Date".to_string(),
            well_id: "Well_ID".to_string(),
            oil_production: "Oil_Production".to_string(),
            gas_production: "Gas_Production".to_string(),
            water_production: "Water_Production".to_string(),
            choke_size: "Choke_Size".to_string(),
            pressure: "Pressure".to_string(),
            temperature: "Temperature".to_string(),
            special_event: "Special_Event".to_string(),
        }
    }
}

impl ProductionSchema {
    /// Number of fields encoded in one raw line.
    pub const FIELD_COUNT: usize = 8;

    /// The eight raw fields in line order.
    pub fn field_names(&self) -> [&str; Self::FIELD_COUNT] {
        [
            &self.date,
            &self.well_id,
            &self.oil_production,
            &self.gas_production,
            &self.water_production,
            &self.choke_size,
            &self.pressure,
            &self.temperature,
        ]
    }

    /// The six measured fields, coerced to floats.
    pub fn numeric_columns(&self) -> [&str; 6] {
        [
            &self.oil_production,
            &self.gas_production,
            &self.water_production,
            &self.choke_size,
            &self.pressure,
            &self.temperature,
        ]
    }

    /// Fields filled with the skewness-conditioned rule.
    pub fn production_columns(&self) -> [&str; 2] {
        [&self.oil_production, &self.gas_production]
    }

    /// Fields filled by linear interpolation.
    pub fn sensor_columns(&self) -> [&str; 2] {
        [&self.pressure, &self.temperature]
    }

    /// Fields screened for outliers, in processing order.
    pub fn monitored_columns(&self) -> [&str; 3] {
        [&self.oil_production, &self.gas_production, &self.pressure]
    }

    /// The (Date, Well_ID) record key.
    pub fn key_columns(&self) -> [&str; 2] {
        [&self.date, &self.well_id]
    }
}

/// A sheet row the loader refused because it did not split into the
/// expected number of fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarantinedRow {
    /// 1-based row number in the sheet.
    pub line: usize,
    pub raw: String,
    pub field_count: usize,
}

/// How the missing values of one column were filled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum ImputationMethod {
    Median { skewness: f64 },
    Mean { skewness: Option<f64> },
    ForwardBackwardFill,
    LinearInterpolation,
}

impl fmt::Display for ImputationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Median { skewness } => write!(f, "median (skewness {:.3})", skewness),
            Self::Mean { skewness: Some(s) } => write!(f, "mean (skewness {:.3})", s),
            Self::Mean { skewness: None } => write!(f, "mean"),
            Self::ForwardBackwardFill => write!(f, "forward/backward fill"),
            Self::LinearInterpolation => write!(f, "linear interpolation"),
        }
    }
}

/// Outcome of imputing a single column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnImputation {
    pub column: String,
    pub missing_before: usize,
    /// Fraction of the column that was missing, 0.0 - 1.0.
    pub missing_rate: f64,
    /// `None` when the column had no observed value to impute from.
    pub method: Option<ImputationMethod>,
    pub missing_after: usize,
}

impl ColumnImputation {
    pub fn filled(&self) -> usize {
        self.missing_before.saturating_sub(self.missing_after)
    }
}

/// Outlier statistics of one monitored field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldOutliers {
    pub column: String,
    pub mean: Option<f64>,
    /// Population standard deviation of the observed values.
    pub std: Option<f64>,
    pub outliers: usize,
    pub corrected: usize,
}

/// Result of the outlier stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutlierReport {
    pub fields: Vec<FieldOutliers>,
    pub special_events: usize,
}

impl OutlierReport {
    pub fn total_outliers(&self) -> usize {
        self.fields.iter().map(|f| f.outliers).sum()
    }

    pub fn total_corrected(&self) -> usize {
        self.fields.iter().map(|f| f.corrected).sum()
    }

    pub fn field(&self, column: &str) -> Option<&FieldOutliers> {
        self.fields.iter().find(|f| f.column == column)
    }
}

// ============================================================================
// Cleaning Summary Types
// ============================================================================

/// Structured record of everything the pipeline did during one run.
///
/// Every console diagnostic of a run (missing counts, duplicate counts,
/// imputation choices, outlier counts) is captured here so callers can render
/// or serialize it.
///
/// # Example
///
/// ```rust,ignore
/// let summary = &result.summary;
/// println!("Kept {} of {} rows in {}ms", summary.rows_after, summary.rows_loaded, summary.duration_ms);
/// for column in &summary.column_summaries {
///     println!("{}: {} -> {} missing", column.name, column.missing_before, column.missing_after);
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CleaningSummary {
    /// Total execution time in milliseconds.
    pub duration_ms: u64,

    /// Rows produced by the loader (quarantined rows excluded).
    pub rows_loaded: usize,
    /// Rows rejected by the loader's arity check.
    pub rows_quarantined: usize,
    /// Rows removed by the row filter.
    pub rows_removed_sparse: usize,
    /// Rows removed because Date or Well_ID was missing.
    pub rows_removed_missing_keys: usize,
    /// Rows in the final table.
    pub rows_after: usize,

    /// Rows sharing a (Date, Well_ID) key with an earlier row, before cleaning.
    pub duplicates_before: usize,
    /// Same count on the final table.
    pub duplicates_after: usize,
    /// Rows removed by deduplication.
    pub duplicates_removed: usize,

    /// Rows flagged as special events.
    pub special_events: usize,

    /// List of actions taken during cleaning.
    pub actions: Vec<CleaningAction>,

    /// Per-column summaries.
    pub column_summaries: Vec<ColumnSummary>,

    /// Rows the loader refused.
    pub quarantined: Vec<QuarantinedRow>,

    /// Warnings and notes generated during cleaning.
    pub warnings: Vec<String>,
}

impl CleaningSummary {
    /// Create a new empty summary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an action to the summary.
    pub fn add_action(&mut self, action: CleaningAction) {
        self.actions.push(action);
    }

    /// Add a warning to the summary.
    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Get the summary of a column, creating it on first use.
    pub fn column_mut(&mut self, name: &str) -> &mut ColumnSummary {
        if let Some(idx) = self.column_summaries.iter().position(|c| c.name == name) {
            &mut self.column_summaries[idx]
        } else {
            self.column_summaries.push(ColumnSummary::new(name));
            let last = self.column_summaries.len() - 1;
            &mut self.column_summaries[last]
        }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSummary> {
        self.column_summaries.iter().find(|c| c.name == name)
    }

    /// Total rows removed after loading.
    pub fn rows_removed(&self) -> usize {
        self.rows_loaded.saturating_sub(self.rows_after)
    }

    /// Calculate the percentage of loaded rows removed.
    pub fn rows_removed_percentage(&self) -> f32 {
        if self.rows_loaded == 0 {
            0.0
        } else {
            (self.rows_removed() as f32 / self.rows_loaded as f32) * 100.0
        }
    }
}

/// A single action taken during cleaning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningAction {
    /// Type of action performed.
    pub action_type: ActionType,
    /// Target of the action (column name or "dataset").
    pub target: String,
    /// Human-readable description of the action.
    pub description: String,
    /// Additional details (e.g., fill value, counts per field).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl CleaningAction {
    pub fn new(
        action_type: ActionType,
        target: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            action_type,
            target: target.into(),
            description: description.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Types of actions that can be taken during cleaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Rows were rejected by the loader.
    RowsQuarantined,
    /// Raw text was parsed into dates or numbers.
    TypeCoerced,
    /// Missing values were filled with a statistic or by propagation.
    ValueImputed,
    /// Missing sensor readings were interpolated.
    ValueInterpolated,
    /// Rows were removed from the table.
    RowsRemoved,
    /// Outliers were replaced.
    OutlierCorrected,
    /// Rows were flagged as special events.
    SpecialEventFlagged,
    /// Duplicate keys were removed.
    DuplicatesRemoved,
    /// The date column was rendered as text.
    DateReformatted,
    /// A measure was converted to another unit.
    UnitConverted,
    /// The cleaned table was written to disk.
    TableWritten,
}

impl ActionType {
    /// Get a human-readable display name for the action type.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::RowsQuarantined => "Rows Quarantined",
            Self::TypeCoerced => "Type Coerced",
            Self::ValueImputed => "Value Imputed",
            Self::ValueInterpolated => "Value Interpolated",
            Self::RowsRemoved => "Rows Removed",
            Self::OutlierCorrected => "Outlier Corrected",
            Self::SpecialEventFlagged => "Special Event Flagged",
            Self::DuplicatesRemoved => "Duplicates Removed",
            Self::DateReformatted => "Date Reformatted",
            Self::UnitConverted => "Unit Converted",
            Self::TableWritten => "Table Written",
        }
    }
}

/// Summary of what happened to a single column.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnSummary {
    /// Name of the column.
    pub name: String,
    /// Missing values in the raw text fields, before type coercion.
    /// Unparsable values are counted in `parse_failures` instead.
    pub missing_before: usize,
    /// Missing values in the final table.
    pub missing_after: usize,
    /// Present values that failed to parse and became missing.
    pub parse_failures: usize,
    /// Imputation method used, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imputation_method: Option<ImputationMethod>,
    /// Outliers detected on the pre-correction snapshot.
    pub outliers_detected: usize,
    /// Outliers replaced.
    pub outliers_corrected: usize,
}

impl ColumnSummary {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Percentage of the initially missing values that were filled.
    pub fn imputation_percentage(&self) -> f32 {
        if self.missing_before == 0 {
            0.0
        } else {
            let imputed = self.missing_before.saturating_sub(self.missing_after);
            (imputed as f32 / self.missing_before as f32) * 100.0
        }
    }
}

/// Everything a pipeline run produces.
#[derive(Debug, Clone)]
pub struct CleaningResult {
    /// The cleaned table, as written.
    pub data: DataFrame,
    pub summary: CleaningSummary,
    /// Per-column imputation outcomes, production then sensor fields.
    pub imputations: Vec<ColumnImputation>,
    pub outliers: OutlierReport,
    /// Density and box-plot data of the monitored fields.
    pub distributions: DistributionReport,
    /// Where the table was written, when it was.
    pub output_path: Option<PathBuf>,
}

// ============================================================================
// Tests
// ============================================================================
