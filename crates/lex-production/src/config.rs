//! Configuration types for the production cleaning pipeline.
//!
//! Every constant of the cleaning job (sheet name, delimiter, thresholds,
//! unit factor, output location) lives here, with the historical values as
//! defaults. Use [`CleaningConfig::builder()`] for a validated configuration.

use crate::types::ProductionSchema;
use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Date formats tried, in order, when coercing the date field.
pub const DEFAULT_DATE_FORMATS: [&str; 7] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d-%m-%Y",
    "%Y%m%d",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

/// Bar to psi.
pub const BAR_TO_PSI: f64 = 14.5038;

/// Configuration for the cleaning pipeline.
///
/// # Example
///
/// ```rust,ignore
/// use lex_production::config::CleaningConfig;
///
/// let config = CleaningConfig::builder()
///     .sheet_name("in")
///     .zscore_threshold(3.0)
///     .output_path("out/cleaned.xlsx")
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningConfig {
    /// Column names of the production table.
    pub schema: ProductionSchema,

    /// Sheet holding the raw delimited lines.
    /// Default: "in"
    pub sheet_name: String,

    /// Delimiter separating the eight fields of a raw line.
    /// Default: ','
    pub delimiter: char,

    /// Whether the first sheet row is a header to skip.
    /// Default: true
    pub has_header: bool,

    /// chrono format strings tried in order when parsing dates.
    pub date_formats: Vec<String>,

    /// Missing fraction below which a production column is filled with a
    /// mean or median; at or above it, forward/backward fill is used.
    /// Default: 0.05
    pub missing_rate_threshold: f64,

    /// Absolute skewness above which the median replaces the mean.
    /// Default: 0.5
    pub skewness_threshold: f64,

    /// Minimum fraction of non-missing fields a row needs to survive the
    /// row filter.
    /// Default: 0.7
    pub min_row_fill_ratio: f64,

    /// Absolute standard score above which a value is an outlier.
    /// Default: 2.5
    pub zscore_threshold: f64,

    /// Number of monitored fields that must be outliers on the same row for
    /// the row to count as a special event.
    ///
    /// `1` gives the plain "outlier on any of the three fields" rule. Under it
    /// every outlier row is a special event, so no outlier is ever corrected.
    /// With the default a lone spike on one field is corrected and the row is
    /// not a special event.
    /// Default: 2
    pub special_event_min_fields: usize,

    /// Drop rows whose Date or Well_ID is missing before deduplication.
    /// Default: true
    pub drop_missing_keys: bool,

    /// Multiplier applied to Pressure during normalization (bar to psi).
    /// Default: 14.5038
    pub pressure_factor: f64,

    /// chrono format used when writing the date column.
    /// Default: "%Y-%m-%d"
    pub date_output_format: String,

    /// Destination of the cleaned table (`.xlsx` or `.csv`).
    /// Default: "cleaned_production_data_history.xlsx"
    pub output_path: PathBuf,

    /// Sheet name used for `.xlsx` output.
    /// Default: "cleaned"
    pub output_sheet_name: String,

    /// Number of evaluation points of each density curve in the report.
    /// Default: 200
    pub kde_points: usize,

    /// Whether to write the cleaned table at all. When false the pipeline
    /// keeps the result in memory only.
    /// Default: true
    pub save_to_disk: bool,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            schema: ProductionSchema::default(),
            sheet_name: "in".to_string(),
            delimiter: ',',
            has_header: true,
            date_formats: DEFAULT_DATE_FORMATS.iter().map(|s| s.to_string()).collect(),
            missing_rate_threshold: 0.05,
            skewness_threshold: 0.5,
            min_row_fill_ratio: 0.7,
            zscore_threshold: 2.5,
            special_event_min_fields: 2,
            drop_missing_keys: true,
            pressure_factor: BAR_TO_PSI,
            date_output_format: "%Y-%m-%d".to_string(),
            output_path: PathBuf::from("cleaned_production_data_history.xlsx"),
            output_sheet_name: "cleaned".to_string(),
            kde_points: 200,
            save_to_disk: true,
        }
    }
}

impl CleaningConfig {
    /// Create a new configuration builder.
    pub fn builder() -> CleaningConfigBuilder {
        CleaningConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        for (field, value) in [
            ("missing_rate_threshold", self.missing_rate_threshold),
            ("min_row_fill_ratio", self.min_row_fill_ratio),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigValidationError::InvalidThreshold {
                    field: field.to_string(),
                    value,
                });
            }
        }

        if !self.skewness_threshold.is_finite() || self.skewness_threshold < 0.0 {
            return Err(ConfigValidationError::InvalidThreshold {
                field: "skewness_threshold".to_string(),
                value: self.skewness_threshold,
            });
        }

        if !self.zscore_threshold.is_finite() || self.zscore_threshold <= 0.0 {
            return Err(ConfigValidationError::InvalidThreshold {
                field: "zscore_threshold".to_string(),
                value: self.zscore_threshold,
            });
        }

        let monitored = self.schema.monitored_columns().len();
        if self.special_event_min_fields == 0 || self.special_event_min_fields > monitored {
            return Err(ConfigValidationError::InvalidSpecialEventFields {
                value: self.special_event_min_fields,
                monitored,
            });
        }

        if !self.pressure_factor.is_finite() || self.pressure_factor <= 0.0 {
            return Err(ConfigValidationError::InvalidPressureFactor(
                self.pressure_factor,
            ));
        }

        if self.delimiter == '\n' || self.delimiter == '\r' {
            return Err(ConfigValidationError::InvalidDelimiter(self.delimiter));
        }

        if self.sheet_name.trim().is_empty() {
            return Err(ConfigValidationError::EmptyField("sheet_name".to_string()));
        }

        if self.date_formats.is_empty() {
            return Err(ConfigValidationError::EmptyField("date_formats".to_string()));
        }

        for format in self.date_formats.iter().chain([&self.date_output_format]) {
            if !is_valid_date_format(format) {
                return Err(ConfigValidationError::InvalidDateFormat(format.clone()));
            }
        }

        if self.kde_points < 2 {
            return Err(ConfigValidationError::InvalidKdePoints(self.kde_points));
        }

        Ok(())
    }
}

fn is_valid_date_format(format: &str) -> bool {
    !format.is_empty() && !StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid threshold for '{field}': {value}")]
    InvalidThreshold { field: String, value: f64 },

    #[error("Invalid special event field count: {value} (must be between 1 and {monitored})")]
    InvalidSpecialEventFields { value: usize, monitored: usize },

    #[error("Invalid pressure factor: {0} (must be a positive finite number)")]
    InvalidPressureFactor(f64),

    #[error("Invalid delimiter: {0:?}")]
    InvalidDelimiter(char),

    #[error("'{0}' must not be empty")]
    EmptyField(String),

    #[error("Invalid date format: '{0}'")]
    InvalidDateFormat(String),

    #[error("Invalid density point count: {0} (must be at least 2)")]
    InvalidKdePoints(usize),
}

/// Builder for [`CleaningConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct CleaningConfigBuilder {
    schema: Option<ProductionSchema>,
    sheet_name: Option<String>,
    delimiter: Option<char>,
    has_header: Option<bool>,
    date_formats: Option<Vec<String>>,
    missing_rate_threshold: Option<f64>,
    skewness_threshold: Option<f64>,
    min_row_fill_ratio: Option<f64>,
    zscore_threshold: Option<f64>,
    special_event_min_fields: Option<usize>,
    drop_missing_keys: Option<bool>,
    pressure_factor: Option<f64>,
    date_output_format: Option<String>,
    output_path: Option<PathBuf>,
    output_sheet_name: Option<String>,
    kde_points: Option<usize>,
    save_to_disk: Option<bool>,
}

impl CleaningConfigBuilder {
    /// Override the column names of the production table.
    pub fn schema(mut self, schema: ProductionSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Set the sheet holding the raw delimited lines.
    pub fn sheet_name(mut self, name: impl Into<String>) -> Self {
        self.sheet_name = Some(name.into());
        self
    }

    /// Set the field delimiter of the raw lines.
    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    /// Declare whether the first sheet row is a header.
    pub fn has_header(mut self, has_header: bool) -> Self {
        self.has_header = Some(has_header);
        self
    }

    /// Replace the list of accepted date formats.
    pub fn date_formats<I, S>(mut self, formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.date_formats = Some(formats.into_iter().map(Into::into).collect());
        self
    }

    /// Set the missing fraction that switches production imputation to
    /// forward/backward fill.
    ///
    /// # Arguments
    /// * `threshold` - Value between 0.0 and 1.0 (e.g., 0.05 = 5%)
    pub fn missing_rate_threshold(mut self, threshold: f64) -> Self {
        self.missing_rate_threshold = Some(threshold);
        self
    }

    /// Set the absolute skewness above which the median is used.
    pub fn skewness_threshold(mut self, threshold: f64) -> Self {
        self.skewness_threshold = Some(threshold);
        self
    }

    /// Set the minimum fraction of non-missing fields a row must have.
    pub fn min_row_fill_ratio(mut self, ratio: f64) -> Self {
        self.min_row_fill_ratio = Some(ratio);
        self
    }

    /// Set the absolute standard score that marks an outlier.
    pub fn zscore_threshold(mut self, threshold: f64) -> Self {
        self.zscore_threshold = Some(threshold);
        self
    }

    /// Set how many monitored fields must be outliers for a special event.
    pub fn special_event_min_fields(mut self, fields: usize) -> Self {
        self.special_event_min_fields = Some(fields);
        self
    }

    /// Drop or keep rows with a missing Date or Well_ID.
    pub fn drop_missing_keys(mut self, drop: bool) -> Self {
        self.drop_missing_keys = Some(drop);
        self
    }

    /// Set the pressure multiplier applied during normalization.
    pub fn pressure_factor(mut self, factor: f64) -> Self {
        self.pressure_factor = Some(factor);
        self
    }

    /// Set the output date format.
    pub fn date_output_format(mut self, format: impl Into<String>) -> Self {
        self.date_output_format = Some(format.into());
        self
    }

    /// Set the destination file of the cleaned table.
    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    /// Set the sheet name used for `.xlsx` output.
    pub fn output_sheet_name(mut self, name: impl Into<String>) -> Self {
        self.output_sheet_name = Some(name.into());
        self
    }

    /// Set the number of points per density curve.
    pub fn kde_points(mut self, points: usize) -> Self {
        self.kde_points = Some(points);
        self
    }

    /// Enable or disable writing the cleaned table.
    pub fn save_to_disk(mut self, save: bool) -> Self {
        self.save_to_disk = Some(save);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `CleaningConfig` or an error if validation fails.
    pub fn build(self) -> Result<CleaningConfig, ConfigValidationError> {
        let defaults = CleaningConfig::default();
        let config = CleaningConfig {
            schema: self.schema.unwrap_or(defaults.schema),
            sheet_name: self.sheet_name.unwrap_or(defaults.sheet_name),
            delimiter: self.delimiter.unwrap_or(defaults.delimiter),
            has_header: self.has_header.unwrap_or(defaults.has_header),
            date_formats: self.date_formats.unwrap_or(defaults.date_formats),
            missing_rate_threshold: self
                .missing_rate_threshold
                .unwrap_or(defaults.missing_rate_threshold),
            skewness_threshold: self
                .skewness_threshold
                .unwrap_or(defaults.skewness_threshold),
            min_row_fill_ratio: self
                .min_row_fill_ratio
                .unwrap_or(defaults.min_row_fill_ratio),
            zscore_threshold: self.zscore_threshold.unwrap_or(defaults.zscore_threshold),
            special_event_min_fields: self
                .special_event_min_fields
                .unwrap_or(defaults.special_event_min_fields),
            drop_missing_keys: self.drop_missing_keys.unwrap_or(defaults.drop_missing_keys),
            pressure_factor: self.pressure_factor.unwrap_or(defaults.pressure_factor),
            date_output_format: self
                .date_output_format
                .unwrap_or(defaults.date_output_format),
            output_path: self.output_path.unwrap_or(defaults.output_path),
            output_sheet_name: self.output_sheet_name.unwrap_or(defaults.output_sheet_name),
            kde_points: self.kde_points.unwrap_or(defaults.kde_points),
            save_to_disk: self.save_to_disk.unwrap_or(defaults.save_to_disk),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CleaningConfig::default();
        assert_eq!(config.sheet_name, "in");
        assert_eq!(config.delimiter, ',');
        assert_eq!(config.missing_rate_threshold, 0.05);
        assert_eq!(config.skewness_threshold, 0.5);
        assert_eq!(config.min_row_fill_ratio, 0.7);
        assert_eq!(config.zscore_threshold, 2.5);
        assert_eq!(config.pressure_factor, 14.5038);
        assert_eq!(config.date_output_format, "%Y-%m-%d");
        assert!(config.drop_missing_keys);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_custom_values() {
        let config = CleaningConfig::builder()
            .sheet_name("raw")
            .delimiter(';')
            .zscore_threshold(3.0)
            .special_event_min_fields(1)
            .output_path("out/clean.csv")
            .build()
            .unwrap();

        assert_eq!(config.sheet_name, "raw");
        assert_eq!(config.delimiter, ';');
        assert_eq!(config.zscore_threshold, 3.0);
        assert_eq!(config.special_event_min_fields, 1);
        assert_eq!(config.output_path, PathBuf::from("out/clean.csv"));
        // untouched fields keep their defaults
        assert_eq!(config.min_row_fill_ratio, 0.7);
    }

    #[test]
    fn test_validation_invalid_ratio() {
        let result = CleaningConfig::builder().min_row_fill_ratio(1.5).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidThreshold { .. }
        ));
    }

    #[test]
    fn test_validation_special_event_fields_out_of_range() {
        let zero = CleaningConfig::builder().special_event_min_fields(0).build();
        assert!(matches!(
            zero.unwrap_err(),
            ConfigValidationError::InvalidSpecialEventFields { value: 0, monitored: 3 }
        ));

        let too_many = CleaningConfig::builder().special_event_min_fields(4).build();
        assert!(too_many.is_err());
    }

    #[test]
    fn test_validation_pressure_factor() {
        let result = CleaningConfig::builder().pressure_factor(-1.0).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidPressureFactor(_)
        ));
    }

    #[test]
    fn test_validation_date_format() {
        let result = CleaningConfig::builder().date_output_format("%Y-%Q").build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidDateFormat(_)
        ));

        let ok = CleaningConfig::builder().date_output_format("%d/%m/%Y").build();
        assert!(ok.is_ok());
    }

    #[test]
    fn test_config_from_json() {
        let mut value = serde_json::to_value(CleaningConfig::default()).unwrap();
        value["sheet_name"] = serde_json::json!("history");
        value["zscore_threshold"] = serde_json::json!(3.5);

        let config: CleaningConfig = serde_json::from_value(value).unwrap();
        assert_eq!(config.sheet_name, "history");
        assert_eq!(config.zscore_threshold, 3.5);
        assert_eq!(config.schema.pressure, "Pressure");
    }
}
