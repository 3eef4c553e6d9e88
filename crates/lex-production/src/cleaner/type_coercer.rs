//! Type coercion of the raw text table.

use super::converters::{string_to_date, string_to_float};
use crate::config::CleaningConfig;
use anyhow::{Context, Result};
use polars::prelude::*;
use tracing::{debug, info, warn};

/// Values of one column that were present but could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailures {
    pub column: String,
    pub count: usize,
}

/// Parses the date field and the six numeric fields.
///
/// Unparsable values become missing; no row is ever dropped here.
pub struct TypeCoercer<'a> {
    config: &'a CleaningConfig,
}

impl<'a> TypeCoercer<'a> {
    pub fn new(config: &'a CleaningConfig) -> Self {
        Self { config }
    }

    /// Coerce the date and numeric columns of a raw table.
    ///
    /// Returns the typed table and per-column parse failure counts, in
    /// schema order (date first).
    pub fn coerce(&self, df: DataFrame) -> Result<(DataFrame, Vec<ParseFailures>)> {
        let schema = &self.config.schema;
        let mut df = df;
        let mut failures = Vec::new();

        info!("Coercing column types...");

        let date_col = df
            .column(&schema.date)
            .with_context(|| format!("Column '{}' is missing", schema.date))?
            .as_materialized_series()
            .cast(&DataType::String)?;
        let (dates, date_failures) = string_to_date(&date_col, &self.config.date_formats)?;
        df.with_column(dates)?;
        failures.push(self.record(&schema.date, date_failures));

        for name in schema.numeric_columns() {
            let raw = df
                .column(name)
                .with_context(|| format!("Column '{}' is missing", name))?
                .as_materialized_series()
                .cast(&DataType::String)?;
            let (numbers, count) = string_to_float(&raw)?;
            df.with_column(numbers)?;
            failures.push(self.record(name, count));
        }

        Ok((df, failures))
    }

    fn record(&self, column: &str, count: usize) -> ParseFailures {
        if count > 0 {
            warn!("{} value(s) in '{}' could not be parsed and were set to missing", count, column);
        } else {
            debug!("'{}' parsed without failures", column);
        }
        ParseFailures {
            column: column.to_string(),
            count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_table() -> DataFrame {
        df![
            "Date" => [Some("2023-01-01"), Some("not a date"), Some("2023/01/03")],
            "Well_ID" => [Some("W1"), Some("W1"), Some("W2")],
            "Oil_Production" => [None, Some("101.5"), Some("abc")],
            "Gas_Production" => [Some("120"), Some("119"), Some("121")],
            "Water_Production" => [Some("30"), None, Some("inf")],
            "Choke_Size" => [Some("5"), Some("5"), Some("5")],
            "Pressure" => [Some("200"), Some("201"), None],
            "Temperature" => [Some("80"), Some("81"), Some("79")],
        ]
        .unwrap()
    }

    #[test]
    fn test_coerce_types() {
        let config = CleaningConfig::default();
        let (df, _) = TypeCoercer::new(&config).coerce(raw_table()).unwrap();

        assert_eq!(df.height(), 3);
        assert_eq!(df.column("Date").unwrap().dtype(), &DataType::Date);
        assert_eq!(df.column("Well_ID").unwrap().dtype(), &DataType::String);
        for name in config.schema.numeric_columns() {
            assert_eq!(df.column(name).unwrap().dtype(), &DataType::Float64);
        }
    }

    #[test]
    fn test_coerce_unparsable_become_missing() {
        let config = CleaningConfig::default();
        let (df, failures) = TypeCoercer::new(&config).coerce(raw_table()).unwrap();

        assert_eq!(df.column("Date").unwrap().null_count(), 1);
        assert_eq!(df.column("Oil_Production").unwrap().null_count(), 2);
        assert_eq!(df.column("Water_Production").unwrap().null_count(), 2);

        let count = |name: &str| failures.iter().find(|f| f.column == name).unwrap().count;
        assert_eq!(count("Date"), 1);
        assert_eq!(count("Oil_Production"), 1);
        assert_eq!(count("Water_Production"), 1);
        assert_eq!(count("Gas_Production"), 0);
    }

    #[test]
    fn test_coerce_missing_column_fails() {
        let config = CleaningConfig::default();
        let df = df!["Date" => ["2023-01-01"]].unwrap();
        assert!(TypeCoercer::new(&config).coerce(df).is_err());
    }
}
