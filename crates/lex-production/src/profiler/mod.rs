//! Data profiling for the production table.
//!
//! Counts missing values per column and repeated record keys. Both counts are
//! taken before and after cleaning so the run can report what changed.

pub mod statistics;

use crate::cleaner::key_subset;
use anyhow::Result;
use polars::prelude::*;

/// Missing-value count of one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingCount {
    pub column: String,
    pub missing: usize,
}

/// Data profiler for the production table.
pub struct DataProfiler;

impl DataProfiler {
    /// Missing values per column, in column order.
    pub fn missing_counts(df: &DataFrame) -> Vec<MissingCount> {
        df.get_columns()
            .iter()
            .map(|col| MissingCount {
                column: col.name().to_string(),
                missing: col.null_count(),
            })
            .collect()
    }

    /// Rows whose key repeats the key of an earlier row.
    ///
    /// Missing key components compare equal to each other.
    pub fn duplicate_key_count(df: &DataFrame, keys: &[&str]) -> Result<usize> {
        let subset = key_subset(keys);
        let unique =
            df.unique::<&str, &str>(Some(subset.as_slice()), UniqueKeepStrategy::First, None)?;
        Ok(df.height() - unique.height())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_counts() {
        let df = df![
            "Well_ID" => [Some("W1"), None, Some("W2")],
            "Pressure" => [None, None, Some(200.0f64)],
        ]
        .unwrap();

        let counts = DataProfiler::missing_counts(&df);
        assert_eq!(
            counts,
            vec![
                MissingCount { column: "Well_ID".to_string(), missing: 1 },
                MissingCount { column: "Pressure".to_string(), missing: 2 },
            ]
        );
    }

    #[test]
    fn test_duplicate_key_count() {
        let df = df![
            "Date" => ["2023-01-01", "2023-01-01", "2023-01-02", "2023-01-01"],
            "Well_ID" => ["W1", "W1", "W1", "W2"],
            "Oil_Production" => [1.0f64, 2.0, 3.0, 4.0],
        ]
        .unwrap();

        let count = DataProfiler::duplicate_key_count(&df, &["Date", "Well_ID"]).unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_duplicate_key_count_missing_equal() {
        let df = df![
            "Date" => [None, None, Some("2023-01-01")],
            "Well_ID" => [Some("W1"), Some("W1"), Some("W1")],
        ]
        .unwrap();

        let count = DataProfiler::duplicate_key_count(&df, &["Date", "Well_ID"]).unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_duplicate_key_count_on_date_dtype() {
        let dates = Series::new("Date".into(), &[19358i32, 19358, 19359])
            .cast(&DataType::Date)
            .unwrap();
        let df = DataFrame::new(vec![
            dates.into(),
            Series::new("Well_ID".into(), &["W1", "W1", "W1"]).into(),
        ])
        .unwrap();

        let count = DataProfiler::duplicate_key_count(&df, &["Date", "Well_ID"]).unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_duplicate_key_count_unknown_column_fails() {
        let df = df!["Well_ID" => ["W1"]].unwrap();
        assert!(DataProfiler::duplicate_key_count(&df, &["Date", "Well_ID"]).is_err());
    }
}
