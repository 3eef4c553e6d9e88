//! Data cleaning module for the production table.
//!
//! This module provides functionality for:
//! - Coercing raw text fields to dates and numbers
//! - Removing rows with excessive missing values
//! - Removing rows with an incomplete record key
//! - Removing duplicate keys
//! - Normalizing the date format and the pressure unit

mod converters;
mod type_coercer;

pub use type_coercer::{ParseFailures, TypeCoercer};

use crate::types::ProductionSchema;
use anyhow::{Context, Result};
use polars::prelude::*;
use tracing::{debug, info};

/// Data cleaner for row-level cleaning operations.
pub struct DataCleaner;

impl DataCleaner {
    /// Drop rows whose share of non-missing fields is below `min_fill_ratio`.
    ///
    /// A row is kept iff `non_missing >= min_fill_ratio * column_count`.
    /// Returns the filtered table and the number of rows removed.
    pub fn drop_sparse_rows(&self, df: DataFrame, min_fill_ratio: f64) -> Result<(DataFrame, usize)> {
        let before = df.height();
        let required = min_fill_ratio * df.width() as f64;

        // Non-missing fields per row, accumulated column by column
        let mut present = Series::new("present".into(), vec![0u32; df.height()]);
        for col in df.get_columns() {
            let not_null = col
                .as_materialized_series()
                .is_not_null()
                .cast(&DataType::UInt32)?;
            present = (&present + &not_null)?;
        }

        let mask = present.cast(&DataType::Float64)?.gt_eq(required - 1e-9)?;
        let df = df.filter(&mask)?;
        let removed = before - df.height();

        if removed > 0 {
            info!(
                "Removed {} rows with fewer than {:.1} non-missing fields",
                removed, required
            );
        } else {
            debug!("No sparse rows found");
        }
        Ok((df, removed))
    }

    /// Drop rows where any key component is missing.
    pub fn drop_missing_keys(&self, df: DataFrame, keys: &[&str]) -> Result<(DataFrame, usize)> {
        let before = df.height();
        let subset = key_subset(keys);
        let df = df.drop_nulls(Some(subset.as_slice()))?;
        let removed = before - df.height();

        if removed > 0 {
            info!("Removed {} rows with a missing {:?}", removed, keys);
        }
        Ok((df, removed))
    }

    /// Keep the first row of every key, preserving row order.
    ///
    /// Missing key components compare equal to each other.
    pub fn deduplicate_keys(&self, df: DataFrame, keys: &[&str]) -> Result<(DataFrame, usize)> {
        let before = df.height();
        let subset = key_subset(keys);
        let df = df.unique_stable(Some(subset.as_slice()), UniqueKeepStrategy::First, None)?;
        let removed = before - df.height();

        if removed > 0 {
            info!("Removed {} duplicate {:?} rows", removed, keys);
        } else {
            debug!("No duplicate keys found");
        }
        Ok((df, removed))
    }

    /// Render the date column as text and convert pressure with `pressure_factor`.
    pub fn normalize(
        &self,
        df: DataFrame,
        schema: &ProductionSchema,
        date_format: &str,
        pressure_factor: f64,
    ) -> Result<DataFrame> {
        let mut df = df;

        let dates = df
            .column(&schema.date)
            .with_context(|| format!("Column '{}' is missing", schema.date))?
            .as_materialized_series()
            .clone();
        df.with_column(converters::date_to_string(&dates, date_format)?)?;

        let pressure = df
            .column(&schema.pressure)
            .with_context(|| format!("Column '{}' is missing", schema.pressure))?
            .as_materialized_series()
            .cast(&DataType::Float64)?;
        df.with_column(&pressure * pressure_factor)?;

        debug!(
            "Formatted '{}' as '{}' and scaled '{}' by {}",
            schema.date, date_format, schema.pressure, pressure_factor
        );
        Ok(df)
    }
}

/// Key column names in the owned form polars' subset arguments take.
pub(crate) fn key_subset(keys: &[&str]) -> Vec<String> {
    keys.iter().map(|k| k.to_string()).collect()
}
