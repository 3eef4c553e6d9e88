//! Shared utilities for the cleaning pipeline.
//!
//! Helpers for recognising missing markers, parsing measures and reading a
//! float column out of a `DataFrame`.

use polars::prelude::*;

// =============================================================================
// String Parsing Utilities
// =============================================================================

/// Literal text a spreadsheet export leaves behind for an empty number.
pub const MISSING_MARKER: &str = "nan";

/// Check whether a trimmed raw field encodes a missing value.
///
/// # Example
///
/// ```rust,ignore
/// use lex_production::utils::is_missing_marker;
///
/// assert!(is_missing_marker(""));
/// assert!(is_missing_marker("nan"));
/// assert!(!is_missing_marker("0"));
/// ```
pub fn is_missing_marker(s: &str) -> bool {
    let trimmed = s.trim();
    trimmed.is_empty() || trimmed == MISSING_MARKER
}

/// Parse a measure. Anything that is not a finite number is `None`.
pub fn parse_finite_f64(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

// =============================================================================
// Column Access Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Read a column as `Option<f64>` values, casting it to Float64 first.
pub fn float_values(df: &DataFrame, column: &str) -> PolarsResult<Vec<Option<f64>>> {
    let series = df
        .column(column)?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    Ok(series.f64()?.into_iter().collect())
}

/// The observed (non-missing) values of a column, in order.
pub fn observed(values: &[Option<f64>]) -> Vec<f64> {
    values.iter().flatten().copied().collect()
}

/// Count missing entries.
pub fn missing_count(values: &[Option<f64>]) -> usize {
    values.iter().filter(|v| v.is_none()).count()
}

// =============================================================================
// Tests
// =============================================================================
