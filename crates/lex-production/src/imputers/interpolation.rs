//! Linear interpolation over row position.

use crate::types::{ColumnImputation, ImputationMethod};
use anyhow::{Context, Result};
use polars::prelude::*;
use tracing::{debug, warn};

/// Fill interior gaps linearly and repeat the last observation over a
/// trailing gap. A leading gap stays missing.
pub fn fill_linear(series: &Series) -> PolarsResult<Series> {
    polars::prelude::interpolate(series, InterpolationMethod::Linear)
        .fill_null(FillNullStrategy::Forward(None))
}

/// Like [`fill_linear`], but a leading gap takes the first observation too.
pub fn fill_linear_nearest_edges(series: &Series) -> PolarsResult<Series> {
    fill_linear(series)?.fill_null(FillNullStrategy::Backward(None))
}

/// Interpolating imputer for the sensor columns.
pub struct LinearInterpolator;

impl LinearInterpolator {
    /// Interpolate a single column in place.
    pub fn impute_column(&self, df: &mut DataFrame, col_name: &str) -> Result<ColumnImputation> {
        let series = df
            .column(col_name)
            .with_context(|| format!("Cannot read column '{}'", col_name))?
            .as_materialized_series()
            .cast(&DataType::Float64)?;
        let len = series.len();
        let missing_before = series.null_count();
        let missing_rate = if len == 0 {
            0.0
        } else {
            missing_before as f64 / len as f64
        };

        let filled = fill_linear(&series)?;
        let missing_after = filled.null_count();
        if missing_after == len && missing_before > 0 {
            warn!("'{}' has no observed values; left uninterpolated", col_name);
        } else if missing_after > 0 {
            debug!("'{}': {} leading value(s) left missing", col_name, missing_after);
        }
        df.with_column(filled)?;

        Ok(ColumnImputation {
            column: col_name.to_string(),
            missing_before,
            missing_rate,
            method: (missing_after < len).then_some(ImputationMethod::LinearInterpolation),
            missing_after,
        })
    }
}
