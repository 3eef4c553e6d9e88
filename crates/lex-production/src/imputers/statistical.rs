//! Skewness-conditioned imputation of the production fields.
//!
//! Sparse gaps are filled with a single statistic: the median for skewed
//! columns, the mean otherwise. Columns missing more than the configured
//! share are filled by carrying observations forward, then backward.

use super::interpolation::fill_linear;
use crate::config::CleaningConfig;
use crate::profiler::statistics::skewness;
use crate::types::{ColumnImputation, ImputationMethod};
use crate::utils::{missing_count, observed};
use anyhow::{Context, Result};
use polars::prelude::*;
use tracing::{debug, warn};

/// Imputer for the oil and gas production columns.
pub struct ProductionImputer<'a> {
    config: &'a CleaningConfig,
}

impl<'a> ProductionImputer<'a> {
    pub fn new(config: &'a CleaningConfig) -> Self {
        Self { config }
    }

    /// Pick the method for a column. `None` when nothing is observed.
    pub fn choose_method(&self, values: &[Option<f64>]) -> Option<ImputationMethod> {
        let observed = observed(values);
        if observed.is_empty() {
            return None;
        }

        let missing_rate = missing_count(values) as f64 / values.len() as f64;
        if missing_rate >= self.config.missing_rate_threshold {
            return Some(ImputationMethod::ForwardBackwardFill);
        }

        match skewness(&observed) {
            Some(skew) if skew.abs() > self.config.skewness_threshold => {
                Some(ImputationMethod::Median { skewness: skew })
            }
            skew => Some(ImputationMethod::Mean { skewness: skew }),
        }
    }

    /// Impute a single column in place.
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

        let values: Vec<Option<f64>> = series.f64()?.into_iter().collect();
        let method = self.choose_method(&values);
        debug!(
            "'{}': {:.2}% missing, method {:?}",
            col_name,
            missing_rate * 100.0,
            method
        );

        let filled = match method {
            None => {
                if missing_before > 0 {
                    warn!("'{}' has no observed values; left unimputed", col_name);
                }
                series
            }
            Some(ImputationMethod::ForwardBackwardFill) => series
                .fill_null(FillNullStrategy::Forward(None))?
                .fill_null(FillNullStrategy::Backward(None))?,
            Some(ImputationMethod::Median { .. }) => match series.median() {
                Some(median) => fill_with_value(&series, median)?,
                None => series,
            },
            Some(ImputationMethod::Mean { .. }) => match series.mean() {
                Some(mean) => fill_with_value(&series, mean)?,
                None => series,
            },
            Some(ImputationMethod::LinearInterpolation) => fill_linear(&series)?,
        };

        let missing_after = filled.null_count();
        df.with_column(filled)?;

        Ok(ColumnImputation {
            column: col_name.to_string(),
            missing_before,
            missing_rate,
            method,
            missing_after,
        })
    }
}

fn fill_with_value(series: &Series, fill_value: f64) -> PolarsResult<Series> {
    Ok(series.f64()?.fill_null_with_values(fill_value)?.into_series())
}
