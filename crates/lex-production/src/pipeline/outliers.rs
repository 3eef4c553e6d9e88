//! Outlier handling module.
//!
//! Flags standard-score outliers on the monitored fields, marks rows where
//! several fields spike together as special events, and corrects the rest:
//! production values take the column mean, pressure is re-interpolated from
//! its neighbours.

use crate::config::CleaningConfig;
use crate::imputers::fill_linear_nearest_edges;
use crate::profiler::statistics::z_scores;
use crate::types::{FieldOutliers, OutlierReport};
use anyhow::{Context, Result};
use polars::prelude::*;
use tracing::{debug, info};

/// Outlier flags computed from one snapshot of the table.
#[derive(Debug, Clone, PartialEq)]
pub struct OutlierDetection {
    /// Monitored fields, in processing order.
    pub columns: Vec<String>,
    /// Per field, per row: `|z| > threshold`.
    pub flags: Vec<Vec<bool>>,
    /// Per row: enough fields flagged at once to be a special event.
    pub special_events: Vec<bool>,
    /// Snapshot mean and population standard deviation per field.
    pub stats: Vec<(Option<f64>, Option<f64>)>,
}

impl OutlierDetection {
    pub fn outlier_count(&self, field: usize) -> usize {
        self.flags[field].iter().filter(|&&f| f).count()
    }

    pub fn special_event_count(&self) -> usize {
        self.special_events.iter().filter(|&&s| s).count()
    }

    /// Rows of `field` that are outliers but not special events.
    pub fn correctable(&self, field: usize) -> Vec<bool> {
        self.flags[field]
            .iter()
            .zip(&self.special_events)
            .map(|(&flag, &special)| flag && !special)
            .collect()
    }
}

/// Handles outlier detection and treatment.
pub struct OutlierHandler<'a> {
    config: &'a CleaningConfig,
}

impl<'a> OutlierHandler<'a> {
    pub fn new(config: &'a CleaningConfig) -> Self {
        Self { config }
    }

    /// Flag outliers and special events without touching the table.
    pub fn detect(&self, df: &DataFrame) -> Result<OutlierDetection> {
        let columns: Vec<String> = self
            .config
            .schema
            .monitored_columns()
            .iter()
            .map(|s| s.to_string())
            .collect();

        let mut flags = Vec::with_capacity(columns.len());
        let mut stats = Vec::with_capacity(columns.len());
        for name in &columns {
            let series = float_series(df, name)?;
            stats.push((series.mean(), series.std(0)));
            let values: Vec<Option<f64>> = series.f64()?.into_iter().collect();
            flags.push(
                z_scores(&values)
                    .into_iter()
                    .map(|z| z.is_some_and(|z| z.abs() > self.config.zscore_threshold))
                    .collect::<Vec<bool>>(),
            );
        }

        let special_events = (0..df.height())
            .map(|row| {
                let hits = flags.iter().filter(|field: &&Vec<bool>| field[row]).count();
                hits >= self.config.special_event_min_fields
            })
            .collect();

        Ok(OutlierDetection {
            columns,
            flags,
            special_events,
            stats,
        })
    }

    /// Correct non-event outliers in place and add the special-event column.
    pub fn handle(&self, df: &mut DataFrame) -> Result<OutlierReport> {
        let detection = self.detect(df)?;
        let mut report = OutlierReport {
            fields: Vec::with_capacity(detection.columns.len()),
            special_events: detection.special_event_count(),
        };

        for (idx, name) in detection.columns.iter().enumerate() {
            let correctable =
                BooleanChunked::from_slice("correctable".into(), &detection.correctable(idx));
            let series = float_series(df, name)?;

            let corrected_series = if *name == self.config.schema.pressure {
                self.reinterpolate(&series, &correctable)?
            } else {
                self.replace_with_mean(&series, &correctable)?
            };
            let fixed = corrected_series.filter(&correctable)?;
            let corrected = fixed.len() - fixed.null_count();
            df.with_column(corrected_series)?;

            let (mean, std) = detection.stats[idx];
            info!(
                "Outliers in '{}': {} ({} corrected)",
                name,
                detection.outlier_count(idx),
                corrected
            );
            report.fields.push(FieldOutliers {
                column: name.clone(),
                mean,
                std,
                outliers: detection.outlier_count(idx),
                corrected,
            });
        }

        let flag = Series::new(
            self.config.schema.special_event.as_str().into(),
            detection.special_events,
        );
        df.with_column(flag)?;
        debug!("Flagged {} special event rows", report.special_events);

        Ok(report)
    }

    fn replace_with_mean(&self, series: &Series, correctable: &BooleanChunked) -> Result<Series> {
        let Some(fill) = series.mean() else {
            return Ok(series.clone());
        };
        let fill = Series::new(series.name().clone(), vec![fill; series.len()]);
        Ok(series.zip_with(&!correctable, &fill)?)
    }

    fn reinterpolate(&self, series: &Series, correctable: &BooleanChunked) -> Result<Series> {
        let blank = Series::full_null(series.name().clone(), series.len(), &DataType::Float64);
        let blanked = series.zip_with(&!correctable, &blank)?;
        let filled = fill_linear_nearest_edges(&blanked)?;
        Ok(series.zip_with(&!correctable, &filled)?)
    }
}

fn float_series(df: &DataFrame, name: &str) -> Result<Series> {
    let series = df
        .column(name)
        .with_context(|| format!("Cannot read column '{}'", name))?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    Ok(series)
}
