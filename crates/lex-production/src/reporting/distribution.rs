//! Distribution data for the report.
//!
//! Density curves and box-plot statistics stand in for charts: they carry
//! the numbers a plot would draw, in a form that serializes.

use crate::profiler::statistics::{quantile, sample_std, sorted_copy};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Gaussian kernel density estimate of one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DensityCurve {
    pub column: String,
    /// When the sample was taken, e.g. "before_imputation".
    pub label: String,
    /// Kernel standard deviation.
    pub bandwidth: f64,
    pub x: Vec<f64>,
    pub density: Vec<f64>,
}

/// Box-plot statistics of one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxPlotSummary {
    pub column: String,
    pub count: usize,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    /// Lowest value within `q1 - 1.5 * IQR`.
    pub lower_whisker: f64,
    /// Highest value within `q3 + 1.5 * IQR`.
    pub upper_whisker: f64,
    /// Values beyond the whiskers.
    pub fliers: Vec<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DistributionReport {
    pub densities: Vec<DensityCurve>,
    pub box_plots: Vec<BoxPlotSummary>,
}

/// Estimate a density with Scott's rule over `[min - range/2, max + range/2]`.
///
/// `None` for fewer than two values or a constant sample.
pub fn kernel_density(
    column: &str,
    label: &str,
    values: &[f64],
    points: usize,
) -> Option<DensityCurve> {
    let n = values.len();
    let std = sample_std(values)?;
    if std == 0.0 || points < 2 {
        return None;
    }

    let bandwidth = std * (n as f64).powf(-0.2);
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    let start = min - range / 2.0;
    let step = (2.0 * range) / (points - 1) as f64;

    let norm = 1.0 / (n as f64 * bandwidth * (2.0 * PI).sqrt());
    let x: Vec<f64> = (0..points).map(|i| start + step * i as f64).collect();
    let density = x
        .iter()
        .map(|&xi| {
            norm * values
                .iter()
                .map(|&v| (-0.5 * ((xi - v) / bandwidth).powi(2)).exp())
                .sum::<f64>()
        })
        .collect();

    Some(DensityCurve {
        column: column.to_string(),
        label: label.to_string(),
        bandwidth,
        x,
        density,
    })
}

/// Box-plot statistics with linearly interpolated quartiles.
pub fn box_plot(column: &str, values: &[f64]) -> Option<BoxPlotSummary> {
    let sorted = sorted_copy(values);
    let q1 = quantile(&sorted, 0.25)?;
    let median = quantile(&sorted, 0.5)?;
    let q3 = quantile(&sorted, 0.75)?;
    let iqr = q3 - q1;
    let low_fence = q1 - 1.5 * iqr;
    let high_fence = q3 + 1.5 * iqr;

    let inside = || sorted.iter().copied().filter(|v| (low_fence..=high_fence).contains(v));
    let lower_whisker = inside().next().unwrap_or(q1);
    let upper_whisker = inside().last().unwrap_or(q3);
    let fliers = sorted
        .iter()
        .copied()
        .filter(|v| *v < low_fence || *v > high_fence)
        .collect();

    Some(BoxPlotSummary {
        column: column.to_string(),
        count: sorted.len(),
        q1,
        median,
        q3,
        lower_whisker,
        upper_whisker,
        fliers,
    })
}
