//! Moment and rank statistics polars does not provide as reductions.
//!
//! All functions take the observed (non-missing) values of a column; callers
//! strip missing entries with [`crate::utils::observed`]. Plain means and
//! medians come from `Series::mean` and `Series::median`.

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1 denominator).
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mean = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

/// Population standard deviation (n denominator).
fn population_std(values: &[f64]) -> Option<f64> {
    let mean = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    Some((ss / values.len() as f64).sqrt())
}

/// Adjusted Fisher-Pearson skewness (`G1`).
///
/// `None` with fewer than three values; a constant sample has skewness 0.
pub fn skewness(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 3 {
        return None;
    }
    let mean = mean(values)?;
    let nf = n as f64;
    let m2 = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / nf;
    if m2 <= f64::EPSILON * mean.abs().max(1.0) {
        return Some(0.0);
    }
    let m3 = values.iter().map(|v| (v - mean).powi(3)).sum::<f64>() / nf;
    let g1 = m3 / m2.powf(1.5);
    Some(g1 * (nf * (nf - 1.0)).sqrt() / (nf - 2.0))
}

/// Standard scores over the observed entries, using the population
/// standard deviation. Missing entries stay `None`; when the deviation is
/// zero every observed score is 0.
pub fn z_scores(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let observed: Vec<f64> = values.iter().flatten().copied().collect();
    let (Some(mean), Some(std)) = (mean(&observed), population_std(&observed)) else {
        return vec![None; values.len()];
    };

    values
        .iter()
        .map(|v| {
            v.map(|x| {
                if std == 0.0 {
                    0.0
                } else {
                    (x - mean) / std
                }
            })
        })
        .collect()
}

/// Quantile with linear interpolation between closest ranks.
///
/// `sorted` must be in ascending order.
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}

pub fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}
