//! Text to typed conversions used by the type coercer and the normalizer.

use crate::utils::parse_finite_f64;
use anyhow::{Result, anyhow};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use std::fmt::Write;

/// `num_days_from_ce` of 1970-01-01, the origin of polars' Date type.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Parse a date with the first matching format.
///
/// Datetime formats are accepted too; only their date part is kept.
pub(crate) fn parse_date(value: &str, formats: &[String]) -> Option<NaiveDate> {
    let trimmed = value.trim();
    formats.iter().find_map(|format| {
        NaiveDate::parse_from_str(trimmed, format)
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(trimmed, format)
                    .ok()
                    .map(|dt| dt.date())
            })
    })
}

pub(crate) fn date_to_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

pub(crate) fn days_to_date(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days.checked_add(UNIX_EPOCH_DAYS_FROM_CE)?)
}

/// Convert a string series to Float64.
///
/// Returns the new series and how many present values failed to parse.
pub(crate) fn string_to_float(series: &Series) -> Result<(Series, usize)> {
    let str_series = series.str()?;
    let mut failures = 0usize;

    let values: Vec<Option<f64>> = str_series
        .into_iter()
        .map(|opt_val| {
            let val = opt_val?;
            let parsed = parse_finite_f64(val);
            if parsed.is_none() {
                failures += 1;
            }
            parsed
        })
        .collect();

    Ok((Series::new(series.name().clone(), values), failures))
}

/// Convert a string series to polars' Date type.
///
/// Returns the new series and how many present values matched no format.
pub(crate) fn string_to_date(series: &Series, formats: &[String]) -> Result<(Series, usize)> {
    let str_series = series.str()?;
    let mut failures = 0usize;

    let days: Vec<Option<i32>> = str_series
        .into_iter()
        .map(|opt_val| {
            let val = opt_val?;
            match parse_date(val, formats) {
                Some(date) => Some(date_to_days(date)),
                None => {
                    failures += 1;
                    None
                }
            }
        })
        .collect();

    let date_series = Series::new(series.name().clone(), days).cast(&DataType::Date)?;
    Ok((date_series, failures))
}

/// Render a Date series as text with a chrono format string.
pub(crate) fn date_to_string(series: &Series, format: &str) -> Result<Series> {
    let days = series.cast(&DataType::Int32)?;
    let mut values: Vec<Option<String>> = Vec::with_capacity(days.len());

    for opt_day in days.i32()?.into_iter() {
        let Some(day) = opt_day else {
            values.push(None);
            continue;
        };
        let date = days_to_date(day).ok_or_else(|| anyhow!("Day {} is out of range", day))?;
        let mut text = String::new();
        write!(text, "{}", date.format(format))
            .map_err(|_| anyhow!("Invalid date format '{}'", format))?;
        values.push(Some(text));
    }

    Ok(Series::new(series.name().clone(), values))
}
