//! Output of the cleaned table.
//!
//! The format follows the output extension: `.xlsx` goes through
//! `rust_xlsxwriter`, `.csv` through polars' `CsvWriter`. Neither writes an
//! index column.

use crate::config::CleaningConfig;
use crate::error::{CleaningError, Result, ResultExt};
use crate::utils::is_numeric_dtype;
use polars::prelude::*;
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::info;

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Xlsx,
    Csv,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match extension.as_deref() {
            Some("xlsx") => Ok(Self::Xlsx),
            Some("csv") => Ok(Self::Csv),
            other => Err(CleaningError::InvalidConfig(format!(
                "Unsupported output extension {:?} for {} (expected .xlsx or .csv)",
                other.unwrap_or(""),
                path.display()
            ))),
        }
    }
}

/// Writes the final table to disk.
pub struct TableWriter<'a> {
    config: &'a CleaningConfig,
}

impl<'a> TableWriter<'a> {
    pub fn new(config: &'a CleaningConfig) -> Self {
        Self { config }
    }

    /// Write `df` to `path`, replacing any existing file.
    pub fn write(&self, df: &DataFrame, path: &Path) -> Result<PathBuf> {
        let format = OutputFormat::from_path(path)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        match format {
            OutputFormat::Xlsx => self.write_xlsx(df, path)?,
            OutputFormat::Csv => self.write_csv(df, path)?,
        }

        info!(
            "Cleaned data saved: {} ({} rows x {} columns)",
            path.display(),
            df.height(),
            df.width()
        );
        Ok(path.to_path_buf())
    }

    fn write_xlsx(&self, df: &DataFrame, path: &Path) -> Result<()> {
        let mut workbook = Workbook::new();
        let header_format = Format::new().set_bold();

        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&self.config.output_sheet_name)?;

        for (col_idx, column) in df.get_columns().iter().enumerate() {
            let col = u16::try_from(col_idx).map_err(|_| {
                CleaningError::InvalidConfig(format!("Too many columns: {}", df.width()))
            })?;
            worksheet.write_string_with_format(0, col, column.name().as_str(), &header_format)?;
            write_column(worksheet, col, column.as_materialized_series())
                .context(format!("Writing column '{}'", column.name()))?;
        }

        workbook.save(path)?;
        Ok(())
    }

    fn write_csv(&self, df: &DataFrame, path: &Path) -> Result<()> {
        let mut file = File::create(path)?;
        let mut df = df.clone();
        CsvWriter::new(&mut file)
            .include_header(true)
            .with_separator(b',')
            .finish(&mut df)
            .context(format!("Writing {}", path.display()))?;
        Ok(())
    }
}

/// Write one column below the header row. Missing cells stay empty.
fn write_column(worksheet: &mut Worksheet, col: u16, series: &Series) -> Result<()> {
    let row_of = |idx: usize| -> Result<u32> {
        u32::try_from(idx + 1)
            .map_err(|_| CleaningError::InvalidConfig(format!("Too many rows: {}", idx + 1)))
    };

    match series.dtype() {
        DataType::Boolean => {
            for (idx, value) in series.bool()?.into_iter().enumerate() {
                if let Some(v) = value {
                    worksheet.write_boolean(row_of(idx)?, col, v)?;
                }
            }
        }
        dtype if is_numeric_dtype(dtype) => {
            let values = series.cast(&DataType::Float64)?;
            for (idx, value) in values.f64()?.into_iter().enumerate() {
                if let Some(v) = value {
                    worksheet.write_number(row_of(idx)?, col, v)?;
                }
            }
        }
        _ => {
            let values = series.cast(&DataType::String)?;
            for (idx, value) in values.str()?.into_iter().enumerate() {
                if let Some(v) = value {
                    worksheet.write_string(row_of(idx)?, col, v)?;
                }
            }
        }
    }
    Ok(())
}
