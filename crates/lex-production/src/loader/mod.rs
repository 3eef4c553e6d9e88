//! Workbook loading.
//!
//! The raw sheet holds one delimited text line per row in its first column.
//! [`WorkbookLoader`] reads that column with `calamine` and splits every line
//! into the eight named fields of a production record, all kept as text.
//! Typing happens later in [`crate::cleaner::TypeCoercer`].

use crate::config::CleaningConfig;
use crate::error::{CleaningError, Result};
use crate::types::{ProductionSchema, QuarantinedRow};
use crate::utils::is_missing_marker;
use calamine::{Data, Reader, open_workbook_auto};
use polars::prelude::*;
use std::path::Path;
use tracing::{debug, info, warn};

/// Raw table produced by the loader.
#[derive(Debug, Clone)]
pub struct LoadedSheet {
    /// Eight String columns named after the schema fields.
    pub data: DataFrame,
    /// Rows refused because they did not split into eight fields.
    pub quarantined: Vec<QuarantinedRow>,
    /// Data rows read from the sheet, header excluded.
    pub rows_read: usize,
}

/// Reads the raw sheet and splits its lines into fields.
pub struct WorkbookLoader<'a> {
    config: &'a CleaningConfig,
}

impl<'a> WorkbookLoader<'a> {
    pub fn new(config: &'a CleaningConfig) -> Self {
        Self { config }
    }

    /// Open the workbook at `path` and load the configured sheet.
    ///
    /// Any format `calamine` detects from the extension is accepted.
    pub fn load(&self, path: &Path) -> Result<LoadedSheet> {
        info!("Reading sheet '{}' from {}", self.config.sheet_name, path.display());

        let mut workbook = open_workbook_auto(path)?;
        let sheet_names = workbook.sheet_names();
        if !sheet_names.iter().any(|name| name == &self.config.sheet_name) {
            return Err(CleaningError::SheetNotFound {
                sheet: self.config.sheet_name.clone(),
                available: sheet_names,
            });
        }

        let range = workbook.worksheet_range(&self.config.sheet_name)?;
        let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);

        let lines: Vec<String> = range
            .rows()
            .map(|row| row.first().map(cell_text).unwrap_or_default())
            .collect();
        debug!("Sheet '{}' has {} rows", self.config.sheet_name, lines.len());

        let (first_line, data_lines) = if self.config.has_header && !lines.is_empty() {
            (first_row + 2, &lines[1..])
        } else {
            (first_row + 1, &lines[..])
        };

        self.parse_lines(data_lines, first_line)
    }

    /// Split already-extracted lines into the eight raw fields.
    ///
    /// `first_line` is the 1-based sheet row of `lines[0]`, used to label
    /// quarantined rows.
    pub fn parse_lines<S: AsRef<str>>(&self, lines: &[S], first_line: usize) -> Result<LoadedSheet> {
        let schema = &self.config.schema;
        let mut fields: Vec<Vec<Option<String>>> =
            vec![Vec::with_capacity(lines.len()); ProductionSchema::FIELD_COUNT];
        let mut quarantined = Vec::new();

        for (idx, line) in lines.iter().enumerate() {
            let text = line.as_ref();
            let line_no = first_line + idx;

            if text.trim().is_empty() {
                for column in fields.iter_mut() {
                    column.push(None);
                }
                continue;
            }

            let parts: Vec<&str> = text.split(self.config.delimiter).collect();
            if parts.len() != ProductionSchema::FIELD_COUNT {
                warn!(
                    "Quarantined row {}: expected {} fields, found {}",
                    line_no,
                    ProductionSchema::FIELD_COUNT,
                    parts.len()
                );
                quarantined.push(QuarantinedRow {
                    line: line_no,
                    raw: text.to_string(),
                    field_count: parts.len(),
                });
                continue;
            }

            for (column, part) in fields.iter_mut().zip(parts) {
                column.push(normalize_field(part));
            }
        }

        let columns: Vec<Column> = schema
            .field_names()
            .into_iter()
            .zip(fields)
            .map(|(name, values)| Series::new(name.into(), values).into())
            .collect();
        let data = DataFrame::new(columns)?;

        info!(
            "Loaded {} rows ({} quarantined)",
            data.height(),
            quarantined.len()
        );

        Ok(LoadedSheet {
            data,
            quarantined,
            rows_read: lines.len(),
        })
    }
}

fn normalize_field(raw: &str) -> Option<String> {
    if is_missing_marker(raw) {
        None
    } else {
        Some(raw.trim().to_string())
    }
}

/// Render a cell as the text a string-typed read would produce.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        other => other.to_string(),
    }
}
