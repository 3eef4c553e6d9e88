//! Integration tests for the production cleaning pipeline.
//!
//! Each test writes an input workbook with `rust_xlsxwriter` into a temporary
//! directory, runs the pipeline end to end, and reads the output back.

use calamine::{Data, Reader, open_workbook_auto};
use lex_production::{
    CancellationToken, CleaningConfig, CleaningError, CleaningStage, Pipeline, ProgressUpdate,
    ReportGenerator,
};
use rust_xlsxwriter::Workbook;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

// ============================================================================
// Helper Functions
// ============================================================================

/// Write `lines` below a header into column A of sheet `sheet`.
/// Empty strings leave the cell blank.
fn write_input(dir: &TempDir, sheet: &str, lines: &[&str]) -> PathBuf {
    let path = dir.path().join("production_data_history.xlsx");
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet).unwrap();
    worksheet.write_string(0, 0, "raw").unwrap();
    for (idx, line) in lines.iter().enumerate() {
        if !line.is_empty() {
            worksheet.write_string(idx as u32 + 1, 0, *line).unwrap();
        }
    }
    workbook.save(&path).unwrap();
    path
}

fn config_with_output(output: &Path) -> CleaningConfig {
    CleaningConfig::builder().output_path(output).build().unwrap()
}

fn read_rows(path: &Path, sheet: &str) -> Vec<Vec<Data>> {
    let mut workbook = open_workbook_auto(path).unwrap();
    let range = workbook.worksheet_range(sheet).unwrap();
    range.rows().map(|r| r.to_vec()).collect()
}

fn column_index(rows: &[Vec<Data>], name: &str) -> usize {
    rows[0]
        .iter()
        .position(|cell| *cell == Data::String(name.to_string()))
        .unwrap_or_else(|| panic!("column {} not in header", name))
}

fn float_at(rows: &[Vec<Data>], row: usize, column: &str) -> Option<f64> {
    match &rows[row][column_index(rows, column)] {
        Data::Float(v) => Some(*v),
        Data::Int(v) => Some(*v as f64),
        Data::Empty => None,
        other => panic!("unexpected cell {:?} in {}", other, column),
    }
}

fn text_at(rows: &[Vec<Data>], row: usize, column: &str) -> Option<String> {
    match &rows[row][column_index(rows, column)] {
        Data::String(s) => Some(s.clone()),
        Data::Empty => None,
        other => Some(other.to_string()),
    }
}

/// Consecutive daily records of one well.
fn daily_lines(count: usize, row: impl Fn(usize) -> String) -> Vec<String> {
    (0..count).map(row).collect()
}

// ============================================================================
// Scenario Tests
// ============================================================================

#[test]
fn test_sparse_low_skew_gap_filled_with_mean() {
    let dir = tempfile::tempdir().unwrap();
    // 25 rows, one missing oil value (4%), oil alternating 98 / 102
    let lines = daily_lines(25, |i| {
        if i == 0 {
            "2023-01-01,W1,,120,30,5,200,80".to_string()
        } else {
            let oil = if i % 2 == 0 { 98 } else { 102 };
            format!("2023-01-{:02},W1,{},120,30,5,200,80", i + 1, oil)
        }
    });
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    let input = write_input(&dir, "in", &refs);
    let output = dir.path().join("cleaned.xlsx");

    let result = Pipeline::builder()
        .config(config_with_output(&output))
        .build()
        .unwrap()
        .process_file(&input)
        .unwrap();

    let oil = result
        .imputations
        .iter()
        .find(|i| i.column == "Oil_Production")
        .unwrap();
    assert!(matches!(
        oil.method,
        Some(lex_production::ImputationMethod::Mean { .. })
    ));

    let rows = read_rows(&output, "cleaned");
    assert_eq!(rows.len(), 26);
    assert_eq!(text_at(&rows, 1, "Date").as_deref(), Some("2023-01-01"));
    assert_eq!(float_at(&rows, 1, "Oil_Production"), Some(100.0));
    assert_eq!(rows[1][column_index(&rows, "Special_Event")], Data::Bool(false));
}

#[test]
fn test_single_field_gas_spike_replaced_by_mean() {
    let dir = tempfile::tempdir().unwrap();
    // gas row 9 has a standard score of exactly 3
    let lines = daily_lines(10, |i| {
        let gas = if i == 9 { 130 } else { 100 };
        format!("2023-02-{:02},W7,50,{},30,5,200,80", i + 1, gas)
    });
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    let input = write_input(&dir, "in", &refs);
    let output = dir.path().join("cleaned.xlsx");

    let result = Pipeline::builder()
        .config(config_with_output(&output))
        .build()
        .unwrap()
        .process_file(&input)
        .unwrap();

    assert_eq!(result.outliers.special_events, 0);
    let gas = result.outliers.field("Gas_Production").unwrap();
    assert_eq!((gas.outliers, gas.corrected), (1, 1));

    let rows = read_rows(&output, "cleaned");
    assert_eq!(float_at(&rows, 10, "Gas_Production"), Some(103.0));
    let flag = column_index(&rows, "Special_Event");
    assert!(rows[1..].iter().all(|r| r[flag] == Data::Bool(false)));
}

// ============================================================================
// Invariant Tests
// ============================================================================

fn messy_lines() -> Vec<&'static str> {
    vec![
        "2023-01-01,W1,100,1000,30,5,200,80",
        "2023-01-02,W1,abc,1010,31,5,nan,81",
        "2023-01-02,W1,101,1011,31,5,201,81",
        "2023-01-03,W1,102,1020,32,5,202,82",
        "garbage line",
        "",
        "2023-01-04,,103,1030,33,5,203,83",
        "not-a-date,W2,104,1040,34,5,204,84",
        "2023-01-05,W1,105,1050,,,,",
        "2023-01-06,W1,106,1060,36,5,206,86",
    ]
}

#[test]
fn test_messy_sheet_invariants() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(&dir, "in", &messy_lines());
    let output = dir.path().join("out").join("cleaned.xlsx");

    let result = Pipeline::builder()
        .config(config_with_output(&output))
        .build()
        .unwrap()
        .process_file(&input)
        .unwrap();

    let summary = &result.summary;
    assert_eq!(summary.rows_quarantined, 1);
    assert_eq!(summary.quarantined[0].line, 6);
    assert_eq!(summary.quarantined[0].raw, "garbage line");
    assert_eq!(summary.rows_loaded, 9);
    assert_eq!(summary.rows_removed_sparse, 1);
    assert_eq!(summary.rows_removed_missing_keys, 2);
    assert_eq!(summary.duplicates_before, 1);
    assert_eq!(summary.duplicates_after, 0);
    assert_eq!(summary.column("Oil_Production").unwrap().parse_failures, 1);
    assert_eq!(summary.column("Date").unwrap().parse_failures, 1);

    let rows = read_rows(&output, "cleaned");
    let header: Vec<String> = rows[0].iter().map(|c| c.to_string()).collect();
    assert_eq!(
        header,
        vec![
            "Date",
            "Well_ID",
            "Oil_Production",
            "Gas_Production",
            "Water_Production",
            "Choke_Size",
            "Pressure",
            "Temperature",
            "Special_Event",
        ]
    );

    let dates: Vec<String> = (1..rows.len())
        .map(|r| text_at(&rows, r, "Date").unwrap())
        .collect();
    assert_eq!(
        dates,
        vec!["2023-01-01", "2023-01-02", "2023-01-03", "2023-01-05", "2023-01-06"]
    );

    // (Date, Well_ID) unique
    let mut keys = HashSet::new();
    for r in 1..rows.len() {
        assert!(keys.insert((text_at(&rows, r, "Date"), text_at(&rows, r, "Well_ID"))));
    }

    for r in 1..rows.len() {
        // numeric cells are finite or empty
        for column in [
            "Oil_Production",
            "Gas_Production",
            "Water_Production",
            "Choke_Size",
            "Pressure",
            "Temperature",
        ] {
            if let Some(v) = float_at(&rows, r, column) {
                assert!(v.is_finite());
            }
        }
        // production has no gaps
        assert!(float_at(&rows, r, "Oil_Production").is_some());
        assert!(float_at(&rows, r, "Gas_Production").is_some());
        // at least 70% of the eight record fields present
        let present = rows[r][..8].iter().filter(|c| **c != Data::Empty).count();
        assert!(present as f64 >= 0.7 * 8.0, "row {} has {} fields", r, present);
    }

    // the first duplicate wins, its unparsable oil was forward filled
    assert_eq!(float_at(&rows, 2, "Gas_Production"), Some(1010.0));
    assert_eq!(float_at(&rows, 2, "Oil_Production"), Some(100.0));

    // bar to psi
    let pressure = float_at(&rows, 1, "Pressure").unwrap();
    assert!((pressure - 200.0 * 14.5038).abs() < 1e-6);
    // the kept duplicate had "nan" pressure, interpolated between 200 and 201
    let interpolated = float_at(&rows, 2, "Pressure").unwrap();
    assert!((interpolated - 200.5 * 14.5038).abs() < 1e-6);
}

#[test]
fn test_rerun_is_not_a_fixed_point() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(&dir, "in", &messy_lines());
    let output = dir.path().join("cleaned.xlsx");
    let config = config_with_output(&output);

    let first = Pipeline::builder()
        .config(config.clone())
        .build()
        .unwrap()
        .process_file(&input)
        .unwrap();
    let first_pressure = first
        .data
        .column("Pressure")
        .unwrap()
        .as_materialized_series()
        .f64()
        .unwrap()
        .get(0);

    // feed the cleaned rows back through as raw lines
    let rows = read_rows(&output, "cleaned");
    let lines: Vec<String> = rows[1..]
        .iter()
        .map(|r| {
            r[..8]
                .iter()
                .map(|c| match c {
                    Data::Empty => String::new(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(",")
        })
        .collect();
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    let second_dir = tempfile::tempdir().unwrap();
    let second_input = write_input(&second_dir, "in", &refs);
    let second_output = second_dir.path().join("cleaned.xlsx");

    let second = Pipeline::builder()
        .config(config_with_output(&second_output))
        .build()
        .unwrap()
        .process_file(&second_input)
        .unwrap();
    let second_pressure = second
        .data
        .column("Pressure")
        .unwrap()
        .as_materialized_series()
        .f64()
        .unwrap()
        .get(0);

    let (first_pressure, second_pressure) = (first_pressure.unwrap(), second_pressure.unwrap());
    assert!((second_pressure - first_pressure * 14.5038).abs() < 1e-3);
}

// ============================================================================
// Output and Report Tests
// ============================================================================

#[test]
fn test_csv_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(&dir, "in", &messy_lines());
    let output = dir.path().join("cleaned.csv");

    let result = Pipeline::builder()
        .config(config_with_output(&output))
        .build()
        .unwrap()
        .process_file(&input)
        .unwrap();

    assert_eq!(result.output_path.as_deref(), Some(output.as_path()));
    let text = std::fs::read_to_string(&output).unwrap();
    let mut lines = text.lines();
    assert_eq!(
        lines.next(),
        Some("Date,Well_ID,Oil_Production,Gas_Production,Water_Production,Choke_Size,Pressure,Temperature,Special_Event")
    );
    assert!(lines.next().unwrap().starts_with("2023-01-01,W1,100.0,1000.0,"));
    assert_eq!(text.lines().count(), 6);
}

#[test]
fn test_report_written_with_distributions() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(&dir, "in", &messy_lines());
    let output = dir.path().join("cleaned.xlsx");
    let config = config_with_output(&output);

    let result = Pipeline::builder()
        .config(config.clone())
        .build()
        .unwrap()
        .process_file(&input)
        .unwrap();
    let report = ReportGenerator::build_report(&input.display().to_string(), &result, &config);
    let path = ReportGenerator::new(dir.path().to_path_buf())
        .write_report_to_file(&report, "production_data_history")
        .unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(json["processing_summary"]["rows_after"], 5);
    assert_eq!(json["outliers"]["fields"].as_array().unwrap().len(), 3);
    assert_eq!(json["distributions"]["box_plots"].as_array().unwrap().len(), 3);
    assert_eq!(json["imputations"][0]["method"]["method"], "forward_backward_fill");
    assert!(json["summary"]["quarantined"][0]["raw"] == "garbage line");
}

// ============================================================================
// Error and Cancellation Tests
// ============================================================================

#[test]
fn test_missing_sheet() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(&dir, "Sheet1", &messy_lines());
    let output = dir.path().join("cleaned.xlsx");

    let err = Pipeline::builder()
        .config(config_with_output(&output))
        .build()
        .unwrap()
        .process_file(&input)
        .unwrap_err();

    match err {
        CleaningError::SheetNotFound { sheet, available } => {
            assert_eq!(sheet, "in");
            assert_eq!(available, vec!["Sheet1".to_string()]);
        }
        other => panic!("expected SheetNotFound, got {:?}", other),
    }
    assert!(!output.exists());
}

#[test]
fn test_missing_input_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = Pipeline::builder()
        .config(config_with_output(&dir.path().join("cleaned.xlsx")))
        .build()
        .unwrap()
        .process_file(dir.path().join("absent.xlsx"))
        .unwrap_err();

    assert_eq!(err.error_code(), "WORKBOOK_ERROR");
}

#[test]
fn test_cancelled_run_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(&dir, "in", &messy_lines());
    let output = dir.path().join("cleaned.xlsx");

    let token = CancellationToken::new();
    token.cancel();
    let updates: Arc<Mutex<Vec<ProgressUpdate>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = updates.clone();

    let result = Pipeline::builder()
        .config(config_with_output(&output))
        .cancellation_token(token)
        .on_progress(move |update| sink.lock().unwrap().push(update))
        .build()
        .unwrap()
        .process_file(&input);

    assert!(matches!(result, Err(CleaningError::Cancelled)));
    assert!(!output.exists());
    let updates = updates.lock().unwrap();
    assert_eq!(updates.last().map(|u| u.stage), Some(CleaningStage::Cancelled));
}

#[test]
fn test_progress_reaches_completion() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(&dir, "in", &messy_lines());
    let output = dir.path().join("cleaned.xlsx");

    let progress: Arc<Mutex<Vec<f32>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = progress.clone();

    Pipeline::builder()
        .config(config_with_output(&output))
        .on_progress(move |update| sink.lock().unwrap().push(update.progress))
        .build()
        .unwrap()
        .process_file(&input)
        .unwrap();

    let progress = progress.lock().unwrap();
    assert!(progress.windows(2).all(|w| w[1] >= w[0]));
    assert_eq!(progress.last(), Some(&1.0));
}

// ============================================================================
// CLI Tests
// ============================================================================

#[test]
fn test_cli_json_with_emit_report_writes_report() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(&dir, "in", &messy_lines());
    let output = dir.path().join("out").join("cleaned.xlsx");

    let run = std::process::Command::new(env!("CARGO_BIN_EXE_lex-production"))
        .arg("--input")
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .arg("--json")
        .arg("--emit-report")
        .env_remove("RUST_LOG")
        .output()
        .unwrap();
    assert!(run.status.success(), "{}", String::from_utf8_lossy(&run.stderr));

    // stdout carries only the JSON report
    let printed: serde_json::Value = serde_json::from_slice(&run.stdout).unwrap();
    assert_eq!(printed["processing_summary"]["rows_after"], 5);

    let report_path = dir
        .path()
        .join("out")
        .join("production_data_history_report.json");
    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(report_path).unwrap()).unwrap();
    assert_eq!(written["processing_summary"], printed["processing_summary"]);
    assert!(output.exists());
}
