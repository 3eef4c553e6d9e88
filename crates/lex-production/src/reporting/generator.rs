use crate::config::CleaningConfig;
use crate::reporting::distribution::DistributionReport;
use crate::types::{CleaningResult, CleaningSummary, ColumnImputation, OutlierReport};
use anyhow::Result;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

// ============================================================================
// Report Types
// ============================================================================

/// Report of one cleaning run.
///
/// Used for JSON output (`--json`), the report file (`--emit-report`) and
/// programmatic access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningReport {
    /// Timestamp when the report was generated
    pub generated_at: String,
    pub input_file: String,
    /// Path to the output file (if written)
    pub output_file: Option<String>,

    pub processing_summary: ProcessingSummaryReport,
    pub imputations: Vec<ColumnImputation>,
    pub outliers: OutlierReport,
    pub distributions: DistributionReport,

    /// Human-readable list of actions, in execution order
    pub cleaning_actions: Vec<String>,
    /// Full structured summary
    pub summary: CleaningSummary,
    /// Configuration the run used
    pub config: CleaningConfig,
}

/// Row accounting of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingSummaryReport {
    pub duration_ms: u64,
    pub rows_loaded: usize,
    pub rows_quarantined: usize,
    pub rows_after: usize,
    pub rows_removed: usize,
    pub rows_removed_percent: f32,
    pub duplicates_before: usize,
    pub duplicates_after: usize,
    pub special_events: usize,
    pub warnings: Vec<String>,
}

/// Builds and writes [`CleaningReport`]s.
pub struct ReportGenerator {
    output_dir: PathBuf,
}

impl ReportGenerator {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }

    pub fn build_report(
        input_file: &str,
        result: &CleaningResult,
        config: &CleaningConfig,
    ) -> CleaningReport {
        let summary = &result.summary;

        let processing_summary = ProcessingSummaryReport {
            duration_ms: summary.duration_ms,
            rows_loaded: summary.rows_loaded,
            rows_quarantined: summary.rows_quarantined,
            rows_after: summary.rows_after,
            rows_removed: summary.rows_removed(),
            rows_removed_percent: summary.rows_removed_percentage(),
            duplicates_before: summary.duplicates_before,
            duplicates_after: summary.duplicates_after,
            special_events: summary.special_events,
            warnings: summary.warnings.clone(),
        };

        let cleaning_actions = summary
            .actions
            .iter()
            .map(|a| format!("[{}] {}: {}", a.action_type.display_name(), a.target, a.description))
            .collect();

        CleaningReport {
            generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            input_file: input_file.to_string(),
            output_file: result
                .output_path
                .as_ref()
                .map(|p| p.display().to_string()),
            processing_summary,
            imputations: result.imputations.clone(),
            outliers: result.outliers.clone(),
            distributions: result.distributions.clone(),
            cleaning_actions,
            summary: summary.clone(),
            config: config.clone(),
        }
    }

    /// Write a report to `<base_name>_report.json` in the output directory.
    pub fn write_report_to_file(
        &self,
        report: &CleaningReport,
        report_base_name: &str,
    ) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;

        let report_path = self
            .output_dir
            .join(format!("{}_report.json", report_base_name));
        let mut file = File::create(&report_path)?;
        file.write_all(serde_json::to_string_pretty(report)?.as_bytes())?;

        info!("Report saved: {}", report_path.display());

        Ok(report_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ActionType, CleaningAction};
    use polars::prelude::*;

    fn sample_result() -> CleaningResult {
        let mut summary = CleaningSummary::new();
        summary.rows_loaded = 10;
        summary.rows_after = 8;
        summary.duplicates_before = 2;
        summary.add_action(CleaningAction::new(
            ActionType::DuplicatesRemoved,
            "dataset",
            "Removed 2 duplicate rows",
        ));

        CleaningResult {
            data: df!["Well_ID" => ["W1"]].unwrap(),
            summary,
            imputations: Vec::new(),
            outliers: OutlierReport::default(),
            distributions: DistributionReport::default(),
            output_path: Some(PathBuf::from("out/cleaned.xlsx")),
        }
    }

    #[test]
    fn test_build_report() {
        let config = CleaningConfig::default();
        let report = ReportGenerator::build_report("in.xlsx", &sample_result(), &config);

        assert_eq!(report.input_file, "in.xlsx");
        assert_eq!(report.output_file.as_deref(), Some("out/cleaned.xlsx"));
        assert_eq!(report.processing_summary.rows_removed, 2);
        assert!((report.processing_summary.rows_removed_percent - 20.0).abs() < 1e-4);
        assert_eq!(
            report.cleaning_actions,
            vec!["[Duplicates Removed] dataset: Removed 2 duplicate rows".to_string()]
        );
    }

    #[test]
    fn test_write_report_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = CleaningConfig::default();
        let report = ReportGenerator::build_report("in.xlsx", &sample_result(), &config);

        let path = ReportGenerator::new(dir.path().join("reports"))
            .write_report_to_file(&report, "production")
            .unwrap();

        assert_eq!(path.file_name().unwrap(), "production_report.json");
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["processing_summary"]["rows_after"], 8);
        assert_eq!(json["config"]["sheet_name"], "in");
    }
}
