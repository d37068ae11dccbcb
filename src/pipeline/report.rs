use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use uuid::Uuid;

use crate::config::MaskingConfig;
use crate::domain::{Dataset, PiiCategory};
use crate::pipeline::processing::clean::CleanSummary;
use crate::pipeline::processing::mask::{self, MaskSummary};
use crate::pipeline::processing::pii::{column_risks, Certainty, ExposureReport, RiskLevel};
use crate::pipeline::processing::profile::ProfileReport;
use crate::pipeline::processing::validate::{Severity, ValidationOutcome};

const RULE_WIDTH: usize = 60;

/// Terminal result of a pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RunOutcome {
    Saved,
    Aborted { reason: String },
}

/// One ok/fail log entry inside a stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageEvent {
    pub message: String,
    pub ok: bool,
}

/// Metrics and events for one stage of the run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageReport {
    pub stage: String,
    pub rows_affected: usize,
    pub warnings: usize,
    pub criticals: usize,
    pub events: Vec<StageEvent>,
}

/// The running execution report: created at pipeline start, appended to by
/// every stage, finalized exactly once at a terminal state. One instance
/// per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub stages: Vec<StageReport>,
    pub outcome: Option<RunOutcome>,
}

impl ExecutionReport {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            stages: Vec::new(),
            outcome: None,
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.outcome.is_some()
    }

    /// Open a new stage section; subsequent events land in it
    pub fn begin_stage(&mut self, name: &str) {
        debug_assert!(!self.is_finalized(), "report already finalized");
        self.stages.push(StageReport {
            stage: name.to_string(),
            rows_affected: 0,
            warnings: 0,
            criticals: 0,
            events: Vec::new(),
        });
    }

    /// Log an event inside the current stage
    pub fn event(&mut self, message: impl Into<String>, ok: bool) {
        debug_assert!(!self.is_finalized(), "report already finalized");
        if let Some(stage) = self.stages.last_mut() {
            stage.events.push(StageEvent {
                message: message.into(),
                ok,
            });
        }
    }

    /// Record the current stage's counters
    pub fn stage_counts(&mut self, rows_affected: usize, warnings: usize, criticals: usize) {
        debug_assert!(!self.is_finalized(), "report already finalized");
        if let Some(stage) = self.stages.last_mut() {
            stage.rows_affected = rows_affected;
            stage.warnings = warnings;
            stage.criticals = criticals;
        }
    }

    /// Close the report at a terminal state. Further appends are rejected.
    pub fn finalize(&mut self, outcome: RunOutcome) {
        debug_assert!(!self.is_finalized(), "report already finalized");
        self.finished_at = Some(Utc::now());
        self.outcome = Some(outcome);
    }

    pub fn duration_seconds(&self) -> f64 {
        let end = self.finished_at.unwrap_or_else(Utc::now);
        (end - self.started_at).num_milliseconds() as f64 / 1000.0
    }

    pub fn total_warnings(&self) -> usize {
        self.stages.iter().map(|s| s.warnings).sum()
    }

    pub fn total_criticals(&self) -> usize {
        self.stages.iter().map(|s| s.criticals).sum()
    }
}

impl Default for ExecutionReport {
    fn default() -> Self {
        Self::new()
    }
}

fn heading(out: &mut String, title: &str) {
    let _ = writeln!(out, "{}", title);
    let _ = writeln!(out, "{}", "=".repeat(RULE_WIDTH));
    let _ = writeln!(out);
}

fn section(out: &mut String, title: &str) {
    let _ = writeln!(out, "{}", title);
    let _ = writeln!(out, "{}", "-".repeat(RULE_WIDTH));
}

/// Render the Load-time quality profile
pub fn render_quality_profile(profile: &ProfileReport) -> String {
    let mut out = String::new();
    heading(&mut out, "DATA QUALITY PROFILE REPORT");
    let _ = writeln!(
        out,
        "Rows: {}   Columns: {}",
        profile.total_rows, profile.total_columns
    );
    let _ = writeln!(out);

    section(&mut out, "COMPLETENESS:");
    for col in &profile.columns {
        let status = if col.missing == 0 {
            "OK".to_string()
        } else {
            format!("{} missing", col.missing)
        };
        let _ = writeln!(
            out,
            "  - {}: {}%  ({})",
            col.name, col.completeness_pct, status
        );
    }
    let _ = writeln!(out);

    section(&mut out, "DATA TYPES (detected vs expected):");
    for col in &profile.columns {
        let status = if col.conforms { "OK" } else { "MISMATCH" };
        let _ = writeln!(out, "  - {}: {} [{}]", col.name, col.expected, status);
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "END OF REPORT");
    out
}

/// Render the Clean stage's action log
pub fn render_cleaning_log(summary: &CleanSummary, total_rows: usize) -> String {
    let mut out = String::new();
    heading(&mut out, "DATA CLEANING LOG");

    section(&mut out, "SUMMARY:");
    let _ = writeln!(
        out,
        "  - Phone formats normalized:  {} value(s)",
        summary.phones_normalized
    );
    let _ = writeln!(
        out,
        "  - Date formats normalized:   {} value(s)",
        summary.dates_normalized
    );
    let _ = writeln!(
        out,
        "  - Name casing fixed:         {} value(s)",
        summary.names_cased
    );
    let _ = writeln!(
        out,
        "  - Email casing fixed:        {} value(s)",
        summary.emails_lowercased
    );
    let _ = writeln!(
        out,
        "  - Status casing fixed:       {} value(s)",
        summary.statuses_normalized
    );
    let _ = writeln!(
        out,
        "  - Invalid dates flagged:     {} value(s)",
        summary.invalid_dates_flagged
    );
    let _ = writeln!(
        out,
        "  - Missing values filled:     {} field(s)",
        summary.total_missing_filled()
    );
    let _ = writeln!(out);

    if !summary.missing_filled.is_empty() {
        section(&mut out, "MISSING VALUE STRATEGY:");
        let _ = writeln!(out, "  string fields  -> '[UNKNOWN]'");
        let _ = writeln!(out, "  numeric fields -> 0");
        let _ = writeln!(out, "  enum fields    -> 'unknown'");
        for (col, count) in &summary.missing_filled {
            let _ = writeln!(out, "  - {}: {} value(s) filled", col, count);
        }
        let _ = writeln!(out);
    }

    if !summary.needs_review_rows.is_empty() {
        section(&mut out, "ROWS FLAGGED FOR HUMAN REVIEW:");
        let rows: Vec<String> = summary
            .needs_review_rows
            .iter()
            .map(|r| (r + 1).to_string())
            .collect();
        let _ = writeln!(out, "  Row(s) {} hold an unparseable date", rows.join(", "));
        let _ = writeln!(out);
    }

    section(&mut out, "COMPLETE ACTION LOG (all changes):");
    for (i, action) in summary.actions.iter().enumerate() {
        let _ = writeln!(out, "  {:>3}. [{}] {}", i + 1, action.category, action.detail);
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "Rows processed: {}", total_rows);
    let _ = writeln!(out, "END OF REPORT");
    out
}

/// Render the Validate stage's verdicts
pub fn render_validation_results(outcome: &ValidationOutcome) -> String {
    let mut out = String::new();
    heading(&mut out, "VALIDATION RESULTS");

    section(&mut out, "SUMMARY:");
    let _ = writeln!(out, "  Total rows:            {}", outcome.total_rows);
    let _ = writeln!(out, "  PASS (all checks):     {} row(s)", outcome.rows_passed);
    let _ = writeln!(
        out,
        "  Warnings only:         {} row(s)",
        outcome.rows_with_warnings
    );
    let _ = writeln!(
        out,
        "  Critical failures:     {} row(s)",
        outcome.rows_with_criticals
    );
    let _ = writeln!(out, "  Individual warnings:   {}", outcome.warning_count);
    let _ = writeln!(out, "  Individual criticals:  {}", outcome.critical_count);
    let _ = writeln!(out);

    section(&mut out, "FAILURES BY COLUMN:");
    if outcome.failures_by_field.is_empty() {
        let _ = writeln!(out, "  No failures recorded");
    }
    for (col, failures) in &outcome.failures_by_field {
        let _ = writeln!(out, "\n{}: {} failure(s)", col, failures.len());
        for f in failures {
            let tag = match f.severity {
                Severity::Warning => "WARN",
                Severity::Critical => "CRIT",
            };
            let _ = writeln!(
                out,
                "  - [{}] Row {} (customer_id={}): {}",
                tag, f.row, f.customer_id, f.reason
            );
        }
    }
    let _ = writeln!(out);

    section(&mut out, "ROW-BY-ROW PASS/FAIL:");
    for row in &outcome.rows {
        let status = if row.has_critical() {
            "FAIL"
        } else if row.has_warning() {
            "WARN"
        } else {
            "PASS"
        };
        let _ = writeln!(
            out,
            "  Row {} (customer_id={}): {}",
            row.row + 1,
            row.customer_id,
            status
        );
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "END OF REPORT");
    out
}

/// Render the DetectPII stage's exposure analysis
pub fn render_pii_report(exposure: &ExposureReport) -> String {
    let mut out = String::new();
    heading(&mut out, "PII DETECTION REPORT");

    section(&mut out, "RISK ASSESSMENT:");
    for level in [RiskLevel::High, RiskLevel::Medium, RiskLevel::Low] {
        let label = match level {
            RiskLevel::High => "HIGH RISK columns (direct or sensitive PII):",
            RiskLevel::Medium => "MEDIUM RISK columns (financial sensitivity):",
            RiskLevel::Low => "LOW RISK columns (no standalone PII):",
        };
        let _ = writeln!(out, "  {}", label);
        for risk in column_risks().iter().filter(|r| r.risk == level) {
            let _ = writeln!(
                out,
                "    - {}: [{}] {}",
                risk.column, risk.category, risk.rationale
            );
        }
    }
    let _ = writeln!(out);

    section(&mut out, "DETECTED PII (by column):");
    for (col, count) in &exposure.counts_by_column {
        let pct = if exposure.total_rows == 0 {
            0
        } else {
            (*count as f64 / exposure.total_rows as f64 * 100.0).round() as u32
        };
        let _ = writeln!(
            out,
            "  - {}: {}/{} rows ({}%) contain PII",
            col, count, exposure.total_rows, pct
        );
    }
    let heuristic = exposure
        .findings
        .iter()
        .filter(|f| f.certainty == Certainty::Heuristic)
        .count();
    let _ = writeln!(
        out,
        "  ({} of {} findings are heuristic matches)",
        heuristic,
        exposure.findings.len()
    );
    let _ = writeln!(out);

    section(&mut out, "EXPOSURE RISK ANALYSIS:");
    let _ = writeln!(
        out,
        "  - Fully exposed rows (all 5 identity fields present): {}/{} ({:.0}%)",
        exposure.fully_exposed_rows,
        exposure.total_rows,
        exposure.fully_exposed_fraction() * 100.0
    );
    let _ = writeln!(
        out,
        "  - Partially exposed rows (some identity fields):      {}/{}",
        exposure.partially_exposed_rows, exposure.total_rows
    );
    let _ = writeln!(out);

    section(&mut out, "PER-ROW EXPOSURE BREAKDOWN:");
    let _ = writeln!(out, "  {:<15} {:>12} {:>12}", "customer_id", "PII Fields", "Risk Level");
    for row in &exposure.row_exposures {
        let _ = writeln!(
            out,
            "  {:<15} {:>12} {:>12?}",
            row.customer_id, row.identity_fields, row.tier
        );
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "END OF REPORT");
    out
}

/// Render the Mask stage sample. The masked preview and the rule examples
/// use synthetic values only; real unmasked values never appear alongside
/// their masked form in this artifact.
pub fn render_masked_sample(
    masked: &Dataset,
    summary: &MaskSummary,
    config: &MaskingConfig,
) -> String {
    let mut out = String::new();
    heading(&mut out, "MASKED SAMPLE REPORT");

    section(&mut out, "MASKING RULES APPLIED (synthetic examples):");
    let examples = [
        (PiiCategory::Name, "John", "First letter only"),
        (
            PiiCategory::Email,
            "john.doe@gmail.com",
            "Local part hidden, domain kept",
        ),
        (PiiCategory::Phone, "555-123-4567", "Last 4 digits kept"),
        (
            PiiCategory::Address,
            "123 Main St NY",
            "Fully replaced",
        ),
        (
            PiiCategory::DateOfBirth,
            "1985-03-15",
            "Year kept, month/day hidden",
        ),
    ];
    for (category, sample, reason) in examples {
        let _ = writeln!(
            out,
            "  {:<14} '{}' -> '{}'   ({})",
            category.label(),
            sample,
            mask::mask_value(sample, category, config),
            reason
        );
    }
    let _ = writeln!(
        out,
        "  {:<14} NOT masked (business data)",
        "income"
    );
    let _ = writeln!(
        out,
        "  {:<14} NOT masked (business data)",
        "account_status"
    );
    let _ = writeln!(
        out,
        "  {:<14} NOT masked (internal key)",
        "customer_id"
    );
    let _ = writeln!(out);

    section(&mut out, "MASKED VALUES BY COLUMN:");
    if summary.masked_by_column.is_empty() {
        let _ = writeln!(out, "  No values required masking");
    }
    for (col, count) in &summary.masked_by_column {
        let _ = writeln!(out, "  - {}: {} value(s) masked", col, count);
    }
    let _ = writeln!(out);

    section(&mut out, "MASKED DATASET PREVIEW (first 3 rows):");
    let columns = masked.schema.field_names();
    let header: Vec<String> = columns.iter().map(|c| format!("{:<22}", c)).collect();
    let _ = writeln!(out, "  {}", header.join(" | "));
    for row in masked.rows.iter().take(3) {
        let cells: Vec<String> = columns
            .iter()
            .map(|c| format!("{:<22}", row.text(c)))
            .collect();
        let _ = writeln!(out, "  {}", cells.join(" | "));
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "END OF REPORT");
    out
}

/// Serialize the execution report for machine consumption
pub fn render_execution_json(report: &ExecutionReport) -> crate::error::Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Render the unified execution report
pub fn render_execution_report(report: &ExecutionReport) -> String {
    let mut out = String::new();
    heading(&mut out, "PIPELINE EXECUTION REPORT");
    let _ = writeln!(out, "Run id:    {}", report.run_id);
    let _ = writeln!(
        out,
        "Timestamp: {}",
        report.started_at.format("%Y-%m-%d %H:%M:%S")
    );
    let _ = writeln!(out, "Duration:  {:.2} seconds", report.duration_seconds());
    let _ = writeln!(out);

    for stage in &report.stages {
        let _ = writeln!(out, "Stage {}:", stage.stage);
        for event in &stage.events {
            let icon = if event.ok { "[OK]" } else { "[FAIL]" };
            let _ = writeln!(out, "  {} {}", icon, event.message);
        }
        let _ = writeln!(
            out,
            "  rows affected: {}   warnings: {}   criticals: {}",
            stage.rows_affected, stage.warnings, stage.criticals
        );
        let _ = writeln!(out);
    }

    section(&mut out, "SUMMARY:");
    let _ = writeln!(out, "  Total warnings:  {}", report.total_warnings());
    let _ = writeln!(out, "  Total criticals: {}", report.total_criticals());
    let status = match &report.outcome {
        Some(RunOutcome::Saved) => "SUCCESS".to_string(),
        Some(RunOutcome::Aborted { reason }) => format!("ABORTED ({})", reason),
        None => "INCOMPLETE".to_string(),
    };
    let _ = writeln!(out);
    let _ = writeln!(out, "Status: {}", status);
    let _ = writeln!(out, "{}", "=".repeat(RULE_WIDTH));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_lifecycle() {
        let mut report = ExecutionReport::new();
        report.begin_stage("1: LOAD");
        report.event("Loaded 10 rows", true);
        report.stage_counts(10, 0, 0);
        report.begin_stage("2: CLEAN");
        report.event("Phone formats normalized: 3 value(s)", true);
        report.stage_counts(10, 3, 0);
        assert!(!report.is_finalized());

        report.finalize(RunOutcome::Saved);
        assert!(report.is_finalized());
        assert_eq!(report.total_warnings(), 3);

        let text = render_execution_report(&report);
        assert!(text.contains("Stage 1: LOAD"));
        assert!(text.contains("[OK] Loaded 10 rows"));
        assert!(text.contains("Status: SUCCESS"));
    }

    #[test]
    fn test_aborted_report_renders_reason() {
        let mut report = ExecutionReport::new();
        report.begin_stage("3: VALIDATE");
        report.event("critical ratio 0.60 exceeds threshold 0.50", false);
        report.finalize(RunOutcome::Aborted {
            reason: "critical ratio 0.60 exceeds threshold 0.50".to_string(),
        });
        let text = render_execution_report(&report);
        assert!(text.contains("[FAIL]"));
        assert!(text.contains("Status: ABORTED"));
    }
}
