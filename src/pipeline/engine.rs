use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::domain::Dataset;
use crate::observability::metrics;
use crate::pipeline::processing::clean::{self, CleanSummary};
use crate::pipeline::processing::mask::{self, MaskSummary};
use crate::pipeline::processing::pii::{self, ExposureReport};
use crate::pipeline::processing::profile::{self, ProfileReport};
use crate::pipeline::processing::validate::{self, ValidationOutcome};
use crate::pipeline::report::{ExecutionReport, RunOutcome};

/// States of the stage pipeline. Transitions are strictly sequential; the
/// two terminal states are Saved and Aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineState {
    Loaded,
    Cleaned,
    Validated,
    PiiDetected,
    Masked,
    Saved,
    Aborted,
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Saved | PipelineState::Aborted)
    }
}

/// Everything a completed (or aborted) engine pass produces. The cleaned
/// dataset is snapshotted before masking so both artifacts can be saved;
/// `masked` is None when the run aborted before the Mask stage.
#[derive(Debug)]
pub struct EngineRun {
    pub state: PipelineState,
    pub report: ExecutionReport,
    pub profile: ProfileReport,
    pub clean_summary: CleanSummary,
    pub validation: ValidationOutcome,
    pub exposure: Option<ExposureReport>,
    pub mask_summary: Option<MaskSummary>,
    pub cleaned: Dataset,
    pub masked: Option<Dataset>,
}

impl EngineRun {
    pub fn is_aborted(&self) -> bool {
        self.state == PipelineState::Aborted
    }
}

/// The Stage Pipeline Engine: owns the dataset for the duration of a run
/// and drives Load -> Clean -> Validate -> DetectPII -> Mask, carrying the
/// execution report across stages and enforcing the abort policy at the
/// post-Validate checkpoint. Saving is performed by the caller through the
/// output ports; `mark_saved` closes the report afterwards.
pub struct PipelineEngine {
    config: Config,
}

impl PipelineEngine {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn run(&self, mut dataset: Dataset) -> EngineRun {
        let mut report = ExecutionReport::new();
        let mut state = PipelineState::Loaded;

        // Stage 1: LOAD. The reader port already produced the dataset;
        // profile it and record the load.
        report.begin_stage("1: LOAD");
        let profile = profile::run(&dataset, &self.config.cleaning);
        report.event(
            format!(
                "Loaded {} rows, {} columns",
                profile.total_rows, profile.total_columns
            ),
            true,
        );
        if profile.columns_with_gaps() > 0 {
            report.event(
                format!("{} column(s) have missing values", profile.columns_with_gaps()),
                true,
            );
        }
        report.stage_counts(dataset.len(), 0, 0);
        debug!(?state, "stage complete");
        info!(rows = dataset.len(), "load complete");

        // Stage 2: CLEAN
        report.begin_stage("2: CLEAN");
        let clean_summary = clean::run(&mut dataset, &self.config.cleaning);
        state = PipelineState::Cleaned;
        debug!(?state, "stage complete");
        report.event(
            format!(
                "Phone formats normalized:   {} value(s)",
                clean_summary.phones_normalized
            ),
            true,
        );
        report.event(
            format!(
                "Date formats normalized:    {} value(s)",
                clean_summary.dates_normalized
            ),
            true,
        );
        report.event(
            format!(
                "Name/email casing fixed:    {} value(s)",
                clean_summary.names_cased + clean_summary.emails_lowercased
            ),
            true,
        );
        report.event(
            format!(
                "Missing values filled:      {} field(s)",
                clean_summary.total_missing_filled()
            ),
            true,
        );
        if !clean_summary.needs_review_rows.is_empty() {
            report.event(
                format!(
                    "{} row(s) flagged for review",
                    clean_summary.needs_review_rows.len()
                ),
                false,
            );
        }
        report.stage_counts(dataset.len(), clean_summary.total_changes(), 0);
        metrics::clean::fields_normalized(clean_summary.total_changes() as u64);
        metrics::clean::missing_filled(clean_summary.total_missing_filled() as u64);
        metrics::clean::rows_flagged(clean_summary.needs_review_rows.len() as u64);
        info!(changes = clean_summary.total_changes(), "clean complete");
        let cleaned = dataset.clone();

        // Stage 3: VALIDATE
        report.begin_stage("3: VALIDATE");
        let validation = validate::run(&dataset, &self.config);
        state = PipelineState::Validated;
        debug!(?state, "stage complete");
        report.event(
            format!(
                "{}/{} rows passed all checks",
                validation.rows_passed, validation.total_rows
            ),
            validation.rows_with_criticals == 0,
        );
        report.event(
            format!(
                "{} warning(s), {} critical(s) recorded",
                validation.warning_count, validation.critical_count
            ),
            validation.critical_count == 0,
        );
        report.stage_counts(
            validation.total_rows,
            validation.warning_count,
            validation.critical_count,
        );
        metrics::validate::rows_passed(validation.rows_passed as u64);
        metrics::validate::warnings(validation.warning_count as u64);
        metrics::validate::criticals(validation.critical_count as u64);

        // Abort checkpoint: only the dataset-level aggregate can halt the
        // run; individual defects never do
        let critical_fraction = validation.critical_row_fraction();
        let threshold = self.config.pipeline.abort_threshold;
        if critical_fraction > threshold {
            let reason = format!(
                "critical row ratio {:.2} exceeds threshold {:.2}",
                critical_fraction, threshold
            );
            warn!(%reason, "aborting pipeline");
            report.event(reason.clone(), false);
            report.finalize(RunOutcome::Aborted { reason });
            metrics::pipeline::run_aborted();
            return EngineRun {
                state: PipelineState::Aborted,
                report,
                profile,
                clean_summary,
                validation,
                exposure: None,
                mask_summary: None,
                cleaned,
                masked: None,
            };
        }
        report.event(
            format!(
                "critical row ratio {:.2} within threshold {:.2} - continuing",
                critical_fraction, threshold
            ),
            true,
        );

        // Stage 4: DETECT PII
        report.begin_stage("4: DETECT PII");
        let exposure = pii::classify(&dataset);
        state = PipelineState::PiiDetected;
        debug!(?state, "stage complete");
        for (col, count) in &exposure.counts_by_column {
            report.event(
                format!(
                    "Found PII - {}: {}/{} rows",
                    col, count, exposure.total_rows
                ),
                true,
            );
        }
        report.event(
            format!(
                "Fully exposed rows (all 5 identity fields): {}/{}",
                exposure.fully_exposed_rows, exposure.total_rows
            ),
            exposure.fully_exposed_rows == 0,
        );
        report.stage_counts(exposure.total_rows, 0, 0);
        metrics::pii::findings_detected(exposure.findings.len() as u64);
        metrics::pii::fully_exposed_rows(exposure.fully_exposed_rows as u64);
        info!(
            findings = exposure.findings.len(),
            fully_exposed = exposure.fully_exposed_rows,
            "pii detection complete"
        );

        // Stage 5: MASK
        report.begin_stage("5: MASK");
        let mask_summary = mask::run(&mut dataset, &exposure.findings, &self.config.masking);
        state = PipelineState::Masked;
        debug!(?state, "stage complete");
        for (col, count) in &mask_summary.masked_by_column {
            report.event(format!("{}: {} value(s) masked", col, count), true);
        }
        report.event(
            "income, account_status, created_date - NOT masked (business data)".to_string(),
            true,
        );
        report.stage_counts(dataset.len(), 0, 0);
        metrics::mask::values_masked(mask_summary.total_masked as u64);
        info!(masked = mask_summary.total_masked, "mask complete");

        debug_assert_eq!(state, PipelineState::Masked);
        EngineRun {
            state,
            report,
            profile,
            clean_summary,
            validation,
            exposure: Some(exposure),
            mask_summary: Some(mask_summary),
            cleaned,
            masked: Some(dataset),
        }
    }

    /// Close a successful run after the caller has persisted the artifacts
    pub fn mark_saved(&self, run: &mut EngineRun) {
        debug_assert!(!run.state.is_terminal(), "run already terminal");
        run.report.begin_stage("6: SAVE");
        run.report.event("Cleaned dataset saved", true);
        run.report.event("Masked dataset saved", true);
        run.report
            .stage_counts(run.masked.as_ref().map_or(0, |d| d.len()), 0, 0);
        run.report.finalize(RunOutcome::Saved);
        run.state = PipelineState::Saved;
        metrics::pipeline::run_completed();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Row, Value, CUSTOMER_SCHEMA};

    fn row(fields: &[(&str, &str)]) -> Row {
        let mut row = Row::new();
        for (name, value) in fields {
            if value.is_empty() {
                row.set(name, Value::Missing);
            } else {
                row.set(name, Value::Text(value.to_string()));
            }
        }
        row
    }

    fn messy_row(id: &str) -> Row {
        row(&[
            ("customer_id", id),
            ("first_name", "PATRICIA"),
            ("last_name", "davis"),
            ("email", "PATRICIA.DAVIS@GMAIL.COM"),
            ("phone", "(555) 234-5678"),
            ("address", "123 Main St New York NY 10001"),
            ("date_of_birth", "1985/03/12"),
            ("income", "75000"),
            ("account_status", "Active"),
            ("created_date", "01/15/2020"),
        ])
    }

    fn dataset(rows: Vec<Row>) -> Dataset {
        let mut ds = Dataset::new(CUSTOMER_SCHEMA.clone());
        ds.rows = rows;
        ds
    }

    #[test]
    fn test_happy_path_reaches_masked_then_saved() {
        let engine = PipelineEngine::new(Config::default());
        let mut run = engine.run(dataset(vec![messy_row("1"), messy_row("2")]));
        assert_eq!(run.state, PipelineState::Masked);
        assert!(!run.is_aborted());
        assert!(!run.report.is_finalized());

        let masked = run.masked.as_ref().unwrap();
        assert_eq!(masked.rows[0].text("email"), "p***@gmail.com");
        assert_eq!(masked.rows[0].text("date_of_birth"), "1985-**-**");
        // The cleaned snapshot is unmasked
        assert_eq!(run.cleaned.rows[0].text("email"), "patricia.davis@gmail.com");

        engine.mark_saved(&mut run);
        assert_eq!(run.state, PipelineState::Saved);
        assert!(run.report.is_finalized());
        assert_eq!(run.report.outcome, Some(RunOutcome::Saved));
    }

    #[test]
    fn test_abort_when_critical_ratio_exceeds_threshold() {
        // Two of three rows lack account_status: 0.66 > 0.5
        let mut a = messy_row("1");
        a.set("account_status", Value::Missing);
        let mut b = messy_row("2");
        b.set("account_status", Value::Missing);
        let c = messy_row("3");

        let engine = PipelineEngine::new(Config::default());
        let run = engine.run(dataset(vec![a, b, c]));

        assert_eq!(run.state, PipelineState::Aborted);
        assert!(run.masked.is_none());
        assert!(run.exposure.is_none());
        // The report is finalized and surfaced even on abort
        assert!(run.report.is_finalized());
        assert!(matches!(
            run.report.outcome,
            Some(RunOutcome::Aborted { .. })
        ));
    }

    #[test]
    fn test_individual_criticals_below_threshold_do_not_abort() {
        let mut a = messy_row("1");
        a.set("email", Value::Text("not-an-email".to_string()));
        let b = messy_row("2");
        let c = messy_row("3");

        let engine = PipelineEngine::new(Config::default());
        let run = engine.run(dataset(vec![a, b, c]));
        assert_eq!(run.state, PipelineState::Masked);
    }

    #[test]
    fn test_stage_sections_are_ordered() {
        let engine = PipelineEngine::new(Config::default());
        let run = engine.run(dataset(vec![messy_row("1")]));
        let names: Vec<&str> = run.report.stages.iter().map(|s| s.stage.as_str()).collect();
        assert_eq!(
            names,
            vec!["1: LOAD", "2: CLEAN", "3: VALIDATE", "4: DETECT PII", "5: MASK"]
        );
    }

    #[test]
    fn test_abort_threshold_is_configurable() {
        let mut config = Config::default();
        config.pipeline.abort_threshold = 0.0;
        let mut bad = messy_row("1");
        bad.set("account_status", Value::Missing);

        let engine = PipelineEngine::new(config);
        let run = engine.run(dataset(vec![bad, messy_row("2"), messy_row("3")]));
        // One critical row out of three exceeds a zero threshold
        assert_eq!(run.state, PipelineState::Aborted);
    }
}
