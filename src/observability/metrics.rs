//! Simple metrics module for the pipeline
//!
//! This module provides a straightforward API for recording metrics using
//! standard Prometheus naming conventions. Only the `metrics` facade is
//! wired; installing a recorder/exporter is left to the embedding process.

use std::fmt;

/// Enum representing all metric names used in the system
/// This eliminates magic strings and provides compile-time safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Pipeline metrics
    PipelineRunsCompleted,
    PipelineRunsAborted,

    // Clean metrics
    CleanFieldsNormalized,
    CleanMissingFilled,
    CleanRowsFlagged,

    // Validate metrics
    ValidateRowsPassed,
    ValidateWarnings,
    ValidateCriticals,

    // PII metrics
    PiiFindingsDetected,
    PiiFullyExposedRows,

    // Mask metrics
    MaskValuesMasked,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::PipelineRunsCompleted => "datacustodian_pipeline_runs_completed_total",
            MetricName::PipelineRunsAborted => "datacustodian_pipeline_runs_aborted_total",
            MetricName::CleanFieldsNormalized => "datacustodian_clean_fields_normalized_total",
            MetricName::CleanMissingFilled => "datacustodian_clean_missing_filled_total",
            MetricName::CleanRowsFlagged => "datacustodian_clean_rows_flagged_total",
            MetricName::ValidateRowsPassed => "datacustodian_validate_rows_passed_total",
            MetricName::ValidateWarnings => "datacustodian_validate_warnings_total",
            MetricName::ValidateCriticals => "datacustodian_validate_criticals_total",
            MetricName::PiiFindingsDetected => "datacustodian_pii_findings_detected_total",
            MetricName::PiiFullyExposedRows => "datacustodian_pii_fully_exposed_rows",
            MetricName::MaskValuesMasked => "datacustodian_mask_values_masked_total",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

pub mod pipeline {
    use super::MetricName;

    /// Record a run that reached Saved
    pub fn run_completed() {
        ::metrics::counter!(MetricName::PipelineRunsCompleted.as_str()).increment(1);
    }

    /// Record a run that aborted at the post-Validate checkpoint
    pub fn run_aborted() {
        ::metrics::counter!(MetricName::PipelineRunsAborted.as_str()).increment(1);
    }
}

pub mod clean {
    use super::MetricName;

    pub fn fields_normalized(count: u64) {
        ::metrics::counter!(MetricName::CleanFieldsNormalized.as_str()).increment(count);
    }

    pub fn missing_filled(count: u64) {
        ::metrics::counter!(MetricName::CleanMissingFilled.as_str()).increment(count);
    }

    pub fn rows_flagged(count: u64) {
        ::metrics::counter!(MetricName::CleanRowsFlagged.as_str()).increment(count);
    }
}

pub mod validate {
    use super::MetricName;

    pub fn rows_passed(count: u64) {
        ::metrics::counter!(MetricName::ValidateRowsPassed.as_str()).increment(count);
    }

    pub fn warnings(count: u64) {
        ::metrics::counter!(MetricName::ValidateWarnings.as_str()).increment(count);
    }

    pub fn criticals(count: u64) {
        ::metrics::counter!(MetricName::ValidateCriticals.as_str()).increment(count);
    }
}

pub mod pii {
    use super::MetricName;

    pub fn findings_detected(count: u64) {
        ::metrics::counter!(MetricName::PiiFindingsDetected.as_str()).increment(count);
    }

    pub fn fully_exposed_rows(count: u64) {
        ::metrics::gauge!(MetricName::PiiFullyExposedRows.as_str()).set(count as f64);
    }
}

pub mod mask {
    use super::MetricName;

    pub fn values_masked(count: u64) {
        ::metrics::counter!(MetricName::MaskValuesMasked.as_str()).increment(count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names_follow_prometheus_conventions() {
        let counters = [
            MetricName::PipelineRunsCompleted,
            MetricName::CleanFieldsNormalized,
            MetricName::ValidateCriticals,
            MetricName::MaskValuesMasked,
        ];
        for metric in counters {
            assert!(metric.as_str().starts_with("datacustodian_"));
            assert!(metric.as_str().ends_with("_total"));
        }
    }
}
