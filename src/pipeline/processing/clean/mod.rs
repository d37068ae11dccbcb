use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::common::constants;
use crate::config::CleaningConfig;
use crate::domain::{Dataset, FieldKind, NormalizeKind, Value};
use crate::pipeline::processing::normalize::{self, NormalizeOutcome};

/// One change applied by the Clean stage, for the cleaning log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanAction {
    pub category: String,
    pub detail: String,
}

/// Summary of everything the Clean stage did to the dataset
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CleanSummary {
    pub phones_normalized: usize,
    pub dates_normalized: usize,
    pub names_cased: usize,
    pub emails_lowercased: usize,
    pub statuses_normalized: usize,
    pub invalid_dates_flagged: usize,
    pub missing_filled: BTreeMap<String, usize>,
    /// Row indices (0-based) holding an unparseable marker, for human review
    pub needs_review_rows: BTreeSet<usize>,
    pub actions: Vec<CleanAction>,
}

impl CleanSummary {
    pub fn total_missing_filled(&self) -> usize {
        self.missing_filled.values().sum()
    }

    pub fn total_changes(&self) -> usize {
        self.phones_normalized
            + self.dates_normalized
            + self.names_cased
            + self.emails_lowercased
            + self.statuses_normalized
            + self.invalid_dates_flagged
            + self.total_missing_filled()
    }

    fn log(&mut self, category: &str, detail: String) {
        self.actions.push(CleanAction {
            category: category.to_string(),
            detail,
        });
    }
}

/// Run the Clean stage: normalize formats field by field, then fill missing
/// values with typed placeholders. Re-running on already-clean data is a
/// no-op (every normalizer is idempotent and placeholders re-normalize to
/// themselves).
pub fn run(dataset: &mut Dataset, config: &CleaningConfig) -> CleanSummary {
    let mut summary = CleanSummary::default();
    let schema = dataset.schema.clone();

    for (idx, row) in dataset.rows.iter_mut().enumerate() {
        let row_num = idx + 1;
        for rule in &schema.fields {
            let Some(kind) = rule.normalize else { continue };
            let original = row.text(&rule.name);
            if original.is_empty() {
                continue;
            }
            match normalize::apply(kind, &original, config) {
                NormalizeOutcome::Unchanged => {}
                NormalizeOutcome::Normalized(new_value) => {
                    let category = action_category(kind, &rule.name);
                    summary.log(
                        &category,
                        format!("Row {}: '{}' -> '{}'", row_num, original, new_value),
                    );
                    count_fix(&mut summary, kind);
                    row.set(&rule.name, Value::Text(new_value));
                }
                NormalizeOutcome::Unparseable => match kind {
                    NormalizeKind::Date => {
                        summary.invalid_dates_flagged += 1;
                        summary.log(
                            &format!("Invalid date flagged ({})", rule.name),
                            format!(
                                "Row {}: '{}' -> '{}'",
                                row_num,
                                original,
                                constants::INVALID_DATE_MARKER
                            ),
                        );
                        row.set(
                            &rule.name,
                            Value::Text(constants::INVALID_DATE_MARKER.to_string()),
                        );
                    }
                    // Unparseable phones keep their original value; the
                    // validator records the critical verdict
                    _ => {
                        debug!(
                            row = row_num,
                            field = %rule.name,
                            "left unparseable value in place"
                        );
                    }
                },
            }
            // Any row still holding the marker needs human review,
            // whether it was flagged this run or a previous one
            if row.text(&rule.name) == constants::INVALID_DATE_MARKER {
                summary.needs_review_rows.insert(idx);
            }
        }
    }

    fill_missing(dataset, &mut summary);
    summary
}

/// Fill missing values with typed placeholders: string fields get
/// `[UNKNOWN]`, numeric fields 0, enum fields `unknown`. Rows are never
/// deleted; every other field in a defective row is preserved.
fn fill_missing(dataset: &mut Dataset, summary: &mut CleanSummary) {
    let schema = dataset.schema.clone();
    for (idx, row) in dataset.rows.iter_mut().enumerate() {
        for rule in &schema.fields {
            if !row.get(&rule.name).is_missing() {
                continue;
            }
            let fill = match &rule.kind {
                FieldKind::Numeric => Value::Number(0.0),
                FieldKind::Enum(_) => Value::Text(constants::UNKNOWN_STATUS.to_string()),
                _ => Value::Text(constants::UNKNOWN_MARKER.to_string()),
            };
            summary.log(
                &format!("Missing value filled ({})", rule.name),
                format!("Row {}: empty -> '{}'", idx + 1, fill.render()),
            );
            *summary.missing_filled.entry(rule.name.clone()).or_insert(0) += 1;
            row.set(&rule.name, fill);
        }
    }
}

fn action_category(kind: NormalizeKind, field: &str) -> String {
    match kind {
        NormalizeKind::Phone => "Phone normalization".to_string(),
        NormalizeKind::Date => format!("Date normalization ({})", field),
        NormalizeKind::Name => format!("Name case ({})", field),
        NormalizeKind::Email => "Email lowercase".to_string(),
        NormalizeKind::Status => "Status normalization".to_string(),
    }
}

fn count_fix(summary: &mut CleanSummary, kind: NormalizeKind) {
    match kind {
        NormalizeKind::Phone => summary.phones_normalized += 1,
        NormalizeKind::Date => summary.dates_normalized += 1,
        NormalizeKind::Name => summary.names_cased += 1,
        NormalizeKind::Email => summary.emails_lowercased += 1,
        NormalizeKind::Status => summary.statuses_normalized += 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CleaningConfig;
    use crate::domain::{Row, CUSTOMER_SCHEMA};

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

    fn dataset(rows: Vec<Row>) -> Dataset {
        let mut ds = Dataset::new(CUSTOMER_SCHEMA.clone());
        ds.rows = rows;
        ds
    }

    fn messy_row() -> Row {
        row(&[
            ("customer_id", "1"),
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

    #[test]
    fn test_clean_normalizes_all_categories() {
        let mut ds = dataset(vec![messy_row()]);
        let summary = run(&mut ds, &CleaningConfig::default());

        let row = &ds.rows[0];
        assert_eq!(row.text("first_name"), "Patricia");
        assert_eq!(row.text("last_name"), "Davis");
        assert_eq!(row.text("email"), "patricia.davis@gmail.com");
        assert_eq!(row.text("phone"), "555-234-5678");
        assert_eq!(row.text("date_of_birth"), "1985-03-12");
        assert_eq!(row.text("created_date"), "2020-01-15");
        assert_eq!(row.text("account_status"), "active");

        assert_eq!(summary.phones_normalized, 1);
        assert_eq!(summary.dates_normalized, 2);
        assert_eq!(summary.names_cased, 2);
        assert_eq!(summary.emails_lowercased, 1);
        assert_eq!(summary.statuses_normalized, 1);
    }

    #[test]
    fn test_clean_is_idempotent() {
        let mut ds = dataset(vec![messy_row()]);
        run(&mut ds, &CleaningConfig::default());
        let cleaned_rows = ds.rows.clone();

        let second = run(&mut ds, &CleaningConfig::default());
        assert_eq!(second.total_changes(), 0);
        for (before, after) in cleaned_rows.iter().zip(ds.rows.iter()) {
            for field in ds.schema.field_names() {
                assert_eq!(before.text(field), after.text(field));
            }
        }
    }

    #[test]
    fn test_invalid_date_flagged_and_row_marked() {
        let mut base = messy_row();
        base.set("date_of_birth", Value::Text("invalid_date".to_string()));
        let mut ds = dataset(vec![base]);
        let summary = run(&mut ds, &CleaningConfig::default());

        assert_eq!(ds.rows[0].text("date_of_birth"), "[INVALID_DATE]");
        assert_eq!(summary.invalid_dates_flagged, 1);
        assert!(summary.needs_review_rows.contains(&0));
    }

    #[test]
    fn test_rerun_keeps_review_flag_without_recounting() {
        let mut base = messy_row();
        base.set("date_of_birth", Value::Text("invalid_date".to_string()));
        let mut ds = dataset(vec![base]);
        run(&mut ds, &CleaningConfig::default());

        let second = run(&mut ds, &CleaningConfig::default());
        assert_eq!(second.invalid_dates_flagged, 0);
        assert!(second.needs_review_rows.contains(&0));
    }

    #[test]
    fn test_imputation_fills_every_field() {
        let mut base = messy_row();
        base.set("first_name", Value::Missing);
        base.set("income", Value::Missing);
        base.set("account_status", Value::Text("  ".to_string()));
        let mut ds = dataset(vec![base]);
        let summary = run(&mut ds, &CleaningConfig::default());

        let row = &ds.rows[0];
        assert_eq!(row.text("first_name"), "[UNKNOWN]");
        assert_eq!(*row.get("income"), Value::Number(0.0));
        assert_eq!(row.text("account_status"), "unknown");
        assert_eq!(summary.total_missing_filled(), 3);

        // Post-Clean completeness: no field of any row is missing
        for row in &ds.rows {
            for field in ds.schema.field_names() {
                assert!(!row.get(field).is_missing(), "{field} left missing");
            }
        }
    }

    #[test]
    fn test_unparseable_phone_left_for_validator() {
        let mut base = messy_row();
        base.set("phone", Value::Text("555-1234".to_string()));
        let mut ds = dataset(vec![base]);
        let summary = run(&mut ds, &CleaningConfig::default());

        assert_eq!(ds.rows[0].text("phone"), "555-1234");
        assert_eq!(summary.phones_normalized, 0);
    }

    #[test]
    fn test_action_log_records_changes() {
        let mut ds = dataset(vec![messy_row()]);
        let summary = run(&mut ds, &CleaningConfig::default());
        assert!(summary
            .actions
            .iter()
            .any(|a| a.category == "Email lowercase"
                && a.detail.contains("patricia.davis@gmail.com")));
    }
}
