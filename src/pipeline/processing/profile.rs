use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::CleaningConfig;
use crate::domain::{Dataset, FieldKind};

/// Completeness and type conformity of one column
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub name: String,
    pub missing: usize,
    pub completeness_pct: u32,
    pub expected: String,
    /// Every present value parses under the expected kind
    pub conforms: bool,
}

/// Quality profile of the raw dataset, produced at Load time
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileReport {
    pub total_rows: usize,
    pub total_columns: usize,
    pub columns: Vec<ColumnProfile>,
}

impl ProfileReport {
    pub fn columns_with_gaps(&self) -> usize {
        self.columns.iter().filter(|c| c.missing > 0).count()
    }
}

/// Profile every column: how complete it is, and whether its present values
/// conform to the expected kind
pub fn run(dataset: &Dataset, config: &CleaningConfig) -> ProfileReport {
    let total_rows = dataset.len();
    let mut columns = Vec::with_capacity(dataset.schema.fields.len());

    for rule in &dataset.schema.fields {
        let mut missing = 0usize;
        let mut conforms = true;
        for row in &dataset.rows {
            let value = row.get(&rule.name);
            if value.is_missing() {
                missing += 1;
                continue;
            }
            let text = row.text(&rule.name);
            let ok = match &rule.kind {
                FieldKind::Integer => text.parse::<i64>().is_ok(),
                FieldKind::Numeric => text.parse::<f64>().is_ok(),
                FieldKind::Date => config
                    .date_formats
                    .iter()
                    .any(|f| NaiveDate::parse_from_str(&text, f).is_ok()),
                _ => true,
            };
            if !ok {
                conforms = false;
            }
        }
        let completeness_pct = if total_rows == 0 {
            100
        } else {
            (((total_rows - missing) as f64 / total_rows as f64) * 100.0).round() as u32
        };
        columns.push(ColumnProfile {
            name: rule.name.clone(),
            missing,
            completeness_pct,
            expected: rule.kind.label().to_string(),
            conforms,
        });
    }

    ProfileReport {
        total_rows,
        total_columns: dataset.schema.fields.len(),
        columns,
    }
}
