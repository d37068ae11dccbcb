use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::common::constants;
use crate::domain::{Dataset, PiiCategory, Row};

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}$").unwrap());
static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{3}-\d{3}-\d{4}$").unwrap());
static DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());
static ADDRESS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\s+\w+").unwrap());

/// How a finding was established: a shape or schema-name match is
/// deterministic; a content heuristic (street-address pattern) is not
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Certainty {
    Deterministic,
    Heuristic,
}

/// One (row, field, category) triple flagged as containing PII
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PiiFinding {
    /// 0-based row index
    pub row: usize,
    pub field: String,
    pub category: PiiCategory,
    pub certainty: Certainty,
}

/// Standing risk classification for a column, carried into the PII report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnRisk {
    pub column: &'static str,
    pub risk: RiskLevel,
    pub category: &'static str,
    pub rationale: &'static str,
}

/// The per-column risk table for the customer schema
pub fn column_risks() -> Vec<ColumnRisk> {
    vec![
        ColumnRisk {
            column: constants::FIRST_NAME,
            risk: RiskLevel::High,
            category: "Direct Identifier",
            rationale: "Identifies the individual by name",
        },
        ColumnRisk {
            column: constants::LAST_NAME,
            risk: RiskLevel::High,
            category: "Direct Identifier",
            rationale: "Identifies the individual by name",
        },
        ColumnRisk {
            column: constants::EMAIL,
            risk: RiskLevel::High,
            category: "Contact Information",
            rationale: "Uniquely links to a person, enables phishing",
        },
        ColumnRisk {
            column: constants::PHONE,
            risk: RiskLevel::High,
            category: "Contact Information",
            rationale: "Direct contact vector, enables social engineering",
        },
        ColumnRisk {
            column: constants::DATE_OF_BIRTH,
            risk: RiskLevel::High,
            category: "Sensitive Personal",
            rationale: "Used for identity verification and fraud",
        },
        ColumnRisk {
            column: constants::ADDRESS,
            risk: RiskLevel::High,
            category: "Sensitive Personal",
            rationale: "Physical location of the individual",
        },
        ColumnRisk {
            column: constants::INCOME,
            risk: RiskLevel::Medium,
            category: "Financial Sensitivity",
            rationale: "Reveals wealth, enables targeted fraud",
        },
        ColumnRisk {
            column: constants::CUSTOMER_ID,
            risk: RiskLevel::Low,
            category: "Internal Identifier",
            rationale: "Harmless alone, but links all other PII together",
        },
    ]
}

/// Combined exposure tier of one row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExposureTier {
    Critical,
    High,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowExposure {
    /// 0-based row index
    pub row: usize,
    pub customer_id: String,
    /// How many of the five identity categories are present in this row
    pub identity_fields: usize,
    pub tier: ExposureTier,
}

/// Dataset-wide PII exposure metrics. The headline number is the
/// co-occurrence count: rows where name, email, phone, address, and date of
/// birth are all simultaneously present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExposureReport {
    pub total_rows: usize,
    pub findings: Vec<PiiFinding>,
    pub counts_by_column: BTreeMap<String, usize>,
    pub row_exposures: Vec<RowExposure>,
    pub fully_exposed_rows: usize,
    pub partially_exposed_rows: usize,
}

impl ExposureReport {
    pub fn fully_exposed_fraction(&self) -> f64 {
        if self.total_rows == 0 {
            return 0.0;
        }
        self.fully_exposed_rows as f64 / self.total_rows as f64
    }
}

/// Scan every field of every row with the category matchers and compute the
/// exposure metrics. Purely deterministic: identical input yields identical
/// findings, in identical order.
pub fn classify(dataset: &Dataset) -> ExposureReport {
    let mut report = ExposureReport {
        total_rows: dataset.len(),
        ..Default::default()
    };

    for (idx, row) in dataset.rows.iter().enumerate() {
        let mut found = RowCategories::default();

        for rule in &dataset.schema.fields {
            let Some(category) = rule.pii else { continue };
            let Some(certainty) = match_field(row, &rule.name, category) else {
                continue;
            };
            found.mark(&rule.name, category);
            *report
                .counts_by_column
                .entry(rule.name.clone())
                .or_insert(0) += 1;
            report.findings.push(PiiFinding {
                row: idx,
                field: rule.name.clone(),
                category,
                certainty,
            });
        }

        let identity_fields = found.identity_count();
        let tier = match identity_fields {
            5 => ExposureTier::Critical,
            3..=4 => ExposureTier::High,
            _ => ExposureTier::Low,
        };
        if identity_fields == 5 {
            report.fully_exposed_rows += 1;
        } else if identity_fields > 0 {
            report.partially_exposed_rows += 1;
        }
        report.row_exposures.push(RowExposure {
            row: idx,
            customer_id: row.text(constants::CUSTOMER_ID),
            identity_fields,
            tier,
        });
    }

    report
}

/// Test one field value against its category matcher. Placeholder values
/// written by the Clean stage are never findings.
fn match_field(row: &Row, field: &str, category: PiiCategory) -> Option<Certainty> {
    let text = row.text(field);
    if text.is_empty()
        || text == constants::UNKNOWN_MARKER
        || text == constants::INVALID_DATE_MARKER
    {
        return None;
    }
    match category {
        PiiCategory::Email => EMAIL_RE.is_match(&text).then_some(Certainty::Deterministic),
        PiiCategory::Phone => PHONE_RE.is_match(&text).then_some(Certainty::Deterministic),
        PiiCategory::DateOfBirth => DATE_RE.is_match(&text).then_some(Certainty::Deterministic),
        // The schema names these fields; presence is the signal
        PiiCategory::Name | PiiCategory::Income => Some(Certainty::Deterministic),
        // Street-address shape is a content heuristic
        PiiCategory::Address => ADDRESS_RE.is_match(&text).then_some(Certainty::Heuristic),
    }
}

/// Tracks which identity categories were seen in one row. Name counts only
/// when both name fields are present.
#[derive(Default)]
struct RowCategories {
    first_name: bool,
    last_name: bool,
    email: bool,
    phone: bool,
    address: bool,
    date_of_birth: bool,
}

impl RowCategories {
    fn mark(&mut self, field: &str, category: PiiCategory) {
        match category {
            PiiCategory::Name => {
                if field == constants::FIRST_NAME {
                    self.first_name = true;
                } else {
                    self.last_name = true;
                }
            }
            PiiCategory::Email => self.email = true,
            PiiCategory::Phone => self.phone = true,
            PiiCategory::Address => self.address = true,
            PiiCategory::DateOfBirth => self.date_of_birth = true,
            PiiCategory::Income => {}
        }
    }

    fn identity_count(&self) -> usize {
        let has_name = self.first_name && self.last_name;
        [
            has_name,
            self.email,
            self.phone,
            self.address,
            self.date_of_birth,
        ]
        .iter()
        .filter(|present| **present)
        .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Value, CUSTOMER_SCHEMA};

    fn cleaned_row(id: &str) -> Row {
        let mut row = Row::new();
        for (name, value) in [
            ("customer_id", id),
            ("first_name", "Patricia"),
            ("last_name", "Davis"),
            ("email", "patricia.davis@gmail.com"),
            ("phone", "555-234-5678"),
            ("address", "123 Main St New York NY 10001"),
            ("date_of_birth", "1985-03-12"),
            ("income", "75000"),
            ("account_status", "active"),
            ("created_date", "2020-01-15"),
        ] {
            row.set(name, Value::Text(value.to_string()));
        }
        row
    }

    fn dataset(rows: Vec<Row>) -> Dataset {
        let mut ds = Dataset::new(CUSTOMER_SCHEMA.clone());
        ds.rows = rows;
        ds
    }

    #[test]
    fn test_fully_exposed_row_counts() {
        let ds = dataset(vec![cleaned_row("1")]);
        let report = classify(&ds);
        assert_eq!(report.fully_exposed_rows, 1);
        assert_eq!(report.partially_exposed_rows, 0);
        assert_eq!(report.row_exposures[0].identity_fields, 5);
        assert_eq!(report.row_exposures[0].tier, ExposureTier::Critical);
    }

    #[test]
    fn test_one_missing_identity_field_breaks_cooccurrence() {
        let mut row = cleaned_row("1");
        row.set("phone", Value::Text("[UNKNOWN]".to_string()));
        let ds = dataset(vec![row]);
        let report = classify(&ds);
        assert_eq!(report.fully_exposed_rows, 0);
        assert_eq!(report.partially_exposed_rows, 1);
        assert_eq!(report.row_exposures[0].identity_fields, 4);
        assert_eq!(report.row_exposures[0].tier, ExposureTier::High);
    }

    #[test]
    fn test_name_requires_both_fields() {
        let mut row = cleaned_row("1");
        row.set("last_name", Value::Text("[UNKNOWN]".to_string()));
        let ds = dataset(vec![row]);
        let report = classify(&ds);
        // first_name alone does not complete the Name category
        assert_eq!(report.row_exposures[0].identity_fields, 4);
    }

    #[test]
    fn test_placeholders_are_never_findings() {
        let mut row = cleaned_row("1");
        row.set("date_of_birth", Value::Text("[INVALID_DATE]".to_string()));
        row.set("address", Value::Text("[UNKNOWN]".to_string()));
        let ds = dataset(vec![row]);
        let report = classify(&ds);
        assert!(report
            .findings
            .iter()
            .all(|f| f.field != "date_of_birth" && f.field != "address"));
    }

    #[test]
    fn test_certainty_labels() {
        let ds = dataset(vec![cleaned_row("1")]);
        let report = classify(&ds);
        let by_field: BTreeMap<_, _> = report
            .findings
            .iter()
            .map(|f| (f.field.as_str(), f.certainty))
            .collect();
        assert_eq!(by_field["email"], Certainty::Deterministic);
        assert_eq!(by_field["address"], Certainty::Heuristic);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let ds = dataset(vec![cleaned_row("1"), cleaned_row("2")]);
        let first = classify(&ds);
        let second = classify(&ds);
        assert_eq!(first.findings.len(), second.findings.len());
        for (a, b) in first.findings.iter().zip(second.findings.iter()) {
            assert_eq!(a.row, b.row);
            assert_eq!(a.field, b.field);
            assert_eq!(a.category, b.category);
        }
    }

    #[test]
    fn test_counts_by_column() {
        let ds = dataset(vec![cleaned_row("1"), cleaned_row("2")]);
        let report = classify(&ds);
        assert_eq!(report.counts_by_column["email"], 2);
        assert_eq!(report.counts_by_column["income"], 2);
    }

    #[test]
    fn test_non_address_shaped_value_is_not_flagged() {
        let mut row = cleaned_row("1");
        row.set("address", Value::Text("somewhere nice".to_string()));
        let ds = dataset(vec![row]);
        let report = classify(&ds);
        assert!(report.findings.iter().all(|f| f.field != "address"));
        assert_eq!(report.row_exposures[0].identity_fields, 4);
    }
}
