use chrono::{NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::common::constants;
use crate::config::Config;
use crate::domain::{Dataset, FieldKind, FieldRule, Row, Value};

/// Income above this cap is flagged as out of range (the value is still
/// well-formed, so the verdict is a warning rather than a critical)
const INCOME_CAP: f64 = 10_000_000.0;

static NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z\-']{2,50}$").unwrap());
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}$").unwrap());
static PHONE_CANONICAL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{3}-\d{3}-\d{4}$").unwrap());
static DATE_CANONICAL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

/// Result of validating one field of one row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Verdict {
    Pass,
    Warning(String),
    Critical(String),
}

impl Verdict {
    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }

    pub fn is_critical(&self) -> bool {
        matches!(self, Verdict::Critical(_))
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Verdict::Pass => None,
            Verdict::Warning(r) | Verdict::Critical(r) => Some(r.as_str()),
        }
    }
}

/// Severity of a recorded failure (pass verdicts are not recorded)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Warning,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldVerdict {
    pub field: String,
    pub verdict: Verdict,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowValidation {
    /// 0-based row index
    pub row: usize,
    pub customer_id: String,
    pub verdicts: Vec<FieldVerdict>,
}

impl RowValidation {
    pub fn has_critical(&self) -> bool {
        self.verdicts.iter().any(|v| v.verdict.is_critical())
    }

    pub fn has_warning(&self) -> bool {
        self.verdicts
            .iter()
            .any(|v| matches!(v.verdict, Verdict::Warning(_)))
    }

    pub fn passed(&self) -> bool {
        self.verdicts.iter().all(|v| v.verdict.is_pass())
    }
}

/// One recorded failure, for the per-column report section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureDetail {
    /// 1-based row number as shown in reports
    pub row: usize,
    pub customer_id: String,
    pub value: String,
    pub reason: String,
    pub severity: Severity,
}

/// Aggregated validation result for the whole dataset
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub total_rows: usize,
    pub rows_passed: usize,
    pub rows_with_warnings: usize,
    pub rows_with_criticals: usize,
    pub warning_count: usize,
    pub critical_count: usize,
    pub rows: Vec<RowValidation>,
    pub failures_by_field: BTreeMap<String, Vec<FailureDetail>>,
}

impl ValidationOutcome {
    /// Fraction of rows carrying at least one critical verdict; this is the
    /// number the post-Validate abort checkpoint compares to the threshold
    pub fn critical_row_fraction(&self) -> f64 {
        if self.total_rows == 0 {
            return 0.0;
        }
        self.rows_with_criticals as f64 / self.total_rows as f64
    }
}

/// Validate every field of every row against the schema rules, then apply
/// the dataset-level checks (customer_id uniqueness, optional cross-field
/// consistency). Field defects never halt processing of other rows; they
/// degrade to recorded verdicts.
pub fn run(dataset: &Dataset, config: &Config) -> ValidationOutcome {
    let duplicate_ids = find_duplicate_ids(dataset);
    let mut outcome = ValidationOutcome {
        total_rows: dataset.len(),
        ..Default::default()
    };

    for (idx, row) in dataset.rows.iter().enumerate() {
        let customer_id = row.text(constants::CUSTOMER_ID);
        let mut verdicts = Vec::with_capacity(dataset.schema.fields.len());

        for rule in &dataset.schema.fields {
            let verdict = validate_field(row.get(&rule.name), rule, config);
            verdicts.push(FieldVerdict {
                field: rule.name.clone(),
                verdict,
            });
        }

        if duplicate_ids.contains(&customer_id) && !customer_id.is_empty() {
            verdicts.push(FieldVerdict {
                field: constants::CUSTOMER_ID.to_string(),
                verdict: Verdict::Critical(format!("Duplicate customer_id: {}", customer_id)),
            });
        }

        if config.pipeline.cross_field_checks {
            if let Some(verdict) = check_date_ordering(row) {
                verdicts.push(FieldVerdict {
                    field: constants::CREATED_DATE.to_string(),
                    verdict,
                });
            }
        }

        record_row(&mut outcome, idx, customer_id, verdicts, row);
    }

    outcome
}

/// Classify one field value against its rule.
///
/// Severity policy: missing or placeholder on an identity-critical field is
/// critical; missing on any other required field is a warning; a present
/// value that fails its type/format rule is critical; a present value that
/// is parseable only in a non-canonical format is a warning.
pub fn validate_field(value: &Value, rule: &FieldRule, config: &Config) -> Verdict {
    let text = match value {
        Value::Text(s) => s.trim().to_string(),
        Value::Number(n) => Value::Number(*n).render(),
        Value::Missing => String::new(),
    };

    if value.is_missing() || is_placeholder(&text, &rule.kind) {
        return missing_verdict(rule, config);
    }

    match &rule.kind {
        FieldKind::Integer => validate_integer(&rule.name, &text),
        FieldKind::Name => validate_name(&rule.name, &text),
        FieldKind::Email => validate_email(&text),
        FieldKind::Phone => validate_phone(&text, config.cleaning.phone_digits),
        FieldKind::Date => validate_date(&rule.name, &text, config),
        FieldKind::Address => validate_address(&text),
        FieldKind::Numeric => validate_income(&rule.name, value, &text),
        FieldKind::Enum(allowed) => validate_enum(&rule.name, &text, allowed),
    }
}

fn is_placeholder(text: &str, kind: &FieldKind) -> bool {
    match kind {
        FieldKind::Enum(_) => text == constants::UNKNOWN_STATUS,
        _ => text == constants::UNKNOWN_MARKER,
    }
}

fn missing_verdict(rule: &FieldRule, config: &Config) -> Verdict {
    if config
        .pipeline
        .identity_critical_fields
        .iter()
        .any(|f| f == &rule.name)
    {
        Verdict::Critical(format!(
            "Missing required identity-critical field: {}",
            rule.name
        ))
    } else if rule.required {
        Verdict::Warning(format!("{} missing, filled with placeholder", rule.name))
    } else {
        Verdict::Pass
    }
}

fn validate_integer(field: &str, text: &str) -> Verdict {
    match text.parse::<i64>() {
        Ok(n) if n > 0 => Verdict::Pass,
        Ok(n) => Verdict::Critical(format!("{} must be positive, got {}", field, n)),
        Err(_) => Verdict::Critical(format!("{} must be an integer, got '{}'", field, text)),
    }
}

fn validate_name(field: &str, text: &str) -> Verdict {
    if text.len() < 2 {
        Verdict::Critical(format!("{} too short (min 2 chars): '{}'", field, text))
    } else if text.len() > 50 {
        Verdict::Critical(format!("{} too long (max 50 chars)", field))
    } else if !NAME_RE.is_match(text) {
        Verdict::Critical(format!(
            "{} contains non-alphabetic characters: '{}'",
            field, text
        ))
    } else {
        Verdict::Pass
    }
}

fn validate_email(text: &str) -> Verdict {
    if EMAIL_RE.is_match(text) {
        Verdict::Pass
    } else {
        Verdict::Critical(format!("Invalid email format: '{}'", text))
    }
}

fn validate_phone(text: &str, phone_digits: usize) -> Verdict {
    if PHONE_CANONICAL_RE.is_match(text) {
        return Verdict::Pass;
    }
    let digit_count = text.chars().filter(|c| c.is_ascii_digit()).count();
    if digit_count == phone_digits {
        Verdict::Warning(format!(
            "Non-standard phone format (expected XXX-XXX-XXXX): '{}'",
            text
        ))
    } else {
        Verdict::Critical(format!("Unrecognizable phone format: '{}'", text))
    }
}

fn validate_date(field: &str, text: &str, config: &Config) -> Verdict {
    if text == constants::INVALID_DATE_MARKER {
        return Verdict::Critical(format!("{} is unparseable", field));
    }
    if DATE_CANONICAL_RE.is_match(text) {
        if let Ok(date) = NaiveDate::parse_from_str(text, constants::CANONICAL_DATE_FORMAT) {
            if field == constants::DATE_OF_BIRTH {
                return check_age(text, date);
            }
            return Verdict::Pass;
        }
        return Verdict::Critical(format!("{} is not a valid date: '{}'", field, text));
    }
    for format in &config.cleaning.date_formats {
        if NaiveDate::parse_from_str(text, format).is_ok() {
            return Verdict::Warning(format!(
                "{} wrong format '{}' (expected YYYY-MM-DD)",
                field, text
            ));
        }
    }
    Verdict::Critical(format!("{} is not a valid date: '{}'", field, text))
}

/// Plausibility screen on date_of_birth: the value is well-formed, so out
/// of range ages warn rather than block
fn check_age(text: &str, dob: NaiveDate) -> Verdict {
    let today = Utc::now().date_naive();
    let age_days = (today - dob).num_days();
    let age_years = age_days as f64 / 365.25;
    if age_years < 18.0 {
        Verdict::Warning(format!(
            "Customer appears to be under 18 (age ~{:.1}): '{}'",
            age_years, text
        ))
    } else if age_years > 120.0 {
        Verdict::Warning(format!(
            "Date of birth implies impossibly old age ({:.1}): '{}'",
            age_years, text
        ))
    } else {
        Verdict::Pass
    }
}

fn validate_address(text: &str) -> Verdict {
    if text.len() < 10 {
        Verdict::Critical(format!("Address too short (min 10 chars): '{}'", text))
    } else if text.len() > 200 {
        Verdict::Critical("Address too long (max 200 chars)".to_string())
    } else {
        Verdict::Pass
    }
}

fn validate_income(field: &str, value: &Value, text: &str) -> Verdict {
    let number = match value {
        Value::Number(n) => Some(*n),
        _ => text.parse::<f64>().ok(),
    };
    match number {
        None => Verdict::Critical(format!("{} is not a number: '{}'", field, text)),
        Some(n) if n < 0.0 => Verdict::Critical(format!("{} cannot be negative: {}", field, n)),
        Some(n) if n > INCOME_CAP => {
            Verdict::Warning(format!("{} exceeds $10M cap: {}", field, n))
        }
        Some(_) => Verdict::Pass,
    }
}

fn validate_enum(field: &str, text: &str, allowed: &[String]) -> Verdict {
    let lower = text.to_lowercase();
    if allowed.iter().any(|a| a == &lower) {
        Verdict::Pass
    } else {
        Verdict::Critical(format!(
            "Invalid {} '{}' (must be one of: {})",
            field,
            text,
            allowed.join(", ")
        ))
    }
}

/// Cross-field consistency: an account cannot be created before the
/// customer was born. Logged as a warning, never escalated (configurable
/// via `pipeline.cross_field_checks`).
fn check_date_ordering(row: &Row) -> Option<Verdict> {
    let dob = NaiveDate::parse_from_str(
        &row.text(constants::DATE_OF_BIRTH),
        constants::CANONICAL_DATE_FORMAT,
    )
    .ok()?;
    let created = NaiveDate::parse_from_str(
        &row.text(constants::CREATED_DATE),
        constants::CANONICAL_DATE_FORMAT,
    )
    .ok()?;
    if created < dob {
        Some(Verdict::Warning(format!(
            "created_date {} precedes date_of_birth {}",
            created, dob
        )))
    } else {
        None
    }
}

fn find_duplicate_ids(dataset: &Dataset) -> Vec<String> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for row in &dataset.rows {
        let id = row.text(constants::CUSTOMER_ID);
        if !id.is_empty() {
            *counts.entry(id).or_insert(0) += 1;
        }
    }
    counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(id, _)| id)
        .collect()
}

fn record_row(
    outcome: &mut ValidationOutcome,
    idx: usize,
    customer_id: String,
    verdicts: Vec<FieldVerdict>,
    row: &Row,
) {
    for fv in &verdicts {
        let severity = match &fv.verdict {
            Verdict::Pass => continue,
            Verdict::Warning(_) => {
                outcome.warning_count += 1;
                Severity::Warning
            }
            Verdict::Critical(_) => {
                outcome.critical_count += 1;
                Severity::Critical
            }
        };
        outcome
            .failures_by_field
            .entry(fv.field.clone())
            .or_default()
            .push(FailureDetail {
                row: idx + 1,
                customer_id: customer_id.clone(),
                value: row.text(&fv.field),
                reason: fv.verdict.reason().unwrap_or_default().to_string(),
                severity,
            });
    }

    let row_validation = RowValidation {
        row: idx,
        customer_id,
        verdicts,
    };
    if row_validation.passed() {
        outcome.rows_passed += 1;
    }
    if row_validation.has_critical() {
        outcome.rows_with_criticals += 1;
    } else if row_validation.has_warning() {
        outcome.rows_with_warnings += 1;
    }
    outcome.rows.push(row_validation);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NormalizeKind, PiiCategory, CUSTOMER_SCHEMA};

    fn config() -> Config {
        Config::default()
    }

    fn rule(name: &str, kind: FieldKind) -> FieldRule {
        FieldRule {
            name: name.to_string(),
            kind,
            required: true,
            normalize: None,
            pii: None,
        }
    }

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    #[test]
    fn test_missing_identity_critical_is_critical() {
        let r = rule(
            "account_status",
            FieldKind::Enum(vec!["active".into(), "unknown".into()]),
        );
        let verdict = validate_field(&Value::Missing, &r, &config());
        assert!(verdict.is_critical());
        // The imputed enum placeholder counts as missing too
        let verdict = validate_field(&text("unknown"), &r, &config());
        assert!(verdict.is_critical());
    }

    #[test]
    fn test_missing_required_non_critical_is_warning() {
        let r = rule("first_name", FieldKind::Name);
        assert!(matches!(
            validate_field(&Value::Missing, &r, &config()),
            Verdict::Warning(_)
        ));
        assert!(matches!(
            validate_field(&text("[UNKNOWN]"), &r, &config()),
            Verdict::Warning(_)
        ));
    }

    #[test]
    fn test_name_rules() {
        let r = rule("first_name", FieldKind::Name);
        assert!(validate_field(&text("Patricia"), &r, &config()).is_pass());
        assert!(validate_field(&text("O'Brien-Smith"), &r, &config()).is_pass());
        assert!(validate_field(&text("X"), &r, &config()).is_critical());
        assert!(validate_field(&text("J4ne"), &r, &config()).is_critical());
    }

    #[test]
    fn test_email_rules() {
        let r = rule("email", FieldKind::Email);
        assert!(validate_field(&text("patricia.davis@gmail.com"), &r, &config()).is_pass());
        assert!(validate_field(&text("not-an-email"), &r, &config()).is_critical());
        assert!(validate_field(&text("missing@tld"), &r, &config()).is_critical());
    }

    #[test]
    fn test_phone_severity_split() {
        let r = rule("phone", FieldKind::Phone);
        assert!(validate_field(&text("555-234-5678"), &r, &config()).is_pass());
        // Ten digits in a non-canonical shape: recoverable, warning only
        assert!(matches!(
            validate_field(&text("(555) 234-5678"), &r, &config()),
            Verdict::Warning(_)
        ));
        // Wrong digit count: malformed
        assert!(validate_field(&text("555-1234"), &r, &config()).is_critical());
    }

    #[test]
    fn test_date_severity_split() {
        let r = rule("created_date", FieldKind::Date);
        assert!(validate_field(&text("2020-01-15"), &r, &config()).is_pass());
        assert!(matches!(
            validate_field(&text("2020/01/15"), &r, &config()),
            Verdict::Warning(_)
        ));
        assert!(validate_field(&text("[INVALID_DATE]"), &r, &config()).is_critical());
        assert!(validate_field(&text("garbage"), &r, &config()).is_critical());
    }

    #[test]
    fn test_dob_age_plausibility_warns() {
        let r = rule("date_of_birth", FieldKind::Date);
        let this_year = Utc::now().date_naive().format("%Y").to_string();
        let minor = format!("{}-01-01", this_year.parse::<i32>().unwrap() - 5);
        assert!(matches!(
            validate_field(&text(&minor), &r, &config()),
            Verdict::Warning(_)
        ));
        assert!(matches!(
            validate_field(&text("1870-01-01"), &r, &config()),
            Verdict::Warning(_)
        ));
        assert!(validate_field(&text("1985-03-12"), &r, &config()).is_pass());
    }

    #[test]
    fn test_income_rules() {
        let r = rule("income", FieldKind::Numeric);
        assert!(validate_field(&text("75000"), &r, &config()).is_pass());
        assert!(validate_field(&Value::Number(0.0), &r, &config()).is_pass());
        assert!(validate_field(&text("-5"), &r, &config()).is_critical());
        assert!(validate_field(&text("lots"), &r, &config()).is_critical());
        assert!(matches!(
            validate_field(&text("20000000"), &r, &config()),
            Verdict::Warning(_)
        ));
    }

    #[test]
    fn test_enum_rules() {
        let r = rule(
            "account_status",
            FieldKind::Enum(vec![
                "active".into(),
                "inactive".into(),
                "suspended".into(),
                "unknown".into(),
            ]),
        );
        assert!(validate_field(&text("active"), &r, &config()).is_pass());
        assert!(validate_field(&text("Suspended"), &r, &config()).is_pass());
        assert!(validate_field(&text("frozen"), &r, &config()).is_critical());
    }

    fn build_row(fields: &[(&str, &str)]) -> Row {
        let mut row = Row::new();
        for (name, value) in fields {
            row.set(name, text(value));
        }
        row
    }

    fn clean_row(id: &str) -> Row {
        build_row(&[
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
        ])
    }

    #[test]
    fn test_dataset_run_counts() {
        let mut ds = Dataset::new(CUSTOMER_SCHEMA.clone());
        ds.rows.push(clean_row("1"));
        let mut bad = clean_row("2");
        bad.set("account_status", text("unknown"));
        ds.rows.push(bad);

        let outcome = run(&ds, &config());
        assert_eq!(outcome.total_rows, 2);
        assert_eq!(outcome.rows_passed, 1);
        assert_eq!(outcome.rows_with_criticals, 1);
        assert_eq!(outcome.critical_row_fraction(), 0.5);
    }

    #[test]
    fn test_duplicate_customer_ids_detected() {
        let mut ds = Dataset::new(CUSTOMER_SCHEMA.clone());
        ds.rows.push(clean_row("7"));
        ds.rows.push(clean_row("7"));

        let outcome = run(&ds, &config());
        assert_eq!(outcome.rows_with_criticals, 2);
        let failures = outcome.failures_by_field.get("customer_id").unwrap();
        assert!(failures.iter().all(|f| f.reason.contains("Duplicate")));
    }

    #[test]
    fn test_cross_field_ordering_warns() {
        let mut ds = Dataset::new(CUSTOMER_SCHEMA.clone());
        let mut row = clean_row("1");
        row.set("created_date", text("1980-01-01"));
        ds.rows.push(row);

        let outcome = run(&ds, &config());
        let failures = outcome.failures_by_field.get("created_date").unwrap();
        assert!(failures[0].reason.contains("precedes date_of_birth"));
        assert_eq!(failures[0].severity, Severity::Warning);

        // And the check can be switched off
        let mut cfg = config();
        cfg.pipeline.cross_field_checks = false;
        let outcome = run(&ds, &cfg);
        assert!(!outcome.failures_by_field.contains_key("created_date"));
    }

    #[test]
    fn test_field_defects_never_halt_other_rows() {
        let mut ds = Dataset::new(CUSTOMER_SCHEMA.clone());
        let mut bad = clean_row("1");
        bad.set("email", text("garbage"));
        bad.set("phone", text("12"));
        ds.rows.push(bad);
        ds.rows.push(clean_row("2"));

        let outcome = run(&ds, &config());
        assert_eq!(outcome.rows.len(), 2);
        assert!(outcome.rows[1].passed());
    }

    #[test]
    fn test_schema_rules_reference_expected_categories() {
        // Guard against schema drift the validators depend on
        let schema = &*CUSTOMER_SCHEMA;
        assert_eq!(
            schema.rule("phone").unwrap().normalize,
            Some(NormalizeKind::Phone)
        );
        assert_eq!(
            schema.rule("email").unwrap().pii,
            Some(PiiCategory::Email)
        );
    }
}
