use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::common::constants;
use crate::config::MaskingConfig;
use crate::domain::{Dataset, PiiCategory, Value};
use crate::pipeline::processing::pii::PiiFinding;

/// Summary of the Mask stage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaskSummary {
    pub masked_by_column: BTreeMap<String, usize>,
    pub total_masked: usize,
}

/// Mask every (row, field) pair the classifier flagged. Fields without a
/// finding are left untouched, as are the categories that carry no direct
/// identifier risk (income stays readable for aggregate reporting).
pub fn run(dataset: &mut Dataset, findings: &[PiiFinding], config: &MaskingConfig) -> MaskSummary {
    let mut summary = MaskSummary::default();
    for finding in findings {
        if !is_masked_category(finding.category) {
            continue;
        }
        let Some(row) = dataset.rows.get_mut(finding.row) else {
            continue;
        };
        let original = row.text(&finding.field);
        let masked = mask_value(&original, finding.category, config);
        if masked != original {
            row.set(&finding.field, Value::Text(masked));
            *summary
                .masked_by_column
                .entry(finding.field.clone())
                .or_insert(0) += 1;
            summary.total_masked += 1;
        }
    }
    summary
}

/// Categories the engine masks. Income, account_status, created_date, and
/// customer_id are business data and pass through unmasked.
pub fn is_masked_category(category: PiiCategory) -> bool {
    !matches!(category, PiiCategory::Income)
}

/// Apply the category-specific partial-reveal mask to one value.
/// Placeholder values written by the Clean stage pass through unchanged.
pub fn mask_value(value: &str, category: PiiCategory, config: &MaskingConfig) -> String {
    if value.is_empty()
        || value == constants::UNKNOWN_MARKER
        || value == constants::INVALID_DATE_MARKER
    {
        return value.to_string();
    }
    match category {
        PiiCategory::Name => mask_name(value, config.name_reveal_chars),
        PiiCategory::Email => mask_email(value, config.email_reveal_chars),
        PiiCategory::Phone => mask_phone(value, config.phone_reveal_digits),
        PiiCategory::Address => constants::MASKED_ADDRESS_MARKER.to_string(),
        PiiCategory::DateOfBirth => mask_dob(value),
        PiiCategory::Income => value.to_string(),
    }
}

/// 'John' -> 'J***'
fn mask_name(value: &str, reveal: usize) -> String {
    let kept: String = value.chars().take(reveal.max(1)).collect();
    format!("{}***", kept)
}

/// 'john.doe@gmail.com' -> 'j***@gmail.com' (domain kept)
fn mask_email(value: &str, reveal: usize) -> String {
    let Some((local, domain)) = value.split_once('@') else {
        return value.to_string();
    };
    let kept: String = local.chars().take(reveal.max(1)).collect();
    format!("{}***@{}", kept, domain)
}

/// '555-234-5678' -> '***-***-5678' (separator shape preserved)
fn mask_phone(value: &str, reveal_digits: usize) -> String {
    let parts: Vec<&str> = value.split('-').collect();
    if parts.len() == 3 {
        return format!("***-***-{}", parts[2]);
    }
    // Fallback for a non-canonical shape: keep the trailing digits only
    let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() >= reveal_digits {
        format!("***-***-{}", &digits[digits.len() - reveal_digits..])
    } else {
        "***".to_string()
    }
}

/// '1985-03-15' -> '1985-**-**' (year kept for age-bracket analysis)
fn mask_dob(value: &str) -> String {
    let parts: Vec<&str> = value.split('-').collect();
    if parts.len() == 3 {
        format!("{}-**-**", parts[0])
    } else {
        "****-**-**".to_string()
    }
}
