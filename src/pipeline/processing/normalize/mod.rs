use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::common::constants;
use crate::config::CleaningConfig;
use crate::domain::NormalizeKind;

/// Result of running a normalizer over one raw field value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NormalizeOutcome {
    /// Value was already in canonical form (or empty) and passes through
    Unchanged,
    /// Value was recognized and rewritten into canonical form
    Normalized(String),
    /// Value could not be parsed under any accepted format
    Unparseable,
}

/// Dispatch a raw value to the normalizer for its category.
/// The category set is closed, so this is a plain tagged match rather than
/// dynamic dispatch.
pub fn apply(kind: NormalizeKind, raw: &str, config: &CleaningConfig) -> NormalizeOutcome {
    match kind {
        NormalizeKind::Date => normalize_date(raw, config),
        NormalizeKind::Phone => normalize_phone(raw, config.phone_digits),
        NormalizeKind::Name => normalize_casing(raw, CaseKind::Name),
        NormalizeKind::Email => normalize_casing(raw, CaseKind::Email),
        NormalizeKind::Status => normalize_status(raw),
    }
}

/// Convert any recognizable date format to YYYY-MM-DD.
///
/// Sentinel literals (e.g. "invalid_date") are checked case-insensitively
/// before any parsing is attempted, so garbage placeholders are reported as
/// Unparseable rather than misclassified as a format failure. Formats are
/// tried in configured order, ISO first; the first successful parse wins.
pub fn normalize_date(raw: &str, config: &CleaningConfig) -> NormalizeOutcome {
    let raw = raw.trim();
    if raw.is_empty() {
        return NormalizeOutcome::Unchanged;
    }
    // An already-flagged value re-normalizes to itself
    if raw == constants::INVALID_DATE_MARKER {
        return NormalizeOutcome::Unchanged;
    }
    if config
        .sentinel_literals
        .iter()
        .any(|s| s.eq_ignore_ascii_case(raw))
    {
        return NormalizeOutcome::Unparseable;
    }
    for format in &config.date_formats {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            let canonical = date.format(constants::CANONICAL_DATE_FORMAT).to_string();
            return if canonical == raw {
                NormalizeOutcome::Unchanged
            } else {
                NormalizeOutcome::Normalized(canonical)
            };
        }
    }
    NormalizeOutcome::Unparseable
}

/// Convert any phone format to DDD-DDD-DDDD.
/// Strips all non-digit characters, then reformats; anything that does not
/// contain exactly the configured number of digits is Unparseable.
pub fn normalize_phone(raw: &str, phone_digits: usize) -> NormalizeOutcome {
    let raw = raw.trim();
    if raw.is_empty() {
        return NormalizeOutcome::Unchanged;
    }
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() != phone_digits {
        return NormalizeOutcome::Unparseable;
    }
    let formatted = format!("{}-{}-{}", &digits[..3], &digits[3..6], &digits[6..]);
    if formatted == raw {
        NormalizeOutcome::Unchanged
    } else {
        NormalizeOutcome::Normalized(formatted)
    }
}

/// Casing categories handled by `normalize_casing`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseKind {
    Name,
    Email,
}

/// Name -> title-case each token; Email -> lowercase the whole string.
/// Empty input passes through untouched (missing-value policy handles it).
pub fn normalize_casing(raw: &str, kind: CaseKind) -> NormalizeOutcome {
    let raw = raw.trim();
    if raw.is_empty() || raw == constants::UNKNOWN_MARKER {
        return NormalizeOutcome::Unchanged;
    }
    let result = match kind {
        CaseKind::Name => title_case(raw),
        CaseKind::Email => raw.to_lowercase(),
    };
    if result == raw {
        NormalizeOutcome::Unchanged
    } else {
        NormalizeOutcome::Normalized(result)
    }
}

/// Lowercase the account status ahead of enum validation
pub fn normalize_status(raw: &str) -> NormalizeOutcome {
    let raw = raw.trim();
    if raw.is_empty() {
        return NormalizeOutcome::Unchanged;
    }
    let lower = raw.to_lowercase();
    if lower == raw {
        NormalizeOutcome::Unchanged
    } else {
        NormalizeOutcome::Normalized(lower)
    }
}

/// Uppercase every letter that follows a non-letter, lowercase the rest:
/// "PATRICIA" -> "Patricia", "o'brien" -> "O'Brien", "mary-jane" -> "Mary-Jane"
fn title_case(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut prev_alpha = false;
    for c in raw.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}
