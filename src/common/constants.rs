/// Column name constants for the customer schema to ensure consistency
/// across stages, reports, and adapters
pub const CUSTOMER_ID: &str = "customer_id";
pub const FIRST_NAME: &str = "first_name";
pub const LAST_NAME: &str = "last_name";
pub const EMAIL: &str = "email";
pub const PHONE: &str = "phone";
pub const ADDRESS: &str = "address";
pub const DATE_OF_BIRTH: &str = "date_of_birth";
pub const INCOME: &str = "income";
pub const ACCOUNT_STATUS: &str = "account_status";
pub const CREATED_DATE: &str = "created_date";

// Placeholder literals written into the dataset by the Clean and Mask stages.
// These are first-class values: normalizers and validators recognize them
// before attempting structural parsing.
pub const UNKNOWN_MARKER: &str = "[UNKNOWN]";
pub const INVALID_DATE_MARKER: &str = "[INVALID_DATE]";
pub const MASKED_ADDRESS_MARKER: &str = "[MASKED ADDRESS]";
pub const UNKNOWN_STATUS: &str = "unknown";

/// Canonical output format for every normalized date
pub const CANONICAL_DATE_FORMAT: &str = "%Y-%m-%d";

// Output artifact names (written relative to the configured output directory)
pub const CLEANED_DATASET_FILE: &str = "customers_cleaned.csv";
pub const MASKED_DATASET_FILE: &str = "customers_masked.csv";
pub const QUALITY_PROFILE_REPORT: &str = "data_quality_report.txt";
pub const CLEANING_LOG_REPORT: &str = "cleaning_log.txt";
pub const VALIDATION_RESULTS_REPORT: &str = "validation_results.txt";
pub const PII_DETECTION_REPORT: &str = "pii_detection_report.txt";
pub const MASKED_SAMPLE_REPORT: &str = "masked_sample.txt";
pub const EXECUTION_REPORT: &str = "pipeline_execution_report.txt";
pub const EXECUTION_REPORT_JSON: &str = "pipeline_execution_report.json";

/// All schema columns in canonical order
pub fn schema_columns() -> Vec<&'static str> {
    vec![
        CUSTOMER_ID,
        FIRST_NAME,
        LAST_NAME,
        EMAIL,
        PHONE,
        ADDRESS,
        DATE_OF_BIRTH,
        INCOME,
        ACCOUNT_STATUS,
        CREATED_DATE,
    ]
}
