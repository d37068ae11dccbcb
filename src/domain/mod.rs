use crate::common::constants;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single cell of the dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Text(String),
    Number(f64),
    Missing,
}

impl Value {
    /// True for an explicit Missing marker or an empty/whitespace string
    pub fn is_missing(&self) -> bool {
        match self {
            Value::Missing => true,
            Value::Text(s) => s.trim().is_empty(),
            Value::Number(_) => false,
        }
    }

    /// Render the cell for delimited output and reports
    pub fn render(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            Value::Missing => String::new(),
        }
    }
}

static MISSING: Value = Value::Missing;

/// One record of the dataset, keyed by field name
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Row {
    values: HashMap<String, Value>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> &Value {
        self.values.get(field).unwrap_or(&MISSING)
    }

    pub fn set(&mut self, field: &str, value: Value) {
        self.values.insert(field.to_string(), value);
    }

    /// Text content of a field, trimmed; empty string when missing
    pub fn text(&self, field: &str) -> String {
        match self.get(field) {
            Value::Text(s) => s.trim().to_string(),
            Value::Number(n) => Value::Number(*n).render(),
            Value::Missing => String::new(),
        }
    }
}

/// The in-memory row-oriented table threaded through every stage.
/// All rows share the schema's field set; the engine owns the dataset for
/// the duration of a run and stages borrow it.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub schema: Schema,
    pub rows: Vec<Row>,
}

impl Dataset {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Expected shape of a field's values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldKind {
    Integer,
    Name,
    Email,
    Phone,
    Date,
    Address,
    Numeric,
    Enum(Vec<String>),
}

impl FieldKind {
    pub fn label(&self) -> &'static str {
        match self {
            FieldKind::Integer => "Integer",
            FieldKind::Name => "String",
            FieldKind::Email => "String",
            FieldKind::Phone => "String",
            FieldKind::Date => "Date (YYYY-MM-DD)",
            FieldKind::Address => "String",
            FieldKind::Numeric => "Numeric",
            FieldKind::Enum(_) => "String",
        }
    }
}

/// Normalization category applied during the Clean stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NormalizeKind {
    Date,
    Phone,
    Name,
    Email,
    Status,
}

/// PII categories recognized by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PiiCategory {
    Name,
    Email,
    Phone,
    Address,
    DateOfBirth,
    Income,
}

impl PiiCategory {
    pub fn label(&self) -> &'static str {
        match self {
            PiiCategory::Name => "name",
            PiiCategory::Email => "email",
            PiiCategory::Phone => "phone",
            PiiCategory::Address => "address",
            PiiCategory::DateOfBirth => "date_of_birth",
            PiiCategory::Income => "income",
        }
    }
}

/// Immutable description of a field's expected type, requiredness, and the
/// normalization / PII categories that apply to it. Defined once per schema
/// and shared read-only by the validators and normalizers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldRule {
    pub name: String,
    pub kind: FieldKind,
    pub required: bool,
    pub normalize: Option<NormalizeKind>,
    pub pii: Option<PiiCategory>,
}

/// Ordered set of field rules shared by every row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    pub fields: Vec<FieldRule>,
}

impl Schema {
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn rule(&self, name: &str) -> Option<&FieldRule> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// The default customer schema: customer_id, names, contact fields,
/// date_of_birth, income, account_status, created_date
pub static CUSTOMER_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    let field = |name: &str, kind: FieldKind, required, normalize, pii| FieldRule {
        name: name.to_string(),
        kind,
        required,
        normalize,
        pii,
    };
    Schema {
        fields: vec![
            field(constants::CUSTOMER_ID, FieldKind::Integer, true, None, None),
            field(
                constants::FIRST_NAME,
                FieldKind::Name,
                true,
                Some(NormalizeKind::Name),
                Some(PiiCategory::Name),
            ),
            field(
                constants::LAST_NAME,
                FieldKind::Name,
                true,
                Some(NormalizeKind::Name),
                Some(PiiCategory::Name),
            ),
            field(
                constants::EMAIL,
                FieldKind::Email,
                true,
                Some(NormalizeKind::Email),
                Some(PiiCategory::Email),
            ),
            field(
                constants::PHONE,
                FieldKind::Phone,
                true,
                Some(NormalizeKind::Phone),
                Some(PiiCategory::Phone),
            ),
            field(
                constants::ADDRESS,
                FieldKind::Address,
                true,
                None,
                Some(PiiCategory::Address),
            ),
            field(
                constants::DATE_OF_BIRTH,
                FieldKind::Date,
                true,
                Some(NormalizeKind::Date),
                Some(PiiCategory::DateOfBirth),
            ),
            field(
                constants::INCOME,
                FieldKind::Numeric,
                true,
                None,
                Some(PiiCategory::Income),
            ),
            field(
                constants::ACCOUNT_STATUS,
                FieldKind::Enum(vec![
                    "active".to_string(),
                    "inactive".to_string(),
                    "suspended".to_string(),
                    constants::UNKNOWN_STATUS.to_string(),
                ]),
                true,
                Some(NormalizeKind::Status),
                None,
            ),
            field(
                constants::CREATED_DATE,
                FieldKind::Date,
                true,
                Some(NormalizeKind::Date),
                None,
            ),
        ],
    }
});
