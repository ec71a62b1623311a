//! Business entity: one relational row per application at this workflow stage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::payload::FieldType;

/// Relational business row. Fields documented as ciphertext are never stored
/// in clear; `*_hash` companions support equality search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessRecord {
    /// Surrogate id; 0 until inserted.
    pub id: i64,
    /// Ciphertext
    pub name: String,
    pub name_hash: String,
    /// Ciphertext
    pub dba: Option<String>,
    /// Ciphertext
    pub ein: Option<String>,
    pub ein_hash: Option<String>,
    pub entity_type: Option<String>,
    /// Ciphertext
    pub website: Option<String>,
    /// Ciphertext
    pub mailing_address: Option<String>,
    /// Ciphertext
    pub mailing_address2: Option<String>,
    pub mailing_city: Option<String>,
    pub mailing_state: Option<String>,
    pub mailing_zip: Option<String>,
    pub industry_code: Option<i64>,
    /// Ciphertext of the owners JSON array
    pub owners: Option<String>,
    pub registered_address: Option<String>,
    pub num_employees: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Serialized columns of [`BusinessRecord`].
pub const BUSINESS_COLUMNS: &[&str] = &[
    "id",
    "name",
    "name_hash",
    "dba",
    "ein",
    "ein_hash",
    "entity_type",
    "website",
    "mailing_address",
    "mailing_address2",
    "mailing_city",
    "mailing_state",
    "mailing_zip",
    "industry_code",
    "owners",
    "registered_address",
    "num_employees",
    "created_at",
    "updated_at",
];

/// Business fields as supplied on the `contact` step, in clear text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BusinessInput {
    pub name: String,
    #[serde(default)]
    pub dba: Option<String>,
    #[serde(default)]
    pub ein: Option<String>,
    #[serde(default)]
    pub entity_type: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub mailing_address: Option<String>,
    #[serde(default)]
    pub mailing_address2: Option<String>,
    #[serde(default)]
    pub mailing_city: Option<String>,
    #[serde(default)]
    pub mailing_state: Option<String>,
    #[serde(default)]
    pub mailing_zip: Option<String>,
    #[serde(default)]
    pub industry_code: Option<i64>,
}

impl BusinessInput {
    pub const FIELD_TYPES: &'static [(&'static str, FieldType)] = &[
        ("name", FieldType::Text),
        ("dba", FieldType::Text),
        ("ein", FieldType::Text),
        ("entity_type", FieldType::Text),
        ("website", FieldType::Text),
        ("mailing_address", FieldType::Text),
        ("mailing_address2", FieldType::Text),
        ("mailing_city", FieldType::Text),
        ("mailing_state", FieldType::Text),
        ("mailing_zip", FieldType::Text),
        ("industry_code", FieldType::Integer),
    ];

    /// EIN with formatting removed, so `12-3456789` and `123456789` hash alike.
    pub fn normalized_ein(&self) -> Option<String> {
        self.ein
            .as_deref()
            .map(|ein| ein.chars().filter(char::is_ascii_digit).collect::<String>())
            .filter(|ein| !ein.is_empty())
    }
}

/// Business owner captured on the `owners` step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnerInput {
    pub fname: String,
    pub lname: String,
    #[serde(default)]
    pub ownership: Option<f64>,
    #[serde(default)]
    pub officer_title: Option<String>,
    #[serde(default)]
    pub birthdate: Option<chrono::NaiveDate>,
    /// Owner is included in workers' comp coverage
    #[serde(default)]
    pub include: bool,
    #[serde(default)]
    pub activity_code_id: Option<i64>,
    #[serde(default)]
    pub payroll: Option<i64>,
}

impl OwnerInput {
    pub const FIELD_TYPES: &'static [(&'static str, FieldType)] = &[
        ("fname", FieldType::Text),
        ("lname", FieldType::Text),
        ("ownership", FieldType::Float),
        ("officer_title", FieldType::Text),
        ("birthdate", FieldType::Date),
        ("include", FieldType::Bool),
        ("activity_code_id", FieldType::Integer),
        ("payroll", FieldType::Integer),
    ];

    /// Payroll to add to the activity code when the owner is covered.
    pub fn covered_payroll(&self) -> Option<(i64, i64)> {
        match (self.include, self.activity_code_id, self.payroll) {
            (true, Some(code), Some(payroll)) if payroll > 0 => Some((code, payroll)),
            _ => None,
        }
    }
}

/// External business data used to backfill a business after creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentResult {
    #[serde(default)]
    pub registered_address: Option<String>,
    #[serde(default)]
    pub employee_count: Option<i32>,
}

impl EnrichmentResult {
    pub fn is_empty(&self) -> bool {
        self.registered_address.is_none() && self.employee_count.is_none()
    }

    /// Document fields mirrored from the enrichment.
    pub fn document_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        if let Some(ref address) = self.registered_address {
            fields.insert("registeredAddress".to_string(), Value::from(address.clone()));
        }
        if let Some(count) = self.employee_count {
            fields.insert("employeeCount".to_string(), Value::from(count));
        }
        fields
    }
}
