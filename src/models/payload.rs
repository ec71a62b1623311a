//! Inbound step payloads: a flat property bag in relational naming with a few
//! nested collections.

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Semantic type a payload field is coerced to before mapping or persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Integer,
    Float,
    Date,
    Bool,
    Text,
}

/// How the caller identifies an existing application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationIdentity {
    /// Relational surrogate id
    Id(i64),
    /// External uuid (document `applicationId`)
    Uuid(Uuid),
}

impl std::fmt::Display for ApplicationIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "Application {}", id),
            Self::Uuid(uuid) => write!(f, "Application {}", uuid),
        }
    }
}

/// Keys consumed structurally by the workflow; never copied as free scalars.
pub const RESERVED_KEYS: &[&str] = &[
    "id",
    "application_id",
    "applicationId",
    "uuid",
    "business",
    "locations",
    "owners",
    "claims",
    "questions",
    "policy_types",
    "activity_codes",
    "legal_acceptance",
    "quote_id",
    "insurer_ids",
    "bypass_edit_window",
    "agency_id",
    "agency_location_id",
    "last_step",
    "state",
    "status",
    "app_status_id",
    "progress",
    "business_id",
    "agency_network_id",
    "created_at",
    "updated_at",
];

/// A step payload as received from the portal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepPayload {
    fields: Map<String, Value>,
}

impl StepPayload {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn from_value(value: Value) -> AppResult<Self> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(AppError::Validation(format!(
                "step payload must be a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key).filter(|v| !v.is_null())
    }

    /// Resolve the application identity carried by the payload, if any.
    pub fn identity(&self) -> AppResult<Option<ApplicationIdentity>> {
        if let Some(id) = self.get("id") {
            let parsed = match id {
                Value::Number(n) => n.as_i64(),
                Value::String(s) if s.trim().is_empty() => return Ok(None),
                Value::String(s) => s.trim().parse::<i64>().ok(),
                _ => None,
            };
            return match parsed {
                Some(id) if id > 0 => Ok(Some(ApplicationIdentity::Id(id))),
                _ => Err(AppError::Validation(format!("invalid application id: {}", id))),
            };
        }

        for key in ["applicationId", "application_id", "uuid"] {
            if let Some(value) = self.get(key) {
                let text = value.as_str().ok_or_else(|| {
                    AppError::Validation(format!("{} must be a string uuid", key))
                })?;
                if text.trim().is_empty() {
                    continue;
                }
                return Ok(Some(ApplicationIdentity::Uuid(Uuid::parse_str(text.trim())?)));
            }
        }

        Ok(None)
    }

    pub fn object(&self, key: &str) -> AppResult<Option<&Map<String, Value>>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Object(map)) => Ok(Some(map)),
            Some(other) => Err(AppError::Validation(format!(
                "{} must be an object, got {}",
                key,
                json_kind(other)
            ))),
        }
    }

    /// Items of an array field. Absent means "not part of this save"; present
    /// (even empty) means the full authoritative set.
    pub fn array(&self, key: &str) -> AppResult<Option<Vec<&Map<String, Value>>>> {
        object_array(&self.fields, key)
    }

    pub fn text(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn integer(&self, key: &str) -> Option<i64> {
        match self.get(key)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Truthy flag; accepts booleans, 0/1 and "true"/"false".
    pub fn flag(&self, key: &str) -> bool {
        match self.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_i64().unwrap_or(0) != 0,
            Some(Value::String(s)) => matches!(s.trim(), "true" | "1" | "yes"),
            _ => false,
        }
    }

    /// Top-level scalar properties that are not consumed structurally.
    pub fn scalars(&self) -> Map<String, Value> {
        self.fields
            .iter()
            .filter(|(key, value)| {
                !RESERVED_KEYS.contains(&key.as_str()) && !value.is_object() && !value.is_array()
            })
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

impl From<Map<String, Value>> for StepPayload {
    fn from(fields: Map<String, Value>) -> Self {
        Self::new(fields)
    }
}

/// Read an optional array of objects out of any JSON map.
pub fn object_array<'a>(
    map: &'a Map<String, Value>,
    key: &str,
) -> AppResult<Option<Vec<&'a Map<String, Value>>>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                item.as_object().ok_or_else(|| {
                    AppError::Validation(format!("{}[{}] must be an object", key, index))
                })
            })
            .collect::<AppResult<Vec<_>>>()
            .map(Some),
        Some(other) => Err(AppError::Validation(format!(
            "{} must be an array, got {}",
            key,
            json_kind(other)
        ))),
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
