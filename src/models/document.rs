//! Application document: the nested, camelCase read projection keyed by the
//! external uuid (`applicationId`) and mirroring the surrogate id as `mysqlId`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Root document fields that hold ciphertext.
pub const ENCRYPTED_ROOT_FIELDS: &[&str] = &[
    "businessName",
    "dba",
    "ein",
    "website",
    "mailingAddress",
    "mailingAddress2",
];

/// Ciphertext fields inside embedded arrays, by array key.
pub const ENCRYPTED_NESTED_FIELDS: &[(&str, &[&str])] = &[
    ("contacts", &["email", "phone"]),
    ("owners", &["firstName", "lastName"]),
];

/// Embedded arrays of the document.
pub const EMBEDDED_ARRAYS: &[&str] = &[
    "locations",
    "contacts",
    "owners",
    "claims",
    "policies",
    "activityCodes",
    "questions",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationDocument {
    fields: Map<String, Value>,
}

impl ApplicationDocument {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn application_id(&self) -> Option<Uuid> {
        self.fields
            .get("applicationId")
            .and_then(Value::as_str)
            .and_then(|s| Uuid::parse_str(s).ok())
    }

    pub fn mysql_id(&self) -> Option<i64> {
        self.fields.get("mysqlId").and_then(Value::as_i64)
    }

    /// Documents without an explicit flag are active.
    pub fn is_active(&self) -> bool {
        self.fields
            .get("active")
            .and_then(Value::as_bool)
            .unwrap_or(true)
    }

    pub fn last_step(&self) -> Option<i64> {
        self.fields.get("lastStep").and_then(Value::as_i64)
    }

    /// Objects of an embedded array; absent or malformed entries are skipped.
    pub fn array(&self, key: &str) -> Vec<&Map<String, Value>> {
        self.fields
            .get(key)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_object).collect())
            .unwrap_or_default()
    }

    /// Top-level scalar fields only.
    pub fn scalar_fields(&self) -> Map<String, Value> {
        self.fields
            .iter()
            .filter(|(_, v)| !v.is_object() && !v.is_array())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Shallow merge: keys in `patch` replace existing values wholesale
    /// (arrays included); keys absent from `patch` are preserved.
    pub fn merged(&self, patch: &Map<String, Value>) -> Self {
        let mut fields = self.fields.clone();
        for (key, value) in patch {
            fields.insert(key.clone(), value.clone());
        }
        Self { fields }
    }
}

impl From<Map<String, Value>> for ApplicationDocument {
    fn from(fields: Map<String, Value>) -> Self {
        Self::new(fields)
    }
}
