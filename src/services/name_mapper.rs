//! Field-name translation between relational columns (snake_case) and
//! document fields (camelCase).
//!
//! Every entity carries an explicit override table for renames that are not a
//! plain case conversion. Keys without an override are converted only when
//! they are a well-formed token of the source convention; anything else
//! (free-form keys, keys already in the target convention) passes through.
//! Nested objects and arrays keep their key unless an override names it.

use serde_json::{Map, Value};

use crate::models::ChildCollection;

/// `(relational column, document field)` pairs.
pub type NameOverrides = &'static [(&'static str, &'static str)];

/// Application record renames.
pub const APPLICATION_NAME_OVERRIDES: NameOverrides = &[
    ("id", "mysqlId"),
    ("uuid", "applicationId"),
    ("years_of_exp", "yearsOfExperience"),
    ("gross_sales_amt", "grossSalesAmount"),
];

/// Business record renames.
pub const BUSINESS_NAME_OVERRIDES: NameOverrides = &[
    ("name", "businessName"),
    ("name_hash", "businessNameHash"),
    ("num_employees", "employeeCount"),
];

/// Business owner renames.
pub const OWNER_NAME_OVERRIDES: NameOverrides = &[
    ("fname", "firstName"),
    ("lname", "lastName"),
    ("include", "includeInCoverage"),
];

#[derive(Debug, Clone, Copy)]
pub struct NameMapper {
    overrides: NameOverrides,
}

impl NameMapper {
    pub const APPLICATION: NameMapper = NameMapper::new(APPLICATION_NAME_OVERRIDES);
    pub const BUSINESS: NameMapper = NameMapper::new(BUSINESS_NAME_OVERRIDES);
    pub const OWNER: NameMapper = NameMapper::new(OWNER_NAME_OVERRIDES);

    pub const fn new(overrides: NameOverrides) -> Self {
        Self { overrides }
    }

    pub fn for_collection(collection: ChildCollection) -> Self {
        Self::new(collection.name_overrides())
    }

    /// Document name of one relational key.
    pub fn document_name(&self, key: &str) -> String {
        if let Some((_, document)) = self.overrides.iter().find(|(r, _)| *r == key) {
            return document.to_string();
        }
        snake_to_camel(key).unwrap_or_else(|| key.to_string())
    }

    /// Relational name of one document key.
    pub fn relational_name(&self, key: &str) -> String {
        if let Some((relational, _)) = self.overrides.iter().find(|(_, d)| *d == key) {
            return relational.to_string();
        }
        camel_to_snake(key).unwrap_or_else(|| key.to_string())
    }

    pub fn to_document_naming(&self, fields: &Map<String, Value>) -> Map<String, Value> {
        self.translate(fields, |key| self.document_name(key), |key| {
            self.overrides
                .iter()
                .find(|(r, _)| *r == key)
                .map(|(_, d)| d.to_string())
        })
    }

    pub fn to_relational_naming(&self, fields: &Map<String, Value>) -> Map<String, Value> {
        self.translate(fields, |key| self.relational_name(key), |key| {
            self.overrides
                .iter()
                .find(|(_, d)| *d == key)
                .map(|(r, _)| r.to_string())
        })
    }

    fn translate(
        &self,
        fields: &Map<String, Value>,
        scalar_name: impl Fn(&str) -> String,
        override_name: impl Fn(&str) -> Option<String>,
    ) -> Map<String, Value> {
        fields
            .iter()
            .map(|(key, value)| {
                let name = if value.is_object() || value.is_array() {
                    override_name(key).unwrap_or_else(|| key.clone())
                } else {
                    scalar_name(key)
                };
                (name, value.clone())
            })
            .collect()
    }
}

/// `gross_sales_amt` -> `grossSalesAmt`. `None` unless the key is lowercase
/// snake_case with at least one separator.
pub fn snake_to_camel(key: &str) -> Option<String> {
    if !is_snake_case(key) {
        return None;
    }
    let mut out = String::with_capacity(key.len());
    for (index, part) in key.split('_').enumerate() {
        if index == 0 {
            out.push_str(part);
            continue;
        }
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            out.push(first.to_ascii_uppercase());
            out.push_str(chars.as_str());
        }
    }
    Some(out)
}

/// `grossSalesAmt` -> `gross_sales_amt`. `None` unless the key is camelCase
/// with at least one hump.
pub fn camel_to_snake(key: &str) -> Option<String> {
    if !is_camel_case(key) {
        return None;
    }
    let mut out = String::with_capacity(key.len() + 4);
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            out.push('_');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    Some(out)
}

/// `^[a-z][a-z0-9]*(_[a-z][a-z0-9]*)+$`, without a one-letter segment
/// directly before another segment (`plan_a_b` would camel to `planAB`).
fn is_snake_case(key: &str) -> bool {
    let parts: Vec<&str> = key.split('_').collect();
    parts.len() > 1
        && parts.iter().all(|part| is_lower_word(part))
        && parts[1..parts.len() - 1].iter().all(|part| part.len() > 1)
}

/// `^[a-z][a-z0-9]*([A-Z][a-z0-9]*)+$`
fn is_camel_case(key: &str) -> bool {
    let mut chars = key.chars();
    if !chars.next().is_some_and(|c| c.is_ascii_lowercase()) {
        return false;
    }
    let mut humps = 0;
    let mut previous_upper = false;
    for c in chars {
        if c.is_ascii_uppercase() {
            // Runs of capitals (`mysqlID`) are not round-trippable.
            if previous_upper {
                return false;
            }
            humps += 1;
            previous_upper = true;
        } else if c.is_ascii_lowercase() || c.is_ascii_digit() {
            previous_upper = false;
        } else {
            return false;
        }
    }
    humps > 0
}

fn is_lower_word(part: &str) -> bool {
    let mut chars = part.chars();
    chars.next().is_some_and(|c| c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
}
