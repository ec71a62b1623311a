//! Child collections owned by an application aggregate.
//!
//! Children have no client-stable identity. Each save presents the full set,
//! so rows are replaced rather than diffed.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::payload::FieldType;
use crate::error::{AppError, AppResult};

/// Which parent row a collection hangs off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParentKind {
    Business,
    Application,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParentKey {
    Business(i64),
    Application(i64),
}

impl ParentKey {
    pub fn id(&self) -> i64 {
        match self {
            Self::Business(id) | Self::Application(id) => *id,
        }
    }

    pub fn kind(&self) -> ParentKind {
        match self {
            Self::Business(_) => ParentKind::Business,
            Self::Application(_) => ParentKind::Application,
        }
    }
}

impl std::fmt::Display for ParentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Business(id) => write!(f, "business {}", id),
            Self::Application(id) => write!(f, "application {}", id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChildCollection {
    Locations,
    Contacts,
    Claims,
    PolicyTypes,
    ActivityCodes,
    Questions,
}

impl ChildCollection {
    pub const ALL: [ChildCollection; 6] = [
        Self::Locations,
        Self::Contacts,
        Self::Claims,
        Self::PolicyTypes,
        Self::ActivityCodes,
        Self::Questions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Locations => "locations",
            Self::Contacts => "contacts",
            Self::Claims => "claims",
            Self::PolicyTypes => "policy_types",
            Self::ActivityCodes => "activity_codes",
            Self::Questions => "questions",
        }
    }

    /// Array key holding this collection in the application document.
    pub fn document_key(&self) -> &'static str {
        match self {
            Self::Locations => "locations",
            Self::Contacts => "contacts",
            Self::Claims => "claims",
            Self::PolicyTypes => "policies",
            Self::ActivityCodes => "activityCodes",
            Self::Questions => "questions",
        }
    }

    pub fn parent_kind(&self) -> ParentKind {
        match self {
            Self::Locations | Self::Contacts => ParentKind::Business,
            Self::Claims | Self::PolicyTypes | Self::ActivityCodes | Self::Questions => {
                ParentKind::Application
            }
        }
    }

    pub fn required_fields(&self) -> &'static [&'static str] {
        match self {
            Self::Locations => &["address", "city", "state", "zip"],
            Self::Contacts => &["fname", "lname", "email"],
            Self::Claims => &["policy_type", "date"],
            Self::PolicyTypes => &["policy_type"],
            Self::ActivityCodes => &["activity_code_id"],
            Self::Questions => &["question_id"],
        }
    }

    /// Declared types of the collection's relational columns.
    pub fn field_types(&self) -> &'static [(&'static str, FieldType)] {
        match self {
            Self::Locations => &[
                ("address", FieldType::Text),
                ("address2", FieldType::Text),
                ("city", FieldType::Text),
                ("state", FieldType::Text),
                ("zip", FieldType::Text),
                ("full_time_employees", FieldType::Integer),
                ("part_time_employees", FieldType::Integer),
                ("square_footage", FieldType::Integer),
                ("unemployment_num", FieldType::Text),
                ("billing", FieldType::Bool),
            ],
            Self::Contacts => &[
                ("fname", FieldType::Text),
                ("lname", FieldType::Text),
                ("email", FieldType::Text),
                ("phone", FieldType::Text),
                ("primary", FieldType::Bool),
            ],
            Self::Claims => &[
                ("policy_type", FieldType::Text),
                ("date", FieldType::Date),
                ("amount_paid", FieldType::Float),
                ("amount_reserved", FieldType::Float),
                ("open", FieldType::Bool),
                ("missed_work", FieldType::Bool),
                ("description", FieldType::Text),
            ],
            Self::PolicyTypes => &[
                ("policy_type", FieldType::Text),
                ("effective_date", FieldType::Date),
                ("expiration_date", FieldType::Date),
                ("limits", FieldType::Text),
                ("deductible", FieldType::Integer),
            ],
            Self::ActivityCodes => &[
                ("activity_code_id", FieldType::Integer),
                ("payroll", FieldType::Integer),
            ],
            Self::Questions => &[
                ("question_id", FieldType::Integer),
                ("question_type", FieldType::Text),
                ("question_text", FieldType::Text),
                ("answer_id", FieldType::Integer),
                ("text_answer", FieldType::Text),
            ],
        }
    }

    /// Relational column -> document field renames that are not a plain
    /// snake_case/camelCase conversion.
    pub fn name_overrides(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::Locations => &[
                ("zip", "zipcode"),
                ("unemployment_num", "unemploymentNumber"),
                ("billing", "billingLocation"),
            ],
            Self::Contacts => &[("fname", "firstName"), ("lname", "lastName")],
            Self::Claims => &[("date", "eventDate")],
            Self::PolicyTypes => &[],
            Self::ActivityCodes => &[("activity_code_id", "activityCodeId")],
            Self::Questions => &[("text_answer", "answerValue")],
        }
    }
}

impl std::fmt::Display for ChildCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRow {
    pub address: String,
    #[serde(default)]
    pub address2: Option<String>,
    pub city: String,
    pub state: String,
    pub zip: String,
    #[serde(default)]
    pub full_time_employees: i32,
    #[serde(default)]
    pub part_time_employees: i32,
    #[serde(default)]
    pub square_footage: Option<i32>,
    #[serde(default)]
    pub unemployment_num: Option<String>,
    #[serde(default)]
    pub billing: bool,
}

/// Contact row; `email` and `phone` hold ciphertext.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactRow {
    pub fname: String,
    pub lname: String,
    pub email: String,
    pub email_hash: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub primary: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimRow {
    pub policy_type: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub amount_paid: f64,
    #[serde(default)]
    pub amount_reserved: f64,
    #[serde(default)]
    pub open: bool,
    #[serde(default)]
    pub missed_work: bool,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyTypeRow {
    pub policy_type: String,
    #[serde(default)]
    pub effective_date: Option<NaiveDate>,
    #[serde(default)]
    pub expiration_date: Option<NaiveDate>,
    #[serde(default)]
    pub limits: Option<String>,
    #[serde(default)]
    pub deductible: Option<i32>,
}

/// Payroll (whole dollars) reported against an activity code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityPayrollRow {
    pub activity_code_id: i64,
    #[serde(default)]
    pub payroll: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionAnswerRow {
    pub question_id: i64,
    #[serde(default)]
    pub question_type: Option<String>,
    #[serde(default)]
    pub question_text: Option<String>,
    #[serde(default)]
    pub answer_id: Option<i64>,
    #[serde(default)]
    pub text_answer: Option<String>,
}

/// One typed child row of any collection.
#[derive(Debug, Clone, PartialEq)]
pub enum ChildItem {
    Location(LocationRow),
    Contact(ContactRow),
    Claim(ClaimRow),
    PolicyType(PolicyTypeRow),
    ActivityCode(ActivityPayrollRow),
    Question(QuestionAnswerRow),
}

impl ChildItem {
    pub fn collection(&self) -> ChildCollection {
        match self {
            Self::Location(_) => ChildCollection::Locations,
            Self::Contact(_) => ChildCollection::Contacts,
            Self::Claim(_) => ChildCollection::Claims,
            Self::PolicyType(_) => ChildCollection::PolicyTypes,
            Self::ActivityCode(_) => ChildCollection::ActivityCodes,
            Self::Question(_) => ChildCollection::Questions,
        }
    }

    /// Build a typed row from a relational-named, already-coerced map.
    /// Nulls are dropped so column defaults apply.
    pub fn from_relational(
        collection: ChildCollection,
        fields: &Map<String, Value>,
    ) -> AppResult<Self> {
        let value = Value::Object(
            fields
                .iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        );
        let mapping_error =
            |e: serde_json::Error| AppError::Mapping(format!("{} item: {}", collection, e));

        let item = match collection {
            ChildCollection::Locations => {
                Self::Location(serde_json::from_value(value).map_err(mapping_error)?)
            }
            ChildCollection::Contacts => {
                Self::Contact(serde_json::from_value(value).map_err(mapping_error)?)
            }
            ChildCollection::Claims => {
                Self::Claim(serde_json::from_value(value).map_err(mapping_error)?)
            }
            ChildCollection::PolicyTypes => {
                Self::PolicyType(serde_json::from_value(value).map_err(mapping_error)?)
            }
            ChildCollection::ActivityCodes => {
                Self::ActivityCode(serde_json::from_value(value).map_err(mapping_error)?)
            }
            ChildCollection::Questions => {
                Self::Question(serde_json::from_value(value).map_err(mapping_error)?)
            }
        };
        Ok(item)
    }

    /// Relational column map of the row.
    pub fn relational_fields(&self) -> AppResult<Map<String, Value>> {
        let value = match self {
            Self::Location(row) => serde_json::to_value(row)?,
            Self::Contact(row) => serde_json::to_value(row)?,
            Self::Claim(row) => serde_json::to_value(row)?,
            Self::PolicyType(row) => serde_json::to_value(row)?,
            Self::ActivityCode(row) => serde_json::to_value(row)?,
            Self::Question(row) => serde_json::to_value(row)?,
        };
        match value {
            Value::Object(map) => Ok(map),
            _ => Err(AppError::Mapping(format!(
                "{} row did not serialize to an object",
                self.collection()
            ))),
        }
    }
}

/// A persisted child row with its generated identity.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredChild {
    pub id: i64,
    pub item: ChildItem,
}
