//! Canonical relational application record.
//!
//! Records are immutable value objects: every mutation returns a new record.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::children::PolicyTypeRow;
use super::payload::FieldType;
use super::step::{AppStatus, ApplicationState, WorkflowStep};
use crate::error::{AppError, AppResult};

/// Columns a step payload may write, with the type they are coerced to.
pub const EDITABLE_APPLICATION_FIELDS: &[(&str, FieldType)] = &[
    ("wholesale", FieldType::Bool),
    ("solepro", FieldType::Bool),
    ("industry_code", FieldType::Integer),
    ("coverage_lapse", FieldType::Bool),
    ("founded", FieldType::Date),
    ("gross_sales_amt", FieldType::Float),
    ("years_of_exp", FieldType::Integer),
    ("owners_covered", FieldType::Integer),
    ("bop_effective_date", FieldType::Date),
    ("bop_expiration_date", FieldType::Date),
    ("gl_effective_date", FieldType::Date),
    ("gl_expiration_date", FieldType::Date),
    ("wc_effective_date", FieldType::Date),
    ("wc_expiration_date", FieldType::Date),
    ("limits", FieldType::Text),
    ("deductible", FieldType::Integer),
    ("wc_limits", FieldType::Text),
];

/// Flattened per-policy columns. They live in the document's `policies` array,
/// not as root fields.
pub const POLICY_FLATTENED_FIELDS: &[&str] = &[
    "bop_effective_date",
    "bop_expiration_date",
    "gl_effective_date",
    "gl_expiration_date",
    "wc_effective_date",
    "wc_expiration_date",
    "limits",
    "deductible",
    "wc_limits",
];

/// Agency assignment resolved when an application is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgencyAssignment {
    pub agency_network_id: i64,
    pub agency_id: i64,
    pub agency_location_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    /// Surrogate id; 0 until the row is inserted.
    pub id: i64,
    pub uuid: Uuid,
    pub business_id: Option<i64>,
    pub agency_network_id: i64,
    pub agency_id: i64,
    pub agency_location_id: i64,
    pub last_step: i32,
    pub progress: String,
    pub state: i32,
    pub status: String,
    pub app_status_id: i32,
    pub wholesale: bool,
    pub solepro: bool,
    pub industry_code: Option<i64>,
    pub coverage_lapse: bool,
    pub founded: Option<NaiveDate>,
    pub gross_sales_amt: Option<f64>,
    pub years_of_exp: Option<i32>,
    pub owners_covered: Option<i32>,
    pub bop_effective_date: Option<NaiveDate>,
    pub bop_expiration_date: Option<NaiveDate>,
    pub gl_effective_date: Option<NaiveDate>,
    pub gl_expiration_date: Option<NaiveDate>,
    pub wc_effective_date: Option<NaiveDate>,
    pub wc_expiration_date: Option<NaiveDate>,
    pub limits: Option<String>,
    pub deductible: Option<i32>,
    pub wc_limits: Option<String>,
    pub bind_quote_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ApplicationRecord {
    /// A fresh, not yet persisted application.
    pub fn new(uuid: Uuid, agency: AgencyAssignment, now: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            uuid,
            business_id: None,
            agency_network_id: agency.agency_network_id,
            agency_id: agency.agency_id,
            agency_location_id: agency.agency_location_id,
            last_step: 0,
            progress: "incomplete".to_string(),
            state: ApplicationState::Active.code(),
            status: AppStatus::Incomplete.as_str().to_string(),
            app_status_id: AppStatus::Incomplete.code(),
            wholesale: false,
            solepro: false,
            industry_code: None,
            coverage_lapse: false,
            founded: None,
            gross_sales_amt: None,
            years_of_exp: None,
            owners_covered: None,
            bop_effective_date: None,
            bop_expiration_date: None,
            gl_effective_date: None,
            gl_expiration_date: None,
            wc_effective_date: None,
            wc_expiration_date: None,
            limits: None,
            deductible: None,
            wc_limits: None,
            bind_quote_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.id > 0
    }

    pub fn state(&self) -> Option<ApplicationState> {
        ApplicationState::from_code(self.state)
    }

    /// Unknown state codes are treated as locked.
    pub fn is_locked(&self) -> bool {
        self.state().is_none_or(ApplicationState::is_locked)
    }

    pub fn has_reached_quote_lock(&self) -> bool {
        self.last_step >= WorkflowStep::quote_lock()
    }

    /// Snake_case column map of this record.
    pub fn relational_fields(&self) -> AppResult<Map<String, Value>> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            _ => Err(AppError::Persistence(
                "application record did not serialize to an object".to_string(),
            )),
        }
    }

    /// Overlay already-coerced editable columns. Unknown keys are ignored.
    pub fn with_fields(self, fields: &Map<String, Value>) -> AppResult<Self> {
        let mut map = self.relational_fields()?;
        let mut changed = false;
        for (column, _) in EDITABLE_APPLICATION_FIELDS {
            if let Some(value) = fields.get(*column) {
                map.insert(column.to_string(), value.clone());
                changed = true;
            }
        }
        if !changed {
            return Ok(self);
        }
        serde_json::from_value(Value::Object(map))
            .map_err(|e| AppError::Validation(format!("invalid application field: {}", e)))
    }

    pub fn with_last_step(self, last_step: i32) -> Self {
        Self { last_step, ..self }
    }

    pub fn with_business(self, business_id: i64) -> Self {
        Self {
            business_id: Some(business_id),
            ..self
        }
    }

    pub fn with_progress(self, progress: &str) -> Self {
        Self {
            progress: progress.to_string(),
            ..self
        }
    }

    pub fn with_state(self, state: ApplicationState) -> Self {
        Self {
            state: state.code(),
            ..self
        }
    }

    /// Set status text/code directly (side-channel writes).
    pub fn with_status(self, status: &str, app_status_id: i32) -> Self {
        Self {
            status: status.to_string(),
            app_status_id,
            ..self
        }
    }

    /// Workflow saves only ever move the status forward.
    pub fn with_status_forward(self, status: AppStatus) -> Self {
        if status.code() > self.app_status_id {
            self.with_status(status.as_str(), status.code())
        } else {
            self
        }
    }

    pub fn with_bind_quote(self, quote_id: &str) -> Self {
        Self {
            bind_quote_id: Some(quote_id.to_string()),
            ..self
        }
    }

    pub fn touched(self, now: DateTime<Utc>) -> Self {
        Self {
            updated_at: now,
            ..self
        }
    }

    /// Flatten the selected policy types into the per-policy columns.
    /// Policies not selected are cleared.
    pub fn with_policy_selection(self, policies: &[PolicyTypeRow]) -> Self {
        let find = |code: &str| policies.iter().find(|p| p.policy_type == code);
        let bop = find("BOP");
        let gl = find("GL");
        let wc = find("WC");
        let general = bop.or(gl);

        Self {
            bop_effective_date: bop.and_then(|p| p.effective_date),
            bop_expiration_date: bop.and_then(|p| p.expiration_date),
            gl_effective_date: gl.and_then(|p| p.effective_date),
            gl_expiration_date: gl.and_then(|p| p.expiration_date),
            wc_effective_date: wc.and_then(|p| p.effective_date),
            wc_expiration_date: wc.and_then(|p| p.expiration_date),
            limits: general.and_then(|p| p.limits.clone()),
            deductible: general.and_then(|p| p.deductible),
            wc_limits: wc.and_then(|p| p.limits.clone()),
            ..self
        }
    }

    /// Age of the record relative to `now`.
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.created_at
    }
}

/// Append-only consent capture recorded when the questions step completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegalAcceptance {
    pub application_id: i64,
    pub ip: String,
    pub version: i32,
    pub created_at: DateTime<Utc>,
}
