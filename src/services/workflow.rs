//! Application workflow gating.
//!
//! Decides whether a step may be saved against the current record and what
//! the save has to do. Guards, in order: the step name must be known, a
//! non-`contact` step needs an existing record, and the record must still be
//! mutable (active, inside the edit window, not past the quote lock for
//! earlier steps).

use chrono::{DateTime, Duration, Utc};

use super::notifications::NotificationKind;
use crate::config::WorkflowConfig;
use crate::error::{AppError, AppResult};
use crate::models::{ApplicationRecord, StepPayload, WorkflowStep};

/// Consent version recorded when the payload does not name one.
pub const LEGAL_ACCEPTANCE_VERSION: i32 = 1;

/// Caller-controlled save options. Never read from the payload.
#[derive(Debug, Clone, Default)]
pub struct SaveOptions {
    /// Privileged edit of a record older than the edit window
    pub bypass_edit_window: bool,
    /// Address of the submitting client, recorded with legal acceptance
    pub client_ip: Option<String>,
}

/// Consent captured on the `questions` step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegalAcceptanceInput {
    pub ip: String,
    pub version: i32,
}

/// Step-specific work the synchronizer applies before persisting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepTransform {
    /// Upsert the business and its contacts/addresses
    SaveBusiness,
    /// Replace policy-type selections and flatten them onto the record
    ReplacePolicies,
    /// Replace business addresses and aggregate activity-code payroll
    ReplaceLocations,
    /// Store owners and add covered owner payroll to activity codes
    SaveOwners,
    /// Scalar application fields only
    UpdateDetails,
    ReplaceClaims,
    /// Replace question answers and record consent
    RecordQuestions(LegalAcceptanceInput),
    /// Quoting started
    MarkQuoting,
    RequestBind { quote_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepPlan {
    pub step: WorkflowStep,
    /// `last_step` after the save
    pub last_step: i32,
    /// No record exists yet; the save creates one
    pub creating: bool,
    pub transform: StepTransform,
    /// Dispatched only once the relational write succeeded
    pub notifications: Vec<NotificationKind>,
}

#[derive(Debug, Clone)]
pub struct WorkflowStateMachine {
    edit_window: Duration,
}

impl WorkflowStateMachine {
    pub fn new(config: &WorkflowConfig) -> Self {
        Self {
            edit_window: Duration::minutes(config.edit_window_minutes),
        }
    }

    pub fn edit_window(&self) -> Duration {
        self.edit_window
    }

    /// Validate a step save against the current record and plan it.
    pub fn advance(
        &self,
        current: Option<&ApplicationRecord>,
        requested_step: &str,
        payload: &StepPayload,
        options: &SaveOptions,
        now: DateTime<Utc>,
    ) -> AppResult<StepPlan> {
        let step = WorkflowStep::parse(requested_step)
            .ok_or_else(|| AppError::UnknownStep(requested_step.to_string()))?;

        let existing_step = match current {
            None if step != WorkflowStep::Contact => {
                return Err(AppError::MissingIdentity(step.to_string()));
            }
            None => 0,
            Some(record) => {
                self.ensure_mutable(record, step, options, now)?;
                record.last_step
            }
        };

        let transform = Self::transform(step, payload, options)?;
        let notifications = Self::notifications(&transform, payload);

        Ok(StepPlan {
            step,
            last_step: existing_step.max(step.ordinal()),
            creating: current.is_none(),
            transform,
            notifications,
        })
    }

    fn ensure_mutable(
        &self,
        record: &ApplicationRecord,
        step: WorkflowStep,
        options: &SaveOptions,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        if record.is_locked() {
            return Err(AppError::ImmutableRecord(format!(
                "application {} is in state {}",
                record.uuid, record.state
            )));
        }

        if !options.bypass_edit_window && record.age(now) > self.edit_window {
            return Err(AppError::ImmutableRecord(format!(
                "application {} is older than the {} minute edit window",
                record.uuid,
                self.edit_window.num_minutes()
            )));
        }

        if record.has_reached_quote_lock() && step.ordinal() < WorkflowStep::quote_lock() {
            return Err(AppError::ImmutableRecord(format!(
                "application {} has been quoted; step '{}' can no longer be saved",
                record.uuid, step
            )));
        }

        Ok(())
    }

    fn transform(
        step: WorkflowStep,
        payload: &StepPayload,
        options: &SaveOptions,
    ) -> AppResult<StepTransform> {
        let require_array = |key: &str| -> AppResult<()> {
            match payload.array(key)? {
                Some(_) => Ok(()),
                None => Err(AppError::Validation(format!(
                    "step '{}' requires '{}'",
                    step, key
                ))),
            }
        };

        let transform = match step {
            WorkflowStep::Contact => {
                let business = payload.object("business")?.ok_or_else(|| {
                    AppError::Validation("step 'contact' requires business information".to_string())
                })?;
                let has_name = business
                    .get("name")
                    .and_then(|v| v.as_str())
                    .is_some_and(|name| !name.trim().is_empty());
                if !has_name {
                    return Err(AppError::Validation("business name is required".to_string()));
                }
                StepTransform::SaveBusiness
            }
            WorkflowStep::Coverage => {
                require_array("policy_types")?;
                StepTransform::ReplacePolicies
            }
            WorkflowStep::Locations => {
                require_array("locations")?;
                StepTransform::ReplaceLocations
            }
            WorkflowStep::Owners => {
                require_array("owners")?;
                StepTransform::SaveOwners
            }
            WorkflowStep::Details => StepTransform::UpdateDetails,
            WorkflowStep::Claims => {
                require_array("claims")?;
                StepTransform::ReplaceClaims
            }
            WorkflowStep::Questions => {
                require_array("questions")?;
                StepTransform::RecordQuestions(Self::legal_acceptance(payload, options)?)
            }
            WorkflowStep::Quotes => StepTransform::MarkQuoting,
            WorkflowStep::BindRequest => {
                let quote_id = payload.text("quote_id").ok_or_else(|| {
                    AppError::Validation("step 'bindRequest' requires 'quote_id'".to_string())
                })?;
                StepTransform::RequestBind { quote_id }
            }
        };

        Ok(transform)
    }

    fn legal_acceptance(
        payload: &StepPayload,
        options: &SaveOptions,
    ) -> AppResult<LegalAcceptanceInput> {
        let legal = payload.object("legal_acceptance")?;
        let ip = legal
            .and_then(|l| l.get("ip"))
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
            .map(String::from)
            .or_else(|| options.client_ip.clone())
            .unwrap_or_else(|| "unknown".to_string());

        let version = match legal.and_then(|l| l.get("version")) {
            None | Some(serde_json::Value::Null) => LEGAL_ACCEPTANCE_VERSION,
            Some(value) => value
                .as_i64()
                .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
                .and_then(|v| i32::try_from(v).ok())
                .ok_or_else(|| {
                    AppError::Validation(format!("invalid legal acceptance version: {}", value))
                })?,
        };

        Ok(LegalAcceptanceInput { ip, version })
    }

    fn notifications(transform: &StepTransform, payload: &StepPayload) -> Vec<NotificationKind> {
        match transform {
            StepTransform::RecordQuestions(_) => {
                let mut kinds = Vec::new();
                if payload.flag("wholesale") {
                    kinds.push(NotificationKind::WholesaleSubmission);
                }
                if payload.flag("solepro") {
                    kinds.push(NotificationKind::SoleProSubmission);
                }
                kinds
            }
            StepTransform::RequestBind { quote_id } => vec![NotificationKind::BindRequest {
                quote_id: quote_id.clone(),
            }],
            _ => Vec::new(),
        }
    }
}
