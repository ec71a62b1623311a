//! Domain models for the agency portal application workflow.

pub mod agency;
pub mod application;
pub mod business;
pub mod children;
pub mod document;
pub mod payload;
pub mod step;

// Re-export commonly used types
pub use agency::{Agency, AgencyLocation};
pub use application::{
    AgencyAssignment, ApplicationRecord, EDITABLE_APPLICATION_FIELDS, LegalAcceptance,
    POLICY_FLATTENED_FIELDS,
};
pub use business::{BUSINESS_COLUMNS, BusinessInput, BusinessRecord, EnrichmentResult, OwnerInput};
pub use children::{
    ActivityPayrollRow, ChildCollection, ChildItem, ClaimRow, ContactRow, LocationRow,
    ParentKey, ParentKind, PolicyTypeRow, QuestionAnswerRow, StoredChild,
};
pub use document::ApplicationDocument;
pub use payload::{ApplicationIdentity, FieldType, StepPayload};
pub use step::{AppStatus, ApplicationState, WorkflowStep};
