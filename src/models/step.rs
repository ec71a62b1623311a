//! Workflow steps and the coarse lifecycle/status codes stored on applications.

use serde::{Deserialize, Serialize};

/// Named stage of application data capture.
///
/// The discriminant is the ordinal persisted as `last_step` and used for gating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WorkflowStep {
    Contact = 2,
    Coverage = 3,
    Locations = 4,
    Owners = 5,
    Details = 6,
    Claims = 7,
    Questions = 8,
    Quotes = 9,
    BindRequest = 10,
}

impl WorkflowStep {
    pub const ALL: [WorkflowStep; 9] = [
        Self::Contact,
        Self::Coverage,
        Self::Locations,
        Self::Owners,
        Self::Details,
        Self::Claims,
        Self::Questions,
        Self::Quotes,
        Self::BindRequest,
    ];

    /// Parse a step name as sent by the portal. `cart` is an alias of `bindRequest`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "contact" => Some(Self::Contact),
            "coverage" => Some(Self::Coverage),
            "locations" => Some(Self::Locations),
            "owners" => Some(Self::Owners),
            "details" => Some(Self::Details),
            "claims" => Some(Self::Claims),
            "questions" => Some(Self::Questions),
            "quotes" => Some(Self::Quotes),
            "cart" | "bindRequest" => Some(Self::BindRequest),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contact => "contact",
            Self::Coverage => "coverage",
            Self::Locations => "locations",
            Self::Owners => "owners",
            Self::Details => "details",
            Self::Claims => "claims",
            Self::Questions => "questions",
            Self::Quotes => "quotes",
            Self::BindRequest => "bindRequest",
        }
    }

    pub const fn ordinal(self) -> i32 {
        self as i32
    }

    /// Step reached once quoting has started; earlier steps are locked after it.
    pub const fn quote_lock() -> i32 {
        Self::Quotes.ordinal()
    }
}

impl std::fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Coarse lifecycle code stored in the relational `state` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationState {
    Deleted = 0,
    Active = 1,
    Finalized = 2,
}

impl ApplicationState {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Deleted),
            1 => Some(Self::Active),
            2 => Some(Self::Finalized),
            _ => None,
        }
    }

    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Deleted and finalized applications never accept step saves.
    pub fn is_locked(self) -> bool {
        !matches!(self, Self::Active)
    }
}

/// Application status text/code pair (`status` / `app_status_id`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppStatus {
    Incomplete = 0,
    QuestionsDone = 10,
    Quoting = 15,
    Error = 20,
    Declined = 30,
    Referred = 40,
    Quoted = 50,
    RequestToBind = 60,
    Bound = 90,
}

impl AppStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Incomplete => "incomplete",
            Self::QuestionsDone => "questions_done",
            Self::Quoting => "quoting",
            Self::Error => "error",
            Self::Declined => "declined",
            Self::Referred => "referred",
            Self::Quoted => "quoted",
            Self::RequestToBind => "request_to_bind",
            Self::Bound => "bound",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "incomplete" => Some(Self::Incomplete),
            "questions_done" => Some(Self::QuestionsDone),
            "quoting" => Some(Self::Quoting),
            "error" => Some(Self::Error),
            "declined" => Some(Self::Declined),
            "referred" => Some(Self::Referred),
            "quoted" => Some(Self::Quoted),
            "request_to_bind" => Some(Self::RequestToBind),
            "bound" => Some(Self::Bound),
            _ => None,
        }
    }

    pub const fn code(self) -> i32 {
        self as i32
    }
}

impl std::fmt::Display for AppStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
