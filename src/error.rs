use thiserror::Error;

use crate::pipeline::{IntakeError, LeadStatus, TransitionError};

/// Application-level failures outside the lead pipeline itself.
#[derive(Debug, Error)]
pub enum LeadflowError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Failures raised by a store implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("lead {0} does not exist")]
    MissingLead(String),

    #[error("lead {lead_id} changed underneath us: expected {expected}, found {actual}")]
    Conflict {
        lead_id: String,
        expected: LeadStatus,
        actual: LeadStatus,
    },

    #[error("call attempt for lead {0} is older than the last recorded attempt")]
    OutOfOrderAttempt(String),

    #[error("storage backend failure: {0}")]
    Backend(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failures raised by a notifier implementation.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("webhook returned status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Caller input is malformed or violates the pipeline rules.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    Intake(#[from] IntakeError),
}

impl ValidationError {
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::Transition(e) => e.code(),
            ValidationError::Intake(e) => e.code(),
        }
    }

    pub fn context(&self) -> serde_json::Value {
        match self {
            ValidationError::Transition(e) => e.context(),
            ValidationError::Intake(e) => serde_json::json!({ "code": e.code() }),
        }
    }
}

/// Well-formed request that cannot be satisfied given the current data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BusinessRuleError {
    #[error("lead {0} not found")]
    LeadNotFound(String),

    #[error("lead {0} has no assigned agent")]
    UnassignedLead(String),

    #[error("lead {lead_id} is {actual}, caller expected {expected}")]
    StatusMismatch {
        lead_id: String,
        expected: LeadStatus,
        actual: LeadStatus,
    },

    #[error("lead {0} was modified concurrently")]
    ConcurrentModification(String),

    #[error("call attempt for lead {0} predates the last recorded attempt")]
    OutOfOrderAttempt(String),
}

impl BusinessRuleError {
    pub fn code(&self) -> &'static str {
        match self {
            BusinessRuleError::LeadNotFound(_) => "lead_not_found",
            BusinessRuleError::UnassignedLead(_) => "unassigned_lead",
            BusinessRuleError::StatusMismatch { .. } => "status_mismatch",
            BusinessRuleError::ConcurrentModification(_) => "concurrent_modification",
            BusinessRuleError::OutOfOrderAttempt(_) => "out_of_order_attempt",
        }
    }

    pub fn context(&self) -> serde_json::Value {
        match self {
            BusinessRuleError::LeadNotFound(id)
            | BusinessRuleError::UnassignedLead(id)
            | BusinessRuleError::ConcurrentModification(id)
            | BusinessRuleError::OutOfOrderAttempt(id) => {
                serde_json::json!({ "code": self.code(), "lead_id": id })
            }
            BusinessRuleError::StatusMismatch {
                lead_id,
                expected,
                actual,
            } => serde_json::json!({
                "code": self.code(),
                "lead_id": lead_id,
                "expected": expected,
                "actual": actual,
            }),
        }
    }
}

/// Collaborator or infrastructure failure. Never shown to callers verbatim.
#[derive(Debug, Error)]
pub enum SystemError {
    #[error("store failure: {0}")]
    Store(#[from] StoreError),

    #[error("notifier failure: {0}")]
    Notify(#[from] NotifyError),
}

/// Everything an orchestration or queue entry point can fail with.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("business rule violated: {0}")]
    Business(#[from] BusinessRuleError),

    #[error("system error: {0}")]
    System(#[from] SystemError),
}

impl OrchestratorError {
    pub fn kind(&self) -> FailureKind {
        match self {
            OrchestratorError::Validation(_) => FailureKind::Validation,
            OrchestratorError::Business(_) => FailureKind::Business,
            OrchestratorError::System(_) => FailureKind::System,
        }
    }
}

impl From<TransitionError> for OrchestratorError {
    fn from(e: TransitionError) -> Self {
        OrchestratorError::Validation(e.into())
    }
}

impl From<IntakeError> for OrchestratorError {
    fn from(e: IntakeError) -> Self {
        OrchestratorError::Validation(e.into())
    }
}

impl From<NotifyError> for OrchestratorError {
    fn from(e: NotifyError) -> Self {
        OrchestratorError::System(e.into())
    }
}

impl From<StoreError> for OrchestratorError {
    /// Conflicts, missing leads and out-of-order call attempts are business
    /// outcomes; everything else from the store is a system failure.
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict { lead_id, .. } => {
                BusinessRuleError::ConcurrentModification(lead_id).into()
            }
            StoreError::MissingLead(id) => BusinessRuleError::LeadNotFound(id).into(),
            StoreError::OutOfOrderAttempt(id) => BusinessRuleError::OutOfOrderAttempt(id).into(),
            other => OrchestratorError::System(other.into()),
        }
    }
}

/// Classifies a failure for the boundary layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Caller input rejected before anything happened.
    Validation,
    /// Request understood but blocked by current data.
    Business,
    /// Infrastructure failed (store, notifier, network).
    System,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Validation => write!(f, "Validation"),
            FailureKind::Business => write!(f, "Business"),
            FailureKind::System => write!(f, "System"),
        }
    }
}
