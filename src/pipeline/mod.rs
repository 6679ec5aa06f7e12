mod lead;
mod policy;
mod status;

pub use lead::{
    CallAttempt, IntakeError, Lead, LeadIntake, LeadSource, StatusUpdateRequest, TransitionFields,
};
pub use policy::{
    MIN_LOSS_REASON_LEN, StatusEffect, TransitionError, TransitionPolicy, ValidatedTransition,
};
pub use status::{LeadStatus, UnknownStatus};
