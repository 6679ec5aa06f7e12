//! Transition policy for the lead pipeline.
//!
//! [`TransitionPolicy::validate`] is a pure function over the current status,
//! the requested status and the supporting fields. Rules are checked in a
//! fixed order and the first violation is returned.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use super::lead::TransitionFields;
use super::status::LeadStatus;

/// Loss reasons shorter than this (after trimming) are rejected.
pub const MIN_LOSS_REASON_LEN: usize = 10;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransitionError {
    #[error("both current and requested status are required")]
    MissingStatus,

    #[error("lead is {status} and can no longer change status")]
    TerminalStatusImmutable { status: LeadStatus },

    #[error("cannot move lead from {from} to {to}")]
    IllegalTransition {
        from: LeadStatus,
        to: LeadStatus,
        allowed: Vec<LeadStatus>,
    },

    #[error("follow-up date cannot be set on a lead moving to {status}")]
    FollowUpOnClosedLead { status: LeadStatus },

    #[error("follow-up date {date} is not in the future")]
    PastFollowUpDate { date: DateTime<Utc> },

    #[error("sale amount is only accepted when closing as won, not {status}")]
    SaleAmountMisplaced { status: LeadStatus },

    #[error("loss reason is only accepted when closing as lost, not {status}")]
    LossReasonMisplaced { status: LeadStatus },

    #[error("call outcome and call notes must be provided together")]
    IncompleteCallData,

    #[error("closing as won requires a non-negative sale amount")]
    MissingSaleAmount,

    #[error("closing as lost requires a loss reason of at least {min_len} characters")]
    MissingLossReason { min_len: usize },

    #[error("qualifying a lead requires a recorded call outcome")]
    MissingCallEvidence,
}

impl TransitionError {
    /// Stable machine-readable code for this violation.
    pub fn code(&self) -> &'static str {
        match self {
            TransitionError::MissingStatus => "missing_status",
            TransitionError::TerminalStatusImmutable { .. } => "terminal_status_immutable",
            TransitionError::IllegalTransition { .. } => "illegal_transition",
            TransitionError::FollowUpOnClosedLead { .. } => "follow_up_on_closed_lead",
            TransitionError::PastFollowUpDate { .. } => "past_follow_up_date",
            TransitionError::SaleAmountMisplaced { .. } => "sale_amount_misplaced",
            TransitionError::LossReasonMisplaced { .. } => "loss_reason_misplaced",
            TransitionError::IncompleteCallData => "incomplete_call_data",
            TransitionError::MissingSaleAmount => "missing_sale_amount",
            TransitionError::MissingLossReason { .. } => "missing_loss_reason",
            TransitionError::MissingCallEvidence => "missing_call_evidence",
        }
    }

    /// Structured context for boundary layers to render.
    pub fn context(&self) -> serde_json::Value {
        let mut ctx = serde_json::json!({ "code": self.code() });
        let extra = match self {
            TransitionError::TerminalStatusImmutable { status }
            | TransitionError::FollowUpOnClosedLead { status }
            | TransitionError::SaleAmountMisplaced { status }
            | TransitionError::LossReasonMisplaced { status } => {
                serde_json::json!({ "status": status })
            }
            TransitionError::IllegalTransition { from, to, allowed } => {
                serde_json::json!({ "from": from, "to": to, "allowed": allowed })
            }
            TransitionError::PastFollowUpDate { date } => serde_json::json!({ "date": date }),
            TransitionError::MissingLossReason { min_len } => {
                serde_json::json!({ "min_len": min_len })
            }
            _ => serde_json::Value::Null,
        };
        if let (Some(obj), serde_json::Value::Object(extra)) = (ctx.as_object_mut(), extra) {
            obj.extend(extra);
        }
        ctx
    }
}

/// The single status-specific effect a validated transition implies.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatusEffect {
    Won {
        sale_amount: f64,
        products: Vec<String>,
    },
    Lost {
        reason: String,
        details: Option<String>,
    },
    Qualified,
    Plain,
}

/// A transition that passed every rule, carrying its fields unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedTransition {
    pub from: LeadStatus,
    pub to: LeadStatus,
    pub fields: TransitionFields,
}

impl ValidatedTransition {
    pub fn effect(&self) -> StatusEffect {
        match self.to {
            LeadStatus::ClosedWon => StatusEffect::Won {
                sale_amount: self.fields.sale_amount.unwrap_or_default(),
                products: self.fields.products.clone().unwrap_or_default(),
            },
            LeadStatus::ClosedLost => StatusEffect::Lost {
                reason: self.fields.loss_reason.clone().unwrap_or_default(),
                details: self.fields.loss_details.clone(),
            },
            LeadStatus::Qualified => StatusEffect::Qualified,
            _ => StatusEffect::Plain,
        }
    }

    /// Call outcome and notes, when the request carries call data.
    pub fn call(&self) -> Option<(&str, Option<&str>)> {
        self.fields
            .call_outcome
            .as_deref()
            .map(|outcome| (outcome, self.fields.call_notes.as_deref()))
    }

    pub fn is_noop(&self) -> bool {
        self.from == self.to
    }
}

/// Decides whether a requested status change is legal.
pub struct TransitionPolicy;

impl TransitionPolicy {
    /// Validate a transition against the adjacency table and the field guards.
    ///
    /// `now` is the reference point for follow-up dates.
    pub fn validate(
        current: Option<LeadStatus>,
        requested: Option<LeadStatus>,
        fields: &TransitionFields,
        now: DateTime<Utc>,
    ) -> Result<ValidatedTransition, TransitionError> {
        let (Some(from), Some(to)) = (current, requested) else {
            return Err(TransitionError::MissingStatus);
        };

        if from == to {
            if from.is_terminal() {
                return Err(TransitionError::TerminalStatusImmutable { status: from });
            }
        } else if !from.can_transition_to(to) {
            return Err(TransitionError::IllegalTransition {
                from,
                to,
                allowed: from.allowed_targets().to_vec(),
            });
        }

        Self::check_fields(to, fields, now)?;

        Ok(ValidatedTransition {
            from,
            to,
            fields: fields.clone(),
        })
    }

    fn check_fields(
        to: LeadStatus,
        fields: &TransitionFields,
        now: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        if let Some(date) = fields.follow_up_date {
            if to.is_terminal() {
                return Err(TransitionError::FollowUpOnClosedLead { status: to });
            }
            if date <= now {
                return Err(TransitionError::PastFollowUpDate { date });
            }
        }

        if fields.sale_amount.is_some() && to != LeadStatus::ClosedWon {
            return Err(TransitionError::SaleAmountMisplaced { status: to });
        }
        if fields.loss_reason.is_some() && to != LeadStatus::ClosedLost {
            return Err(TransitionError::LossReasonMisplaced { status: to });
        }
        if fields.call_outcome.is_some() != fields.call_notes.is_some() {
            return Err(TransitionError::IncompleteCallData);
        }

        match to {
            LeadStatus::ClosedWon => match fields.sale_amount {
                Some(amount) if amount >= 0.0 => {}
                _ => return Err(TransitionError::MissingSaleAmount),
            },
            LeadStatus::ClosedLost => {
                let long_enough = fields
                    .loss_reason
                    .as_deref()
                    .is_some_and(|r| r.trim().chars().count() >= MIN_LOSS_REASON_LEN);
                if !long_enough {
                    return Err(TransitionError::MissingLossReason {
                        min_len: MIN_LOSS_REASON_LEN,
                    });
                }
            }
            LeadStatus::Qualified if fields.call_outcome.is_none() => {
                return Err(TransitionError::MissingCallEvidence);
            }
            _ => {}
        }

        Ok(())
    }
}
