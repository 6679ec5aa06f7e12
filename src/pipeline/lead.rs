use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::status::LeadStatus;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid email pattern")
});

/// Where a lead came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadSource {
    Website,
    Referral,
    ColdCall,
    Social,
    Other,
}

/// One recorded contact attempt. Immutable once appended to a lead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallAttempt {
    pub timestamp: DateTime<Utc>,
    pub outcome: String,
    pub notes: Option<String>,
    pub next_attempt_scheduled: Option<DateTime<Utc>>,
}

impl CallAttempt {
    pub fn new(
        outcome: impl Into<String>,
        notes: Option<String>,
        next_attempt_scheduled: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            outcome: outcome.into(),
            notes,
            next_attempt_scheduled,
        }
    }
}

/// A prospective customer tracked through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub status: LeadStatus,
    pub source: LeadSource,
    pub interest_level: Option<u8>,
    pub estimated_value: Option<f64>,

    pub budget_confirmed: bool,
    pub authority_confirmed: bool,
    pub need_confirmed: bool,
    pub timeline_confirmed: bool,

    /// Chronological, append-only.
    pub call_attempts: Vec<CallAttempt>,
    pub last_contact: Option<DateTime<Utc>>,
    pub next_follow_up: Option<DateTime<Utc>>,
    pub assigned_agent_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    pub fn new(name: impl Into<String>, source: LeadSource) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            email: None,
            phone: None,
            company: None,
            status: LeadStatus::New,
            source,
            interest_level: None,
            estimated_value: None,
            budget_confirmed: false,
            authority_confirmed: false,
            need_confirmed: false,
            timeline_confirmed: false,
            call_attempts: Vec::new(),
            last_contact: None,
            next_follow_up: None,
            assigned_agent_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// BANT: budget, authority, need and timeline all confirmed.
    pub fn is_qualified(&self) -> bool {
        self.budget_confirmed
            && self.authority_confirmed
            && self.need_confirmed
            && self.timeline_confirmed
    }

    pub fn attempt_count(&self) -> u32 {
        u32::try_from(self.call_attempts.len()).unwrap_or(u32::MAX)
    }

    /// Whole days between intake and `now`.
    pub fn days_in_pipeline(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_days().max(0)
    }

    /// Hours between intake and `now`, clamped at zero.
    pub fn age_hours(&self, now: DateTime<Utc>) -> f64 {
        let millis = (now - self.created_at).num_milliseconds().max(0);
        millis as f64 / 3_600_000.0
    }

    /// Bump `updated_at` without ever moving it backwards.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.updated_at {
            self.updated_at = now;
        }
    }
}

/// Raw data captured when a new lead enters the pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LeadIntake {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub source: Option<LeadSource>,
    pub interest_level: Option<u8>,
    pub estimated_value: Option<f64>,
    pub assigned_agent_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IntakeError {
    #[error("lead name must not be empty")]
    EmptyName,

    #[error("invalid email address: {0}")]
    InvalidEmail(String),

    #[error("phone number must contain at least 7 digits: {0}")]
    InvalidPhone(String),

    #[error("estimated value must be a non-negative number, got {0}")]
    NegativeValue(f64),

    #[error("interest level must be between 1 and 5, got {0}")]
    InterestOutOfRange(u8),
}

impl IntakeError {
    pub fn code(&self) -> &'static str {
        match self {
            IntakeError::EmptyName => "empty_name",
            IntakeError::InvalidEmail(_) => "invalid_email",
            IntakeError::InvalidPhone(_) => "invalid_phone",
            IntakeError::NegativeValue(_) => "negative_value",
            IntakeError::InterestOutOfRange(_) => "interest_out_of_range",
        }
    }
}

impl LeadIntake {
    /// Validate the captured data and build a fresh `NEW` lead from it.
    pub fn into_lead(self) -> Result<Lead, IntakeError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(IntakeError::EmptyName);
        }
        if let Some(email) = &self.email
            && !EMAIL_RE.is_match(email)
        {
            return Err(IntakeError::InvalidEmail(email.clone()));
        }
        if let Some(phone) = &self.phone
            && phone.chars().filter(char::is_ascii_digit).count() < 7
        {
            return Err(IntakeError::InvalidPhone(phone.clone()));
        }
        if let Some(value) = self.estimated_value
            && (value.is_nan() || value < 0.0)
        {
            return Err(IntakeError::NegativeValue(value));
        }
        if let Some(level) = self.interest_level
            && !(1..=5).contains(&level)
        {
            return Err(IntakeError::InterestOutOfRange(level));
        }

        let mut lead = Lead::new(name, self.source.unwrap_or(LeadSource::Other));
        lead.email = self.email;
        lead.phone = self.phone;
        lead.company = self.company;
        lead.interest_level = self.interest_level;
        lead.estimated_value = self.estimated_value;
        lead.assigned_agent_id = self.assigned_agent_id;
        Ok(lead)
    }
}

/// Optional supporting data attached to a status change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransitionFields {
    pub sale_amount: Option<f64>,
    pub products: Option<Vec<String>>,
    pub follow_up_date: Option<DateTime<Utc>>,
    pub loss_reason: Option<String>,
    pub loss_details: Option<String>,
    pub call_outcome: Option<String>,
    pub call_notes: Option<String>,
}

/// A proposed transition for one lead. Lives only for a single update call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: Option<LeadStatus>,
    /// What the caller believes the lead's status is right now.
    pub current_status: Option<LeadStatus>,
    #[serde(flatten)]
    pub fields: TransitionFields,
}

impl StatusUpdateRequest {
    pub fn to(status: LeadStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn with_fields(mut self, fields: TransitionFields) -> Self {
        self.fields = fields;
        self
    }

    pub fn expecting(mut self, current: LeadStatus) -> Self {
        self.current_status = Some(current);
        self
    }
}
