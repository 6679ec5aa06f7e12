use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pipeline::LeadStatus;

/// Deals above this amount are bucketed as high value.
pub const HIGH_VALUE_THRESHOLD: f64 = 50_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DealSize {
    High,
    Standard,
}

impl DealSize {
    pub fn for_amount(amount: f64) -> Self {
        if amount > HIGH_VALUE_THRESHOLD {
            DealSize::High
        } else {
            DealSize::Standard
        }
    }
}

/// Status change written to the lead row inside a unit of work.
#[derive(Debug, Clone, PartialEq)]
pub struct LeadPatch {
    pub status: LeadStatus,
    /// Status the lead must still have when the write lands.
    pub expected_status: LeadStatus,
    pub next_follow_up: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleRecord {
    pub id: String,
    pub lead_id: String,
    pub agent_id: String,
    pub amount: f64,
    pub products: Vec<String>,
    pub deal_size: DealSize,
    pub closed_at: DateTime<Utc>,
}

impl SaleRecord {
    pub fn new(
        lead_id: &str,
        agent_id: &str,
        amount: f64,
        products: Vec<String>,
        closed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            lead_id: lead_id.to_string(),
            agent_id: agent_id.to_string(),
            amount,
            products,
            deal_size: DealSize::for_amount(amount),
            closed_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LossRecord {
    pub lead_id: String,
    pub reason: String,
    pub details: Option<String>,
    /// Pipeline stage the lead was in when it was lost.
    pub stage: LeadStatus,
    pub days_in_pipeline: i64,
    pub logged_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MetricEvent {
    LeadWon {
        revenue: f64,
        days_to_close: i64,
        qualified: bool,
        call_count: u32,
        deal_size: DealSize,
    },
    LeadLost {
        loss_reason: String,
        potential_revenue: Option<f64>,
        days_to_loss: i64,
        qualified: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSnapshot {
    pub lead_id: String,
    pub agent_id: String,
    pub recorded_at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: MetricEvent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowUpTask {
    pub id: String,
    pub lead_id: String,
    pub due_at: DateTime<Utc>,
    pub assigned_agent_id: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl FollowUpTask {
    pub fn new(
        lead_id: &str,
        due_at: DateTime<Utc>,
        assigned_agent_id: Option<String>,
        notes: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            lead_id: lead_id.to_string(),
            due_at,
            assigned_agent_id,
            notes,
            created_at: Utc::now(),
        }
    }
}
