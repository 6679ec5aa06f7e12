//! Persistence contracts consumed by the orchestrator and the call queue.
//!
//! A [`LeadStore`] hands out read access plus a [`UnitOfWork`] for writes.
//! Everything written through a unit of work becomes visible together on
//! [`UnitOfWork::commit`]; dropping it or calling [`UnitOfWork::rollback`]
//! discards every staged write. Units of work do not block readers or each
//! other; a commit that would overwrite a lead changed since the unit of
//! work first read it fails with [`StoreError::Conflict`].

mod memory;
mod records;
mod report;

pub use memory::{MemoryStore, Operation, Tables};
pub use report::{LossReasonCount, PerformanceMetrics, PerformanceReport, performance_report};
pub use records::{
    DealSize, FollowUpTask, HIGH_VALUE_THRESHOLD, LeadPatch, LossRecord, MetricEvent,
    MetricSnapshot, SaleRecord,
};

use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::pipeline::{CallAttempt, Lead};

/// Atomic group of writes. Nothing is visible to other readers before `commit`.
#[allow(async_fn_in_trait)]
pub trait UnitOfWork {
    /// Read a lead as staged in this unit of work. A lead read here counts
    /// as touched: commit fails if it changed elsewhere in the meantime.
    async fn get_lead(&mut self, lead_id: &str) -> Result<Option<Lead>, StoreError>;

    /// Apply a status change, failing with [`StoreError::Conflict`] if the
    /// stored status no longer matches `patch.expected_status`.
    async fn update_lead_status(
        &mut self,
        lead_id: &str,
        patch: &LeadPatch,
    ) -> Result<Lead, StoreError>;

    async fn append_call_attempt(
        &mut self,
        lead_id: &str,
        attempt: CallAttempt,
    ) -> Result<(), StoreError>;

    async fn create_sale_record(&mut self, sale: SaleRecord) -> Result<String, StoreError>;

    async fn log_loss_reason(&mut self, loss: LossRecord) -> Result<(), StoreError>;

    async fn record_metric(&mut self, metric: MetricSnapshot) -> Result<(), StoreError>;

    async fn create_follow_up_task(&mut self, task: FollowUpTask) -> Result<String, StoreError>;

    /// Publish every staged write, or none of them.
    async fn commit(self) -> Result<(), StoreError>;

    async fn rollback(self) -> Result<(), StoreError>;
}

/// Lead persistence with transactional writes.
#[allow(async_fn_in_trait)]
pub trait LeadStore {
    type Tx: UnitOfWork;

    async fn get_lead(&self, lead_id: &str) -> Result<Option<Lead>, StoreError>;

    /// Every lead assigned to `agent_id`, in stable storage order.
    async fn list_leads_for_agent(&self, agent_id: &str) -> Result<Vec<Lead>, StoreError>;

    async fn create_lead(&self, lead: Lead) -> Result<Lead, StoreError>;

    /// Conversion, win rate and deal size figures, overall and optionally for
    /// one agent, counting only records at or after `since` when given.
    async fn performance_report(
        &self,
        agent_id: Option<&str>,
        since: Option<DateTime<Utc>>,
    ) -> Result<PerformanceReport, StoreError>;

    /// Open a unit of work.
    async fn begin(&self) -> Result<Self::Tx, StoreError>;
}
