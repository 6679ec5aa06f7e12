//! In-memory store with optional JSON file persistence.
//!
//! The committed tables sit behind one async mutex that is only held for
//! single reads and for the final merge of a commit. A unit of work stages
//! the leads it touches and the records it appends on its own, remembering
//! each lead as first read. Commit re-takes the lock, fails with a conflict if
//! any touched lead changed in the meantime, then merges. When a data file is
//! configured the merged tables are written before they replace the live ones;
//! a failed write leaves both untouched.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::records::{FollowUpTask, LeadPatch, LossRecord, MetricSnapshot, SaleRecord};
use super::report::{PerformanceReport, performance_report};
use super::{LeadStore, UnitOfWork};
use crate::error::StoreError;
use crate::pipeline::{CallAttempt, Lead};

/// Everything the store holds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tables {
    /// Insertion order is preserved.
    pub leads: Vec<Lead>,
    pub sales: Vec<SaleRecord>,
    pub losses: Vec<LossRecord>,
    pub metrics: Vec<MetricSnapshot>,
    pub follow_ups: Vec<FollowUpTask>,
}

impl Tables {
    fn lead(&self, lead_id: &str) -> Option<&Lead> {
        self.leads.iter().find(|l| l.id == lead_id)
    }

    fn lead_mut(&mut self, lead_id: &str) -> Result<&mut Lead, StoreError> {
        self.leads
            .iter_mut()
            .find(|l| l.id == lead_id)
            .ok_or_else(|| StoreError::MissingLead(lead_id.to_string()))
    }
}

/// Store operations that can be made to fail on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Every read outside a unit of work.
    ReadLeads,
    UpdateLeadStatus,
    AppendCallAttempt,
    CreateSaleRecord,
    LogLossReason,
    RecordMetric,
    CreateFollowUpTask,
    Commit,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::ReadLeads => "read_leads",
            Operation::UpdateLeadStatus => "update_lead_status",
            Operation::AppendCallAttempt => "append_call_attempt",
            Operation::CreateSaleRecord => "create_sale_record",
            Operation::LogLossReason => "log_loss_reason",
            Operation::RecordMetric => "record_metric",
            Operation::CreateFollowUpTask => "create_follow_up_task",
            Operation::Commit => "commit",
        };
        f.write_str(name)
    }
}

type Faults = Arc<StdMutex<HashSet<Operation>>>;

fn check_fault(faults: &Faults, op: Operation) -> Result<(), StoreError> {
    let injected = faults.lock().is_ok_and(|set| set.contains(&op));
    if injected {
        return Err(StoreError::Backend(format!("injected fault on {op}")));
    }
    Ok(())
}

async fn write_snapshot(path: &Path, tables: &Tables) -> Result<(), StoreError> {
    if let Some(dir) = path.parent()
        && !dir.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(dir).await?;
    }
    let json = serde_json::to_string_pretty(tables)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, json).await?;
    tokio::fs::rename(&tmp, path).await?;
    tracing::debug!(
        path = %path.display(),
        leads = tables.leads.len(),
        "store snapshot written"
    );
    Ok(())
}

/// Cheaply cloneable handle; clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    data_file: Option<PathBuf>,
    faults: Faults,
}

impl MemoryStore {
    /// A purely in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store backed by `path`. Loads existing tables if the file exists.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let tables = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => serde_json::from_str::<Tables>(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Tables::default(),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!(
            path = %path.display(),
            leads = tables.leads.len(),
            "store opened"
        );
        Ok(Self {
            tables: Arc::new(Mutex::new(tables)),
            data_file: Some(path),
            faults: Faults::default(),
        })
    }

    /// Make `op` fail from now on.
    pub fn inject_fault(&self, op: Operation) {
        if let Ok(mut set) = self.faults.lock() {
            set.insert(op);
        }
    }

    pub fn clear_faults(&self) {
        if let Ok(mut set) = self.faults.lock() {
            set.clear();
        }
    }

    /// Copy of the committed tables.
    pub async fn snapshot(&self) -> Tables {
        self.tables.lock().await.clone()
    }
}

impl LeadStore for MemoryStore {
    type Tx = MemoryTx;

    async fn get_lead(&self, lead_id: &str) -> Result<Option<Lead>, StoreError> {
        check_fault(&self.faults, Operation::ReadLeads)?;
        Ok(self.tables.lock().await.lead(lead_id).cloned())
    }

    async fn list_leads_for_agent(&self, agent_id: &str) -> Result<Vec<Lead>, StoreError> {
        check_fault(&self.faults, Operation::ReadLeads)?;
        let tables = self.tables.lock().await;
        Ok(tables
            .leads
            .iter()
            .filter(|l| l.assigned_agent_id.as_deref() == Some(agent_id))
            .cloned()
            .collect())
    }

    async fn create_lead(&self, lead: Lead) -> Result<Lead, StoreError> {
        let mut tables = self.tables.lock().await;
        if tables.lead(&lead.id).is_some() {
            return Err(StoreError::Backend(format!("lead {} already exists", lead.id)));
        }
        let mut staged = tables.clone();
        staged.leads.push(lead.clone());
        if let Some(path) = &self.data_file {
            write_snapshot(path, &staged).await?;
        }
        *tables = staged;
        Ok(lead)
    }

    async fn performance_report(
        &self,
        agent_id: Option<&str>,
        since: Option<DateTime<Utc>>,
    ) -> Result<PerformanceReport, StoreError> {
        check_fault(&self.faults, Operation::ReadLeads)?;
        let tables = self.tables.lock().await;
        Ok(performance_report(&tables, agent_id, since))
    }

    async fn begin(&self) -> Result<MemoryTx, StoreError> {
        Ok(MemoryTx {
            tables: self.tables.clone(),
            read: HashMap::new(),
            staged: Tables::default(),
            data_file: self.data_file.clone(),
            faults: self.faults.clone(),
        })
    }
}

/// Unit of work over a [`MemoryStore`]. Dropping it without `commit` rolls back.
pub struct MemoryTx {
    tables: Arc<Mutex<Tables>>,
    /// Touched leads as first read from the committed tables.
    read: HashMap<String, Lead>,
    /// Touched leads as staged, plus appended records.
    staged: Tables,
    data_file: Option<PathBuf>,
    faults: Faults,
}

impl MemoryTx {
    async fn staged_lead(&mut self, lead_id: &str) -> Result<&mut Lead, StoreError> {
        if self.staged.lead(lead_id).is_none() {
            let lead = self
                .tables
                .lock()
                .await
                .lead(lead_id)
                .cloned()
                .ok_or_else(|| StoreError::MissingLead(lead_id.to_string()))?;
            self.read.insert(lead.id.clone(), lead.clone());
            self.staged.leads.push(lead);
        }
        self.staged.lead_mut(lead_id)
    }
}

impl UnitOfWork for MemoryTx {
    async fn get_lead(&mut self, lead_id: &str) -> Result<Option<Lead>, StoreError> {
        match self.staged_lead(lead_id).await {
            Ok(lead) => Ok(Some(lead.clone())),
            Err(StoreError::MissingLead(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn update_lead_status(
        &mut self,
        lead_id: &str,
        patch: &LeadPatch,
    ) -> Result<Lead, StoreError> {
        check_fault(&self.faults, Operation::UpdateLeadStatus)?;
        let lead = self.staged_lead(lead_id).await?;
        if lead.status != patch.expected_status {
            return Err(StoreError::Conflict {
                lead_id: lead_id.to_string(),
                expected: patch.expected_status,
                actual: lead.status,
            });
        }
        lead.status = patch.status;
        if let Some(due) = patch.next_follow_up {
            lead.next_follow_up = Some(due);
        }
        lead.touch(Utc::now());
        Ok(lead.clone())
    }

    async fn append_call_attempt(
        &mut self,
        lead_id: &str,
        attempt: CallAttempt,
    ) -> Result<(), StoreError> {
        check_fault(&self.faults, Operation::AppendCallAttempt)?;
        let lead = self.staged_lead(lead_id).await?;
        if lead
            .call_attempts
            .last()
            .is_some_and(|last| last.timestamp > attempt.timestamp)
        {
            return Err(StoreError::OutOfOrderAttempt(lead_id.to_string()));
        }
        lead.last_contact = Some(attempt.timestamp);
        if let Some(next) = attempt.next_attempt_scheduled {
            lead.next_follow_up = Some(next);
        }
        lead.call_attempts.push(attempt);
        lead.touch(Utc::now());
        Ok(())
    }

    async fn create_sale_record(&mut self, sale: SaleRecord) -> Result<String, StoreError> {
        check_fault(&self.faults, Operation::CreateSaleRecord)?;
        let id = sale.id.clone();
        self.staged.sales.push(sale);
        Ok(id)
    }

    async fn log_loss_reason(&mut self, loss: LossRecord) -> Result<(), StoreError> {
        check_fault(&self.faults, Operation::LogLossReason)?;
        self.staged.losses.push(loss);
        Ok(())
    }

    async fn record_metric(&mut self, metric: MetricSnapshot) -> Result<(), StoreError> {
        check_fault(&self.faults, Operation::RecordMetric)?;
        self.staged.metrics.push(metric);
        Ok(())
    }

    async fn create_follow_up_task(&mut self, task: FollowUpTask) -> Result<String, StoreError> {
        check_fault(&self.faults, Operation::CreateFollowUpTask)?;
        let id = task.id.clone();
        self.staged.follow_ups.push(task);
        Ok(id)
    }

    async fn commit(self) -> Result<(), StoreError> {
        check_fault(&self.faults, Operation::Commit)?;
        let MemoryTx {
            tables,
            read,
            staged,
            data_file,
            ..
        } = self;

        let mut live = tables.lock().await;
        let mut merged = live.clone();
        for lead in staged.leads {
            let current = merged.lead_mut(&lead.id)?;
            if let Some(seen) = read.get(&lead.id)
                && *current != *seen
            {
                return Err(StoreError::Conflict {
                    lead_id: lead.id.clone(),
                    expected: seen.status,
                    actual: current.status,
                });
            }
            *current = lead;
        }
        merged.sales.extend(staged.sales);
        merged.losses.extend(staged.losses);
        merged.metrics.extend(staged.metrics);
        merged.follow_ups.extend(staged.follow_ups);

        if let Some(path) = &data_file {
            write_snapshot(path, &merged).await?;
        }
        *live = merged;
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        Ok(())
    }
}
