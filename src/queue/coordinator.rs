use chrono::{DateTime, Utc};
use serde::Serialize;

use super::priority::{RankedLead, rank};
use super::retry::next_delay;
use crate::error::{BusinessRuleError, OrchestratorError};
use crate::pipeline::{CallAttempt, Lead, TransitionError};
use crate::response::Envelope;
use crate::store::{LeadStore, UnitOfWork};

/// Counts over an agent's lead pool at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueStatus {
    pub agent_id: String,
    pub open: usize,
    pub ready: usize,
    pub scheduled: usize,
    pub closed: usize,
    pub next_due: Option<DateTime<Utc>>,
}

fn is_ready(lead: &Lead, now: DateTime<Utc>) -> bool {
    lead.next_follow_up.is_none_or(|due| due <= now)
}

/// Picks the next lead an agent should call and records call outcomes.
pub struct CallQueueCoordinator<S> {
    store: S,
}

impl<S: LeadStore> CallQueueCoordinator<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The most urgent open lead that is due for contact, if any.
    pub async fn next_lead(&self, agent_id: &str) -> Result<Option<RankedLead>, OrchestratorError> {
        self.next_lead_at(agent_id, Utc::now()).await
    }

    pub async fn next_lead_at(
        &self,
        agent_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<RankedLead>, OrchestratorError> {
        let next = self
            .ranked_at(agent_id, now)
            .await?
            .into_iter()
            .find(|r| is_ready(&r.lead, now));

        match &next {
            Some(r) => tracing::debug!(
                agent_id,
                lead_id = %r.lead.id,
                priority = r.priority_score,
                "next lead selected"
            ),
            None => tracing::debug!(agent_id, "no lead ready"),
        }
        Ok(next)
    }

    /// The agent's open leads, most urgent first.
    pub async fn ranked(&self, agent_id: &str) -> Result<Vec<RankedLead>, OrchestratorError> {
        self.ranked_at(agent_id, Utc::now()).await
    }

    async fn ranked_at(
        &self,
        agent_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<RankedLead>, OrchestratorError> {
        let open: Vec<Lead> = self
            .store
            .list_leads_for_agent(agent_id)
            .await
            .inspect_err(|e| tracing::error!(agent_id, error = %e, "failed to load lead pool"))?
            .into_iter()
            .filter(|l| !l.status.is_terminal())
            .collect();
        Ok(rank(open, now))
    }

    /// Append a call attempt and schedule the next one on the retry ladder.
    pub async fn record_call(
        &self,
        lead_id: &str,
        outcome: &str,
        notes: Option<String>,
    ) -> Result<CallAttempt, OrchestratorError> {
        self.record_call_at(lead_id, outcome, notes, Utc::now()).await
    }

    pub async fn record_call_at(
        &self,
        lead_id: &str,
        outcome: &str,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<CallAttempt, OrchestratorError> {
        if outcome.trim().is_empty() {
            return Err(TransitionError::IncompleteCallData.into());
        }

        let mut tx = self.store.begin().await?;
        let lead = tx
            .get_lead(lead_id)
            .await?
            .ok_or_else(|| BusinessRuleError::LeadNotFound(lead_id.to_string()))?;
        if lead.status.is_terminal() {
            return Err(TransitionError::FollowUpOnClosedLead {
                status: lead.status,
            }
            .into());
        }

        let attempt_number = lead.attempt_count() + 1;
        let mut attempt = CallAttempt::new(outcome, notes, Some(now + next_delay(attempt_number)));
        attempt.timestamp = now;

        tx.append_call_attempt(lead_id, attempt.clone()).await?;
        tx.commit().await?;

        tracing::info!(
            lead_id,
            attempt = attempt_number,
            next_attempt = ?attempt.next_attempt_scheduled,
            "call recorded"
        );
        Ok(attempt)
    }

    pub async fn queue_status(&self, agent_id: &str) -> Result<QueueStatus, OrchestratorError> {
        self.queue_status_at(agent_id, Utc::now()).await
    }

    pub async fn queue_status_at(
        &self,
        agent_id: &str,
        now: DateTime<Utc>,
    ) -> Result<QueueStatus, OrchestratorError> {
        let leads = self
            .store
            .list_leads_for_agent(agent_id)
            .await
            .inspect_err(|e| tracing::error!(agent_id, error = %e, "failed to load queue status"))?;
        let mut status = QueueStatus {
            agent_id: agent_id.to_string(),
            open: 0,
            ready: 0,
            scheduled: 0,
            closed: 0,
            next_due: None,
        };

        for lead in &leads {
            if lead.status.is_terminal() {
                status.closed += 1;
                continue;
            }
            status.open += 1;
            match lead.next_follow_up {
                Some(due) if due > now => {
                    status.scheduled += 1;
                    status.next_due = Some(status.next_due.map_or(due, |d| d.min(due)));
                }
                _ => status.ready += 1,
            }
        }
        Ok(status)
    }

    pub async fn handle_next_lead(&self, agent_id: &str) -> Envelope {
        Envelope::from_result(self.next_lead(agent_id).await, |next| match next {
            Some(r) => format!("Next lead: {}", r.lead.name),
            None => "No lead ready for contact".to_string(),
        })
    }

    pub async fn handle_record_call(
        &self,
        lead_id: &str,
        outcome: &str,
        notes: Option<String>,
    ) -> Envelope {
        let result = self.record_call(lead_id, outcome, notes).await;
        if let Err(e) = &result {
            crate::orchestrator::log_failure(lead_id, e);
        }
        Envelope::from_result(result, |a| match a.next_attempt_scheduled {
            Some(next) => format!("Call recorded, next attempt at {}", next.to_rfc3339()),
            None => "Call recorded".to_string(),
        })
    }

    pub async fn handle_queue_status(&self, agent_id: &str) -> Envelope {
        Envelope::from_result(self.queue_status(agent_id).await, |s| {
            format!("{} open, {} ready", s.open, s.ready)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::capture::CapturedLogs;
    use crate::pipeline::{LeadSource, LeadStatus};
    use crate::store::{MemoryStore, Operation};
    use chrono::Duration;

    async fn add(
        store: &MemoryStore,
        name: &str,
        agent: &str,
        created: DateTime<Utc>,
        configure: impl FnOnce(&mut Lead),
    ) -> Lead {
        let mut lead = Lead::new(name, LeadSource::ColdCall);
        lead.assigned_agent_id = Some(agent.to_string());
        lead.created_at = created;
        lead.updated_at = created;
        configure(&mut lead);
        store.create_lead(lead).await.unwrap()
    }

    #[tokio::test]
    async fn fresh_lead_outranks_stale_one() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let a = add(&store, "A", "agent-1", now - Duration::hours(1), |_| {}).await;
        add(&store, "B", "agent-1", now - Duration::hours(30), |l| {
            l.estimated_value = Some(50_000.0);
            l.call_attempts = vec![CallAttempt::new("no answer", None, None); 3];
        })
        .await;

        let coordinator = CallQueueCoordinator::new(store);
        let next = coordinator
            .next_lead_at("agent-1", now)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(next.lead.id, a.id);
        assert!((next.priority_score - 61.0).abs() < 1e-9);

        let ranked = coordinator.ranked_at("agent-1", now).await.unwrap();
        assert!((ranked[1].priority_score - 5.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn skips_leads_scheduled_in_the_future() {
        let store = MemoryStore::new();
        let now = Utc::now();
        add(&store, "Later", "agent-1", now, |l| {
            l.next_follow_up = Some(now + Duration::hours(1));
        })
        .await;
        let due = add(&store, "Due", "agent-1", now - Duration::hours(5), |l| {
            l.next_follow_up = Some(now);
        })
        .await;

        let coordinator = CallQueueCoordinator::new(store);
        let next = coordinator.next_lead_at("agent-1", now).await.unwrap();
        assert_eq!(next.map(|r| r.lead.id), Some(due.id));
    }

    #[tokio::test]
    async fn nothing_ready_is_not_an_error() {
        let store = MemoryStore::new();
        let now = Utc::now();
        add(&store, "Later", "agent-1", now, |l| {
            l.next_follow_up = Some(now + Duration::minutes(5));
        })
        .await;
        add(&store, "Won", "agent-1", now, |l| l.status = LeadStatus::ClosedWon).await;

        let coordinator = CallQueueCoordinator::new(store);
        assert!(coordinator.next_lead_at("agent-1", now).await.unwrap().is_none());
        assert!(coordinator.next_lead_at("agent-2", now).await.unwrap().is_none());

        let env = coordinator.handle_next_lead("agent-1").await;
        assert!(env.success);
        assert!(env.data.is_none());
    }

    #[tokio::test]
    async fn recording_calls_walks_the_retry_ladder() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let lead = add(&store, "A", "agent-1", now - Duration::hours(1), |_| {}).await;
        let coordinator = CallQueueCoordinator::new(store.clone());

        let first = coordinator
            .record_call_at(&lead.id, "no answer", None, now)
            .await
            .unwrap();
        assert_eq!(first.next_attempt_scheduled, Some(now + Duration::minutes(10)));

        let later = now + Duration::minutes(11);
        let second = coordinator
            .record_call_at(&lead.id, "voicemail", Some("left message".into()), later)
            .await
            .unwrap();
        assert_eq!(
            second.next_attempt_scheduled,
            Some(later + Duration::minutes(30))
        );

        let stored = store.get_lead(&lead.id).await.unwrap().unwrap();
        assert_eq!(stored.attempt_count(), 2);
        assert_eq!(stored.last_contact, Some(later));
        assert_eq!(stored.next_follow_up, second.next_attempt_scheduled);
    }

    #[tokio::test]
    async fn recording_a_call_on_unknown_or_closed_lead_fails() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let lost = add(&store, "Gone", "agent-1", now, |l| {
            l.status = LeadStatus::ClosedLost;
        })
        .await;
        let coordinator = CallQueueCoordinator::new(store.clone());

        let err = coordinator
            .record_call_at("missing", "no answer", None, now)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::Business(BusinessRuleError::LeadNotFound(_))
        ));

        let err = coordinator
            .record_call_at(&lost.id, "no answer", None, now)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::FailureKind::Validation);

        let err = coordinator
            .record_call_at(&lost.id, "  ", None, now)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::FailureKind::Validation);
        assert!(store.snapshot().await.leads[0].call_attempts.is_empty());
    }

    #[tokio::test]
    async fn backdated_call_is_a_business_error() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let lead = add(&store, "A", "agent-1", now - Duration::hours(1), |_| {}).await;
        let coordinator = CallQueueCoordinator::new(store.clone());

        coordinator
            .record_call_at(&lead.id, "no answer", None, now)
            .await
            .unwrap();
        let err = coordinator
            .record_call_at(&lead.id, "voicemail", None, now - Duration::minutes(1))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::Business(BusinessRuleError::OutOfOrderAttempt(ref id)) if *id == lead.id
        ));
        assert_eq!(store.snapshot().await.leads[0].attempt_count(), 1);
    }

    #[tokio::test]
    async fn store_read_failures_are_logged() {
        let store = MemoryStore::new();
        add(&store, "A", "agent-1", Utc::now(), |_| {}).await;
        store.inject_fault(Operation::ReadLeads);
        let coordinator = CallQueueCoordinator::new(store);

        let logs = CapturedLogs::default();
        let _guard = logs.install();

        let env = coordinator.handle_next_lead("agent-1").await;
        assert!(!env.success);
        assert_eq!(env.errors, Some(vec!["system_error".to_string()]));
        let env = coordinator.handle_queue_status("agent-1").await;
        assert!(!env.success);
        assert!(coordinator.ranked("agent-1").await.is_err());

        let out = logs.contents();
        assert_eq!(out.matches("injected fault on read_leads").count(), 3);
        assert!(out.contains("failed to load lead pool"));
        assert!(out.contains("failed to load queue status"));
        assert!(out.contains("agent_id=\"agent-1\""));
    }

    #[tokio::test]
    async fn queue_status_counts_pool() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let soon = now + Duration::minutes(30);
        add(&store, "Ready", "agent-1", now, |_| {}).await;
        add(&store, "Soon", "agent-1", now, |l| l.next_follow_up = Some(soon)).await;
        add(&store, "Later", "agent-1", now, |l| {
            l.next_follow_up = Some(now + Duration::hours(4));
        })
        .await;
        add(&store, "Closed", "agent-1", now, |l| l.status = LeadStatus::ClosedLost).await;
        add(&store, "Other", "agent-2", now, |_| {}).await;

        let coordinator = CallQueueCoordinator::new(store);
        let status = coordinator.queue_status_at("agent-1", now).await.unwrap();
        assert_eq!(
            status,
            QueueStatus {
                agent_id: "agent-1".into(),
                open: 3,
                ready: 1,
                scheduled: 2,
                closed: 1,
                next_due: Some(soon),
            }
        );
    }
}
