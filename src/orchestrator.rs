use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::error::{BusinessRuleError, FailureKind, NotifyError, OrchestratorError};
use crate::notify::{LossReview, Notifier};
use crate::pipeline::{
    CallAttempt, Lead, LeadIntake, LeadStatus, StatusEffect, StatusUpdateRequest,
    TransitionPolicy, ValidatedTransition,
};
use crate::response::Envelope;
use crate::store::{
    DealSize, FollowUpTask, HIGH_VALUE_THRESHOLD, LeadPatch, LeadStore, LossRecord, MetricEvent,
    MetricSnapshot, PerformanceReport, SaleRecord, UnitOfWork,
};

/// What a committed status change produced.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateOutcome {
    pub lead: Lead,
    pub previous_status: LeadStatus,
    pub effect: StatusEffect,
    pub sale_id: Option<String>,
    pub follow_up_task_id: Option<String>,
}

/// Drives leads through the pipeline and applies the side effects of each
/// transition as one unit of work.
pub struct LifecycleOrchestrator<S, N> {
    store: S,
    notifier: N,
}

impl<S: LeadStore, N: Notifier> LifecycleOrchestrator<S, N> {
    pub fn new(store: S, notifier: N) -> Self {
        Self { store, notifier }
    }

    /// Validate intake data and store the resulting `NEW` lead.
    pub async fn intake(&self, intake: LeadIntake) -> Result<Lead, OrchestratorError> {
        let lead = match intake.into_lead() {
            Ok(lead) => lead,
            Err(e) => {
                let err = OrchestratorError::from(e);
                log_failure("-", &err);
                return Err(err);
            }
        };
        let lead = self.store.create_lead(lead).await.inspect_err(|e| {
            tracing::error!(error = %e, "lead intake failed");
        })?;
        tracing::info!(lead_id = %lead.id, source = ?lead.source, "lead created");
        Ok(lead)
    }

    /// [`intake`](Self::intake) wrapped in the uniform envelope.
    pub async fn handle_intake(&self, intake: LeadIntake) -> Envelope {
        Envelope::from_result(self.intake(intake).await, |l| {
            format!("Lead {} created", l.id)
        })
    }

    pub async fn lead(&self, lead_id: &str) -> Result<Lead, OrchestratorError> {
        let result: Result<Lead, OrchestratorError> = match self.store.get_lead(lead_id).await {
            Ok(Some(lead)) => Ok(lead),
            Ok(None) => Err(BusinessRuleError::LeadNotFound(lead_id.to_string()).into()),
            Err(e) => Err(OrchestratorError::from(e)),
        };
        result.inspect_err(|e| log_failure(lead_id, e))
    }

    pub async fn handle_show(&self, lead_id: &str) -> Envelope {
        Envelope::from_result(self.lead(lead_id).await, |l| {
            format!("{} ({})", l.name, l.status)
        })
    }

    /// Conversion, win rate and deal size figures over the last `days` days,
    /// or all time. Includes `agent_id`'s own figures when given.
    pub async fn performance(
        &self,
        agent_id: Option<&str>,
        days: Option<u32>,
    ) -> Result<PerformanceReport, OrchestratorError> {
        let since = days.map(|d| Utc::now() - Duration::days(i64::from(d)));
        let report = self
            .store
            .performance_report(agent_id, since)
            .await
            .inspect_err(|e| {
                tracing::error!(agent_id = ?agent_id, error = %e, "performance report failed");
            })?;
        tracing::debug!(
            agent_id = ?agent_id,
            won = report.overall.won_deals,
            lost = report.overall.lost_deals,
            "performance report built"
        );
        Ok(report)
    }

    pub async fn handle_performance(&self, agent_id: Option<&str>, days: Option<u32>) -> Envelope {
        Envelope::from_result(self.performance(agent_id, days).await, |r| {
            let m = r.agent.as_ref().unwrap_or(&r.overall);
            format!(
                "Conversion {:.1}%, win rate {:.1}%, average deal ${:.2}",
                m.conversion_rate, m.win_rate, m.average_deal_size
            )
        })
    }

    /// Apply a requested status change to a lead.
    ///
    /// Validation failures return before anything is written. Everything
    /// after validation happens inside one unit of work and is rolled back
    /// on any failure.
    pub async fn update_status(
        &self,
        lead_id: &str,
        request: &StatusUpdateRequest,
    ) -> Result<UpdateOutcome, OrchestratorError> {
        self.update_status_at(lead_id, request, Utc::now()).await
    }

    /// [`update_status`](Self::update_status) with every record stamped `now`.
    pub async fn update_status_at(
        &self,
        lead_id: &str,
        request: &StatusUpdateRequest,
        now: DateTime<Utc>,
    ) -> Result<UpdateOutcome, OrchestratorError> {
        let result = self.try_update(lead_id, request, now).await;
        match &result {
            Ok(outcome) => tracing::info!(
                lead_id,
                from = %outcome.previous_status,
                to = %outcome.lead.status,
                "lead status updated"
            ),
            Err(e) => log_failure(lead_id, e),
        }
        result
    }

    /// [`update_status`](Self::update_status) wrapped in the uniform envelope.
    pub async fn handle_update(&self, lead_id: &str, request: &StatusUpdateRequest) -> Envelope {
        Envelope::from_result(self.update_status(lead_id, request).await, |o| {
            format!("Lead status updated to {}", o.lead.status)
        })
    }

    async fn try_update(
        &self,
        lead_id: &str,
        request: &StatusUpdateRequest,
        now: DateTime<Utc>,
    ) -> Result<UpdateOutcome, OrchestratorError> {
        let lead = self
            .store
            .get_lead(lead_id)
            .await?
            .ok_or_else(|| BusinessRuleError::LeadNotFound(lead_id.to_string()))?;

        if let Some(expected) = request.current_status
            && expected != lead.status
        {
            return Err(BusinessRuleError::StatusMismatch {
                lead_id: lead_id.to_string(),
                expected,
                actual: lead.status,
            }
            .into());
        }

        let transition =
            TransitionPolicy::validate(Some(lead.status), request.status, &request.fields, now)?;

        let mut tx = self.store.begin().await?;
        match self.apply(&mut tx, &lead, &transition, now).await {
            Ok(outcome) => {
                tx.commit().await?;
                Ok(outcome)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::error!(lead_id, error = %rollback_err, "rollback failed");
                }
                Err(e)
            }
        }
    }

    async fn apply(
        &self,
        tx: &mut S::Tx,
        lead: &Lead,
        transition: &ValidatedTransition,
        now: DateTime<Utc>,
    ) -> Result<UpdateOutcome, OrchestratorError> {
        let follow_up = transition.fields.follow_up_date;
        let patch = LeadPatch {
            status: transition.to,
            expected_status: lead.status,
            next_follow_up: follow_up,
        };
        tx.update_lead_status(&lead.id, &patch).await?;

        let follow_up_task_id = match follow_up {
            Some(due_at) => {
                let task = FollowUpTask::new(
                    &lead.id,
                    due_at,
                    lead.assigned_agent_id.clone(),
                    transition.fields.call_notes.clone(),
                );
                Some(tx.create_follow_up_task(task).await?)
            }
            None => None,
        };

        if let Some((outcome, notes)) = transition.call() {
            let mut attempt = CallAttempt::new(outcome, notes.map(str::to_string), follow_up);
            attempt.timestamp = now;
            tx.append_call_attempt(&lead.id, attempt).await?;
        }

        let current = tx
            .get_lead(&lead.id)
            .await?
            .ok_or_else(|| BusinessRuleError::LeadNotFound(lead.id.clone()))?;

        let effect = transition.effect();
        let sale_id = match &effect {
            StatusEffect::Won {
                sale_amount,
                products,
            } => Some(
                self.close_won(tx, &current, *sale_amount, products.clone(), now)
                    .await?,
            ),
            StatusEffect::Lost { reason, details } => {
                self.close_lost(tx, &current, transition.from, reason, details.clone(), now)
                    .await?;
                None
            }
            StatusEffect::Qualified => {
                let message = format!("Lead qualified: {} ({})", current.name, current.id);
                delivered("team", self.notifier.notify_team_channel(&message).await)?;
                None
            }
            StatusEffect::Plain => None,
        };

        Ok(UpdateOutcome {
            lead: current,
            previous_status: transition.from,
            effect,
            sale_id,
            follow_up_task_id,
        })
    }

    async fn close_won(
        &self,
        tx: &mut S::Tx,
        lead: &Lead,
        amount: f64,
        products: Vec<String>,
        now: DateTime<Utc>,
    ) -> Result<String, OrchestratorError> {
        let agent_id = assigned_agent(lead)?;
        let deal_size = DealSize::for_amount(amount);

        tx.record_metric(MetricSnapshot {
            lead_id: lead.id.clone(),
            agent_id: agent_id.to_string(),
            recorded_at: now,
            event: MetricEvent::LeadWon {
                revenue: amount,
                days_to_close: lead.days_in_pipeline(now),
                qualified: lead.is_qualified(),
                call_count: lead.attempt_count(),
                deal_size,
            },
        })
        .await?;

        let sale = SaleRecord::new(&lead.id, agent_id, amount, products, now);
        let sale_id = tx.create_sale_record(sale).await?;

        let message = format!("Deal closed! {} - ${amount:.2}", lead.name);
        delivered("wins", self.notifier.notify_win(&message).await)?;

        Ok(sale_id)
    }

    async fn close_lost(
        &self,
        tx: &mut S::Tx,
        lead: &Lead,
        stage: LeadStatus,
        reason: &str,
        details: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), OrchestratorError> {
        let agent_id = assigned_agent(lead)?;
        let days = lead.days_in_pipeline(now);

        tx.record_metric(MetricSnapshot {
            lead_id: lead.id.clone(),
            agent_id: agent_id.to_string(),
            recorded_at: now,
            event: MetricEvent::LeadLost {
                loss_reason: reason.to_string(),
                potential_revenue: lead.estimated_value,
                days_to_loss: days,
                qualified: lead.is_qualified(),
            },
        })
        .await?;

        tx.log_loss_reason(LossRecord {
            lead_id: lead.id.clone(),
            reason: reason.to_string(),
            details,
            stage,
            days_in_pipeline: days,
            logged_at: now,
        })
        .await?;

        if let Some(value) = lead.estimated_value
            && value > HIGH_VALUE_THRESHOLD
        {
            let review = LossReview {
                lead_id: lead.id.clone(),
                agent_id: agent_id.to_string(),
                reason: reason.to_string(),
                estimated_value: value,
                qualified: lead.is_qualified(),
                days_in_pipeline: days,
            };
            delivered(
                "loss-review",
                self.notifier.notify_loss_review(&review).await,
            )?;
        }

        Ok(())
    }
}

fn assigned_agent(lead: &Lead) -> Result<&str, BusinessRuleError> {
    lead.assigned_agent_id
        .as_deref()
        .ok_or_else(|| BusinessRuleError::UnassignedLead(lead.id.clone()))
}

/// A declined notification is logged; a failed notifier aborts the unit of work.
fn delivered(channel: &str, result: Result<bool, NotifyError>) -> Result<(), OrchestratorError> {
    if !result? {
        tracing::warn!(channel, "notification was not accepted");
    }
    Ok(())
}

pub(crate) fn log_failure(lead_id: &str, err: &OrchestratorError) {
    match err.kind() {
        FailureKind::Validation => tracing::info!(lead_id, error = %err, "request rejected"),
        FailureKind::Business => tracing::warn!(lead_id, error = %err, "business rule violated"),
        FailureKind::System => tracing::error!(lead_id, error = %err, "system failure"),
    }
}
