//! Sales performance figures computed from committed records.
//!
//! Rates are percentages. Any rate or average whose denominator is empty is 0.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::memory::Tables;
use super::records::MetricEvent;
use crate::pipeline::LeadStatus;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LossReasonCount {
    pub reason: String,
    pub count: usize,
}

/// Figures for one slice of the pipeline: everyone, or a single agent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceMetrics {
    pub agent_id: Option<String>,
    pub total_leads: usize,
    pub converted_leads: usize,
    pub conversion_rate: f64,
    pub won_deals: usize,
    pub lost_deals: usize,
    pub win_rate: f64,
    pub total_revenue: f64,
    pub average_deal_size: f64,
    pub average_days_to_close: f64,
    /// Most frequent first, ties by reason.
    pub loss_reasons: Vec<LossReasonCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceReport {
    pub since: Option<DateTime<Utc>>,
    pub overall: PerformanceMetrics,
    pub agent: Option<PerformanceMetrics>,
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 / whole as f64 * 100.0
}

fn mean(total: f64, count: usize) -> f64 {
    if count == 0 {
        return 0.0;
    }
    total / count as f64
}

fn in_window(at: DateTime<Utc>, since: Option<DateTime<Utc>>) -> bool {
    since.is_none_or(|start| at >= start)
}

fn metrics_for(
    tables: &Tables,
    agent_id: Option<&str>,
    since: Option<DateTime<Utc>>,
) -> PerformanceMetrics {
    let owned_by = |agent: Option<&str>| agent_id.is_none() || agent == agent_id;

    let leads: Vec<_> = tables
        .leads
        .iter()
        .filter(|l| owned_by(l.assigned_agent_id.as_deref()) && in_window(l.created_at, since))
        .collect();
    let converted_leads = leads
        .iter()
        .filter(|l| l.status == LeadStatus::ClosedWon)
        .count();

    let sales: Vec<_> = tables
        .sales
        .iter()
        .filter(|s| owned_by(Some(&s.agent_id)) && in_window(s.closed_at, since))
        .collect();
    let total_revenue: f64 = sales.iter().map(|s| s.amount).sum();

    let mut won_deals = 0;
    let mut lost_deals = 0;
    let mut days_to_close = 0i64;
    for snapshot in tables
        .metrics
        .iter()
        .filter(|m| owned_by(Some(&m.agent_id)) && in_window(m.recorded_at, since))
    {
        match &snapshot.event {
            MetricEvent::LeadWon {
                days_to_close: days,
                ..
            } => {
                won_deals += 1;
                days_to_close += days;
            }
            MetricEvent::LeadLost { .. } => lost_deals += 1,
        }
    }

    let lead_agent: HashMap<&str, Option<&str>> = tables
        .leads
        .iter()
        .map(|l| (l.id.as_str(), l.assigned_agent_id.as_deref()))
        .collect();
    let mut reasons: HashMap<&str, usize> = HashMap::new();
    for loss in tables.losses.iter().filter(|l| {
        in_window(l.logged_at, since)
            && owned_by(lead_agent.get(l.lead_id.as_str()).copied().flatten())
    }) {
        *reasons.entry(loss.reason.as_str()).or_default() += 1;
    }
    let mut loss_reasons: Vec<LossReasonCount> = reasons
        .into_iter()
        .map(|(reason, count)| LossReasonCount {
            reason: reason.to_string(),
            count,
        })
        .collect();
    loss_reasons.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.reason.cmp(&b.reason)));

    PerformanceMetrics {
        agent_id: agent_id.map(str::to_string),
        total_leads: leads.len(),
        converted_leads,
        conversion_rate: percent(converted_leads, leads.len()),
        won_deals,
        lost_deals,
        win_rate: percent(won_deals, won_deals + lost_deals),
        total_revenue,
        average_deal_size: mean(total_revenue, sales.len()),
        average_days_to_close: mean(days_to_close as f64, won_deals),
        loss_reasons,
    }
}

/// Overall figures, plus one agent's figures when `agent_id` is given.
///
/// With `since`, only leads created, deals closed and losses logged at or
/// after that instant count.
pub fn performance_report(
    tables: &Tables,
    agent_id: Option<&str>,
    since: Option<DateTime<Utc>>,
) -> PerformanceReport {
    PerformanceReport {
        since,
        overall: metrics_for(tables, None, since),
        agent: agent_id.map(|id| metrics_for(tables, Some(id), since)),
    }
}
