use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::pipeline::Lead;

const AGE_CAP_HOURS: f64 = 24.0;
const ATTEMPT_CAP: u32 = 3;
const VALUE_DIVISOR: f64 = 10_000.0;
const VALUE_CAP: f64 = 5.0;

/// Contact urgency for a lead. Higher is more urgent.
///
/// `(24 - min(age, 24)) * 2 + (3 - min(attempts, 3)) * 5 + min(value / 10000, 5)`,
/// the value term only when an estimate exists.
pub fn score(age_hours: f64, attempt_count: u32, estimated_value: Option<f64>) -> f64 {
    let age = age_hours.clamp(0.0, AGE_CAP_HOURS);
    let attempts = attempt_count.min(ATTEMPT_CAP);

    let mut score = (AGE_CAP_HOURS - age) * 2.0 + f64::from(ATTEMPT_CAP - attempts) * 5.0;
    if let Some(value) = estimated_value {
        score += (value / VALUE_DIVISOR).min(VALUE_CAP);
    }
    score
}

/// A lead paired with its priority at ranking time.
#[derive(Debug, Clone, Serialize)]
pub struct RankedLead {
    pub priority_score: f64,
    #[serde(flatten)]
    pub lead: Lead,
}

/// Score every lead and order them most urgent first.
///
/// The sort is stable, so equal scores keep their input order.
pub fn rank(leads: Vec<Lead>, now: DateTime<Utc>) -> Vec<RankedLead> {
    let mut ranked: Vec<RankedLead> = leads
        .into_iter()
        .map(|lead| RankedLead {
            priority_score: score(
                lead.age_hours(now),
                lead.attempt_count(),
                lead.estimated_value,
            ),
            lead,
        })
        .collect();
    ranked.sort_by(|a, b| b.priority_score.total_cmp(&a.priority_score));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{CallAttempt, LeadSource};
    use chrono::Duration;

    fn lead_aged(name: &str, now: DateTime<Utc>, hours: i64) -> Lead {
        let mut lead = Lead::new(name, LeadSource::Website);
        lead.created_at = now - Duration::hours(hours);
        lead.updated_at = lead.created_at;
        lead
    }

    #[test]
    fn fresh_untouched_lead_scores_highest() {
        assert_eq!(score(0.0, 0, None), 63.0);
        assert_eq!(score(1.0, 0, None), 61.0);
        assert_eq!(score(30.0, 4, Some(50_000.0)), 5.0);
    }

    #[test]
    fn value_term_is_capped() {
        assert_eq!(score(24.0, 3, Some(20_000.0)), 2.0);
        assert_eq!(score(24.0, 3, Some(1_000_000.0)), 5.0);
        assert_eq!(score(24.0, 3, None), 0.0);
    }

    #[test]
    fn score_is_flat_beyond_caps() {
        for hours in [24.0, 25.0, 48.0, 1_000.0] {
            assert_eq!(score(hours, 0, None), score(24.0, 0, None));
        }
        for attempts in [3, 4, 10, u32::MAX] {
            assert_eq!(score(0.0, attempts, None), score(0.0, 3, None));
        }
    }

    #[test]
    fn score_never_increases_with_age_or_attempts() {
        let mut previous = f64::INFINITY;
        for tenth_hours in 0..400 {
            let s = score(f64::from(tenth_hours) / 10.0, 1, Some(5_000.0));
            assert!(s <= previous);
            previous = s;
        }
        let mut previous = f64::INFINITY;
        for attempts in 0..10 {
            let s = score(2.0, attempts, None);
            assert!(s <= previous);
            previous = s;
        }
    }

    #[test]
    fn newer_lead_outranks_stale_valuable_one() {
        let now = Utc::now();
        let fresh = lead_aged("fresh", now, 1);
        let mut stale = lead_aged("stale", now, 30);
        stale.estimated_value = Some(50_000.0);
        for _ in 0..4 {
            stale.call_attempts.push(CallAttempt::new("no answer", None, None));
        }

        let ranked = rank(vec![stale, fresh], now);
        assert_eq!(ranked[0].lead.name, "fresh");
        assert!((ranked[0].priority_score - 46.0 - 15.0).abs() < 1e-6);
        assert!((ranked[1].priority_score - 5.0).abs() < 1e-6);
    }

    #[test]
    fn ties_keep_input_order() {
        let now = Utc::now();
        let leads: Vec<Lead> = ["a", "b", "c", "d"]
            .iter()
            .map(|n| lead_aged(n, now, 48))
            .collect();
        let ranked = rank(leads, now);
        let names: Vec<&str> = ranked.iter().map(|r| r.lead.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c", "d"]);
    }
}
