use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The six stages of the sales pipeline.
///
/// Leads flow: NEW → CONTACTED → QUALIFIED → OPPORTUNITY → CLOSED_WON,
/// and can drop to CLOSED_LOST from any open stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeadStatus {
    New,
    Contacted,
    Qualified,
    Opportunity,
    ClosedWon,
    ClosedLost,
}

impl LeadStatus {
    pub const ALL: [LeadStatus; 6] = [
        LeadStatus::New,
        LeadStatus::Contacted,
        LeadStatus::Qualified,
        LeadStatus::Opportunity,
        LeadStatus::ClosedWon,
        LeadStatus::ClosedLost,
    ];

    /// Closed statuses have no outbound transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, LeadStatus::ClosedWon | LeadStatus::ClosedLost)
    }

    /// Statuses reachable in one step from `self`.
    pub fn allowed_targets(self) -> &'static [LeadStatus] {
        match self {
            LeadStatus::New => &[LeadStatus::Contacted, LeadStatus::ClosedLost],
            LeadStatus::Contacted => &[LeadStatus::Qualified, LeadStatus::ClosedLost],
            LeadStatus::Qualified => &[LeadStatus::Opportunity, LeadStatus::ClosedLost],
            LeadStatus::Opportunity => &[LeadStatus::ClosedWon, LeadStatus::ClosedLost],
            LeadStatus::ClosedWon | LeadStatus::ClosedLost => &[],
        }
    }

    pub fn can_transition_to(self, target: LeadStatus) -> bool {
        self.allowed_targets().contains(&target)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LeadStatus::New => "NEW",
            LeadStatus::Contacted => "CONTACTED",
            LeadStatus::Qualified => "QUALIFIED",
            LeadStatus::Opportunity => "OPPORTUNITY",
            LeadStatus::ClosedWon => "CLOSED_WON",
            LeadStatus::ClosedLost => "CLOSED_LOST",
        }
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown lead status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for LeadStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        LeadStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}
