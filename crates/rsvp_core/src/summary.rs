use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::domain::RsvpResponse;

pub use shared::protocol::RsvpSummary;

/// Immutable view of the response log at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminSnapshot {
    /// Most recent first.
    pub responses: Vec<RsvpResponse>,
    pub summary: RsvpSummary,
    pub fetched_at: DateTime<Utc>,
}

impl AdminSnapshot {
    pub fn new(mut responses: Vec<RsvpResponse>, fetched_at: DateTime<Utc>) -> Self {
        sort_newest_first(&mut responses);
        let summary = RsvpSummary::from_responses(&responses);
        Self {
            responses,
            summary,
            fetched_at,
        }
    }

    pub fn empty(fetched_at: DateTime<Utc>) -> Self {
        Self::new(Vec::new(), fetched_at)
    }

    /// Folds a pushed response into the snapshot, keeping newest-first order.
    /// A response already present (same guest, answers and timestamp) is
    /// skipped and `false` returned.
    pub fn apply_recorded(&mut self, response: RsvpResponse, at: DateTime<Utc>) -> bool {
        if self.responses.contains(&response) {
            return false;
        }
        self.summary.record(&response);
        let index = self
            .responses
            .partition_point(|existing| existing.timestamp >= response.timestamp);
        self.responses.insert(index, response);
        self.fetched_at = at;
        true
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }
}

/// Human-readable totals, one line per event plus the entree tally.
pub fn summary_lines(summary: &RsvpSummary) -> Vec<String> {
    let event = |label: &str, accept: usize, decline: usize| {
        format!("{label:<16}{accept} accept / {decline} decline")
    };
    vec![
        format!("{:<16}{}", "Total responses", summary.total),
        event("Welcome Event", summary.welcome_accept, summary.welcome_decline()),
        event("Wedding", summary.wedding_accept, summary.wedding_decline()),
        event("Farewell Event", summary.farewell_accept, summary.farewell_decline()),
        format!(
            "{:<16}chicken {} / fish {} / vegetable {}",
            "Entrees", summary.chicken, summary.fish, summary.vegetable
        ),
    ]
}

/// Stable sort; responses sharing a timestamp keep their incoming order.
pub fn sort_newest_first(responses: &mut [RsvpResponse]) {
    responses.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}

#[cfg(test)]
#[path = "tests/summary_tests.rs"]
mod tests;
