use chrono::NaiveDate;
use rally_core::Session;
use rally_shared::Money;
use serde::{Deserialize, Serialize};

use crate::cost;

/// Grouping granularity.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Day,
    #[default]
    Month,
    Year,
}

impl Period {
    /// `YYYY-MM-DD`, `YYYY-MM` or `YYYY`; lexical order is chronological.
    pub fn key(self, date: NaiveDate) -> String {
        match self {
            Period::Day => date.format("%Y-%m-%d").to_string(),
            Period::Month => date.format("%Y-%m").to_string(),
            Period::Year => date.format("%Y").to_string(),
        }
    }
}

/// One line of the per-session detail table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRow {
    pub id: String,
    pub date: NaiveDate,
    pub time: String,
    pub location: String,
    pub total_cost: Money,
    pub participant_count: usize,
    pub shuttle_qty: u32,
    pub per_person: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodSummary {
    pub key: String,
    pub session_count: usize,
    pub total_cost: Money,
    pub total_participants: usize,
    pub total_shuttles: u32,
    /// Distinct venues in first-seen order.
    pub locations: Vec<String>,
    pub location_label: String,
    pub per_person: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub session_count: usize,
    pub total_cost: Money,
    pub total_participants: usize,
    /// Major units; zero for an empty collection.
    pub avg_cost_per_session: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    pub period: Period,
    pub summary: Summary,
    pub groups: Vec<PeriodSummary>,
    pub detail: Vec<SessionRow>,
}

/// Read-only rollups over the session collection.
pub struct AnalyticsAggregator;

impl AnalyticsAggregator {
    pub fn report(sessions: &[Session], period: Period) -> AnalyticsReport {
        AnalyticsReport {
            period,
            summary: Self::summary(sessions),
            groups: Self::group(sessions, period),
            detail: Self::detail(sessions),
        }
    }

    /// Per-session rows, most recent date first.
    pub fn detail(sessions: &[Session]) -> Vec<SessionRow> {
        let mut rows: Vec<SessionRow> = sessions
            .iter()
            .map(|s| SessionRow {
                id: s.id.clone(),
                date: s.date,
                time: s.time.to_string(),
                location: s.location.clone(),
                total_cost: cost::total_event_cost(s),
                participant_count: s.participants.len(),
                shuttle_qty: s.shuttle_qty,
                per_person: cost::cost_per_person(s),
            })
            .collect();
        rows.sort_by(|a, b| b.date.cmp(&a.date));
        rows
    }

    /// Sums per period key, most recent period first.
    pub fn group(sessions: &[Session], period: Period) -> Vec<PeriodSummary> {
        let mut groups: Vec<PeriodSummary> = Vec::new();

        for session in sessions {
            let key = period.key(session.date);
            let index = match groups.iter().position(|g| g.key == key) {
                Some(i) => i,
                None => {
                    groups.push(PeriodSummary {
                        key,
                        session_count: 0,
                        total_cost: Money::ZERO,
                        total_participants: 0,
                        total_shuttles: 0,
                        locations: Vec::new(),
                        location_label: String::new(),
                        per_person: None,
                    });
                    groups.len() - 1
                }
            };

            let group = &mut groups[index];
            group.session_count += 1;
            group.total_cost += cost::total_event_cost(session);
            group.total_participants += session.participants.len();
            group.total_shuttles = group.total_shuttles.saturating_add(session.shuttle_qty);
            if !group.locations.contains(&session.location) {
                group.locations.push(session.location.clone());
            }
        }

        for group in &mut groups {
            group.location_label = location_label(&group.locations);
            group.per_person = group.total_cost.share(group.total_participants);
        }
        groups.sort_by(|a, b| b.key.cmp(&a.key));
        groups
    }

    pub fn summary(sessions: &[Session]) -> Summary {
        let total_cost: Money = sessions.iter().map(cost::total_event_cost).sum();
        let total_participants = sessions.iter().map(|s| s.participants.len()).sum();
        let avg_cost_per_session = if sessions.is_empty() {
            0.0
        } else {
            total_cost.to_major() / sessions.len() as f64
        };

        Summary {
            session_count: sessions.len(),
            total_cost,
            total_participants,
            avg_cost_per_session,
        }
    }
}

/// First two venues, with a trailing `...` when there are more.
fn location_label(locations: &[String]) -> String {
    let shown = locations.iter().take(2).cloned().collect::<Vec<_>>().join(", ");
    if locations.len() > 2 {
        format!("{}...", shown)
    } else {
        shown
    }
}
