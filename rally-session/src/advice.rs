use rally_core::advisor::Advisor;
use rally_core::Session;
use tracing::warn;

use crate::lifecycle::sort_recent_first;

pub const NO_SESSIONS_MESSAGE: &str = "No sessions yet. Create one to get club insights.";
pub const FALLBACK_MESSAGE: &str = "Advice is unavailable right now. Keep playing!";

/// `date: D, court fee: F, participants: N, shuttles: Q` for the `sample`
/// most recent sessions, joined by `"; "`. `None` when there is nothing to summarise.
pub fn build_summary(sessions: &[Session], sample: usize) -> Option<String> {
    if sessions.is_empty() || sample == 0 {
        return None;
    }
    let mut recent = sessions.to_vec();
    sort_recent_first(&mut recent);

    let summary = recent
        .iter()
        .take(sample)
        .map(|s| {
            format!(
                "date: {}, court fee: {}, participants: {}, shuttles: {}",
                s.date,
                s.court_fee,
                s.participants.len(),
                s.shuttle_qty
            )
        })
        .collect::<Vec<_>>()
        .join("; ");
    Some(summary)
}

/// Ask the advisor about recent activity. Never fails; errors and empty
/// replies turn into a fixed fallback text.
pub async fn fetch_advice(advisor: &dyn Advisor, sessions: &[Session], sample: usize) -> String {
    let Some(summary) = build_summary(sessions, sample) else {
        return NO_SESSIONS_MESSAGE.to_string();
    };

    match advisor.advise(&summary).await {
        Ok(reply) if !reply.trim().is_empty() => reply,
        Ok(_) => {
            warn!("Advisor returned an empty reply");
            FALLBACK_MESSAGE.to_string()
        }
        Err(e) => {
            warn!("Advisor failed: {}", e);
            FALLBACK_MESSAGE.to_string()
        }
    }
}
