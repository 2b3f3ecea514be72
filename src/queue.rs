use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{Prospect, SequenceStatus, Status};

pub const COOLING_AFTER_DAYS: i64 = 14;
pub const STALE_AFTER_DAYS: i64 = 3;
pub const DEAD_AFTER_DAYS: i64 = 7;

/// Warming prospects whose check-in has come due, warmest first.
pub fn todays_queue(prospects: &[Prospect], today: NaiveDate) -> Vec<&Prospect> {
    let mut queue: Vec<&Prospect> = prospects
        .iter()
        .filter(|p| p.status == Status::Warming && p.next_check_in <= today)
        .collect();
    queue.sort_by(|a, b| b.warmth_score.cmp(&a.warmth_score));
    queue
}

fn due_with_status(
    prospects: &[Prospect],
    status: SequenceStatus,
    today: NaiveDate,
) -> Vec<&Prospect> {
    let mut due: Vec<&Prospect> = prospects
        .iter()
        .filter(|p| p.sequence_status == status)
        .filter(|p| p.follow_up_due.is_some_and(|due| due <= today))
        .collect();
    due.sort_by_key(|p| p.follow_up_due);
    due
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUps<'a> {
    pub due: Vec<&'a Prospect>,
    pub exhausted: Vec<&'a Prospect>,
    pub connection_pending: Vec<&'a Prospect>,
}

/// Active sequences with a follow-up due, exhausted sequences, and
/// connection requests old enough to check on.
pub fn follow_ups(prospects: &[Prospect], today: NaiveDate) -> FollowUps<'_> {
    FollowUps {
        due: due_with_status(prospects, SequenceStatus::Active, today),
        exhausted: prospects
            .iter()
            .filter(|p| p.sequence_status == SequenceStatus::Exhausted)
            .collect(),
        connection_pending: due_with_status(prospects, SequenceStatus::ConnectionPending, today),
    }
}

#[derive(Debug, Serialize)]
pub struct CoolingLead<'a> {
    #[serde(flatten)]
    pub prospect: &'a Prospect,
    pub alert_days_cold: i64,
}

#[derive(Debug, Serialize)]
pub struct StaleSequence<'a> {
    #[serde(flatten)]
    pub prospect: &'a Prospect,
    pub alert_days_overdue: i64,
}

#[derive(Debug, Serialize)]
pub struct DeadLeadSuggestion<'a> {
    #[serde(flatten)]
    pub prospect: &'a Prospect,
    pub alert_days_stale: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Alerts<'a> {
    pub cooling: Vec<CoolingLead<'a>>,
    pub stale: Vec<StaleSequence<'a>>,
    pub dead_suggestions: Vec<DeadLeadSuggestion<'a>>,
    pub total_alerts: usize,
}

pub fn cooling(prospects: &[Prospect], today: NaiveDate) -> Vec<CoolingLead<'_>> {
    let mut leads: Vec<CoolingLead<'_>> = prospects
        .iter()
        .filter(|p| p.status == Status::Warming)
        .filter_map(|p| {
            let since = p.last_engagement_date.unwrap_or(p.created_at);
            let days = (today - since).num_days();
            (days >= COOLING_AFTER_DAYS).then_some(CoolingLead {
                prospect: p,
                alert_days_cold: days,
            })
        })
        .collect();
    leads.sort_by(|a, b| b.alert_days_cold.cmp(&a.alert_days_cold));
    leads
}

pub fn stale(prospects: &[Prospect], today: NaiveDate) -> Vec<StaleSequence<'_>> {
    let mut stale: Vec<StaleSequence<'_>> = prospects
        .iter()
        .filter(|p| p.sequence_status == SequenceStatus::Active)
        .filter_map(|p| {
            let days = (today - p.follow_up_due?).num_days();
            (days >= STALE_AFTER_DAYS).then_some(StaleSequence {
                prospect: p,
                alert_days_overdue: days,
            })
        })
        .collect();
    stale.sort_by(|a, b| b.alert_days_overdue.cmp(&a.alert_days_overdue));
    stale
}

pub fn dead_suggestions(prospects: &[Prospect], today: NaiveDate) -> Vec<DeadLeadSuggestion<'_>> {
    let mut dead: Vec<DeadLeadSuggestion<'_>> = prospects
        .iter()
        .filter(|p| p.sequence_status == SequenceStatus::Exhausted)
        .filter_map(|p| {
            let since = p.last_action_date.or(p.sequence_started)?;
            let days = (today - since).num_days();
            (days >= DEAD_AFTER_DAYS).then_some(DeadLeadSuggestion {
                prospect: p,
                alert_days_stale: days,
            })
        })
        .collect();
    dead.sort_by(|a, b| b.alert_days_stale.cmp(&a.alert_days_stale));
    dead
}

pub fn alerts(prospects: &[Prospect], today: NaiveDate) -> Alerts<'_> {
    let cooling = cooling(prospects, today);
    let stale = stale(prospects, today);
    let dead_suggestions = dead_suggestions(prospects, today);
    let total_alerts = cooling.len() + stale.len() + dead_suggestions.len();
    Alerts {
        cooling,
        stale,
        dead_suggestions,
        total_alerts,
    }
}
