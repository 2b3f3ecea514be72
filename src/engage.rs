use chrono::{Duration, NaiveDate};

use crate::models::{Engagement, EngagementType, Prospect, SequenceStatus, SequenceType, Status};
use crate::sanitize::sanitize;

pub const FOLLOW_UP_INTERVAL_DAYS: i64 = 2;
pub const CONNECTION_CHECK_DAYS: i64 = 7;
pub const MAX_FOLLOW_UPS: u32 = 3;
pub const WARM_THRESHOLD: u32 = 5;

pub fn days_after(date: NaiveDate, days: i64) -> NaiveDate {
    date + Duration::days(days)
}

/// Appends an engagement to the prospect's history and applies the warmth,
/// status and outreach-sequence transitions for `kind`.
///
/// `sequence_override` only matters when a DM starts a new sequence; without
/// it the sequence type follows the `connected` flag.
pub fn record(
    prospect: &mut Prospect,
    kind: EngagementType,
    note: Option<&str>,
    sequence_override: Option<SequenceType>,
    today: NaiveDate,
) {
    let note = note.map(sanitize).unwrap_or_default();
    let action = |fallback: String| {
        if note.is_empty() {
            fallback
        } else {
            note.clone()
        }
    };

    prospect.engagements.push(Engagement {
        kind,
        date: today,
        note: note.clone(),
    });

    match kind {
        EngagementType::Comment => {
            prospect.warmth_score += 1;
        }
        EngagementType::ConnectionRequest => {
            prospect.last_action = Some(action("Sent connection request".to_string()));
            prospect.last_action_date = Some(today);
            prospect.follow_up_due = Some(days_after(today, CONNECTION_CHECK_DAYS));
            prospect.sequence_status = SequenceStatus::ConnectionPending;
        }
        EngagementType::Dm => {
            prospect.warmth_score += 2;
            prospect.status = Status::OutreachSent;
            prospect.last_action = Some(action("Sent DM".to_string()));
            prospect.last_action_date = Some(today);

            if matches!(
                prospect.sequence_status,
                SequenceStatus::NotStarted | SequenceStatus::ConnectionPending
            ) {
                prospect.sequence_type = Some(sequence_override.unwrap_or(
                    if prospect.connected.is_yes() {
                        SequenceType::ConnectedIcp
                    } else {
                        SequenceType::NotConnected
                    },
                ));
                prospect.sequence_step = 1;
                prospect.sequence_started = Some(today);
                prospect.follow_up_count = 0;
                prospect.follow_up_due = Some(days_after(today, FOLLOW_UP_INTERVAL_DAYS));
                prospect.sequence_status = SequenceStatus::Active;
            }
        }
        EngagementType::FollowUp => {
            prospect.follow_up_count += 1;
            prospect.sequence_step = prospect.sequence_step.max(1) + 1;
            prospect.last_action = Some(action(format!("Follow-up #{}", prospect.follow_up_count)));
            prospect.last_action_date = Some(today);

            if prospect.follow_up_count >= MAX_FOLLOW_UPS {
                prospect.follow_up_due = None;
                prospect.sequence_status = SequenceStatus::Exhausted;
            } else {
                prospect.follow_up_due = Some(days_after(today, FOLLOW_UP_INTERVAL_DAYS));
            }
        }
        EngagementType::ReplyReceived => {
            prospect.status = Status::Replied;
            prospect.sequence_status = SequenceStatus::Replied;
            prospect.follow_up_due = None;
            prospect.last_action = Some(action("Got a reply!".to_string()));
            prospect.last_action_date = Some(today);
        }
    }

    prospect.next_check_in = days_after(today, i64::from(prospect.check_in_days.max(1)));
    prospect.last_engagement_date = Some(today);

    if prospect.warmth_score >= WARM_THRESHOLD && prospect.status == Status::Warming {
        prospect.status = Status::Warm;
    }
}

/// Pushes the next check-in out by the prospect's interval without logging
/// an engagement.
pub fn snooze(prospect: &mut Prospect, today: NaiveDate) {
    prospect.next_check_in = days_after(today, i64::from(prospect.check_in_days.max(1)));
}
