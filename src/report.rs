use std::collections::BTreeMap;
use std::fmt::Write;

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

use crate::engage::WARM_THRESHOLD;
use crate::models::{EngagementType, Prospect, Segment, SequenceStatus, Status, Tier};

/// Funnel stages in pipeline order. Side exits (lost, skip, dead, cold) are
/// not stages and never count toward the funnel.
pub const STAGE_ORDER: [Status; 7] = [
    Status::New,
    Status::Warming,
    Status::Warm,
    Status::OutreachSent,
    Status::Replied,
    Status::CallBooked,
    Status::Won,
];

pub const ACTIVE_STATUSES: [Status; 5] = [
    Status::Warming,
    Status::Warm,
    Status::OutreachSent,
    Status::Replied,
    Status::CallBooked,
];

pub const ACTIVITY_DAYS: i64 = 14;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ActivityCounts {
    pub comments: usize,
    pub dms: usize,
    pub follow_ups: usize,
    pub replies: usize,
}

impl ActivityCounts {
    /// Connection requests are not activity for reporting purposes.
    pub fn tally(&mut self, kind: EngagementType) {
        match kind {
            EngagementType::Comment => self.comments += 1,
            EngagementType::Dm => self.dms += 1,
            EngagementType::FollowUp => self.follow_ups += 1,
            EngagementType::ReplyReceived => self.replies += 1,
            EngagementType::ConnectionRequest => {}
        }
    }

    pub fn total(&self) -> usize {
        self.comments + self.dms + self.follow_ups + self.replies
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklySummary {
    pub this_week: ActivityCounts,
    pub last_week: ActivityCounts,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunnelStage {
    pub stage: Status,
    pub count: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SequencePerformance {
    pub active: usize,
    pub exhausted: usize,
    pub replied: usize,
    pub connection_pending: usize,
    pub total_started: usize,
    pub reply_rate: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyActivity {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub counts: ActivityCounts,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub generated: NaiveDate,
    pub total_prospects: usize,
    pub weekly: WeeklySummary,
    #[serde(rename = "statusCounts")]
    pub status_counts: BTreeMap<Status, usize>,
    #[serde(rename = "segmentCounts")]
    pub segment_counts: BTreeMap<Segment, usize>,
    #[serde(rename = "tierCounts")]
    pub tier_counts: BTreeMap<Tier, usize>,
    pub funnel: Vec<FunnelStage>,
    #[serde(rename = "avgVelocity")]
    pub avg_velocity: BTreeMap<Status, i64>,
    pub sequences: SequencePerformance,
    #[serde(rename = "dailyActivity")]
    pub daily_activity: Vec<DailyActivity>,
}

/// Each prospect counts toward every stage at or before its current one.
pub fn funnel(prospects: &[Prospect]) -> Vec<FunnelStage> {
    let mut counts = [0usize; STAGE_ORDER.len()];
    for prospect in prospects {
        if let Some(idx) = STAGE_ORDER.iter().position(|s| *s == prospect.status) {
            for count in counts.iter_mut().take(idx + 1) {
                *count += 1;
            }
        }
    }
    STAGE_ORDER
        .iter()
        .zip(counts)
        .map(|(stage, count)| FunnelStage {
            stage: *stage,
            count,
        })
        .collect()
}

/// Average whole days spent in the current stage. Outreach stages use the
/// sequence start as the entry date when there is one; everything else uses
/// `created_at`.
pub fn average_velocity(prospects: &[Prospect], today: NaiveDate) -> BTreeMap<Status, i64> {
    let mut totals: BTreeMap<Status, (i64, i64)> =
        ACTIVE_STATUSES.iter().map(|s| (*s, (0, 0))).collect();

    for prospect in prospects {
        let Some(entry) = totals.get_mut(&prospect.status) else {
            continue;
        };
        let entered = match prospect.status {
            Status::OutreachSent | Status::Replied => {
                prospect.sequence_started.unwrap_or(prospect.created_at)
            }
            _ => prospect.created_at,
        };
        entry.0 += (today - entered).num_days();
        entry.1 += 1;
    }

    totals
        .into_iter()
        .map(|(status, (days, count))| {
            let avg = if count == 0 {
                0
            } else {
                (days as f64 / count as f64).round() as i64
            };
            (status, avg)
        })
        .collect()
}

pub fn sequence_performance(prospects: &[Prospect]) -> SequencePerformance {
    let mut perf = SequencePerformance::default();
    for prospect in prospects {
        match prospect.sequence_status {
            SequenceStatus::Active => perf.active += 1,
            SequenceStatus::Exhausted => perf.exhausted += 1,
            SequenceStatus::Replied => perf.replied += 1,
            SequenceStatus::ConnectionPending => perf.connection_pending += 1,
            SequenceStatus::NotStarted => {}
        }
        if prospect.sequence_started.is_some() {
            perf.total_started += 1;
        }
    }
    perf.reply_rate = if perf.total_started == 0 {
        0
    } else {
        (perf.replied as f64 / perf.total_started as f64 * 100.0).round() as u32
    };
    perf
}

/// One bucket per day for the last [`ACTIVITY_DAYS`] days, oldest first.
pub fn daily_activity(prospects: &[Prospect], today: NaiveDate) -> Vec<DailyActivity> {
    let first = today - Duration::days(ACTIVITY_DAYS - 1);
    let mut buckets = vec![ActivityCounts::default(); ACTIVITY_DAYS as usize];

    for engagement in prospects.iter().flat_map(|p| p.engagements.iter()) {
        let offset = (engagement.date - first).num_days();
        if (0..ACTIVITY_DAYS).contains(&offset) {
            buckets[offset as usize].tally(engagement.kind);
        }
    }

    buckets
        .into_iter()
        .enumerate()
        .map(|(i, counts)| DailyActivity {
            date: first + Duration::days(i as i64),
            total: counts.total(),
            counts,
        })
        .collect()
}

pub fn weekly_summary(prospects: &[Prospect], today: NaiveDate) -> WeeklySummary {
    let week_ago = today - Duration::days(7);
    let two_weeks_ago = today - Duration::days(14);
    let mut summary = WeeklySummary {
        this_week: ActivityCounts::default(),
        last_week: ActivityCounts::default(),
    };

    for engagement in prospects.iter().flat_map(|p| p.engagements.iter()) {
        if engagement.date >= week_ago {
            summary.this_week.tally(engagement.kind);
        } else if engagement.date >= two_weeks_ago {
            summary.last_week.tally(engagement.kind);
        }
    }
    summary
}

pub fn build_report(prospects: &[Prospect], today: NaiveDate) -> PipelineReport {
    let mut status_counts = BTreeMap::new();
    let mut segment_counts = BTreeMap::new();
    let mut tier_counts = BTreeMap::new();
    for prospect in prospects {
        *status_counts.entry(prospect.status).or_insert(0) += 1;
        *segment_counts.entry(prospect.segment).or_insert(0) += 1;
        *tier_counts.entry(prospect.tier).or_insert(0) += 1;
    }

    PipelineReport {
        generated: today,
        total_prospects: prospects.len(),
        weekly: weekly_summary(prospects, today),
        status_counts,
        segment_counts,
        tier_counts,
        funnel: funnel(prospects),
        avg_velocity: average_velocity(prospects, today),
        sequences: sequence_performance(prospects),
        daily_activity: daily_activity(prospects, today),
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct WarmthDistribution {
    pub cold: usize,
    pub warming: usize,
    pub warm: usize,
    pub hot: usize,
}

/// Headline numbers for the dashboard header.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total: usize,
    pub by_status: BTreeMap<Status, usize>,
    pub by_segment: BTreeMap<Segment, usize>,
    pub by_tier: BTreeMap<Tier, usize>,
    pub comments_today: usize,
    pub comments_this_week: usize,
    pub dms_today: usize,
    pub due_today: usize,
    pub ready_for_snapshot: usize,
    pub follow_ups_due: usize,
    pub sequences_exhausted: usize,
    pub warmth_distribution: WarmthDistribution,
    pub reports_generated: usize,
    pub reports_needed: usize,
}

pub fn dashboard_stats(prospects: &[Prospect], today: NaiveDate) -> DashboardStats {
    let week_start = today - Duration::days(i64::from(today.weekday().num_days_from_sunday()));
    let mut stats = DashboardStats {
        total: prospects.len(),
        ..DashboardStats::default()
    };

    for p in prospects {
        *stats.by_status.entry(p.status).or_insert(0) += 1;
        *stats.by_segment.entry(p.segment).or_insert(0) += 1;
        *stats.by_tier.entry(p.tier).or_insert(0) += 1;

        if p.status == Status::Warming && p.next_check_in <= today {
            stats.due_today += 1;
        }
        if p.warmth_score >= WARM_THRESHOLD {
            stats.ready_for_snapshot += 1;
        }
        if p.sequence_status == SequenceStatus::Active
            && p.follow_up_due.is_some_and(|due| due <= today)
        {
            stats.follow_ups_due += 1;
        }
        if p.sequence_status == SequenceStatus::Exhausted {
            stats.sequences_exhausted += 1;
        }

        let bucket = &mut stats.warmth_distribution;
        match p.warmth_score {
            0 => bucket.cold += 1,
            1..=2 => bucket.warming += 1,
            3..=4 => bucket.warm += 1,
            _ => bucket.hot += 1,
        }

        if p.report_generated {
            stats.reports_generated += 1;
        } else if matches!(
            p.status,
            Status::Warm | Status::OutreachSent | Status::Replied | Status::CallBooked
        ) {
            stats.reports_needed += 1;
        }

        for e in &p.engagements {
            match e.kind {
                EngagementType::Comment => {
                    if e.date == today {
                        stats.comments_today += 1;
                    }
                    if e.date >= week_start {
                        stats.comments_this_week += 1;
                    }
                }
                EngagementType::Dm if e.date == today => stats.dms_today += 1,
                _ => {}
            }
        }
    }

    stats
}

pub fn render_markdown(label: &str, report: &PipelineReport) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Prospect Pipeline Report");
    let _ = writeln!(
        output,
        "Generated for {} on {} ({} prospects)",
        label, report.generated, report.total_prospects
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## This Week");

    let this = &report.weekly.this_week;
    let last = &report.weekly.last_week;
    let _ = writeln!(output, "- Comments: {} (last week {})", this.comments, last.comments);
    let _ = writeln!(output, "- DMs: {} (last week {})", this.dms, last.dms);
    let _ = writeln!(
        output,
        "- Follow-ups: {} (last week {})",
        this.follow_ups, last.follow_ups
    );
    let _ = writeln!(output, "- Replies: {} (last week {})", this.replies, last.replies);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Funnel");

    if report.total_prospects == 0 {
        let _ = writeln!(output, "No prospects tracked yet.");
    } else {
        for stage in &report.funnel {
            let _ = writeln!(output, "- {}: {}", stage.stage, stage.count);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Days In Stage");
    for (status, days) in &report.avg_velocity {
        let _ = writeln!(output, "- {}: {} days avg", status, days);
    }

    let seq = &report.sequences;
    let _ = writeln!(output);
    let _ = writeln!(output, "## Sequences");
    let _ = writeln!(
        output,
        "- {} started, {} active, {} exhausted, {} replied ({}% reply rate)",
        seq.total_started, seq.active, seq.exhausted, seq.replied, seq.reply_rate
    );
    let _ = writeln!(output, "- {} connection requests pending", seq.connection_pending);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Daily Activity");

    let active_days: Vec<&DailyActivity> =
        report.daily_activity.iter().filter(|d| d.total > 0).collect();
    if active_days.is_empty() {
        let _ = writeln!(output, "No engagement logged in the last {ACTIVITY_DAYS} days.");
    } else {
        for day in active_days {
            let _ = writeln!(
                output,
                "- {}: {} total ({} comments, {} DMs, {} follow-ups, {} replies)",
                day.date,
                day.total,
                day.counts.comments,
                day.counts.dms,
                day.counts.follow_ups,
                day.counts.replies
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Engagement;
    use chrono::Utc;

    fn days_ago(days: i64) -> NaiveDate {
        Utc::now().date_naive() - Duration::days(days)
    }

    fn prospect(status: Status) -> Prospect {
        let mut prospect = Prospect::new(days_ago(0));
        prospect.status = status;
        prospect
    }

    fn engaged(kind: EngagementType, days: i64) -> Engagement {
        Engagement {
            kind,
            date: days_ago(days),
            note: String::new(),
        }
    }

    #[test]
    fn funnel_counts_every_prior_stage() {
        let all = vec![
            prospect(Status::New),
            prospect(Status::Warming),
            prospect(Status::OutreachSent),
            prospect(Status::Won),
            prospect(Status::Dead),
        ];
        let stages = funnel(&all);

        let counts: Vec<usize> = stages.iter().map(|s| s.count).collect();
        assert_eq!(counts, vec![4, 3, 2, 2, 1, 1, 1]);
        assert!(counts.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn velocity_uses_sequence_start_for_outreach() {
        let mut outreach = prospect(Status::OutreachSent);
        outreach.created_at = days_ago(30);
        outreach.sequence_started = Some(days_ago(4));
        let mut warming_a = prospect(Status::Warming);
        warming_a.created_at = days_ago(10);
        let mut warming_b = prospect(Status::Warming);
        warming_b.created_at = days_ago(5);

        let velocity = average_velocity(&[outreach, warming_a, warming_b], days_ago(0));
        assert_eq!(velocity[&Status::OutreachSent], 4);
        assert_eq!(velocity[&Status::Warming], 8);
        assert_eq!(velocity[&Status::CallBooked], 0);
        assert!(!velocity.contains_key(&Status::Won));
    }

    #[test]
    fn reply_rate_is_rounded_percent() {
        let mut replied = prospect(Status::Replied);
        replied.sequence_status = SequenceStatus::Replied;
        replied.sequence_started = Some(days_ago(3));
        let mut active = prospect(Status::OutreachSent);
        active.sequence_status = SequenceStatus::Active;
        active.sequence_started = Some(days_ago(2));
        let mut exhausted = prospect(Status::OutreachSent);
        exhausted.sequence_status = SequenceStatus::Exhausted;
        exhausted.sequence_started = Some(days_ago(9));

        let perf = sequence_performance(&[replied, active, exhausted]);
        assert_eq!(perf.total_started, 3);
        assert_eq!(perf.reply_rate, 33);
        assert_eq!(perf.active, 1);
    }

    #[test]
    fn daily_activity_covers_fourteen_days() {
        let mut p = prospect(Status::OutreachSent);
        p.engagements = vec![
            engaged(EngagementType::Comment, 0),
            engaged(EngagementType::Dm, 0),
            engaged(EngagementType::FollowUp, 13),
            engaged(EngagementType::Comment, 14),
            engaged(EngagementType::ConnectionRequest, 1),
        ];

        let days = daily_activity(&[p], days_ago(0));
        assert_eq!(days.len(), 14);
        assert_eq!(days[0].date, days_ago(13));
        assert_eq!(days[0].counts.follow_ups, 1);
        assert_eq!(days[13].date, days_ago(0));
        assert_eq!(days[13].total, 2);
        assert_eq!(days[12].total, 0);
    }

    #[test]
    fn weekly_summary_splits_weeks() {
        let mut p = prospect(Status::Warming);
        p.engagements = vec![
            engaged(EngagementType::Comment, 1),
            engaged(EngagementType::Comment, 7),
            engaged(EngagementType::ReplyReceived, 10),
            engaged(EngagementType::Dm, 20),
        ];

        let weekly = weekly_summary(&[p], days_ago(0));
        assert_eq!(weekly.this_week.comments, 2);
        assert_eq!(weekly.last_week.replies, 1);
        assert_eq!(weekly.last_week.dms, 0);
    }

    #[test]
    fn stats_bucket_warmth_and_reports() {
        let mut hot = prospect(Status::Warm);
        hot.warmth_score = 6;
        hot.engagements = vec![engaged(EngagementType::Comment, 0), engaged(EngagementType::Dm, 0)];
        let mut due = prospect(Status::Warming);
        due.warmth_score = 1;
        let mut reported = prospect(Status::OutreachSent);
        reported.report_generated = true;
        reported.warmth_score = 3;

        let stats = dashboard_stats(&[hot, due, reported], days_ago(0));
        assert_eq!(stats.total, 3);
        assert_eq!(stats.due_today, 1);
        assert_eq!(stats.ready_for_snapshot, 1);
        assert_eq!(stats.comments_today, 1);
        assert_eq!(stats.comments_this_week, 1);
        assert_eq!(stats.dms_today, 1);
        assert_eq!(stats.warmth_distribution.hot, 1);
        assert_eq!(stats.warmth_distribution.warming, 1);
        assert_eq!(stats.warmth_distribution.warm, 1);
        assert_eq!(stats.reports_generated, 1);
        assert_eq!(stats.reports_needed, 1);
    }

    #[test]
    fn report_serializes_counts_by_name() {
        let report = build_report(&[prospect(Status::Warming)], days_ago(0));
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["statusCounts"]["warming"], 1);
        assert_eq!(value["tierCounts"]["2"], 1);
        assert_eq!(value["funnel"][1]["stage"], "warming");
        assert_eq!(value["dailyActivity"].as_array().unwrap().len(), 14);
    }

    #[test]
    fn markdown_mentions_empty_pipeline() {
        let report = build_report(&[], days_ago(0));
        let markdown = render_markdown("B2B 1st Connections", &report);
        assert!(markdown.contains("# Prospect Pipeline Report"));
        assert!(markdown.contains("No prospects tracked yet."));
        assert!(markdown.contains("No engagement logged in the last 14 days."));
    }
}
