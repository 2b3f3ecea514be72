use chrono::NaiveDate;
use serde_json::{Map, Value};

use crate::error::TrackerError;
use crate::models::{
    clamp_check_in_days, clamp_icp_score, parse_date, value_as_f64, value_as_i64, Connected,
    Prospect, Segment, SequenceStatus, SequenceType, Status, Tier,
};
use crate::sanitize::{is_valid_linkedin_url, sanitize};

pub const MAX_BATCH: usize = 500;

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(sanitize(s)),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn optional_date(value: &Value) -> Option<Option<NaiveDate>> {
    match value {
        Value::Null => Some(None),
        Value::String(s) if s.trim().is_empty() => Some(None),
        Value::String(s) => parse_date(s).map(Some),
        _ => None,
    }
}

fn count(value: &Value) -> Option<u32> {
    value_as_i64(value).map(|n| n.clamp(0, i64::from(u32::MAX)) as u32)
}

pub fn tags_from(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(sanitize(s.trim())),
                Value::Null => None,
                other => Some(sanitize(&other.to_string())),
            })
            .filter(|t| !t.is_empty())
            .collect(),
        Value::String(s) => split_tags(s),
        _ => Vec::new(),
    }
}

pub fn split_tags(raw: &str) -> Vec<String> {
    raw.split([',', ';'])
        .map(|t| sanitize(t.trim()))
        .filter(|t| !t.is_empty())
        .collect()
}

/// Applies a PUT body to `prospect`. Only known fields are touched and every
/// value is coerced into range. An invalid LinkedIn URL rejects the whole
/// patch before anything changes.
pub fn apply_patch(prospect: &mut Prospect, patch: &Map<String, Value>) -> Result<(), TrackerError> {
    if let Some(Value::String(url)) = patch.get("linkedin_url") {
        if !is_valid_linkedin_url(url) {
            return Err(TrackerError::invalid(
                "Invalid LinkedIn URL: only linkedin.com URLs are allowed",
            ));
        }
    }

    for (key, value) in patch {
        match key.as_str() {
            "name" => set_text(&mut prospect.name, value),
            "company" => set_text(&mut prospect.company, value),
            "title" => set_text(&mut prospect.title, value),
            "linkedin_url" => set_text(&mut prospect.linkedin_url, value),
            "linkedin_username" => set_text(&mut prospect.linkedin_username, value),
            "notes" => set_text(&mut prospect.notes, value),
            "batch" => set_text(&mut prospect.batch, value),
            "source" => set_text(&mut prospect.source, value),
            "segment" => {
                prospect.segment = value.as_str().map(Segment::coerce).unwrap_or_default();
            }
            "status" => {
                prospect.status = value.as_str().map(Status::coerce).unwrap_or_default();
            }
            "sequence_status" => {
                prospect.sequence_status =
                    value.as_str().map(SequenceStatus::coerce).unwrap_or_default();
            }
            "sequence_type" => {
                prospect.sequence_type = value.as_str().and_then(SequenceType::parse);
            }
            "tier" => prospect.tier = Tier::from_value(value),
            "icp_score" => prospect.icp_score = clamp_icp_score(value_as_f64(value)),
            "check_in_days" => prospect.check_in_days = clamp_check_in_days(value_as_i64(value)),
            "connected" => prospect.connected = Connected::from_value(value),
            "tags" => prospect.tags = tags_from(value),
            "warmth_score" => {
                if let Some(score) = count(value) {
                    prospect.warmth_score = score;
                }
            }
            "sequence_step" => {
                if let Some(step) = count(value) {
                    prospect.sequence_step = step;
                }
            }
            "follow_up_count" => {
                if let Some(n) = count(value) {
                    prospect.follow_up_count = n;
                }
            }
            "next_check_in" => {
                if let Some(date) = value.as_str().and_then(parse_date) {
                    prospect.next_check_in = date;
                }
            }
            "last_action" => {
                prospect.last_action = text(value).filter(|s| !s.is_empty());
            }
            "last_action_date" => set_date(&mut prospect.last_action_date, value),
            "last_engagement_date" => set_date(&mut prospect.last_engagement_date, value),
            "sequence_started" => set_date(&mut prospect.sequence_started, value),
            "follow_up_due" => set_date(&mut prospect.follow_up_due, value),
            "report_generated" => {
                prospect.report_generated =
                    matches!(value, Value::Bool(true)) || value.as_str() == Some("true");
            }
            "report_date" => {
                prospect.report_date = value
                    .as_str()
                    .map(|s| s.chars().take(10).collect::<String>())
                    .filter(|s| !s.is_empty());
            }
            _ => {}
        }
    }

    Ok(())
}

fn set_text(field: &mut String, value: &Value) {
    if let Some(text) = text(value) {
        *field = text;
    }
}

fn set_date(field: &mut Option<NaiveDate>, value: &Value) {
    if let Some(date) = optional_date(value) {
        *field = date;
    }
}

/// The subset of fields a batch update may change.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BatchChanges {
    pub status: Option<Status>,
    pub connected: Option<Connected>,
    pub tags: Option<Vec<String>>,
}

impl BatchChanges {
    pub fn from_map(updates: &Map<String, Value>) -> Self {
        Self {
            status: updates
                .get("status")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(Status::coerce),
            connected: updates
                .get("connected")
                .filter(|v| !v.is_null())
                .map(Connected::from_value),
            tags: updates.get("tags").filter(|v| !v.is_null()).map(|v| match v {
                Value::Array(_) => tags_from(v),
                _ => Vec::new(),
            }),
        }
    }
}

/// Applies `changes` to every prospect whose id is listed. Moving a prospect
/// into `warming` makes it due today. Returns the number updated.
pub fn batch_update(
    prospects: &mut [Prospect],
    ids: &[String],
    changes: &BatchChanges,
    today: NaiveDate,
) -> usize {
    let mut updated = 0;
    for prospect in prospects.iter_mut().filter(|p| ids.contains(&p.id)) {
        if let Some(status) = changes.status {
            prospect.status = status;
            if status == Status::Warming {
                prospect.next_check_in = today;
            }
        }
        if let Some(connected) = changes.connected {
            prospect.connected = connected;
        }
        if let Some(tags) = &changes.tags {
            prospect.tags = tags.clone();
        }
        updated += 1;
    }
    updated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::today;
    use chrono::Duration;
    use serde_json::json;

    fn patch(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn patch_coerces_and_ignores_unknown_fields() {
        let mut prospect = Prospect::new(today());
        let id_before = prospect.id.clone();

        apply_patch(
            &mut prospect,
            &patch(json!({
                "id": "hijacked",
                "name": "Avery <b>Lee</b>",
                "status": "not-a-status",
                "segment": "demand_gen",
                "tier": "7",
                "icp_score": 42,
                "check_in_days": 90,
                "connected": "true",
                "tags": ["ciso", " fintech "],
                "report_date": "2026-02-03T09:00:00Z",
                "follow_up_due": null
            })),
        )
        .unwrap();

        assert_eq!(prospect.id, id_before);
        assert_eq!(prospect.name, "Avery &lt;b&gt;Lee&lt;/b&gt;");
        assert_eq!(prospect.status, Status::Warming);
        assert_eq!(prospect.segment, Segment::DemandGen);
        assert_eq!(prospect.tier.get(), 2);
        assert_eq!(prospect.icp_score, 10.0);
        assert_eq!(prospect.check_in_days, 30);
        assert_eq!(prospect.connected, Connected::Yes);
        assert_eq!(prospect.tags, vec!["ciso", "fintech"]);
        assert_eq!(prospect.report_date.as_deref(), Some("2026-02-03"));
        assert_eq!(prospect.follow_up_due, None);
    }

    #[test]
    fn invalid_linkedin_url_rejects_without_mutation() {
        let mut prospect = Prospect::new(today());
        let before = prospect.clone();

        let result = apply_patch(
            &mut prospect,
            &patch(json!({ "name": "Changed", "linkedin_url": "https://example.com/in/x" })),
        );

        assert!(matches!(result, Err(TrackerError::InvalidRequest(_))));
        assert_eq!(prospect, before);
    }

    #[test]
    fn unparseable_next_check_in_is_ignored() {
        let mut prospect = Prospect::new(today());
        apply_patch(&mut prospect, &patch(json!({ "next_check_in": "someday" }))).unwrap();
        assert_eq!(prospect.next_check_in, today());
    }

    #[test]
    fn batch_activation_resets_check_in() {
        let today = today();
        let mut a = Prospect::new(today - Duration::days(10));
        a.status = Status::New;
        let mut b = Prospect::new(today - Duration::days(10));
        b.status = Status::New;
        let untouched = Prospect::new(today - Duration::days(10));
        let ids = vec![a.id.clone(), b.id.clone(), "missing".to_string()];
        let mut all = vec![a, b, untouched];

        let changes = BatchChanges::from_map(&patch(json!({
            "status": "warming",
            "connected": false,
            "tags": ["q3"]
        })));
        let updated = batch_update(&mut all, &ids, &changes, today);

        assert_eq!(updated, 2);
        assert!(all[..2].iter().all(|p| p.status == Status::Warming
            && p.next_check_in == today
            && p.connected == Connected::No
            && p.tags == vec!["q3"]));
        assert_eq!(all[2].next_check_in, today - Duration::days(10));
    }
}
