use std::fmt;

use chrono::{NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use uuid::Uuid;

pub const DEFAULT_CHECK_IN_DAYS: u32 = 3;

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Lenient `YYYY-MM-DD` parse; anything after the date part is ignored.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    let head = value.get(..10).unwrap_or(value);
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

pub fn clamp_check_in_days(value: Option<i64>) -> u32 {
    match value {
        None | Some(0) => DEFAULT_CHECK_IN_DAYS,
        Some(days) => days.clamp(1, 30) as u32,
    }
}

pub fn clamp_icp_score(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0).clamp(0.0, 10.0)
}

/// Integer view of a JSON value that may arrive as a number or a numeric string.
pub fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f.trunc() as i64),
        _ => None,
    }
}

pub fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Pipeline position of a prospect. Unknown values coerce to `Warming`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum Status {
    New,
    Warming,
    Warm,
    OutreachSent,
    Replied,
    CallBooked,
    Won,
    Lost,
    Skip,
    Dead,
    Cold,
}

impl Status {
    pub const ALL: [Status; 11] = [
        Status::New,
        Status::Warming,
        Status::Warm,
        Status::OutreachSent,
        Status::Replied,
        Status::CallBooked,
        Status::Won,
        Status::Lost,
        Status::Skip,
        Status::Dead,
        Status::Cold,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::New => "new",
            Status::Warming => "warming",
            Status::Warm => "warm",
            Status::OutreachSent => "outreach_sent",
            Status::Replied => "replied",
            Status::CallBooked => "call_booked",
            Status::Won => "won",
            Status::Lost => "lost",
            Status::Skip => "skip",
            Status::Dead => "dead",
            Status::Cold => "cold",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == value.trim())
    }

    pub fn coerce(value: &str) -> Self {
        Self::parse(value).unwrap_or_default()
    }
}

impl Default for Status {
    fn default() -> Self {
        Status::Warming
    }
}

impl From<String> for Status {
    fn from(value: String) -> Self {
        Status::coerce(&value)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audience segment a prospect belongs to. Unknown values coerce to `Cyber`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum Segment {
    Cyber,
    AiMl,
    ReferralPartner,
    WarmPriority,
    WarmNetwork,
    CyberCmo,
    DemandGen,
    PodcastTarget,
    AiMlLeader,
}

impl Segment {
    pub const ALL: [Segment; 9] = [
        Segment::Cyber,
        Segment::AiMl,
        Segment::ReferralPartner,
        Segment::WarmPriority,
        Segment::WarmNetwork,
        Segment::CyberCmo,
        Segment::DemandGen,
        Segment::PodcastTarget,
        Segment::AiMlLeader,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Segment::Cyber => "cyber",
            Segment::AiMl => "ai_ml",
            Segment::ReferralPartner => "referral_partner",
            Segment::WarmPriority => "warm_priority",
            Segment::WarmNetwork => "warm_network",
            Segment::CyberCmo => "cyber_cmo",
            Segment::DemandGen => "demand_gen",
            Segment::PodcastTarget => "podcast_target",
            Segment::AiMlLeader => "ai_ml_leader",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == value.trim())
    }

    pub fn coerce(value: &str) -> Self {
        Self::parse(value).unwrap_or_default()
    }
}

impl Default for Segment {
    fn default() -> Self {
        Segment::Cyber
    }
}

impl From<String> for Segment {
    fn from(value: String) -> Self {
        Segment::coerce(&value)
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of touch logged against a prospect. Unlike the other enums this one
/// is strict: unknown values are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngagementType {
    Comment,
    Dm,
    FollowUp,
    ReplyReceived,
    ConnectionRequest,
}

impl EngagementType {
    pub const ALL: [EngagementType; 5] = [
        EngagementType::Comment,
        EngagementType::Dm,
        EngagementType::FollowUp,
        EngagementType::ReplyReceived,
        EngagementType::ConnectionRequest,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EngagementType::Comment => "comment",
            EngagementType::Dm => "dm",
            EngagementType::FollowUp => "follow_up",
            EngagementType::ReplyReceived => "reply_received",
            EngagementType::ConnectionRequest => "connection_request",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == value.trim())
    }

    pub fn allowed_list() -> String {
        Self::ALL
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for EngagementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceType {
    ConnectedIcp,
    NotConnected,
    ReferralPartner,
    PodcastGuest,
}

impl SequenceType {
    pub const ALL: [SequenceType; 4] = [
        SequenceType::ConnectedIcp,
        SequenceType::NotConnected,
        SequenceType::ReferralPartner,
        SequenceType::PodcastGuest,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SequenceType::ConnectedIcp => "connected_icp",
            SequenceType::NotConnected => "not_connected",
            SequenceType::ReferralPartner => "referral_partner",
            SequenceType::PodcastGuest => "podcast_guest",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == value.trim())
    }
}

/// Stored `sequence_type` values outside the known set read back as `None`.
fn lenient_sequence_type<'de, D>(deserializer: D) -> Result<Option<SequenceType>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_str().and_then(SequenceType::parse))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum SequenceStatus {
    #[serde(rename = "none")]
    NotStarted,
    ConnectionPending,
    Active,
    Exhausted,
    Replied,
}

impl SequenceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SequenceStatus::NotStarted => "none",
            SequenceStatus::ConnectionPending => "connection_pending",
            SequenceStatus::Active => "active",
            SequenceStatus::Exhausted => "exhausted",
            SequenceStatus::Replied => "replied",
        }
    }

    pub fn coerce(value: &str) -> Self {
        match value.trim() {
            "connection_pending" => SequenceStatus::ConnectionPending,
            "active" => SequenceStatus::Active,
            "exhausted" => SequenceStatus::Exhausted,
            "replied" => SequenceStatus::Replied,
            _ => SequenceStatus::NotStarted,
        }
    }
}

impl Default for SequenceStatus {
    fn default() -> Self {
        SequenceStatus::NotStarted
    }
}

impl From<String> for SequenceStatus {
    fn from(value: String) -> Self {
        SequenceStatus::coerce(&value)
    }
}

/// Whether we are a first-degree connection. Serialized as `true`, `false`
/// or the string `"unknown"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connected {
    Yes,
    No,
    #[default]
    Unknown,
}

impl Connected {
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Bool(true) => Connected::Yes,
            Value::Bool(false) => Connected::No,
            Value::String(s) if s == "true" => Connected::Yes,
            Value::String(s) if s == "false" => Connected::No,
            _ => Connected::Unknown,
        }
    }

    pub fn is_yes(self) -> bool {
        self == Connected::Yes
    }
}

impl From<bool> for Connected {
    fn from(value: bool) -> Self {
        if value {
            Connected::Yes
        } else {
            Connected::No
        }
    }
}

impl Serialize for Connected {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Connected::Yes => serializer.serialize_bool(true),
            Connected::No => serializer.serialize_bool(false),
            Connected::Unknown => serializer.serialize_str("unknown"),
        }
    }
}

impl<'de> Deserialize<'de> for Connected {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Connected::from_value(&value))
    }
}

/// Priority tier, 1 (highest) to 3. Out-of-range input coerces to 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Tier(u8);

impl Tier {
    pub fn new(value: i64) -> Self {
        match value {
            1..=3 => Tier(value as u8),
            _ => Tier::default(),
        }
    }

    pub fn from_value(value: &Value) -> Self {
        value_as_i64(value).map(Tier::new).unwrap_or_default()
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for Tier {
    fn default() -> Self {
        Tier(2)
    }
}

impl<'de> Deserialize<'de> for Tier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Tier::from_value(&value))
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Engagement {
    #[serde(rename = "type")]
    pub kind: EngagementType,
    pub date: NaiveDate,
    #[serde(default, deserialize_with = "lenient_text")]
    pub note: String,
}

/// A stored prospect. Every field decodes leniently so one odd value (a
/// `null` status, an empty date, a numeric string) never makes the record
/// unreadable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prospect {
    #[serde(default = "new_id", deserialize_with = "lenient_id")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub linkedin_url: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub linkedin_username: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub company: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub title: String,
    #[serde(default, deserialize_with = "or_default")]
    pub segment: Segment,
    #[serde(default)]
    pub tier: Tier,
    #[serde(default, deserialize_with = "lenient_score")]
    pub icp_score: f64,
    #[serde(default, deserialize_with = "lenient_tags")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "or_default")]
    pub status: Status,
    #[serde(default)]
    pub connected: Connected,
    #[serde(default = "default_check_in_days", deserialize_with = "lenient_check_in_days")]
    pub check_in_days: u32,
    #[serde(default, deserialize_with = "lenient_count")]
    pub warmth_score: u32,
    #[serde(default, deserialize_with = "lenient_engagements")]
    pub engagements: Vec<Engagement>,
    #[serde(default = "today", deserialize_with = "date_or_today")]
    pub next_check_in: NaiveDate,
    #[serde(default, deserialize_with = "lenient_text")]
    pub notes: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub source: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub batch: String,
    #[serde(default = "today", deserialize_with = "date_or_today")]
    pub created_at: NaiveDate,
    #[serde(default, deserialize_with = "lenient_optional_text")]
    pub last_action: Option<String>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub last_action_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub last_engagement_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient_sequence_type")]
    pub sequence_type: Option<SequenceType>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub sequence_step: u32,
    #[serde(default, deserialize_with = "lenient_date")]
    pub sequence_started: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub follow_up_due: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub follow_up_count: u32,
    #[serde(default, deserialize_with = "or_default")]
    pub sequence_status: SequenceStatus,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub report_generated: bool,
    #[serde(default, deserialize_with = "lenient_optional_text")]
    pub report_date: Option<String>,
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Falls back to `T::default()` when the stored value has the wrong shape.
fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(value_as_text(&value).unwrap_or_default())
}

fn lenient_optional_text<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(value_as_text(&value).filter(|s| !s.is_empty()))
}

fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(value_as_text(&value)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(new_id))
}

fn lenient_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(value_as_i64(&value)
        .map(|n| n.clamp(0, i64::from(u32::MAX)) as u32)
        .unwrap_or(0))
}

fn lenient_check_in_days<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(clamp_check_in_days(value_as_i64(&value)))
}

fn lenient_score<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(clamp_icp_score(value_as_f64(&value)))
}

fn lenient_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Bool(b) => b,
        Value::String(s) => matches!(s.trim(), "true" | "yes"),
        _ => false,
    })
}

/// `""`, `null` and unparseable dates read as `None`.
fn lenient_date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDate>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_str().and_then(parse_date))
}

fn date_or_today<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
    Ok(lenient_date(deserializer)?.unwrap_or_else(today))
}

/// Accepts an array of strings or a single `,`/`;` separated string.
fn lenient_tags<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    let tags: Vec<String> = match value {
        Value::Array(items) => items.iter().filter_map(value_as_text).collect(),
        Value::String(s) => s.split([',', ';']).map(|t| t.trim().to_string()).collect(),
        _ => Vec::new(),
    };
    Ok(tags.into_iter().filter(|t| !t.is_empty()).collect())
}

/// Engagements with an unknown type or a missing date are dropped; the rest
/// of the history is kept.
fn lenient_engagements<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<Engagement>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    let Value::Array(items) = value else {
        return Ok(Vec::new());
    };
    let total = items.len();
    let engagements: Vec<Engagement> = items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect();
    if engagements.len() < total {
        tracing::warn!(
            dropped = total - engagements.len(),
            "dropped unreadable engagement entries"
        );
    }
    Ok(engagements)
}

fn default_check_in_days() -> u32 {
    DEFAULT_CHECK_IN_DAYS
}

impl Prospect {
    /// A fresh `warming` prospect with a new v4 id, due for a check-in today.
    pub fn new(today: NaiveDate) -> Self {
        Self {
            id: new_id(),
            name: String::new(),
            linkedin_url: String::new(),
            linkedin_username: String::new(),
            company: String::new(),
            title: String::new(),
            segment: Segment::default(),
            tier: Tier::default(),
            icp_score: 0.0,
            tags: Vec::new(),
            status: Status::Warming,
            connected: Connected::No,
            check_in_days: DEFAULT_CHECK_IN_DAYS,
            warmth_score: 0,
            engagements: Vec::new(),
            next_check_in: today,
            notes: String::new(),
            source: String::new(),
            batch: String::new(),
            created_at: today,
            last_action: None,
            last_action_date: None,
            last_engagement_date: None,
            sequence_type: None,
            sequence_step: 0,
            sequence_started: None,
            follow_up_due: None,
            follow_up_count: 0,
            sequence_status: SequenceStatus::NotStarted,
            report_generated: false,
            report_date: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_enum_values_coerce_to_defaults() {
        let prospect: Prospect = serde_json::from_value(json!({
            "id": "p-1",
            "status": "exploded",
            "segment": "martians",
            "tier": 9,
            "sequence_status": "whatever",
            "sequence_type": "carrier_pigeon"
        }))
        .unwrap();

        assert_eq!(prospect.status, Status::Warming);
        assert_eq!(prospect.segment, Segment::Cyber);
        assert_eq!(prospect.tier.get(), 2);
        assert_eq!(prospect.sequence_status, SequenceStatus::NotStarted);
        assert_eq!(prospect.sequence_type, None);
        assert_eq!(prospect.check_in_days, DEFAULT_CHECK_IN_DAYS);
    }

    #[test]
    fn odd_field_values_fall_back_per_field() {
        let prospect: Prospect = serde_json::from_value(json!({
            "id": 17,
            "name": "Jules Moreno",
            "status": null,
            "segment": 4,
            "follow_up_due": "",
            "next_check_in": null,
            "last_engagement_date": "2026-02-03T09:00:00Z",
            "warmth_score": "3",
            "check_in_days": "45",
            "icp_score": "7.5",
            "tags": "ciso; fintech",
            "report_generated": "yes",
            "report_date": 20260203,
            "engagements": [
                { "type": "wave", "date": "2026-02-01" },
                { "type": "dm", "date": "2026-02-02", "note": null },
                { "type": "comment" }
            ]
        }))
        .unwrap();

        assert_eq!(prospect.id, "17");
        assert_eq!(prospect.status, Status::Warming);
        assert_eq!(prospect.segment, Segment::Cyber);
        assert_eq!(prospect.follow_up_due, None);
        assert_eq!(prospect.next_check_in, today());
        assert_eq!(prospect.last_engagement_date, NaiveDate::from_ymd_opt(2026, 2, 3));
        assert_eq!(prospect.warmth_score, 3);
        assert_eq!(prospect.check_in_days, 30);
        assert_eq!(prospect.icp_score, 7.5);
        assert_eq!(prospect.tags, vec!["ciso", "fintech"]);
        assert!(prospect.report_generated);
        assert_eq!(prospect.report_date.as_deref(), Some("20260203"));
        assert_eq!(prospect.engagements.len(), 1);
        assert_eq!(prospect.engagements[0].kind, EngagementType::Dm);

        let without_id: Prospect = serde_json::from_value(json!({ "name": "No Id" })).unwrap();
        assert!(!without_id.id.is_empty());
    }

    #[test]
    fn enums_serialize_as_snake_case() {
        let mut prospect = Prospect::new(today());
        prospect.status = Status::OutreachSent;
        prospect.segment = Segment::AiMlLeader;
        prospect.sequence_status = SequenceStatus::ConnectionPending;
        prospect.sequence_type = Some(SequenceType::ConnectedIcp);

        let value = serde_json::to_value(&prospect).unwrap();
        assert_eq!(value["status"], "outreach_sent");
        assert_eq!(value["segment"], "ai_ml_leader");
        assert_eq!(value["sequence_status"], "connection_pending");
        assert_eq!(value["sequence_type"], "connected_icp");
        assert_eq!(value["connected"], false);
    }

    #[test]
    fn connected_is_tri_state() {
        assert_eq!(Connected::from_value(&json!(true)), Connected::Yes);
        assert_eq!(Connected::from_value(&json!("false")), Connected::No);
        assert_eq!(Connected::from_value(&json!("maybe")), Connected::Unknown);
        assert_eq!(serde_json::to_value(Connected::Unknown).unwrap(), json!("unknown"));

        let parsed: Connected = serde_json::from_value(json!("unknown")).unwrap();
        assert_eq!(parsed, Connected::Unknown);
    }

    #[test]
    fn sequence_status_none_round_trips() {
        let value = serde_json::to_value(SequenceStatus::NotStarted).unwrap();
        assert_eq!(value, json!("none"));
        let parsed: SequenceStatus = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, SequenceStatus::NotStarted);
    }

    #[test]
    fn engagement_type_parse_is_strict() {
        assert_eq!(EngagementType::parse("dm"), Some(EngagementType::Dm));
        assert_eq!(EngagementType::parse("poke"), None);
        assert!(serde_json::from_value::<EngagementType>(json!("poke")).is_err());
    }

    #[test]
    fn clamps_check_in_and_icp_bounds() {
        assert_eq!(clamp_check_in_days(Some(0)), 3);
        assert_eq!(clamp_check_in_days(Some(45)), 30);
        assert_eq!(clamp_check_in_days(None), 3);
        assert_eq!(clamp_icp_score(Some(12.5)), 10.0);
        assert_eq!(clamp_icp_score(Some(-1.0)), 0.0);
        assert_eq!(Tier::from_value(&json!("1")), Tier::new(1));
    }

    #[test]
    fn parse_date_ignores_time_suffix() {
        assert_eq!(
            parse_date("2026-03-04T10:00:00Z"),
            NaiveDate::from_ymd_opt(2026, 3, 4)
        );
        assert_eq!(parse_date("soon"), None);
    }
}
