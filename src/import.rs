use std::fmt;
use std::path::Path;

use chrono::NaiveDate;
use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{
    clamp_check_in_days, clamp_icp_score, value_as_i64, Connected, Prospect, Segment, Status, Tier,
};
use crate::sanitize::{
    extract_username, is_valid_linkedin_url, is_valid_username, profile_url, sanitize,
};
use crate::update::{split_tags, tags_from};

pub const MAX_URLS: usize = 500;
pub const MAX_ROWS: usize = 1000;

/// Accepts strings, numbers, booleans or lists and yields trimmed text, so
/// the same row type reads CSV files and loosely typed JSON bodies.
fn loose_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct LooseVisitor;

    impl<'de> Visitor<'de> for LooseVisitor {
        type Value = Option<String>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a string, number, boolean or list")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            let v = v.trim();
            Ok((!v.is_empty()).then(|| v.to_string()))
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Self::Value, D::Error> {
            d.deserialize_any(self)
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut parts = Vec::new();
            while let Some(item) = seq.next_element::<Value>()? {
                match item {
                    Value::String(s) => parts.push(s),
                    Value::Null => {}
                    other => parts.push(other.to_string()),
                }
            }
            Ok((!parts.is_empty()).then(|| parts.join(",")))
        }
    }

    deserializer.deserialize_any(LooseVisitor)
}

/// One imported record, from a CSV file or a JSON `rows` array.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImportRow {
    #[serde(default, deserialize_with = "loose_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub linkedin_url: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub company: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub segment: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub tier: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub icp_score: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub tags: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub connected: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub check_in_days: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub warmth_score: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub source: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub batch: Option<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct RowImportSummary {
    pub added: usize,
    pub skipped: usize,
    pub warnings: Vec<String>,
}

pub fn read_csv(path: &Path) -> Result<Vec<ImportRow>, csv::Error> {
    let mut reader = csv::Reader::from_path(path)?;
    reader.deserialize::<ImportRow>().collect()
}

fn parse_int(value: Option<&str>) -> Option<i64> {
    value.and_then(|v| value_as_i64(&Value::String(v.to_string())))
}

fn text(value: Option<&str>) -> String {
    value.map(sanitize).unwrap_or_default()
}

fn has_username(prospects: &[Prospect], username: &str) -> bool {
    prospects.iter().any(|p| {
        p.linkedin_username == username || extract_username(&p.linkedin_url) == username
    })
}

/// Adds each row with a usable, unseen LinkedIn profile. Rows without a
/// profile, or with a profile already in the store, are skipped.
pub fn import_rows(
    prospects: &mut Vec<Prospect>,
    rows: Vec<ImportRow>,
    audience: Segment,
    today: NaiveDate,
) -> RowImportSummary {
    let mut summary = RowImportSummary::default();

    for (i, row) in rows.into_iter().enumerate() {
        let url = row.linkedin_url.as_deref().unwrap_or_default();
        if !url.is_empty() && !is_valid_linkedin_url(url) {
            summary
                .warnings
                .push(format!("Row {}: Non-LinkedIn URL blocked ({})", i + 1, url));
            summary.skipped += 1;
            continue;
        }

        let username = extract_username(url);
        if !is_valid_username(&username) || has_username(prospects, &username) {
            summary.skipped += 1;
            continue;
        }

        let mut prospect = Prospect::new(today);
        prospect.name = text(row.name.as_deref());
        prospect.linkedin_url = profile_url(&username);
        prospect.linkedin_username = username;
        prospect.company = text(row.company.as_deref());
        prospect.title = text(row.title.as_deref());
        prospect.segment = row.segment.as_deref().map(Segment::coerce).unwrap_or(audience);
        prospect.tier = parse_int(row.tier.as_deref()).map(Tier::new).unwrap_or_default();
        prospect.icp_score =
            clamp_icp_score(row.icp_score.as_deref().and_then(|v| v.parse::<f64>().ok()));
        prospect.tags = row.tags.as_deref().map(split_tags).unwrap_or_default();
        prospect.status = row.status.as_deref().map(Status::coerce).unwrap_or_default();
        prospect.connected = Connected::from(matches!(
            row.connected.as_deref(),
            Some("yes") | Some("true")
        ));
        prospect.check_in_days = clamp_check_in_days(parse_int(row.check_in_days.as_deref()));
        prospect.warmth_score = parse_int(row.warmth_score.as_deref())
            .unwrap_or(0)
            .clamp(0, i64::from(u32::MAX)) as u32;
        prospect.notes = text(row.notes.as_deref());
        prospect.source = row
            .source
            .as_deref()
            .map(sanitize)
            .unwrap_or_else(|| "csv_import".to_string());
        prospect.batch = text(row.batch.as_deref());

        prospects.push(prospect);
        summary.added += 1;
    }

    summary
}

/// Body of a bulk profile-URL import.
#[derive(Debug, Clone, Deserialize)]
pub struct UrlImport {
    pub urls: Vec<Value>,
    #[serde(default)]
    pub segment: Option<Value>,
    #[serde(default)]
    pub tier: Option<Value>,
    #[serde(default)]
    pub tags: Option<Value>,
    #[serde(default)]
    pub check_in_days: Option<Value>,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlImportSummary {
    pub added: usize,
    pub skipped: usize,
    pub skipped_urls: Vec<String>,
}

pub fn import_urls(
    prospects: &mut Vec<Prospect>,
    request: &UrlImport,
    audience: Segment,
    today: NaiveDate,
) -> UrlImportSummary {
    let mut skipped_urls = Vec::new();
    let mut added = 0;

    let segment = match &request.segment {
        Some(Value::String(s)) => Segment::coerce(s),
        Some(_) => Segment::default(),
        None => audience,
    };
    let tier = request.tier.as_ref().map(Tier::from_value).unwrap_or_default();
    let tags = request.tags.as_ref().map(tags_from).unwrap_or_default();
    let check_in_days = clamp_check_in_days(request.check_in_days.as_ref().and_then(value_as_i64));

    for raw in &request.urls {
        let url = raw.as_str().unwrap_or_default().trim();
        if url.is_empty() {
            continue;
        }

        if !is_valid_linkedin_url(url) {
            skipped_urls.push(format!("{url} (not a LinkedIn URL, blocked)"));
            continue;
        }
        if !url.contains("linkedin.com/in/") {
            skipped_urls.push(format!("{url} (not a profile URL)"));
            continue;
        }

        let username = extract_username(url);
        if username.is_empty() {
            skipped_urls.push(format!("{url} (could not extract username)"));
            continue;
        }
        if !is_valid_username(&username) {
            skipped_urls.push(format!("{url} (invalid username characters)"));
            continue;
        }
        if has_username(prospects, &username) {
            skipped_urls.push(format!("{url} (duplicate)"));
            continue;
        }

        let mut prospect = Prospect::new(today);
        prospect.linkedin_url = profile_url(&username);
        prospect.linkedin_username = username;
        prospect.segment = segment;
        prospect.tier = tier;
        prospect.tags = tags.clone();
        prospect.check_in_days = check_in_days;
        prospect.source = "sales_nav".to_string();

        prospects.push(prospect);
        added += 1;
    }

    UrlImportSummary {
        added,
        skipped: skipped_urls.len(),
        skipped_urls,
    }
}

/// A hand-entered prospect from the dashboard's add form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ManualEntry {
    #[serde(default, deserialize_with = "loose_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub company: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub linkedin_url: Option<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct AddSummary {
    pub added: usize,
    pub skipped: usize,
    #[serde(skip)]
    pub added_ids: Vec<String>,
}

/// Adds named entries, skipping blanks and any name+company pair already
/// present (case-insensitive).
pub fn add_manual(
    prospects: &mut Vec<Prospect>,
    entries: Vec<ManualEntry>,
    audience: Segment,
    today: NaiveDate,
) -> AddSummary {
    let key = |name: &str, company: &str| format!("{name}{company}").to_lowercase();
    let mut seen: Vec<String> = prospects.iter().map(|p| key(&p.name, &p.company)).collect();
    let mut summary = AddSummary::default();

    for entry in entries {
        let name = sanitize(entry.name.as_deref().unwrap_or_default());
        let company = sanitize(entry.company.as_deref().unwrap_or_default());
        let url = entry.linkedin_url.as_deref().unwrap_or_default();
        let entry_key = key(&name, &company);

        if name.is_empty() || seen.contains(&entry_key) || !is_valid_linkedin_url(url) {
            summary.skipped += 1;
            continue;
        }

        let mut prospect = Prospect::new(today);
        prospect.name = name;
        prospect.company = company;
        prospect.title = text(entry.title.as_deref());
        prospect.segment = audience;
        prospect.source = "manual".to_string();
        let username = extract_username(url);
        if is_valid_username(&username) {
            prospect.linkedin_url = profile_url(&username);
            prospect.linkedin_username = username;
        }

        seen.push(entry_key);
        summary.added_ids.push(prospect.id.clone());
        prospects.push(prospect);
        summary.added += 1;
    }

    summary
}
