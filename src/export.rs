use std::path::Path;

use chrono::NaiveDate;

use crate::models::{Connected, Prospect};

pub const EXPORT_HEADERS: [&str; 26] = [
    "name",
    "linkedin_url",
    "company",
    "title",
    "segment",
    "tier",
    "icp_score",
    "status",
    "connected",
    "warmth_score",
    "check_in_days",
    "next_check_in",
    "last_engagement_date",
    "engagements_count",
    "notes",
    "source",
    "tags",
    "batch",
    "created_at",
    "sequence_type",
    "sequence_step",
    "sequence_status",
    "follow_up_due",
    "follow_up_count",
    "report_generated",
    "report_date",
];

fn date(value: Option<NaiveDate>) -> String {
    value.map(|d| d.to_string()).unwrap_or_default()
}

fn yes_no(value: bool) -> String {
    if value { "yes" } else { "no" }.to_string()
}

fn column(prospect: &Prospect, header: &str) -> String {
    match header {
        "name" => prospect.name.clone(),
        "linkedin_url" => prospect.linkedin_url.clone(),
        "company" => prospect.company.clone(),
        "title" => prospect.title.clone(),
        "segment" => prospect.segment.to_string(),
        "tier" => prospect.tier.to_string(),
        "icp_score" => prospect.icp_score.to_string(),
        "status" => prospect.status.to_string(),
        "connected" => yes_no(prospect.connected == Connected::Yes),
        "warmth_score" => prospect.warmth_score.to_string(),
        "check_in_days" => prospect.check_in_days.to_string(),
        "next_check_in" => prospect.next_check_in.to_string(),
        "last_engagement_date" => date(prospect.last_engagement_date),
        "engagements_count" => prospect.engagements.len().to_string(),
        "notes" => prospect.notes.clone(),
        "source" => prospect.source.clone(),
        "tags" => prospect.tags.join(";"),
        "batch" => prospect.batch.clone(),
        "created_at" => prospect.created_at.to_string(),
        "sequence_type" => prospect
            .sequence_type
            .map(|t| t.as_str().to_string())
            .unwrap_or_default(),
        "sequence_step" => prospect.sequence_step.to_string(),
        "sequence_status" => prospect.sequence_status.as_str().to_string(),
        "follow_up_due" => date(prospect.follow_up_due),
        "follow_up_count" => prospect.follow_up_count.to_string(),
        "report_generated" => yes_no(prospect.report_generated),
        "report_date" => prospect.report_date.clone().unwrap_or_default(),
        _ => String::new(),
    }
}

fn write_csv<W: std::io::Write>(writer: W, prospects: &[Prospect]) -> Result<(), csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(writer);
    writer.write_record(EXPORT_HEADERS)?;
    for prospect in prospects {
        writer.write_record(EXPORT_HEADERS.iter().map(|h| column(prospect, h)))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn to_csv_string(prospects: &[Prospect]) -> Result<String, csv::Error> {
    let mut buffer = Vec::new();
    write_csv(&mut buffer, prospects)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

pub fn write_csv_file(path: &Path, prospects: &[Prospect]) -> Result<(), csv::Error> {
    let file = std::fs::File::create(path)?;
    write_csv(file, prospects)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::{import_rows, ImportRow};
    use crate::models::{today, Segment, Status, Tier};

    fn sample() -> Prospect {
        let mut prospect = Prospect::new(today());
        prospect.name = "Lee, Avery \"AJ\"".to_string();
        prospect.linkedin_url = "https://www.linkedin.com/in/avery-lee".to_string();
        prospect.linkedin_username = "avery-lee".to_string();
        prospect.tags = vec!["ciso".to_string(), "fintech".to_string()];
        prospect.status = Status::Warm;
        prospect.tier = Tier::new(1);
        prospect.segment = Segment::AiMl;
        prospect
    }

    #[test]
    fn csv_has_fixed_header_and_quoted_values() {
        let csv = to_csv_string(&[sample()]).unwrap();
        let mut lines = csv.lines();

        let header = lines.next().unwrap();
        assert!(header.starts_with("\"name\",\"linkedin_url\",\"company\""));
        assert_eq!(header.split(',').count(), EXPORT_HEADERS.len());

        let row = lines.next().unwrap();
        assert!(row.starts_with("\"Lee, Avery \"\"AJ\"\"\""));
        assert!(row.contains("\"ciso;fintech\""));
        assert!(row.contains("\"no\""));
    }

    #[test]
    fn exported_csv_reimports() {
        let csv = to_csv_string(&[sample()]).unwrap();
        let mut reader = csv::Reader::from_reader(csv.as_bytes());
        let rows: Vec<ImportRow> = reader.deserialize().collect::<Result<_, _>>().unwrap();

        let mut prospects = Vec::new();
        let summary = import_rows(&mut prospects, rows, Segment::Cyber, today());
        assert_eq!(summary.added, 1);
        assert_eq!(prospects[0].status, Status::Warm);
        assert_eq!(prospects[0].segment, Segment::AiMl);
        assert_eq!(prospects[0].tags, vec!["ciso", "fintech"]);
    }
}
