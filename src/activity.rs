use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::store::{read_json_or_default, write_json_atomic};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub date: DateTime<Utc>,
    pub action: String,
    #[serde(default)]
    pub prospect_name: String,
    #[serde(default)]
    pub prospect_id: String,
}

/// Newest-first log of what happened in one tool, capped at `max_entries`.
#[derive(Debug, Clone)]
pub struct ActivityLog {
    path: PathBuf,
    max_entries: usize,
}

impl ActivityLog {
    pub fn new(path: impl Into<PathBuf>, max_entries: usize) -> Self {
        Self {
            path: path.into(),
            max_entries,
        }
    }

    pub fn load(&self) -> Result<Vec<ActivityEntry>, StoreError> {
        read_json_or_default(&self.path)
    }

    pub fn record(&self, action: &str, prospect_name: &str, prospect_id: &str) -> Result<(), StoreError> {
        let mut entries = self.load()?;
        entries.insert(
            0,
            ActivityEntry {
                date: Utc::now(),
                action: action.to_string(),
                prospect_name: prospect_name.to_string(),
                prospect_id: prospect_id.to_string(),
            },
        );
        entries.truncate(self.max_entries);
        write_json_atomic(&self.path, &entries)
    }

    /// The newest `limit` entries (clamped to the cap) and the total logged.
    pub fn recent(&self, limit: usize) -> Result<(Vec<ActivityEntry>, usize), StoreError> {
        let entries = self.load()?;
        let total = entries.len();
        let limit = limit.min(self.max_entries);
        Ok((entries.into_iter().take(limit).collect(), total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_newest_first_and_caps() {
        let dir = tempfile::tempdir().unwrap();
        let log = ActivityLog::new(dir.path().join("b2b-activity.json"), 3);

        for i in 0..5 {
            log.record("Logged comment", &format!("Prospect {i}"), &i.to_string())
                .unwrap();
        }

        let (recent, total) = log.recent(10).unwrap();
        assert_eq!(total, 3);
        assert_eq!(recent[0].prospect_name, "Prospect 4");
        assert_eq!(recent[2].prospect_name, "Prospect 2");

        let (first, _) = log.recent(1).unwrap();
        assert_eq!(first.len(), 1);
    }
}
