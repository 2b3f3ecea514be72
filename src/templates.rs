use std::collections::BTreeMap;
use std::path::PathBuf;

use serde_json::Value;

use crate::error::StoreError;
use crate::store::{backup_file, read_json_or_default, write_json_atomic, BackupPolicy};

pub const MAX_TEMPLATE_CHARS: usize = 1000;

/// Sequence type → step → message text.
pub type Templates = BTreeMap<String, BTreeMap<String, String>>;

/// Outreach message templates for one tool, kept beside its prospect file.
#[derive(Debug, Clone)]
pub struct TemplateStore {
    path: PathBuf,
    backups: BackupPolicy,
}

impl TemplateStore {
    pub fn new(path: impl Into<PathBuf>, backups: BackupPolicy) -> Self {
        Self {
            path: path.into(),
            backups,
        }
    }

    pub fn load(&self) -> Result<Templates, StoreError> {
        read_json_or_default(&self.path)
    }

    pub fn save(&self, templates: &Templates) -> Result<(), StoreError> {
        backup_file(&self.path, &self.backups);
        write_json_atomic(&self.path, templates)
    }
}

/// Keeps only `{ sequence: { step: text } }` shaped entries, truncating each
/// text. Returns `None` when the body is not an object at all.
pub fn clean_templates(body: &Value) -> Option<Templates> {
    let sequences = body.as_object()?;
    let mut clean = Templates::new();

    for (sequence, steps) in sequences {
        let Some(steps) = steps.as_object() else {
            continue;
        };
        let cleaned: BTreeMap<String, String> = steps
            .iter()
            .filter_map(|(step, text)| {
                text.as_str()
                    .map(|t| (step.clone(), t.chars().take(MAX_TEMPLATE_CHARS).collect()))
            })
            .collect();
        clean.insert(sequence.clone(), cleaned);
    }

    Some(clean)
}
