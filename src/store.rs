use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::models::Prospect;

/// Where timestamped copies go and how many are kept per file prefix.
#[derive(Debug, Clone)]
pub struct BackupPolicy {
    pub dir: PathBuf,
    pub keep: usize,
}

/// Backup file names are `<stem>_<stamp>.json` with this stamp.
const BACKUP_STAMP: &str = "%Y-%m-%dT%H-%M-%S-%3fZ";
const BACKUP_STAMP_SHAPE: &str = "0000-00-00T00-00-00-000Z";

/// Records are decoded one by one so a single unreadable entry only costs
/// that entry.
#[derive(Debug, Default, Deserialize)]
struct RawStoreFile {
    #[serde(default)]
    prospects: Vec<Value>,
}

/// JSON-file-backed prospect list for one tool.
///
/// Every save copies the previous file into the backup directory first, then
/// replaces the data file in one rename. There is no locking across
/// processes: two writers racing on the same file is last-write-wins.
#[derive(Debug, Clone)]
pub struct ProspectStore {
    path: PathBuf,
    backups: BackupPolicy,
}

impl ProspectStore {
    pub fn new(path: impl Into<PathBuf>, backups: BackupPolicy) -> Self {
        Self {
            path: path.into(),
            backups,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backups(&self) -> &BackupPolicy {
        &self.backups
    }

    fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Backups currently kept for this file.
    pub fn backup_count(&self) -> usize {
        backup_count(&self.backups.dir, &format!("{}_", self.stem()))
    }

    /// Reads the full list, creating an empty store file on first access.
    ///
    /// A file that is not valid JSON loads as empty, and records that cannot
    /// be decoded are skipped. Either way the file as found is copied to
    /// `<stem>.unreadable-<mtime>.json` in the backup directory first; those
    /// copies are never pruned.
    pub fn load(&self) -> Result<Vec<Prospect>, StoreError> {
        if !self.path.exists() {
            write_json_atomic(&self.path, &StoreFileRef { prospects: &[] })?;
            debug!(path = %self.path.display(), "created empty prospect store");
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path).map_err(|source| StoreError::Read {
            path: self.path.clone(),
            source,
        })?;
        let raw: RawStoreFile = match serde_json::from_str(&content) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "failed to parse prospect store, loading as empty");
                self.keep_unreadable_copy();
                return Ok(Vec::new());
            }
        };

        let total = raw.prospects.len();
        let mut prospects = Vec::with_capacity(total);
        for (index, record) in raw.prospects.into_iter().enumerate() {
            match serde_json::from_value::<Prospect>(record) {
                Ok(prospect) => prospects.push(prospect),
                Err(err) => {
                    warn!(path = %self.path.display(), index, error = %err, "skipping unreadable prospect record")
                }
            }
        }
        if prospects.len() < total {
            self.keep_unreadable_copy();
        }
        Ok(prospects)
    }

    fn keep_unreadable_copy(&self) {
        let modified = fs::metadata(&self.path)
            .and_then(|m| m.modified())
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());
        let target = self.backups.dir.join(format!(
            "{}.unreadable-{}.json",
            self.stem(),
            modified.format(BACKUP_STAMP)
        ));
        if target.exists() {
            return;
        }

        match fs::create_dir_all(&self.backups.dir).and_then(|_| fs::copy(&self.path, &target)) {
            Ok(_) => warn!(copy = %target.display(), "kept a copy of the unreadable prospect store"),
            Err(err) => warn!(path = %self.path.display(), error = %err, "failed to copy unreadable prospect store"),
        }
    }

    pub fn save(&self, prospects: &[Prospect]) -> Result<(), StoreError> {
        backup_file(&self.path, &self.backups);
        write_json_atomic(&self.path, &StoreFileRef { prospects })
    }
}

#[derive(Serialize)]
struct StoreFileRef<'a> {
    prospects: &'a [Prospect],
}

/// Reads and decodes `path`, falling back to `T::default()` when the file is
/// missing or does not parse.
pub fn read_json_or_default<T>(path: &Path) -> Result<T, StoreError>
where
    T: DeserializeOwned + Default,
{
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(T::default()),
        Err(source) => {
            return Err(StoreError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    match serde_json::from_str(&content) {
        Ok(value) => Ok(value),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "failed to parse data file, using empty default");
            Ok(T::default())
        }
    }
}

/// Pretty-prints `value` to a sibling temp file and renames it over `path`.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    let write_err = |source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }

    let body = serde_json::to_string_pretty(value)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, body).map_err(write_err)?;
    fs::rename(&tmp, path).map_err(write_err)?;
    Ok(())
}

/// Copies `path` into the backup directory as `<stem>_<timestamp>.json` and
/// prunes that prefix down to `policy.keep` files. Failures are logged only.
pub fn backup_file(path: &Path, policy: &BackupPolicy) -> Option<PathBuf> {
    if !path.exists() {
        return None;
    }

    let stem = path.file_stem()?.to_string_lossy().to_string();
    let prefix = format!("{stem}_");
    let timestamp = Utc::now().format(BACKUP_STAMP);
    let target = policy.dir.join(format!("{prefix}{timestamp}.json"));

    let copied = fs::create_dir_all(&policy.dir).and_then(|_| fs::copy(path, &target));
    if let Err(err) = copied {
        warn!(path = %path.display(), error = %err, "backup failed");
        return None;
    }

    if let Err(err) = prune_backups(&policy.dir, &prefix, policy.keep) {
        warn!(dir = %policy.dir.display(), error = %err, "failed to prune backups");
    }

    Some(target)
}

/// True only for `<prefix><stamp>.json`, so `team_` never claims the
/// backups of `team_2-prospects.json`.
fn is_backup_of(name: &str, prefix: &str) -> bool {
    let Some(stamp) = name
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_suffix(".json"))
    else {
        return false;
    };
    stamp.len() == BACKUP_STAMP_SHAPE.len()
        && stamp
            .bytes()
            .zip(BACKUP_STAMP_SHAPE.bytes())
            .all(|(c, shape)| if shape == b'0' { c.is_ascii_digit() } else { c == shape })
}

fn backup_names(dir: &Path, prefix: &str) -> std::io::Result<Vec<String>> {
    Ok(fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .filter(|name| is_backup_of(name, prefix))
        .collect())
}

/// Deletes the oldest backups of `prefix` until at most `keep` remain.
/// Timestamped names sort chronologically.
pub fn prune_backups(dir: &Path, prefix: &str, keep: usize) -> std::io::Result<usize> {
    let mut names = backup_names(dir, prefix)?;

    if names.len() <= keep {
        return Ok(0);
    }

    names.sort();
    let excess = names.len() - keep;
    for name in names.iter().take(excess) {
        fs::remove_file(dir.join(name))?;
    }
    Ok(excess)
}

pub fn backup_count(dir: &Path, prefix: &str) -> usize {
    backup_names(dir, prefix).map(|names| names.len()).unwrap_or(0)
}
