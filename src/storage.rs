use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fnv::FnvHashSet;
use log::{info, warn};
use serde::Serialize;
use serde_json::Value;

use crate::enrich::EnrichedThreadRecord;

/// Create `dir` and its parents if they don't exist yet.
pub fn ensure_dir<P: AsRef<Path>>(dir: P) -> Result<()> {
    let dir = dir.as_ref();
    if dir.as_os_str().is_empty() {
        return Ok(());
    }
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))
}

/// Replace `path` with `contents` without ever leaving a half written file.
///
/// The data goes to a sibling `.tmp` file first, which is then renamed over
/// the target.
pub fn write_atomic<P: AsRef<Path>>(path: P, contents: &[u8]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let mut file =
        File::create(&tmp).with_context(|| format!("Failed to create {}", tmp.display()))?;
    file.write_all(contents)?;
    file.sync_all()?;
    fs::rename(&tmp, path)
        .with_context(|| format!("Failed to move {} to {}", tmp.display(), path.display()))?;
    Ok(())
}

/// Serialize `value` as json indented by four spaces.
///
/// Non ascii characters are written verbatim.
pub fn to_json_pretty<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    Ok(buf)
}

/// Atomically write `value` as pretty json to `path`.
pub fn write_json<P: AsRef<Path>, T: Serialize + ?Sized>(path: P, value: &T) -> Result<()> {
    write_atomic(path, &to_json_pretty(value)?)
}

/// The `(url, title)` identity of an archived entry.
///
/// Entries without a string `url` have no identity and never match a new
/// record.
fn entry_key(entry: &Value) -> Option<(String, Option<String>)> {
    let url = entry.get("url")?.as_str()?;
    let title = entry.get("title").and_then(Value::as_str);
    Some((url.to_string(), title.map(str::to_string)))
}

/// Append the records of `batch` whose `(url, title)` is not yet part of
/// `archive`.
///
/// Existing entries are left as they are, whatever their shape. Returns the
/// number of appended records.
pub fn append_unique<I>(archive: &mut Vec<Value>, batch: I) -> Result<usize>
where
    I: IntoIterator<Item = EnrichedThreadRecord>,
{
    let mut seen: FnvHashSet<(String, Option<String>)> =
        archive.iter().filter_map(entry_key).collect();
    let before = archive.len();
    for record in batch {
        if seen.insert(record.key()) {
            archive.push(serde_json::to_value(&record)?);
        }
    }
    Ok(archive.len() - before)
}

/// The cumulative, deduplicated collection of enriched threads.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ArchiveStore {
    path: PathBuf,
}

impl ArchiveStore {
    pub fn new<T: AsRef<Path>>(path: T) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All archived entries.
    ///
    /// A missing or empty file is an empty archive, so is content that isn't
    /// a json array. Entries are kept verbatim.
    pub fn load(&self) -> Vec<Value> {
        let txt = match fs::read_to_string(&self.path) {
            Ok(txt) => txt,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Vec::new(),
            Err(err) => {
                warn!(
                    "Failed to read archive {}: {}, starting a new one",
                    self.path.display(),
                    err
                );
                return Vec::new();
            }
        };
        if txt.trim().is_empty() {
            return Vec::new();
        }
        match serde_json::from_str(&txt) {
            Ok(Value::Array(entries)) => entries,
            Ok(_) => {
                warn!(
                    "Archive {} is not a json array, starting a new one",
                    self.path.display()
                );
                Vec::new()
            }
            Err(err) => {
                warn!(
                    "Archive {} is not valid json ({}), starting a new one",
                    self.path.display(),
                    err
                );
                Vec::new()
            }
        }
    }

    /// Add the new records of `batch` and persist the archive if anything
    /// changed.
    pub fn append<I>(&self, batch: I) -> Result<usize>
    where
        I: IntoIterator<Item = EnrichedThreadRecord>,
    {
        let mut archive = self.load();
        let added = append_unique(&mut archive, batch)?;
        if added > 0 {
            write_json(&self.path, &archive)?;
            info!("Appended {} new records to {}", added, self.path.display());
        } else {
            info!("No new records for {}", self.path.display());
        }
        Ok(added)
    }
}
