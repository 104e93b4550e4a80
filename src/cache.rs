//! On-disk dataset cache.
//!
//! One JSON file per dataset label inside a single directory. `put` replaces
//! the whole entry, `get` returns the latest one. There is no eviction and no
//! expiry: the newest write wins.

use crate::data::{Dataset, DatasetKind};
use crate::error::CacheError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// A stored dataset and when it was written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub label: String,
    pub payload: Dataset,
    /// Milliseconds since the Unix epoch
    pub timestamp: u64,
}

/// Borrowed view of a [`CacheEntry`] for writing without copying the payload
#[derive(Serialize)]
struct EntryRef<'a> {
    label: &'a str,
    payload: &'a Dataset,
    timestamp: u64,
}

/// Handle on the cache directory. Cheap to clone; every call hits the disk.
#[derive(Debug, Clone)]
pub struct LocalCache {
    dir: PathBuf,
}

impl LocalCache {
    /// Open the cache, creating its directory on first use
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        debug!(dir = %dir.display(), "cache opened");
        Ok(Self { dir })
    }

    fn entry_path(&self, kind: DatasetKind) -> PathBuf {
        self.dir.join(format!("{}.json", kind.label()))
    }

    /// Store `payload` under the kind's label, replacing any previous entry.
    /// Returns the timestamp written.
    pub fn put(&self, kind: DatasetKind, payload: &Dataset) -> Result<u64, CacheError> {
        let entry = EntryRef {
            label: kind.label(),
            payload,
            timestamp: now_millis(),
        };

        // Write beside the target and rename so readers never see half an entry
        let path = self.entry_path(kind);
        let tmp = path.with_extension("json.tmp");
        {
            let mut writer = BufWriter::new(fs::File::create(&tmp)?);
            serde_json::to_writer(&mut writer, &entry)?;
            writer.flush()?;
        }
        fs::rename(&tmp, &path)?;

        debug!(label = kind.label(), elements = payload.len(), "cache entry written");
        Ok(entry.timestamp)
    }

    /// Latest entry for the kind, or `None` if nothing was ever stored
    pub fn get(&self, kind: DatasetKind) -> Result<Option<CacheEntry>, CacheError> {
        let path = self.entry_path(kind);
        let file = match fs::File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let entry = serde_json::from_reader(BufReader::new(file))?;
        Ok(Some(entry))
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Element, Node, Tags};
    use std::time::Duration;

    fn sample() -> Dataset {
        Dataset {
            elements: vec![Element {
                geometry: vec![Node { lat: 48.84, lon: 2.37 }, Node { lat: 45.76, lon: 4.86 }],
                tags: Tags {
                    name: Some("LGV Sud-Est".into()),
                    reference: None,
                },
            }],
        }
    }

    #[test]
    fn test_get_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LocalCache::open(dir.path()).unwrap();
        assert!(cache.get(DatasetKind::Lgv).unwrap().is_none());
    }

    #[test]
    fn test_open_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        LocalCache::open(&nested).unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn test_put_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LocalCache::open(dir.path()).unwrap();
        let written = cache.put(DatasetKind::Tunnels, &sample()).unwrap();

        let read = cache.get(DatasetKind::Tunnels).unwrap().unwrap();
        assert_eq!(read.timestamp, written);
        assert_eq!(read.payload, sample());
        assert_eq!(read.label, "tunnels");
        assert!(cache.get(DatasetKind::Lgv).unwrap().is_none());
    }

    #[test]
    fn test_identical_put_only_advances_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LocalCache::open(dir.path()).unwrap();

        let first = cache.put(DatasetKind::Lgv, &sample()).unwrap();
        std::thread::sleep(Duration::from_millis(5));
        let second = cache.put(DatasetKind::Lgv, &sample()).unwrap();

        let stored = cache.get(DatasetKind::Lgv).unwrap().unwrap();
        assert_eq!(stored.payload, sample());
        assert!(second > first);
        assert_eq!(stored.timestamp, second);
    }

    #[test]
    fn test_put_replaces_previous_entry() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LocalCache::open(dir.path()).unwrap();
        cache.put(DatasetKind::Lgv, &sample()).unwrap();
        cache.put(DatasetKind::Lgv, &Dataset::default()).unwrap();

        let stored = cache.get(DatasetKind::Lgv).unwrap().unwrap();
        assert!(stored.payload.is_empty());
    }

    #[test]
    fn test_corrupt_entry_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LocalCache::open(dir.path()).unwrap();
        fs::write(dir.path().join("lgv.json"), b"{not json").unwrap();
        assert!(matches!(cache.get(DatasetKind::Lgv), Err(CacheError::Json(_))));
    }
}
