use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::models::UsageRecord;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read usage data: {0}")]
    Read(#[source] csv::Error),
    #[error("failed to write usage data: {0}")]
    Write(#[source] csv::Error),
    #[error("usage data io failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Persistence collaborator boundary. The engine always reads the full
/// record set, computes, and hands the full updated set back; retry and
/// durability semantics live behind this trait.
pub trait UsageStore {
    fn load_all(&self) -> Result<Vec<UsageRecord>, StoreError>;
    fn save_all(&self, records: &[UsageRecord]) -> Result<(), StoreError>;
}

/// Flat-file CSV store.
///
/// Column layout:
/// owner, timestamp, activity, quantity, note, location_tag, session_id
#[derive(Debug, Clone)]
pub struct CsvUsageStore {
    path: PathBuf,
}

/// Quantity travels as raw text so that blank cells coerce to zero instead
/// of failing the whole load.
#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    owner: String,
    timestamp: String,
    activity: String,
    quantity: String,
    #[serde(default)]
    note: String,
    #[serde(default)]
    location_tag: String,
    #[serde(default)]
    session_id: String,
}

impl CsvUsageStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("water_usage.csv"));
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl UsageStore for CsvUsageStore {
    fn load_all(&self) -> Result<Vec<UsageRecord>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = csv::Reader::from_path(&self.path).map_err(StoreError::Read)?;
        let mut records = Vec::new();
        for row in reader.deserialize::<CsvRow>() {
            let row = row.map_err(StoreError::Read)?;
            records.push(UsageRecord {
                owner: row.owner,
                timestamp: row.timestamp,
                activity: row.activity,
                quantity: row.quantity.trim().parse::<f64>().unwrap_or(0.0),
                note: row.note,
                location_tag: row.location_tag,
                session_id: row.session_id,
            });
        }
        Ok(records)
    }

    fn save_all(&self, records: &[UsageRecord]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        // Write to a sibling staging file first; the rename makes a
        // completed save atomic.
        let staging = self.staging_path();
        let mut writer = csv::Writer::from_path(&staging).map_err(StoreError::Write)?;
        for record in records {
            writer
                .serialize(CsvRow {
                    owner: record.owner.clone(),
                    timestamp: record.timestamp.clone(),
                    activity: record.activity.clone(),
                    quantity: record.quantity.to_string(),
                    note: record.note.clone(),
                    location_tag: record.location_tag.clone(),
                    session_id: record.session_id.clone(),
                })
                .map_err(StoreError::Write)?;
        }
        writer.flush().map_err(StoreError::Io)?;
        drop(writer);

        fs::rename(&staging, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{CsvUsageStore, UsageStore};
    use crate::test_support::{record, temp_store_path};

    #[test]
    fn missing_file_loads_as_empty() {
        let store = CsvUsageStore::new(temp_store_path("missing.csv"));
        let records = store.load_all().expect("load should succeed");
        assert!(records.is_empty());
    }

    #[test]
    fn save_then_load_roundtrips_records() {
        let store = CsvUsageStore::new(temp_store_path("roundtrip.csv"));
        let records = vec![
            record("alice", "2026-03-01 09:00:00", "Shower", 50.0, "s-1"),
            record("bob", "2026-03-01 09:10:00", "Car wash", 150.5, ""),
        ];

        store.save_all(&records).expect("save should succeed");
        let loaded = store.load_all().expect("load should succeed");

        assert_eq!(loaded, records);
    }

    #[test]
    fn save_creates_missing_parent_directories() {
        let base = temp_store_path("nested");
        let store = CsvUsageStore::new(base.join("deep").join("usage.csv"));

        store
            .save_all(&[record("alice", "2026-03-01 09:00:00", "Shower", 50.0, "s-1")])
            .expect("save should succeed");

        assert_eq!(store.load_all().expect("load should succeed").len(), 1);
    }

    #[test]
    fn blank_quantity_coerces_to_zero() {
        let path = temp_store_path("blank-quantity.csv");
        std::fs::write(
            &path,
            "owner,timestamp,activity,quantity,note,location_tag,session_id\n\
             alice,2026-03-01 09:00:00,Shower,,,,s-1\n",
        )
        .expect("fixture should be writable");

        let store = CsvUsageStore::new(path);
        let records = store.load_all().expect("load should succeed");

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].quantity, 0.0);
        assert_eq!(records[0].session_id, "s-1");
    }

    #[test]
    fn save_overwrites_previous_contents() {
        let store = CsvUsageStore::new(temp_store_path("overwrite.csv"));
        store
            .save_all(&[
                record("alice", "2026-03-01 09:00:00", "Shower", 50.0, "s-1"),
                record("alice", "2026-03-01 09:20:00", "Laundry", 70.0, "s-1"),
            ])
            .expect("save should succeed");

        store
            .save_all(&[record("alice", "2026-03-01 09:00:00", "Shower", 50.0, "s-1")])
            .expect("second save should succeed");

        assert_eq!(store.load_all().expect("load should succeed").len(), 1);
    }
}
