use std::path::PathBuf;

use crate::domain::models::UsageRecord;

pub fn temp_store_path(name: &str) -> PathBuf {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let path = dir.path().join(name);
    std::mem::forget(dir);
    path
}

pub fn record(
    owner: &str,
    timestamp: &str,
    activity: &str,
    quantity: f64,
    session_id: &str,
) -> UsageRecord {
    record_at(owner, timestamp, activity, quantity, session_id, "")
}

pub fn record_at(
    owner: &str,
    timestamp: &str,
    activity: &str,
    quantity: f64,
    session_id: &str,
    location_tag: &str,
) -> UsageRecord {
    UsageRecord {
        owner: owner.to_string(),
        timestamp: timestamp.to_string(),
        activity: activity.to_string(),
        quantity,
        note: String::new(),
        location_tag: location_tag.to_string(),
        session_id: session_id.to_string(),
    }
}
