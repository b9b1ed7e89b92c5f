use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Combined date+time format carried by every record, second resolution.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One observed water-usage event for one owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub owner: String,
    pub timestamp: String,
    pub activity: String,
    pub quantity: f64,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub location_tag: String,
    /// Assigned by the session assigner, never user-editable directly.
    /// Empty means "not yet grouped".
    #[serde(default)]
    pub session_id: String,
}

impl UsageRecord {
    /// Lenient parse. A malformed timestamp is a grouping policy input,
    /// never an error.
    pub fn parsed_timestamp(&self) -> Option<NaiveDateTime> {
        parse_timestamp(&self.timestamp)
    }
}

pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_FORMAT).ok()
}

/// A submitted entry before the assigner has decided its session.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUsageRecord {
    pub owner: String,
    pub timestamp: String,
    pub activity: String,
    pub quantity: f64,
    pub note: String,
    pub location_tag: String,
}

/// Derived aggregate over the records sharing a session id. Not stored;
/// it exists only as long as at least one record references the id.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub session_id: String,
    /// Earliest member timestamp, raw.
    pub started_at: String,
    pub total_quantity: f64,
    /// Member activity labels comma-joined in record order.
    pub activities: String,
    /// Earliest-by-timestamp non-empty location tag among members.
    pub location: String,
}

/// A record tagged with its position in the underlying store, so edits and
/// deletes can be applied precisely.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionedRecord {
    pub position: usize,
    pub record: UsageRecord,
}

/// Field values written back to one record of a session detail view.
///
/// `quantity` stays raw text: a value that fails to parse leaves the prior
/// quantity in place instead of failing the whole edit.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordEdit {
    pub position: usize,
    pub timestamp: String,
    pub activity: String,
    pub quantity: String,
    pub note: String,
    pub location_tag: String,
}
