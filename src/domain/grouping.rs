use chrono::{Duration, NaiveDateTime};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::models::UsageRecord;

/// Idle gap separating sessions. Two consecutive records further apart than
/// this belong to different sessions.
pub const IDLE_GAP_MINUTES: i64 = 30;

fn idle_gap() -> Duration {
    Duration::minutes(IDLE_GAP_MINUTES)
}

/// Collision-resistant token; no sequential ordering is assumed anywhere.
pub fn mint_session_id() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BackfillError {
    #[error(
        "refusing to backfill: {grouped} of {total} records already carry a session id; \
         a partially grouped store would be silently regrouped"
    )]
    PartiallyGrouped { grouped: usize, total: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackfillOutcome {
    Applied { sessions_created: usize },
    /// Every record already carries a session id; nothing was touched.
    AlreadyGrouped,
}

/// Bulk assignment of session ids to a fully ungrouped record set.
///
/// Grouping is per owner: the owner's records are walked in timestamp order
/// and a new id is minted for the first record, whenever the gap from the
/// previous record exceeds the idle gap, and whenever a timestamp fails to
/// parse. A malformed timestamp still receives a session id but never
/// advances "last timestamp seen", so the next valid record is compared
/// against the last valid instant.
pub fn backfill(records: &mut [UsageRecord]) -> Result<BackfillOutcome, BackfillError> {
    let total = records.len();
    let grouped = records
        .iter()
        .filter(|record| !record.session_id.is_empty())
        .count();

    if total > 0 && grouped == total {
        return Ok(BackfillOutcome::AlreadyGrouped);
    }
    if grouped > 0 {
        return Err(BackfillError::PartiallyGrouped { grouped, total });
    }

    let mut owners: Vec<String> = Vec::new();
    for record in records.iter() {
        if !owners.contains(&record.owner) {
            owners.push(record.owner.clone());
        }
    }

    let mut sessions_created = 0_usize;
    for owner in &owners {
        let mut indices: Vec<usize> = (0..records.len())
            .filter(|&i| &records[i].owner == owner)
            .collect();
        // Lexicographic order of the canonical format is chronological, and
        // stays total when malformed values are mixed in. Stable sort keeps
        // original order among ties.
        indices.sort_by(|&a, &b| records[a].timestamp.cmp(&records[b].timestamp));

        let mut last_seen: Option<NaiveDateTime> = None;
        let mut current_id = String::new();
        for index in indices {
            let parsed = records[index].parsed_timestamp();
            let starts_new = match (parsed, last_seen) {
                (None, _) | (Some(_), None) => true,
                (Some(at), Some(last)) => at - last > idle_gap(),
            };
            if starts_new {
                current_id = mint_session_id();
                sessions_created += 1;
            }
            records[index].session_id = current_id.clone();
            if let Some(at) = parsed {
                last_seen = Some(at);
            }
        }
    }

    Ok(BackfillOutcome::Applied { sessions_created })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionAssignment {
    pub session_id: String,
    pub started_new_session: bool,
}

/// Incremental decision for one newly submitted record. Never re-examines
/// or re-groups existing records.
///
/// The gap is computed between the new record's own timestamp and the most
/// recent record's timestamp; that is what keeps append consistent with a
/// later backfill over the same data.
pub fn assign_session(
    latest: Option<&UsageRecord>,
    at: Option<NaiveDateTime>,
) -> SessionAssignment {
    let reusable = latest.and_then(|record| {
        let last = record.parsed_timestamp()?;
        let at = at?;
        if at - last > idle_gap() {
            return None;
        }
        // Empty id on the latest record is a data inconsistency; mint a
        // fresh id rather than propagate emptiness.
        if record.session_id.is_empty() {
            return None;
        }
        Some(record.session_id.clone())
    });

    match reusable {
        Some(session_id) => SessionAssignment {
            session_id,
            started_new_session: false,
        },
        None => SessionAssignment {
            session_id: mint_session_id(),
            started_new_session: true,
        },
    }
}

/// The owner's most recent record by timestamp; among ties the later store
/// position wins.
pub fn latest_record<'a>(records: &'a [UsageRecord], owner: &str) -> Option<&'a UsageRecord> {
    let mut latest: Option<&UsageRecord> = None;
    for record in records.iter().filter(|record| record.owner == owner) {
        match latest {
            Some(current) if record.timestamp < current.timestamp => {}
            _ => latest = Some(record),
        }
    }
    latest
}
