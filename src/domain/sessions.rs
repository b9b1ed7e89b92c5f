use thiserror::Error;

use crate::domain::models::{PositionedRecord, RecordEdit, SessionSummary, UsageRecord};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("session {session_id} not found for owner {owner}")]
    SessionNotFound { owner: String, session_id: String },
    #[error("record position {position} not found for owner {owner}")]
    RecordNotFound { owner: String, position: usize },
}

struct SummaryAccumulator {
    session_id: String,
    started_at: String,
    total_quantity: f64,
    activities: Vec<String>,
    location: String,
    location_at: Option<String>,
}

/// Aggregates the owner's records into per-session summaries, most recent
/// session first (earliest member timestamp, descending).
///
/// The representative location is the earliest-by-timestamp non-empty
/// location tag; among equal timestamps the earlier store position wins.
pub fn summarize(records: &[UsageRecord], owner: &str) -> Vec<SessionSummary> {
    let mut accumulators: Vec<SummaryAccumulator> = Vec::new();

    for record in records.iter().filter(|record| record.owner == owner) {
        let index = match accumulators
            .iter()
            .position(|accumulator| accumulator.session_id == record.session_id)
        {
            Some(existing) => existing,
            None => {
                accumulators.push(SummaryAccumulator {
                    session_id: record.session_id.clone(),
                    started_at: record.timestamp.clone(),
                    total_quantity: 0.0,
                    activities: Vec::new(),
                    location: String::new(),
                    location_at: None,
                });
                accumulators.len() - 1
            }
        };
        let accumulator = &mut accumulators[index];

        if record.timestamp < accumulator.started_at {
            accumulator.started_at = record.timestamp.clone();
        }
        accumulator.total_quantity += record.quantity;
        accumulator.activities.push(record.activity.clone());

        if !record.location_tag.is_empty() {
            let earlier = match &accumulator.location_at {
                Some(current) => record.timestamp < *current,
                None => true,
            };
            if earlier {
                accumulator.location = record.location_tag.clone();
                accumulator.location_at = Some(record.timestamp.clone());
            }
        }
    }

    let mut summaries: Vec<SessionSummary> = accumulators
        .into_iter()
        .map(|accumulator| SessionSummary {
            session_id: accumulator.session_id,
            started_at: accumulator.started_at,
            total_quantity: accumulator.total_quantity,
            activities: accumulator.activities.join(", "),
            location: accumulator.location,
        })
        .collect();

    summaries.sort_by(|a, b| b.started_at.cmp(&a.started_at));
    summaries
}

/// The full records of one session, most recent first, each tagged with its
/// store position.
pub fn detail(
    records: &[UsageRecord],
    owner: &str,
    session_id: &str,
) -> Result<Vec<PositionedRecord>, SessionError> {
    let mut members: Vec<PositionedRecord> = records
        .iter()
        .enumerate()
        .filter(|(_, record)| record.owner == owner && record.session_id == session_id)
        .map(|(position, record)| PositionedRecord {
            position,
            record: record.clone(),
        })
        .collect();

    if members.is_empty() {
        return Err(SessionError::SessionNotFound {
            owner: owner.to_string(),
            session_id: session_id.to_string(),
        });
    }

    members.sort_by(|a, b| b.record.timestamp.cmp(&a.record.timestamp));
    Ok(members)
}

/// Writes edited field values back to the referenced records of one session.
///
/// Session ids are deliberately left untouched: editing a timestamp never
/// triggers re-grouping, even when the new value would fall inside another
/// session's window. Every referenced position is validated before any
/// record is mutated.
pub fn apply_edits(
    records: &mut [UsageRecord],
    owner: &str,
    session_id: &str,
    edits: &[RecordEdit],
) -> Result<(), SessionError> {
    if !records
        .iter()
        .any(|record| record.owner == owner && record.session_id == session_id)
    {
        return Err(SessionError::SessionNotFound {
            owner: owner.to_string(),
            session_id: session_id.to_string(),
        });
    }

    for edit in edits {
        let in_session = records.get(edit.position).is_some_and(|record| {
            record.owner == owner && record.session_id == session_id
        });
        if !in_session {
            return Err(SessionError::RecordNotFound {
                owner: owner.to_string(),
                position: edit.position,
            });
        }
    }

    for edit in edits {
        let record = &mut records[edit.position];
        record.timestamp = edit.timestamp.clone();
        record.activity = edit.activity.clone();
        if let Ok(quantity) = edit.quantity.trim().parse::<f64>() {
            record.quantity = quantity;
        }
        record.note = edit.note.clone();
        record.location_tag = edit.location_tag.clone();
    }

    Ok(())
}

/// Removes the referenced records entirely. A session emptied this way
/// simply stops appearing; there is no orphan to clean up.
pub fn delete_records(
    records: &mut Vec<UsageRecord>,
    owner: &str,
    positions: &[usize],
) -> Result<usize, SessionError> {
    for &position in positions {
        let owned = records
            .get(position)
            .is_some_and(|record| record.owner == owner);
        if !owned {
            return Err(SessionError::RecordNotFound {
                owner: owner.to_string(),
                position,
            });
        }
    }

    let mut ordered: Vec<usize> = positions.to_vec();
    ordered.sort_unstable();
    ordered.dedup();
    for position in ordered.iter().rev() {
        records.remove(*position);
    }

    Ok(ordered.len())
}

/// Removes every record of one session for one owner.
pub fn delete_session(
    records: &mut Vec<UsageRecord>,
    owner: &str,
    session_id: &str,
) -> Result<usize, SessionError> {
    let before = records.len();
    records.retain(|record| !(record.owner == owner && record.session_id == session_id));
    let removed = before - records.len();

    if removed == 0 {
        return Err(SessionError::SessionNotFound {
            owner: owner.to_string(),
            session_id: session_id.to_string(),
        });
    }

    Ok(removed)
}
