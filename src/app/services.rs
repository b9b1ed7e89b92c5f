use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::adapters::store::{StoreError, UsageStore};
use crate::domain::grouping::{self, BackfillError, BackfillOutcome};
use crate::domain::models::{
    NewUsageRecord, PositionedRecord, RecordEdit, SessionSummary, UsageRecord, parse_timestamp,
};
use crate::domain::sessions::{self, SessionError};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("usage store lock poisoned")]
    StoreLockPoisoned,
    #[error("usage store operation failed: {0}")]
    Store(#[from] StoreError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Backfill(#[from] BackfillError),
}

pub trait UsageQueryHandler {
    fn summarize(&self, owner: &str) -> Result<Vec<SessionSummary>, ServiceError>;
    fn detail(&self, owner: &str, session_id: &str)
    -> Result<Vec<PositionedRecord>, ServiceError>;
}

pub trait UsageCommandHandler {
    fn append(&self, entry: NewUsageRecord) -> Result<String, ServiceError>;
    fn backfill(&self) -> Result<BackfillOutcome, ServiceError>;
    fn apply_edits(
        &self,
        owner: &str,
        session_id: &str,
        edits: &[RecordEdit],
    ) -> Result<(), ServiceError>;
    fn delete_records(&self, owner: &str, positions: &[usize]) -> Result<usize, ServiceError>;
    fn delete_session(&self, owner: &str, session_id: &str) -> Result<usize, ServiceError>;
}

/// Engine entry point over an injected store. Holds no record state between
/// calls: every operation loads the full set, computes, and saves before
/// returning. The lock makes each read-modify-write cycle a critical
/// section, so concurrent callers cannot lose updates.
#[derive(Clone)]
pub struct UsageSessionService<S> {
    store: Arc<Mutex<S>>,
}

impl<S: UsageStore> UsageSessionService<S> {
    pub fn new(store: Arc<Mutex<S>>) -> Self {
        Self { store }
    }

    fn with_store<T>(
        &self,
        op: impl FnOnce(&S) -> Result<T, ServiceError>,
    ) -> Result<T, ServiceError> {
        let store = self
            .store
            .lock()
            .map_err(|_| ServiceError::StoreLockPoisoned)?;
        op(&store)
    }
}

impl<S: UsageStore> UsageQueryHandler for UsageSessionService<S> {
    fn summarize(&self, owner: &str) -> Result<Vec<SessionSummary>, ServiceError> {
        self.with_store(|store| {
            let records = store.load_all()?;
            Ok(sessions::summarize(&records, owner))
        })
    }

    fn detail(
        &self,
        owner: &str,
        session_id: &str,
    ) -> Result<Vec<PositionedRecord>, ServiceError> {
        self.with_store(|store| {
            let records = store.load_all()?;
            Ok(sessions::detail(&records, owner, session_id)?)
        })
    }
}

impl<S: UsageStore> UsageCommandHandler for UsageSessionService<S> {
    fn append(&self, entry: NewUsageRecord) -> Result<String, ServiceError> {
        self.with_store(|store| {
            let mut records = store.load_all()?;
            let assignment = grouping::assign_session(
                grouping::latest_record(&records, &entry.owner),
                parse_timestamp(&entry.timestamp),
            );

            records.push(UsageRecord {
                owner: entry.owner.clone(),
                timestamp: entry.timestamp.clone(),
                activity: entry.activity.clone(),
                quantity: entry.quantity,
                note: entry.note.clone(),
                location_tag: entry.location_tag.clone(),
                session_id: assignment.session_id.clone(),
            });
            store.save_all(&records)?;

            tracing::info!(
                owner = %entry.owner,
                session_id = %assignment.session_id,
                started_new_session = assignment.started_new_session,
                "usage entry appended"
            );
            Ok(assignment.session_id)
        })
    }

    fn backfill(&self) -> Result<BackfillOutcome, ServiceError> {
        self.with_store(|store| {
            let mut records = store.load_all()?;
            let outcome = grouping::backfill(&mut records)?;
            if let BackfillOutcome::Applied { sessions_created } = outcome {
                store.save_all(&records)?;
                tracing::info!(
                    records = records.len(),
                    sessions_created,
                    "session ids backfilled"
                );
            }
            Ok(outcome)
        })
    }

    fn apply_edits(
        &self,
        owner: &str,
        session_id: &str,
        edits: &[RecordEdit],
    ) -> Result<(), ServiceError> {
        self.with_store(|store| {
            let mut records = store.load_all()?;
            sessions::apply_edits(&mut records, owner, session_id, edits)?;
            store.save_all(&records)?;
            tracing::info!(owner, session_id, edits = edits.len(), "session detail edited");
            Ok(())
        })
    }

    fn delete_records(&self, owner: &str, positions: &[usize]) -> Result<usize, ServiceError> {
        self.with_store(|store| {
            let mut records = store.load_all()?;
            let removed = sessions::delete_records(&mut records, owner, positions)?;
            store.save_all(&records)?;
            tracing::info!(owner, removed, "usage records deleted");
            Ok(removed)
        })
    }

    fn delete_session(&self, owner: &str, session_id: &str) -> Result<usize, ServiceError> {
        self.with_store(|store| {
            let mut records = store.load_all()?;
            let removed = sessions::delete_session(&mut records, owner, session_id)?;
            store.save_all(&records)?;
            tracing::info!(owner, session_id, removed, "session deleted");
            Ok(removed)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::{ServiceError, UsageCommandHandler, UsageQueryHandler, UsageSessionService};
    use crate::adapters::store::{CsvUsageStore, UsageStore};
    use crate::domain::grouping::BackfillOutcome;
    use crate::domain::models::NewUsageRecord;
    use crate::domain::sessions::SessionError;
    use crate::test_support::{record, temp_store_path};

    fn service(name: &str) -> UsageSessionService<CsvUsageStore> {
        let store = CsvUsageStore::new(temp_store_path(name));
        UsageSessionService::new(Arc::new(Mutex::new(store)))
    }

    fn entry(owner: &str, timestamp: &str, activity: &str, quantity: f64) -> NewUsageRecord {
        NewUsageRecord {
            owner: owner.to_string(),
            timestamp: timestamp.to_string(),
            activity: activity.to_string(),
            quantity,
            note: String::new(),
            location_tag: String::new(),
        }
    }

    #[test]
    fn append_groups_and_persists_across_calls() {
        let service = service("append.csv");

        let first = service
            .append(entry("alice", "2026-03-01 09:00:00", "Shower", 50.0))
            .expect("append should succeed");
        let second = service
            .append(entry("alice", "2026-03-01 09:20:00", "Laundry", 70.0))
            .expect("append should succeed");
        let third = service
            .append(entry("alice", "2026-03-01 10:05:00", "Cooking", 20.0))
            .expect("append should succeed");

        assert_eq!(first, second);
        assert_ne!(second, third);

        let summaries = service.summarize("alice").expect("summarize should succeed");
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].total_quantity, 20.0);
        assert_eq!(summaries[1].total_quantity, 120.0);
    }

    #[test]
    fn backfill_persists_applied_outcome() {
        let path = temp_store_path("backfill.csv");
        let store = CsvUsageStore::new(path.clone());
        store
            .save_all(&[
                record("alice", "2026-03-01 09:00:00", "Shower", 50.0, ""),
                record("alice", "2026-03-01 09:20:00", "Laundry", 70.0, ""),
            ])
            .expect("seed should succeed");

        let service = UsageSessionService::new(Arc::new(Mutex::new(store)));
        let outcome = service.backfill().expect("backfill should succeed");
        assert_eq!(
            outcome,
            BackfillOutcome::Applied {
                sessions_created: 1
            }
        );

        let reloaded = CsvUsageStore::new(path)
            .load_all()
            .expect("reload should succeed");
        assert!(!reloaded[0].session_id.is_empty());
        assert_eq!(reloaded[0].session_id, reloaded[1].session_id);
    }

    #[test]
    fn backfill_refusal_leaves_store_untouched() {
        let path = temp_store_path("backfill-partial.csv");
        let store = CsvUsageStore::new(path.clone());
        let seeded = vec![
            record("alice", "2026-03-01 09:00:00", "Shower", 50.0, "s-1"),
            record("alice", "2026-03-01 09:20:00", "Laundry", 70.0, ""),
        ];
        store.save_all(&seeded).expect("seed should succeed");

        let service = UsageSessionService::new(Arc::new(Mutex::new(store)));
        let result = service.backfill();

        assert!(matches!(result, Err(ServiceError::Backfill(_))));
        let reloaded = CsvUsageStore::new(path)
            .load_all()
            .expect("reload should succeed");
        assert_eq!(reloaded, seeded);
    }

    #[test]
    fn detail_maps_unknown_session_to_not_found() {
        let service = service("detail-missing.csv");
        let result = service.detail("alice", "missing");
        assert!(matches!(
            result,
            Err(ServiceError::Session(SessionError::SessionNotFound { .. }))
        ));
    }

    #[test]
    fn delete_session_removes_it_from_summaries() {
        let service = service("delete-session.csv");
        let session_id = service
            .append(entry("alice", "2026-03-01 09:00:00", "Shower", 50.0))
            .expect("append should succeed");

        let removed = service
            .delete_session("alice", &session_id)
            .expect("delete should succeed");

        assert_eq!(removed, 1);
        assert!(
            service
                .summarize("alice")
                .expect("summarize should succeed")
                .is_empty()
        );
    }

    #[test]
    fn delete_records_rejects_foreign_positions() {
        let service = service("delete-records-foreign.csv");
        service
            .append(entry("alice", "2026-03-01 09:00:00", "Shower", 50.0))
            .expect("append should succeed");
        service
            .append(entry("bob", "2026-03-01 09:05:00", "Car wash", 150.0))
            .expect("append should succeed");

        let result = service.delete_records("alice", &[1]);

        assert!(matches!(
            result,
            Err(ServiceError::Session(SessionError::RecordNotFound { .. }))
        ));
        assert_eq!(
            service
                .summarize("bob")
                .expect("summarize should succeed")
                .len(),
            1
        );
    }
}
