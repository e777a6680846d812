//! The authoritative incident collection.
//!
//! [`IncidentStore`] owns every incident and is the only place they change.
//! Each mutating operation applies its change in memory, persists the whole
//! collection, and undoes the in-memory change if the save fails, so memory
//! and the durable copy never disagree once a call returns. A save that
//! fails only after the new copy replaced the old one
//! ([`PersistError::is_committed`]) keeps the change.
//!
//! Mutators take `&mut self`; [`SharedStore`] puts one instance behind a
//! single mutex for callers that need to share it across threads.

use crate::config::StoreConfig;
use crate::error::ErrorCode;
use crate::model::incident::{Action, Incident, NewIncident, Status};
use crate::persist::{JsonFileStore, PersistError, Persistence};
use crate::validate::{
    CreatePayload, InvalidTransition, ValidationErrors, validate_create, validate_transition,
};
use chrono::Utc;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0}")]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Transition(#[from] InvalidTransition),

    #[error("cannot archive incident {id} from {status}; only OPEN or RESOLVED incidents can be archived")]
    NotArchivable { id: String, status: Status },

    #[error("cannot unarchive incident {id}: it is {status}, not ARCHIVED")]
    NotArchived { id: String, status: Status },

    #[error(transparent)]
    Persistence(#[from] PersistError),
}

impl StoreError {
    /// Machine-readable code for this failure.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Validation(_) => ErrorCode::ValidationFailed,
            Self::Transition(_) => ErrorCode::InvalidStateTransition,
            Self::NotArchivable { .. } => ErrorCode::NotArchivable,
            Self::NotArchived { .. } => ErrorCode::NotArchived,
            Self::Persistence(err) => err.code(),
        }
    }
}

/// What [`IncidentStore::load_on_startup`] found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupReport {
    /// No durable copy existed; an empty one was written.
    Initialized,
    /// The durable copy was read.
    Loaded { count: usize },
    /// The durable copy was unreadable. It was moved aside and the store
    /// started empty.
    Recovered {
        code: ErrorCode,
        reason: String,
        quarantined: Option<PathBuf>,
    },
}

/// Owned incident collection with write-through persistence.
#[derive(Debug)]
pub struct IncidentStore<P> {
    incidents: Vec<Incident>,
    backend: P,
}

impl<P: Persistence> IncidentStore<P> {
    /// Read the durable copy into a new store.
    ///
    /// - No copy yet: start empty and write the empty collection out.
    /// - Unreadable copy: quarantine it, start empty, write the empty
    ///   collection, and report [`StartupReport::Recovered`].
    ///
    /// # Errors
    ///
    /// Fails when the initial empty collection cannot be written, or when an
    /// unreadable copy cannot be moved aside (it is never overwritten in place).
    pub fn load_on_startup(backend: P) -> Result<(Self, StartupReport), StoreError> {
        let (incidents, report) = match backend.load() {
            Ok(Some(incidents)) => {
                let count = incidents.len();
                info!(count, "loaded incidents");
                (incidents, StartupReport::Loaded { count })
            }
            Ok(None) => {
                info!("no incident store found, starting fresh");
                backend.save(&[])?;
                (Vec::new(), StartupReport::Initialized)
            }
            Err(err) => {
                error!(
                    code = %err.code(),
                    error = %err,
                    "incident store unreadable; quarantining and starting empty"
                );
                let quarantined = backend.quarantine()?;
                backend.save(&[])?;
                let report = StartupReport::Recovered {
                    code: err.code(),
                    reason: err.to_string(),
                    quarantined,
                };
                (Vec::new(), report)
            }
        };

        Ok((Self { incidents, backend }, report))
    }

    /// The persistence backend this store writes through.
    #[must_use]
    pub fn backend(&self) -> &P {
        &self.backend
    }

    /// Incidents in insertion order, without ARCHIVED ones unless asked.
    #[must_use]
    pub fn list_all(&self, include_archived: bool) -> Vec<Incident> {
        self.incidents
            .iter()
            .filter(|incident| include_archived || incident.status != Status::Archived)
            .cloned()
            .collect()
    }

    /// Exact-match lookup.
    #[must_use]
    pub fn find_by_id(&self, id: &str) -> Option<Incident> {
        self.position(id).map(|idx| self.incidents[idx].clone())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.incidents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.incidents.is_empty()
    }

    /// Create an OPEN incident from validated fields.
    ///
    /// # Errors
    ///
    /// [`StoreError::Persistence`] when the save fails; nothing is added.
    pub fn create(&mut self, fields: NewIncident) -> Result<Incident, StoreError> {
        let incident = Incident {
            id: self.fresh_id(),
            title: fields.title,
            description: fields.description,
            category: fields.category,
            severity: fields.severity,
            status: Status::Open,
            reported_at: Utc::now(),
        };

        self.incidents.push(incident.clone());
        self.persist_or_rollback(|incidents| {
            incidents.pop();
        })?;

        info!(id = %incident.id, category = %incident.category, severity = %incident.severity, "incident created");
        Ok(incident)
    }

    /// Validate a raw payload and create the incident it describes.
    ///
    /// # Errors
    ///
    /// [`StoreError::Validation`] listing every bad field, or
    /// [`StoreError::Persistence`].
    pub fn submit(&mut self, payload: &CreatePayload) -> Result<Incident, StoreError> {
        let fields = validate_create(payload)?;
        self.create(fields)
    }

    /// Move an incident to `requested`, if the lifecycle allows it.
    ///
    /// Returns `Ok(None)` when no incident has `id`.
    ///
    /// # Errors
    ///
    /// [`StoreError::Transition`] for an illegal move, or
    /// [`StoreError::Persistence`]; the status is unchanged either way.
    pub fn change_status(
        &mut self,
        id: &str,
        requested: Status,
    ) -> Result<Option<Incident>, StoreError> {
        let Some(idx) = self.position(id) else {
            return Ok(None);
        };
        let next = validate_transition(self.incidents[idx].status, requested)?;
        self.set_status(idx, next).map(Some)
    }

    /// Archive an OPEN or RESOLVED incident.
    ///
    /// Returns `Ok(None)` when no incident has `id`.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotArchivable`] from any other status, or
    /// [`StoreError::Persistence`].
    pub fn archive(&mut self, id: &str) -> Result<Option<Incident>, StoreError> {
        let Some(idx) = self.position(id) else {
            return Ok(None);
        };
        let current = self.incidents[idx].status;
        let next = validate_transition(current, Status::Archived).map_err(|_| {
            StoreError::NotArchivable {
                id: id.to_string(),
                status: current,
            }
        })?;
        self.set_status(idx, next).map(Some)
    }

    /// Return an ARCHIVED incident to OPEN.
    ///
    /// Returns `Ok(None)` when no incident has `id`.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotArchived`] when the incident is not archived, or
    /// [`StoreError::Persistence`].
    pub fn unarchive(&mut self, id: &str) -> Result<Option<Incident>, StoreError> {
        let Some(idx) = self.position(id) else {
            return Ok(None);
        };
        let current = self.incidents[idx].status;
        let Some(next) = current.apply(Action::Unarchive) else {
            return Err(StoreError::NotArchived {
                id: id.to_string(),
                status: current,
            });
        };
        self.set_status(idx, next).map(Some)
    }

    /// Permanently remove an incident, whatever its status.
    ///
    /// Returns the removed incident, or `Ok(None)` when no incident has `id`.
    ///
    /// # Errors
    ///
    /// [`StoreError::Persistence`]; the incident stays in place.
    pub fn delete(&mut self, id: &str) -> Result<Option<Incident>, StoreError> {
        let Some(idx) = self.position(id) else {
            return Ok(None);
        };

        let removed = self.incidents.remove(idx);
        let restore = removed.clone();
        self.persist_or_rollback(move |incidents| incidents.insert(idx, restore))?;

        info!(id = %removed.id, status = %removed.status, "incident deleted");
        Ok(Some(removed))
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.incidents.iter().position(|incident| incident.id == id)
    }

    fn fresh_id(&self) -> String {
        loop {
            let id = Uuid::new_v4().to_string();
            if self.position(&id).is_none() {
                return id;
            }
        }
    }

    fn set_status(&mut self, idx: usize, next: Status) -> Result<Incident, StoreError> {
        let previous = self.incidents[idx].status;
        self.incidents[idx].status = next;
        self.persist_or_rollback(|incidents| incidents[idx].status = previous)?;

        let incident = &self.incidents[idx];
        info!(id = %incident.id, from = %previous, to = %next, "incident status changed");
        Ok(incident.clone())
    }

    fn persist_or_rollback(
        &mut self,
        rollback: impl FnOnce(&mut Vec<Incident>),
    ) -> Result<(), StoreError> {
        match self.backend.save(&self.incidents) {
            Ok(()) => {
                debug!(count = self.incidents.len(), "incident store persisted");
                Ok(())
            }
            Err(err) if err.is_committed() => {
                warn!(error = %err, "incident store persisted but not synced; keeping change");
                Ok(())
            }
            Err(err) => {
                rollback(&mut self.incidents);
                warn!(error = %err, "persist failed; in-memory change rolled back");
                Err(err.into())
            }
        }
    }
}

impl IncidentStore<JsonFileStore> {
    /// Lock `data_dir`, then load its durable copy as configured.
    ///
    /// # Errors
    ///
    /// As [`JsonFileStore::open`] and [`IncidentStore::load_on_startup`].
    pub fn open_dir(
        data_dir: &Path,
        config: &StoreConfig,
    ) -> Result<(Self, StartupReport), StoreError> {
        let backend = JsonFileStore::open(data_dir, &config.file, config.lock_timeout())?;
        Self::load_on_startup(backend)
    }
}

/// An [`IncidentStore`] behind one mutex.
///
/// Every operation, including its save, runs while holding the lock, so two
/// threads can never interleave their reads and writes.
#[derive(Debug)]
pub struct SharedStore<P> {
    inner: Arc<Mutex<IncidentStore<P>>>,
}

impl<P> Clone for SharedStore<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: Persistence> SharedStore<P> {
    #[must_use]
    pub fn new(store: IncidentStore<P>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    #[must_use]
    pub fn list_all(&self, include_archived: bool) -> Vec<Incident> {
        self.inner.lock().list_all(include_archived)
    }

    #[must_use]
    pub fn find_by_id(&self, id: &str) -> Option<Incident> {
        self.inner.lock().find_by_id(id)
    }

    /// See [`IncidentStore::create`].
    ///
    /// # Errors
    ///
    /// As [`IncidentStore::create`].
    pub fn create(&self, fields: NewIncident) -> Result<Incident, StoreError> {
        self.inner.lock().create(fields)
    }

    /// See [`IncidentStore::submit`].
    ///
    /// # Errors
    ///
    /// As [`IncidentStore::submit`].
    pub fn submit(&self, payload: &CreatePayload) -> Result<Incident, StoreError> {
        self.inner.lock().submit(payload)
    }

    /// See [`IncidentStore::change_status`].
    ///
    /// # Errors
    ///
    /// As [`IncidentStore::change_status`].
    pub fn change_status(&self, id: &str, requested: Status) -> Result<Option<Incident>, StoreError> {
        self.inner.lock().change_status(id, requested)
    }

    /// See [`IncidentStore::archive`].
    ///
    /// # Errors
    ///
    /// As [`IncidentStore::archive`].
    pub fn archive(&self, id: &str) -> Result<Option<Incident>, StoreError> {
        self.inner.lock().archive(id)
    }

    /// See [`IncidentStore::unarchive`].
    ///
    /// # Errors
    ///
    /// As [`IncidentStore::unarchive`].
    pub fn unarchive(&self, id: &str) -> Result<Option<Incident>, StoreError> {
        self.inner.lock().unarchive(id)
    }

    /// See [`IncidentStore::delete`].
    ///
    /// # Errors
    ///
    /// As [`IncidentStore::delete`].
    pub fn delete(&self, id: &str) -> Result<Option<Incident>, StoreError> {
        self.inner.lock().delete(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::incident::{Category, Severity};
    use crate::persist::MemoryPersistence;

    fn fields(title: &str) -> NewIncident {
        NewIncident {
            title: title.to_string(),
            description: "Needs looking into soon".to_string(),
            category: Category::It,
            severity: Severity::Low,
        }
    }

    fn fresh() -> (IncidentStore<MemoryPersistence>, MemoryPersistence) {
        let backend = MemoryPersistence::new();
        let (store, report) = IncidentStore::load_on_startup(backend.clone()).unwrap();
        assert_eq!(report, StartupReport::Initialized);
        (store, backend)
    }

    #[test]
    fn startup_without_copy_writes_empty_collection() {
        let (store, backend) = fresh();
        assert!(store.is_empty());
        assert_eq!(backend.snapshot().unwrap(), Some(Vec::new()));
    }

    #[test]
    fn startup_loads_existing_copy() {
        let (mut store, backend) = fresh();
        store.create(fields("First one")).unwrap();
        store.create(fields("Second one")).unwrap();

        let (reloaded, report) = IncidentStore::load_on_startup(backend).unwrap();
        assert_eq!(report, StartupReport::Loaded { count: 2 });
        assert_eq!(reloaded.list_all(true), store.list_all(true));
    }

    #[test]
    fn startup_quarantines_corrupt_copy() {
        let backend = MemoryPersistence::new();
        backend.corrupt();

        let (store, report) = IncidentStore::load_on_startup(backend.clone()).unwrap();
        assert!(store.is_empty());
        assert!(matches!(
            report,
            StartupReport::Recovered {
                code: ErrorCode::CorruptStore,
                quarantined: Some(_),
                ..
            }
        ));
        assert_eq!(backend.quarantined(), vec![b"{ not json ]".to_vec()]);
        assert_eq!(backend.snapshot().unwrap(), Some(Vec::new()));
    }

    #[test]
    fn startup_recovers_from_read_failure() {
        let backend = MemoryPersistence::new();
        backend.save(&[]).unwrap();
        backend.fail_loads(true);

        let (_, report) = IncidentStore::load_on_startup(backend).unwrap();
        assert!(matches!(
            report,
            StartupReport::Recovered {
                code: ErrorCode::StoreReadFailed,
                ..
            }
        ));
    }

    #[test]
    fn startup_fails_when_initial_write_fails() {
        let backend = MemoryPersistence::new();
        backend.fail_saves(true);
        let err = IncidentStore::load_on_startup(backend).unwrap_err();
        assert_eq!(err.code(), ErrorCode::StoreWriteFailed);
    }

    #[test]
    fn create_forces_open_and_unique_ids() {
        let (mut store, _) = fresh();
        let a = store.create(fields("First one")).unwrap();
        let b = store.create(fields("Second one")).unwrap();
        assert_eq!(a.status, Status::Open);
        assert_eq!(b.status, Status::Open);
        assert_ne!(a.id, b.id);
        assert!(b.reported_at >= a.reported_at);
    }

    #[test]
    fn submit_rejects_invalid_payload_without_creating() {
        let (mut store, backend) = fresh();
        let saves = backend.save_count();
        let err = store
            .submit(&CreatePayload::new("Bad", "Short", "IT", "LOW"))
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::ValidationFailed);
        assert!(store.is_empty());
        assert_eq!(backend.save_count(), saves);
    }

    #[test]
    fn unknown_id_is_absent_for_every_mutation() {
        let (mut store, backend) = fresh();
        let saves = backend.save_count();

        assert!(store.change_status("nope", Status::Investigating).unwrap().is_none());
        assert!(store.archive("nope").unwrap().is_none());
        assert!(store.unarchive("nope").unwrap().is_none());
        assert!(store.delete("nope").unwrap().is_none());
        assert!(store.find_by_id("nope").is_none());
        assert_eq!(backend.save_count(), saves);
    }

    #[test]
    fn change_status_to_archived_uses_archive_edges() {
        let (mut store, _) = fresh();
        let id = store.create(fields("Route flaps")).unwrap().id;
        let archived = store.change_status(&id, Status::Archived).unwrap().unwrap();
        assert_eq!(archived.status, Status::Archived);
    }

    #[test]
    fn archive_from_investigating_is_not_archivable() {
        let (mut store, _) = fresh();
        let id = store.create(fields("Disk filling")).unwrap().id;
        store.change_status(&id, Status::Investigating).unwrap();

        let err = store.archive(&id).unwrap_err();
        assert!(matches!(
            err,
            StoreError::NotArchivable {
                status: Status::Investigating,
                ..
            }
        ));
        assert_eq!(
            store.find_by_id(&id).map(|i| i.status),
            Some(Status::Investigating)
        );
    }

    #[test]
    fn unarchive_requires_archived() {
        let (mut store, _) = fresh();
        let id = store.create(fields("Printer jam")).unwrap().id;
        let err = store.unarchive(&id).unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotArchived);
        assert_eq!(store.find_by_id(&id).map(|i| i.status), Some(Status::Open));
    }

    #[test]
    fn failed_save_rolls_back_every_mutation() {
        let (mut store, backend) = fresh();
        let open = store.create(fields("Stays open")).unwrap();
        let resolved = store.create(fields("Gets resolved")).unwrap();
        store.change_status(&resolved.id, Status::Investigating).unwrap();
        store.change_status(&resolved.id, Status::Resolved).unwrap();
        let archived = store.create(fields("Gets archived")).unwrap();
        store.archive(&archived.id).unwrap();

        let before = store.list_all(true);
        backend.fail_saves(true);

        assert!(store.create(fields("Never stored")).is_err());
        assert!(store.change_status(&open.id, Status::Investigating).is_err());
        assert!(store.archive(&resolved.id).is_err());
        assert!(store.unarchive(&archived.id).is_err());
        assert!(store.delete(&open.id).is_err());

        assert_eq!(store.list_all(true), before);
        assert_eq!(backend.snapshot().unwrap(), Some(before));
    }

    #[test]
    fn delete_rollback_restores_position() {
        let (mut store, backend) = fresh();
        let ids: Vec<String> = ["One here", "Two here", "Three here"]
            .into_iter()
            .map(|t| store.create(fields(t)).unwrap().id)
            .collect();

        backend.fail_saves(true);
        assert!(store.delete(&ids[1]).is_err());

        let order: Vec<String> = store.list_all(true).into_iter().map(|i| i.id).collect();
        assert_eq!(order, ids);
    }

    #[test]
    fn save_failing_after_commit_keeps_change_in_memory() {
        let (mut store, backend) = fresh();
        let kept = store.create(fields("Survives sync")).unwrap();

        backend.fail_syncs(true);
        let created = store.create(fields("Written, not synced")).unwrap();
        store.change_status(&kept.id, Status::Investigating).unwrap();
        store.delete(&created.id).unwrap();

        assert_eq!(backend.snapshot().unwrap(), Some(store.list_all(true)));
        assert_eq!(
            store.find_by_id(&kept.id).map(|i| i.status),
            Some(Status::Investigating)
        );
    }

    #[test]
    fn reads_leave_durable_copy_untouched() {
        let (mut store, backend) = fresh();
        let open = store.create(fields("Still open")).unwrap();
        let archived = store.create(fields("Put away")).unwrap();
        store.archive(&archived.id).unwrap();

        let saves = backend.save_count();
        let before = backend.snapshot().unwrap();

        assert_eq!(store.list_all(true).len(), 2);
        assert_eq!(store.list_all(false), vec![open.clone()]);
        assert_eq!(store.find_by_id(&open.id), Some(open));
        assert_eq!(
            store.find_by_id(&archived.id).map(|i| i.status),
            Some(Status::Archived)
        );

        assert_eq!(backend.save_count(), saves);
        assert_eq!(backend.snapshot().unwrap(), before);
    }

    #[test]
    fn shared_store_serializes_concurrent_creates() {
        let (store, backend) = fresh();
        let shared = SharedStore::new(store);

        let handles: Vec<_> = (0..8)
            .map(|n| {
                let shared = shared.clone();
                std::thread::spawn(move || {
                    for k in 0..5 {
                        shared.create(fields(&format!("Thread {n} item {k}"))).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(shared.list_all(true).len(), 40);
        assert_eq!(backend.snapshot().unwrap().unwrap(), shared.list_all(true));
    }
}
