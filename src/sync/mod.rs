//! Synchronization coordinator.
//!
//! Every mutation runs the same cycle:
//!
//! ```text
//! Idle -> Validating -> Submitting -> store mutated -> PropagatingUpdate -> Idle
//!             |              |
//!             +-- invalid ---+-- remote error --> Idle (store unchanged)
//! ```
//!
//! Nothing is written to the store before the remote store acknowledges, and
//! a failed call never leaves a partial write behind. Remote calls run without
//! holding the store lock, so overlapping mutations are possible. For a given
//! identity an acknowledgment is applied only if no later-issued update/delete
//! of it has been applied already; failed mutations drop out of the ordering.

mod error;
mod propagate;
mod validate;


pub use error::{Action, SyncError, ValidationError};
pub use propagate::{Propagator, SubscriptionId};

use crate::config::{Config, IdPolicy, RosterConfig};
use crate::ids::DisplayIdGenerator;
use crate::model::{Class, ClassDraft, EntityId, EntityKind, Student, StudentDraft};
use crate::remote::{Remote, RemoteError};
use crate::store::{Entity, EntityStore, Snapshot, StoreEvent};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub mod messages {
    pub const CLASS_CREATED: &str = "Turma criada com sucesso!";
    pub const CLASS_UPDATED: &str = "Turma atualizada com sucesso!";
    pub const CLASS_DELETED: &str = "Turma excluída com sucesso!";
    pub const STUDENT_CREATED: &str = "Estudante criado com sucesso!";
    pub const STUDENT_UPDATED: &str = "Estudante atualizado com sucesso!";
    pub const STUDENT_DELETED: &str = "Estudante excluído com sucesso!";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Validating,
    Submitting,
    PropagatingUpdate,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Idle => "idle",
            Phase::Validating => "validating",
            Phase::Submitting => "submitting",
            Phase::PropagatingUpdate => "propagating",
        })
    }
}

fn trace_phase(action: Action, phase: Phase) {
    debug!(?action, %phase, "mutation phase");
}

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub roster: RosterConfig,
    pub ids: DisplayIdGenerator,
    pub id_policy: IdPolicy,
}

impl SyncOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            roster: config.roster.clone(),
            ids: config.ids.generator(),
            id_policy: config.ids.policy,
        }
    }
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Result of an acknowledged mutation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "record", rename_all = "lowercase")]
pub enum Outcome<T> {
    /// The store now reflects the acknowledgment.
    Applied(T),
    /// Acknowledged remotely, but a later-issued mutation of the same identity
    /// was applied first (or the record is gone), so the store was left alone.
    Superseded(T),
}

impl<T> Outcome<T> {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied(_))
    }

    pub fn value(&self) -> &T {
        match self {
            Outcome::Applied(v) | Outcome::Superseded(v) => v,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Outcome::Applied(v) | Outcome::Superseded(v) => v,
        }
    }
}

/// A pending destructive action. Only [`Coordinator::request_delete_class`] and
/// [`Coordinator::request_delete_student`] build one; the caller shows
/// [`DeleteIntent::prompt`] and passes the intent back to
/// [`Coordinator::confirm_delete`] once the user agrees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteIntent {
    kind: EntityKind,
    id: EntityId,
    label: String,
}

impl DeleteIntent {
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn prompt(&self) -> String {
        match self.kind {
            EntityKind::Class => {
                format!("Tem certeza que deseja excluir a turma \"{}\"?", self.label)
            }
            EntityKind::Student => {
                format!("Tem certeza que deseja excluir o estudante \"{}\"?", self.label)
            }
        }
    }
}

/// A user intent as a value. Resubmitting a failed one through
/// [`Coordinator::submit`] is the retry path.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    CreateClass(ClassDraft),
    UpdateClass { id: EntityId, draft: ClassDraft },
    CreateStudent(StudentDraft),
    UpdateStudent { id: EntityId, draft: StudentDraft },
    Delete(DeleteIntent),
}

impl Mutation {
    pub fn kind(&self) -> EntityKind {
        match self {
            Mutation::CreateClass(_) | Mutation::UpdateClass { .. } => EntityKind::Class,
            Mutation::CreateStudent(_) | Mutation::UpdateStudent { .. } => EntityKind::Student,
            Mutation::Delete(intent) => intent.kind,
        }
    }

    pub fn success_message(&self) -> &'static str {
        match self {
            Mutation::CreateClass(_) => messages::CLASS_CREATED,
            Mutation::UpdateClass { .. } => messages::CLASS_UPDATED,
            Mutation::CreateStudent(_) => messages::STUDENT_CREATED,
            Mutation::UpdateStudent { .. } => messages::STUDENT_UPDATED,
            Mutation::Delete(intent) => match intent.kind {
                EntityKind::Class => messages::CLASS_DELETED,
                EntityKind::Student => messages::STUDENT_DELETED,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Applied {
    Class(Outcome<Class>),
    Student(Outcome<Student>),
    Deleted(Outcome<EntityId>),
}

/// Versions of the updates/deletes issued per identity.
#[derive(Default)]
struct Ledger {
    next: u64,
    entries: HashMap<(EntityKind, EntityId), LedgerEntry>,
}

#[derive(Default)]
struct LedgerEntry {
    in_flight: BTreeSet<u64>,
    applied: u64,
}

impl Ledger {
    fn issue(&mut self, kind: EntityKind, id: EntityId) -> u64 {
        self.next += 1;
        self.entries
            .entry((kind, id))
            .or_default()
            .in_flight
            .insert(self.next);
        self.next
    }

    /// Drops a failed version. Earlier versions still in flight stay eligible.
    fn abandon(&mut self, kind: EntityKind, id: EntityId, version: u64) {
        self.finish(kind, id, version);
    }

    /// True if the acknowledged `version` is newer than any already applied
    /// for the identity, in which case it becomes the applied one.
    fn settle(&mut self, kind: EntityKind, id: EntityId, version: u64) -> bool {
        let newer = self
            .entries
            .get(&(kind, id))
            .is_some_and(|e| e.in_flight.contains(&version) && version > e.applied);
        if newer {
            if let Some(entry) = self.entries.get_mut(&(kind, id)) {
                entry.applied = version;
            }
        }
        self.finish(kind, id, version);
        newer
    }

    fn finish(&mut self, kind: EntityKind, id: EntityId, version: u64) {
        let key = (kind, id);
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.in_flight.remove(&version);
            // Nothing older can still arrive once the in-flight set is empty.
            if entry.in_flight.is_empty() {
                self.entries.remove(&key);
            }
        }
    }
}

pub struct Coordinator {
    remote: Arc<dyn Remote>,
    store: RwLock<EntityStore>,
    // Held while the store is mutated and the change propagated, so
    // propagation order matches mutation order.
    ledger: Mutex<Ledger>,
    propagator: Propagator,
    in_flight: AtomicUsize,
    options: SyncOptions,
}

impl Coordinator {
    pub fn new(remote: Arc<dyn Remote>, options: SyncOptions) -> Self {
        Self::with_store(remote, options, EntityStore::default())
    }

    pub fn with_store(remote: Arc<dyn Remote>, options: SyncOptions, store: EntityStore) -> Self {
        Self {
            remote,
            store: RwLock::new(store),
            ledger: Mutex::new(Ledger::default()),
            propagator: Propagator::default(),
            in_flight: AtomicUsize::new(0),
            options,
        }
    }

    pub fn remote(&self) -> &dyn Remote {
        self.remote.as_ref()
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    pub fn snapshot(&self) -> Snapshot {
        self.store.read().snapshot()
    }

    /// Registers a view. The listener runs on the mutating thread once per
    /// confirmed mutation; it may read snapshots but must not submit
    /// mutations itself.
    pub fn subscribe(
        &self,
        listener: impl Fn(&StoreEvent) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.propagator.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.propagator.unsubscribe(id)
    }

    /// Remote calls currently awaiting a response.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn next_display_id(&self) -> String {
        self.options.ids.next(self.store.read().students().len())
    }

    /// Replaces both collections with the remote lists.
    pub fn load(&self) -> Result<Snapshot, SyncError> {
        let classes = self.call_remote(Action::Load, |r| r.list_classes())?;
        let students = self.call_remote(Action::Load, |r| r.list_students())?;

        let _ledger = self.ledger.lock();
        let snapshot = {
            let mut store = self.store.write();
            *store = EntityStore::new(classes, students);
            store.snapshot()
        };
        info!(
            classes = snapshot.classes.len(),
            students = snapshot.students.len(),
            "store loaded"
        );
        self.propagator
            .emit(&StoreEvent::Classes(Arc::clone(&snapshot.classes)));
        self.propagator
            .emit(&StoreEvent::Students(Arc::clone(&snapshot.students)));
        Ok(snapshot)
    }

    pub fn create_class(&self, draft: &ClassDraft) -> Result<Outcome<Class>, SyncError> {
        let action = Action::Save(EntityKind::Class);
        trace_phase(action, Phase::Validating);
        let payload = validate::class_payload(draft, &self.options.roster)
            .map_err(|e| self.invalid(action, e))?;

        let record = self.call_remote(action, |r| r.create_class(&payload))?;
        Ok(self.acknowledge_insert(action, record))
    }

    pub fn update_class(
        &self,
        id: EntityId,
        draft: &ClassDraft,
    ) -> Result<Outcome<Class>, SyncError> {
        let action = Action::Save(EntityKind::Class);
        self.require_loaded::<Class>(id)?;
        trace_phase(action, Phase::Validating);
        let payload = validate::class_payload(draft, &self.options.roster)
            .map_err(|e| self.invalid(action, e))?;

        let version = self.ledger.lock().issue(EntityKind::Class, id);
        match self.call_remote(action, |r| r.update_class(id, &payload)) {
            Ok(record) => Ok(self.acknowledge_replace(action, id, version, record)),
            Err(e) => {
                self.ledger.lock().abandon(EntityKind::Class, id, version);
                Err(e)
            }
        }
    }

    pub fn create_student(&self, draft: &StudentDraft) -> Result<Outcome<Student>, SyncError> {
        let action = Action::Save(EntityKind::Student);
        trace_phase(action, Phase::Validating);
        let snapshot = self.snapshot();
        let student_id = match self.options.id_policy {
            IdPolicy::Local => Some(self.options.ids.next(snapshot.students.len())),
            IdPolicy::Server => None,
        };
        let payload = validate::student_payload(draft, &snapshot.classes, student_id)
            .map_err(|e| self.invalid(action, e))?;

        let record = self.call_remote(action, |r| r.create_student(&payload))?;
        Ok(self.acknowledge_insert(action, record))
    }

    /// The display id sent is the stored one; it is never regenerated.
    pub fn update_student(
        &self,
        id: EntityId,
        draft: &StudentDraft,
    ) -> Result<Outcome<Student>, SyncError> {
        let action = Action::Save(EntityKind::Student);
        let snapshot = self.snapshot();
        let existing = snapshot
            .students
            .iter()
            .find(|s| s.id == id)
            .ok_or(SyncError::NotFound {
                kind: EntityKind::Student,
                id,
            })?;
        let student_id = Some(existing.student_id.clone()).filter(|s| !s.is_empty());
        trace_phase(action, Phase::Validating);
        let payload = validate::student_payload(draft, &snapshot.classes, student_id)
            .map_err(|e| self.invalid(action, e))?;

        let version = self.ledger.lock().issue(EntityKind::Student, id);
        match self.call_remote(action, |r| r.update_student(id, &payload)) {
            Ok(record) => Ok(self.acknowledge_replace(action, id, version, record)),
            Err(e) => {
                self.ledger.lock().abandon(EntityKind::Student, id, version);
                Err(e)
            }
        }
    }

    pub fn request_delete_class(&self, id: EntityId) -> Result<DeleteIntent, SyncError> {
        let store = self.store.read();
        let class = store.classes().find(id).ok_or(SyncError::NotFound {
            kind: EntityKind::Class,
            id,
        })?;
        Ok(DeleteIntent {
            kind: EntityKind::Class,
            id,
            label: class.name.clone(),
        })
    }

    pub fn request_delete_student(&self, id: EntityId) -> Result<DeleteIntent, SyncError> {
        let store = self.store.read();
        let student = store.students().find(id).ok_or(SyncError::NotFound {
            kind: EntityKind::Student,
            id,
        })?;
        Ok(DeleteIntent {
            kind: EntityKind::Student,
            id,
            label: student.name.clone(),
        })
    }

    /// Removing a class does not touch the students enrolled in it.
    pub fn confirm_delete(&self, intent: &DeleteIntent) -> Result<Outcome<EntityId>, SyncError> {
        let action = Action::Delete(intent.kind);
        let (kind, id) = (intent.kind, intent.id);

        let version = self.ledger.lock().issue(kind, id);
        let result = self.call_remote(action, |r| match kind {
            EntityKind::Class => r.delete_class(id),
            EntityKind::Student => r.delete_student(id),
        });
        match result {
            Ok(()) => Ok(match kind {
                EntityKind::Class => self.acknowledge_remove::<Class>(action, id, version),
                EntityKind::Student => self.acknowledge_remove::<Student>(action, id, version),
            }),
            Err(e) => {
                self.ledger.lock().abandon(kind, id, version);
                Err(e)
            }
        }
    }

    /// Runs a mutation value. Failed mutations can be passed here again as-is.
    pub fn submit(&self, mutation: &Mutation) -> Result<Applied, SyncError> {
        match mutation {
            Mutation::CreateClass(draft) => self.create_class(draft).map(Applied::Class),
            Mutation::UpdateClass { id, draft } => {
                self.update_class(*id, draft).map(Applied::Class)
            }
            Mutation::CreateStudent(draft) => self.create_student(draft).map(Applied::Student),
            Mutation::UpdateStudent { id, draft } => {
                self.update_student(*id, draft).map(Applied::Student)
            }
            Mutation::Delete(intent) => self.confirm_delete(intent).map(Applied::Deleted),
        }
    }

    fn require_loaded<T: Entity>(&self, id: EntityId) -> Result<(), SyncError> {
        if self.store.read().of::<T>().contains(id) {
            return Ok(());
        }
        Err(SyncError::NotFound { kind: T::KIND, id })
    }

    fn invalid(&self, action: Action, err: ValidationError) -> SyncError {
        debug!(?action, error = %err, "mutation rejected locally");
        trace_phase(action, Phase::Idle);
        SyncError::Invalid(err)
    }

    fn call_remote<R>(
        &self,
        action: Action,
        call: impl FnOnce(&dyn Remote) -> Result<R, RemoteError>,
    ) -> Result<R, SyncError> {
        trace_phase(action, Phase::Submitting);
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let result = call(self.remote.as_ref());
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result.map_err(|e| {
            warn!(?action, error = %e, "remote call failed; store unchanged");
            trace_phase(action, Phase::Idle);
            SyncError::remote(action, e)
        })
    }

    fn acknowledge_insert<T: Entity>(&self, action: Action, record: T) -> Outcome<T> {
        let _ledger = self.ledger.lock();
        let items = {
            let mut store = self.store.write();
            store.of_mut::<T>().insert(record.clone());
            store.of::<T>().all()
        };
        debug!(kind = %T::KIND, id = %record.id(), "acknowledged insert");
        self.propagate(action, T::changed(items));
        Outcome::Applied(record)
    }

    fn acknowledge_replace<T: Entity>(
        &self,
        action: Action,
        id: EntityId,
        version: u64,
        record: T,
    ) -> Outcome<T> {
        let mut ledger = self.ledger.lock();
        if !ledger.settle(T::KIND, id, version) {
            info!(kind = %T::KIND, %id, version, "stale acknowledgment ignored");
            trace_phase(action, Phase::Idle);
            return Outcome::Superseded(record);
        }
        let items = {
            let mut store = self.store.write();
            if !store.of_mut::<T>().replace(id, record.clone()) {
                info!(kind = %T::KIND, %id, "acknowledged record no longer in store");
                trace_phase(action, Phase::Idle);
                return Outcome::Superseded(record);
            }
            store.of::<T>().all()
        };
        self.propagate(action, T::changed(items));
        Outcome::Applied(record)
    }

    fn acknowledge_remove<T: Entity>(
        &self,
        action: Action,
        id: EntityId,
        version: u64,
    ) -> Outcome<EntityId> {
        let mut ledger = self.ledger.lock();
        if !ledger.settle(T::KIND, id, version) {
            info!(kind = %T::KIND, %id, version, "stale acknowledgment ignored");
            trace_phase(action, Phase::Idle);
            return Outcome::Superseded(id);
        }
        let items = {
            let mut store = self.store.write();
            if !store.of_mut::<T>().remove(id) {
                trace_phase(action, Phase::Idle);
                return Outcome::Superseded(id);
            }
            store.of::<T>().all()
        };
        self.propagate(action, T::changed(items));
        Outcome::Applied(id)
    }

    fn propagate(&self, action: Action, event: StoreEvent) {
        trace_phase(action, Phase::PropagatingUpdate);
        self.propagator.emit(&event);
        trace_phase(action, Phase::Idle);
    }
}
