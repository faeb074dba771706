use crate::model::{Class, EntityId, EntityKind, Student};
use std::sync::Arc;

/// A record kind held by the [`EntityStore`].
pub trait Entity: Clone + Send + Sync + 'static {
    const KIND: EntityKind;

    fn id(&self) -> EntityId;
    fn collection(store: &EntityStore) -> &Collection<Self>;
    fn collection_mut(store: &mut EntityStore) -> &mut Collection<Self>;
    /// Wraps an updated collection for propagation.
    fn changed(items: Arc<Vec<Self>>) -> StoreEvent;
}

impl Entity for Class {
    const KIND: EntityKind = EntityKind::Class;

    fn id(&self) -> EntityId {
        self.id
    }
    fn collection(store: &EntityStore) -> &Collection<Self> {
        &store.classes
    }
    fn collection_mut(store: &mut EntityStore) -> &mut Collection<Self> {
        &mut store.classes
    }
    fn changed(items: Arc<Vec<Self>>) -> StoreEvent {
        StoreEvent::Classes(items)
    }
}

impl Entity for Student {
    const KIND: EntityKind = EntityKind::Student;

    fn id(&self) -> EntityId {
        self.id
    }
    fn collection(store: &EntityStore) -> &Collection<Self> {
        &store.students
    }
    fn collection_mut(store: &mut EntityStore) -> &mut Collection<Self> {
        &mut store.students
    }
    fn changed(items: Arc<Vec<Self>>) -> StoreEvent {
        StoreEvent::Students(items)
    }
}

/// Ordered records keyed by identity.
///
/// Every mutation builds a fresh `Vec` and swaps the `Arc`, so a snapshot taken
/// before a mutation never observes it half-applied.
#[derive(Debug, Clone)]
pub struct Collection<T> {
    items: Arc<Vec<T>>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self {
            items: Arc::new(Vec::new()),
        }
    }
}

impl<T: Entity> Collection<T> {
    pub fn from_records(records: Vec<T>) -> Self {
        Self {
            items: Arc::new(records),
        }
    }

    pub fn all(&self) -> Arc<Vec<T>> {
        Arc::clone(&self.items)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn find(&self, id: EntityId) -> Option<&T> {
        self.items.iter().find(|r| r.id() == id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.find(id).is_some()
    }

    /// Appends `record`. Identity stays unique: an existing record with the
    /// same id is replaced in place instead.
    pub fn insert(&mut self, record: T) {
        if self.replace(record.id(), record.clone()) {
            return;
        }
        let mut next = Vec::with_capacity(self.items.len() + 1);
        next.extend(self.items.iter().cloned());
        next.push(record);
        self.items = Arc::new(next);
    }

    /// Returns `false` (and leaves the collection untouched) for an unknown id.
    pub fn replace(&mut self, id: EntityId, record: T) -> bool {
        let Some(pos) = self.items.iter().position(|r| r.id() == id) else {
            return false;
        };
        let mut next = self.items.as_ref().clone();
        next[pos] = record;
        self.items = Arc::new(next);
        true
    }

    /// Returns `false` (and leaves the collection untouched) for an unknown id.
    pub fn remove(&mut self, id: EntityId) -> bool {
        if !self.contains(id) {
            return false;
        }
        let next: Vec<T> = self.items.iter().filter(|r| r.id() != id).cloned().collect();
        self.items = Arc::new(next);
        true
    }

    pub fn reset(&mut self, records: Vec<T>) {
        self.items = Arc::new(records);
    }
}

/// The session's classes and students.
///
/// No cascade between the two: removing a class leaves students that
/// reference it in place.
#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    classes: Collection<Class>,
    students: Collection<Student>,
}

impl EntityStore {
    pub fn new(classes: Vec<Class>, students: Vec<Student>) -> Self {
        Self {
            classes: Collection::from_records(classes),
            students: Collection::from_records(students),
        }
    }

    pub fn classes(&self) -> &Collection<Class> {
        &self.classes
    }

    pub fn students(&self) -> &Collection<Student> {
        &self.students
    }

    pub fn of<T: Entity>(&self) -> &Collection<T> {
        T::collection(self)
    }

    pub fn of_mut<T: Entity>(&mut self) -> &mut Collection<T> {
        T::collection_mut(self)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            classes: self.classes.all(),
            students: self.students.all(),
        }
    }
}

/// Immutable view of the store handed down to renderers.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub classes: Arc<Vec<Class>>,
    pub students: Arc<Vec<Student>>,
}

/// Emitted once per confirmed mutation with the full updated collection.
#[derive(Debug, Clone)]
pub enum StoreEvent {
    Classes(Arc<Vec<Class>>),
    Students(Arc<Vec<Student>>),
}

impl StoreEvent {
    pub fn kind(&self) -> EntityKind {
        match self {
            StoreEvent::Classes(_) => EntityKind::Class,
            StoreEvent::Students(_) => EntityKind::Student,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            StoreEvent::Classes(items) => items.len(),
            StoreEvent::Students(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
